//! Formatação no padrão brasileiro (pt-BR): ponto como separador de milhar,
//! vírgula como separador decimal.

use crate::validators::digits_only;
use chrono::NaiveDate;

const FLEXIBLE_DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];

/// `1234.5` -> `1.234,50`
pub fn format_number(value: f64, decimals: usize, thousands: bool) -> String {
    let raw = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match raw.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (raw.clone(), None),
    };

    let int_part = if thousands {
        group_thousands(&int_part)
    } else {
        int_part
    };

    // -0,00 не показываем
    let negative = value < 0.0 && raw.chars().any(|c| c.is_ascii_digit() && c != '0');
    let sign = if negative { "-" } else { "" };

    match frac_part {
        Some(frac) => format!("{sign}{int_part},{frac}"),
        None => format!("{sign}{int_part}"),
    }
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    out
}

/// `1234.56` -> `R$ 1.234,56`
pub fn format_currency(value: f64) -> String {
    format_currency_with_symbol(value, "R$")
}

pub fn format_currency_with_symbol(value: f64, symbol: &str) -> String {
    format!("{symbol} {}", format_number(value, 2, true))
}

/// Input is a fraction: `0.125` -> `12,50%`
pub fn format_percent(fraction: f64, decimals: usize) -> String {
    format!("{}%", format_number(fraction * 100.0, decimals, false))
}

pub fn format_date(date: NaiveDate, format: &str) -> String {
    date.format(format).to_string()
}

/// Tries ISO, Brazilian and slash-ISO layouts in that order.
pub fn parse_flexible_date(value: &str) -> Option<NaiveDate> {
    FLEXIBLE_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value.trim(), fmt).ok())
}

pub fn format_cpf(cpf: &str) -> String {
    let d = digits_only(cpf);
    if d.len() != 11 {
        return d;
    }
    format!("{}.{}.{}-{}", &d[..3], &d[3..6], &d[6..9], &d[9..])
}

pub fn format_cnpj(cnpj: &str) -> String {
    let d = digits_only(cnpj);
    if d.len() != 14 {
        return d;
    }
    format!(
        "{}.{}.{}/{}-{}",
        &d[..2],
        &d[2..5],
        &d[5..8],
        &d[8..12],
        &d[12..]
    )
}

pub fn format_phone(phone: &str) -> String {
    let d = digits_only(phone);
    match d.len() {
        11 => format!("({}) {}-{}", &d[..2], &d[2..7], &d[7..]),
        10 => format!("({}) {}-{}", &d[..2], &d[2..6], &d[6..]),
        _ => d,
    }
}

pub fn format_cep(cep: &str) -> String {
    let d = digits_only(cep);
    if d.len() != 8 {
        return d;
    }
    format!("{}-{}", &d[..5], &d[5..])
}

pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{} {}", format_number(size, 1, false), UNITS[unit])
}
