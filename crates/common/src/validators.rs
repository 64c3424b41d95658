//! Validação de documentos e dados cadastrais brasileiros.
//!
//! All validators accept formatted or unformatted input: punctuation is
//! stripped before the digit checks run.

use crate::errors::{FinanceResult, ValidationError};
use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("static regex");
    static ref MONEY_RE: Regex =
        Regex::new(r"^\d{1,3}(\.\d{3})*(,\d{2})?$|^\d+(\.\d{2})?$").expect("static regex");
}

const CNPJ_WEIGHTS_FIRST: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
const CNPJ_WEIGHTS_SECOND: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

/// Оставляет только цифры
pub fn digits_only(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn to_digits(value: &str) -> Vec<u32> {
    value.chars().filter_map(|c| c.to_digit(10)).collect()
}

fn all_equal(digits: &[u32]) -> bool {
    digits.windows(2).all(|w| w[0] == w[1])
}

pub fn validate_cpf(cpf: &str) -> bool {
    let digits = to_digits(cpf);
    if digits.len() != 11 || all_equal(&digits) {
        return false;
    }

    let check = |len: usize| -> u32 {
        let sum: u32 = digits[..len]
            .iter()
            .enumerate()
            .map(|(i, d)| d * (len as u32 + 1 - i as u32))
            .sum();
        (sum * 10 % 11) % 10
    };

    digits[9] == check(9) && digits[10] == check(10)
}

pub fn validate_cnpj(cnpj: &str) -> bool {
    let digits = to_digits(cnpj);
    if digits.len() != 14 || all_equal(&digits) {
        return false;
    }

    let check = |weights: &[u32]| -> u32 {
        let sum: u32 = weights.iter().zip(&digits).map(|(w, d)| w * d).sum();
        let digit = 11 - (sum % 11);
        if digit >= 10 {
            0
        } else {
            digit
        }
    };

    digits[12] == check(&CNPJ_WEIGHTS_FIRST) && digits[13] == check(&CNPJ_WEIGHTS_SECOND)
}

pub fn validate_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Telefone com DDD: fixo (10 dígitos) ou celular (11 dígitos, começando em 9)
pub fn validate_phone(phone: &str) -> bool {
    let digits = digits_only(phone);
    if digits.len() != 10 && digits.len() != 11 {
        return false;
    }

    let ddd: u32 = digits[..2].parse().unwrap_or(0);
    if !(11..=99).contains(&ddd) {
        return false;
    }

    digits.len() == 10 || digits.as_bytes()[2] == b'9'
}

pub fn validate_cep(cep: &str) -> bool {
    digits_only(cep).len() == 8
}

/// Accepts `1.234,56`, `123,45`, `1234` and `1234.56`; a comma decimal needs
/// dotted thousands, so `1234,56` is rejected.
pub fn validate_money(value: &str) -> bool {
    MONEY_RE.is_match(value)
}

pub fn validate_date(value: &str, format: &str) -> bool {
    NaiveDate::parse_from_str(value, format).is_ok()
}

/// Converte um resultado booleano em erro tipado para uso com `?`
pub fn ensure_valid(field: &str, value: &str, valid: bool) -> FinanceResult<()> {
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidField {
            field: field.to_string(),
            value: value.to_string(),
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpf() {
        assert!(validate_cpf("529.982.247-25"));
        assert!(validate_cpf("52998224725"));
        assert!(!validate_cpf("529.982.247-26"));
        assert!(!validate_cpf("111.111.111-11"));
        assert!(!validate_cpf("1234"));
    }

    #[test]
    fn test_cnpj() {
        assert!(validate_cnpj("11.222.333/0001-81"));
        assert!(!validate_cnpj("11.222.333/0001-82"));
        assert!(!validate_cnpj("00000000000000"));
    }

    #[test]
    fn test_email() {
        assert!(validate_email("cliente@banco.com.br"));
        assert!(!validate_email("cliente@banco"));
        assert!(!validate_email("sem arroba.com"));
    }

    #[test]
    fn test_phone() {
        assert!(validate_phone("(11) 98765-4321"));
        assert!(validate_phone("(11) 3456-7890"));
        assert!(!validate_phone("(11) 88765-4321"));
        assert!(!validate_phone("(05) 3456-7890"));
        assert!(!validate_phone("3456-7890"));
    }

    #[test]
    fn test_cep_money_date() {
        assert!(validate_cep("01310-100"));
        assert!(!validate_cep("0131-100"));

        assert!(validate_money("1.234,56"));
        assert!(validate_money("1234.56"));
        assert!(validate_money("1234"));
        assert!(!validate_money("12,3"));
        assert!(validate_money("123,45"));
        assert!(!validate_money("1234,56"));

        assert!(validate_date("29/02/2024", "%d/%m/%Y"));
        assert!(!validate_date("30/02/2024", "%d/%m/%Y"));
    }

    #[test]
    fn test_ensure_valid() {
        assert!(ensure_valid("cpf", "x", true).is_ok());
        let err = ensure_valid("cpf", "123", false).unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Invalid cpf: 123");
    }
}
