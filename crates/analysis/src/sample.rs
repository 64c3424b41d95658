use crate::transaction::Transaction;
use chrono::{Datelike, Duration, Local, NaiveDate};
use common::{invalid_input, FinanceResult};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

const SALARY_DAY: u32 = 5;
const EXPENSE_PROBABILITY: f64 = 0.3;
pub const MAX_SAMPLE_MONTHS: u32 = 1200;

/// Категории расходов и диапазон суммы для каждой
const EXPENSE_CATEGORIES: [(&str, f64, f64); 8] = [
    ("Alimentação", 20.0, 150.0),
    ("Transporte", 15.0, 100.0),
    ("Moradia", 800.0, 1500.0),
    ("Saúde", 50.0, 300.0),
    ("Educação", 100.0, 500.0),
    ("Lazer", 30.0, 200.0),
    ("Vestuário", 50.0, 300.0),
    ("Outros", 10.0, 100.0),
];

/// Generates plausible demo transactions: a salary on day 5 of every month
/// and, on roughly 30% of days, one expense in a random category.
pub struct SampleDataGenerator {
    rng: StdRng,
}

impl Default for SampleDataGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleDataGenerator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible output for tests and demos
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// `months * 30` days ending today
    pub fn generate(&mut self, months: u32) -> FinanceResult<Vec<Transaction>> {
        let today = Local::now().date_naive();
        self.generate_until(months, today)
    }

    pub fn generate_until(
        &mut self,
        months: u32,
        end: NaiveDate,
    ) -> FinanceResult<Vec<Transaction>> {
        if months > MAX_SAMPLE_MONTHS {
            return Err(invalid_input(
                "months",
                &format!("must not exceed {MAX_SAMPLE_MONTHS}"),
            ));
        }
        let days = i64::from(months) * 30;
        let start = end
            .checked_sub_signed(Duration::days(days))
            .ok_or_else(|| invalid_input("months", "period starts before the supported calendar"))?;
        let mut transactions = Vec::new();

        for offset in 0..days {
            let date = start + Duration::days(offset);

            if date.day() == SALARY_DAY {
                let amount = self.rng.gen_range(4000.0..6000.0);
                transactions.push(Transaction::income(date, amount, "Salário", "Salário mensal"));
            }

            if self.rng.gen_bool(EXPENSE_PROBABILITY) {
                if let Some(&(category, min, max)) = EXPENSE_CATEGORIES.choose(&mut self.rng) {
                    let amount = self.rng.gen_range(min..max);
                    let description = format!("Despesa com {}", category.to_lowercase());
                    transactions.push(Transaction::expense(date, amount, category, &description));
                }
            }
        }

        debug!(months, count = transactions.len(), "Sample transactions generated");
        Ok(transactions)
    }
}
