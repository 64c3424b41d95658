use crate::output;
use anyhow::Result;
use clap::{Args, Subcommand};
use common::formatters::{format_cep, format_cnpj, format_cpf, format_phone};
use common::validators::{validate_cep, validate_cnpj, validate_cpf, validate_email, validate_phone};

#[derive(Debug, Args)]
pub struct ValidateCommand {
    #[command(subcommand)]
    command: ValidateSubcommand,
}

#[derive(Debug, Clone, Subcommand)]
enum ValidateSubcommand {
    /// CPF (com ou sem máscara)
    Cpf { value: String },
    /// CNPJ (com ou sem máscara)
    Cnpj { value: String },
    Email { value: String },
    /// Telefone brasileiro com DDD
    Phone { value: String },
    Cep { value: String },
}

/// (label, valid, formatted)
fn check(cmd: &ValidateSubcommand) -> (&'static str, bool, String) {
    match cmd {
        ValidateSubcommand::Cpf { value } => ("CPF", validate_cpf(value), format_cpf(value)),
        ValidateSubcommand::Cnpj { value } => ("CNPJ", validate_cnpj(value), format_cnpj(value)),
        ValidateSubcommand::Email { value } => {
            ("Email", validate_email(value), value.trim().to_string())
        }
        ValidateSubcommand::Phone { value } => {
            ("Telefone", validate_phone(value), format_phone(value))
        }
        ValidateSubcommand::Cep { value } => ("CEP", validate_cep(value), format_cep(value)),
    }
}

impl ValidateCommand {
    /// Exit status is non-zero when the value is invalid
    pub async fn execute(self) -> Result<()> {
        let (label, valid, formatted) = check(&self.command);
        if valid {
            output::success(&format!("{label} válido: {formatted}"));
            Ok(())
        } else {
            output::failure(&format!("{label} inválido"));
            anyhow::bail!("{label} inválido")
        }
    }
}
