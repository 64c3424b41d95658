use super::model::*;
use anyhow::{bail, Result};
use tracing::warn;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Default)]
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, config: &AppConfig) -> Result<()> {
        self.validate_llm_settings(&config.llm)?;
        self.validate_storage_settings(&config.storage)?;
        self.validate_log_settings(&config.logging);
        self.validate_user_settings(&config.user)?;
        Ok(())
    }

    fn validate_llm_settings(&self, config: &LlmSettings) -> Result<()> {
        let provider = config.provider.to_lowercase();
        if !llm::SUPPORTED_PROVIDERS.contains(&provider.as_str()) {
            bail!(
                "Unknown LLM provider '{}', expected one of: {}",
                config.provider,
                llm::SUPPORTED_PROVIDERS.join(", ")
            );
        }

        // Validate temperature
        if !(0.0..=2.0).contains(&config.temperature) {
            bail!(
                "Temperature must be between 0.0 and 2.0, got {}",
                config.temperature
            );
        }

        // Validate max_tokens
        if config.max_tokens == 0 {
            bail!("max_tokens must be greater than 0");
        }

        if let Some(model) = &config.model {
            if model.trim().is_empty() {
                bail!("LLM model name must not be empty when set");
            }
        }

        Ok(())
    }

    fn validate_storage_settings(&self, config: &StorageSettings) -> Result<()> {
        if config.data_dir.as_os_str().is_empty() {
            bail!("storage.data_dir must not be empty");
        }
        if config.database.as_os_str().is_empty() {
            bail!("storage.database must not be empty");
        }
        if config.data_dir.exists() && !config.data_dir.is_dir() {
            bail!(
                "storage.data_dir is not a directory: {}",
                config.data_dir.display()
            );
        }
        Ok(())
    }

    fn validate_log_settings(&self, config: &LogSettings) {
        // directives (`info,history=debug`) go to the EnvFilter as-is
        let level = config.level.to_lowercase();
        if !level.contains('=') && !LOG_LEVELS.contains(&level.as_str()) {
            warn!("Unknown log level '{}', falling back to warn", config.level);
        }
    }

    fn validate_user_settings(&self, config: &UserSettings) -> Result<()> {
        if config.default_user.trim().is_empty() {
            bail!("user.default_user must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ConfigValidator::new().validate(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_temperature() {
        let mut config = AppConfig::default();
        config.llm.temperature = 2.5;
        let err = ConfigValidator::new().validate(&config).unwrap_err();
        assert!(err.to_string().contains("Temperature"));
    }

    #[test]
    fn test_rejects_unknown_provider_and_zero_tokens() {
        let validator = ConfigValidator::new();

        let mut config = AppConfig::default();
        config.llm.provider = "watson".to_string();
        assert!(validator.validate(&config).is_err());

        let mut config = AppConfig::default();
        config.llm.provider = "Gemini".to_string();
        config.llm.max_tokens = 0;
        assert!(validator
            .validate(&config)
            .unwrap_err()
            .to_string()
            .contains("max_tokens"));
    }

    #[test]
    fn test_rejects_blank_user() {
        let mut config = AppConfig::default();
        config.user.default_user = "  ".to_string();
        assert!(ConfigValidator::new().validate(&config).is_err());
    }
}
