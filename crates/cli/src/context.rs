use anyhow::{Context, Result};
use history::HistoryStore;
use infrastructure::{AppConfig, ConfigSource};
use knowledge::FaqManager;
use llm::{LlmClient, LlmProvider};
use tracing::debug;

/// Загруженная конфигурация и фабрики сервисов для команд
pub struct AppContext {
    config: AppConfig,
    source: ConfigSource,
}

impl AppContext {
    pub fn new(config: AppConfig, source: ConfigSource) -> Self {
        Self { config, source }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn source(&self) -> &ConfigSource {
        &self.source
    }

    /// `--user` wins over the configured default
    pub fn resolve_user(&self, user: Option<&str>) -> String {
        user.map(str::to_string)
            .unwrap_or_else(|| self.config.user.default_user.clone())
    }

    pub async fn open_store(&self) -> Result<HistoryStore> {
        let path = self.config.storage.database_path();
        debug!(path = %path.display(), "Opening history store");
        HistoryStore::new(&path)
            .await
            .with_context(|| format!("Failed to open database {}", path.display()))
    }

    pub fn open_faqs(&self) -> FaqManager {
        FaqManager::open(self.config.storage.faq_path())
    }

    /// Builds the provider from configuration; API keys come from the environment.
    pub fn llm_client(&self) -> Result<LlmClient> {
        let settings = &self.config.llm;
        let provider = LlmProvider::from_env_for(&settings.provider, settings.model.as_deref())?;
        Ok(LlmClient::new(
            provider,
            settings.max_tokens,
            settings.temperature,
        ))
    }
}
