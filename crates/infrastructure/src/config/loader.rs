use super::model::AppConfig;
use anyhow::{bail, Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    File(PathBuf),
    Default,
}

pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
    explicit_path: Option<PathBuf>,
    env_prefix: String,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            config_paths: Self::default_config_paths(),
            explicit_path: None,
            env_prefix: "FINASSIST_".to_string(),
        }
    }

    /// Файл, указанный явно (`--config`), обязан существовать
    pub fn with_path(mut self, path: PathBuf) -> Self {
        self.explicit_path = Some(path);
        self
    }

    pub fn with_search_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.config_paths = paths;
        self
    }

    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = prefix.to_string();
        self
    }

    fn default_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from("finassist.toml"),
            PathBuf::from("finassist.json"),
        ];

        // User home directory
        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(".config").join("finassist").join("config.toml"));
        }

        paths
    }

    /// File (first found) -> `.env` -> prefixed environment variables
    pub async fn load(&self) -> Result<(AppConfig, ConfigSource)> {
        let (mut config, source) = self.load_base_config().await?;

        dotenv::dotenv().ok();
        self.apply_overrides(&mut config, |key| env::var(key).ok());

        debug!(?source, provider = %config.llm.provider, "Configuration loaded");
        Ok((config, source))
    }

    async fn load_base_config(&self) -> Result<(AppConfig, ConfigSource)> {
        if let Some(path) = &self.explicit_path {
            if !path.exists() {
                bail!("Config file not found: {}", path.display());
            }
            let config = self.load_file(path).await?;
            info!("Loaded configuration from: {}", path.display());
            return Ok((config, ConfigSource::File(path.clone())));
        }

        // первый найденный файл должен парситься
        match self.config_paths.iter().find(|path| path.exists()) {
            Some(path) => {
                let config = self.load_file(path).await?;
                info!("Loaded configuration from: {}", path.display());
                Ok((config, ConfigSource::File(path.clone())))
            }
            None => Ok((AppConfig::default(), ConfigSource::Default)),
        }
    }

    async fn load_file(&self, path: &Path) -> Result<AppConfig> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "json" => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config {}", path.display())),
            _ => toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config {}", path.display())),
        }
    }

    /// Apply `<PREFIX>*` overrides; unparsable numbers are ignored with a warning.
    pub fn apply_overrides<F>(&self, config: &mut AppConfig, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", self.env_prefix, name));

        // LLM settings
        if let Some(provider) = var("LLM_PROVIDER") {
            config.llm.provider = provider;
        }
        if let Some(model) = var("LLM_MODEL") {
            config.llm.model = Some(model);
        }
        if let Some(value) = var("MAX_TOKENS") {
            match value.parse() {
                Ok(tokens) => config.llm.max_tokens = tokens,
                Err(_) => warn!("Ignoring invalid {}MAX_TOKENS: {}", self.env_prefix, value),
            }
        }
        if let Some(value) = var("TEMPERATURE") {
            match value.parse() {
                Ok(temperature) => config.llm.temperature = temperature,
                Err(_) => warn!("Ignoring invalid {}TEMPERATURE: {}", self.env_prefix, value),
            }
        }

        // Paths
        if let Some(dir) = var("DATA_DIR") {
            config.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(db) = var("DATABASE") {
            config.storage.database = PathBuf::from(db);
        }
        if let Some(faq) = var("FAQ_FILE") {
            config.storage.faq_file = PathBuf::from(faq);
        }
        if let Some(dir) = var("SESSIONS_DIR") {
            config.storage.sessions_dir = PathBuf::from(dir);
        }

        // Logging
        if let Some(level) = var("LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Some(json) = var("LOG_JSON") {
            config.logging.json = matches!(json.to_lowercase().as_str(), "1" | "true" | "yes");
        }

        if let Some(user) = var("DEFAULT_USER") {
            config.user.default_user = user;
        }
    }

    pub async fn save_config(&self, config: &AppConfig, path: &Path) -> Result<()> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("toml");

        let content = match extension {
            "json" => serde_json::to_string_pretty(config)?,
            _ => toml::to_string_pretty(config)?,
        };

        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        fs::write(path, content).await?;
        info!("Configuration saved to: {}", path.display());

        Ok(())
    }

    pub fn generate_example_config() -> Result<String> {
        let mut config = AppConfig::default();
        config.llm.model = Some(llm::DEFAULT_OPENAI_MODEL.to_string());
        config.logging.level = "info".to_string();
        Ok(toml::to_string_pretty(&config)?)
    }
}
