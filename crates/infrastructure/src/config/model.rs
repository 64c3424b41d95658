use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Полная конфигурация приложения; все секции необязательны в файле
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmSettings,
    pub storage: StorageSettings,
    pub logging: LogSettings,
    pub user: UserSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: String,
    /// Provider default when absent
    pub model: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: None,
            max_tokens: 1000,
            temperature: 0.7,
        }
    }
}

/// Relative file names resolve against `data_dir`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub data_dir: PathBuf,
    pub database: PathBuf,
    pub faq_file: PathBuf,
    pub sessions_dir: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            database: PathBuf::from("finassist.db"),
            faq_file: PathBuf::from("faqs.json"),
            sessions_dir: PathBuf::from("sessions"),
        }
    }
}

impl StorageSettings {
    fn resolve(&self, path: &PathBuf) -> PathBuf {
        if path.is_absolute() {
            path.clone()
        } else {
            self.data_dir.join(path)
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.resolve(&self.database)
    }

    pub fn faq_path(&self) -> PathBuf {
        self.resolve(&self.faq_file)
    }

    pub fn sessions_path(&self) -> PathBuf {
        self.resolve(&self.sessions_dir)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: String,
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub default_user: String,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            default_user: "default_user".to_string(),
        }
    }
}
