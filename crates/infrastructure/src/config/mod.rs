pub mod loader;
pub mod model;
pub mod validator;

pub use loader::{ConfigLoader, ConfigSource};
pub use model::{AppConfig, LlmSettings, LogSettings, StorageSettings, UserSettings};
pub use validator::ConfigValidator;
