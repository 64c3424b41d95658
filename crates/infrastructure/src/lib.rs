pub mod config;

pub use config::{AppConfig, ConfigLoader, ConfigSource, ConfigValidator};
