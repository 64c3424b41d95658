use infrastructure::config::{AppConfig, ConfigLoader, ConfigSource, ConfigValidator};
use std::collections::HashMap;
use std::path::PathBuf;
use tempfile::TempDir;
use tokio::fs;

fn isolated_loader(dir: &TempDir) -> ConfigLoader {
    ConfigLoader::new()
        .with_search_paths(vec![
            dir.path().join("finassist.toml"),
            dir.path().join("finassist.json"),
        ])
        .with_env_prefix("FINASSIST_TEST_UNSET_")
}

#[tokio::test]
async fn test_defaults_without_files() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let (config, source) = isolated_loader(&dir).load().await?;

    assert_eq!(source, ConfigSource::Default);
    assert_eq!(config, AppConfig::default());
    Ok(())
}

#[tokio::test]
async fn test_config_loader_from_toml() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("finassist.toml");
    fs::write(
        &path,
        r#"
[llm]
provider = "gemini"
max_tokens = 2048
temperature = 0.5

[storage]
data_dir = "/var/lib/finassist"

[user]
default_user = "ana"
"#,
    )
    .await?;

    let (config, source) = isolated_loader(&dir).load().await?;

    assert_eq!(source, ConfigSource::File(path));
    assert_eq!(config.llm.provider, "gemini");
    assert_eq!(config.llm.max_tokens, 2048);
    assert_eq!(config.llm.temperature, 0.5);
    assert_eq!(config.storage.data_dir, PathBuf::from("/var/lib/finassist"));
    assert_eq!(config.storage.faq_file, PathBuf::from("faqs.json"));
    assert_eq!(config.user.default_user, "ana");
    Ok(())
}

#[tokio::test]
async fn test_config_loader_from_json() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("custom.json");
    fs::write(&path, r#"{"logging": {"level": "debug", "json": true}}"#).await?;

    let (config, _) = isolated_loader(&dir).with_path(path).load().await?;
    assert_eq!(config.logging.level, "debug");
    assert!(config.logging.json);
    Ok(())
}

#[tokio::test]
async fn test_missing_explicit_path_is_an_error() {
    let dir = TempDir::new().unwrap();
    let result = isolated_loader(&dir)
        .with_path(dir.path().join("nope.toml"))
        .load()
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_broken_file_is_an_error() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    fs::write(dir.path().join("finassist.toml"), "[llm\nprovider = ").await?;
    // a valid file further down the search list must not mask the broken one
    fs::write(dir.path().join("finassist.json"), "{}").await?;

    let err = isolated_loader(&dir).load().await.unwrap_err();
    assert!(format!("{err:#}").contains("finassist.toml"));
    Ok(())
}

#[test]
fn test_prefixed_overrides() {
    let vars: HashMap<&str, &str> = [
        ("FINASSIST_LLM_PROVIDER", "local"),
        ("FINASSIST_LLM_MODEL", "llama3"),
        ("FINASSIST_MAX_TOKENS", "not-a-number"),
        ("FINASSIST_TEMPERATURE", "0.2"),
        ("FINASSIST_DATA_DIR", "/tmp/finassist"),
        ("FINASSIST_LOG_JSON", "yes"),
        ("FINASSIST_DEFAULT_USER", "bob"),
    ]
    .into_iter()
    .collect();

    let mut config = AppConfig::default();
    ConfigLoader::new().apply_overrides(&mut config, |key| vars.get(key).map(|v| v.to_string()));

    assert_eq!(config.llm.provider, "local");
    assert_eq!(config.llm.model.as_deref(), Some("llama3"));
    assert_eq!(config.llm.max_tokens, 1000);
    assert_eq!(config.llm.temperature, 0.2);
    assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/finassist"));
    assert!(config.logging.json);
    assert_eq!(config.user.default_user, "bob");
    assert!(ConfigValidator::new().validate(&config).is_ok());
}

#[tokio::test]
async fn test_save_and_reload() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("nested").join("finassist.toml");

    let mut config = AppConfig::default();
    config.llm.provider = "anthropic".to_string();
    config.user.default_user = "carla".to_string();

    let loader = isolated_loader(&dir);
    loader.save_config(&config, &path).await?;

    let (loaded, _) = isolated_loader(&dir).with_path(path).load().await?;
    assert_eq!(loaded, config);
    Ok(())
}

#[test]
fn test_example_config_parses() {
    let text = ConfigLoader::generate_example_config().unwrap();
    let parsed: AppConfig = toml::from_str(&text).unwrap();
    assert!(ConfigValidator::new().validate(&parsed).is_ok());
}
