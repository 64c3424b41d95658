use crate::output;
use crate::AppContext;
use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use colored::*;
use infrastructure::{AppConfig, ConfigLoader, ConfigSource, ConfigValidator};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigSubcommand {
    /// Show the effective configuration (file + environment)
    Show,

    /// Validate the effective configuration
    #[command(alias = "check")]
    Validate,

    /// Write an example configuration file
    Init {
        /// Output path (.toml or .json)
        #[arg(short, long, default_value = "finassist.toml")]
        output: PathBuf,

        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

impl ConfigCommand {
    pub async fn execute(&self, ctx: &AppContext) -> Result<()> {
        match &self.command {
            ConfigSubcommand::Show => show_config(ctx.config(), ctx.source()),
            ConfigSubcommand::Validate => validate_config(ctx.config()),
            ConfigSubcommand::Init { output, force } => init_config(output, *force).await,
        }
    }
}

fn show_config(config: &AppConfig, source: &ConfigSource) -> Result<()> {
    match source {
        ConfigSource::File(path) => println!("# Loaded from {}", path.display()),
        ConfigSource::Default => println!("# Built-in defaults"),
    }
    println!("{}", toml::to_string_pretty(config)?);
    println!("# database: {}", config.storage.database_path().display());
    println!("# faqs:     {}", config.storage.faq_path().display());
    println!("# sessions: {}", config.storage.sessions_path().display());
    Ok(())
}

fn validate_config(config: &AppConfig) -> Result<()> {
    match ConfigValidator::new().validate(config) {
        Ok(()) => {
            output::success("Configuration is valid");
            Ok(())
        }
        Err(e) => {
            output::failure("Configuration validation failed:");
            println!("   {e}");
            Err(e)
        }
    }
}

async fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        warn!("Configuration file already exists at: {}", path.display());
        bail!(
            "Configuration file already exists at {} (use --force to overwrite)",
            path.display()
        );
    }

    let is_json = path.extension().and_then(|ext| ext.to_str()) == Some("json");
    if is_json {
        let config: AppConfig = toml::from_str(&ConfigLoader::generate_example_config()?)?;
        ConfigLoader::new().save_config(&config, path).await?;
    } else {
        tokio::fs::write(path, ConfigLoader::generate_example_config()?).await?;
    }
    info!("Configuration file generated at: {}", path.display());

    output::success(&format!("Configuration written to {}", path.display()));
    println!("{}", "Next steps:".bold());
    println!("   1. Pick the LLM provider under [llm]");
    println!("   2. Export the provider API key (OPENAI_API_KEY, GOOGLE_API_KEY, ANTHROPIC_API_KEY)");
    println!("   3. Run 'finassist config validate'");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("finassist.toml");

        init_config(&path, false).await.unwrap();
        assert!(init_config(&path, false).await.is_err());
        init_config(&path, true).await.unwrap();

        let written: AppConfig = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.llm.provider, "openai");
    }

    #[tokio::test]
    async fn test_init_json_is_loadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("finassist.json");
        init_config(&path, false).await.unwrap();

        let (config, source) = ConfigLoader::new()
            .with_path(path.clone())
            .with_env_prefix("FINASSIST_TEST_UNUSED_")
            .load()
            .await
            .unwrap();
        assert_eq!(source, ConfigSource::File(path));
        assert_eq!(config.logging.level, "info");
    }
}
