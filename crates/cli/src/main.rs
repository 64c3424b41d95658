use anyhow::Result;
use clap::{Parser, Subcommand};
use cli::commands::{
    AnalyzeCommand, CalcCommand, ChatCommand, ConfigCommand, FaqCommand, HistoryCommand,
    ProductsCommand, ValidateCommand,
};
use cli::commands::config::ConfigSubcommand;
use cli::AppContext;
use colored::*;
use common::{init_structured_logging, LoggingConfig};
use infrastructure::{AppConfig, ConfigLoader, ConfigSource, ConfigValidator};
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser)]
#[command(name = "finassist")]
#[command(about = "Assistente financeiro: chat, FAQs, simuladores e análise de gastos")]
#[command(version)]
struct Cli {
    /// Файл конфигурации (TOML или JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Логи в формате JSON (stderr)
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// [►] Conversa com o assistente (LLM)
    Chat(ChatCommand),
    /// [?] Base de perguntas frequentes
    Faq(FaqCommand),
    /// [●] Catálogo de produtos
    Products(ProductsCommand),
    /// [Σ] Simuladores financeiros
    Calc(CalcCommand),
    /// [▲] Análise de transações
    Analyze(AnalyzeCommand),
    /// [◷] Histórico, simulações salvas e feedback
    History(HistoryCommand),
    /// [✓] Validação de documentos e contatos
    Validate(ValidateCommand),
    /// [⚙] Configuração
    Config(ConfigCommand),
}

fn is_config_init(command: &Commands) -> bool {
    matches!(
        command,
        Commands::Config(cmd) if matches!(cmd.command, ConfigSubcommand::Init { .. })
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_path(path.clone());
    }
    let (config, source) = match loader.load().await {
        Ok(loaded) => loaded,
        // `config init --force` is the way out of an unreadable file
        Err(e) if is_config_init(&cli.command) => {
            eprintln!("{} {e:#}", "[!]".yellow().bold());
            (AppConfig::default(), ConfigSource::Default)
        }
        Err(e) => return Err(e),
    };

    let logging = LoggingConfig {
        json_output: cli.json_logs || config.logging.json,
        ..LoggingConfig::default()
    }
    .with_level_name(&config.logging.level);
    init_structured_logging(logging)?;

    // `config` must stay usable to inspect or regenerate a broken setup
    if !matches!(cli.command, Commands::Config(_)) {
        ConfigValidator::new().validate(&config)?;
    }
    debug!(?source, provider = %config.llm.provider, "finassist starting");

    let ctx = AppContext::new(config, source);

    match cli.command {
        Commands::Chat(cmd) => cmd.execute(&ctx).await?,
        Commands::Faq(cmd) => cmd.execute(&ctx).await?,
        Commands::Products(cmd) => cmd.execute().await?,
        Commands::Calc(cmd) => cmd.execute(&ctx).await?,
        Commands::Analyze(cmd) => cmd.execute().await?,
        Commands::History(cmd) => cmd.execute(&ctx).await?,
        Commands::Validate(cmd) => cmd.execute().await?,
        Commands::Config(cmd) => cmd.execute(&ctx).await?,
    }

    Ok(())
}
