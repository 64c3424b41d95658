use crate::output;
use crate::AppContext;
use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use colored::*;
use common::validators::{ensure_valid, validate_email};
use history::{erase_snapshots, ConversationContext, HistoryStore, MessageRole};
use prettytable::row;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct HistoryCommand {
    /// Usuário (padrão: user.default_user)
    #[arg(short, long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: HistorySubcommand,
}

#[derive(Debug, Clone, Subcommand)]
enum HistorySubcommand {
    /// Mensagens mais recentes
    #[command(name = "show")]
    Show {
        #[arg(long)]
        session: Option<String>,
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Apagar mensagens (todas ou de uma sessão)
    #[command(name = "clear")]
    Clear {
        #[arg(long)]
        session: Option<String>,
    },
    /// Simulações salvas
    #[command(name = "sims")]
    Sims {
        #[arg(short, long)]
        kind: Option<String>,
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
        /// Mostrar parâmetros e resultado completos
        #[arg(long)]
        full: bool,
    },
    /// Registrar avaliação (1 a 5)
    #[command(name = "feedback")]
    Feedback {
        rating: i64,
        #[arg(short, long)]
        comment: Option<String>,
        /// Mensagem avaliada
        #[arg(long)]
        message: Option<i64>,
    },
    /// Estatísticas de feedback
    #[command(name = "stats")]
    Stats,
    /// Perfil do usuário (cria se não existir)
    #[command(name = "profile")]
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    /// Preferências: sem argumentos mostra, CHAVE=VALOR grava
    #[command(name = "prefs")]
    Prefs { values: Vec<String> },
    /// Resumo de um arquivo de sessão salvo
    #[command(name = "session")]
    Session { file: PathBuf },
    /// Apagar todos os dados do usuário (LGPD)
    #[command(name = "forget")]
    Forget {
        /// Confirmar a exclusão
        #[arg(long)]
        yes: bool,
    },
}

impl HistoryCommand {
    pub async fn execute(self, ctx: &AppContext) -> Result<()> {
        let user = ctx.resolve_user(self.user.as_deref());

        if let HistorySubcommand::Session { file } = &self.command {
            return show_session(file);
        }

        let store = ctx.open_store().await?;
        let sessions = ctx.config().storage.sessions_path();
        handle(&store, &sessions, &user, self.command).await
    }
}

/// `chave=valor`; the value is stored as JSON when it parses, otherwise as a string
fn parse_preference(raw: &str) -> Result<(String, Value)> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("expected key=value, got '{raw}'");
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("empty preference key in '{raw}'");
    }
    let value = serde_json::from_str(value.trim())
        .unwrap_or_else(|_| Value::String(value.trim().to_string()));
    Ok((key.to_string(), value))
}

async fn handle(
    store: &HistoryStore,
    sessions: &Path,
    user: &str,
    cmd: HistorySubcommand,
) -> Result<()> {
    match cmd {
        HistorySubcommand::Show { session, limit } => {
            let messages = store.history(user, session.as_deref(), limit).await?;
            if messages.is_empty() {
                output::failure("Nenhuma mensagem no histórico");
                return Ok(());
            }
            for m in messages {
                let who = match m.role {
                    MessageRole::User => "[►]".green().bold(),
                    MessageRole::Assistant => "[AI]".cyan().bold(),
                    MessageRole::System => "[⚙]".dimmed(),
                };
                println!(
                    "{} {} {}",
                    m.timestamp.format("%d/%m/%Y %H:%M").to_string().dimmed(),
                    who,
                    m.content
                );
            }
        }
        HistorySubcommand::Clear { session } => {
            let deleted = store.clear_history(user, session.as_deref()).await?;
            output::success(&format!("{deleted} mensagens removidas"));
        }
        HistorySubcommand::Sims { kind, limit, full } => {
            let sims = store.simulations(user, kind.as_deref(), limit).await?;
            if sims.is_empty() {
                output::failure("Nenhuma simulação salva");
                return Ok(());
            }
            if full {
                return output::print_json(&sims);
            }
            let mut table = output::new_table();
            table.set_titles(row!["#", "Tipo", "Data", "Parâmetros"]);
            for s in sims {
                table.add_row(row![
                    s.id,
                    s.kind,
                    s.created_at.format("%d/%m/%Y %H:%M"),
                    s.params
                ]);
            }
            table.printstd();
        }
        HistorySubcommand::Feedback {
            rating,
            comment,
            message,
        } => {
            store.create_user(user, None, None).await?;
            let id = store
                .save_feedback(user, message, rating, comment.as_deref())
                .await?;
            output::success(&format!("Obrigado! Avaliação #{id} registrada"));
        }
        HistorySubcommand::Stats => {
            let stats = store.feedback_stats().await?;
            output::header("Feedback");
            output::field("avaliações", stats.total);
            if let Some(avg) = stats.average {
                output::field("média", format!("{avg:.2}"));
            }
            if let (Some(min), Some(max)) = (stats.min, stats.max) {
                output::field("mín / máx", format!("{min} / {max}"));
            }
        }
        HistorySubcommand::Profile { name, email } => {
            if let Some(email) = &email {
                ensure_valid("email", email, validate_email(email))?;
            }
            let created = store
                .create_user(user, name.as_deref(), email.as_deref())
                .await?;
            if created {
                output::success(&format!("Usuário {user} criado"));
            }
            if let Some(profile) = store.get_user(user).await? {
                output::header(&profile.user_id);
                if let Some(name) = &profile.name {
                    output::field("nome", name);
                }
                if let Some(email) = &profile.email {
                    output::field("email", email);
                }
                output::field("desde", profile.created_at.format("%d/%m/%Y"));
            }
        }
        HistorySubcommand::Prefs { values } => {
            if values.is_empty() {
                let prefs = store.preferences(user).await?;
                if prefs.is_empty() {
                    output::failure("Nenhuma preferência salva");
                }
                for (key, value) in prefs {
                    output::field(&key, value);
                }
                return Ok(());
            }
            let mut prefs: BTreeMap<String, Value> = store.preferences(user).await?;
            for raw in &values {
                let (key, value) = parse_preference(raw)?;
                prefs.insert(key, value);
            }
            store.create_user(user, None, None).await?;
            store.save_preferences(user, &prefs).await?;
            output::success(&format!("{} preferências salvas", values.len()));
        }
        HistorySubcommand::Session { file } => show_session(&file)?,
        HistorySubcommand::Forget { yes } => {
            if !yes {
                bail!("Use --yes para confirmar a exclusão de todos os dados de {user}");
            }
            let mut report = store.erase_user(user).await?;
            report.session_files = erase_snapshots(sessions, user)?;
            output::success(&format!(
                "Dados de {user} apagados: {} registros ({} mensagens, {} simulações, {} avaliações, {} sessões salvas)",
                report.total(),
                report.messages,
                report.simulations,
                report.feedback,
                report.session_files
            ));
        }
    }
    Ok(())
}

fn show_session(file: &Path) -> Result<()> {
    let context = ConversationContext::load_from_file(file)?;
    let summary = context.summary();
    output::header(&format!("Sessão {}", context.session_id));
    output::field("usuário", &summary.user_id);
    output::field("início", context.session_start.format("%d/%m/%Y %H:%M"));
    output::field("mensagens", summary.total_messages);
    output::field(
        "usuário / assistente",
        format!("{} / {}", summary.user_messages, summary.assistant_messages),
    );
    for m in context.recent(4) {
        println!("  {} {}", format!("{}:", m.role).dimmed(), m.content);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_preference_keeps_json_types() {
        assert_eq!(
            parse_preference("perfil=moderado").unwrap(),
            ("perfil".to_string(), Value::String("moderado".into()))
        );
        assert_eq!(
            parse_preference("limite = 1500").unwrap().1,
            serde_json::json!(1500)
        );
        assert!(parse_preference("=x").is_err());
    }

    #[tokio::test]
    async fn test_forget_requires_confirmation() {
        let store = HistoryStore::in_memory().await.unwrap();
        store.create_user("ana", None, None).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let snapshot = ConversationContext::new("ana").save_to_dir(dir.path()).unwrap();

        let refused =
            handle(&store, dir.path(), "ana", HistorySubcommand::Forget { yes: false }).await;
        assert!(refused.is_err());
        assert!(store.get_user("ana").await.unwrap().is_some());
        assert!(snapshot.exists());

        handle(&store, dir.path(), "ana", HistorySubcommand::Forget { yes: true })
            .await
            .unwrap();
        assert!(store.get_user("ana").await.unwrap().is_none());
        assert!(!snapshot.exists());
    }

    #[tokio::test]
    async fn test_prefs_merge_with_existing() {
        let store = HistoryStore::in_memory().await.unwrap();
        handle(
            &store,
            Path::new("sessions"),
            "ana",
            HistorySubcommand::Prefs {
                values: vec!["perfil=moderado".into()],
            },
        )
        .await
        .unwrap();
        handle(
            &store,
            Path::new("sessions"),
            "ana",
            HistorySubcommand::Prefs {
                values: vec!["idioma=pt".into()],
            },
        )
        .await
        .unwrap();

        let prefs = store.preferences("ana").await.unwrap();
        assert_eq!(prefs.len(), 2);
        assert_eq!(prefs["perfil"], "moderado");
    }
}
