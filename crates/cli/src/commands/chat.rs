use crate::output;
use crate::AppContext;
use anyhow::Result;
use clap::Args;
use colored::*;
use common::OperationTimer;
use history::{ConversationContext, HistoryStore, MessageRole, StoredMessage};
use llm::{ChatBackend, ChatMessage, FinancialChatbot, DEFAULT_MAX_HISTORY};
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use tracing::{info, warn};

#[derive(Debug, Args)]
pub struct ChatCommand {
    /// Mensagem única (sem ela abre o modo interativo)
    message: Option<String>,

    /// Continuar uma sessão existente
    #[arg(long)]
    session: Option<String>,

    /// Usuário (padrão: user.default_user)
    #[arg(short, long)]
    user: Option<String>,

    /// Contexto adicional para o prompt, formato chave=valor
    #[arg(long = "context", value_parser = parse_key_value)]
    context: Vec<(String, String)>,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))
}

impl ChatCommand {
    pub async fn execute(self, ctx: &AppContext) -> Result<()> {
        let user = ctx.resolve_user(self.user.as_deref());
        let store = ctx.open_store().await?;
        store.create_user(&user, None, None).await?;

        let mut conversation = match &self.session {
            Some(id) => ConversationContext::with_session(&user, id),
            None => ConversationContext::new(&user),
        };
        let session_id = conversation.session_id.clone();

        let mut chatbot = FinancialChatbot::new(ctx.llm_client()?);
        if self.session.is_some() {
            let previous = store
                .history(&user, Some(&session_id), DEFAULT_MAX_HISTORY)
                .await?;
            chatbot.load_history(previous.iter().map(to_chat_message).collect());
        }

        let extra: BTreeMap<String, String> = self.context.into_iter().collect();
        let mut session = ChatSession {
            chatbot,
            store: &store,
            conversation: &mut conversation,
            user: &user,
            session_id: &session_id,
            extra,
        };

        match self.message {
            Some(message) => {
                let reply = session.turn(&message).await?;
                println!("{}", reply);
            }
            None => session.interactive().await?,
        }

        if !conversation.messages.is_empty() {
            let dir = ctx.config().storage.sessions_path();
            match conversation.save_to_dir(&dir) {
                Ok(path) => info!(path = %path.display(), "Session context saved"),
                Err(e) => warn!(error = %e, "Failed to save session context"),
            }
        }
        Ok(())
    }
}

fn to_chat_message(message: &StoredMessage) -> ChatMessage {
    match message.role {
        MessageRole::User => ChatMessage::user(&message.content),
        MessageRole::Assistant => ChatMessage::assistant(&message.content),
        MessageRole::System => ChatMessage::system(&message.content),
    }
}

struct ChatSession<'a, B: ChatBackend> {
    chatbot: FinancialChatbot<B>,
    store: &'a HistoryStore,
    conversation: &'a mut ConversationContext,
    user: &'a str,
    session_id: &'a str,
    extra: BTreeMap<String, String>,
}

impl<B: ChatBackend> ChatSession<'_, B> {
    /// Один обмен сообщениями; оба сообщения сохраняются только при успешном ответе
    async fn turn(&mut self, message: &str) -> Result<String> {
        let context = (!self.extra.is_empty()).then_some(&self.extra);
        let mut timer = OperationTimer::new("chat_turn");
        timer.add_field("session_id", self.session_id);
        let result = self.chatbot.respond(message, context).await;
        timer.finish_with_result(&result);
        let reply = result?;

        self.store
            .save_message(self.user, self.session_id, MessageRole::User, message)
            .await?;
        self.store
            .save_message(self.user, self.session_id, MessageRole::Assistant, &reply)
            .await?;
        self.conversation.add_message(MessageRole::User, message, None);
        self.conversation.add_message(MessageRole::Assistant, &reply, None);
        Ok(reply)
    }

    async fn interactive(&mut self) -> Result<()> {
        println!(
            "{} {} ({})",
            "[AI]".cyan().bold(),
            "Assistente financeiro".bold(),
            self.chatbot.backend().name().dimmed()
        );
        println!(
            "{}",
            "Digite sua pergunta. /clear limpa o contexto, /exit encerra.".dimmed()
        );
        println!("{} {}", "sessão:".dimmed(), self.session_id.dimmed());

        let stdin = io::stdin();
        let mut lines = stdin.lock().lines();
        loop {
            print!("\n{} ", "[►]".green().bold());
            io::stdout().flush()?;

            let line = match lines.next() {
                Some(line) => line?,
                None => break,
            };
            let input = line.trim();
            match input {
                "" => continue,
                "/exit" | "/quit" | "sair" => break,
                "/clear" => {
                    self.chatbot.clear_history();
                    self.conversation.clear_history();
                    output::success("Contexto da conversa limpo");
                    continue;
                }
                _ => {}
            }

            match self.turn(input).await {
                Ok(reply) => println!("{} {}", "[AI]".cyan().bold(), reply),
                Err(e) => output::failure(&format!("Erro ao processar mensagem: {e:#}")),
            }
        }

        println!("{}", "Até logo!".dimmed());
        Ok(())
    }
}
