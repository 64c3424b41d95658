use crate::{ChatMessage, LlmClient};
use async_trait::async_trait;
use common::FinanceResult;
use std::collections::BTreeMap;
use tracing::{debug, warn};

pub const DEFAULT_MAX_HISTORY: usize = 20;

pub const BASE_SYSTEM_PROMPT: &str = "Você é um assistente financeiro inteligente do Bradesco.
Seu objetivo é ajudar clientes com dúvidas sobre produtos bancários,
investimentos, financiamentos e serviços financeiros em geral.

Seja profissional, educado e forneça informações precisas.
Quando apropriado, sugira produtos e serviços relevantes.";

/// Anything that can answer a role-tagged conversation
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn chat(&self, messages: &[ChatMessage]) -> FinanceResult<String>;

    fn name(&self) -> String;
}

#[async_trait]
impl ChatBackend for LlmClient {
    async fn chat(&self, messages: &[ChatMessage]) -> FinanceResult<String> {
        LlmClient::chat(self, messages).await
    }

    fn name(&self) -> String {
        self.provider_label()
    }
}

/// Финансовый чат-бот поверх любого бэкенда.
///
/// Each turn sends the system prompt, the kept history and the new user
/// message. Both turns enter the history only when the backend answers.
pub struct FinancialChatbot<B: ChatBackend> {
    backend: B,
    history: Vec<ChatMessage>,
    max_history: usize,
}

impl<B: ChatBackend> FinancialChatbot<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            history: Vec::new(),
            max_history: DEFAULT_MAX_HISTORY,
        }
    }

    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Seed the history, e.g. from a stored session
    pub fn load_history(&mut self, messages: Vec<ChatMessage>) {
        self.history = messages.into_iter().filter(|m| !m.is_system()).collect();
        self.trim_history();
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn build_system_prompt(context: Option<&BTreeMap<String, String>>) -> String {
        let mut prompt = BASE_SYSTEM_PROMPT.to_string();
        if let Some(context) = context.filter(|c| !c.is_empty()) {
            prompt.push_str("\n\nContexto adicional:");
            for (key, value) in context {
                prompt.push_str(&format!("\n- {key}: {value}"));
            }
        }
        prompt
    }

    pub async fn respond(
        &mut self,
        user_message: &str,
        context: Option<&BTreeMap<String, String>>,
    ) -> FinanceResult<String> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(ChatMessage::system(&Self::build_system_prompt(context)));
        messages.extend(self.history.iter().cloned());
        messages.push(ChatMessage::user(user_message));

        let reply = match self.backend.chat(&messages).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(backend = %self.backend.name(), error = %e, "Chat request failed");
                return Err(e);
            }
        };

        self.history.push(ChatMessage::user(user_message));
        self.history.push(ChatMessage::assistant(&reply));
        self.trim_history();
        debug!(history = self.history.len(), "Chat turn recorded");

        Ok(reply)
    }

    fn trim_history(&mut self) {
        if self.history.len() > self.max_history {
            let excess = self.history.len() - self.max_history;
            self.history.drain(..excess);
        }
    }
}
