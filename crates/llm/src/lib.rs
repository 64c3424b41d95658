use common::{ChatbotError, FinanceResult};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::{debug, error, info};

pub mod chatbot;

pub use chatbot::{ChatBackend, FinancialChatbot, BASE_SYSTEM_PROMPT, DEFAULT_MAX_HISTORY};

const OPENAI_BASE: &str = "https://api.openai.com/v1";
const GEMINI_BASE: &str = "https://generativelanguage.googleapis.com";
const ANTHROPIC_BASE: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-pro";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-haiku-20240307";
pub const DEFAULT_LOCAL_URL: &str = "http://localhost:1234/v1";
pub const DEFAULT_LOCAL_MODEL: &str = "llama-3.2-3b-instruct";

/// Names accepted in `LLM_PROVIDER` and in the configuration file
pub const SUPPORTED_PROVIDERS: [&str; 4] = ["openai", "gemini", "anthropic", "local"];

#[derive(Debug, Clone)]
pub enum LlmProvider {
    OpenAI { api_key: String, model: String },
    Gemini { api_key: String, model: String },
    Anthropic { api_key: String, model: String },
    Local { url: String, model: String },
}

fn required_env(var: &str, provider: &str) -> FinanceResult<String> {
    env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ChatbotError::MissingApiKey(format!("{provider} ({var})")).into())
}

impl LlmProvider {
    /// Собрать провайдера по имени; ключи берутся из окружения.
    ///
    /// `model` overrides the provider's model variable and default.
    pub fn from_env_for(name: &str, model: Option<&str>) -> FinanceResult<Self> {
        let pick_model = |var: &str, default: &str| {
            model
                .map(str::to_string)
                .or_else(|| env::var(var).ok())
                .unwrap_or_else(|| default.to_string())
        };

        let provider = match name.trim().to_lowercase().as_str() {
            "openai" => LlmProvider::OpenAI {
                api_key: required_env("OPENAI_API_KEY", "OpenAI")?,
                model: pick_model("OPENAI_MODEL", DEFAULT_OPENAI_MODEL),
            },
            "gemini" | "google" => LlmProvider::Gemini {
                api_key: required_env("GOOGLE_API_KEY", "Gemini")?,
                model: pick_model("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
            },
            "anthropic" => LlmProvider::Anthropic {
                api_key: required_env("ANTHROPIC_API_KEY", "Anthropic")?,
                model: pick_model("ANTHROPIC_MODEL", DEFAULT_ANTHROPIC_MODEL),
            },
            "local" => LlmProvider::Local {
                url: env::var("LOCAL_LLM_URL").unwrap_or_else(|_| DEFAULT_LOCAL_URL.to_string()),
                model: pick_model("LOCAL_LLM_MODEL", DEFAULT_LOCAL_MODEL),
            },
            other => return Err(ChatbotError::UnsupportedProvider(other.to_string()).into()),
        };
        Ok(provider)
    }

    pub fn name(&self) -> &'static str {
        match self {
            LlmProvider::OpenAI { .. } => "OpenAI",
            LlmProvider::Gemini { .. } => "Gemini",
            LlmProvider::Anthropic { .. } => "Anthropic",
            LlmProvider::Local { .. } => "Local",
        }
    }

    pub fn model(&self) -> &str {
        match self {
            LlmProvider::OpenAI { model, .. }
            | LlmProvider::Gemini { model, .. }
            | LlmProvider::Anthropic { model, .. }
            | LlmProvider::Local { model, .. } => model,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: content.to_string(),
        }
    }

    pub fn assistant(content: &str) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.to_string(),
        }
    }

    pub fn system(content: &str) -> Self {
        Self {
            role: "system".to_string(),
            content: content.to_string(),
        }
    }

    pub fn is_system(&self) -> bool {
        self.role == "system"
    }
}

// OpenAI-compatible API types
#[derive(Debug, Serialize)]
struct OpenAIChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OpenAIChatResponse {
    #[serde(default)]
    choices: Vec<OpenAIChatChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChatChoice {
    message: ChatMessage,
}

// Gemini API types
#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

// Anthropic API types
#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<&'a ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    text: String,
}

/// Joins every system message into one block, for APIs that take it apart
fn system_text(messages: &[ChatMessage]) -> Option<String> {
    let parts: Vec<&str> = messages
        .iter()
        .filter(|m| m.is_system())
        .map(|m| m.content.as_str())
        .collect();
    (!parts.is_empty()).then(|| parts.join("\n\n"))
}

fn transport(err: reqwest::Error) -> common::FinanceError {
    ChatbotError::Transport(err.to_string()).into()
}

/// HTTP клиент к выбранному LLM провайдеру
#[derive(Clone)]
pub struct LlmClient {
    provider: LlmProvider,
    client: reqwest::Client,
    max_tokens: u32,
    temperature: f32,
    base_url: Option<String>,
}

impl LlmClient {
    pub fn new(provider: LlmProvider, max_tokens: u32, temperature: f32) -> Self {
        Self {
            provider,
            client: reqwest::Client::new(),
            max_tokens,
            temperature,
            base_url: None,
        }
    }

    /// Point a hosted provider at another endpoint (proxies, test servers)
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = Some(url.trim_end_matches('/').to_string());
        self
    }

    pub fn from_env() -> FinanceResult<Self> {
        dotenv::dotenv().ok(); // Загружаем .env если есть

        let provider_type = env::var("LLM_PROVIDER").unwrap_or_else(|_| "openai".to_string());
        let max_tokens = env::var("MAX_TOKENS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(1000);
        let temperature = env::var("TEMPERATURE")
            .ok()
            .and_then(|v| v.parse::<f32>().ok())
            .unwrap_or(0.7);

        let provider = LlmProvider::from_env_for(&provider_type, None)?;
        Ok(Self::new(provider, max_tokens, temperature))
    }

    pub fn provider(&self) -> &LlmProvider {
        &self.provider
    }

    /// Get provider name for display
    pub fn provider_label(&self) -> String {
        format!("{} ({})", self.provider.name(), self.provider.model())
    }

    /// Отправить полный список сообщений и получить ответ ассистента
    pub async fn chat(&self, messages: &[ChatMessage]) -> FinanceResult<String> {
        info!(
            provider = self.provider.name(),
            model = self.provider.model(),
            messages = messages.len(),
            "Sending chat request"
        );

        match &self.provider {
            LlmProvider::OpenAI { api_key, model } => {
                let base = self.base_url.as_deref().unwrap_or(OPENAI_BASE);
                self.openai_compatible("OpenAI", base, Some(api_key), model, messages)
                    .await
            }
            LlmProvider::Local { url, model } => {
                // Нормализуем базовый endpoint: убираем завершающее "/" и необязательный "/v1"
                let url = self.base_url.as_deref().unwrap_or(url);
                let base = url.trim_end_matches('/');
                let base = base.strip_suffix("/v1").unwrap_or(base);
                self.openai_compatible("Local", base, None, model, messages)
                    .await
            }
            LlmProvider::Gemini { api_key, model } => {
                self.gemini_chat(api_key, model, messages).await
            }
            LlmProvider::Anthropic { api_key, model } => {
                self.anthropic_chat(api_key, model, messages).await
            }
        }
    }

    async fn check_status(
        provider: &str,
        response: reqwest::Response,
    ) -> FinanceResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        error!(provider, status = status.as_u16(), "LLM API error: {}", message);
        Err(ChatbotError::Provider {
            provider: provider.to_string(),
            status: status.as_u16(),
            message,
        }
        .into())
    }

    async fn openai_compatible(
        &self,
        provider: &str,
        base: &str,
        api_key: Option<&String>,
        model: &str,
        messages: &[ChatMessage],
    ) -> FinanceResult<String> {
        let request = OpenAIChatRequest {
            model,
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let mut builder = self
            .client
            .post(format!("{base}/chat/completions"))
            .header("Content-Type", "application/json")
            .json(&request);
        if let Some(key) = api_key {
            builder = builder.header("Authorization", format!("Bearer {key}"));
        }

        let response = builder.send().await.map_err(transport)?;
        let response = Self::check_status(provider, response).await?;
        let chat_response: OpenAIChatResponse = response.json().await.map_err(transport)?;

        match chat_response.choices.into_iter().next() {
            Some(choice) => {
                debug!(provider, chars = choice.message.content.len(), "Response received");
                Ok(choice.message.content)
            }
            None => Err(ChatbotError::EmptyResponse(provider.to_string()).into()),
        }
    }

    async fn gemini_chat(
        &self,
        api_key: &str,
        model: &str,
        messages: &[ChatMessage],
    ) -> FinanceResult<String> {
        let contents = messages
            .iter()
            .filter(|m| !m.is_system())
            .map(|m| GeminiContent {
                role: Some(if m.role == "assistant" { "model" } else { "user" }.to_string()),
                parts: vec![GeminiPart {
                    text: m.content.clone(),
                }],
            })
            .collect();

        let request = GeminiRequest {
            contents,
            system_instruction: system_text(messages).map(|text| GeminiContent {
                role: None,
                parts: vec![GeminiPart { text }],
            }),
            generation_config: GeminiGenerationConfig {
                max_output_tokens: self.max_tokens,
                temperature: self.temperature,
            },
        };

        let base = self.base_url.as_deref().unwrap_or(GEMINI_BASE);
        let response = self
            .client
            .post(format!("{base}/v1beta/models/{model}:generateContent"))
            .query(&[("key", api_key)])
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(transport)?;
        let response = Self::check_status("Gemini", response).await?;
        let gemini_response: GeminiResponse = response.json().await.map_err(transport)?;

        gemini_response
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .map(|p| p.text)
            .next()
            .ok_or_else(|| ChatbotError::EmptyResponse("Gemini".to_string()).into())
    }

    async fn anthropic_chat(
        &self,
        api_key: &str,
        model: &str,
        messages: &[ChatMessage],
    ) -> FinanceResult<String> {
        let request = AnthropicRequest {
            model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system: system_text(messages),
            messages: messages.iter().filter(|m| !m.is_system()).collect(),
        };

        let base = self.base_url.as_deref().unwrap_or(ANTHROPIC_BASE);
        let response = self
            .client
            .post(format!("{base}/v1/messages"))
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(transport)?;
        let response = Self::check_status("Anthropic", response).await?;
        let anthropic_response: AnthropicResponse = response.json().await.map_err(transport)?;

        anthropic_response
            .content
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or_else(|| ChatbotError::EmptyResponse("Anthropic".to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_text_joins_blocks() {
        let messages = vec![
            ChatMessage::system("a"),
            ChatMessage::user("oi"),
            ChatMessage::system("b"),
        ];
        assert_eq!(system_text(&messages).as_deref(), Some("a\n\nb"));
        assert!(system_text(&[ChatMessage::user("oi")]).is_none());
    }

    #[test]
    fn test_unknown_provider() {
        let err = LlmProvider::from_env_for("watson", None).unwrap_err();
        assert!(err.to_string().contains("watson"));
    }

    #[test]
    fn test_local_provider_needs_no_key() {
        let provider = LlmProvider::from_env_for("local", Some("qwen")).unwrap();
        assert_eq!(provider.name(), "Local");
        assert_eq!(provider.model(), "qwen");
    }
}
