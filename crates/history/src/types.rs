use chrono::{DateTime, Utc};
use common::ValidationError;
use serde::{Deserialize, Serialize};

/// Автор сообщения в диалоге
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::System => write!(f, "system"),
        }
    }
}

impl std::str::FromStr for MessageRole {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            "system" => Ok(MessageRole::System),
            _ => Err(ValidationError::InvalidField {
                field: "role".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Сообщение, сохранённое в истории
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: i64,
    pub user_id: String,
    pub session_id: String,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// A persisted calculator run with its inputs and outputs as JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRecord {
    pub id: i64,
    pub user_id: String,
    pub kind: String,
    pub params: serde_json::Value,
    pub result: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackStats {
    pub total: u64,
    /// `None` while no feedback has been recorded
    pub average: Option<f64>,
    pub min: Option<i64>,
    pub max: Option<i64>,
}

/// Rows removed by an erasure request, per table, plus session snapshot files
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErasureReport {
    pub users: usize,
    pub messages: usize,
    pub preferences: usize,
    pub simulations: usize,
    pub feedback: usize,
    #[serde(default)]
    pub session_files: usize,
}

impl ErasureReport {
    pub fn total(&self) -> usize {
        self.users
            + self.messages
            + self.preferences
            + self.simulations
            + self.feedback
            + self.session_files
    }
}
