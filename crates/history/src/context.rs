use crate::types::MessageRole;
use chrono::{DateTime, Utc};
use common::FinanceResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Keeps ids usable as a single file name component: no separators, no `..` escape
fn file_safe(id: &str) -> String {
    let safe: String = id
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '@' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect();
    if safe.is_empty() || safe.chars().all(|c| c == '.') {
        safe.replace('.', "-") + "user"
    } else {
        safe
    }
}

/// Удаляет все снапшоты сессий пользователя из `dir`; returns how many were removed.
///
/// Ownership is decided by the `user_id` stored inside each snapshot, so
/// sanitised file names that collide never remove another user's session.
pub fn erase_snapshots<P: AsRef<Path>>(dir: P, user_id: &str) -> FinanceResult<usize> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Ok(0);
    }

    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        match ConversationContext::load_from_file(&path) {
            Ok(ctx) if ctx.user_id == user_id => {
                fs::remove_file(&path)?;
                removed += 1;
            }
            Ok(_) => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable session file"),
        }
    }
    debug!(user_id, removed, "Session snapshots erased");
    Ok(removed)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextMessage {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub user_id: String,
    pub session_duration_minutes: f64,
    pub total_messages: usize,
    pub user_messages: usize,
    pub assistant_messages: usize,
    pub preferences_set: usize,
    pub context_items: usize,
}

/// Контекст одной сессии: сообщения, предпочтения и произвольные данные.
///
/// Lives in memory and can be snapshotted to a JSON file per session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationContext {
    pub user_id: String,
    pub session_id: String,
    pub session_start: DateTime<Utc>,
    #[serde(default)]
    pub messages: Vec<ContextMessage>,
    #[serde(default)]
    pub preferences: BTreeMap<String, Value>,
    #[serde(default)]
    pub context_data: BTreeMap<String, Value>,
}

impl ConversationContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: Uuid::new_v4().to_string(),
            session_start: Utc::now(),
            messages: Vec::new(),
            preferences: BTreeMap::new(),
            context_data: BTreeMap::new(),
        }
    }

    pub fn with_session(user_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            ..Self::new(user_id)
        }
    }

    pub fn add_message(
        &mut self,
        role: MessageRole,
        content: impl Into<String>,
        metadata: Option<BTreeMap<String, Value>>,
    ) {
        self.messages.push(ContextMessage {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            metadata: metadata.unwrap_or_default(),
        });
    }

    /// Последние `count` сообщений в хронологическом порядке
    pub fn recent(&self, count: usize) -> &[ContextMessage] {
        let start = self.messages.len().saturating_sub(count);
        &self.messages[start..]
    }

    pub fn set_preference(&mut self, key: impl Into<String>, value: Value) {
        self.preferences.insert(key.into(), value);
    }

    pub fn get_preference(&self, key: &str) -> Option<&Value> {
        self.preferences.get(key)
    }

    pub fn update_context(&mut self, key: impl Into<String>, value: Value) {
        self.context_data.insert(key.into(), value);
    }

    pub fn get_context(&self, key: &str) -> Option<&Value> {
        self.context_data.get(key)
    }

    pub fn clear_history(&mut self) {
        self.messages.clear();
    }

    pub fn session_duration_minutes(&self) -> f64 {
        (Utc::now() - self.session_start).num_milliseconds() as f64 / 60_000.0
    }

    /// `<user>_<yyyymmdd_HHMMSS>.json`, with path separators in the user id replaced
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}.json",
            file_safe(&self.user_id),
            self.session_start.format("%Y%m%d_%H%M%S")
        )
    }

    /// Writes the snapshot into `dir`, creating it, and returns the file path.
    pub fn save_to_dir<P: AsRef<Path>>(&self, dir: P) -> FinanceResult<PathBuf> {
        fs::create_dir_all(dir.as_ref())?;
        let path = dir.as_ref().join(self.file_name());
        fs::write(&path, serde_json::to_string_pretty(self)?)?;
        debug!(path = %path.display(), messages = self.messages.len(), "Session saved");
        Ok(path)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> FinanceResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn summary(&self) -> SessionSummary {
        let count = |role: MessageRole| self.messages.iter().filter(|m| m.role == role).count();
        SessionSummary {
            user_id: self.user_id.clone(),
            session_duration_minutes: self.session_duration_minutes(),
            total_messages: self.messages.len(),
            user_messages: count(MessageRole::User),
            assistant_messages: count(MessageRole::Assistant),
            preferences_set: self.preferences.len(),
            context_items: self.context_data.len(),
        }
    }
}
