use crate::types::*;
use chrono::{DateTime, Utc};
use common::{DatabaseError, FinanceResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT UNIQUE NOT NULL,
        name TEXT,
        email TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL,
        session_id TEXT NOT NULL,
        role TEXT NOT NULL,
        content TEXT NOT NULL,
        timestamp TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS preferences (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT UNIQUE NOT NULL,
        preferences_json TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS simulations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL,
        kind TEXT NOT NULL,
        params_json TEXT NOT NULL,
        result_json TEXT NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS feedback (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL,
        message_id INTEGER,
        rating INTEGER NOT NULL,
        comment TEXT,
        created_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_messages_user_session ON messages(user_id, session_id);
    CREATE INDEX IF NOT EXISTS idx_simulations_user ON simulations(user_id, kind);
"#;

/// Maps driver errors into the shared database error category
trait SqlResultExt<T> {
    fn db(self) -> FinanceResult<T>;
}

impl<T> SqlResultExt<T> for rusqlite::Result<T> {
    fn db(self) -> FinanceResult<T> {
        self.map_err(|e| DatabaseError::Query(e.to_string()).into())
    }
}

fn to_json<T: Serialize>(value: &T) -> FinanceResult<String> {
    serde_json::to_string(value).map_err(|e| DatabaseError::Serialization(e.to_string()).into())
}

fn from_json<T: serde::de::DeserializeOwned>(text: &str) -> FinanceResult<T> {
    serde_json::from_str(text).map_err(|e| DatabaseError::Serialization(e.to_string()).into())
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

/// SQLite хранилище истории диалогов, настроек и симуляций
pub struct HistoryStore {
    conn: Arc<Mutex<Connection>>,
}

impl HistoryStore {
    /// Открыть (или создать) базу по пути
    pub async fn new<P: AsRef<Path>>(path: P) -> FinanceResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| DatabaseError::Open(format!("{}: {e}", path.display())))?;
        Self::with_connection(conn)
    }

    pub async fn in_memory() -> FinanceResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| DatabaseError::Open(e.to_string()))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> FinanceResult<Self> {
        conn.execute_batch(SCHEMA).db()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    // === Пользователи ===

    /// Returns `false` when the user already exists.
    pub async fn create_user(
        &self,
        user_id: &str,
        name: Option<&str>,
        email: Option<&str>,
    ) -> FinanceResult<bool> {
        let now = Utc::now();
        let conn = self.conn.lock().await;
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO users (user_id, name, email, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![user_id, name, email, now],
            )
            .db()?;

        if inserted == 1 {
            info!(user_id, "User created");
        }
        Ok(inserted == 1)
    }

    pub async fn get_user(&self, user_id: &str) -> FinanceResult<Option<UserProfile>> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT user_id, name, email, created_at, updated_at FROM users WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok(UserProfile {
                    user_id: row.get(0)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                    created_at: row.get(3)?,
                    updated_at: row.get(4)?,
                })
            },
        )
        .optional()
        .db()
    }

    // === Сообщения ===

    pub async fn save_message(
        &self,
        user_id: &str,
        session_id: &str,
        role: MessageRole,
        content: &str,
    ) -> FinanceResult<i64> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO messages (user_id, session_id, role, content, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![user_id, session_id, role.to_string(), content, Utc::now()],
        )
        .db()?;
        let id = conn.last_insert_rowid();
        debug!(user_id, session_id, id, %role, "Message saved");
        Ok(id)
    }

    /// Последние `limit` сообщений, от старых к новым
    pub async fn history(
        &self,
        user_id: &str,
        session_id: Option<&str>,
        limit: usize,
    ) -> FinanceResult<Vec<StoredMessage>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, session_id, role, content, timestamp
                 FROM messages
                 WHERE user_id = ?1 AND (?2 IS NULL OR session_id = ?2)
                 ORDER BY id DESC LIMIT ?3",
            )
            .db()?;

        let mut messages = stmt
            .query_map(params![user_id, session_id, limit as i64], |row| {
                let role: String = row.get(3)?;
                Ok(StoredMessage {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    session_id: row.get(2)?,
                    role: role.parse().map_err(|e| conversion_error(3, e))?,
                    content: row.get(4)?,
                    timestamp: row.get(5)?,
                })
            })
            .db()?
            .collect::<Result<Vec<_>, _>>()
            .db()?;

        messages.reverse();
        Ok(messages)
    }

    /// Deletes a user's messages, optionally only one session. Returns the count.
    pub async fn clear_history(
        &self,
        user_id: &str,
        session_id: Option<&str>,
    ) -> FinanceResult<usize> {
        let conn = self.conn.lock().await;
        let deleted = conn
            .execute(
                "DELETE FROM messages WHERE user_id = ?1 AND (?2 IS NULL OR session_id = ?2)",
                params![user_id, session_id],
            )
            .db()?;
        info!(user_id, session_id, deleted, "History cleared");
        Ok(deleted)
    }

    // === Настройки ===

    pub async fn save_preferences(
        &self,
        user_id: &str,
        preferences: &BTreeMap<String, Value>,
    ) -> FinanceResult<()> {
        let json = to_json(preferences)?;
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO preferences (user_id, preferences_json, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
                 preferences_json = excluded.preferences_json,
                 updated_at = excluded.updated_at",
            params![user_id, json, Utc::now()],
        )
        .db()?;
        Ok(())
    }

    /// Empty map when the user never saved preferences
    pub async fn preferences(&self, user_id: &str) -> FinanceResult<BTreeMap<String, Value>> {
        let json: Option<String> = {
            let conn = self.conn.lock().await;
            conn.query_row(
                "SELECT preferences_json FROM preferences WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()
            .db()?
        };

        match json {
            Some(text) => from_json(&text),
            None => Ok(BTreeMap::new()),
        }
    }

    // === Симуляции ===

    pub async fn save_simulation<P: Serialize, R: Serialize>(
        &self,
        user_id: &str,
        kind: &str,
        params: &P,
        result: &R,
    ) -> FinanceResult<i64> {
        let params_json = to_json(params)?;
        let result_json = to_json(result)?;

        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO simulations (user_id, kind, params_json, result_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![user_id, kind, params_json, result_json, Utc::now()],
        )
        .db()?;
        let id = conn.last_insert_rowid();
        debug!(user_id, kind, id, "Simulation saved");
        Ok(id)
    }

    /// Newest first, optionally filtered by kind
    pub async fn simulations(
        &self,
        user_id: &str,
        kind: Option<&str>,
        limit: usize,
    ) -> FinanceResult<Vec<SimulationRecord>> {
        type RawSimulation = (i64, String, String, String, String, DateTime<Utc>);

        let rows: Vec<RawSimulation> = {
            let conn = self.conn.lock().await;
            let mut stmt = conn
                .prepare(
                    "SELECT id, user_id, kind, params_json, result_json, created_at
                     FROM simulations
                     WHERE user_id = ?1 AND (?2 IS NULL OR kind = ?2)
                     ORDER BY id DESC LIMIT ?3",
                )
                .db()?;
            let rows = stmt
                .query_map(params![user_id, kind, limit as i64], |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                    ))
                })
                .db()?
                .collect::<Result<Vec<_>, _>>()
                .db()?;
            rows
        };

        rows.into_iter()
            .map(|(id, user_id, kind, params_json, result_json, created_at)| {
                Ok(SimulationRecord {
                    id,
                    user_id,
                    kind,
                    params: from_json(&params_json)?,
                    result: from_json(&result_json)?,
                    created_at,
                })
            })
            .collect()
    }

    // === Обратная связь ===

    pub async fn save_feedback(
        &self,
        user_id: &str,
        message_id: Option<i64>,
        rating: i64,
        comment: Option<&str>,
    ) -> FinanceResult<i64> {
        if !(1..=5).contains(&rating) {
            return Err(DatabaseError::InvalidRating(rating).into());
        }

        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO feedback (user_id, message_id, rating, comment, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![user_id, message_id, rating, comment, Utc::now()],
        )
        .db()?;
        Ok(conn.last_insert_rowid())
    }

    pub async fn feedback_stats(&self) -> FinanceResult<FeedbackStats> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT COUNT(*), AVG(rating), MIN(rating), MAX(rating) FROM feedback",
            [],
            |row| {
                Ok(FeedbackStats {
                    total: row.get::<_, i64>(0)? as u64,
                    average: row.get(1)?,
                    min: row.get(2)?,
                    max: row.get(3)?,
                })
            },
        )
        .db()
    }

    /// Удалить все данные пользователя (LGPD)
    pub async fn erase_user(&self, user_id: &str) -> FinanceResult<ErasureReport> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction().db()?;

        let report = ErasureReport {
            feedback: tx
                .execute("DELETE FROM feedback WHERE user_id = ?1", params![user_id])
                .db()?,
            simulations: tx
                .execute("DELETE FROM simulations WHERE user_id = ?1", params![user_id])
                .db()?,
            preferences: tx
                .execute("DELETE FROM preferences WHERE user_id = ?1", params![user_id])
                .db()?,
            messages: tx
                .execute("DELETE FROM messages WHERE user_id = ?1", params![user_id])
                .db()?,
            users: tx
                .execute("DELETE FROM users WHERE user_id = ?1", params![user_id])
                .db()?,
            session_files: 0,
        };

        tx.commit().db()?;
        info!(user_id, rows = report.total(), "User data erased");
        Ok(report)
    }
}
