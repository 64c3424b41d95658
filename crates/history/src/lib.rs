//! Persistence for users, chat history, preferences, saved simulations and
//! feedback (SQLite), plus the in-memory conversation context.

pub mod context;
pub mod store;
pub mod types;

pub use context::{erase_snapshots, ContextMessage, ConversationContext, SessionSummary};
pub use store::HistoryStore;
pub use types::*;
