//! finassist CLI library
//!
//! Command implementations and the shared application context used by the
//! `finassist` binary.

pub mod commands;
pub mod context;
pub mod output;

pub use context::AppContext;
