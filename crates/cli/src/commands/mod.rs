pub mod analyze;
pub mod calc;
pub mod chat;
pub mod config;
pub mod faq;
pub mod history;
pub mod products;
pub mod validate;

pub use analyze::AnalyzeCommand;
pub use calc::CalcCommand;
pub use chat::ChatCommand;
pub use config::ConfigCommand;
pub use faq::FaqCommand;
pub use history::HistoryCommand;
pub use products::ProductsCommand;
pub use validate::ValidateCommand;
