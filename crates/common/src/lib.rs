pub mod errors;
pub mod formatters;
pub mod structured_logging;
pub mod validators;

pub use errors::{
    invalid_input, CalculationError, ChatbotError, DatabaseError, FinanceError, FinanceResult,
    ValidationError,
};

pub use structured_logging::{
    init_structured_logging, JsonLinesLayer, LoggingConfig, OperationTimer, StructuredLogEntry,
};
