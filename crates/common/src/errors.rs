use thiserror::Error;

/// Основная иерархия ошибок финансового ассистента
#[derive(Error, Debug)]
pub enum FinanceError {
    // === Категории предметной области ===
    #[error("Chatbot error: {0}")]
    Chatbot(#[from] ChatbotError),

    #[error("Calculation error: {0}")]
    Calculation(#[from] CalculationError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    // === Системные ошибки ===
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Errors raised while talking to an LLM provider
#[derive(Error, Debug)]
pub enum ChatbotError {
    #[error("API key for {0} is not configured")]
    MissingApiKey(String),

    #[error("{provider} returned HTTP {status}: {message}")]
    Provider {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("Empty response from {0}")]
    EmptyResponse(String),

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Unsupported LLM provider: {0}")]
    UnsupportedProvider(String),
}

/// Calculation errors
#[derive(Error, Debug, PartialEq)]
pub enum CalculationError {
    #[error("Invalid input: {field} - {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Down payment {down_payment:.2} must be lower than the asset value {value:.2}")]
    DownPaymentTooHigh { down_payment: f64, value: f64 },

    #[error("Retirement age {retirement} must be greater than current age {current}")]
    InvalidAgeRange { current: u32, retirement: u32 },

    #[error("Unknown amortization system: {0} (expected SAC or PRICE)")]
    UnknownSystem(String),

    #[error("Did not converge: {0}")]
    NoConvergence(String),
}

impl CalculationError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Database-specific errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    Open(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Stored payload is not valid JSON: {0}")]
    Serialization(String),

    #[error("Rating must be between 1 and 5, got {0}")]
    InvalidRating(i64),
}

/// Validation errors
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid {field}: {value}")]
    InvalidField { field: String, value: String },
}

pub type FinanceResult<T> = Result<T, FinanceError>;

/// Сокращение для ошибок ввода калькуляторов
pub fn invalid_input(field: &str, reason: &str) -> FinanceError {
    FinanceError::Calculation(CalculationError::invalid(field, reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_wrapping() {
        let err: FinanceError = CalculationError::UnknownSystem("XYZ".into()).into();
        assert!(matches!(err, FinanceError::Calculation(_)));
        assert!(err.to_string().contains("XYZ"));

        let err: FinanceError = DatabaseError::InvalidRating(9).into();
        assert_eq!(err.to_string(), "Database error: Rating must be between 1 and 5, got 9");
    }

    #[test]
    fn test_provider_error_message() {
        let err = ChatbotError::Provider {
            provider: "OpenAI".into(),
            status: 401,
            message: "bad key".into(),
        };
        assert_eq!(err.to_string(), "OpenAI returned HTTP 401: bad key");
    }

    #[test]
    fn test_invalid_input_helper() {
        match invalid_input("months", "must be positive") {
            FinanceError::Calculation(CalculationError::InvalidInput { field, .. }) => {
                assert_eq!(field, "months")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
