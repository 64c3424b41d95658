use common::{
    init_structured_logging, FinanceError, LoggingConfig, OperationTimer, StructuredLogEntry,
};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::Level;

#[test]
fn test_structured_log_entry_roundtrip() {
    let mut fields = HashMap::new();
    fields.insert("user_id".to_string(), Value::String("ana".to_string()));

    let entry = StructuredLogEntry {
        timestamp: chrono::Utc::now().to_rfc3339(),
        level: "INFO".to_string(),
        target: "history::store".to_string(),
        message: "Message saved".to_string(),
        fields,
    };

    let json = serde_json::to_string(&entry).unwrap();
    let parsed: StructuredLogEntry = serde_json::from_str(&json).unwrap();

    assert_eq!(parsed.level, "INFO");
    assert_eq!(parsed.target, "history::store");
    assert_eq!(parsed.fields.get("user_id"), Some(&Value::from("ana")));
}

#[test]
fn test_logging_config_defaults() {
    let config = LoggingConfig::default();
    assert_eq!(config.level, Level::WARN);
    assert!(!config.json_output);

    let config = config.with_level_name("INFO");
    assert_eq!(config.level, Level::INFO);
}

#[test]
fn test_operation_timer_reports_failures() {
    let timer = OperationTimer::new("simulate_loan");
    std::thread::sleep(Duration::from_millis(10));

    let failed: Result<(), String> = Err("months must be at least one".to_string());
    let duration = timer.finish_with_result(&failed);
    assert!(duration >= 10);
}

#[test]
fn test_second_initialisation_is_a_configuration_error() {
    let config = LoggingConfig {
        json_output: true,
        ..LoggingConfig::default()
    };
    // whichever call runs first wins; the second must fail
    let _ = init_structured_logging(config.clone());
    let err = init_structured_logging(config).unwrap_err();
    assert!(matches!(err, FinanceError::Configuration(_)));
}
