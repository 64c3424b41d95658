use crate::errors::{FinanceError, FinanceResult};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};
use std::time::Instant;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt as fmt_layer, EnvFilter, Layer, Registry};

/// Одна строка JSON-лога (`--json-logs`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredLogEntry {
    /// RFC 3339
    pub timestamp: String,
    pub level: String,
    pub target: String,
    pub message: String,
    /// Поля события (`user_id`, `session_id`, `duration_ms`...) на верхнем уровне
    #[serde(flatten)]
    pub fields: HashMap<String, Value>,
}

/// Writes every event as one JSON object per line on stderr
pub struct JsonLinesLayer;

impl<S> Layer<S> for JsonLinesLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        let mut collector = FieldCollector::default();
        event.record(&mut collector);

        let entry = StructuredLogEntry {
            timestamp: Utc::now().to_rfc3339(),
            level: meta.level().as_str().to_string(),
            target: meta.target().to_string(),
            message: collector.message,
            fields: collector.fields,
        };

        if let Ok(line) = serde_json::to_string(&entry) {
            let mut stderr = io::stderr().lock();
            let _ = writeln!(stderr, "{line}");
        }
    }
}

#[derive(Default)]
struct FieldCollector {
    message: String,
    fields: HashMap<String, Value>,
}

impl FieldCollector {
    fn put(&mut self, field: &Field, value: Value) {
        match (field.name(), value) {
            ("message", Value::String(text)) => self.message = text,
            (name, value) => {
                self.fields.insert(name.to_string(), value);
            }
        }
    }
}

impl Visit for FieldCollector {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.put(field, Value::String(format!("{value:?}")));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        // NaN/inf не представимы в JSON
        if value.is_finite() {
            self.put(field, Value::from(value));
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, Value::from(value));
    }
}

/// Настройки логирования; `RUST_LOG` имеет приоритет над `level` и `directives`
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: Level,
    /// `EnvFilter` directives such as `warn,history=debug`; replace `level` when set
    pub directives: Option<String>,
    pub json_output: bool,
    /// ANSI colours for the human format
    pub ansi: bool,
    pub line_numbers: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            directives: None,
            json_output: false,
            ansi: std::env::var_os("NO_COLOR").is_none(),
            line_numbers: cfg!(debug_assertions),
        }
    }
}

impl LoggingConfig {
    /// Accepts a plain level ("info", "DEBUG") or filter directives
    /// ("info,history=debug"); anything else keeps the default.
    pub fn with_level_name(mut self, name: &str) -> Self {
        let name = name.trim();
        if let Ok(level) = name.parse::<Level>() {
            self.level = level;
        } else if name.contains('=') && EnvFilter::try_new(name).is_ok() {
            self.directives = Some(name.to_string());
        }
        self
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| match &self.directives {
            Some(directives) => EnvFilter::new(directives),
            None => EnvFilter::new(self.level.as_str()),
        })
    }
}

/// Installs the global subscriber. Logs go to stderr so stdout stays
/// machine-readable for `--json` output.
pub fn init_structured_logging(config: LoggingConfig) -> FinanceResult<()> {
    let registry = Registry::default().with(config.filter());

    let installed = if config.json_output {
        tracing::subscriber::set_global_default(registry.with(JsonLinesLayer))
    } else {
        let human = fmt_layer::layer()
            .with_writer(io::stderr)
            .with_ansi(config.ansi)
            .with_line_number(config.line_numbers);
        tracing::subscriber::set_global_default(registry.with(human))
    };

    installed.map_err(|e| FinanceError::Configuration(format!("logging already initialised: {e}")))
}

/// Мерит длительность операции и пишет итог одним событием
pub struct OperationTimer {
    name: String,
    started: Instant,
    context: Map<String, Value>,
}

impl OperationTimer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            started: Instant::now(),
            context: Map::new(),
        }
    }

    pub fn add_field(&mut self, key: impl Into<String>, value: impl Serialize) {
        if let Ok(value) = serde_json::to_value(value) {
            self.context.insert(key.into(), value);
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Logs at INFO on success and ERROR on failure; returns the duration in ms
    pub fn finish_with_result<T, E: fmt::Display>(self, result: &Result<T, E>) -> u64 {
        let duration_ms = self.elapsed_ms();
        let context = Value::Object(self.context);

        if let Err(e) = result {
            tracing::error!(
                operation = %self.name,
                duration_ms,
                success = false,
                error = %e,
                context = %context,
                "Operation failed"
            );
        } else {
            tracing::info!(
                operation = %self.name,
                duration_ms,
                success = true,
                context = %context,
                "Operation completed"
            );
        }
        duration_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_fields_are_flattened() {
        let mut fields = HashMap::new();
        fields.insert("months".to_string(), Value::from(12));

        let entry = StructuredLogEntry {
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            level: "INFO".to_string(),
            target: "calculators::loan".to_string(),
            message: "Loan simulated".to_string(),
            fields,
        };

        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"level\":\"INFO\""));
        assert!(json.contains("\"months\":12"));
    }

    #[test]
    fn test_level_name_parsing() {
        let config = LoggingConfig::default().with_level_name("debug");
        assert_eq!(config.level, Level::DEBUG);

        let config = LoggingConfig::default().with_level_name("nonsense");
        assert_eq!(config.level, Level::WARN);
        assert!(config.directives.is_none());
    }

    #[test]
    fn test_directives_are_kept() {
        let config = LoggingConfig::default().with_level_name("info,history=debug");
        assert_eq!(config.directives.as_deref(), Some("info,history=debug"));
        assert_eq!(config.level, Level::WARN);
    }

    #[test]
    fn test_timer_keeps_context() {
        let mut timer = OperationTimer::new("compound_interest");
        timer.add_field("months", 120);
        timer.add_field("monthly_contribution", 250.5);
        assert_eq!(timer.context["months"], 120);

        let ok: Result<(), String> = Ok(());
        timer.finish_with_result(&ok);
    }
}
