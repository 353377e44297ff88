//! PII-safe structured logging
//!
//! Any data handed to the logger passes through [`PiiMasker`] before it is
//! serialized, so no caller-supplied record reaches the `log` sink unmasked.
//! Entries are emitted as one JSON line each on the `glucoview::audit`
//! target.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::mask::{Node, PiiMasker};

/// `log` target used for every safe log entry
pub const AUDIT_TARGET: &str = "glucoview::audit";

/// Placeholder for caller data that could not be turned into a record
const UNSERIALIZABLE: &str = "[UNSERIALIZABLE]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Info => log::Level::Info,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Error => log::Level::Error,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

/// One structured log record; `data` is always already masked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl LogEntry {
    pub fn to_json(&self) -> String {
        // A struct of strings and JSON values always serializes
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}

/// Logger that masks before it emits
#[derive(Debug, Clone)]
pub struct SafeLogger {
    masker: PiiMasker,
    emit_debug: bool,
}

impl Default for SafeLogger {
    fn default() -> Self {
        Self {
            masker: PiiMasker::default(),
            emit_debug: cfg!(debug_assertions),
        }
    }
}

impl SafeLogger {
    pub fn new(masker: PiiMasker, emit_debug: bool) -> Self {
        Self { masker, emit_debug }
    }

    pub fn masker(&self) -> &PiiMasker {
        &self.masker
    }

    /// Build the masked entry, or `None` when the level is suppressed.
    /// A `Null` payload is treated as no payload.
    pub fn entry(&self, level: LogLevel, message: &str, data: Option<&Node>) -> Option<LogEntry> {
        if level == LogLevel::Debug && !self.emit_debug {
            return None;
        }

        Some(LogEntry {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            level,
            message: message.to_string(),
            data: data
                .filter(|node| !matches!(node, Node::Null))
                .map(|node| self.masker.mask(node)),
        })
    }

    /// Mask `data` and emit a single JSON line
    pub fn log(&self, level: LogLevel, message: &str, data: Option<&Node>) {
        if let Some(entry) = self.entry(level, message, data) {
            let sink_level: log::Level = level.into();
            log::log!(target: AUDIT_TARGET, sink_level, "{}", entry.to_json());
        }
    }

    /// Log any serializable value; it is converted to a record and masked
    pub fn log_serialize<T: Serialize>(&self, level: LogLevel, message: &str, data: &T) {
        let node = to_node(data);
        self.log(level, message, Some(&node));
    }

    pub fn info<T: Serialize>(&self, message: &str, data: &T) {
        self.log_serialize(LogLevel::Info, message, data);
    }

    pub fn warn<T: Serialize>(&self, message: &str, data: &T) {
        self.log_serialize(LogLevel::Warn, message, data);
    }

    pub fn error<T: Serialize>(&self, message: &str, data: &T) {
        self.log_serialize(LogLevel::Error, message, data);
    }

    pub fn debug<T: Serialize>(&self, message: &str, data: &T) {
        self.log_serialize(LogLevel::Debug, message, data);
    }
}

/// Never fails: unserializable data becomes a placeholder, not an error
fn to_node<T: Serialize>(data: &T) -> Node {
    match serde_json::to_value(data) {
        Ok(value) => Node::from(value),
        Err(_) => Node::text(UNSERIALIZABLE),
    }
}

/// Emit a masked log entry with the default masking policy
pub fn safe_log(level: LogLevel, message: &str, data: Option<&Node>) {
    SafeLogger::default().log(level, message, data);
}

pub fn info<T: Serialize>(message: &str, data: &T) {
    SafeLogger::default().info(message, data);
}

pub fn warn<T: Serialize>(message: &str, data: &T) {
    SafeLogger::default().warn(message, data);
}

pub fn error<T: Serialize>(message: &str, data: &T) {
    SafeLogger::default().error(message, data);
}

pub fn debug<T: Serialize>(message: &str, data: &T) {
    SafeLogger::default().debug(message, data);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::PiiCategory;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::sync::{Mutex, Once};

    fn patient() -> Node {
        Node::from(json!({
            "patientId": "JO-2025-0001",
            "email": "patient@example.com",
            "password": "secret123",
            "glucoseLevel": 140,
        }))
    }

    #[test]
    fn test_entry_masks_data() {
        let logger = SafeLogger::new(PiiMasker::default(), false);
        let entry = logger.entry(LogLevel::Info, "reading saved", Some(&patient())).unwrap();

        let json = entry.to_json();
        assert!(!json.contains("patient@example.com"));
        assert!(!json.contains("secret123"));
        assert!(!json.contains("JO-2025-0001"));
        assert!(json.contains("JO-****-**01"));
        assert!(json.contains("\"glucoseLevel\":140"));
    }

    #[test]
    fn test_entry_shape() {
        let logger = SafeLogger::new(PiiMasker::default(), false);
        let entry = logger.entry(LogLevel::Warn, "no data", None).unwrap();
        let value: Value = serde_json::from_str(&entry.to_json()).unwrap();

        assert_eq!(value["level"], "WARN");
        assert_eq!(value["message"], "no data");
        assert!(value.get("data").is_none());

        let ts = value["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok());
        assert!(ts.ends_with('Z'));
    }

    #[test]
    fn test_debug_suppressed_unless_enabled() {
        let quiet = SafeLogger::new(PiiMasker::default(), false);
        assert!(quiet.entry(LogLevel::Debug, "trace", None).is_none());
        assert!(quiet.entry(LogLevel::Error, "boom", None).is_some());

        let verbose = SafeLogger::new(PiiMasker::default(), true);
        let entry = verbose.entry(LogLevel::Debug, "trace", None).unwrap();
        assert_eq!(entry.level, LogLevel::Debug);
    }

    #[test]
    fn test_logger_uses_its_masker() {
        let masker = PiiMasker::with_fields([("contact", PiiCategory::Phone)]);
        let logger = SafeLogger::new(masker, false);
        let data = Node::from(json!({ "contact": "+962791234567" }));

        let entry = logger.entry(LogLevel::Info, "contact", Some(&data)).unwrap();
        assert_eq!(entry.data.unwrap()["contact"], "+962*******67");
    }

    #[test]
    fn test_logging_cyclic_data_terminates() {
        let obj = Node::map(vec![("name", Node::text("Test User"))]);
        obj.insert("self", obj.clone());

        let logger = SafeLogger::new(PiiMasker::default(), true);
        let entry = logger.entry(LogLevel::Error, "cycle", Some(&obj)).unwrap();
        assert!(entry.to_json().contains("[CIRCULAR_REF]"));
    }

    #[test]
    fn test_unserializable_data_is_replaced() {
        // Non-string map keys cannot become JSON
        let mut weird = BTreeMap::new();
        weird.insert(vec![1u8], "x");
        assert!(matches!(to_node(&weird), Node::Text(ref s) if s == UNSERIALIZABLE));
    }

    /// Keeps every record emitted on the audit target
    struct CaptureLogger {
        lines: Mutex<Vec<(log::Level, String)>>,
    }

    impl log::Log for CaptureLogger {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            metadata.target() == AUDIT_TARGET
        }

        fn log(&self, record: &log::Record) {
            if self.enabled(record.metadata()) {
                let line = record.args().to_string();
                self.lines.lock().unwrap().push((record.level(), line));
            }
        }

        fn flush(&self) {}
    }

    static CAPTURE: CaptureLogger = CaptureLogger { lines: Mutex::new(Vec::new()) };

    /// Captured records whose message is `message`
    fn captured(message: &str) -> Vec<(log::Level, Value)> {
        let needle = format!("\"message\":\"{}\"", message);
        CAPTURE
            .lines
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, line)| line.contains(&needle))
            .map(|(level, line)| (*level, serde_json::from_str(line).unwrap()))
            .collect()
    }

    fn install_capture() {
        static INSTALL: Once = Once::new();
        INSTALL.call_once(|| {
            log::set_logger(&CAPTURE).unwrap();
            log::set_max_level(log::LevelFilter::Trace);
        });
    }

    #[test]
    fn test_log_emits_masked_json_line() {
        install_capture();
        let logger = SafeLogger::new(PiiMasker::default(), false);
        logger.log(LogLevel::Warn, "sink masked", Some(&patient()));

        let lines = captured("sink masked");
        assert_eq!(lines.len(), 1);
        let (level, record) = &lines[0];
        assert_eq!(*level, log::Level::Warn);
        assert_eq!(record["level"], "WARN");
        assert_eq!(record["data"]["patientId"], "JO-****-**01");
        assert_eq!(record["data"]["password"], "[REDACTED]");
        assert!(!record.to_string().contains("patient@example.com"));
    }

    #[test]
    fn test_log_suppresses_debug_at_sink() {
        install_capture();
        SafeLogger::new(PiiMasker::default(), false).debug("sink quiet", &json!({ "a": 1 }));
        assert!(captured("sink quiet").is_empty());

        SafeLogger::new(PiiMasker::default(), true).debug("sink verbose", &json!({ "a": 1 }));
        let lines = captured("sink verbose");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].0, log::Level::Debug);
        assert_eq!(lines[0].1["level"], "DEBUG");
    }

    #[test]
    fn test_level_helpers_map_to_log_levels() {
        install_capture();
        let data = json!({ "email": "patient@example.com", "password": "secret123" });
        info("sink helper info", &data);
        warn("sink helper warn", &data);
        error("sink helper error", &data);

        assert_eq!(captured("sink helper info")[0].0, log::Level::Info);
        assert_eq!(captured("sink helper warn")[0].0, log::Level::Warn);
        let lines = captured("sink helper error");
        let (_, record) = &lines[0];
        assert_eq!(record["level"], "ERROR");
        assert_eq!(record["data"]["email"], "p*****t@e*****e.c*m");
        assert_eq!(record["data"]["password"], "[REDACTED]");
    }

    #[test]
    fn test_null_payload_is_omitted() {
        install_capture();
        let logger = SafeLogger::new(PiiMasker::default(), false);
        let entry = logger.entry(LogLevel::Info, "null data", Some(&Node::Null)).unwrap();
        assert!(entry.data.is_none());
        assert!(!entry.to_json().contains("\"data\""));

        safe_log(LogLevel::Info, "sink null data", Some(&Node::Null));
        let lines = captured("sink null data");
        assert_eq!(lines.len(), 1);
        assert!(lines[0].1.get("data").is_none());
    }

    #[test]
    fn test_parse_level() {
        assert_eq!("INFO".parse::<LogLevel>(), Ok(LogLevel::Info));
        assert_eq!("warn".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert!("fatal".parse::<LogLevel>().is_err());
    }
}
