//! Configuration file parsing and data paths

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use log::warn;

use crate::error::GlucoViewError;
use crate::mask::{PiiCategory, PiiMasker};
use crate::reading::Locale;

/// Prefix of explicit PII field rules, e.g. `field.contact email`
const FIELD_PREFIX: &str = "field.";

const DEFAULT_CONFIG: &str = "\
# glucoview configuration
# Format: key value  # comment

# Display locale: de or ar
locale de

# Reading store file (defaults to the data directory)
# store_path /path/to/readings.json

# Emit debug entries from the safe logger in release builds
debug_log false

# Explicit PII field rules, checked before the built-in key heuristics.
# Categories: email phone name patient_id secret date_of_birth
# field.contact email
# field.ssn secret
";

/// Configuration loaded from config.txt
#[derive(Debug, Default)]
pub struct Config {
    pub locale: Locale,
    pub store_path: Option<String>,
    pub debug_log: bool,
    /// Lower-cased field name -> PII category
    pub pii_fields: HashMap<String, PiiCategory>,
}

impl Config {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, GlucoViewError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut config = Config::default();

        for line in reader.lines() {
            let line = line?;

            // Skip empty lines and comments
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, rest)) = Self::parse_line(line) {
                // Extract value before any comment
                let value = rest.split('#').next().unwrap_or("").trim();
                config.apply(key, value);
            }
        }

        Ok(config)
    }

    /// Apply one `key value` pair; bad values are skipped with a warning
    fn apply(&mut self, key: &str, value: &str) {
        match key {
            "locale" => match value.parse() {
                Ok(locale) => self.locale = locale,
                Err(e) => warn!("Ignoring config line '{} {}': {}", key, value, e),
            },
            "store_path" => self.store_path = Some(value.to_string()),
            "debug_log" => self.debug_log = matches!(value, "1" | "true" | "yes" | "on"),
            _ => {
                if let Some(field) = key.strip_prefix(FIELD_PREFIX) {
                    match value.parse::<PiiCategory>() {
                        Ok(category) if !field.is_empty() => {
                            self.pii_fields.insert(field.to_lowercase(), category);
                        }
                        Ok(_) => warn!("Ignoring PII rule without a field name"),
                        Err(e) => warn!("Ignoring PII rule for '{}': {}", field, e),
                    }
                } else {
                    warn!("Unknown config key '{}'", key);
                }
            }
        }
    }

    /// Parse a single config line, returning (key, value)
    fn parse_line(line: &str) -> Option<(&str, &str)> {
        // Find first whitespace to separate key from value
        let mut parts = line.splitn(2, |c: char| c.is_whitespace());
        let key = parts.next()?.trim();
        let value = parts.next()?.trim();

        if key.is_empty() || value.is_empty() {
            return None;
        }

        Some((key, value))
    }

    /// Write a commented default config file
    pub fn create_default<P: AsRef<Path>>(path: P) -> Result<(), GlucoViewError> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, DEFAULT_CONFIG)?;
        Ok(())
    }

    /// Masker built from the explicit field rules
    pub fn masker(&self) -> PiiMasker {
        PiiMasker::with_fields(self.pii_fields.iter().map(|(k, c)| (k.as_str(), *c)))
    }

    /// Store path from config, or the default in the data directory
    pub fn store_path(&self) -> PathBuf {
        self.store_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(default_store_path)
    }
}

/// Application data directory, e.g. `~/.local/share/glucoview`
pub fn get_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("glucoview")
}

/// Create the data directory if needed
pub fn ensure_data_dir() -> Result<PathBuf, GlucoViewError> {
    let dir = get_data_dir();
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

pub fn config_file_path() -> PathBuf {
    get_data_dir().join("config.txt")
}

pub fn default_store_path() -> PathBuf {
    get_data_dir().join("readings.json")
}
