//! Reading store with JSON file persistence
//!
//! The store is an explicit object owned by whoever composes the
//! application; there is no process-wide reading cache. Readings are kept
//! newest first.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use log::debug;

use crate::error::GlucoViewError;
use crate::reading::{MeasurementContext, Reading};
use crate::units::validate_value;

/// Patient id stamped on readings entered on this device
pub const LOCAL_PATIENT: &str = "current-patient";

/// Owned collection of one patient's readings
#[derive(Debug, Default)]
pub struct ReadingStore {
    readings: Vec<Reading>,
    path: Option<PathBuf>,
    next_seq: u64,
}

impl ReadingStore {
    /// Empty store without a backing file
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a store backed by a JSON file; a missing file is an empty store
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GlucoViewError> {
        let path = path.as_ref().to_path_buf();
        let mut readings: Vec<Reading> = if path.exists() {
            let text = fs::read_to_string(&path)?;
            serde_json::from_str(&text)?
        } else {
            Vec::new()
        };
        readings.sort_by_key(|r| std::cmp::Reverse(r.timestamp));

        debug!("Loaded {} readings from {}", readings.len(), path.display());
        Ok(Self {
            next_seq: readings.len() as u64,
            readings,
            path: Some(path),
        })
    }

    /// Write all readings to the backing file, if there is one
    pub fn save(&self) -> Result<(), GlucoViewError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.readings)?;
        fs::write(path, json)?;
        debug!("Saved {} readings to {}", self.readings.len(), path.display());
        Ok(())
    }

    /// Validate and record a new reading taken at `now`
    pub fn add_reading(
        &mut self,
        value: f64,
        context: MeasurementContext,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<&Reading, GlucoViewError> {
        validate_value(value)?;

        self.next_seq += 1;
        let reading = Reading {
            id: format!("{}-{}", now.timestamp_millis(), self.next_seq),
            patient_id: LOCAL_PATIENT.to_string(),
            value,
            timestamp: now,
            measurement_context: context,
            notes: notes.filter(|n| !n.trim().is_empty()),
            device_id: None,
        };

        // Keep newest first even if `now` is older than existing entries
        let pos = self.readings.partition_point(|r| r.timestamp > reading.timestamp);
        self.readings.insert(pos, reading);
        Ok(&self.readings[pos])
    }

    /// Remove a reading by id, returns whether something was removed
    pub fn delete_reading(&mut self, id: &str) -> bool {
        let before = self.readings.len();
        self.readings.retain(|r| r.id != id);
        self.readings.len() != before
    }

    /// Most recent reading
    pub fn latest(&self) -> Option<&Reading> {
        self.readings.first()
    }

    /// All readings, newest first
    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    /// Readings taken within the last `days` days before `now`
    pub fn readings_for_period(&self, days: i64, now: DateTime<Utc>) -> Vec<Reading> {
        let cutoff = now - Duration::days(days);
        self.readings
            .iter()
            .filter(|r| r.timestamp >= cutoff)
            .cloned()
            .collect()
    }

    pub fn count(&self) -> usize {
        self.readings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_add_rejects_invalid_values() {
        let mut store = ReadingStore::in_memory();
        assert!(matches!(
            store.add_reading(700.0, MeasurementContext::Random, None, now()),
            Err(GlucoViewError::InvalidReading(_))
        ));
        assert!(store.add_reading(f64::NAN, MeasurementContext::Random, None, now()).is_err());
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_newest_first() {
        let mut store = ReadingStore::in_memory();
        store
            .add_reading(100.0, MeasurementContext::Fasting, None, now() - Duration::hours(5))
            .unwrap();
        store.add_reading(150.0, MeasurementContext::AfterMeal, None, now()).unwrap();
        store
            .add_reading(120.0, MeasurementContext::Random, None, now() - Duration::hours(2))
            .unwrap();

        let values: Vec<f64> = store.readings().iter().map(|r| r.value).collect();
        assert_eq!(values, vec![150.0, 120.0, 100.0]);
        assert_eq!(store.latest().unwrap().value, 150.0);
    }

    #[test]
    fn test_ids_are_unique_and_deletable() {
        let mut store = ReadingStore::in_memory();
        let first = store
            .add_reading(100.0, MeasurementContext::Fasting, None, now())
            .unwrap()
            .id
            .clone();
        let second = store
            .add_reading(110.0, MeasurementContext::Fasting, None, now())
            .unwrap()
            .id
            .clone();
        assert_ne!(first, second);

        assert!(store.delete_reading(&first));
        assert!(!store.delete_reading(&first));
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_blank_notes_dropped() {
        let mut store = ReadingStore::in_memory();
        let r = store
            .add_reading(100.0, MeasurementContext::Fasting, Some("  ".into()), now())
            .unwrap();
        assert_eq!(r.notes, None);
        assert_eq!(r.patient_id, LOCAL_PATIENT);
    }

    #[test]
    fn test_readings_for_period() {
        let mut store = ReadingStore::in_memory();
        store
            .add_reading(100.0, MeasurementContext::Fasting, None, now() - Duration::days(1))
            .unwrap();
        store
            .add_reading(110.0, MeasurementContext::Fasting, None, now() - Duration::days(10))
            .unwrap();

        assert_eq!(store.readings_for_period(7, now()).len(), 1);
        assert_eq!(store.readings_for_period(30, now()).len(), 2);
    }

    #[test]
    fn test_save_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("readings.json");

        let mut store = ReadingStore::open(&path).unwrap();
        assert_eq!(store.count(), 0);
        store
            .add_reading(95.0, MeasurementContext::Fasting, Some("morning".into()), now())
            .unwrap();
        store
            .add_reading(180.0, MeasurementContext::AfterMeal, None, now() - Duration::hours(3))
            .unwrap();
        store.save().unwrap();

        let reopened = ReadingStore::open(&path).unwrap();
        assert_eq!(reopened.count(), 2);
        assert_eq!(reopened.latest().unwrap().notes.as_deref(), Some("morning"));
        assert_eq!(reopened.readings(), store.readings());
    }

    #[test]
    fn test_open_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("readings.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(ReadingStore::open(&path), Err(GlucoViewError::Json(_))));
    }
}
