//! Blood glucose readings, measurement contexts and locale-aware formatting

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// A blood glucose reading (value in mg/dL)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub patient_id: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    pub measurement_context: MeasurementContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

impl Reading {
    pub fn new(
        value: f64,
        timestamp: DateTime<Utc>,
        measurement_context: MeasurementContext,
    ) -> Self {
        Self {
            id: String::new(),
            patient_id: String::new(),
            value,
            timestamp,
            measurement_context,
            notes: None,
            device_id: None,
        }
    }
}

/// Read access to the fields the analytics need
pub trait ReadingData {
    fn value(&self) -> f64;
    fn timestamp(&self) -> DateTime<Utc>;
}

impl<R: ReadingData> ReadingData for &R {
    fn value(&self) -> f64 {
        (**self).value()
    }

    fn timestamp(&self) -> DateTime<Utc> {
        (**self).timestamp()
    }
}

impl ReadingData for Reading {
    fn value(&self) -> f64 {
        self.value
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Display locale of the front-ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    De,
    Ar,
}

impl std::str::FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "de" => Ok(Locale::De),
            "ar" => Ok(Locale::Ar),
            other => Err(format!("unsupported locale '{}'", other)),
        }
    }
}

/// When a reading was taken relative to meals, sleep or exercise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementContext {
    Fasting,
    BeforeMeal,
    AfterMeal, // 2h after
    BeforeSleep,
    Random,
    Exercise,
}

impl MeasurementContext {
    pub const ALL: [MeasurementContext; 6] = [
        MeasurementContext::Fasting,
        MeasurementContext::BeforeMeal,
        MeasurementContext::AfterMeal,
        MeasurementContext::BeforeSleep,
        MeasurementContext::Random,
        MeasurementContext::Exercise,
    ];

    /// Wire name, e.g. `before_meal`
    pub fn as_str(self) -> &'static str {
        match self {
            MeasurementContext::Fasting => "fasting",
            MeasurementContext::BeforeMeal => "before_meal",
            MeasurementContext::AfterMeal => "after_meal",
            MeasurementContext::BeforeSleep => "before_sleep",
            MeasurementContext::Random => "random",
            MeasurementContext::Exercise => "exercise",
        }
    }

    /// Localized label
    pub fn translate(self, locale: Locale) -> &'static str {
        match (self, locale) {
            (MeasurementContext::Fasting, Locale::De) => "Nüchtern",
            (MeasurementContext::Fasting, Locale::Ar) => "صائم",
            (MeasurementContext::BeforeMeal, Locale::De) => "Vor dem Essen",
            (MeasurementContext::BeforeMeal, Locale::Ar) => "قبل الأكل",
            (MeasurementContext::AfterMeal, Locale::De) => "Nach dem Essen",
            (MeasurementContext::AfterMeal, Locale::Ar) => "بعد الأكل",
            (MeasurementContext::BeforeSleep, Locale::De) => "Vor dem Schlafen",
            (MeasurementContext::BeforeSleep, Locale::Ar) => "قبل النوم",
            (MeasurementContext::Random, Locale::De) => "Zufällig",
            (MeasurementContext::Random, Locale::Ar) => "عشوائي",
            (MeasurementContext::Exercise, Locale::De) => "Nach Sport",
            (MeasurementContext::Exercise, Locale::Ar) => "بعد الرياضة",
        }
    }
}

impl std::str::FromStr for MeasurementContext {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown measurement context '{}'", s))
    }
}

/// Format a date for display: `dd.MM.yyyy` (de) or `dd/MM/yyyy` (ar)
pub fn format_date(date: NaiveDate, locale: Locale) -> String {
    match locale {
        Locale::De => date.format("%d.%m.%Y").to_string(),
        Locale::Ar => date.format("%d/%m/%Y").to_string(),
    }
}

/// Format a date and time for display, minutes precision
pub fn format_date_time(date_time: NaiveDateTime, locale: Locale) -> String {
    match locale {
        Locale::De => date_time.format("%d.%m.%Y %H:%M").to_string(),
        Locale::Ar => date_time.format("%d/%m/%Y %H:%M").to_string(),
    }
}

/// Age in full years on `today`; 0 when the birth date lies in the future
pub fn calculate_age(birth_date: NaiveDate, today: NaiveDate) -> u32 {
    today.years_since(birth_date).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_reading_json_shape() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 1, 8, 30, 0).unwrap();
        let reading = Reading::new(120.0, ts, MeasurementContext::BeforeMeal);
        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["measurementContext"], "before_meal");
        assert_eq!(json["value"], 120.0);
        assert!(json.get("notes").is_none());

        let back: Reading = serde_json::from_value(json).unwrap();
        assert_eq!(back, reading);
    }

    #[test]
    fn test_reading_accepts_minimal_json() {
        let json = r#"{
            "value": 95,
            "timestamp": "2025-03-01T08:30:00Z",
            "measurementContext": "fasting"
        }"#;
        let reading: Reading = serde_json::from_str(json).unwrap();
        assert_eq!(reading.value, 95.0);
        assert!(reading.id.is_empty());
    }

    #[test]
    fn test_translate_measurement_context() {
        assert_eq!(MeasurementContext::Fasting.translate(Locale::De), "Nüchtern");
        assert_eq!(MeasurementContext::Exercise.translate(Locale::Ar), "بعد الرياضة");
        assert_eq!(MeasurementContext::BeforeSleep.translate(Locale::De), "Vor dem Schlafen");
    }

    #[test]
    fn test_parse_measurement_context() {
        assert_eq!("after_meal".parse::<MeasurementContext>(), Ok(MeasurementContext::AfterMeal));
        assert!("lunch".parse::<MeasurementContext>().is_err());
    }

    #[test]
    fn test_format_date() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 7).unwrap();
        assert_eq!(format_date(date, Locale::De), "07.01.2025");
        assert_eq!(format_date(date, Locale::Ar), "07/01/2025");

        let dt = date.and_hms_opt(9, 5, 0).unwrap();
        assert_eq!(format_date_time(dt, Locale::De), "07.01.2025 09:05");
        assert_eq!(format_date_time(dt, Locale::Ar), "07/01/2025 09:05");
    }

    #[test]
    fn test_calculate_age() {
        let birth = NaiveDate::from_ymd_opt(1950, 6, 15).unwrap();
        assert_eq!(calculate_age(birth, NaiveDate::from_ymd_opt(2025, 6, 14).unwrap()), 74);
        assert_eq!(calculate_age(birth, NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()), 75);
        assert_eq!(calculate_age(birth, NaiveDate::from_ymd_opt(1940, 1, 1).unwrap()), 0);
    }
}
