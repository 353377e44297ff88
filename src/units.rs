//! Glucose thresholds, per-value classification and value validation
//!
//! All values are mg/dL. The clinical thresholds are fixed constants; they
//! are not user configurable.

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Glucose value in mg/dL (milligrams per deciliter)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct MgDl(pub f64);

impl MgDl {
    /// Format the value with unit suffix, rounded to a whole number
    pub fn format(self) -> String {
        format!("{} mg/dL", self.0.round() as i64)
    }
}

/// Clinical threshold constants (mg/dL)
pub struct Thresholds;

impl Thresholds {
    /// Lowest value a meter can plausibly report
    pub const MIN_VALID: u16 = 20;
    /// Highest value a meter can plausibly report
    pub const MAX_VALID: u16 = 600;

    /// Severe hypoglycemia
    pub const CRITICAL_LOW: f64 = 54.0;
    /// Hypoglycemia, also the lower bound of the target range
    pub const HYPO: f64 = 70.0;
    /// Hyperglycemia, also the upper bound of the target range
    pub const HYPER: f64 = 180.0;
    /// Severe hyperglycemia, risk of ketoacidosis
    pub const CRITICAL_HIGH: f64 = 250.0;

    /// Target range check, both bounds inclusive
    pub fn in_target(value: f64) -> bool {
        (Self::HYPO..=Self::HYPER).contains(&value)
    }

    /// Whether a value counts as a critical event (either side)
    pub fn is_critical(value: f64) -> bool {
        value < Self::CRITICAL_LOW || value > Self::CRITICAL_HIGH
    }
}

/// Classification status of a single glucose value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlucoseStatus {
    CriticalLow,  // < 54
    Low,          // 54 to < 70
    Normal,       // 70 to 180 inclusive
    High,         // > 180 to 250
    CriticalHigh, // > 250
}

impl GlucoseStatus {
    /// Classify a value; first matching band wins
    pub fn of(value: f64) -> Self {
        if value < Thresholds::CRITICAL_LOW {
            GlucoseStatus::CriticalLow
        } else if value < Thresholds::HYPO {
            GlucoseStatus::Low
        } else if value <= Thresholds::HYPER {
            GlucoseStatus::Normal
        } else if value <= Thresholds::CRITICAL_HIGH {
            GlucoseStatus::High
        } else {
            // NaN also lands here; callers validate first
            GlucoseStatus::CriticalHigh
        }
    }

    /// Display color (hex)
    pub fn color(self) -> &'static str {
        match self {
            GlucoseStatus::CriticalLow | GlucoseStatus::CriticalHigh => "#DC2626",
            GlucoseStatus::Low | GlucoseStatus::High => "#F59E0B",
            GlucoseStatus::Normal => "#10B981",
        }
    }

    /// German label
    pub fn label(self) -> &'static str {
        match self {
            GlucoseStatus::CriticalLow => "Kritisch niedrig",
            GlucoseStatus::Low => "Niedrig",
            GlucoseStatus::Normal => "Im Zielbereich",
            GlucoseStatus::High => "Erhöht",
            GlucoseStatus::CriticalHigh => "Kritisch hoch",
        }
    }

    /// Arabic label
    pub fn label_arabic(self) -> &'static str {
        match self {
            GlucoseStatus::CriticalLow => "منخفض جداً",
            GlucoseStatus::Low => "منخفض",
            GlucoseStatus::Normal => "ضمن المعدل",
            GlucoseStatus::High => "مرتفع",
            GlucoseStatus::CriticalHigh => "مرتفع جداً",
        }
    }
}

/// Derived classification of a reading value, never stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub status: GlucoseStatus,
    pub color: &'static str,
    pub label: &'static str,
    pub label_arabic: &'static str,
}

/// Classify a single glucose value (mg/dL)
pub fn classify_value(value: f64) -> Classification {
    let status = GlucoseStatus::of(value);
    Classification {
        status,
        color: status.color(),
        label: status.label(),
        label_arabic: status.label_arabic(),
    }
}

/// Check a value for medical plausibility (finite, 20..=600 mg/dL)
pub fn validate_value(value: f64) -> Result<(), ValueError> {
    if !value.is_finite() {
        return Err(ValueError::NotANumber);
    }
    if value < f64::from(Thresholds::MIN_VALID) {
        return Err(ValueError::TooLow { min: Thresholds::MIN_VALID });
    }
    if value > f64::from(Thresholds::MAX_VALID) {
        return Err(ValueError::TooHigh { max: Thresholds::MAX_VALID });
    }
    Ok(())
}

/// Format a glucose value with unit, e.g. `"120 mg/dL"`
pub fn format_glucose_value(value: f64) -> String {
    MgDl(value).format()
}
