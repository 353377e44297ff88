//! glucoview - blood glucose analytics and PII-safe logging for diabetes
//! follow-up.
//!
//! # Modules
//!
//! - [`units`]: thresholds, per-value classification and value validation
//! - [`reading`]: reading type, measurement contexts, locale formatting
//! - [`stats`]: time in range, trend, risk level and daily aggregates
//! - [`storage`]: explicit reading store with JSON persistence
//! - [`mask`]: PII masking of strings and record graphs
//! - [`logger`]: structured logging that masks before it emits
//! - [`validation`]: user input validators
//! - [`config`]: configuration file and data paths

pub mod config;
pub mod error;
pub mod logger;
pub mod mask;
pub mod reading;
pub mod stats;
pub mod storage;
pub mod units;
pub mod validation;

pub use error::{GlucoViewError, ValidationError, ValueError};
pub use mask::{
    mask_email, mask_json, mask_name, mask_patient_id, mask_phone, mask_pii, Node, PiiCategory,
    PiiMasker,
};
pub use reading::{Locale, MeasurementContext, Reading};
pub use stats::{
    daily_stats, group_by_day, risk_level, time_in_range, trend, GlucoseTrend, RiskLevel,
};
pub use units::{classify_value, validate_value, Classification, GlucoseStatus};
