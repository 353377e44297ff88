//! Statistics calculations for glucose readings
//!
//! Everything here is derived on demand from a slice of readings; nothing is
//! cached and the input is never reordered. "No data" is a normal dashboard
//! state, so empty input yields defaults (0 %, `Stable`, `Low`) instead of
//! errors.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::reading::ReadingData;
use crate::units::Thresholds;

/// Size of the recent and the older window used for trend detection
const TREND_WINDOW: usize = 7;
/// Mean shift (mg/dL) between windows that counts as a real change
const TREND_DELTA: f64 = 15.0;
/// Standard deviation (mg/dL) above which the recent window is erratic
const TREND_MAX_STD_DEV: f64 = 50.0;

/// Direction of recent glucose values compared to the window before
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlucoseTrend {
    Stable,
    Improving,
    Worsening,
    HighlyVariable,
}

/// Overall risk derived from critical events and time in range
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Critical,
}

/// Percentage (0-100, rounded half up) of readings inside 70-180 mg/dL
pub fn time_in_range<R: ReadingData>(readings: &[R]) -> u8 {
    if readings.is_empty() {
        return 0;
    }
    let in_range = readings.iter().filter(|r| Thresholds::in_target(r.value())).count();
    percent_of(in_range, readings.len())
}

/// Compare the 7 most recent readings to the 7 before them
pub fn trend<R: ReadingData>(readings: &[R]) -> GlucoseTrend {
    if readings.len() < 3 {
        return GlucoseTrend::Stable;
    }

    // Newest first, on a copy
    let mut sorted: Vec<&R> = readings.iter().collect();
    sorted.sort_by_key(|r| std::cmp::Reverse(r.timestamp()));

    let recent: Vec<f64> = sorted.iter().take(TREND_WINDOW).map(|r| r.value()).collect();
    let older: Vec<f64> = sorted
        .iter()
        .skip(TREND_WINDOW)
        .take(TREND_WINDOW)
        .map(|r| r.value())
        .collect();

    if older.is_empty() {
        return GlucoseTrend::Stable;
    }

    let recent_mean = mean(&recent);
    let older_mean = mean(&older);

    // Variability dominates direction
    if population_std_dev(&recent, recent_mean) > TREND_MAX_STD_DEV {
        return GlucoseTrend::HighlyVariable;
    }

    let difference = recent_mean - older_mean;
    if difference < -TREND_DELTA {
        GlucoseTrend::Improving
    } else if difference > TREND_DELTA {
        GlucoseTrend::Worsening
    } else {
        GlucoseTrend::Stable
    }
}

/// Risk level; the first matching rule wins
pub fn risk_level<R: ReadingData>(readings: &[R]) -> RiskLevel {
    if readings.is_empty() {
        return RiskLevel::Low;
    }

    let events = EventCounts::from_readings(readings);
    let tir = time_in_range(readings);

    if events.critical >= 2 || tir < 30 {
        RiskLevel::Critical
    } else if events.critical >= 1 || tir < 50 {
        RiskLevel::High
    } else if events.hypo + events.hyper >= 5 || tir < 70 {
        RiskLevel::Moderate
    } else {
        RiskLevel::Low
    }
}

/// Hypo, hyper and critical event counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCounts {
    pub critical: usize, // < 54 or > 250
    pub hypo: usize,     // < 70
    pub hyper: usize,    // > 180
}

impl EventCounts {
    pub fn from_readings<R: ReadingData>(readings: &[R]) -> Self {
        let mut counts = Self::default();
        for r in readings {
            let v = r.value();
            if Thresholds::is_critical(v) {
                counts.critical += 1;
            }
            if v < Thresholds::HYPO {
                counts.hypo += 1;
            }
            if v > Thresholds::HYPER {
                counts.hyper += 1;
            }
        }
        counts
    }
}

/// Simple aggregate over a set of readings
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyStats {
    /// Mean rounded to the nearest whole mg/dL
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

/// Average/min/max/count; all zero for empty input
pub fn daily_stats<R: ReadingData>(readings: &[R]) -> DailyStats {
    if readings.is_empty() {
        return DailyStats::default();
    }

    let values: Vec<f64> = readings.iter().map(|r| r.value()).collect();
    DailyStats {
        average: mean(&values).round(),
        min: values.iter().copied().fold(f64::INFINITY, f64::min),
        max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        count: values.len(),
    }
}

/// Group readings by calendar day in the local time zone
pub fn group_by_day<R: ReadingData>(readings: &[R]) -> BTreeMap<NaiveDate, Vec<&R>> {
    group_by_day_in(readings, &Local)
}

/// Group readings by calendar day in the given time zone.
/// Within a day the input order is kept.
pub fn group_by_day_in<'a, R, Tz>(readings: &'a [R], tz: &Tz) -> BTreeMap<NaiveDate, Vec<&'a R>>
where
    R: ReadingData,
    Tz: TimeZone,
{
    let mut days: BTreeMap<NaiveDate, Vec<&R>> = BTreeMap::new();
    for reading in readings {
        let day = reading.timestamp().with_timezone(tz).date_naive();
        days.entry(day).or_default().push(reading);
    }
    days
}

/// Look-back window for an analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AnalysisPeriod {
    #[serde(rename = "7days")]
    #[default]
    Days7,
    #[serde(rename = "14days")]
    Days14,
    #[serde(rename = "30days")]
    Days30,
    #[serde(rename = "90days")]
    Days90,
}

impl AnalysisPeriod {
    pub fn days(self) -> i64 {
        match self {
            AnalysisPeriod::Days7 => 7,
            AnalysisPeriod::Days14 => 14,
            AnalysisPeriod::Days30 => 30,
            AnalysisPeriod::Days90 => 90,
        }
    }
}

impl std::str::FromStr for AnalysisPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "7days" | "7" => Ok(AnalysisPeriod::Days7),
            "14days" | "14" => Ok(AnalysisPeriod::Days14),
            "30days" | "30" => Ok(AnalysisPeriod::Days30),
            "90days" | "90" => Ok(AnalysisPeriod::Days90),
            other => Err(format!("unknown analysis period '{}'", other)),
        }
    }
}

/// Dashboard summary of one patient's readings over a period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlucoseAnalysis {
    pub period: AnalysisPeriod,
    pub average_value: f64,
    pub min_value: f64,
    pub max_value: f64,
    pub readings_count: usize,
    pub time_in_range: u8,
    pub hypoglycemia_events: usize,
    pub hyperglycemia_events: usize,
    pub trend: GlucoseTrend,
    pub risk_level: RiskLevel,
}

impl GlucoseAnalysis {
    /// Analyze the readings taken within `period` before `now`
    pub fn from_readings<R: ReadingData>(
        readings: &[R],
        period: AnalysisPeriod,
        now: DateTime<Utc>,
    ) -> Self {
        let cutoff = now - Duration::days(period.days());
        let window: Vec<&R> = readings.iter().filter(|r| r.timestamp() >= cutoff).collect();

        let stats = daily_stats(&window);
        let events = EventCounts::from_readings(&window);

        Self {
            period,
            average_value: stats.average,
            min_value: stats.min,
            max_value: stats.max,
            readings_count: stats.count,
            time_in_range: time_in_range(&window),
            hypoglycemia_events: events.hypo,
            hyperglycemia_events: events.hyper,
            trend: trend(&window),
            risk_level: risk_level(&window),
        }
    }
}

// ============= Helper Functions =============

/// Integer percentage, rounded half up
fn percent_of(part: usize, total: usize) -> u8 {
    ((part as f64 / total as f64) * 100.0).round() as u8
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by n)
fn population_std_dev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}
