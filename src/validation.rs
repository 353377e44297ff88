//! Input validation for patient-entered data
//!
//! Validators return tagged results instead of panicking. Error messages are
//! meant for end users: they name the problem, never parser internals.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;
use crate::mask::split_patient_id;
use crate::units::Thresholds;

const NOTES_MAX_CHARS: usize = 500;
const PASSWORD_MIN_CHARS: usize = 8;
const PASSWORD_MAX_CHARS: usize = 128;
const NAME_MAX_CHARS: usize = 50;
const MESSAGE_MAX_CHARS: usize = 2000;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});
static JORDAN_PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\+962|00962|962|0)?7[789][0-9]{7}$").expect("phone pattern is valid")
});
static INTERNATIONAL_PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?[0-9]{10,15}$").expect("phone pattern is valid")
});

/// Raw input that can be checked into a trusted value
pub trait Validate {
    type Output;

    fn validate(self) -> Result<Self::Output, ValidationError>;
}

/// Deserialize and validate in one step. Only the first problem is
/// reported; shape errors collapse into a generic message.
pub fn validate_json<T>(value: &Value) -> Result<T::Output, ValidationError>
where
    T: Validate + DeserializeOwned,
{
    let raw: T = serde_json::from_value(value.clone())
        .map_err(|_| ValidationError::new("input", "Validation failed"))?;
    raw.validate()
}

// ============= Plain checks =============

/// `local@domain.tld` without whitespace
pub fn validate_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Jordanian mobile number: optional `+962`, `00962`, `962` or `0`, then
/// `77`, `78` or `79` and seven more digits. Spaces and dashes are ignored.
pub fn validate_jordanian_phone(phone: &str) -> bool {
    let clean: String = phone.chars().filter(|c| !c.is_whitespace() && *c != '-').collect();
    JORDAN_PHONE_RE.is_match(&clean)
}

/// Escape HTML-significant characters and trim
pub fn sanitize_input(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            c => out.push(c),
        }
    }
    out.trim().to_string()
}

// ============= Field validators =============

/// Patient identifier, `JO-YYYY-NNNN`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientId(String);

impl PatientId {
    pub fn parse(id: &str) -> Result<Self, ValidationError> {
        match split_patient_id(id) {
            Some(("JO", _, _)) => Ok(Self(id.to_string())),
            _ => Err(ValidationError::new(
                "patientId",
                "Patient ID must be in format JO-YYYY-NNNN",
            )),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PatientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whole mg/dL value within 20..=600
pub fn validate_glucose_level(value: f64) -> Result<u16, ValidationError> {
    let err = |msg: &str| ValidationError::new("glucoseLevel", msg);

    if !value.is_finite() || value.fract() != 0.0 {
        return Err(err("Glucose level must be an integer"));
    }
    if value < f64::from(Thresholds::MIN_VALID) {
        return Err(err("Glucose level must be at least 20 mg/dL"));
    }
    if value > f64::from(Thresholds::MAX_VALID) {
        return Err(err("Glucose level cannot exceed 600 mg/dL"));
    }
    Ok(value as u16)
}

/// Meal context selectable in the add-reading form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealContext {
    BeforeMeal,
    AfterMeal,
    Fasting,
    Bedtime,
}

impl MealContext {
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s {
            "before_meal" => Ok(MealContext::BeforeMeal),
            "after_meal" => Ok(MealContext::AfterMeal),
            "fasting" => Ok(MealContext::Fasting),
            "bedtime" => Ok(MealContext::Bedtime),
            _ => Err(ValidationError::new("context", "Invalid meal context")),
        }
    }
}

fn check_len(
    field: &'static str,
    s: &str,
    min: usize,
    max: usize,
    what: &str,
) -> Result<(), ValidationError> {
    let len = s.chars().count();
    if len < min {
        let msg = if min == 1 {
            format!("{} cannot be empty", what)
        } else {
            format!("{} must be at least {} characters", what, min)
        };
        return Err(ValidationError::new(field, msg));
    }
    if len > max {
        let msg = format!("{} cannot exceed {} characters", what, max);
        return Err(ValidationError::new(field, msg));
    }
    Ok(())
}

// ============= Schemas =============

/// Add-reading form as submitted
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReadingInput {
    pub glucose_level: f64,
    pub context: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingInput {
    pub glucose_level: u16,
    pub context: MealContext,
    pub notes: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl Validate for RawReadingInput {
    type Output = ReadingInput;

    fn validate(self) -> Result<ReadingInput, ValidationError> {
        let glucose_level = validate_glucose_level(self.glucose_level)?;
        let context = MealContext::parse(&self.context)?;
        if let Some(notes) = &self.notes {
            check_len("notes", notes, 0, NOTES_MAX_CHARS, "Notes")?;
        }
        // An empty notes field means no notes
        let notes = self.notes.filter(|n| !n.is_empty());

        Ok(ReadingInput { glucose_level, context, notes, timestamp: self.timestamp })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPatientLogin {
    pub patient_id: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatientLogin {
    pub patient_id: PatientId,
    pub password: String,
}

impl Validate for RawPatientLogin {
    type Output = PatientLogin;

    fn validate(self) -> Result<PatientLogin, ValidationError> {
        let patient_id = PatientId::parse(&self.patient_id)?;
        check_len("password", &self.password, PASSWORD_MIN_CHARS, PASSWORD_MAX_CHARS, "Password")?;
        Ok(PatientLogin { patient_id, password: self.password })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatientLanguage {
    #[default]
    Ar,
    En,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPatientData {
    pub patient_id: String,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub doctor_id: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

/// Patient profile as loaded from the document store
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientData {
    pub patient_id: PatientId,
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub doctor_id: Option<String>,
    pub language: PatientLanguage,
    pub active: bool,
}

impl Validate for RawPatientData {
    type Output = PatientData;

    fn validate(self) -> Result<PatientData, ValidationError> {
        let patient_id = PatientId::parse(&self.patient_id)?;
        check_len("firstName", &self.first_name, 1, NAME_MAX_CHARS, "First name")?;
        if let Some(last_name) = &self.last_name {
            check_len("lastName", last_name, 1, NAME_MAX_CHARS, "Last name")?;
        }
        if let Some(email) = &self.email {
            if !validate_email(email) {
                return Err(ValidationError::new("email", "Invalid email address"));
            }
        }
        if let Some(phone) = &self.phone {
            if !is_international_phone(phone) {
                return Err(ValidationError::new("phone", "Invalid phone number format"));
            }
        }
        let language = match self.language.as_deref() {
            None => PatientLanguage::default(),
            Some("ar") => PatientLanguage::Ar,
            Some("en") => PatientLanguage::En,
            Some(_) => return Err(ValidationError::new("language", "Invalid language")),
        };

        Ok(PatientData {
            patient_id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone,
            doctor_id: self.doctor_id,
            language,
            active: self.active.unwrap_or(true),
        })
    }
}

/// `+` optional, then 10 to 15 digits
fn is_international_phone(phone: &str) -> bool {
    INTERNATIONAL_PHONE_RE.is_match(phone)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderType {
    Patient,
    Doctor,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawChatMessage {
    pub message_text: String,
    pub patient_id: String,
    #[serde(default)]
    pub doctor_id: Option<String>,
    pub sender_id: String,
    pub sender_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub message_text: String,
    pub patient_id: PatientId,
    pub doctor_id: Option<String>,
    pub sender_id: String,
    pub sender_type: SenderType,
}

impl Validate for RawChatMessage {
    type Output = ChatMessage;

    fn validate(self) -> Result<ChatMessage, ValidationError> {
        check_len("messageText", &self.message_text, 1, MESSAGE_MAX_CHARS, "Message")?;
        let patient_id = PatientId::parse(&self.patient_id)?;
        check_len("senderId", &self.sender_id, 1, usize::MAX, "Sender")?;
        let sender_type = match self.sender_type.as_str() {
            "patient" => SenderType::Patient,
            "doctor" => SenderType::Doctor,
            _ => return Err(ValidationError::new("senderType", "Invalid sender type")),
        };

        Ok(ChatMessage {
            message_text: self.message_text,
            patient_id,
            doctor_id: self.doctor_id,
            sender_id: self.sender_id,
            sender_type,
        })
    }
}
