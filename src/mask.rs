//! PII masking for safe logging
//!
//! Masking is irreversible partial obfuscation, not encryption. Every
//! function here is total: malformed input degrades to a fixed sentinel
//! string instead of an error, so a failure can never push the raw value
//! into an error path that might get logged.
//!
//! Masking an already masked value is not guaranteed to return the same
//! string.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

pub const INVALID_EMAIL: &str = "[INVALID_EMAIL]";
pub const MALFORMED_EMAIL: &str = "[MALFORMED_EMAIL]";
pub const INVALID_PHONE: &str = "[INVALID_PHONE]";
pub const SHORT_PHONE: &str = "****";
pub const ANONYMOUS: &str = "[ANONYMOUS]";
pub const NO_ID: &str = "[NO_ID]";
pub const INVALID_ID_FORMAT: &str = "[INVALID_ID_FORMAT]";
pub const REDACTED: &str = "[REDACTED]";
pub const DATE_REDACTED: &str = "[DATE_REDACTED]";
pub const CIRCULAR_REF: &str = "[CIRCULAR_REF]";

static PATIENT_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z]{2})-([0-9]{4})-([0-9]{4})$").expect("patient id pattern is valid")
});

// ============= Scalar masks =============

/// Mask an email address: `patient@example.com` -> `p*****t@e*****e.c*m`
pub fn mask_email(email: &str) -> String {
    if email.is_empty() {
        return INVALID_EMAIL.to_string();
    }

    let mut parts = email.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) if !local.is_empty() && !domain.is_empty() => {
            (local, domain)
        }
        _ => return MALFORMED_EMAIL.to_string(),
    };

    let masked_domain: Vec<String> = domain.split('.').map(mask_label).collect();
    format!("{}@{}", mask_label(local), masked_domain.join("."))
}

/// Keep first and last char of labels longer than 2, otherwise `**`
fn mask_label(label: &str) -> String {
    let chars: Vec<char> = label.chars().collect();
    if chars.len() > 2 {
        mask_interior(&chars)
    } else {
        "**".to_string()
    }
}

fn mask_interior(chars: &[char]) -> String {
    let mut out = String::with_capacity(chars.len() * 2);
    out.push(chars[0]);
    out.extend(std::iter::repeat('*').take(chars.len() - 2));
    out.push(chars[chars.len() - 1]);
    out
}

/// Mask a phone number: `+962791234567` -> `+962*******67`
pub fn mask_phone(phone: &str) -> String {
    if phone.is_empty() {
        return INVALID_PHONE.to_string();
    }

    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 4 {
        return SHORT_PHONE.to_string();
    }

    let prefix = if phone.starts_with('+') { "+" } else { "" };
    // At least two digits always stay masked
    let country_code = &digits[..3.min(digits.len() - 4)];
    let last_digits = &digits[digits.len() - 2..];
    let masked_len = digits.len() - country_code.len() - 2;

    format!("{}{}{}{}", prefix, country_code, "*".repeat(masked_len), last_digits)
}

/// Mask a person's name token by token: `Mohammed Ali` -> `M******d A*i`
pub fn mask_name(name: &str) -> String {
    let tokens: Vec<String> = name
        .split_whitespace()
        .map(|token| {
            let chars: Vec<char> = token.chars().collect();
            if chars.len() <= 2 {
                format!("{}*", chars[0])
            } else {
                mask_interior(&chars)
            }
        })
        .collect();

    if tokens.is_empty() {
        return ANONYMOUS.to_string();
    }
    tokens.join(" ")
}

/// Mask a patient id of the form `XX-NNNN-NNNN`: `JO-2025-0123` -> `JO-****-**23`
pub fn mask_patient_id(patient_id: &str) -> String {
    if patient_id.is_empty() {
        return NO_ID.to_string();
    }

    match split_patient_id(patient_id) {
        Some((prefix, _, number)) => format!("{}-****-**{}", prefix, &number[2..]),
        None => INVALID_ID_FORMAT.to_string(),
    }
}

/// Split `XX-NNNN-NNNN` into its three groups
pub(crate) fn split_patient_id(id: &str) -> Option<(&str, &str, &str)> {
    let caps = PATIENT_ID_RE.captures(id)?;
    Some((caps.get(1)?.as_str(), caps.get(2)?.as_str(), caps.get(3)?.as_str()))
}

// ============= Record graph =============

/// Shared, mutable container; lets callers build self-referencing records
pub type Shared<T> = Rc<RefCell<T>>;

/// An arbitrary structured record handed to the logger.
///
/// Lists and maps are reference counted so the same container may appear
/// more than once, including inside itself.
#[derive(Clone)]
pub enum Node {
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
    List(Shared<Vec<Node>>),
    Map(Shared<Vec<(String, Node)>>),
}

impl Node {
    pub fn text(s: impl Into<String>) -> Self {
        Node::Text(s.into())
    }

    pub fn list(items: Vec<Node>) -> Self {
        Node::List(Rc::new(RefCell::new(items)))
    }

    pub fn map<K: Into<String>>(entries: Vec<(K, Node)>) -> Self {
        let node = Node::Map(Rc::new(RefCell::new(Vec::with_capacity(entries.len()))));
        for (key, value) in entries {
            node.insert(key, value);
        }
        node
    }

    /// Set `key` on a map node, replacing an existing entry in place.
    /// Returns false if this node is not a map.
    pub fn insert(&self, key: impl Into<String>, value: Node) -> bool {
        let Node::Map(entries) = self else {
            return false;
        };
        let key = key.into();
        let mut entries = entries.borrow_mut();
        match entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => entries.push((key, value)),
        }
        true
    }

    /// Append to a list node. Returns false if this node is not a list.
    pub fn push(&self, value: Node) -> bool {
        let Node::List(items) = self else {
            return false;
        };
        items.borrow_mut().push(value);
        true
    }

    /// Identity of the shared container, if any
    fn container_id(&self) -> Option<usize> {
        match self {
            Node::List(items) => Some(Rc::as_ptr(items) as *const () as usize),
            Node::Map(entries) => Some(Rc::as_ptr(entries) as *const () as usize),
            _ => None,
        }
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Node::Null,
            Value::Bool(b) => Node::Bool(b),
            Value::Number(n) => Node::Number(n),
            Value::String(s) => Node::Text(s),
            Value::Array(items) => Node::list(items.into_iter().map(Node::from).collect()),
            Value::Object(map) => {
                Node::map(map.into_iter().map(|(k, v)| (k, Node::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Node::Text(s.to_string())
    }
}

impl From<String> for Node {
    fn from(s: String) -> Self {
        Node::Text(s)
    }
}

impl From<bool> for Node {
    fn from(b: bool) -> Self {
        Node::Bool(b)
    }
}

impl From<i64> for Node {
    fn from(n: i64) -> Self {
        Node::Number(n.into())
    }
}

impl From<f64> for Node {
    /// Non-finite floats have no JSON form and become `Null`
    fn from(n: f64) -> Self {
        Number::from_f64(n).map(Node::Number).unwrap_or(Node::Null)
    }
}

// ============= Structured masking =============

/// Category of personal data a field holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PiiCategory {
    Email,
    Phone,
    Name,
    PatientId,
    Secret,
    DateOfBirth,
}

impl PiiCategory {
    /// Substring heuristics over the lower-cased key, in priority order
    pub fn from_key(lower_key: &str) -> Option<Self> {
        let has = |needle: &str| lower_key.contains(needle);

        if has("email") {
            Some(PiiCategory::Email)
        } else if has("phone") || has("mobile") {
            Some(PiiCategory::Phone)
        } else if has("name") && !has("username") {
            Some(PiiCategory::Name)
        } else if has("patientid") || has("patient_id") {
            Some(PiiCategory::PatientId)
        } else if has("password") || has("token") || has("secret") {
            Some(PiiCategory::Secret)
        } else if has("dob") || has("dateofbirth") || has("birthdate") {
            Some(PiiCategory::DateOfBirth)
        } else {
            None
        }
    }

    /// Mask a field value of this category
    fn mask(self, value: &Node) -> Value {
        let masked = match (self, value) {
            (PiiCategory::Secret, _) => REDACTED.to_string(),
            (PiiCategory::DateOfBirth, _) => DATE_REDACTED.to_string(),
            (PiiCategory::Email, Node::Text(s)) => mask_email(s),
            (PiiCategory::Phone, Node::Text(s)) => mask_phone(s),
            (PiiCategory::Name, Node::Text(s)) => mask_name(s),
            (PiiCategory::PatientId, Node::Text(s)) => mask_patient_id(s),
            // Never recurse into a container under a PII key
            _ => REDACTED.to_string(),
        };
        Value::String(masked)
    }
}

impl std::str::FromStr for PiiCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(PiiCategory::Email),
            "phone" => Ok(PiiCategory::Phone),
            "name" => Ok(PiiCategory::Name),
            "patient_id" => Ok(PiiCategory::PatientId),
            "secret" => Ok(PiiCategory::Secret),
            "date_of_birth" => Ok(PiiCategory::DateOfBirth),
            other => Err(format!("unknown PII category '{}'", other)),
        }
    }
}

/// Masking policy: explicit field rules first, key heuristics second
#[derive(Debug, Clone, Default)]
pub struct PiiMasker {
    /// Lower-cased field name -> category
    fields: HashMap<String, PiiCategory>,
}

impl PiiMasker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a masker from explicit field rules
    pub fn with_fields<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, PiiCategory)>,
        K: AsRef<str>,
    {
        let fields = fields
            .into_iter()
            .map(|(k, c)| (k.as_ref().to_lowercase(), c))
            .collect();
        Self { fields }
    }

    /// Category for a field name, or `None` for ordinary data
    pub fn category_for(&self, key: &str) -> Option<PiiCategory> {
        let lower = key.to_lowercase();
        self.fields
            .get(&lower)
            .copied()
            .or_else(|| PiiCategory::from_key(&lower))
    }

    /// Deep, masked copy of a record graph
    pub fn mask(&self, node: &Node) -> Value {
        let mut stack = HashSet::new();
        self.mask_node(node, &mut stack)
    }

    /// Deep, masked copy of a JSON tree
    pub fn mask_json(&self, value: &Value) -> Value {
        self.mask(&Node::from(value.clone()))
    }

    fn mask_node(&self, node: &Node, stack: &mut HashSet<usize>) -> Value {
        let id = match node.container_id() {
            Some(id) => id,
            None => return scalar_value(node),
        };
        if !stack.insert(id) {
            return Value::String(CIRCULAR_REF.to_string());
        }

        let masked = match node {
            Node::List(items) => {
                let items = items.borrow();
                Value::Array(items.iter().map(|item| self.mask_node(item, stack)).collect())
            }
            Node::Map(entries) => {
                let entries = entries.borrow();
                let mut out = Map::with_capacity(entries.len());
                for (key, value) in entries.iter() {
                    let masked = match self.category_for(key) {
                        Some(category) => category.mask(value),
                        None => self.mask_node(value, stack),
                    };
                    out.insert(key.clone(), masked);
                }
                Value::Object(out)
            }
            _ => scalar_value(node),
        };

        // Only the current recursion path counts as a cycle
        stack.remove(&id);
        masked
    }
}

fn scalar_value(node: &Node) -> Value {
    match node {
        Node::Null => Value::Null,
        Node::Bool(b) => Value::Bool(*b),
        Node::Number(n) => Value::Number(n.clone()),
        Node::Text(s) => Value::String(s.clone()),
        Node::List(_) | Node::Map(_) => Value::Null,
    }
}

/// Mask a record graph using the built-in key heuristics
pub fn mask_pii(node: &Node) -> Value {
    PiiMasker::default().mask(node)
}

/// Mask a JSON tree using the built-in key heuristics
pub fn mask_json(value: &Value) -> Value {
    PiiMasker::default().mask_json(value)
}
