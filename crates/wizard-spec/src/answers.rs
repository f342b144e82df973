use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Seeded into every session's answers.
pub const SESSION_ID_KEY: &str = "session_id";
pub const DATE_KEY: &str = "date";

/// Flat mapping from field id to the answer given for it.
///
/// Values are JSON scalars, lists of strings for multi-select fields, or
/// structured objects (addresses, attachments).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerMap(Map<String, Value>);

impl AnswerMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a JSON object; any other JSON value yields `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn get(&self, field_id: &str) -> Option<&Value> {
        self.0.get(field_id)
    }

    pub fn contains(&self, field_id: &str) -> bool {
        self.0.contains_key(field_id)
    }

    /// Replaces the answer stored under `field_id`.
    pub fn insert(&mut self, field_id: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field_id.into(), value)
    }

    pub fn remove(&mut self, field_id: &str) -> Option<Value> {
        self.0.remove(field_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the field holds something that counts as an answer.
    pub fn has_value(&self, field_id: &str) -> bool {
        self.get(field_id).is_some_and(is_filled)
    }
}

impl FromIterator<(String, Value)> for AnswerMap {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Absent, blank text and empty lists are unanswered; `false` is an answer.
pub fn is_filled(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(_) | Value::Number(_) => true,
        Value::String(text) => !text.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => match map.get("value") {
            Some(inner) => is_filled(inner),
            None => !map.is_empty(),
        },
    }
}

/// Per-field validation failure. Recomputed on every pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub field_id: String,
    pub message: String,
    pub code: String,
}

impl ValidationError {
    pub fn new(field_id: &str, message: impl Into<String>, code: &str) -> Self {
        Self {
            field_id: field_id.to_string(),
            message: message.into(),
            code: code.to_string(),
        }
    }
}

/// Outcome of validating every visible step of a wizard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub missing_required: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_values_are_not_filled() {
        assert!(!is_filled(&Value::Null));
        assert!(!is_filled(&json!("")));
        assert!(!is_filled(&json!("   ")));
        assert!(!is_filled(&json!([])));
        assert!(!is_filled(&json!({ "value": "" })));
    }

    #[test]
    fn zero_false_and_lists_are_filled() {
        assert!(is_filled(&json!(0)));
        assert!(is_filled(&json!(false)));
        assert!(is_filled(&json!(["pool"])));
        assert!(is_filled(&json!(true)));
        assert!(is_filled(&json!({ "value": "Prague 1", "lat": 50.08 })));
    }

    #[test]
    fn from_value_rejects_non_objects() {
        assert!(AnswerMap::from_value(json!([1, 2])).is_none());
        let answers = AnswerMap::from_value(json!({ "a": "b" })).expect("object");
        assert!(answers.has_value("a"));
        assert!(!answers.has_value("missing"));
    }
}
