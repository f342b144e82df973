use std::collections::HashMap;
use std::sync::{LazyLock, Mutex, PoisonError};

use regex::Regex;
use serde_json::Value;

use crate::answers::{AnswerMap, ValidationError, ValidationResult, is_filled};
use crate::spec::{Constraint, FieldKind, FieldSpec, StepSpec, WizardSpec};
use crate::visibility::{visible_fields, visible_steps};

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex"));

static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\+420)?\s*\d{3}\s*\d{3}\s*\d{3}$").expect("phone regex")
});

/// Compiled author patterns; `None` marks a pattern that does not compile.
static PATTERNS: LazyLock<Mutex<HashMap<String, Option<Regex>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Validates the fields of `step` that are visible under `answers`.
///
/// Hidden fields are skipped even when they hold stale values.
pub fn validate_step(step: &StepSpec, answers: &AnswerMap) -> Vec<ValidationError> {
    visible_fields(step, answers)
        .into_iter()
        .filter_map(|field| validate_field(field, answers.get(&field.id)))
        .collect()
}

/// Validates every visible step.
pub fn validate(spec: &WizardSpec, answers: &AnswerMap) -> ValidationResult {
    let errors: Vec<ValidationError> = visible_steps(spec, answers)
        .into_iter()
        .flat_map(|visible| validate_step(visible.step, answers))
        .collect();
    let missing_required = errors
        .iter()
        .filter(|error| error.code == "required")
        .map(|error| error.field_id.clone())
        .collect();

    ValidationResult {
        valid: errors.is_empty(),
        errors,
        missing_required,
    }
}

fn validate_field(field: &FieldSpec, value: Option<&Value>) -> Option<ValidationError> {
    let value = match value.filter(|value| is_filled(value)) {
        Some(value) => value,
        None if field.required && field.kind != FieldKind::Note => {
            return Some(ValidationError::new(
                &field.id,
                "This field is required.",
                "required",
            ));
        }
        None => return None,
    };

    match field.kind {
        FieldKind::Email => check_email(field, value),
        FieldKind::Phone => check_phone(field, value),
        FieldKind::Number | FieldKind::Slider => check_number(field, value),
        FieldKind::Text | FieldKind::Textarea => check_pattern(field, value),
        FieldKind::Select
        | FieldKind::MultiSelect
        | FieldKind::Radio
        | FieldKind::Checkbox
        | FieldKind::File
        | FieldKind::Date
        | FieldKind::Address
        | FieldKind::Note => None,
    }
}

fn check_email(field: &FieldSpec, value: &Value) -> Option<ValidationError> {
    match value.as_str() {
        Some(text) if EMAIL.is_match(text.trim()) => None,
        _ => Some(ValidationError::new(
            &field.id,
            "Enter a valid email address.",
            "invalid_email",
        )),
    }
}

fn check_phone(field: &FieldSpec, value: &Value) -> Option<ValidationError> {
    match value.as_str() {
        Some(text) if PHONE.is_match(text.trim()) => None,
        _ => Some(ValidationError::new(
            &field.id,
            "Enter a valid phone number, e.g. +420 123 456 789.",
            "invalid_phone",
        )),
    }
}

/// Accepts JSON numbers and numeric strings.
pub fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

fn check_number(field: &FieldSpec, value: &Value) -> Option<ValidationError> {
    let Some(number) = numeric_value(value) else {
        return Some(ValidationError::new(
            &field.id,
            "Enter a number.",
            "not_a_number",
        ));
    };
    let constraint = field.constraint.as_ref()?;

    if let Some(min) = constraint.min
        && number < min
    {
        return Some(ValidationError::new(
            &field.id,
            format!("Value must be at least {}.", min),
            "min",
        ));
    }

    if let Some(max) = constraint.max
        && number > max
    {
        return Some(ValidationError::new(
            &field.id,
            format!("Value must be at most {}.", max),
            "max",
        ));
    }

    None
}

fn check_pattern(field: &FieldSpec, value: &Value) -> Option<ValidationError> {
    let Constraint {
        pattern: Some(pattern),
        message,
        ..
    } = field.constraint.as_ref()?
    else {
        return None;
    };
    let text = value.as_str()?;
    let Some(regex) = compiled(pattern) else {
        return Some(ValidationError::new(
            &field.id,
            "This field cannot be checked right now.",
            "invalid_pattern",
        ));
    };
    if regex.is_match(text) {
        None
    } else {
        Some(ValidationError::new(
            &field.id,
            message
                .clone()
                .unwrap_or_else(|| "Value has an invalid format.".into()),
            "pattern_mismatch",
        ))
    }
}

fn compiled(pattern: &str) -> Option<Regex> {
    let mut cache = PATTERNS.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(regex) = cache.get(pattern) {
        return regex.clone();
    }
    let regex = Regex::new(pattern).ok();
    cache.insert(pattern.to_string(), regex.clone());
    regex
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field(value: Value) -> FieldSpec {
        serde_json::from_value(value).expect("field")
    }

    #[test]
    fn phone_accepts_grouped_digits_with_prefix() {
        let phone = field(json!({ "id": "phone", "type": "phone", "label": "Phone" }));
        for ok in ["+420 123 456 789", "123456789", "+420123456789", " 123 456789 "] {
            assert!(validate_field(&phone, Some(&json!(ok))).is_none(), "{ok}");
        }
        for bad in ["12345678", "+421 123 456 789", "123-456-789", "phone"] {
            let error = validate_field(&phone, Some(&json!(bad))).expect(bad);
            assert_eq!(error.code, "invalid_phone");
        }
    }

    #[test]
    fn email_requires_domain_and_tld() {
        let email = field(json!({ "id": "email", "type": "email", "label": "Email" }));
        assert!(validate_field(&email, Some(&json!("jana@example.cz"))).is_none());
        assert_eq!(
            validate_field(&email, Some(&json!("jana@example")))
                .unwrap()
                .code,
            "invalid_email"
        );
    }

    #[test]
    fn number_bounds_are_inclusive() {
        let units = field(json!({
            "id": "units",
            "type": "number",
            "label": "Units",
            "constraint": { "min": 1, "max": 10 }
        }));
        assert!(validate_field(&units, Some(&json!(1))).is_none());
        assert!(validate_field(&units, Some(&json!("10"))).is_none());
        assert_eq!(validate_field(&units, Some(&json!(0))).unwrap().code, "min");
        assert_eq!(validate_field(&units, Some(&json!(11))).unwrap().code, "max");
        assert_eq!(
            validate_field(&units, Some(&json!("ten"))).unwrap().code,
            "not_a_number"
        );
    }

    #[test]
    fn optional_empty_field_skips_type_checks() {
        let email = field(json!({ "id": "email", "type": "email", "label": "Email" }));
        assert!(validate_field(&email, Some(&json!(""))).is_none());
        assert!(validate_field(&email, None).is_none());
    }

    #[test]
    fn pattern_uses_custom_message() {
        let company = field(json!({
            "id": "company_id",
            "type": "text",
            "label": "Company ID",
            "constraint": { "pattern": "^\\d{8}$", "message": "Company ID has 8 digits." }
        }));
        let error = validate_field(&company, Some(&json!("1234"))).unwrap();
        assert_eq!(error.message, "Company ID has 8 digits.");
        assert!(validate_field(&company, Some(&json!("12345678"))).is_none());
    }

    #[test]
    fn uncompilable_pattern_fails_closed_on_every_pass() {
        let broken = field(json!({
            "id": "reference",
            "type": "text",
            "label": "Reference",
            "constraint": { "pattern": "(" }
        }));
        for _ in 0..2 {
            let error = validate_field(&broken, Some(&json!("anything"))).unwrap();
            assert_eq!(error.code, "invalid_pattern");
        }
        assert!(validate_field(&broken, None).is_none());
    }

    #[test]
    fn unchecked_required_checkbox_is_answered() {
        let newsletter = field(json!({
            "id": "newsletter",
            "type": "checkbox",
            "label": "Send me news",
            "required": true
        }));
        assert!(validate_field(&newsletter, Some(&json!(false))).is_none());
        assert_eq!(
            validate_field(&newsletter, None).unwrap().code,
            "required"
        );
    }
}
