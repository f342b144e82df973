use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::predicate::Predicate;

/// Supported field kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum FieldKind {
    Text,
    Email,
    Phone,
    Number,
    Select,
    MultiSelect,
    Radio,
    Checkbox,
    File,
    Date,
    Address,
    Slider,
    Textarea,
    Note,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Email => "email",
            FieldKind::Phone => "phone",
            FieldKind::Number => "number",
            FieldKind::Select => "select",
            FieldKind::MultiSelect => "multi-select",
            FieldKind::Radio => "radio",
            FieldKind::Checkbox => "checkbox",
            FieldKind::File => "file",
            FieldKind::Date => "date",
            FieldKind::Address => "address",
            FieldKind::Slider => "slider",
            FieldKind::Textarea => "textarea",
            FieldKind::Note => "note",
        }
    }

    /// Kinds whose answers come from a list of options.
    pub fn is_choice(&self) -> bool {
        matches!(
            self,
            FieldKind::Select | FieldKind::MultiSelect | FieldKind::Radio
        )
    }
}

/// Numeric bounds and text pattern for a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct Constraint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Shown instead of the generic message when `pattern` does not match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OptionSpec {
    pub value: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_if: Option<Predicate>,
}

/// A single input (or static note) inside a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FieldSpec {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_if: Option<Predicate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<Constraint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionSpec>,
    /// Ownership grouping tag (e.g. `property`, `contact`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Field listing what is already present; equivalent options are hidden.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_owned: Option<String>,
}

impl FieldSpec {
    pub fn option(&self, value: &str) -> Option<&OptionSpec> {
        self.options.iter().find(|option| option.value == value)
    }

    /// Label for a stored option value, falling back to the raw value.
    pub fn option_label(&self, value: &Value) -> String {
        match value.as_str() {
            Some(text) => self
                .option(text)
                .map(|option| option.label.clone())
                .unwrap_or_else(|| text.to_string()),
            None => value.to_string(),
        }
    }
}
