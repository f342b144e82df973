use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::predicate::Predicate;
use crate::spec::field::FieldSpec;
use crate::spec::step::StepSpec;

/// Behavioural and presentational toggles for a wizard.
///
/// Only `allow_back_navigation` and `allow_skip_steps` affect navigation; the
/// rest are passed through to renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WizardSettings {
    #[serde(default = "default_true")]
    pub allow_back_navigation: bool,
    #[serde(default)]
    pub allow_skip_steps: bool,
    #[serde(default = "default_true")]
    pub show_progress: bool,
    #[serde(default = "default_true")]
    pub require_email: bool,
    /// Accepted for compatibility; sessions are never persisted.
    #[serde(default)]
    pub autosave: bool,
}

fn default_true() -> bool {
    true
}

impl Default for WizardSettings {
    fn default() -> Self {
        Self {
            allow_back_navigation: true,
            allow_skip_steps: false,
            show_progress: true,
            require_email: true,
            autosave: false,
        }
    }
}

/// Field ids and sentinel values consulted on advance and submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SubmitPolicy {
    #[serde(default = "default_summary_step")]
    pub summary_step: String,
    #[serde(default = "default_consent_field")]
    pub consent_field: String,
    #[serde(default = "default_contact_preference_field")]
    pub contact_preference_field: String,
    #[serde(default = "default_research_only_value")]
    pub research_only_value: String,
}

fn default_summary_step() -> String {
    "summary".into()
}

fn default_consent_field() -> String {
    "consent".into()
}

fn default_contact_preference_field() -> String {
    "contactPreference".into()
}

fn default_research_only_value() -> String {
    "research-only".into()
}

impl Default for SubmitPolicy {
    fn default() -> Self {
        Self {
            summary_step: default_summary_step(),
            consent_field: default_consent_field(),
            contact_preference_field: default_contact_preference_field(),
            research_only_value: default_research_only_value(),
        }
    }
}

/// Adds `add` to the list answer `target` whenever `when` holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CascadeRule {
    /// Restricts the rule to changes made while this step is active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_step: Option<String>,
    pub when: Predicate,
    pub target: String,
    pub add: Value,
}

/// Top-level wizard definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WizardSpec {
    pub id: String,
    pub title: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub settings: WizardSettings,
    #[serde(default)]
    pub submit: SubmitPolicy,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cascades: Vec<CascadeRule>,
    pub steps: Vec<StepSpec>,
}

impl WizardSpec {
    pub fn step(&self, id: &str) -> Option<&StepSpec> {
        self.steps.iter().find(|step| step.id == id)
    }

    /// Looks a field up across every step.
    pub fn field(&self, id: &str) -> Option<&FieldSpec> {
        self.fields().find(|field| field.id == id)
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.steps.iter().flat_map(|step| step.fields.iter())
    }
}
