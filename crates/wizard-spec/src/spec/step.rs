use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::predicate::Predicate;
use crate::spec::field::FieldSpec;

/// Presentation-only grouping of fields within a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StepSection {
    pub title: String,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StepSpec {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fields: Vec<FieldSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<StepSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_if: Option<Predicate>,
}
