use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::answers::AnswerMap;

/// Visibility condition attached to steps, fields, options and cascades.
///
/// The node holds when the answer to `depends_on` matches one of `values`.
/// `and` children narrow that result, then `or` children widen it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Predicate {
    pub depends_on: String,
    #[serde(default)]
    pub values: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub and: Vec<Predicate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub or: Vec<Predicate>,
}

impl Predicate {
    pub fn new(depends_on: impl Into<String>, values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            depends_on: depends_on.into(),
            values: values.into_iter().collect(),
            and: Vec::new(),
            or: Vec::new(),
        }
    }

    pub fn with_and(mut self, predicate: Predicate) -> Self {
        self.and.push(predicate);
        self
    }

    pub fn with_or(mut self, predicate: Predicate) -> Self {
        self.or.push(predicate);
        self
    }

    /// Evaluates the predicate tree against the current answers.
    ///
    /// AND children are applied before OR children; the order is observable
    /// for nodes carrying both.
    pub fn evaluate(&self, answers: &AnswerMap) -> bool {
        let mut result = self.base_holds(answers);
        if !self.and.is_empty() {
            result = result && self.and.iter().all(|child| child.evaluate(answers));
        }
        if !self.or.is_empty() {
            result = result || self.or.iter().any(|child| child.evaluate(answers));
        }
        result
    }

    fn base_holds(&self, answers: &AnswerMap) -> bool {
        match answers.get(&self.depends_on) {
            None | Some(Value::Null) => false,
            Some(Value::Array(items)) => items.iter().any(|item| self.values.contains(item)),
            Some(scalar) => self.values.contains(scalar),
        }
    }

    /// Every field id referenced anywhere in the tree.
    pub fn dependencies(&self) -> Vec<&str> {
        let mut ids = vec![self.depends_on.as_str()];
        for child in self.and.iter().chain(self.or.iter()) {
            ids.extend(child.dependencies());
        }
        ids
    }
}

/// Absent predicates always hold.
pub fn is_visible(predicate: Option<&Predicate>, answers: &AnswerMap) -> bool {
    predicate.is_none_or(|predicate| predicate.evaluate(answers))
}
