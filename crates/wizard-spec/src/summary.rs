use std::path::Path;

use handlebars::Handlebars;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::answers::{AnswerMap, DATE_KEY, SESSION_ID_KEY};
use crate::render::value_to_display;
use crate::spec::{FieldKind, FieldSpec, WizardSpec};
use crate::visibility::{visible_fields, visible_steps};

const SUMMARY_TEMPLATE_NAME: &str = "summary";

const DEFAULT_SUMMARY_TEMPLATE: &str = "# {{title}}

Reference: {{session_id}}
Date: {{date}}
{{#each sections}}

## {{title}}
{{#each entries}}
- {{label}}: {{value}}
{{/each}}
{{/each}}
{{#if attachments}}

## Attachments
{{#each attachments}}
- {{label}}: {{name}}
{{/each}}
{{/if}}
";

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("invalid summary template: {0}")]
    Template(#[from] Box<handlebars::TemplateError>),
    #[error("failed to render summary: {0}")]
    Render(#[from] Box<handlebars::RenderError>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryEntry {
    pub field_id: String,
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummarySection {
    pub step_id: String,
    pub title: String,
    pub entries: Vec<SummaryEntry>,
}

/// Uploaded file referenced by a `file` answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attachment {
    pub field_id: String,
    pub label: String,
    pub name: String,
    pub path: Option<String>,
}

/// Rendered summary plus the files that travel alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryDocument {
    pub title: String,
    pub body: String,
    pub sections: Vec<SummarySection>,
    pub attachments: Vec<Attachment>,
}

#[derive(Serialize)]
struct TemplateData<'a> {
    title: &'a str,
    session_id: String,
    date: String,
    sections: &'a [SummarySection],
    attachments: &'a [Attachment],
}

/// Renders answered, visible fields through a handlebars template.
pub struct SummaryRenderer {
    registry: Handlebars<'static>,
}

impl SummaryRenderer {
    pub fn new() -> Result<Self, SummaryError> {
        Self::with_template(DEFAULT_SUMMARY_TEMPLATE)
    }

    pub fn with_template(template: &str) -> Result<Self, SummaryError> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        registry
            .register_template_string(SUMMARY_TEMPLATE_NAME, template)
            .map_err(Box::new)?;
        Ok(Self { registry })
    }

    pub fn render(
        &self,
        spec: &WizardSpec,
        answers: &AnswerMap,
    ) -> Result<SummaryDocument, SummaryError> {
        let (sections, attachments) = collect(spec, answers);
        let data = TemplateData {
            title: &spec.title,
            session_id: answers.get(SESSION_ID_KEY).map(value_to_display).unwrap_or_default(),
            date: answers.get(DATE_KEY).map(value_to_display).unwrap_or_default(),
            sections: &sections,
            attachments: &attachments,
        };
        let body = self
            .registry
            .render(SUMMARY_TEMPLATE_NAME, &data)
            .map_err(Box::new)?;
        Ok(SummaryDocument {
            title: spec.title.clone(),
            body,
            sections,
            attachments,
        })
    }
}

/// Visibility is re-derived here; callers' UI state is not trusted.
pub fn collect(spec: &WizardSpec, answers: &AnswerMap) -> (Vec<SummarySection>, Vec<Attachment>) {
    let mut sections = Vec::new();
    let mut attachments = Vec::new();

    for visible in visible_steps(spec, answers) {
        let mut entries = Vec::new();
        for field in visible_fields(visible.step, answers) {
            if !answers.has_value(&field.id) {
                continue;
            }
            let Some(value) = answers.get(&field.id) else {
                continue;
            };
            match field.kind {
                FieldKind::Note => {}
                FieldKind::File => attachments.extend(file_attachments(field, value)),
                _ => entries.push(SummaryEntry {
                    field_id: field.id.clone(),
                    label: field.label.clone(),
                    value: display_answer(field, value),
                }),
            }
        }
        if !entries.is_empty() {
            sections.push(SummarySection {
                step_id: visible.step.id.clone(),
                title: visible.step.title.clone(),
                entries,
            });
        }
    }

    (sections, attachments)
}

fn display_answer(field: &FieldSpec, value: &Value) -> String {
    match (field.kind, value) {
        (_, Value::Bool(true)) => "Yes".to_string(),
        (_, Value::Bool(false)) => "No".to_string(),
        (kind, Value::Array(items)) if kind.is_choice() => items
            .iter()
            .map(|item| field.option_label(item))
            .collect::<Vec<_>>()
            .join(", "),
        (kind, Value::String(_)) if kind.is_choice() => field.option_label(value),
        _ => value_to_display(value),
    }
}

fn file_attachments(field: &FieldSpec, value: &Value) -> Vec<Attachment> {
    let items = match value {
        Value::Array(items) => items.iter().collect::<Vec<_>>(),
        other => vec![other],
    };
    items
        .into_iter()
        .filter_map(|item| {
            let (name, path) = match item {
                Value::String(path) => (file_name(path), Some(path.clone())),
                Value::Object(map) => {
                    let path = map.get("path").and_then(Value::as_str).map(String::from);
                    let name = map
                        .get("name")
                        .and_then(Value::as_str)
                        .map(String::from)
                        .or_else(|| path.as_deref().map(file_name))?;
                    (name, path)
                }
                _ => return None,
            };
            Some(Attachment {
                field_id: field.id.clone(),
                label: field.label.clone(),
                name,
                path,
            })
        })
        .collect()
}

fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(path)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn file_answers_accept_paths_and_objects() {
        let field: FieldSpec = serde_json::from_value(json!({
            "id": "photos",
            "type": "file",
            "label": "Photos"
        }))
        .unwrap();
        let attachments = file_attachments(
            &field,
            &json!(["/tmp/roof.jpg", { "name": "meter.png", "path": "/tmp/x.png" }, 7]),
        );
        let names = attachments
            .iter()
            .map(|attachment| attachment.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["roof.jpg", "meter.png"]);
    }

    #[test]
    fn custom_template_errors_are_reported() {
        assert!(matches!(
            SummaryRenderer::with_template("{{#each}}"),
            Err(SummaryError::Template(_))
        ));
    }
}
