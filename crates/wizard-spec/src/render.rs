use std::collections::BTreeSet;

use serde_json::{Map, Value, json};

use crate::{
    answers::{AnswerMap, ValidationError},
    spec::{FieldKind, WizardSpec},
    visibility::{visible_fields, visible_options, visible_steps},
};

/// Progress counters exposed to renderers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderProgress {
    /// 1-based position of the active step among visible steps (0 if hidden).
    pub position: usize,
    pub total: usize,
    pub completed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOption {
    pub value: String,
    pub label: String,
}

/// Describes a single visible field for render outputs.
#[derive(Debug, Clone)]
pub struct RenderField {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    pub kind: FieldKind,
    pub required: bool,
    pub group: Option<String>,
    pub options: Vec<RenderOption>,
    pub current_value: Option<Value>,
    pub error: Option<String>,
}

/// Everything a renderer needs to draw the active step.
#[derive(Debug, Clone)]
pub struct RenderPayload {
    pub wizard_id: String,
    pub wizard_title: String,
    pub step_id: String,
    pub step_title: String,
    pub step_description: Option<String>,
    pub show_progress: bool,
    pub progress: RenderProgress,
    pub fields: Vec<RenderField>,
    pub errors: Vec<ValidationError>,
}

impl RenderPayload {
    pub fn field(&self, id: &str) -> Option<&RenderField> {
        self.fields.iter().find(|field| field.id == id)
    }
}

/// Build the renderer payload for the step at `current_index`.
///
/// Panics if `current_index` is outside the authored step list.
pub fn build_render_payload(
    spec: &WizardSpec,
    answers: &AnswerMap,
    current_index: usize,
    errors: &[ValidationError],
    completed: &BTreeSet<usize>,
) -> RenderPayload {
    let step = &spec.steps[current_index];
    let visible = visible_steps(spec, answers);
    let position = visible
        .iter()
        .position(|entry| entry.index == current_index)
        .map(|position| position + 1)
        .unwrap_or(0);

    let fields = visible_fields(step, answers)
        .into_iter()
        .map(|field| RenderField {
            id: field.id.clone(),
            label: field.label.clone(),
            description: field.description.clone(),
            kind: field.kind,
            required: field.required,
            group: field.group.clone(),
            options: visible_options(field, answers)
                .into_iter()
                .map(|option| RenderOption {
                    value: option.value.clone(),
                    label: option.label.clone(),
                })
                .collect(),
            current_value: answers.get(&field.id).cloned(),
            error: errors
                .iter()
                .find(|error| error.field_id == field.id)
                .map(|error| error.message.clone()),
        })
        .collect::<Vec<_>>();

    RenderPayload {
        wizard_id: spec.id.clone(),
        wizard_title: spec.title.clone(),
        step_id: step.id.clone(),
        step_title: step.title.clone(),
        step_description: step.description.clone(),
        show_progress: spec.settings.show_progress,
        progress: RenderProgress {
            position,
            total: visible.len(),
            completed: completed.len(),
        },
        fields,
        errors: errors.to_vec(),
    }
}

/// Render the payload as a structured JSON-friendly value.
pub fn render_json_ui(payload: &RenderPayload) -> Value {
    let fields = payload
        .fields
        .iter()
        .map(|field| {
            let mut map = Map::new();
            map.insert("id".into(), Value::String(field.id.clone()));
            map.insert("label".into(), Value::String(field.label.clone()));
            map.insert(
                "description".into(),
                field
                    .description
                    .clone()
                    .map(Value::String)
                    .unwrap_or(Value::Null),
            );
            map.insert("type".into(), Value::String(field.kind.as_str().into()));
            map.insert("required".into(), Value::Bool(field.required));
            if let Some(group) = &field.group {
                map.insert("group".into(), Value::String(group.clone()));
            }
            if !field.options.is_empty() {
                map.insert(
                    "options".into(),
                    Value::Array(
                        field
                            .options
                            .iter()
                            .map(|option| json!({ "value": option.value, "label": option.label }))
                            .collect(),
                    ),
                );
            }
            if let Some(current_value) = &field.current_value {
                map.insert("current_value".into(), current_value.clone());
            }
            if let Some(error) = &field.error {
                map.insert("error".into(), Value::String(error.clone()));
            }
            Value::Object(map)
        })
        .collect::<Vec<_>>();

    let mut ui = json!({
        "wizard_id": payload.wizard_id,
        "wizard_title": payload.wizard_title,
        "step": {
            "id": payload.step_id,
            "title": payload.step_title,
            "description": payload.step_description,
        },
        "fields": fields,
        "errors": payload.errors,
    });
    if payload.show_progress {
        ui["progress"] = json!({
            "position": payload.progress.position,
            "total": payload.progress.total,
            "completed": payload.progress.completed,
        });
    }
    ui
}

/// Render the payload as human-friendly text.
pub fn render_text(payload: &RenderPayload) -> String {
    let mut lines = Vec::new();
    lines.push(format!("{} ({})", payload.wizard_title, payload.wizard_id));
    if payload.show_progress {
        lines.push(format!(
            "Step {}/{}: {}",
            payload.progress.position, payload.progress.total, payload.step_title
        ));
    } else {
        lines.push(format!("Step: {}", payload.step_title));
    }
    if let Some(description) = &payload.step_description {
        lines.push(description.clone());
    }

    for field in &payload.fields {
        if field.kind == FieldKind::Note {
            lines.push(format!("  {}", field.label));
            continue;
        }
        let mut entry = format!(" - {} ({})", field.label, field.id);
        if field.required {
            entry.push_str(" [required]");
        }
        if let Some(value) = &field.current_value {
            entry.push_str(&format!(" = {}", value_to_display(value)));
        }
        lines.push(entry);
        if !field.options.is_empty() {
            let options = field
                .options
                .iter()
                .map(|option| option.value.as_str())
                .collect::<Vec<_>>()
                .join("/");
            lines.push(format!("     options: {}", options));
        }
        if let Some(error) = &field.error {
            lines.push(format!("     ! {}", error));
        }
    }

    lines.join("\n")
}

pub fn value_to_display(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(num) => num.to_string(),
        Value::Array(items) => items
            .iter()
            .map(value_to_display)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(map) => match map.get("value") {
            Some(inner) => value_to_display(inner),
            None => value.to_string(),
        },
        Value::Null => String::new(),
    }
}
