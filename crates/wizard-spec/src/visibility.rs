use serde_json::Value;

use crate::answers::AnswerMap;
use crate::predicate::is_visible;
use crate::spec::{FieldSpec, OptionSpec, StepSpec, WizardSpec};

pub type VisibilityMap = std::collections::BTreeMap<String, bool>;

/// Option value that is never suppressed as already owned.
pub const NONE_OPTION: &str = "none";

/// Maps a "currently present" answer onto the "future" option it covers.
///
/// Identifiers missing from the table suppress nothing.
const OWNED_EQUIVALENTS: &[(&str, &str)] = &[
    ("wallbox", "electric-car"),
    ("electric-car", "electric-car"),
    ("heat-pump", "heat-pump"),
    ("air-conditioning", "air-conditioning"),
    ("pool", "pool"),
    ("battery", "battery"),
    ("photovoltaics", "photovoltaics"),
];

/// A step that is visible under the current answers.
#[derive(Debug, Clone, Copy)]
pub struct VisibleStep<'a> {
    /// Position in the authored (unfiltered) step list.
    pub index: usize,
    pub step: &'a StepSpec,
}

pub fn visible_steps<'a>(spec: &'a WizardSpec, answers: &AnswerMap) -> Vec<VisibleStep<'a>> {
    spec.steps
        .iter()
        .enumerate()
        .filter(|(_, step)| is_visible(step.visible_if.as_ref(), answers))
        .map(|(index, step)| VisibleStep { index, step })
        .collect()
}

pub fn visible_fields<'a>(step: &'a StepSpec, answers: &AnswerMap) -> Vec<&'a FieldSpec> {
    step.fields
        .iter()
        .filter(|field| is_visible(field.visible_if.as_ref(), answers))
        .collect()
}

pub fn visible_options<'a>(field: &'a FieldSpec, answers: &AnswerMap) -> Vec<&'a OptionSpec> {
    let owned = field
        .exclude_owned
        .as_deref()
        .map(|source| owned_equivalents(answers.get(source)))
        .unwrap_or_default();

    field
        .options
        .iter()
        .filter(|option| is_visible(option.visible_if.as_ref(), answers))
        .filter(|option| option.value == NONE_OPTION || !owned.contains(&option.value.as_str()))
        .collect()
}

fn owned_equivalents(current: Option<&Value>) -> Vec<&'static str> {
    let owned: Vec<&str> = match current {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        Some(Value::String(text)) => vec![text.as_str()],
        _ => Vec::new(),
    };
    OWNED_EQUIVALENTS
        .iter()
        .filter(|(present, _)| owned.contains(present))
        .map(|(_, future)| *future)
        .collect()
}

/// Field id -> visible, across the whole wizard.
///
/// A field is visible only when its step is visible too.
pub fn resolve_visibility(spec: &WizardSpec, answers: &AnswerMap) -> VisibilityMap {
    let mut map = VisibilityMap::new();
    for step in &spec.steps {
        let step_visible = is_visible(step.visible_if.as_ref(), answers);
        for field in &step.fields {
            let visible = step_visible && is_visible(field.visible_if.as_ref(), answers);
            map.insert(field.id.clone(), visible);
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn appliances_field() -> FieldSpec {
        serde_json::from_value(json!({
            "id": "futureAppliances",
            "type": "multi-select",
            "label": "Planned appliances",
            "exclude_owned": "currentAppliances",
            "options": [
                { "value": "electric-car", "label": "Electric car" },
                { "value": "heat-pump", "label": "Heat pump" },
                { "value": "sauna", "label": "Sauna" },
                { "value": "none", "label": "None of the above" }
            ]
        }))
        .expect("field")
    }

    fn values(options: &[&OptionSpec]) -> Vec<String> {
        options.iter().map(|option| option.value.clone()).collect()
    }

    #[test]
    fn wallbox_suppresses_electric_car() {
        let field = appliances_field();
        let answers = AnswerMap::from_value(json!({ "currentAppliances": ["wallbox"] })).unwrap();
        assert_eq!(
            values(&visible_options(&field, &answers)),
            vec!["heat-pump", "sauna", "none"]
        );
    }

    #[test]
    fn electric_car_does_not_suppress_wallbox_direction() {
        let field: FieldSpec = serde_json::from_value(json!({
            "id": "futureAppliances",
            "type": "multi-select",
            "label": "Planned",
            "exclude_owned": "currentAppliances",
            "options": [{ "value": "wallbox", "label": "Wallbox" }]
        }))
        .unwrap();
        let answers =
            AnswerMap::from_value(json!({ "currentAppliances": ["electric-car"] })).unwrap();
        assert_eq!(values(&visible_options(&field, &answers)), vec!["wallbox"]);
    }

    #[test]
    fn unmapped_identifiers_suppress_nothing() {
        let field = appliances_field();
        let answers = AnswerMap::from_value(json!({ "currentAppliances": ["sauna"] })).unwrap();
        assert_eq!(visible_options(&field, &answers).len(), 4);
    }

    #[test]
    fn none_option_survives_when_owned() {
        let field = appliances_field();
        let answers = AnswerMap::from_value(json!({
            "currentAppliances": ["none", "heat-pump", "wallbox"]
        }))
        .unwrap();
        assert_eq!(values(&visible_options(&field, &answers)), vec!["sauna", "none"]);
    }
}
