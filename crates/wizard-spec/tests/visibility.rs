use serde_json::{Value, json};

use wizard_spec::{
    AnswerMap, WizardSpec, resolve_visibility, visible_fields, visible_options, visible_steps,
};

fn fixture() -> WizardSpec {
    WizardSpec::from_json(include_str!("fixtures/household.json")).expect("fixture")
}

fn answers(value: Value) -> AnswerMap {
    AnswerMap::from_value(value).expect("object")
}

fn step_ids(spec: &WizardSpec, answers: &AnswerMap) -> Vec<String> {
    visible_steps(spec, answers)
        .into_iter()
        .map(|visible| visible.step.id.clone())
        .collect()
}

#[test]
fn family_house_hides_units_field() {
    let spec = fixture();
    let answers = answers(json!({ "propertyType": "family-house" }));
    let step = spec.step("property").unwrap();
    let ids = visible_fields(step, &answers)
        .into_iter()
        .map(|field| field.id.as_str())
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["propertyType"]);
}

#[test]
fn pool_in_current_appliances_reveals_pool_volume() {
    let spec = fixture();
    let step = spec.step("appliances").unwrap();

    let without = answers(json!({ "currentAppliances": ["wallbox"] }));
    assert!(visible_fields(step, &without).iter().all(|field| field.id != "poolVolume"));

    let with = answers(json!({ "currentAppliances": ["pool"] }));
    assert!(visible_fields(step, &with).iter().any(|field| field.id == "poolVolume"));
}

#[test]
fn step_predicate_filters_and_keeps_order() {
    let spec = fixture();
    assert_eq!(
        step_ids(&spec, &answers(json!({ "propertyType": "family-house" }))),
        vec!["property", "appliances", "contact", "summary"]
    );
    assert_eq!(
        step_ids(&spec, &answers(json!({ "propertyType": "commercial" }))),
        vec!["property", "appliances", "commercial", "contact", "summary"]
    );
}

#[test]
fn visible_position_maps_back_to_static_index() {
    let spec = fixture();
    let answers = answers(json!({ "propertyType": "family-house" }));
    let visible = visible_steps(&spec, &answers);
    for (static_index, step) in spec.steps.iter().enumerate() {
        let Some(position) = visible.iter().position(|entry| entry.index == static_index) else {
            assert_eq!(step.id, "commercial");
            continue;
        };
        assert_eq!(visible[position].step.id, step.id);
        assert_eq!(spec.steps[visible[position].index].id, step.id);
    }
}

#[test]
fn wallbox_hides_electric_car_but_keeps_none() {
    let spec = fixture();
    let field = spec.field("futureAppliances").unwrap();
    let answers = answers(json!({ "currentAppliances": ["wallbox", "pool"] }));
    let values = visible_options(field, &answers)
        .into_iter()
        .map(|option| option.value.as_str())
        .collect::<Vec<_>>();
    assert_eq!(values, vec!["heat-pump", "none"]);
}

#[test]
fn fields_of_hidden_steps_are_hidden() {
    let spec = fixture();
    let map = resolve_visibility(&spec, &answers(json!({ "propertyType": "family-house" })));
    assert_eq!(map.get("companyId"), Some(&false));
    assert_eq!(map.get("name"), Some(&true));
    assert_eq!(map.get("buildingUnits"), Some(&false));
}
