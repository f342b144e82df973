use std::collections::HashSet;

use regex::Regex;
use thiserror::Error;

use crate::answers::{DATE_KEY, SESSION_ID_KEY};
use crate::predicate::Predicate;
use crate::spec::{FieldSpec, WizardSpec};

const SOLAR: &str = include_str!("../catalogs/solar.json");
const AIR_CONDITIONING: &str = include_str!("../catalogs/air-conditioning.json");
const HEAT_PUMP: &str = include_str!("../catalogs/heat-pump.json");

#[derive(Debug, Error)]
pub enum SpecError {
    #[error("failed to parse wizard catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("wizard '{0}' defines no steps")]
    NoSteps(String),
    #[error("duplicate step id '{0}'")]
    DuplicateStep(String),
    #[error("duplicate field id '{0}'")]
    DuplicateField(String),
    #[error("choice field '{0}' must define options")]
    MissingOptions(String),
    #[error("{owner} references unknown field '{field}'")]
    UnknownReference { owner: String, field: String },
    #[error("field '{field}' has min {min} greater than max {max}")]
    InvertedBounds { field: String, min: f64, max: f64 },
    #[error("field '{field}' has an invalid pattern: {source}")]
    InvalidPattern {
        field: String,
        #[source]
        source: regex::Error,
    },
}

/// Built-in product catalogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Product {
    Solar,
    AirConditioning,
    HeatPump,
}

impl Product {
    pub const ALL: [Product; 3] = [Product::Solar, Product::AirConditioning, Product::HeatPump];

    pub fn as_str(&self) -> &'static str {
        match self {
            Product::Solar => "solar",
            Product::AirConditioning => "air-conditioning",
            Product::HeatPump => "heat-pump",
        }
    }

    fn source(&self) -> &'static str {
        match self {
            Product::Solar => SOLAR,
            Product::AirConditioning => AIR_CONDITIONING,
            Product::HeatPump => HEAT_PUMP,
        }
    }

    pub fn load(&self) -> Result<WizardSpec, SpecError> {
        WizardSpec::from_json(self.source())
    }
}

impl WizardSpec {
    /// Parses a catalog and checks its structure.
    pub fn from_json(json: &str) -> Result<Self, SpecError> {
        let spec: WizardSpec = serde_json::from_str(json)?;
        check_spec(&spec)?;
        Ok(spec)
    }
}

/// Rejects catalogs the engine cannot evaluate consistently.
pub fn check_spec(spec: &WizardSpec) -> Result<(), SpecError> {
    if spec.steps.is_empty() {
        return Err(SpecError::NoSteps(spec.id.clone()));
    }

    let mut step_ids = HashSet::new();
    let mut field_ids: HashSet<&str> = HashSet::from([SESSION_ID_KEY, DATE_KEY]);
    for step in &spec.steps {
        if !step_ids.insert(step.id.as_str()) {
            return Err(SpecError::DuplicateStep(step.id.clone()));
        }
        for field in &step.fields {
            if !field_ids.insert(field.id.as_str()) {
                return Err(SpecError::DuplicateField(field.id.clone()));
            }
        }
    }

    for step in &spec.steps {
        if let Some(predicate) = &step.visible_if {
            check_predicate(&format!("step '{}'", step.id), predicate, &field_ids)?;
        }
        for field in &step.fields {
            check_field(field, &field_ids)?;
        }
    }

    for (index, cascade) in spec.cascades.iter().enumerate() {
        let owner = format!("cascade #{}", index + 1);
        check_predicate(&owner, &cascade.when, &field_ids)?;
        if !field_ids.contains(cascade.target.as_str()) {
            return Err(SpecError::UnknownReference {
                owner,
                field: cascade.target.clone(),
            });
        }
    }

    Ok(())
}

fn check_field(field: &FieldSpec, known: &HashSet<&str>) -> Result<(), SpecError> {
    let owner = format!("field '{}'", field.id);
    if field.kind.is_choice() && field.options.is_empty() {
        return Err(SpecError::MissingOptions(field.id.clone()));
    }
    if let Some(predicate) = &field.visible_if {
        check_predicate(&owner, predicate, known)?;
    }
    for option in &field.options {
        if let Some(predicate) = &option.visible_if {
            check_predicate(
                &format!("option '{}' of field '{}'", option.value, field.id),
                predicate,
                known,
            )?;
        }
    }
    if let Some(source) = &field.exclude_owned
        && !known.contains(source.as_str())
    {
        return Err(SpecError::UnknownReference {
            owner,
            field: source.clone(),
        });
    }
    if let Some(constraint) = &field.constraint {
        if let (Some(min), Some(max)) = (constraint.min, constraint.max)
            && min > max
        {
            return Err(SpecError::InvertedBounds {
                field: field.id.clone(),
                min,
                max,
            });
        }
        if let Some(pattern) = &constraint.pattern {
            Regex::new(pattern).map_err(|source| SpecError::InvalidPattern {
                field: field.id.clone(),
                source,
            })?;
        }
    }
    Ok(())
}

fn check_predicate(
    owner: &str,
    predicate: &Predicate,
    known: &HashSet<&str>,
) -> Result<(), SpecError> {
    match predicate
        .dependencies()
        .into_iter()
        .find(|id| !known.contains(id))
    {
        Some(missing) => Err(SpecError::UnknownReference {
            owner: owner.to_string(),
            field: missing.to_string(),
        }),
        None => Ok(()),
    }
}
