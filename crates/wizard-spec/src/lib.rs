#![allow(missing_docs)]

pub mod answers;
pub mod catalog;
pub mod predicate;
pub mod render;
pub mod spec;
pub mod summary;
pub mod validate;
pub mod visibility;

pub use answers::{
    AnswerMap, DATE_KEY, SESSION_ID_KEY, ValidationError, ValidationResult, is_filled,
};
pub use catalog::{Product, SpecError, check_spec};
pub use predicate::{Predicate, is_visible};
pub use render::{
    RenderField, RenderOption, RenderPayload, RenderProgress, build_render_payload,
    render_json_ui, render_text,
};
pub use spec::{
    CascadeRule, Constraint, FieldKind, FieldSpec, OptionSpec, StepSection, StepSpec,
    SubmitPolicy, WizardSettings, WizardSpec,
};
pub use summary::{Attachment, SummaryDocument, SummaryError, SummaryRenderer};
pub use validate::{validate, validate_step};
pub use visibility::{
    NONE_OPTION, VisibilityMap, VisibleStep, resolve_visibility, visible_fields, visible_options,
    visible_steps,
};
