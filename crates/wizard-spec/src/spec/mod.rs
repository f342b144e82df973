pub mod field;
pub mod step;
pub mod wizard;

pub use field::{Constraint, FieldKind, FieldSpec, OptionSpec};
pub use step::{StepSection, StepSpec};
pub use wizard::{CascadeRule, SubmitPolicy, WizardSettings, WizardSpec};
