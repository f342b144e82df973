#![allow(missing_docs)]

pub mod address;
pub mod error;
pub mod services;
pub mod session;

pub use address::{
    Address, AddressAutocomplete, AddressCandidate, AddressLookup, DEFAULT_DEBOUNCE,
    MIN_QUERY_CHARS,
};
pub use error::{ServiceError, SessionError};
pub use services::{DocumentGenerator, LogNotifier, Notifier, OPERATOR_ADDRESS};
pub use session::{SubmitOutcome, Transition, WizardSession, WizardState};
