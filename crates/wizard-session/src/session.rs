use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;
use wizard_spec::{
    AnswerMap, DATE_KEY, FieldKind, RenderPayload, SESSION_ID_KEY, StepSpec, SummaryDocument,
    ValidationError, VisibleStep, WizardSettings, WizardSpec, build_render_payload, check_spec,
    is_visible, validate_step, visible_steps,
};

use crate::address::Address;
use crate::error::SessionError;
use crate::services::{DocumentGenerator, Notifier};

/// Where the session currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardState {
    /// Index into the authored step list, not the visible one.
    AtStep(usize),
    Completed,
}

/// Result of a navigation event.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Moved { from: usize, to: usize },
    /// The active step is valid but no visible step follows it.
    LastStep,
    Invalid(Vec<ValidationError>),
    /// Disabled by configuration, no target, or session completed.
    Ignored,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Completed { notified: bool },
    Invalid(Vec<ValidationError>),
}

/// One user's pass through a wizard.
///
/// The session is the only place answers are mutated; every visibility and
/// validation question is answered from scratch against the current map.
pub struct WizardSession {
    spec: Arc<WizardSpec>,
    settings: WizardSettings,
    current: usize,
    answers: AnswerMap,
    completed_steps: BTreeSet<usize>,
    errors: Vec<ValidationError>,
    finished: bool,
}

impl WizardSession {
    /// Starts a session on the first authored step.
    ///
    /// The spec is checked first so every step index the session holds is valid.
    pub fn new(spec: Arc<WizardSpec>) -> Result<Self, SessionError> {
        check_spec(&spec)?;
        let mut answers = AnswerMap::new();
        answers.insert(SESSION_ID_KEY, Value::String(Uuid::new_v4().to_string()));
        answers.insert(
            DATE_KEY,
            Value::String(chrono::Local::now().date_naive().to_string()),
        );
        Ok(Self {
            settings: spec.settings,
            spec,
            current: 0,
            answers,
            completed_steps: BTreeSet::new(),
            errors: Vec::new(),
            finished: false,
        })
    }

    pub fn with_settings(mut self, settings: WizardSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Prefills answers; session keys already seeded are kept unless overridden.
    pub fn with_answers(mut self, answers: AnswerMap) -> Self {
        for (field_id, value) in answers.iter() {
            self.answers.insert(field_id.clone(), value.clone());
        }
        self
    }

    pub fn spec(&self) -> &WizardSpec {
        &self.spec
    }

    pub fn settings(&self) -> &WizardSettings {
        &self.settings
    }

    pub fn state(&self) -> WizardState {
        if self.finished {
            WizardState::Completed
        } else {
            WizardState::AtStep(self.current)
        }
    }

    pub fn is_completed(&self) -> bool {
        self.finished
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_step(&self) -> &StepSpec {
        &self.spec.steps[self.current]
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Positions (in the visible sequence) of steps advanced past.
    pub fn completed_steps(&self) -> &BTreeSet<usize> {
        &self.completed_steps
    }

    pub fn visible_steps(&self) -> Vec<VisibleStep<'_>> {
        visible_steps(&self.spec, &self.answers)
    }

    pub fn has_next_step(&self) -> bool {
        self.visible_steps()
            .iter()
            .any(|visible| visible.index > self.current)
    }

    pub fn view(&self) -> RenderPayload {
        build_render_payload(
            &self.spec,
            &self.answers,
            self.current,
            &self.errors,
            &self.completed_steps,
        )
    }

    /// Records an answer, clears that field's error and applies cascades.
    pub fn set_answer(&mut self, field_id: &str, value: Value) {
        if self.finished {
            debug!(field_id, "ignoring change on completed session");
            return;
        }

        let is_address = self
            .spec
            .field(field_id)
            .is_some_and(|field| field.kind == FieldKind::Address);
        if is_address {
            for key in Address::flat_keys(field_id) {
                self.answers.remove(&key);
            }
        }
        match Address::from_value(&value).filter(|_| is_address) {
            Some(address) => {
                for (key, flat) in address.flattened(field_id) {
                    self.answers.insert(key, flat);
                }
                self.answers.insert(field_id, address.to_value());
            }
            None => {
                self.answers.insert(field_id, value);
            }
        }

        self.errors.retain(|error| error.field_id != field_id);
        self.apply_cascades();
    }

    fn apply_cascades(&mut self) {
        let current_step = self.spec.steps[self.current].id.as_str();
        for rule in &self.spec.cascades {
            if rule
                .on_step
                .as_deref()
                .is_some_and(|step| step != current_step)
            {
                continue;
            }
            if !is_visible(Some(&rule.when), &self.answers) {
                continue;
            }
            let mut items = match self.answers.get(&rule.target) {
                Some(Value::Array(items)) => items.clone(),
                Some(Value::Null) | None => Vec::new(),
                Some(other) => vec![other.clone()],
            };
            if !items.contains(&rule.add) {
                debug!(target_field = %rule.target, value = %rule.add, "cascade auto-selected value");
                items.push(rule.add.clone());
                self.answers.insert(rule.target.clone(), Value::Array(items));
            }
        }
    }

    /// Validates the active step and moves to the next visible one.
    pub fn next(&mut self) -> Transition {
        if self.finished {
            return Transition::Ignored;
        }

        let errors = validate_step(self.current_step(), &self.answers);
        if !errors.is_empty() {
            debug!(step = %self.current_step().id, errors = errors.len(), "step invalid");
            self.errors = errors.clone();
            return Transition::Invalid(errors);
        }
        self.errors.clear();

        let visible = visible_steps(&self.spec, &self.answers);
        if let Some(position) = visible.iter().position(|entry| entry.index == self.current) {
            self.completed_steps.insert(position);
        }
        let target = visible
            .iter()
            .find(|entry| entry.index > self.current)
            .map(|entry| entry.index);

        if self.current_step().id == self.spec.submit.summary_step {
            self.answers
                .insert(self.spec.submit.consent_field.clone(), Value::Bool(true));
        }

        match target {
            Some(to) => self.move_to(to),
            None => Transition::LastStep,
        }
    }

    /// Moves to the previous visible step without validating.
    pub fn previous(&mut self) -> Transition {
        if self.finished || !self.settings.allow_back_navigation {
            return Transition::Ignored;
        }
        let target = visible_steps(&self.spec, &self.answers)
            .iter()
            .rev()
            .find(|entry| entry.index < self.current)
            .map(|entry| entry.index);
        match target {
            Some(to) => self.move_to(to),
            None => Transition::Ignored,
        }
    }

    /// Jumps to a visible step when step skipping is enabled.
    pub fn jump_to(&mut self, step_id: &str) -> Transition {
        if self.finished || !self.settings.allow_skip_steps {
            return Transition::Ignored;
        }
        let target = visible_steps(&self.spec, &self.answers)
            .iter()
            .find(|entry| entry.step.id == step_id)
            .map(|entry| entry.index);
        match target {
            Some(to) if to != self.current => self.move_to(to),
            _ => Transition::Ignored,
        }
    }

    fn move_to(&mut self, to: usize) -> Transition {
        let from = self.current;
        self.current = to;
        self.errors.clear();
        debug!(from = %self.spec.steps[from].id, to = %self.spec.steps[to].id, "moved");
        Transition::Moved { from, to }
    }

    /// Validates the active step and hands the answers to `notifier`.
    ///
    /// Research-only leads complete without notification. A failed delivery
    /// leaves the session as it was so the user can retry.
    pub async fn submit(&mut self, notifier: &dyn Notifier) -> Result<SubmitOutcome, SessionError> {
        if self.finished {
            return Err(SessionError::AlreadyCompleted);
        }

        let errors = validate_step(self.current_step(), &self.answers);
        if !errors.is_empty() {
            self.errors = errors.clone();
            return Ok(SubmitOutcome::Invalid(errors));
        }
        self.errors.clear();

        let policy = &self.spec.submit;
        let research_only = self
            .answers
            .get(&policy.contact_preference_field)
            .and_then(Value::as_str)
            == Some(policy.research_only_value.as_str());

        if research_only {
            info!("research-only lead completed without notification");
            self.finished = true;
            return Ok(SubmitOutcome::Completed { notified: false });
        }

        match notifier.send_summary(&self.answers).await {
            Ok(()) => {
                info!(wizard = %self.spec.id, "lead submitted");
                self.finished = true;
                Ok(SubmitOutcome::Completed { notified: true })
            }
            Err(err) => {
                warn!(error = %err, "lead submission failed");
                Err(SessionError::Notification(err))
            }
        }
    }

    /// Generates the summary document from the current answers.
    pub fn document(
        &self,
        generator: &dyn DocumentGenerator,
    ) -> Result<SummaryDocument, SessionError> {
        generator
            .generate(&self.spec, &self.answers)
            .map_err(SessionError::Document)
    }
}
