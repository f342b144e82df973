use async_trait::async_trait;
use tracing::info;
use wizard_spec::{AnswerMap, SummaryDocument, SummaryRenderer, WizardSpec, render::value_to_display};

use crate::error::ServiceError;

/// Operator address the summary is delivered to.
pub const OPERATOR_ADDRESS: &str = "leads@energy-wizard.dev";

/// Delivers the final answers to the sales backend.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_summary(&self, answers: &AnswerMap) -> Result<(), ServiceError>;
}

/// Produces the downloadable summary artifact.
pub trait DocumentGenerator {
    fn generate(&self, spec: &WizardSpec, answers: &AnswerMap)
    -> Result<SummaryDocument, ServiceError>;
}

impl DocumentGenerator for SummaryRenderer {
    fn generate(
        &self,
        spec: &WizardSpec,
        answers: &AnswerMap,
    ) -> Result<SummaryDocument, ServiceError> {
        Ok(self.render(spec, answers)?)
    }
}

/// Email stub: formats the summary and writes it to the log.
pub struct LogNotifier {
    recipient: String,
}

impl LogNotifier {
    pub fn new(recipient: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
        }
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn format_message(answers: &AnswerMap) -> String {
        answers
            .iter()
            .filter(|(id, _)| answers.has_value(id))
            .map(|(id, value)| format!("{}: {}", id, value_to_display(value)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::new(OPERATOR_ADDRESS)
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_summary(&self, answers: &AnswerMap) -> Result<(), ServiceError> {
        let body = Self::format_message(answers);
        info!(recipient = %self.recipient, fields = answers.len(), "sending lead summary");
        info!(target: "energy_wizard::mail", "{}", body);
        Ok(())
    }
}
