use clap::ValueEnum;
use serde_json::{Number, Value};
use wizard_spec::render::value_to_display;
use wizard_spec::{
    FieldKind, RenderField, RenderPayload, SummaryDocument, ValidationError, render_json_ui,
    render_text,
};

/// Controls which bits of state the wizard prints.
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum Verbosity {
    /// Step header and prompts only.
    Clean,
    /// Also the full step listing, choices and parse expectations.
    Verbose,
}

impl Verbosity {
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Clean
        }
    }

    pub fn is_verbose(&self) -> bool {
        matches!(self, Verbosity::Verbose)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Prints steps, prompts and outcomes for the terminal wizard.
pub struct WizardPresenter {
    verbosity: Verbosity,
    format: OutputFormat,
    header_printed: bool,
}

impl WizardPresenter {
    pub fn new(verbosity: Verbosity, format: OutputFormat) -> Self {
        Self {
            verbosity,
            format,
            header_printed: false,
        }
    }

    pub fn show_step(&mut self, payload: &RenderPayload) {
        if !self.header_printed {
            println!("Wizard: {}", payload.wizard_title);
            self.header_printed = true;
        }
        match self.format {
            OutputFormat::Json => match serde_json::to_string_pretty(&render_json_ui(payload)) {
                Ok(ui) => println!("{}", ui),
                Err(err) => eprintln!("Failed to serialize step: {}", err),
            },
            OutputFormat::Text if self.verbosity.is_verbose() => {
                println!("{}", render_text(payload))
            }
            OutputFormat::Text => {
                if payload.show_progress {
                    println!(
                        "Step {}/{}: {}",
                        payload.progress.position, payload.progress.total, payload.step_title
                    );
                } else {
                    println!("Step: {}", payload.step_title);
                }
                if let Some(description) = &payload.step_description {
                    println!("{}", description);
                }
            }
        }
    }

    pub fn show_note(&self, field: &RenderField) {
        println!("{}", field.label);
    }

    pub fn show_prompt(&self, prompt: &PromptContext) {
        let mut line = prompt.title.clone();
        if prompt.required {
            line.push_str(" *");
        }
        if let Some(hint) = &prompt.hint {
            line.push(' ');
            line.push_str(hint);
        }
        if let Some(current) = &prompt.current {
            line.push_str(&format!(" [{}]", current));
        }
        println!("{}", line);
        if let Some(description) = &prompt.description {
            println!("{}", description);
        }
        if self.verbosity.is_verbose() && !prompt.choices.is_empty() {
            println!("Choices: {}", prompt.choices.join(", "));
        }
    }

    pub fn show_parse_error(&self, error: &AnswerParseError) {
        eprintln!("Invalid answer: {}", error.user_message);
        if self.verbosity.is_verbose()
            && let Some(debug) = &error.debug_message
        {
            eprintln!("  Expected: {}", debug);
        }
    }

    pub fn show_errors(&self, errors: &[ValidationError]) {
        eprintln!("Please fix the following before continuing:");
        for error in errors {
            eprintln!("  {} - {}", error.field_id, error.message);
        }
    }

    pub fn show_notice(&self, message: &str) {
        eprintln!("{}", message);
    }

    pub fn show_completion(&self, document: &SummaryDocument, notified: bool) {
        println!("Done ✅");
        if notified {
            println!("Your request has been sent; we will get back to you shortly.");
        } else {
            println!("Thanks for your interest; nobody will contact you.");
        }
        println!();
        println!("{}", document.body);
    }
}

/// Context used to format a single prompt.
pub struct PromptContext {
    pub title: String,
    pub description: Option<String>,
    pub required: bool,
    pub hint: Option<String>,
    pub choices: Vec<String>,
    pub current: Option<String>,
}

impl PromptContext {
    pub fn new(field: &RenderField) -> Self {
        let choices = field
            .options
            .iter()
            .map(|option| format!("{} ({})", option.value, option.label))
            .collect();
        Self {
            title: field.label.clone(),
            description: field.description.clone(),
            required: field.required,
            hint: kind_hint(field),
            choices,
            current: field
                .current_value
                .as_ref()
                .filter(|value| !value.is_null())
                .map(value_to_display)
                .filter(|text| !text.is_empty()),
        }
    }
}

fn kind_hint(field: &RenderField) -> Option<String> {
    let values = field
        .options
        .iter()
        .map(|option| option.value.as_str())
        .collect::<Vec<_>>();
    match field.kind {
        FieldKind::Checkbox => Some("(yes/no)".to_string()),
        FieldKind::Number | FieldKind::Slider => Some("(number)".to_string()),
        FieldKind::Select | FieldKind::Radio if !values.is_empty() => {
            Some(format!("({})", values.join("/")))
        }
        FieldKind::MultiSelect if !values.is_empty() => {
            Some(format!("(comma separated: {})", values.join("/")))
        }
        FieldKind::File => Some("(comma separated file paths)".to_string()),
        FieldKind::Email => Some("(email)".to_string()),
        FieldKind::Phone => Some("(phone, e.g. +420 123 456 789)".to_string()),
        FieldKind::Date => Some("(YYYY-MM-DD)".to_string()),
        _ => None,
    }
}

/// Error produced when parsing answers from the user.
#[derive(Debug)]
pub struct AnswerParseError {
    pub user_message: String,
    pub debug_message: Option<String>,
}

impl AnswerParseError {
    pub fn new(user_message: impl Into<String>, debug_message: Option<String>) -> Self {
        Self {
            user_message: user_message.into(),
            debug_message,
        }
    }
}

/// Turns one line of input into an answer for `field`.
///
/// An empty line keeps the current value, or clears an optional field.
pub fn parse_answer(field: &RenderField, raw: &str) -> Result<Value, AnswerParseError> {
    let raw = raw.trim();
    if raw.is_empty() {
        if let Some(current) = field.current_value.as_ref().filter(|value| !value.is_null()) {
            return Ok(current.clone());
        }
        if field.required {
            return Err(AnswerParseError::new("This field requires an answer.", None));
        }
        return Ok(Value::Null);
    }

    match field.kind {
        FieldKind::Checkbox => parse_boolean(raw),
        FieldKind::Number | FieldKind::Slider => parse_number(raw),
        FieldKind::Select | FieldKind::Radio => parse_choice(field, raw),
        FieldKind::MultiSelect => raw
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| parse_choice(field, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        FieldKind::File => Ok(Value::Array(
            raw.split(',')
                .map(str::trim)
                .filter(|path| !path.is_empty())
                .map(|path| Value::String(path.to_string()))
                .collect(),
        )),
        FieldKind::Text
        | FieldKind::Email
        | FieldKind::Phone
        | FieldKind::Date
        | FieldKind::Address
        | FieldKind::Textarea
        | FieldKind::Note => Ok(Value::String(raw.to_string())),
    }
}

fn parse_boolean(raw: &str) -> Result<Value, AnswerParseError> {
    match raw.to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Ok(Value::Bool(true)),
        "false" | "f" | "no" | "n" | "0" => Ok(Value::Bool(false)),
        _ => Err(AnswerParseError::new(
            "Please enter yes or no.",
            Some("expected boolean (y/n/true/false)".to_string()),
        )),
    }
}

fn parse_number(raw: &str) -> Result<Value, AnswerParseError> {
    let normalized = raw.replace(',', ".");
    if let Ok(whole) = normalized.parse::<i64>() {
        return Ok(Value::Number(Number::from(whole)));
    }
    normalized
        .parse::<f64>()
        .map_err(|_| {
            AnswerParseError::new(
                "Please enter a number.",
                Some("expected number".to_string()),
            )
        })
        .and_then(|value| {
            Number::from_f64(value).map(Value::Number).ok_or_else(|| {
                AnswerParseError::new(
                    "Please enter a finite number.",
                    Some("number must be finite".to_string()),
                )
            })
        })
}

/// Accepts an option value, its label, or its 1-based position.
fn parse_choice(field: &RenderField, raw: &str) -> Result<Value, AnswerParseError> {
    let by_position = raw
        .parse::<usize>()
        .ok()
        .and_then(|position| position.checked_sub(1))
        .and_then(|index| field.options.get(index));
    let chosen = by_position.or_else(|| {
        field.options.iter().find(|option| {
            option.value.eq_ignore_ascii_case(raw) || option.label.eq_ignore_ascii_case(raw)
        })
    });

    match chosen {
        Some(option) => Ok(Value::String(option.value.clone())),
        None => {
            let allowed = field
                .options
                .iter()
                .map(|option| option.value.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            Err(AnswerParseError::new(
                format!("Choose one of: {}.", allowed),
                Some(format!("allowed values: {}", allowed)),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wizard_spec::RenderOption;

    fn field(kind: FieldKind, required: bool) -> RenderField {
        RenderField {
            id: "field".into(),
            label: "Field".into(),
            description: None,
            kind,
            required,
            group: None,
            options: Vec::new(),
            current_value: None,
            error: None,
        }
    }

    fn choice_field(kind: FieldKind) -> RenderField {
        let mut field = field(kind, true);
        field.options = vec![
            RenderOption {
                value: "pool".into(),
                label: "Swimming pool".into(),
            },
            RenderOption {
                value: "sauna".into(),
                label: "Sauna".into(),
            },
        ];
        field
    }

    #[test]
    fn checkbox_accepts_yes() {
        let field = field(FieldKind::Checkbox, false);
        assert_eq!(parse_answer(&field, "yes").unwrap(), Value::Bool(true));
        assert!(parse_answer(&field, "maybe").is_err());
    }

    #[test]
    fn numbers_keep_integers_whole() {
        let field = field(FieldKind::Number, true);
        assert_eq!(parse_answer(&field, "4500").unwrap(), json!(4500));
        assert_eq!(parse_answer(&field, "3,5").unwrap(), json!(3.5));
        assert!(parse_answer(&field, "lots").is_err());
    }

    #[test]
    fn choices_match_value_label_or_position() {
        let field = choice_field(FieldKind::Radio);
        assert_eq!(parse_answer(&field, "POOL").unwrap(), json!("pool"));
        assert_eq!(parse_answer(&field, "sauna").unwrap(), json!("sauna"));
        assert_eq!(parse_answer(&field, "Swimming pool").unwrap(), json!("pool"));
        assert_eq!(parse_answer(&field, "2").unwrap(), json!("sauna"));
        let err = parse_answer(&field, "jacuzzi").unwrap_err();
        assert!(err.user_message.contains("pool, sauna"));
    }

    #[test]
    fn multi_select_splits_on_commas() {
        let field = choice_field(FieldKind::MultiSelect);
        assert_eq!(
            parse_answer(&field, "pool, 2").unwrap(),
            json!(["pool", "sauna"])
        );
    }

    #[test]
    fn empty_input_keeps_current_value() {
        let mut field = field(FieldKind::Text, true);
        assert!(parse_answer(&field, "").is_err());
        field.current_value = Some(json!("Jana"));
        assert_eq!(parse_answer(&field, " ").unwrap(), json!("Jana"));
    }

    #[test]
    fn optional_empty_input_clears() {
        let field = field(FieldKind::Textarea, false);
        assert_eq!(parse_answer(&field, "").unwrap(), Value::Null);
    }

    #[test]
    fn files_become_path_list() {
        let field = field(FieldKind::File, false);
        assert_eq!(
            parse_answer(&field, "roof.jpg, /tmp/meter.png").unwrap(),
            json!(["roof.jpg", "/tmp/meter.png"])
        );
    }
}
