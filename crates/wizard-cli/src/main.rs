mod presenter;

use std::collections::HashSet;
use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use presenter::{
    AnswerParseError, OutputFormat, PromptContext, Verbosity, WizardPresenter, parse_answer,
};
use serde_json::Value;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;
use wizard_session::{LogNotifier, SubmitOutcome, Transition, WizardSession};
use wizard_spec::{
    AnswerMap, FieldKind, Product, RenderField, SummaryDocument, SummaryRenderer,
    ValidationResult, WizardSpec, validate,
};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

const OUTPUT_DIR_ENV: &str = "ENERGY_WIZARD_OUTPUT_DIR";

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Text-based energy lead wizard",
    long_about = "Runs the solar, air conditioning and heat pump wizards in a terminal and provides catalog and answer tooling"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ProductArg {
    Solar,
    AirConditioning,
    HeatPump,
}

impl From<ProductArg> for Product {
    fn from(value: ProductArg) -> Self {
        match value {
            ProductArg::Solar => Product::Solar,
            ProductArg::AirConditioning => Product::AirConditioning,
            ProductArg::HeatPump => Product::HeatPump,
        }
    }
}

/// Which wizard definition to load.
#[derive(Args)]
struct CatalogSource {
    /// Built-in product wizard (defaults to solar).
    #[arg(long, value_enum, conflicts_with = "catalog")]
    product: Option<ProductArg>,
    /// Path to a wizard catalog JSON file.
    #[arg(long, value_name = "CATALOG")]
    catalog: Option<PathBuf>,
}

impl CatalogSource {
    fn load(&self) -> CliResult<WizardSpec> {
        let spec = match (&self.catalog, self.product) {
            (Some(path), _) => WizardSpec::from_json(&fs::read_to_string(path)?)?,
            (None, product) => Product::from(product.unwrap_or(ProductArg::Solar)).load()?,
        };
        debug!(wizard = %spec.id, steps = spec.steps.len(), "catalog loaded");
        Ok(spec)
    }
}

#[derive(Subcommand)]
enum Command {
    /// Walk through a wizard interactively.
    Run {
        #[command(flatten)]
        source: CatalogSource,
        /// Optional JSON file with answers to prefill.
        #[arg(long, value_name = "ANSWERS")]
        answers: Option<PathBuf>,
        /// Show verbose output (full step listing, choices, debug logs).
        #[arg(long, alias = "debug")]
        verbose: bool,
        /// Render output mode for each step.
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Allow `:jump <step-id>` to any visible step.
        #[arg(long)]
        allow_skip: bool,
        /// Disable `:back`.
        #[arg(long)]
        no_back: bool,
    },
    /// Validate an answers file against every visible step.
    Validate {
        #[command(flatten)]
        source: CatalogSource,
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
    },
    /// Write the summary document and copy attachments.
    Summary {
        #[command(flatten)]
        source: CatalogSource,
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
        /// Output root (defaults to ENERGY_WIZARD_OUTPUT_DIR or the working directory).
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
        /// Overwrite an existing summary directory.
        #[arg(long)]
        force: bool,
    },
    /// Check a catalog file for structural problems.
    Check {
        #[arg(long, value_name = "CATALOG")]
        catalog: PathBuf,
    },
    /// Print the JSON Schema of the catalog format.
    Schema,
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    let verbose = matches!(cli.command, Command::Run { verbose: true, .. });
    init_tracing(verbose);

    match cli.command {
        Command::Run {
            source,
            answers,
            verbose,
            format,
            allow_skip,
            no_back,
        } => run_wizard(&source, answers, verbose, format, allow_skip, no_back),
        Command::Validate { source, answers } => run_validate(&source, &answers),
        Command::Summary {
            source,
            answers,
            out,
            force,
        } => run_summary(&source, &answers, out, force),
        Command::Check { catalog } => run_check(&catalog),
        Command::Schema => run_schema(),
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn read_answers(path: &Path) -> CliResult<AnswerMap> {
    let contents = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&contents)?;
    AnswerMap::from_value(value)
        .ok_or_else(|| format!("{} must contain a JSON object", path.display()).into())
}

/// What the user typed at a field prompt.
enum PromptInput {
    Answer(Value),
    Back,
    Jump(String),
}

fn run_wizard(
    source: &CatalogSource,
    answers_path: Option<PathBuf>,
    verbose: bool,
    format: OutputFormat,
    allow_skip: bool,
    no_back: bool,
) -> CliResult<()> {
    let spec = source.load()?;
    let mut settings = spec.settings;
    settings.allow_skip_steps |= allow_skip;
    settings.allow_back_navigation &= !no_back;

    let mut session = WizardSession::new(Arc::new(spec))?.with_settings(settings);
    if let Some(path) = answers_path {
        session = session.with_answers(read_answers(&path)?);
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let notifier = LogNotifier::default();
    let renderer = SummaryRenderer::new()?;
    let mut presenter = WizardPresenter::new(Verbosity::from_verbose(verbose), format);

    let mut asked: HashSet<String> = HashSet::new();
    let mut shown_step = None;

    loop {
        let view = session.view();
        if shown_step != Some(session.current_index()) {
            presenter.show_step(&view);
            shown_step = Some(session.current_index());
        }

        if let Some(field) = view.fields.iter().find(|field| !asked.contains(&field.id)) {
            asked.insert(field.id.clone());
            if field.kind == FieldKind::Note {
                presenter.show_note(field);
                continue;
            }
            match prompt_field(field, &presenter)? {
                PromptInput::Answer(value) => session.set_answer(&field.id, value),
                PromptInput::Back => {
                    asked.remove(&field.id);
                    match session.previous() {
                        Transition::Moved { .. } => asked.clear(),
                        _ => presenter.show_notice("Cannot go back from here."),
                    }
                }
                PromptInput::Jump(step_id) => {
                    asked.remove(&field.id);
                    match session.jump_to(&step_id) {
                        Transition::Moved { .. } => asked.clear(),
                        _ => presenter.show_notice(&format!("Cannot jump to '{}'.", step_id)),
                    }
                }
            }
            continue;
        }

        match session.next() {
            Transition::Moved { .. } => asked.clear(),
            Transition::Invalid(errors) => {
                presenter.show_errors(&errors);
                for error in &errors {
                    asked.remove(&error.field_id);
                }
            }
            Transition::LastStep => match runtime.block_on(session.submit(&notifier)) {
                Ok(SubmitOutcome::Completed { notified }) => {
                    let document = session.document(&renderer)?;
                    presenter.show_completion(&document, notified);
                    return Ok(());
                }
                Ok(SubmitOutcome::Invalid(errors)) => {
                    presenter.show_errors(&errors);
                    for error in &errors {
                        asked.remove(&error.field_id);
                    }
                }
                Err(err) => {
                    presenter.show_notice(&err.to_string());
                    let reply = prompt_line("Press Enter to retry or type exit")?;
                    if reply.eq_ignore_ascii_case("exit") {
                        return Err(err.into());
                    }
                }
            },
            Transition::Ignored => return Err("wizard cannot advance from this step".into()),
        }
    }
}

fn prompt_field(field: &RenderField, presenter: &WizardPresenter) -> CliResult<PromptInput> {
    let prompt = PromptContext::new(field);
    loop {
        presenter.show_prompt(&prompt);
        let input = prompt_line(">")?;
        if input.eq_ignore_ascii_case("exit") {
            return Err("wizard aborted by user".into());
        }
        if input.starts_with(':') {
            match parse_command(&input) {
                Some(command) => return Ok(command),
                None => presenter.show_parse_error(&AnswerParseError::new(
                    "Unknown command.",
                    Some("use :back or :jump <step-id>".to_string()),
                )),
            }
            continue;
        }
        match parse_answer(field, &input) {
            Ok(value) => return Ok(PromptInput::Answer(value)),
            Err(err) => presenter.show_parse_error(&err),
        }
    }
}

fn parse_command(raw: &str) -> Option<PromptInput> {
    let mut parts = raw.strip_prefix(':')?.split_whitespace();
    match parts.next()? {
        "back" => Some(PromptInput::Back),
        "jump" => parts.next().map(|step| PromptInput::Jump(step.to_string())),
        _ => None,
    }
}

fn prompt_line(prompt: &str) -> CliResult<String> {
    print!("{} ", prompt);
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().read_line(&mut line)? == 0 {
        return Err("input ended before the wizard was completed".into());
    }
    Ok(line.trim().to_string())
}

fn run_validate(source: &CatalogSource, answers_path: &Path) -> CliResult<()> {
    let spec = source.load()?;
    let answers = read_answers(answers_path)?;

    let result = validate(&spec, &answers);
    println!(
        "Validation result: {}",
        if result.valid { "valid" } else { "invalid" }
    );
    describe_validation(&result);

    if result.valid {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn describe_validation(result: &ValidationResult) {
    if !result.errors.is_empty() {
        println!("Errors:");
        for error in &result.errors {
            println!("  {} - {}", error.field_id, error.message);
        }
    }
    if !result.missing_required.is_empty() {
        println!(
            "Missing required answers: {}",
            result.missing_required.join(", ")
        );
    }
}

fn run_summary(
    source: &CatalogSource,
    answers_path: &Path,
    out: Option<PathBuf>,
    force: bool,
) -> CliResult<()> {
    let spec = source.load()?;
    let answers = read_answers(answers_path)?;
    let document = SummaryRenderer::new()?.render(&spec, &answers)?;

    let target = resolve_output_root(out)?.join(&spec.id);
    if target.exists() {
        if force {
            fs::remove_dir_all(&target)?;
        } else {
            return Err(format!(
                "summary {} already exists; rerun with --force to overwrite",
                target.display()
            )
            .into());
        }
    }

    let base = answers_path.parent().unwrap_or_else(|| Path::new("."));
    write_summary(&document, &target, base)?;
    println!("Summary written to {}", target.display());
    Ok(())
}

fn resolve_output_root(out: Option<PathBuf>) -> CliResult<PathBuf> {
    let candidate = match out {
        Some(path) => path,
        None => env::var_os(OUTPUT_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    if candidate.as_os_str().is_empty() {
        return Err("output directory cannot be empty".into());
    }
    Ok(candidate)
}

/// Writes `summary.md` and copies attachments that resolve relative to `base`.
fn write_summary(document: &SummaryDocument, target: &Path, base: &Path) -> CliResult<()> {
    fs::create_dir_all(target)?;
    fs::write(target.join("summary.md"), &document.body)?;

    let attachments = document
        .attachments
        .iter()
        .filter_map(|attachment| attachment.path.as_deref().map(|path| (attachment, path)))
        .collect::<Vec<_>>();
    if attachments.is_empty() {
        return Ok(());
    }

    let attachments_dir = target.join("attachments");
    fs::create_dir_all(&attachments_dir)?;
    for (attachment, path) in attachments {
        let source = base.join(path);
        if !source.is_file() {
            warn!(field = %attachment.field_id, path = %source.display(), "attachment not found, skipping");
            continue;
        }
        fs::copy(&source, attachments_dir.join(&attachment.name))?;
    }
    Ok(())
}

fn run_check(catalog: &Path) -> CliResult<()> {
    let spec = WizardSpec::from_json(&fs::read_to_string(catalog)?)?;
    println!(
        "Catalog '{}' is valid: {} steps, {} fields",
        spec.id,
        spec.steps.len(),
        spec.fields().count()
    );
    Ok(())
}

fn run_schema() -> CliResult<()> {
    let schema = schemars::schema_for!(WizardSpec);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
