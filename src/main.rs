use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use ariadne::{Color, Label, Report, ReportKind, Source};
use clap::Parser;
use thiserror::Error;

use chipquote::parser::{self, ParseError};
use chipquote::report::{ReportError, ReportFormat};
use chipquote::validator::ValidationError;
use chipquote::{default_library, logging, Engine, EngineConfig, EstimateError, LoadError, ReferenceLibrary};

#[derive(Parser, Debug)]
#[command(name = "chipquote")]
#[command(version, about = "Machining time and cost estimation")]
struct Args {
    /// Job file describing the part, its stock and its operations
    #[arg(required_unless_present = "dump_reference")]
    input: Option<PathBuf>,

    /// Reference library JSON (default: built-in library)
    #[arg(long, short = 'r')]
    reference: Option<PathBuf>,

    /// Engine configuration JSON (default: built-in constants)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Quantity to quote; repeat for several. Replaces the job file's quantities
    #[arg(long = "quantity", short = 'q')]
    quantities: Vec<u32>,

    /// Report format
    #[arg(long, short = 'f', value_enum, default_value_t = ReportFormat::Text)]
    format: ReportFormat,

    /// Write the report here instead of stdout
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Print the reference library as JSON and exit
    #[arg(long)]
    dump_reference: bool,
}

#[derive(Error, Debug)]
enum CliError {
    #[error("cannot access {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("{error}")]
    Parse {
        path: String,
        text: String,
        error: ParseError,
    },

    #[error("{} validation error(s)", .0.len())]
    Validation(Vec<ValidationError>),

    #[error(transparent)]
    Estimate(#[from] EstimateError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("no quantities to quote: add a quantity line or pass --quantity")]
    NoQuantities,
}

fn main() -> ExitCode {
    logging::init();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Parse { path, text, error }) => {
            render_parse_error(&path, &text, &error);
            ExitCode::FAILURE
        }
        Err(CliError::Validation(errors)) => {
            eprintln!("Validation errors:");
            for err in errors {
                eprintln!("  - {}", err);
            }
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), CliError> {
    let library = match &args.reference {
        Some(path) => ReferenceLibrary::from_file(path)?,
        None => default_library(),
    };
    if args.dump_reference {
        println!("{}", library.to_json_pretty()?);
        return Ok(());
    }
    let config = match &args.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    let engine = Engine::new(library, config);

    let Some(input) = &args.input else {
        return Ok(());
    };
    let path = input.display().to_string();
    let text = fs::read_to_string(input).map_err(|source| CliError::Io {
        path: path.clone(),
        source,
    })?;

    // Parse
    let job = match parser::parse_job(&text) {
        Ok(job) => job,
        Err(error) => return Err(CliError::Parse { path, text, error }),
    };

    // Validate
    let part = job.to_part();
    engine.validate(&part).map_err(CliError::Validation)?;

    // Quote
    let quantities = if args.quantities.is_empty() {
        job.quantities.clone()
    } else {
        args.quantities.clone()
    };
    if quantities.is_empty() {
        return Err(CliError::NoQuantities);
    }
    let quote = engine.quote(&part, &quantities)?;
    tracing::info!(part = %quote.part.name, quantities = quantities.len(), "quote computed");

    // Report
    let writer = args.format.get_writer();
    let report = writer.render(&quote)?;
    match &args.output {
        Some(out) => {
            fs::write(out, &report).map_err(|source| CliError::Io {
                path: out.display().to_string(),
                source,
            })?;
            tracing::info!(path = %out.display(), format = writer.name(), "report written");
        }
        None => print!("{}", report),
    }

    Ok(())
}

fn render_parse_error(path: &str, text: &str, error: &ParseError) {
    let span = error.span();
    let _ = Report::build(ReportKind::Error, path, span.start)
        .with_message("invalid job file")
        .with_label(
            Label::new((path, span))
                .with_message(error.to_string())
                .with_color(Color::Red),
        )
        .finish()
        .eprint((path, Source::from(text)));
}
