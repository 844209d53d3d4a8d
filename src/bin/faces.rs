//! Faces CLI - Command-line interface for the faces study loader
//!
//! Commands:
//! - summary: Build a study and list its participants and sessions
//! - times: Print stimulus presentation times for one session
//! - validate: Decode every record file and report the ones that fail

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use faces_study::builder::{read_manifest, record_files_in, BuildReport, StudyBuild};
use faces_study::loader::{load_session, participant_id_from_path};
use faces_study::{
    stimulus_times, BuildConfig, FailurePolicy, JsonRecordReader, StudyArm, StudyArms,
    StudyBuilder, StudyError, TrialSelector, VERSION,
};

/// Faces - load emotional-faces task recordings and query trial timings
#[derive(Parser)]
#[command(name = "faces")]
#[command(version = VERSION)]
#[command(about = "Organize emotional-faces task records into a study and query trial timings", long_about = None)]
struct Cli {
    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log every decoded record and attached session
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a study and list participants, arms and sessions
    Summary {
        #[command(flatten)]
        study: StudyArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print stimulus presentation times for one session
    Times {
        #[command(flatten)]
        study: StudyArgs,

        /// Participant id
        #[arg(short, long)]
        participant: String,

        /// Session id
        #[arg(short, long)]
        session: String,

        /// Trial type: happy, h, neutral, n, sad, s or all
        #[arg(short, long, default_value = "all")]
        trial_type: String,

        /// Output format
        #[arg(long, default_value = "text")]
        output_format: OutputFormat,
    },

    /// Decode every record file and report failures
    Validate {
        #[command(flatten)]
        source: SourceArgs,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Where the record files come from
#[derive(Args)]
#[group(required = true, multiple = false)]
struct RecordSource {
    /// Directory holding the record files (not searched recursively)
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Text file listing one record path per line
    #[arg(long)]
    manifest: Option<PathBuf>,
}

#[derive(Args)]
struct SourceArgs {
    #[command(flatten)]
    records: RecordSource,

    /// Extension of the record files
    #[arg(long, default_value = "json")]
    extension: String,
}

#[derive(Args)]
struct StudyArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// JSON file mapping participant id to study arm
    #[arg(long)]
    arms: PathBuf,

    /// Study name
    #[arg(long, default_value = "study")]
    name: String,

    /// Scanner repetition time to attach to every session
    #[arg(long)]
    tr: Option<f64>,

    /// Skip record files that fail instead of aborting
    #[arg(long)]
    skip_failures: bool,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// One value per line
    Text,
    /// JSON array
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.quiet, cli.verbose) {
        eprintln!("{}", e);
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(quiet: bool, verbose: bool) -> Result<(), String> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("FACES_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|error| format!("failed to initialize tracing subscriber: {error}"))
}

fn run(cli: Cli) -> Result<(), FacesCliError> {
    match cli.command {
        Commands::Summary { study, json } => cmd_summary(&study, json),
        Commands::Times {
            study,
            participant,
            session,
            trial_type,
            output_format,
        } => cmd_times(&study, &participant, &session, &trial_type, output_format),
        Commands::Validate { source, json } => cmd_validate(&source, json),
    }
}

fn build_study(args: &StudyArgs) -> Result<StudyBuild, FacesCliError> {
    let arms = StudyArms::load(&args.arms)?;

    let mut config = BuildConfig::new(args.name.clone());
    if let Some(tr) = args.tr {
        config = config.with_repetition_time(tr);
    }
    if args.skip_failures {
        config = config.with_failure_policy(FailurePolicy::Skip);
    }

    let builder = StudyBuilder::new(config, arms)
        .with_reader(JsonRecordReader::with_extension(&args.source.extension));

    let built = match (&args.source.records.dir, &args.source.records.manifest) {
        (Some(dir), _) => builder.build_from_directory(dir)?,
        (None, Some(manifest)) => builder.build_from_manifest(manifest)?,
        (None, None) => return Err(FacesCliError::NoSource),
    };
    Ok(built)
}

fn cmd_summary(args: &StudyArgs, json: bool) -> Result<(), FacesCliError> {
    let built = build_study(args)?;
    let study = &built.study;

    let mut participants: Vec<ParticipantSummary> = study
        .participants()
        .map(|participant| {
            let mut sessions: Vec<SessionSummary> = participant
                .sessions()
                .map(|s| SessionSummary {
                    session: s.session_id().to_string(),
                    trials: s.len(),
                    trial_types: s.trial_type_counts(),
                })
                .collect();
            sessions.sort_by(|a, b| a.session.cmp(&b.session));

            ParticipantSummary {
                participant: participant.participant_id().to_string(),
                study_arm: participant.study_arm(),
                sessions,
            }
        })
        .collect();
    participants.sort_by(|a, b| a.participant.cmp(&b.participant));

    let summary = StudySummary {
        name: study.name().to_string(),
        participants,
        report: built.report,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Study: {}", summary.name);
    println!("Participants: {}", summary.participants.len());
    println!(
        "Sessions: {}",
        summary.participants.iter().map(|p| p.sessions.len()).sum::<usize>()
    );
    for ppt in &summary.participants {
        println!("\n  {} (arm {})", ppt.participant, ppt.study_arm);
        for sess in &ppt.sessions {
            let counts: Vec<String> = sess
                .trial_types
                .iter()
                .map(|(code, n)| format!("{}={}", code, n))
                .collect();
            println!(
                "    session {}: {} trials [{}]",
                sess.session,
                sess.trials,
                counts.join(", ")
            );
        }
    }

    if !summary.report.skipped.is_empty() {
        println!("\nSkipped files:");
        for skipped in &summary.report.skipped {
            println!("  - {}: {}", skipped.path.display(), skipped.error);
        }
    }

    Ok(())
}

fn cmd_times(
    args: &StudyArgs,
    participant: &str,
    session: &str,
    trial_type: &str,
    output_format: OutputFormat,
) -> Result<(), FacesCliError> {
    // Reject a bad selector before decoding any records
    let selector: TrialSelector = trial_type.parse()?;

    let built = build_study(args)?;
    let session = built.study.session(participant, session)?;
    let times = stimulus_times(session, selector);

    match output_format {
        OutputFormat::Text => {
            for t in &times {
                println!("{}", t);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string(&times)?),
        OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(&times)?),
    }

    Ok(())
}

fn cmd_validate(args: &SourceArgs, json: bool) -> Result<(), FacesCliError> {
    let reader = JsonRecordReader::with_extension(&args.extension);
    let paths = match (&args.records.dir, &args.records.manifest) {
        (Some(dir), _) => record_files_in(dir, &args.extension)?,
        (None, Some(manifest)) => read_manifest(manifest)?,
        (None, None) => return Err(FacesCliError::NoSource),
    };

    let errors: Vec<ValidationErrorDetail> = paths
        .iter()
        .filter_map(|path| {
            validate_record(&reader, path)
                .err()
                .map(|e| ValidationErrorDetail {
                    path: path.clone(),
                    error: e.to_string(),
                })
        })
        .collect();

    let report = ValidationReport {
        total_files: paths.len(),
        valid_files: paths.len() - errors.len(),
        invalid_files: errors.len(),
        errors,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total files:   {}", report.total_files);
        println!("Valid files:   {}", report.valid_files);
        println!("Invalid files: {}", report.invalid_files);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - {}: {}", err.path.display(), err.error);
            }
        }
    }

    if report.invalid_files > 0 {
        Err(FacesCliError::ValidationFailed(report.invalid_files))
    } else {
        Ok(())
    }
}

fn validate_record(reader: &JsonRecordReader, path: &Path) -> Result<(), StudyError> {
    participant_id_from_path(path)?;
    load_session(reader, path)?;
    Ok(())
}

// Error types

#[derive(Debug)]
enum FacesCliError {
    Study(StudyError),
    Json(serde_json::Error),
    NoSource,
    ValidationFailed(usize),
}

impl From<StudyError> for FacesCliError {
    fn from(e: StudyError) -> Self {
        FacesCliError::Study(e)
    }
}

impl From<serde_json::Error> for FacesCliError {
    fn from(e: serde_json::Error) -> Self {
        FacesCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<FacesCliError> for CliError {
    fn from(e: FacesCliError) -> Self {
        match e {
            FacesCliError::Study(e) => {
                let (code, hint) = match &e {
                    StudyError::Io { .. } => ("IO_ERROR", "Check file paths and permissions"),
                    StudyError::Decode(_) | StudyError::MissingField(_) => {
                        ("DECODE_ERROR", "Run 'faces validate' for details")
                    }
                    StudyError::InvalidFileName(_) => (
                        "INVALID_FILE_NAME",
                        "Record files must be named <participant>_..._sess<id>.<ext>",
                    ),
                    StudyError::NotFound { .. } => {
                        ("NOT_FOUND", "Run 'faces summary' to list participants and sessions")
                    }
                    StudyError::MappingMissing(_) => (
                        "MAPPING_MISSING",
                        "Add the participant to the arms file or pass --skip-failures",
                    ),
                    StudyError::InvalidArgument(_) => ("INVALID_ARGUMENT", "Check the command arguments"),
                    StudyError::Json(_) => ("JSON_ERROR", "Check JSON syntax"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            FacesCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            FacesCliError::NoSource => CliError {
                code: "NO_SOURCE".to_string(),
                message: "No record source given".to_string(),
                hint: Some("Pass --dir or --manifest".to_string()),
            },
            FacesCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} record files failed validation", count),
                hint: Some("Fix or remove the failing files and retry".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct StudySummary {
    name: String,
    participants: Vec<ParticipantSummary>,
    report: BuildReport,
}

#[derive(serde::Serialize)]
struct ParticipantSummary {
    participant: String,
    study_arm: StudyArm,
    sessions: Vec<SessionSummary>,
}

#[derive(serde::Serialize)]
struct SessionSummary {
    session: String,
    trials: usize,
    trial_types: BTreeMap<String, usize>,
}

#[derive(serde::Serialize)]
struct ValidationReport {
    total_files: usize,
    valid_files: usize,
    invalid_files: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    path: PathBuf,
    error: String,
}
