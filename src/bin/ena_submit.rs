use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use ena_submit::app::{App, SubmitOptions, SubmissionOutcome, validate_documents};
use ena_submit::domain::Action;
use ena_submit::error::EnaError;
use ena_submit::formats::{ExperimentTable, SamplesTable, StudyTable};
use ena_submit::metadata::run::RunManifest;
use ena_submit::output::JsonOutput;
use ena_submit::receipt::Receipt;
use ena_submit::submit::EnaHttpClient;
use ena_submit::tabular::TabularFile;
use ena_submit::transfer::TransferReport;

#[derive(Parser)]
#[command(name = "ena-submit")]
#[command(about = "Submit sequencing metadata to the European Nucleotide Archive")]
#[command(version, author)]
struct Cli {
    /// Submit to the ENA development service instead of production.
    #[arg(long, global = true)]
    dev: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Submit study and/or sample metadata")]
    SubmitMetadata(SubmitMetadataArgs),
    #[command(about = "Submit experiment and run metadata for transferred sequence files")]
    SubmitReads(SubmitReadsArgs),
    #[command(about = "Cancel a single object by accession")]
    Cancel(CancelArgs),
    #[command(about = "Cancel every accession in a prior receipt")]
    CancelAll(CancelAllArgs),
    #[command(about = "Validate metadata files and print their XML without submitting")]
    Validate(ValidateArgs),
}

#[derive(Args)]
struct SubmitMetadataArgs {
    /// Key/value TSV describing the study.
    #[arg(long)]
    study: Option<PathBuf>,

    /// Header TSV with one sample per row.
    #[arg(long)]
    samples: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Action::Add)]
    action: Action,

    /// Keep the submission private until this date (YYYY-MM-DD, at most
    /// two years ahead).
    #[arg(long, default_value = "")]
    hold_date: String,

    /// Write the raw receipt XML to this path.
    #[arg(long)]
    save_receipt: Option<PathBuf>,
}

#[derive(Args)]
struct SubmitReadsArgs {
    /// Header TSV with one experiment per row.
    #[arg(long)]
    experiments: PathBuf,

    /// Header TSV listing transferred files per sample (alias, filename,
    /// checksum).
    #[arg(long)]
    manifest: PathBuf,

    /// File-transfer report TSV produced by the upload tooling.
    #[arg(long)]
    transfer: PathBuf,

    /// Receipt XML from the prior sample submission.
    #[arg(long)]
    receipt: PathBuf,

    #[arg(long, value_enum, default_value_t = Action::Add)]
    action: Action,

    #[arg(long, default_value = "")]
    hold_date: String,

    #[arg(long)]
    save_receipt: Option<PathBuf>,
}

#[derive(Args)]
struct CancelArgs {
    accession: String,
}

#[derive(Args)]
struct CancelAllArgs {
    /// Receipt XML whose accessions should all be cancelled.
    receipt: PathBuf,
}

#[derive(Args)]
struct ValidateArgs {
    #[arg(long)]
    study: Option<PathBuf>,

    #[arg(long)]
    samples: Option<PathBuf>,

    #[arg(long)]
    experiments: Option<PathBuf>,

    #[arg(long)]
    manifest: Option<PathBuf>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(ena) = report.downcast_ref::<EnaError>() {
            return ExitCode::from(map_exit_code(ena));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &EnaError) -> u8 {
    match error {
        EnaError::MissingCredentials(_) | EnaError::EmptySubmission => 2,
        EnaError::SubmitHttp(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::SubmitMetadata(args) => run_submit_metadata(args, cli.dev),
        Commands::SubmitReads(args) => run_submit_reads(args, cli.dev),
        Commands::Cancel(args) => run_cancel(args, cli.dev),
        Commands::CancelAll(args) => run_cancel_all(args, cli.dev),
        Commands::Validate(args) => run_validate(args),
    }
}

fn run_submit_metadata(args: SubmitMetadataArgs, dev: bool) -> miette::Result<()> {
    let study = args
        .study
        .as_deref()
        .map(StudyTable::read)
        .transpose()
        .into_diagnostic()?;
    let samples = args
        .samples
        .as_deref()
        .map(SamplesTable::read)
        .transpose()
        .into_diagnostic()?;

    let app = App::new(EnaHttpClient::new(dev).into_diagnostic()?);
    let options = SubmitOptions {
        action: args.action,
        hold_date: args.hold_date,
    };
    let outcome = app
        .submit_metadata(study.as_ref(), samples.as_ref(), &options)
        .into_diagnostic()?;
    finish_submission(&outcome, args.save_receipt.as_deref())
}

fn run_submit_reads(args: SubmitReadsArgs, dev: bool) -> miette::Result<()> {
    let experiments = ExperimentTable::read(&args.experiments).into_diagnostic()?;
    let manifest_table = TabularFile::read(&args.manifest).into_diagnostic()?;
    let manifest = RunManifest::from_table(&manifest_table).into_diagnostic()?;
    let transfer = TransferReport::read(&args.transfer).into_diagnostic()?;
    let receipt = read_receipt(&args.receipt)?;

    let app = App::new(EnaHttpClient::new(dev).into_diagnostic()?);
    let options = SubmitOptions {
        action: args.action,
        hold_date: args.hold_date,
    };
    let outcome = app
        .submit_reads(&experiments, &manifest, &transfer, &receipt, &options)
        .into_diagnostic()?;
    finish_submission(&outcome, args.save_receipt.as_deref())
}

fn run_cancel(args: CancelArgs, dev: bool) -> miette::Result<()> {
    let app = App::new(EnaHttpClient::new(dev).into_diagnostic()?);
    let outcome = app.cancel(&args.accession).into_diagnostic()?;
    JsonOutput::print_cancellation(&outcome).into_diagnostic()
}

fn run_cancel_all(args: CancelAllArgs, dev: bool) -> miette::Result<()> {
    let receipt = read_receipt(&args.receipt)?;
    let app = App::new(EnaHttpClient::new(dev).into_diagnostic()?);
    let result = app.cancel_all(&receipt).into_diagnostic()?;
    JsonOutput::print_cancellations(&result).into_diagnostic()
}

fn run_validate(args: ValidateArgs) -> miette::Result<()> {
    let study = args
        .study
        .as_deref()
        .map(StudyTable::read)
        .transpose()
        .into_diagnostic()?;
    let samples = args
        .samples
        .as_deref()
        .map(SamplesTable::read)
        .transpose()
        .into_diagnostic()?;
    let experiments = args
        .experiments
        .as_deref()
        .map(ExperimentTable::read)
        .transpose()
        .into_diagnostic()?;
    let manifest = args
        .manifest
        .as_deref()
        .map(|path| {
            let table = TabularFile::read(path)?;
            RunManifest::from_table(&table)
        })
        .transpose()
        .into_diagnostic()?;

    let result = validate_documents(
        study.as_ref(),
        samples.as_ref(),
        experiments.as_ref(),
        manifest.as_ref(),
    )
    .into_diagnostic()?;
    JsonOutput::print_validation(&result).into_diagnostic()
}

fn read_receipt(path: &std::path::Path) -> miette::Result<Receipt> {
    let bytes = std::fs::read(path).into_diagnostic()?;
    Receipt::parse(&bytes).into_diagnostic()
}

fn finish_submission(
    outcome: &SubmissionOutcome,
    save_receipt: Option<&std::path::Path>,
) -> miette::Result<()> {
    if let Some(path) = save_receipt {
        std::fs::write(path, outcome.receipt.as_bytes()).into_diagnostic()?;
    }
    JsonOutput::print_submission(outcome).into_diagnostic()
}
