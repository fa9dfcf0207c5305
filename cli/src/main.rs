//! chainbatch CLI — run and inspect mint/transfer/burn batches.
//!
//! Usage:
//! ```bash
//! # Run a batch against the dry-run ledger and save the report
//! chainbatch run --file drop.csv --output report.json
//!
//! # Check every operation without executing anything
//! chainbatch validate --file drop.json
//!
//! # Explain a ledger failure and its retry schedule
//! chainbatch classify --code 307
//! chainbatch classify --message "request timeout"
//! ```

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use chainbatch_core::{
    process_batch, validate, BatchConfig, BatchInput, BatchRequest, ErrorClassifier,
    ExecutionReport, OperationKind, OperationStatus, RawFailure, RetryScheduler,
};

mod dry_run;
mod logging;

use dry_run::DryRunLedger;

#[derive(Parser)]
#[command(
    name = "chainbatch",
    about = "Run mint / transfer / burn batches with retry and rate limiting",
    version
)]
struct Cli {
    /// Run configuration (YAML or JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a batch file against the dry-run ledger
    Run(RunArgs),

    /// Parse and validate a batch file without executing it
    Validate {
        /// Batch file (.json records or .csv table)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Classify a raw ledger failure
    Classify(ClassifyArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Batch file (.json records or .csv table)
    #[arg(short, long)]
    file: PathBuf,
    /// Attempts per operation, counting the first
    #[arg(long)]
    max_retries: Option<u32>,
    /// Fixed pause between operations in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,
    /// Write the JSON report to this path
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Print the full JSON report instead of a summary
    #[arg(long)]
    json: bool,
    /// Make every operation of this kind fail (exercises failure reporting)
    #[arg(long)]
    fail_kind: Option<String>,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct ClassifyArgs {
    /// Numeric ledger error code
    #[arg(long, allow_negative_numbers = true)]
    code: Option<i64>,
    /// Free-text error message
    #[arg(long)]
    message: Option<String>,
    /// Raw JSON failure payload, e.g. '{"error":307}'
    #[arg(long)]
    json: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let mut config = match &cli.config {
        Some(path) => BatchConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => BatchConfig::default(),
    };
    if cli.verbose {
        config.log.level = "debug".into();
    }
    logging::init_tracing(&config.log);

    match cli.command {
        Commands::Run(args) => cmd_run(args, &config).await,
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Classify(args) => cmd_classify(args, &config),
    }
}

async fn cmd_run(args: RunArgs, config: &BatchConfig) -> Result<i32> {
    let fail_kind = match args.fail_kind.as_deref() {
        Some(raw) => match OperationKind::parse(raw) {
            Some(kind) => Some(kind),
            None => bail!("--fail-kind must be one of: mint, transfer, burn (got '{raw}')"),
        },
        None => None,
    };

    let mut options = config.process_options();
    if let Some(n) = args.max_retries {
        options.max_retries = n;
    }
    if let Some(ms) = args.delay_ms {
        options.inter_op_delay = Some(Duration::from_millis(ms));
    }
    let token = CancellationToken::new();
    options.cancel = Some(token.clone());

    let input = BatchInput::from_path(&args.file)
        .with_context(|| format!("reading batch {}", args.file.display()))?;

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; finishing current operation");
            token.cancel();
        }
    });

    let report = process_batch(&input, DryRunLedger { fail_kind }, &options)
        .await
        .with_context(|| format!("running batch {}", args.file.display()))?;

    if let Some(path) = &args.output {
        report
            .write_json(path)
            .with_context(|| format!("writing report {}", path.display()))?;
    }

    if args.json {
        println!("{}", report.to_json_pretty()?);
    } else {
        print_summary(&report);
        if let Some(path) = &args.output {
            println!("\nReport written to {}", path.display());
        }
    }

    Ok(if report.has_failures() { 2 } else { 0 })
}

fn print_summary(report: &ExecutionReport) {
    for op in report.operations() {
        let marker = match op.status {
            OperationStatus::Success => "ok  ",
            OperationStatus::Failed => "FAIL",
            OperationStatus::Skipped => "skip",
            OperationStatus::Pending => "....",
        };
        println!("  [{marker}] {:<16} {:<9} attempts={}", op.id, op.kind, op.attempts);
        if let Some(err) = &op.error {
            println!("         {}: {}", err.code, err.message);
            for hint in &err.suggestions {
                println!("         hint: {hint}");
            }
        }
    }

    let s = report.summary();
    println!();
    println!("  Total:        {}", s.total);
    println!("  Successful:   {}", s.successful);
    println!("  Failed:       {}", s.failed);
    println!("  Skipped:      {}", s.skipped);
    println!("  Success rate: {:.1}%", s.success_rate * 100.0);
    println!("  Elapsed:      {}ms", s.execution_time_ms);
}

fn cmd_validate(file: &Path) -> Result<i32> {
    let input = BatchInput::from_path(file)
        .with_context(|| format!("reading batch {}", file.display()))?;
    let request = BatchRequest::parse(&input)
        .with_context(|| format!("parsing batch {}", file.display()))?;

    let mut invalid = 0;
    for op in request.operations() {
        match validate(op) {
            Ok(command) => println!("  [ok  ] {:<16} {command}", op.id),
            Err(err) => {
                invalid += 1;
                println!("  [FAIL] {:<16} {err}", op.id);
            }
        }
    }
    println!("\n  {} operations, {} invalid", request.len(), invalid);
    Ok(if invalid > 0 { 2 } else { 0 })
}

fn cmd_classify(args: ClassifyArgs, config: &BatchConfig) -> Result<i32> {
    let raw = match (args.code, args.message, args.json) {
        (Some(code), _, _) => RawFailure::Code(code),
        (_, Some(message), _) => RawFailure::Message(message),
        (_, _, Some(json)) => {
            let value = serde_json::from_str(&json).context("parsing --json payload")?;
            RawFailure::from_value(value)
        }
        _ => bail!("one of --code, --message or --json is required"),
    };

    let classification = ErrorClassifier::new().classify(&raw);
    let scheduler = RetryScheduler::new(config.retry.clone());
    let schedule = scheduler.schedule(&classification, config.max_retries);

    println!("{classification}");
    println!("  Code:        {}", classification.code);
    println!("  Category:    {}", classification.category);
    println!("  Recoverable: {}", classification.recoverable);
    for hint in &classification.suggestions {
        println!("  Hint:        {hint}");
    }
    if schedule.is_empty() {
        println!("  Retry:       none");
    } else {
        let delays: Vec<_> = schedule.iter().map(|ms| format!("{ms}ms")).collect();
        println!("  Retry:       {} (max {} attempts)", delays.join(", "), config.max_retries);
    }
    Ok(0)
}
