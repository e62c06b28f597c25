//! Steps CLI - Command-line interface for Synheart Steps
//!
//! Commands:
//! - run: Process packets line by line (streaming mode)
//! - ingest: Process a packet file and print a summary (batch mode)
//! - check: Validate packet syntax without accumulating
//! - demo: Replay a built-in sample day
//! - config: Print the effective configuration

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use synheart_steps::encoder::ReportEncoder;
use synheart_steps::sink::{Message, MessageSink, NdjsonSink, TextSink};
use synheart_steps::source::{
    sample_day, Clock, FixedClock, LineSource, PacketSource, SystemClock,
};
use synheart_steps::{
    ConfigError, IngestSummary, IngestionPipeline, PacketParser, StepConfig, PRODUCER_NAME,
    STEPS_VERSION,
};

/// Steps - On-device step-counter ingestion
#[derive(Parser)]
#[command(name = "steps")]
#[command(author = "Synheart AI Inc")]
#[command(version = STEPS_VERSION)]
#[command(about = "Validate pedometer packets and report daily progress", long_about = None)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ConfigArgs {
    /// Load configuration from a JSON file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Step length in meters
    #[arg(long, global = true)]
    step_length: Option<f64>,

    /// Body weight in kg
    #[arg(long, global = true)]
    weight: Option<f64>,

    /// Body height in meters
    #[arg(long, global = true)]
    height: Option<f64>,

    /// Average walking speed in m/s
    #[arg(long, global = true)]
    speed: Option<f64>,

    /// Packet timestamp format (chrono syntax)
    #[arg(long, global = true)]
    timestamp_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Process packets line by line (streaming mode)
    Run {
        /// Input file path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Output format
        #[arg(long, default_value = "text")]
        output_format: OutputFormat,

        /// Reference time (RFC 3339); defaults to the system clock
        #[arg(long, value_parser = parse_now)]
        now: Option<DateTime<Utc>>,

        /// Buffer output instead of flushing after each record
        #[arg(long)]
        no_flush: bool,
    },

    /// Process a packet file and print a summary (batch mode)
    Ingest {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output format
        #[arg(long, default_value = "text")]
        output_format: OutputFormat,

        /// Reference time (RFC 3339); defaults to the system clock
        #[arg(long, value_parser = parse_now)]
        now: Option<DateTime<Utc>>,

        /// Only print the summary
        #[arg(short, long)]
        quiet: bool,
    },

    /// Validate packet syntax without accumulating
    Check {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replay a built-in sample day
    Demo {
        /// Reference time (RFC 3339); defaults to the system clock
        #[arg(long, value_parser = parse_now)]
        now: Option<DateTime<Utc>>,
    },

    /// Print the effective configuration
    Config,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable report text
    Text,
    /// Newline-delimited JSON envelopes
    Ndjson,
}

fn parse_now(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("expected RFC 3339 time: {e}"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), StepsCliError> {
    let config = build_config(&cli.config)?;

    match cli.command {
        Commands::Run {
            input,
            output_format,
            now,
            no_flush,
        } => cmd_run(config, &input, output_format, now, !no_flush),

        Commands::Ingest {
            input,
            output_format,
            now,
            quiet,
        } => cmd_ingest(config, &input, output_format, now, quiet),

        Commands::Check { input, json } => cmd_check(config, &input, json),

        Commands::Demo { now } => cmd_demo(config, now),

        Commands::Config => cmd_config(&config),
    }
}

/// Defaults, then the config file, then individual flags
fn build_config(args: &ConfigArgs) -> Result<StepConfig, StepsCliError> {
    let mut config = match &args.config {
        Some(path) => StepConfig::load(path)?,
        None => StepConfig::default(),
    };

    if let Some(v) = args.step_length {
        config.step_length_m = v;
    }
    if let Some(v) = args.weight {
        config.weight_kg = v;
    }
    if let Some(v) = args.height {
        config.height_m = v;
    }
    if let Some(v) = args.speed {
        config.walking_speed_mps = v;
    }
    if let Some(v) = &args.timestamp_format {
        config.timestamp_format = v.clone();
    }

    config.validate()?;
    Ok(config)
}

fn cmd_run(
    config: StepConfig,
    input: &Path,
    output_format: OutputFormat,
    now: Option<DateTime<Utc>>,
    flush: bool,
) -> Result<(), StepsCliError> {
    if is_stdin(input) && atty::is(atty::Stream::Stdin) {
        info!("reading packets from terminal, end input with Ctrl-D");
    }

    let mut source = LineSource::new(open_input(input)?);
    let mut sink = make_sink(output_format, flush);
    let clock = make_clock(now);

    let mut pipeline = IngestionPipeline::new(config);
    let summary = pipeline.run(&mut source, clock.as_ref(), sink.as_mut())?;
    log_summary(&summary);

    Ok(())
}

fn cmd_ingest(
    config: StepConfig,
    input: &Path,
    output_format: OutputFormat,
    now: Option<DateTime<Utc>>,
    quiet: bool,
) -> Result<(), StepsCliError> {
    let mut source = LineSource::new(open_input(input)?);
    let clock = make_clock(now);
    let mut pipeline = IngestionPipeline::new(config);

    let summary = if quiet {
        pipeline.run(&mut source, clock.as_ref(), &mut NullSink)?
    } else {
        let mut sink = make_sink(output_format.clone(), false);
        pipeline.run(&mut source, clock.as_ref(), sink.as_mut())?
    };
    log_summary(&summary);

    if summary.processed == 0 {
        return Err(StepsCliError::NoPackets);
    }

    match output_format {
        OutputFormat::Ndjson => println!("{}", serde_json::to_string(&summary)?),
        OutputFormat::Text => {
            println!("Ingest Summary");
            println!("==============");
            println!("Packets processed: {}", summary.processed);
            println!("Stored:            {}", summary.stored);
            println!("Ignored (0 steps): {}", summary.ignored);
            println!("Rejected:          {}", summary.rejected());
            println!("  malformed:        {}", summary.malformed);
            println!("  wrong day:        {}", summary.wrong_day);
            println!("  future timestamp: {}", summary.future_timestamp);
            println!("  out of order:     {}", summary.out_of_order);
            println!("Day rollovers:     {}", summary.rollovers);
            println!("Steps today:       {}", summary.total_steps);
        }
    }

    Ok(())
}

fn cmd_check(config: StepConfig, input: &Path, json: bool) -> Result<(), StepsCliError> {
    let parser = PacketParser::from_config(&config);
    let mut source = LineSource::new(open_input(input)?);

    let mut total = 0;
    let mut errors = Vec::new();

    while let Some(raw) = source.next_packet()? {
        if let Err(e) = parser.parse(&raw) {
            errors.push(CheckErrorDetail {
                index: total,
                packet: raw,
                error: e.to_string(),
            });
        }
        total += 1;
    }

    let report = CheckReport {
        timestamp_format: parser.format().to_string(),
        total_packets: total,
        valid_packets: total - errors.len(),
        invalid_packets: errors.len(),
        errors,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Packet Check Report");
        println!("===================");
        println!("Timestamp format: {}", report.timestamp_format);
        println!("Total packets:   {}", report.total_packets);
        println!("Valid packets:   {}", report.valid_packets);
        println!("Invalid packets: {}", report.invalid_packets);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - Packet {} ({:?}): {}", err.index, err.packet, err.error);
            }
        }
    }

    if report.invalid_packets > 0 {
        Err(StepsCliError::CheckFailed(report.invalid_packets))
    } else {
        Ok(())
    }
}

fn cmd_demo(config: StepConfig, now: Option<DateTime<Utc>>) -> Result<(), StepsCliError> {
    let clock = make_clock(now);
    let mut source = sample_day(clock.now().date_naive());
    let mut sink = TextSink::new(io::stdout());

    let mut pipeline = IngestionPipeline::new(config);
    let summary = pipeline.run(&mut source, clock.as_ref(), &mut sink)?;
    log_summary(&summary);

    Ok(())
}

fn cmd_config(config: &StepConfig) -> Result<(), StepsCliError> {
    println!("{}", config.to_json()?);
    info!("{} {}", PRODUCER_NAME, STEPS_VERSION);
    Ok(())
}

// Helper functions

fn is_stdin(path: &Path) -> bool {
    path.to_string_lossy() == "-"
}

fn open_input(path: &Path) -> Result<Box<dyn BufRead>, StepsCliError> {
    if is_stdin(path) {
        Ok(Box::new(BufReader::new(io::stdin())))
    } else {
        Ok(Box::new(BufReader::new(File::open(path)?)))
    }
}

fn make_sink(format: OutputFormat, flush: bool) -> Box<dyn MessageSink> {
    match format {
        OutputFormat::Text => Box::new(TextSink::new(io::stdout())),
        OutputFormat::Ndjson => {
            let encoder = ReportEncoder::new();
            info!("encoding reports as instance {}", encoder.instance_id());
            Box::new(NdjsonSink::new(io::stdout(), encoder).with_flush(flush))
        }
    }
}

fn make_clock(now: Option<DateTime<Utc>>) -> Box<dyn Clock> {
    match now {
        Some(t) => Box::new(FixedClock(t)),
        None => Box::new(SystemClock),
    }
}

fn log_summary(summary: &IngestSummary) {
    info!(
        "processed {} packets: {} stored, {} ignored, {} rejected, {} steps today",
        summary.processed,
        summary.stored,
        summary.ignored,
        summary.rejected(),
        summary.total_steps
    );
}

/// Discards every message
struct NullSink;

impl MessageSink for NullSink {
    fn emit(&mut self, _message: &Message) -> io::Result<()> {
        Ok(())
    }
}

// Error types

#[derive(Debug)]
enum StepsCliError {
    Io(io::Error),
    Config(ConfigError),
    Json(serde_json::Error),
    NoPackets,
    CheckFailed(usize),
}

impl From<io::Error> for StepsCliError {
    fn from(e: io::Error) -> Self {
        StepsCliError::Io(e)
    }
}

impl From<ConfigError> for StepsCliError {
    fn from(e: ConfigError) -> Self {
        StepsCliError::Config(e)
    }
}

impl From<serde_json::Error> for StepsCliError {
    fn from(e: serde_json::Error) -> Self {
        StepsCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<StepsCliError> for CliError {
    fn from(e: StepsCliError) -> Self {
        match e {
            StepsCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            StepsCliError::Config(e) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'steps config' to see the expected keys".to_string()),
            },
            StepsCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            StepsCliError::NoPackets => CliError {
                code: "NO_PACKETS".to_string(),
                message: "No packets found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            StepsCliError::CheckFailed(count) => CliError {
                code: "CHECK_FAILED".to_string(),
                message: format!("{} packets failed validation", count),
                hint: Some("Packets must look like 'YYYYMMDD HH:MM:SS,steps'".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct CheckReport {
    timestamp_format: String,
    total_packets: usize,
    valid_packets: usize,
    invalid_packets: usize,
    errors: Vec<CheckErrorDetail>,
}

#[derive(serde::Serialize)]
struct CheckErrorDetail {
    index: usize,
    packet: String,
    error: String,
}
