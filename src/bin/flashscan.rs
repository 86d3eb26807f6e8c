use std::{fmt::Display, io, path::PathBuf, sync::Arc};

use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use colored::Colorize;
use flashscan::{
    BaselinePolicy, FfmpegLogLevel, FlashScanError, OutputFormat, PipelineController,
    ProgressCallback, ProgressInfo, RunConfig, RunState, ScanOptions,
};
use indicatif::{ProgressBar, ProgressStyle};

const EXIT_OK: i32 = 0;
const EXIT_HELP: i32 = 1;
const EXIT_BAD_SOURCE: i32 = 2;
const EXIT_FATAL: i32 = 3;

const CLI_AFTER_HELP: &str = "Examples:\n  flashscan -f storm.mp4\n  flashscan -f storm.mp4 -t 25 --verbose\n  flashscan -f storm.mp4 --baseline first-frame --format json";

#[derive(Debug, Parser)]
#[command(
    name = "flashscan",
    version,
    about = "Look for lightning flashes (sudden global brightness changes) in a video",
    after_help = CLI_AFTER_HELP,
    disable_help_flag = true
)]
struct Cli {
    /// Show additional debugging output.
    #[arg(short, long, overrides_with = "brief")]
    verbose: bool,

    /// Do not show additional debugging output (default).
    #[arg(short, long, overrides_with = "verbose")]
    brief: bool,

    /// Show this help text.
    #[arg(short, long)]
    help: bool,

    /// Input video file to look for flashes in.
    #[arg(short, long, value_name = "FILE")]
    file: Option<PathBuf>,

    /// Average global intensity change above this value counts as a
    /// lightning event.
    #[arg(
        short,
        long,
        value_name = "VALUE",
        allow_negative_numbers = true,
        value_parser = parse_threshold
    )]
    threshold: Option<Threshold>,

    /// Initial detector baseline (zero, first-frame).
    #[arg(long, default_value = "zero")]
    baseline: String,

    /// Output format (text, json).
    #[arg(long, default_value = "text")]
    format: String,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long)]
    log_level: Option<String>,

    /// Show a progress spinner on stderr.
    #[arg(long)]
    progress: bool,

    /// Print shell completions and exit.
    #[arg(long, value_enum, value_name = "SHELL")]
    completions: Option<Shell>,
}

/// A threshold together with the text it was parsed from.
#[derive(Debug, Clone, PartialEq)]
struct Threshold {
    raw: String,
    value: f64,
}

fn parse_threshold(raw: &str) -> Result<Threshold, String> {
    let value = raw
        .trim()
        .parse::<f64>()
        .map_err(|error| format!("invalid threshold \"{raw}\": {error}"))?;
    Ok(Threshold {
        raw: raw.to_string(),
        value,
    })
}

fn parse_baseline(value: &str) -> Option<BaselinePolicy> {
    match value.to_ascii_lowercase().as_str() {
        "zero" => Some(BaselinePolicy::Zero),
        "first-frame" | "first" | "second-frame" => Some(BaselinePolicy::FirstFrame),
        _ => None,
    }
}

fn parse_output_format(value: &str) -> Option<OutputFormat> {
    match value.to_ascii_lowercase().as_str() {
        "text" | "txt" => Some(OutputFormat::Text),
        "json" | "jsonl" => Some(OutputFormat::Json),
        _ => None,
    }
}

fn exit_code_for(error: &FlashScanError) -> i32 {
    if error.is_startup_error() {
        EXIT_BAD_SOURCE
    } else {
        EXIT_FATAL
    }
}

fn fail(code: i32, error: impl Display) -> i32 {
    eprintln!("{} {error}", "error:".red().bold());
    code
}

struct SpinnerProgress {
    bar: ProgressBar,
}

impl SpinnerProgress {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] {msg}",
        )?);
        Ok(Self { bar })
    }
}

impl ProgressCallback for SpinnerProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        let position = info
            .current_timestamp
            .map(flashscan::format_timestamp)
            .unwrap_or_else(|| "-".to_string());
        self.bar.set_message(format!(
            "{} frames, {} events, at {position}",
            info.frames_processed, info.events
        ));
        self.bar.tick();
    }
}

fn run(cli: Cli) -> i32 {
    if cli.help {
        let mut command = Cli::command();
        println!("{}", command.render_help());
        return EXIT_HELP;
    }

    if let Some(shell) = cli.completions {
        let mut command = Cli::command();
        clap_complete::generate(shell, &mut command, "flashscan", &mut io::stdout());
        return EXIT_OK;
    }

    if let Some(level) = &cli.log_level {
        match level.parse::<FfmpegLogLevel>() {
            Ok(parsed) => flashscan::set_ffmpeg_log_level(parsed),
            Err(error) => return fail(EXIT_BAD_SOURCE, error),
        }
    }

    let Some(baseline) = parse_baseline(&cli.baseline) else {
        return fail(
            EXIT_BAD_SOURCE,
            format!("unsupported --baseline: {}", cli.baseline),
        );
    };
    let Some(output_format) = parse_output_format(&cli.format) else {
        return fail(
            EXIT_BAD_SOURCE,
            format!("unsupported --format: {}", cli.format),
        );
    };

    let config = Arc::new(RunConfig::new(RunConfig::DEFAULT_THRESHOLD, cli.verbose));
    if let Some(threshold) = &cli.threshold {
        println!("Using threshold \"{}\"", threshold.raw);
        config.set_threshold(threshold.value);
    }

    let Some(file) = cli.file else {
        return fail(
            EXIT_BAD_SOURCE,
            "no input video file given (use -f FILE)",
        );
    };
    println!("Using \"{}\" as input video file", file.display());

    let mut options = ScanOptions::new()
        .with_baseline(baseline)
        .with_output_format(output_format);

    let spinner = if cli.progress {
        match SpinnerProgress::new() {
            Ok(spinner) => {
                let spinner = Arc::new(spinner);
                options = options
                    .with_progress(Arc::clone(&spinner) as Arc<dyn ProgressCallback>)
                    .with_batch_size(25);
                Some(spinner)
            }
            Err(error) => {
                eprintln!(
                    "{} {}",
                    "warning:".yellow().bold(),
                    format!("progress display unavailable: {error}").yellow()
                );
                None
            }
        }
    } else {
        None
    };

    let mut controller =
        match PipelineController::start(&file, Arc::clone(&config), options, io::stdout()) {
            Ok(controller) => controller,
            Err(error) => {
                println!("Bad source");
                return fail(exit_code_for(&error), error);
            }
        };

    if config.is_verbose() {
        println!("Pipeline=\"{}\"", controller.describe());
    }

    let result = controller.run();
    if let Some(spinner) = spinner {
        spinner.bar.finish_and_clear();
    }

    match result {
        Ok(summary) => {
            log::info!(
                "Scanned {} frames ({} skipped), {} lightning events, ended in {:?}",
                summary.frames,
                summary.skipped,
                summary.events,
                summary.state
            );
            if summary.state == RunState::EndedError {
                log::warn!("Run ended on a source error");
            }
            EXIT_OK
        }
        Err(error) => fail(exit_code_for(&error), error),
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => error.exit(),
    };
    std::process::exit(run(cli));
}
