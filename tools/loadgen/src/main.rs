//! ASR load generator
//!
//! Repeatedly submits one audio file to a long-running speech recognition
//! service under a concurrency ceiling, then polls every accepted operation
//! until it completes and prints the transcriptions.
//!
//! # Usage
//!
//! ```bash
//! # Interactive: prompts for iterations and concurrency, round after round
//! asr-loadgen --audio ./short_voice.flac
//!
//! # One non-interactive round against a local deployment
//! asr-loadgen --base-url http://192.168.80.102:50120 \
//!     --submit-path /longrunningrecognize --operations-path /operations/ \
//!     --iterations 200 --concurrency 16
//!
//! # With a config file and debug logging
//! RUST_LOG=debug asr-loadgen --config loadgen.toml
//! ```
//!
//! # Environment Variables
//!
//! - `ASR_LOADGEN_BASE_URL`, `ASR_LOADGEN_SUBMIT_PATH`, `ASR_LOADGEN_OPERATIONS_PATH`
//! - `ASR_LOADGEN_AUDIO`, `ASR_LOADGEN_LANGUAGE`, `ASR_LOADGEN_BEAM_SEARCH`
//! - `ASR_LOADGEN_REQUEST_TIMEOUT_SECS`, `ASR_LOADGEN_POLL_INTERVAL_MS`,
//!   `ASR_LOADGEN_POLL_FETCH_CONCURRENCY`, `ASR_LOADGEN_MAX_SWEEPS`,
//!   `ASR_LOADGEN_POLL_TIMEOUT_SECS`
//! - `ASR_LOADGEN_WARMUP_PER_OPERATION_MS`, `ASR_LOADGEN_MAX_WARMUP_MS`
//! - `ASR_LOADGEN_WORKER_THREADS`, `ASR_LOADGEN_REPORT_FORMAT`
//! - `RUST_LOG`: Logging level (default: `info`)

mod prompt;
mod report;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use asr_loadgen_core::{
    LoadGenConfig, LoadTest, ReportFormat, RunParams, SubmissionRequest, TerminalSink,
};
use asr_loadgen_http::HttpRecognitionClient;

/// ASR load generator - stress a long-running recognition service
#[derive(Parser)]
#[command(name = "asr-loadgen")]
#[command(author, version)]
#[command(about = "Submit an audio file repeatedly and poll the resulting recognition operations")]
struct Args {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Service base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Submit endpoint path
    #[arg(long)]
    submit_path: Option<String>,

    /// Status endpoint path prefix
    #[arg(long)]
    operations_path: Option<String>,

    /// Audio file to submit
    #[arg(short, long)]
    audio: Option<PathBuf>,

    /// Recognition language
    #[arg(short, long)]
    language: Option<String>,

    /// Request beam search decoding
    #[arg(long)]
    beam_search: bool,

    /// Submissions per round (runs a single round, requires --concurrency)
    #[arg(short, long, requires = "concurrency", value_parser = clap::value_parser!(u32).range(1..=1000))]
    iterations: Option<u32>,

    /// Concurrency ceiling (runs a single round, requires --iterations)
    #[arg(short = 'j', long, requires = "iterations", value_parser = clap::value_parser!(u32).range(1..=64))]
    concurrency: Option<u32>,

    /// Pause between poll sweeps in milliseconds
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Status fetches in flight per sweep
    #[arg(long)]
    poll_fetch_concurrency: Option<usize>,

    /// Stop polling after this many sweeps
    #[arg(long)]
    max_sweeps: Option<u32>,

    /// Stop polling after this many seconds
    #[arg(long)]
    poll_timeout_secs: Option<u64>,

    /// Async runtime worker threads
    #[arg(long)]
    worker_threads: Option<usize>,

    /// Result output format
    #[arg(long, value_enum)]
    format: Option<FormatArg>,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Text,
    Json,
}

impl From<FormatArg> for ReportFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Text => ReportFormat::Text,
            FormatArg::Json => ReportFormat::Json,
        }
    }
}

impl Args {
    /// Command-line flags win over file and environment values
    fn apply_to(&self, config: &mut LoadGenConfig) {
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(path) = &self.submit_path {
            config.submit_path = path.clone();
        }
        if let Some(path) = &self.operations_path {
            config.operations_path = path.clone();
        }
        if let Some(audio) = &self.audio {
            config.audio_path = audio.clone();
        }
        if let Some(language) = &self.language {
            config.language_code = language.clone();
        }
        if self.beam_search {
            config.execute_beam_search = true;
        }
        if let Some(interval) = self.poll_interval_ms {
            config.poll_interval_ms = interval;
        }
        if let Some(fetches) = self.poll_fetch_concurrency {
            config.poll_fetch_concurrency = fetches;
        }
        if self.max_sweeps.is_some() {
            config.max_sweeps = self.max_sweeps;
        }
        if self.poll_timeout_secs.is_some() {
            config.poll_timeout_secs = self.poll_timeout_secs;
        }
        if self.worker_threads.is_some() {
            config.worker_threads = self.worker_threads;
        }
        if let Some(format) = self.format {
            config.report_format = format.into();
        }
    }

    /// Parameters for a single non-interactive round, if given
    fn fixed_params(&self) -> Result<Option<RunParams>> {
        match (self.iterations, self.concurrency) {
            (Some(iterations), Some(concurrency)) => Ok(Some(RunParams::new(iterations, concurrency)?)),
            _ => Ok(None),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    let filter = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .init();

    let mut config =
        LoadGenConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    args.apply_to(&mut config);
    config.validate().context("Invalid configuration")?;

    let worker_threads = config.worker_threads.unwrap_or_else(num_cpus::get);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        base_url = %config.base_url,
        worker_threads,
        "ASR load generator starting"
    );

    // Create tokio runtime
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .thread_name("asr-loadgen")
        .enable_all()
        .build()
        .context("Failed to build async runtime")?;

    runtime.block_on(run(args, config))
}

async fn run(args: Args, config: LoadGenConfig) -> Result<()> {
    let audio_path = config.resolve_audio_path();
    let audio = tokio::fs::read(&audio_path)
        .await
        .with_context(|| format!("Failed to load the voice data from {}", audio_path.display()))?;

    let request =
        SubmissionRequest::encode(&audio, config.language_code.clone(), config.execute_beam_search)
            .context("Failed to serialize uploading request")?;

    info!(
        audio = %audio_path.display(),
        audio_bytes = audio.len(),
        request_bytes = request.len(),
        "Uploading request prepared"
    );

    let service = HttpRecognitionClient::from_config(&config)
        .context("Failed to create recognition client")?;
    let sink = TerminalSink::stdout(config.report_format);
    let load_test = LoadTest::new(Arc::new(service), Arc::new(sink), config.session_config());

    if let Some(params) = args.fixed_params()? {
        let summary = load_test.run(&request, params).await;
        report::print_summary(&mut std::io::stdout(), &summary)?;
        return Ok(());
    }

    loop {
        let Some(params) = tokio::task::spawn_blocking(|| {
            prompt::read_run_params(&mut std::io::stdin().lock(), &mut std::io::stdout())
        })
        .await??
        else {
            break;
        };

        let summary = load_test.run(&request, params).await;
        report::print_summary(&mut std::io::stdout(), &summary)?;

        if let Some(poll) = &summary.poll {
            if !poll.is_drained() {
                warn!(
                    pending = poll.abandoned.len(),
                    "Round ended with operations still pending"
                );
            }
        }

        let another = tokio::task::spawn_blocking(|| {
            prompt::read_another_round(&mut std::io::stdin().lock(), &mut std::io::stdout())
        })
        .await??;

        if !another {
            break;
        }
    }

    info!("ASR load generator finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from([
            "asr-loadgen",
            "--base-url",
            "http://127.0.0.1:50120",
            "--submit-path",
            "/longrunningrecognize",
            "--max-sweeps",
            "20",
            "--format",
            "json",
            "--beam-search",
        ]);
        let mut config = LoadGenConfig::default();
        args.apply_to(&mut config);

        assert_eq!(config.base_url, "http://127.0.0.1:50120");
        assert_eq!(config.submit_path, "/longrunningrecognize");
        assert_eq!(config.operations_path, "/v1/operations/");
        assert_eq!(config.max_sweeps, Some(20));
        assert_eq!(config.report_format, ReportFormat::Json);
        assert!(config.execute_beam_search);
        assert!(args.fixed_params().unwrap().is_none());
    }

    #[test]
    fn test_fixed_round() {
        let args = Args::parse_from(["asr-loadgen", "-i", "50", "-j", "8"]);
        let params = args.fixed_params().unwrap().unwrap();
        assert_eq!(params.iterations(), 50);
        assert_eq!(params.concurrency(), 8);
    }

    #[test]
    fn test_out_of_range_flags_rejected() {
        assert!(Args::try_parse_from(["asr-loadgen", "-i", "1001", "-j", "8"]).is_err());
        assert!(Args::try_parse_from(["asr-loadgen", "-i", "10", "-j", "65"]).is_err());
        assert!(Args::try_parse_from(["asr-loadgen", "-i", "10"]).is_err());
    }
}
