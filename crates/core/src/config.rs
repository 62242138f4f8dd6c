//! Load generator configuration
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `ASR_LOADGEN_*` environment variables. Command-line flags are applied on
//! top by the binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::poller::PollerConfig;
use crate::session::SessionConfig;
use crate::sink::ReportFormat;

/// Prefix of every environment override
pub const ENV_PREFIX: &str = "ASR_LOADGEN_";

/// Complete load generator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadGenConfig {
    /// Service base URL (http:// or https://)
    pub base_url: String,

    /// Path of the submit endpoint, appended to `base_url`
    pub submit_path: String,

    /// Path prefix of the status endpoint; the operation id is appended
    pub operations_path: String,

    /// Audio file submitted on every attempt
    pub audio_path: PathBuf,

    /// Recognition language (default: en-US)
    pub language_code: String,

    /// Ask the service for beam search decoding (default: false)
    pub execute_beam_search: bool,

    /// Per-request HTTP timeout in seconds (default: 30)
    pub request_timeout_secs: u64,

    /// Pause between poll sweeps in milliseconds (default: 1000)
    pub poll_interval_ms: u64,

    /// Status fetches in flight per sweep (default: 1)
    pub poll_fetch_concurrency: usize,

    /// Stop polling after this many sweeps (default: unbounded)
    pub max_sweeps: Option<u32>,

    /// Stop polling after this many seconds (default: unbounded)
    pub poll_timeout_secs: Option<u64>,

    /// Wait before the first sweep, per accepted operation (default: 1000)
    pub warmup_per_operation_ms: u64,

    /// Upper bound for the total warm-up wait (default: none)
    pub max_warmup_ms: Option<u64>,

    /// Async runtime worker threads (default: number of CPUs)
    pub worker_threads: Option<usize>,

    /// Result output layout (default: text)
    pub report_format: ReportFormat,
}

impl Default for LoadGenConfig {
    fn default() -> Self {
        Self {
            base_url: "https://asr.sapiensapi.com".to_string(),
            submit_path: "/v1/speech:longrunningrecognize".to_string(),
            operations_path: "/v1/operations/".to_string(),
            audio_path: PathBuf::from("short_voice.flac"),
            language_code: "en-US".to_string(),
            execute_beam_search: false,
            request_timeout_secs: 30,
            poll_interval_ms: 1000,
            poll_fetch_concurrency: 1,
            max_sweeps: None,
            poll_timeout_secs: None,
            warmup_per_operation_ms: 1000,
            max_warmup_ms: None,
            worker_threads: None,
            report_format: ReportFormat::Text,
        }
    }
}

impl LoadGenConfig {
    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| Error::Config(format!("Invalid config file: {}", e)))
    }

    /// Read and parse a TOML config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&source)
    }

    /// Defaults or `path`, then the process environment, then validation
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(std::env::vars())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `ASR_LOADGEN_*` overrides from a list of variables
    ///
    /// Every field has an override named after it in upper case, except
    /// `audio_path` (`AUDIO`), `language_code` (`LANGUAGE`) and
    /// `execute_beam_search` (`BEAM_SEARCH`).
    pub fn apply_env<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };

            match name {
                "BASE_URL" => self.base_url = value,
                "AUDIO" => self.audio_path = PathBuf::from(value),
                "LANGUAGE" => self.language_code = value,
                "BEAM_SEARCH" => self.execute_beam_search = parse_env(&key, &value)?,
                "REQUEST_TIMEOUT_SECS" => self.request_timeout_secs = parse_env(&key, &value)?,
                "POLL_INTERVAL_MS" => self.poll_interval_ms = parse_env(&key, &value)?,
                "SUBMIT_PATH" => self.submit_path = value,
                "OPERATIONS_PATH" => self.operations_path = value,
                "POLL_FETCH_CONCURRENCY" => self.poll_fetch_concurrency = parse_env(&key, &value)?,
                "MAX_SWEEPS" => self.max_sweeps = Some(parse_env(&key, &value)?),
                "POLL_TIMEOUT_SECS" => self.poll_timeout_secs = Some(parse_env(&key, &value)?),
                "WARMUP_PER_OPERATION_MS" => {
                    self.warmup_per_operation_ms = parse_env(&key, &value)?
                }
                "MAX_WARMUP_MS" => self.max_warmup_ms = Some(parse_env(&key, &value)?),
                "WORKER_THREADS" => self.worker_threads = Some(parse_env(&key, &value)?),
                "REPORT_FORMAT" => self.report_format = parse_env(&key, &value)?,
                _ => tracing::debug!(variable = %key, "Ignoring unknown environment override"),
            }
        }
        Ok(())
    }

    /// Validate configuration parameters
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `base_url` is not an http:// or https:// URL
    /// - `language_code` is empty
    /// - `request_timeout_secs` is 0
    /// - `poll_fetch_concurrency` is 0
    /// - `max_sweeps` is `Some(0)`
    /// - `worker_threads` is `Some(0)`
    pub fn validate(&self) -> Result<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "base_url must start with http:// or https://, got {}",
                self.base_url
            )));
        }

        if self.language_code.trim().is_empty() {
            return Err(Error::Config("language_code cannot be empty".to_string()));
        }

        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.poll_fetch_concurrency == 0 {
            return Err(Error::Config(
                "poll_fetch_concurrency must be greater than 0".to_string(),
            ));
        }

        if self.max_sweeps == Some(0) {
            return Err(Error::Config("max_sweeps must be greater than 0".to_string()));
        }

        if self.worker_threads == Some(0) {
            return Err(Error::Config(
                "worker_threads must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// HTTP request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Poller settings derived from this configuration
    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            interval: Duration::from_millis(self.poll_interval_ms),
            fetch_concurrency: self.poll_fetch_concurrency,
            max_sweeps: self.max_sweeps,
            timeout: self.poll_timeout_secs.map(Duration::from_secs),
        }
    }

    /// Session settings derived from this configuration
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            warmup_per_operation: Duration::from_millis(self.warmup_per_operation_ms),
            max_warmup: self.max_warmup_ms.map(Duration::from_millis),
            poller: self.poller_config(),
        }
    }

    /// Locate the audio file
    ///
    /// Absolute paths and paths that exist relative to the working directory
    /// are used as-is. Otherwise the path is looked up next to the running
    /// executable, which is where release bundles ship the sample voice.
    pub fn resolve_audio_path(&self) -> PathBuf {
        if self.audio_path.is_absolute() || self.audio_path.exists() {
            return self.audio_path.clone();
        }

        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(&self.audio_path)))
            .filter(|candidate| candidate.exists())
            .unwrap_or_else(|| self.audio_path.clone())
    }
}

fn parse_env<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::Config(format!("Invalid value for {}: {} ({})", key, value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = LoadGenConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.poller_config(), PollerConfig::default());
        assert_eq!(
            config.session_config().warmup_per_operation,
            Duration::from_secs(1)
        );
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = LoadGenConfig::from_toml_str(
            r#"
            base_url = "http://192.168.80.102:50120"
            submit_path = "/longrunningrecognize"
            operations_path = "/operations/"
            max_sweeps = 30
            report_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.base_url, "http://192.168.80.102:50120");
        assert_eq!(config.max_sweeps, Some(30));
        assert_eq!(config.report_format, ReportFormat::Json);
        assert_eq!(config.language_code, "en-US");
        assert_eq!(config.poll_interval_ms, 1000);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = LoadGenConfig::from_toml_str("retry_count = 3").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "language_code = \"de-DE\"\nexecute_beam_search = true").unwrap();

        let config = LoadGenConfig::from_file(file.path()).unwrap();
        assert_eq!(config.language_code, "de-DE");
        assert!(config.execute_beam_search);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = LoadGenConfig::from_file("/nonexistent/loadgen.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = LoadGenConfig::default();
        config
            .apply_env(vars(&[
                ("ASR_LOADGEN_BASE_URL", "http://localhost:50120"),
                ("ASR_LOADGEN_POLL_INTERVAL_MS", "250"),
                ("ASR_LOADGEN_WORKER_THREADS", "4"),
                ("ASR_LOADGEN_BEAM_SEARCH", "true"),
                ("PATH", "/usr/bin"),
            ]))
            .unwrap();

        assert_eq!(config.base_url, "http://localhost:50120");
        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.worker_threads, Some(4));
        assert!(config.execute_beam_search);
    }

    #[test]
    fn test_env_overrides_cover_polling_and_output() {
        let mut config = LoadGenConfig::default();
        config
            .apply_env(vars(&[
                ("ASR_LOADGEN_SUBMIT_PATH", "/longrunningrecognize"),
                ("ASR_LOADGEN_OPERATIONS_PATH", "/operations/"),
                ("ASR_LOADGEN_POLL_FETCH_CONCURRENCY", "8"),
                ("ASR_LOADGEN_MAX_SWEEPS", "120"),
                ("ASR_LOADGEN_POLL_TIMEOUT_SECS", "600"),
                ("ASR_LOADGEN_WARMUP_PER_OPERATION_MS", "50"),
                ("ASR_LOADGEN_MAX_WARMUP_MS", "5000"),
                ("ASR_LOADGEN_REPORT_FORMAT", "JSON"),
            ]))
            .unwrap();

        assert_eq!(config.submit_path, "/longrunningrecognize");
        assert_eq!(config.operations_path, "/operations/");
        assert_eq!(config.poll_fetch_concurrency, 8);
        assert_eq!(config.max_sweeps, Some(120));
        assert_eq!(config.poll_timeout_secs, Some(600));
        assert_eq!(config.report_format, ReportFormat::Json);

        let session = config.session_config();
        assert_eq!(session.warmup_per_operation, Duration::from_millis(50));
        assert_eq!(session.max_warmup, Some(Duration::from_secs(5)));
        assert_eq!(session.poller.timeout, Some(Duration::from_secs(600)));
    }

    #[test]
    fn test_env_bad_report_format() {
        let mut config = LoadGenConfig::default();
        let err = config
            .apply_env(vars(&[("ASR_LOADGEN_REPORT_FORMAT", "xml")]))
            .unwrap_err();
        assert!(err.to_string().contains("ASR_LOADGEN_REPORT_FORMAT"));
    }

    #[test]
    fn test_env_parse_error() {
        let mut config = LoadGenConfig::default();
        let err = config
            .apply_env(vars(&[("ASR_LOADGEN_POLL_INTERVAL_MS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("ASR_LOADGEN_POLL_INTERVAL_MS"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad_url = LoadGenConfig {
            base_url: "ftp://asr.example.com".into(),
            ..Default::default()
        };
        assert!(bad_url.validate().is_err());

        let zero_fetches = LoadGenConfig {
            poll_fetch_concurrency: 0,
            ..Default::default()
        };
        assert!(zero_fetches.validate().is_err());

        let zero_sweeps = LoadGenConfig {
            max_sweeps: Some(0),
            ..Default::default()
        };
        assert!(zero_sweeps.validate().is_err());
    }

    #[test]
    fn test_absolute_audio_path_is_kept() {
        let config = LoadGenConfig {
            audio_path: PathBuf::from("/data/voices/sample.flac"),
            ..Default::default()
        };
        assert_eq!(
            config.resolve_audio_path(),
            PathBuf::from("/data/voices/sample.flac")
        );
    }
}
