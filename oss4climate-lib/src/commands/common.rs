//! Argument groups, logging and the network session shared by the commands.

use super::{Host, ProgressReporter};
use super::config::Config;
use crate::Result;
use crate::fetch::{Cache, CacheLockGuard, Fetcher, acquire_cache_lock};
use crate::hosting::HostingConfig;
use crate::pipeline::{Clients, Failure, Progress, StopSignal};
use crate::targets::{ResourceListing, TargetSet};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, ValueEnum};
use core::time::Duration;
use directories::BaseDirs;
use ohno::IntoAppError;
use std::io::Write;
use tokio::task::JoinHandle;

const LOG_TARGET: &str = "   session";

/// Requests in flight per host.
const REQUESTS_PER_HOST: usize = 1;

/// Color mode configuration for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Always use colors
    Always,

    /// Never use colors
    Never,

    /// Use colors if the output is a terminal, otherwise don't use colors
    Auto,
}

impl ColorMode {
    pub fn use_colors(self, is_terminal: impl FnOnce() -> bool) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => is_terminal(),
        }
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    None,

    /// Only error messages
    Error,

    /// Warning and error messages
    Warn,

    /// Info, warning, and error messages
    Info,

    /// Debug, info, warning, and error messages
    Debug,

    /// Trace, debug, info, warning, and error messages
    Trace,
}

/// Arguments every command accepts
#[derive(Args, Debug, Clone)]
pub struct BaseArgs {
    /// Path to configuration file (default is `oss4climate.toml` in the working directory)
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// Control when to use colored output
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    pub color: ColorMode,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "none")]
    pub log_level: LogLevel,
}

impl BaseArgs {
    /// Initialize logging and load the configuration.
    pub fn setup(&self) -> Result<Config> {
        init_logging(self.log_level);
        Config::load(Utf8Path::new("."), self.config.as_ref())
    }
}

/// Arguments of the commands that talk to the network
#[derive(Args, Debug, Clone)]
pub struct NetworkArgs {
    /// GitHub personal access token
    #[arg(long, value_name = "TOKEN", env = "GITHUB_API_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// GitLab access token
    #[arg(long, value_name = "TOKEN", env = "GITLAB_ACCESS_TOKEN", hide_env_values = true)]
    pub gitlab_token: Option<String>,

    /// Directory where HTTP responses are cached
    #[arg(long, value_name = "PATH")]
    pub cache_dir: Option<Utf8PathBuf>,

    /// Ignore cached data and fetch everything fresh
    #[arg(long)]
    pub ignore_cached: bool,

    /// Stop starting new fetches after this many seconds
    #[arg(long, value_name = "SECONDS")]
    pub time_limit: Option<u64>,
}

/// Initialize logger based on log level
fn init_logging(log_level: LogLevel) {
    let level = match log_level {
        LogLevel::None => return,
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    };

    let env = env_logger::Env::default().filter_or("RUST_LOG", level);

    // A second command in the same process keeps the first logger.
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(matches!(log_level, LogLevel::Debug | LogLevel::Trace))
        .try_init();
}

fn resolve_cache_dir(cache_dir: Option<&Utf8PathBuf>) -> Result<std::path::PathBuf> {
    if let Some(path) = cache_dir {
        return Ok(path.as_std_path().to_path_buf());
    }

    Ok(BaseDirs::new()
        .into_app_err("could not determine cache directory")?
        .cache_dir()
        .join("oss4climate"))
}

/// Load the target index, starting empty when the file does not exist yet.
pub fn load_target_index(path: &Utf8Path) -> Result<TargetSet> {
    if path.exists() {
        TargetSet::load(path)
    } else {
        log::info!(target: LOG_TARGET, "No target index at '{path}', starting empty");
        Ok(TargetSet::default())
    }
}

/// Load the listings index, starting empty when the file does not exist yet.
pub fn load_listings_index(path: &Utf8Path) -> Result<ResourceListing> {
    if path.exists() {
        ResourceListing::load(path)
    } else {
        log::info!(target: LOG_TARGET, "No listings index at '{path}', starting empty");
        Ok(ResourceListing::default())
    }
}

/// Everything a networked command needs for one run.
///
/// Holds the cache lock for its whole lifetime.
#[derive(Debug)]
pub struct Session {
    pub config: Config,
    pub fetcher: Fetcher,
    pub hosting: HostingConfig,
    pub stop: StopSignal,
    pub progress: ProgressReporter,
    ctrl_c: JoinHandle<()>,
    _cache_lock: CacheLockGuard,
}

impl Session {
    pub async fn new(config: Config, base: &BaseArgs, args: &NetworkArgs) -> Result<Self> {
        let cache_dir = resolve_cache_dir(args.cache_dir.as_ref())?;
        let cache_lock = acquire_cache_lock(&cache_dir).await?;
        log::info!(target: LOG_TARGET, "Using cache directory '{}'", cache_dir.display());

        let fetcher = Fetcher::new(
            Cache::new(cache_dir, args.ignore_cached),
            config.request_delay(),
            REQUESTS_PER_HOST,
        )?;

        let delay = if base.log_level == LogLevel::None {
            Duration::from_millis(300)
        } else {
            Duration::from_hours(365 * 24)
        };
        let use_colors = base.color.use_colors(|| {
            use std::io::{IsTerminal, stderr};
            stderr().is_terminal()
        });

        let stop = StopSignal::new(args.time_limit.map(Duration::from_secs));
        let ctrl_c = stop.listen_for_ctrl_c();

        Ok(Self {
            hosting: config.hosting_config(args.github_token.clone(), args.gitlab_token.clone()),
            config,
            fetcher,
            stop,
            progress: ProgressReporter::new(delay, use_colors),
            ctrl_c,
            _cache_lock: cache_lock,
        })
    }

    pub fn clients(&self) -> Result<Clients<'_>> {
        Clients::new(&self.fetcher, &self.hosting)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.progress.done();
        self.ctrl_c.abort();
        log::debug!(target: LOG_TARGET, "Issued {} network requests", self.fetcher.requests_issued());
    }
}

/// List failures on the error stream, grouped by kind.
pub fn report_failures<H: Host>(host: &mut H, failures: &[Failure]) {
    if failures.is_empty() {
        return;
    }

    let mut sorted: Vec<_> = failures.iter().collect();
    sorted.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.url.cmp(&b.url)));

    let mut err = host.error();
    let _ = writeln!(err, "\n{} target(s) could not be processed", failures.len());
    for failure in sorted {
        let _ = writeln!(err, "  {} '{}': {}", failure.kind, failure.url, failure.reason);
    }
}
