use std::{env, time::Duration};

use clap::{Args, Parser};
use tracing_subscriber::EnvFilter;

use crate::{
    clicker::{ClickSettings, DEFAULT_CPS, DEFAULT_WORKERS},
    key::ToggleKey,
    random::DEFAULT_SEED_URL,
};

/// Highest clicks-per-second a single worker may be asked for.
const MAX_CPS: f64 = 1000.0;

/// Jittered autoclicker with a global toggle key.
#[derive(Debug, Clone, Parser)]
#[command(name = "simpleclick", version, about)]
pub struct Cli {
    /// Key that toggles clicking (a character, F1-F12, space, esc, ...)
    #[arg(long, default_value = "f8")]
    pub key: ToggleKey,

    /// Click workers started on every enable
    #[arg(long, default_value_t = DEFAULT_WORKERS, value_parser = parse_workers)]
    pub workers: usize,

    /// Target clicks per second for each worker, before jitter
    #[arg(long, default_value_t = DEFAULT_CPS, value_parser = parse_cps)]
    pub cps: f64,

    /// Fixed jitter seed; skips the seed service entirely
    #[arg(long)]
    pub seed: Option<u64>,

    /// Random-integer service queried for the seed
    #[arg(long, default_value = DEFAULT_SEED_URL)]
    pub seed_url: String,

    /// Give up on the seed service after this many milliseconds
    #[arg(long, default_value_t = 3000)]
    pub seed_timeout_ms: u64,

    #[command(flatten)]
    pub log: LogArgs,
}

impl Cli {
    pub fn click_settings(&self) -> ClickSettings {
        ClickSettings::new(self.workers, self.cps)
    }

    pub fn seed_timeout(&self) -> Duration {
        Duration::from_millis(self.seed_timeout_ms)
    }
}

fn parse_workers(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("at least one worker is required".into()),
        Ok(n) => Ok(n),
        Err(err) => Err(err.to_string()),
    }
}

fn parse_cps(s: &str) -> Result<f64, String> {
    let cps: f64 = s.parse().map_err(|err| format!("{err}"))?;
    if cps.is_finite() && cps > 0.0 && cps <= MAX_CPS {
        Ok(cps)
    } else {
        Err(format!("expected a rate in (0, {MAX_CPS}]"))
    }
}

/// Logging controls.
#[derive(Debug, Clone, Default, Args)]
pub struct LogArgs {
    /// Log everything from this app at trace level
    #[arg(long, conflicts_with_all = ["debug", "log_level", "log_filter"])]
    pub trace: bool,

    /// Log everything from this app at debug level
    #[arg(long, conflicts_with_all = ["trace", "log_level", "log_filter"])]
    pub debug: bool,

    /// Single level for this app (error|warn|info|debug|trace)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Raw tracing filter directive, e.g. "simpleclick=debug"
    #[arg(long)]
    pub log_filter: Option<String>,
}

impl LogArgs {
    /// Filter directive, by precedence: `--log-filter`, `--trace`/`--debug`,
    /// `--log-level`, `RUST_LOG`, then `info` for this crate.
    pub fn filter_spec(&self) -> String {
        if let Some(spec) = &self.log_filter {
            return spec.clone();
        }
        if self.trace {
            return level_spec("trace");
        }
        if self.debug {
            return level_spec("debug");
        }
        if let Some(level) = &self.log_level {
            return level_spec(level);
        }
        env::var("RUST_LOG").unwrap_or_else(|_| level_spec("info"))
    }
}

fn level_spec(level: &str) -> String {
    format!("{}={}", env!("CARGO_CRATE_NAME"), level.to_ascii_lowercase())
}

pub fn init_logging(args: &LogArgs) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(args.filter_spec()))
        .with_thread_names(true)
        .init();
}
