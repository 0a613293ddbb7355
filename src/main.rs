//! hoopsim-e2e: CLI entry point.
//!
//! Loads the simulation in a headless browser and validates its team stats.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use tracing::debug;

use hoopsim_e2e::config::HarnessConfig;
use hoopsim_e2e::environment::with_environment;
use hoopsim_e2e::pipeline::{self, RunOptions};
use hoopsim_e2e::ranges::{VerdictReport, CANONICAL_RANGES};
use hoopsim_e2e::report::render_failure;
use hoopsim_e2e::types::HarnessError;

/// Exit status when a statistic is out of range.
const EXIT_OUT_OF_RANGE: i32 = 1;
/// Exit status when the run could not complete.
const EXIT_HARNESS_ERROR: i32 = 2;

#[derive(Parser)]
#[command(name = "hoopsim-e2e")]
#[command(about = "E2E validation of simulated basketball team stats")]
#[command(version)]
struct Cli {
    /// Path to a YAML config file.
    #[arg(short, long, env = "HOOPSIM_CONFIG")]
    config: Option<PathBuf>,

    /// Entry document of the application [default: index.html].
    #[arg(short, long, env = "HOOPSIM_APP")]
    app: Option<PathBuf>,

    /// Browser executable (autodetected when unset).
    #[arg(long, env = "HOOPSIM_CHROME")]
    chrome: Option<PathBuf>,

    /// Number of games to simulate [default: 14].
    #[arg(short = 'n', long)]
    games: Option<u32>,

    /// Print the app's console output captured during the run.
    #[arg(long)]
    show_log: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging();

    let stdout = io::stdout();
    let mut out = stdout.lock();

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            let code = finish(&mut out, Err(e))?;
            out.flush()?;
            std::process::exit(code);
        }
    };
    debug!(?config, "resolved config");

    let options = RunOptions {
        num_games: config.num_games,
        settle: config.settle_delay(),
        show_log: cli.show_log,
    };

    let outcome = with_environment(&config, |env| {
        env.await_ready(config.ready_timeout())?;
        writeln!(out, "{} App loaded successfully", "✓".green())?;
        pipeline::run(env, &CANONICAL_RANGES, &options, &mut out)
    });

    let code = finish(&mut out, outcome)?;
    out.flush()?;
    if code != 0 {
        std::process::exit(code);
    }

    Ok(())
}

/// Writes the closing lines for a run and returns its exit status.
///
/// "Browser closed." follows every run that got as far as launching one.
fn finish(
    out: &mut impl Write,
    outcome: Result<VerdictReport, HarnessError>,
) -> io::Result<i32> {
    match outcome {
        Ok(verdict) => {
            writeln!(out)?;
            writeln!(out, "Browser closed.")?;
            Ok(if verdict.all_in_range {
                0
            } else {
                EXIT_OUT_OF_RANGE
            })
        }
        Err(e) => {
            render_failure(out, &e)?;
            if !e.is_launch() {
                writeln!(out)?;
                writeln!(out, "Browser closed.")?;
            }
            Ok(EXIT_HARNESS_ERROR)
        }
    }
}

/// Layers CLI flags and env vars over the config file over defaults.
fn resolve_config(cli: &Cli) -> Result<HarnessConfig, HarnessError> {
    let mut config = match cli.config {
        Some(ref path) => HarnessConfig::load(path)?,
        None => HarnessConfig::default(),
    };

    if let Some(ref app) = cli.app {
        config.app.clone_from(app);
    }
    if let Some(ref chrome) = cli.chrome {
        config.chrome = Some(chrome.clone());
    }
    if let Some(games) = cli.games {
        if games == 0 {
            return Err(HarnessError::Config("--games must be at least 1".to_string()));
        }
        config.num_games = games;
    }

    Ok(config)
}

/// Initialises the `tracing` subscriber on stderr.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hoopsim_e2e=warn"));

    if std::env::var("HOOPSIM_LOG_JSON").is_ok() {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(io::stderr)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(io::stderr)
            .init();
    }
}
