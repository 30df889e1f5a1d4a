//! system-setup - main entry point
//!
//! Detects the host, resolves the setup plan and runs it once.
//!
//! Exit codes: 0 when every action is ok or skipped, 1 when any action
//! failed, 2 when the host or the setup file could not be used at all.

use anyhow::Context;
use std::process::ExitCode;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use sysprep::cli::Cli;
use sysprep::registry::is_unmatched_host;
use sysprep::{policy, report, sanity, Executor, SetupConfig, SystemRunner};

/// Exit status for detection and configuration errors
const EXIT_FATAL: u8 = 2;

/// Initialize the logger with appropriate settings
fn init_logger(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    // RUST_LOG overrides the flag
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Main application entry point
fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_logger(cli.verbose);
    debug!("CLI arguments parsed: {:?}", cli);

    match run(&cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("✗ {:#}", e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

/// Built-in policy or setup file, with command-line overrides applied
fn load_config(cli: &Cli) -> anyhow::Result<SetupConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            info!("Loading setup file: {:?}", path);
            SetupConfig::load_from_file(path)?
        }
        None => {
            debug!("Using built-in setup policy");
            policy::default_config()
        }
    };

    if let Some(python) = &cli.python {
        config.python = python.clone();
    }
    if let Some(helper) = &cli.aur_helper {
        config.aur_helper = helper.clone();
    }
    if let Some(secs) = cli.timeout {
        config.timeout_secs = Some(secs);
    }
    if cli.continue_on_error {
        config.continue_on_error = true;
    }
    if cli.no_refresh {
        config.refresh = false;
    }

    config.validate().context("Invalid setup file")?;
    Ok(config)
}

fn run(cli: &Cli) -> anyhow::Result<u8> {
    let config = load_config(cli)?;

    if let Some(path) = &cli.save_config {
        config.save_to_file(path)?;
        println!("✓ Setup file written to {}", path.display());
        return Ok(0);
    }

    let platform = sysprep::detect().context("Cannot determine host platform")?;

    let phases = config.to_registry().phases_for(&platform);
    if is_unmatched_host(&phases, &platform) {
        warn!(
            "No setup phase matches {}; only common phases will run",
            platform
        );
    }

    let translator = config
        .translator()
        .probe_host(!cli.no_sudo)
        .with_dry_run(cli.nop);

    if cli.nop {
        println!("{}", report::render_plan(&phases, &platform));
    } else {
        let preflight = sanity::preflight(&phases, &platform, &translator);
        if !preflight.is_ok() {
            warn!(
                "Missing binaries: {}",
                preflight.missing_binaries.join(", ")
            );
        }
    }

    let mut executor = Executor::new(SystemRunner::new(), translator, config.executor_options());
    let outcome = executor.execute(&phases, &platform);

    if outcome.halted {
        if let Some(failure) = outcome.first_failure() {
            eprintln!("{}", report::render_failure(failure));
        }
    }

    if cli.nop || config.continue_on_error {
        println!("{}", report::render_summary(&outcome));
    } else if !outcome.has_failures() {
        println!("✓ System setup complete for {}", platform);
    }

    Ok(outcome.exit_code() as u8)
}
