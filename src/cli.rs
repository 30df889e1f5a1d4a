use clap::Parser;
use std::path::PathBuf;

/// system-setup - install build prerequisites for this host
#[derive(Parser, Debug)]
#[command(name = "system-setup")]
#[command(about = "Set up system for build.")]
#[command(version)]
pub struct Cli {
    /// No operation: resolve and print the plan without executing anything
    #[arg(short = 'n', long = "nop")]
    pub nop: bool,

    /// Record failures and keep going instead of stopping at the first one
    #[arg(long)]
    pub continue_on_error: bool,

    /// Per-action timeout in seconds
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// JSON setup file to use instead of the built-in policy
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write the effective setup file and exit
    #[arg(long, value_name = "FILE")]
    pub save_config: Option<PathBuf>,

    /// Python interpreter for pip installs
    #[arg(long, value_name = "PATH")]
    pub python: Option<String>,

    /// AUR helper used for packages marked from-aur
    #[arg(long, value_name = "NAME")]
    pub aur_helper: Option<String>,

    /// Never prefix package-manager commands with sudo
    #[arg(long)]
    pub no_sudo: bool,

    /// Skip the repository metadata refresh
    #[arg(long)]
    pub no_refresh: bool,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_no_args() {
        let cli = Cli::try_parse_from(["system-setup"]).unwrap();
        assert!(!cli.nop);
        assert!(!cli.continue_on_error);
        assert!(cli.config.is_none());
        assert!(cli.timeout.is_none());
    }

    #[test]
    fn test_cli_nop_short_and_long() {
        assert!(Cli::try_parse_from(["system-setup", "-n"]).unwrap().nop);
        assert!(Cli::try_parse_from(["system-setup", "--nop"]).unwrap().nop);
    }

    #[test]
    fn test_cli_config_and_overrides() {
        let cli = Cli::try_parse_from([
            "system-setup",
            "--config",
            "/path/to/setup.json",
            "--python",
            "python3.11",
            "--aur-helper",
            "paru",
            "--timeout",
            "900",
            "--continue-on-error",
        ])
        .unwrap();
        assert_eq!(cli.config.unwrap().to_str().unwrap(), "/path/to/setup.json");
        assert_eq!(cli.python.as_deref(), Some("python3.11"));
        assert_eq!(cli.aur_helper.as_deref(), Some("paru"));
        assert_eq!(cli.timeout, Some(900));
        assert!(cli.continue_on_error);
    }

    #[test]
    fn test_cli_rejects_zero_timeout() {
        assert!(Cli::try_parse_from(["system-setup", "--timeout", "0"]).is_err());
    }

    #[test]
    fn test_cli_rejects_unknown_flag() {
        assert!(Cli::try_parse_from(["system-setup", "--yes"]).is_err());
    }
}
