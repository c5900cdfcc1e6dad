//! CLI command definitions and subcommands

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// bgsort - watch a sort run on a background thread
#[derive(Parser)]
#[command(
    name = "bs",
    about = "Run a sort on a background thread and watch every exchange",
    version,
    after_help = "Logs are written to: ~/.local/share/bgsort/logs/bgsort.log (override with BGSORT_LOG_DIR)"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sort an array in the background and render each exchange
    Run(RunArgs),

    /// List available algorithms
    Algorithms,
}

/// Flags for `bs run`; unset values fall back to the `demo` config section
#[derive(Debug, Default, Args)]
pub struct RunArgs {
    /// Algorithm to inject (see `bs algorithms`)
    #[arg(short, long)]
    pub algorithm: Option<String>,

    /// Length of the generated array
    #[arg(short = 'n', long)]
    pub len: Option<usize>,

    /// Seed for the generated array
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Sort these values instead of a generated array
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub values: Option<Vec<i32>>,

    /// Pause after each exchange in milliseconds
    #[arg(short, long)]
    pub delay_ms: Option<u64>,

    /// Request cancellation after this many exchanges
    #[arg(long)]
    pub cancel_after: Option<usize>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Output format for run events
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_with_values() {
        let cli = Cli::try_parse_from(["bs", "run", "--values", "5,-3,4,1", "--format", "json"]).unwrap();
        match cli.command {
            Some(Command::Run(args)) => {
                assert_eq!(args.values, Some(vec![5, -3, 4, 1]));
                assert_eq!(args.format, OutputFormat::Json);
                assert!(args.cancel_after.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["bs", "algorithms", "--log-level", "debug"]).unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(matches!(cli.command, Some(Command::Algorithms)));
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("plain".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }
}
