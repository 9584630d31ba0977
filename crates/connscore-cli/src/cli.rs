//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use time::Date;

#[derive(Debug, Parser)]
#[command(name = "connscore")]
#[command(author, version, about = "Collect NYT Connections difficulty ratings", long_about = None)]
pub struct Cli {
    /// Total attempts for daily and single-date runs
    #[arg(long, global = true)]
    pub retries: Option<u32>,

    /// Seconds to wait between attempts
    #[arg(long, global = true, value_name = "SECS")]
    pub retry_delay: Option<u64>,

    /// Proxy URL for all requests (overrides APIFY_PROXY_PASSWORD)
    #[arg(long, global = true)]
    pub proxy: Option<String>,

    /// Fixed User-Agent instead of rotating browser agents
    #[arg(long, global = true)]
    pub user_agent: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Directory holding the CSV and JSON files
    #[arg(long, global = true, env = "CONNSCORE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Save pages that fail extraction as debug_<date>.html
    #[arg(long, global = true)]
    pub save_html: bool,

    /// Configuration file (default: <config dir>/connscore/config.toml)
    #[arg(long, global = true, env = "CONNSCORE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "debug")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Collect today's rating into the daily and history tables (default)
    Daily,

    /// Collect the rating for one date into the history table
    Date {
        /// Puzzle date (YYYY-MM-DD)
        #[arg(value_parser = parse_date_arg)]
        date: Date,
    },

    /// Backfill a range of dates
    Historical(HistoricalArgs),

    /// Rebuild every JSON file from the history table
    GenerateJson,

    /// Add day and month columns to legacy tables, then rebuild JSON
    Migrate,
}

#[derive(Debug, Clone, Args)]
pub struct HistoricalArgs {
    /// First date to collect (default: 2023-06-12)
    #[arg(long, value_parser = parse_date_arg)]
    pub start_date: Option<Date>,

    /// Last date to collect (default: today)
    #[arg(long, value_parser = parse_date_arg)]
    pub end_date: Option<Date>,

    /// Base delay between requests in seconds
    #[arg(long, value_name = "SECS")]
    pub delay: Option<f64>,

    /// Disable random jitter on the delay
    #[arg(long)]
    pub no_jitter: bool,

    /// Requests per batch before a cooldown
    #[arg(long)]
    pub batch_size: Option<u32>,

    /// Seconds to pause after each batch
    #[arg(long, value_name = "SECS")]
    pub cooldown: Option<u64>,

    /// Request dates that are already stored
    #[arg(long)]
    pub refetch: bool,
}

fn parse_date_arg(s: &str) -> Result<Date, String> {
    connscore_types::parse_date(s).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use time::macros::date;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_parses() {
        let cli = Cli::try_parse_from(["connscore"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_date_subcommand() {
        let cli = Cli::try_parse_from(["connscore", "date", "2024-01-05"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Date { date }) if date == date!(2024 - 01 - 05)));
    }

    #[test]
    fn test_invalid_date_rejected() {
        assert!(Cli::try_parse_from(["connscore", "date", "2023-02-30"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "connscore",
            "historical",
            "--start-date",
            "2024-01-01",
            "--no-jitter",
            "--retries",
            "3",
            "--save-html",
        ])
        .unwrap();
        assert_eq!(cli.retries, Some(3));
        assert!(cli.save_html);
        let Some(Command::Historical(args)) = cli.command else {
            panic!("expected historical");
        };
        assert_eq!(args.start_date, Some(date!(2024 - 01 - 01)));
        assert!(args.no_jitter);
        assert!(!args.refetch);
    }

    #[test]
    fn test_quiet_conflicts_with_debug() {
        assert!(Cli::try_parse_from(["connscore", "-q", "--debug"]).is_err());
    }
}
