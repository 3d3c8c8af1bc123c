//! CLI definitions for tendies.
//!
//! Uses clap for argument parsing with derive macros.

use crate::model::TimeFilter;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// tendies - ticker mention tracker for r/wallstreetbets
#[derive(Parser, Debug)]
#[command(name = "tendies")]
#[command(version)]
#[command(about = "Collect ticker mentions from r/wallstreetbets and chart them")]
#[command(long_about = r#"
tendies fetches posts from r/wallstreetbets, extracts stock tickers, merges
them into a curated table per category and renders interactive charts into
an HTML page.

Categories:
  stock-ticker       hot, top, new and controversial listings
  due-diligence      posts flaired DD
  daily-discussion   every comment of the daily discussion threads

Quick start:
  1. Put client_id, client_secret, refresh_token and user_agent in credentials.json
  2. Download nyse-listed.csv and nasdaq-listed.csv
  3. Run: tendies run --all
"#)]
pub struct Cli {
    /// Path to a config file
    #[arg(long, short = 'c', env = "TENDIES_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output folder for curated, raw and chart files
    #[arg(long, short = 'o', global = true)]
    pub output: Option<PathBuf>,

    /// Be verbose (show debug info)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Be quiet (suppress non-error output)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch, extract, merge and chart the selected categories
    Run(RunArgs),

    /// Redraw charts from the curated tables without fetching
    Chart(CategoryArgs),

    /// Render the HTML page from existing charts
    Html,

    /// Clean ticker lists of the curated tables in place
    Clean(CategoryArgs),

    /// Show or manage configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Category selection shared by every command that works per category.
#[derive(Args, Debug, Clone, Default)]
pub struct CategoryArgs {
    /// Due diligence posts
    #[arg(long, short = 'd')]
    pub due_diligence: bool,

    /// Daily discussion thread comments
    #[arg(long, short = 'D')]
    pub daily_discussion: bool,

    /// Hot, top, new and controversial listings
    #[arg(long, short = 's')]
    pub stock_ticker: bool,

    /// Every category
    #[arg(long, short = 'a')]
    pub all: bool,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Credentials JSON with client_id, client_secret, refresh_token, user_agent
    #[arg(long, env = "TENDIES_CREDENTIALS")]
    pub credentials: Option<PathBuf>,

    /// Time window for searches and windowed listings
    #[arg(long, short = 't', value_enum)]
    pub timefilter: Option<TimeFilter>,

    /// Maximum submissions per fetch (unbounded if omitted)
    #[arg(long, short = 'l')]
    pub limit: Option<usize>,

    /// Skip rendering the HTML page
    #[arg(long)]
    pub no_html: bool,

    #[command(flatten)]
    pub categories: CategoryArgs,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Show the effective configuration
    #[arg(long)]
    pub show: bool,

    /// Write a default config file to the user config path
    #[arg(long)]
    pub init: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_flags_parse() {
        let cli = Cli::try_parse_from([
            "tendies",
            "run",
            "--due-diligence",
            "-t",
            "week",
            "--limit",
            "50",
            "-o",
            "/tmp/out",
        ])
        .unwrap();

        assert_eq!(cli.output, Some(PathBuf::from("/tmp/out")));
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert!(args.categories.due_diligence);
        assert!(!args.categories.all);
        assert_eq!(args.timefilter, Some(TimeFilter::Week));
        assert_eq!(args.limit, Some(50));
    }

    #[test]
    fn unknown_timefilter_is_rejected() {
        assert!(Cli::try_parse_from(["tendies", "run", "--all", "-t", "decade"]).is_err());
    }
}
