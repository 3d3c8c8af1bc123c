//! tendies - ticker mention tracker
//!
//! Main entry point for the tendies command-line tool.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::process::ExitCode;
use tracing::{debug, warn};

use tendies::logging::init_cli_logging;
use tendies::pipeline::Pipeline;
use tendies::*;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let colors = Config::colors_enabled();
    if !colors {
        colored::control::set_override(false);
    }
    init_cli_logging(cli.quiet, cli.verbose, colors);

    let outcome = match &cli.command {
        Commands::Run(args) => cmd_run(&cli, args),
        Commands::Chart(args) => cmd_chart(&cli, args),
        Commands::Html => cmd_html(&cli),
        Commands::Clean(args) => cmd_clean(&cli, args),
        Commands::Config(args) => cmd_config(&cli, args),
        Commands::Completions(args) => cmd_completions(args),
    };

    match outcome {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{}", render_error(&err));
            ExitCode::FAILURE
        }
    }
}

fn render_error(err: &anyhow::Error) -> String {
    err.downcast_ref::<TendiesError>().map_or_else(
        || format_error("Run failed", &format!("{err:#}"), None),
        format_tendies_error,
    )
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(output) = &cli.output {
        config.paths.output.clone_from(output);
    }
    debug!(output = %config.paths.output.display(), "Effective output folder");
    Ok(config)
}

fn selected(args: &CategoryArgs) -> Result<Vec<Category>> {
    Ok(select_categories(
        args.all,
        args.stock_ticker,
        args.due_diligence,
        args.daily_discussion,
    )?)
}

fn progress_bar(len: usize, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:30.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );
    pb
}

fn print_report(pb: &ProgressBar, report: &CategoryReport) {
    let top = format_top_tickers(&report.tickers, 5);
    let line = format!(
        "  {} {:<16} {} fetched, {} curated, {} mentions{}",
        "✓".green(),
        report.category.to_string().bold(),
        format_number(report.fetched),
        format_number(report.curated),
        format_number(report.mentions),
        if top.is_empty() {
            String::new()
        } else {
            format!("  {}", top.dimmed())
        }
    );
    // ProgressBar::println is a no-op on a hidden bar
    pb.suspend(|| println!("{line}"));
}

fn print_failure(pb: &ProgressBar, category: Category, err: &TendiesError) {
    pb.suspend(|| eprintln!("  {} {:<16} {}", "✗".red(), category.to_string().bold(), err));
}

/// Run `step` for every category, reporting each outcome. Returns the failure count.
fn for_each_category<F>(categories: &[Category], quiet: bool, mut step: F) -> usize
where
    F: FnMut(Category) -> tendies::Result<CategoryReport>,
{
    let pb = progress_bar(categories.len(), quiet);
    let mut failures = 0;

    for &category in categories {
        pb.set_message(format!("{category}..."));
        match step(category) {
            Ok(report) => print_report(&pb, &report),
            Err(err) => {
                failures += 1;
                print_failure(&pb, category, &err);
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    failures
}

fn finish(failures: usize, total: usize, quiet: bool) -> ExitCode {
    if failures == 0 {
        if !quiet {
            println!("{}", "Done.".bold().green());
        }
        ExitCode::SUCCESS
    } else {
        eprintln!(
            "{}",
            format!("{failures} of {total} categories failed.").bold().red()
        );
        ExitCode::FAILURE
    }
}

fn render_html(config: &Config, quiet: bool) -> Result<()> {
    let page = html::render_page(config, Utc::now())?;
    if !quiet {
        println!("  {} {}", "✓".green(), page.display());
    }
    Ok(())
}

fn cmd_run(cli: &Cli, args: &RunArgs) -> Result<ExitCode> {
    let categories = selected(&args.categories)?;
    let config = load_config(cli)?;

    // Everything that can be checked offline is checked before connecting.
    let dictionary = TickerDictionary::load(&config)?;
    let credentials_path = args
        .credentials
        .clone()
        .unwrap_or_else(|| config.paths.credentials.clone());
    let credentials = Credentials::load(&credentials_path)?;

    if !cli.quiet {
        println!("{}", "Collecting ticker mentions...".bold().cyan());
        println!("  Subreddit: r/{}", config.forum.subreddit);
        println!("  Output: {}", config.paths.output.display());
        println!();
    }

    let client = RedditClient::connect(&credentials, &config.forum)?;
    let pipeline = Pipeline::new(&config, &dictionary);
    let options = RunOptions {
        time_filter: args.timefilter,
        limit: args.limit,
    };
    let fetched_at = Utc::now();

    let failures = for_each_category(&categories, cli.quiet, |category| {
        pipeline.run_category(&client, category, options, fetched_at)
    });

    if args.no_html {
        debug!("Skipping HTML page");
    } else {
        render_html(&config, cli.quiet)?;
    }

    Ok(finish(failures, categories.len(), cli.quiet))
}

fn cmd_chart(cli: &Cli, args: &CategoryArgs) -> Result<ExitCode> {
    let categories = selected(args)?;
    let config = load_config(cli)?;
    let dictionary = TickerDictionary::load(&config)?;
    let pipeline = Pipeline::new(&config, &dictionary);

    let failures = for_each_category(&categories, cli.quiet, |category| {
        pipeline.rechart(category)
    });
    render_html(&config, cli.quiet)?;

    Ok(finish(failures, categories.len(), cli.quiet))
}

fn cmd_html(cli: &Cli) -> Result<ExitCode> {
    let config = load_config(cli)?;
    render_html(&config, cli.quiet)?;
    Ok(ExitCode::SUCCESS)
}

fn cmd_clean(cli: &Cli, args: &CategoryArgs) -> Result<ExitCode> {
    let categories = selected(args)?;
    let config = load_config(cli)?;
    let dictionary = TickerDictionary::load(&config)?;
    let pipeline = Pipeline::new(&config, &dictionary);

    let mut failures = 0;
    for category in &categories {
        match pipeline.clean_category(*category) {
            Ok(rows) => {
                if !cli.quiet {
                    println!(
                        "  {} {:<16} {} rows",
                        "✓".green(),
                        category.to_string().bold(),
                        format_number(rows)
                    );
                }
            }
            Err(err) => {
                failures += 1;
                eprintln!("  {} {:<16} {}", "✗".red(), category.to_string().bold(), err);
            }
        }
    }

    Ok(finish(failures, categories.len(), cli.quiet))
}

fn cmd_config(cli: &Cli, args: &ConfigArgs) -> Result<ExitCode> {
    if args.init {
        let path = Config::user_config_path().context("no user config folder on this system")?;
        if path.exists() {
            warn!(path = %path.display(), "Config file already exists, leaving it alone");
            println!("Config already exists at {}", path.display().to_string().yellow());
        } else {
            Config::default().save(&path)?;
            println!("{} {}", "Wrote".green(), path.display());
        }
        return Ok(ExitCode::SUCCESS);
    }

    let config = load_config(cli)?;
    if args.show {
        print!("{}", config.to_toml());
    } else {
        println!("{}", "Current Configuration".bold().cyan());
        println!("{}", "─".repeat(DIVIDER_WIDTH));
        match Config::user_config_path() {
            Some(path) if path.exists() => println!("  Config file: {}", path.display()),
            _ => println!("  Config file: {}", "(defaults)".dimmed()),
        }
        println!("  Output:      {}", config.paths.output.display());
        println!("  Credentials: {}", config.paths.credentials.display());
        println!("  Subreddit:   r/{}", config.forum.subreddit);
        println!("  Blocklist:   {} words", config.tickers.blocklist.len());
        println!("{}", "─".repeat(DIVIDER_WIDTH));
        println!("Run {} for the full file.", "tendies config --show".bold());
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_completions(args: &CompletionsArgs) -> Result<ExitCode> {
    let mut cmd = Cli::command();
    generate(args.shell, &mut cmd, "tendies", &mut io::stdout());
    Ok(ExitCode::SUCCESS)
}
