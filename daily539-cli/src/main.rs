mod display;
mod export;
mod settings;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use daily539_data::ingest::{load_history, IngestOutcome};
use daily539_engine::backtest::{backtest, backtest_parallel, BacktestRecord};
use daily539_engine::config::{save_config, AnalysisConfig};
use daily539_engine::recommend::recommend;
use daily539_engine::report::aggregate;
use daily539_engine::scoring::{score_with, ScoringStrategy};
use daily539_engine::sweep::{best_window, evaluate_window};

use crate::export::ExportFormat;
use crate::settings::{resolve_config, Overrides};

#[derive(Parser)]
#[command(name = "daily539", about = "Daily Cash 539 number scoring and backtesting")]
struct Cli {
    /// Draw history: CSV, or an .xlsx workbook, with a date column and five number columns
    #[arg(short, long, global = true, default_value = "data.csv")]
    file: PathBuf,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Summarize the source and list the latest draws
    History {
        /// Number of draws to show
        #[arg(short, long, default_value = "20")]
        last: usize,

        /// Also list rejected rows
        #[arg(long)]
        rejected: bool,
    },

    /// Score every number over the whole history
    Score {
        /// Skip the gap/confidence chart
        #[arg(long)]
        no_chart: bool,
    },

    /// Recommend the top-K numbers from the whole history
    Recommend,

    /// Replay the recommendation over past draws
    Backtest {
        /// Number of most recent predictions to list
        #[arg(short, long, default_value = "80")]
        detail: usize,

        /// Spread the replay over all cores
        #[arg(long)]
        parallel: bool,
    },

    /// Compare several backtest windows
    Sweep {
        /// Windows to compare (comma separated)
        #[arg(short, long, default_value = "10,20,30,40,50,60,80,100")]
        windows: String,
    },

    /// Write the ticket and the backtest detail
    Export {
        /// Output directory
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,

        /// File format of both exports
        #[arg(long, value_enum, default_value = "csv")]
        format: ExportFormat,
    },

    /// Write the default analysis configuration
    ConfigInit {
        /// Output file
        #[arg(short, long, default_value = "analysis.json")]
        output: PathBuf,
    },
}

/// Everything a command needs, resolved once.
struct Session {
    config: AnalysisConfig,
    strategy: Box<dyn ScoringStrategy>,
    outcome: IngestOutcome,
}

impl Session {
    fn open(file: &Path, overrides: &Overrides) -> Result<Self> {
        let config = resolve_config(overrides)?;
        let strategy = config.strategy.build()?;
        let outcome = load_history(file, config.min_history)
            .with_context(|| format!("Cannot load draw history from {}", file.display()))?;
        log::info!(
            "Loaded {} draws ({} rows rejected) from {}",
            outcome.history.len(),
            outcome.rejected.len(),
            file.display()
        );
        Ok(Self { config, strategy, outcome })
    }

    fn run_backtest(&self, parallel: bool) -> Result<Vec<BacktestRecord>> {
        let draws = self.outcome.history.as_slice();
        let records = if parallel {
            backtest_parallel(draws, self.config.backtest_window, self.strategy.as_ref(), self.config.top_k)?
        } else {
            backtest(draws, self.config.backtest_window, self.strategy.as_ref(), self.config.top_k)?
        };
        Ok(records)
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    // The only command that does not need draw data.
    if let Command::ConfigInit { output } = &cli.command {
        return cmd_config_init(output);
    }

    let session = Session::open(&cli.file, &cli.overrides)?;
    match cli.command {
        Command::History { last, rejected } => cmd_history(&session, &cli.file, last, rejected),
        Command::Score { no_chart } => cmd_score(&session, no_chart),
        Command::Recommend => cmd_recommend(&session),
        Command::Backtest { detail, parallel } => cmd_backtest(&session, detail, parallel),
        Command::Sweep { windows } => cmd_sweep(&session, &windows),
        Command::Export { out_dir, format } => cmd_export(&session, &out_dir, format),
        Command::ConfigInit { output } => cmd_config_init(&output),
    }
}

fn cmd_config_init(output: &Path) -> Result<()> {
    save_config(&AnalysisConfig::default(), output)?;
    println!("Default configuration written to {}", output.display());
    Ok(())
}

fn cmd_history(session: &Session, file: &Path, last: usize, rejected: bool) -> Result<()> {
    display::display_source_summary(file, &session.outcome, session.config.min_history);
    if rejected {
        display::display_rejections(&session.outcome);
    }
    display::display_draws(&session.outcome.history, last);
    Ok(())
}

fn cmd_score(session: &Session, no_chart: bool) -> Result<()> {
    let table = score_with(session.outcome.history.as_slice(), session.strategy.as_ref())?;
    display::display_score_table(&table, session.config.top_k);
    if !no_chart {
        display::display_score_chart(&table);
    }
    Ok(())
}

fn cmd_recommend(session: &Session) -> Result<()> {
    let table = score_with(session.outcome.history.as_slice(), session.strategy.as_ref())?;
    let rec = recommend(&table, session.config.top_k)?;
    display::display_recommendation(&rec, session.strategy.as_ref());
    println!("\nSame file in, same numbers out: no randomness is involved.");
    Ok(())
}

fn cmd_backtest(session: &Session, detail: usize, parallel: bool) -> Result<()> {
    let records = session.run_backtest(parallel)?;

    match aggregate(&records, session.config.roll_window)? {
        Some(summary) => {
            display::display_summary(&summary, session.config.backtest_window);
            display::display_rolling_chart(&summary);
            display::display_backtest_detail(&records, detail);
        }
        None => display::display_insufficient(
            session.outcome.history.len(),
            session.config.backtest_window,
        ),
    }
    Ok(())
}

fn parse_windows(windows: &str) -> Result<Vec<usize>> {
    windows
        .split(',')
        .map(|s| s.trim().parse::<usize>())
        .collect::<Result<_, _>>()
        .context("Invalid window list")
}

fn cmd_sweep(session: &Session, windows: &str) -> Result<()> {
    let windows = parse_windows(windows)?;
    let draws = session.outcome.history.as_slice();

    println!(
        "Backtesting {} windows over {} draws...",
        windows.len(),
        draws.len()
    );

    let pb = ProgressBar::new(windows.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );

    let mut results = Vec::with_capacity(windows.len());
    for &window in &windows {
        pb.set_message(format!("window={window}"));
        results.push(evaluate_window(
            draws,
            window,
            session.strategy.as_ref(),
            session.config.top_k,
            session.config.roll_window,
        )?);
        pb.inc(1);
    }
    pb.finish_with_message("done");

    let best = best_window(&results).map(|r| r.window);
    display::display_sweep(&results, best);
    Ok(())
}

fn cmd_export(session: &Session, out_dir: &Path, format: ExportFormat) -> Result<()> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Cannot create directory {:?}", out_dir))?;

    let history = &session.outcome.history;
    let table = score_with(history.as_slice(), session.strategy.as_ref())?;
    let rec = recommend(&table, session.config.top_k)?;
    let generated_at = chrono::Local::now().naive_local();

    let ticket_path = out_dir.join(format.file_name("ticket"));
    export::write_ticket(&ticket_path, format, &rec, history, session.strategy.as_ref(), generated_at)?;
    println!("Ticket written to {}", ticket_path.display());

    let records = session.run_backtest(false)?;
    if records.is_empty() {
        display::display_insufficient(history.len(), session.config.backtest_window);
        println!("Backtest detail not written.");
    } else {
        let backtest_path = out_dir.join(format.file_name("backtest"));
        export::write_backtest(&backtest_path, format, &records)?;
        println!("Backtest detail written to {}", backtest_path.display());
    }
    Ok(())
}
