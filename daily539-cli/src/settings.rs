use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};

use daily539_engine::config::{load_config, AnalysisConfig, StrategyConfig};
use daily539_engine::scoring::{GapWindowBonusScore, LinearWeightedScore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyKind {
    /// occurrences * freq_weight + gap * gap_weight
    Linear,
    /// occurrences * freq_weight + bonus when the gap is in [gap_min, gap_max]
    GapWindow,
}

/// Command line settings layered over the config file.
#[derive(Debug, Default, Args)]
pub struct Overrides {
    /// Analysis configuration (JSON), see `config-init`
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Scoring strategy
    #[arg(long, global = true)]
    pub strategy: Option<StrategyKind>,

    /// Weight of the occurrence count
    #[arg(long, global = true)]
    pub freq_weight: Option<f64>,

    /// Weight of the gap (linear strategy)
    #[arg(long, global = true)]
    pub gap_weight: Option<f64>,

    /// Numbers to recommend
    #[arg(short = 'k', long, global = true)]
    pub top_k: Option<usize>,

    /// Draws used for each backtest prediction
    #[arg(long, global = true)]
    pub window: Option<usize>,

    /// Rolling window for the hit-rate trend
    #[arg(long, global = true)]
    pub roll: Option<usize>,
}

pub fn resolve_config(overrides: &Overrides) -> Result<AnalysisConfig> {
    let mut config = match &overrides.config {
        Some(path) => load_config(path)
            .with_context(|| format!("Cannot load configuration {}", path.display()))?,
        None => AnalysisConfig::default(),
    };

    config.strategy = match (overrides.strategy, config.strategy) {
        (Some(StrategyKind::Linear), StrategyConfig::GapWindow(s)) => {
            StrategyConfig::Linear(LinearWeightedScore {
                freq_weight: s.freq_weight,
                ..LinearWeightedScore::default()
            })
        }
        (Some(StrategyKind::GapWindow), StrategyConfig::Linear(s)) => {
            StrategyConfig::GapWindow(GapWindowBonusScore {
                freq_weight: s.freq_weight,
                ..GapWindowBonusScore::default()
            })
        }
        (_, current) => current,
    };

    if let Some(w) = overrides.freq_weight {
        match &mut config.strategy {
            StrategyConfig::Linear(s) => s.freq_weight = w,
            StrategyConfig::GapWindow(s) => s.freq_weight = w,
        }
    }
    if let Some(w) = overrides.gap_weight {
        match &mut config.strategy {
            StrategyConfig::Linear(s) => s.gap_weight = w,
            StrategyConfig::GapWindow(_) => bail!("--gap-weight only applies to the linear strategy"),
        }
    }
    if let Some(k) = overrides.top_k {
        config.top_k = k;
    }
    if let Some(window) = overrides.window {
        config.backtest_window = window;
    }
    if let Some(roll) = overrides.roll {
        config.roll_window = roll;
    }

    config.validate()?;
    log::debug!("Resolved configuration: {:?}", config);
    Ok(config)
}
