use chrono::NaiveDate;
use daily539_data::models::{Draw, PICK_COUNT};
use rayon::prelude::*;
use serde::Serialize;

use crate::error::{invalid, Result};
use crate::recommend::{recommend, validate_k};
use crate::scoring::{score_with, ScoringStrategy};

/// Prediction for draw `index`, made from `draws[window_start..window_end]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestRecord {
    pub index: usize,
    pub date: Option<NaiveDate>,
    pub window_start: usize,
    pub window_end: usize,
    pub predicted: Vec<u8>,
    pub actual: [u8; PICK_COUNT],
    pub hit_count: usize,
    pub hit_at_least_2: bool,
    pub hit_at_least_3: bool,
}

fn validate_params(window: usize, strategy: &dyn ScoringStrategy, k: usize) -> Result<()> {
    if window == 0 {
        return Err(invalid("backtest window must be at least 1"));
    }
    validate_k(k)?;
    strategy.validate()
}

fn evaluate_index(
    draws: &[Draw],
    index: usize,
    window: usize,
    strategy: &dyn ScoringStrategy,
    k: usize,
) -> Result<BacktestRecord> {
    let window_start = index - window;
    let past = &draws[window_start..index];
    let table = score_with(past, strategy)?;
    let predicted = recommend(&table, k)?.numbers();

    let actual = &draws[index];
    let hit_count = actual.matches(&predicted);

    Ok(BacktestRecord {
        index,
        date: actual.date,
        window_start,
        window_end: index,
        predicted,
        actual: *actual.numbers(),
        hit_count,
        hit_at_least_2: hit_count >= 2,
        hit_at_least_3: hit_count >= 3,
    })
}

/// Replays score + recommend for every draw that has `window` draws before it.
/// `draws` is oldest first. Returns an empty vector when `draws.len() <= window`.
pub fn backtest(
    draws: &[Draw],
    window: usize,
    strategy: &dyn ScoringStrategy,
    k: usize,
) -> Result<Vec<BacktestRecord>> {
    validate_params(window, strategy, k)?;
    if draws.len() <= window {
        log::debug!("Backtest skipped: {} draws for a window of {}", draws.len(), window);
        return Ok(Vec::new());
    }

    let records = (window..draws.len())
        .map(|i| evaluate_index(draws, i, window, strategy, k))
        .collect::<Result<Vec<_>>>()?;

    log::debug!("Backtest window={} k={}: {} records", window, k, records.len());
    Ok(records)
}

/// Same output as [`backtest`], with the per-index loop spread over the rayon pool.
pub fn backtest_parallel(
    draws: &[Draw],
    window: usize,
    strategy: &dyn ScoringStrategy,
    k: usize,
) -> Result<Vec<BacktestRecord>> {
    validate_params(window, strategy, k)?;
    if draws.len() <= window {
        log::debug!("Backtest skipped: {} draws for a window of {}", draws.len(), window);
        return Ok(Vec::new());
    }

    // Indexed collect keeps ascending index order.
    let records = (window..draws.len())
        .into_par_iter()
        .map(|i| evaluate_index(draws, i, window, strategy, k))
        .collect::<Result<Vec<_>>>()?;

    log::debug!("Parallel backtest window={} k={}: {} records", window, k, records.len());
    Ok(records)
}
