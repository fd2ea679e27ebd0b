use daily539_data::models::Draw;
use serde::Serialize;

use crate::backtest::backtest;
use crate::error::Result;
use crate::report::{aggregate, Summary};
use crate::scoring::ScoringStrategy;

/// Backtest outcome for one window length. `summary` is `None` when the history
/// is too short for that window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowResult {
    pub window: usize,
    pub summary: Option<Summary>,
}

pub fn evaluate_window(
    draws: &[Draw],
    window: usize,
    strategy: &dyn ScoringStrategy,
    k: usize,
    roll_window: usize,
) -> Result<WindowResult> {
    let records = backtest(draws, window, strategy, k)?;
    let summary = aggregate(&records, roll_window)?;
    Ok(WindowResult { window, summary })
}

pub fn sweep(
    draws: &[Draw],
    windows: &[usize],
    strategy: &dyn ScoringStrategy,
    k: usize,
    roll_window: usize,
) -> Result<Vec<WindowResult>> {
    windows
        .iter()
        .map(|&w| evaluate_window(draws, w, strategy, k, roll_window))
        .collect()
}

/// Window with the highest ≥2 hit rate; ties keep the earliest.
pub fn best_window(results: &[WindowResult]) -> Option<&WindowResult> {
    results
        .iter()
        .filter_map(|r| r.summary.as_ref().map(|s| (r, s.at_least_rates[1])))
        .fold(None, |best: Option<(&WindowResult, f64)>, (r, rate)| match best {
            Some((_, best_rate)) if best_rate >= rate => best,
            _ => Some((r, rate)),
        })
        .map(|(r, _)| r)
}
