pub mod gap_window;
pub mod linear;

use daily539_data::models::{Draw, POOL_SIZE};
use serde::Serialize;

use crate::error::{EngineError, Result};

pub use gap_window::GapWindowBonusScore;
pub use linear::LinearWeightedScore;

/// Per-number statistics over a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NumberStat {
    pub number: u8,
    /// Draws in the window containing the number.
    pub occurrence_count: u32,
    /// Draws newer than the most recent one containing the number;
    /// the window length when the number never appears.
    pub gap: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreEntry {
    #[serde(flatten)]
    pub stat: NumberStat,
    pub confidence: f64,
}

/// One entry per number 1..=39, indexed by `number - 1`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreTable {
    pub strategy: String,
    pub window_len: usize,
    entries: Vec<ScoreEntry>,
}

impl ScoreTable {
    pub fn entries(&self) -> &[ScoreEntry] {
        &self.entries
    }

    pub fn get(&self, number: u8) -> Option<&ScoreEntry> {
        (number as usize)
            .checked_sub(1)
            .and_then(|idx| self.entries.get(idx))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub trait ScoringStrategy: Send + Sync {
    fn name(&self) -> &str;
    /// `InvalidArgument` when the parameters cannot produce a meaningful score.
    fn validate(&self) -> Result<()>;
    fn confidence(&self, stat: &NumberStat) -> f64;
    fn params(&self) -> Vec<(String, f64)>;
}

/// `draws` is oldest first; the scan for gaps runs from the newest draw backward.
pub fn compute_stats(draws: &[Draw]) -> Vec<NumberStat> {
    let window_len = draws.len() as u32;
    let mut stats: Vec<NumberStat> = (1..=POOL_SIZE as u8)
        .map(|n| NumberStat {
            number: n,
            occurrence_count: 0,
            gap: window_len,
        })
        .collect();

    for (age, draw) in draws.iter().rev().enumerate() {
        for &n in draw.numbers() {
            let stat = &mut stats[(n - 1) as usize];
            stat.occurrence_count += 1;
            if stat.occurrence_count == 1 {
                stat.gap = age as u32;
            }
        }
    }

    stats
}

/// Linear frequency + gap score with the given weights.
pub fn score(draws: &[Draw], weights: &LinearWeightedScore) -> Result<ScoreTable> {
    score_with(draws, weights)
}

pub fn score_with(draws: &[Draw], strategy: &dyn ScoringStrategy) -> Result<ScoreTable> {
    strategy.validate()?;
    if draws.is_empty() {
        return Err(EngineError::InvalidHistory);
    }

    let entries: Vec<ScoreEntry> = compute_stats(draws)
        .into_iter()
        .map(|stat| ScoreEntry {
            confidence: strategy.confidence(&stat),
            stat,
        })
        .collect();

    log::debug!("Scored {} draws with {}", draws.len(), strategy.name());

    Ok(ScoreTable {
        strategy: strategy.name().to_string(),
        window_len: draws.len(),
        entries,
    })
}
