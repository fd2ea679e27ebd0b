use daily539_data::models::POOL_SIZE;
use serde::Serialize;

use crate::error::{invalid, Result};
use crate::scoring::{ScoreEntry, ScoreTable};

/// Top-K numbers, best first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub picks: Vec<ScoreEntry>,
}

impl Recommendation {
    pub fn numbers(&self) -> Vec<u8> {
        self.picks.iter().map(|e| e.stat.number).collect()
    }

    /// Ascending, the order used on a ticket.
    pub fn sorted_numbers(&self) -> Vec<u8> {
        let mut numbers = self.numbers();
        numbers.sort_unstable();
        numbers
    }

    pub fn len(&self) -> usize {
        self.picks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.picks.is_empty()
    }
}

/// Entries by confidence descending; equal scores go to the lower number first.
pub fn rank(table: &ScoreTable) -> Vec<&ScoreEntry> {
    let mut ranked: Vec<&ScoreEntry> = table.entries().iter().collect();
    ranked.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a.stat.number.cmp(&b.stat.number))
    });
    ranked
}

pub fn validate_k(k: usize) -> Result<()> {
    if k == 0 || k > POOL_SIZE {
        return Err(invalid(format!("k must be in 1..={POOL_SIZE}, got {k}")));
    }
    Ok(())
}

pub fn recommend(table: &ScoreTable, k: usize) -> Result<Recommendation> {
    validate_k(k)?;
    let picks = rank(table).into_iter().take(k).cloned().collect();
    Ok(Recommendation { picks })
}
