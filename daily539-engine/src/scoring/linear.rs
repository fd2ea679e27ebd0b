use serde::{Deserialize, Serialize};

use super::{NumberStat, ScoringStrategy};
use crate::error::{invalid, Result};

/// `occurrence_count * freq_weight + gap * gap_weight`: rewards numbers that come up
/// often as well as numbers that have been absent for a while.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearWeightedScore {
    pub freq_weight: f64,
    pub gap_weight: f64,
}

impl LinearWeightedScore {
    pub fn new(freq_weight: f64, gap_weight: f64) -> Result<Self> {
        let weights = Self { freq_weight, gap_weight };
        weights.validate()?;
        Ok(weights)
    }
}

impl Default for LinearWeightedScore {
    fn default() -> Self {
        Self {
            freq_weight: 10.0,
            gap_weight: 3.0,
        }
    }
}

impl ScoringStrategy for LinearWeightedScore {
    fn name(&self) -> &str {
        "LinearWeighted"
    }

    fn validate(&self) -> Result<()> {
        if !(self.freq_weight.is_finite() && self.freq_weight > 0.0) {
            return Err(invalid(format!("freq_weight must be positive, got {}", self.freq_weight)));
        }
        if !(self.gap_weight.is_finite() && self.gap_weight > 0.0) {
            return Err(invalid(format!("gap_weight must be positive, got {}", self.gap_weight)));
        }
        Ok(())
    }

    fn confidence(&self, stat: &NumberStat) -> f64 {
        stat.occurrence_count as f64 * self.freq_weight + stat.gap as f64 * self.gap_weight
    }

    fn params(&self) -> Vec<(String, f64)> {
        vec![
            ("freq_weight".to_string(), self.freq_weight),
            ("gap_weight".to_string(), self.gap_weight),
        ]
    }
}
