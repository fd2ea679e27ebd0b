use serde::{Deserialize, Serialize};

use super::{NumberStat, ScoringStrategy};
use crate::error::{invalid, Result};

/// Frequency score plus a flat bonus when the gap falls inside `[gap_min, gap_max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GapWindowBonusScore {
    pub freq_weight: f64,
    pub gap_min: u32,
    pub gap_max: u32,
    pub bonus: f64,
}

impl Default for GapWindowBonusScore {
    fn default() -> Self {
        Self {
            freq_weight: 10.0,
            gap_min: 7,
            gap_max: 12,
            bonus: 30.0,
        }
    }
}

impl ScoringStrategy for GapWindowBonusScore {
    fn name(&self) -> &str {
        "GapWindowBonus"
    }

    fn validate(&self) -> Result<()> {
        if !(self.freq_weight.is_finite() && self.freq_weight > 0.0) {
            return Err(invalid(format!("freq_weight must be positive, got {}", self.freq_weight)));
        }
        if !(self.bonus.is_finite() && self.bonus > 0.0) {
            return Err(invalid(format!("bonus must be positive, got {}", self.bonus)));
        }
        if self.gap_min > self.gap_max {
            return Err(invalid(format!(
                "gap window is empty: {} > {}",
                self.gap_min, self.gap_max
            )));
        }
        Ok(())
    }

    fn confidence(&self, stat: &NumberStat) -> f64 {
        let base = stat.occurrence_count as f64 * self.freq_weight;
        if (self.gap_min..=self.gap_max).contains(&stat.gap) {
            base + self.bonus
        } else {
            base
        }
    }

    fn params(&self) -> Vec<(String, f64)> {
        vec![
            ("freq_weight".to_string(), self.freq_weight),
            ("gap_min".to_string(), self.gap_min as f64),
            ("gap_max".to_string(), self.gap_max as f64),
            ("bonus".to_string(), self.bonus),
        ]
    }
}
