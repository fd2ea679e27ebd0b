//! Backtest summary metrics and rolling hit-rate trends.

use chrono::NaiveDate;
use daily539_data::models::{PICK_COUNT, POOL_SIZE};
use serde::Serialize;

use crate::backtest::BacktestRecord;
use crate::error::{invalid, Result};

/// Trailing mean of the ≥2 / ≥3 hit flags ending at `index`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollingPoint {
    pub index: usize,
    pub date: Option<NaiveDate>,
    pub at_least_2: Option<f64>,
    pub at_least_3: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub records: usize,
    pub top_k: usize,
    pub mean_hit_count: f64,
    /// Fractions of records with at least 1, 2 and 3 hits.
    pub at_least_rates: [f64; 3],
    /// Number of records per hit count 0..=5.
    pub hit_distribution: [usize; PICK_COUNT + 1],
    /// Mean hits for k numbers picked uniformly at random.
    pub expected_random_hits: f64,
    pub roll_window: usize,
    pub min_samples: usize,
    pub rolling: Vec<RollingPoint>,
}

impl Summary {
    /// `n` in 1..=3.
    pub fn hit_rate_at_least(&self, n: usize) -> Option<f64> {
        n.checked_sub(1).and_then(|i| self.at_least_rates.get(i).copied())
    }
}

/// Samples needed before a rolling value is reported: `max(5, roll_window / 3)`,
/// clamped to `roll_window` so that windows shorter than 5 still report.
pub fn min_samples(roll_window: usize) -> usize {
    (roll_window / 3).max(5).min(roll_window)
}

pub fn expected_random_hits(k: usize) -> f64 {
    k as f64 * PICK_COUNT as f64 / POOL_SIZE as f64
}

/// `Ok(None)` when there is nothing to summarize.
pub fn aggregate(records: &[BacktestRecord], roll_window: usize) -> Result<Option<Summary>> {
    if roll_window == 0 {
        return Err(invalid("roll window must be at least 1"));
    }
    if records.is_empty() {
        return Ok(None);
    }

    let n = records.len() as f64;
    let top_k = records[0].predicted.len();

    let mean_hit_count = records.iter().map(|r| r.hit_count as f64).sum::<f64>() / n;

    let mut at_least_rates = [0.0f64; 3];
    for (i, rate) in at_least_rates.iter_mut().enumerate() {
        let threshold = i + 1;
        *rate = records.iter().filter(|r| r.hit_count >= threshold).count() as f64 / n;
    }

    let mut hit_distribution = [0usize; PICK_COUNT + 1];
    for r in records {
        hit_distribution[r.hit_count.min(PICK_COUNT)] += 1;
    }

    let floor = min_samples(roll_window);
    let rolling = rolling_rates(records, roll_window, floor);

    Ok(Some(Summary {
        records: records.len(),
        top_k,
        mean_hit_count,
        at_least_rates,
        hit_distribution,
        expected_random_hits: expected_random_hits(top_k),
        roll_window,
        min_samples: floor,
        rolling,
    }))
}

fn rolling_rates(records: &[BacktestRecord], roll_window: usize, floor: usize) -> Vec<RollingPoint> {
    let mut points = Vec::with_capacity(records.len());
    let mut sum2 = 0usize;
    let mut sum3 = 0usize;

    for (j, r) in records.iter().enumerate() {
        sum2 += r.hit_at_least_2 as usize;
        sum3 += r.hit_at_least_3 as usize;
        if j >= roll_window {
            let dropped = &records[j - roll_window];
            sum2 -= dropped.hit_at_least_2 as usize;
            sum3 -= dropped.hit_at_least_3 as usize;
        }

        let count = (j + 1).min(roll_window);
        let (at_least_2, at_least_3) = if count >= floor {
            (Some(sum2 as f64 / count as f64), Some(sum3 as f64 / count as f64))
        } else {
            (None, None)
        };

        points.push(RollingPoint {
            index: r.index,
            date: r.date,
            at_least_2,
            at_least_3,
        });
    }

    points
}
