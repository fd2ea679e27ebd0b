use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

/// Numbers run from 1 to `POOL_SIZE` inclusive.
pub const POOL_SIZE: usize = 39;
/// Numbers drawn per draw.
pub const PICK_COUNT: usize = 5;
/// Below this many draws a history is usable but considered thin.
pub const DEFAULT_MIN_HISTORY: usize = 60;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DrawError {
    #[error("number {0} out of range (1-39)")]
    OutOfRange(u8),
    #[error("duplicate number: {0}")]
    Duplicate(u8),
}

/// One historical outcome: 5 distinct numbers in 1..=39, stored ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Draw {
    pub date: Option<NaiveDate>,
    numbers: [u8; PICK_COUNT],
}

impl Draw {
    pub fn new(numbers: [u8; PICK_COUNT]) -> Result<Self, DrawError> {
        validate_numbers(&numbers)?;
        let mut numbers = numbers;
        numbers.sort_unstable();
        Ok(Self { date: None, numbers })
    }

    pub fn dated(date: NaiveDate, numbers: [u8; PICK_COUNT]) -> Result<Self, DrawError> {
        let mut draw = Self::new(numbers)?;
        draw.date = Some(date);
        Ok(draw)
    }

    pub fn numbers(&self) -> &[u8; PICK_COUNT] {
        &self.numbers
    }

    pub fn contains(&self, number: u8) -> bool {
        self.numbers.contains(&number)
    }

    /// Size of the intersection with `numbers`, which is assumed duplicate-free.
    pub fn matches(&self, numbers: &[u8]) -> usize {
        numbers.iter().filter(|&&n| self.contains(n)).count()
    }

    pub fn format_numbers(&self) -> String {
        format_number_list(&self.numbers)
    }
}

/// `[3, 17, 5]` -> `"03,17,05"`, the layout used on tickets and exports.
pub fn format_number_list(numbers: &[u8]) -> String {
    numbers
        .iter()
        .map(|n| format!("{:02}", n))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn validate_numbers(numbers: &[u8; PICK_COUNT]) -> Result<(), DrawError> {
    for &n in numbers {
        if n < 1 || n as usize > POOL_SIZE {
            return Err(DrawError::OutOfRange(n));
        }
    }
    for i in 0..numbers.len() {
        for j in (i + 1)..numbers.len() {
            if numbers[i] == numbers[j] {
                return Err(DrawError::Duplicate(numbers[i]));
            }
        }
    }
    Ok(())
}

/// Draws in occurrence order, oldest first. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct History {
    draws: Vec<Draw>,
}

impl History {
    pub fn new(draws: Vec<Draw>) -> Self {
        Self { draws }
    }

    pub fn len(&self) -> usize {
        self.draws.len()
    }

    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    pub fn as_slice(&self) -> &[Draw] {
        &self.draws
    }

    pub fn latest(&self) -> Option<&Draw> {
        self.draws.last()
    }

    pub fn earliest_date(&self) -> Option<NaiveDate> {
        self.draws.iter().find_map(|d| d.date)
    }

    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.draws.iter().rev().find_map(|d| d.date)
    }

    /// The `n` most recent draws, newest first.
    pub fn newest_first(&self, n: usize) -> impl Iterator<Item = &Draw> {
        self.draws.iter().rev().take(n)
    }
}

impl From<Vec<Draw>> for History {
    fn from(draws: Vec<Draw>) -> Self {
        Self::new(draws)
    }
}

/// Deterministic fixture: draw `i` holds a rotating block of 5 consecutive numbers,
/// dated one day apart from 2024-01-01.
pub fn make_test_draws(n: usize) -> Vec<Draw> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1);
    (0..n)
        .map(|i| {
            let base = ((i * 7) % POOL_SIZE) as u8;
            let numbers = std::array::from_fn(|k| (base + k as u8) % POOL_SIZE as u8 + 1);
            Draw {
                date: start.and_then(|d| d.checked_add_days(chrono::Days::new(i as u64))),
                numbers: sorted(numbers),
            }
        })
        .collect()
}

fn sorted(mut numbers: [u8; PICK_COUNT]) -> [u8; PICK_COUNT] {
    numbers.sort_unstable();
    numbers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_numbers_ok() {
        assert!(validate_numbers(&[1, 2, 3, 4, 5]).is_ok());
        assert!(validate_numbers(&[39, 38, 37, 36, 35]).is_ok());
    }

    #[test]
    fn test_validate_numbers_out_of_range() {
        assert_eq!(validate_numbers(&[0, 2, 3, 4, 5]), Err(DrawError::OutOfRange(0)));
        assert_eq!(validate_numbers(&[1, 2, 3, 4, 40]), Err(DrawError::OutOfRange(40)));
    }

    #[test]
    fn test_validate_numbers_duplicate() {
        assert_eq!(validate_numbers(&[1, 1, 3, 4, 5]), Err(DrawError::Duplicate(1)));
    }

    #[test]
    fn test_draw_sorts_numbers() {
        let draw = Draw::new([12, 3, 39, 1, 20]).unwrap();
        assert_eq!(draw.numbers(), &[1, 3, 12, 20, 39]);
        assert!(draw.contains(39));
        assert!(!draw.contains(2));
    }

    #[test]
    fn test_draw_matches() {
        let draw = Draw::new([1, 2, 3, 4, 5]).unwrap();
        assert_eq!(draw.matches(&[1, 5, 9, 10]), 2);
        assert_eq!(draw.matches(&[]), 0);
    }

    #[test]
    fn test_format_number_list() {
        assert_eq!(format_number_list(&[3, 17, 5]), "03,17,05");
        let draw = Draw::new([9, 1, 30, 2, 11]).unwrap();
        assert_eq!(draw.format_numbers(), "01,02,09,11,30");
    }

    #[test]
    fn test_history_dates() {
        let history = History::new(make_test_draws(10));
        assert_eq!(history.len(), 10);
        assert_eq!(history.earliest_date(), NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(history.latest_date(), NaiveDate::from_ymd_opt(2024, 1, 10));
        let newest: Vec<_> = history.newest_first(2).collect();
        assert_eq!(newest[0].date, NaiveDate::from_ymd_opt(2024, 1, 10));
        assert_eq!(newest[1].date, NaiveDate::from_ymd_opt(2024, 1, 9));
    }

    #[test]
    fn test_make_test_draws_valid() {
        for draw in make_test_draws(100) {
            assert!(validate_numbers(draw.numbers()).is_ok(), "{:?}", draw);
        }
    }
}
