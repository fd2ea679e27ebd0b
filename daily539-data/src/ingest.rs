use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{Draw, DrawError, History, PICK_COUNT, POOL_SIZE};

const DATE_HEADERS: &[&str] = &["date", "日期"];
const NUMBER_HEADER_PREFIXES: &[&str] = &["n", "number", "號碼"];

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("cannot open {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("CSV read failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("cannot open workbook {path:?}: {source}")]
    OpenWorkbook {
        path: PathBuf,
        #[source]
        source: calamine::XlsxError,
    },
    #[error("workbook read failed: {0}")]
    Workbook(#[from] calamine::XlsxError),
    #[error("workbook has no worksheet")]
    NoWorksheet,
    #[error("no valid draw in source ({rejected} rows rejected)")]
    NoValidRows { rejected: usize },
}

/// One tabular row as handed over by a reader: a date field and 5 number fields.
#[derive(Debug, Clone)]
pub struct RawRow {
    pub line: usize,
    pub date: String,
    pub fields: [String; PICK_COUNT],
}

#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    Unreadable(String),
    MissingField(usize),
    BadDate(String),
    NonNumeric(String),
    OutOfRange(i64),
    Duplicate(u8),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Unreadable(e) => write!(f, "unreadable record ({e})"),
            RejectReason::MissingField(i) => write!(f, "number field {} missing", i + 1),
            RejectReason::BadDate(s) => write!(f, "invalid date '{s}'"),
            RejectReason::NonNumeric(s) => write!(f, "non-numeric value '{s}'"),
            RejectReason::OutOfRange(n) => write!(f, "number {n} out of range (1-39)"),
            RejectReason::Duplicate(n) => write!(f, "duplicate number {n}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowRejection {
    pub line: usize,
    pub reason: RejectReason,
}

#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub history: History,
    pub total_rows: usize,
    pub rejected: Vec<RowRejection>,
    /// Set when the history is shorter than the requested minimum. Not a failure.
    pub below_minimum: bool,
}

/// Validates rows, drops the bad ones and orders the rest by date, oldest first.
pub fn build_history<I>(rows: I, min_history: usize) -> Result<IngestOutcome, IngestError>
where
    I: IntoIterator<Item = RawRow>,
{
    let mut total_rows = 0;
    let mut draws = Vec::new();
    let mut rejected = Vec::new();

    for row in rows {
        total_rows += 1;
        match parse_row(&row) {
            Ok(draw) => draws.push(draw),
            Err(reason) => {
                log::warn!("Dropping line {}: {}", row.line, reason);
                rejected.push(RowRejection { line: row.line, reason });
            }
        }
    }

    finish(draws, total_rows, rejected, min_history)
}

fn finish(
    mut draws: Vec<Draw>,
    total_rows: usize,
    rejected: Vec<RowRejection>,
    min_history: usize,
) -> Result<IngestOutcome, IngestError> {
    if draws.is_empty() {
        return Err(IngestError::NoValidRows { rejected: rejected.len() });
    }

    // Stable, so same-day rows keep their source order.
    draws.sort_by_key(|d| d.date);

    let below_minimum = draws.len() < min_history;
    if below_minimum {
        log::warn!(
            "Only {} draws available, at least {} recommended for a stable backtest",
            draws.len(),
            min_history
        );
    }

    Ok(IngestOutcome {
        history: History::new(draws),
        total_rows,
        rejected,
        below_minimum,
    })
}

fn parse_row(row: &RawRow) -> Result<Draw, RejectReason> {
    let date = parse_date(&row.date).ok_or_else(|| RejectReason::BadDate(row.date.clone()))?;

    let mut numbers = [0u8; PICK_COUNT];
    for (slot, field) in numbers.iter_mut().zip(&row.fields) {
        let value = parse_number(field)?;
        if value < 1 || value > POOL_SIZE as i64 {
            return Err(RejectReason::OutOfRange(value));
        }
        *slot = value as u8;
    }

    Draw::dated(date, numbers).map_err(|e| match e {
        DrawError::Duplicate(n) => RejectReason::Duplicate(n),
        DrawError::OutOfRange(n) => RejectReason::OutOfRange(n as i64),
    })
}

fn parse_number(field: &str) -> Result<i64, RejectReason> {
    let s = field.trim();
    if let Ok(n) = s.parse::<i64>() {
        return Ok(n);
    }
    // Spreadsheet exports write integers as "7.0".
    match s.parse::<f64>() {
        Ok(x) if x.is_finite() && x.fract() == 0.0 => Ok(x as i64),
        _ => Err(RejectReason::NonNumeric(s.to_string())),
    }
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    let day_part = s.split([' ', 'T']).next().unwrap_or(s);
    ["%Y-%m-%d", "%Y/%m/%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(day_part, fmt).ok())
}

pub(crate) struct Columns {
    date: usize,
    numbers: [usize; PICK_COUNT],
}

impl Columns {
    pub(crate) fn date_index(&self) -> usize {
        self.date
    }
}

/// Finds the date and number columns by header name, case-insensitively.
pub(crate) fn locate_columns<S: AsRef<str>>(headers: &[S]) -> Result<Columns, IngestError> {
    let names: Vec<String> = headers
        .iter()
        .map(|h| h.as_ref().trim().trim_start_matches('\u{feff}').to_lowercase())
        .collect();
    let find = |candidates: &[String]| names.iter().position(|n| candidates.contains(n));

    let mut missing = Vec::new();

    let date_candidates: Vec<String> = DATE_HEADERS.iter().map(|s| s.to_string()).collect();
    let date = find(&date_candidates);
    if date.is_none() {
        missing.push(DATE_HEADERS[0].to_string());
    }

    let mut numbers = [0usize; PICK_COUNT];
    for (i, slot) in numbers.iter_mut().enumerate() {
        let candidates: Vec<String> = NUMBER_HEADER_PREFIXES
            .iter()
            .map(|p| format!("{}{}", p, i + 1))
            .collect();
        match find(&candidates) {
            Some(idx) => *slot = idx,
            None => missing.push(format!("n{}", i + 1)),
        }
    }

    match date {
        Some(date) if missing.is_empty() => Ok(Columns { date, numbers }),
        _ => Err(IngestError::MissingColumns(missing)),
    }
}

/// Rows handed over by a tabular reader, plus the records it could not turn into rows.
#[derive(Default)]
pub(crate) struct RowCollector {
    rows: Vec<RawRow>,
    unreadable: Vec<RowRejection>,
}

impl RowCollector {
    pub(crate) fn reject(&mut self, line: usize, reason: RejectReason) {
        log::warn!("Dropping line {}: {}", line, reason);
        self.unreadable.push(RowRejection { line, reason });
    }

    /// `cell(i)` returns the text of column `i`, or `None` past the end of the record.
    pub(crate) fn push<F>(&mut self, columns: &Columns, line: usize, cell: F)
    where
        F: Fn(usize) -> Option<String>,
    {
        let mut fields: [String; PICK_COUNT] = Default::default();
        for (k, (slot, &idx)) in fields.iter_mut().zip(&columns.numbers).enumerate() {
            match cell(idx) {
                Some(v) => *slot = v,
                None => return self.reject(line, RejectReason::MissingField(k)),
            }
        }

        self.rows.push(RawRow {
            line,
            date: cell(columns.date).unwrap_or_default(),
            fields,
        });
    }

    pub(crate) fn finish(self, min_history: usize) -> Result<IngestOutcome, IngestError> {
        let unreadable_count = self.unreadable.len();
        let mut outcome = match build_history(self.rows, min_history) {
            Ok(outcome) => outcome,
            Err(IngestError::NoValidRows { rejected }) => {
                return Err(IngestError::NoValidRows { rejected: rejected + unreadable_count });
            }
            Err(e) => return Err(e),
        };

        outcome.total_rows += unreadable_count;
        outcome.rejected.extend(self.unreadable);
        outcome.rejected.sort_by_key(|r| r.line);
        Ok(outcome)
    }
}

/// Reads a CSV with a header row naming a date column and five number columns.
pub fn read_history<R: Read>(reader: R, min_history: usize) -> Result<IngestOutcome, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    collect_rows(&mut reader, min_history)
}

/// Loads a CSV file, or an Excel workbook when the extension is `.xlsx` / `.xlsm`.
pub fn load_history(path: &Path, min_history: usize) -> Result<IngestOutcome, IngestError> {
    if is_workbook(path) {
        return crate::workbook::load_workbook(path, min_history);
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| IngestError::Open { path: path.to_path_buf(), source })?;
    collect_rows(&mut reader, min_history)
}

fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx") || ext.eq_ignore_ascii_case("xlsm"))
}

fn collect_rows<R: Read>(
    reader: &mut csv::Reader<R>,
    min_history: usize,
) -> Result<IngestOutcome, IngestError> {
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let columns = locate_columns(&headers)?;

    let mut collector = RowCollector::default();
    // Line 1 is the header. Quoted fields may span lines, so positions come from the reader.
    let mut last_line = 1;
    for record in reader.records() {
        match record {
            Ok(record) => {
                let line = record.position().map_or(last_line + 1, |p| p.line() as usize);
                last_line = line;
                collector.push(&columns, line, |idx| record.get(idx).map(str::to_string));
            }
            Err(e) => {
                let line = e.position().map_or(last_line + 1, |p| p.line() as usize);
                last_line = line;
                collector.reject(line, RejectReason::Unreadable(e.to_string()));
            }
        }
    }

    collector.finish(min_history)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(line: usize, date: &str, fields: [&str; 5]) -> RawRow {
        RawRow {
            line,
            date: date.to_string(),
            fields: fields.map(|f| f.to_string()),
        }
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 7);
        assert_eq!(parse_date("2024-03-07"), expected);
        assert_eq!(parse_date("2024/03/07"), expected);
        assert_eq!(parse_date("2024-03-07 00:00:00"), expected);
        assert_eq!(parse_date(" 2024-03-07T12:30:00 "), expected);
        assert_eq!(parse_date("07/03/2024"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_parse_number_accepts_integral_floats() {
        assert_eq!(parse_number("7"), Ok(7));
        assert_eq!(parse_number(" 7.0 "), Ok(7));
        assert_eq!(parse_number("7.5"), Err(RejectReason::NonNumeric("7.5".into())));
        assert_eq!(parse_number("x"), Err(RejectReason::NonNumeric("x".into())));
    }

    #[test]
    fn test_build_history_drops_invalid_rows() {
        let rows = vec![
            row(2, "2024-01-02", ["1", "2", "3", "4", "5"]),
            row(3, "2024-01-03", ["1", "2", "3", "4", "40"]),
            row(4, "2024-01-04", ["1", "1", "3", "4", "5"]),
            row(5, "2024-01-05", ["1", "a", "3", "4", "5"]),
            row(6, "not a date", ["1", "2", "3", "4", "5"]),
            row(7, "2024-01-01", ["0", "2", "3", "4", "5"]),
        ];
        let outcome = build_history(rows, 60).unwrap();
        assert_eq!(outcome.total_rows, 6);
        assert_eq!(outcome.history.len(), 1);
        assert_eq!(outcome.rejected.len(), 5);
        assert_eq!(outcome.rejected[0].reason, RejectReason::OutOfRange(40));
        assert_eq!(outcome.rejected[1].reason, RejectReason::Duplicate(1));
        assert_eq!(outcome.rejected[2].reason, RejectReason::NonNumeric("a".into()));
        assert_eq!(outcome.rejected[3].reason, RejectReason::BadDate("not a date".into()));
        assert_eq!(outcome.rejected[4].reason, RejectReason::OutOfRange(0));
        assert!(outcome.below_minimum);
    }

    #[test]
    fn test_build_history_sorts_oldest_first() {
        let rows = vec![
            row(2, "2024-01-05", ["1", "2", "3", "4", "5"]),
            row(3, "2024-01-01", ["6", "7", "8", "9", "10"]),
            row(4, "2024-01-03", ["11", "12", "13", "14", "15"]),
        ];
        let outcome = build_history(rows, 2).unwrap();
        let dates: Vec<_> = outcome.history.as_slice().iter().map(|d| d.date.unwrap()).collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            ]
        );
        assert!(!outcome.below_minimum);
    }

    #[test]
    fn test_build_history_same_day_keeps_source_order() {
        let rows = vec![
            row(2, "2024-01-01", ["1", "2", "3", "4", "5"]),
            row(3, "2024-01-01", ["6", "7", "8", "9", "10"]),
        ];
        let outcome = build_history(rows, 1).unwrap();
        assert!(outcome.history.as_slice()[0].contains(1));
        assert!(outcome.history.as_slice()[1].contains(6));
    }

    #[test]
    fn test_build_history_no_valid_rows() {
        let rows = vec![row(2, "2024-01-01", ["1", "1", "1", "1", "1"])];
        match build_history(rows, 60) {
            Err(IngestError::NoValidRows { rejected }) => assert_eq!(rejected, 1),
            other => panic!("expected NoValidRows, got {:?}", other),
        }
    }

    #[test]
    fn test_read_history_english_headers() {
        let data = "date,n1,n2,n3,n4,n5\n\
                    2024-01-02,5,4,3,2,1\n\
                    2024-01-01,39,38,37,36,35\n";
        let outcome = read_history(data.as_bytes(), 60).unwrap();
        assert_eq!(outcome.history.len(), 2);
        assert_eq!(outcome.history.as_slice()[0].numbers(), &[35, 36, 37, 38, 39]);
        assert_eq!(outcome.history.latest().unwrap().numbers(), &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_read_history_chinese_headers_and_extra_columns() {
        let data = "期別,日期,號碼1,號碼2,號碼3,號碼4,號碼5\n\
                    113000001,2024/01/01,1,2,3,4,5.0\n";
        let outcome = read_history(data.as_bytes(), 1).unwrap();
        assert_eq!(outcome.history.len(), 1);
        assert!(outcome.rejected.is_empty());
    }

    #[test]
    fn test_read_history_short_record_is_rejected() {
        let data = "date,n1,n2,n3,n4,n5\n\
                    2024-01-01,1,2,3,4,5\n\
                    2024-01-02,1,2\n";
        let outcome = read_history(data.as_bytes(), 1).unwrap();
        assert_eq!(outcome.total_rows, 2);
        assert_eq!(outcome.rejected, vec![RowRejection { line: 3, reason: RejectReason::MissingField(2) }]);
    }

    #[test]
    fn test_read_history_missing_columns() {
        let data = "date,n1,n2,n3\n2024-01-01,1,2,3\n";
        match read_history(data.as_bytes(), 1) {
            Err(IngestError::MissingColumns(cols)) => assert_eq!(cols, vec!["n4", "n5"]),
            other => panic!("expected MissingColumns, got {:?}", other),
        }
    }

    #[test]
    fn test_read_history_multiline_field_keeps_line_numbers() {
        let data = "date,n1,n2,n3,n4,n5,note\n\
                    2024-01-01,1,2,3,4,5,\"first\nsecond\"\n\
                    2024-01-02,1,2,3,4,40,\n";
        let outcome = read_history(data.as_bytes(), 1).unwrap();
        assert_eq!(outcome.history.len(), 1);
        assert_eq!(outcome.rejected, vec![RowRejection { line: 4, reason: RejectReason::OutOfRange(40) }]);
    }

    #[test]
    fn test_workbook_extension() {
        assert!(is_workbook(Path::new("data.xlsx")));
        assert!(is_workbook(Path::new("DATA.XLSX")));
        assert!(!is_workbook(Path::new("data.csv")));
        assert!(!is_workbook(Path::new("data")));
    }

    #[test]
    fn test_load_history_missing_file() {
        let err = load_history(Path::new("/nonexistent/draws.csv"), 1).unwrap_err();
        assert!(matches!(err, IngestError::Open { .. }));
    }
}
