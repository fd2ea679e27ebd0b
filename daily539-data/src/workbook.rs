//! Excel (`.xlsx`) draw histories: the first worksheet, header in the first used row.

use std::io::{Read, Seek};
use std::path::Path;

use calamine::{open_workbook, Data, Reader, Xlsx};
use chrono::{Days, NaiveDate};

use crate::ingest::{locate_columns, IngestError, IngestOutcome, RowCollector};

pub fn load_workbook(path: &Path, min_history: usize) -> Result<IngestOutcome, IngestError> {
    let mut workbook = open_workbook::<Xlsx<_>, _>(path)
        .map_err(|source| IngestError::OpenWorkbook { path: path.to_path_buf(), source })?;
    collect_sheet(&mut workbook, min_history)
}

pub fn read_workbook<R: Read + Seek>(reader: R, min_history: usize) -> Result<IngestOutcome, IngestError> {
    let mut workbook = Xlsx::new(reader)?;
    collect_sheet(&mut workbook, min_history)
}

fn collect_sheet<R: Read + Seek>(
    workbook: &mut Xlsx<R>,
    min_history: usize,
) -> Result<IngestOutcome, IngestError> {
    let range = workbook.worksheet_range_at(0).ok_or(IngestError::NoWorksheet)??;
    // Sheet rows are 1-based; the range may not start at A1.
    let first_line = range.start().map_or(1, |(row, _)| row as usize + 1);

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .map(|cells| cells.iter().map(cell_text).collect())
        .unwrap_or_default();
    let columns = locate_columns(&headers)?;

    let mut collector = RowCollector::default();
    for (offset, cells) in rows.enumerate() {
        let line = first_line + offset + 1;
        if cells.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }
        collector.push(&columns, line, |idx| {
            let cell = cells.get(idx)?;
            Some(if idx == columns.date_index() { date_text(cell) } else { cell_text(cell) })
        });
    }

    collector.finish(min_history)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Int(n) => n.to_string(),
        Data::Float(x) => x.to_string(),
        Data::String(s) | Data::DateTimeIso(s) => s.trim().to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => excel_serial_date(dt.as_f64())
            .map(|d| d.to_string())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

/// Date cells without a date format come back as bare serial numbers.
fn date_text(cell: &Data) -> String {
    let serial = match cell {
        Data::Int(n) => *n as f64,
        Data::Float(x) => *x,
        other => return cell_text(other),
    };
    excel_serial_date(serial)
        .map(|d| d.to_string())
        .unwrap_or_else(|| cell_text(cell))
}

/// Day 0 is 1899-12-30 in the 1900 date system.
fn excel_serial_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(serial.floor() as u64))
}
