use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use clap::ValueEnum;
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use serde::Serialize;

use daily539_data::models::{format_number_list, History};
use daily539_engine::backtest::BacktestRecord;
use daily539_engine::recommend::Recommendation;
use daily539_engine::scoring::ScoringStrategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn file_name(self, stem: &str) -> PathBuf {
        match self {
            ExportFormat::Csv => PathBuf::from(format!("{stem}.csv")),
            ExportFormat::Xlsx => PathBuf::from(format!("{stem}.xlsx")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Field {
    Text(String),
    Number(f64),
}

impl Field {
    fn to_text(&self) -> String {
        match self {
            Field::Text(s) => s.clone(),
            Field::Number(x) => x.to_string(),
        }
    }
}

#[derive(Serialize)]
struct BacktestRow {
    index: usize,
    date: String,
    hit_count: usize,
    hit_at_least_2: u8,
    hit_at_least_3: u8,
    predicted: String,
    actual: String,
}

const BACKTEST_HEADERS: [&str; 7] = [
    "index",
    "date",
    "hit_count",
    "hit_at_least_2",
    "hit_at_least_3",
    "predicted",
    "actual",
];

impl From<&BacktestRecord> for BacktestRow {
    fn from(r: &BacktestRecord) -> Self {
        let mut predicted = r.predicted.clone();
        predicted.sort_unstable();
        Self {
            index: r.index,
            date: r.date.map(|d| d.to_string()).unwrap_or_default(),
            hit_count: r.hit_count,
            hit_at_least_2: r.hit_at_least_2 as u8,
            hit_at_least_3: r.hit_at_least_3 as u8,
            predicted: format_number_list(&predicted),
            actual: format_number_list(&r.actual),
        }
    }
}

impl BacktestRow {
    fn fields(&self) -> [Field; 7] {
        [
            Field::Number(self.index as f64),
            Field::Text(self.date.clone()),
            Field::Number(self.hit_count as f64),
            Field::Number(self.hit_at_least_2 as f64),
            Field::Number(self.hit_at_least_3 as f64),
            Field::Text(self.predicted.clone()),
            Field::Text(self.actual.clone()),
        ]
    }
}

/// Header and values of the one-row ticket: the sorted picks plus what produced them.
fn ticket_fields(
    rec: &Recommendation,
    history: &History,
    strategy: &dyn ScoringStrategy,
    generated_at: NaiveDateTime,
) -> Vec<(String, Field)> {
    let mut fields = vec![
        ("numbers".to_string(), Field::Text(format_number_list(&rec.sorted_numbers()))),
        (
            "generated_at".to_string(),
            Field::Text(generated_at.format("%Y-%m-%d %H:%M:%S").to_string()),
        ),
        (
            "latest_draw_date".to_string(),
            Field::Text(history.latest_date().map(|d| d.to_string()).unwrap_or_default()),
        ),
        ("draws_used".to_string(), Field::Number(history.len() as f64)),
        ("strategy".to_string(), Field::Text(strategy.name().to_string())),
    ];
    fields.extend(
        strategy
            .params()
            .into_iter()
            .map(|(name, value)| (name, Field::Number(value))),
    );
    fields
}

pub fn write_ticket(
    path: &Path,
    format: ExportFormat,
    rec: &Recommendation,
    history: &History,
    strategy: &dyn ScoringStrategy,
    generated_at: NaiveDateTime,
) -> Result<()> {
    let fields = ticket_fields(rec, history, strategy, generated_at);
    match format {
        ExportFormat::Csv => {
            let mut writer = csv::Writer::from_path(path)
                .with_context(|| format!("Cannot create {:?}", path))?;
            writer.write_record(fields.iter().map(|(name, _)| name.as_str()))?;
            writer.write_record(fields.iter().map(|(_, value)| value.to_text()))?;
            writer.flush().with_context(|| format!("Cannot write {:?}", path))?;
        }
        ExportFormat::Xlsx => {
            let mut workbook = Workbook::new();
            let sheet = workbook.add_worksheet().set_name("ticket")?;
            let bold = Format::new().set_bold();
            for (col, (name, value)) in fields.iter().enumerate() {
                let col = col as u16;
                sheet.write_string_with_format(0, col, name, &bold)?;
                write_field(sheet, 1, col, value)?;
            }
            workbook
                .save(path)
                .with_context(|| format!("Cannot write {:?}", path))?;
        }
    }
    Ok(())
}

pub fn write_backtest(path: &Path, format: ExportFormat, records: &[BacktestRecord]) -> Result<()> {
    match format {
        ExportFormat::Csv => {
            let mut writer = csv::Writer::from_path(path)
                .with_context(|| format!("Cannot create {:?}", path))?;
            for record in records {
                writer.serialize(BacktestRow::from(record))?;
            }
            writer.flush().with_context(|| format!("Cannot write {:?}", path))?;
        }
        ExportFormat::Xlsx => {
            let mut workbook = Workbook::new();
            let sheet = workbook.add_worksheet().set_name("backtest")?;
            let bold = Format::new().set_bold();
            for (col, name) in BACKTEST_HEADERS.iter().enumerate() {
                sheet.write_string_with_format(0, col as u16, *name, &bold)?;
            }
            for (i, record) in records.iter().enumerate() {
                let row = i as u32 + 1;
                for (col, value) in BacktestRow::from(record).fields().iter().enumerate() {
                    write_field(sheet, row, col as u16, value)?;
                }
            }
            workbook
                .save(path)
                .with_context(|| format!("Cannot write {:?}", path))?;
        }
    }
    Ok(())
}

fn write_field(sheet: &mut Worksheet, row: u32, col: u16, value: &Field) -> Result<()> {
    match value {
        Field::Text(s) => sheet.write_string(row, col, s.as_str())?,
        Field::Number(x) => sheet.write_number(row, col, *x)?,
    };
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook, Data, Reader, Xlsx};
    use chrono::NaiveDate;
    use daily539_data::models::make_test_draws;
    use daily539_engine::backtest::backtest;
    use daily539_engine::recommend::recommend;
    use daily539_engine::scoring::{score, LinearWeightedScore};

    fn generated_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_write_ticket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ticket.csv");
        let history = History::new(make_test_draws(40));
        let weights = LinearWeightedScore::default();
        let table = score(history.as_slice(), &weights).unwrap();
        let rec = recommend(&table, 10).unwrap();

        write_ticket(&path, ExportFormat::Csv, &rec, &history, &weights, generated_at()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines[0],
            "numbers,generated_at,latest_draw_date,draws_used,strategy,freq_weight,gap_weight"
        );
        let expected_numbers = format_number_list(&rec.sorted_numbers());
        assert!(lines[1].starts_with(&format!("\"{}\"", expected_numbers)));
        assert!(lines[1].contains("2024-05-01 12:00:00"));
        assert!(lines[1].contains("2024-02-09"));
        assert!(lines[1].ends_with(",40,LinearWeighted,10,3"));
    }

    #[test]
    fn test_write_backtest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backtest.csv");
        let draws = make_test_draws(35);
        let records = backtest(&draws, 30, &LinearWeightedScore::default(), 10).unwrap();

        write_backtest(&path, ExportFormat::Csv, &records).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec!["index", "date", "hit_count", "hit_at_least_2", "hit_at_least_3", "predicted", "actual"]
        );
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 5);
        assert_eq!(&rows[0][0], "30");
        assert_eq!(&rows[0][1], "2024-01-31");
        assert_eq!(&rows[0][2], records[0].hit_count.to_string().as_str());
        assert_eq!(rows[0][6].split(',').count(), 5);
    }

    #[test]
    fn test_file_names() {
        assert_eq!(ExportFormat::Csv.file_name("ticket"), PathBuf::from("ticket.csv"));
        assert_eq!(ExportFormat::Xlsx.file_name("backtest"), PathBuf::from("backtest.xlsx"));
    }

    #[test]
    fn test_write_ticket_xlsx() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ticket.xlsx");
        let history = History::new(make_test_draws(40));
        let weights = LinearWeightedScore::default();
        let table = score(history.as_slice(), &weights).unwrap();
        let rec = recommend(&table, 10).unwrap();

        write_ticket(&path, ExportFormat::Xlsx, &rec, &history, &weights, generated_at()).unwrap();

        let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
        let range = workbook.worksheet_range("ticket").unwrap();
        assert_eq!(range.get_value((0, 0)), Some(&Data::String("numbers".into())));
        assert_eq!(
            range.get_value((1, 0)),
            Some(&Data::String(format_number_list(&rec.sorted_numbers())))
        );
        assert_eq!(range.get_value((1, 2)), Some(&Data::String("2024-02-09".into())));
        assert_eq!(range.get_value((1, 3)), Some(&Data::Float(40.0)));
        assert_eq!(range.get_value((0, 6)), Some(&Data::String("gap_weight".into())));
        assert_eq!(range.get_value((1, 6)), Some(&Data::Float(3.0)));
    }

    #[test]
    fn test_write_backtest_xlsx() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backtest.xlsx");
        let draws = make_test_draws(35);
        let records = backtest(&draws, 30, &LinearWeightedScore::default(), 10).unwrap();

        write_backtest(&path, ExportFormat::Xlsx, &records).unwrap();

        let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
        let range = workbook.worksheet_range("backtest").unwrap();
        assert_eq!(range.height(), records.len() + 1);
        assert_eq!(range.get_value((0, 2)), Some(&Data::String("hit_count".into())));
        assert_eq!(range.get_value((1, 0)), Some(&Data::Float(30.0)));
        assert_eq!(range.get_value((1, 1)), Some(&Data::String("2024-01-31".into())));
        assert_eq!(
            range.get_value((1, 2)),
            Some(&Data::Float(records[0].hit_count as f64))
        );
    }
}
