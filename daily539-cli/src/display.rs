use std::path::Path;

use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use textplots::{Chart, Plot, Shape};

use daily539_data::ingest::IngestOutcome;
use daily539_data::models::{format_number_list, History};
use daily539_engine::backtest::BacktestRecord;
use daily539_engine::recommend::{rank, Recommendation};
use daily539_engine::report::Summary;
use daily539_engine::scoring::{ScoreTable, ScoringStrategy};
use daily539_engine::sweep::WindowResult;

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn date_cell(date: Option<chrono::NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_else(|| "—".to_string())
}

fn percent(rate: f64) -> String {
    format!("{:.1}%", rate * 100.0)
}

pub fn display_source_summary(path: &Path, outcome: &IngestOutcome, min_history: usize) {
    let history = &outcome.history;
    println!("Source : {}", path.display());
    println!("  Rows read      : {}", outcome.total_rows);
    println!("  Draws kept     : {}", history.len());
    if !outcome.rejected.is_empty() {
        println!("  Rows rejected  : {}", outcome.rejected.len());
    }
    println!("  Earliest draw  : {}", date_cell(history.earliest_date()));
    println!("  Latest draw    : {}", date_cell(history.latest_date()));
    if outcome.below_minimum {
        println!(
            "\n⚠ Only {} draws, at least {} recommended for a stable backtest.",
            history.len(),
            min_history
        );
    }
}

pub fn display_rejections(outcome: &IngestOutcome) {
    if outcome.rejected.is_empty() {
        return;
    }
    let mut table = new_table();
    table.set_header(vec!["Line", "Reason"]);
    for r in &outcome.rejected {
        table.add_row(vec![r.line.to_string(), r.reason.to_string()]);
    }
    println!("\n── Rejected rows ──");
    println!("{table}");
}

pub fn display_draws(history: &History, last: usize) {
    if history.is_empty() {
        println!("No draw to display.");
        return;
    }

    let mut table = new_table();
    table.set_header(vec!["Date", "Numbers"]);
    for draw in history.newest_first(last) {
        let numbers = draw
            .numbers()
            .iter()
            .map(|n| format!("{:2}", n))
            .collect::<Vec<_>>()
            .join(" - ");
        table.add_row(vec![date_cell(draw.date), numbers]);
    }

    println!("\n── Latest {} draws ──", last.min(history.len()));
    println!("{table}");
}

pub fn display_score_table(table: &ScoreTable, top_k: usize) {
    println!(
        "\n📊 Scores ({}, {} draws)\n",
        table.strategy, table.window_len
    );

    let mut out = new_table();
    out.set_header(vec!["Rank", "Number", "Occurrences", "Gap", "Confidence"]);

    for (i, entry) in rank(table).iter().enumerate() {
        let color = if i < top_k { Color::Green } else { Color::White };
        out.add_row(vec![
            Cell::new(i + 1),
            Cell::new(format!("{:02}", entry.stat.number)).fg(color),
            Cell::new(entry.stat.occurrence_count),
            Cell::new(entry.stat.gap),
            Cell::new(format!("{:.1}", entry.confidence)).fg(color),
        ]);
    }
    println!("{out}");
}

/// Gap on the x axis, confidence on the y axis.
pub fn display_score_chart(table: &ScoreTable) {
    let points: Vec<(f32, f32)> = table
        .entries()
        .iter()
        .map(|e| (e.stat.gap as f32, e.confidence as f32))
        .collect();

    let x_max = points.iter().map(|p| p.0).fold(1.0f32, f32::max);
    let y_min = points.iter().map(|p| p.1).fold(f32::INFINITY, f32::min);
    let y_max = points.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max);
    if !y_min.is_finite() || !y_max.is_finite() {
        return;
    }

    println!("\n== Gap (x) vs confidence (y) ==\n");
    let shape = Shape::Points(&points);
    let mut chart = Chart::new_with_y_range(120, 40, 0.0, x_max, y_min - 1.0, y_max + 1.0);
    println!("{}", chart.lineplot(&shape));
}

pub fn display_recommendation(rec: &Recommendation, strategy: &dyn ScoringStrategy) {
    let params = strategy
        .params()
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join(", ");
    println!("\n🌟 Top {} numbers ({} {})\n", rec.len(), strategy.name(), params);

    let mut table = new_table();
    table.set_header(vec!["#", "Number", "Confidence"]);
    for (i, pick) in rec.picks.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(format!("{:02}", pick.stat.number)).fg(Color::Green),
            Cell::new(format!("{:.1}", pick.confidence)),
        ]);
    }
    println!("{table}");
    println!("Ticket : {}", format_number_list(&rec.sorted_numbers()));
}

pub fn display_insufficient(draws: usize, window: usize) {
    println!(
        "\nNot enough draws to backtest: {} draws for a window of {}. Lower the window or add data.",
        draws, window
    );
}

pub fn display_summary(summary: &Summary, window: usize) {
    println!("\n🧪 Backtest (window={}, k={}, {} predictions)\n", window, summary.top_k, summary.records);

    let mut table = new_table();
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec!["Mean hits".to_string(), format!("{:.2}", summary.mean_hit_count)]);
    table.add_row(vec![
        "Random baseline".to_string(),
        format!("{:.2}", summary.expected_random_hits),
    ]);
    for n in 1..=3 {
        if let Some(rate) = summary.hit_rate_at_least(n) {
            table.add_row(vec![format!("≥{n} hits"), percent(rate)]);
        }
    }
    println!("{table}");

    let mut dist = new_table();
    dist.set_header(vec!["Hits", "Draws", "Share"]);
    for (hits, &count) in summary.hit_distribution.iter().enumerate() {
        let share = count as f64 / summary.records as f64;
        let bar = "█".repeat((share * 30.0).round() as usize);
        dist.add_row(vec![hits.to_string(), count.to_string(), format!("{} {}", percent(share), bar)]);
    }
    println!("{dist}");
}

pub fn display_rolling_chart(summary: &Summary) {
    let at_least_2: Vec<(f32, f32)> = summary
        .rolling
        .iter()
        .filter_map(|p| p.at_least_2.map(|v| (p.index as f32, v as f32)))
        .collect();
    let at_least_3: Vec<(f32, f32)> = summary
        .rolling
        .iter()
        .filter_map(|p| p.at_least_3.map(|v| (p.index as f32, v as f32)))
        .collect();

    println!(
        "\n== Rolling ≥2 / ≥3 hit rate (roll={}, min {} samples) ==\n",
        summary.roll_window, summary.min_samples
    );
    if at_least_2.len() < 2 {
        println!("  (Not enough samples to plot)");
        return;
    }

    let x_min = at_least_2[0].0;
    let x_max = at_least_2[at_least_2.len() - 1].0;
    let upper = Shape::Lines(&at_least_2);
    let lower = Shape::Lines(&at_least_3);
    let mut chart = Chart::new_with_y_range(120, 40, x_min, x_max, 0.0, 1.0);
    println!("{}", chart.lineplot(&upper).lineplot(&lower));
    println!("  upper curve: ≥2 hits, lower curve: ≥3 hits (x = draw index)");
}

pub fn display_backtest_detail(records: &[BacktestRecord], last: usize) {
    if records.is_empty() || last == 0 {
        return;
    }
    let start = records.len().saturating_sub(last);

    let mut table = new_table();
    table.set_header(vec!["#", "Date", "Hits", "≥2", "≥3", "Predicted", "Actual"]);
    for r in &records[start..] {
        let mut predicted = r.predicted.clone();
        predicted.sort_unstable();
        let hits_color = match r.hit_count {
            0 | 1 => Color::White,
            2 => Color::Yellow,
            _ => Color::Green,
        };
        table.add_row(vec![
            Cell::new(r.index),
            Cell::new(date_cell(r.date)),
            Cell::new(r.hit_count).fg(hits_color),
            Cell::new(if r.hit_at_least_2 { "✓" } else { "" }),
            Cell::new(if r.hit_at_least_3 { "✓" } else { "" }),
            Cell::new(format_number_list(&predicted)),
            Cell::new(format_number_list(&r.actual)),
        ]);
    }

    println!("\n── Last {} predictions ──", records.len() - start);
    println!("{table}");
}

pub fn display_sweep(results: &[WindowResult], best: Option<usize>) {
    println!("\n== Window comparison ==\n");

    let mut table = new_table();
    table.set_header(vec!["Window", "Predictions", "Mean hits", "≥1", "≥2", "≥3"]);
    for r in results {
        let marker = if Some(r.window) == best { " *" } else { "" };
        let window = format!("{}{}", r.window, marker);
        match &r.summary {
            Some(s) => table.add_row(vec![
                window,
                s.records.to_string(),
                format!("{:.2}", s.mean_hit_count),
                percent(s.at_least_rates[0]),
                percent(s.at_least_rates[1]),
                percent(s.at_least_rates[2]),
            ]),
            None => table.add_row(vec![
                window,
                "—".to_string(),
                "insufficient data".to_string(),
                String::new(),
                String::new(),
                String::new(),
            ]),
        };
    }
    println!("{table}");
    if best.is_some() {
        println!("* highest ≥2 hit rate");
    }
}
