//! Table output using comfy-table.
//!
//! Columns: Size | Device (ms) | p95 | CPU (ms) | Speedup | Melem/s | Runs | CV%

use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use crate::harness::{format_size, DataPoint};

fn metric(dp: &DataPoint, key: &str, precision: usize) -> String {
    dp.metrics
        .get(key)
        .map(|v| format!("{:.*}", precision, v))
        .unwrap_or_else(|| "-".to_string())
}

fn speedup_cell(dp: &DataPoint) -> Cell {
    let text = if dp.validated {
        format!("{:.1}x", dp.speedup)
    } else {
        format!("{:.1}x (invalid)", dp.speedup)
    };
    let color = match dp.speedup {
        _ if !dp.validated => Color::Magenta,
        s if s >= 5.0 => Color::Green,
        s if s >= 2.0 => Color::Cyan,
        s if s >= 1.0 => Color::Yellow,
        _ => Color::Red,
    };
    Cell::new(text).fg(color)
}

/// Build the table for one experiment's data points.
pub fn build_table(points: &[&DataPoint]) -> Table {
    let mut table = Table::new();
    table
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            ["Size", "Device (ms)", "p95", "CPU (ms)", "Speedup", "Melem/s", "Runs", "CV%"]
                .into_iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold)),
        );

    for dp in points {
        let right = |s: String| Cell::new(s).set_alignment(CellAlignment::Right);
        table.add_row(vec![
            right(format_size(dp.size)),
            right(format!("{:.3}", dp.device_stats.mean)),
            right(format!("{:.3}", dp.device_stats.p95)),
            right(format!("{:.3}", dp.cpu_stats.mean)),
            speedup_cell(dp).set_alignment(CellAlignment::Right),
            right(metric(dp, "melem_per_sec", 1)),
            right(metric(dp, "runs", 0)),
            right(format!("{:.1}", dp.device_stats.cv_percent)),
        ]);
    }
    table
}

/// Render results grouped by experiment, in first-seen order.
pub fn render_all_tables(data: &[DataPoint]) {
    if data.is_empty() {
        println!("No results to display.");
        return;
    }

    let mut groups: Vec<(&str, Vec<&DataPoint>)> = Vec::new();
    for dp in data {
        match groups.iter_mut().find(|(name, _)| *name == dp.experiment) {
            Some((_, points)) => points.push(dp),
            None => groups.push((dp.experiment.as_str(), vec![dp])),
        }
    }

    for (name, points) in &groups {
        println!("\n=== {} ===", name);
        println!("{}", build_table(points));
    }
}
