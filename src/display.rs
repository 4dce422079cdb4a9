use crate::domain::{ChangeDirection, GroupingDimension, Period, ReportWindow};
use crate::helpers::{format_signed_usd, format_usd};
use crate::models::{BreakdownOutcome, BreakdownRecord, CostReport, DiffRecord, TotalComparison};
use chrono::Local;
use colored::*;
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use std::path::Path;

/// Increases are red and decreases green, as on a bill
fn difference_cell(difference: f64, direction: ChangeDirection) -> Cell {
    let cell = Cell::new(format_signed_usd(difference));
    match direction {
        ChangeDirection::Increase => cell.fg(Color::Red),
        ChangeDirection::Decrease => cell.fg(Color::Green),
        ChangeDirection::Unchanged => cell,
    }
}

fn new_table(header: Vec<Cell>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(header);
    table
}

fn comparison_labels(periods: &[Period]) -> (String, String) {
    match periods {
        [.., previous, current] => (previous.label(), current.label()),
        [only] => ("-".to_string(), only.label()),
        [] => ("-".to_string(), "-".to_string()),
    }
}

pub fn display_cost_report(report: &CostReport, chart: Option<&Path>, document: Option<&Path>) {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    println!("{}", "═".repeat(80).bright_black());
    println!(
        "{}  {}",
        "AWS Cost Analysis".bright_blue().bold(),
        format!("Generated {}", timestamp).dimmed()
    );
    println!("{}", "═".repeat(80).bright_black());
    println!();

    println!("{}", "Total Cost Comparison".bright_green().bold());
    display_totals_table(&report.totals);
    println!();

    let (previous, current) = comparison_labels(&report.periods);

    println!("{}", "Top Service Cost Comparison".bright_green().bold());
    if report.services.is_empty() {
        println!("{}", "No services above the minimum cost.".dimmed());
    } else {
        display_services_table(&report.services, &previous, &current);
    }
    println!();

    if !report.breakdowns.is_empty() {
        println!("{}", "─".repeat(80).bright_black());
        println!("{}", "Cost Increase Breakdown".bright_green().bold());
        println!("{}", "─".repeat(80).bright_black());
    }
    for breakdown in &report.breakdowns {
        println!(
            "{} {}",
            breakdown.service.bold(),
            format!("({})", format_signed_usd(breakdown.difference)).red()
        );
        for table in &breakdown.tables {
            match &table.outcome {
                BreakdownOutcome::Ok { records } if records.is_empty() => {
                    println!("  {} {}", table.dimension, "no rows above the minimum cost".dimmed());
                }
                BreakdownOutcome::Ok { records } => {
                    display_breakdown_table(table.dimension.name(), records, &previous, &current);
                }
                BreakdownOutcome::Failed { message } => {
                    print_warning(&format!("{} breakdown unavailable: {}", table.dimension, message));
                }
            }
        }
        println!();
    }

    if let Some(chart) = chart {
        print_info(&format!("Chart written to {}", chart.display()));
    }
    if let Some(document) = document {
        print_info(&format!("Report written to {}", document.display()));
    }
}

fn display_totals_table(totals: &TotalComparison) {
    let mut header = vec![Cell::new("Total Cost").fg(Color::Cyan)];
    header.extend(totals.periods.iter().map(|p| Cell::new(p.label()).fg(Color::Cyan)));
    header.push(Cell::new("Difference (USD)").fg(Color::Cyan));

    let mut row = vec![Cell::new("Total").fg(Color::Yellow)];
    row.extend(totals.totals.iter().map(|t| Cell::new(format_usd(*t))));
    row.push(match (totals.difference, totals.direction) {
        (Some(difference), Some(direction)) => difference_cell(difference, direction),
        _ => Cell::new("-"),
    });

    let mut table = new_table(header);
    table.add_row(row);
    println!("{table}");
}

fn display_services_table(records: &[DiffRecord], previous: &str, current: &str) {
    let mut table = new_table(vec![
        Cell::new("Service").fg(Color::Cyan),
        Cell::new(format!("{} (USD)", previous)).fg(Color::Cyan),
        Cell::new(format!("{} (USD)", current)).fg(Color::Cyan),
        Cell::new("Difference (USD)").fg(Color::Cyan),
    ]);

    for record in records {
        table.add_row(vec![
            Cell::new(&record.name),
            Cell::new(format_usd(record.previous)),
            Cell::new(format_usd(record.current)),
            difference_cell(record.difference, record.direction),
        ]);
    }

    println!("{table}");
}

fn display_breakdown_table(column: &str, records: &[BreakdownRecord], previous: &str, current: &str) {
    let mut table = new_table(vec![
        Cell::new(column).fg(Color::Cyan),
        Cell::new(format!("{} (USD)", previous)).fg(Color::Cyan),
        Cell::new(format!("{} (USD)", current)).fg(Color::Cyan),
        Cell::new("Difference (USD)").fg(Color::Cyan),
    ]);

    for record in records {
        table.add_row(vec![
            Cell::new(&record.label),
            Cell::new(format_usd(record.first)),
            Cell::new(format_usd(record.second)),
            difference_cell(record.difference, record.direction),
        ]);
    }

    println!("{table}");
}

pub fn display_breakdown(
    service: &str,
    dimension: GroupingDimension,
    window: &ReportWindow,
    records: &[BreakdownRecord],
) {
    println!(
        "{} {} {}",
        service.bold(),
        format!("by {}", dimension).bright_green(),
        format!("({})", window).dimmed()
    );
    if records.is_empty() {
        println!("{}", "No rows above the minimum cost.".dimmed());
        return;
    }
    let (previous, current) = comparison_labels(&window.periods());
    display_breakdown_table(dimension.name(), records, &previous, &current);
}

pub fn display_cost_report_json(report: &CostReport) {
    match serde_json::to_string_pretty(report) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing report to JSON: {}", e),
    }
}

pub fn print_warning(message: &str) {
    eprintln!("{} {}", "Warning:".yellow(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "Error:".red(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "Info:".blue(), message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparison_labels() {
        let periods = vec![
            Period::from_ymd(2024, 1).unwrap(),
            Period::from_ymd(2024, 2).unwrap(),
            Period::from_ymd(2024, 3).unwrap(),
        ];
        assert_eq!(
            comparison_labels(&periods),
            ("February".to_string(), "March".to_string())
        );
        assert_eq!(
            comparison_labels(&periods[..1]),
            ("-".to_string(), "January".to_string())
        );
        assert_eq!(comparison_labels(&[]), ("-".to_string(), "-".to_string()));
    }

    #[test]
    fn test_difference_cell_text() {
        let cell = difference_cell(12.5, ChangeDirection::Increase);
        assert_eq!(cell.content(), "+12.50");
        let cell = difference_cell(-3.0, ChangeDirection::Decrease);
        assert_eq!(cell.content(), "-3.00");
    }
}
