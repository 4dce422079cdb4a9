use crate::domain::{ChangeDirection, Period};
use crate::error::Result;
use crate::helpers::{format_signed_usd, format_usd, push_line};
use crate::models::{BreakdownOutcome, BreakdownRecord, CostReport};
use std::fs;
use std::path::{Path, PathBuf};

pub const DOCUMENT_FILE_NAME: &str = "AWS_Cost_Analysis_Report.md";

fn change_marker(direction: ChangeDirection) -> &'static str {
    match direction {
        ChangeDirection::Increase => " ▲",
        ChangeDirection::Decrease => " ▼",
        ChangeDirection::Unchanged => "",
    }
}

fn table_text(text: &str) -> String {
    text.replace('|', "\\|")
}

fn comparison_headers(periods: &[Period]) -> (String, String) {
    match periods {
        [.., previous, current] => (previous.label(), current.label()),
        [only] => (String::new(), only.label()),
        [] => (String::new(), String::new()),
    }
}

/// Render the report as Markdown. `chart` is linked relative to the document
pub fn render_markdown(report: &CostReport, chart: Option<&Path>) -> String {
    let mut doc = String::new();
    push_line(&mut doc, "# AWS Cost Analysis\n");

    push_line(&mut doc, "## Total Service Cost Graph\n");
    if let Some(chart) = chart {
        push_line(&mut doc, &format!("![Monthly Total Costs]({})\n", chart.display()));
    }
    push_line(
        &mut doc,
        &format!(
            "Monthly Total Costs for the last {} months.\n",
            report.periods.len()
        ),
    );

    push_line(&mut doc, "## Total Cost Comparison\n");
    let totals = &report.totals;
    let mut header = String::from("| Total Cost |");
    let mut divider = String::from("|---|");
    let mut row = String::from("| Total |");
    for (period, total) in totals.periods.iter().zip(&totals.totals) {
        header.push_str(&format!(" {} |", period.label()));
        divider.push_str("---:|");
        row.push_str(&format!(" {} |", format_usd(*total)));
    }
    header.push_str(" Difference (USD) |");
    divider.push_str("---:|");
    match (totals.difference, totals.direction) {
        (Some(difference), Some(direction)) => row.push_str(&format!(
            " {}{} |",
            format_signed_usd(difference),
            change_marker(direction)
        )),
        _ => row.push_str(" n/a |"),
    }
    push_line(&mut doc, &format!("{}\n{}\n{}\n", header, divider, row));

    let (previous, current) = comparison_headers(&report.periods);

    push_line(&mut doc, "## Top Service Cost Comparison\n");
    if report.services.is_empty() {
        push_line(&mut doc, "No services to compare.\n");
    } else {
        push_line(&mut doc, &table_header("Service", &previous, &current));
        for record in &report.services {
            push_line(
                &mut doc,
                &table_row(
                    &record.name,
                    record.previous,
                    record.current,
                    record.difference,
                    record.direction,
                ),
            );
        }
        doc.push('\n');
    }

    push_line(&mut doc, "## Cost Increase Breakdown\n");
    if report.breakdowns.is_empty() {
        push_line(&mut doc, "No service grew past the reporting thresholds.\n");
    }
    for breakdown in &report.breakdowns {
        push_line(
            &mut doc,
            &format!(
                "### {} ({})\n",
                breakdown.service,
                format_signed_usd(breakdown.difference)
            ),
        );
        for table in &breakdown.tables {
            push_line(&mut doc, &format!("#### By {}\n", table.dimension));
            match &table.outcome {
                BreakdownOutcome::Ok { records } if records.is_empty() => {
                    push_line(&mut doc, "No rows above the minimum cost.\n");
                }
                BreakdownOutcome::Ok { records } => {
                    write_breakdown_table(&mut doc, table.dimension.name(), &previous, &current, records);
                }
                BreakdownOutcome::Failed { message } => {
                    push_line(&mut doc, &format!("_Breakdown unavailable: {}_\n", message));
                }
            }
        }
    }

    doc
}

fn table_header(column: &str, previous: &str, current: &str) -> String {
    format!(
        "| {} | {} (USD) | {} (USD) | Difference (USD) |\n|---|---:|---:|---:|",
        column, previous, current
    )
}

fn table_row(
    name: &str,
    previous: f64,
    current: f64,
    difference: f64,
    direction: ChangeDirection,
) -> String {
    format!(
        "| {} | {} | {} | {}{} |",
        table_text(name),
        format_usd(previous),
        format_usd(current),
        format_signed_usd(difference),
        change_marker(direction)
    )
}

fn write_breakdown_table(
    doc: &mut String,
    column: &str,
    previous: &str,
    current: &str,
    records: &[BreakdownRecord],
) {
    push_line(doc, &table_header(column, previous, current));
    for record in records {
        push_line(
            doc,
            &table_row(
                &record.label,
                record.first,
                record.second,
                record.difference,
                record.direction,
            ),
        );
    }
    doc.push('\n');
}

/// Write the Markdown report into `directory` and return its path
pub fn write_document(report: &CostReport, chart: Option<&Path>, directory: &Path) -> Result<PathBuf> {
    fs::create_dir_all(directory)?;
    let path = directory.join(DOCUMENT_FILE_NAME);
    // link the chart relative to the document when they share a directory
    let chart_link = chart.map(|c| c.strip_prefix(directory).unwrap_or(c));
    fs::write(&path, render_markdown(report, chart_link))?;
    tracing::info!(path = %path.display(), "wrote report document");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GroupingDimension;
    use crate::models::{
        BreakdownTable, BucketedSeries, DiffRecord, ServiceBreakdown, TotalComparison,
    };

    fn month(m: u32) -> Period {
        Period::from_ymd(2024, m).unwrap()
    }

    fn report() -> CostReport {
        CostReport {
            periods: vec![month(1), month(2)],
            chart: BucketedSeries::default(),
            totals: TotalComparison {
                periods: vec![month(1), month(2)],
                totals: vec![100.0, 110.0],
                difference: Some(10.0),
                direction: Some(ChangeDirection::Increase),
            },
            services: vec![DiffRecord {
                name: "EC2".to_string(),
                previous: 100.0,
                current: 110.0,
                difference: 10.0,
                direction: ChangeDirection::Increase,
            }],
            breakdowns: vec![ServiceBreakdown {
                service: "EC2".to_string(),
                difference: 10.0,
                tables: vec![
                    BreakdownTable {
                        dimension: GroupingDimension::CostCenter,
                        outcome: BreakdownOutcome::Ok {
                            records: vec![BreakdownRecord {
                                key: "CostCenter$".to_string(),
                                label: "No tag key: CostCenter".to_string(),
                                first: 100.0,
                                second: 110.0,
                                difference: 10.0,
                                direction: ChangeDirection::Increase,
                            }],
                        },
                    },
                    BreakdownTable {
                        dimension: GroupingDimension::UsageType,
                        outcome: BreakdownOutcome::Failed {
                            message: "throttled".to_string(),
                        },
                    },
                ],
            }],
        }
    }

    #[test]
    fn test_render_sections() {
        let md = render_markdown(&report(), Some(Path::new("chart.svg")));
        assert!(md.starts_with("# AWS Cost Analysis"));
        assert!(md.contains("![Monthly Total Costs](chart.svg)"));
        assert!(md.contains("| Total Cost | January | February | Difference (USD) |"));
        assert!(md.contains("| Total | 100.00 | 110.00 | +10.00 ▲ |"));
        assert!(md.contains("| Service | January (USD) | February (USD) | Difference (USD) |"));
        assert!(md.contains("| EC2 | 100.00 | 110.00 | +10.00 ▲ |"));
        assert!(md.contains("### EC2 (+10.00)"));
        assert!(md.contains("| No tag key: CostCenter | 100.00 | 110.00 | +10.00 ▲ |"));
        assert!(md.contains("_Breakdown unavailable: throttled_"));
        assert!(!md.contains("CostCenter$"));
    }

    #[test]
    fn test_render_is_deterministic() {
        assert_eq!(render_markdown(&report(), None), render_markdown(&report(), None));
    }

    #[test]
    fn test_write_document_links_chart_relatively() {
        let dir = tempfile::tempdir().unwrap();
        let chart = dir.path().join("monthly_total_costs.svg");
        let path = write_document(&report(), Some(&chart), dir.path()).unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("![Monthly Total Costs](monthly_total_costs.svg)"));
    }
}
