use crate::models::{BreakdownOutcome, BucketedSeries, CostReport, TotalComparison};
use anyhow::Result;
use csv::Writer;
use std::fs::File;
use std::path::Path;

pub fn export_chart_to_csv(series: &BucketedSeries, path: &Path) -> Result<()> {
    let mut wtr = Writer::from_writer(File::create(path)?);

    // Write header
    let mut header = vec!["Service".to_string()];
    header.extend(series.periods.iter().map(|p| p.key()));
    wtr.write_record(&header)?;

    // Write data
    for bucket in series.buckets() {
        let mut row = vec![bucket.name.clone()];
        row.extend(bucket.costs.iter().map(|cost| format!("{:.6}", cost)));
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn export_totals_to_csv(totals: &TotalComparison, path: &Path) -> Result<()> {
    let mut wtr = Writer::from_writer(File::create(path)?);

    wtr.write_record(["Period", "Total Cost USD"])?;
    for (period, total) in totals.periods.iter().zip(&totals.totals) {
        wtr.write_record(&[period.key(), format!("{:.6}", total)])?;
    }
    if let Some(difference) = totals.difference {
        wtr.write_record(&["Difference".to_string(), format!("{:.6}", difference)])?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn export_services_to_csv(report: &CostReport, path: &Path) -> Result<()> {
    let mut wtr = Writer::from_writer(File::create(path)?);

    wtr.write_record([
        "Service",
        "Previous Cost USD",
        "Current Cost USD",
        "Difference USD",
    ])?;

    for record in &report.services {
        wtr.write_record(&[
            record.name.clone(),
            format!("{:.6}", record.previous),
            format!("{:.6}", record.current),
            format!("{:.6}", record.difference),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// One row per breakdown record; failed breakdowns are left out
pub fn export_breakdowns_to_csv(report: &CostReport, path: &Path) -> Result<()> {
    let mut wtr = Writer::from_writer(File::create(path)?);

    wtr.write_record([
        "Service",
        "Dimension",
        "Key",
        "Label",
        "First Cost USD",
        "Second Cost USD",
        "Difference USD",
    ])?;

    for breakdown in &report.breakdowns {
        for table in &breakdown.tables {
            let BreakdownOutcome::Ok { records } = &table.outcome else {
                continue;
            };
            for record in records {
                wtr.write_record(&[
                    breakdown.service.clone(),
                    table.dimension.to_string(),
                    record.key.clone(),
                    record.label.clone(),
                    format!("{:.6}", record.first),
                    format!("{:.6}", record.second),
                    format!("{:.6}", record.difference),
                ])?;
            }
        }
    }

    wtr.flush()?;
    Ok(())
}
