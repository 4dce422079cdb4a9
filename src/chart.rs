use crate::error::Result;
use crate::helpers::push_line;
use crate::models::BucketedSeries;
use std::fs;
use std::path::{Path, PathBuf};

pub const CHART_FILE_NAME: &str = "monthly_total_costs.svg";

const WIDTH: f64 = 960.0;
const HEIGHT: f64 = 540.0;
const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 50.0;
const PLOT_HEIGHT: f64 = 320.0;
const LEGEND_COLUMNS: usize = 3;

// matplotlib's tab20, even entries first
const PALETTE: [&str; 20] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf", "#aec7e8", "#ffbb78", "#98df8a", "#ff9896", "#c5b0d5", "#c49c94",
    "#f7b6d2", "#c7c7c7", "#dbdb8d", "#9edae5",
];

/// Render the bucketed series as a stacked bar chart, one bar per period.
///
/// Buckets are stacked in ranking order with Others on top. Negative amounts
/// (credits) are drawn as zero height.
pub fn render_stacked_bars(series: &BucketedSeries) -> String {
    let buckets: Vec<_> = series.buckets().collect();
    let period_count = series.periods.len();

    let stack_heights: Vec<f64> = (0..period_count)
        .map(|i| {
            buckets
                .iter()
                .map(|b| b.costs.get(i).copied().unwrap_or(0.0).max(0.0))
                .sum()
        })
        .collect();
    let max_total = stack_heights.iter().copied().fold(0.0_f64, f64::max);
    let scale = if max_total > 0.0 {
        PLOT_HEIGHT / max_total
    } else {
        0.0
    };

    let plot_width = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let slot = if period_count > 0 {
        plot_width / period_count as f64
    } else {
        plot_width
    };
    let bar_width = slot * 0.6;
    let baseline = MARGIN_TOP + PLOT_HEIGHT;

    let mut svg = String::new();
    push_line(
        &mut svg,
        &format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" font-family="sans-serif" font-size="12">"#
        ),
    );
    push_line(&mut svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
    push_line(
        &mut svg,
        &format!(
            r#"<text x="{}" y="28" text-anchor="middle" font-size="18">Monthly Total Costs</text>"#,
            WIDTH / 2.0
        ),
    );

    // grid and y axis labels
    for step in 0..=4 {
        let value = max_total * step as f64 / 4.0;
        let y = baseline - value * scale;
        push_line(
            &mut svg,
            &format!(
                r##"<line x1="{MARGIN_LEFT}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}" stroke="#dddddd"/>"##,
                WIDTH - MARGIN_RIGHT
            ),
        );
        push_line(
            &mut svg,
            &format!(
                r#"<text x="{:.1}" y="{:.1}" text-anchor="end">{:.0}</text>"#,
                MARGIN_LEFT - 6.0,
                y + 4.0,
                value
            ),
        );
    }

    for (i, period) in series.periods.iter().enumerate() {
        let x = MARGIN_LEFT + slot * i as f64 + (slot - bar_width) / 2.0;
        let mut bottom = baseline;
        for (b, bucket) in buckets.iter().enumerate() {
            let height = bucket.costs.get(i).copied().unwrap_or(0.0).max(0.0) * scale;
            if height <= 0.0 {
                continue;
            }
            bottom -= height;
            push_line(
                &mut svg,
                &format!(
                    r#"<rect x="{x:.1}" y="{bottom:.1}" width="{bar_width:.1}" height="{height:.1}" fill="{}"><title>{}: {:.2}</title></rect>"#,
                    PALETTE[b % PALETTE.len()],
                    escape(&bucket.name),
                    bucket.costs[i]
                ),
            );
        }
        push_line(
            &mut svg,
            &format!(
                r#"<text x="{:.1}" y="{:.1}" text-anchor="middle">{}</text>"#,
                x + bar_width / 2.0,
                baseline + 18.0,
                period.key()
            ),
        );
    }

    push_line(
        &mut svg,
        &format!(
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle">Month</text>"#,
            MARGIN_LEFT + plot_width / 2.0,
            baseline + 40.0
        ),
    );
    push_line(
        &mut svg,
        &format!(
            r#"<text x="18" y="{:.1}" text-anchor="middle" transform="rotate(-90 18 {:.1})">Total Cost (USD)</text>"#,
            MARGIN_TOP + PLOT_HEIGHT / 2.0,
            MARGIN_TOP + PLOT_HEIGHT / 2.0
        ),
    );

    // legend below the plot
    let column_width = plot_width / LEGEND_COLUMNS as f64;
    for (b, bucket) in buckets.iter().enumerate() {
        let x = MARGIN_LEFT + column_width * (b % LEGEND_COLUMNS) as f64;
        let y = baseline + 65.0 + 20.0 * (b / LEGEND_COLUMNS) as f64;
        push_line(
            &mut svg,
            &format!(
                r#"<rect x="{x:.1}" y="{:.1}" width="12" height="12" fill="{}"/><text x="{:.1}" y="{y:.1}">{}</text>"#,
                y - 10.0,
                PALETTE[b % PALETTE.len()],
                x + 18.0,
                escape(&bucket.name)
            ),
        );
    }

    svg.push_str("</svg>\n");
    svg
}

/// Write the chart into `directory` and return its path
pub fn write_chart(series: &BucketedSeries, directory: &Path) -> Result<PathBuf> {
    fs::create_dir_all(directory)?;
    let path = directory.join(CHART_FILE_NAME);
    fs::write(&path, render_stacked_bars(series))?;
    tracing::info!(path = %path.display(), "wrote cost chart");
    Ok(path)
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
