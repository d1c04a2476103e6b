//! SVG line plots written next to the CSV reports.
//!
//! Lines only, no captions or axis labels, so no font backend is needed.

use std::fmt::Display;
use std::path::Path;

use plotters::prelude::*;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::MacrossError;
use crate::domain::signal::IndicatorRow;

pub const EQUITY_PLOT_FILE: &str = "equity.svg";
pub const CHART_PLOT_FILE: &str = "chart.svg";

const PLOT_SIZE: (u32, u32) = (1280, 720);
const BENCHMARK_GREY: RGBColor = RGBColor(128, 128, 128);
const SHORT_MA_AMBER: RGBColor = RGBColor(200, 160, 0);

/// Strategy equity in green against buy-and-hold in grey.
pub fn plot_equity(result: &BacktestResult, path: &Path) -> Result<(), MacrossError> {
    let strategy = result.equity_curve();
    let benchmark = result.benchmark_curve();
    draw_lines(
        path,
        &[(strategy.as_slice(), GREEN), (benchmark.as_slice(), BENCHMARK_GREY)],
    )
}

/// Close in blue, short MA in amber, long MA in magenta. Rows still warming
/// up are left out.
pub fn plot_chart(rows: &[IndicatorRow], path: &Path) -> Result<(), MacrossError> {
    let mut close = Vec::with_capacity(rows.len());
    let mut short = Vec::with_capacity(rows.len());
    let mut long = Vec::with_capacity(rows.len());
    for row in rows {
        if let Some((s, l)) = row.mas() {
            close.push(row.bar.close);
            short.push(s);
            long.push(l);
        }
    }
    draw_lines(
        path,
        &[
            (close.as_slice(), BLUE),
            (short.as_slice(), SHORT_MA_AMBER),
            (long.as_slice(), MAGENTA),
        ],
    )
}

/// Nothing is written when every series is empty.
fn draw_lines(path: &Path, series: &[(&[f64], RGBColor)]) -> Result<(), MacrossError> {
    let len = series.iter().map(|(values, _)| values.len()).max().unwrap_or(0);
    if len == 0 {
        return Ok(());
    }
    let (lo, hi) = value_range(series.iter().flat_map(|(values, _)| values.iter().copied()));

    let root = SVGBackend::new(path, PLOT_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .build_cartesian_2d(0usize..len, lo..hi)
        .map_err(plot_err)?;

    for (values, color) in series {
        chart
            .draw_series(LineSeries::new(values.iter().copied().enumerate(), color))
            .map_err(plot_err)?;
    }

    root.present().map_err(plot_err)?;
    Ok(())
}

/// Finite min/max with 5% headroom; a flat series still gets a non-empty range.
fn value_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if lo > hi {
        return (0.0, 1.0);
    }
    let pad = ((hi - lo) * 0.05).max(hi.abs().max(1.0) * 1e-3);
    (lo - pad, hi + pad)
}

fn plot_err<E: Display>(e: E) -> MacrossError {
    MacrossError::Report {
        reason: format!("plot error: {e}"),
    }
}
