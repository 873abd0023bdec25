use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{PortCol, WideRow};

#[derive(Debug, Clone, Copy)]
pub struct EvalOptions {
    /// Compound daily rows into one (year, week) observation before stats.
    pub weekly_compound: bool,
    /// Scale the Sharpe ratio by sqrt(52) for weekly observations.
    pub annualize_sharpe: bool,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            weekly_compound: true,
            annualize_sharpe: true,
        }
    }
}

/// Performance summary of one return column. Degenerate series (zero std,
/// single observation) carry NaN/inf through rather than erroring.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PerfStat {
    pub avg: f64,
    pub std: f64,
    pub t_stat: f64,
    pub sharpe: f64,
    pub significance: &'static str,
    pub cumulative_return: f64,
}

/// Classic significance cutoffs on the t statistic.
pub fn significance(t: f64) -> &'static str {
    if t.abs() > 2.58 {
        "***"
    } else if t.abs() > 1.96 {
        "**"
    } else if t.abs() > 1.64 {
        "*"
    } else {
        ""
    }
}

/// Evaluate the selected columns of a wide return table. Output preserves
/// the column order of the request.
pub fn evaluate(
    rows: &[WideRow],
    columns: &[PortCol],
    opts: &EvalOptions,
) -> Vec<(PortCol, PerfStat)> {
    columns
        .iter()
        .map(|&col| {
            let series = column_series(rows, col, opts.weekly_compound);
            (col, series_stats(&series, opts.annualize_sharpe))
        })
        .collect()
}

/// Compound daily returns within each (year, week) into one observation.
pub fn weekly_compound(rows: &[WideRow], col: PortCol) -> Vec<f64> {
    let mut weeks: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    for row in rows {
        let acc = weeks.entry((row.year, row.week)).or_insert(1.0);
        *acc *= 1.0 + row.column(col);
    }
    weeks.into_values().map(|gross| gross - 1.0).collect()
}

fn column_series(rows: &[WideRow], col: PortCol, weekly: bool) -> Vec<f64> {
    if weekly {
        weekly_compound(rows, col)
    } else {
        rows.iter().map(|r| r.column(col)).collect()
    }
}

fn series_stats(series: &[f64], annualize_sharpe: bool) -> PerfStat {
    let n = series.len() as f64;
    let avg = if series.is_empty() {
        f64::NAN
    } else {
        series.iter().sum::<f64>() / n
    };
    let std = if series.len() < 2 {
        f64::NAN
    } else {
        let var = series.iter().map(|r| (r - avg) * (r - avg)).sum::<f64>() / (n - 1.0);
        var.sqrt()
    };
    let t_stat = avg / (std / n.sqrt());
    let sharpe = if annualize_sharpe {
        avg / std * 52f64.sqrt()
    } else {
        avg / std
    };
    let cumulative_return = series.iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0;

    PerfStat {
        avg,
        std,
        t_stat,
        sharpe,
        significance: significance(t_stat),
        cumulative_return,
    }
}
