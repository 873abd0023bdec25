use chrono::NaiveDate;

use expert_quant::eval::performance::{evaluate, significance, weekly_compound, EvalOptions};
use expert_quant::model::{PortCol, WideRow};

fn wide_row(time: NaiveDate, year: i32, week: u32, long: f64) -> WideRow {
    let mut row = WideRow::zero(time);
    row.year = year;
    row.week = week;
    row.long = long;
    row
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn weekly_compounding_round_trips() {
    let daily = [0.01, -0.02, 0.03];
    let rows: Vec<WideRow> = daily
        .iter()
        .enumerate()
        .map(|(i, &r)| wide_row(date(2024, 1, 1 + i as u32), 2024, 1, r))
        .collect();

    let weekly = weekly_compound(&rows, PortCol::Long);
    assert_eq!(weekly.len(), 1);

    let gross: f64 = daily.iter().map(|r| 1.0 + r).product();
    assert!((1.0 + weekly[0] - gross).abs() < 1e-12);
}

#[test]
fn weekly_compounding_groups_by_year_and_week() {
    let rows = vec![
        wide_row(date(2024, 1, 1), 2024, 1, 0.01),
        wide_row(date(2024, 1, 2), 2024, 1, 0.01),
        wide_row(date(2024, 1, 8), 2024, 2, 0.05),
    ];
    let weekly = weekly_compound(&rows, PortCol::Long);
    assert_eq!(weekly.len(), 2);
    assert!((weekly[0] - (1.01f64 * 1.01 - 1.0)).abs() < 1e-12);
    assert!((weekly[1] - 0.05).abs() < 1e-12);
}

#[test]
fn evaluate_reports_classic_statistics() {
    // One row per week: weekly compounding keeps the values as-is.
    let rows: Vec<WideRow> = [0.01, 0.02, 0.03]
        .iter()
        .enumerate()
        .map(|(i, &r)| wide_row(date(2024, 1, 1 + 7 * i as u32), 2024, 1 + i as u32, r))
        .collect();

    let opts = EvalOptions {
        weekly_compound: true,
        annualize_sharpe: false,
    };
    let stats = evaluate(&rows, &[PortCol::Long], &opts);
    let (col, s) = &stats[0];
    assert_eq!(*col, PortCol::Long);

    assert!((s.avg - 0.02).abs() < 1e-12);
    assert!((s.std - 0.01).abs() < 1e-12);
    let expected_t = 0.02 / (0.01 / 3f64.sqrt());
    assert!((s.t_stat - expected_t).abs() < 1e-9);
    assert_eq!(s.significance, "***");
    assert!((s.sharpe - 2.0).abs() < 1e-12);

    let expected_cum = 1.01f64 * 1.02 * 1.03 - 1.0;
    assert!((s.cumulative_return - expected_cum).abs() < 1e-12);
}

#[test]
fn annualized_sharpe_scales_by_sqrt_52() {
    let rows: Vec<WideRow> = [0.01, 0.02, 0.03]
        .iter()
        .enumerate()
        .map(|(i, &r)| wide_row(date(2024, 1, 1 + 7 * i as u32), 2024, 1 + i as u32, r))
        .collect();

    let plain = evaluate(
        &rows,
        &[PortCol::Long],
        &EvalOptions {
            weekly_compound: true,
            annualize_sharpe: false,
        },
    );
    let annualized = evaluate(
        &rows,
        &[PortCol::Long],
        &EvalOptions {
            weekly_compound: true,
            annualize_sharpe: true,
        },
    );
    assert!((annualized[0].1.sharpe - plain[0].1.sharpe * 52f64.sqrt()).abs() < 1e-9);
}

#[test]
fn zero_std_propagates_infinity() {
    let rows = vec![
        wide_row(date(2024, 1, 1), 2024, 1, 0.01),
        wide_row(date(2024, 1, 8), 2024, 2, 0.01),
    ];
    let stats = evaluate(
        &rows,
        &[PortCol::Long],
        &EvalOptions {
            weekly_compound: true,
            annualize_sharpe: false,
        },
    );
    let s = stats[0].1;
    assert_eq!(s.std, 0.0);
    assert!(s.t_stat.is_infinite());
    assert!(s.sharpe.is_infinite());
}

#[test]
fn single_observation_propagates_nan() {
    let rows = vec![wide_row(date(2024, 1, 1), 2024, 1, 0.01)];
    let stats = evaluate(
        &rows,
        &[PortCol::Long],
        &EvalOptions {
            weekly_compound: true,
            annualize_sharpe: false,
        },
    );
    let s = stats[0].1;
    assert!(s.std.is_nan());
    assert!(s.t_stat.is_nan());
}

#[test]
fn empty_table_propagates_nan() {
    let stats = evaluate(&[], &[PortCol::Long], &EvalOptions::default());
    assert!(stats[0].1.avg.is_nan());
    assert!(stats[0].1.cumulative_return.abs() < 1e-12);
}

#[test]
fn significance_cutoffs() {
    assert_eq!(significance(3.0), "***");
    assert_eq!(significance(-3.0), "***");
    assert_eq!(significance(2.0), "**");
    assert_eq!(significance(1.7), "*");
    assert_eq!(significance(1.0), "");
    assert_eq!(significance(1.64), "");
    assert_eq!(significance(1.96), "*");
}
