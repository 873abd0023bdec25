use chrono::NaiveDate;

use expert_quant::model::{BenchmarkRow, ReturnRow};
use expert_quant::store::returns::{cap_weighted_returns, derive_benchmarks};
use expert_quant::store::ReturnStore;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn row(name: &str, time: NaiveDate, year: i32, week: u32, ret: f64, cap: f64) -> ReturnRow {
    ReturnRow {
        name: name.to_string(),
        time,
        year,
        week,
        daily_ret: ret,
        market_cap: cap,
    }
}

#[test]
fn asset_week_is_ordered_by_time() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = ReturnStore::open(&dir.path().join("returns.sqlite")).unwrap();

    store
        .insert_returns(&[
            row("bitcoin", date(2024, 1, 3), 2024, 1, 0.03, 1e9),
            row("bitcoin", date(2024, 1, 1), 2024, 1, 0.01, 1e9),
            row("bitcoin", date(2024, 1, 2), 2024, 1, 0.02, 1e9),
            row("ethereum", date(2024, 1, 1), 2024, 1, 0.04, 5e8),
            row("bitcoin", date(2024, 1, 8), 2024, 2, 0.05, 1e9),
        ])
        .unwrap();

    let rows = store.asset_week("bitcoin", 2024, 1).unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows.windows(2).all(|w| w[0].time < w[1].time));
    assert!((rows[0].daily_ret - 0.01).abs() < 1e-12);

    assert!(store.asset_week("bitcoin", 2024, 3).unwrap().is_empty());
    assert!(store.asset_week("dogecoin", 2024, 1).unwrap().is_empty());
}

#[test]
fn reinserting_a_row_overwrites_it() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = ReturnStore::open(&dir.path().join("returns.sqlite")).unwrap();

    let day = date(2024, 1, 1);
    store
        .insert_returns(&[row("bitcoin", day, 2024, 1, 0.01, 1e9)])
        .unwrap();
    store
        .insert_returns(&[row("bitcoin", day, 2024, 1, 0.09, 2e9)])
        .unwrap();

    let rows = store.asset_week("bitcoin", 2024, 1).unwrap();
    assert_eq!(rows.len(), 1);
    assert!((rows[0].daily_ret - 0.09).abs() < 1e-12);
    assert!((rows[0].market_cap - 2e9).abs() < 1.0);
}

#[test]
fn benchmarks_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = ReturnStore::open(&dir.path().join("returns.sqlite")).unwrap();

    let rows = vec![
        BenchmarkRow {
            time: date(2024, 1, 2),
            cmkt: 0.01,
            btc: 0.02,
            eth: 0.03,
            one_n: 0.04,
        },
        BenchmarkRow {
            time: date(2024, 1, 1),
            cmkt: -0.01,
            btc: -0.02,
            eth: -0.03,
            one_n: -0.04,
        },
    ];
    store.insert_benchmarks(&rows).unwrap();

    let loaded = store.benchmarks().unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].time, date(2024, 1, 1));
    assert!((loaded[1].cmkt - 0.01).abs() < 1e-12);
}

#[test]
fn cap_weighted_returns_weight_by_market_cap() {
    let day = date(2024, 1, 1);
    let rows = vec![
        row("bitcoin", day, 2024, 1, 0.1, 3e9),
        row("ethereum", day, 2024, 1, 0.2, 1e9),
    ];
    let series = cap_weighted_returns(&rows);
    assert_eq!(series.len(), 1);
    assert!((series[0].1 - 0.125).abs() < 1e-12);
}

#[test]
fn derive_benchmarks_builds_all_series() {
    let day = date(2024, 1, 1);
    let rows = vec![
        row("bitcoin", day, 2024, 1, 0.1, 3e9),
        row("ethereum", day, 2024, 1, 0.2, 1e9),
        row("solana", day, 2024, 1, 0.3, 1e9),
    ];
    let benchmarks = derive_benchmarks(&rows);
    assert_eq!(benchmarks.len(), 1);
    let b = benchmarks[0];
    // (0.1*3 + 0.2*1 + 0.3*1) / 5
    assert!((b.cmkt - 0.16).abs() < 1e-12);
    assert!((b.one_n - 0.2).abs() < 1e-12);
    assert!((b.btc - 0.1).abs() < 1e-12);
    assert!((b.eth - 0.2).abs() < 1e-12);
}
