use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::{params, Connection};

use crate::model::{BenchmarkRow, ReturnRow};

/// SQLite-backed store for realized daily returns and benchmark series.
pub struct ReturnStore {
    conn: Connection,
}

impl ReturnStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS daily_returns (
                name TEXT NOT NULL,
                time TEXT NOT NULL,
                year INTEGER NOT NULL,
                week INTEGER NOT NULL,
                daily_ret REAL NOT NULL,
                market_cap REAL NOT NULL,
                PRIMARY KEY(name, time)
            );

            CREATE INDEX IF NOT EXISTS idx_daily_returns_yw
                ON daily_returns(year, week, name);

            CREATE TABLE IF NOT EXISTS benchmark_returns (
                time TEXT NOT NULL PRIMARY KEY,
                cmkt REAL NOT NULL,
                btc REAL NOT NULL,
                eth REAL NOT NULL,
                one_n REAL NOT NULL
            );
            "#,
        )?;
        Ok(Self { conn })
    }

    pub fn insert_returns(&mut self, rows: &[ReturnRow]) -> Result<()> {
        let tx = self.conn.transaction()?;
        for row in rows {
            tx.execute(
                r#"
                INSERT INTO daily_returns (name, time, year, week, daily_ret, market_cap)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(name, time) DO UPDATE SET
                    year = excluded.year,
                    week = excluded.week,
                    daily_ret = excluded.daily_ret,
                    market_cap = excluded.market_cap
                "#,
                params![
                    row.name,
                    row.time.to_string(),
                    row.year,
                    row.week,
                    row.daily_ret,
                    row.market_cap,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn insert_benchmarks(&mut self, rows: &[BenchmarkRow]) -> Result<()> {
        let tx = self.conn.transaction()?;
        for row in rows {
            tx.execute(
                r#"
                INSERT INTO benchmark_returns (time, cmkt, btc, eth, one_n)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(time) DO UPDATE SET
                    cmkt = excluded.cmkt,
                    btc = excluded.btc,
                    eth = excluded.eth,
                    one_n = excluded.one_n
                "#,
                params![
                    row.time.to_string(),
                    row.cmkt,
                    row.btc,
                    row.eth,
                    row.one_n,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Return rows for one asset-week, ordered by time.
    pub fn asset_week(&self, name: &str, year: i32, week: u32) -> Result<Vec<ReturnRow>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT name, time, year, week, daily_ret, market_cap
            FROM daily_returns
            WHERE name = ?1 AND year = ?2 AND week = ?3
            ORDER BY time ASC
            "#,
        )?;
        let rows = stmt.query_map(params![name, year, week], row_from_sql)?;
        collect_rows(rows)
    }

    pub fn all_returns(&self) -> Result<Vec<ReturnRow>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT name, time, year, week, daily_ret, market_cap
            FROM daily_returns
            ORDER BY time ASC, name ASC
            "#,
        )?;
        let rows = stmt.query_map([], row_from_sql)?;
        collect_rows(rows)
    }

    pub fn benchmarks(&self) -> Result<Vec<BenchmarkRow>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT time, cmkt, btc, eth, one_n
            FROM benchmark_returns
            ORDER BY time ASC
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, f64>(4)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (time, cmkt, btc, eth, one_n) = row?;
            out.push(BenchmarkRow {
                time: parse_date(&time)?,
                cmkt,
                btc,
                eth,
                one_n,
            });
        }
        Ok(out)
    }
}

type SqlReturnRow = (String, String, i32, u32, f64, f64);

fn row_from_sql(row: &rusqlite::Row<'_>) -> rusqlite::Result<SqlReturnRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn collect_rows(
    rows: impl Iterator<Item = rusqlite::Result<SqlReturnRow>>,
) -> Result<Vec<ReturnRow>> {
    let mut out = Vec::new();
    for row in rows {
        let (name, time, year, week, daily_ret, market_cap) = row?;
        out.push(ReturnRow {
            name,
            time: parse_date(&time)?,
            year,
            week,
            daily_ret,
            market_cap,
        });
    }
    Ok(out)
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    Ok(NaiveDate::parse_from_str(s, "%Y-%m-%d")?)
}

/// Cap-weighted market return per date from raw daily rows, for deriving a
/// CMKT series when the benchmark table does not already carry one.
pub fn cap_weighted_returns(rows: &[ReturnRow]) -> Vec<(NaiveDate, f64)> {
    let mut per_date: BTreeMap<NaiveDate, (f64, f64)> = BTreeMap::new();
    for row in rows {
        if !row.daily_ret.is_finite() || !row.market_cap.is_finite() || row.market_cap <= 0.0 {
            continue;
        }
        let cell = per_date.entry(row.time).or_insert((0.0, 0.0));
        cell.0 += row.daily_ret * row.market_cap;
        cell.1 += row.market_cap;
    }
    per_date
        .into_iter()
        .map(|(time, (ret_w, w))| (time, ret_w / w))
        .collect()
}

/// Build the full benchmark table from raw daily rows: cap-weighted CMKT,
/// equal-weighted 1/N, and the bitcoin/ethereum single-asset series.
pub fn derive_benchmarks(rows: &[ReturnRow]) -> Vec<BenchmarkRow> {
    let cmkt: BTreeMap<NaiveDate, f64> = cap_weighted_returns(rows).into_iter().collect();

    let mut one_n: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    let mut btc: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    let mut eth: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for row in rows {
        if !row.daily_ret.is_finite() {
            continue;
        }
        let cell = one_n.entry(row.time).or_insert((0.0, 0));
        cell.0 += row.daily_ret;
        cell.1 += 1;
        match row.name.as_str() {
            "bitcoin" => {
                btc.insert(row.time, row.daily_ret);
            }
            "ethereum" => {
                eth.insert(row.time, row.daily_ret);
            }
            _ => {}
        }
    }

    cmkt.into_iter()
        .map(|(time, cmkt)| BenchmarkRow {
            time,
            cmkt,
            btc: btc.get(&time).copied().unwrap_or(0.0),
            eth: eth.get(&time).copied().unwrap_or(0.0),
            one_n: one_n
                .get(&time)
                .map(|(sum, n)| sum / *n as f64)
                .unwrap_or(0.0),
        })
        .collect()
}
