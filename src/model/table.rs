use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::model::label::Strength;

/// Column selector over the wide return table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortCol {
    Bucket(Strength),
    Long,
    Hml,
    Cmkt,
    Btc,
    Eth,
    OneN,
}

impl PortCol {
    /// Quintile columns plus HML, the default evaluation set.
    pub fn ap_columns() -> Vec<PortCol> {
        let mut cols: Vec<PortCol> = Strength::ALL.into_iter().map(PortCol::Bucket).collect();
        cols.push(PortCol::Hml);
        cols
    }

    /// Long portfolio against the benchmark set.
    pub fn benchmark_columns() -> Vec<PortCol> {
        vec![
            PortCol::Long,
            PortCol::Cmkt,
            PortCol::OneN,
            PortCol::Btc,
            PortCol::Eth,
        ]
    }
}

impl fmt::Display for PortCol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortCol::Bucket(s) => f.write_str(s.as_str()),
            PortCol::Long => f.write_str("Long"),
            PortCol::Hml => f.write_str("HML"),
            PortCol::Cmkt => f.write_str("CMKT"),
            PortCol::Btc => f.write_str("BTC"),
            PortCol::Eth => f.write_str("ETH"),
            PortCol::OneN => f.write_str("1/N"),
        }
    }
}

/// One date of a pivoted quantile-portfolio return table: five bucket
/// returns, the derived Long/HML spreads, and the joined benchmarks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WideRow {
    pub time: NaiveDate,
    pub year: i32,
    pub week: u32,
    pub buckets: [f64; 5],
    pub long: f64,
    pub hml: f64,
    pub cmkt: f64,
    pub btc: f64,
    pub eth: f64,
    pub one_n: f64,
}

impl WideRow {
    pub fn zero(time: NaiveDate) -> Self {
        let iso = time.iso_week();
        Self {
            time,
            year: iso.year(),
            week: iso.week(),
            buckets: [0.0; 5],
            long: 0.0,
            hml: 0.0,
            cmkt: 0.0,
            btc: 0.0,
            eth: 0.0,
            one_n: 0.0,
        }
    }

    pub fn column(&self, col: PortCol) -> f64 {
        match col {
            PortCol::Bucket(s) => self.buckets[s.index()],
            PortCol::Long => self.long,
            PortCol::Hml => self.hml,
            PortCol::Cmkt => self.cmkt,
            PortCol::Btc => self.btc,
            PortCol::Eth => self.eth,
            PortCol::OneN => self.one_n,
        }
    }
}
