use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::label::Label;

/// One realized market-data day for an asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnRow {
    pub name: String,
    pub time: NaiveDate,
    pub year: i32,
    pub week: u32,
    pub daily_ret: f64,
    pub market_cap: f64,
}

/// One expert prediction for a week, before joining with return data.
/// `name` is None for market-level experts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub year: i32,
    pub week: u32,
    pub name: Option<String>,
    pub predicted: Label,
    pub truth: Label,
    /// Linearized confidence (exp of the predicted token's log-probability).
    pub lin_prob: f64,
}

/// A prediction joined with one realized return day. The week's single
/// prediction repeats across every (date, asset) row of that week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioRow {
    pub year: i32,
    pub week: u32,
    pub name: Option<String>,
    pub predicted: Label,
    pub truth: Label,
    pub lin_prob: f64,
    pub time: NaiveDate,
    pub daily_ret: f64,
    pub market_cap: f64,
}

impl PortfolioRow {
    pub fn from_parts(pred: &Prediction, ret: &ReturnRow) -> Self {
        Self {
            year: pred.year,
            week: pred.week,
            name: pred.name.clone(),
            predicted: pred.predicted,
            truth: pred.truth,
            lin_prob: pred.lin_prob,
            time: ret.time,
            daily_ret: ret.daily_ret,
            market_cap: ret.market_cap,
        }
    }

    /// Key identifying the prediction this row was expanded from.
    pub fn prediction_key(&self) -> (i32, u32, Option<&str>) {
        (self.year, self.week, self.name.as_deref())
    }
}

/// One day of the benchmark series joined onto every wide return table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRow {
    pub time: NaiveDate,
    /// Cap-weighted crypto market index return.
    pub cmkt: f64,
    pub btc: f64,
    pub eth: f64,
    /// Equal-weighted 1/N portfolio return.
    pub one_n: f64,
}
