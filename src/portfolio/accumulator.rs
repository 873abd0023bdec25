use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDate, Weekday};

use crate::error::EngineError;
use crate::eval::score::{classification_scores, Scores};
use crate::model::{
    BenchmarkRow, Component, Label, PortfolioRow, Prediction, ReturnRow, Strength, Trend,
    Weighting, WideRow,
};
use crate::portfolio::quantile;

/// Running long-format prediction/return tables per component, with quantile
/// portfolio construction on top. One instance per evaluation run, owned by
/// the replay driver.
#[derive(Debug)]
pub struct Portfolio {
    components: BTreeMap<Component, Vec<PortfolioRow>>,
    ret_tables: BTreeMap<Component, Vec<WideRow>>,
    benchmarks: Vec<BenchmarkRow>,
    rise_w: f64,
    fall_w: f64,
}

impl Portfolio {
    pub fn new(mut benchmarks: Vec<BenchmarkRow>, rise_w: f64, fall_w: f64) -> Self {
        benchmarks.sort_by_key(|b| b.time);
        Self {
            components: BTreeMap::new(),
            ret_tables: BTreeMap::new(),
            benchmarks,
            rise_w,
            fall_w,
        }
    }

    /// Clear all accumulated and derived tables. Benchmarks are static input
    /// and survive the reset. Safe to call repeatedly.
    pub fn reset(&mut self) {
        self.components.clear();
        self.ret_tables.clear();
    }

    /// Rows accumulated for a component; empty slice if never updated.
    pub fn component(&self, component: Component) -> &[PortfolioRow] {
        self.components
            .get(&component)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Wide return table derived by `asset_pricing`; empty slice if not built.
    pub fn ret_table(&self, component: Component) -> &[WideRow] {
        self.ret_tables
            .get(&component)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn tables(&self) -> &BTreeMap<Component, Vec<PortfolioRow>> {
        &self.components
    }

    pub fn rise_w(&self) -> f64 {
        self.rise_w
    }

    pub fn fall_w(&self) -> f64 {
        self.fall_w
    }

    /// Replace component tables wholesale (checkpoint restore).
    pub fn restore(&mut self, tables: BTreeMap<Component, Vec<PortfolioRow>>) {
        self.components = tables;
        for rows in self.components.values_mut() {
            rows.sort_by(|a, b| (a.time, &a.name).cmp(&(b.time, &b.name)));
        }
        self.ret_tables.clear();
    }

    /// Append one prediction joined with its realized return rows. A
    /// market-level prediction (no asset name) with no return rows is kept as
    /// a single week-dated row with NaN return; the pivot stage drops NaN
    /// returns, so such rows only ever feed label lookups and scores.
    pub fn update(&mut self, component: Component, pred: &Prediction, state_ret: &[ReturnRow]) {
        let table = self.components.entry(component).or_default();
        if state_ret.is_empty() {
            let time = NaiveDate::from_isoywd_opt(pred.year, pred.week, Weekday::Mon)
                .unwrap_or_default();
            table.push(PortfolioRow {
                year: pred.year,
                week: pred.week,
                name: pred.name.clone(),
                predicted: pred.predicted,
                truth: pred.truth,
                lin_prob: pred.lin_prob,
                time,
                daily_ret: f64::NAN,
                market_cap: f64::NAN,
            });
        } else {
            for ret in state_ret {
                table.push(PortfolioRow::from_parts(pred, ret));
            }
        }
        table.sort_by(|a, b| (a.time, &a.name).cmp(&(b.time, &b.name)));
    }

    /// Build the cross-sectional ensemble component (`CsAgg`).
    pub fn merge_cs(
        &mut self,
        ablation: Option<Component>,
        single_without_ensemble: bool,
    ) -> Result<(), EngineError> {
        let merged = self.merge_pair(
            Component::Cs,
            Component::Vision,
            Component::CsVision,
            Component::CsAgg,
            ablation,
            single_without_ensemble,
        )?;
        self.components.insert(Component::CsAgg, merged);
        Ok(())
    }

    /// Build the market ensemble component (`MktAgg`).
    pub fn merge_mkt(
        &mut self,
        ablation: Option<Component>,
        single_without_ensemble: bool,
    ) -> Result<(), EngineError> {
        let merged = self.merge_pair(
            Component::Mkt,
            Component::News,
            Component::MktNews,
            Component::MktAgg,
            ablation,
            single_without_ensemble,
        )?;
        self.components.insert(Component::MktAgg, merged);
        Ok(())
    }

    fn merge_pair(
        &self,
        left: Component,
        right: Component,
        single: Component,
        ensemble: Component,
        ablation: Option<Component>,
        single_without_ensemble: bool,
    ) -> Result<Vec<PortfolioRow>, EngineError> {
        if single_without_ensemble {
            return Ok(self.component(single).to_vec());
        }
        if let Some(target) = ablation {
            if target != left && target != right {
                return Err(EngineError::Ablation { target, ensemble });
            }
            return Ok(self.component(target).to_vec());
        }

        let right_rows: HashMap<(i32, u32, Option<&str>, NaiveDate), &PortfolioRow> = self
            .component(right)
            .iter()
            .map(|r| ((r.year, r.week, r.name.as_deref(), r.time), r))
            .collect();

        let mut merged = Vec::new();
        for l in self.component(left) {
            let key = (l.year, l.week, l.name.as_deref(), l.time);
            let Some(r) = right_rows.get(&key) else {
                continue;
            };
            let lin_prob = (l.lin_prob + r.lin_prob) / 2.0;
            let predicted = if lin_prob >= 0.5 {
                Label::Trend(Trend::Rise)
            } else {
                Label::Trend(Trend::Fall)
            };
            merged.push(PortfolioRow {
                year: l.year,
                week: l.week,
                name: l.name.clone(),
                predicted,
                truth: l.truth,
                lin_prob,
                time: l.time,
                daily_ret: l.daily_ret,
                market_cap: l.market_cap,
            });
        }
        merged.sort_by(|a, b| (a.time, &a.name).cmp(&(b.time, &b.name)));
        Ok(merged)
    }

    /// Quantile-assign a component, compute per-(date, bucket) returns under
    /// the weighting mode, pivot wide, derive Long/HML and join benchmarks.
    /// With `by_probability` unset, rows keep their categorical label as the
    /// bucket (pass-through mode).
    pub fn asset_pricing(
        &mut self,
        component: Component,
        weighting: Weighting,
        by_probability: bool,
    ) -> Result<(), EngineError> {
        let rows = self.component(component);
        let buckets = if by_probability {
            bucket_by_probability(rows)
        } else {
            bucket_pass_through(rows)
        };

        // (time, bucket) -> (sum ret*w, sum w); also remember each date's (year, week)
        let mut cells: BTreeMap<NaiveDate, [(f64, f64); 5]> = BTreeMap::new();
        let mut week_of: BTreeMap<NaiveDate, (i32, u32)> = BTreeMap::new();
        for (row, bucket) in rows.iter().zip(buckets.iter()) {
            let Some(bucket) = bucket else { continue };
            if !row.daily_ret.is_finite() {
                continue;
            }
            let w = match weighting {
                Weighting::Equal => 1.0,
                Weighting::MarketCap => row.market_cap,
                Weighting::Probability => row.lin_prob,
            };
            if !w.is_finite() || w <= 0.0 {
                continue;
            }
            let cell = &mut cells.entry(row.time).or_insert([(0.0, 0.0); 5])[bucket.index()];
            cell.0 += row.daily_ret * w;
            cell.1 += w;
            week_of.entry(row.time).or_insert((row.year, row.week));
        }

        let benchmarks: HashMap<NaiveDate, &BenchmarkRow> =
            self.benchmarks.iter().map(|b| (b.time, b)).collect();

        let mut wide = Vec::with_capacity(cells.len());
        for (time, sums) in cells {
            let mut row = WideRow::zero(time);
            if let Some(&(year, week)) = week_of.get(&time) {
                row.year = year;
                row.week = week;
            }
            for (i, (ret_w, w)) in sums.iter().enumerate() {
                row.buckets[i] = if *w > 0.0 { ret_w / w } else { 0.0 };
            }
            row.long = row.buckets[Strength::VeryHigh.index()];
            row.hml = row.buckets[Strength::VeryHigh.index()]
                - row.buckets[Strength::VeryLow.index()];
            if let Some(b) = benchmarks.get(&time) {
                row.cmkt = b.cmkt;
                row.btc = b.btc;
                row.eth = b.eth;
                row.one_n = b.one_n;
            }
            wide.push(row);
        }
        self.ret_tables.insert(component, wide);
        Ok(())
    }

    /// Market-timing overlay: scale each week's Long and HML return of the
    /// cross-sectional ensemble by `rise_w` when the market ensemble called
    /// Rise, by `fall_w` when it called Fall. Weeks without a market call are
    /// left unscaled.
    pub fn mkt_cs_comb(&mut self, single_without_ensemble: bool) -> Result<(), EngineError> {
        let mkt_component = if single_without_ensemble {
            Component::MktNews
        } else {
            Component::MktAgg
        };

        let mut weekly_call: HashMap<(i32, u32), Trend> = HashMap::new();
        for row in self.component(mkt_component) {
            if let Some(trend) = row.predicted.trend() {
                weekly_call.entry((row.year, row.week)).or_insert(trend);
            }
        }

        if let Some(table) = self.ret_tables.get_mut(&Component::CsAgg) {
            for row in table.iter_mut() {
                let w = match weekly_call.get(&(row.year, row.week)) {
                    Some(Trend::Rise) => self.rise_w,
                    Some(Trend::Fall) => self.fall_w,
                    None => 1.0,
                };
                row.long *= w;
                row.hml *= w;
            }
        }
        Ok(())
    }

    /// Classification quality of the raw weekly predictions (one observation
    /// per prediction, not per joined daily row).
    pub fn score(&self, component: Component) -> Scores {
        let mut seen: Vec<(i32, u32, Option<&str>)> = Vec::new();
        let mut pairs: Vec<(Label, Label)> = Vec::new();
        for row in self.component(component) {
            let key = row.prediction_key();
            if seen.contains(&key) {
                continue;
            }
            seen.push(key);
            pairs.push((row.truth, row.predicted));
        }
        classification_scores(&pairs)
    }
}

/// Quintile buckets from per-week probability ranks. All daily rows of one
/// prediction share its bucket.
fn bucket_by_probability(rows: &[PortfolioRow]) -> Vec<Option<Strength>> {
    // Group predictions per (year, week) in row order.
    let mut groups: BTreeMap<(i32, u32), Vec<(Option<&str>, f64)>> = BTreeMap::new();
    for row in rows {
        let group = groups.entry((row.year, row.week)).or_default();
        if !group.iter().any(|(name, _)| *name == row.name.as_deref()) {
            group.push((row.name.as_deref(), row.lin_prob));
        }
    }

    let mut assigned: HashMap<(i32, u32, Option<&str>), Strength> = HashMap::new();
    for (&(year, week), preds) in &groups {
        let probs: Vec<f64> = preds.iter().map(|(_, p)| *p).collect();
        let buckets = quantile::assign_by_probability(&probs);
        for (&(name, _), bucket) in preds.iter().zip(buckets) {
            assigned.insert((year, week, name), bucket);
        }
    }

    rows.iter()
        .map(|row| assigned.get(&(row.year, row.week, row.name.as_deref())).copied())
        .collect()
}

fn bucket_pass_through(rows: &[PortfolioRow]) -> Vec<Option<Strength>> {
    rows.iter().map(|row| row.predicted.strength()).collect()
}
