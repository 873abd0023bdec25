use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::eval::performance::{evaluate, EvalOptions, PerfStat};
use crate::eval::regime::{self, PricePoint, RegimeSegment};
use crate::eval::score::Scores;
use crate::model::{
    Component, Label, PortCol, PortfolioRow, Prediction, Strength, Trend, Weighting, WideRow,
};
use crate::portfolio::Portfolio;
use crate::store::{AgentRecords, ReturnStore};

#[derive(Debug, Clone)]
pub struct ReplayOptions {
    pub ablation: Option<Component>,
    pub single_without_ensemble: bool,
    pub weighting: Weighting,
    pub eval: EvalOptions,
    pub boom_change: f64,
    pub bust_change: f64,
    pub checkpoint_path: Option<PathBuf>,
    pub regime_cache_path: Option<PathBuf>,
}

/// Persisted replay progress: processed prediction keys plus the accumulated
/// component tables, so a rerun picks up where the last one stopped.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Checkpoint {
    done: BTreeSet<String>,
    components: BTreeMap<Component, Vec<PortfolioRow>>,
}

impl Checkpoint {
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let payload = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let checkpoint =
            serde_json::from_str(&payload).context("failed to parse replay checkpoint")?;
        Ok(Some(checkpoint))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let payload = serde_json::to_string(self)?;
        std::fs::write(path, payload)
            .with_context(|| format!("failed to write {}", path.display()))
    }
}

/// How many predictions fell back to the neutral default during a run.
#[derive(Debug, Clone, Default)]
pub struct FallbackSummary {
    pub by_component: BTreeMap<Component, usize>,
    pub total: usize,
}

impl FallbackSummary {
    fn record(&mut self, component: Component) {
        *self.by_component.entry(component).or_insert(0) += 1;
        self.total += 1;
    }
}

/// Market-timing overlay outcome for one (rise_w, fall_w) pair.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct OverlayRecord {
    pub rise_w: f64,
    pub fall_w: f64,
    pub long_cum: f64,
    pub long_sharpe: f64,
}

pub struct ReplayReport {
    pub scores: Vec<(Component, Scores)>,
    /// Benchmark-column stats per regime slice: ("all" | "boom" | "bust").
    pub performance: Vec<(&'static str, Vec<(PortCol, PerfStat)>)>,
    /// Quintile + HML stats per priced component.
    pub ap_tables: Vec<(Component, Vec<(PortCol, PerfStat)>)>,
    pub overlay: OverlayRecord,
    pub fallbacks: FallbackSummary,
    pub segments: Vec<RegimeSegment>,
    /// Final cross-sectional ensemble return table (after the overlay).
    pub table: Vec<WideRow>,
}

/// Chronological replay of recorded expert predictions through the portfolio
/// accumulator and evaluator. Owns the accumulator for the duration of the
/// run; one driver, one portfolio.
pub struct ReplayDriver {
    portfolio: Portfolio,
    store: ReturnStore,
    records: BTreeMap<Component, AgentRecords>,
    opts: ReplayOptions,
}

impl ReplayDriver {
    pub fn new(
        portfolio: Portfolio,
        store: ReturnStore,
        records: BTreeMap<Component, AgentRecords>,
        opts: ReplayOptions,
    ) -> Self {
        Self {
            portfolio,
            store,
            records,
            opts,
        }
    }

    pub fn run(&mut self) -> Result<ReplayReport> {
        self.portfolio.reset();

        let mut done: BTreeSet<String> = BTreeSet::new();
        if let Some(path) = self.opts.checkpoint_path.clone() {
            if let Some(checkpoint) = Checkpoint::load(&path)? {
                tracing::info!(keys = checkpoint.done.len(), "Resuming from replay checkpoint");
                done = checkpoint.done;
                self.portfolio.restore(checkpoint.components);
            }
        }

        let single = self.opts.single_without_ensemble;
        let cs_primary = if single { Component::CsVision } else { Component::Cs };
        let market_agents: &[Component] = if single {
            &[Component::MktNews]
        } else {
            &[Component::Mkt, Component::News]
        };
        let crypto_agents: &[Component] = if single {
            &[Component::CsVision]
        } else {
            &[Component::Cs, Component::Vision]
        };
        let priced: &[Component] = if single {
            &[Component::CsVision, Component::CsAgg]
        } else {
            &[Component::Cs, Component::Vision, Component::CsAgg]
        };

        let periods = self
            .records
            .get(&cs_primary)
            .map(|r| r.periods())
            .unwrap_or_default();
        if periods.is_empty() {
            tracing::warn!(component = %cs_primary, "No recorded periods to replay");
        }

        let mut fallbacks = FallbackSummary::default();

        let cs_ablation = self
            .opts
            .ablation
            .filter(|c| matches!(c, Component::Cs | Component::Vision));
        let mkt_ablation = self
            .opts
            .ablation
            .filter(|c| matches!(c, Component::Mkt | Component::News));

        for (year, week) in periods {
            for &agent in market_agents {
                let key = update_key(agent, year, week, None);
                if done.contains(&key) {
                    continue;
                }
                let pred = self.parse_or_fallback(agent, year, week, None, &mut fallbacks);
                self.portfolio.update(agent, &pred, &[]);
                done.insert(key);
            }

            let assets: Vec<String> = self
                .records
                .get(&cs_primary)
                .map(|r| {
                    r.assets(year, week)
                        .into_iter()
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();

            for asset in &assets {
                let state_ret = self.store.asset_week(asset, year, week)?;
                if state_ret.is_empty() {
                    tracing::debug!(year, week, asset = %asset, "No return rows for asset-week");
                }
                for &agent in crypto_agents {
                    let key = update_key(agent, year, week, Some(asset));
                    if done.contains(&key) {
                        continue;
                    }
                    let pred =
                        self.parse_or_fallback(agent, year, week, Some(asset), &mut fallbacks);
                    self.portfolio.update(agent, &pred, &state_ret);
                    done.insert(key);
                }
            }

            self.portfolio.merge_cs(cs_ablation, single)?;
            self.portfolio.merge_mkt(mkt_ablation, single)?;
            for &component in priced {
                self.portfolio.asset_pricing(
                    component,
                    self.opts.weighting,
                    component == Component::CsAgg,
                )?;
            }

            if let Some(path) = self.opts.checkpoint_path.clone() {
                let checkpoint = Checkpoint {
                    done: done.clone(),
                    components: self.portfolio.tables().clone(),
                };
                checkpoint.save(&path)?;
            }
        }

        self.portfolio.mkt_cs_comb(single)?;

        let score_components: &[Component] = if single {
            &[Component::CsVision, Component::MktNews]
        } else {
            &[
                Component::Cs,
                Component::Vision,
                Component::CsAgg,
                Component::Mkt,
                Component::News,
                Component::MktAgg,
            ]
        };
        let scores: Vec<(Component, Scores)> = score_components
            .iter()
            .map(|&c| (c, self.portfolio.score(c)))
            .collect();

        let segments = self.regime_segments()?;
        let table = self.portfolio.ret_table(Component::CsAgg).to_vec();
        let regimes = regime::split(&table, &segments);

        let bench_cols = PortCol::benchmark_columns();
        let performance = vec![
            ("all", evaluate(&regimes.all, &bench_cols, &self.opts.eval)),
            ("boom", evaluate(&regimes.boom, &bench_cols, &self.opts.eval)),
            ("bust", evaluate(&regimes.bust, &bench_cols, &self.opts.eval)),
        ];

        let ap_cols = PortCol::ap_columns();
        let ap_tables: Vec<(Component, Vec<(PortCol, PerfStat)>)> = priced
            .iter()
            .map(|&c| (c, evaluate(self.portfolio.ret_table(c), &ap_cols, &self.opts.eval)))
            .collect();

        let long_stat = performance[0]
            .1
            .iter()
            .find(|(col, _)| *col == PortCol::Long)
            .map(|(_, stat)| *stat);
        let overlay = OverlayRecord {
            rise_w: self.portfolio.rise_w(),
            fall_w: self.portfolio.fall_w(),
            long_cum: long_stat.map(|s| s.cumulative_return).unwrap_or(f64::NAN),
            long_sharpe: long_stat.map(|s| s.sharpe).unwrap_or(f64::NAN),
        };

        if fallbacks.total > 0 {
            tracing::warn!(
                total = fallbacks.total,
                "Replay completed with fallback predictions"
            );
        }

        Ok(ReplayReport {
            scores,
            performance,
            ap_tables,
            overlay,
            fallbacks,
            segments,
            table,
        })
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    fn parse_or_fallback(
        &self,
        agent: Component,
        year: i32,
        week: u32,
        asset: Option<&str>,
        fallbacks: &mut FallbackSummary,
    ) -> Prediction {
        let (fallback_label, fallback_prob) = if agent.is_cross_sectional() {
            (Label::Strength(Strength::Medium), 1.0 / 5.0)
        } else {
            (Label::Trend(Trend::Fall), 1.0 / 2.0)
        };

        let parsed = self
            .records
            .get(&agent)
            .and_then(|r| r.get(year, week, asset))
            .map(|t| t.parse());

        let (predicted, truth, lin_prob) = match parsed {
            Some(Ok(p)) => (p.predicted, p.truth, p.lin_prob),
            Some(Err(e)) => {
                tracing::warn!(
                    component = %agent,
                    year,
                    week,
                    asset = asset.unwrap_or("-"),
                    error = %e,
                    "Malformed record, using fallback label"
                );
                fallbacks.record(agent);
                (fallback_label, fallback_label, fallback_prob)
            }
            None => {
                tracing::warn!(
                    component = %agent,
                    year,
                    week,
                    asset = asset.unwrap_or("-"),
                    "Missing record, using fallback label"
                );
                fallbacks.record(agent);
                (fallback_label, fallback_label, fallback_prob)
            }
        };

        Prediction {
            year,
            week,
            name: asset.map(str::to_string),
            predicted,
            truth,
            lin_prob,
        }
    }

    /// Regime segments over the market-index price path, rebuilt from the
    /// benchmark return series (or loaded from the cache when present).
    fn regime_segments(&self) -> Result<Vec<RegimeSegment>> {
        if let Some(path) = &self.opts.regime_cache_path {
            if let Some(segments) = regime::load_cache(path)? {
                tracing::info!(count = segments.len(), "Loaded regime segments from cache");
                return Ok(segments);
            }
        }

        let mut price = 1.0;
        let series: Vec<PricePoint> = self
            .store
            .benchmarks()?
            .into_iter()
            .map(|b| {
                price *= 1.0 + b.cmkt;
                PricePoint {
                    time: b.time,
                    price,
                }
            })
            .collect();

        let segments = regime::segments(&series, self.opts.boom_change, self.opts.bust_change);
        if let Some(path) = &self.opts.regime_cache_path {
            regime::save_cache(path, &segments)?;
        }
        Ok(segments)
    }
}

fn update_key(agent: Component, year: i32, week: u32, asset: Option<&str>) -> String {
    format!("{agent}:{year}:{week}:{}", asset.unwrap_or("-"))
}
