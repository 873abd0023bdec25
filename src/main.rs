use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};

use expert_quant::config::Config;
use expert_quant::eval::performance::{EvalOptions, PerfStat};
use expert_quant::model::{Component, PortCol};
use expert_quant::portfolio::Portfolio;
use expert_quant::replay::{ReplayDriver, ReplayOptions, ReplayReport};
use expert_quant::store::returns::derive_benchmarks;
use expert_quant::store::{AgentRecords, ReturnStore};

fn main() -> Result<()> {
    // Load config
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {:#}", e);
            eprintln!("Make sure config/default.toml exists (EQ_CONFIG_PATH overrides the path)");
            std::process::exit(1);
        }
    };

    // Init tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                config
                    .logging
                    .level
                    .parse()
                    .unwrap_or_else(|_| "info".parse().unwrap())
            }),
        )
        .with_ansi(false)
        .init();

    tracing::info!(
        returns_db = %config.data.returns_db.display(),
        records_dir = %config.data.records_dir.display(),
        single = config.portfolio.single_without_ensemble,
        "Starting expert-quant replay"
    );

    let mut store =
        ReturnStore::open(&config.data.returns_db).context("failed to open return store")?;

    let mut benchmarks = store.benchmarks()?;
    if benchmarks.is_empty() {
        tracing::warn!("Benchmark table is empty, deriving series from daily returns");
        benchmarks = derive_benchmarks(&store.all_returns()?);
        store.insert_benchmarks(&benchmarks)?;
    }

    let tracked: &[Component] = if config.portfolio.single_without_ensemble {
        &[Component::CsVision, Component::MktNews]
    } else {
        &[
            Component::Cs,
            Component::Vision,
            Component::Mkt,
            Component::News,
        ]
    };

    let mut records = BTreeMap::new();
    for &component in tracked {
        let path = config.data.records_dir.join(format!("{component}.json"));
        if path.exists() {
            records.insert(component, AgentRecords::load(&path)?);
        } else {
            tracing::warn!(path = %path.display(), component = %component, "Record file missing");
        }
    }

    let portfolio = Portfolio::new(benchmarks, config.portfolio.rise_w, config.portfolio.fall_w);
    let opts = ReplayOptions {
        ablation: config.portfolio.ablation()?,
        single_without_ensemble: config.portfolio.single_without_ensemble,
        weighting: config.portfolio.weighting()?,
        eval: EvalOptions {
            weekly_compound: config.eval.weekly_compound,
            annualize_sharpe: config.eval.annualize_sharpe,
        },
        boom_change: config.regime.boom_change,
        bust_change: config.regime.bust_change,
        checkpoint_path: Some(config.data.checkpoint_path.clone()),
        regime_cache_path: Some(config.data.regime_cache_path.clone()),
    };

    let mut driver = ReplayDriver::new(portfolio, store, records, opts);
    let report = driver.run().context("replay failed")?;

    print_report(&report);
    write_ap_json(&report, Path::new("data/ap.json"))?;

    Ok(())
}

fn print_report(report: &ReplayReport) {
    println!("== classification ==");
    for (component, scores) in &report.scores {
        println!(
            "{:>10}  ACC: {:.6} | MCC: {:.6}",
            component.to_string().to_uppercase(),
            scores.acc,
            scores.mcc
        );
    }

    for (slice, stats) in &report.performance {
        println!("\n== performance [{slice}] ==");
        print_stats(stats);
    }

    for (component, stats) in &report.ap_tables {
        println!("\n== asset pricing [{component}] ==");
        print_stats(stats);
    }

    println!(
        "\noverlay rise_w={} fall_w={}: Long cum {:.4}, sharpe {:.4}",
        report.overlay.rise_w,
        report.overlay.fall_w,
        report.overlay.long_cum,
        report.overlay.long_sharpe
    );

    if report.fallbacks.total > 0 {
        println!("\nfallback predictions: {} total", report.fallbacks.total);
        for (component, n) in &report.fallbacks.by_component {
            println!("  {component}: {n}");
        }
    }
}

fn print_stats(stats: &[(PortCol, PerfStat)]) {
    println!(
        "{:>10} {:>10} {:>10} {:>9} {:>4} {:>9} {:>10}",
        "column", "mean", "std", "t", "sig", "sharpe", "cum"
    );
    for (col, s) in stats {
        println!(
            "{:>10} {:>10.4} {:>10.4} {:>9.4} {:>4} {:>9.4} {:>10.4}",
            col.to_string(),
            s.avg,
            s.std,
            s.t_stat,
            s.significance,
            s.sharpe,
            s.cumulative_return
        );
    }
}

/// Persist the asset-pricing tables for downstream table renderers.
fn write_ap_json(report: &ReplayReport, path: &Path) -> Result<()> {
    let mut root = serde_json::Map::new();
    for (component, stats) in &report.ap_tables {
        let mut table = serde_json::Map::new();
        for (col, s) in stats {
            table.insert(col.to_string(), serde_json::to_value(s)?);
        }
        root.insert(component.to_string(), table.into());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(&root)?)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
