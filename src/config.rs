use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::model::{Component, Weighting};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    pub portfolio: PortfolioConfig,
    pub regime: RegimeConfig,
    pub eval: EvalConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    pub returns_db: PathBuf,
    /// Directory holding one record JSON per expert ("cs.json", "mkt.json", ...).
    pub records_dir: PathBuf,
    pub checkpoint_path: PathBuf,
    pub regime_cache_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PortfolioConfig {
    pub rise_w: f64,
    pub fall_w: f64,
    pub weighting: String,
    /// Optional single-expert substitute for an ensemble ("cs", "vision",
    /// "mkt" or "news"); empty string disables ablation.
    #[serde(default)]
    pub ablation: String,
    #[serde(default)]
    pub single_without_ensemble: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegimeConfig {
    pub boom_change: f64,
    pub bust_change: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvalConfig {
    pub annualize_sharpe: bool,
    pub weekly_compound: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl PortfolioConfig {
    pub fn weighting(&self) -> Result<Weighting> {
        Ok(Weighting::from_str(&self.weighting)?)
    }

    pub fn ablation(&self) -> Result<Option<Component>> {
        if self.ablation.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(Component::from_str(&self.ablation)?))
    }
}

fn config_path() -> PathBuf {
    std::env::var("EQ_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config/default.toml"))
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::load_from_path(&config_path())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;

        let config: Config = toml::from_str(&config_str)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.portfolio.rise_w < 0.0 || self.portfolio.fall_w < 0.0 {
            bail!(
                "portfolio weights must be non-negative (rise_w={}, fall_w={})",
                self.portfolio.rise_w,
                self.portfolio.fall_w
            );
        }
        self.portfolio
            .weighting()
            .context("portfolio.weighting is invalid")?;
        let ablation = self
            .portfolio
            .ablation()
            .context("portfolio.ablation is invalid")?;
        if let Some(target) = ablation {
            if !matches!(
                target,
                Component::Cs | Component::Vision | Component::Mkt | Component::News
            ) {
                bail!("portfolio.ablation must name a single underlying expert, got '{target}'");
            }
        }
        if self.regime.boom_change <= 0.0 || self.regime.bust_change <= 0.0 {
            bail!("regime thresholds must be positive");
        }
        Ok(())
    }
}
