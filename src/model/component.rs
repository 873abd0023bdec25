use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// One named prediction stream tracked by the portfolio accumulator: a single
/// expert, a jointly fine-tuned expert pair, or an ensemble output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    /// Cross-sectional factor expert.
    Cs,
    /// Technical chart (vision) expert.
    Vision,
    /// Market factor expert.
    Mkt,
    /// News expert.
    News,
    /// Single model trained on factor + chart inputs (no ensembling).
    CsVision,
    /// Single model trained on market + news inputs (no ensembling).
    MktNews,
    /// Ensemble of Cs and Vision.
    CsAgg,
    /// Ensemble of Mkt and News.
    MktAgg,
}

impl Component {
    pub const ALL: [Component; 8] = [
        Component::Cs,
        Component::Vision,
        Component::Mkt,
        Component::News,
        Component::CsVision,
        Component::MktNews,
        Component::CsAgg,
        Component::MktAgg,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Component::Cs => "cs",
            Component::Vision => "vision",
            Component::Mkt => "mkt",
            Component::News => "news",
            Component::CsVision => "cs_vision",
            Component::MktNews => "mkt_news",
            Component::CsAgg => "cs_agg",
            Component::MktAgg => "mkt_agg",
        }
    }

    /// Cross-sectional components carry one prediction per asset per week;
    /// market components carry one prediction per week.
    pub fn is_cross_sectional(self) -> bool {
        matches!(
            self,
            Component::Cs | Component::Vision | Component::CsVision | Component::CsAgg
        )
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Component {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Component::ALL
            .into_iter()
            .find(|c| c.as_str() == s.trim())
            .ok_or_else(|| EngineError::UnknownComponent(s.to_string()))
    }
}

/// Weighting scheme for per-(date, bucket) portfolio returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weighting {
    #[default]
    Equal,
    MarketCap,
    Probability,
}

impl FromStr for Weighting {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "equal" => Ok(Weighting::Equal),
            "mcap" | "market_cap" => Ok(Weighting::MarketCap),
            "prob" | "probability" => Ok(Weighting::Probability),
            other => Err(EngineError::Weighting(other.to_string())),
        }
    }
}
