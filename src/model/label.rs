use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordered five-level return-strength scale. Display strings are the stable
/// vocabulary used in prediction records and report columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Strength {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl Strength {
    pub const ALL: [Strength; 5] = [
        Strength::VeryLow,
        Strength::Low,
        Strength::Medium,
        Strength::High,
        Strength::VeryHigh,
    ];

    pub fn index(self) -> usize {
        match self {
            Strength::VeryLow => 0,
            Strength::Low => 1,
            Strength::Medium => 2,
            Strength::High => 3,
            Strength::VeryHigh => 4,
        }
    }

    pub fn from_index(idx: usize) -> Option<Strength> {
        Strength::ALL.get(idx).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Strength::VeryLow => "Very Low",
            Strength::Low => "Low",
            Strength::Medium => "Medium",
            Strength::High => "High",
            Strength::VeryHigh => "Very High",
        }
    }
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Binary market direction call emitted by market-level experts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trend {
    Rise,
    Fall,
}

impl Trend {
    pub fn as_str(self) -> &'static str {
        match self {
            Trend::Rise => "Rise",
            Trend::Fall => "Fall",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A prediction label on either scale. Cross-sectional experts speak the
/// quintile vocabulary, market experts the Rise/Fall vocabulary; ensembled
/// rows re-derive a Trend from the averaged probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Strength(Strength),
    Trend(Trend),
}

impl Label {
    /// Parse a label from record text. Returns None for anything outside the
    /// two fixed vocabularies; callers decide the fallback.
    pub fn parse(s: &str) -> Option<Label> {
        let s = s.trim();
        match s {
            "Very Low" => Some(Label::Strength(Strength::VeryLow)),
            "Low" => Some(Label::Strength(Strength::Low)),
            "Medium" => Some(Label::Strength(Strength::Medium)),
            "High" => Some(Label::Strength(Strength::High)),
            "Very High" => Some(Label::Strength(Strength::VeryHigh)),
            "Rise" => Some(Label::Trend(Trend::Rise)),
            "Fall" => Some(Label::Trend(Trend::Fall)),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Label::Strength(s) => s.as_str(),
            Label::Trend(t) => t.as_str(),
        }
    }

    pub fn strength(self) -> Option<Strength> {
        match self {
            Label::Strength(s) => Some(s),
            Label::Trend(_) => None,
        }
    }

    pub fn trend(self) -> Option<Trend> {
        match self {
            Label::Trend(t) => Some(t),
            Label::Strength(_) => None,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Strength> for Label {
    fn from(s: Strength) -> Self {
        Label::Strength(s)
    }
}

impl From<Trend> for Label {
    fn from(t: Trend) -> Self {
        Label::Trend(t)
    }
}
