use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::Label;

/// Asset key under which market-level (no-asset) transcripts are stored in
/// record files.
pub const MARKET_KEY: &str = "null";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    /// Text for prompt/label messages, a number for log-probability messages.
    pub content: Value,
}

/// One chat transcript ending in the canonical tail:
/// `[..., truth, prediction + explanation, log-probability]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub messages: Vec<Message>,
}

/// A prediction parsed out of a transcript tail.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedPrediction {
    pub predicted: Label,
    pub truth: Label,
    /// exp of the recorded log-probability, clamped to [0, 1].
    pub lin_prob: f64,
}

impl Transcript {
    /// Parse and validate the canonical transcript tail. Any deviation is an
    /// error for the caller to absorb with its fallback label.
    pub fn parse(&self) -> Result<ParsedPrediction> {
        let n = self.messages.len();
        if n < 3 {
            bail!("transcript has {n} messages, need at least 3");
        }
        let truth_msg = &self.messages[n - 3];
        let pred_msg = &self.messages[n - 2];
        let prob_msg = &self.messages[n - 1];

        if pred_msg.role != "assistant" || prob_msg.role != "assistant" {
            bail!("transcript tail roles are not assistant/assistant");
        }

        let truth_text = content_str(truth_msg).context("truth message is not text")?;
        let truth = Label::parse(truth_text)
            .with_context(|| format!("truth label '{}' not in vocabulary", truth_text.trim()))?;

        let pred_text = content_str(pred_msg).context("prediction message is not text")?;
        let predicted = parse_prediction_line(pred_text)?;

        let log_prob = content_f64(prob_msg).context("log-probability message is not numeric")?;
        let lin_prob = log_prob.exp().clamp(0.0, 1.0);

        Ok(ParsedPrediction {
            predicted,
            truth,
            lin_prob,
        })
    }
}

/// The predicted label sits on the first line after the first ": "
/// (e.g. "Strength: Very High\nExplanation: ...").
fn parse_prediction_line(text: &str) -> Result<Label> {
    let first_line = text.lines().next().unwrap_or_default();
    let Some((_, label_text)) = first_line.split_once(": ") else {
        bail!("prediction line '{first_line}' has no ': ' separator");
    };
    Label::parse(label_text)
        .with_context(|| format!("predicted label '{}' not in vocabulary", label_text.trim()))
}

fn content_str(msg: &Message) -> Option<&str> {
    msg.content.as_str()
}

fn content_f64(msg: &Message) -> Option<f64> {
    match &msg.content {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// One expert's historical prediction records, keyed by period and asset.
/// File layout is `{"<year><week>": {"<asset>": {"messages": [...]}}}`;
/// market-level files may key the transcript directly under the period or
/// under the literal asset key "null".
#[derive(Debug, Default)]
pub struct AgentRecords {
    by_period: BTreeMap<(i32, u32), BTreeMap<String, Transcript>>,
}

impl AgentRecords {
    pub fn load(path: &Path) -> Result<Self> {
        let payload = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let value: Value = serde_json::from_str(&payload)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Self::from_value(value).with_context(|| format!("invalid record file {}", path.display()))
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(periods) = value else {
            bail!("record root is not an object");
        };

        let mut by_period = BTreeMap::new();
        for (yw, entry) in periods {
            let key = parse_period_key(&yw)?;
            let mut assets = BTreeMap::new();
            match entry {
                Value::Object(map) if map.contains_key("messages") => {
                    let transcript: Transcript = serde_json::from_value(Value::Object(map))?;
                    assets.insert(MARKET_KEY.to_string(), transcript);
                }
                Value::Object(map) => {
                    for (asset, t) in map {
                        let transcript: Transcript = serde_json::from_value(t)
                            .with_context(|| format!("bad transcript for {yw}/{asset}"))?;
                        assets.insert(asset, transcript);
                    }
                }
                _ => bail!("period {yw} is not an object"),
            }
            by_period.insert(key, assets);
        }
        Ok(Self { by_period })
    }

    pub fn is_empty(&self) -> bool {
        self.by_period.is_empty()
    }

    /// Periods in ascending (year, week) order.
    pub fn periods(&self) -> Vec<(i32, u32)> {
        self.by_period.keys().copied().collect()
    }

    /// Asset names recorded for a period, market key excluded.
    pub fn assets(&self, year: i32, week: u32) -> Vec<&str> {
        self.by_period
            .get(&(year, week))
            .map(|assets| {
                assets
                    .keys()
                    .filter(|k| k.as_str() != MARKET_KEY)
                    .map(String::as_str)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn get(&self, year: i32, week: u32, asset: Option<&str>) -> Option<&Transcript> {
        self.by_period
            .get(&(year, week))
            .and_then(|assets| assets.get(asset.unwrap_or(MARKET_KEY)))
    }
}

/// Period keys concatenate year and ISO week without padding ("20241" or
/// "202412"): the first four digits are the year.
fn parse_period_key(yw: &str) -> Result<(i32, u32)> {
    if yw.len() < 5 {
        bail!("period key '{yw}' is too short");
    }
    let (Some(year), Some(week)) = (yw.get(..4), yw.get(4..)) else {
        bail!("period key '{yw}' is not ASCII");
    };
    let year: i32 = year
        .parse()
        .with_context(|| format!("bad year in period key '{yw}'"))?;
    let week: u32 = week
        .parse()
        .with_context(|| format!("bad week in period key '{yw}'"))?;
    if !(1..=53).contains(&week) {
        bail!("week {week} out of range in period key '{yw}'");
    }
    Ok((year, week))
}
