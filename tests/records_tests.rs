use serde_json::json;

use expert_quant::model::{Label, Strength, Trend};
use expert_quant::store::AgentRecords;

fn cs_records() -> AgentRecords {
    let value = json!({
        "20241": {
            "bitcoin": {
                "messages": [
                    {"role": "user", "content": "Factor summary ..."},
                    {"role": "assistant", "content": "Very High"},
                    {"role": "assistant", "content": "Strength: Very High\nExplanation: strong momentum."},
                    {"role": "assistant", "content": -0.11}
                ]
            },
            "ethereum": {
                "messages": [
                    {"role": "user", "content": "Factor summary ..."},
                    {"role": "assistant", "content": "Low"},
                    {"role": "assistant", "content": "Strength: Low\nExplanation: fading volume."},
                    {"role": "assistant", "content": -0.7}
                ]
            }
        },
        "202410": {
            "bitcoin": {
                "messages": [
                    {"role": "user", "content": "Factor summary ..."},
                    {"role": "assistant", "content": "Medium"},
                    {"role": "assistant", "content": "Strength: Medium\nExplanation: mixed."},
                    {"role": "assistant", "content": -0.3}
                ]
            }
        }
    });
    AgentRecords::from_value(value).unwrap()
}

#[test]
fn periods_are_sorted_numerically() {
    let records = cs_records();
    assert_eq!(records.periods(), vec![(2024, 1), (2024, 10)]);
}

#[test]
fn assets_exclude_the_market_key() {
    let value = json!({
        "20241": {
            "null": {"messages": []},
            "bitcoin": {"messages": []}
        }
    });
    let records = AgentRecords::from_value(value).unwrap();
    assert_eq!(records.assets(2024, 1), vec!["bitcoin"]);
}

#[test]
fn canonical_transcript_parses() {
    let records = cs_records();
    let parsed = records.get(2024, 1, Some("bitcoin")).unwrap().parse().unwrap();
    assert_eq!(parsed.predicted, Label::Strength(Strength::VeryHigh));
    assert_eq!(parsed.truth, Label::Strength(Strength::VeryHigh));
    assert!((parsed.lin_prob - (-0.11f64).exp()).abs() < 1e-12);
}

#[test]
fn market_records_parse_under_both_layouts() {
    // Transcript directly under the period key.
    let direct = AgentRecords::from_value(json!({
        "20241": {
            "messages": [
                {"role": "user", "content": "Market factors ..."},
                {"role": "assistant", "content": "Rise"},
                {"role": "assistant", "content": "Market trend: Rise\nExplanation: breadth improving."},
                {"role": "assistant", "content": -0.2}
            ]
        }
    }))
    .unwrap();
    let parsed = direct.get(2024, 1, None).unwrap().parse().unwrap();
    assert_eq!(parsed.predicted, Label::Trend(Trend::Rise));

    // Transcript under the literal "null" asset key.
    let nested = AgentRecords::from_value(json!({
        "20241": {
            "null": {
                "messages": [
                    {"role": "user", "content": "Market factors ..."},
                    {"role": "assistant", "content": "Fall"},
                    {"role": "assistant", "content": "Market trend: Fall\nExplanation: outflows."},
                    {"role": "assistant", "content": -0.4}
                ]
            }
        }
    }))
    .unwrap();
    let parsed = nested.get(2024, 1, None).unwrap().parse().unwrap();
    assert_eq!(parsed.predicted, Label::Trend(Trend::Fall));
}

#[test]
fn string_encoded_log_probability_is_accepted() {
    let records = AgentRecords::from_value(json!({
        "20241": {
            "bitcoin": {
                "messages": [
                    {"role": "assistant", "content": "High"},
                    {"role": "assistant", "content": "Strength: High\nExplanation: ok."},
                    {"role": "assistant", "content": "-0.25"}
                ]
            }
        }
    }))
    .unwrap();
    let parsed = records.get(2024, 1, Some("bitcoin")).unwrap().parse().unwrap();
    assert!((parsed.lin_prob - (-0.25f64).exp()).abs() < 1e-12);
}

#[test]
fn malformed_tails_are_errors_not_panics() {
    let records = AgentRecords::from_value(json!({
        "20241": {
            "bitcoin": {
                "messages": [
                    {"role": "assistant", "content": "High"},
                    {"role": "assistant", "content": "no separator here"},
                    {"role": "assistant", "content": -0.25}
                ]
            },
            "ethereum": {
                "messages": [
                    {"role": "assistant", "content": "Sideways"},
                    {"role": "assistant", "content": "Strength: Sideways\nExplanation: n/a."},
                    {"role": "assistant", "content": -0.25}
                ]
            },
            "solana": {
                "messages": [
                    {"role": "assistant", "content": "High"}
                ]
            }
        }
    }))
    .unwrap();

    assert!(records.get(2024, 1, Some("bitcoin")).unwrap().parse().is_err());
    assert!(records.get(2024, 1, Some("ethereum")).unwrap().parse().is_err());
    assert!(records.get(2024, 1, Some("solana")).unwrap().parse().is_err());
}

#[test]
fn bad_period_keys_are_rejected() {
    assert!(AgentRecords::from_value(json!({"24": {}})).is_err());
    assert!(AgentRecords::from_value(json!({"2024xx": {}})).is_err());
    assert!(AgentRecords::from_value(json!({"202499": {}})).is_err());
}

#[test]
fn missing_period_reads_as_none() {
    let records = cs_records();
    assert!(records.get(2025, 1, Some("bitcoin")).is_none());
    assert!(records.get(2024, 1, Some("dogecoin")).is_none());
}
