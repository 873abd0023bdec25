use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::WideRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegimeKind {
    Boom,
    Bust,
    None,
}

/// One labeled stretch of the price series. Segments are contiguous and
/// non-overlapping; `[start, end)` intervals cover the full series span.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeSegment {
    pub main_trend: RegimeKind,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub time: NaiveDate,
    pub price: f64,
}

struct Cycle {
    main_trend: RegimeKind,
    end: NaiveDate,
    /// Local extremum preceding the threshold crossing; the segment boundary
    /// is backdated here on a trend change.
    pre_trend_end: Option<NaiveDate>,
}

/// Classify one window starting at `series[0]`. The window's trend is set by
/// whichever threshold is crossed first; the window then extends while the
/// move from the crossing stays monotone.
fn one_period(series: &[PricePoint], boom_change: f64, bust_change: f64) -> Cycle {
    let p0 = series[0].price;
    let boom_threshold = p0 * (1.0 + boom_change);
    let bust_threshold = p0 * (1.0 - bust_change);

    let boom = series.iter().position(|p| p.price > boom_threshold);
    let bust = series.iter().position(|p| p.price < bust_threshold);

    let (trend, crossing) = match (boom, bust) {
        (None, None) => {
            return Cycle {
                main_trend: RegimeKind::None,
                end: series[series.len() - 1].time,
                pre_trend_end: None,
            };
        }
        (Some(a), Some(b)) if b < a => (RegimeKind::Bust, b),
        (None, Some(b)) => (RegimeKind::Bust, b),
        (Some(a), _) => (RegimeKind::Boom, a),
    };

    let mut cycle_end = crossing.saturating_sub(1);
    while cycle_end + 1 < series.len() {
        let next = series[cycle_end + 1].price;
        let curr = series[cycle_end].price;
        let keeps_going = match trend {
            RegimeKind::Boom => next > curr,
            RegimeKind::Bust => next < curr,
            RegimeKind::None => false,
        };
        if !keeps_going {
            break;
        }
        cycle_end += 1;
    }

    let window = &series[..=cycle_end];
    let extremum = window
        .iter()
        .enumerate()
        .reduce(|best, cand| {
            let better = match trend {
                RegimeKind::Boom => cand.1.price < best.1.price,
                _ => cand.1.price > best.1.price,
            };
            if better {
                cand
            } else {
                best
            }
        })
        .map(|(_, p)| p.time);

    Cycle {
        main_trend: trend,
        end: series[cycle_end].time,
        pre_trend_end: extremum,
    }
}

/// Segment a full price series into boom/bust/none stretches. Adjacent
/// same-trend windows are merged; a trend change backdates the boundary to
/// the previous window's local extremum when one exists.
pub fn segments(series: &[PricePoint], boom_change: f64, bust_change: f64) -> Vec<RegimeSegment> {
    let mut sorted = series.to_vec();
    sorted.sort_by_key(|p| p.time);
    let Some(last) = sorted.last().copied() else {
        return Vec::new();
    };

    let mut out: Vec<RegimeSegment> = Vec::new();
    let mut anchor = sorted[0].time;
    let mut previous = RegimeKind::None;

    while anchor < last.time {
        let start_idx = match sorted.iter().position(|p| p.time >= anchor) {
            Some(i) => i,
            None => break,
        };
        let cycle = one_period(&sorted[start_idx..], boom_change, bust_change);

        match out.last_mut() {
            Some(prev_seg) if cycle.main_trend != RegimeKind::None && previous != RegimeKind::None => {
                if cycle.main_trend == previous {
                    prev_seg.end = cycle.end;
                } else if let Some(pre) = cycle.pre_trend_end {
                    prev_seg.end = pre;
                    out.push(RegimeSegment {
                        main_trend: cycle.main_trend,
                        start: pre,
                        end: cycle.end,
                    });
                } else {
                    out.push(RegimeSegment {
                        main_trend: cycle.main_trend,
                        start: anchor,
                        end: cycle.end,
                    });
                }
            }
            _ => {
                out.push(RegimeSegment {
                    main_trend: cycle.main_trend,
                    start: anchor,
                    end: cycle.end,
                });
            }
        }

        if cycle.end <= anchor {
            break;
        }
        anchor = cycle.end;
        previous = cycle.main_trend;
    }

    out
}

/// A wide return table partitioned by regime: all rows, boom weeks, bust
/// weeks. Each (year, week) takes the trend occurring most among its days.
#[derive(Debug, Clone, Default)]
pub struct RegimeSplit {
    pub all: Vec<WideRow>,
    pub boom: Vec<WideRow>,
    pub bust: Vec<WideRow>,
}

pub fn split(rows: &[WideRow], segments: &[RegimeSegment]) -> RegimeSplit {
    let trend_of = |time: NaiveDate| {
        segments
            .iter()
            .find(|s| s.start <= time && time < s.end)
            .map(|s| s.main_trend)
            .unwrap_or(RegimeKind::None)
    };

    // Dominant trend per week, ties broken by first appearance.
    let mut weeks: Vec<((i32, u32), Vec<(RegimeKind, usize)>)> = Vec::new();
    for row in rows {
        let trend = trend_of(row.time);
        let key = (row.year, row.week);
        let idx = match weeks.iter().position(|(k, _)| *k == key) {
            Some(i) => i,
            None => {
                weeks.push((key, Vec::new()));
                weeks.len() - 1
            }
        };
        let counts = &mut weeks[idx].1;
        match counts.iter_mut().find(|(t, _)| *t == trend) {
            Some((_, n)) => *n += 1,
            None => counts.push((trend, 1)),
        }
    }

    let dominant = |key: (i32, u32)| {
        weeks
            .iter()
            .find(|(k, _)| *k == key)
            .and_then(|(_, counts)| {
                counts
                    .iter()
                    .fold(None::<(RegimeKind, usize)>, |best, &(t, n)| match best {
                        Some((_, bn)) if bn >= n => best,
                        _ => Some((t, n)),
                    })
                    .map(|(t, _)| t)
            })
            .unwrap_or(RegimeKind::None)
    };

    let mut result = RegimeSplit {
        all: rows.to_vec(),
        ..RegimeSplit::default()
    };
    for row in rows {
        match dominant((row.year, row.week)) {
            RegimeKind::Boom => result.boom.push(*row),
            RegimeKind::Bust => result.bust.push(*row),
            RegimeKind::None => {}
        }
    }
    result
}

/// Load a previously persisted segment list, if any.
pub fn load_cache(path: &Path) -> Result<Option<Vec<RegimeSegment>>> {
    if !path.exists() {
        return Ok(None);
    }
    let payload = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let segments: Vec<RegimeSegment> =
        serde_json::from_str(&payload).context("failed to parse regime segment cache")?;
    Ok(Some(segments))
}

pub fn save_cache(path: &Path, segments: &[RegimeSegment]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let payload = serde_json::to_string_pretty(segments)?;
    std::fs::write(path, payload).with_context(|| format!("failed to write {}", path.display()))
}
