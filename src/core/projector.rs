//! Compact, detailed and feature views handed to downstream consumers.

use crate::core::features::FeatureBundle;
use crate::domain::model::Draw;
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const DEFAULT_DETAILED_COUNT: usize = 10;

/// App 端對獎用的精簡格式：`{"c": 期數, "d": [號碼]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompactDraw {
    pub c: u32,
    pub d: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureView<'a> {
    pub generated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub features: &'a FeatureBundle,
}

pub fn compact_view(draws: &[Draw]) -> Vec<CompactDraw> {
    draws
        .iter()
        .map(|d| CompactDraw {
            c: d.number,
            d: d.numbers.clone(),
        })
        .collect()
}

/// 最近 `count` 期的完整資料，最新的排在最前面
pub fn detailed_view(draws: &[Draw], count: usize) -> Vec<Draw> {
    draws.iter().rev().take(count).cloned().collect()
}

pub fn render_compact(draws: &[Draw]) -> Result<String> {
    Ok(serde_json::to_string(&compact_view(draws))?)
}

pub fn render_detailed(draws: &[Draw], count: usize) -> Result<String> {
    Ok(serde_json::to_string_pretty(&detailed_view(draws, count))?)
}

pub fn render_features(features: &FeatureBundle, generated_at: DateTime<Utc>) -> Result<String> {
    let view = FeatureView {
        generated_at,
        features,
    };
    Ok(serde_json::to_string_pretty(&view)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::features::FeatureEngine;

    fn draws(range: std::ops::RangeInclusive<u32>) -> Vec<Draw> {
        range
            .map(|number| {
                let mut numbers: Vec<u8> = (0..15u8).map(|k| (k + number as u8) % 25 + 1).collect();
                numbers.sort_unstable();
                Draw {
                    number,
                    date: String::new(),
                    numbers,
                    accumulated: false,
                    accumulated_value: 0.0,
                    payout_tiers: vec![],
                }
            })
            .collect()
    }

    #[test]
    fn test_compact_view_has_no_whitespace() {
        let history = draws(1..=3);
        let rendered = render_compact(&history).unwrap();

        assert!(rendered.starts_with("[{\"c\":1,\"d\":["));
        assert!(!rendered.contains(' '));
        assert_eq!(compact_view(&history).len(), 3);
    }

    #[test]
    fn test_detailed_view_is_newest_first() {
        let history = draws(1..=15);
        let detailed = detailed_view(&history, DEFAULT_DETAILED_COUNT);

        assert_eq!(detailed.len(), 10);
        assert_eq!(detailed[0].number, 15);
        assert_eq!(detailed[9].number, 6);

        let short = detailed_view(&history[..2], DEFAULT_DETAILED_COUNT);
        assert_eq!(short.len(), 2);
    }

    #[test]
    fn test_feature_view_keyed_by_newest_draw() {
        let history = draws(1..=4);
        let features = FeatureEngine::new(30).compute(&history).unwrap();
        let rendered = render_features(&features, Utc::now()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();

        assert_eq!(value["drawNumber"], 4);
        assert!(value.get("generatedAt").is_some());
        assert_eq!(value["delays"].as_array().unwrap().len(), 25);
    }
}
