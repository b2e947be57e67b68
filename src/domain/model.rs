use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 每期開出的號碼數量
pub const NUMBERS_PER_DRAW: usize = 15;
/// 號碼池上限（1..=25）
pub const MAX_NUMBER: u8 = 25;
/// 獎金級距，依中獎號碼數遞減
pub const PAYOUT_MATCHES: [u8; 5] = [15, 14, 13, 12, 11];

/// 來源 API 的原始記錄；欄位名稱依來源而異，只允許 normalizer 讀取
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRecord {
    pub data: HashMap<String, serde_json::Value>,
}

impl RawRecord {
    pub fn from_object(obj: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            data: obj.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutTier {
    pub matches: u8,
    pub winner_count: u64,
    pub prize_amount: f64,
}

impl PayoutTier {
    /// 權威來源在稽核金額公布前的佔位資料：頭獎有得主但獎金為 0
    pub fn is_placeholder(&self) -> bool {
        self.matches == 15 && self.prize_amount == 0.0 && self.winner_count > 0
    }
}

/// Completeness of a draw's payout data, ordered from poorest to richest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Richness {
    Empty,
    Suspicious,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draw {
    pub number: u32,
    #[serde(default)]
    pub date: String,
    pub numbers: Vec<u8>,
    #[serde(default)]
    pub accumulated: bool,
    #[serde(default)]
    pub accumulated_value: f64,
    #[serde(default)]
    pub payout_tiers: Vec<PayoutTier>,
}

impl Draw {
    pub fn richness(&self) -> Richness {
        if self.payout_tiers.is_empty() {
            Richness::Empty
        } else if self.is_suspicious() {
            Richness::Suspicious
        } else {
            Richness::Complete
        }
    }

    pub fn is_suspicious(&self) -> bool {
        self.payout_tiers.iter().any(PayoutTier::is_placeholder)
    }

    /// 空獎金或可疑獎金都需要修復
    pub fn needs_repair(&self) -> bool {
        self.richness() != Richness::Complete
    }

    pub fn contains(&self, n: u8) -> bool {
        self.numbers.binary_search(&n).is_ok()
    }

    /// 檢查號碼形狀：15 個、不重複、介於 1..=25、遞增排序
    pub fn has_valid_shape(&self) -> bool {
        self.number > 0
            && self.numbers.len() == NUMBERS_PER_DRAW
            && self.numbers.windows(2).all(|w| w[0] < w[1])
            && self.numbers.iter().all(|&n| (1..=MAX_NUMBER).contains(&n))
    }

    /// 獎項：級距屬於 15..=11、遞減且不重複、金額與人數合理
    pub fn has_valid_tiers(&self) -> bool {
        self.payout_tiers.windows(2).all(|w| w[0].matches > w[1].matches)
            && self.payout_tiers.iter().all(|t| {
                PAYOUT_MATCHES.contains(&t.matches)
                    && t.prize_amount.is_finite()
                    && t.prize_amount >= 0.0
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draw_with_tiers(tiers: Vec<PayoutTier>) -> Draw {
        Draw {
            number: 1,
            date: String::new(),
            numbers: (1..=15).collect(),
            accumulated: false,
            accumulated_value: 0.0,
            payout_tiers: tiers,
        }
    }

    #[test]
    fn test_richness_ordering() {
        assert!(Richness::Empty < Richness::Suspicious);
        assert!(Richness::Suspicious < Richness::Complete);
    }

    #[test]
    fn test_placeholder_jackpot_is_suspicious() {
        let draw = draw_with_tiers(vec![PayoutTier {
            matches: 15,
            winner_count: 3,
            prize_amount: 0.0,
        }]);
        assert!(draw.is_suspicious());
        assert_eq!(draw.richness(), Richness::Suspicious);
        assert!(draw.needs_repair());
    }

    #[test]
    fn test_jackpot_without_winners_is_complete() {
        let draw = draw_with_tiers(vec![
            PayoutTier {
                matches: 15,
                winner_count: 0,
                prize_amount: 0.0,
            },
            PayoutTier {
                matches: 14,
                winner_count: 250,
                prize_amount: 1800.5,
            },
        ]);
        assert_eq!(draw.richness(), Richness::Complete);
        assert!(!draw.needs_repair());
    }

    #[test]
    fn test_shape_validation() {
        let mut draw = draw_with_tiers(vec![]);
        assert!(draw.has_valid_shape());
        assert_eq!(draw.richness(), Richness::Empty);

        draw.numbers[14] = 26;
        assert!(!draw.has_valid_shape());

        draw.numbers = (1..=14).collect();
        assert!(!draw.has_valid_shape());
    }

    #[test]
    fn test_tier_validation() {
        let tier = |matches: u8, prize_amount: f64| PayoutTier {
            matches,
            winner_count: 1,
            prize_amount,
        };

        assert!(draw_with_tiers(vec![]).has_valid_tiers());
        assert!(draw_with_tiers(vec![tier(15, 1.0), tier(13, 1.0), tier(11, 1.0)]).has_valid_tiers());

        assert!(!draw_with_tiers(vec![tier(11, 1.0), tier(15, 1.0)]).has_valid_tiers());
        assert!(!draw_with_tiers(vec![tier(14, 1.0), tier(14, 2.0)]).has_valid_tiers());
        assert!(!draw_with_tiers(vec![tier(10, 1.0)]).has_valid_tiers());
        assert!(!draw_with_tiers(vec![tier(15, -5.0)]).has_valid_tiers());
    }
}
