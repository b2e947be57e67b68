//! Ordered, de-duplicated draw history keyed by draw number.

use crate::domain::model::Draw;
use crate::domain::ports::Storage;
use crate::utils::error::{Result, SyncError};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Replaced,
    Kept,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryStore {
    draws: BTreeMap<u32, Draw>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 從有序清單還原；每筆都重新檢查號碼形狀與獎項
    pub fn from_draws(draws: Vec<Draw>) -> Result<Self> {
        let mut store = Self::new();
        for draw in draws {
            if !draw.has_valid_shape() {
                return Err(SyncError::malformed(format!(
                    "persisted draw {} has an invalid number set",
                    draw.number
                )));
            }
            if !draw.has_valid_tiers() {
                return Err(SyncError::malformed(format!(
                    "persisted draw {} has invalid payout tiers",
                    draw.number
                )));
            }
            store.merge(draw);
        }
        Ok(store)
    }

    /// 只有在新資料的獎金資訊嚴格更完整時才覆蓋既有記錄
    pub fn merge(&mut self, draw: Draw) -> MergeOutcome {
        match self.draws.get_mut(&draw.number) {
            None => {
                self.draws.insert(draw.number, draw);
                MergeOutcome::Inserted
            }
            Some(existing) if draw.richness() > existing.richness() => {
                *existing = draw;
                MergeOutcome::Replaced
            }
            Some(_) => MergeOutcome::Kept,
        }
    }

    pub fn get(&self, number: u32) -> Option<&Draw> {
        self.draws.get(&number)
    }

    /// 增量抓取的起點；空的歷史回傳 0
    pub fn latest_number(&self) -> u32 {
        self.draws.keys().next_back().copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.draws.len()
    }

    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    /// Last `n` draws in ascending order. Needs at least two stored draws.
    pub fn window(&self, n: usize) -> Result<Vec<Draw>> {
        if self.draws.len() < 2 {
            return Err(SyncError::EmptyHistory {
                available: self.draws.len(),
            });
        }
        let skip = self.draws.len().saturating_sub(n);
        Ok(self.draws.values().skip(skip).cloned().collect())
    }

    pub fn range(&self, from: u32, to: u32) -> Vec<&Draw> {
        if from > to {
            return Vec::new();
        }
        self.draws.range(from..=to).map(|(_, d)| d).collect()
    }

    pub fn draws(&self) -> Vec<Draw> {
        self.draws.values().cloned().collect()
    }

    /// Most recent `n` draw numbers, ascending.
    pub fn latest_numbers(&self, n: usize) -> Vec<u32> {
        let skip = self.draws.len().saturating_sub(n);
        self.draws.keys().skip(skip).copied().collect()
    }

    /// 最小與最大期數之間缺少的期數
    pub fn gaps(&self) -> Vec<u32> {
        self.missing_numbers().collect()
    }

    /// 依序產生缺少的期數，呼叫端可用 `take` 限制數量
    pub fn missing_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        let range = match (self.draws.keys().next(), self.draws.keys().next_back()) {
            (Some(&first), Some(&last)) => first..=last,
            _ => 1..=0,
        };
        range.filter(move |n| !self.draws.contains_key(n))
    }

    pub fn missing_count(&self) -> usize {
        match (self.draws.keys().next(), self.draws.keys().next_back()) {
            (Some(&first), Some(&last)) => (last - first) as usize + 1 - self.draws.len(),
            _ => 0,
        }
    }

    pub fn incomplete_numbers(&self) -> Vec<u32> {
        self.draws
            .values()
            .filter(|d| d.needs_repair())
            .map(|d| d.number)
            .collect()
    }

    pub fn to_json(&self) -> Result<String> {
        let draws: Vec<&Draw> = self.draws.values().collect();
        Ok(serde_json::to_string_pretty(&draws)?)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let draws: Vec<Draw> = serde_json::from_str(content)?;
        Self::from_draws(draws)
    }

    /// 檔案不存在時視為空歷史；內容毀損則回報錯誤，不覆蓋既有狀態
    pub async fn load<S: Storage>(storage: &S, path: &str) -> Result<Self> {
        match storage.read_file(path).await {
            Ok(bytes) => {
                let content = String::from_utf8(bytes).map_err(|e| {
                    SyncError::malformed(format!("history file {} is not UTF-8: {}", path, e))
                })?;
                Self::from_json(&content)
            }
            Err(SyncError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("📂 No history at {}, starting empty", path);
                Ok(Self::new())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn persist<S: Storage>(&self, storage: &S, path: &str) -> Result<()> {
        let json = self.to_json()?;
        storage.write_file(path, json.as_bytes()).await?;
        tracing::debug!("💾 Persisted {} draws to {}", self.len(), path);
        Ok(())
    }
}
