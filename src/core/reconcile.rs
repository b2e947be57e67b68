//! Drives one reconciliation pass: BOOTSTRAP -> INCREMENTAL -> REPAIR -> DONE.

use crate::core::history::{HistoryStore, MergeOutcome};
use crate::core::normalizer::normalize;
use crate::domain::model::RawRecord;
use crate::domain::ports::{AuthoritativeSource, BulkSource};
use crate::utils::error::{Result, SyncError};
use std::collections::HashSet;
use std::time::{Duration, Instant};

pub const DEFAULT_REPAIR_DEPTH: usize = 10;
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_millis(1000);
/// 單次執行最多逐期抓取的數量；其餘留在缺口中，下次執行繼續
pub const DEFAULT_MAX_FETCHES_PER_RUN: usize = 200;
/// 官方最新期數超前本地超過此值時視為異常資料
pub const DEFAULT_MAX_CATCH_UP: u32 = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileState {
    Bootstrap,
    Incremental,
    Repair,
    Done,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub states: Vec<ReconcileState>,
    pub inserted: usize,
    pub replaced: usize,
    pub kept: usize,
    pub rejected: usize,
    /// 本次抓取失敗的期數，下次執行時重試
    pub failed_fetches: Vec<u32>,
    pub remote_latest: Option<u32>,
}

impl ReconcileReport {
    fn record(&mut self, outcome: MergeOutcome) {
        match outcome {
            MergeOutcome::Inserted => self.inserted += 1,
            MergeOutcome::Replaced => self.replaced += 1,
            MergeOutcome::Kept => self.kept += 1,
        }
    }

    pub fn changed(&self) -> usize {
        self.inserted + self.replaced
    }
}

#[derive(Debug, Clone)]
pub struct ReconcileSettings {
    pub repair_depth: usize,
    pub request_delay: Duration,
    pub max_fetches_per_run: usize,
    pub max_catch_up: u32,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            repair_depth: DEFAULT_REPAIR_DEPTH,
            request_delay: DEFAULT_REQUEST_DELAY,
            max_fetches_per_run: DEFAULT_MAX_FETCHES_PER_RUN,
            max_catch_up: DEFAULT_MAX_CATCH_UP,
        }
    }
}

/// Enforces a minimum pause between the end of one authoritative request
/// and the start of the next.
struct Pacer {
    last_finished: Option<Instant>,
    min_interval: Duration,
}

impl Pacer {
    fn new(min_interval: Duration) -> Self {
        Self {
            last_finished: None,
            min_interval,
        }
    }

    async fn wait(&self) {
        if let Some(last) = self.last_finished {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Courtesy delay: waiting {}ms", wait_time.as_millis());
                tokio::time::sleep(wait_time).await;
            }
        }
    }

    /// 請求完成（成功或失敗）後呼叫
    fn finished(&mut self) {
        self.last_finished = Some(Instant::now());
    }
}

/// 單次執行內的可變狀態
struct Pass {
    report: ReconcileReport,
    pacer: Pacer,
    fetched: HashSet<u32>,
}

pub struct Reconciler<B: BulkSource, A: AuthoritativeSource> {
    bulk: B,
    authoritative: A,
    settings: ReconcileSettings,
}

impl<B: BulkSource, A: AuthoritativeSource> Reconciler<B, A> {
    pub fn new(bulk: B, authoritative: A, settings: ReconcileSettings) -> Self {
        Self {
            bulk,
            authoritative,
            settings,
        }
    }

    /// 只有在歷史為空且大量來源失敗時才回傳錯誤；其他失敗都略過並繼續
    pub async fn run(&self, store: &mut HistoryStore) -> Result<ReconcileReport> {
        let mut pass = Pass {
            report: ReconcileReport::default(),
            pacer: Pacer::new(self.settings.request_delay),
            fetched: HashSet::new(),
        };

        let mut state = if store.is_empty() {
            ReconcileState::Bootstrap
        } else {
            ReconcileState::Incremental
        };

        loop {
            tracing::debug!("🔄 Entering {:?}", state);
            pass.report.states.push(state);
            state = match state {
                ReconcileState::Bootstrap => {
                    self.bootstrap(store, &mut pass).await?;
                    ReconcileState::Incremental
                }
                ReconcileState::Incremental => {
                    self.incremental(store, &mut pass).await;
                    ReconcileState::Repair
                }
                ReconcileState::Repair => {
                    self.repair(store, &mut pass).await;
                    ReconcileState::Done
                }
                ReconcileState::Done => break,
            };
        }

        let report = pass.report;
        tracing::info!(
            "✅ Reconciliation done: {} inserted, {} repaired, {} unchanged, {} rejected, {} failed fetches",
            report.inserted,
            report.replaced,
            report.kept,
            report.rejected,
            report.failed_fetches.len()
        );
        Ok(report)
    }

    async fn bootstrap(&self, store: &mut HistoryStore, pass: &mut Pass) -> Result<()> {
        tracing::info!("🌱 History is empty, seeding from the bulk source");
        let records = self.bulk.fetch_all().await?;

        for raw in &records {
            Self::merge_raw(store, &mut pass.report, raw, None);
        }

        if store.is_empty() {
            return Err(SyncError::source_unavailable(
                "bulk",
                format!("none of the {} downloaded records was a valid draw", records.len()),
            ));
        }
        tracing::info!("🌱 Seeded {} draws (latest {})", store.len(), store.latest_number());
        Ok(())
    }

    async fn incremental(&self, store: &mut HistoryStore, pass: &mut Pass) {
        let local_latest = store.latest_number();

        pass.pacer.wait().await;
        let latest = self.authoritative.fetch_latest().await;
        pass.pacer.finished();
        let latest = match latest {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("⚠️ Could not query the latest draw, no new data this pass: {}", e);
                return;
            }
        };
        let latest = match normalize(&latest) {
            Ok(draw) => draw,
            Err(e) => {
                tracing::warn!("⚠️ Latest draw from the authoritative source rejected: {}", e);
                pass.report.rejected += 1;
                return;
            }
        };
        let remote_latest = latest.number;
        if remote_latest.saturating_sub(local_latest) > self.settings.max_catch_up {
            tracing::warn!(
                "⚠️ Latest draw {} is implausibly far ahead of local {}, ignoring it",
                remote_latest,
                local_latest
            );
            pass.report.rejected += 1;
            return;
        }
        pass.report.remote_latest = Some(remote_latest);

        // 先補齊歷史中的缺口（上次失敗的期數），再抓新期數；都依期數遞增
        let limit = self.settings.max_fetches_per_run;
        let mut targets: Vec<u32> = store.missing_numbers().take(limit).collect();
        if remote_latest > local_latest {
            let room = limit - targets.len();
            targets.extend((local_latest + 1..remote_latest).take(room));
        }
        let pending = store.missing_count()
            + remote_latest.saturating_sub(local_latest + 1) as usize;
        if pending > targets.len() {
            tracing::warn!(
                "⚠️ {} draw(s) missing, fetching the first {} this run",
                pending,
                targets.len()
            );
        }
        if !targets.is_empty() {
            tracing::info!(
                "📥 Fetching {} missing draw(s), local latest {} / remote latest {}",
                targets.len(),
                local_latest,
                remote_latest
            );
        }

        for number in targets {
            self.fetch_and_merge(store, pass, number).await;
        }

        pass.fetched.insert(remote_latest);
        pass.report.record(store.merge(latest));
    }

    async fn repair(&self, store: &mut HistoryStore, pass: &mut Pass) {
        let targets: Vec<u32> = store
            .latest_numbers(self.settings.repair_depth)
            .into_iter()
            .filter(|n| !pass.fetched.contains(n))
            .collect();

        tracing::info!("🩹 Re-fetching {} recent draw(s) for payout repair", targets.len());
        for number in targets {
            self.fetch_and_merge(store, pass, number).await;
        }

        let pending = store.incomplete_numbers();
        if !pending.is_empty() {
            tracing::debug!("🩹 Draws still awaiting payout data: {:?}", pending);
        }
    }

    async fn fetch_and_merge(&self, store: &mut HistoryStore, pass: &mut Pass, number: u32) {
        pass.pacer.wait().await;
        let fetched = self.authoritative.fetch_draw(number).await;
        pass.pacer.finished();
        match fetched {
            Ok(raw) => {
                pass.fetched.insert(number);
                Self::merge_raw(store, &mut pass.report, &raw, Some(number));
            }
            Err(e) => {
                tracing::warn!("⚠️ Draw {} fetch failed, will retry next run: {}", number, e);
                pass.report.failed_fetches.push(number);
            }
        }
    }

    fn merge_raw(
        store: &mut HistoryStore,
        report: &mut ReconcileReport,
        raw: &RawRecord,
        expected: Option<u32>,
    ) {
        match normalize(raw) {
            Ok(draw) if expected.is_some_and(|n| n != draw.number) => {
                tracing::warn!(
                    "⚠️ Asked for draw {:?} but the source returned {}, skipping",
                    expected,
                    draw.number
                );
                report.rejected += 1;
            }
            Ok(draw) => {
                let number = draw.number;
                let outcome = store.merge(draw);
                tracing::debug!("Draw {}: {:?}", number, outcome);
                report.record(outcome);
            }
            Err(e) => {
                tracing::warn!("⚠️ Skipping record: {}", e);
                report.rejected += 1;
            }
        }
    }
}
