use crate::adapters::http::{HttpAuthoritativeSource, HttpBulkSource};
use crate::core::features::{FeatureBundle, FeatureEngine};
use crate::core::history::HistoryStore;
use crate::core::projector;
use crate::core::reconcile::{ReconcileReport, ReconcileSettings, Reconciler};
use crate::domain::model::Draw;
use crate::domain::ports::{AuthoritativeSource, BulkSource, ConfigProvider, Storage};
use crate::utils::error::{Result, SyncError};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub history_file: String,
    pub compact_file: String,
    pub detailed_file: String,
    pub features_file: String,
    pub feature_window: usize,
    pub detailed_count: usize,
}

impl EngineOptions {
    pub fn from_config<C: ConfigProvider>(config: &C) -> Self {
        Self {
            history_file: config.history_file().to_string(),
            compact_file: config.compact_file().to_string(),
            detailed_file: config.detailed_file().to_string(),
            features_file: config.features_file().to_string(),
            feature_window: config.feature_window(),
            detailed_count: config.detailed_count(),
        }
    }
}

/// Result of one process run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub report: ReconcileReport,
    pub history: Vec<Draw>,
    pub features: Option<FeatureBundle>,
    pub outputs: Vec<String>,
    pub output_errors: Vec<String>,
    pub duration: Duration,
}

pub struct SyncEngine<S: Storage, B: BulkSource, A: AuthoritativeSource> {
    storage: S,
    reconciler: Reconciler<B, A>,
    features: FeatureEngine,
    options: EngineOptions,
}

impl<S: Storage> SyncEngine<S, HttpBulkSource, HttpAuthoritativeSource> {
    /// 建立 HTTP 來源；client 建立失敗時回傳 `ApiError`
    pub fn from_config<C: ConfigProvider>(storage: S, config: &C) -> Result<Self> {
        let settings = ReconcileSettings {
            repair_depth: config.repair_depth(),
            request_delay: Duration::from_millis(config.request_delay_ms()),
            ..ReconcileSettings::default()
        };
        let reconciler = Reconciler::new(
            HttpBulkSource::from_config(config)?,
            HttpAuthoritativeSource::from_config(config)?,
            settings,
        );
        Ok(Self::new(
            storage,
            reconciler,
            FeatureEngine::new(config.frequency_window()),
            EngineOptions::from_config(config),
        ))
    }
}

impl<S: Storage, B: BulkSource, A: AuthoritativeSource> SyncEngine<S, B, A> {
    pub fn new(
        storage: S,
        reconciler: Reconciler<B, A>,
        features: FeatureEngine,
        options: EngineOptions,
    ) -> Self {
        Self {
            storage,
            reconciler,
            features,
            options,
        }
    }

    /// 載入 → 對帳 → 儲存一次 → 計算特徵 → 輸出視圖
    pub async fn run(&self) -> Result<RunSummary> {
        let started = Instant::now();
        tracing::info!("🚀 Starting draw history sync");

        let mut store = HistoryStore::load(&self.storage, &self.options.history_file).await?;
        tracing::info!(
            "📂 Loaded {} draws (latest {})",
            store.len(),
            store.latest_number()
        );

        let report = self.reconciler.run(&mut store).await?;

        // 整次對帳成功後才寫入；中途失敗保留上一次的檔案
        store
            .persist(&self.storage, &self.options.history_file)
            .await?;
        tracing::info!(
            "💾 History saved: {} draws, latest {}",
            store.len(),
            store.latest_number()
        );

        let features = match store
            .window(self.options.feature_window)
            .and_then(|window| self.features.compute(&window))
        {
            Ok(bundle) => Some(bundle),
            Err(e @ SyncError::EmptyHistory { .. }) => {
                tracing::warn!("⚠️ Skipping statistics: {}", e);
                None
            }
            Err(e) => return Err(e),
        };

        let history = store.draws();
        let (outputs, output_errors) = self.project(&history, features.as_ref()).await;

        let duration = started.elapsed();
        tracing::info!("✅ Sync finished in {:?}", duration);

        Ok(RunSummary {
            report,
            history,
            features,
            outputs,
            output_errors,
            duration,
        })
    }

    /// 視圖寫入失敗只回報，不影響已儲存的歷史
    async fn project(
        &self,
        history: &[Draw],
        features: Option<&FeatureBundle>,
    ) -> (Vec<String>, Vec<String>) {
        let mut rendered = vec![
            (
                self.options.compact_file.as_str(),
                projector::render_compact(history),
            ),
            (
                self.options.detailed_file.as_str(),
                projector::render_detailed(history, self.options.detailed_count),
            ),
        ];
        if let Some(bundle) = features {
            rendered.push((
                self.options.features_file.as_str(),
                projector::render_features(bundle, chrono::Utc::now()),
            ));
        }

        let mut outputs = Vec::new();
        let mut errors = Vec::new();
        for (path, content) in rendered {
            let written = match content {
                Ok(content) => self.storage.write_file(path, content.as_bytes()).await,
                Err(e) => Err(e),
            };
            match written {
                Ok(()) => {
                    tracing::debug!("📁 Wrote {}", path);
                    outputs.push(path.to_string());
                }
                Err(e) => {
                    tracing::error!("❌ Failed to write {}: {}", path, e);
                    errors.push(format!("{}: {}", path, e));
                }
            }
        }
        (outputs, errors)
    }
}
