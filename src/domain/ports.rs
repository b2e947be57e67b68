use crate::domain::model::RawRecord;
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn bulk_endpoint(&self) -> &str;
    fn bulk_token(&self) -> Option<&str>;
    fn latest_endpoint(&self) -> &str;
    /// 單期查詢模板，必須含 `{number}`
    fn draw_endpoint_template(&self) -> &str;
    fn authoritative_token(&self) -> Option<&str>;
    fn timeout_seconds(&self) -> u64;
    fn request_delay_ms(&self) -> u64;
    fn repair_depth(&self) -> usize;
    fn frequency_window(&self) -> usize;
    fn feature_window(&self) -> usize;
    fn detailed_count(&self) -> usize;
    fn output_path(&self) -> &str;
    fn history_file(&self) -> &str;
    fn compact_file(&self) -> &str;
    fn detailed_file(&self) -> &str;
    fn features_file(&self) -> &str;
}

/// Community mirror that returns the whole history in one payload.
#[async_trait]
pub trait BulkSource: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<RawRecord>>;
}

/// Official source, queried one draw at a time.
#[async_trait]
pub trait AuthoritativeSource: Send + Sync {
    async fn fetch_latest(&self) -> Result<RawRecord>;
    async fn fetch_draw(&self, number: u32) -> Result<RawRecord>;
}
