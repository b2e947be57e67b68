//! reqwest clients for the two draw sources.

use crate::domain::model::RawRecord;
use crate::domain::ports::{AuthoritativeSource, BulkSource, ConfigProvider};
use crate::utils::error::{Result, SyncError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

pub const NUMBER_PLACEHOLDER: &str = "{number}";
const USER_AGENT: &str = concat!("loto-sync/", env!("CARGO_PKG_VERSION"));

fn build_client(timeout_seconds: u64) -> Result<Client> {
    let client = Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

/// 執行 GET 並解析 JSON；傳輸錯誤與非 2xx 狀態都轉成 `SourceUnavailable`
async fn get_json(
    client: &Client,
    source_name: &str,
    endpoint: &str,
    token: Option<&str>,
) -> Result<Value> {
    let mut request = client.get(endpoint);
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }

    tracing::debug!("📡 {}: GET {}", source_name, endpoint);
    let response = request
        .send()
        .await
        .map_err(|e| SyncError::source_unavailable(source_name, e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(SyncError::source_unavailable(
            source_name,
            format!("HTTP {} from {}", status, endpoint),
        ));
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| SyncError::source_unavailable(source_name, format!("invalid JSON: {}", e)))
}

fn into_record(source_name: &str, value: Value) -> Result<RawRecord> {
    match value {
        Value::Object(obj) => Ok(RawRecord::from_object(obj)),
        other => Err(SyncError::source_unavailable(
            source_name,
            format!("expected a JSON object, got {}", json_kind(&other)),
        )),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub struct HttpBulkSource {
    client: Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpBulkSource {
    pub const NAME: &'static str = "bulk";

    pub fn new(endpoint: String, token: Option<String>, timeout_seconds: u64) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout_seconds)?,
            endpoint,
            token,
        })
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Result<Self> {
        Self::new(
            config.bulk_endpoint().to_string(),
            config.bulk_token().map(str::to_string),
            config.timeout_seconds(),
        )
    }
}

#[async_trait]
impl BulkSource for HttpBulkSource {
    async fn fetch_all(&self) -> Result<Vec<RawRecord>> {
        let payload = get_json(
            &self.client,
            Self::NAME,
            &self.endpoint,
            self.token.as_deref(),
        )
        .await?;

        // 接受頂層陣列，或只包含一個陣列欄位的物件
        let items = match payload {
            Value::Array(items) => items,
            Value::Object(obj) => {
                let mut arrays = obj.into_iter().filter_map(|(_, v)| match v {
                    Value::Array(items) => Some(items),
                    _ => None,
                });
                match (arrays.next(), arrays.next()) {
                    (Some(items), None) => items,
                    _ => {
                        return Err(SyncError::source_unavailable(
                            Self::NAME,
                            "expected a JSON array of draws",
                        ))
                    }
                }
            }
            other => {
                return Err(SyncError::source_unavailable(
                    Self::NAME,
                    format!("expected a JSON array of draws, got {}", json_kind(&other)),
                ))
            }
        };

        let total = items.len();
        let records: Vec<RawRecord> = items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(obj) => Some(RawRecord::from_object(obj)),
                _ => None,
            })
            .collect();
        if records.len() < total {
            tracing::warn!(
                "📡 {}: ignored {} non-object entries",
                Self::NAME,
                total - records.len()
            );
        }

        tracing::info!("📡 {}: downloaded {} raw records", Self::NAME, records.len());
        Ok(records)
    }
}

pub struct HttpAuthoritativeSource {
    client: Client,
    latest_endpoint: String,
    draw_template: String,
    token: Option<String>,
}

impl HttpAuthoritativeSource {
    pub const NAME: &'static str = "authoritative";

    pub fn new(
        latest_endpoint: String,
        draw_template: String,
        token: Option<String>,
        timeout_seconds: u64,
    ) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout_seconds)?,
            latest_endpoint,
            draw_template,
            token,
        })
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Result<Self> {
        Self::new(
            config.latest_endpoint().to_string(),
            config.draw_endpoint_template().to_string(),
            config.authoritative_token().map(str::to_string),
            config.timeout_seconds(),
        )
    }

    pub fn draw_endpoint(&self, number: u32) -> String {
        self.draw_template
            .replace(NUMBER_PLACEHOLDER, &number.to_string())
    }
}

#[async_trait]
impl AuthoritativeSource for HttpAuthoritativeSource {
    async fn fetch_latest(&self) -> Result<RawRecord> {
        let payload = get_json(
            &self.client,
            Self::NAME,
            &self.latest_endpoint,
            self.token.as_deref(),
        )
        .await?;
        into_record(Self::NAME, payload)
    }

    async fn fetch_draw(&self, number: u32) -> Result<RawRecord> {
        let endpoint = self.draw_endpoint(number);
        let payload = get_json(&self.client, Self::NAME, &endpoint, self.token.as_deref()).await?;
        into_record(Self::NAME, payload)
    }
}
