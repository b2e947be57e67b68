use crate::config::*;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{Result, SyncError};
use crate::utils::validation::Validate;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub sources: SourcesConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    #[serde(default)]
    pub features: FeaturesConfig,
    #[serde(default)]
    pub output: OutputConfig,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    pub bulk: BulkSourceConfig,
    pub authoritative: AuthoritativeSourceConfig,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkSourceConfig {
    pub endpoint: String,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthoritativeSourceConfig {
    pub latest_endpoint: String,
    pub draw_endpoint: String,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcileConfig {
    pub repair_depth: Option<usize>,
    pub request_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeaturesConfig {
    pub frequency_window: Option<usize>,
    pub window: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub path: String,
    pub history_file: Option<String>,
    pub compact_file: Option<String>,
    pub detailed_file: Option<String>,
    pub features_file: Option<String>,
    pub detailed_count: Option<usize>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_OUTPUT_PATH.to_string(),
            history_file: None,
            compact_file: None,
            detailed_file: None,
            features_file: None,
            detailed_count: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub json: Option<bool>,
    pub verbose: Option<bool>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(SyncError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| SyncError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${CAIXA_TOKEN})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| SyncError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn json_logs(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.json).unwrap_or(false)
    }

    pub fn verbose(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.verbose).unwrap_or(false)
    }
}

impl ConfigProvider for TomlConfig {
    fn bulk_endpoint(&self) -> &str {
        &self.sources.bulk.endpoint
    }

    fn bulk_token(&self) -> Option<&str> {
        self.sources.bulk.token.as_deref()
    }

    fn latest_endpoint(&self) -> &str {
        &self.sources.authoritative.latest_endpoint
    }

    fn draw_endpoint_template(&self) -> &str {
        &self.sources.authoritative.draw_endpoint
    }

    fn authoritative_token(&self) -> Option<&str> {
        self.sources.authoritative.token.as_deref()
    }

    fn timeout_seconds(&self) -> u64 {
        self.sources.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS)
    }

    fn request_delay_ms(&self) -> u64 {
        self.reconcile
            .request_delay_ms
            .unwrap_or(DEFAULT_REQUEST_DELAY_MS)
    }

    fn repair_depth(&self) -> usize {
        self.reconcile.repair_depth.unwrap_or(DEFAULT_REPAIR_DEPTH)
    }

    fn frequency_window(&self) -> usize {
        self.features
            .frequency_window
            .unwrap_or(DEFAULT_FREQUENCY_WINDOW)
    }

    fn feature_window(&self) -> usize {
        self.features.window.unwrap_or(DEFAULT_FEATURE_WINDOW)
    }

    fn detailed_count(&self) -> usize {
        self.output.detailed_count.unwrap_or(DEFAULT_DETAILED_COUNT)
    }

    fn output_path(&self) -> &str {
        &self.output.path
    }

    fn history_file(&self) -> &str {
        self.output
            .history_file
            .as_deref()
            .unwrap_or(DEFAULT_HISTORY_FILE)
    }

    fn compact_file(&self) -> &str {
        self.output
            .compact_file
            .as_deref()
            .unwrap_or(DEFAULT_COMPACT_FILE)
    }

    fn detailed_file(&self) -> &str {
        self.output
            .detailed_file
            .as_deref()
            .unwrap_or(DEFAULT_DETAILED_FILE)
    }

    fn features_file(&self) -> &str {
        self.output
            .features_file
            .as_deref()
            .unwrap_or(DEFAULT_FEATURES_FILE)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        // 未替換的 ${VAR} 代表環境變數缺失
        for (field, token) in [
            ("sources.bulk.token", self.bulk_token()),
            ("sources.authoritative.token", self.authoritative_token()),
        ] {
            if token.is_some_and(|t| t.starts_with("${")) {
                return Err(SyncError::MissingConfigError {
                    field: field.to_string(),
                });
            }
        }
        validate_settings(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BASIC: &str = r#"
[sources.bulk]
endpoint = "https://mirror.example.com/api/lotofacil"

[sources.authoritative]
latest_endpoint = "https://official.example.com/api/lotofacil"
draw_endpoint = "https://official.example.com/api/lotofacil/{number}"
"#;

    #[test]
    fn test_parse_basic_toml_config_with_defaults() {
        let config = TomlConfig::from_toml_str(BASIC).unwrap();

        assert_eq!(
            config.bulk_endpoint(),
            "https://mirror.example.com/api/lotofacil"
        );
        assert_eq!(config.repair_depth(), DEFAULT_REPAIR_DEPTH);
        assert_eq!(config.frequency_window(), DEFAULT_FREQUENCY_WINDOW);
        assert_eq!(config.history_file(), DEFAULT_HISTORY_FILE);
        assert_eq!(config.output_path(), DEFAULT_OUTPUT_PATH);
        assert!(!config.json_logs());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("LOTO_SYNC_TEST_TOKEN", "s3cret");

        let content = format!(
            "{}token = \"${{LOTO_SYNC_TEST_TOKEN}}\"\n",
            BASIC
        );
        let config = TomlConfig::from_toml_str(&content).unwrap();
        assert_eq!(config.authoritative_token(), Some("s3cret"));
        assert!(config.validate().is_ok());

        std::env::remove_var("LOTO_SYNC_TEST_TOKEN");
    }

    #[test]
    fn test_unset_env_var_is_reported_missing() {
        let content = format!("{}token = \"${{LOTO_SYNC_UNSET_VAR}}\"\n", BASIC);
        let config = TomlConfig::from_toml_str(&content).unwrap();
        assert!(matches!(
            config.validate(),
            Err(SyncError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_full_config_and_validation() {
        let content = format!(
            r#"{}
[reconcile]
repair_depth = 5
request_delay_ms = 250

[features]
frequency_window = 20
window = 60

[output]
path = "./out"
compact_file = "compact.json"
detailed_count = 3

[logging]
json = true
"#,
            BASIC
        );
        let config = TomlConfig::from_toml_str(&content).unwrap();
        assert_eq!(config.repair_depth(), 5);
        assert_eq!(config.request_delay_ms(), 250);
        assert_eq!(config.feature_window(), 60);
        assert_eq!(config.compact_file(), "compact.json");
        assert_eq!(config.detailed_count(), 3);
        assert!(config.json_logs());
        assert!(config.validate().is_ok());

        let bad = content.replace("window = 60", "window = 1");
        let config = TomlConfig::from_toml_str(&bad).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(BASIC.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(
            config.draw_endpoint_template(),
            "https://official.example.com/api/lotofacil/{number}"
        );
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        assert!(matches!(
            TomlConfig::from_toml_str("[sources"),
            Err(SyncError::ConfigValidationError { .. })
        ));
    }
}
