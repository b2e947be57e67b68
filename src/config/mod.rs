pub mod toml_config;

use crate::adapters::http::NUMBER_PLACEHOLDER;
pub use crate::core::projector::DEFAULT_DETAILED_COUNT;
pub use crate::core::reconcile::DEFAULT_REPAIR_DEPTH;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_endpoint_template, validate_file_extensions, validate_non_empty_string,
    validate_path, validate_positive_number, validate_range, validate_url,
};

pub const DEFAULT_BULK_ENDPOINT: &str = "https://loteriascaixa-api.herokuapp.com/api/lotofacil";
pub const DEFAULT_LATEST_ENDPOINT: &str =
    "https://servicebus2.caixa.gov.br/portaldeloterias/api/lotofacil";
pub const DEFAULT_DRAW_ENDPOINT: &str =
    "https://servicebus2.caixa.gov.br/portaldeloterias/api/lotofacil/{number}";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 1000;
pub const DEFAULT_FREQUENCY_WINDOW: usize = 30;
pub const DEFAULT_FEATURE_WINDOW: usize = 100;
pub const DEFAULT_OUTPUT_PATH: &str = "./api";
pub const DEFAULT_HISTORY_FILE: &str = "history.json";
pub const DEFAULT_COMPACT_FILE: &str = "lotofacil_compact.json";
pub const DEFAULT_DETAILED_FILE: &str = "lotofacil_detailed.json";
pub const DEFAULT_FEATURES_FILE: &str = "lotofacil_features.json";

/// 兩種設定來源共用的檢查
pub fn validate_settings<C: ConfigProvider + ?Sized>(config: &C) -> Result<()> {
    validate_url("bulk_endpoint", config.bulk_endpoint())?;
    validate_url("latest_endpoint", config.latest_endpoint())?;
    validate_endpoint_template(
        "draw_endpoint",
        config.draw_endpoint_template(),
        NUMBER_PLACEHOLDER,
    )?;
    if let Some(token) = config.bulk_token() {
        validate_non_empty_string("bulk_token", token)?;
    }
    if let Some(token) = config.authoritative_token() {
        validate_non_empty_string("authoritative_token", token)?;
    }

    validate_range("timeout_seconds", config.timeout_seconds(), 1, 600)?;
    validate_range("repair_depth", config.repair_depth(), 1, 100)?;
    validate_positive_number("frequency_window", config.frequency_window(), 1)?;
    validate_positive_number("feature_window", config.feature_window(), 2)?;
    validate_positive_number("detailed_count", config.detailed_count(), 1)?;

    validate_path("output_path", config.output_path())?;
    validate_file_extensions(
        "output files",
        &[
            config.history_file(),
            config.compact_file(),
            config.detailed_file(),
            config.features_file(),
        ],
        &["json"],
    )?;
    Ok(())
}

#[cfg(feature = "cli")]
pub use cli::CliConfig;

#[cfg(feature = "cli")]
mod cli {
    use super::*;
    use crate::utils::validation::Validate;
    use clap::Parser;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize, Parser)]
    #[command(name = "loto-sync")]
    #[command(about = "Reconciles lottery draw history and derives draw statistics")]
    pub struct CliConfig {
        #[arg(long, default_value = DEFAULT_BULK_ENDPOINT)]
        pub bulk_endpoint: String,

        #[arg(long)]
        pub bulk_token: Option<String>,

        #[arg(long, default_value = DEFAULT_LATEST_ENDPOINT)]
        pub latest_endpoint: String,

        #[arg(long, default_value = DEFAULT_DRAW_ENDPOINT, help = "Per-draw URL template containing {number}")]
        pub draw_endpoint: String,

        #[arg(long)]
        pub authoritative_token: Option<String>,

        #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECONDS)]
        pub timeout_seconds: u64,

        #[arg(long, default_value_t = DEFAULT_REQUEST_DELAY_MS)]
        pub request_delay_ms: u64,

        #[arg(long, default_value_t = DEFAULT_REPAIR_DEPTH)]
        pub repair_depth: usize,

        #[arg(long, default_value_t = DEFAULT_FREQUENCY_WINDOW)]
        pub frequency_window: usize,

        #[arg(long, default_value_t = DEFAULT_FEATURE_WINDOW)]
        pub feature_window: usize,

        #[arg(long, default_value_t = DEFAULT_DETAILED_COUNT)]
        pub detailed_count: usize,

        #[arg(long, default_value = DEFAULT_OUTPUT_PATH)]
        pub output_path: String,

        #[arg(long, default_value = DEFAULT_HISTORY_FILE)]
        pub history_file: String,

        #[arg(long, default_value = DEFAULT_COMPACT_FILE)]
        pub compact_file: String,

        #[arg(long, default_value = DEFAULT_DETAILED_FILE)]
        pub detailed_file: String,

        #[arg(long, default_value = DEFAULT_FEATURES_FILE)]
        pub features_file: String,

        #[arg(long, help = "Emit JSON log lines")]
        pub json_logs: bool,

        #[arg(long, help = "Enable verbose output")]
        pub verbose: bool,
    }

    impl ConfigProvider for CliConfig {
        fn bulk_endpoint(&self) -> &str {
            &self.bulk_endpoint
        }

        fn bulk_token(&self) -> Option<&str> {
            self.bulk_token.as_deref()
        }

        fn latest_endpoint(&self) -> &str {
            &self.latest_endpoint
        }

        fn draw_endpoint_template(&self) -> &str {
            &self.draw_endpoint
        }

        fn authoritative_token(&self) -> Option<&str> {
            self.authoritative_token.as_deref()
        }

        fn timeout_seconds(&self) -> u64 {
            self.timeout_seconds
        }

        fn request_delay_ms(&self) -> u64 {
            self.request_delay_ms
        }

        fn repair_depth(&self) -> usize {
            self.repair_depth
        }

        fn frequency_window(&self) -> usize {
            self.frequency_window
        }

        fn feature_window(&self) -> usize {
            self.feature_window
        }

        fn detailed_count(&self) -> usize {
            self.detailed_count
        }

        fn output_path(&self) -> &str {
            &self.output_path
        }

        fn history_file(&self) -> &str {
            &self.history_file
        }

        fn compact_file(&self) -> &str {
            &self.compact_file
        }

        fn detailed_file(&self) -> &str {
            &self.detailed_file
        }

        fn features_file(&self) -> &str {
            &self.features_file
        }
    }

    impl Validate for CliConfig {
        fn validate(&self) -> crate::utils::error::Result<()> {
            validate_settings(self)
        }
    }

}
