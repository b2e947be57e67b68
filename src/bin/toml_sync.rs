use anyhow::Context;
use clap::Parser;
use loto_sync::config::toml_config::TomlConfig;
use loto_sync::core::ConfigProvider;
use loto_sync::utils::error::ErrorSeverity;
use loto_sync::utils::{logger, validation::Validate};
use loto_sync::{LocalStorage, SyncEngine};

#[derive(Parser)]
#[command(name = "toml-sync")]
#[command(about = "Draw history sync driven by a TOML configuration file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "loto-sync.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override the courtesy delay between official-source requests
    #[arg(long)]
    request_delay_ms: Option<u64>,

    /// Dry run - show the resolved configuration without fetching anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = TomlConfig::from_file(&args.config)
        .with_context(|| format!("Failed to load config file '{}'", args.config))?;

    if config.json_logs() {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose || config.verbose());
    }
    tracing::info!("🚀 Starting TOML-based draw sync");
    tracing::info!("📁 Loaded configuration from: {}", args.config);

    // 命令列覆蓋設定
    if let Some(delay) = args.request_delay_ms {
        config.reconcile.request_delay_ms = Some(delay);
        tracing::info!("🔧 Courtesy delay overridden to: {}ms", delay);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    display_config_summary(&config);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No requests will be made");
        return Ok(());
    }

    let storage = LocalStorage::new(config.output_path().to_string());
    let engine = SyncEngine::from_config(storage, &config)
        .context("Failed to build HTTP clients")?;

    match engine.run().await {
        Ok(summary) => {
            tracing::info!(
                "✅ Sync completed: {} draws, {} new, {} repaired",
                summary.history.len(),
                summary.report.inserted,
                summary.report.replaced
            );
            if let Some(features) = &summary.features {
                tracing::info!("📊 Statistics computed for draw {}", features.draw_number);
            }
            println!("✅ Sync completed successfully!");
            Ok(())
        }
        Err(e) => {
            tracing::error!(
                "❌ Sync failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
            Ok(())
        }
    }
}

fn display_config_summary(config: &TomlConfig) {
    tracing::info!("📋 Configuration Summary:");
    tracing::info!("   Bulk source: {}", config.bulk_endpoint());
    tracing::info!("   Latest draw: {}", config.latest_endpoint());
    tracing::info!("   Draw template: {}", config.draw_endpoint_template());
    tracing::info!(
        "   Repair depth: {}, courtesy delay: {}ms",
        config.repair_depth(),
        config.request_delay_ms()
    );
    tracing::info!(
        "   Frequency window: {}, feature window: {}",
        config.frequency_window(),
        config.feature_window()
    );
    tracing::info!("   Output: {}/{}", config.output_path(), config.history_file());
}
