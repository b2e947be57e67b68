use clap::Parser;
use loto_sync::core::engine::RunSummary;
use loto_sync::utils::error::ErrorSeverity;
use loto_sync::utils::{logger, validation::Validate};
use loto_sync::{CliConfig, LocalStorage, SyncEngine};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    // 初始化日誌
    if config.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting loto-sync CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let storage = LocalStorage::new(config.output_path.clone());
    let result = match SyncEngine::from_config(storage, &config) {
        Ok(engine) => engine.run().await,
        Err(e) => Err(e),
    };

    match result {
        Ok(summary) => print_summary(&summary, &config.output_path),
        Err(e) => {
            tracing::error!(
                "❌ Sync failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn print_summary(summary: &RunSummary, output_path: &str) {
    let latest = summary.history.last().map(|d| d.number).unwrap_or(0);
    println!("✅ Sync completed: {} draws, latest {}", summary.history.len(), latest);
    println!(
        "   {} new, {} repaired, {} rejected, {} fetch failures",
        summary.report.inserted,
        summary.report.replaced,
        summary.report.rejected,
        summary.report.failed_fetches.len()
    );
    for output in &summary.outputs {
        println!("📁 {}/{}", output_path, output);
    }
    for error in &summary.output_errors {
        eprintln!("⚠️ {}", error);
    }
}
