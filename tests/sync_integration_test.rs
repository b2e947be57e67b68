use anyhow::Result;
use httpmock::prelude::*;
use loto_sync::config::toml_config::TomlConfig;
use loto_sync::core::normalizer::normalize;
use loto_sync::core::reconcile::ReconcileState;
use loto_sync::domain::model::{RawRecord, Richness};
use loto_sync::domain::ports::Storage;
use loto_sync::{HistoryStore, LocalStorage, SyncEngine, SyncError};
use serde_json::{json, Value};
use tempfile::TempDir;

fn numbers_for(number: u32) -> Vec<u32> {
    let offset = number % 11;
    (1 + offset..=15 + offset).collect()
}

/// 社群鏡像格式：沒有獎金資料
fn mirror_record(number: u32) -> Value {
    json!({
        "concurso": number,
        "data": "02/01/2024",
        "dezenas": numbers_for(number)
            .iter()
            .map(|n| format!("{:02}", n))
            .collect::<Vec<_>>(),
        "acumulou": false
    })
}

/// 官方格式：完整的五個獎項
fn official_record(number: u32, jackpot_prize: f64, jackpot_winners: u64) -> Value {
    json!({
        "numero": number,
        "dataApuracao": "02/01/2024",
        "listaDezenas": numbers_for(number),
        "acumulado": false,
        "valorAcumuladoProximoConcurso": 0.0,
        "listaRateioPremio": [
            {"descricaoFaixa": "15 acertos", "faixa": 1, "numeroDeGanhadores": jackpot_winners, "valorPremio": jackpot_prize},
            {"descricaoFaixa": "14 acertos", "faixa": 2, "numeroDeGanhadores": 310, "valorPremio": 1687.52},
            {"descricaoFaixa": "13 acertos", "faixa": 3, "numeroDeGanhadores": 9875, "valorPremio": 30.0},
            {"descricaoFaixa": "12 acertos", "faixa": 4, "numeroDeGanhadores": 120044, "valorPremio": 12.0},
            {"descricaoFaixa": "11 acertos", "faixa": 5, "numeroDeGanhadores": 654321, "valorPremio": 6.0}
        ]
    })
}

fn config_for(server: &MockServer, output: &str, repair_depth: usize) -> Result<TomlConfig> {
    let content = format!(
        r#"
[sources]
timeout_seconds = 5

[sources.bulk]
endpoint = "{}"

[sources.authoritative]
latest_endpoint = "{}"
draw_endpoint = "{}"

[reconcile]
repair_depth = {}
request_delay_ms = 0

[output]
path = "{}"
"#,
        server.url("/mirror"),
        server.url("/official"),
        server.url("/official/{number}"),
        repair_depth,
        output
    );
    Ok(TomlConfig::from_toml_str(&content)?)
}

async fn seed_history(storage: &LocalStorage, records: Vec<Value>) -> Result<()> {
    let mut draws = Vec::new();
    for record in records {
        let Value::Object(obj) = record else {
            anyhow::bail!("seed record must be an object");
        };
        draws.push(normalize(&RawRecord::from_object(obj))?);
    }
    HistoryStore::from_draws(draws)?
        .persist(storage, "history.json")
        .await?;
    Ok(())
}

async fn read_history(storage: &LocalStorage) -> Result<HistoryStore> {
    let bytes = storage.read_file("history.json").await?;
    Ok(HistoryStore::from_json(&String::from_utf8(bytes)?)?)
}

/// 空歷史：大量來源建立基礎，官方來源補最新一期並修復最近的期數
#[tokio::test]
async fn test_bootstrap_run_writes_history_and_views() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output = temp_dir.path().to_str().unwrap().replace('\\', "/");
    let server = MockServer::start();

    let bulk_mock = server.mock(|when, then| {
        when.method(GET).path("/mirror");
        then.status(200).json_body(json!([
            mirror_record(1),
            mirror_record(2),
            mirror_record(3),
            {"concurso": 99, "dezenas": [1, 2]}
        ]));
    });
    let latest_mock = server.mock(|when, then| {
        when.method(GET).path("/official");
        then.status(200)
            .json_body(official_record(4, 1_500_000.0, 1));
    });
    let draw2_mock = server.mock(|when, then| {
        when.method(GET).path("/official/2");
        then.status(200).json_body(official_record(2, 0.0, 0));
    });
    let draw3_mock = server.mock(|when, then| {
        when.method(GET).path("/official/3");
        then.status(200)
            .json_body(official_record(3, 870_000.0, 2));
    });

    let config = config_for(&server, &output, 3)?;
    let storage = LocalStorage::new(output.clone());
    let summary = SyncEngine::from_config(storage.clone(), &config)?
        .run()
        .await?;

    bulk_mock.assert();
    latest_mock.assert();
    draw2_mock.assert();
    draw3_mock.assert();

    let report = &summary.report;
    assert_eq!(
        report.states,
        vec![
            ReconcileState::Bootstrap,
            ReconcileState::Incremental,
            ReconcileState::Repair,
            ReconcileState::Done
        ]
    );
    assert_eq!(report.inserted, 4);
    assert_eq!(report.replaced, 2);
    assert_eq!(report.rejected, 1);
    assert_eq!(report.remote_latest, Some(4));
    assert!(report.failed_fetches.is_empty());

    let history = read_history(&storage).await?;
    assert_eq!(history.len(), 4);
    assert_eq!(history.get(1).map(|d| d.richness()), Some(Richness::Empty));
    for number in 2..=4 {
        assert_eq!(
            history.get(number).map(|d| d.richness()),
            Some(Richness::Complete)
        );
    }

    let features = summary.features.as_ref().expect("features for 4 draws");
    assert_eq!(features.draw_number, 4);
    assert_eq!(features.window_size, 4);

    let compact: Value =
        serde_json::from_slice(&storage.read_file("lotofacil_compact.json").await?)?;
    assert_eq!(compact.as_array().map(Vec::len), Some(4));
    assert_eq!(compact[0]["c"], 1);
    assert_eq!(compact[3]["d"].as_array().map(Vec::len), Some(15));

    let detailed: Value =
        serde_json::from_slice(&storage.read_file("lotofacil_detailed.json").await?)?;
    assert_eq!(detailed[0]["number"], 4);

    let view: Value =
        serde_json::from_slice(&storage.read_file("lotofacil_features.json").await?)?;
    assert!(view.get("generatedAt").is_some());
    assert_eq!(view["drawNumber"], 4);

    assert_eq!(summary.outputs.len(), 3);
    assert!(summary.output_errors.is_empty());
    Ok(())
}

/// 既有歷史：補缺口與新期數、失敗的期數留待下次、可疑獎金被修復
#[tokio::test]
async fn test_incremental_run_fills_gaps_and_repairs() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output = temp_dir.path().to_str().unwrap().replace('\\', "/");
    let storage = LocalStorage::new(output.clone());
    seed_history(
        &storage,
        vec![
            official_record(1, 500_000.0, 1),
            official_record(2, 500_000.0, 1),
            official_record(3, 500_000.0, 1),
            official_record(5, 0.0, 3),
        ],
    )
    .await?;

    let server = MockServer::start();
    let bulk_mock = server.mock(|when, then| {
        when.method(GET).path("/mirror");
        then.status(200).json_body(json!([]));
    });
    server.mock(|when, then| {
        when.method(GET).path("/official");
        then.status(200)
            .json_body(official_record(7, 2_000_000.0, 1));
    });
    let gap_mock = server.mock(|when, then| {
        when.method(GET).path("/official/4");
        then.status(200)
            .json_body(official_record(4, 650_000.0, 1));
    });
    let failing_mock = server.mock(|when, then| {
        when.method(GET).path("/official/6");
        then.status(503).body("maintenance");
    });
    let repair_mock = server.mock(|when, then| {
        when.method(GET).path("/official/5");
        then.status(200)
            .json_body(official_record(5, 1_200_000.0, 3));
    });

    let config = config_for(&server, &output, 3)?;
    let summary = SyncEngine::from_config(storage.clone(), &config)?
        .run()
        .await?;

    bulk_mock.assert_hits(0);
    gap_mock.assert();
    failing_mock.assert();
    repair_mock.assert();

    let report = &summary.report;
    assert_eq!(
        report.states,
        vec![
            ReconcileState::Incremental,
            ReconcileState::Repair,
            ReconcileState::Done
        ]
    );
    assert_eq!(report.inserted, 2);
    assert_eq!(report.replaced, 1);
    assert_eq!(report.failed_fetches, vec![6]);

    let history = read_history(&storage).await?;
    assert_eq!(history.len(), 6);
    assert_eq!(history.gaps(), vec![6]);
    assert!(history.get(5).is_some_and(|d| !d.is_suspicious()));
    assert_eq!(history.latest_number(), 7);
    Ok(())
}

#[tokio::test]
async fn test_bootstrap_failure_leaves_no_history() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output = temp_dir.path().to_str().unwrap().replace('\\', "/");
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET).path("/mirror");
        then.status(503);
    });
    let latest_mock = server.mock(|when, then| {
        when.method(GET).path("/official");
        then.status(200).json_body(official_record(4, 1.0, 1));
    });

    let config = config_for(&server, &output, 3)?;
    let result = SyncEngine::from_config(LocalStorage::new(output.clone()), &config)?
        .run()
        .await;

    assert!(matches!(result, Err(SyncError::SourceUnavailable { .. })));
    latest_mock.assert_hits(0);
    assert!(!temp_dir.path().join("history.json").exists());
    assert!(!temp_dir.path().join("lotofacil_compact.json").exists());
    Ok(())
}

/// 只有一期時不計算統計，但仍輸出歷史視圖
#[tokio::test]
async fn test_single_draw_skips_features() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output = temp_dir.path().to_str().unwrap().replace('\\', "/");
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET).path("/mirror");
        then.status(200).json_body(json!([mirror_record(1)]));
    });
    server.mock(|when, then| {
        when.method(GET).path("/official");
        then.status(200)
            .json_body(official_record(1, 900_000.0, 1));
    });
    let repair_mock = server.mock(|when, then| {
        when.method(GET).path("/official/1");
        then.status(200)
            .json_body(official_record(1, 900_000.0, 1));
    });

    let config = config_for(&server, &output, 10)?;
    let storage = LocalStorage::new(output.clone());
    let summary = SyncEngine::from_config(storage.clone(), &config)?
        .run()
        .await?;

    // 最新一期已在本次取得，修復階段不再重抓
    repair_mock.assert_hits(0);
    assert_eq!(summary.report.inserted, 1);
    assert_eq!(summary.report.replaced, 1);
    assert!(summary.features.is_none());
    assert_eq!(summary.history.len(), 1);
    assert_eq!(summary.outputs.len(), 2);
    assert!(temp_dir.path().join("lotofacil_compact.json").exists());
    assert!(!temp_dir.path().join("lotofacil_features.json").exists());
    Ok(())
}

/// 官方來源無法連線時保留現有歷史
#[tokio::test]
async fn test_authoritative_outage_keeps_history() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output = temp_dir.path().to_str().unwrap().replace('\\', "/");
    let storage = LocalStorage::new(output.clone());
    seed_history(&storage, vec![mirror_record(1), mirror_record(2)]).await?;

    let server = MockServer::start();
    for path in ["/official", "/official/1", "/official/2"] {
        server.mock(|when, then| {
            when.method(GET).path(path);
            then.status(500);
        });
    }

    let config = config_for(&server, &output, 10)?;
    let summary = SyncEngine::from_config(storage.clone(), &config)?
        .run()
        .await?;

    assert_eq!(summary.report.remote_latest, None);
    assert_eq!(summary.report.failed_fetches, vec![1, 2]);
    assert_eq!(summary.report.changed(), 0);

    let history = read_history(&storage).await?;
    assert_eq!(history.len(), 2);
    assert_eq!(history.incomplete_numbers(), vec![1, 2]);
    assert!(summary.features.is_some());
    Ok(())
}

#[tokio::test]
async fn test_corrupt_history_is_not_overwritten() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output = temp_dir.path().to_str().unwrap().replace('\\', "/");
    let history_path = temp_dir.path().join("history.json");
    tokio::fs::write(&history_path, "{not json").await?;

    let server = MockServer::start();
    let bulk_mock = server.mock(|when, then| {
        when.method(GET).path("/mirror");
        then.status(200).json_body(json!([mirror_record(1)]));
    });

    let config = config_for(&server, &output, 3)?;
    let result = SyncEngine::from_config(LocalStorage::new(output.clone()), &config)?
        .run()
        .await;

    assert!(result.is_err());
    bulk_mock.assert_hits(0);
    assert_eq!(tokio::fs::read_to_string(&history_path).await?, "{not json");
    Ok(())
}
