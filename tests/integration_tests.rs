//! Integration tests using mock HTTP server
//!
//! Tests the full end-to-end flow: YAML pipeline → session login → paged
//! requests → landing → staging → DuckDB → watermark

use chrono::NaiveDate;
use serde_json::json;
use solidafy_stage::config::PipelineConfig;
use solidafy_stage::engine::{IncrementalExtractionLoop, RunOutcome};
use solidafy_stage::extract::ApiExtractor;
use solidafy_stage::http::HttpClient;
use solidafy_stage::load::DuckDbLoader;
use solidafy_stage::output::ArtifactReader;
use solidafy_stage::state::WatermarkStore;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn pipeline_yaml(server: &MockServer, dir: &Path) -> String {
    format!(
        r#"
name: retail
base_url: "{uri}"
auth:
  type: session
  login_url: "{uri}/login"
  login_body:
    username: "{{{{ vars.user }}}}"
    password: "{{{{ vars.pass }}}}"
  token_path: atoken
http:
  max_retries: 0
  requests_per_second: ~
state_path: "{dir}/state.json"
work_dir: "{dir}/work"
initial_watermark: "2024-01-01"
vars:
  user: alice
  pass: secret
warehouse:
  path: "{dir}/warehouse.duckdb"
  types: duckdb
snapshots:
  - name: store_info
    path: /api/stores
    record_path: data
    entity_key: plaza_unid
datasets:
  - name: store_counts
    path: /api/counts
    per_entity: true
    record_path: data
    params:
      storeId: "{{{{ entity.id }}}}"
      startTime: "{{{{ window.start_time }}}}"
      endTime: "{{{{ window.end_time }}}}"
    pagination:
      type: page_number
"#,
        uri = server.uri(),
        dir = dir.display()
    )
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_json(json!({"username": "alice", "password": "secret"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"atoken": "tok-1"})))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_stores(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/stores"))
        .and(header("authorization", "tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [
            {"plaza_unid": 7, "name": "Central"}
        ]})))
        .mount(server)
        .await;
}

async fn mount_counts(server: &MockServer, day: &str, count: i64) {
    Mock::given(method("GET"))
        .and(path("/api/counts"))
        .and(header("authorization", "tok-1"))
        .and(query_param("storeId", "7"))
        .and(query_param("startTime", format!("{day} 00:00:00")))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [
            {"store": 7, "ts": format!("{day} 09:30:00"), "visitors": count}
        ]})))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/counts"))
        .and(query_param("startTime", format!("{day} 00:00:00")))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(server)
        .await;
}

fn build_engine(config: &PipelineConfig) -> IncrementalExtractionLoop {
    let ctx = config.template_context();
    let auth = config.auth.resolve(&ctx).unwrap();
    let client = HttpClient::with_auth(config.client_config(), auth).unwrap();
    let warehouse = config.warehouse.path.as_deref().unwrap();

    IncrementalExtractionLoop::new(
        config,
        Box::new(ApiExtractor::new(client)),
        Box::new(DuckDbLoader::open(warehouse).unwrap()),
        WatermarkStore::from_file(&config.state_path)
            .unwrap()
            .with_initial(config.initial_watermark().unwrap()),
    )
    .unwrap()
    .with_context(ctx)
}

// ============================================================================
// End-to-end
// ============================================================================

#[tokio::test]
async fn test_pipeline_end_to_end() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_stores(&server).await;
    mount_counts(&server, "2024-01-01", 120).await;
    mount_counts(&server, "2024-01-02", 95).await;

    let tmp = TempDir::new().unwrap();
    let config = PipelineConfig::from_yaml(&pipeline_yaml(&server, tmp.path())).unwrap();

    let engine = build_engine(&config);
    let report = engine.run_until(date(2024, 1, 3)).await.unwrap();
    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.stats.days, 2);
    assert_eq!(report.stats.entities, 1);
    assert_eq!(report.stats.artifacts_loaded, 2);
    drop(engine);

    // Watermark persisted
    let store = WatermarkStore::from_file(&config.state_path).unwrap();
    assert_eq!(store.get_last_state().await.unwrap(), "2024-01-03");

    // Scratch directories removed
    assert!(!config.work_dir.join("store_counts").exists());

    let warehouse = DuckDbLoader::open(config.warehouse.path.as_deref().unwrap()).unwrap();
    assert_eq!(warehouse.row_count("store_info").unwrap(), 1);
    assert_eq!(warehouse.row_count("store_counts").unwrap(), 2);

    let mut visitors = warehouse.column_text("store_counts", "visitors").unwrap();
    visitors.sort();
    assert_eq!(visitors, vec![Some("120".to_string()), Some("95".to_string())]);

    let mut sources = warehouse.column_text("store_counts", "File Name").unwrap();
    sources.sort();
    assert_eq!(
        sources,
        vec![
            Some("store_counts_20240101000000.jsonl".to_string()),
            Some("store_counts_20240102000000.jsonl".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_second_run_is_up_to_date() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_stores(&server).await;
    mount_counts(&server, "2024-01-01", 120).await;

    let tmp = TempDir::new().unwrap();
    let config = PipelineConfig::from_yaml(&pipeline_yaml(&server, tmp.path())).unwrap();

    let engine = build_engine(&config);
    let first = engine.run_until(date(2024, 1, 2)).await.unwrap();
    assert_eq!(first.outcome, RunOutcome::Completed);

    let second = engine.run_until(date(2024, 1, 2)).await.unwrap();
    assert_eq!(second.outcome, RunOutcome::UpToDate);
    assert_eq!(second.stats.requests, 0);
}

#[tokio::test]
async fn test_server_error_aborts_without_advancing() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_stores(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/counts"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let config = PipelineConfig::from_yaml(&pipeline_yaml(&server, tmp.path())).unwrap();

    let engine = build_engine(&config);
    let report = engine.run_until(date(2024, 1, 3)).await.unwrap();
    assert!(matches!(report.outcome, RunOutcome::Aborted { .. }));

    // Initial watermark never written back
    assert!(!config.state_path.exists());
    assert_eq!(engine.store().get_last_state().await.unwrap(), "2024-01-01");

    // The snapshot artifact was already loaded and its landing kept
    let snapshot = config.work_dir.join("store_info").join("store_info.jsonl");
    assert!(snapshot.exists());
}

// ============================================================================
// Staging without extraction
// ============================================================================

#[test]
fn test_stage_directory_and_read_back() {
    use solidafy_stage::output::StagingDialect;
    use solidafy_stage::schema::WarehouseTypes;
    use solidafy_stage::stage::StagingPass;

    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("visits");
    std::fs::create_dir_all(&input).unwrap();
    std::fs::write(
        input.join("visits_20240101000000.jsonl"),
        "{\"id\": 1, \"seen\": \"2024-01-01 10:00:00\", \"who\": \"ann\"}\n\
         {\"id\": 2, \"seen\": null, \"who\": \"bob\"}\n",
    )
    .unwrap();

    let report = StagingPass::new(tmp.path().join("stage"), StagingDialect::new(), WarehouseTypes::snowflake())
        .run(&input)
        .unwrap();
    assert_eq!(report.staged(), 1);
    assert_eq!(report.artifact.rows, 2);
    assert_eq!(
        report.artifact.ddl,
        r#""id" NUMBER, "seen" TIMESTAMP, "who" TEXT, "File Name" TEXT"#
    );

    let table = ArtifactReader::default().read(&report.artifact.files[0]).unwrap();
    let records = table.to_records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1]["who"], json!("bob"));
    assert_eq!(records[1]["seen"], json!(null));
}
