use chrono::{DateTime, Duration, Utc};
use powerhour_core::activity::{ActivityEvent, DealDetail, DealProperties};
use powerhour_core::config::PowerHourConfig;
use powerhour_core::error::PowerHourError;
use powerhour_core::ports::{DealLookup, DigestSource, GifProvider, ResultsSink};
use powerhour_core::session::{Session, SessionRules, SessionSnapshot, StopReason};
use powerhour_infrastructure::{
    ConfigService, InMemoryDealLookup, JsonlResultsSink, NoopGifProvider, UnconfiguredDigestSource,
};
use std::sync::Arc;
use tempfile::TempDir;

fn snapshot(channel: &str, demos: &[&str]) -> SessionSnapshot {
    let started = DateTime::from_timestamp(1_709_550_000, 0).unwrap();
    let mut session = Session::new(
        channel,
        started,
        30,
        SessionRules::from_config(&PowerHourConfig::default()),
    );
    for (i, rep) in demos.iter().enumerate() {
        session.apply_event(&ActivityEvent::demo(*rep, started, format!("Deal {i}")));
    }
    session.finish(started + Duration::minutes(30), StopReason::Manual)
}

// ============================================================================
// ConfigService
// ============================================================================

#[test]
fn test_config_file_is_loaded_and_validated() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
        default_duration_minutes = 30
        roster = ["Alice", "Bob"]
        close_race_gap = 3

        [owners]
        "101" = "Alice"
        "#,
    )
    .unwrap();

    let config = ConfigService::with_path(&path).get_config().unwrap();
    assert_eq!(config.default_duration_minutes, 30);
    assert_eq!(config.roster, vec!["Alice", "Bob"]);
    assert_eq!(config.close_race_gap, 3);
    assert_eq!(config.owners.get("101").map(String::as_str), Some("Alice"));
    assert_eq!(config.refresh_interval_minutes, 10);
}

#[test]
fn test_missing_config_file_yields_defaults() {
    let dir = TempDir::new().unwrap();
    let service = ConfigService::with_path(dir.path().join("absent.toml"));
    let config = service.get_config().unwrap();
    assert_eq!(config.default_duration_minutes, 60);
    assert_eq!(config.team_goal.demo_threshold, 12);
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "refresh_interval_minutes = 0\n").unwrap();

    let err = ConfigService::with_path(&path).get_config().unwrap_err();
    assert!(matches!(err, PowerHourError::Config(_)));
}

#[test]
fn test_malformed_toml_is_serialization_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "roster = [\"Alice\"\n").unwrap();

    let err = ConfigService::with_path(&path).get_config().unwrap_err();
    assert!(matches!(err, PowerHourError::Serialization { .. }));
}

#[test]
fn test_cache_survives_file_change_until_invalidated() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "close_race_gap = 4\n").unwrap();

    let service = ConfigService::with_path(&path);
    assert_eq!(service.get_config().unwrap().close_race_gap, 4);

    std::fs::write(&path, "close_race_gap = 9\n").unwrap();
    assert_eq!(service.get_config().unwrap().close_race_gap, 4);

    service.invalidate_cache();
    assert_eq!(service.get_config().unwrap().close_race_gap, 9);
}

// ============================================================================
// JsonlResultsSink
// ============================================================================

#[tokio::test]
async fn test_results_are_appended_one_per_line() {
    let dir = TempDir::new().unwrap();
    let sink = JsonlResultsSink::new(dir.path().join("nested").join("results.jsonl"));

    sink.record(&snapshot("C1", &["Alice", "Alice", "Bob"])).await.unwrap();
    sink.record(&snapshot("C2", &[])).await.unwrap();

    let raw = tokio::fs::read_to_string(sink.path()).await.unwrap();
    assert_eq!(raw.lines().count(), 2);

    let records = sink.records().await.unwrap();
    assert_eq!(records[0].channel, "C1");
    assert_eq!(records[0].total_demos, 3);
    assert_eq!(records[0].winner, "Alice");
    assert_eq!(records[0].winner_score, 10);
    assert_eq!(records[0].duration_minutes, 30);
    assert_eq!(records[1].winner, "N/A");
    assert_eq!(records[1].winner_score, 0);
}

#[tokio::test]
async fn test_missing_results_file_reads_empty() {
    let dir = TempDir::new().unwrap();
    let sink = JsonlResultsSink::new(dir.path().join("results.jsonl"));
    assert!(sink.records().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_concurrent_appends_keep_lines_whole() {
    let dir = TempDir::new().unwrap();
    let sink = Arc::new(JsonlResultsSink::new(dir.path().join("results.jsonl")));

    let mut handles = Vec::new();
    for i in 0..8 {
        let sink = Arc::clone(&sink);
        handles.push(tokio::spawn(async move {
            sink.record(&snapshot(&format!("C{i}"), &["Alice"])).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(sink.records().await.unwrap().len(), 8);
}

#[tokio::test]
async fn test_unwritable_results_path_is_upstream_error() {
    let dir = TempDir::new().unwrap();
    // A directory cannot be opened for appending
    let sink = JsonlResultsSink::new(dir.path());

    let err = sink.record(&snapshot("C1", &[])).await.unwrap_err();
    assert!(err.is_upstream());
}

// ============================================================================
// Offline adapters
// ============================================================================

#[tokio::test]
async fn test_in_memory_deals() {
    let deals = InMemoryDealLookup::new();
    let stored = deals
        .insert(DealDetail {
            id: Some("77".to_string()),
            properties: DealProperties {
                dealname: Some("Acme".to_string()),
                ..DealProperties::default()
            },
        })
        .await;
    assert!(stored);
    assert!(!deals.insert(DealDetail::default()).await);

    let deal = deals.fetch_deal("77").await.unwrap();
    assert_eq!(deal.properties.dealname.as_deref(), Some("Acme"));
    assert!(deals.fetch_deal("78").await.unwrap_err().is_upstream());
}

#[tokio::test]
async fn test_offline_gif_and_digest() {
    assert_eq!(NoopGifProvider.random_gif("celebration").await.unwrap(), None);

    let today = Utc::now().date_naive();
    let digest = UnconfiguredDigestSource;
    assert!(digest.demos_booked(today).await.unwrap_err().is_upstream());
    assert!(digest.demos_completed(today).await.unwrap_err().is_upstream());
    assert!(digest.answered_calls(today).await.unwrap_err().is_upstream());
}
