//! Replays a recorded event file through a live engine.
//!
//! Each line of the file is one record:
//!
//! ```text
//! {"source":"telephony","payload":{"event":"call.answered","data":{...}}}
//! {"source":"crm","payload":[{"objectId":123,"propertyName":"dealstage",...}]}
//! {"source":"deal","payload":{"id":"123","properties":{...}}}
//! ```
//!
//! `deal` records are applied directly and also registered with the offline
//! deal lookup, so `crm` notifications for the same deal resolve (and are
//! dropped as redeliveries).

use crate::console::ConsoleMessageSink;
use anyhow::{Context, Result, bail};
use clap::Args;
use powerhour_application::{Collaborators, IngestReport, PowerHourEngine};
use powerhour_core::activity::DealDetail;
use powerhour_core::clock::SystemClock;
use powerhour_core::config::PowerHourConfig;
use powerhour_core::ports::ResultsSink;
use powerhour_core::session::SessionSnapshot;
use powerhour_infrastructure::{
    CachedOwnerDirectory, InMemoryDealLookup, JsonlResultsSink, NoopGifProvider,
    StaticOwnerDirectory, UnconfiguredDigestSource,
};
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Channel the session runs in
    #[arg(long)]
    pub channel: String,

    /// Session length in minutes (defaults to the configured duration)
    #[arg(long)]
    pub duration: Option<u32>,

    /// Config file (defaults to $POWERHOUR_CONFIG, then the user config dir)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Results log (defaults to the user data dir)
    #[arg(long)]
    pub results: Option<PathBuf>,

    /// JSON-lines event file
    pub file: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "source", content = "payload", rename_all = "snake_case")]
pub enum ReplayRecord {
    Telephony(Value),
    Crm(Value),
    Deal(DealDetail),
}

#[derive(Debug)]
pub struct ReplayOutcome {
    pub report: IngestReport,
    /// Standings as the on-demand leaderboard command renders them
    pub leaderboard: String,
    pub snapshot: SessionSnapshot,
}

pub async fn run(args: ReplayArgs) -> Result<()> {
    let (_, config) = super::load_config(args.config)?;

    let content = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let records = parse_records(&content)?;

    let results_path = match args.results.or_else(JsonlResultsSink::default_path) {
        Some(path) => path,
        None => bail!("No data directory available; pass --results"),
    };
    let results = Arc::new(JsonlResultsSink::new(results_path));

    let outcome = replay(config, &args.channel, args.duration, records, results.clone()).await?;

    let report = outcome.report;
    println!();
    println!(
        "Replayed {} events: {} applied, {} duplicates, {} ignored, {} malformed, {} upstream failures",
        report.events,
        report.applied,
        report.duplicates,
        report.ignored,
        report.malformed,
        report.upstream_failures
    );
    println!("{}", outcome.leaderboard);
    println!();
    println!("{}", serde_json::to_string_pretty(&outcome.snapshot)?);
    tracing::info!(target: "replay", "[Replay] Session archived to {}", results.path().display());

    Ok(())
}

/// Parses the event file. Blank lines are skipped.
pub fn parse_records(content: &str) -> Result<Vec<ReplayRecord>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line).with_context(|| format!("Invalid record on line {}", index + 1))
        })
        .collect()
}

/// Starts a session in `channel`, feeds every record through the engine and
/// stops it.
pub async fn replay(
    config: PowerHourConfig,
    channel: &str,
    duration: Option<u32>,
    records: Vec<ReplayRecord>,
    results: Arc<dyn ResultsSink>,
) -> Result<ReplayOutcome> {
    let deals = Arc::new(InMemoryDealLookup::new());
    for record in &records {
        if let ReplayRecord::Deal(detail) = record {
            deals.insert(detail.clone()).await;
        }
    }

    let collaborators = Collaborators {
        messages: Arc::new(ConsoleMessageSink::new()),
        deals,
        owners: Arc::new(CachedOwnerDirectory::new(StaticOwnerDirectory::from_config(
            &config,
        ))),
        gifs: Arc::new(NoopGifProvider),
        results,
        digest: Arc::new(UnconfiguredDigestSource),
    };
    let engine = Arc::new(PowerHourEngine::new(config, collaborators, Arc::new(SystemClock)));

    engine.start(channel, duration).await?;

    let mut report = IngestReport::default();
    for record in &records {
        let step = match record {
            ReplayRecord::Telephony(payload) => engine.ingest_telephony(payload).await,
            ReplayRecord::Crm(payload) => engine.ingest_crm(payload).await,
            ReplayRecord::Deal(detail) => engine.ingest_deal(detail).await,
        };
        report.merge(step);
    }

    let leaderboard = engine.handle_command(channel, "leaderboard").await;
    let snapshot = engine.stop(channel).await?;

    Ok(ReplayOutcome {
        report,
        leaderboard,
        snapshot,
    })
}
