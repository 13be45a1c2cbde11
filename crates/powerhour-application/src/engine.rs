//! Power Hour engine: commands, event ingestion and scheduled alerts.
//!
//! The engine owns the [`SessionRegistry`] and is the only writer of session
//! state. Every path follows the same shape: lock one session, compute what to
//! say, release the lock, then talk to collaborators. Collaborator failures
//! are logged and never undo a state change.

use crate::commands::Command;
use crate::dedup::DedupCache;
use crate::registry::{ActiveSession, SessionRegistry};
use crate::render;
use crate::scheduler::{AlertPlan, Schedule, TaskCallback};
use chrono::{Duration, NaiveDate};
use futures::FutureExt;
use powerhour_core::activity::{ActivityEvent, Classification, Classifier, DealDetail};
use powerhour_core::clock::Clock;
use powerhour_core::commentary::Notice;
use powerhour_core::config::PowerHourConfig;
use powerhour_core::digest::{self, DailyDigest, DayActivity};
use powerhour_core::error::{PowerHourError, Result};
use powerhour_core::ports::{
    DealLookup, DigestSource, GifProvider, MessageHandle, MessageSink, OwnerDirectory, ResultsSink,
};
use powerhour_core::scoring::LeaderboardEntry;
use powerhour_core::session::{EventOutcome, Session, SessionRules, SessionSnapshot, StopReason};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Outbound services the engine depends on.
#[derive(Clone)]
pub struct Collaborators {
    pub messages: Arc<dyn MessageSink>,
    pub deals: Arc<dyn DealLookup>,
    pub owners: Arc<dyn OwnerDirectory>,
    pub gifs: Arc<dyn GifProvider>,
    pub results: Arc<dyn ResultsSink>,
    pub digest: Arc<dyn DigestSource>,
}

/// What happened to one inbound payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Activity events the payload classified into
    pub events: usize,
    /// (event, session) applications
    pub applied: usize,
    pub duplicates: usize,
    pub ignored: usize,
    pub malformed: usize,
    pub upstream_failures: usize,
}

impl IngestReport {
    pub fn merge(&mut self, other: IngestReport) {
        self.events += other.events;
        self.applied += other.applied;
        self.duplicates += other.duplicates;
        self.ignored += other.ignored;
        self.malformed += other.malformed;
        self.upstream_failures += other.upstream_failures;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
enum AlertKind {
    Refresh,
    InactivitySweep,
    Halfway,
    FinalPush,
}

/// Messages computed under the session lock, delivered after it is released.
#[derive(Default)]
struct Outbox {
    notices: Vec<Notice>,
    texts: Vec<String>,
    live: Option<String>,
}

pub struct PowerHourEngine {
    config: PowerHourConfig,
    registry: SessionRegistry,
    classifier: Classifier,
    dedup: Mutex<DedupCache>,
    clock: Arc<dyn Clock>,
    collaborators: Collaborators,
}

impl PowerHourEngine {
    pub fn new(config: PowerHourConfig, collaborators: Collaborators, clock: Arc<dyn Clock>) -> Self {
        Self {
            classifier: Classifier::from_config(&config),
            dedup: Mutex::new(DedupCache::new(config.dedup_capacity)),
            registry: SessionRegistry::new(),
            config,
            clock,
            collaborators,
        }
    }

    pub fn config(&self) -> &PowerHourConfig {
        &self.config
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub async fn active_session(&self, channel: &str) -> Option<Arc<ActiveSession>> {
        self.registry.get(channel).await
    }

    // ============================================================================
    // Commands
    // ============================================================================

    /// Runs a channel command and returns the reply for the requester.
    pub async fn handle_command(self: &Arc<Self>, channel: &str, text: &str) -> String {
        match Command::parse(text) {
            Command::Start { minutes } => match self.start(channel, minutes).await {
                Ok(active) => {
                    let minutes = active.lock().await.duration_minutes();
                    format!("Power Hour started: {minutes} minutes on the clock.")
                }
                Err(e) => error_reply(&e),
            },
            Command::Stop => match self.stop(channel).await {
                Ok(snapshot) => match snapshot.winner {
                    Some(winner) => format!(
                        "Power Hour stopped. {winner} wins with {} pts.",
                        snapshot.winner_score
                    ),
                    None => "Power Hour stopped.".to_string(),
                },
                Err(e) => error_reply(&e),
            },
            Command::Leaderboard => match self.leaderboard(channel).await {
                Ok(entries) => render::current_leaderboard(&entries),
                Err(e) => error_reply(&e),
            },
            Command::Summary { date } => match self.daily_summary(channel, date).await {
                Ok(digest) => format!("Daily digest for {} posted.", digest.date),
                Err(e) => error_reply(&e),
            },
            Command::Usage => render::USAGE.to_string(),
        }
    }

    /// Starts a session in `channel` and arms its alerts.
    ///
    /// `minutes` defaults to the configured duration; zero is rejected.
    pub async fn start(self: &Arc<Self>, channel: &str, minutes: Option<u32>) -> Result<Arc<ActiveSession>> {
        let duration = minutes.unwrap_or(self.config.default_duration_minutes);
        if duration == 0 {
            return Err(PowerHourError::InvalidDuration(duration));
        }

        let now = self.clock.now();
        let session = Session::new(channel, now, duration, SessionRules::from_config(&self.config));
        let active = self.registry.insert(session).await?;
        tracing::info!(
            "[PowerHourEngine] Started session {} in {} for {} minutes",
            active.session_id(),
            channel,
            duration
        );

        let banner = render::start_banner(now, duration);
        if let Some(handle) = self.post(channel, &banner, None).await {
            active.lock().await.set_live_message(handle);
        }

        self.arm_alerts(&active, duration);

        // A stop that landed while the banner was posting has already
        // finalized the session; its alerts were never armed.
        if active.tasks().is_cancelled() {
            tracing::info!(
                "[PowerHourEngine] Session {} in {} stopped before it was armed",
                active.session_id(),
                channel
            );
            return Err(PowerHourError::no_active_session(channel));
        }
        Ok(active)
    }

    /// Explicit stop. Shares finalization with auto-stop.
    pub async fn stop(&self, channel: &str) -> Result<SessionSnapshot> {
        self.finalize(channel, StopReason::Manual, None).await
    }

    /// Current standings, without diffing or commentary.
    pub async fn leaderboard(&self, channel: &str) -> Result<Vec<LeaderboardEntry>> {
        let active = self
            .registry
            .get(channel)
            .await
            .ok_or_else(|| PowerHourError::no_active_session(channel))?;
        let session = active.lock().await;
        Ok(session.standings())
    }

    /// Builds the daily digest for `date` (today when `None`) and posts it.
    ///
    /// Today's data is required; last week's is only used for comparison and
    /// is skipped if it cannot be fetched.
    pub async fn daily_summary(&self, channel: &str, date: Option<NaiveDate>) -> Result<DailyDigest> {
        let date = date.unwrap_or_else(|| self.clock.now().date_naive());
        let today = self.fetch_day(date).await?;
        let last_week = match self.fetch_day(date - Duration::days(7)).await {
            Ok(day) => Some(day),
            Err(e) => {
                tracing::warn!("[PowerHourEngine] Digest comparison skipped: {}", e);
                None
            }
        };

        let owners = self.resolve_owners(&today).await;
        let digest = digest::build_digest(
            date,
            &today,
            last_week.as_ref(),
            &owners,
            self.config.conversation_min_seconds,
        );
        self.post(channel, &render::digest(&digest), None).await;
        Ok(digest)
    }

    // ============================================================================
    // Event ingestion
    // ============================================================================

    /// Classifies a telephony webhook body and applies it to every running
    /// session. Never fails; problems are counted and logged.
    pub async fn ingest_telephony(&self, payload: &Value) -> IngestReport {
        let mut report = IngestReport::default();
        match self.classifier.classify_call(payload, self.clock.now()) {
            Ok(classification) => self.dispatch(classification, &mut report).await,
            Err(e) => {
                tracing::warn!(target: "ingest", "[Classifier] Dropped telephony payload: {}", e);
                report.malformed += 1;
            }
        }
        report
    }

    /// Handles a CRM webhook body (one change or an array of them). Stage
    /// changes trigger a deal lookup; other property changes are ignored.
    pub async fn ingest_crm(&self, payload: &Value) -> IngestReport {
        let mut report = IngestReport::default();
        let changes = match Classifier::parse_deal_changes(payload) {
            Ok(changes) => changes,
            Err(e) => {
                tracing::warn!(target: "ingest", "[Classifier] Dropped CRM payload: {}", e);
                report.malformed += 1;
                return report;
            }
        };

        for change in changes {
            if !self.classifier.is_stage_change(&change) {
                report.ignored += 1;
                continue;
            }
            let mut detail = match self.collaborators.deals.fetch_deal(&change.deal_id).await {
                Ok(detail) => detail,
                Err(e) => {
                    tracing::warn!(
                        target: "ingest",
                        "[PowerHourEngine] Deal {} lookup failed: {}",
                        change.deal_id,
                        e
                    );
                    report.upstream_failures += 1;
                    continue;
                }
            };
            detail.id.get_or_insert(change.deal_id);
            report.merge(self.ingest_deal(&detail).await);
        }
        report
    }

    /// Applies an already-fetched deal.
    pub async fn ingest_deal(&self, detail: &DealDetail) -> IngestReport {
        let mut report = IngestReport::default();
        let owner_name = match detail.properties.hubspot_owner_id.as_deref() {
            Some(owner_id) => match self.collaborators.owners.owner_name(owner_id).await {
                Ok(name) => name,
                Err(e) => {
                    tracing::warn!(target: "ingest", "[PowerHourEngine] Owner {} lookup failed: {}", owner_id, e);
                    None
                }
            },
            None => None,
        };

        match self
            .classifier
            .classify_deal(detail, owner_name.as_deref(), self.clock.now())
        {
            Ok(classification) => self.dispatch(classification, &mut report).await,
            Err(e) => {
                tracing::warn!(target: "ingest", "[Classifier] Dropped deal: {}", e);
                report.malformed += 1;
            }
        }
        report
    }

    async fn dispatch(&self, classification: Classification, report: &mut IngestReport) {
        let events = match classification {
            Classification::Events(events) => events,
            Classification::Ignored(reason) => {
                tracing::debug!(target: "ingest", "[Classifier] Ignored: {:?}", reason);
                report.ignored += 1;
                return;
            }
        };

        for event in events {
            report.events += 1;
            if !self.first_delivery(&event) {
                tracing::debug!(target: "ingest", "[PowerHourEngine] Duplicate delivery: {:?}", event.dedup_key());
                report.duplicates += 1;
                continue;
            }
            report.applied += self.broadcast(&event).await;
        }
    }

    fn first_delivery(&self, event: &ActivityEvent) -> bool {
        match event.dedup_key() {
            Some(key) => self
                .dedup
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .insert(&key),
            None => true,
        }
    }

    /// Applies one event to every running session whose roster accepts the
    /// actor. Sessions are locked one at a time.
    async fn broadcast(&self, event: &ActivityEvent) -> usize {
        let mut applied = 0;
        for active in self.registry.active().await {
            let (outcome, live_handle) = {
                let mut session = active.lock().await;
                if active.tasks().is_cancelled() {
                    continue;
                }
                (session.apply_event(event), session.live_message().cloned())
            };
            let Some(outcome) = outcome else {
                continue;
            };
            applied += 1;
            tracing::debug!(
                "[PowerHourEngine] Applied {} by {} to {}",
                event.kind(),
                event.actor,
                active.channel()
            );
            self.deliver_outcome(&active, outcome, live_handle).await;
        }
        applied
    }

    async fn deliver_outcome(&self, active: &ActiveSession, outcome: EventOutcome, live_handle: Option<MessageHandle>) {
        if active.tasks().is_cancelled() {
            return;
        }
        let channel = active.channel();
        for notice in &outcome.notices {
            self.post_notice(channel, notice).await;
        }
        if let (Some(board), Some(handle)) = (outcome.leaderboard, live_handle) {
            let text = render::live_leaderboard(&board, self.clock.now());
            self.update(channel, &handle, &text).await;
        }
    }

    // ============================================================================
    // Scheduled alerts
    // ============================================================================

    fn arm_alerts(self: &Arc<Self>, active: &Arc<ActiveSession>, duration_minutes: u32) {
        let plan = AlertPlan::for_session(duration_minutes, &self.config);
        let tasks = active.tasks();

        tasks.spawn(
            "refresh",
            Schedule::Every(plan.refresh_every),
            self.alert_callback(active, AlertKind::Refresh),
        );
        tasks.spawn(
            "inactivity_sweep",
            Schedule::Every(plan.sweep_every),
            self.alert_callback(active, AlertKind::InactivitySweep),
        );
        if let Some(delay) = plan.halfway_after {
            tasks.spawn(
                "halfway",
                Schedule::After(delay),
                self.alert_callback(active, AlertKind::Halfway),
            );
        }
        if let Some(delay) = plan.final_push_after {
            tasks.spawn(
                "final_push",
                Schedule::After(delay),
                self.alert_callback(active, AlertKind::FinalPush),
            );
        }
        tasks.spawn(
            "auto_stop",
            Schedule::After(plan.auto_stop_after),
            self.auto_stop_callback(active),
        );

        tracing::info!(
            target: "scheduler",
            "[AlertScheduler] Armed {:?} for {}",
            tasks.labels(),
            active.channel()
        );
    }

    fn alert_callback(self: &Arc<Self>, active: &Arc<ActiveSession>, kind: AlertKind) -> TaskCallback {
        let engine = Arc::clone(self);
        let active = Arc::clone(active);
        Arc::new(move || {
            let engine = Arc::clone(&engine);
            let active = Arc::clone(&active);
            async move {
                match engine.run_alert(&active, kind).await {
                    Ok(()) => {}
                    Err(PowerHourError::StaleTaskFired { channel }) => {
                        tracing::debug!(target: "scheduler", "[AlertScheduler] Stale {} in {} skipped", kind, channel);
                    }
                    Err(e) => {
                        tracing::warn!(target: "scheduler", "[AlertScheduler] {} failed: {}", kind, e);
                    }
                }
            }
            .boxed()
        })
    }

    fn auto_stop_callback(self: &Arc<Self>, active: &Arc<ActiveSession>) -> TaskCallback {
        let engine = Arc::clone(self);
        let channel = active.channel().to_string();
        let session_id = active.session_id();
        Arc::new(move || {
            let engine = Arc::clone(&engine);
            let channel = channel.clone();
            async move {
                tracing::info!(target: "scheduler", "[AlertScheduler] Auto-stop firing for {}", channel);
                if let Err(e) = engine
                    .finalize(&channel, StopReason::AutoStop, Some(session_id))
                    .await
                {
                    tracing::debug!(target: "scheduler", "[AlertScheduler] Auto-stop skipped: {}", e);
                }
            }
            .boxed()
        })
    }

    async fn run_alert(&self, active: &ActiveSession, kind: AlertKind) -> Result<()> {
        let stale = || PowerHourError::stale_task(active.channel());
        if active.tasks().is_cancelled() {
            return Err(stale());
        }

        let now = self.clock.now();
        let (outbox, live_handle) = {
            let mut session = active.lock().await;
            if !session.is_running() || active.tasks().is_cancelled() {
                return Err(stale());
            }

            let mut outbox = Outbox::default();
            match kind {
                AlertKind::Refresh => {
                    let (board, lead) = session.refresh_leaderboard();
                    outbox.notices.extend(lead);
                    outbox.live = Some(render::live_leaderboard(&board, now));
                }
                AlertKind::InactivitySweep => {
                    outbox.notices = session.sweep_inactive(now);
                }
                AlertKind::Halfway => {
                    let (elapsed, remaining) =
                        AlertPlan::halfway_split(session.duration_minutes());
                    outbox
                        .texts
                        .push(render::halfway(elapsed, remaining, &session.standings()));
                }
                AlertKind::FinalPush => {
                    outbox.texts.push(render::final_push(
                        i64::from(self.config.final_push_lead_minutes),
                        &session.standings(),
                        self.config.close_race_gap,
                    ));
                }
            }
            (outbox, session.live_message().cloned())
        };

        if active.tasks().is_cancelled() {
            return Err(stale());
        }

        let channel = active.channel();
        for notice in &outbox.notices {
            self.post_notice(channel, notice).await;
        }
        for text in &outbox.texts {
            self.post(channel, text, None).await;
        }
        if let Some(text) = outbox.live {
            match live_handle {
                Some(handle) => self.update(channel, &handle, &text).await,
                None => {
                    // Banner never made it out; the refresh becomes the live message
                    if let Some(handle) = self.post(channel, &text, None).await {
                        active.lock().await.set_live_message(handle);
                    }
                }
            }
        }
        Ok(())
    }

    /// Single finalization path for stop and auto-stop.
    ///
    /// Removal and task cancellation happen together under the registry
    /// lock, before anything is posted.
    async fn finalize(&self, channel: &str, reason: StopReason, expected: Option<Uuid>) -> Result<SessionSnapshot> {
        let active = self
            .registry
            .remove(channel, expected)
            .await
            .ok_or_else(|| PowerHourError::no_active_session(channel))?;

        let snapshot = {
            let mut session = active.lock().await;
            session.finish(self.clock.now(), reason)
        };
        tracing::info!(
            "[PowerHourEngine] Session {} in {} finished ({}), winner: {}",
            snapshot.session_id,
            channel,
            reason,
            snapshot.winner.as_deref().unwrap_or("none")
        );

        self.post(channel, render::SESSION_COMPLETE, None).await;
        self.post(channel, &render::final_leaderboard(&snapshot.leaderboard), None)
            .await;
        if let Err(e) = self.collaborators.results.record(&snapshot).await {
            tracing::warn!("[PowerHourEngine] Failed to archive session {}: {}", snapshot.session_id, e);
        }
        Ok(snapshot)
    }

    // ============================================================================
    // Collaborator helpers
    // ============================================================================

    async fn post(&self, channel: &str, text: &str, media: Option<&str>) -> Option<MessageHandle> {
        match self.collaborators.messages.post_message(channel, text, media).await {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!("[PowerHourEngine] Failed to post to {}: {}", channel, e);
                None
            }
        }
    }

    async fn update(&self, channel: &str, handle: &MessageHandle, text: &str) {
        if let Err(e) = self
            .collaborators
            .messages
            .update_message(channel, handle, text)
            .await
        {
            tracing::warn!("[PowerHourEngine] Failed to update {} in {}: {}", handle, channel, e);
        }
    }

    async fn post_notice(&self, channel: &str, notice: &Notice) {
        let media = if notice.wants_celebration() {
            self.celebration_gif().await
        } else {
            None
        };
        self.post(channel, &render::notice(notice), media.as_deref())
            .await;
    }

    async fn celebration_gif(&self) -> Option<String> {
        match self
            .collaborators
            .gifs
            .random_gif(&self.config.celebration_query)
            .await
        {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("[PowerHourEngine] GIF lookup failed, posting without one: {}", e);
                None
            }
        }
    }

    async fn fetch_day(&self, date: NaiveDate) -> Result<DayActivity> {
        let source = &self.collaborators.digest;
        let (demos_booked, demos_completed, calls) = tokio::try_join!(
            source.demos_booked(date),
            source.demos_completed(date),
            source.answered_calls(date),
        )?;
        Ok(DayActivity {
            demos_booked,
            demos_completed,
            calls,
        })
    }

    async fn resolve_owners(&self, day: &DayActivity) -> HashMap<String, String> {
        let ids: BTreeSet<&str> = day
            .demos_booked
            .iter()
            .chain(&day.demos_completed)
            .filter_map(|deal| deal.owner_id.as_deref())
            .collect();

        let mut owners = HashMap::new();
        for id in ids {
            match self.collaborators.owners.owner_name(id).await {
                Ok(Some(name)) => {
                    owners.insert(id.to_string(), name);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("[PowerHourEngine] Owner {} lookup failed: {}", id, e),
            }
        }
        owners
    }
}

fn error_reply(error: &PowerHourError) -> String {
    match error {
        PowerHourError::AlreadyActive { .. } => render::already_active(),
        PowerHourError::NoActiveSession { .. } => render::no_active_session(),
        PowerHourError::InvalidDuration(minutes) => render::invalid_duration(*minutes),
        other => format!("Something went wrong: {other}"),
    }
}
