//! Registry of running sessions, one per channel.

use crate::scheduler::TaskSet;
use powerhour_core::error::{PowerHourError, Result};
use powerhour_core::session::Session;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use uuid::Uuid;

/// A running session together with the tasks it owns.
///
/// Session state is only reachable through [`ActiveSession::lock`], which
/// serializes event application against alert callbacks.
#[derive(Debug)]
pub struct ActiveSession {
    channel: String,
    session_id: Uuid,
    state: Mutex<Session>,
    tasks: TaskSet,
}

impl ActiveSession {
    fn new(session: Session) -> Self {
        Self {
            channel: session.channel().to_string(),
            session_id: session.id(),
            state: Mutex::new(session),
            tasks: TaskSet::new(),
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub async fn lock(&self) -> MutexGuard<'_, Session> {
        self.state.lock().await
    }

    pub fn tasks(&self) -> &TaskSet {
        &self.tasks
    }
}

/// In-memory map of channel id to running session.
///
/// The map lock is only held for lookups and membership changes, never while
/// a session lock is held.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, Arc<ActiveSession>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new session. Fails with `AlreadyActive` if the channel
    /// already has one; the existing session is left untouched.
    pub async fn insert(&self, session: Session) -> Result<Arc<ActiveSession>> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(session.channel()) {
            return Err(PowerHourError::already_active(session.channel()));
        }

        let active = Arc::new(ActiveSession::new(session));
        sessions.insert(active.channel().to_string(), Arc::clone(&active));
        tracing::info!(
            "[SessionRegistry] Session {} registered for channel {}",
            active.session_id(),
            active.channel()
        );
        Ok(active)
    }

    pub async fn get(&self, channel: &str) -> Option<Arc<ActiveSession>> {
        let sessions = self.sessions.read().await;
        sessions.get(channel).cloned()
    }

    /// Removes the channel's session and cancels its tasks.
    ///
    /// With `expected` set, only a session with that id is removed, so a
    /// late auto-stop cannot tear down a newer session in the same channel.
    pub async fn remove(&self, channel: &str, expected: Option<Uuid>) -> Option<Arc<ActiveSession>> {
        let mut sessions = self.sessions.write().await;
        let matches = sessions
            .get(channel)
            .is_some_and(|active| expected.is_none_or(|id| active.session_id() == id));
        if !matches {
            return None;
        }

        let active = sessions.remove(channel)?;
        active.tasks().cancel_all();
        tracing::info!(
            "[SessionRegistry] Session {} removed from channel {}",
            active.session_id(),
            channel
        );
        Some(active)
    }

    /// Snapshot of the running sessions, for broadcast.
    pub async fn active(&self) -> Vec<Arc<ActiveSession>> {
        let sessions = self.sessions.read().await;
        sessions.values().cloned().collect()
    }

    pub async fn channels(&self) -> Vec<String> {
        let sessions = self.sessions.read().await;
        let mut channels: Vec<String> = sessions.keys().cloned().collect();
        channels.sort();
        channels
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
