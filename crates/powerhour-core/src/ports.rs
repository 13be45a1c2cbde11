//! Outbound collaborator traits.
//!
//! The engine talks to chat, CRM, GIF search, results storage and reporting
//! only through these traits. Implementations live in the infrastructure
//! crate (or in tests); every failure is reported as
//! [`PowerHourError::UpstreamUnavailable`](crate::error::PowerHourError).

use crate::activity::DealDetail;
use crate::digest::{CallRecord, DealRecord};
use crate::error::Result;
use crate::session::SessionSnapshot;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque reference to a posted message, used to edit it later.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageHandle(pub String);

impl MessageHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Chat channel output.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Posts a new message, optionally with an image URL attached.
    async fn post_message(
        &self,
        channel: &str,
        text: &str,
        media: Option<&str>,
    ) -> Result<MessageHandle>;

    /// Replaces the text of a previously posted message.
    async fn update_message(&self, channel: &str, handle: &MessageHandle, text: &str) -> Result<()>;
}

#[async_trait]
pub trait DealLookup: Send + Sync {
    async fn fetch_deal(&self, deal_id: &str) -> Result<DealDetail>;
}

/// Resolves CRM owner ids to display names.
#[async_trait]
pub trait OwnerDirectory: Send + Sync {
    async fn owner_name(&self, owner_id: &str) -> Result<Option<String>>;
}

#[async_trait]
pub trait GifProvider: Send + Sync {
    /// Returns an image URL for `query`, or `None` when nothing matched.
    async fn random_gif(&self, query: &str) -> Result<Option<String>>;
}

/// Archive for finished sessions.
#[async_trait]
pub trait ResultsSink: Send + Sync {
    async fn record(&self, snapshot: &SessionSnapshot) -> Result<()>;
}

/// Historical activity for the daily digest.
#[async_trait]
pub trait DigestSource: Send + Sync {
    /// Deals that entered the demo stage on `date`.
    async fn demos_booked(&self, date: NaiveDate) -> Result<Vec<DealRecord>>;

    /// Deals whose demo was completed on `date`.
    async fn demos_completed(&self, date: NaiveDate) -> Result<Vec<DealRecord>>;

    /// Calls answered on `date`, of any length.
    async fn answered_calls(&self, date: NaiveDate) -> Result<Vec<CallRecord>>;
}
