//! Collaborators for running without CRM, GIF or reporting credentials.

use async_trait::async_trait;
use chrono::NaiveDate;
use powerhour_core::activity::DealDetail;
use powerhour_core::digest::{CallRecord, DealRecord};
use powerhour_core::error::{PowerHourError, Result};
use powerhour_core::ports::{DealLookup, DigestSource, GifProvider};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Deals registered up front, keyed by id.
#[derive(Debug, Default)]
pub struct InMemoryDealLookup {
    deals: RwLock<HashMap<String, DealDetail>>,
}

impl InMemoryDealLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a deal under its id. Deals without an id are skipped.
    pub async fn insert(&self, deal: DealDetail) -> bool {
        let Some(id) = deal.id.clone() else {
            return false;
        };
        self.deals.write().await.insert(id, deal);
        true
    }
}

#[async_trait]
impl DealLookup for InMemoryDealLookup {
    async fn fetch_deal(&self, deal_id: &str) -> Result<DealDetail> {
        self.deals
            .read()
            .await
            .get(deal_id)
            .cloned()
            .ok_or_else(|| PowerHourError::upstream("crm", format!("deal {deal_id} is not known offline")))
    }
}

/// Never finds an image; celebrations post text only.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopGifProvider;

#[async_trait]
impl GifProvider for NoopGifProvider {
    async fn random_gif(&self, _query: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Reports every digest query as unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredDigestSource;

impl UnconfiguredDigestSource {
    fn unavailable<T>(&self) -> Result<T> {
        Err(PowerHourError::upstream(
            "reporting",
            "no reporting source is configured",
        ))
    }
}

#[async_trait]
impl DigestSource for UnconfiguredDigestSource {
    async fn demos_booked(&self, _date: NaiveDate) -> Result<Vec<DealRecord>> {
        self.unavailable()
    }

    async fn demos_completed(&self, _date: NaiveDate) -> Result<Vec<DealRecord>> {
        self.unavailable()
    }

    async fn answered_calls(&self, _date: NaiveDate) -> Result<Vec<CallRecord>> {
        self.unavailable()
    }
}
