//! Check-in ledger models, store contract, and the attempt rate limiter.

mod rate_limiter;

pub use rate_limiter::CheckInRateLimiter;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Where the check-in attempt originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckInSource {
    Liff,
    Manual,
    Qr,
}

impl CheckInSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckInSource::Liff => "liff",
            CheckInSource::Manual => "manual",
            CheckInSource::Qr => "qr",
        }
    }

    pub fn parse(value: &str) -> Option<CheckInSource> {
        match value {
            "liff" => Some(CheckInSource::Liff),
            "manual" => Some(CheckInSource::Manual),
            "qr" => Some(CheckInSource::Qr),
            _ => None,
        }
    }
}

/// Immutable attendance fact, unique per `(tenant, participant, meeting)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckIn {
    pub id: String,
    pub tenant_id: String,
    pub participant_id: String,
    pub meeting_id: String,
    pub checkin_time: DateTime<Utc>,
    pub source: CheckInSource,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCheckIn {
    pub tenant_id: String,
    pub participant_id: String,
    pub meeting_id: String,
    pub source: CheckInSource,
}

/// Outcome of a ledger insert. Concurrent attempts for the same key are
/// resolved by the storage uniqueness constraint; the losing writer reports
/// the winning row instead of an error.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckInInsert {
    Inserted(CheckIn),
    AlreadyExists(CheckIn),
}

#[async_trait]
pub trait CheckInRepositoryTrait: Send + Sync {
    async fn find(
        &self,
        tenant_id: &str,
        participant_id: &str,
        meeting_id: &str,
    ) -> Result<Option<CheckIn>>;

    /// Appends to the ledger exactly once per key; a duplicate key yields
    /// [`CheckInInsert::AlreadyExists`] carrying the original row.
    async fn insert(&self, new_checkin: NewCheckIn) -> Result<CheckInInsert>;

    /// Historical check-in count for one participant, used by registration
    /// backfill.
    async fn count_for_participant(&self, tenant_id: &str, participant_id: &str) -> Result<i64>;
}
