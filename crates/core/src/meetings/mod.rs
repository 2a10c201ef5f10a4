//! Meeting domain model and lookup contract.
//!
//! Meetings are owned by the scheduling layer; the engine only resolves them
//! to validate check-in and registration targets.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    pub id: String,
    pub tenant_id: String,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMeeting {
    pub tenant_id: String,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub location: Option<String>,
}

#[async_trait]
pub trait MeetingRepositoryTrait: Send + Sync {
    /// Fetch by `(tenant, id)`; typed not-found when missing in this tenant.
    async fn get(&self, tenant_id: &str, meeting_id: &str) -> Result<Meeting>;

    async fn create(&self, new_meeting: NewMeeting) -> Result<Meeting>;
}
