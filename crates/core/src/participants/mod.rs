//! Participant domain models and the store contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Canonical status of a person within one tenant. Monotonic in normal
/// operation (prospect → visitor → member); backward moves are administrative
/// overrides, never automatic transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantStatus {
    Prospect,
    Visitor,
    Member,
    Declined,
}

impl ParticipantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantStatus::Prospect => "prospect",
            ParticipantStatus::Visitor => "visitor",
            ParticipantStatus::Member => "member",
            ParticipantStatus::Declined => "declined",
        }
    }

    pub fn parse(value: &str) -> Option<ParticipantStatus> {
        match value {
            "prospect" => Some(ParticipantStatus::Prospect),
            "visitor" => Some(ParticipantStatus::Visitor),
            "member" => Some(ParticipantStatus::Member),
            "declined" => Some(ParticipantStatus::Declined),
            _ => None,
        }
    }
}

impl std::fmt::Display for ParticipantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub company: Option<String>,
    pub line_user_id: Option<String>,
    /// Pre-membership visitor identity, when this participant entered the
    /// funnel as a visitor. Links funnel history across conversion.
    pub visitor_id: Option<String>,
    pub status: ParticipantStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewParticipant {
    pub tenant_id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub company: Option<String>,
    pub visitor_id: Option<String>,
    pub status: ParticipantStatus,
}

/// Audit-trail row written for every status change, automatic upgrades
/// included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusAudit {
    pub id: String,
    pub tenant_id: String,
    pub participant_id: String,
    pub from_status: Option<ParticipantStatus>,
    pub to_status: ParticipantStatus,
    pub reason: String,
    pub changed_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait ParticipantRepositoryTrait: Send + Sync {
    /// Fetch by `(tenant, id)`. Returns a typed not-found error when the
    /// participant does not exist in this tenant.
    async fn get(&self, tenant_id: &str, participant_id: &str) -> Result<Participant>;

    async fn create(&self, new_participant: NewParticipant) -> Result<Participant>;

    /// Mutates the status and writes the audit row in one atomic job.
    /// `changed_by` is absent for automatic transitions.
    async fn update_status(
        &self,
        tenant_id: &str,
        participant_id: &str,
        to_status: ParticipantStatus,
        reason: &str,
        changed_by: Option<&str>,
    ) -> Result<Participant>;

    /// Binds a messaging-platform user ID when not already bound; no-op
    /// otherwise.
    async fn bind_line_user_id(
        &self,
        tenant_id: &str,
        participant_id: &str,
        line_user_id: &str,
    ) -> Result<()>;

    async fn list_status_audit(
        &self,
        tenant_id: &str,
        participant_id: &str,
    ) -> Result<Vec<StatusAudit>>;
}
