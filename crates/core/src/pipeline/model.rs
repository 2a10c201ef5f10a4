//! Pipeline record domain models and the store contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::pipeline::PipelineStage;

/// Subject identity of a pipeline record.
///
/// A record created before membership conversion is visitor-only; conversion
/// links the participant onto the same row. Lookups match on either pointer,
/// and that OR is encapsulated in one storage function rather than inlined at
/// call sites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonRef {
    pub visitor_id: Option<String>,
    pub participant_id: Option<String>,
}

impl PersonRef {
    pub fn visitor(visitor_id: impl Into<String>) -> Self {
        Self {
            visitor_id: Some(visitor_id.into()),
            participant_id: None,
        }
    }

    pub fn participant(participant_id: impl Into<String>) -> Self {
        Self {
            visitor_id: None,
            participant_id: Some(participant_id.into()),
        }
    }

    pub fn linked(visitor_id: impl Into<String>, participant_id: impl Into<String>) -> Self {
        Self {
            visitor_id: Some(visitor_id.into()),
            participant_id: Some(participant_id.into()),
        }
    }

    /// Stable identity key for the active-record uniqueness constraint:
    /// the visitor ID when present, otherwise the participant ID.
    pub fn person_key(&self) -> Result<&str> {
        self.visitor_id
            .as_deref()
            .or(self.participant_id.as_deref())
            .ok_or_else(|| Error::validation("PersonRef must carry a visitor or participant ID"))
    }
}

/// A person's live position in the funnel. At most one non-archived record
/// exists per `(tenant, person)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRecord {
    pub id: String,
    pub tenant_id: String,
    pub visitor_id: Option<String>,
    pub participant_id: Option<String>,
    pub person_key: String,
    pub current_stage: PipelineStage,
    pub current_sub_status: Option<String>,
    pub stage_entered_at: DateTime<Utc>,
    pub meetings_attended: i64,
    pub last_meeting_id: Option<String>,
    pub source: Option<String>,
    pub referrer: Option<String>,
    pub archived_at: Option<DateTime<Utc>>,
    pub archive_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PipelineRecord {
    pub fn person(&self) -> PersonRef {
        PersonRef {
            visitor_id: self.visitor_id.clone(),
            participant_id: self.participant_id.clone(),
        }
    }
}

/// Input for creating an active pipeline record. The creation `Transition`
/// (`from_stage = None`) is written in the same storage job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPipelineRecord {
    pub tenant_id: String,
    pub person: PersonRef,
    pub initial_stage: PipelineStage,
    pub last_meeting_id: Option<String>,
    pub source: Option<String>,
    pub referrer: Option<String>,
    pub change_reason: String,
}

/// One row per stage change; the engine's audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    pub id: String,
    pub tenant_id: String,
    pub record_id: String,
    pub from_stage: Option<PipelineStage>,
    pub to_stage: PipelineStage,
    pub from_sub_status: Option<String>,
    pub to_sub_status: Option<String>,
    pub is_automatic: bool,
    pub change_reason: String,
    pub changed_by: Option<String>,
    pub time_in_previous_stage_seconds: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Input for a stage mutation. The repository computes the dwell time from
/// the record's previous `stage_entered_at` and writes the `Transition` row
/// after the record update succeeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageChange {
    pub to_stage: PipelineStage,
    pub to_sub_status: Option<String>,
    pub is_automatic: bool,
    pub change_reason: String,
    pub changed_by: Option<String>,
}

/// Outcome of the find-or-create insert. Two triggers firing near-
/// simultaneously for a brand-new person race on the active-record
/// uniqueness constraint; the loser re-reads the winning row and proceeds.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineInsert {
    Created(PipelineRecord),
    AlreadyActive(PipelineRecord),
}

#[async_trait]
pub trait PipelineRepositoryTrait: Send + Sync {
    /// Active (non-archived) record for this person, matched on either the
    /// visitor or participant pointer. Archived rows never match, so a new
    /// active record may legally exist for a previously archived person.
    async fn find_active_by_person(
        &self,
        tenant_id: &str,
        person: &PersonRef,
    ) -> Result<Option<PipelineRecord>>;

    async fn get(&self, tenant_id: &str, record_id: &str) -> Result<PipelineRecord>;

    /// Inserts an active record plus its creation transition, resolving the
    /// uniqueness race as [`PipelineInsert::AlreadyActive`].
    async fn insert_active(&self, new_record: NewPipelineRecord) -> Result<PipelineInsert>;

    /// Applies a stage mutation and writes exactly one transition row.
    /// Moving to `archived` also sets `archived_at`/`archive_reason`.
    async fn apply_stage_change(
        &self,
        tenant_id: &str,
        record_id: &str,
        change: StageChange,
    ) -> Result<PipelineRecord>;

    /// Updates `last_meeting_id`/`updated_at` only; no transition row.
    async fn touch_registration(
        &self,
        tenant_id: &str,
        record_id: &str,
        meeting_id: &str,
    ) -> Result<()>;

    /// Increments `meetings_attended` and returns the new counter value.
    async fn increment_meetings_attended(&self, tenant_id: &str, record_id: &str) -> Result<i64>;

    /// Links a participant onto a visitor-only record. No-op when already
    /// linked.
    async fn attach_participant(
        &self,
        tenant_id: &str,
        record_id: &str,
        participant_id: &str,
    ) -> Result<()>;

    async fn list_transitions(&self, tenant_id: &str, record_id: &str) -> Result<Vec<Transition>>;
}
