//! Result shapes the engine hands back to its collaborators.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::pipeline::PipelineStage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationAction {
    Created,
    Moved,
    Updated,
}

/// Outcome of the registration trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResult {
    pub action: RegistrationAction,
    pub record_id: String,
    pub from_stage: Option<PipelineStage>,
    pub to_stage: PipelineStage,
}

/// Outcome of a check-in attempt. Typed errors (not-found, rate-limited,
/// invalid status) travel as `Error`; everything here is a success shape,
/// including the "needs another step" payment gate response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", rename_all_fields = "camelCase", tag = "status")]
pub enum CheckInResult {
    /// Attendance durably recorded.
    CheckedIn { checkin_time: DateTime<Utc> },
    /// The ledger already held this key; the original timestamp is returned
    /// unchanged.
    AlreadyCheckedIn { checkin_time: DateTime<Utc> },
    /// No attendance recorded; the caller must re-invoke after payment.
    RequirePayment {
        pay_url: String,
        amount: Decimal,
        currency: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvanceAction {
    Moved,
    Updated,
}

/// Outcome of the pipeline-side check-in advance for an existing record.
/// Attendance without a funnel record is a no-op success and carries no
/// result at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceResult {
    pub action: AdvanceAction,
    pub from_stage: Option<PipelineStage>,
    pub to_stage: PipelineStage,
    pub meetings_attended: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionAction {
    Created,
    Moved,
    Unchanged,
}

/// Outcome of the membership conversion trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    pub action: ConversionAction,
    pub record_id: String,
}

/// Outcome of archiving a pipeline record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveResult {
    pub record_id: String,
    pub archived_at: DateTime<Utc>,
    pub archive_reason: String,
}
