use diesel::prelude::*;

use chapterflow_core::errors::{DatabaseError, Error, Result};
use chapterflow_core::pipeline::{PipelineRecord, PipelineStage, Transition};

use crate::db::parse_utc;
use crate::schema::{pipeline_records, pipeline_transitions};

pub fn parse_stage(value: &str) -> Result<PipelineStage> {
    PipelineStage::parse(value).ok_or_else(|| {
        Error::Database(DatabaseError::Internal(format!(
            "Unknown pipeline stage '{}'",
            value
        )))
    })
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = pipeline_records)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PipelineRecordDB {
    pub id: String,
    pub tenant_id: String,
    pub visitor_id: Option<String>,
    pub participant_id: Option<String>,
    pub person_key: String,
    pub current_stage: String,
    pub current_sub_status: Option<String>,
    pub stage_entered_at: String,
    pub meetings_attended: i64,
    pub last_meeting_id: Option<String>,
    pub source: Option<String>,
    pub referrer: Option<String>,
    pub archived_at: Option<String>,
    pub archive_reason: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl PipelineRecordDB {
    pub fn to_domain(self) -> Result<PipelineRecord> {
        let archived_at = self.archived_at.as_deref().map(parse_utc).transpose()?;
        Ok(PipelineRecord {
            current_stage: parse_stage(&self.current_stage)?,
            stage_entered_at: parse_utc(&self.stage_entered_at)?,
            archived_at,
            created_at: parse_utc(&self.created_at)?,
            updated_at: parse_utc(&self.updated_at)?,
            id: self.id,
            tenant_id: self.tenant_id,
            visitor_id: self.visitor_id,
            participant_id: self.participant_id,
            person_key: self.person_key,
            current_sub_status: self.current_sub_status,
            meetings_attended: self.meetings_attended,
            last_meeting_id: self.last_meeting_id,
            source: self.source,
            referrer: self.referrer,
            archive_reason: self.archive_reason,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = pipeline_transitions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TransitionDB {
    pub id: String,
    pub tenant_id: String,
    pub record_id: String,
    pub from_stage: Option<String>,
    pub to_stage: String,
    pub from_sub_status: Option<String>,
    pub to_sub_status: Option<String>,
    pub is_automatic: i32,
    pub change_reason: String,
    pub changed_by: Option<String>,
    pub time_in_previous_stage_seconds: Option<i64>,
    pub created_at: String,
}

impl TransitionDB {
    pub fn to_domain(self) -> Result<Transition> {
        let from_stage = self.from_stage.as_deref().map(parse_stage).transpose()?;
        Ok(Transition {
            from_stage,
            to_stage: parse_stage(&self.to_stage)?,
            is_automatic: self.is_automatic != 0,
            created_at: parse_utc(&self.created_at)?,
            id: self.id,
            tenant_id: self.tenant_id,
            record_id: self.record_id,
            from_sub_status: self.from_sub_status,
            to_sub_status: self.to_sub_status,
            change_reason: self.change_reason,
            changed_by: self.changed_by,
            time_in_previous_stage_seconds: self.time_in_previous_stage_seconds,
        })
    }
}
