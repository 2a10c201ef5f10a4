use diesel::prelude::*;

use chapterflow_core::errors::{DatabaseError, Error, Result};
use chapterflow_core::participants::{Participant, ParticipantStatus, StatusAudit};

use crate::db::parse_utc;
use crate::schema::{participant_status_audit, participants};

fn parse_status(value: &str) -> Result<ParticipantStatus> {
    ParticipantStatus::parse(value).ok_or_else(|| {
        Error::Database(DatabaseError::Internal(format!(
            "Unknown participant status '{}'",
            value
        )))
    })
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = participants)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ParticipantDB {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub company: Option<String>,
    pub line_user_id: Option<String>,
    pub visitor_id: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl ParticipantDB {
    pub fn to_domain(self) -> Result<Participant> {
        Ok(Participant {
            status: parse_status(&self.status)?,
            created_at: parse_utc(&self.created_at)?,
            updated_at: parse_utc(&self.updated_at)?,
            id: self.id,
            tenant_id: self.tenant_id,
            name: self.name,
            phone: self.phone,
            email: self.email,
            company: self.company,
            line_user_id: self.line_user_id,
            visitor_id: self.visitor_id,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = participant_status_audit)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct StatusAuditDB {
    pub id: String,
    pub tenant_id: String,
    pub participant_id: String,
    pub from_status: Option<String>,
    pub to_status: String,
    pub reason: String,
    pub changed_by: Option<String>,
    pub created_at: String,
}

impl StatusAuditDB {
    pub fn to_domain(self) -> Result<StatusAudit> {
        let from_status = self.from_status.as_deref().map(parse_status).transpose()?;
        Ok(StatusAudit {
            from_status,
            to_status: parse_status(&self.to_status)?,
            created_at: parse_utc(&self.created_at)?,
            id: self.id,
            tenant_id: self.tenant_id,
            participant_id: self.participant_id,
            reason: self.reason,
            changed_by: self.changed_by,
        })
    }
}
