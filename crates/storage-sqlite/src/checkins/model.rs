use diesel::prelude::*;

use chapterflow_core::checkins::{CheckIn, CheckInSource};
use chapterflow_core::errors::{DatabaseError, Error, Result};

use crate::db::parse_utc;
use crate::schema::checkins;

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = checkins)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CheckInDB {
    pub id: String,
    pub tenant_id: String,
    pub participant_id: String,
    pub meeting_id: String,
    pub checkin_time: String,
    pub source: String,
    pub created_at: String,
}

impl CheckInDB {
    pub fn to_domain(self) -> Result<CheckIn> {
        let source = CheckInSource::parse(&self.source).ok_or_else(|| {
            Error::Database(DatabaseError::Internal(format!(
                "Unknown check-in source '{}'",
                self.source
            )))
        })?;
        Ok(CheckIn {
            source,
            checkin_time: parse_utc(&self.checkin_time)?,
            created_at: parse_utc(&self.created_at)?,
            id: self.id,
            tenant_id: self.tenant_id,
            participant_id: self.participant_id,
            meeting_id: self.meeting_id,
        })
    }
}
