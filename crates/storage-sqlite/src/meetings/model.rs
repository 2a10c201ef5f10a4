use diesel::prelude::*;

use chapterflow_core::errors::Result;
use chapterflow_core::meetings::Meeting;

use crate::db::parse_utc;
use crate::schema::meetings;

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = meetings)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MeetingDB {
    pub id: String,
    pub tenant_id: String,
    pub title: String,
    pub starts_at: String,
    pub location: Option<String>,
    pub created_at: String,
}

impl MeetingDB {
    pub fn to_domain(self) -> Result<Meeting> {
        Ok(Meeting {
            starts_at: parse_utc(&self.starts_at)?,
            created_at: parse_utc(&self.created_at)?,
            id: self.id,
            tenant_id: self.tenant_id,
            title: self.title,
            location: self.location,
        })
    }
}
