use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::SqliteConnection;
use uuid::Uuid;

use chapterflow_core::errors::Error;
use chapterflow_core::meetings::{Meeting, MeetingRepositoryTrait, NewMeeting};
use chapterflow_core::Result;

use super::model::MeetingDB;
use crate::db::{format_utc, get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::meetings;

pub struct MeetingRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl MeetingRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        MeetingRepository { pool, writer }
    }
}

#[async_trait]
impl MeetingRepositoryTrait for MeetingRepository {
    async fn get(&self, tenant_id: &str, meeting_id: &str) -> Result<Meeting> {
        let mut conn = get_connection(&self.pool)?;
        let row = meetings::table
            .filter(meetings::tenant_id.eq(tenant_id))
            .filter(meetings::id.eq(meeting_id))
            .first::<MeetingDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?
            .ok_or_else(|| Error::not_found("meeting", meeting_id))?;
        row.to_domain()
    }

    async fn create(&self, new_meeting: NewMeeting) -> Result<Meeting> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Meeting> {
                let row = MeetingDB {
                    id: Uuid::new_v4().to_string(),
                    tenant_id: new_meeting.tenant_id,
                    title: new_meeting.title,
                    starts_at: format_utc(new_meeting.starts_at),
                    location: new_meeting.location,
                    created_at: format_utc(Utc::now()),
                };
                let inserted = diesel::insert_into(meetings::table)
                    .values(&row)
                    .returning(MeetingDB::as_returning())
                    .get_result::<MeetingDB>(conn)
                    .map_err(StorageError::from)?;
                inserted.to_domain()
            })
            .await
    }
}
