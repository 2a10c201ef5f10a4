use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::SqliteConnection;
use uuid::Uuid;

use chapterflow_core::checkins::{CheckIn, CheckInInsert, CheckInRepositoryTrait, NewCheckIn};
use chapterflow_core::Result;

use super::model::CheckInDB;
use crate::db::{format_utc, get_connection, DbPool, WriteHandle};
use crate::errors::{is_unique_violation, StorageError};
use crate::schema::checkins;

pub struct CheckInRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl CheckInRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        CheckInRepository { pool, writer }
    }
}

#[async_trait]
impl CheckInRepositoryTrait for CheckInRepository {
    async fn find(
        &self,
        tenant_id: &str,
        participant_id: &str,
        meeting_id: &str,
    ) -> Result<Option<CheckIn>> {
        let mut conn = get_connection(&self.pool)?;
        let row = checkins::table
            .filter(checkins::tenant_id.eq(tenant_id))
            .filter(checkins::participant_id.eq(participant_id))
            .filter(checkins::meeting_id.eq(meeting_id))
            .first::<CheckInDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        row.map(CheckInDB::to_domain).transpose()
    }

    async fn insert(&self, new_checkin: NewCheckIn) -> Result<CheckInInsert> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<CheckInInsert> {
                let now = format_utc(Utc::now());
                let row = CheckInDB {
                    id: Uuid::new_v4().to_string(),
                    tenant_id: new_checkin.tenant_id.clone(),
                    participant_id: new_checkin.participant_id.clone(),
                    meeting_id: new_checkin.meeting_id.clone(),
                    checkin_time: now.clone(),
                    source: new_checkin.source.as_str().to_string(),
                    created_at: now,
                };

                match diesel::insert_into(checkins::table)
                    .values(&row)
                    .returning(CheckInDB::as_returning())
                    .get_result::<CheckInDB>(conn)
                {
                    Ok(inserted) => Ok(CheckInInsert::Inserted(inserted.to_domain()?)),
                    // A concurrent attempt won the unique key. The failed
                    // statement does not abort the transaction, so re-read
                    // the winning row and report it.
                    Err(e) if is_unique_violation(&e) => {
                        let existing = checkins::table
                            .filter(checkins::tenant_id.eq(&new_checkin.tenant_id))
                            .filter(checkins::participant_id.eq(&new_checkin.participant_id))
                            .filter(checkins::meeting_id.eq(&new_checkin.meeting_id))
                            .first::<CheckInDB>(conn)
                            .map_err(StorageError::from)?;
                        Ok(CheckInInsert::AlreadyExists(existing.to_domain()?))
                    }
                    Err(e) => Err(StorageError::from(e).into()),
                }
            })
            .await
    }

    async fn count_for_participant(&self, tenant_id: &str, participant_id: &str) -> Result<i64> {
        let mut conn = get_connection(&self.pool)?;
        let count = checkins::table
            .filter(checkins::tenant_id.eq(tenant_id))
            .filter(checkins::participant_id.eq(participant_id))
            .count()
            .get_result::<i64>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_meeting, seed_participant, setup_db};
    use chapterflow_core::checkins::CheckInSource;

    fn attempt(participant_id: &str, meeting_id: &str) -> NewCheckIn {
        NewCheckIn {
            tenant_id: "t-1".to_string(),
            participant_id: participant_id.to_string(),
            meeting_id: meeting_id.to_string(),
            source: CheckInSource::Liff,
        }
    }

    #[tokio::test]
    async fn duplicate_insert_reports_the_original_row() {
        let (_dir, pool, writer) = setup_db();
        seed_participant(&pool, "t-1", "p-1");
        seed_meeting(&pool, "t-1", "m-1");
        let repo = CheckInRepository::new(pool, writer);

        let first = match repo.insert(attempt("p-1", "m-1")).await.unwrap() {
            CheckInInsert::Inserted(row) => row,
            CheckInInsert::AlreadyExists(_) => panic!("first insert must create"),
        };

        match repo.insert(attempt("p-1", "m-1")).await.unwrap() {
            CheckInInsert::AlreadyExists(row) => {
                assert_eq!(row.id, first.id);
                assert_eq!(row.checkin_time, first.checkin_time);
            }
            CheckInInsert::Inserted(_) => panic!("second insert must hit the unique key"),
        }
    }

    #[tokio::test]
    async fn find_and_count_are_tenant_scoped() {
        let (_dir, pool, writer) = setup_db();
        seed_participant(&pool, "t-1", "p-1");
        seed_meeting(&pool, "t-1", "m-1");
        seed_meeting(&pool, "t-1", "m-2");
        let repo = CheckInRepository::new(pool, writer);

        repo.insert(attempt("p-1", "m-1")).await.unwrap();
        repo.insert(attempt("p-1", "m-2")).await.unwrap();

        assert!(repo.find("t-1", "p-1", "m-1").await.unwrap().is_some());
        assert!(repo.find("t-2", "p-1", "m-1").await.unwrap().is_none());
        assert_eq!(repo.count_for_participant("t-1", "p-1").await.unwrap(), 2);
        assert_eq!(repo.count_for_participant("t-2", "p-1").await.unwrap(), 0);
    }
}
