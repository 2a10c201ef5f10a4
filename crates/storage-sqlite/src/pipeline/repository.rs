use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::SqliteConnection;
use uuid::Uuid;

use chapterflow_core::errors::{DatabaseError, Error};
use chapterflow_core::pipeline::{
    NewPipelineRecord, PersonRef, PipelineInsert, PipelineRecord, PipelineRepositoryTrait,
    PipelineStage, StageChange, Transition,
};
use chapterflow_core::Result;

use super::model::{PipelineRecordDB, TransitionDB};
use crate::db::{format_utc, get_connection, parse_utc, DbPool, WriteHandle};
use crate::errors::{is_unique_violation, StorageError};
use crate::schema::{pipeline_records, pipeline_transitions};

pub struct PipelineRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl PipelineRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        PipelineRepository { pool, writer }
    }
}

/// Active-record lookup shared by the read path and the insert race
/// resolution. Matches on either identity pointer; archived rows never match.
fn find_active_row(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    person: &PersonRef,
) -> Result<Option<PipelineRecordDB>> {
    person.person_key()?;

    let mut query = pipeline_records::table
        .filter(pipeline_records::tenant_id.eq(tenant_id.to_string()))
        .filter(pipeline_records::archived_at.is_null())
        .into_boxed();

    query = match (person.visitor_id.clone(), person.participant_id.clone()) {
        (Some(visitor), Some(participant)) => query.filter(
            pipeline_records::visitor_id
                .eq(visitor)
                .or(pipeline_records::participant_id.eq(participant)),
        ),
        (Some(visitor), None) => query.filter(pipeline_records::visitor_id.eq(visitor)),
        (None, participant) => query.filter(
            pipeline_records::participant_id.eq(participant.unwrap_or_default()),
        ),
    };

    let row = query
        .first::<PipelineRecordDB>(conn)
        .optional()
        .map_err(StorageError::from)?;
    Ok(row)
}

fn load_row(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    record_id: &str,
) -> Result<PipelineRecordDB> {
    pipeline_records::table
        .filter(pipeline_records::tenant_id.eq(tenant_id))
        .filter(pipeline_records::id.eq(record_id))
        .first::<PipelineRecordDB>(conn)
        .optional()
        .map_err(StorageError::from)?
        .ok_or_else(|| Error::not_found("pipeline record", record_id))
}

fn write_transition(conn: &mut SqliteConnection, row: &TransitionDB) -> Result<()> {
    diesel::insert_into(pipeline_transitions::table)
        .values(row)
        .execute(conn)
        .map_err(StorageError::from)?;
    Ok(())
}

#[async_trait]
impl PipelineRepositoryTrait for PipelineRepository {
    async fn find_active_by_person(
        &self,
        tenant_id: &str,
        person: &PersonRef,
    ) -> Result<Option<PipelineRecord>> {
        let mut conn = get_connection(&self.pool)?;
        find_active_row(&mut conn, tenant_id, person)?
            .map(PipelineRecordDB::to_domain)
            .transpose()
    }

    async fn get(&self, tenant_id: &str, record_id: &str) -> Result<PipelineRecord> {
        let mut conn = get_connection(&self.pool)?;
        load_row(&mut conn, tenant_id, record_id)?.to_domain()
    }

    async fn insert_active(&self, new_record: NewPipelineRecord) -> Result<PipelineInsert> {
        let person_key = new_record.person.person_key()?.to_string();

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<PipelineInsert> {
                let now = format_utc(Utc::now());
                let row = PipelineRecordDB {
                    id: Uuid::new_v4().to_string(),
                    tenant_id: new_record.tenant_id.clone(),
                    visitor_id: new_record.person.visitor_id.clone(),
                    participant_id: new_record.person.participant_id.clone(),
                    person_key,
                    current_stage: new_record.initial_stage.as_str().to_string(),
                    current_sub_status: None,
                    stage_entered_at: now.clone(),
                    meetings_attended: 0,
                    last_meeting_id: new_record.last_meeting_id.clone(),
                    source: new_record.source.clone(),
                    referrer: new_record.referrer.clone(),
                    archived_at: None,
                    archive_reason: None,
                    created_at: now.clone(),
                    updated_at: now.clone(),
                };

                match diesel::insert_into(pipeline_records::table)
                    .values(&row)
                    .returning(PipelineRecordDB::as_returning())
                    .get_result::<PipelineRecordDB>(conn)
                {
                    Ok(inserted) => {
                        write_transition(
                            conn,
                            &TransitionDB {
                                id: Uuid::new_v4().to_string(),
                                tenant_id: new_record.tenant_id,
                                record_id: inserted.id.clone(),
                                from_stage: None,
                                to_stage: inserted.current_stage.clone(),
                                from_sub_status: None,
                                to_sub_status: None,
                                is_automatic: 1,
                                change_reason: new_record.change_reason,
                                changed_by: None,
                                time_in_previous_stage_seconds: None,
                                created_at: now,
                            },
                        )?;
                        Ok(PipelineInsert::Created(inserted.to_domain()?))
                    }
                    // Lost the active-record race; the winning row is the
                    // person's record now.
                    Err(e) if is_unique_violation(&e) => {
                        let existing =
                            find_active_row(conn, &new_record.tenant_id, &new_record.person)?
                                .ok_or_else(|| {
                                    Error::Database(DatabaseError::Internal(
                                        "Active record vanished after unique conflict".to_string(),
                                    ))
                                })?;
                        Ok(PipelineInsert::AlreadyActive(existing.to_domain()?))
                    }
                    Err(e) => Err(StorageError::from(e).into()),
                }
            })
            .await
    }

    async fn apply_stage_change(
        &self,
        tenant_id: &str,
        record_id: &str,
        change: StageChange,
    ) -> Result<PipelineRecord> {
        let tenant_id = tenant_id.to_string();
        let record_id = record_id.to_string();

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<PipelineRecord> {
                let previous = load_row(conn, &tenant_id, &record_id)?;
                let now_dt = Utc::now();
                let now = format_utc(now_dt);
                let dwell_seconds =
                    (now_dt - parse_utc(&previous.stage_entered_at)?).num_seconds();

                let target = pipeline_records::table
                    .filter(pipeline_records::tenant_id.eq(&tenant_id))
                    .filter(pipeline_records::id.eq(&record_id));

                let updated = if change.to_stage == PipelineStage::Archived {
                    diesel::update(target)
                        .set((
                            pipeline_records::current_stage.eq(change.to_stage.as_str()),
                            pipeline_records::current_sub_status.eq(&change.to_sub_status),
                            pipeline_records::stage_entered_at.eq(&now),
                            pipeline_records::archived_at.eq(Some(now.clone())),
                            pipeline_records::archive_reason
                                .eq(Some(change.change_reason.clone())),
                            pipeline_records::updated_at.eq(&now),
                        ))
                        .returning(PipelineRecordDB::as_returning())
                        .get_result::<PipelineRecordDB>(conn)
                        .map_err(StorageError::from)?
                } else {
                    diesel::update(target)
                        .set((
                            pipeline_records::current_stage.eq(change.to_stage.as_str()),
                            pipeline_records::current_sub_status.eq(&change.to_sub_status),
                            pipeline_records::stage_entered_at.eq(&now),
                            pipeline_records::updated_at.eq(&now),
                        ))
                        .returning(PipelineRecordDB::as_returning())
                        .get_result::<PipelineRecordDB>(conn)
                        .map_err(StorageError::from)?
                };

                write_transition(
                    conn,
                    &TransitionDB {
                        id: Uuid::new_v4().to_string(),
                        tenant_id: tenant_id.clone(),
                        record_id: record_id.clone(),
                        from_stage: Some(previous.current_stage),
                        to_stage: change.to_stage.as_str().to_string(),
                        from_sub_status: previous.current_sub_status,
                        to_sub_status: change.to_sub_status,
                        is_automatic: i32::from(change.is_automatic),
                        change_reason: change.change_reason,
                        changed_by: change.changed_by,
                        time_in_previous_stage_seconds: Some(dwell_seconds),
                        created_at: now,
                    },
                )?;

                updated.to_domain()
            })
            .await
    }

    async fn touch_registration(
        &self,
        tenant_id: &str,
        record_id: &str,
        meeting_id: &str,
    ) -> Result<()> {
        let tenant_id = tenant_id.to_string();
        let record_id = record_id.to_string();
        let meeting_id = meeting_id.to_string();

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                let affected = diesel::update(
                    pipeline_records::table
                        .filter(pipeline_records::tenant_id.eq(&tenant_id))
                        .filter(pipeline_records::id.eq(&record_id)),
                )
                .set((
                    pipeline_records::last_meeting_id.eq(Some(meeting_id)),
                    pipeline_records::updated_at.eq(format_utc(Utc::now())),
                ))
                .execute(conn)
                .map_err(StorageError::from)?;
                if affected == 0 {
                    return Err(Error::not_found("pipeline record", record_id));
                }
                Ok(())
            })
            .await
    }

    async fn increment_meetings_attended(&self, tenant_id: &str, record_id: &str) -> Result<i64> {
        let tenant_id = tenant_id.to_string();
        let record_id = record_id.to_string();

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<i64> {
                diesel::update(
                    pipeline_records::table
                        .filter(pipeline_records::tenant_id.eq(&tenant_id))
                        .filter(pipeline_records::id.eq(&record_id)),
                )
                .set((
                    pipeline_records::meetings_attended
                        .eq(pipeline_records::meetings_attended + 1),
                    pipeline_records::updated_at.eq(format_utc(Utc::now())),
                ))
                .returning(pipeline_records::meetings_attended)
                .get_result::<i64>(conn)
                .optional()
                .map_err(StorageError::from)?
                .ok_or_else(|| Error::not_found("pipeline record", record_id))
            })
            .await
    }

    async fn attach_participant(
        &self,
        tenant_id: &str,
        record_id: &str,
        participant_id: &str,
    ) -> Result<()> {
        let tenant_id = tenant_id.to_string();
        let record_id = record_id.to_string();
        let participant_id = participant_id.to_string();

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                // Only fills an empty pointer; an already-linked record is
                // left untouched.
                diesel::update(
                    pipeline_records::table
                        .filter(pipeline_records::tenant_id.eq(&tenant_id))
                        .filter(pipeline_records::id.eq(&record_id))
                        .filter(pipeline_records::participant_id.is_null()),
                )
                .set((
                    pipeline_records::participant_id.eq(Some(participant_id)),
                    pipeline_records::updated_at.eq(format_utc(Utc::now())),
                ))
                .execute(conn)
                .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn list_transitions(&self, tenant_id: &str, record_id: &str) -> Result<Vec<Transition>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = pipeline_transitions::table
            .filter(pipeline_transitions::tenant_id.eq(tenant_id))
            .filter(pipeline_transitions::record_id.eq(record_id))
            .order(pipeline_transitions::created_at.asc())
            .load::<TransitionDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(TransitionDB::to_domain).collect()
    }
}
