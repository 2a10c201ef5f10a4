use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::SqliteConnection;
use uuid::Uuid;

use chapterflow_core::errors::Error;
use chapterflow_core::participants::{
    NewParticipant, Participant, ParticipantRepositoryTrait, ParticipantStatus, StatusAudit,
};
use chapterflow_core::Result;

use super::model::{ParticipantDB, StatusAuditDB};
use crate::db::{format_utc, get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::{participant_status_audit, participants};

pub struct ParticipantRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl ParticipantRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        ParticipantRepository { pool, writer }
    }
}

#[async_trait]
impl ParticipantRepositoryTrait for ParticipantRepository {
    async fn get(&self, tenant_id: &str, participant_id: &str) -> Result<Participant> {
        let mut conn = get_connection(&self.pool)?;
        let row = participants::table
            .filter(participants::tenant_id.eq(tenant_id))
            .filter(participants::id.eq(participant_id))
            .first::<ParticipantDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?
            .ok_or_else(|| Error::not_found("participant", participant_id))?;
        row.to_domain()
    }

    async fn create(&self, new_participant: NewParticipant) -> Result<Participant> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Participant> {
                let now = format_utc(Utc::now());
                let row = ParticipantDB {
                    id: Uuid::new_v4().to_string(),
                    tenant_id: new_participant.tenant_id,
                    name: new_participant.name,
                    phone: new_participant.phone,
                    email: new_participant.email,
                    company: new_participant.company,
                    line_user_id: None,
                    visitor_id: new_participant.visitor_id,
                    status: new_participant.status.as_str().to_string(),
                    created_at: now.clone(),
                    updated_at: now,
                };
                let inserted = diesel::insert_into(participants::table)
                    .values(&row)
                    .returning(ParticipantDB::as_returning())
                    .get_result::<ParticipantDB>(conn)
                    .map_err(StorageError::from)?;
                inserted.to_domain()
            })
            .await
    }

    async fn update_status(
        &self,
        tenant_id: &str,
        participant_id: &str,
        to_status: ParticipantStatus,
        reason: &str,
        changed_by: Option<&str>,
    ) -> Result<Participant> {
        let tenant_id = tenant_id.to_string();
        let participant_id = participant_id.to_string();
        let reason = reason.to_string();
        let changed_by = changed_by.map(str::to_string);

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Participant> {
                let current = participants::table
                    .filter(participants::tenant_id.eq(&tenant_id))
                    .filter(participants::id.eq(&participant_id))
                    .first::<ParticipantDB>(conn)
                    .optional()
                    .map_err(StorageError::from)?
                    .ok_or_else(|| Error::not_found("participant", participant_id.clone()))?;

                let now = format_utc(Utc::now());
                let updated = diesel::update(
                    participants::table
                        .filter(participants::tenant_id.eq(&tenant_id))
                        .filter(participants::id.eq(&participant_id)),
                )
                .set((
                    participants::status.eq(to_status.as_str()),
                    participants::updated_at.eq(&now),
                ))
                .returning(ParticipantDB::as_returning())
                .get_result::<ParticipantDB>(conn)
                .map_err(StorageError::from)?;

                let audit = StatusAuditDB {
                    id: Uuid::new_v4().to_string(),
                    tenant_id,
                    participant_id,
                    from_status: Some(current.status),
                    to_status: to_status.as_str().to_string(),
                    reason,
                    changed_by,
                    created_at: now,
                };
                diesel::insert_into(participant_status_audit::table)
                    .values(&audit)
                    .execute(conn)
                    .map_err(StorageError::from)?;

                updated.to_domain()
            })
            .await
    }

    async fn bind_line_user_id(
        &self,
        tenant_id: &str,
        participant_id: &str,
        line_user_id: &str,
    ) -> Result<()> {
        let tenant_id = tenant_id.to_string();
        let participant_id = participant_id.to_string();
        let line_user_id = line_user_id.to_string();

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                // Only binds an unbound row; an existing binding stays as-is.
                diesel::update(
                    participants::table
                        .filter(participants::tenant_id.eq(&tenant_id))
                        .filter(participants::id.eq(&participant_id))
                        .filter(participants::line_user_id.is_null()),
                )
                .set((
                    participants::line_user_id.eq(&line_user_id),
                    participants::updated_at.eq(format_utc(Utc::now())),
                ))
                .execute(conn)
                .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn list_status_audit(
        &self,
        tenant_id: &str,
        participant_id: &str,
    ) -> Result<Vec<StatusAudit>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = participant_status_audit::table
            .filter(participant_status_audit::tenant_id.eq(tenant_id))
            .filter(participant_status_audit::participant_id.eq(participant_id))
            .order(participant_status_audit::created_at.asc())
            .load::<StatusAuditDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(StatusAuditDB::to_domain).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::setup_db;

    fn new_prospect(tenant_id: &str, name: &str) -> NewParticipant {
        NewParticipant {
            tenant_id: tenant_id.to_string(),
            name: name.to_string(),
            phone: None,
            email: None,
            company: None,
            visitor_id: None,
            status: ParticipantStatus::Prospect,
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let (_dir, pool, writer) = setup_db();
        let repo = ParticipantRepository::new(pool, writer);

        let created = repo.create(new_prospect("t-1", "Aiko")).await.unwrap();
        let fetched = repo.get("t-1", &created.id).await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.status, ParticipantStatus::Prospect);
    }

    #[tokio::test]
    async fn get_is_tenant_scoped() {
        let (_dir, pool, writer) = setup_db();
        let repo = ParticipantRepository::new(pool, writer);

        let created = repo.create(new_prospect("t-1", "Aiko")).await.unwrap();
        let err = repo.get("t-2", &created.id).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn update_status_writes_an_audit_row_atomically() {
        let (_dir, pool, writer) = setup_db();
        let repo = ParticipantRepository::new(pool, writer);

        let created = repo.create(new_prospect("t-1", "Aiko")).await.unwrap();
        let updated = repo
            .update_status(
                "t-1",
                &created.id,
                ParticipantStatus::Visitor,
                "First check-in",
                None,
            )
            .await
            .unwrap();
        assert_eq!(updated.status, ParticipantStatus::Visitor);

        let audit = repo.list_status_audit("t-1", &created.id).await.unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].from_status, Some(ParticipantStatus::Prospect));
        assert_eq!(audit[0].to_status, ParticipantStatus::Visitor);
        assert_eq!(audit[0].reason, "First check-in");
        assert_eq!(audit[0].changed_by, None);
    }

    #[tokio::test]
    async fn update_status_on_missing_participant_is_not_found() {
        let (_dir, pool, writer) = setup_db();
        let repo = ParticipantRepository::new(pool, writer);

        let err = repo
            .update_status("t-1", "ghost", ParticipantStatus::Member, "x", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn bind_line_user_id_keeps_the_first_binding() {
        let (_dir, pool, writer) = setup_db();
        let repo = ParticipantRepository::new(pool, writer);

        let created = repo.create(new_prospect("t-1", "Aiko")).await.unwrap();
        repo.bind_line_user_id("t-1", &created.id, "U-first")
            .await
            .unwrap();
        repo.bind_line_user_id("t-1", &created.id, "U-second")
            .await
            .unwrap();

        let fetched = repo.get("t-1", &created.id).await.unwrap();
        assert_eq!(fetched.line_user_id.as_deref(), Some("U-first"));
    }
}
