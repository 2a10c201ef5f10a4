//! Shared test fixture: a migrated on-disk database in a temp directory.

use std::sync::Arc;

use chrono::Utc;
use diesel::prelude::*;
use tempfile::TempDir;

use crate::db::{self, format_utc, get_connection, spawn_writer, DbPool, WriteHandle};
use crate::schema::{meetings, participants};

/// The `TempDir` must stay alive for the duration of the test; dropping it
/// deletes the database file out from under the pool.
pub fn setup_db() -> (TempDir, Arc<DbPool>, WriteHandle) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let db_path = db::init(dir.path().to_str().expect("utf-8 temp path")).expect("init db path");
    db::run_migrations(&db_path).expect("run migrations");
    let pool = db::create_pool(&db_path).expect("create pool");
    let writer = spawn_writer(pool.as_ref().clone());
    (dir, pool, writer)
}

/// Inserts a participant row with a caller-chosen ID, satisfying foreign
/// keys in tests that exercise other tables.
pub fn seed_participant(pool: &Arc<DbPool>, tenant_id: &str, participant_id: &str) {
    let mut conn = get_connection(pool).expect("connection");
    let now = format_utc(Utc::now());
    diesel::insert_into(participants::table)
        .values((
            participants::id.eq(participant_id),
            participants::tenant_id.eq(tenant_id),
            participants::name.eq("Seeded"),
            participants::status.eq("visitor"),
            participants::created_at.eq(&now),
            participants::updated_at.eq(&now),
        ))
        .execute(&mut conn)
        .expect("seed participant");
}

/// Inserts a meeting row with a caller-chosen ID.
pub fn seed_meeting(pool: &Arc<DbPool>, tenant_id: &str, meeting_id: &str) {
    let mut conn = get_connection(pool).expect("connection");
    let now = format_utc(Utc::now());
    diesel::insert_into(meetings::table)
        .values((
            meetings::id.eq(meeting_id),
            meetings::tenant_id.eq(tenant_id),
            meetings::title.eq("Seeded meeting"),
            meetings::starts_at.eq(&now),
            meetings::created_at.eq(&now),
        ))
        .execute(&mut conn)
        .expect("seed meeting");
}
