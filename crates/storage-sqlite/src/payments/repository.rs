use std::sync::Arc;

use async_trait::async_trait;
use diesel::prelude::*;

use chapterflow_core::payments::{PaymentGateTrait, PaymentPolicy};
use chapterflow_core::Result;

use super::model::TenantSettingsDB;
use crate::db::{get_connection, DbPool};
use crate::errors::StorageError;
use crate::schema::{tenant_settings, visitor_payments};

/// Statuses that satisfy the visitor payment gate.
const SATISFYING_STATUSES: [&str; 2] = ["completed", "waived"];

/// Read-only view over billing-owned tables; the engine never writes them,
/// so this repository takes no writer handle.
pub struct PaymentGateRepository {
    pool: Arc<DbPool>,
}

impl PaymentGateRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        PaymentGateRepository { pool }
    }
}

#[async_trait]
impl PaymentGateTrait for PaymentGateRepository {
    async fn has_satisfied_payment(
        &self,
        tenant_id: &str,
        participant_id: &str,
        meeting_id: &str,
    ) -> Result<bool> {
        let mut conn = get_connection(&self.pool)?;
        let count = visitor_payments::table
            .filter(visitor_payments::tenant_id.eq(tenant_id))
            .filter(visitor_payments::participant_id.eq(participant_id))
            .filter(visitor_payments::meeting_id.eq(meeting_id))
            .filter(visitor_payments::status.eq_any(SATISFYING_STATUSES))
            .count()
            .get_result::<i64>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(count > 0)
    }

    async fn payment_policy(&self, tenant_id: &str) -> Result<PaymentPolicy> {
        let mut conn = get_connection(&self.pool)?;
        let row = tenant_settings::table
            .filter(tenant_settings::tenant_id.eq(tenant_id))
            .first::<TenantSettingsDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        match row {
            Some(settings) => settings.to_policy(),
            // No settings row means the tenant never configured visitor
            // fees; check-ins proceed unpaid.
            None => Ok(PaymentPolicy::permissive()),
        }
    }
}
