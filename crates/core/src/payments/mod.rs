//! Payment gate contract and tenant payment policy.
//!
//! Payment processing itself lives in the billing subsystem; the engine only
//! asks one question before recording attendance: has this participant paid
//! or been waived for this meeting.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Per-tenant visitor payment configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPolicy {
    pub requires_visitor_payment: bool,
    pub visitor_fee_amount: Decimal,
    pub visitor_fee_currency: String,
    pub pay_base_url: String,
}

impl PaymentPolicy {
    /// Policy applied when a tenant has no settings row: visitors check in
    /// without payment.
    pub fn permissive() -> Self {
        Self {
            requires_visitor_payment: false,
            visitor_fee_amount: Decimal::ZERO,
            visitor_fee_currency: "JPY".to_string(),
            pay_base_url: String::new(),
        }
    }

    /// Pay-flow URL handed back with a `require_payment` result.
    pub fn pay_url(&self, tenant_id: &str, participant_id: &str, meeting_id: &str) -> String {
        format!(
            "{}/pay/{}/{}?participant={}",
            self.pay_base_url.trim_end_matches('/'),
            tenant_id,
            meeting_id,
            participant_id
        )
    }
}

#[async_trait]
pub trait PaymentGateTrait: Send + Sync {
    /// True iff a `completed` or `waived` payment exists for
    /// `(tenant, participant, meeting)`.
    async fn has_satisfied_payment(
        &self,
        tenant_id: &str,
        participant_id: &str,
        meeting_id: &str,
    ) -> Result<bool>;

    async fn payment_policy(&self, tenant_id: &str) -> Result<PaymentPolicy>;
}
