use diesel::prelude::*;
use rust_decimal::Decimal;

use chapterflow_core::errors::{DatabaseError, Error, Result};
use chapterflow_core::payments::PaymentPolicy;

use crate::schema::tenant_settings;

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tenant_settings)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TenantSettingsDB {
    pub tenant_id: String,
    pub requires_visitor_payment: i32,
    pub visitor_fee_amount: String,
    pub visitor_fee_currency: String,
    pub pay_base_url: String,
    pub created_at: String,
    pub updated_at: String,
}

impl TenantSettingsDB {
    pub fn to_policy(self) -> Result<PaymentPolicy> {
        let visitor_fee_amount = self.visitor_fee_amount.parse::<Decimal>().map_err(|e| {
            Error::Database(DatabaseError::Internal(format!(
                "Invalid stored fee amount '{}': {}",
                self.visitor_fee_amount, e
            )))
        })?;
        Ok(PaymentPolicy {
            requires_visitor_payment: self.requires_visitor_payment != 0,
            visitor_fee_amount,
            visitor_fee_currency: self.visitor_fee_currency,
            pay_base_url: self.pay_base_url,
        })
    }
}
