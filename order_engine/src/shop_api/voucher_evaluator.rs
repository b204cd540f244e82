//! Validates a voucher code for a user and a subtotal, and computes the discount.
use chrono::{DateTime, Utc};
use log::*;
use shop_common::Vnd;

use crate::{
    shop_api::{errors::VoucherRejection, voucher_objects::VoucherEvaluation},
    traits::{StoreError, VoucherStore},
};

#[derive(Debug, Clone)]
pub enum EvaluationError {
    Rejected(VoucherRejection),
    Store(StoreError),
}

impl From<StoreError> for EvaluationError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<VoucherRejection> for EvaluationError {
    fn from(r: VoucherRejection) -> Self {
        Self::Rejected(r)
    }
}

pub struct VoucherEvaluator<B> {
    db: B,
}

impl<B> VoucherEvaluator<B>
where B: VoucherStore
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Runs every check in order, stopping at the first failure:
    /// 1. the voucher exists, is active and `now` is inside its validity window,
    /// 2. the user holds a claim on it,
    /// 3. the claim has uses left under the per-user cap,
    /// 4. the voucher has uses left under its global cap,
    /// 5. the subtotal reaches the voucher's minimum.
    ///
    /// Nothing is written. The returned evaluation carries the handles the caller needs to consume the voucher
    /// together with the order.
    pub async fn evaluate(
        &self,
        user_id: &str,
        code: &str,
        subtotal: Vnd,
        now: DateTime<Utc>,
    ) -> Result<VoucherEvaluation, EvaluationError> {
        let code = code.trim().to_uppercase();
        let voucher = match self.db.fetch_voucher_by_code(&code).await? {
            Some(v) if v.is_redeemable_at(now) => v,
            _ => {
                debug!("🎟️ Voucher {code} is unknown, inactive or outside its validity window");
                return Err(VoucherRejection::VoucherInvalidOrExpired(code).into());
            },
        };
        let claim = self
            .db
            .fetch_claim(user_id, voucher.id)
            .await?
            .ok_or_else(|| VoucherRejection::VoucherNotClaimed(code.clone()))?;
        let used = claim.effective_usage();
        if !voucher.per_user_cap().allows(used) {
            debug!("🎟️ {user_id} has used {code} {used} times. Cap: {}", voucher.per_user_cap());
            return Err(VoucherRejection::VoucherUserLimitReached(code).into());
        }
        if !voucher.global_cap().allows(voucher.used_count) {
            debug!("🎟️ {code} has been used {} times. Cap: {}", voucher.used_count, voucher.global_cap());
            return Err(VoucherRejection::VoucherGloballyExhausted(code).into());
        }
        if subtotal < voucher.min_order_amount {
            return Err(VoucherRejection::OrderBelowMinimum { code, minimum: voucher.min_order_amount }.into());
        }
        let discount = voucher.discount_for(subtotal);
        trace!("🎟️ {code} gives {user_id} a discount of {discount} on {subtotal}");
        Ok(VoucherEvaluation { voucher, claim, subtotal, discount })
    }
}

impl From<EvaluationError> for crate::shop_api::errors::OrderFlowError {
    fn from(e: EvaluationError) -> Self {
        match e {
            EvaluationError::Rejected(r) => r.into(),
            EvaluationError::Store(e) => e.into(),
        }
    }
}

impl From<EvaluationError> for crate::shop_api::errors::VoucherApiError {
    fn from(e: EvaluationError) -> Self {
        match e {
            EvaluationError::Rejected(r) => r.into(),
            EvaluationError::Store(e) => e.into(),
        }
    }
}
