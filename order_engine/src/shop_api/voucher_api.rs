use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use shop_common::Vnd;

use crate::{
    db_types::{DiscountType, NewVoucher, Voucher, VoucherUpdate},
    shop_api::{
        errors::{VoucherApiError, VoucherRejection},
        voucher_evaluator::VoucherEvaluator,
        voucher_objects::{ClaimedVoucher, DiscountQuote, VoucherSummary},
    },
    traits::{ClaimOutcome, StoreError, VoucherStore},
};

/// `VoucherApi` covers the customer side of vouchers (claiming, listing and previewing discounts) and the admin
/// side (creating and editing them).
pub struct VoucherApi<B> {
    db: B,
}

impl<B> Debug for VoucherApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VoucherApi")
    }
}

impl<B> VoucherApi<B>
where B: VoucherStore
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Adds the voucher to the user's wallet.
    ///
    /// Claiming a voucher the user already holds with uses remaining is a no-op that returns the existing claim.
    /// The claim row is only created while the voucher has uses left under its global cap.
    pub async fn claim_voucher(&self, user_id: &str, code: &str) -> Result<ClaimedVoucher, VoucherApiError> {
        let code = normalize_code(code);
        let now = Utc::now();
        let voucher = match self.db.fetch_voucher_by_code(&code).await? {
            Some(v) if v.is_redeemable_at(now) => v,
            _ => return Err(VoucherRejection::VoucherInvalidOrExpired(code).into()),
        };
        if let Some(claim) = self.db.fetch_claim(user_id, voucher.id).await? {
            if voucher.per_user_cap().allows(claim.effective_usage()) {
                debug!("🎟️ {user_id} already holds {code}");
                return Ok(ClaimedVoucher::new(&claim, &voucher));
            }
            return Err(VoucherRejection::VoucherUserLimitReached(code).into());
        }
        match self.db.insert_claim(user_id, voucher.id, voucher.global_cap()).await? {
            ClaimOutcome::Created(claim) => {
                info!("🎟️ {user_id} claimed voucher {code}");
                Ok(ClaimedVoucher::new(&claim, &voucher))
            },
            ClaimOutcome::Existing(claim) => Ok(ClaimedVoucher::new(&claim, &voucher)),
            ClaimOutcome::Exhausted => Err(VoucherRejection::VoucherGloballyExhausted(code).into()),
        }
    }

    /// Every voucher the user has claimed, used or not.
    pub async fn my_vouchers(&self, user_id: &str) -> Result<Vec<ClaimedVoucher>, VoucherApiError> {
        let claims = self.db.fetch_claims_for_user(user_id).await?;
        Ok(claims.iter().map(|(claim, voucher)| ClaimedVoucher::new(claim, voucher)).collect())
    }

    /// Previews the discount `code` would give on `subtotal`. Nothing is written.
    pub async fn evaluate(&self, user_id: &str, code: &str, subtotal: Vnd) -> Result<DiscountQuote, VoucherApiError> {
        if subtotal.is_negative() {
            return Err(VoucherApiError::InvalidVoucher("The subtotal cannot be negative".into()));
        }
        let evaluation = VoucherEvaluator::new(self.db.clone()).evaluate(user_id, code, subtotal, Utc::now()).await?;
        Ok(DiscountQuote::from(&evaluation))
    }

    /// Vouchers that can be claimed right now.
    pub async fn public_vouchers(&self) -> Result<Vec<VoucherSummary>, VoucherApiError> {
        let vouchers = self.db.list_vouchers(Some(Utc::now())).await?;
        Ok(vouchers.iter().map(VoucherSummary::from).collect())
    }

    //------------------------------------   Admin   ----------------------------------------------------------------
    pub async fn list_vouchers(&self) -> Result<Vec<Voucher>, VoucherApiError> {
        Ok(self.db.list_vouchers(None).await?)
    }

    pub async fn fetch_voucher(&self, voucher_id: i64) -> Result<Voucher, VoucherApiError> {
        self.db.fetch_voucher(voucher_id).await?.ok_or_else(|| VoucherApiError::VoucherNotFound(voucher_id.to_string()))
    }

    /// Creates a voucher. Codes are stored upper-cased. A voucher created without usage caps may be used once
    /// overall and once per user.
    pub async fn create_voucher(&self, mut voucher: NewVoucher) -> Result<Voucher, VoucherApiError> {
        voucher.code = normalize_code(&voucher.code);
        voucher.max_uses = voucher.max_uses.or(Some(1));
        voucher.max_uses_per_user = voucher.max_uses_per_user.or(Some(1));
        VoucherRules {
            code: &voucher.code,
            name: &voucher.name,
            discount_type: voucher.discount_type,
            value: voucher.value,
            min_order_amount: voucher.min_order_amount,
            valid_from: voucher.valid_from,
            valid_until: voucher.valid_until,
            max_uses: voucher.max_uses,
            max_uses_per_user: voucher.max_uses_per_user,
        }
        .check()?;
        let code = voucher.code.clone();
        let voucher = self.db.insert_voucher(voucher).await.map_err(|e| duplicate_or(e, &code))?;
        info!("🎟️ Voucher {} created ({} {})", voucher.code, voucher.value, voucher.discount_type);
        Ok(voucher)
    }

    /// Applies a partial update. The merged result must still be a valid voucher.
    pub async fn update_voucher(&self, voucher_id: i64, mut update: VoucherUpdate) -> Result<Voucher, VoucherApiError> {
        let existing = self.fetch_voucher(voucher_id).await?;
        update.code = update.code.as_deref().map(normalize_code);
        let code = update.code.clone().unwrap_or_else(|| existing.code.clone());
        VoucherRules {
            code: &code,
            name: update.name.as_deref().unwrap_or(&existing.name),
            discount_type: update.discount_type.unwrap_or(existing.discount_type),
            value: update.value.unwrap_or(existing.value),
            min_order_amount: update.min_order_amount.unwrap_or(existing.min_order_amount),
            valid_from: update.valid_from.unwrap_or(existing.valid_from),
            valid_until: update.valid_until.unwrap_or(existing.valid_until),
            max_uses: update.max_uses.or(existing.max_uses),
            max_uses_per_user: update.max_uses_per_user.or(existing.max_uses_per_user),
        }
        .check()?;
        let updated = self
            .db
            .update_voucher(voucher_id, update)
            .await
            .map_err(|e| duplicate_or(e, &code))?
            .ok_or_else(|| VoucherApiError::VoucherNotFound(voucher_id.to_string()))?;
        info!("🎟️ Voucher {} updated", updated.code);
        Ok(updated)
    }

    pub async fn delete_voucher(&self, voucher_id: i64) -> Result<(), VoucherApiError> {
        if !self.db.delete_voucher(voucher_id).await? {
            return Err(VoucherApiError::VoucherNotFound(voucher_id.to_string()));
        }
        info!("🎟️ Voucher #{voucher_id} deleted");
        Ok(())
    }
}

fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

fn duplicate_or(e: StoreError, code: &str) -> VoucherApiError {
    if e.is_unique_violation() {
        VoucherApiError::DuplicateCode(code.to_string())
    } else {
        e.into()
    }
}

struct VoucherRules<'a> {
    code: &'a str,
    name: &'a str,
    discount_type: DiscountType,
    value: i64,
    min_order_amount: Vnd,
    valid_from: DateTime<Utc>,
    valid_until: DateTime<Utc>,
    max_uses: Option<i64>,
    max_uses_per_user: Option<i64>,
}

impl VoucherRules<'_> {
    fn check(&self) -> Result<(), VoucherApiError> {
        let invalid = |msg: &str| Err(VoucherApiError::InvalidVoucher(msg.to_string()));
        if self.code.is_empty() {
            return invalid("A voucher code is required");
        }
        if self.name.trim().is_empty() {
            return invalid("A voucher name is required");
        }
        if self.value < 0 {
            return invalid("The discount value cannot be negative");
        }
        if self.discount_type == DiscountType::Percentage && self.value > 100 {
            return invalid("A percentage discount cannot exceed 100");
        }
        if self.min_order_amount.is_negative() {
            return invalid("The minimum order amount cannot be negative");
        }
        if self.valid_from >= self.valid_until {
            return invalid("The validity window must end after it starts");
        }
        if self.max_uses.is_some_and(|n| n < 0) || self.max_uses_per_user.is_some_and(|n| n < 0) {
            return invalid("Usage caps cannot be negative");
        }
        Ok(())
    }
}
