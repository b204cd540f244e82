use chrono::{DateTime, Utc};

use crate::{
    db_types::{NewVoucher, UsageCap, UserVoucher, Voucher, VoucherUpdate},
    traits::StoreError,
};

/// The result of trying to create a claim for a (user, voucher) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    Created(UserVoucher),
    /// The user already held a claim on this voucher.
    Existing(UserVoucher),
    /// The voucher's global cap on claims has been reached.
    Exhausted,
}

#[allow(async_fn_in_trait)]
pub trait VoucherStore: Clone {
    /// Codes are stored in upper case. Implementations must normalise `code` before the lookup.
    async fn fetch_voucher_by_code(&self, code: &str) -> Result<Option<Voucher>, StoreError>;

    async fn fetch_voucher(&self, voucher_id: i64) -> Result<Option<Voucher>, StoreError>;

    /// Lists vouchers, newest first. If `redeemable_at` is given, only active vouchers whose validity window contains
    /// that instant are returned.
    async fn list_vouchers(&self, redeemable_at: Option<DateTime<Utc>>) -> Result<Vec<Voucher>, StoreError>;

    /// Fails with [`StoreError::UniqueViolation`] if the code is taken.
    async fn insert_voucher(&self, voucher: NewVoucher) -> Result<Voucher, StoreError>;

    async fn update_voucher(&self, voucher_id: i64, update: VoucherUpdate) -> Result<Option<Voucher>, StoreError>;

    async fn delete_voucher(&self, voucher_id: i64) -> Result<bool, StoreError>;

    async fn fetch_claim(&self, user_id: &str, voucher_id: i64) -> Result<Option<UserVoucher>, StoreError>;

    /// Creates a claim, unless one exists already or the number of claims has reached `cap`. The cap check and the
    /// insert are a single statement.
    async fn insert_claim(&self, user_id: &str, voucher_id: i64, cap: UsageCap) -> Result<ClaimOutcome, StoreError>;

    /// All of a user's claims together with the vouchers they refer to, most recent claim first.
    async fn fetch_claims_for_user(&self, user_id: &str) -> Result<Vec<(UserVoucher, Voucher)>, StoreError>;
}
