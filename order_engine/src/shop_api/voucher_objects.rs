use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shop_common::Vnd;

use crate::db_types::{DiscountType, UserVoucher, Voucher, VoucherRedemption};

/// The public face of a voucher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherSummary {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub discount_type: DiscountType,
    pub value: i64,
    pub min_order_amount: Vnd,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

impl From<&Voucher> for VoucherSummary {
    fn from(v: &Voucher) -> Self {
        Self {
            id: v.id,
            code: v.code.clone(),
            name: v.name.clone(),
            description: v.description.clone(),
            discount_type: v.discount_type,
            value: v.value,
            min_order_amount: v.min_order_amount,
            valid_from: v.valid_from,
            valid_until: v.valid_until,
        }
    }
}

/// One of a user's voucher claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimedVoucher {
    pub voucher: VoucherSummary,
    pub claimed_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub usage_count: i64,
    /// `true` once the claim has no uses left.
    pub is_used: bool,
}

impl ClaimedVoucher {
    pub fn new(claim: &UserVoucher, voucher: &Voucher) -> Self {
        let usage = claim.effective_usage();
        Self {
            voucher: VoucherSummary::from(voucher),
            claimed_at: claim.claimed_at,
            used_at: claim.used_at,
            usage_count: usage,
            is_used: !voucher.per_user_cap().allows(usage),
        }
    }
}

/// A successful voucher evaluation: the discount to apply and the handles needed to consume the voucher once the
/// order has been persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoucherEvaluation {
    pub voucher: Voucher,
    pub claim: UserVoucher,
    pub subtotal: Vnd,
    pub discount: Vnd,
}

impl VoucherEvaluation {
    pub fn redemption(&self) -> VoucherRedemption {
        VoucherRedemption {
            voucher_id: self.voucher.id,
            voucher_code: self.voucher.code.clone(),
            claim_id: self.claim.id,
            global_cap: self.voucher.global_cap(),
            per_user_cap: self.voucher.per_user_cap(),
        }
    }
}

/// The checkout preview returned by a side-effect-free evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountQuote {
    pub code: String,
    pub subtotal: Vnd,
    pub discount: Vnd,
    pub total: Vnd,
}

impl From<&VoucherEvaluation> for DiscountQuote {
    fn from(e: &VoucherEvaluation) -> Self {
        Self { code: e.voucher.code.clone(), subtotal: e.subtotal, discount: e.discount, total: e.subtotal - e.discount }
    }
}
