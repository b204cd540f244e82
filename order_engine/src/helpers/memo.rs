use std::sync::OnceLock;

use regex::Regex;

use crate::{db_types::OrderId, helpers::ORDER_REFERENCE_PREFIX};

/// Digits in a generated reference: a unix timestamp in milliseconds.
const ORDER_REFERENCE_DIGITS: usize = 13;

fn order_reference_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"ORDER\d+").ok()).as_ref()
}

/// Finds the first `ORDER<digits>` token in a free-text bank transfer memo.
pub fn extract_order_reference(memo: &str) -> Option<OrderId> {
    order_reference_pattern()?.find(memo).map(|m| OrderId::from(m.as_str()))
}

/// True if any `ORDER<digits>` token in `memo` is exactly `order_id`.
///
/// `ORDER17000000000001` does not name `ORDER1700000000000`: the token must end where the reference ends.
pub fn memo_names_order(memo: &str, order_id: &OrderId) -> bool {
    order_reference_pattern()
        .map(|p| p.find_iter(memo).any(|m| m.as_str() == order_id.as_str()))
        .unwrap_or(false)
}

/// True if `s` is exactly one order reference in the form the shop generates: `ORDER` and 13 digits.
pub fn is_order_reference(s: &str) -> bool {
    match s.strip_prefix(ORDER_REFERENCE_PREFIX) {
        Some(digits) => digits.len() == ORDER_REFERENCE_DIGITS && digits.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}
