use shop_common::Vnd;

use crate::SepayApiError;

/// SePay reports amounts as decimal strings, e.g. `"250000.00"`. Đồng have no minor unit, so any non-zero fraction is
/// rejected.
pub fn parse_sepay_amount(amount: &str) -> Result<Vnd, SepayApiError> {
    let amount = amount.trim();
    let mut parts = amount.split('.');
    let whole = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| SepayApiError::InvalidAmount(amount.to_string()))?
        .parse::<i64>()
        .map_err(|e| SepayApiError::InvalidAmount(format!("Invalid amount: {amount}. {e}.")))?;
    match parts.next() {
        None => {},
        Some(fraction) if fraction.chars().all(|c| c == '0') => {},
        Some(_) => return Err(SepayApiError::InvalidAmount(format!("{amount} is not a whole number of đồng"))),
    }
    if parts.next().is_some() {
        return Err(SepayApiError::InvalidAmount(amount.to_string()));
    }
    Ok(Vnd::from(whole))
}

/// True if `reference` appears in `memo` as a whole reference, i.e. not as the start of a longer run of digits.
///
/// SePay's `addInfo` search is a substring match, so a search for `ORDER170000000000` also returns memos carrying
/// `ORDER1700000000000`.
pub fn memo_carries_reference(memo: &str, reference: &str) -> bool {
    if reference.is_empty() {
        return false;
    }
    memo.match_indices(reference).any(|(start, _)| {
        let rest = &memo[start + reference.len()..];
        !rest.starts_with(|c: char| c.is_ascii_digit())
    })
}

/// The VietQR image a customer scans to transfer `amount` to the shop's account, with `reference` as the memo.
pub fn vietqr_url(bank_code: &str, account_no: &str, amount: Vnd, reference: &str) -> String {
    format!(
        "https://img.vietqr.io/image/{bank_code}-{account_no}-print.png?amount={}&addInfo={reference}",
        amount.value()
    )
}
