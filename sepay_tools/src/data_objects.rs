use log::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shop_common::Vnd;

use crate::helpers::{memo_carries_reference, parse_sepay_amount};

/// The envelope of a transaction-search response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Vec<SepayTransaction>,
}

/// A transaction as returned by the search endpoint. SePay's own schema has drifted over time, so every field is
/// optional and amounts may arrive as strings or numbers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SepayTransaction {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub transaction_date: Option<String>,
    #[serde(default)]
    pub account_number: Option<String>,
    #[serde(default)]
    pub amount_in: Value,
    #[serde(default)]
    pub transaction_content: Option<String>,
    #[serde(default)]
    pub reference_number: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl SepayTransaction {
    pub fn id(&self) -> String {
        match &self.id {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// The amount received. Unparseable amounts count as zero.
    pub fn amount(&self) -> Vnd {
        let parsed = match &self.amount_in {
            Value::String(s) => parse_sepay_amount(s),
            Value::Number(n) => n.as_i64().map(Vnd::from).map_or_else(|| parse_sepay_amount(&n.to_string()), Ok),
            _ => Ok(Vnd::default()),
        };
        parsed.unwrap_or_else(|e| {
            warn!("💳️ SePay transaction {} has an unusable amount. {e}", self.id());
            Vnd::default()
        })
    }

    pub fn memo(&self) -> &str {
        self.transaction_content.as_deref().unwrap_or_default()
    }

    pub fn carries_reference(&self, reference: &str) -> bool {
        memo_carries_reference(self.memo(), reference)
    }
}

/// The body SePay posts to the webhook endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SepayWebhook {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub gateway: Option<String>,
    #[serde(default)]
    pub transaction_date: Option<String>,
    #[serde(default)]
    pub account_number: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub transfer_type: Option<String>,
    #[serde(default)]
    pub transfer_amount: Option<f64>,
    #[serde(default)]
    pub reference_code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl SepayWebhook {
    /// The transferred amount. Fractional or missing amounts count as zero, which never confirms a payment.
    pub fn amount(&self) -> Vnd {
        match self.transfer_amount.map(Vnd::try_from) {
            Some(Ok(v)) => v,
            Some(Err(e)) => {
                warn!("💳️ SePay webhook {:?} has an unusable amount. {e}", self.id);
                Vnd::default()
            },
            None => Vnd::default(),
        }
    }

    /// Outgoing transfers are reported too. Only incoming ones can pay for an order.
    pub fn is_incoming(&self) -> bool {
        self.transfer_type.as_deref().map(|t| t.eq_ignore_ascii_case("in")).unwrap_or(true)
    }
}
