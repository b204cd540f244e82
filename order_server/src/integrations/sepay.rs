//! Plugs SePay into the order engine.
//!
//! [`SepayProvider`] answers the engine's transfer searches with SePay's transaction-search API, and
//! [`transfer_notice`] turns a SePay webhook body into the provider-neutral notice the engine reconciles.
use log::*;
use order_engine::{
    db_types::OrderId,
    payment_objects::TransferNotice,
    PaymentProvider,
    PaymentProviderError,
    ProviderTransfer,
};
use sepay_tools::{SepayApi, SepayApiError, SepayConfig, SepayTransaction, SepayWebhook};
use shop_common::Vnd;

#[derive(Clone)]
pub struct SepayProvider {
    api: SepayApi,
}

impl SepayProvider {
    pub fn new(config: SepayConfig) -> Result<Self, SepayApiError> {
        let api = SepayApi::new(config)?;
        Ok(Self { api })
    }
}

impl PaymentProvider for SepayProvider {
    async fn search_transfer(&self, order_id: &OrderId) -> Result<Option<ProviderTransfer>, PaymentProviderError> {
        let transaction = self.api.latest_transaction(order_id.as_str()).await.map_err(|e| {
            debug!("💳️ SePay search for {order_id} failed. {e}");
            provider_error(e)
        })?;
        Ok(transaction.as_ref().map(provider_transfer))
    }
}

pub fn provider_transfer(tx: &SepayTransaction) -> ProviderTransfer {
    ProviderTransfer { reference: tx.id(), amount: tx.amount(), status: tx.status.clone(), content: tx.memo().to_string() }
}

pub fn provider_error(e: SepayApiError) -> PaymentProviderError {
    match e {
        SepayApiError::Unauthorized => PaymentProviderError::Unauthorized,
        SepayApiError::Initialization(s) | SepayApiError::RestRequestError(s) => PaymentProviderError::Unreachable(s),
        other => PaymentProviderError::InvalidResponse(other.to_string()),
    }
}

/// Outgoing transfers are reported with their amount zeroed, so they can never confirm a payment.
pub fn transfer_notice(webhook: &SepayWebhook) -> TransferNotice {
    let amount = if webhook.is_incoming() {
        webhook.amount()
    } else {
        debug!("💳️ SePay webhook {:?} reports an outgoing transfer", webhook.id);
        Vnd::default()
    };
    TransferNotice {
        reference: webhook.id.map(|id| id.to_string()).or_else(|| webhook.reference_code.clone()),
        content: webhook.content.clone(),
        description: webhook.description.clone(),
        amount,
    }
}
