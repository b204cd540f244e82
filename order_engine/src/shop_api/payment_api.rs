//! Payment reconciliation.
//!
//! Two independent channels can confirm a payment: the customer polling for the status of their order, and the
//! provider pushing a webhook. Both end in the same conditional `pending|awaiting_payment -> paid` update, and only the
//! caller whose update actually changed the row publishes the [`OrderPaidEvent`].
use std::{fmt::Debug, time::Duration};

use chrono::{DateTime, Utc};
use log::*;

use crate::{
    db_types::{Order, OrderId, OrderStatusType},
    events::{EventProducers, OrderPaidEvent},
    helpers::extract_order_reference,
    order_objects::OrderQueryFilter,
    shop_api::{
        errors::OrderFlowError,
        payment_objects::{PaymentStatus, TransferNotice, WebhookOutcome},
    },
    traits::{OrderStore, PaymentProvider, ProviderTransfer, StoreError},
};

pub const DEFAULT_POLL_COOLDOWN: Duration = Duration::from_secs(5);
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(8);

/// Moves the order to `paid` if it is still awaiting funds, and publishes the paid event if this call made the change.
pub async fn mark_order_paid<B: OrderStore>(
    db: &B,
    producers: &EventProducers,
    order_id: &OrderId,
) -> Result<Option<Order>, StoreError> {
    let paid = OrderStatusType::Paid;
    let updated = db.transition_status(order_id, paid.legal_sources(), paid).await?;
    if let Some(order) = &updated {
        info!("💳️ Order [{order_id}] is paid ({})", order.total_price);
        producers.publish_order_paid(OrderPaidEvent::new(order.clone())).await;
    }
    Ok(updated)
}

/// The result of a sweep over unpaid orders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepResult {
    pub checked: usize,
    pub paid: usize,
}

pub struct PaymentApi<B, P> {
    db: B,
    provider: P,
    producers: EventProducers,
    cooldown: Duration,
    timeout: Duration,
}

impl<B, P> Debug for PaymentApi<B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentApi (cooldown: {:?}, timeout: {:?})", self.cooldown, self.timeout)
    }
}

impl<B, P> PaymentApi<B, P> {
    pub fn new(db: B, provider: P, producers: EventProducers) -> Self {
        Self { db, provider, producers, cooldown: DEFAULT_POLL_COOLDOWN, timeout: DEFAULT_PROVIDER_TIMEOUT }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B, P> PaymentApi<B, P>
where
    B: OrderStore,
    P: PaymentProvider,
{
    /// Answers a customer's payment-status poll.
    ///
    /// Orders that can no longer be paid are answered straight from the database. Otherwise the provider is asked for
    /// a matching transfer, at most once per cooldown window per order; polls inside the window get the stored status.
    /// A provider that errors or does not answer within the timeout leaves the order untouched.
    pub async fn check_payment_status(&self, order_id: &OrderId) -> Result<PaymentStatus, OrderFlowError> {
        let order = self.fetch(order_id).await?;
        if !order.status.is_awaiting_funds() {
            trace!("💳️ Order [{order_id}] is {}. No need to ask the provider.", order.status);
            return Ok(PaymentStatus::from(&order));
        }
        let now_ms = Utc::now().timestamp_millis();
        let cooldown_ms = i64::try_from(self.cooldown.as_millis()).unwrap_or(i64::MAX);
        if !self.db.claim_provider_check(order_id, now_ms, cooldown_ms).await? {
            debug!("💳️ Order [{order_id}] was checked less than {:?} ago. Returning the stored status.", self.cooldown);
            return Ok(PaymentStatus::from(&order));
        }
        let Some(transfer) = self.search_provider(order_id).await else {
            return Ok(PaymentStatus::from(&order));
        };
        if !transfer.names_order(order_id) {
            warn!(
                "💳️ Transfer {} was returned for [{order_id}] but its memo \"{}\" names another order. Ignoring it.",
                transfer.reference, transfer.content
            );
            return Ok(PaymentStatus::from(&order));
        }
        if !transfer.confirms_payment() {
            debug!("💳️ Transfer {} for [{order_id}] does not confirm payment yet", transfer.reference);
            return Ok(PaymentStatus::from(&order));
        }
        if transfer.amount.is_positive() && transfer.amount < order.total_price {
            warn!(
                "💳️ Order [{order_id}] was underpaid: received {}, expected {}",
                transfer.amount, order.total_price
            );
        }
        let current = match mark_order_paid(&self.db, &self.producers, order_id).await? {
            Some(paid) => paid,
            // Someone else got there first
            None => self.fetch(order_id).await?,
        };
        Ok(PaymentStatus::from(&current))
    }

    async fn search_provider(&self, order_id: &OrderId) -> Option<ProviderTransfer> {
        match tokio::time::timeout(self.timeout, self.provider.search_transfer(order_id)).await {
            Ok(Ok(Some(transfer))) => Some(transfer),
            Ok(Ok(None)) => {
                trace!("💳️ The provider has no transfer for [{order_id}] yet");
                None
            },
            Ok(Err(e)) => {
                warn!("💳️ Payment lookup for [{order_id}] failed. Treating it as inconclusive. {e}");
                None
            },
            Err(_) => {
                warn!("💳️ Payment lookup for [{order_id}] timed out after {:?}. Treating it as inconclusive.", self.timeout);
                None
            },
        }
    }

    /// Checks every order still awaiting a bank transfer that was created at or after `since`. The poll cooldown
    /// applies, so a sweep never adds provider traffic for orders that customers are already polling.
    pub async fn sweep(&self, since: DateTime<Utc>) -> Result<SweepResult, OrderFlowError> {
        let query = OrderQueryFilter::default().with_status(OrderStatusType::AwaitingPayment).since(since);
        let unpaid = self.db.search_orders(query).await?;
        let mut result = SweepResult::default();
        for order in unpaid {
            result.checked += 1;
            match self.check_payment_status(&order.order_id).await {
                Ok(status) if status.status == OrderStatusType::Paid => result.paid += 1,
                Ok(_) => {},
                Err(e) => warn!("💳️ Sweep could not check [{}]. {e}", order.order_id),
            }
        }
        Ok(result)
    }
}

impl<B, P> PaymentApi<B, P>
where B: OrderStore
{
    /// Handles a provider-pushed transfer notification.
    ///
    /// Fails with [`OrderFlowError::OrderReferenceNotFound`] if the memo carries no `ORDER<digits>` token, and with
    /// [`OrderFlowError::OrderNotFound`] if the token names no order. Repeated deliveries are harmless.
    pub async fn process_webhook(&self, notice: TransferNotice) -> Result<WebhookOutcome, OrderFlowError> {
        let memo = notice.memo();
        let order_id = extract_order_reference(memo).ok_or_else(|| {
            info!("💳️ Webhook memo \"{memo}\" carries no order reference");
            OrderFlowError::OrderReferenceNotFound
        })?;
        let order = self.fetch(&order_id).await?;
        if order.status == OrderStatusType::Paid {
            debug!("💳️ Webhook for [{order_id}]: already paid");
            return Ok(WebhookOutcome::AlreadyPaid(order));
        }
        if !notice.amount.is_positive() || !order.status.is_awaiting_funds() {
            info!("💳️ Webhook for [{order_id}] ignored. Amount {}, order is {}", notice.amount, order.status);
            return Ok(WebhookOutcome::Ignored(order));
        }
        if notice.amount < order.total_price {
            warn!(
                "💳️ Order [{order_id}] was underpaid: received {}, expected {}. Accepting it anyway.",
                notice.amount, order.total_price
            );
        }
        match mark_order_paid(&self.db, &self.producers, &order_id).await? {
            Some(paid) => Ok(WebhookOutcome::MarkedPaid(paid)),
            None => {
                let current = self.fetch(&order_id).await?;
                if current.status == OrderStatusType::Paid {
                    Ok(WebhookOutcome::AlreadyPaid(current))
                } else {
                    Ok(WebhookOutcome::Ignored(current))
                }
            },
        }
    }

    async fn fetch(&self, order_id: &OrderId) -> Result<Order, OrderFlowError> {
        self.db.fetch_order(order_id).await?.ok_or_else(|| OrderFlowError::OrderNotFound(order_id.clone()))
    }
}
