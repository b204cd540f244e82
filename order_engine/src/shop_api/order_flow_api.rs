use std::fmt::Debug;

use chrono::Utc;
use log::*;
use shop_common::Vnd;

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatusType, PaymentMethod},
    events::{EventProducers, OrderCancelledEvent},
    helpers::{is_order_reference, next_order_reference},
    order_objects::{Actor, LineItemView, NewOrderRequest, OrderPlacement, OrderQueryFilter, OrderView, ProductSummary},
    shop_api::{
        assembler::OrderAssembler,
        cart_clearer::CartClearer,
        errors::OrderFlowError,
        payment_api::mark_order_paid,
        voucher_evaluator::VoucherEvaluator,
    },
    traits::ShopDatabase,
};

const MAX_REFERENCE_ATTEMPTS: usize = 3;
const DEFAULT_SHIPPING_METHOD: &str = "standard";

/// `OrderFlowApi` drives the order lifecycle: creation, staff transitions, cancellation and delivery.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> OrderFlowApi<B>
where B: ShopDatabase
{
    /// Creates an order for `actor`.
    ///
    /// Line items are assembled and the voucher (if any) is evaluated before anything is written. The order, its
    /// stock reservations and the voucher consumption are then persisted in one transaction. Clearing the ordered
    /// lines from the cart happens afterwards and never fails the request.
    ///
    /// If the request carries an order reference that already belongs to `actor`, that order is returned unchanged.
    pub async fn create_order(&self, actor: &Actor, req: NewOrderRequest) -> Result<OrderPlacement, OrderFlowError> {
        if let Some(order_id) = &req.order_id {
            if !is_order_reference(order_id.as_str()) {
                return Err(OrderFlowError::InvalidRequest(format!("{order_id} is not a valid order reference")));
            }
            if let Some(existing) = self.replayed_order(actor, order_id).await? {
                return Ok(existing);
            }
        }
        let shipping_fee = req.shipping_fee.unwrap_or_default();
        if shipping_fee.is_negative() {
            return Err(OrderFlowError::InvalidRequest("The shipping fee cannot be negative".into()));
        }
        let assembled = OrderAssembler::new(self.db.clone()).assemble(&req.products).await?;
        let evaluation = match req.normalized_voucher_code() {
            Some(code) => {
                let evaluator = VoucherEvaluator::new(self.db.clone());
                Some(evaluator.evaluate(&actor.user_id, &code, assembled.subtotal, Utc::now()).await?)
            },
            None => None,
        };
        let discount = evaluation.as_ref().map(|e| e.discount).unwrap_or_default();
        let total_price = assembled.subtotal - discount + shipping_fee;
        let redemption = evaluation.as_ref().map(|e| e.redemption());
        let mut new_order = NewOrder {
            order_id: req.order_id.clone().unwrap_or_else(next_order_reference),
            user_id: actor.user_id.clone(),
            items: assembled.items,
            subtotal: assembled.subtotal,
            discount_amount: discount,
            shipping_fee,
            total_price,
            payment_method: req.payment_method,
            shipping_method: req.shipping_method.clone().unwrap_or_else(|| DEFAULT_SHIPPING_METHOD.to_string()),
            voucher_code: evaluation.as_ref().map(|e| e.voucher.code.clone()),
            shipping_address: req.shipping_address.clone(),
            created_at: Utc::now(),
        };
        let mut attempt = 1;
        let order = loop {
            match self.db.place_order(new_order.clone(), redemption.clone()).await {
                Ok(order) => break order,
                Err(e) if e.is_unique_violation() && req.order_id.is_some() => {
                    // A concurrent request with the same reference won
                    if let Some(existing) = self.replayed_order(actor, &new_order.order_id).await? {
                        return Ok(existing);
                    }
                    return Err(e.into());
                },
                Err(e) if e.is_unique_violation() && attempt < MAX_REFERENCE_ATTEMPTS => {
                    warn!("🔄️ Order reference {} is taken. Retrying with a fresh one.", new_order.order_id);
                    new_order.order_id = next_order_reference();
                    attempt += 1;
                },
                Err(e) if e.is_unique_violation() => return Err(OrderFlowError::ReferenceExhausted),
                Err(e) => return Err(e.into()),
            }
        };
        info!(
            "🔄️ Order [{}] created for {}: {} items, total {} ({})",
            order.order_id,
            order.user_id,
            order.items.len(),
            order.total_price,
            order.status
        );
        CartClearer::new(self.db.clone()).clear_ordered_items(&order.user_id, &order.items).await;
        let view = self.render(order).await?;
        Ok(OrderPlacement { order: view, created: true })
    }

    async fn replayed_order(&self, actor: &Actor, order_id: &OrderId) -> Result<Option<OrderPlacement>, OrderFlowError> {
        match self.db.fetch_order(order_id).await? {
            Some(order) if order.user_id == actor.user_id => {
                debug!("🔄️ Order [{order_id}] already exists. Returning it unchanged.");
                let view = self.render(order).await?;
                Ok(Some(OrderPlacement { order: view, created: false }))
            },
            Some(_) => Err(OrderFlowError::Forbidden(order_id.clone())),
            None => Ok(None),
        }
    }

    /// The order as `actor` is allowed to see it.
    pub async fn fetch_order(&self, actor: &Actor, order_id: &OrderId) -> Result<OrderView, OrderFlowError> {
        let order = self.fetch_owned(actor, order_id).await?;
        self.render(order).await
    }

    /// The raw order record, without ownership checks.
    pub async fn fetch_order_record(&self, order_id: &OrderId) -> Result<Order, OrderFlowError> {
        self.db.fetch_order(order_id).await?.ok_or_else(|| OrderFlowError::OrderNotFound(order_id.clone()))
    }

    /// Searches orders. Non-admin callers only ever see their own orders, whatever the filter says.
    pub async fn search_orders(
        &self,
        actor: &Actor,
        mut query: OrderQueryFilter,
    ) -> Result<Vec<OrderView>, OrderFlowError> {
        if !actor.is_admin {
            query.user_id = Some(actor.user_id.clone());
        }
        trace!("🔄️ Order search: {query}");
        let orders = self.db.search_orders(query).await?;
        let mut views = Vec::with_capacity(orders.len());
        for order in orders {
            views.push(self.render(order).await?);
        }
        Ok(views)
    }

    /// Cancels an order that is `pending` or `paid`, returning its stock to the catalog. Vouchers consumed by the order
    /// stay consumed.
    pub async fn cancel_order(&self, actor: &Actor, order_id: &OrderId) -> Result<OrderView, OrderFlowError> {
        let order = self.fetch_owned(actor, order_id).await?;
        let cancelled = OrderStatusType::Cancelled;
        if !order.status.can_transition_to(cancelled) {
            return Err(OrderFlowError::IllegalCancellation { order_id: order_id.clone(), status: order.status });
        }
        match self.db.cancel_order(order_id, cancelled.legal_sources()).await? {
            Some(order) => {
                info!("🔄️ Order [{order_id}] cancelled by {}", actor.user_id);
                self.producers.publish_order_cancelled(OrderCancelledEvent::new(order.clone())).await;
                self.render(order).await
            },
            None => {
                // The status changed under us
                let current = self.fetch_order_record(order_id).await?;
                Err(OrderFlowError::IllegalCancellation { order_id: order_id.clone(), status: current.status })
            },
        }
    }

    /// The customer confirms receipt of a shipped order.
    pub async fn mark_delivered(&self, actor: &Actor, order_id: &OrderId) -> Result<OrderView, OrderFlowError> {
        self.fetch_owned(actor, order_id).await?;
        let order = self.transition(order_id, OrderStatusType::Delivered).await?;
        self.render(order).await
    }

    /// A staff-driven status change. Cancellation goes through [`Self::cancel_order`] semantics (stock is returned)
    /// and a manual `paid` fires the paid notification just as a confirmed transfer would.
    pub async fn update_status(
        &self,
        actor: &Actor,
        order_id: &OrderId,
        status: OrderStatusType,
    ) -> Result<OrderView, OrderFlowError> {
        if !actor.is_admin {
            return Err(OrderFlowError::Forbidden(order_id.clone()));
        }
        let order = match status {
            OrderStatusType::Cancelled => return self.cancel_order(actor, order_id).await,
            OrderStatusType::Paid => match mark_order_paid(&self.db, &self.producers, order_id).await? {
                Some(order) => order,
                None => return Err(self.illegal_transition(order_id, status).await),
            },
            _ => self.transition(order_id, status).await?,
        };
        info!("🔄️ {} moved order [{order_id}] to {status}", actor.user_id);
        self.render(order).await
    }

    /// Permanently removes an order. Admins only.
    pub async fn delete_order(&self, actor: &Actor, order_id: &OrderId) -> Result<(), OrderFlowError> {
        if !actor.is_admin {
            return Err(OrderFlowError::Forbidden(order_id.clone()));
        }
        if !self.db.delete_order(order_id).await? {
            return Err(OrderFlowError::OrderNotFound(order_id.clone()));
        }
        info!("🔄️ Order [{order_id}] deleted by {}", actor.user_id);
        Ok(())
    }

    async fn transition(&self, order_id: &OrderId, to: OrderStatusType) -> Result<Order, OrderFlowError> {
        match self.db.transition_status(order_id, to.legal_sources(), to).await? {
            Some(order) => {
                debug!("🔄️ Order [{order_id}] is now {to}");
                Ok(order)
            },
            None => Err(self.illegal_transition(order_id, to).await),
        }
    }

    async fn illegal_transition(&self, order_id: &OrderId, to: OrderStatusType) -> OrderFlowError {
        match self.fetch_order_record(order_id).await {
            Ok(current) => OrderFlowError::IllegalTransition { order_id: order_id.clone(), from: current.status, to },
            Err(e) => e,
        }
    }

    async fn fetch_owned(&self, actor: &Actor, order_id: &OrderId) -> Result<Order, OrderFlowError> {
        let order = self.fetch_order_record(order_id).await?;
        if !actor.can_access(&order) {
            warn!("🔄️ {} tried to access order [{order_id}], which belongs to someone else", actor.user_id);
            return Err(OrderFlowError::Forbidden(order_id.clone()));
        }
        Ok(order)
    }

    /// Resolves line items to live product summaries, with a placeholder for products that have been deleted.
    async fn render(&self, mut order: Order) -> Result<OrderView, OrderFlowError> {
        let items = std::mem::take(&mut order.items);
        let mut products = Vec::with_capacity(items.len());
        for item in &items {
            let summary = match self.db.fetch_product(item.product_id).await? {
                Some(product) => ProductSummary::from(&product),
                None => ProductSummary::missing(),
            };
            products.push(LineItemView::new(item, summary));
        }
        Ok(OrderView::new(order, products))
    }
}

/// The amount a customer must transfer for a SePay order, or `None` if no transfer is expected.
pub fn amount_due(order: &Order) -> Option<Vnd> {
    let awaiting = order.payment_method == PaymentMethod::Seepay && order.status.is_awaiting_funds();
    awaiting.then_some(order.total_price)
}
