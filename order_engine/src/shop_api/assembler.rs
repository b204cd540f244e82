//! Turns client-submitted product references into priced, stock-checked line items.
use log::*;
use shop_common::Vnd;

use crate::{
    db_types::NewLineItem,
    order_objects::OrderItemRequest,
    shop_api::errors::OrderFlowError,
    traits::Catalog,
};

/// Line items with their snapshotted prices, plus the subtotal they add up to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledOrder {
    pub items: Vec<NewLineItem>,
    pub subtotal: Vnd,
}

pub struct OrderAssembler<B> {
    catalog: B,
}

impl<B> OrderAssembler<B>
where B: Catalog
{
    pub fn new(catalog: B) -> Self {
        Self { catalog }
    }

    /// Resolves every requested item against the catalog. Nothing is written: stock is only reserved when the order
    /// is placed.
    ///
    /// Fails with [`OrderFlowError::ProductNotFound`] for an unknown code and with
    /// [`OrderFlowError::InsufficientStock`] when a request exceeds availability. Availability is the tracked variant's
    /// `quantity` when the (color, size) pair names one, and `total - sold` otherwise.
    pub async fn assemble(&self, requested: &[OrderItemRequest]) -> Result<AssembledOrder, OrderFlowError> {
        if requested.is_empty() {
            return Err(OrderFlowError::InvalidRequest("An order must contain at least one product".into()));
        }
        let mut items = Vec::with_capacity(requested.len());
        for req in requested {
            let code = req.product.trim();
            if code.is_empty() {
                return Err(OrderFlowError::InvalidRequest("Every item needs a product code".into()));
            }
            if req.quantity <= 0 {
                return Err(OrderFlowError::InvalidRequest(format!("Invalid quantity {} for {code}", req.quantity)));
            }
            let product = self
                .catalog
                .fetch_product_by_code(code)
                .await?
                .ok_or_else(|| OrderFlowError::ProductNotFound(code.to_string()))?;
            let color = normalize(&req.color);
            let size = normalize(&req.size);
            let variant = match (&color, &size) {
                (Some(c), Some(s)) => self.catalog.fetch_variant(product.id, c, s).await?,
                _ => None,
            };
            let available = variant.as_ref().map(|v| v.quantity).unwrap_or_else(|| product.available());
            // The same product may appear on several lines
            let already: i64 = items
                .iter()
                .filter(|i: &&NewLineItem| i.product_id == product.id && i.color == color && i.size == size)
                .map(|i| i.quantity)
                .sum();
            let requested_total = already + req.quantity;
            if requested_total > available {
                debug!("🔄️ {code}: {requested_total} requested, {available} available");
                return Err(OrderFlowError::InsufficientStock {
                    product: product.code,
                    requested: requested_total,
                    available,
                });
            }
            items.push(NewLineItem {
                product_id: product.id,
                product_code: product.code.clone(),
                product_name: product.name.clone(),
                product_image: product.thumbnail.clone(),
                unit_price: product.price,
                cost_price: product.cost_price,
                quantity: req.quantity,
                color,
                size,
            });
        }
        let subtotal = items.iter().map(NewLineItem::line_total).sum();
        trace!("🔄️ Assembled {} line items. Subtotal {subtotal}", items.len());
        Ok(AssembledOrder { items, subtotal })
    }
}

fn normalize(value: &Option<String>) -> Option<String> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(String::from)
}
