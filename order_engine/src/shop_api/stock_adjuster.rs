//! Stock bookkeeping outside of order placement.
//!
//! Placement and cancellation adjust stock inside their own transactions. The adjuster exposes the same guarded
//! operation for repairs and for tooling that needs to move stock on its own.
use log::*;

use crate::{
    db_types::{OrderLineItem, StockAdjustment, StockDirection, StockOutcome},
    traits::{Catalog, StoreError},
};

/// Tally of a batch of adjustments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StockReport {
    pub applied: usize,
    pub skipped_missing: usize,
    pub rejected: usize,
}

pub struct StockAdjuster<B> {
    catalog: B,
}

impl<B> StockAdjuster<B>
where B: Catalog
{
    pub fn new(catalog: B) -> Self {
        Self { catalog }
    }

    pub async fn adjust(&self, adjustment: &StockAdjustment) -> Result<StockOutcome, StoreError> {
        let outcome = self.catalog.adjust_stock(adjustment).await?;
        match outcome {
            StockOutcome::Applied { variant_tracked } => trace!(
                "📦️ Product #{}: {:?} of {} applied. Variant tracked: {variant_tracked}",
                adjustment.product_id,
                adjustment.direction,
                adjustment.quantity
            ),
            StockOutcome::ProductMissing => {
                warn!("📦️ Product #{} no longer exists. Adjustment skipped.", adjustment.product_id)
            },
            StockOutcome::Insufficient { available } => warn!(
                "📦️ Product #{}: {:?} of {} refused, only {available} available",
                adjustment.product_id, adjustment.direction, adjustment.quantity
            ),
        }
        Ok(outcome)
    }

    /// Applies the adjustment to every line item. Missing products and refused adjustments are counted, not fatal.
    pub async fn adjust_items(
        &self,
        items: &[OrderLineItem],
        direction: StockDirection,
    ) -> Result<StockReport, StoreError> {
        let mut report = StockReport::default();
        for item in items {
            let adjustment = match direction {
                StockDirection::Restock => StockAdjustment::restock(item),
                StockDirection::Sale => StockAdjustment { direction, ..StockAdjustment::restock(item) },
            };
            match self.adjust(&adjustment).await? {
                StockOutcome::Applied { .. } => report.applied += 1,
                StockOutcome::ProductMissing => report.skipped_missing += 1,
                StockOutcome::Insufficient { .. } => report.rejected += 1,
            }
        }
        debug!("📦️ Stock adjusted for {} items: {report:?}", items.len());
        Ok(report)
    }
}
