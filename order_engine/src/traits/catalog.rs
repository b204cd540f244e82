use crate::{
    db_types::{NewProduct, Product, ProductVariant, StockAdjustment, StockOutcome},
    traits::StoreError,
};

#[allow(async_fn_in_trait)]
pub trait Catalog: Clone {
    /// Resolves a product by its human-readable catalog code.
    async fn fetch_product_by_code(&self, code: &str) -> Result<Option<Product>, StoreError>;

    /// Resolves a product by its internal identity.
    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, StoreError>;

    async fn fetch_variant(
        &self,
        product_id: i64,
        color: &str,
        size: &str,
    ) -> Result<Option<ProductVariant>, StoreError>;

    async fn insert_product(&self, product: NewProduct) -> Result<Product, StoreError>;

    /// Deletes the product and its variants. Existing orders keep their snapshots. Returns `false` if there was
    /// nothing to delete.
    async fn remove_product(&self, product_id: i64) -> Result<bool, StoreError>;

    /// Applies a single guarded stock adjustment. The update never drives a counter out of its valid range: if the
    /// guard fails, nothing is changed and [`StockOutcome::Insufficient`] is returned.
    async fn adjust_stock(&self, adjustment: &StockAdjustment) -> Result<StockOutcome, StoreError>;
}
