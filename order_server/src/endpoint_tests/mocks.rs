use chrono::{DateTime, Utc};
use mockall::mock;
use order_engine::{
    db_types::{
        CartItem,
        CartKey,
        NewCartItem,
        NewOrder,
        NewProduct,
        NewVoucher,
        Order,
        OrderId,
        OrderStatusType,
        Product,
        ProductVariant,
        StockAdjustment,
        StockOutcome,
        UsageCap,
        UserVoucher,
        Voucher,
        VoucherRedemption,
        VoucherUpdate,
    },
    order_objects::OrderQueryFilter,
    traits::{
        CartStore,
        Catalog,
        ClaimOutcome,
        OrderStore,
        PaymentProvider,
        PaymentProviderError,
        ProviderTransfer,
        ShopDatabase,
        StoreError,
        VoucherStore,
    },
};

mock! {
    pub ShopDb {}
    impl Clone for ShopDb {
        fn clone(&self) -> Self;
    }
    impl Catalog for ShopDb {
        async fn fetch_product_by_code(&self, code: &str) -> Result<Option<Product>, StoreError>;
        async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, StoreError>;
        async fn fetch_variant(&self, product_id: i64, color: &str, size: &str) -> Result<Option<ProductVariant>, StoreError>;
        async fn insert_product(&self, product: NewProduct) -> Result<Product, StoreError>;
        async fn remove_product(&self, product_id: i64) -> Result<bool, StoreError>;
        async fn adjust_stock(&self, adjustment: &StockAdjustment) -> Result<StockOutcome, StoreError>;
    }
    impl VoucherStore for ShopDb {
        async fn fetch_voucher_by_code(&self, code: &str) -> Result<Option<Voucher>, StoreError>;
        async fn fetch_voucher(&self, voucher_id: i64) -> Result<Option<Voucher>, StoreError>;
        async fn list_vouchers(&self, redeemable_at: Option<DateTime<Utc>>) -> Result<Vec<Voucher>, StoreError>;
        async fn insert_voucher(&self, voucher: NewVoucher) -> Result<Voucher, StoreError>;
        async fn update_voucher(&self, voucher_id: i64, update: VoucherUpdate) -> Result<Option<Voucher>, StoreError>;
        async fn delete_voucher(&self, voucher_id: i64) -> Result<bool, StoreError>;
        async fn fetch_claim(&self, user_id: &str, voucher_id: i64) -> Result<Option<UserVoucher>, StoreError>;
        async fn insert_claim(&self, user_id: &str, voucher_id: i64, cap: UsageCap) -> Result<ClaimOutcome, StoreError>;
        async fn fetch_claims_for_user(&self, user_id: &str) -> Result<Vec<(UserVoucher, Voucher)>, StoreError>;
    }
    impl OrderStore for ShopDb {
        async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError>;
        async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, StoreError>;
        async fn transition_status(&self, order_id: &OrderId, from: &[OrderStatusType], to: OrderStatusType) -> Result<Option<Order>, StoreError>;
        async fn claim_provider_check(&self, order_id: &OrderId, now_ms: i64, cooldown_ms: i64) -> Result<bool, StoreError>;
        async fn delete_order(&self, order_id: &OrderId) -> Result<bool, StoreError>;
    }
    impl CartStore for ShopDb {
        async fn add_cart_item(&self, item: NewCartItem) -> Result<CartItem, StoreError>;
        async fn fetch_cart(&self, user_id: &str) -> Result<Vec<CartItem>, StoreError>;
        async fn remove_cart_items(&self, user_id: &str, keys: &[CartKey]) -> Result<u64, StoreError>;
    }
    impl ShopDatabase for ShopDb {
        fn url(&self) -> &str;
        async fn place_order(&self, order: NewOrder, voucher: Option<VoucherRedemption>) -> Result<Order, StoreError>;
        async fn cancel_order(&self, order_id: &OrderId, from: &[OrderStatusType]) -> Result<Option<Order>, StoreError>;
    }
}

mock! {
    pub Provider {}
    impl PaymentProvider for Provider {
        async fn search_transfer(&self, order_id: &OrderId) -> Result<Option<ProviderTransfer>, PaymentProviderError>;
    }
}
