#![allow(dead_code)]
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
        Mutex,
    },
    time::Duration,
};

use chrono::{Duration as ChronoDuration, Utc};
use order_engine::{
    db_types::{DiscountType, NewProduct, NewVoucher, OrderId, Product, Voucher},
    events::EventProducers,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    ClaimOutcome,
    PaymentProvider,
    PaymentProviderError,
    ProviderTransfer,
    ShopDatabase,
    SqliteDatabase,
    VoucherStore,
    Catalog,
};
use shop_common::Vnd;
use sqlx::{migrate::MigrateDatabase, Sqlite};

pub async fn fresh_database() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

pub async fn tear_down(db: SqliteDatabase) {
    let url = db.url().to_string();
    db.pool().close().await;
    Sqlite::drop_database(&url).await.expect("Error dropping database");
}

pub fn no_events() -> EventProducers {
    EventProducers::default()
}

pub async fn seed_product(db: &SqliteDatabase, code: &str, price: i64, total: i64) -> Product {
    db.insert_product(NewProduct::new(code, code, Vnd::from(price), total)).await.expect("Error inserting product")
}

pub async fn seed_product_with_variant(
    db: &SqliteDatabase,
    code: &str,
    price: i64,
    total: i64,
    variant: (&str, &str, i64),
) -> Product {
    let (color, size, quantity) = variant;
    let product = NewProduct::new(code, code, Vnd::from(price), total).with_variant(color, size, quantity);
    db.insert_product(product).await.expect("Error inserting product")
}

pub fn percentage_voucher(code: &str, value: i64, min_order: i64) -> NewVoucher {
    let now = Utc::now();
    NewVoucher {
        code: code.to_string(),
        name: format!("{code} promotion"),
        description: String::new(),
        discount_type: DiscountType::Percentage,
        value,
        min_order_amount: Vnd::from(min_order),
        valid_from: now - ChronoDuration::days(1),
        valid_until: now + ChronoDuration::days(30),
        max_uses: Some(0),
        max_uses_per_user: Some(1),
        is_active: true,
        created_by: Some("admin".into()),
    }
}

pub async fn seed_voucher(db: &SqliteDatabase, voucher: NewVoucher) -> Voucher {
    db.insert_voucher(voucher).await.expect("Error inserting voucher")
}

pub async fn seed_claim(db: &SqliteDatabase, user_id: &str, voucher: &Voucher) {
    match db.insert_claim(user_id, voucher.id, voucher.global_cap()).await.expect("Error claiming voucher") {
        ClaimOutcome::Created(_) | ClaimOutcome::Existing(_) => {},
        ClaimOutcome::Exhausted => panic!("Voucher {} is exhausted", voucher.code),
    }
}

/// A scripted payment provider that counts how often it is asked.
#[derive(Debug, Clone, Default)]
pub struct ScriptedProvider {
    calls: Arc<AtomicUsize>,
    transfer: Arc<Mutex<Option<ProviderTransfer>>>,
    delay: Option<Duration>,
    fail: bool,
}

impl ScriptedProvider {
    pub fn paying(amount: i64) -> Self {
        let provider = Self::default();
        provider.set_transfer(amount);
        provider
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Default::default() }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_transfer(&self, amount: i64) {
        let transfer = ProviderTransfer {
            reference: "FT0001".into(),
            amount: Vnd::from(amount),
            status: Some("PAID".into()),
            content: String::new(),
        };
        *self.transfer.lock().unwrap() = Some(transfer);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PaymentProvider for ScriptedProvider {
    async fn search_transfer(&self, order_id: &OrderId) -> Result<Option<ProviderTransfer>, PaymentProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(PaymentProviderError::Unreachable("connection refused".into()));
        }
        let transfer = self.transfer.lock().unwrap().clone();
        Ok(transfer.map(|mut t| {
            t.content = format!("Thanh toan {order_id}");
            t
        }))
    }
}

/// A provider that searches a fixed list of transfers the way SePay's `addInfo` search does: any memo that merely
/// contains the order reference is a hit. The newest transfer comes first.
#[derive(Clone, Default)]
pub struct LooseSearchProvider {
    transfers: Arc<Mutex<Vec<ProviderTransfer>>>,
}

impl LooseSearchProvider {
    pub fn receive(&self, memo: &str, amount: i64) {
        let mut transfers = self.transfers.lock().unwrap();
        let transfer = ProviderTransfer {
            reference: format!("FT{:04}", transfers.len() + 1),
            amount: Vnd::from(amount),
            status: None,
            content: memo.to_string(),
        };
        transfers.insert(0, transfer);
    }
}

impl PaymentProvider for LooseSearchProvider {
    async fn search_transfer(&self, order_id: &OrderId) -> Result<Option<ProviderTransfer>, PaymentProviderError> {
        let transfers = self.transfers.lock().unwrap();
        Ok(transfers.iter().find(|t| t.content.contains(order_id.as_str())).cloned())
    }
}
