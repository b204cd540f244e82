use std::{collections::HashMap, future::Future, pin::Pin};

use cucumber::World;
use log::*;
use order_engine::{
    db_types::OrderId,
    events::{EventHandlers, EventHooks, OrderPaidEvent, OrderPaidNotice, OrderRooms},
    order_objects::OrderView,
    payment_objects::PaymentStatus,
    test_utils::prepare_env::{create_database, random_db_path, run_migrations},
    OrderFlowApi,
    OrderFlowError,
    PaymentApi,
    SqliteDatabase,
    VoucherApi,
};
use tokio::{sync::broadcast, time::sleep};

use crate::support::ScriptedProvider;

#[derive(Default, Debug, World)]
pub struct ShopWorld {
    pub system: Option<ShopSystem>,
    pub last_order: Option<OrderView>,
    pub last_error: Option<OrderFlowError>,
    pub last_status: Option<PaymentStatus>,
    pub listeners: HashMap<OrderId, broadcast::Receiver<OrderPaidNotice>>,
}

#[derive(Debug)]
pub struct ShopSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub orders: OrderFlowApi<SqliteDatabase>,
    pub payments: PaymentApi<SqliteDatabase, ScriptedProvider>,
    pub vouchers: VoucherApi<SqliteDatabase>,
    pub provider: ScriptedProvider,
    pub rooms: OrderRooms,
}

impl ShopWorld {
    pub fn system(&self) -> &ShopSystem {
        self.system.as_ref().expect("Shop system not initialised")
    }

    pub fn db(&self) -> &SqliteDatabase {
        &self.system().db
    }

    pub fn orders(&self) -> &OrderFlowApi<SqliteDatabase> {
        &self.system().orders
    }

    pub fn payments(&self) -> &PaymentApi<SqliteDatabase, ScriptedProvider> {
        &self.system().payments
    }

    pub fn vouchers(&self) -> &VoucherApi<SqliteDatabase> {
        &self.system().vouchers
    }
}

impl ShopSystem {
    pub async fn new() -> Self {
        let url = prepare_test_env().await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
        debug!("Created database: {url}");
        sleep(std::time::Duration::from_millis(50)).await;
        let rooms = OrderRooms::default();
        let forward_to = rooms.clone();
        let mut hooks = EventHooks::default();
        hooks.on_order_paid(move |ev: OrderPaidEvent| {
            let rooms = forward_to.clone();
            Box::pin(async move {
                rooms.emit_paid(&ev.order.order_id);
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        });
        let handlers = EventHandlers::new(16, hooks);
        let producers = handlers.producers();
        handlers.start_handlers().await;
        let provider = ScriptedProvider::default();
        let orders = OrderFlowApi::new(db.clone(), producers.clone());
        let payments = PaymentApi::new(db.clone(), provider.clone(), producers);
        let vouchers = VoucherApi::new(db.clone());
        Self { db_path: url, db, orders, payments, vouchers, provider, rooms }
    }
}

pub async fn prepare_test_env() -> String {
    let path = random_db_path();
    create_database(&path).await;
    run_migrations(&path).await;
    path
}

/// The variant name of an engine error, as written in the feature files.
pub fn error_name(e: &OrderFlowError) -> String {
    let debug = match e {
        OrderFlowError::VoucherRejected(r) => format!("{r:?}"),
        other => format!("{other:?}"),
    };
    debug.split(|c: char| !c.is_alphanumeric()).next().unwrap_or_default().to_string()
}
