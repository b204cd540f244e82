use std::{path::Path, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use order_engine::{
    events::{EventProducers, OrderRooms},
    OrderFlowApi,
    PaymentApi,
    SqliteDatabase,
    VoucherApi,
};

use crate::{
    auth::TokenValidator,
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    integrations::sepay::SepayProvider,
    middleware::{JwtMiddlewareFactory, WebhookKeyMiddlewareFactory},
    notifications::create_notification_handlers,
    payment_worker::start_payment_worker,
    routes::{
        health,
        CancelOrderRoute,
        CheckPaymentStatusRoute,
        ClaimVoucherRoute,
        CreateOrderRoute,
        CreateVoucherRoute,
        DeleteOrderRoute,
        DeleteVoucherRoute,
        EvaluateVoucherRoute,
        FetchOrderRoute,
        FetchVoucherRoute,
        ListVouchersRoute,
        MarkDeliveredRoute,
        MyVouchersRoute,
        PaymentEventsRoute,
        PaymentQrRoute,
        PublicVouchersRoute,
        SearchOrdersRoute,
        SepayWebhookRoute,
        UpdateOrderStatusRoute,
        UpdateVoucherRoute,
    },
};

const MAX_DB_CONNECTIONS: u32 = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    ensure_database_dir(&config.database_url)?;
    let db = SqliteDatabase::new_with_url(&config.database_url, MAX_DB_CONNECTIONS)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let rooms = OrderRooms::default();
    let handlers = create_notification_handlers(rooms.clone());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let provider = SepayProvider::new(config.sepay.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    match config.payments.sweep_interval {
        Some(interval) => {
            let api = PaymentApi::new(db.clone(), provider.clone(), producers.clone())
                .with_cooldown(config.payments.poll_cooldown)
                .with_timeout(config.payments.provider_timeout);
            // The worker runs for the lifetime of the process
            let _worker = start_payment_worker(api, interval, config.payments.sweep_window);
        },
        None => info!("🕰️ Payment sweep worker is disabled"),
    }
    let srv = create_server_instance(config, db, provider, rooms, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    provider: SepayProvider,
    rooms: OrderRooms,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let options = ServerOptions::from_config(&config);
    let validator = TokenValidator::new(&config.auth);
    let webhook_key = config.webhook_api_key.clone();
    let payments = config.payments;
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), producers.clone());
        let payments_api = PaymentApi::new(db.clone(), provider.clone(), producers.clone())
            .with_cooldown(payments.poll_cooldown)
            .with_timeout(payments.provider_timeout);
        let vouchers_api = VoucherApi::new(db.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("shop::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(payments_api))
            .app_data(web::Data::new(vouchers_api))
            .app_data(web::Data::new(rooms.clone()))
            .app_data(web::Data::new(options.clone()));
        // Routes that require authentication
        let auth_scope = web::scope("/api")
            .wrap(JwtMiddlewareFactory::new(validator.clone()))
            .service(CreateOrderRoute::<SqliteDatabase>::new())
            .service(SearchOrdersRoute::<SqliteDatabase>::new())
            .service(FetchOrderRoute::<SqliteDatabase>::new())
            .service(CancelOrderRoute::<SqliteDatabase>::new())
            .service(MarkDeliveredRoute::<SqliteDatabase>::new())
            .service(UpdateOrderStatusRoute::<SqliteDatabase>::new())
            .service(DeleteOrderRoute::<SqliteDatabase>::new())
            .service(ClaimVoucherRoute::<SqliteDatabase>::new())
            .service(MyVouchersRoute::<SqliteDatabase>::new())
            .service(EvaluateVoucherRoute::<SqliteDatabase>::new())
            .service(ListVouchersRoute::<SqliteDatabase>::new())
            .service(CreateVoucherRoute::<SqliteDatabase>::new())
            .service(FetchVoucherRoute::<SqliteDatabase>::new())
            .service(UpdateVoucherRoute::<SqliteDatabase>::new())
            .service(DeleteVoucherRoute::<SqliteDatabase>::new());
        let webhook_scope = web::scope("/payments/webhook")
            .wrap(WebhookKeyMiddlewareFactory::new(webhook_key.clone()))
            .service(SepayWebhookRoute::<SqliteDatabase, SepayProvider>::new());
        app.service(health)
            .service(webhook_scope)
            .service(CheckPaymentStatusRoute::<SqliteDatabase, SepayProvider>::new())
            .service(PaymentQrRoute::<SqliteDatabase>::new())
            .service(PaymentEventsRoute::<SqliteDatabase>::new())
            .service(PublicVouchersRoute::<SqliteDatabase>::new())
            .service(auth_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// SQLite creates the database file on demand, but not the directory it lives in.
fn ensure_database_dir(url: &str) -> Result<(), ServerError> {
    let path = url.trim_start_matches("sqlite://").trim_start_matches("sqlite:");
    if path.starts_with(':') || path.is_empty() {
        return Ok(());
    }
    let path = path.split('?').next().unwrap_or(path);
    match Path::new(path).parent() {
        Some(dir) if !dir.as_os_str().is_empty() && !dir.exists() => {
            info!("🗃️ Creating database directory {}", dir.display());
            std::fs::create_dir_all(dir)?;
            Ok(())
        },
        _ => Ok(()),
    }
}
