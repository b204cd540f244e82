use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use order_engine::{
    db_types::{Order, OrderId, OrderStatusType},
    events::{EventProducers, OrderRooms},
    traits::ProviderTransfer,
    OrderFlowApi,
    PaymentApi,
};
use serde_json::{json, Value};
use shop_common::{Secret, Vnd};

use super::helpers::{sample_order, send_public_request, with_status};
use crate::{
    config::ServerOptions,
    endpoint_tests::mocks::{MockProvider, MockShopDb},
    middleware::WebhookKeyMiddlewareFactory,
    routes::{CheckPaymentStatusRoute, PaymentEventsRoute, PaymentQrRoute, SepayWebhookRoute},
};

const UNPAID_ORDER: &str = "ORDER1718000000001";
const PAID_ORDER: &str = "ORDER1718000000005";
const DELIVERED_ORDER: &str = "ORDER1718000000006";
const WEBHOOK_KEY: &str = "webhook-test-key";

#[actix_web::test]
async fn poll_marks_order_paid_when_the_provider_has_the_transfer() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post().uri("/payments/check-status").set_json(json!({"orderId": UNPAID_ORDER}));
    let (status, body) = send_public_request(req, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body, json!({"orderId": UNPAID_ORDER, "name": "Nguyen Van A", "amount": 250_000, "status": "paid"}));
}

#[actix_web::test]
async fn poll_for_unknown_order() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post().uri("/payments/check-status").set_json(json!({"orderId": "ORDER42"}));
    let (status, body) = send_public_request(req, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"error":"The requested order ORDER42 does not exist"}"#);
}

#[actix_web::test]
async fn webhook_requires_the_api_key() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post().uri("/payments/webhook").set_json(webhook_body("Thanh toan ORDER1718000000001"));
    let err = send_public_request(req, configure).await.expect_err("Expected error");
    assert_eq!(err, "Authentication Error. The API key is missing or invalid.");
    let req = TestRequest::post()
        .uri("/payments/webhook")
        .insert_header(("Authorization", "Apikey not-the-key"))
        .set_json(webhook_body("Thanh toan ORDER1718000000001"));
    let err = send_public_request(req, configure).await.expect_err("Expected error");
    assert_eq!(err, "Authentication Error. The API key is missing or invalid.");
}

#[actix_web::test]
async fn webhook_marks_order_paid() {
    let _ = env_logger::try_init().ok();
    let req = webhook_request(webhook_body("Thanh toan ORDER1718000000001"));
    let (status, body) = send_public_request(req, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, format!(r#"{{"message":"Order {UNPAID_ORDER} has been marked as paid"}}"#));
}

#[actix_web::test]
async fn webhook_falls_back_to_the_description() {
    let _ = env_logger::try_init().ok();
    let body = json!({
        "id": 93,
        "content": "",
        "description": "BankAPINotify ORDER1718000000001",
        "transferType": "in",
        "transferAmount": 250000
    });
    let (status, body) = send_public_request(webhook_request(body), configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("has been marked as paid"), "{body}");
}

#[actix_web::test]
async fn webhook_repeated_for_paid_order() {
    let _ = env_logger::try_init().ok();
    let req = webhook_request(webhook_body("Thanh toan ORDER1718000000005"));
    let (status, body) = send_public_request(req, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, format!(r#"{{"message":"Order {PAID_ORDER} was already paid"}}"#));
}

#[actix_web::test]
async fn webhook_without_order_reference() {
    let _ = env_logger::try_init().ok();
    let req = webhook_request(webhook_body("Chuyen tien an trua"));
    let (status, body) = send_public_request(req, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"No order reference was found in the transfer content"}"#);
}

#[actix_web::test]
async fn webhook_for_unknown_order() {
    let _ = env_logger::try_init().ok();
    let req = webhook_request(webhook_body("Thanh toan ORDER999"));
    let (status, _) = send_public_request(req, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn qr_for_unpaid_order() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri(&format!("/payments/qr/{UNPAID_ORDER}"));
    let (status, body) = send_public_request(req, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(
        body,
        json!({
            "orderId": UNPAID_ORDER,
            "amount": 250_000,
            "bankCode": "MB",
            "accountNo": "0123456789",
            "content": UNPAID_ORDER,
            "qrUrl": format!("https://img.vietqr.io/image/MB-0123456789-print.png?amount=250000&addInfo={UNPAID_ORDER}")
        })
    );
}

#[actix_web::test]
async fn qr_for_paid_order() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri(&format!("/payments/qr/{PAID_ORDER}"));
    let (status, _) = send_public_request(req, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn events_for_paid_order_end_immediately() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri(&format!("/payments/events/{PAID_ORDER}"));
    let (status, body) = send_public_request(req, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, format!("event: order_paid\ndata: {{\"orderId\":\"{PAID_ORDER}\"}}\n\n"));
}

#[actix_web::test]
async fn events_for_closed_or_unknown_orders() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri(&format!("/payments/events/{DELIVERED_ORDER}"));
    let (status, _) = send_public_request(req, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let req = TestRequest::get().uri("/payments/events/ORDER999");
    let (status, _) = send_public_request(req, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
}

fn webhook_body(content: &str) -> Value {
    json!({
        "id": 92,
        "gateway": "MBBank",
        "transactionDate": "2024-06-10 08:45:00",
        "accountNumber": "0123456789",
        "content": content,
        "transferType": "in",
        "transferAmount": 250000,
        "referenceCode": "FT24162000001"
    })
}

fn webhook_request(body: Value) -> TestRequest {
    TestRequest::post()
        .uri("/payments/webhook")
        .insert_header(("Authorization", format!("Apikey {WEBHOOK_KEY}")))
        .set_json(body)
}

fn stored_order(order_id: &OrderId) -> Option<Order> {
    match order_id.as_str() {
        UNPAID_ORDER => Some(sample_order(UNPAID_ORDER, "user-1")),
        PAID_ORDER => Some(with_status(sample_order(PAID_ORDER, "user-1"), OrderStatusType::Paid)),
        DELIVERED_ORDER => Some(with_status(sample_order(DELIVERED_ORDER, "user-1"), OrderStatusType::Delivered)),
        _ => None,
    }
}

fn mock_db() -> MockShopDb {
    let mut db = MockShopDb::new();
    db.expect_fetch_order().returning(|id| Ok(stored_order(id)));
    db.expect_claim_provider_check().returning(|_, _, _| Ok(true));
    db.expect_transition_status().returning(|id, from, to| {
        let order = stored_order(id).filter(|o| from.contains(&o.status));
        Ok(order.map(|o| with_status(o, to)))
    });
    db
}

fn configure(cfg: &mut ServiceConfig) {
    let mut provider = MockProvider::new();
    provider.expect_search_transfer().returning(|id| {
        Ok(Some(ProviderTransfer {
            reference: "92".into(),
            amount: Vnd::from(250_000),
            status: None,
            content: format!("Thanh toan {id}"),
        }))
    });
    let payments_api = PaymentApi::new(mock_db(), provider, EventProducers::default());
    let orders_api = OrderFlowApi::new(mock_db(), EventProducers::default());
    let options = ServerOptions { bank_code: "MB".into(), account_no: "0123456789".into(), ..Default::default() };
    let webhook_scope = web::scope("/payments/webhook")
        .wrap(WebhookKeyMiddlewareFactory::new(Some(Secret::new(WEBHOOK_KEY.to_string()))))
        .service(SepayWebhookRoute::<MockShopDb, MockProvider>::new());
    cfg.service(webhook_scope)
        .service(CheckPaymentStatusRoute::<MockShopDb, MockProvider>::new())
        .service(PaymentQrRoute::<MockShopDb>::new())
        .service(PaymentEventsRoute::<MockShopDb>::new())
        .app_data(web::Data::new(payments_api))
        .app_data(web::Data::new(orders_api))
        .app_data(web::Data::new(OrderRooms::default()))
        .app_data(web::Data::new(options));
}
