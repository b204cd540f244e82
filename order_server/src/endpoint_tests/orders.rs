use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use order_engine::{
    db_types::{Order, OrderId, OrderStatusType},
    events::EventProducers,
    OrderFlowApi,
};
use serde_json::{json, Value};

use super::helpers::{admin_token, expired_token, sample_order, send_request, user_token, with_status};
use crate::{
    config::ServerOptions,
    endpoint_tests::mocks::MockShopDb,
    routes::{
        CancelOrderRoute,
        CreateOrderRoute,
        DeleteOrderRoute,
        FetchOrderRoute,
        MarkDeliveredRoute,
        SearchOrdersRoute,
        UpdateOrderStatusRoute,
    },
};

const MY_UNPAID_ORDER: &str = "ORDER1718000000001";
const SOMEONE_ELSES_ORDER: &str = "ORDER1718000000002";
const MY_SHIPPED_ORDER: &str = "ORDER1718000000003";
const MY_PENDING_ORDER: &str = "ORDER1718000000004";

#[actix_web::test]
async fn fetch_order_no_headers() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri(&format!("/orders/{MY_UNPAID_ORDER}"));
    let err = send_request(req, "", configure).await.expect_err("Expected error");
    assert_eq!(err, "Authentication Error. No access token was provided.");
}

#[actix_web::test]
async fn fetch_order_expired_token() {
    let _ = env_logger::try_init().ok();
    let token = expired_token("user-1", &[order_engine::db_types::Role::User]);
    let req = TestRequest::get().uri(&format!("/orders/{MY_UNPAID_ORDER}"));
    let err = send_request(req, &token, configure).await.expect_err("Expected error");
    assert_eq!(err, "Authentication Error. Access token has expired.");
}

#[actix_web::test]
async fn fetch_order_invalid_sig() {
    let _ = env_logger::try_init().ok();
    let mut token = user_token();
    token.replace_range(token.len() - 10..token.len() - 5, "00000");
    let req = TestRequest::get().uri(&format!("/orders/{MY_UNPAID_ORDER}"));
    let err = send_request(req, &token, configure).await.expect_err("Expected error");
    assert!(err.starts_with("Authentication Error."), "{err}");
}

#[actix_web::test]
async fn fetch_my_order() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri(&format!("/orders/{MY_UNPAID_ORDER}"));
    let (status, body) = send_request(req, &user_token(), configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let order: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(order["orderId"], MY_UNPAID_ORDER);
    assert_eq!(order["status"], "awaiting_payment");
    assert_eq!(order["totalPrice"], 250_000);
    // The product was removed from the catalog after the order was placed
    let placeholder = json!({"id": null, "code": null, "name": "Product no longer exists", "price": 0, "image": ""});
    assert_eq!(order["products"][0]["product"], placeholder);
    assert_eq!(order["products"][0]["quantity"], 2);
    assert_eq!(order["products"][0]["price"], 125_000);
}

#[actix_web::test]
async fn fetch_another_users_order_as_normal_user() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri(&format!("/orders/{SOMEONE_ELSES_ORDER}"));
    let (status, body) = send_request(req, &user_token(), configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, format!(r#"{{"error":"You do not have access to order {SOMEONE_ELSES_ORDER}"}}"#));
}

#[actix_web::test]
async fn fetch_another_users_order_as_admin() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri(&format!("/orders/{SOMEONE_ELSES_ORDER}"));
    let (status, body) = send_request(req, &admin_token(), configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""userId":"user-2""#));
}

#[actix_web::test]
async fn fetch_missing_order() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri("/orders/ORDER1");
    let (status, _) = send_request(req, &user_token(), configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn search_is_restricted_to_own_orders() {
    let _ = env_logger::try_init().ok();
    // The mock only answers queries that were narrowed to user-1
    let req = TestRequest::get().uri("/orders?userId=user-2&status=awaiting_payment,pending");
    let (status, body) = send_request(req, &user_token(), configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let orders: Vec<Value> = serde_json::from_str(&body).unwrap();
    assert_eq!(orders.len(), 2);
    assert!(orders.iter().all(|o| o["userId"] == "user-1"));
}

#[actix_web::test]
async fn search_with_unknown_status() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri("/orders?status=lost");
    let (status, _) = send_request(req, &user_token(), configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn cancel_pending_order() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::put().uri(&format!("/orders/{MY_PENDING_ORDER}/cancel"));
    let (status, body) = send_request(req, &user_token(), configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let order: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(order["status"], "cancelled");
}

#[actix_web::test]
async fn cancel_shipped_order_is_refused() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::put().uri(&format!("/orders/{MY_SHIPPED_ORDER}/cancel"));
    let (status, body) = send_request(req, &user_token(), configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(
        body,
        json!({"success": false, "message": format!("Order {MY_SHIPPED_ORDER} cannot be cancelled because it is shipped")})
    );
}

#[actix_web::test]
async fn mark_shipped_order_delivered() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::put().uri(&format!("/orders/{MY_SHIPPED_ORDER}/deliver"));
    let (status, body) = send_request(req, &user_token(), configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""status":"delivered""#));
}

#[actix_web::test]
async fn status_update_requires_admin() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::put()
        .uri(&format!("/orders/{MY_PENDING_ORDER}/status"))
        .set_json(json!({"status": "confirmed"}));
    let err = send_request(req, &user_token(), configure).await.expect_err("Expected error");
    assert!(err.contains("Insufficient permissions"), "{err}");
}

#[actix_web::test]
async fn admin_confirms_pending_order() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::put()
        .uri(&format!("/orders/{MY_PENDING_ORDER}/status"))
        .set_json(json!({"status": "confirmed"}));
    let (status, body) = send_request(req, &admin_token(), configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""status":"confirmed""#));
}

#[actix_web::test]
async fn admin_deletes_order() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::delete().uri(&format!("/orders/{MY_PENDING_ORDER}"));
    let err = send_request(req, &user_token(), configure).await.expect_err("Expected error");
    assert!(err.contains("Insufficient permissions"), "{err}");
    let req = TestRequest::delete().uri(&format!("/orders/{MY_PENDING_ORDER}"));
    let (status, body) = send_request(req, &admin_token(), configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, format!(r#"{{"success":true,"message":"Order {MY_PENDING_ORDER} deleted"}}"#));
}

#[actix_web::test]
async fn replayed_order_is_returned_unchanged() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post().uri("/orders").set_json(json!({
        "orderId": MY_UNPAID_ORDER,
        "products": [{"product": "AO-THUN-01", "quantity": 2, "color": "black", "size": "M"}],
        "paymentMethod": "seepay"
    }));
    let (status, body) = send_request(req, &user_token(), configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["created"], false);
    assert_eq!(body["order"]["orderId"], MY_UNPAID_ORDER);
    assert_eq!(body["payment"]["amount"], 250_000);
    assert_eq!(body["payment"]["content"], MY_UNPAID_ORDER);
    assert_eq!(
        body["payment"]["qrUrl"],
        format!("https://img.vietqr.io/image/MB-0123456789-print.png?amount=250000&addInfo={MY_UNPAID_ORDER}")
    );
}

#[actix_web::test]
async fn malformed_order_reference_is_rejected() {
    let _ = env_logger::try_init().ok();
    for reference in ["my-order", "ORDER42", "ORDER17180000000011"] {
        let req = TestRequest::post().uri("/orders").set_json(json!({
            "orderId": reference,
            "products": [{"product": "AO-THUN-01", "quantity": 1}]
        }));
        let (status, _) = send_request(req, &user_token(), configure).await.expect("Request failed");
        assert_eq!(status, StatusCode::BAD_REQUEST, "{reference} was accepted");
    }
}

#[actix_web::test]
async fn replaying_someone_elses_reference_is_forbidden() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post().uri("/orders").set_json(json!({
        "orderId": SOMEONE_ELSES_ORDER,
        "products": [{"product": "AO-THUN-01", "quantity": 1}]
    }));
    let (status, _) = send_request(req, &user_token(), configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::FORBIDDEN);
}

fn stored_order(order_id: &OrderId) -> Option<Order> {
    match order_id.as_str() {
        MY_UNPAID_ORDER => Some(sample_order(MY_UNPAID_ORDER, "user-1")),
        SOMEONE_ELSES_ORDER => Some(sample_order(SOMEONE_ELSES_ORDER, "user-2")),
        MY_SHIPPED_ORDER => Some(with_status(sample_order(MY_SHIPPED_ORDER, "user-1"), OrderStatusType::Shipped)),
        MY_PENDING_ORDER => Some(with_status(sample_order(MY_PENDING_ORDER, "user-1"), OrderStatusType::Pending)),
        _ => None,
    }
}

fn configure(cfg: &mut ServiceConfig) {
    let mut db = MockShopDb::new();
    db.expect_fetch_order().returning(|id| Ok(stored_order(id)));
    db.expect_fetch_product().returning(|_| Ok(None));
    db.expect_search_orders().returning(|query| {
        assert_eq!(query.user_id.as_deref(), Some("user-1"));
        assert_eq!(query.status, Some(vec![OrderStatusType::AwaitingPayment, OrderStatusType::Pending]));
        Ok(vec![
            sample_order(MY_UNPAID_ORDER, "user-1"),
            with_status(sample_order(MY_PENDING_ORDER, "user-1"), OrderStatusType::Pending),
        ])
    });
    db.expect_cancel_order().returning(|id, from| {
        let order = stored_order(id).filter(|o| from.contains(&o.status));
        Ok(order.map(|o| with_status(o, OrderStatusType::Cancelled)))
    });
    db.expect_transition_status().returning(|id, from, to| {
        let order = stored_order(id).filter(|o| from.contains(&o.status));
        Ok(order.map(|o| with_status(o, to)))
    });
    db.expect_delete_order().returning(|id| Ok(stored_order(id).is_some()));
    let orders_api = OrderFlowApi::new(db, EventProducers::default());
    let options = ServerOptions { bank_code: "MB".into(), account_no: "0123456789".into(), ..Default::default() };
    cfg.service(CreateOrderRoute::<MockShopDb>::new())
        .service(SearchOrdersRoute::<MockShopDb>::new())
        .service(FetchOrderRoute::<MockShopDb>::new())
        .service(CancelOrderRoute::<MockShopDb>::new())
        .service(MarkDeliveredRoute::<MockShopDb>::new())
        .service(UpdateOrderStatusRoute::<MockShopDb>::new())
        .service(DeleteOrderRoute::<MockShopDb>::new())
        .app_data(web::Data::new(orders_api))
        .app_data(web::Data::new(options));
}
