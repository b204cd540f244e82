use std::time::Duration;

use actix_web::{body::to_bytes, http::StatusCode, test, test::TestRequest, web::ServiceConfig, App};
use chrono::{TimeZone, Utc};
use log::debug;
use order_engine::db_types::{
    Order,
    OrderId,
    OrderLineItem,
    OrderStatusType,
    PaymentMethod,
    Role,
    ShippingAddress,
};
use shop_common::Vnd;

use crate::{
    auth::{JwtClaims, TokenIssuer, TokenValidator},
    config::AuthConfig,
    middleware::JwtMiddlewareFactory,
};

// A fixed secret for tests only. DO NOT re-use it anywhere.
const TEST_JWT_SECRET: &str = "endpoint-tests-only-secret-0123456789abcdef";

pub fn get_auth_config() -> AuthConfig {
    AuthConfig::new(TEST_JWT_SECRET)
}

pub fn issue_token(sub: &str, roles: &[Role]) -> String {
    TokenIssuer::new(&get_auth_config()).issue_token(sub, roles, Some(Duration::from_secs(3600))).unwrap()
}

pub fn expired_token(sub: &str, roles: &[Role]) -> String {
    let claims = JwtClaims { sub: sub.to_string(), roles: roles.to_vec(), exp: Utc::now().timestamp() - 120 };
    TokenIssuer::new(&get_auth_config()).sign(&claims).unwrap()
}

pub fn user_token() -> String {
    issue_token("user-1", &[Role::User])
}

pub fn admin_token() -> String {
    issue_token("admin-1", &[Role::User, Role::Admin])
}

/// Sends the request to an app built with `configure`. Every route is behind the JWT middleware.
///
/// Errors raised by middleware (authentication, ACL) come back as `Err(message)`; handler errors are rendered into the
/// response, as they would be for a real client.
pub async fn send_request(
    req: TestRequest,
    auth_token: &str,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    let req = if auth_token.is_empty() {
        req
    } else {
        req.insert_header(("Authorization", format!("Bearer {auth_token}")))
    };
    let app = App::new()
        .wrap(JwtMiddlewareFactory::new(TokenValidator::new(&get_auth_config())))
        .configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    let (_, res) = test::try_call_service(&service, req.to_request()).await.map_err(|e| e.to_string())?.into_parts();
    let status = res.status();
    let body = to_bytes(res.into_body()).await.map_err(body_error)?;
    Ok((status, String::from_utf8_lossy(&body).into_owned()))
}

/// Sends the request to an app built with `configure`, without any authentication middleware.
pub async fn send_public_request(
    req: TestRequest,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    debug!("Making public request");
    let (_, res) = test::try_call_service(&service, req.to_request()).await.map_err(|e| e.to_string())?.into_parts();
    let status = res.status();
    let body = to_bytes(res.into_body()).await.map_err(body_error)?;
    Ok((status, String::from_utf8_lossy(&body).into_owned()))
}

fn body_error<E: Into<Box<dyn std::error::Error>>>(e: E) -> String {
    e.into().to_string()
}

pub fn sample_order(order_id: &str, user_id: &str) -> Order {
    let created_at = Utc.with_ymd_and_hms(2024, 6, 10, 8, 30, 0).unwrap();
    Order {
        id: 1,
        order_id: OrderId::from(order_id),
        user_id: user_id.to_string(),
        subtotal: Vnd::from(250_000),
        discount_amount: Vnd::from(0),
        shipping_fee: Vnd::from(0),
        total_price: Vnd::from(250_000),
        status: OrderStatusType::AwaitingPayment,
        payment_method: PaymentMethod::Seepay,
        shipping_method: "standard".to_string(),
        voucher_code: None,
        shipping_address: ShippingAddress { full_name: "Nguyen Van A".into(), ..Default::default() },
        last_provider_check_at: None,
        created_at,
        updated_at: created_at,
        items: vec![OrderLineItem {
            id: 1,
            order_row_id: 1,
            product_id: 7,
            product_code: "AO-THUN-01".to_string(),
            product_name: "Áo thun".to_string(),
            product_image: "ao-thun.jpg".to_string(),
            unit_price: Vnd::from(125_000),
            cost_price: Vnd::from(80_000),
            quantity: 2,
            color: Some("black".into()),
            size: Some("M".into()),
        }],
    }
}

pub fn with_status(mut order: Order, status: OrderStatusType) -> Order {
    order.status = status;
    order
}
