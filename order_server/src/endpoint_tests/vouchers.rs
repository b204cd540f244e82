use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use chrono::{Duration, Utc};
use order_engine::{
    db_types::{DiscountType, UserVoucher, Voucher},
    traits::ClaimOutcome,
    VoucherApi,
};
use serde_json::{json, Value};
use shop_common::Vnd;

use super::helpers::{admin_token, send_public_request, send_request, user_token};
use crate::{
    endpoint_tests::mocks::MockShopDb,
    routes::{
        ClaimVoucherRoute,
        CreateVoucherRoute,
        DeleteVoucherRoute,
        FetchVoucherRoute,
        ListVouchersRoute,
        MyVouchersRoute,
        PublicVouchersRoute,
    },
};

#[actix_web::test]
async fn public_vouchers_need_no_token() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri("/vouchers/public");
    let (status, body) = send_public_request(req, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let vouchers: Vec<Value> = serde_json::from_str(&body).unwrap();
    assert_eq!(vouchers.len(), 1);
    assert_eq!(vouchers[0]["code"], "SALE10");
    assert_eq!(vouchers[0]["type"], "percentage");
    // Usage counters are not part of the public view
    assert!(vouchers[0].get("usedCount").is_none());
}

#[actix_web::test]
async fn claim_voucher() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post().uri("/vouchers/claim").set_json(json!({"code": " sale10 "}));
    let (status, body) = send_request(req, &user_token(), configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let claim: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(claim["voucher"]["code"], "SALE10");
    assert_eq!(claim["isUsed"], false);
    assert_eq!(claim["usageCount"], 0);
}

#[actix_web::test]
async fn claim_unknown_voucher() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post().uri("/vouchers/claim").set_json(json!({"code": "NOPE"}));
    let (status, body) = send_request(req, &user_token(), configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"error":"Voucher NOPE is invalid or has expired"}"#);
}

#[actix_web::test]
async fn my_vouchers_is_not_a_voucher_id() {
    let _ = env_logger::try_init().ok();
    // An admin reaching `/vouchers/my` must get their claims, not a lookup of voucher "my"
    let req = TestRequest::get().uri("/vouchers/my");
    let (status, body) = send_request(req, &admin_token(), configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let claims: Vec<Value> = serde_json::from_str(&body).unwrap();
    assert_eq!(claims.len(), 1);
    assert_eq!(claims[0]["isUsed"], true);
}

#[actix_web::test]
async fn voucher_admin_requires_admin_role() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri("/vouchers");
    let err = send_request(req, &user_token(), configure).await.expect_err("Expected error");
    assert!(err.contains("Insufficient permissions"), "{err}");
    let req = TestRequest::get().uri("/vouchers");
    let (status, body) = send_request(req, &admin_token(), configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let vouchers: Vec<Value> = serde_json::from_str(&body).unwrap();
    assert_eq!(vouchers.len(), 2);
}

#[actix_web::test]
async fn fetch_and_delete_voucher() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri("/vouchers/1");
    let (status, body) = send_request(req, &admin_token(), configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""code":"SALE10""#));
    let req = TestRequest::get().uri("/vouchers/99");
    let (status, _) = send_request(req, &admin_token(), configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
    let req = TestRequest::delete().uri("/vouchers/1");
    let (status, body) = send_request(req, &admin_token(), configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"success":true,"message":"Voucher #1 deleted"}"#);
}

#[actix_web::test]
async fn create_voucher_validates_the_window() {
    let _ = env_logger::try_init().ok();
    let now = Utc::now();
    let req = TestRequest::post().uri("/vouchers").set_json(json!({
        "code": "backwards",
        "name": "Backwards",
        "type": "fixed",
        "value": 20000,
        "validFrom": now,
        "validUntil": now - Duration::days(1),
        "maxUses": null,
        "maxUsesPerUser": null
    }));
    let (status, _) = send_request(req, &admin_token(), configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn create_voucher_defaults_to_single_use() {
    let _ = env_logger::try_init().ok();
    let now = Utc::now();
    let req = TestRequest::post().uri("/vouchers").set_json(json!({
        "code": "welcome",
        "name": "Welcome",
        "type": "fixed",
        "value": 20000,
        "validFrom": now,
        "validUntil": now + Duration::days(30),
        "maxUses": null,
        "maxUsesPerUser": null
    }));
    let (status, body) = send_request(req, &admin_token(), configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::CREATED);
    let voucher: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(voucher["code"], "WELCOME");
    assert_eq!(voucher["maxUses"], 1);
    assert_eq!(voucher["maxUsesPerUser"], 1);
    assert_eq!(voucher["createdBy"], "admin-1");
}

fn sale10() -> Voucher {
    let now = Utc::now();
    Voucher {
        id: 1,
        code: "SALE10".into(),
        name: "10% off".into(),
        description: "Ten percent off everything".into(),
        discount_type: DiscountType::Percentage,
        value: 10,
        min_order_amount: Vnd::from(0),
        valid_from: now - Duration::days(1),
        valid_until: now + Duration::days(30),
        max_uses: Some(100),
        max_uses_per_user: Some(1),
        used_count: 3,
        is_active: true,
        created_by: Some("admin-1".into()),
        created_at: now - Duration::days(2),
        updated_at: now - Duration::days(2),
    }
}

fn expired() -> Voucher {
    let now = Utc::now();
    Voucher {
        id: 2,
        code: "TET2024".into(),
        valid_from: now - Duration::days(300),
        valid_until: now - Duration::days(200),
        ..sale10()
    }
}

fn claim(user_id: &str, voucher_id: i64, usage_count: i64) -> UserVoucher {
    UserVoucher {
        id: 10,
        user_id: user_id.to_string(),
        voucher_id,
        claimed_at: Utc::now(),
        used_at: (usage_count > 0).then(Utc::now),
        usage_count,
        order_id: None,
    }
}

fn configure(cfg: &mut ServiceConfig) {
    let mut db = MockShopDb::new();
    db.expect_list_vouchers().returning(|at| {
        Ok(match at {
            Some(_) => vec![sale10()],
            None => vec![sale10(), expired()],
        })
    });
    db.expect_fetch_voucher_by_code().returning(|code| Ok((code == "SALE10").then(sale10)));
    db.expect_fetch_voucher().returning(|id| Ok((id == 1).then(sale10)));
    db.expect_fetch_claim().returning(|_, _| Ok(None));
    db.expect_insert_claim().returning(|user, id, _| Ok(ClaimOutcome::Created(claim(user, id, 0))));
    db.expect_fetch_claims_for_user().returning(|user| Ok(vec![(claim(user, 1, 1), sale10())]));
    db.expect_delete_voucher().returning(|id| Ok(id == 1));
    db.expect_insert_voucher().returning(|v| {
        let now = Utc::now();
        Ok(Voucher {
            id: 3,
            code: v.code,
            name: v.name,
            description: v.description,
            discount_type: v.discount_type,
            value: v.value,
            min_order_amount: v.min_order_amount,
            valid_from: v.valid_from,
            valid_until: v.valid_until,
            max_uses: v.max_uses,
            max_uses_per_user: v.max_uses_per_user,
            used_count: 0,
            is_active: v.is_active,
            created_by: v.created_by,
            created_at: now,
            updated_at: now,
        })
    });
    let vouchers_api = VoucherApi::new(db);
    cfg.service(PublicVouchersRoute::<MockShopDb>::new())
        .service(ClaimVoucherRoute::<MockShopDb>::new())
        .service(MyVouchersRoute::<MockShopDb>::new())
        .service(ListVouchersRoute::<MockShopDb>::new())
        .service(CreateVoucherRoute::<MockShopDb>::new())
        .service(FetchVoucherRoute::<MockShopDb>::new())
        .service(DeleteVoucherRoute::<MockShopDb>::new())
        .app_data(web::Data::new(vouchers_api));
}
