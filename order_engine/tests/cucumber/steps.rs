use std::time::Duration;

use cucumber::{given, then, when};
use order_engine::{
    db_types::{OrderId, OrderStatusType, PaymentMethod},
    order_objects::{Actor, NewOrderRequest, OrderItemRequest, OrderQueryFilter},
    payment_objects::TransferNotice,
    Catalog,
    OrderStore,
    VoucherStore,
};
use shop_common::Vnd;

use crate::cucumber::{shop_world::error_name, ShopWorld};

fn request(quantity: i64, code: &str) -> NewOrderRequest {
    NewOrderRequest::new(vec![OrderItemRequest { product: code.into(), quantity, color: None, size: None }])
}

fn status(s: &str) -> OrderStatusType {
    s.parse().expect("Not a valid order status")
}

async fn place(world: &mut ShopWorld, user: &str, req: NewOrderRequest) {
    match world.orders().create_order(&Actor::user(user), req).await {
        Ok(placement) => {
            world.last_order = Some(placement.order);
            world.last_error = None;
        },
        Err(e) => {
            world.last_order = None;
            world.last_error = Some(e);
        },
    }
}

#[given(expr = "'{word}' has placed a cash-on-delivery order '{word}' for {int} '{word}'")]
async fn placed_cod_order(world: &mut ShopWorld, user: String, order_id: String, quantity: i64, code: String) {
    let req = request(quantity, &code).with_order_id(OrderId::from(order_id)).with_payment_method(PaymentMethod::Cod);
    place(world, &user, req).await;
    assert!(world.last_error.is_none(), "Order was not placed: {:?}", world.last_error);
}

#[given(expr = "'{word}' has placed a bank transfer order '{word}' for {int} '{word}'")]
async fn placed_transfer_order(world: &mut ShopWorld, user: String, order_id: String, quantity: i64, code: String) {
    let req = request(quantity, &code).with_order_id(OrderId::from(order_id));
    place(world, &user, req).await;
    assert!(world.last_error.is_none(), "Order was not placed: {:?}", world.last_error);
}

#[when(expr = "'{word}' orders {int} '{word}' with voucher '{word}' and a shipping fee of {int}")]
async fn order_with_voucher(world: &mut ShopWorld, user: String, quantity: i64, code: String, voucher: String, fee: i64) {
    let req = request(quantity, &code).with_voucher(voucher).with_shipping_fee(Vnd::from(fee));
    place(world, &user, req).await;
}

#[when(expr = "'{word}' tries to order {int} '{word}'")]
async fn try_order(world: &mut ShopWorld, user: String, quantity: i64, code: String) {
    place(world, &user, request(quantity, &code)).await;
}

#[when(expr = "'{word}' tries to order {int} '{word}' with voucher '{word}'")]
async fn try_order_with_voucher(world: &mut ShopWorld, user: String, quantity: i64, code: String, voucher: String) {
    place(world, &user, request(quantity, &code).with_voucher(voucher)).await;
}

#[given(expr = "staff have moved order '{word}' to '{word}'")]
async fn staff_transitioned(world: &mut ShopWorld, order_id: String, to: String) {
    staff_transition(world, order_id, to).await;
}

#[when(expr = "staff move order '{word}' to '{word}'")]
async fn staff_transition(world: &mut ShopWorld, order_id: String, to: String) {
    let id = OrderId::from(order_id);
    world.orders().update_status(&Actor::admin("staff"), &id, status(&to)).await.expect("Error updating status");
}

#[when(expr = "'{word}' cancels order '{word}'")]
async fn cancel(world: &mut ShopWorld, user: String, order_id: String) {
    match world.orders().cancel_order(&Actor::user(user), &OrderId::from(order_id)).await {
        Ok(view) => {
            world.last_order = Some(view);
            world.last_error = None;
        },
        Err(e) => world.last_error = Some(e),
    }
}

#[given(expr = "someone is listening for payment of '{word}'")]
async fn listen(world: &mut ShopWorld, order_id: String) {
    let id = OrderId::from(order_id);
    let receiver = world.system().rooms.join(&id);
    world.listeners.insert(id, receiver);
}

#[when(expr = "the provider reports a transfer of {int} with content {string}")]
async fn webhook(world: &mut ShopWorld, amount: i64, content: String) {
    let notice = TransferNotice { reference: None, content: Some(content), description: None, amount: Vnd::from(amount) };
    match world.payments().process_webhook(notice).await {
        Ok(_) => world.last_error = None,
        Err(e) => world.last_error = Some(e),
    }
}

#[when(expr = "'{word}' checks the payment status of '{word}'")]
async fn poll(world: &mut ShopWorld, _user: String, order_id: String) {
    let status = world.payments().check_payment_status(&OrderId::from(order_id)).await.expect("Error polling status");
    world.last_status = Some(status);
}

#[when(expr = "the bank receives {int} for the order")]
async fn bank_receives(world: &mut ShopWorld, amount: i64) {
    world.system().provider.set_transfer(amount);
}

#[when(expr = "I pause for {int}ms")]
async fn pause(_world: &mut ShopWorld, ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[then(expr = "the order has a discount of {int} and a total of {int}")]
async fn check_totals(world: &mut ShopWorld, discount: i64, total: i64) {
    let order = world.last_order.as_ref().unwrap_or_else(|| panic!("No order was placed: {:?}", world.last_error));
    assert_eq!(order.discount_amount, Vnd::from(discount), "Discount is incorrect");
    assert_eq!(order.total_price, Vnd::from(total), "Total is incorrect");
}

fn check_rejection(world: &ShopWorld, expected: &str) {
    let err = world.last_error.as_ref().expect("The request succeeded");
    assert_eq!(error_name(err), expected, "Unexpected error: {err}");
}

#[then(expr = "the order is rejected with '{word}'")]
async fn order_rejected(world: &mut ShopWorld, expected: String) {
    check_rejection(world, &expected);
}

#[then(expr = "the webhook is rejected with '{word}'")]
async fn webhook_rejected(world: &mut ShopWorld, expected: String) {
    check_rejection(world, &expected);
}

#[then(expr = "the cancellation is rejected with '{word}'")]
async fn cancellation_rejected(world: &mut ShopWorld, expected: String) {
    check_rejection(world, &expected);
}

#[then(expr = "the claim of '{word}' on '{word}' has been used {int} time(s)")]
async fn check_claim(world: &mut ShopWorld, user: String, code: String, uses: i64) {
    let voucher = world.db().fetch_voucher_by_code(&code).await.unwrap().expect("No voucher");
    let claim = world.db().fetch_claim(&user, voucher.id).await.unwrap().expect("No claim");
    assert_eq!(claim.effective_usage(), uses);
    assert_eq!(claim.used_at.is_some(), uses > 0);
}

#[then(expr = "voucher '{word}' has been used {int} time(s)")]
async fn check_voucher_usage(world: &mut ShopWorld, code: String, uses: i64) {
    let voucher = world.db().fetch_voucher_by_code(&code).await.unwrap().expect("No voucher");
    assert_eq!(voucher.used_count, uses);
}

#[then(expr = "product '{word}' has sold {int}")]
async fn check_sold(world: &mut ShopWorld, code: String, sold: i64) {
    let product = world.db().fetch_product_by_code(&code).await.unwrap().expect("No product");
    assert_eq!(product.sold, sold);
}

#[then(expr = "variant {word} {word} of '{word}' has {int} left")]
async fn check_variant(world: &mut ShopWorld, color: String, size: String, code: String, quantity: i64) {
    let product = world.db().fetch_product_by_code(&code).await.unwrap().expect("No product");
    let variant = world.db().fetch_variant(product.id, &color, &size).await.unwrap().expect("No variant");
    assert_eq!(variant.quantity, quantity);
}

#[then(expr = "'{word}' has {int} order(s)")]
async fn check_order_count(world: &mut ShopWorld, user: String, count: usize) {
    let orders = world.db().search_orders(OrderQueryFilter::default().with_user_id(user)).await.unwrap();
    assert_eq!(orders.len(), count);
}

#[then(expr = "the status of order '{word}' is '{word}'")]
async fn check_status(world: &mut ShopWorld, order_id: String, expected: String) {
    let order = world.db().fetch_order(&OrderId::from(order_id)).await.unwrap().expect("No order");
    assert_eq!(order.status, status(&expected));
}

#[then(expr = "the listener for '{word}' is notified")]
async fn check_notified(world: &mut ShopWorld, order_id: String) {
    let id = OrderId::from(order_id);
    let receiver = world.listeners.get_mut(&id).expect("Nobody is listening");
    let notice = tokio::time::timeout(Duration::from_secs(2), receiver.recv())
        .await
        .expect("No notification within 2s")
        .expect("The room closed without a notice");
    assert_eq!(notice.order_id, id);
}

#[then(expr = "the provider was asked {int} time(s)")]
async fn check_provider_calls(world: &mut ShopWorld, calls: usize) {
    assert_eq!(world.system().provider.calls(), calls);
}

#[then(expr = "the last payment status is '{word}'")]
async fn check_last_status(world: &mut ShopWorld, expected: String) {
    let last = world.last_status.as_ref().expect("No status was polled");
    assert_eq!(last.status, status(&expected));
}
