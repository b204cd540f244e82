//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Any long, non-cpu-bound operation (database queries, calls to the
//! payment provider) is expressed as a future so that the worker can handle other requests in the meantime.
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use order_engine::{
    db_types::{NewVoucher, OrderId, OrderStatusType, Role, VoucherUpdate},
    events::{OrderPaidNotice, OrderRooms},
    order_objects::{NewOrderRequest, OrderQueryFilter, StatusUpdateRequest},
    traits::{OrderStore, PaymentProvider, ShopDatabase, VoucherStore},
    OrderFlowApi,
    OrderFlowError,
    PaymentApi,
    VoucherApi,
};
use sepay_tools::SepayWebhook;

use crate::{
    auth::JwtClaims,
    config::ServerOptions,
    data_objects::{
        ClaimVoucherRequest,
        EvaluateVoucherRequest,
        JsonResponse,
        MessageResponse,
        OrderCreatedResponse,
        OrderSearchParams,
        PaymentInstructions,
        PaymentStatusRequest,
    },
    errors::ServerError,
    helpers::get_remote_ip,
    integrations::sepay::transfer_notice,
    notifications::{already_paid_stream, paid_event_stream},
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires [$($roles:ty),*])  => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds)++ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Payments  ----------------------------------------------------
route!(check_payment_status => Post "/payments/check-status" impl OrderStore, PaymentProvider);
/// Route handler for the payment-status poll.
///
/// The storefront polls this while the customer is looking at the QR code. Unpaid orders consult the payment provider,
/// at most once per cooldown period per order; every other order is answered from the database.
pub async fn check_payment_status<B, P>(
    body: web::Json<PaymentStatusRequest>,
    api: web::Data<PaymentApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderStore,
    P: PaymentProvider,
{
    let order_id = body.into_inner().order_id;
    debug!("💻️ POST check-status for {order_id}");
    let status = api.check_payment_status(&order_id).await?;
    Ok(HttpResponse::Ok().json(status))
}

// Registered inside the `/payments/webhook` scope, which carries the API key middleware.
route!(sepay_webhook => Post "" impl OrderStore, PaymentProvider);
/// Route handler for SePay's transfer notifications.
///
/// The order reference is read from the transfer memo. A positive incoming amount marks the order paid, and repeated
/// deliveries for a paid order are acknowledged without any further effect.
pub async fn sepay_webhook<B, P>(
    req: HttpRequest,
    body: web::Json<SepayWebhook>,
    api: web::Data<PaymentApi<B, P>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderStore,
    P: PaymentProvider,
{
    let payload = body.into_inner();
    let peer = get_remote_ip(&req, options.use_x_forwarded_for).map(|ip| ip.to_string()).unwrap_or_default();
    info!("💻️ SePay webhook #{:?} received from {peer}", payload.id);
    trace!("💻️ Webhook payload: {payload:?}");
    let outcome = api.process_webhook(transfer_notice(&payload)).await?;
    Ok(HttpResponse::Ok().json(MessageResponse { message: outcome.message() }))
}

route!(payment_qr => Get "/payments/qr/{order_id}" impl ShopDatabase);
/// The bank-transfer details and VietQR image URL for an order that is still waiting for its transfer.
pub async fn payment_qr<B: ShopDatabase>(
    path: web::Path<OrderId>,
    api: web::Data<OrderFlowApi<B>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ GET payment QR for {order_id}");
    let order = api.fetch_order_record(&order_id).await?;
    let instructions = PaymentInstructions::for_order(&order, &options).ok_or_else(|| {
        OrderFlowError::InvalidRequest(format!(
            "Order {order_id} is a {} order with status {}. No bank transfer is expected.",
            order.payment_method, order.status
        ))
    })?;
    Ok(HttpResponse::Ok().json(instructions))
}

route!(payment_events => Get "/payments/events/{order_id}" impl ShopDatabase);
/// Subscribes to the order's room as a Server-Sent Events stream. A single `order_paid` event is sent when the order
/// is paid, after which the stream closes.
pub async fn payment_events<B: ShopDatabase>(
    path: web::Path<OrderId>,
    api: web::Data<OrderFlowApi<B>>,
    rooms: web::Data<OrderRooms>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ GET payment events for {order_id}");
    // Join before reading the status, so that a payment landing in between is still delivered
    let receiver = rooms.join(&order_id);
    let order = api.fetch_order_record(&order_id).await?;
    let mut response = HttpResponse::Ok();
    response.content_type("text/event-stream").insert_header(("Cache-Control", "no-cache"));
    match order.status {
        s if s.is_awaiting_funds() => Ok(response.streaming(paid_event_stream(receiver))),
        OrderStatusType::Paid => {
            let notice = OrderPaidNotice { order_id: order.order_id };
            Ok(response.streaming(already_paid_stream(notice)))
        },
        status => Err(OrderFlowError::InvalidRequest(format!(
            "Order {order_id} is {status}. No payment notification will be sent."
        ))
        .into()),
    }
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(create_order => Post "/orders" impl ShopDatabase);
/// Places an order for the authenticated user.
///
/// Returns `201 Created` with the order and, for SePay orders, the payment instructions. A request that repeats the
/// reference of an order the user already placed returns that order with `200 OK` instead.
pub async fn create_order<B: ShopDatabase>(
    claims: JwtClaims,
    body: web::Json<NewOrderRequest>,
    api: web::Data<OrderFlowApi<B>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST new order for {}", claims.sub);
    let placement = api.create_order(&claims.actor(), body.into_inner()).await?;
    let payment = PaymentInstructions::for_view(&placement.order, &options);
    let mut response = if placement.created { HttpResponse::Created() } else { HttpResponse::Ok() };
    Ok(response.json(OrderCreatedResponse { placement, payment }))
}

route!(search_orders => Get "/orders" impl ShopDatabase);
/// Users see their own orders. Admins may search every order, optionally narrowed with `userId`.
pub async fn search_orders<B: ShopDatabase>(
    claims: JwtClaims,
    query: web::Query<OrderSearchParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let query = OrderQueryFilter::try_from(query.into_inner())?;
    debug!("💻️ GET orders search for {} [{query}]", claims.sub);
    let orders = api.search_orders(&claims.actor(), query).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(fetch_order => Get "/orders/{order_id}" impl ShopDatabase);
pub async fn fetch_order<B: ShopDatabase>(
    claims: JwtClaims,
    path: web::Path<OrderId>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ GET order {order_id} for {}", claims.sub);
    let order = api.fetch_order(&claims.actor(), &order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(cancel_order => Put "/orders/{order_id}/cancel" impl ShopDatabase);
/// Cancels a `pending` or `paid` order. Orders in any other state answer with
/// `{"success": false, "message": ...}` and status 400.
pub async fn cancel_order<B: ShopDatabase>(
    claims: JwtClaims,
    path: web::Path<OrderId>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ PUT cancel order {order_id} for {}", claims.sub);
    match api.cancel_order(&claims.actor(), &order_id).await {
        Ok(order) => Ok(HttpResponse::Ok().json(order)),
        Err(e @ OrderFlowError::IllegalCancellation { .. }) => {
            info!("💻️ Refused to cancel order {order_id}. {e}");
            Ok(HttpResponse::BadRequest().json(JsonResponse::failure(e)))
        },
        Err(e) => Err(e.into()),
    }
}

route!(mark_delivered => Put "/orders/{order_id}/deliver" impl ShopDatabase);
/// The customer confirms that a shipped order has arrived.
pub async fn mark_delivered<B: ShopDatabase>(
    claims: JwtClaims,
    path: web::Path<OrderId>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ PUT deliver order {order_id} for {}", claims.sub);
    let order = api.mark_delivered(&claims.actor(), &order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(update_order_status => Put "/orders/{order_id}/status" impl ShopDatabase where requires [Role::Admin]);
/// Staff transitions, including the manual "paid" override for transfers that could not be matched automatically.
pub async fn update_order_status<B: ShopDatabase>(
    claims: JwtClaims,
    path: web::Path<OrderId>,
    body: web::Json<StatusUpdateRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    let status = body.into_inner().status;
    info!("💻️ PUT status of order {order_id} to {status} by {}", claims.sub);
    let order = api.update_status(&claims.actor(), &order_id, status).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(delete_order => Delete "/orders/{order_id}" impl ShopDatabase where requires [Role::Admin]);
pub async fn delete_order<B: ShopDatabase>(
    claims: JwtClaims,
    path: web::Path<OrderId>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    info!("💻️ DELETE order {order_id} by {}", claims.sub);
    api.delete_order(&claims.actor(), &order_id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Order {order_id} deleted"))))
}

//----------------------------------------------   Vouchers  ----------------------------------------------------
route!(public_vouchers => Get "/vouchers/public" impl VoucherStore);
/// Active vouchers whose validity window contains the current time. No authentication is needed.
pub async fn public_vouchers<B: VoucherStore>(api: web::Data<VoucherApi<B>>) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET public vouchers");
    let vouchers = api.public_vouchers().await?;
    Ok(HttpResponse::Ok().json(vouchers))
}

route!(claim_voucher => Post "/vouchers/claim" impl VoucherStore);
pub async fn claim_voucher<B: VoucherStore>(
    claims: JwtClaims,
    body: web::Json<ClaimVoucherRequest>,
    api: web::Data<VoucherApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let code = body.into_inner().code;
    debug!("💻️ POST claim voucher {code} for {}", claims.sub);
    let claimed = api.claim_voucher(&claims.sub, &code).await?;
    Ok(HttpResponse::Ok().json(claimed))
}

route!(my_vouchers => Get "/vouchers/my" impl VoucherStore);
pub async fn my_vouchers<B: VoucherStore>(
    claims: JwtClaims,
    api: web::Data<VoucherApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET my vouchers for {}", claims.sub);
    let vouchers = api.my_vouchers(&claims.sub).await?;
    Ok(HttpResponse::Ok().json(vouchers))
}

route!(evaluate_voucher => Post "/vouchers/evaluate" impl VoucherStore);
/// Checkout preview. Runs every voucher check against the given subtotal without consuming anything.
pub async fn evaluate_voucher<B: VoucherStore>(
    claims: JwtClaims,
    body: web::Json<EvaluateVoucherRequest>,
    api: web::Data<VoucherApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let EvaluateVoucherRequest { code, subtotal } = body.into_inner();
    debug!("💻️ POST evaluate voucher {code} on {subtotal} for {}", claims.sub);
    let quote = api.evaluate(&claims.sub, &code, subtotal).await?;
    Ok(HttpResponse::Ok().json(quote))
}

route!(list_vouchers => Get "/vouchers" impl VoucherStore where requires [Role::Admin]);
pub async fn list_vouchers<B: VoucherStore>(api: web::Data<VoucherApi<B>>) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET all vouchers");
    let vouchers = api.list_vouchers().await?;
    Ok(HttpResponse::Ok().json(vouchers))
}

route!(create_voucher => Post "/vouchers" impl VoucherStore where requires [Role::Admin]);
pub async fn create_voucher<B: VoucherStore>(
    claims: JwtClaims,
    body: web::Json<NewVoucher>,
    api: web::Data<VoucherApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let mut voucher = body.into_inner();
    voucher.created_by = Some(claims.sub.clone());
    info!("💻️ POST new voucher {} by {}", voucher.code, claims.sub);
    let voucher = api.create_voucher(voucher).await?;
    Ok(HttpResponse::Created().json(voucher))
}

// Voucher ids are numeric, which keeps `/vouchers/my` and `/vouchers/public` out of these routes
route!(fetch_voucher => Get "/vouchers/{id:\\d+}" impl VoucherStore where requires [Role::Admin]);
pub async fn fetch_voucher<B: VoucherStore>(
    path: web::Path<i64>,
    api: web::Data<VoucherApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ GET voucher #{id}");
    let voucher = api.fetch_voucher(id).await?;
    Ok(HttpResponse::Ok().json(voucher))
}

route!(update_voucher => Put "/vouchers/{id:\\d+}" impl VoucherStore where requires [Role::Admin]);
pub async fn update_voucher<B: VoucherStore>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<VoucherUpdate>,
    api: web::Data<VoucherApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    info!("💻️ PUT voucher #{id} by {}", claims.sub);
    let voucher = api.update_voucher(id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(voucher))
}

route!(delete_voucher => Delete "/vouchers/{id:\\d+}" impl VoucherStore where requires [Role::Admin]);
pub async fn delete_voucher<B: VoucherStore>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<VoucherApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    info!("💻️ DELETE voucher #{id} by {}", claims.sub);
    api.delete_voucher(id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Voucher #{id} deleted"))))
}
