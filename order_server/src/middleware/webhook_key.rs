//! API-key middleware for provider webhooks.
//!
//! SePay can be configured to send an `Authorization: Apikey <key>` header with every webhook delivery. Wrap the
//! webhook route with this middleware to reject deliveries that do not carry the configured key. When no key is
//! configured, every delivery is let through.
use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error,
};
use futures::future::LocalBoxFuture;
use log::{trace, warn};
use shop_common::Secret;

use crate::errors::{AuthError, ServerError};

pub struct WebhookKeyMiddlewareFactory {
    key: Option<Secret<String>>,
}

impl WebhookKeyMiddlewareFactory {
    pub fn new(key: Option<Secret<String>>) -> Self {
        WebhookKeyMiddlewareFactory { key }
    }
}

impl<S, B> Transform<S, ServiceRequest> for WebhookKeyMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = WebhookKeyMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(WebhookKeyMiddlewareService { key: self.key.clone(), service: Rc::new(service) }))
    }
}

pub struct WebhookKeyMiddlewareService<S> {
    key: Option<Secret<String>>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for WebhookKeyMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let allowed = match &self.key {
            None => {
                trace!("🔐️ Webhook API key checks are disabled. Allowing request.");
                true
            },
            Some(key) => {
                let header = req.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok()).unwrap_or_default();
                api_key_matches(header, key.reveal())
            },
        };
        Box::pin(async move {
            if allowed {
                service.call(req).await
            } else {
                warn!("🔐️ Webhook delivery without a valid API key. Denying access.");
                Err(ServerError::AuthenticationError(AuthError::InvalidApiKey).into())
            }
        })
    }
}

/// Checks an `Authorization: Apikey <key>` header value against the expected key.
pub fn api_key_matches(header: &str, expected: &str) -> bool {
    match header.trim().split_once(' ') {
        Some((scheme, key)) => scheme.eq_ignore_ascii_case("apikey") && key.trim() == expected,
        None => false,
    }
}
