mod acl;
mod jwt;
mod webhook_key;

pub use acl::{AclMiddlewareFactory, AclMiddlewareService};
pub use jwt::{bearer_token, JwtMiddlewareFactory, JwtMiddlewareService};
pub use webhook_key::{api_key_matches, WebhookKeyMiddlewareFactory, WebhookKeyMiddlewareService};
