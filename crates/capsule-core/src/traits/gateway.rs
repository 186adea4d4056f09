//! Control over the chat gateway process.

use std::future::Future;

use crate::errors::GatewayError;

/// Asks the gateway to reload after the generated config artifact changed.
pub trait GatewayControl: Send + Sync {
    fn request_restart(&self) -> impl Future<Output = Result<(), GatewayError>> + Send;
}
