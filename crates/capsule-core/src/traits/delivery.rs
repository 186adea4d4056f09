//! Outbound delivery to the chat platform.

use std::future::Future;

use crate::errors::DeliveryError;
use crate::models::OutboundMessage;

/// Transmits one message into one topic.
///
/// Implementations own the platform wire format. Rejections are returned as
/// `Err` and never panic; the batch orchestrator records them per tenant.
pub trait DeliveryChannel: Send + Sync {
    fn deliver(
        &self,
        group_id: &str,
        thread_id: &str,
        message: &OutboundMessage,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}
