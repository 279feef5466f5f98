//! The hand-off seam towards external ordering channels.

use crate::model::{Channel, Order};
use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

/// Pushes an order's current state to the channel it came from.
///
/// Implementations must not touch the order store. The tracker records the outcome.
#[async_trait]
pub trait SyncTransport: Send + Sync + 'static {
    async fn push(&self, order: &Order) -> Result<(), TransportError>;
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    #[error("{channel} rejected {order_number}: {reason}")]
    Rejected {
        channel: Channel,
        order_number: String,
        reason: String,
    },

    #[error("{0} is unreachable")]
    Unreachable(Channel),
}

/// Acknowledges every push and logs it. Used when no real channel adapter is wired.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTransport;

#[async_trait]
impl SyncTransport for LogTransport {
    async fn push(&self, order: &Order) -> Result<(), TransportError> {
        let external_id = order
            .integration
            .as_ref()
            .and_then(|i| i.external_order_id.as_deref())
            .unwrap_or("-");
        info!(
            order_id = %order.id,
            channel = %order.channel(),
            external_id,
            state = %order.state_label(),
            "Order pushed to channel"
        );
        Ok(())
    }
}
