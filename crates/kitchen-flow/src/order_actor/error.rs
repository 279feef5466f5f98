//! Error types for the Order actor.

use crate::model::OrderId;
use entity_actor::FrameworkError;
use thiserror::Error;

/// Errors that can occur during order operations.
///
/// Expected double-clicks and stale UI events never reach this type: they are absorbed
/// as no-ops. Everything here is a real rejection and carries enough context (order id,
/// attempted transition, current state) to diagnose it from a log line.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderError {
    /// A required field is missing or invalid.
    #[error("Order validation error: {0}")]
    Validation(String),

    /// The requested state edge is not permitted.
    #[error("Order {order_id}: illegal transition {attempted} from {current}: {reason}")]
    IllegalTransition {
        order_id: OrderId,
        attempted: String,
        current: String,
        reason: String,
    },

    /// The requested order does not exist (or was deleted).
    #[error("Order not found: {0}")]
    NotFound(OrderId),

    /// A concurrent transition on the same order won the race.
    #[error("Order {order_id}: concurrent modification (expected version {expected}, found {found})")]
    Conflict {
        order_id: OrderId,
        expected: u64,
        found: u64,
    },

    /// An error occurred while communicating with the order's actor.
    #[error("Actor communication error: {0}")]
    Framework(#[from] FrameworkError),
}

impl OrderError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Attaches the order id to framework failures.
    ///
    /// A closed mailbox for a known id means the order was deleted underneath the caller.
    pub fn for_order(self, order_id: OrderId) -> Self {
        match self {
            Self::Framework(FrameworkError::ActorClosed | FrameworkError::ActorDropped) => {
                Self::NotFound(order_id)
            }
            Self::Framework(FrameworkError::Conflict { expected, found }) => Self::Conflict {
                order_id,
                expected,
                found,
            },
            other => other,
        }
    }

    /// Stable kind name, used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "ValidationError",
            Self::IllegalTransition { .. } => "IllegalTransitionError",
            Self::NotFound(_) => "NotFoundError",
            Self::Conflict { .. } => "ConflictError",
            Self::Framework(_) => "UnavailableError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_actor_maps_to_not_found() {
        let err = OrderError::from(FrameworkError::ActorClosed).for_order(OrderId(3));
        assert_eq!(err, OrderError::NotFound(OrderId(3)));
    }

    #[test]
    fn test_version_conflict_carries_order_id() {
        let err = OrderError::from(FrameworkError::Conflict {
            expected: 2,
            found: 4,
        })
        .for_order(OrderId(9));
        assert_eq!(
            err,
            OrderError::Conflict {
                order_id: OrderId(9),
                expected: 2,
                found: 4
            }
        );
        assert_eq!(err.kind(), "ConflictError");
    }

    #[test]
    fn test_domain_errors_pass_through() {
        let err = OrderError::validation("empty").for_order(OrderId(1));
        assert_eq!(err, OrderError::Validation("empty".into()));
    }
}
