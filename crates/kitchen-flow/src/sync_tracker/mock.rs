//! # Mock Transport
//!
//! `MockTransport` implements [`SyncTransport`] entirely in memory. Tests queue the
//! pushes they expect, in order, together with the answer each one should get:
//!
//! ```rust,ignore
//! let transport = MockTransport::new();
//! transport.expect_push(OrderId(1)).return_ok();
//! transport.expect_push(OrderId(2)).return_err(TransportError::Unreachable(Channel::Web));
//!
//! let tracker = IntegrationSyncTracker::new(store, Arc::new(transport.clone()));
//! tracker.sync_pending().await;
//!
//! transport.verify(); // every expectation consumed, nothing unexpected
//! ```
//!
//! An unexpected push answers `Unreachable` and is recorded; [`MockTransport::verify`]
//! reports it, even when the push happened inside a background worker.

use super::transport::{SyncTransport, TransportError};
use crate::model::{Order, OrderId};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

struct Expectation {
    order_id: OrderId,
    response: Result<(), TransportError>,
}

#[derive(Default)]
struct State {
    expectations: VecDeque<Expectation>,
    pushed: Vec<OrderId>,
    unexpected: Vec<OrderId>,
}

/// Expectation-queue test double for [`SyncTransport`]. Clones share their queue.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<State>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expects the next push to be for `order_id`.
    pub fn expect_push(&self, order_id: OrderId) -> PushExpectationBuilder {
        PushExpectationBuilder {
            order_id,
            state: self.state.clone(),
        }
    }

    /// Orders pushed so far, in call order.
    pub fn pushed(&self) -> Vec<OrderId> {
        self.state.lock().pushed.clone()
    }

    /// Panics unless every expectation was consumed and no unexpected push happened.
    pub fn verify(&self) {
        let state = self.state.lock();
        if !state.unexpected.is_empty() {
            panic!("Unexpected pushes: {:?}", state.unexpected);
        }
        if !state.expectations.is_empty() {
            panic!(
                "Not all expectations were met. {} remaining",
                state.expectations.len()
            );
        }
    }
}

#[async_trait]
impl SyncTransport for MockTransport {
    async fn push(&self, order: &Order) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.pushed.push(order.id);
        match state.expectations.front() {
            Some(expected) if expected.order_id == order.id => state
                .expectations
                .pop_front()
                .map_or(Ok(()), |expected| expected.response),
            _ => {
                state.unexpected.push(order.id);
                Err(TransportError::Unreachable(order.channel()))
            }
        }
    }
}

/// Builder for push expectations.
pub struct PushExpectationBuilder {
    order_id: OrderId,
    state: Arc<Mutex<State>>,
}

impl PushExpectationBuilder {
    /// The push succeeds.
    pub fn return_ok(self) {
        self.state.lock().expectations.push_back(Expectation {
            order_id: self.order_id,
            response: Ok(()),
        });
    }

    /// The push fails with `error`.
    pub fn return_err(self, error: TransportError) {
        self.state.lock().expectations.push_back(Expectation {
            order_id: self.order_id,
            response: Err(error),
        });
    }
}
