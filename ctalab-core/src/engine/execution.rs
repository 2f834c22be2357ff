//! The execution collaborator boundary.
//!
//! Order submission is fire-and-forget from the engine's perspective:
//! `submit` returns an id immediately and results arrive later as
//! order-status and trade events. A live gateway adapter delivers those
//! through its own queue (`poll`); the backtest matcher additionally
//! consumes market events (`on_event`) to decide fills.

use crate::domain::{ActiveOrder, OrderId, OrderRequest, Trade};
use crate::error::ExecError;
use crate::event::Event;
use chrono::{DateTime, Utc};

/// An asynchronous result delivered back by the collaborator.
#[derive(Debug, Clone)]
pub enum ExecutionUpdate {
    Order(ActiveOrder),
    Trade(Trade),
}

/// Live gateway or backtest matcher.
pub trait ExecutionClient: Send {
    /// Submit an order. `datetime` is the engine's current event time,
    /// used to stamp the order deterministically in replay.
    fn submit(
        &mut self,
        request: &OrderRequest,
        datetime: DateTime<Utc>,
    ) -> Result<OrderId, ExecError>;

    /// Request cancellation of an outstanding order.
    fn cancel(&mut self, id: OrderId) -> Result<(), ExecError>;

    /// Observe a market event before strategy dispatch. Live gateways
    /// ignore this; the backtest matcher matches pending orders here.
    fn on_event(&mut self, _event: &Event) {}

    /// Drain order/trade updates produced since the last poll.
    fn poll(&mut self) -> Vec<ExecutionUpdate> {
        Vec::new()
    }
}

/// Records submissions and cancels without ever filling anything.
/// Stands in for a gateway in engine tests.
#[derive(Debug, Default)]
pub struct RecordingClient {
    next_id: u64,
    pub submitted: Vec<(OrderId, OrderRequest)>,
    pub cancelled: Vec<OrderId>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ExecutionClient for RecordingClient {
    fn submit(
        &mut self,
        request: &OrderRequest,
        _datetime: DateTime<Utc>,
    ) -> Result<OrderId, ExecError> {
        self.next_id += 1;
        let id = OrderId(self.next_id);
        self.submitted.push((id, request.clone()));
        Ok(id)
    }

    fn cancel(&mut self, id: OrderId) -> Result<(), ExecError> {
        self.cancelled.push(id);
        Ok(())
    }
}
