//! Local stop-order simulation.
//!
//! The exchange does not support stop orders natively, so each strategy
//! host keeps its own simulator: stop orders wait here invisibly to the
//! execution collaborator, and the first price event that crosses a trigger
//! converts the stop into exactly one real order request.

use crate::domain::{
    Bar, Direction, OrderRequest, StopOrder, StopOrderId, StopOrderStatus, Tick,
};
use chrono::{DateTime, Utc};
use tracing::debug;

/// A stop order whose trigger condition was just met, paired with the real
/// order synthesized from its template.
#[derive(Debug, Clone)]
pub struct TriggeredStop {
    pub stop: StopOrder,
    pub request: OrderRequest,
}

/// Per-strategy stop-order state machine: Waiting → Triggered | Cancelled.
#[derive(Debug, Default)]
pub struct StopOrderSimulator {
    next_id: u64,
    /// Waiting orders in insertion order; triggers evaluate in this order.
    orders: Vec<StopOrder>,
}

impl StopOrderSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new stop order in `Waiting` state.
    pub fn add(
        &mut self,
        symbol: &str,
        direction: Direction,
        offset: crate::domain::Offset,
        stop_price: f64,
        volume: f64,
        convert_price: crate::domain::PriceType,
        datetime: DateTime<Utc>,
    ) -> StopOrder {
        self.next_id += 1;
        let order = StopOrder {
            id: StopOrderId(self.next_id),
            symbol: symbol.to_string(),
            direction,
            offset,
            stop_price,
            volume,
            convert_price,
            status: StopOrderStatus::Waiting,
            datetime,
            converted_order: None,
        };
        self.orders.push(order.clone());
        order
    }

    /// Cancel a waiting stop order. Returns the cancelled order, or `None`
    /// if the id is unknown (already triggered or cancelled).
    pub fn cancel(&mut self, id: StopOrderId) -> Option<StopOrder> {
        let idx = self.orders.iter().position(|o| o.id == id)?;
        let mut order = self.orders.remove(idx);
        order.status = StopOrderStatus::Cancelled;
        Some(order)
    }

    /// Cancel every waiting stop order.
    pub fn cancel_all(&mut self) -> Vec<StopOrder> {
        let mut cancelled = std::mem::take(&mut self.orders);
        for order in &mut cancelled {
            order.status = StopOrderStatus::Cancelled;
        }
        cancelled
    }

    /// Evaluate triggers against a tick's traded price. One evaluation per
    /// incoming price event; a stop that fires is removed and returned.
    pub fn check_tick(&mut self, tick: &Tick) -> Vec<TriggeredStop> {
        self.take_triggered(|o| o.triggers_at(tick.last_price))
    }

    /// Evaluate triggers against a completed bar's range (bar-driven replay):
    /// a buy stop fires if the bar's high reached it, a sell stop if the low did.
    pub fn check_bar(&mut self, bar: &Bar) -> Vec<TriggeredStop> {
        self.take_triggered(|o| match o.direction {
            Direction::Long => bar.high >= o.stop_price,
            Direction::Short => bar.low <= o.stop_price,
        })
    }

    pub fn waiting(&self) -> &[StopOrder] {
        &self.orders
    }

    fn take_triggered(&mut self, hit: impl Fn(&StopOrder) -> bool) -> Vec<TriggeredStop> {
        let mut triggered = Vec::new();
        let mut remaining = Vec::with_capacity(self.orders.len());
        for mut order in self.orders.drain(..) {
            if hit(&order) {
                order.status = StopOrderStatus::Triggered;
                debug!(stop_order = %order.id, price = order.stop_price, "stop order triggered");
                let request = OrderRequest {
                    symbol: order.symbol.clone(),
                    direction: order.direction,
                    offset: order.offset,
                    price: order.convert_price,
                    volume: order.volume,
                };
                triggered.push(TriggeredStop {
                    stop: order,
                    request,
                });
            } else {
                remaining.push(order);
            }
        }
        self.orders = remaining;
        triggered
    }
}
