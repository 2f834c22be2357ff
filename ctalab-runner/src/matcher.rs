//! Synthetic matching engine for historical replay.
//!
//! `SimMatcher` stands in for a live gateway behind
//! [`ExecutionClient`]: submitted orders queue as pending and are matched
//! against each market event before strategies see it, so a market order
//! fills at the next available price after submission. Matching walks
//! pending orders in submission order and ids are assigned monotonically,
//! which keeps replay byte-for-byte deterministic.

use ctalab_core::domain::{
    ActiveOrder, Bar, Direction, OrderId, OrderRequest, OrderStatus, PriceType, Tick, Trade,
    TradeId,
};
use ctalab_core::engine::{ExecutionClient, ExecutionUpdate};
use ctalab_core::error::ExecError;
use ctalab_core::event::Event;
use chrono::{DateTime, Utc};

pub struct SimMatcher {
    next_order: u64,
    next_trade: u64,
    /// Points of adverse price movement applied to market fills.
    slippage: f64,
    pending: Vec<ActiveOrder>,
    updates: Vec<ExecutionUpdate>,
}

impl SimMatcher {
    pub fn new(slippage: f64) -> Self {
        Self {
            next_order: 0,
            next_trade: 0,
            slippage,
            pending: Vec::new(),
            updates: Vec::new(),
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Match pending orders against a completed bar's range.
    fn match_bar(&mut self, bar: &Bar) {
        let orders = std::mem::take(&mut self.pending);
        for order in orders {
            let fill = match order.price {
                PriceType::Market => Some(self.slip(bar.open, order.direction)),
                PriceType::Limit(limit) => match order.direction {
                    Direction::Long if bar.low <= limit => Some(bar.open.min(limit)),
                    Direction::Short if bar.high >= limit => Some(bar.open.max(limit)),
                    _ => None,
                },
            };
            match fill {
                Some(price) => self.fill(order, price, bar.datetime),
                None => self.pending.push(order),
            }
        }
    }

    /// Match pending orders against a tick's traded price.
    fn match_tick(&mut self, tick: &Tick) {
        let orders = std::mem::take(&mut self.pending);
        for order in orders {
            let fill = match order.price {
                PriceType::Market => Some(self.slip(tick.last_price, order.direction)),
                PriceType::Limit(limit) => match order.direction {
                    Direction::Long if tick.last_price <= limit => Some(tick.last_price),
                    Direction::Short if tick.last_price >= limit => Some(tick.last_price),
                    _ => None,
                },
            };
            match fill {
                Some(price) => self.fill(order, price, tick.datetime),
                None => self.pending.push(order),
            }
        }
    }

    fn slip(&self, price: f64, direction: Direction) -> f64 {
        match direction {
            Direction::Long => price + self.slippage,
            Direction::Short => price - self.slippage,
        }
    }

    fn fill(&mut self, mut order: ActiveOrder, price: f64, datetime: DateTime<Utc>) {
        self.next_trade += 1;
        order.traded = order.volume;
        order.status = OrderStatus::AllTraded;
        self.updates.push(ExecutionUpdate::Order(order.clone()));
        self.updates.push(ExecutionUpdate::Trade(Trade {
            id: TradeId(self.next_trade),
            order_id: order.id,
            symbol: order.symbol,
            direction: order.direction,
            offset: order.offset,
            price,
            volume: order.volume,
            datetime,
        }));
    }
}

impl ExecutionClient for SimMatcher {
    fn submit(
        &mut self,
        request: &OrderRequest,
        datetime: DateTime<Utc>,
    ) -> Result<OrderId, ExecError> {
        self.next_order += 1;
        let id = OrderId(self.next_order);
        let order = ActiveOrder {
            id,
            symbol: request.symbol.clone(),
            direction: request.direction,
            offset: request.offset,
            price: request.price,
            volume: request.volume,
            traded: 0.0,
            status: OrderStatus::NotTraded,
            datetime,
        };
        self.updates.push(ExecutionUpdate::Order(order.clone()));
        self.pending.push(order);
        Ok(id)
    }

    fn cancel(&mut self, id: OrderId) -> Result<(), ExecError> {
        let idx = self
            .pending
            .iter()
            .position(|o| o.id == id)
            .ok_or(ExecError::OrderNotFound(id))?;
        let mut order = self.pending.remove(idx);
        order.status = OrderStatus::Cancelled;
        self.updates.push(ExecutionUpdate::Order(order));
        Ok(())
    }

    fn on_event(&mut self, event: &Event) {
        match event {
            Event::Tick(tick) => self.match_tick(tick),
            Event::Bar(bar) => self.match_bar(bar),
            _ => {}
        }
    }

    fn poll(&mut self) -> Vec<ExecutionUpdate> {
        std::mem::take(&mut self.updates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctalab_core::domain::{Interval, Offset};
    use chrono::TimeZone;

    fn dt(min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 9, 30 + min, 0).unwrap()
    }

    fn bar(min: u32, open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            symbol: "rb2410".into(),
            interval: Interval::Minute(1),
            datetime: dt(min),
            open,
            high,
            low,
            close,
            volume: 100.0,
            open_interest: 0.0,
        }
    }

    fn request(direction: Direction, price: PriceType) -> OrderRequest {
        OrderRequest {
            symbol: "rb2410".into(),
            direction,
            offset: Offset::Open,
            price,
            volume: 1.0,
        }
    }

    fn trades(updates: Vec<ExecutionUpdate>) -> Vec<Trade> {
        updates
            .into_iter()
            .filter_map(|u| match u {
                ExecutionUpdate::Trade(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn market_order_fills_at_next_open_with_slippage() {
        let mut matcher = SimMatcher::new(0.5);
        matcher
            .submit(&request(Direction::Long, PriceType::Market), dt(0))
            .unwrap();
        matcher.poll();

        matcher.on_event(&Event::Bar(bar(1, 101.0, 102.0, 100.0, 101.5)));
        let fills = trades(matcher.poll());
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].price, 101.5); // 101 open + 0.5 adverse
    }

    #[test]
    fn limit_buy_fills_when_low_crosses() {
        let mut matcher = SimMatcher::new(0.0);
        matcher
            .submit(&request(Direction::Long, PriceType::Limit(100.0)), dt(0))
            .unwrap();
        matcher.poll();

        // Low stays above the limit: still pending.
        matcher.on_event(&Event::Bar(bar(1, 102.0, 103.0, 101.0, 102.0)));
        assert!(trades(matcher.poll()).is_empty());
        assert_eq!(matcher.pending_count(), 1);

        // Low touches 99.5: fill at min(open, limit).
        matcher.on_event(&Event::Bar(bar(2, 101.0, 101.5, 99.5, 100.0)));
        let fills = trades(matcher.poll());
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].price, 100.0);
    }

    #[test]
    fn limit_sell_gets_price_improvement_from_gap_up() {
        let mut matcher = SimMatcher::new(0.0);
        matcher
            .submit(&request(Direction::Short, PriceType::Limit(100.0)), dt(0))
            .unwrap();
        matcher.poll();

        // Opens above the limit: fill at the better open price.
        matcher.on_event(&Event::Bar(bar(1, 103.0, 104.0, 102.0, 103.0)));
        let fills = trades(matcher.poll());
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].price, 103.0);
    }

    #[test]
    fn cancel_emits_cancelled_status() {
        let mut matcher = SimMatcher::new(0.0);
        let id = matcher
            .submit(&request(Direction::Long, PriceType::Limit(90.0)), dt(0))
            .unwrap();
        matcher.poll();

        matcher.cancel(id).unwrap();
        let updates = matcher.poll();
        assert_eq!(updates.len(), 1);
        match &updates[0] {
            ExecutionUpdate::Order(order) => {
                assert_eq!(order.status, OrderStatus::Cancelled);
            }
            other => panic!("unexpected update: {other:?}"),
        }
        assert!(matcher.cancel(id).is_err());
    }

    #[test]
    fn submission_order_is_match_order() {
        let mut matcher = SimMatcher::new(0.0);
        matcher
            .submit(&request(Direction::Long, PriceType::Market), dt(0))
            .unwrap();
        matcher
            .submit(&request(Direction::Short, PriceType::Market), dt(0))
            .unwrap();
        matcher.poll();

        matcher.on_event(&Event::Bar(bar(1, 100.0, 101.0, 99.0, 100.0)));
        let fills = trades(matcher.poll());
        assert_eq!(fills.len(), 2);
        assert!(fills[0].order_id < fills[1].order_id);
        assert_eq!(fills[0].direction, Direction::Long);
    }
}
