//! Explicit event queue.
//!
//! The queue and its single-consumer drain loop are explicit so the routing
//! discipline (arrival order, one event processed to completion at a time)
//! is testable in isolation from any host runtime or bus thread.

use crate::domain::{ActiveOrder, Bar, Tick, Trade};
use std::collections::VecDeque;

/// Everything the engine reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Tick(Tick),
    Bar(Bar),
    Order(ActiveOrder),
    Trade(Trade),
}

impl Event {
    /// Instrument symbol this event concerns.
    pub fn symbol(&self) -> &str {
        match self {
            Event::Tick(t) => &t.symbol,
            Event::Bar(b) => &b.symbol,
            Event::Order(o) => &o.symbol,
            Event::Trade(t) => &t.symbol,
        }
    }
}

/// FIFO queue between event producers (host bus, gateway adapters, replay)
/// and the engine's single consumer.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<Event>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: Event) {
        self.events.push_back(event);
    }

    pub fn pop(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
