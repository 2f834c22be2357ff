//! Domain types: ticks, bars, orders, stop orders, trades, positions, ids.

mod ids;
mod market;
mod order;
mod position;
mod stop_order;
mod trade;

pub use ids::{OrderId, OrderRef, StopOrderId, TradeId};
pub use market::{Bar, Interval, Tick};
pub use order::{ActiveOrder, Direction, Offset, OrderRequest, OrderStatus, PriceType};
pub use position::Position;
pub use stop_order::{StopOrder, StopOrderStatus};
pub use trade::Trade;
