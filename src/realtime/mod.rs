//! # Realtime Module
//!
//! Lightweight publish/subscribe fan-out keyed by survey id. Observers join
//! a survey's channel over WebSocket and receive a "new response" event for
//! every successful submission. Delivery is best-effort and at-most-once:
//! no persistence, no replay, no acknowledgment.

pub mod channels;
pub mod handlers;
pub mod models;
pub mod routes;

#[cfg(test)]
mod tests;

pub use channels::ChannelRegistry;
pub use models::ServerEvent;
pub use routes::realtime_routes;
