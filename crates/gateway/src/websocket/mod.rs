//! Push channel: connection handling, wire events, and the fan-out hub

pub mod connection;
pub mod events;
pub mod hub;

pub use connection::websocket_handler;
pub use events::{ClientEvent, ServerEvent};
pub use hub::{ConnectionId, RoomHub};
