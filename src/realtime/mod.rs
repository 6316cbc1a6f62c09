//! Chat and presence channel over a websocket.
//!
//! [`ReconnectMachine`] holds the connection lifecycle; the native thread and
//! the browser driver feed it socket events and report [`RealtimeEvent`]s.

mod connection;
mod message;
#[cfg(not(target_arch = "wasm32"))]
mod native;
#[cfg(target_arch = "wasm32")]
mod web;

pub use connection::{ChannelStatus, ConnectionState, ReconnectMachine, TimerSlot};
pub use message::{ChatMessage, Inbound, Leaderboard, LeaderboardEntry, Outbound, ws_url};
#[cfg(not(target_arch = "wasm32"))]
pub use native::RealtimeClient;
#[cfg(target_arch = "wasm32")]
pub use web::WebRealtime;

/// Something the realtime driver observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RealtimeEvent {
    /// The channel moved to a new status
    Status(ChannelStatus),
    /// A message arrived
    Message(Inbound),
    /// The connection failed or dropped; a retry is scheduled
    Error(String),
}
