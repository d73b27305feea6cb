//! # WebSocket Sessions
//!
//! Everything a connection needs apart from the transport itself, which lives in
//! `websocket.rs`.
//!
//! ## Key Components:
//! - **Protocol**: Inbound frame classification and outbound message shapes
//! - **Registry**: The set of open sessions, owned by the server state
//! - **Handler**: Per-session frame dispatcher that turns one inbound frame into
//!   the ordered list of outbound messages for it
//!
//! ## Session Lifecycle:
//! 1. **Open**: Registered when the WebSocket upgrade is accepted
//! 2. **Serving**: Frames processed one at a time; per-frame failures are reported
//!    to the client and the session continues
//! 3. **Closed**: Deregistered on disconnect, protocol error or server shutdown

pub mod handler;    // Frame dispatch
pub mod protocol;   // Wire messages
pub mod registry;   // Open session bookkeeping

pub use handler::SessionHandler;
pub use protocol::{InboundFrame, OutboundMessage};
pub use registry::SessionRegistry;
