//! Transport link for echofield
//!
//! The node store is fed by an upstream that can drop and come back at any
//! time. This crate keeps that link alive: a [`LinkSupervisor`] walks the
//! Disconnected / Connecting / Connected state machine with a fixed backoff,
//! and a [`Connector`] does the actual dialing. The spatial mixer never sees
//! any of this; it only gets whole node lists when they arrive.

mod connector;
pub mod events;
mod supervisor;

pub use connector::{Connector, TcpConnector};
pub use events::LinkEvent;
pub use supervisor::{ConnectionState, LinkSupervisor, ReconnectPolicy};
