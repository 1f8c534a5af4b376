//! Typed host/worker port protocol.
//!
//! This crate provides:
//! - [`protocol`]: the closed set of outbound commands and inbound events
//! - [`channel`]: the connected host and worker ends of the ports
//! - [`mux`]: the single multiplexer that routes inbound events to handlers

pub mod channel;
pub mod mux;
pub mod protocol;

pub use channel::{EventEmitter, HostPorts, OutboundPort, WorkerPorts, connect};
pub use mux::{HandlerFuture, PortMux};
pub use protocol::{HostMessage, InboundEvent, InboundPort, OutboundCommand};
