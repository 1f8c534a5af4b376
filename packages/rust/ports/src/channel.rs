//! The two ends of a host/worker port connection.
//!
//! Both directions are unbounded FIFO channels: sends never block and never
//! report back-pressure, and messages on one direction arrive in the order
//! they were sent.

use igniter_shared::{IgniterError, Result};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::protocol::{InboundEvent, OutboundCommand};

/// Create a connected pair of host and worker ends.
pub fn connect() -> (HostPorts, WorkerPorts) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    let host = HostPorts {
        outbound: OutboundPort { tx: cmd_tx },
        events: event_rx,
    };
    let worker = WorkerPorts {
        commands: cmd_rx,
        events: EventEmitter { tx: event_tx },
    };
    (host, worker)
}

// ---------------------------------------------------------------------------
// Host end
// ---------------------------------------------------------------------------

/// Host side: send commands, receive events.
#[derive(Debug)]
pub struct HostPorts {
    pub outbound: OutboundPort,
    pub events: mpsc::UnboundedReceiver<InboundEvent>,
}

/// Fire-and-forget sender for outbound commands. Cheap to clone.
#[derive(Debug, Clone)]
pub struct OutboundPort {
    tx: mpsc::UnboundedSender<OutboundCommand>,
}

impl OutboundPort {
    /// Enqueue a command for the worker. No acknowledgement is returned; if
    /// the worker has already gone away the command is dropped with a warning.
    pub fn send(&self, command: OutboundCommand) {
        match self.tx.send(command) {
            Ok(()) => debug!(port = %command, "command sent"),
            Err(_) => warn!(port = %command, "worker is gone, command dropped"),
        }
    }

    /// Whether the worker end has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

// ---------------------------------------------------------------------------
// Worker end
// ---------------------------------------------------------------------------

/// Worker side: receive commands, emit events. Dropping `events` ends the run.
#[derive(Debug)]
pub struct WorkerPorts {
    pub commands: mpsc::UnboundedReceiver<OutboundCommand>,
    pub events: EventEmitter,
}

/// Sender for inbound events. Cheap to clone.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    tx: mpsc::UnboundedSender<InboundEvent>,
}

impl EventEmitter {
    /// Emit one event. Fails only if the host has stopped listening.
    pub fn emit(&self, event: InboundEvent) -> Result<()> {
        let port = event.port();
        self.tx
            .send(event)
            .map_err(|_| IgniterError::protocol(format!("host stopped listening on {port}")))
    }

    pub fn write_file(&self, filename: impl Into<String>, contents: impl Into<String>) -> Result<()> {
        self.emit(InboundEvent::write_file(filename, contents))
    }

    pub fn model_dump(&self, snapshot: Value) -> Result<()> {
        self.emit(InboundEvent::SendModelDump(snapshot))
    }

    pub fn fault(&self, message: impl Into<String>) -> Result<()> {
        self.emit(InboundEvent::fault(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn commands_arrive_in_order() {
        let (host, mut worker) = connect();
        host.outbound.send(OutboundCommand::Ignite);
        host.outbound.send(OutboundCommand::RequestModelDump);
        host.outbound.send(OutboundCommand::Interrupt);

        assert_eq!(worker.commands.recv().await, Some(OutboundCommand::Ignite));
        assert_eq!(
            worker.commands.recv().await,
            Some(OutboundCommand::RequestModelDump)
        );
        assert_eq!(worker.commands.recv().await, Some(OutboundCommand::Interrupt));
    }

    #[tokio::test]
    async fn send_after_worker_drop_does_not_panic() {
        let (host, worker) = connect();
        drop(worker);
        assert!(host.outbound.is_closed());
        host.outbound.send(OutboundCommand::Interrupt);
    }

    #[tokio::test]
    async fn events_close_when_worker_drops_emitter() {
        let (mut host, worker) = connect();
        worker.events.write_file("a.txt", "1").unwrap();
        drop(worker);

        assert_eq!(
            host.events.recv().await,
            Some(InboundEvent::write_file("a.txt", "1"))
        );
        assert_eq!(host.events.recv().await, None);
    }

    #[tokio::test]
    async fn emit_after_host_drop_is_protocol_error() {
        let (host, worker) = connect();
        drop(host);
        let err = worker.events.fault("late").unwrap_err();
        assert!(matches!(err, IgniterError::Protocol(_)));
    }
}
