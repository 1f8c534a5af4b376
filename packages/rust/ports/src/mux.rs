//! Typed multiplexer dispatching inbound events to their port's handler.
//!
//! Each inbound port accepts exactly one handler. Handlers are called in
//! emission order; the future each call returns runs as its own task so a
//! slow handler never blocks receipt of later events.

use std::future::Future;
use std::pin::Pin;

use igniter_shared::{FileWriteRequest, IgniterError, Result};
use serde_json::Value;
use tokio::task::JoinSet;
use tracing::{trace, warn};

use crate::protocol::{InboundEvent, InboundPort};

/// Boxed future returned by a handler invocation.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>>;

type Handler<T> = Box<dyn Fn(T) -> HandlerFuture + Send + Sync + 'static>;

/// Routes [`InboundEvent`]s to per-port handlers and tracks in-flight work.
#[derive(Default)]
pub struct PortMux {
    model_dump: Option<Handler<Value>>,
    write_file: Option<Handler<FileWriteRequest>>,
    fault: Option<Handler<String>>,
    in_flight: JoinSet<Result<()>>,
}

impl PortMux {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the `sendModelDump` handler.
    pub fn subscribe_model_dump<F>(&mut self, handler: F) -> Result<()>
    where
        F: Fn(Value) -> HandlerFuture + Send + Sync + 'static,
    {
        attach(&mut self.model_dump, InboundPort::SendModelDump, handler)
    }

    /// Attach the `writeFile` handler.
    pub fn subscribe_write_file<F>(&mut self, handler: F) -> Result<()>
    where
        F: Fn(FileWriteRequest) -> HandlerFuture + Send + Sync + 'static,
    {
        attach(&mut self.write_file, InboundPort::WriteFile, handler)
    }

    /// Attach the `fault` handler.
    pub fn subscribe_fault<F>(&mut self, handler: F) -> Result<()>
    where
        F: Fn(String) -> HandlerFuture + Send + Sync + 'static,
    {
        attach(&mut self.fault, InboundPort::Fault, handler)
    }

    pub fn is_subscribed(&self, port: InboundPort) -> bool {
        match port {
            InboundPort::SendModelDump => self.model_dump.is_some(),
            InboundPort::WriteFile => self.write_file.is_some(),
            InboundPort::Fault => self.fault.is_some(),
        }
    }

    /// Invoke the handler for `event` and schedule its work.
    ///
    /// Returns `false` if no handler is attached to the event's port; the
    /// event is dropped with a warning.
    pub fn dispatch(&mut self, event: InboundEvent) -> bool {
        let port = event.port();
        trace!(%port, "dispatching event");

        let fut = match event {
            InboundEvent::SendModelDump(snapshot) => self.model_dump.as_ref().map(|h| h(snapshot)),
            InboundEvent::WriteFile(filename, contents) => self
                .write_file
                .as_ref()
                .map(|h| h(FileWriteRequest { filename, contents })),
            InboundEvent::Fault { message } => self.fault.as_ref().map(|h| h(message)),
        };

        match fut {
            Some(fut) => {
                self.in_flight.spawn(fut);
                true
            }
            None => {
                warn!(%port, "no handler subscribed, event dropped");
                false
            }
        }
    }

    /// Number of handler invocations still running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Wait for the next handler invocation to finish.
    ///
    /// Returns `None` when nothing is in flight.
    pub async fn next_completion(&mut self) -> Option<Result<()>> {
        let joined = self.in_flight.join_next().await?;
        Some(match joined {
            Ok(result) => result,
            Err(e) => Err(IgniterError::protocol(format!("handler task failed: {e}"))),
        })
    }

    /// Wait for every in-flight invocation; the first failure wins.
    pub async fn drain(&mut self) -> Result<()> {
        while let Some(result) = self.next_completion().await {
            result?;
        }
        Ok(())
    }

    /// Cancel every in-flight invocation.
    pub fn abort_all(&mut self) {
        self.in_flight.abort_all();
    }
}

fn attach<T, F>(slot: &mut Option<Handler<T>>, port: InboundPort, handler: F) -> Result<()>
where
    F: Fn(T) -> HandlerFuture + Send + Sync + 'static,
{
    if slot.is_some() {
        return Err(IgniterError::protocol(format!(
            "port {port} already has a subscriber"
        )));
    }
    *slot = Some(Box::new(handler));
    Ok(())
}
