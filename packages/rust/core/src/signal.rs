//! Forwards operator interrupts to the worker as `interrupt` commands.

use std::future::Future;
use std::sync::Arc;

use igniter_ports::{OutboundCommand, OutboundPort};
use igniter_shared::{IgniterError, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::observer::HostObserver;

/// A stream of interrupt occurrences.
pub trait InterruptSource: Send + 'static {
    /// Resolve on the next interrupt; `None` once no more can arrive.
    fn recv(&mut self) -> impl Future<Output = Option<()>> + Send;
}

/// SIGINT delivered to this process.
pub struct CtrlC {
    #[cfg(unix)]
    inner: tokio::signal::unix::Signal,
}

impl CtrlC {
    /// Register the SIGINT listener. Must run inside the tokio runtime.
    pub fn install() -> Result<Self> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            let inner = signal(SignalKind::interrupt())
                .map_err(|e| IgniterError::config(format!("failed to register SIGINT: {e}")))?;
            Ok(Self { inner })
        }
        #[cfg(not(unix))]
        {
            Ok(Self {})
        }
    }
}

impl InterruptSource for CtrlC {
    #[cfg(unix)]
    fn recv(&mut self) -> impl Future<Output = Option<()>> + Send {
        self.inner.recv()
    }

    #[cfg(not(unix))]
    fn recv(&mut self) -> impl Future<Output = Option<()>> + Send {
        async { tokio::signal::ctrl_c().await.ok() }
    }
}

/// Interrupts injected programmatically.
impl InterruptSource for mpsc::UnboundedReceiver<()> {
    fn recv(&mut self) -> impl Future<Output = Option<()>> + Send {
        mpsc::UnboundedReceiver::recv(self)
    }
}

/// A source that never fires.
pub struct NoInterrupts;

impl InterruptSource for NoInterrupts {
    fn recv(&mut self) -> impl Future<Output = Option<()>> + Send {
        std::future::pending()
    }
}

/// An armed bridge. Dropping it disarms the listener.
pub struct SignalBridge {
    task: JoinHandle<()>,
    /// One notification per forwarded interrupt.
    pub forwarded: mpsc::UnboundedReceiver<()>,
}

impl SignalBridge {
    /// Start forwarding: each interrupt sends exactly one `interrupt` command.
    ///
    /// Repeated interrupts send repeated commands.
    pub fn arm<S: InterruptSource>(
        mut source: S,
        outbound: OutboundPort,
        observer: Arc<dyn HostObserver>,
    ) -> Self {
        let (tx, forwarded) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            while source.recv().await.is_some() {
                info!("interrupt received, forwarding to worker");
                outbound.send(OutboundCommand::Interrupt);
                observer.command_sent(OutboundCommand::Interrupt);
                if tx.send(()).is_err() {
                    break;
                }
            }
        });

        Self { task, forwarded }
    }
}

impl Drop for SignalBridge {
    fn drop(&mut self) {
        self.task.abort();
    }
}
