//! Startup and run loop: credentials + state → worker config → worker →
//! subscriptions → initiating command → event dispatch.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info, instrument, warn};

use igniter_credentials::CredentialResolver;
use igniter_ports::{
    HandlerFuture, InboundEvent, InboundPort, OutboundCommand, OutboundPort, PortMux, connect,
};
use igniter_shared::{HostConfig, IgniterError, Result, RunId, StartupConfig, WorkerConfig};
use igniter_storage::StateStore;

use crate::observer::HostObserver;
use crate::signal::{InterruptSource, SignalBridge};
use crate::sink::FileSink;
use crate::worker::{WorkerFactory, WorkerHandle};

/// Which command starts the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Send `ignite` and let the worker run.
    Ignite,
    /// Send `requestModelDump` and print what comes back.
    DumpModel,
}

impl RunMode {
    pub fn initial_command(&self) -> OutboundCommand {
        match self {
            Self::Ignite => OutboundCommand::Ignite,
            Self::DumpModel => OutboundCommand::RequestModelDump,
        }
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: RunId,
    pub files_written: usize,
    pub model_dumps: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Startup
// ---------------------------------------------------------------------------

/// Resolve credentials, then load the known-publishers set.
///
/// Credentials come first so a missing store fails before anything else
/// is touched.
pub async fn prepare_worker_config(
    startup: &StartupConfig,
    resolver: &CredentialResolver,
) -> Result<WorkerConfig> {
    let credentials = resolver.resolve(startup).await?;
    let known_publishers = StateStore::new(&startup.state_path).load().await?;

    Ok(WorkerConfig {
        credentials,
        known_publishers,
        argv: startup.argv.clone(),
    })
}

/// Prepare the worker config and bootstrap the worker in one step.
pub async fn launch(
    startup: &StartupConfig,
    resolver: &CredentialResolver,
    host: HostConfig,
    factory: &dyn WorkerFactory,
    mode: RunMode,
    observer: Arc<dyn HostObserver>,
) -> Result<WorkerRun> {
    let config = prepare_worker_config(startup, resolver).await?;
    WorkerBootstrap::new(config, host, observer).bootstrap(factory, mode)
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

/// One-shot bootstrap: consumed by [`WorkerBootstrap::bootstrap`], so at
/// most one worker comes out of it.
pub struct WorkerBootstrap {
    run_id: RunId,
    config: WorkerConfig,
    host: HostConfig,
    observer: Arc<dyn HostObserver>,
}

impl WorkerBootstrap {
    pub fn new(config: WorkerConfig, host: HostConfig, observer: Arc<dyn HostObserver>) -> Self {
        Self {
            run_id: RunId::new(),
            config,
            host,
            observer,
        }
    }

    /// Attach every inbound handler, construct the worker, then send the
    /// single initiating command.
    #[instrument(skip_all, fields(run_id = %self.run_id, worker = factory.name(), mode = ?mode))]
    pub fn bootstrap(self, factory: &dyn WorkerFactory, mode: RunMode) -> Result<WorkerRun> {
        let started_at = Utc::now();
        let model_dumps = Arc::new(AtomicUsize::new(0));
        let (host_ports, worker_ports) = connect();
        let mut mux = PortMux::new();

        // --- Subscriptions ---
        let sink = Arc::new(FileSink::new(&self.host.output_dir, self.observer.clone()));
        sink.clone().attach(&mut mux)?;
        self.observer.subscribed(InboundPort::WriteFile);

        let observer = self.observer.clone();
        let dumps = model_dumps.clone();
        mux.subscribe_model_dump(move |snapshot| -> HandlerFuture {
            observer.model_dump(&snapshot);
            dumps.fetch_add(1, Ordering::Relaxed);
            Box::pin(async { Ok(()) })
        })?;
        self.observer.subscribed(InboundPort::SendModelDump);

        let observer = self.observer.clone();
        mux.subscribe_fault(move |message| -> HandlerFuture {
            observer.fault(&message);
            Box::pin(async move { Err(IgniterError::WorkerFault { message }) })
        })?;
        self.observer.subscribed(InboundPort::Fault);

        // --- Worker ---
        info!(
            known_publishers = self.config.known_publishers.len(),
            argv = self.config.argv.len(),
            "constructing worker"
        );
        let worker = factory.spawn(self.config, worker_ports)?;
        self.observer.worker_started(factory.name());

        // --- Initiating command ---
        let command = mode.initial_command();
        host_ports.outbound.send(command);
        self.observer.command_sent(command);

        Ok(WorkerRun {
            run_id: self.run_id,
            outbound: host_ports.outbound,
            events: host_ports.events,
            mux,
            worker,
            host: self.host,
            observer: self.observer,
            sink,
            model_dumps,
            started_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Run loop
// ---------------------------------------------------------------------------

/// A bootstrapped worker whose events still need dispatching.
pub struct WorkerRun {
    run_id: RunId,
    outbound: OutboundPort,
    events: mpsc::UnboundedReceiver<InboundEvent>,
    mux: PortMux,
    worker: WorkerHandle,
    host: HostConfig,
    observer: Arc<dyn HostObserver>,
    sink: Arc<FileSink>,
    model_dumps: Arc<AtomicUsize>,
    started_at: DateTime<Utc>,
}

impl WorkerRun {
    /// Dispatch events until the worker closes its event stream, every
    /// handler has finished and the worker has exited.
    ///
    /// Ends early with the first handler failure (including a worker
    /// `fault`), with [`IgniterError::WorkerTimeout`] if the worker stays
    /// silent past the configured deadline, or with
    /// [`IgniterError::Interrupted`] once an interrupt has been forwarded.
    /// Interrupts and both deadlines stay armed until the worker exits.
    #[instrument(skip_all, fields(run_id = %self.run_id))]
    pub async fn run_until_complete<S: InterruptSource>(self, interrupts: S) -> Result<RunSummary> {
        let WorkerRun {
            run_id,
            outbound,
            mut events,
            mut mux,
            worker,
            host,
            observer,
            sink,
            model_dumps,
            started_at,
        } = self;

        let mut bridge = SignalBridge::arm(interrupts, outbound, observer);
        let mut interrupts_sent = 0usize;
        let mut grace_deadline: Option<Instant> = None;
        let mut idle_deadline = host.response_timeout.map(|t| Instant::now() + t);
        let mut events_open = true;

        let exited = worker.wait();
        tokio::pin!(exited);

        loop {
            let handlers_busy = mux.in_flight() > 0;
            let awaiting_exit = !events_open && !handlers_busy;

            tokio::select! {
                biased;

                Some(result) = mux.next_completion(), if handlers_busy => {
                    if let Err(e) = result {
                        error!(error = %e, "run failed");
                        mux.abort_all();
                        return Err(e);
                    }
                }

                Some(()) = bridge.forwarded.recv() => {
                    interrupts_sent += 1;
                    if grace_deadline.is_none() {
                        grace_deadline = Some(Instant::now() + host.interrupt_grace);
                    }
                }

                _ = sleep_until_opt(grace_deadline) => {
                    warn!(grace_ms = host.interrupt_grace.as_millis(), "worker still running after interrupt");
                    mux.abort_all();
                    return Err(IgniterError::Interrupted);
                }

                _ = sleep_until_opt(idle_deadline) => {
                    let after = host.response_timeout.unwrap_or(Duration::ZERO);
                    error!(after_secs = after.as_secs(), "worker stopped responding");
                    mux.abort_all();
                    return Err(IgniterError::WorkerTimeout { after });
                }

                event = events.recv(), if events_open => match event {
                    Some(event) => {
                        idle_deadline = host.response_timeout.map(|t| Instant::now() + t);
                        mux.dispatch(event);
                    }
                    None => {
                        debug!("worker closed its event stream");
                        events_open = false;
                    }
                },

                result = &mut exited, if awaiting_exit => {
                    result?;
                    break;
                }
            }
        }

        while bridge.forwarded.try_recv().is_ok() {
            interrupts_sent += 1;
        }

        if interrupts_sent > 0 {
            info!(interrupts_sent, "worker stopped after interrupt");
            return Err(IgniterError::Interrupted);
        }

        let summary = RunSummary {
            run_id,
            files_written: sink.written(),
            model_dumps: model_dumps.load(Ordering::Relaxed),
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            files_written = summary.files_written,
            model_dumps = summary.model_dumps,
            "run completed"
        );
        Ok(summary)
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
