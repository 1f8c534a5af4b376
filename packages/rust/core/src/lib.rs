//! Host-side orchestration for the igniter worker.
//!
//! This crate ties together credential resolution, the known-publishers
//! state, the typed ports and the worker transport into one run:
//! [`launch`] prepares the worker config and bootstraps the worker, then
//! [`WorkerRun::run_until_complete`] dispatches its events until it exits.

pub mod bootstrap;
pub mod observer;
pub mod signal;
pub mod sink;
pub mod worker;

pub use bootstrap::{
    RunMode, RunSummary, WorkerBootstrap, WorkerRun, launch, prepare_worker_config,
};
pub use observer::{HostObserver, LogObserver, SilentObserver};
pub use signal::{CtrlC, InterruptSource, NoInterrupts, SignalBridge};
pub use sink::FileSink;
pub use worker::{ProcessWorkerFactory, WorkerFactory, WorkerHandle};
