//! Worker construction and the JSON-lines process transport.
//!
//! A worker is anything that consumes a [`WorkerConfig`] plus the worker end
//! of the ports. The production worker is an external process speaking the
//! wire format in [`igniter_ports::protocol`] over its stdin/stdout.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use igniter_ports::{EventEmitter, HostMessage, InboundEvent, OutboundCommand, WorkerPorts};
use igniter_shared::{IgniterError, Result, WorkerConfig, WorkerProcessConfig};

// ---------------------------------------------------------------------------
// Factory + handle
// ---------------------------------------------------------------------------

/// Builds a worker from its configuration and port end.
pub trait WorkerFactory: Send + Sync {
    /// Label used in diagnostics.
    fn name(&self) -> &str;

    /// Construct the worker. Must not block; long-running work belongs in
    /// the returned handle's task.
    fn spawn(&self, config: WorkerConfig, ports: WorkerPorts) -> Result<WorkerHandle>;
}

/// A running worker. Dropping the handle aborts it.
pub struct WorkerHandle {
    name: String,
    task: Option<JoinHandle<Result<()>>>,
}

impl WorkerHandle {
    pub fn new(name: impl Into<String>, task: JoinHandle<Result<()>>) -> Self {
        Self {
            name: name.into(),
            task: Some(task),
        }
    }

    /// Wait for the worker to finish.
    pub async fn wait(mut self) -> Result<()> {
        let Some(task) = self.task.take() else {
            return Ok(());
        };
        match task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => Err(IgniterError::Worker(format!("worker {} panicked: {e}", self.name))),
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}

// ---------------------------------------------------------------------------
// Process worker
// ---------------------------------------------------------------------------

/// Launches the worker as a child process.
///
/// The child receives `args` followed by the passthrough argv, reads JSON
/// lines on stdin and writes JSON lines on stdout. Its stderr is inherited.
#[derive(Debug, Clone)]
pub struct ProcessWorkerFactory {
    command: String,
    args: Vec<String>,
}

impl ProcessWorkerFactory {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }
}

impl From<&WorkerProcessConfig> for ProcessWorkerFactory {
    fn from(config: &WorkerProcessConfig) -> Self {
        Self::new(config.command.clone(), config.args.clone())
    }
}

impl WorkerFactory for ProcessWorkerFactory {
    fn name(&self) -> &str {
        &self.command
    }

    #[instrument(skip_all, fields(cmd = %self.command))]
    fn spawn(&self, config: WorkerConfig, ports: WorkerPorts) -> Result<WorkerHandle> {
        info!(args = ?self.args, argv = ?config.argv, "spawning worker process");

        let mut command = Command::new(&self.command);
        command
            .args(&self.args)
            .args(&config.argv)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit()) // Worker logs go to parent stderr
            .kill_on_drop(true);
        // Own process group: a terminal Ctrl-C reaches the worker only as the
        // forwarded `interrupt` command.
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command
            .spawn()
            .map_err(|e| {
                IgniterError::Worker(format!(
                    "failed to spawn worker: {e}. Is `{}` installed?",
                    self.command
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| IgniterError::Worker("failed to capture worker stdin".into()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| IgniterError::Worker("failed to capture worker stdout".into()))?;

        let task = tokio::spawn(drive(child, stdin, stdout, config, ports));
        Ok(WorkerHandle::new(self.command.clone(), task))
    }
}

/// Pump the child's pipes until its stdout closes.
async fn drive(
    mut child: Child,
    mut stdin: ChildStdin,
    stdout: ChildStdout,
    config: WorkerConfig,
    ports: WorkerPorts,
) -> Result<()> {
    let WorkerPorts { commands, events } = ports;

    // A child that exits without reading stdin still gets its stdout relayed.
    if let Err(e) = write_line(&mut stdin, &HostMessage::Init { config }).await {
        warn!(error = %e, "worker did not accept its configuration");
    }
    let forwarder = tokio::spawn(forward_commands(stdin, commands));

    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => relay(&line, &events),
            Ok(None) => break,
            Err(e) => {
                let _ = events.fault(format!("worker read error: {e}"));
                break;
            }
        }
    }

    forwarder.abort();

    let status = child
        .wait()
        .await
        .map_err(|e| IgniterError::Worker(format!("failed to wait for worker: {e}")))?;
    info!(?status, "worker exited");

    if !status.success() {
        let _ = events.fault(format!("worker exited with {status}"));
    }

    Ok(())
}

/// Decode one stdout line into an event; undecodable lines become faults.
fn relay(line: &str, events: &EventEmitter) {
    if line.trim().is_empty() {
        return;
    }

    let event = InboundEvent::decode(line).unwrap_or_else(|e| InboundEvent::fault(e.to_string()));
    debug!(port = %event.port(), "worker event");

    if events.emit(event).is_err() {
        warn!("host stopped listening, dropping worker output");
    }
}

/// Write each outbound command to the child's stdin until either side closes.
async fn forward_commands(
    mut stdin: ChildStdin,
    mut commands: mpsc::UnboundedReceiver<OutboundCommand>,
) {
    while let Some(port) = commands.recv().await {
        if let Err(e) = write_line(&mut stdin, &HostMessage::Command { port }).await {
            warn!(%port, error = %e, "could not deliver command to worker");
            break;
        }
    }
}

async fn write_line(stdin: &mut ChildStdin, message: &HostMessage) -> Result<()> {
    let mut json = message.encode()?;
    json.push('\n');

    stdin
        .write_all(json.as_bytes())
        .await
        .map_err(|e| IgniterError::protocol(format!("failed to write to worker stdin: {e}")))?;
    stdin
        .flush()
        .await
        .map_err(|e| IgniterError::protocol(format!("failed to flush worker stdin: {e}")))
}
