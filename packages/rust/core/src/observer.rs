//! Diagnostics callbacks for a host run.

use igniter_ports::{InboundPort, OutboundCommand};
use serde_json::Value;
use tracing::{debug, error, info};

/// Receives a callback for every observable step of a run.
pub trait HostObserver: Send + Sync {
    /// An inbound port got its handler.
    fn subscribed(&self, port: InboundPort);
    /// The worker was constructed.
    fn worker_started(&self, name: &str);
    /// A command was handed to the outbound port.
    fn command_sent(&self, command: OutboundCommand);
    /// The worker sent a model snapshot.
    fn model_dump(&self, snapshot: &Value);
    /// A `writeFile` request landed on disk.
    fn file_written(&self, filename: &str);
    /// A `writeFile` request could not be written.
    fn file_write_failed(&self, filename: &str, contents: &str, error: &std::io::Error);
    /// The worker reported a fault.
    fn fault(&self, message: &str);
}

/// Logs through `tracing` and prints model dumps to stdout.
pub struct LogObserver;

impl HostObserver for LogObserver {
    fn subscribed(&self, port: InboundPort) {
        debug!(%port, "subscribed");
    }

    fn worker_started(&self, name: &str) {
        info!(worker = name, "worker started");
    }

    fn command_sent(&self, command: OutboundCommand) {
        info!(port = %command, "sent command");
    }

    fn model_dump(&self, snapshot: &Value) {
        match serde_json::to_string_pretty(snapshot) {
            Ok(pretty) => println!("{pretty}"),
            Err(_) => println!("{snapshot}"),
        }
    }

    fn file_written(&self, filename: &str) {
        info!(filename, "file written");
    }

    fn file_write_failed(&self, filename: &str, contents: &str, error: &std::io::Error) {
        error!(filename, contents, %error, "failed to write file");
    }

    fn fault(&self, message: &str) {
        error!(message, "worker reported a fault");
    }
}

/// No-op observer for headless/test usage.
pub struct SilentObserver;

impl HostObserver for SilentObserver {
    fn subscribed(&self, _port: InboundPort) {}
    fn worker_started(&self, _name: &str) {}
    fn command_sent(&self, _command: OutboundCommand) {}
    fn model_dump(&self, _snapshot: &Value) {}
    fn file_written(&self, _filename: &str) {}
    fn file_write_failed(&self, _filename: &str, _contents: &str, _error: &std::io::Error) {}
    fn fault(&self, _message: &str) {}
}

#[cfg(test)]
pub(crate) mod recording {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Records every callback as a line in a shared log.
    #[derive(Clone, Default)]
    pub(crate) struct RecordingObserver {
        log: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingObserver {
        pub(crate) fn entries(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }

        fn push(&self, line: String) {
            self.log.lock().unwrap().push(line);
        }
    }

    impl HostObserver for RecordingObserver {
        fn subscribed(&self, port: InboundPort) {
            self.push(format!("subscribed {port}"));
        }
        fn worker_started(&self, name: &str) {
            self.push(format!("worker started {name}"));
        }
        fn command_sent(&self, command: OutboundCommand) {
            self.push(format!("sent {command}"));
        }
        fn model_dump(&self, snapshot: &Value) {
            self.push(format!("model dump {snapshot}"));
        }
        fn file_written(&self, filename: &str) {
            self.push(format!("file written {filename}"));
        }
        fn file_write_failed(&self, filename: &str, contents: &str, error: &std::io::Error) {
            self.push(format!("file write failed {filename} contents={contents} error={error}"));
        }
        fn fault(&self, message: &str) {
            self.push(format!("fault {message}"));
        }
    }
}
