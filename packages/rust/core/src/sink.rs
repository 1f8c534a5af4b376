//! File sink: materializes `writeFile` emissions on disk.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use igniter_ports::{HandlerFuture, PortMux};
use igniter_shared::{FileWriteRequest, IgniterError, Result};

use crate::observer::HostObserver;

/// Writes each [`FileWriteRequest`] to disk and reports the outcome.
///
/// Relative filenames resolve against `root`. Parent directories are not
/// created. Requests for the same file are not serialized: the last write to
/// finish wins.
pub struct FileSink {
    root: PathBuf,
    observer: Arc<dyn HostObserver>,
    written: AtomicUsize,
}

impl FileSink {
    pub fn new(root: impl Into<PathBuf>, observer: Arc<dyn HostObserver>) -> Self {
        Self {
            root: root.into(),
            observer,
            written: AtomicUsize::new(0),
        }
    }

    /// Number of successful writes so far.
    pub fn written(&self) -> usize {
        self.written.load(Ordering::Relaxed)
    }

    /// Target path for a worker-provided filename.
    pub fn resolve(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }

    /// Write one request. A failure is reported, then returned as fatal.
    pub async fn write(&self, request: FileWriteRequest) -> Result<()> {
        let path = self.resolve(&request.filename);

        match tokio::fs::write(&path, request.contents.as_bytes()).await {
            Ok(()) => {
                self.written.fetch_add(1, Ordering::Relaxed);
                self.observer.file_written(&request.filename);
                Ok(())
            }
            Err(e) => {
                self.observer
                    .file_write_failed(&request.filename, &request.contents, &e);
                Err(IgniterError::persistence(path, e))
            }
        }
    }

    /// Subscribe this sink to the `writeFile` port.
    pub fn attach(self: Arc<Self>, mux: &mut PortMux) -> Result<()> {
        mux.subscribe_write_file(move |request| -> HandlerFuture {
            let sink = self.clone();
            Box::pin(async move { sink.write(request).await })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::recording::RecordingObserver;
    use igniter_ports::InboundEvent;
    use uuid::Uuid;

    fn temp_root() -> PathBuf {
        let root = std::env::temp_dir().join(format!("igniter-sink-{}", Uuid::now_v7()));
        std::fs::create_dir_all(&root).unwrap();
        root
    }

    #[tokio::test]
    async fn writes_file_and_reports_success() {
        let root = temp_root();
        let observer = RecordingObserver::default();
        let sink = FileSink::new(&root, Arc::new(observer.clone()));

        sink.write(FileWriteRequest::new("out.txt", "hello"))
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(root.join("out.txt")).unwrap(),
            "hello"
        );
        assert!(observer.entries().contains(&"file written out.txt".to_string()));

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn failed_write_reports_path_and_contents_then_fails() {
        let root = temp_root();
        let observer = RecordingObserver::default();
        let sink = FileSink::new(&root, Arc::new(observer.clone()));

        let err = sink
            .write(FileWriteRequest::new("missing-dir/out.txt", "hello"))
            .await
            .unwrap_err();

        assert!(matches!(err, IgniterError::Persistence { .. }));
        let entries = observer.entries();
        let failure = entries
            .iter()
            .find(|e| e.starts_with("file write failed"))
            .expect("failure diagnostic");
        assert!(failure.contains("missing-dir/out.txt"));
        assert!(failure.contains("hello"));

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn same_filename_last_write_wins() {
        let root = temp_root();
        let sink = FileSink::new(&root, Arc::new(crate::observer::SilentObserver));

        sink.write(FileWriteRequest::new("a.txt", "first")).await.unwrap();
        sink.write(FileWriteRequest::new("a.txt", "second")).await.unwrap();

        assert_eq!(std::fs::read_to_string(root.join("a.txt")).unwrap(), "second");
        assert_eq!(sink.written(), 2);
        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn attached_sink_handles_write_file_events() {
        let root = temp_root();
        let observer = RecordingObserver::default();
        let sink = Arc::new(FileSink::new(&root, Arc::new(observer.clone())));

        let mut mux = PortMux::new();
        sink.attach(&mut mux).unwrap();
        mux.dispatch(InboundEvent::write_file("one.txt", "1"));
        mux.dispatch(InboundEvent::write_file("two.txt", "2"));
        mux.drain().await.unwrap();

        assert_eq!(std::fs::read_to_string(root.join("one.txt")).unwrap(), "1");
        assert_eq!(std::fs::read_to_string(root.join("two.txt")).unwrap(), "2");
        assert_eq!(observer.entries().len(), 2);

        let _ = std::fs::remove_dir_all(&root);
    }
}
