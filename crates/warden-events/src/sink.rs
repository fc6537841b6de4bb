// sink.rs — Notification sinks and the dispatcher.
//
// Sinks observe events; they cannot influence a decision. The dispatcher is
// synchronous and isolates sinks from each other: one failing sink is
// logged and the rest still receive the event.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::EventError;
use crate::event::SecurityEvent;

/// Receives every security event the dispatcher sees.
pub trait NotificationSink: Send + Sync {
    /// Handle an event. Errors are logged by the dispatcher.
    fn send(&self, event: &SecurityEvent) -> Result<(), EventError>;
}

/// Appends events as JSONL.
///
/// The file is opened on the first event and the buffered handle is kept for
/// the life of the sink; each line is flushed as it is written.
pub struct LogSink {
    path: PathBuf,
    writer: Mutex<Option<BufWriter<File>>>,
}

impl LogSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            writer: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<BufWriter<File>, EventError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(parent, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(&self.path, e))?;
        Ok(BufWriter::new(file))
    }

    fn io_error(&self, path: &Path, source: std::io::Error) -> EventError {
        EventError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl NotificationSink for LogSink {
    fn send(&self, event: &SecurityEvent) -> Result<(), EventError> {
        let json = serde_json::to_string(event)?;

        let mut guard = match self.writer.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        if guard.is_none() {
            *guard = Some(self.open()?);
        }
        let Some(writer) = guard.as_mut() else {
            return Ok(());
        };

        let written = writeln!(writer, "{json}").and_then(|_| writer.flush());
        if let Err(e) = written {
            // Reopen on the next event.
            *guard = None;
            return Err(self.io_error(&self.path, e));
        }
        Ok(())
    }
}

/// Fans events out to every registered sink.
#[derive(Default)]
pub struct EventDispatcher {
    sinks: Vec<Box<dyn NotificationSink>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sink(&mut self, sink: Box<dyn NotificationSink>) {
        self.sinks.push(sink);
    }

    pub fn with_sink(mut self, sink: Box<dyn NotificationSink>) -> Self {
        self.add_sink(sink);
        self
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Deliver `event` to every sink. Sink errors are logged and skipped.
    pub fn dispatch(&self, event: &SecurityEvent) {
        for sink in &self.sinks {
            if let Err(e) = sink.send(event) {
                tracing::warn!(event_type = event.event_type(), "notification sink error: {}", e);
            }
        }
    }
}
