//! Per-file upload progress.

use std::{
    fmt,
    io::{self, Write},
    path::Path,
    sync::{Mutex, PoisonError},
};

/// Builds the reporter attached to one file's upload.
pub type ProgressFactory = fn(&Path) -> io::Result<ProgressReporter>;

/// Byte counter for a single file upload.
///
/// Part uploads of the same file may report concurrently; the lock covers the
/// whole add-render-write sequence so no delta is lost and no line is torn.
pub struct ProgressReporter {
    label: String,
    total_size: u64,
    state: Mutex<ProgressState>,
}

struct ProgressState {
    bytes_sent: u64,
    sink: Box<dyn Write + Send>,
}

impl ProgressReporter {
    /// Reporter for `path` rendering to stdout. The size is read once, here.
    pub fn for_file(path: &Path) -> io::Result<Self> {
        let total_size = std::fs::metadata(path)?.len();
        Ok(Self::with_sink(
            path.display().to_string(),
            total_size,
            Box::new(io::stdout()),
        ))
    }

    /// Reporter for `path` that counts bytes but renders nothing.
    pub fn quiet_for_file(path: &Path) -> io::Result<Self> {
        let total_size = std::fs::metadata(path)?.len();
        Ok(Self::with_sink(
            path.display().to_string(),
            total_size,
            Box::new(io::sink()),
        ))
    }

    pub fn with_sink(
        label: impl Into<String>,
        total_size: u64,
        sink: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            label: label.into(),
            total_size,
            state: Mutex::new(ProgressState {
                bytes_sent: 0,
                sink,
            }),
        }
    }

    /// Adds `delta` transferred bytes and renders the new status line.
    pub fn update(&self, delta: u64) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.bytes_sent += delta;
        let line = format!(
            "\r{}  {} / {}  ({:.2}%)",
            self.label,
            state.bytes_sent,
            self.total_size,
            percentage(state.bytes_sent, self.total_size)
        );
        let sink = &mut state.sink;
        if let Err(err) = sink.write_all(line.as_bytes()).and_then(|()| sink.flush()) {
            tracing::debug!("Failed to render progress for {}: {err}", self.label);
        }
    }

    pub fn bytes_sent(&self) -> u64 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .bytes_sent
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn percentage(&self) -> f64 {
        percentage(self.bytes_sent(), self.total_size)
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("label", &self.label)
            .field("total_size", &self.total_size)
            .field("bytes_sent", &self.bytes_sent())
            .finish()
    }
}

// An empty file is complete as soon as it starts.
fn percentage(sent: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    sent as f64 / total as f64 * 100.0
}
