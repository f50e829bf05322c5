//! Activity log file
//!
//! One line per event, e.g. `[producer-2] Produced in slot: 4`. The file is
//! truncated when opened and has its own lock, separate from any monitor.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use prodcon_core::{pc_info, pc_warn, ActivityRecorder, Event, NullRecorder, PcError, PcResult};

/// Line-per-event recorder backed by a file
pub struct FileRecorder {
    path: PathBuf,
    out: Mutex<BufWriter<File>>,
}

impl FileRecorder {
    /// Create or truncate `path`
    pub fn create(path: impl AsRef<Path>) -> PcResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)
            .map_err(|e| PcError::Sink(format!("cannot open {}: {}", path.display(), e)))?;
        Ok(Self { path, out: Mutex::new(BufWriter::new(file)) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ActivityRecorder for FileRecorder {
    fn record(&self, event: Event) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(out, "{}", event) {
            pc_warn!("activity log {}: {}", self.path.display(), e);
        }
    }

    fn flush(&self) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = out.flush() {
            pc_warn!("activity log {}: {}", self.path.display(), e);
        }
    }
}

impl Drop for FileRecorder {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Recorder for an optional log path.
///
/// No path gives a [`NullRecorder`]. A path that cannot be opened logs one
/// warning and also falls back to [`NullRecorder`], so the run proceeds
/// without recording.
pub fn open_recorder(path: Option<&Path>) -> Arc<dyn ActivityRecorder> {
    let Some(path) = path else {
        return Arc::new(NullRecorder);
    };
    match FileRecorder::create(path) {
        Ok(rec) => {
            pc_info!("recording activity to {}", path.display());
            Arc::new(rec)
        }
        Err(e) => {
            pc_warn!("{}; activity will not be recorded", e);
            Arc::new(NullRecorder)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prodcon_core::{EventKind, WorkerId};
    use std::fs;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("prodcon-{}-{}.txt", name, std::process::id()))
    }

    #[test]
    fn test_writes_one_line_per_event() {
        let path = temp_path("lines");
        {
            let rec = FileRecorder::create(&path).unwrap();
            rec.record(Event::new(EventKind::Produced, 0, Some(WorkerId::producer(1))));
            rec.record(Event::new(EventKind::Consumed, 0, None));
        }
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "[producer-1] Produced in slot: 0\nConsumed from slot: 0\n");
        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_truncates_existing_file() {
        let path = temp_path("truncate");
        fs::write(&path, "stale\n").unwrap();
        {
            let rec = FileRecorder::create(&path).unwrap();
            rec.record(Event::new(EventKind::Produced, 3, None));
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "Produced in slot: 3\n");
        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_unopenable_path_degrades() {
        let dir = std::env::temp_dir().join("prodcon-no-such-dir").join("nested");
        let rec = open_recorder(Some(&dir.join("log.txt")));
        // Accepts events without failing
        rec.record(Event::new(EventKind::Produced, 0, None));
        rec.flush();
        assert!(!dir.exists());
    }
}
