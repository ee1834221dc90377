use anyhow::{anyhow, Result};
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

/// Events emitted by the file watcher
#[derive(Debug, Clone)]
pub enum WatchEvent {
    /// The opened document changed on disk and should be reloaded
    FileChanged,
}

/// A debounced watcher for the opened document
pub struct FileWatcher {
    _watcher: notify_debouncer_mini::Debouncer<RecommendedWatcher>,
}

impl FileWatcher {
    /// Start watching `file`. Change events are debounced by `debounce_ms`
    /// milliseconds and sent to `tx`. The parent directory is watched rather
    /// than the file itself: editors that save by rename-and-replace would
    /// otherwise detach the watch on the first save.
    pub fn new(file: &Path, debounce_ms: u64, tx: mpsc::Sender<WatchEvent>) -> Result<Self> {
        let file_name = file
            .file_name()
            .map(|n| n.to_owned())
            .ok_or_else(|| anyhow!("not a watchable path: {}", file.display()))?;
        let parent: PathBuf = match file.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut debouncer = new_debouncer(
            Duration::from_millis(debounce_ms),
            move |result: std::result::Result<Vec<notify_debouncer_mini::DebouncedEvent>, notify::Error>| {
                if let Ok(events) = result {
                    let ours = events.iter().any(|e| {
                        e.kind == DebouncedEventKind::Any
                            && e.path.file_name() == Some(file_name.as_os_str())
                    });
                    if ours {
                        let _ = tx.send(WatchEvent::FileChanged);
                    }
                }
            },
        )?;

        debouncer
            .watcher()
            .watch(&parent, RecursiveMode::NonRecursive)?;

        Ok(FileWatcher {
            _watcher: debouncer,
        })
    }
}
