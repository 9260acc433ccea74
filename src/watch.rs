//! Configuration file change subscription

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;

const DEBOUNCE: Duration = Duration::from_millis(200);

/// Calls a handler whenever the watched file is created or modified.
///
/// The subscription lasts as long as this value. Once it is dropped the
/// handler is never called again and the background thread exits.
pub struct ConfigWatcher {
    path: PathBuf,
    cancelled: Arc<AtomicBool>,
    _watcher: RecommendedWatcher,
}

impl ConfigWatcher {
    pub fn spawn<F>(path: impl Into<PathBuf>, on_change: F) -> Result<Self>
    where
        F: Fn() + Send + 'static,
    {
        let path = path.into();
        let (tx, rx) = std::sync::mpsc::channel();
        let mut watcher = notify::recommended_watcher(tx)?;

        // Watch the directory so write-to-temp-then-rename saves are seen
        let watch_dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        watcher.watch(watch_dir, RecursiveMode::NonRecursive)?;
        tracing::debug!(path = %path.display(), "Watching config file for changes");

        let file_name = path.file_name().map(|f| f.to_owned());
        let cancelled = Arc::new(AtomicBool::new(false));
        let stop = cancelled.clone();
        std::thread::Builder::new()
            .name("cert-tweaks-watch".to_string())
            .spawn(move || loop {
                match rx.recv() {
                    Ok(Ok(event)) => {
                        if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                            continue;
                        }
                        let ours = event
                            .paths
                            .iter()
                            .any(|p| p.file_name() == file_name.as_deref());
                        if !ours {
                            continue;
                        }

                        while rx.recv_timeout(DEBOUNCE).is_ok() {}
                        if stop.load(Ordering::Acquire) {
                            break;
                        }

                        tracing::debug!("Config file change detected");
                        on_change();
                    }
                    Ok(Err(e)) => {
                        tracing::warn!(error = %e, "Config file watcher error");
                    }
                    Err(_) => break,
                }
            })?;

        Ok(Self {
            path,
            cancelled,
            _watcher: watcher,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::Release);
    }
}
