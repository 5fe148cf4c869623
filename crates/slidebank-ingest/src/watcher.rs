//! File system watcher feeding the ingestion pipeline.

use crate::error::{IngestError, IngestResult};
use crate::pipeline::IngestionPipeline;
use glob::Pattern;
use notify::event::{EventKind, ModifyKind};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use slidebank_config::WatchConfig;
use slidebank_core::FeatureFlag;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Decides which paths are presentations worth ingesting.
#[derive(Debug, Clone)]
pub struct WatchFilter {
    extension: String,
    ignore_patterns: Vec<Pattern>,
}

impl Default for WatchFilter {
    fn default() -> Self {
        Self::from_config(&WatchConfig::default())
    }
}

impl WatchFilter {
    /// Create from config. Invalid ignore patterns are dropped with a warning.
    pub fn from_config(config: &WatchConfig) -> Self {
        let ignore_patterns = config
            .ignore_patterns
            .iter()
            .filter_map(|p| match Pattern::new(p) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    warn!("Invalid ignore pattern {:?}: {}", p, e);
                    None
                }
            })
            .collect();

        Self {
            extension: config.extension.trim_start_matches('.').to_string(),
            ignore_patterns,
        }
    }

    /// Target extension (case-insensitive), not hidden, not ignored.
    pub fn matches(&self, path: &Path) -> bool {
        let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };

        if filename.starts_with('.') {
            return false;
        }

        if self.ignore_patterns.iter().any(|p| p.matches(filename)) {
            return false;
        }

        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case(&self.extension))
            .unwrap_or(false)
    }
}

/// Every matching file under `root`, sorted. A missing root yields nothing.
pub fn scan_root(root: &Path, filter: &WatchFilter) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| filter.matches(p))
        .collect();
    files.sort();
    files
}

/// Watches every storage root and schedules matching files on the pipeline.
pub struct DirectoryWatcher {
    pipeline: IngestionPipeline,
    quiescence: Duration,
}

impl DirectoryWatcher {
    pub fn new(pipeline: IngestionPipeline, quiescence: Duration) -> Self {
        Self {
            pipeline,
            quiescence,
        }
    }

    pub fn from_config(pipeline: IngestionPipeline, config: &WatchConfig) -> Self {
        Self::new(pipeline, Duration::from_secs(config.quiescence_seconds))
    }

    /// Attach to every root, scan existing files and start the event loop.
    ///
    /// Failing to attach to any root is an error; later watch errors are
    /// only logged. Must be called inside a tokio runtime.
    pub fn spawn(self) -> IngestResult<WatchHandle> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let mut watcher: RecommendedWatcher =
            notify::recommended_watcher(move |result: notify::Result<Event>| {
                let _ = event_tx.send(result);
            })?;

        let roots = self.pipeline.roots().watch_roots();
        for (category, root) in &roots {
            std::fs::create_dir_all(root)?;
            watcher
                .watch(root, RecursiveMode::Recursive)
                .map_err(|e| {
                    IngestError::WatchError(format!("cannot watch {}: {}", root.display(), e))
                })?;
            self.pipeline
                .status()
                .info(format!("Watching {} ({})", root.display(), category));
        }

        let (stop_tx, stop_rx) = mpsc::channel::<()>(1);
        let task = tokio::spawn(async move {
            // Dropping the watcher ends the notify thread.
            let _watcher = watcher;
            self.initial_scan(&roots);
            self.run(event_rx, stop_rx).await;
        });

        Ok(WatchHandle { stop_tx, task })
    }

    fn initial_scan(&self, roots: &[(slidebank_core::Category, PathBuf)]) {
        if !self.pipeline.flag_enabled(FeatureFlag::AutoProcess) {
            self.pipeline
                .status()
                .info("Auto-process disabled, skipping initial scan");
            return;
        }

        for (_, root) in roots {
            let files = scan_root(root, self.pipeline.filter());
            debug!("Initial scan of {}: {} files", root.display(), files.len());
            for path in files {
                self.pipeline.schedule(path, false, Duration::ZERO);
            }
        }
    }

    async fn run(
        &self,
        mut events: mpsc::UnboundedReceiver<notify::Result<Event>>,
        mut stop_rx: mpsc::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                _ = stop_rx.recv() => {
                    info!("Watcher stopping...");
                    break;
                }
                event = events.recv() => match event {
                    Some(Ok(event)) => self.handle_event(event),
                    Some(Err(e)) => warn!("Watch error: {}", e),
                    None => {
                        error!("Watcher channel disconnected");
                        break;
                    }
                },
            }
        }
    }

    fn handle_event(&self, event: Event) {
        let relevant = match event.kind {
            EventKind::Create(_) => true,
            EventKind::Modify(ModifyKind::Metadata(_)) => false,
            EventKind::Modify(_) => true,
            _ => false,
        };
        if !relevant {
            return;
        }

        for path in event.paths {
            if !path.exists() {
                continue;
            }
            if path.is_dir() {
                // Files copied in along with a new directory produce no events of their own.
                if matches!(event.kind, EventKind::Create(_)) {
                    for file in scan_root(&path, self.pipeline.filter()) {
                        self.trigger(file);
                    }
                }
                continue;
            }

            if self.pipeline.filter().matches(&path) {
                self.trigger(path);
            } else {
                debug!("Ignoring {}", path.display());
            }
        }
    }

    fn trigger(&self, path: PathBuf) {
        if !self.pipeline.flag_enabled(FeatureFlag::AutoProcess) {
            debug!("Auto-process disabled, dropping event for {}", path.display());
            return;
        }
        self.pipeline
            .status()
            .info(format!("Detected change in: {}", path.display()));
        self.pipeline.schedule(path, false, self.quiescence);
    }
}

/// Handle to control a running watcher.
pub struct WatchHandle {
    stop_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl WatchHandle {
    /// Stop the event loop. Files already scheduled keep running; await
    /// [`IngestionPipeline::wait_idle`] before shutting the runtime down.
    pub async fn stop(self) -> IngestResult<()> {
        let _ = self.stop_tx.send(()).await;
        self.task.await?;
        Ok(())
    }
}
