//! Per-file ingestion: stage, hash, dedup, extract, render, enrich, persist, finalize.

use crate::error::{IngestError, IngestResult};
use crate::files::{relocate, slash_path, stage_and_hash};
use crate::status::{ProcessingStatus, TaskOutcome};
use crate::watcher::{scan_root, WatchFilter};
use chrono::Utc;
use slidebank_ai::{AiClient, Enricher};
use slidebank_config::{Config, StorageRoots};
use slidebank_core::{
    canonical_path, comments_to_text, default_slide_title, parse_flag_value, Category,
    FeatureFlag, Presentation, PresentationId, PresentationUpdate, Repository, Slide, SourceFile,
    LAYOUT_SCHEMA_VERSION,
};
use slidebank_pptx::{extract_slide_content, extract_tags, ExtractedDeck};
use slidebank_render::{RendererConfig, ThumbnailRenderer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::debug;

const DECK_SUMMARY_PROMPT: &str = "This is a summary of all slides in a presentation. \
Please provide a high-level summary of the entire deck: \n";

/// Why a file was not processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another record already holds these exact bytes.
    DuplicateContent,
}

/// Result of one `process_file` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    Skipped {
        id: PresentationId,
        reason: SkipReason,
    },
    Processed {
        id: PresentationId,
        slide_count: u32,
        /// An existing record was replaced rather than created.
        was_update: bool,
    },
}

impl ProcessOutcome {
    pub fn id(&self) -> &str {
        match self {
            ProcessOutcome::Skipped { id, .. } | ProcessOutcome::Processed { id, .. } => id,
        }
    }
}

/// Values used for feature flags that were never set.
#[derive(Debug, Clone, Copy)]
pub struct FlagDefaults {
    pub auto_process: bool,
    pub ai_enabled: bool,
}

impl Default for FlagDefaults {
    fn default() -> Self {
        Self {
            auto_process: true,
            ai_enabled: false,
        }
    }
}

/// Orchestrates ingestion of presentation files.
///
/// Cheap to clone; clones share the repository, collaborators and status.
#[derive(Clone)]
pub struct IngestionPipeline {
    repository: Arc<dyn Repository>,
    roots: Arc<StorageRoots>,
    renderer: Option<Arc<ThumbnailRenderer>>,
    enricher: Option<Arc<dyn Enricher>>,
    filter: Arc<WatchFilter>,
    status: Arc<ProcessingStatus>,
    tasks: TaskTracker,
    defaults: FlagDefaults,
}

impl IngestionPipeline {
    /// A pipeline without thumbnail rendering or enrichment.
    pub fn new(repository: Arc<dyn Repository>, roots: StorageRoots) -> Self {
        Self {
            repository,
            roots: Arc::new(roots),
            renderer: None,
            enricher: None,
            filter: Arc::new(WatchFilter::default()),
            status: Arc::new(ProcessingStatus::new()),
            tasks: TaskTracker::new(),
            defaults: FlagDefaults::default(),
        }
    }

    /// Wire every collaborator from configuration.
    ///
    /// An AI provider that cannot be built is logged and enrichment is left off.
    pub fn from_config(config: &Config, repository: Arc<dyn Repository>) -> IngestResult<Self> {
        let paths = config.app_paths()?;
        let roots = config.storage_roots(&paths);

        let renderer = ThumbnailRenderer::new(RendererConfig {
            office_binary: config.render.office_binary.clone(),
            rasterizer_binary: config.render.rasterizer_binary.clone(),
            dpi: config.render.dpi,
            scratch_dir: roots.scratch.clone(),
        });

        let mut pipeline = Self::new(repository.clone(), roots)
            .with_renderer(renderer)
            .with_filter(WatchFilter::from_config(&config.watch))
            .with_flag_defaults(FlagDefaults {
                auto_process: config.watch.auto_process,
                ai_enabled: config.ai.enabled,
            });

        match AiClient::from_config(&config.ai) {
            Ok(client) => {
                pipeline = pipeline.with_enricher(Arc::new(client.with_usage_log(repository)));
            }
            Err(e) => pipeline.status.warn(format!("AI enrichment unavailable: {}", e)),
        }

        Ok(pipeline)
    }

    pub fn with_renderer(mut self, renderer: ThumbnailRenderer) -> Self {
        self.renderer = Some(Arc::new(renderer));
        self
    }

    pub fn with_enricher(mut self, enricher: Arc<dyn Enricher>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    /// Which files count as presentations when scanning roots.
    pub fn with_filter(mut self, filter: WatchFilter) -> Self {
        self.filter = Arc::new(filter);
        self
    }

    pub fn with_flag_defaults(mut self, defaults: FlagDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn status(&self) -> &Arc<ProcessingStatus> {
        &self.status
    }

    pub fn roots(&self) -> &StorageRoots {
        &self.roots
    }

    pub fn filter(&self) -> &WatchFilter {
        &self.filter
    }

    /// Current value of a runtime flag, falling back to the configured default.
    pub fn flag_enabled(&self, flag: FeatureFlag) -> bool {
        let default = match flag {
            FeatureFlag::AutoProcess => self.defaults.auto_process,
            FeatureFlag::AiEnabled => self.defaults.ai_enabled,
        };
        match self.repository.get_feature_flag(flag.name()) {
            Ok(Some(value)) => parse_flag_value(&value).unwrap_or(default),
            Ok(None) => default,
            Err(e) => {
                self.status
                    .warn(format!("Failed to read flag {}: {}", flag.name(), e));
                default
            }
        }
    }

    /// Run `process_file` on its own task after `delay`.
    ///
    /// The file counts towards the queue depth until the delay has passed.
    /// A file that no longer exists by then is skipped. Failures are logged;
    /// nothing is returned to the scheduler. The task is tracked until it
    /// finishes, see [`wait_idle`](Self::wait_idle).
    pub fn schedule(&self, path: PathBuf, force: bool, delay: Duration) -> JoinHandle<()> {
        self.status.enqueue(1);
        let pipeline = self.clone();
        self.tasks.spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            pipeline.status.dequeue();
            // Already finalized by an earlier event for the same file.
            if !path.exists() {
                debug!("{} is gone, nothing to process", path.display());
                return;
            }
            if let Err(e) = pipeline.process_file(&path, force).await {
                pipeline
                    .status
                    .warn(format!("Failed to process {}: {}", path.display(), e));
            }
        })
    }

    /// Scheduled tasks that have not finished yet, including those still
    /// waiting out their delay.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Wait until every scheduled task has run to completion.
    ///
    /// Dropping the runtime aborts unfinished tasks, so call this before
    /// shutting it down.
    pub async fn wait_idle(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }

    /// Ingest one presentation found inside a watched root.
    ///
    /// With `force` the duplicate checks are bypassed and the file is fully
    /// reprocessed. Only an unreadable file or archive, or a repository
    /// failure while writing the main record, is an error; everything else
    /// degrades to empty fields and a log line.
    pub async fn process_file(&self, path: &Path, force: bool) -> IngestResult<ProcessOutcome> {
        let source = self.locate(path)?;
        let filename = source.filename();
        let mut guard = self.status.begin(&filename);
        self.status.info(format!("Processing file: {}", filename));

        if !source.path.is_file() {
            return Err(IngestError::FileNotFound(source.path.clone()));
        }

        // Staged copy and every scratch file go away when this is dropped.
        std::fs::create_dir_all(&self.roots.scratch)?;
        let scratch = tempfile::Builder::new()
            .prefix("stage_")
            .tempdir_in(&self.roots.scratch)?;
        let staged = scratch.path().join(&filename);

        let checksum = {
            let from = source.path.clone();
            let to = staged.clone();
            tokio::task::spawn_blocking(move || stage_and_hash(&from, &to)).await??
        };
        debug!("Staged {} ({})", filename, checksum);

        let source_canonical = source.canonical_path();
        let final_canonical = canonical_path(Category::Template, &source.relative);

        let existing = if force {
            match self.find_identity(&filename, &source_canonical, &final_canonical)? {
                Some(found) => Some(found),
                None => self.repository.find_by_checksum(&checksum)?,
            }
        } else {
            if let Some(duplicate) = self.repository.find_by_checksum(&checksum)? {
                self.status.info(format!(
                    "File {} (checksum: {}) already exists ({}). Skipping duplicate processing.",
                    filename, checksum, duplicate.id
                ));
                if duplicate.canonical_path == source_canonical {
                    self.finalize(&source, &duplicate.id);
                } else if source.category != Category::Template {
                    self.archive_duplicate(&source);
                }
                guard.complete(TaskOutcome::Skipped);
                return Ok(ProcessOutcome::Skipped {
                    id: duplicate.id,
                    reason: SkipReason::DuplicateContent,
                });
            }
            self.find_identity(&filename, &source_canonical, &final_canonical)?
        };

        let deck = {
            let staged = staged.clone();
            tokio::task::spawn_blocking(move || extract_slide_content(&staged)).await?
        }
        .map_err(|e| IngestError::Extraction {
            path: source.path.clone(),
            source: e,
        })?;

        let tags = {
            let staged = staged.clone();
            match tokio::task::spawn_blocking(move || extract_tags(&staged)).await? {
                Ok(tags) => tags,
                Err(e) => {
                    self.status
                        .warn(format!("Failed to extract tags from {}: {}", filename, e));
                    Vec::new()
                }
            }
        };

        let thumbnails = self.render_thumbnails(&source, &staged).await;
        let slide_count = deck.slide_count.max(thumbnails.len() as u32);

        let metadata = serde_json::json!({
            "tags": tags,
            "discovered_at": source.discovered_at.to_rfc3339(),
            "processed_at": Utc::now().to_rfc3339(),
            "slide_count": slide_count,
            "schema_version": LAYOUT_SCHEMA_VERSION,
        });

        let was_update = existing.is_some();
        let id = match existing {
            Some(record) => {
                self.repository.update_presentation(
                    &record.id,
                    &PresentationUpdate {
                        filename: Some(filename.clone()),
                        canonical_path: Some(source_canonical.clone()),
                        checksum: Some(checksum.clone()),
                        is_template: Some(!tags.is_empty()),
                        tags: Some(tags.clone()),
                        metadata: Some(metadata),
                        ..Default::default()
                    },
                )?;
                // Not atomic with the inserts below; a crash here leaves the
                // record without slides until the next successful run.
                let removed = self.repository.delete_slides(&record.id)?;
                debug!("Removed {} old slides of {}", removed, record.id);
                record.id
            }
            None => self.repository.create_presentation(
                &Presentation::new(&filename, &source_canonical, &checksum)
                    .with_tags(tags.clone())
                    .with_metadata(metadata),
            )?,
        };

        self.store_slides(&id, &filename, &deck, &thumbnails, slide_count)
            .await;

        self.status.info(format!(
            "Successfully processed: {} ({} slides, tags: {:?})",
            filename, slide_count, tags
        ));
        self.finalize(&source, &id);

        guard.complete(TaskOutcome::Processed);
        Ok(ProcessOutcome::Processed {
            id,
            slide_count,
            was_update,
        })
    }

    /// Clear the repository, move archived decks back into the inbox and
    /// schedule every inbox file. Returns the scheduled tasks.
    pub fn reprocess_all(&self) -> IngestResult<Vec<JoinHandle<()>>> {
        self.status
            .info("Starting full reprocess: clearing repository");
        self.repository.clear_all()?;

        for path in scan_root(&self.roots.template, &self.filter) {
            let Ok(relative) = path.strip_prefix(&self.roots.template) else {
                continue;
            };
            let target = self.roots.stage.join(relative);
            match relocate(&path, &target) {
                Ok(()) => self.status.info(format!(
                    "Moved {} back to stage for reprocessing",
                    slash_path(relative)
                )),
                Err(e) => self.status.warn(format!(
                    "Failed to move {} back to stage: {}",
                    path.display(),
                    e
                )),
            }
        }

        let mut inbox = scan_root(&self.roots.stage, &self.filter);
        if let Some(original) = &self.roots.original {
            inbox.extend(scan_root(original, &self.filter));
        }
        self.status
            .info(format!("Rescheduling {} files", inbox.len()));

        Ok(inbox
            .into_iter()
            .map(|path| self.schedule(path, false, Duration::ZERO))
            .collect())
    }

    fn locate(&self, path: &Path) -> IngestResult<SourceFile> {
        let (category, relative) = self
            .roots
            .categorize(path)
            .ok_or_else(|| IngestError::OutsideStorage(path.to_path_buf()))?;
        Ok(SourceFile::new(path, category, relative))
    }

    /// Look the file up under its current and its archived location.
    fn find_identity(
        &self,
        filename: &str,
        source_canonical: &str,
        final_canonical: &str,
    ) -> IngestResult<Option<Presentation>> {
        if let Some(found) = self.repository.find_by_identity(filename, source_canonical)? {
            return Ok(Some(found));
        }
        if source_canonical == final_canonical {
            return Ok(None);
        }
        Ok(self.repository.find_by_identity(filename, final_canonical)?)
    }

    async fn render_thumbnails(&self, source: &SourceFile, staged: &Path) -> Vec<PathBuf> {
        let Some(renderer) = self.renderer.clone() else {
            return Vec::new();
        };

        let output_dir = self.thumbnail_dir(source);
        let input = staged.to_path_buf();
        let dir = output_dir.clone();
        let result = tokio::task::spawn_blocking(move || renderer.render(&input, &dir)).await;

        match result {
            Ok(Ok(pages)) => pages,
            Ok(Err(e)) => {
                self.status.warn(format!(
                    "Failed to render thumbnails for {}: {}",
                    source.filename(),
                    e
                ));
                Vec::new()
            }
            Err(e) => {
                self.status
                    .warn(format!("Thumbnail task for {} failed: {}", source.filename(), e));
                Vec::new()
            }
        }
    }

    /// `thumbnails/<relative dir>/<file stem>/`.
    fn thumbnail_dir(&self, source: &SourceFile) -> PathBuf {
        let stem = source
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "presentation".to_string());
        let mut dir = self.roots.thumbnails.clone();
        if let Some(parent) = source.relative.parent() {
            dir.push(parent);
        }
        dir.join(stem)
    }

    async fn store_slides(
        &self,
        id: &str,
        filename: &str,
        deck: &ExtractedDeck,
        thumbnails: &[PathBuf],
        slide_count: u32,
    ) {
        let enricher = if self.flag_enabled(FeatureFlag::AiEnabled) {
            self.enricher.clone()
        } else {
            None
        };
        let mut summaries = Vec::new();

        for number in 1..=slide_count {
            let mut slide = Slide::new(id, number);
            slide.thumbnail_path = thumbnails
                .get(number as usize - 1)
                .and_then(|page| page.strip_prefix(&self.roots.thumbnails).ok())
                .map(slash_path);

            if let Some(content) = deck.slide(number) {
                slide.content = content.text.clone();
                slide.layout = content.layout.clone();
                slide.comments = comments_to_text(&content.comments);
            }

            if let Some(enricher) = &enricher {
                if !slide.content.is_empty() {
                    self.enrich_slide(enricher.as_ref(), &mut slide, filename).await;
                    if let Some(summary) = &slide.summary {
                        summaries.push(summary.clone());
                    }
                }
            }

            if let Err(e) = self.repository.insert_slide(&slide) {
                self.status
                    .warn(format!("Failed to save slide {} of {}: {}", number, filename, e));
            }
        }

        if let Some(enricher) = &enricher {
            if !summaries.is_empty() {
                self.enrich_deck(enricher.as_ref(), id, filename, deck, &summaries)
                    .await;
            }
        }
    }

    async fn enrich_slide(&self, enricher: &dyn Enricher, slide: &mut Slide, filename: &str) {
        let number = slide.slide_number;

        match enricher.summarize(&slide.content).await {
            Ok(completion) => {
                let summary = completion.cleaned();
                if !summary.is_empty() {
                    slide.summary = Some(summary);
                }
            }
            Err(e) => self.status.warn(format!(
                "Failed to summarize slide {} of {}: {}",
                number, filename, e
            )),
        }

        // Reviewer comments describe intent better than the slide text.
        let mut title = None;
        if !slide.comments.is_empty() {
            match enricher.extract_title_from_comments(&slide.comments).await {
                Ok(completion) => title = Some(completion.cleaned()).filter(|t| !t.is_empty()),
                Err(e) => self.status.warn(format!(
                    "Failed to title slide {} of {} from comments: {}",
                    number, filename, e
                )),
            }
        }
        if title.is_none() {
            match enricher.extract_slide_title(&slide.content).await {
                Ok(completion) => title = Some(completion.cleaned()).filter(|t| !t.is_empty()),
                Err(e) => self.status.warn(format!(
                    "Failed to title slide {} of {}: {}",
                    number, filename, e
                )),
            }
        }

        slide.title = match title {
            Some(title) => format!("{}. {}", number, title),
            None => default_slide_title(number),
        };
    }

    async fn enrich_deck(
        &self,
        enricher: &dyn Enricher,
        id: &str,
        filename: &str,
        deck: &ExtractedDeck,
        summaries: &[String],
    ) {
        let prompt = format!("{}{}", DECK_SUMMARY_PROMPT, summaries.join("\n"));
        match enricher.summarize(&prompt).await {
            Ok(completion) => {
                let summary = completion.cleaned();
                if !summary.is_empty() {
                    self.update_quietly(id, &PresentationUpdate::summary(summary));
                }
            }
            Err(e) => self.status.warn(format!(
                "Failed to generate overall summary for {}: {}",
                filename, e
            )),
        }

        let Some(first) = deck.slide(1).filter(|s| !s.text.is_empty()) else {
            return;
        };
        match enricher.extract_title(&first.text).await {
            Ok(completion) => {
                let title = completion.cleaned();
                if !title.is_empty() {
                    self.update_quietly(id, &PresentationUpdate::title(title));
                }
            }
            Err(e) => self
                .status
                .warn(format!("Failed to extract title for {}: {}", filename, e)),
        }
    }

    fn update_quietly(&self, id: &str, update: &PresentationUpdate) {
        if let Err(e) = self.repository.update_presentation(id, update) {
            self.status
                .warn(format!("Failed to update presentation {}: {}", id, e));
        }
    }

    /// Move the source into long-term storage and record its canonical path.
    fn finalize(&self, source: &SourceFile, id: &str) {
        let target = self.roots.template.join(&source.relative);
        if source.category == Category::Template && source.path == target {
            return;
        }

        match relocate(&source.path, &target) {
            Ok(()) => {
                self.status.info(format!(
                    "Moved {} to {}",
                    source.filename(),
                    target.display()
                ));
                let canonical = canonical_path(Category::Template, &source.relative);
                self.update_quietly(id, &PresentationUpdate::canonical_path(canonical));
            }
            Err(e) => self.status.warn(format!(
                "Failed to move {} to template storage: {}",
                source.filename(),
                e
            )),
        }
    }

    /// Clear a byte-identical copy out of the inbox.
    ///
    /// An archived file already at the target location is left alone.
    fn archive_duplicate(&self, source: &SourceFile) {
        let target = self.roots.template.join(&source.relative);
        if target.exists() {
            debug!(
                "Duplicate {} left in place; {} exists",
                source.path.display(),
                target.display()
            );
            return;
        }
        if let Err(e) = relocate(&source.path, &target) {
            self.status.warn(format!(
                "Failed to move duplicate {} to template storage: {}",
                source.filename(),
                e
            ));
        }
    }
}
