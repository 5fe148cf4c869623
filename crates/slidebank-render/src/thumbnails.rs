//! Deck -> PDF -> PNG conversion chain.

use crate::error::{ProcessError, ProcessResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::Mutex;
use tracing::{debug, info, warn};

static PAGE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^slide-(\d+)\.png$").expect("valid regex"));

/// Prefix shared by every rendered page image.
const PAGE_PREFIX: &str = "slide";

/// External tools and working directory used for rendering.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Office suite binary able to run `--headless --convert-to pdf`.
    pub office_binary: String,
    /// PDF rasterizer accepting `-png -r <dpi> <pdf> <prefix>`.
    pub rasterizer_binary: String,
    pub dpi: u32,
    /// Parent of the per-call scratch directories.
    pub scratch_dir: PathBuf,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            office_binary: "libreoffice".to_string(),
            rasterizer_binary: "pdftoppm".to_string(),
            dpi: 150,
            scratch_dir: std::env::temp_dir(),
        }
    }
}

/// Renders decks to per-slide PNG files.
#[derive(Debug, Clone)]
pub struct ThumbnailRenderer {
    config: RendererConfig,
}

impl ThumbnailRenderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    /// Availability of each configured tool.
    pub fn check_tools(&self) -> Vec<(String, bool)> {
        [&self.config.office_binary, &self.config.rasterizer_binary]
            .into_iter()
            .map(|tool| (tool.clone(), which::which(tool).is_ok()))
            .collect()
    }

    /// Render every slide of `input` into `output_dir` as
    /// `slide-0001.png`, `slide-0002.png`, ...
    ///
    /// Runs synchronously. Pages are produced in a fresh scratch directory
    /// that is deleted on return. Only once rasterizing succeeded are the
    /// earlier `slide-*.png` files in `output_dir` replaced, so a failed
    /// render leaves the previous thumbnails in place.
    pub fn render(&self, input: &Path, output_dir: &Path) -> ProcessResult<Vec<PathBuf>> {
        if !input.exists() {
            return Err(ProcessError::FileNotFound(input.to_path_buf()));
        }
        let office = require_tool(&self.config.office_binary)?;
        let rasterizer = require_tool(&self.config.rasterizer_binary)?;

        std::fs::create_dir_all(&self.config.scratch_dir)?;
        let scratch = tempfile::Builder::new()
            .prefix("render_")
            .tempdir_in(&self.config.scratch_dir)?;

        info!("Rendering thumbnails for {}", input.display());

        let pdf = convert_to_pdf(&office, &self.config.office_binary, input, scratch.path())?;

        let pages_dir = scratch.path().join("pages");
        std::fs::create_dir_all(&pages_dir)?;
        let output = Command::new(&rasterizer)
            .arg("-png")
            .args(["-r", &self.config.dpi.to_string()])
            .arg(&pdf)
            .arg(pages_dir.join(PAGE_PREFIX))
            .output()?;
        check_status(&self.config.rasterizer_binary, &output)?;

        let rendered = normalize_page_names(&pages_dir)?;
        if rendered.is_empty() {
            return Err(ProcessError::MissingOutput {
                tool: self.config.rasterizer_binary.clone(),
                expected: "page images".to_string(),
                output: combined_output(&output),
                found: list_dir(&pages_dir),
            });
        }

        let pages = publish_pages(&rendered, output_dir)?;
        debug!("Rendered {} thumbnails into {}", pages.len(), output_dir.display());
        Ok(pages)
    }
}

/// Serializes replacing one page set with another, so concurrent renders
/// of the same deck never interleave their pages.
static PUBLISH_LOCK: Mutex<()> = Mutex::new(());

fn publish_pages(rendered: &[PathBuf], output_dir: &Path) -> ProcessResult<Vec<PathBuf>> {
    let _lock = PUBLISH_LOCK.lock().unwrap_or_else(|e| e.into_inner());

    std::fs::create_dir_all(output_dir)?;
    let removed = clear_pages(output_dir)?;
    if removed > 0 {
        debug!("Removed {} stale thumbnails from {}", removed, output_dir.display());
    }

    let mut pages = Vec::with_capacity(rendered.len());
    for page in rendered {
        let Some(name) = page.file_name() else {
            continue;
        };
        let target = output_dir.join(name);
        move_file(page, &target)?;
        pages.push(target);
    }
    Ok(pages)
}

/// Rename, falling back to copy and remove across filesystems.
fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    std::fs::copy(from, to)?;
    std::fs::remove_file(from)
}

fn require_tool(tool: &str) -> ProcessResult<PathBuf> {
    which::which(tool).map_err(|_| ProcessError::ToolNotFound {
        tool: tool.to_string(),
    })
}

fn convert_to_pdf(office: &Path, tool: &str, input: &Path, scratch: &Path) -> ProcessResult<PathBuf> {
    // A private profile lets several conversions run at once.
    let profile = format!("-env:UserInstallation=file://{}", scratch.join("profile").display());

    let output = Command::new(office)
        .arg(profile)
        .args(["--headless", "--convert-to", "pdf", "--outdir"])
        .arg(scratch)
        .arg(input)
        .output()?;
    check_status(tool, &output)?;

    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "presentation".to_string());
    let pdf = scratch.join(format!("{}.pdf", stem));

    if !pdf.exists() {
        return Err(ProcessError::MissingOutput {
            tool: tool.to_string(),
            expected: pdf.display().to_string(),
            output: combined_output(&output),
            found: list_dir(scratch),
        });
    }
    Ok(pdf)
}

fn check_status(tool: &str, output: &Output) -> ProcessResult<()> {
    if output.status.success() {
        return Ok(());
    }
    Err(ProcessError::ProcessFailed {
        tool: tool.to_string(),
        code: output.status.code().unwrap_or(-1),
        output: combined_output(output),
    })
}

fn combined_output(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(stderr.trim());
    }
    text
}

fn list_dir(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .flatten()
                .map(|e| e.file_name().to_string_lossy().to_string())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

fn clear_pages(dir: &Path) -> ProcessResult<usize> {
    let pattern = format!(
        "{}/{}-*.png",
        glob::Pattern::escape(&dir.to_string_lossy()),
        PAGE_PREFIX
    );
    let mut removed = 0;
    for entry in glob::glob(&pattern)?.flatten() {
        match std::fs::remove_file(&entry) {
            Ok(()) => removed += 1,
            Err(e) => warn!("Failed to remove {}: {}", entry.display(), e),
        }
    }
    Ok(removed)
}

/// Rename `slide-N.png` (any zero padding) to `slide-NNNN.png` and return
/// the page images sorted, so lexical order equals slide order.
pub fn normalize_page_names(dir: &Path) -> ProcessResult<Vec<PathBuf>> {
    let mut pages = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        let Some(number) = PAGE_NAME
            .captures(&name)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
        else {
            continue;
        };

        let target = dir.join(format!("{}-{:04}.png", PAGE_PREFIX, number));
        if target != entry.path() {
            std::fs::rename(entry.path(), &target)?;
        }
        pages.push(target);
    }

    pages.sort();
    pages.dedup();
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_page_names() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["slide-1.png", "slide-10.png", "slide-02.png", "notes.txt", "slide-x.png"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let pages = normalize_page_names(dir.path()).unwrap();
        let names: Vec<String> = pages
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["slide-0001.png", "slide-0002.png", "slide-0010.png"]);
        assert!(dir.path().join("notes.txt").exists());
        assert!(!dir.path().join("slide-1.png").exists());
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("slide-0003.png"), b"").unwrap();
        let first = normalize_page_names(dir.path()).unwrap();
        let second = normalize_page_names(dir.path()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_tool() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("deck.pptx");
        std::fs::write(&input, b"x").unwrap();

        let renderer = ThumbnailRenderer::new(RendererConfig {
            office_binary: "slidebank-no-such-office".to_string(),
            scratch_dir: dir.path().join("scratch"),
            ..Default::default()
        });
        let err = renderer.render(&input, &dir.path().join("out")).unwrap_err();
        assert!(matches!(err, ProcessError::ToolNotFound { .. }));
    }

    #[test]
    fn test_missing_input() {
        let renderer = ThumbnailRenderer::new(RendererConfig::default());
        let err = renderer
            .render(Path::new("/nonexistent/deck.pptx"), Path::new("/tmp"))
            .unwrap_err();
        assert!(matches!(err, ProcessError::FileNotFound(_)));
    }

    #[cfg(unix)]
    mod fake_tools {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn script(dir: &Path, name: &str, body: &str) -> String {
            let path = dir.join(name);
            std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path.to_string_lossy().to_string()
        }

        const OFFICE: &str = r#"outdir=""
input=""
while [ $# -gt 0 ]; do
  case "$1" in
    --outdir) outdir="$2"; shift 2 ;;
    *) input="$1"; shift ;;
  esac
done
name=$(basename "$input")
printf '%%PDF-1.4' > "$outdir/${name%.*}.pdf"
echo "converted $name""#;

        fn rasterizer(pages: u32) -> String {
            format!(
                r#"for last; do :; done
i=1
while [ $i -le {} ]; do
  : > "$last-$i.png"
  i=$((i+1))
done"#,
                pages
            )
        }

        fn setup(office_body: &str, pages: u32) -> (tempfile::TempDir, ThumbnailRenderer, PathBuf) {
            let dir = tempfile::tempdir().unwrap();
            let tools = dir.path().join("tools");
            std::fs::create_dir_all(&tools).unwrap();

            let renderer = ThumbnailRenderer::new(RendererConfig {
                office_binary: script(&tools, "office", office_body),
                rasterizer_binary: script(&tools, "raster", &rasterizer(pages)),
                dpi: 72,
                scratch_dir: dir.path().join("scratch"),
            });

            let input = dir.path().join("deck.pptx");
            std::fs::write(&input, b"deck").unwrap();
            (dir, renderer, input)
        }

        #[test]
        fn test_render_five_slides() {
            let (dir, renderer, input) = setup(OFFICE, 5);
            let out = dir.path().join("thumbs");

            let pages = renderer.render(&input, &out).unwrap();
            let names: Vec<String> = pages
                .iter()
                .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
                .collect();
            assert_eq!(
                names,
                vec![
                    "slide-0001.png",
                    "slide-0002.png",
                    "slide-0003.png",
                    "slide-0004.png",
                    "slide-0005.png"
                ]
            );

            // Scratch directories are removed after each call.
            let leftover = std::fs::read_dir(dir.path().join("scratch")).unwrap().count();
            assert_eq!(leftover, 0);
        }

        #[test]
        fn test_render_clears_stale_pages() {
            let (dir, renderer, input) = setup(OFFICE, 2);
            let out = dir.path().join("thumbs");
            std::fs::create_dir_all(&out).unwrap();
            for n in 1..=4 {
                std::fs::write(out.join(format!("slide-{:04}.png", n)), b"old").unwrap();
            }

            let pages = renderer.render(&input, &out).unwrap();
            assert_eq!(pages.len(), 2);
            assert!(!out.join("slide-0003.png").exists());
        }

        #[test]
        fn test_failed_render_keeps_previous_pages() {
            let (dir, mut renderer, input) = setup(OFFICE, 2);
            let out = dir.path().join("thumbs");
            renderer.render(&input, &out).unwrap();

            let tools = dir.path().join("tools");
            renderer.config.rasterizer_binary = script(
                &tools,
                "raster-partial",
                "for last; do :; done\n: > \"$last-1.png\"\nexit 1",
            );
            let err = renderer.render(&input, &out).unwrap_err();
            assert!(matches!(err, ProcessError::ProcessFailed { code: 1, .. }));

            assert_eq!(
                list_dir(&out),
                vec!["slide-0001.png".to_string(), "slide-0002.png".to_string()]
            );
            let leftover = std::fs::read_dir(dir.path().join("scratch")).unwrap().count();
            assert_eq!(leftover, 0);
        }

        #[test]
        fn test_missing_pdf_reports_output() {
            let (dir, renderer, input) = setup("echo 'cannot open document' >&2", 3);
            let err = renderer.render(&input, &dir.path().join("thumbs")).unwrap_err();
            match err {
                ProcessError::MissingOutput { output, .. } => {
                    assert!(output.contains("cannot open document"))
                }
                other => panic!("unexpected error: {}", other),
            }
            let leftover = std::fs::read_dir(dir.path().join("scratch")).unwrap().count();
            assert_eq!(leftover, 0);
        }

        #[test]
        fn test_failing_rasterizer() {
            let dir = tempfile::tempdir().unwrap();
            let (_keep, mut renderer, input) = setup(OFFICE, 1);
            renderer.config.rasterizer_binary = script(dir.path(), "raster-fail", "echo broken >&2\nexit 3");

            let err = renderer.render(&input, &dir.path().join("thumbs")).unwrap_err();
            assert!(matches!(err, ProcessError::ProcessFailed { code: 3, .. }));
        }
    }
}
