use slidebank_config::StorageRoots;
use slidebank_db::Database;
use slidebank_ingest::{DirectoryWatcher, IngestionPipeline};
use slidebank_pptx::fixtures::DeckBuilder;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn setup(dir: &TempDir) -> (Database, IngestionPipeline) {
    let roots = StorageRoots::under(dir.path());
    roots.ensure_dirs().unwrap();
    let db = Database::open_in_memory().unwrap();
    let pipeline = IngestionPipeline::new(Arc::new(db.clone()), roots);
    (db, pipeline)
}

async fn wait_for_presentations(db: &Database, count: usize) -> bool {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if db.list_presentations(None).unwrap().len() >= count {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_initial_scan_processes_existing_files() {
    let dir = TempDir::new().unwrap();
    let (db, pipeline) = setup(&dir);
    DeckBuilder::new()
        .text_slide(Some("Waiting in the inbox"), None)
        .write_to(&dir.path().join("stage/early.pptx"))
        .unwrap();

    let handle = DirectoryWatcher::new(pipeline.clone(), Duration::from_millis(50))
        .spawn()
        .unwrap();

    assert!(wait_for_presentations(&db, 1).await);
    handle.stop().await.unwrap();

    let presentation = &db.list_presentations(None).unwrap()[0];
    assert_eq!(presentation.filename, "early.pptx");
    assert!(dir.path().join("template/early.pptx").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_new_file_is_picked_up() {
    let dir = TempDir::new().unwrap();
    let (db, pipeline) = setup(&dir);

    let handle = DirectoryWatcher::new(pipeline.clone(), Duration::from_millis(200))
        .spawn()
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let nested = dir.path().join("stage/sales");
    std::fs::create_dir_all(&nested).unwrap();
    DeckBuilder::new()
        .text_slide(Some("Dropped later"), Some("Body"))
        .write_to(&nested.join("late.pptx"))
        .unwrap();

    assert!(wait_for_presentations(&db, 1).await);
    handle.stop().await.unwrap();

    let presentation = &db.list_presentations(None).unwrap()[0];
    assert_eq!(presentation.filename, "late.pptx");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_auto_process_disabled() {
    let dir = TempDir::new().unwrap();
    let (db, pipeline) = setup(&dir);
    db.set_feature_flag("auto_process", "false").unwrap();
    DeckBuilder::new()
        .text_slide(Some("Ignored"), None)
        .write_to(&dir.path().join("stage/ignored.pptx"))
        .unwrap();

    let handle = DirectoryWatcher::new(pipeline.clone(), Duration::from_millis(10))
        .spawn()
        .unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    handle.stop().await.unwrap();

    assert!(db.list_presentations(None).unwrap().is_empty());
    assert!(dir.path().join("stage/ignored.pptx").exists());
    assert!(pipeline.status().snapshot().is_idle());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_events_while_disabled_are_not_replayed() {
    let dir = TempDir::new().unwrap();
    let (db, pipeline) = setup(&dir);
    db.set_feature_flag("auto_process", "false").unwrap();

    let handle = DirectoryWatcher::new(pipeline.clone(), Duration::from_millis(10))
        .spawn()
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let path = dir.path().join("stage/parked.pptx");
    let deck = DeckBuilder::new().text_slide(Some("Parked"), None);
    deck.write_to(&path).unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    db.set_feature_flag("auto_process", "true").unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(db.list_presentations(None).unwrap().is_empty());
    assert!(path.exists());

    // A fresh event after re-enabling is handled normally.
    deck.text_slide(None, Some("Touched")).write_to(&path).unwrap();
    assert!(wait_for_presentations(&db, 1).await);
    handle.stop().await.unwrap();
    pipeline.wait_idle().await;

    assert_eq!(db.list_presentations(None).unwrap()[0].filename, "parked.pptx");
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stop_lets_files_in_flight_finish() {
    use slidebank_render::{RendererConfig, ThumbnailRenderer};
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let (db, pipeline) = setup(&dir);

    let tools = TempDir::new().unwrap();
    let script = |name: &str, body: &str| {
        let path = tools.path().join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().to_string()
    };
    let office = script(
        "office",
        r#"sleep 1
for last; do :; done
outdir=""
while [ $# -gt 0 ]; do
  case "$1" in
    --outdir) outdir="$2"; shift 2 ;;
    *) shift ;;
  esac
done
name=$(basename "$last")
: > "$outdir/${name%.*}.pdf""#,
    );
    let raster = script("raster", "for last; do :; done\n: > \"$last-1.png\"");
    let pipeline = pipeline.with_renderer(ThumbnailRenderer::new(RendererConfig {
        office_binary: office,
        rasterizer_binary: raster,
        dpi: 72,
        scratch_dir: dir.path().join("scratch"),
    }));

    DeckBuilder::new()
        .text_slide(Some("Slow to render"), None)
        .write_to(&dir.path().join("stage/slow.pptx"))
        .unwrap();

    let handle = DirectoryWatcher::new(pipeline.clone(), Duration::ZERO)
        .spawn()
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    while pipeline.status().snapshot().active_tasks == 0 && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(pipeline.status().snapshot().active_tasks, 1);

    handle.stop().await.unwrap();
    assert_eq!(pipeline.in_flight(), 1);
    pipeline.wait_idle().await;

    assert_eq!(pipeline.in_flight(), 0);
    let presentations = db.list_presentations(None).unwrap();
    assert_eq!(presentations.len(), 1);
    assert_eq!(presentations[0].canonical_path, "template/slow.pptx");
    assert_eq!(db.get_slides(&presentations[0].id).unwrap().len(), 1);
    assert!(dir.path().join("template/slow.pptx").exists());
    assert!(!dir.path().join("stage/slow.pptx").exists());
    assert!(dir.path().join("thumbnails/slow/slide-0001.png").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_long_term_storage_is_not_watched() {
    let dir = TempDir::new().unwrap();
    let (db, pipeline) = setup(&dir);
    let archived = dir.path().join("template/archived.pptx");
    DeckBuilder::new()
        .text_slide(Some("Already filed"), None)
        .write_to(&archived)
        .unwrap();

    let handle = DirectoryWatcher::new(pipeline.clone(), Duration::from_millis(10))
        .spawn()
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    DeckBuilder::new()
        .text_slide(Some("Filed later"), None)
        .write_to(&dir.path().join("template/later.pptx"))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    handle.stop().await.unwrap();
    pipeline.wait_idle().await;

    assert!(db.list_presentations(None).unwrap().is_empty());
    assert_eq!(pipeline.status().snapshot().processed, 0);
    assert!(archived.exists());
}
