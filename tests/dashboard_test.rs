//! Dashboard drill-down against the filesystem backend

use robodoc::dashboard::DashboardBrowser;
use robodoc::error::RoboDocError;
use robodoc::storage::{LocalFsStorage, Storage};
use tempfile::{tempdir, TempDir};

const TTL: u64 = 3600;

/// robodoc/
///   SCARA/2525/Incoming/{a.jpg, manifest.json}
///   SCARA/3000/Incoming/
///   IVR/77/Incoming/b.jpg
fn seeded() -> (TempDir, DashboardBrowser) {
    let dir = tempdir().unwrap();
    let bucket = dir.path().join("robodoc");
    let write = |rel: &str, bytes: &[u8]| {
        let p = bucket.join(rel);
        std::fs::create_dir_all(p.parent().unwrap()).unwrap();
        std::fs::write(p, bytes).unwrap();
    };
    write("SCARA/2525/Incoming/a.jpg", &[0xFF, 0xD8, 0xFF]);
    write("SCARA/2525/Incoming/manifest.json", b"{}");
    write("IVR/77/Incoming/b.jpg", &[0xFF, 0xD8, 0xFF]);
    std::fs::create_dir_all(bucket.join("SCARA/3000/Incoming")).unwrap();

    let storage: Box<dyn Storage> = Box::new(LocalFsStorage::new(dir.path().to_path_buf(), "robodoc", "secret"));
    (dir, DashboardBrowser::new(Some(storage), TTL))
}

async fn drill(browser: &mut DashboardBrowser, path: &[&str]) {
    browser.load_robot_types().await.unwrap();
    assert!(browser.select_robot_type(path[0]).await.unwrap());
    assert!(browser.select_serial(path[1]).await.unwrap());
    assert!(browser.select_context(path[2]).await.unwrap());
}

/// Each level lists the folders below the selection
#[tokio::test]
async fn test_cascade_listing() {
    let (_dir, mut b) = seeded();
    assert_eq!(b.active_path(), "robodoc/");

    b.load_robot_types().await.unwrap();
    assert_eq!(b.robot_types(), ["IVR", "SCARA"]);

    assert!(b.select_robot_type("SCARA").await.unwrap());
    assert_eq!(b.serials(), ["2525", "3000"]);
    assert_eq!(b.active_path(), "robodoc/SCARA/");

    assert!(b.select_serial("2525").await.unwrap());
    assert_eq!(b.contexts(), ["Incoming"]);

    assert!(b.select_context("Incoming").await.unwrap());
    let names: Vec<&str> = b.files().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["a.jpg", "manifest.json"]);
    assert_eq!(b.active_path(), "robodoc/SCARA/2525/Incoming/");
}

/// Names that are not listed options are ignored
#[tokio::test]
async fn test_unknown_selection_ignored() {
    let (_dir, mut b) = seeded();
    b.load_robot_types().await.unwrap();

    assert!(!b.select_robot_type("DELTA").await.unwrap());
    assert!(b.selected_type().is_none());
    // serial before type
    assert!(!b.select_serial("2525").await.unwrap());
}

/// Changing an upper level clears every level below it
#[tokio::test]
async fn test_reselect_clears_descendants() {
    let (_dir, mut b) = seeded();
    drill(&mut b, &["SCARA", "2525", "Incoming"]).await;
    assert_eq!(b.resolve_previews().await.unwrap(), 1);

    assert!(b.select_robot_type("IVR").await.unwrap());
    assert_eq!(b.serials(), ["77"]);
    assert!(b.selected_serial().is_none());
    assert!(b.selected_context().is_none());
    assert!(b.contexts().is_empty());
    assert!(b.files().is_empty());
    assert_eq!(b.preview_count(), 0);
}

/// Only image files get previews
#[tokio::test]
async fn test_previews_for_images_only() {
    let (_dir, mut b) = seeded();
    drill(&mut b, &["SCARA", "2525", "Incoming"]).await;

    assert_eq!(b.resolve_previews().await.unwrap(), 1);
    assert!(b.preview_url("a.jpg").unwrap().contains("token="));
    assert!(b.preview_url("manifest.json").is_none());
}

/// Signed URL first, public URL when signing fails
#[tokio::test]
async fn test_open_file_fallback() {
    let (_dir, mut b) = seeded();
    drill(&mut b, &["SCARA", "2525", "Incoming"]).await;

    let signed = b.open_file("a.jpg").await.unwrap();
    assert!(signed.contains("?expires="));

    // the local backend cannot sign a missing object but still forms a path URL
    let public = b.open_file("gone.jpg").await.unwrap();
    assert!(public.starts_with("file://"));
    assert!(!public.contains("token="));
}

/// Opening needs a selected context
#[tokio::test]
async fn test_open_file_without_context() {
    let (_dir, mut b) = seeded();
    b.load_robot_types().await.unwrap();
    let err = b.open_file("a.jpg").await.unwrap_err();
    assert!(matches!(err, RoboDocError::NoFileUrl(_)));
}

/// No storage settings
#[tokio::test]
async fn test_dashboard_without_storage() {
    let mut b = DashboardBrowser::new(None, TTL);
    let err = b.load_robot_types().await.unwrap_err();
    assert!(matches!(err, RoboDocError::MissingStorageConfig));
    assert_eq!(b.active_path(), "/");
}

/// Missing bucket surfaces as a storage error
#[tokio::test]
async fn test_dashboard_missing_bucket() {
    let dir = tempdir().unwrap();
    let storage: Box<dyn Storage> = Box::new(LocalFsStorage::new(dir.path().to_path_buf(), "robodoc", "s"));
    let mut b = DashboardBrowser::new(Some(storage), TTL);

    let err = b.load_robot_types().await.unwrap_err();
    match err {
        RoboDocError::Storage(e) => assert!(e.is_not_found()),
        other => panic!("unexpected error: {other}"),
    }
}
