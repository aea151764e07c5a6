//! Integration tests for filesystem-backed decode and storage.

mod common;

use collage_core::{ImageRef, template_by_id};
use collage_render::{
    DEFAULT_ALBUM, DirectoryStore, EXPORT_JPEG_QUALITY, FsImageSource, ImageSource, ImageStore,
    JPEG_MIME, RenderStyle, render_and_save,
};
use common::{RED, job, solid};
use url::Url;

fn album_files(dir: &std::path::Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .expect("album dir should exist")
        .filter_map(Result::ok)
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn fs_collaborator_tests_decodes_and_downscales_local_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("wide.png");
    solid(400, 100, RED).save(&path).expect("fixture should be written");

    let by_path = ImageRef::new(path.to_string_lossy().into_owned());
    let decoded = FsImageSource
        .decode(&by_path, 100)
        .expect("plain path should decode");
    assert_eq!(decoded.dimensions(), (100, 25));

    let uri = Url::from_file_path(&path).expect("absolute path");
    let by_uri = ImageRef::new(uri.to_string());
    let full = FsImageSource
        .decode(&by_uri, u32::MAX)
        .expect("file uri should decode");
    assert_eq!(full.dimensions(), (400, 100));
}

#[test]
fn fs_collaborator_tests_missing_or_foreign_refs_decode_to_none() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = ImageRef::new(dir.path().join("nope.jpg").to_string_lossy().into_owned());
    assert!(FsImageSource.decode(&missing, 64).is_none());

    let garbage = dir.path().join("garbage.jpg");
    std::fs::write(&garbage, b"not a jpeg").expect("fixture should be written");
    let garbage = ImageRef::new(garbage.to_string_lossy().into_owned());
    assert!(FsImageSource.decode(&garbage, 64).is_none());

    let content = ImageRef::new("content://media/external/images/1");
    assert!(FsImageSource.decode(&content, 64).is_none());
}

#[test]
fn fs_collaborator_tests_export_lands_in_album_without_pending_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = DirectoryStore::new(dir.path(), DEFAULT_ALBUM);
    let template = template_by_id("two_horizontal").expect("stock template");

    let saved = render_and_save(
        &job(template, &[None, None], &[], RenderStyle::default(), 48),
        &FsImageSource,
        &store,
        EXPORT_JPEG_QUALITY,
    )
    .expect("export should be stored");

    let files = album_files(store.album_dir());
    assert_eq!(files.len(), 1);
    assert!(files[0].starts_with("collage_") && files[0].ends_with(".jpg"));
    assert_eq!(store.list_recent(24), vec![saved.clone()]);

    let reopened = FsImageSource.decode(&saved, u32::MAX).expect("export should decode");
    assert_eq!(reopened.dimensions(), (48, 48));
}

#[test]
fn fs_collaborator_tests_name_collisions_get_suffixes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = DirectoryStore::new(dir.path(), DEFAULT_ALBUM);

    let first = store.insert("collage_1.jpg", JPEG_MIME).expect("first insert");
    let second = store.insert("collage_1.jpg", JPEG_MIME).expect("second insert");

    assert_ne!(first, second);
    assert!(second.as_str().ends_with("collage_1_1.jpg"));
}

#[test]
fn fs_collaborator_tests_delete_removes_pending_entry() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = DirectoryStore::new(dir.path(), DEFAULT_ALBUM);

    let pending = store.insert("collage_2.jpg", JPEG_MIME).expect("insert");
    assert_eq!(album_files(store.album_dir()).len(), 1);
    assert!(store.list_recent(24).is_empty());

    store.delete(&pending).expect("delete should succeed");
    assert!(album_files(store.album_dir()).is_empty());
}

#[test]
fn fs_collaborator_tests_rejects_non_jpeg_and_foreign_refs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = DirectoryStore::new(dir.path(), DEFAULT_ALBUM);

    assert!(store.insert("collage_3.png", "image/png").is_err());
    assert!(store.write(&ImageRef::new("/etc/passwd"), b"x").is_err());
}
