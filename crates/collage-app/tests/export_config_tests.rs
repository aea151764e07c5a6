//! Integration tests for export configuration loading.

use std::collections::HashMap;

use collage_app::{AppError, DEFAULT_EXPORT_SIZE_PX, ExportConfig, MAX_EXPORT_SIZE_PX};

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn export_config_tests_defaults_match_export_contract() {
    let config = ExportConfig::from_lookup(lookup(&[]));
    assert_eq!(config, ExportConfig::default());
    assert_eq!(config.size_px, 2048);
    assert_eq!(config.jpeg_quality, 92);
    assert_eq!(config.album, "Pictures/AutoCollage");
    assert_eq!(config.thumbnail_max_px, 1024);
}

#[test]
fn export_config_tests_accepts_valid_overrides() {
    let config = ExportConfig::from_lookup(lookup(&[
        ("COLLAGE_EXPORT_SIZE_PX", " 1080 "),
        ("COLLAGE_JPEG_QUALITY", "75"),
        ("COLLAGE_ALBUM", "Pictures/Trips"),
    ]));
    assert_eq!(config.size_px, 1080);
    assert_eq!(config.jpeg_quality, 75);
    assert_eq!(config.album, "Pictures/Trips");
}

#[test]
fn export_config_tests_invalid_values_fall_back() {
    let config = ExportConfig::from_lookup(lookup(&[
        ("COLLAGE_EXPORT_SIZE_PX", "0"),
        ("COLLAGE_JPEG_QUALITY", "101"),
        ("COLLAGE_ALBUM", "../outside"),
    ]));
    assert_eq!(config, ExportConfig::default());

    let config = ExportConfig::from_lookup(lookup(&[("COLLAGE_EXPORT_SIZE_PX", "huge")]));
    assert_eq!(config.size_px, DEFAULT_EXPORT_SIZE_PX);
}

#[test]
fn export_config_tests_reads_process_environment() {
    // Safety:
    // - Integration tests mutate process env in a single-threaded test body.
    // - No other test in this binary reads COLLAGE_JPEG_QUALITY.
    unsafe { std::env::set_var("COLLAGE_JPEG_QUALITY", "60") };
    assert_eq!(ExportConfig::from_env().jpeg_quality, 60);

    // Safety: see rationale above.
    unsafe { std::env::remove_var("COLLAGE_JPEG_QUALITY") };
    assert_eq!(ExportConfig::from_env().jpeg_quality, 92);
}

#[test]
fn export_config_tests_size_override_uses_the_same_range() {
    let config = ExportConfig::default()
        .with_size_px(MAX_EXPORT_SIZE_PX)
        .expect("largest size accepted");
    assert_eq!(config.size_px, MAX_EXPORT_SIZE_PX);

    assert!(matches!(
        ExportConfig::default().with_size_px(100_000),
        Err(AppError::InvalidExportSize(100_000))
    ));
    assert!(matches!(
        ExportConfig::default().with_size_px(0),
        Err(AppError::InvalidExportSize(0))
    ));
}
