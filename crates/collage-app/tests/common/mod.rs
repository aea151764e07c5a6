//! Shared fixtures for editor integration tests.

use std::sync::Arc;

use collage_app::{CollageEditor, ExportConfig};
use collage_capture::{CaptureFault, SyntheticCaptureBackend};
use collage_core::{EditorSettings, ImageRef};
use collage_render::{MemoryImageSource, MemoryStore, StoreFault};
use image::{Rgba, RgbaImage};

pub const RED: [u8; 4] = [220, 30, 30, 255];
pub const GREEN: [u8; 4] = [30, 200, 30, 255];

/// Editor wired to in-memory collaborators, with handles kept for inspection.
#[allow(dead_code)]
pub struct Fixture {
    pub editor: CollageEditor,
    pub images: Arc<MemoryImageSource>,
    pub store: Arc<MemoryStore>,
    pub camera: Arc<SyntheticCaptureBackend>,
}

/// Small export size keeps JPEG encoding fast.
#[allow(dead_code)]
pub fn fixture_with(store_fault: StoreFault, camera_fault: CaptureFault) -> Fixture {
    let images = Arc::new(MemoryImageSource::new());
    let store = Arc::new(MemoryStore::with_fault(store_fault));
    let camera = Arc::new(SyntheticCaptureBackend::with_fault(camera_fault));
    let config = ExportConfig {
        size_px: 64,
        thumbnail_max_px: 8,
        ..ExportConfig::default()
    };
    let settings = EditorSettings {
        spacing_px: 0.0,
        corner_radius_px: 0.0,
        ..EditorSettings::default()
    };

    let editor = CollageEditor::new(config, settings, images.clone(), store.clone())
        .with_camera(camera.clone());
    Fixture {
        editor,
        images,
        store,
        camera,
    }
}

#[allow(dead_code)]
pub fn fixture() -> Fixture {
    fixture_with(StoreFault::None, CaptureFault::None)
}

/// Registers a solid-color image and returns its reference.
#[allow(dead_code)]
pub fn register(images: &MemoryImageSource, name: &str, color: [u8; 4]) -> ImageRef {
    let image = ImageRef::new(format!("mem://{name}"));
    images.insert(image.clone(), RgbaImage::from_pixel(32, 32, Rgba(color)));
    image
}

/// Per-channel comparison tolerant to JPEG and resampling error.
#[allow(dead_code)]
pub fn near(actual: [u8; 4], expected: [u8; 4]) -> bool {
    actual[..3]
        .iter()
        .zip(expected[..3].iter())
        .all(|(a, b)| a.abs_diff(*b) <= 12)
}
