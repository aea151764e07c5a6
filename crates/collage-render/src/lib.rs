#![warn(missing_docs)]
//! # collage-render
//!
//! ## Purpose
//! Composites slot images into a collage canvas and persists the result.
//!
//! ## Responsibilities
//! - Define the decode ([`ImageSource`]) and storage ([`ImageStore`])
//!   collaborator contracts.
//! - Draw every slot through the layout engine, clipped to rounded corners,
//!   falling back to a placeholder tile when a slot is empty or undecodable.
//! - Encode the canvas as JPEG and store it with rollback on failure.
//! - Provide filesystem-backed and in-memory collaborators.
//!
//! ## Data flow
//! [`RenderJob`] + [`ImageSource`] -> [`render`] -> `RgbaImage` ->
//! [`encode_jpeg`] -> [`ImageStore`] (pending entry -> write -> publish).
//!
//! ## Ownership and lifetimes
//! [`RenderJob`] borrows a read-only snapshot of session state for the
//! duration of one render. The output canvas is owned by the caller.
//!
//! ## Error model
//! A single slot never fails a render: decode failures degrade to a
//! placeholder tile. Canvas, encode, and storage failures surface as
//! [`RenderError`]; [`render_and_save`] collapses them into `None`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use collage_core::{Argb, EditorSettings, ImageRef, SlotTransform, Template};
use collage_layout::{SlotRect, dest_rect, source_rect};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info, warn};
use url::Url;

/// JPEG quality used for exported collages.
pub const EXPORT_JPEG_QUALITY: u8 = 92;

/// MIME type of exported collages.
pub const JPEG_MIME: &str = "image/jpeg";

/// Sub-album under the shared media store that receives exports.
pub const DEFAULT_ALBUM: &str = "Pictures/AutoCollage";

/// Largest canvas edge accepted by [`render`]; the JPEG format caps edges at 65535.
pub const MAX_CANVAS_EDGE_PX: u32 = 16_384;

/// Largest canvas area accepted by [`render`] (a 1 GiB RGBA buffer).
pub const MAX_CANVAS_PIXELS: u64 = 16_384 * 16_384;

/// Pass to [`ImageSource::decode`] to skip downscaling.
pub const FULL_RESOLUTION: u32 = u32::MAX;

const PLACEHOLDER_FILL: [u8; 4] = [0xEF, 0xEF, 0xEF, 0xFF];
const PLACEHOLDER_GLYPH: [u8; 4] = [0x9A, 0x9A, 0x9A, 0xFF];

/// Decode collaborator.
///
/// Implementations must never panic or leak errors past this boundary: any
/// failure is reported as `None`.
pub trait ImageSource: Send + Sync {
    /// Decodes `image`, downscaled so its longest edge is at most
    /// `max_dimension_px`.
    fn decode(&self, image: &ImageRef, max_dimension_px: u32) -> Option<RgbaImage>;
}

/// Shared media storage collaborator.
///
/// Entries are created pending, filled, then published. A caller that fails
/// between [`ImageStore::insert`] and [`ImageStore::publish`] deletes the
/// entry so no empty record is left behind.
pub trait ImageStore: Send + Sync {
    /// Creates a pending entry named `filename`.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the store refuses the entry.
    fn insert(&self, filename: &str, mime_type: &str) -> Result<ImageRef, StoreError>;

    /// Writes the encoded bytes of a pending entry.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the output cannot be opened or written.
    fn write(&self, image: &ImageRef, bytes: &[u8]) -> Result<(), StoreError>;

    /// Makes a pending entry visible.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the entry is unknown or cannot be finalized.
    fn publish(&self, image: &ImageRef) -> Result<(), StoreError>;

    /// Removes an entry, pending or published.
    ///
    /// # Errors
    /// Returns [`StoreError`] when removal fails.
    fn delete(&self, image: &ImageRef) -> Result<(), StoreError>;

    /// Lists published entries, newest first.
    fn list_recent(&self, limit: usize) -> Vec<ImageRef>;
}

/// Look parameters shared by preview and export renders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderStyle {
    /// Gutter between slots in canvas pixels.
    pub spacing_px: f32,
    /// Slot corner radius in canvas pixels.
    pub corner_radius_px: f32,
    /// Canvas fill behind the slots.
    pub background: Argb,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            spacing_px: 0.0,
            corner_radius_px: 0.0,
            background: Argb::WHITE,
        }
    }
}

impl From<&EditorSettings> for RenderStyle {
    fn from(settings: &EditorSettings) -> Self {
        Self {
            spacing_px: settings.spacing_px,
            corner_radius_px: settings.corner_radius_px,
            background: settings.background,
        }
    }
}

/// Read-only snapshot of everything one render needs.
#[derive(Debug, Clone, Copy)]
pub struct RenderJob<'a> {
    /// Layout to draw.
    pub template: &'a Template,
    /// Image per slot index; `None` draws a placeholder.
    pub slot_images: &'a [Option<ImageRef>],
    /// Pan/zoom per slot index; missing entries use the default transform.
    pub slot_transforms: &'a [SlotTransform],
    /// Spacing, corner radius, and background.
    pub style: RenderStyle,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
}

/// Renders a collage canvas of exactly `job.width` x `job.height`.
///
/// Slots are drawn in template order. An empty or undecodable slot gets a
/// placeholder tile and the loop moves on.
///
/// # Errors
/// Returns [`RenderError::InvalidCanvas`] for zero dimensions, an edge above
/// [`MAX_CANVAS_EDGE_PX`], or an area above [`MAX_CANVAS_PIXELS`]. The check
/// runs before the canvas is allocated.
pub fn render(job: &RenderJob<'_>, source: &dyn ImageSource) -> Result<RgbaImage, RenderError> {
    validate_canvas(job.width, job.height)?;

    let mut canvas =
        RgbaImage::from_pixel(job.width, job.height, Rgba(job.style.background.to_rgba()));
    let spacing = job.style.spacing_px.max(0.0);
    let radius = job.style.corner_radius_px.max(0.0);
    let (canvas_w, canvas_h) = (job.width as f32, job.height as f32);

    for (index, slot) in job.template.slots.iter().enumerate() {
        let dst = dest_rect(slot, canvas_w, canvas_h, spacing);
        if dst.is_empty() {
            debug!(slot = index, "slot has no drawable area after spacing");
            continue;
        }

        let Some(image_ref) = job.slot_images.get(index).and_then(Option::as_ref) else {
            draw_placeholder(&mut canvas, &dst, radius);
            continue;
        };

        let Some(decoded) = source.decode(image_ref, FULL_RESOLUTION) else {
            warn!(slot = index, image = %image_ref, "decode failed; drawing placeholder");
            draw_placeholder(&mut canvas, &dst, radius);
            continue;
        };

        let transform = job
            .slot_transforms
            .get(index)
            .copied()
            .unwrap_or_default();
        draw_slot_image(&mut canvas, &decoded, &dst, radius, &transform);
    }

    Ok(canvas)
}

/// Renders, encodes, and stores a collage; `None` on any failure.
///
/// Failures are logged and any pending storage entry is rolled back.
pub fn render_and_save(
    job: &RenderJob<'_>,
    source: &dyn ImageSource,
    store: &dyn ImageStore,
    quality: u8,
) -> Option<ImageRef> {
    match try_render_and_save(job, source, store, quality) {
        Ok(image) => Some(image),
        Err(error) => {
            warn!(%error, "collage export failed");
            None
        }
    }
}

/// Renders, encodes, and stores a collage.
///
/// # Errors
/// Returns the first [`RenderError`] encountered. When the failure happens
/// after the storage entry was created, the entry is deleted first.
pub fn try_render_and_save(
    job: &RenderJob<'_>,
    source: &dyn ImageSource,
    store: &dyn ImageStore,
    quality: u8,
) -> Result<ImageRef, RenderError> {
    let canvas = render(job, source)?;
    let bytes = encode_jpeg(&canvas, quality)?;
    let filename = export_filename(now_unix_millis());

    let image = store.insert(&filename, JPEG_MIME)?;
    let stored = store
        .write(&image, &bytes)
        .and_then(|()| store.publish(&image));

    if let Err(error) = stored {
        if let Err(rollback) = store.delete(&image) {
            warn!(image = %image, %rollback, "rollback of partial export failed");
        }
        return Err(RenderError::Store(error));
    }

    info!(image = %image, bytes = bytes.len(), "collage exported");
    Ok(image)
}

/// Encodes a canvas as baseline JPEG, dropping alpha.
///
/// # Errors
/// Returns [`RenderError::Encode`] when the encoder rejects the buffer.
pub fn encode_jpeg(canvas: &RgbaImage, quality: u8) -> Result<Vec<u8>, RenderError> {
    let rgb = rgba_to_rgb(canvas.as_raw());
    let mut jpeg_bytes = Vec::new();

    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg_bytes, quality.clamp(1, 100))
        .encode(
            &rgb,
            canvas.width(),
            canvas.height(),
            image::ColorType::Rgb8.into(),
        )
        .map_err(RenderError::Encode)?;

    Ok(jpeg_bytes)
}

/// Export file name for a given Unix-millisecond timestamp.
pub fn export_filename(unix_millis: i64) -> String {
    format!("collage_{unix_millis}.jpg")
}

/// Current time in Unix milliseconds.
pub fn now_unix_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// Size of a preview whose longest edge is `max_dimension_px`.
///
/// Images already within the bound keep their size; each edge is at least 1px.
pub fn preview_dimensions(width: u32, height: u32, max_dimension_px: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest == 0 || longest <= max_dimension_px {
        return (width, height);
    }

    let scale_edge = |edge: u32| {
        let scaled = u64::from(edge) * u64::from(max_dimension_px) / u64::from(longest);
        (scaled as u32).max(1)
    };
    (scale_edge(width), scale_edge(height))
}

/// Downscales `image` to [`preview_dimensions`].
pub fn downscale(image: RgbaImage, max_dimension_px: u32) -> RgbaImage {
    let (width, height) = preview_dimensions(image.width(), image.height(), max_dimension_px);
    if (width, height) == image.dimensions() {
        return image;
    }
    imageops::resize(&image, width, height, FilterType::Triangle)
}

fn validate_canvas(width: u32, height: u32) -> Result<(), RenderError> {
    let within_edges = (1..=MAX_CANVAS_EDGE_PX).contains(&width)
        && (1..=MAX_CANVAS_EDGE_PX).contains(&height);
    if !within_edges || u64::from(width) * u64::from(height) > MAX_CANVAS_PIXELS {
        return Err(RenderError::InvalidCanvas { width, height });
    }
    Ok(())
}

fn draw_slot_image(
    canvas: &mut RgbaImage,
    image: &RgbaImage,
    dst: &SlotRect,
    radius: f32,
    transform: &SlotTransform,
) {
    let crop = source_rect(image.width(), image.height(), dst.width, dst.height, transform);
    if crop.width == 0 || crop.height == 0 {
        draw_placeholder(canvas, dst, radius);
        return;
    }

    let target_w = (dst.width.round() as u32).max(1);
    let target_h = (dst.height.round() as u32).max(1);
    let cropped = imageops::crop_imm(image, crop.x, crop.y, crop.width, crop.height).to_image();
    let sampled = imageops::resize(&cropped, target_w, target_h, FilterType::Triangle);

    let max_x = (target_w - 1) as f32;
    let max_y = (target_h - 1) as f32;
    paint_rounded(canvas, dst, radius, |px, py| {
        let sx = ((px as f32 + 0.5 - dst.left) / dst.width * target_w as f32)
            .floor()
            .clamp(0.0, max_x) as u32;
        let sy = ((py as f32 + 0.5 - dst.top) / dst.height * target_h as f32)
            .floor()
            .clamp(0.0, max_y) as u32;
        sampled.get_pixel(sx, sy).0
    });
}

/// Flat tile with a centered "+" marking an empty slot.
fn draw_placeholder(canvas: &mut RgbaImage, dst: &SlotRect, radius: f32) {
    paint_rounded(canvas, dst, radius, |_, _| PLACEHOLDER_FILL);

    let glyph = (dst.width * 0.06).max(26.0);
    let arm = glyph * 0.6;
    let stroke = (glyph * 0.12).max(2.0);
    let (cx, cy) = dst.center();

    let bars = [
        SlotRect {
            left: cx - arm / 2.0,
            top: cy - stroke / 2.0,
            width: arm,
            height: stroke,
        },
        SlotRect {
            left: cx - stroke / 2.0,
            top: cy - arm / 2.0,
            width: stroke,
            height: arm,
        },
    ];
    for bar in bars {
        if let Some(clipped) = intersect(&bar, dst) {
            paint_rounded(canvas, &clipped, 0.0, |_, _| PLACEHOLDER_GLYPH);
        }
    }
}

/// Paints every canvas pixel covered by the rounded rect `rect`.
///
/// Edge pixels are blended by their analytic coverage.
fn paint_rounded<F>(canvas: &mut RgbaImage, rect: &SlotRect, radius: f32, mut shade: F)
where
    F: FnMut(u32, u32) -> [u8; 4],
{
    let Some((x0, y0, x1, y1)) = pixel_span(rect, canvas.width(), canvas.height()) else {
        return;
    };

    for py in y0..y1 {
        for px in x0..x1 {
            let coverage = rounded_rect_coverage(rect, radius, px as f32 + 0.5, py as f32 + 0.5);
            if coverage <= 0.0 {
                continue;
            }
            let color = shade(px, py);
            blend_pixel(canvas.get_pixel_mut(px, py), color, coverage);
        }
    }
}

fn pixel_span(rect: &SlotRect, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
    if rect.is_empty() {
        return None;
    }
    let x0 = rect.left.floor().max(0.0) as u32;
    let y0 = rect.top.floor().max(0.0) as u32;
    let x1 = rect.right().ceil().clamp(0.0, width as f32) as u32;
    let y1 = rect.bottom().ceil().clamp(0.0, height as f32) as u32;
    (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
}

/// Coverage in `[0, 1]` of the pixel centered at `(x, y)`.
fn rounded_rect_coverage(rect: &SlotRect, radius: f32, x: f32, y: f32) -> f32 {
    let half_w = rect.width / 2.0;
    let half_h = rect.height / 2.0;
    let r = radius.clamp(0.0, half_w.min(half_h));
    let (cx, cy) = rect.center();

    // Signed distance to the rounded rectangle outline, negative inside.
    let qx = (x - cx).abs() - (half_w - r);
    let qy = (y - cy).abs() - (half_h - r);
    let outside = qx.max(0.0).hypot(qy.max(0.0));
    let inside = qx.max(qy).min(0.0);
    let distance = outside + inside - r;

    (0.5 - distance).clamp(0.0, 1.0)
}

fn blend_pixel(dst: &mut Rgba<u8>, src: [u8; 4], coverage: f32) {
    let alpha = f32::from(src[3]) / 255.0 * coverage;
    if alpha >= 1.0 {
        *dst = Rgba(src);
        return;
    }

    let inv = 1.0 - alpha;
    for channel in 0..3 {
        let mixed = f32::from(src[channel]) * alpha + f32::from(dst.0[channel]) * inv;
        dst.0[channel] = mixed.round().clamp(0.0, 255.0) as u8;
    }
    let out_alpha = alpha + f32::from(dst.0[3]) / 255.0 * inv;
    dst.0[3] = (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8;
}

fn intersect(a: &SlotRect, b: &SlotRect) -> Option<SlotRect> {
    let left = a.left.max(b.left);
    let top = a.top.max(b.top);
    let right = a.right().min(b.right());
    let bottom = a.bottom().min(b.bottom());
    (right > left && bottom > top).then_some(SlotRect {
        left,
        top,
        width: right - left,
        height: bottom - top,
    })
}

fn rgba_to_rgb(rgba: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity((rgba.len() / 4) * 3);
    for px in rgba.chunks_exact(4) {
        rgb.extend_from_slice(&px[..3]);
    }
    rgb
}

/// Decodes images from local files.
///
/// Accepts `file://` URIs and plain paths; other schemes decode to `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsImageSource;

impl FsImageSource {
    /// Resolves an image reference to a local path.
    pub fn resolve(image: &ImageRef) -> Option<PathBuf> {
        let raw = image.as_str();
        if raw.starts_with("file:") {
            return Url::parse(raw).ok()?.to_file_path().ok();
        }
        if raw.contains("://") {
            return None;
        }
        Some(PathBuf::from(raw))
    }
}

impl ImageSource for FsImageSource {
    fn decode(&self, image: &ImageRef, max_dimension_px: u32) -> Option<RgbaImage> {
        let path = Self::resolve(image)?;
        match image::open(&path) {
            Ok(decoded) => Some(downscale(decoded.to_rgba8(), max_dimension_px)),
            Err(error) => {
                debug!(image = %image, %error, "image decode failed");
                None
            }
        }
    }
}

/// Directory-backed media store.
///
/// Published files live in `<root>/<album>/`. Pending entries are hidden
/// `.pending-<name>` files that are renamed on publish.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    album_dir: PathBuf,
}

impl DirectoryStore {
    /// Creates a store rooted at `root` that files exports under `album`.
    pub fn new(root: impl AsRef<Path>, album: &str) -> Self {
        Self {
            album_dir: root.as_ref().join(album),
        }
    }

    /// Directory that receives published exports.
    pub fn album_dir(&self) -> &Path {
        &self.album_dir
    }

    fn pending_path(final_path: &Path) -> Option<PathBuf> {
        let name = final_path.file_name()?.to_str()?;
        Some(final_path.with_file_name(format!(".pending-{name}")))
    }

    fn final_path(&self, image: &ImageRef) -> Result<PathBuf, StoreError> {
        let path = PathBuf::from(image.as_str());
        if path.parent() != Some(self.album_dir.as_path()) {
            return Err(StoreError::UnknownEntry(image.to_string()));
        }
        Ok(path)
    }

    /// Picks `name`, or `stem_N.ext` when `name` is already taken.
    fn unused_path(&self, filename: &str) -> Option<PathBuf> {
        let candidate = Path::new(filename);
        let stem = candidate.file_stem()?.to_str()?;
        let ext = candidate.extension().and_then(|ext| ext.to_str());

        (0..1_000).find_map(|n| {
            let name = match (n, ext) {
                (0, _) => filename.to_string(),
                (n, Some(ext)) => format!("{stem}_{n}.{ext}"),
                (n, None) => format!("{stem}_{n}"),
            };
            let path = self.album_dir.join(name);
            let pending = Self::pending_path(&path)?;
            (!path.exists() && !pending.exists()).then_some(path)
        })
    }
}

impl ImageStore for DirectoryStore {
    fn insert(&self, filename: &str, mime_type: &str) -> Result<ImageRef, StoreError> {
        if mime_type != JPEG_MIME {
            return Err(StoreError::UnsupportedMime(mime_type.to_string()));
        }
        if filename.contains(['/', '\\']) || filename.starts_with('.') {
            return Err(StoreError::Rejected(format!("invalid file name: {filename}")));
        }

        fs::create_dir_all(&self.album_dir)?;
        let path = self
            .unused_path(filename)
            .ok_or_else(|| StoreError::Rejected(format!("no free name for {filename}")))?;
        let pending = Self::pending_path(&path)
            .ok_or_else(|| StoreError::Rejected(format!("invalid file name: {filename}")))?;

        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&pending)?;
        Ok(ImageRef::new(path.to_string_lossy().into_owned()))
    }

    fn write(&self, image: &ImageRef, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.final_path(image)?;
        let pending = Self::pending_path(&path)
            .filter(|pending| pending.exists())
            .ok_or_else(|| StoreError::UnknownEntry(image.to_string()))?;
        fs::write(pending, bytes)?;
        Ok(())
    }

    fn publish(&self, image: &ImageRef) -> Result<(), StoreError> {
        let path = self.final_path(image)?;
        let pending = Self::pending_path(&path)
            .filter(|pending| pending.exists())
            .ok_or_else(|| StoreError::UnknownEntry(image.to_string()))?;
        fs::rename(pending, path)?;
        Ok(())
    }

    fn delete(&self, image: &ImageRef) -> Result<(), StoreError> {
        let path = self.final_path(image)?;
        for candidate in [Self::pending_path(&path), Some(path)].into_iter().flatten() {
            match fs::remove_file(&candidate) {
                Ok(()) => {}
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
                Err(error) => return Err(StoreError::Io(error)),
            }
        }
        Ok(())
    }

    fn list_recent(&self, limit: usize) -> Vec<ImageRef> {
        let Ok(entries) = fs::read_dir(&self.album_dir) else {
            return Vec::new();
        };

        let mut published: Vec<(std::time::SystemTime, PathBuf)> = entries
            .filter_map(Result::ok)
            .filter(|entry| !entry.file_name().to_string_lossy().starts_with('.'))
            .filter_map(|entry| {
                let modified = entry.metadata().ok()?.modified().ok()?;
                Some((modified, entry.path()))
            })
            .collect();

        published.sort_by(|a, b| b.cmp(a));
        published
            .into_iter()
            .take(limit)
            .map(|(_, path)| ImageRef::new(path.to_string_lossy().into_owned()))
            .collect()
    }
}

/// Deterministic in-memory decode collaborator for tests and headless use.
#[derive(Debug, Default)]
pub struct MemoryImageSource {
    images: Mutex<HashMap<ImageRef, RgbaImage>>,
}

impl MemoryImageSource {
    /// Creates an empty source; every decode misses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the pixels behind `image`.
    pub fn insert(&self, image: ImageRef, pixels: RgbaImage) {
        if let Ok(mut images) = self.images.lock() {
            images.insert(image, pixels);
        }
    }
}

impl ImageSource for MemoryImageSource {
    fn decode(&self, image: &ImageRef, max_dimension_px: u32) -> Option<RgbaImage> {
        let pixels = self.images.lock().ok()?.get(image).cloned()?;
        Some(downscale(pixels, max_dimension_px))
    }
}

/// Which [`MemoryStore`] step should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreFault {
    /// Every step succeeds.
    #[default]
    None,
    /// `insert` is refused.
    Insert,
    /// `write` fails after the entry was created.
    Write,
    /// `publish` fails after bytes were written.
    Publish,
}

#[derive(Debug, Default)]
struct MemoryStoreState {
    next_id: u64,
    entries: Vec<MemoryEntry>,
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    image: ImageRef,
    filename: String,
    bytes: Vec<u8>,
    published: bool,
}

/// In-memory media store with fault injection.
#[derive(Debug, Default)]
pub struct MemoryStore {
    fault: StoreFault,
    state: Mutex<MemoryStoreState>,
}

impl MemoryStore {
    /// Creates a store where every step succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that fails at `fault`.
    pub fn with_fault(fault: StoreFault) -> Self {
        Self {
            fault,
            state: Mutex::default(),
        }
    }

    /// Number of entries, pending or published.
    pub fn entry_count(&self) -> usize {
        self.state.lock().map_or(0, |state| state.entries.len())
    }

    /// Returns the bytes of a published entry.
    pub fn published_bytes(&self, image: &ImageRef) -> Option<Vec<u8>> {
        let state = self.state.lock().ok()?;
        state
            .entries
            .iter()
            .find(|entry| &entry.image == image && entry.published)
            .map(|entry| entry.bytes.clone())
    }

    /// Returns the file name an entry was stored under.
    pub fn filename(&self, image: &ImageRef) -> Option<String> {
        let state = self.state.lock().ok()?;
        state
            .entries
            .iter()
            .find(|entry| &entry.image == image)
            .map(|entry| entry.filename.clone())
    }

    fn with_entry<T>(
        &self,
        image: &ImageRef,
        f: impl FnOnce(&mut MemoryEntry) -> T,
    ) -> Result<T, StoreError> {
        let mut state = self.state.lock().map_err(|_| poisoned())?;
        let entry = state
            .entries
            .iter_mut()
            .find(|entry| &entry.image == image)
            .ok_or_else(|| StoreError::UnknownEntry(image.to_string()))?;
        Ok(f(entry))
    }
}

fn poisoned() -> StoreError {
    StoreError::Rejected("memory store lock poisoned".to_string())
}

impl ImageStore for MemoryStore {
    fn insert(&self, filename: &str, mime_type: &str) -> Result<ImageRef, StoreError> {
        if self.fault == StoreFault::Insert {
            return Err(StoreError::Rejected("insert refused".to_string()));
        }
        if mime_type != JPEG_MIME {
            return Err(StoreError::UnsupportedMime(mime_type.to_string()));
        }

        let mut state = self.state.lock().map_err(|_| poisoned())?;
        state.next_id += 1;
        let image = ImageRef::new(format!("memory://images/{}", state.next_id));
        state.entries.push(MemoryEntry {
            image: image.clone(),
            filename: filename.to_string(),
            bytes: Vec::new(),
            published: false,
        });
        Ok(image)
    }

    fn write(&self, image: &ImageRef, bytes: &[u8]) -> Result<(), StoreError> {
        if self.fault == StoreFault::Write {
            return Err(StoreError::Rejected("output stream unavailable".to_string()));
        }
        self.with_entry(image, |entry| entry.bytes = bytes.to_vec())
    }

    fn publish(&self, image: &ImageRef) -> Result<(), StoreError> {
        if self.fault == StoreFault::Publish {
            return Err(StoreError::Rejected("publish refused".to_string()));
        }
        self.with_entry(image, |entry| entry.published = true)
    }

    fn delete(&self, image: &ImageRef) -> Result<(), StoreError> {
        let mut state = self.state.lock().map_err(|_| poisoned())?;
        state.entries.retain(|entry| &entry.image != image);
        Ok(())
    }

    fn list_recent(&self, limit: usize) -> Vec<ImageRef> {
        let Ok(state) = self.state.lock() else {
            return Vec::new();
        };
        state
            .entries
            .iter()
            .rev()
            .filter(|entry| entry.published)
            .take(limit)
            .map(|entry| entry.image.clone())
            .collect()
    }
}

/// Storage collaborator error type.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure.
    #[error("storage io failure: {0}")]
    Io(#[from] std::io::Error),
    /// Only JPEG exports are accepted.
    #[error("unsupported mime type: {0}")]
    UnsupportedMime(String),
    /// Reference does not name an entry of this store.
    #[error("unknown storage entry: {0}")]
    UnknownEntry(String),
    /// Store refused the operation.
    #[error("storage refused: {0}")]
    Rejected(String),
}

/// Renderer error type.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Canvas dimensions are zero or exceed the canvas limits.
    #[error("invalid canvas size {width}x{height}")]
    InvalidCanvas {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
    /// JPEG encoding failed.
    #[error("jpeg encoding failed: {0}")]
    Encode(#[source] image::ImageError),
    /// Storage step failed.
    #[error("export storage failed: {0}")]
    Store(#[from] StoreError),
}
