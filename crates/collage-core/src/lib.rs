#![warn(missing_docs)]
//! # collage-core
//!
//! ## Purpose
//! Defines the pure data model shared across the `collage` workspace.
//!
//! ## Responsibilities
//! - Represent normalized slot rectangles and named collage templates.
//! - Expose the fixed stock template catalog.
//! - Model per-slot pan/zoom state ([`SlotTransform`]).
//! - Track recency-ordered export history and editor settings.
//!
//! ## Data flow
//! The session controller picks a [`Template`] from [`templates`] and keeps one
//! [`SlotTransform`] per slot. The layout engine turns both into pixel
//! rectangles, and exported images end up in [`RecentExports`].
//!
//! ## Ownership and lifetimes
//! Catalog templates live for the whole process (`&'static`). Everything else
//! is owned and cheap to clone so snapshots can cross async boundaries.
//!
//! ## Error model
//! Parsing and lookup failures return [`CoreError`] variants.
//!
//! ## Example
//! ```rust
//! use collage_core::{default_template, template_by_id, SlotTransform};
//!
//! assert_eq!(default_template().id, "hero_two");
//! assert_eq!(template_by_id("grid_2x2").unwrap().slot_count(), 4);
//! assert!(SlotTransform::default().is_identity());
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Template id selected when a session is first created.
pub const DEFAULT_TEMPLATE_ID: &str = "hero_two";

/// Maximum number of entries kept in [`RecentExports`].
pub const MAX_RECENT_EXPORTS: usize = 24;

/// Smallest allowed zoom factor.
pub const MIN_SCALE: f32 = 1.0;

/// Largest allowed zoom factor.
pub const MAX_SCALE: f32 = 4.0;

/// Rectangle expressed as fractions of the (square) collage canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRect {
    /// Left edge as a fraction of canvas width.
    pub x: f32,
    /// Top edge as a fraction of canvas height.
    pub y: f32,
    /// Width as a fraction of canvas width.
    pub w: f32,
    /// Height as a fraction of canvas height.
    pub h: f32,
}

impl NormalizedRect {
    /// Creates a normalized rectangle.
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Right edge fraction (`x + w`).
    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    /// Bottom edge fraction (`y + h`).
    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    /// Returns `true` when the fractional point lies inside this rectangle.
    ///
    /// Left/top edges are inclusive, right/bottom edges exclusive, so adjacent
    /// slots never both claim a shared edge.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }
}

/// Named collage layout.
///
/// The index of a rectangle in `slots` is the canonical slot index used by the
/// session controller, renderer, and capture triggers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// Unique catalog identifier.
    pub id: String,
    /// Human-readable display name.
    pub name: String,
    /// Ordered slot rectangles.
    pub slots: Vec<NormalizedRect>,
}

impl Template {
    /// Creates a template from its parts.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        slots: Vec<NormalizedRect>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            slots,
        }
    }

    /// Number of slots in this layout.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Returns the slot rectangle at `index`, if any.
    pub fn slot(&self, index: usize) -> Option<&NormalizedRect> {
        self.slots.get(index)
    }
}

static CATALOG: LazyLock<Vec<Template>> = LazyLock::new(build_catalog);

/// Returns the stock template catalog in display order.
pub fn templates() -> &'static [Template] {
    &CATALOG
}

/// Looks up a stock template by id.
pub fn template_by_id(id: &str) -> Option<&'static Template> {
    CATALOG.iter().find(|template| template.id == id)
}

/// Looks up a stock template by id, failing with [`CoreError::UnknownTemplate`].
pub fn require_template(id: &str) -> Result<&'static Template, CoreError> {
    template_by_id(id).ok_or_else(|| CoreError::UnknownTemplate(id.to_string()))
}

/// Returns the template selected for a fresh session (`hero_two`).
pub fn default_template() -> &'static Template {
    template_by_id(DEFAULT_TEMPLATE_ID).unwrap_or(&CATALOG[0])
}

fn build_catalog() -> Vec<Template> {
    const THIRD: f32 = 1.0 / 3.0;
    const TWO_THIRDS: f32 = 2.0 / 3.0;
    let r = NormalizedRect::new;

    // Square (1:1) layouts. Fractions are part of the export contract; the
    // golden fixture under `contracts/fixtures` pins them.
    vec![
        Template::new("solo", "Solo", vec![r(0.0, 0.0, 1.0, 1.0)]),
        Template::new(
            "two_vertical",
            "Split 2",
            vec![r(0.0, 0.0, 0.5, 1.0), r(0.5, 0.0, 0.5, 1.0)],
        ),
        Template::new(
            "two_horizontal",
            "Stack 2",
            vec![r(0.0, 0.0, 1.0, 0.5), r(0.0, 0.5, 1.0, 0.5)],
        ),
        Template::new(
            "three_cols",
            "3 Columns",
            vec![
                r(0.0, 0.0, THIRD, 1.0),
                r(THIRD, 0.0, THIRD, 1.0),
                r(TWO_THIRDS, 0.0, THIRD, 1.0),
            ],
        ),
        Template::new(
            "three_rows",
            "3 Rows",
            vec![
                r(0.0, 0.0, 1.0, THIRD),
                r(0.0, THIRD, 1.0, THIRD),
                r(0.0, TWO_THIRDS, 1.0, THIRD),
            ],
        ),
        Template::new(
            "grid_2x2",
            "Grid 2×2",
            vec![
                r(0.0, 0.0, 0.5, 0.5),
                r(0.5, 0.0, 0.5, 0.5),
                r(0.0, 0.5, 0.5, 0.5),
                r(0.5, 0.5, 0.5, 0.5),
            ],
        ),
        Template::new(
            "hero_two",
            "Hero + 2",
            vec![
                r(0.0, 0.0, 0.65, 1.0),
                r(0.65, 0.0, 0.35, 0.5),
                r(0.65, 0.5, 0.35, 0.5),
            ],
        ),
        Template::new(
            "hero_three",
            "Hero + 3",
            vec![
                r(0.0, 0.0, 0.60, 1.0),
                r(0.60, 0.0, 0.40, THIRD),
                r(0.60, THIRD, 0.40, THIRD),
                r(0.60, TWO_THIRDS, 0.40, THIRD),
            ],
        ),
        Template::new(
            "grid_2x3",
            "Grid 2×3",
            vec![
                r(0.0, 0.0, THIRD, 0.5),
                r(THIRD, 0.0, THIRD, 0.5),
                r(TWO_THIRDS, 0.0, THIRD, 0.5),
                r(0.0, 0.5, THIRD, 0.5),
                r(THIRD, 0.5, THIRD, 0.5),
                r(TWO_THIRDS, 0.5, THIRD, 0.5),
            ],
        ),
        Template::new(
            "mosaic",
            "Mosaic",
            vec![
                r(0.0, 0.0, 0.5, 0.62),
                r(0.5, 0.0, 0.5, 0.38),
                r(0.5, 0.38, 0.5, 0.62),
                r(0.0, 0.62, 0.5, 0.38),
                r(0.5, 0.62, 0.5, 0.38),
            ],
        ),
    ]
}

/// User pan/zoom of a photo within its slot.
///
/// `offset_x`/`offset_y` are fractions of the maximum allowable pan at the
/// current scale, not fractions of the slot size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlotTransform {
    /// Zoom factor in `[1, 4]`; `1` is the plain cover-fit crop.
    pub scale: f32,
    /// Horizontal pan in `[-1, 1]`; `±1` reaches the pan limit.
    pub offset_x: f32,
    /// Vertical pan in `[-1, 1]`; `±1` reaches the pan limit.
    pub offset_y: f32,
}

impl Default for SlotTransform {
    fn default() -> Self {
        Self {
            scale: MIN_SCALE,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

impl SlotTransform {
    /// Creates a transform without clamping.
    pub const fn new(scale: f32, offset_x: f32, offset_y: f32) -> Self {
        Self {
            scale,
            offset_x,
            offset_y,
        }
    }

    /// Returns `true` for the centered, unzoomed transform.
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }

    /// Returns a copy with every field forced into its legal range.
    ///
    /// Non-finite values fall back to the default for that field.
    pub fn clamped(&self) -> Self {
        Self {
            scale: clamp_finite(self.scale, MIN_SCALE, MAX_SCALE, MIN_SCALE),
            offset_x: clamp_finite(self.offset_x, -1.0, 1.0, 0.0),
            offset_y: clamp_finite(self.offset_y, -1.0, 1.0, 0.0),
        }
    }

    /// Applies one pinch/drag gesture step from the live preview.
    ///
    /// `pan_dx`/`pan_dy` are pixel deltas on a slot that is `slot_w` x
    /// `slot_h` pixels on screen. A full-slot drag moves the offset by `2`,
    /// i.e. from one pan limit to the other. Degenerate slot sizes leave the
    /// corresponding offset untouched.
    pub fn apply_gesture(
        &self,
        zoom_change: f32,
        pan_dx: f32,
        pan_dy: f32,
        slot_w: f32,
        slot_h: f32,
    ) -> Self {
        let offset_x = if slot_w > 0.0 {
            self.offset_x + (pan_dx / slot_w) * 2.0
        } else {
            self.offset_x
        };
        let offset_y = if slot_h > 0.0 {
            self.offset_y + (pan_dy / slot_h) * 2.0
        } else {
            self.offset_y
        };

        Self {
            scale: self.scale * zoom_change,
            offset_x,
            offset_y,
        }
        .clamped()
    }
}

fn clamp_finite(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

/// Opaque reference to an image (content URI, file URI, or path).
///
/// Identity is string equality; the thumbnail cache keys on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    /// Wraps a reference string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the underlying reference string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageRef {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ImageRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// One entry of the recent-exports strip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRecord {
    /// Stored export reference.
    pub image: ImageRef,
    /// Position in recency order; `0` is the newest.
    pub rank: usize,
}

/// Most-recent-first, deduplicated, bounded export history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecentExports {
    entries: VecDeque<ImageRef>,
}

impl RecentExports {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `image` as the newest export.
    ///
    /// An equal reference already present is moved to the front instead of
    /// being duplicated; the oldest entries beyond [`MAX_RECENT_EXPORTS`] are
    /// dropped.
    pub fn push(&mut self, image: ImageRef) {
        self.entries.retain(|existing| existing != &image);
        self.entries.push_front(image);
        self.entries.truncate(MAX_RECENT_EXPORTS);
    }

    /// Replaces the history with a newest-first listing from storage.
    pub fn replace_all(&mut self, newest_first: impl IntoIterator<Item = ImageRef>) {
        self.entries.clear();
        for image in newest_first {
            if self.entries.len() == MAX_RECENT_EXPORTS {
                break;
            }
            if !self.entries.contains(&image) {
                self.entries.push_back(image);
            }
        }
    }

    /// Returns ranked records, newest first.
    pub fn records(&self) -> Vec<ExportRecord> {
        self.entries
            .iter()
            .enumerate()
            .map(|(rank, image)| ExportRecord {
                image: image.clone(),
                rank,
            })
            .collect()
    }

    /// Returns the newest export, if any.
    pub fn latest(&self) -> Option<&ImageRef> {
        self.entries.front()
    }

    /// Iterates references newest first.
    pub fn iter(&self) -> impl Iterator<Item = &ImageRef> {
        self.entries.iter()
    }

    /// Returns the number of remembered exports.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no export has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Packed `0xAARRGGBB` color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Argb(pub u32);

impl Argb {
    /// Opaque white.
    pub const WHITE: Self = Self(0xFFFF_FFFF);

    /// Parses `#RRGGBB` or `#AARRGGBB` (leading `#` optional).
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidColor`] for any other shape.
    pub fn parse_hex(raw: &str) -> Result<Self, CoreError> {
        let digits = raw.trim().trim_start_matches('#');
        if !digits.bytes().all(|byte| byte.is_ascii_hexdigit()) {
            return Err(CoreError::InvalidColor(raw.to_string()));
        }
        let value = u32::from_str_radix(digits, 16)
            .map_err(|_| CoreError::InvalidColor(raw.to_string()))?;
        match digits.len() {
            6 => Ok(Self(0xFF00_0000 | value)),
            8 => Ok(Self(value)),
            _ => Err(CoreError::InvalidColor(raw.to_string())),
        }
    }

    /// Returns `[r, g, b, a]` bytes.
    pub fn to_rgba(self) -> [u8; 4] {
        let [a, r, g, b] = self.0.to_be_bytes();
        [r, g, b, a]
    }
}

/// Camera flash behavior applied to every capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashMode {
    /// Never fire.
    Off,
    /// Let the camera decide.
    #[default]
    Auto,
    /// Always fire.
    On,
}

/// Which physical camera to bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LensFacing {
    /// Rear camera.
    #[default]
    Back,
    /// Selfie camera.
    Front,
}

impl LensFacing {
    /// Returns the opposite lens.
    pub fn toggled(self) -> Self {
        match self {
            Self::Back => Self::Front,
            Self::Front => Self::Back,
        }
    }
}

/// Upper bound of the spacing slider.
pub const MAX_SPACING_PX: f32 = 64.0;

/// Upper bound of the corner-radius slider.
pub const MAX_CORNER_RADIUS_PX: f32 = 96.0;

/// Editor-wide look and camera controls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EditorSettings {
    /// Gutter between slots in pixels, `0..=64`.
    pub spacing_px: f32,
    /// Slot corner radius in pixels, `0..=96`.
    pub corner_radius_px: f32,
    /// Canvas background.
    pub background: Argb,
    /// Flash mode used for every slot.
    pub flash_mode: FlashMode,
    /// Lens used for every slot.
    pub lens_facing: LensFacing,
    /// Whether the rule-of-thirds overlay is shown on the camera preview.
    pub grid_overlay: bool,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            spacing_px: 14.0,
            corner_radius_px: 26.0,
            background: Argb(0xFF0B_0F19),
            flash_mode: FlashMode::Auto,
            lens_facing: LensFacing::Back,
            grid_overlay: true,
        }
    }
}

impl EditorSettings {
    /// Sets spacing, clamped to the slider range.
    pub fn set_spacing(&mut self, spacing_px: f32) {
        self.spacing_px = clamp_finite(spacing_px, 0.0, MAX_SPACING_PX, 0.0);
    }

    /// Sets corner radius, clamped to the slider range.
    pub fn set_corner_radius(&mut self, corner_radius_px: f32) {
        self.corner_radius_px = clamp_finite(corner_radius_px, 0.0, MAX_CORNER_RADIUS_PX, 0.0);
    }

    /// Serializes settings to JSON bytes.
    ///
    /// # Errors
    /// Returns [`CoreError::Codec`] when JSON serialization fails.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, CoreError> {
        serde_json::to_vec(self).map_err(CoreError::Codec)
    }

    /// Deserializes settings from JSON bytes, re-clamping slider values.
    ///
    /// # Errors
    /// Returns [`CoreError::Codec`] when JSON decoding fails.
    pub fn from_json_bytes(raw: &[u8]) -> Result<Self, CoreError> {
        let mut settings: Self = serde_json::from_slice(raw).map_err(CoreError::Codec)?;
        settings.set_spacing(settings.spacing_px);
        settings.set_corner_radius(settings.corner_radius_px);
        Ok(settings)
    }
}

/// Error type for core model lookups and codecs.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No stock template has the requested id.
    #[error("unknown template id: {0}")]
    UnknownTemplate(String),
    /// Color string is not `#RRGGBB` / `#AARRGGBB`.
    #[error("invalid color: {0}")]
    InvalidColor(String),
    /// JSON encoding/decoding error.
    #[error("settings codec failure: {0}")]
    Codec(#[from] serde_json::Error),
}
