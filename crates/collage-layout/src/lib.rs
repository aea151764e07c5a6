#![warn(missing_docs)]
//! # collage-layout
//!
//! ## Purpose
//! Maps template rectangles and per-slot pan/zoom into exact pixel
//! rectangles for compositing.
//!
//! ## Responsibilities
//! - Place a slot on a canvas of any size with uniform gutters ([`dest_rect`]).
//! - Compute the cover-fit crop of a source image for a slot ([`cover_rect`]).
//! - Apply zoom and pan to that crop without leaving it ([`source_rect`]).
//!
//! ## Data flow
//! `NormalizedRect` + canvas size -> [`SlotRect`] (canvas pixels).
//! Source dimensions + [`SlotRect`] size + `SlotTransform` -> [`PixelRect`]
//! (source pixels). The renderer stretches the latter into the former.
//!
//! ## Ownership and lifetimes
//! Every function here is pure and works on `Copy` values. The same inputs
//! produce the same rectangles for a 1024px preview and a 2048px export,
//! because pan and zoom are stored as resolution-independent fractions.
//!
//! ## Error model
//! None. Degenerate inputs (zero-sized sources, zero-height destinations)
//! are mapped to safe results instead of failing.

use collage_core::{NormalizedRect, SlotTransform, Template};

/// Slot placement on the output canvas, in (fractional) canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SlotRect {
    /// Left edge.
    pub left: f32,
    /// Top edge.
    pub top: f32,
    /// Width; may be negative when spacing exceeds the slot size.
    pub width: f32,
    /// Height; may be negative when spacing exceeds the slot size.
    pub height: f32,
}

impl SlotRect {
    /// Right edge.
    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    /// Center point `(x, y)`.
    pub fn center(&self) -> (f32, f32) {
        (self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    /// Width over height, `1.0` when the height is not positive.
    pub fn aspect(&self) -> f32 {
        ratio_or_one(self.width, self.height)
    }

    /// Returns `true` when the slot has no drawable area.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Integer rectangle in source-image pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PixelRect {
    /// Left column (inclusive).
    pub x: u32,
    /// Top row (inclusive).
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PixelRect {
    /// Creates a rectangle from origin and size.
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right column (exclusive).
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Bottom row (exclusive).
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Returns `true` when `other` lies fully inside `self`.
    pub fn contains_rect(&self, other: &PixelRect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

/// Places one slot on a `canvas_w` x `canvas_h` canvas.
///
/// Half of `spacing` is taken from each edge, so two adjacent slots end up
/// exactly `spacing` apart and outer slots sit `spacing / 2` from the canvas
/// border. Callers keep `spacing` below the slot's smaller pixel dimension;
/// larger values yield a negative size which is returned as-is.
pub fn dest_rect(rect: &NormalizedRect, canvas_w: f32, canvas_h: f32, spacing: f32) -> SlotRect {
    let half = spacing / 2.0;
    SlotRect {
        left: rect.x * canvas_w + half,
        top: rect.y * canvas_h + half,
        width: rect.w * canvas_w - spacing,
        height: rect.h * canvas_h - spacing,
    }
}

/// Places every slot of `template`, in slot-index order.
pub fn layout_slots(
    template: &Template,
    canvas_w: f32,
    canvas_h: f32,
    spacing: f32,
) -> Vec<SlotRect> {
    template
        .slots
        .iter()
        .map(|rect| dest_rect(rect, canvas_w, canvas_h, spacing))
        .collect()
}

/// Width-over-height of a placed slot; `1.0` when its height is not positive.
///
/// Used to pick the camera aspect that best fits a slot before capture.
pub fn slot_aspect(rect: &NormalizedRect, canvas_w: f32, canvas_h: f32, spacing: f32) -> f32 {
    dest_rect(rect, canvas_w, canvas_h, spacing).aspect()
}

/// Largest centered crop of a `src_w` x `src_h` image matching `dst_w / dst_h`.
///
/// Wider sources keep their full height and lose columns on both sides;
/// taller sources keep their full width and lose rows. The crop is never
/// smaller than 1px on either axis. Zero-sized sources yield an empty rect.
pub fn cover_rect(src_w: u32, src_h: u32, dst_w: f32, dst_h: f32) -> PixelRect {
    if src_w == 0 || src_h == 0 {
        return PixelRect::default();
    }

    let src_aspect = f64::from(src_w) / f64::from(src_h);
    let dst_aspect = f64::from(ratio_or_one(dst_w, dst_h));

    if src_aspect > dst_aspect {
        let new_w = round_px(f64::from(src_h) * dst_aspect).clamp(1, i64::from(src_w));
        let x_off = (i64::from(src_w) - new_w) / 2;
        to_pixel_rect(x_off, 0, new_w, i64::from(src_h))
    } else {
        let new_h = round_px(f64::from(src_w) / dst_aspect).clamp(1, i64::from(src_h));
        let y_off = (i64::from(src_h) - new_h) / 2;
        to_pixel_rect(0, y_off, i64::from(src_w), new_h)
    }
}

/// Computes the source sub-rectangle to stretch into a `dst_w` x `dst_h` slot.
///
/// 1. Start from [`cover_rect`] (no letterboxing).
/// 2. Shrink it by `transform.scale` (re-clamped to `[1, 4]`), keeping at least
///    1px per axis.
/// 3. Move the shrunk rect's center by `offset * max_pan`, where `max_pan` is
///    half of the size lost to zoom, so `offset = ±1` lands exactly on the
///    cover crop's edge.
/// 4. Slide (never shrink) the result back inside the cover crop, one axis at
///    a time.
pub fn source_rect(
    src_w: u32,
    src_h: u32,
    dst_w: f32,
    dst_h: f32,
    transform: &SlotTransform,
) -> PixelRect {
    let base = cover_rect(src_w, src_h, dst_w, dst_h);
    if base.width == 0 || base.height == 0 {
        return base;
    }

    let transform = transform.clamped();
    let scale = f64::from(transform.scale);

    let (left, zoom_w) = zoom_axis(base.x, base.width, scale, transform.offset_x);
    let (top, zoom_h) = zoom_axis(base.y, base.height, scale, transform.offset_y);

    to_pixel_rect(left, top, zoom_w, zoom_h)
}

/// Zooms and pans one axis of the cover crop; returns `(start, length)`.
fn zoom_axis(base_start: u32, base_len: u32, scale: f64, offset: f32) -> (i64, i64) {
    let base_start = i64::from(base_start);
    let base_len = i64::from(base_len);

    let zoom_len = round_px(base_len as f64 / scale).clamp(1, base_len);

    // Centered start plus `offset * max_pan`, with `max_pan = slack / 2`,
    // rounded once so `offset = ±1` hits the edge exactly.
    let slack = (base_len - zoom_len) as f64;
    let start = base_start + round_px(slack * (1.0 + f64::from(offset)) / 2.0);

    (slide_into(start, zoom_len, base_start, base_start + base_len), zoom_len)
}

/// Shifts `[start, start + len)` into `[min, max)` without changing `len`.
fn slide_into(start: i64, len: i64, min: i64, max: i64) -> i64 {
    let mut start = start;
    if start < min {
        start = min;
    }
    if start + len > max {
        start = max - len;
    }
    start
}

fn round_px(value: f64) -> i64 {
    value.round() as i64
}

fn ratio_or_one(numerator: f32, denominator: f32) -> f32 {
    if denominator > 0.0 && numerator.is_finite() && denominator.is_finite() {
        numerator / denominator
    } else {
        1.0
    }
}

fn to_pixel_rect(x: i64, y: i64, width: i64, height: i64) -> PixelRect {
    // Invariant: callers only pass values inside a `u32` source image.
    let clamp = |value: i64| value.clamp(0, i64::from(u32::MAX)) as u32;
    PixelRect::new(clamp(x), clamp(y), clamp(width), clamp(height))
}
