//! Shared fixtures for renderer integration tests.

use collage_core::{ImageRef, SlotTransform, Template};
use collage_render::{RenderJob, RenderStyle};
use image::{Rgba, RgbaImage};

pub const RED: [u8; 4] = [220, 30, 30, 255];
pub const BLUE: [u8; 4] = [30, 30, 220, 255];
pub const PLACEHOLDER: [u8; 4] = [0xEF, 0xEF, 0xEF, 0xFF];

/// Solid-color image.
#[allow(dead_code)]
pub fn solid(width: u32, height: u32, color: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba(color))
}

/// Image whose left half is blue and right half is red.
#[allow(dead_code)]
pub fn split_blue_red(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, _| {
        if x < width / 2 { Rgba(BLUE) } else { Rgba(RED) }
    })
}

/// Per-channel comparison tolerant to resampling rounding.
#[allow(dead_code)]
pub fn close(actual: [u8; 4], expected: [u8; 4]) -> bool {
    actual
        .iter()
        .zip(expected.iter())
        .all(|(a, b)| a.abs_diff(*b) <= 3)
}

/// Builds a render job over borrowed session state.
#[allow(dead_code)]
pub fn job<'a>(
    template: &'a Template,
    images: &'a [Option<ImageRef>],
    transforms: &'a [SlotTransform],
    style: RenderStyle,
    size: u32,
) -> RenderJob<'a> {
    RenderJob {
        template,
        slot_images: images,
        slot_transforms: transforms,
        style,
        width: size,
        height: size,
    }
}
