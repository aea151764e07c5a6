//! Property-based invariant tests for `source_rect`.
//!
//! 1. The crop always lies inside the source image.
//! 2. The crop is at least 1px on both axes.
//! 3. The crop keeps the destination aspect ratio up to rounding.
//! 4. Identical inputs give identical outputs.
//! 5. A full pan at scale > 1 ends exactly on the cover crop edge.

use collage_core::SlotTransform;
use collage_layout::{cover_rect, source_rect};
use proptest::prelude::*;

fn transform_strategy() -> impl Strategy<Value = SlotTransform> {
    (1.0f32..=4.0, -1.0f32..=1.0, -1.0f32..=1.0)
        .prop_map(|(scale, x, y)| SlotTransform::new(scale, x, y))
}

proptest! {
    #[test]
    fn crop_stays_inside_source(
        src_w in 1u32..6000,
        src_h in 1u32..6000,
        dst_w in 1.0f32..3000.0,
        dst_h in 1.0f32..3000.0,
        transform in transform_strategy(),
    ) {
        let rect = source_rect(src_w, src_h, dst_w, dst_h, &transform);
        prop_assert!(rect.width >= 1);
        prop_assert!(rect.height >= 1);
        prop_assert!(rect.right() <= src_w);
        prop_assert!(rect.bottom() <= src_h);
    }

    #[test]
    fn crop_stays_inside_cover_crop(
        src_w in 1u32..6000,
        src_h in 1u32..6000,
        dst_w in 1.0f32..3000.0,
        dst_h in 1.0f32..3000.0,
        transform in transform_strategy(),
    ) {
        let base = cover_rect(src_w, src_h, dst_w, dst_h);
        let rect = source_rect(src_w, src_h, dst_w, dst_h, &transform);
        prop_assert!(base.contains_rect(&rect));
    }

    #[test]
    fn crop_keeps_destination_aspect(
        src_w in 1u32..6000,
        src_h in 1u32..6000,
        dst_w in 1.0f32..3000.0,
        dst_h in 1.0f32..3000.0,
        transform in transform_strategy(),
    ) {
        let rect = source_rect(src_w, src_h, dst_w, dst_h, &transform);
        let aspect = f64::from(dst_w) / f64::from(dst_h);
        let width = f64::from(rect.width);
        let height = f64::from(rect.height);
        prop_assert!((width - height * aspect).abs() <= 1.5 + aspect);
        prop_assert!((height - width / aspect).abs() <= 1.5 + 1.0 / aspect);
    }

    #[test]
    fn crop_is_deterministic(
        src_w in 1u32..6000,
        src_h in 1u32..6000,
        dst_w in 1.0f32..3000.0,
        dst_h in 1.0f32..3000.0,
        transform in transform_strategy(),
    ) {
        prop_assert_eq!(
            source_rect(src_w, src_h, dst_w, dst_h, &transform),
            source_rect(src_w, src_h, dst_w, dst_h, &transform)
        );
    }

    #[test]
    fn full_pan_reaches_crop_edge(
        src_w in 1u32..6000,
        src_h in 1u32..6000,
        dst_w in 1.0f32..3000.0,
        dst_h in 1.0f32..3000.0,
        scale in 1.01f32..=4.0,
    ) {
        let base = cover_rect(src_w, src_h, dst_w, dst_h);

        let far = source_rect(src_w, src_h, dst_w, dst_h, &SlotTransform::new(scale, 1.0, 1.0));
        prop_assert_eq!(far.right(), base.right());
        prop_assert_eq!(far.bottom(), base.bottom());

        let near = source_rect(src_w, src_h, dst_w, dst_h, &SlotTransform::new(scale, -1.0, -1.0));
        prop_assert_eq!(near.x, base.x);
        prop_assert_eq!(near.y, base.y);
    }

    #[test]
    fn identity_transform_is_cover_crop(
        src_w in 1u32..6000,
        src_h in 1u32..6000,
        dst_w in 1.0f32..3000.0,
        dst_h in 1.0f32..3000.0,
    ) {
        prop_assert_eq!(
            source_rect(src_w, src_h, dst_w, dst_h, &SlotTransform::default()),
            cover_rect(src_w, src_h, dst_w, dst_h)
        );
    }
}
