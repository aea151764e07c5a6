//! Tests slot placement on the output canvas.

use collage_core::{NormalizedRect, Template, template_by_id, templates};
use collage_layout::{SlotRect, dest_rect, layout_slots};

const EPS: f32 = 1e-3;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() <= EPS
}

fn overlap_area(a: &SlotRect, b: &SlotRect) -> f32 {
    let w = a.right().min(b.right()) - a.left.max(b.left);
    let h = a.bottom().min(b.bottom()) - a.top.max(b.top);
    if w <= EPS || h <= EPS { 0.0 } else { w * h }
}

fn covered(rects: &[SlotRect], x: f32, y: f32) -> bool {
    rects
        .iter()
        .any(|r| x >= r.left && x < r.right() && y >= r.top && y < r.bottom())
}

#[test]
fn dest_rect_tests_two_vertical_splits_canvas_in_half() {
    let template = template_by_id("two_vertical").expect("stock template");
    let rects = layout_slots(template, 1000.0, 1000.0, 0.0);

    assert_eq!(rects[0], SlotRect { left: 0.0, top: 0.0, width: 500.0, height: 1000.0 });
    assert_eq!(rects[1], SlotRect { left: 500.0, top: 0.0, width: 500.0, height: 1000.0 });
}

#[test]
fn dest_rect_tests_spacing_is_split_across_edges() {
    let rect = dest_rect(&NormalizedRect::new(0.5, 0.0, 0.5, 1.0), 1000.0, 1000.0, 14.0);
    assert_eq!(rect.left, 507.0);
    assert_eq!(rect.top, 7.0);
    assert_eq!(rect.width, 486.0);
    assert_eq!(rect.height, 986.0);
    assert_eq!(rect.right(), 993.0);
}

#[test]
fn dest_rect_tests_adjacent_slots_have_uniform_gutter() {
    let template = template_by_id("grid_2x2").expect("stock template");
    let rects = layout_slots(template, 2048.0, 2048.0, 20.0);
    assert!(approx(rects[1].left - rects[0].right(), 20.0));
    assert!(approx(rects[2].top - rects[0].bottom(), 20.0));
    assert!(approx(rects[0].left, 10.0));
}

#[test]
fn dest_rect_tests_oversized_spacing_is_not_guarded() {
    let rect = dest_rect(&NormalizedRect::new(0.0, 0.0, 0.01, 1.0), 1000.0, 1000.0, 30.0);
    assert!(rect.width < 0.0);
    assert!(rect.is_empty());
}

#[test]
fn dest_rect_tests_partitioning_templates_tile_exactly() {
    let canvas = 1000.0_f32;
    for template in templates().iter().filter(|t| t.id != "mosaic") {
        let rects = layout_slots(template, canvas, canvas, 0.0);

        let total: f32 = rects.iter().map(|r| r.width * r.height).sum();
        assert!(
            (total - canvas * canvas).abs() <= 1.0,
            "{} area sum {total}",
            template.id
        );

        for (i, a) in rects.iter().enumerate() {
            for b in rects.iter().skip(i + 1) {
                assert_eq!(overlap_area(a, b), 0.0, "{} slots overlap", template.id);
            }
        }
    }
}

#[test]
fn dest_rect_tests_every_template_leaves_no_gaps() {
    let canvas = 600.0_f32;
    for template in templates() {
        let rects = layout_slots(template, canvas, canvas, 0.0);
        for iy in 0..60 {
            for ix in 0..60 {
                let x = ix as f32 * 10.0 + 5.0;
                let y = iy as f32 * 10.0 + 5.0;
                assert!(covered(&rects, x, y), "{} gap at ({x}, {y})", template.id);
            }
        }
    }
}

#[test]
fn dest_rect_tests_mosaic_right_column_stacks_overlapping_tiles() {
    // The stock mosaic keeps its published fractions: slot 4 sits on top of
    // the lower part of slot 2.
    let template = template_by_id("mosaic").expect("stock template");
    let rects = layout_slots(template, 1000.0, 1000.0, 0.0);
    assert!(approx(overlap_area(&rects[2], &rects[4]), 500.0 * 380.0));
}

#[test]
fn dest_rect_tests_scales_with_canvas_size() {
    let template = Template::new("t", "T", vec![NormalizedRect::new(0.25, 0.5, 0.5, 0.25)]);
    let small = layout_slots(&template, 400.0, 400.0, 0.0)[0];
    let large = layout_slots(&template, 2048.0, 2048.0, 0.0)[0];
    assert!(approx(large.left / 2048.0, small.left / 400.0));
    assert!(approx(large.aspect(), small.aspect()));
}
