//! Integration tests for the capture -> draft -> confirm/cancel flow.

mod common;

use collage_app::Notice;
use collage_capture::{CameraAspect, CaptureFault};
use collage_core::{ImageRef, LensFacing};
use collage_render::StoreFault;
use collage_session::SlotContent;

#[test]
fn capture_flow_tests_capture_stores_draft_with_slot_aspect() {
    let mut fx = common::fixture();
    fx.editor.select_template("three_rows").expect("stock template");

    assert!(fx.editor.capture_into_slot(1));

    let content = &fx.editor.session().slot(1).expect("slot").content;
    let draft = content.draft().expect("draft stored");
    assert!(draft.as_str().ends_with(".jpg"));
    assert_eq!(content.committed(), None);

    let bound = fx.camera.bound_requests();
    assert_eq!(bound.len(), 1);
    assert_eq!(bound[0].aspect, CameraAspect::Ratio16x9);
    assert_eq!(bound[0].lens, LensFacing::Back);
    assert!(fx.editor.take_notices().is_empty());
}

#[test]
fn capture_flow_tests_lens_setting_reaches_backend() {
    let mut fx = common::fixture();
    fx.editor
        .session_mut()
        .update_settings(|settings| settings.lens_facing = settings.lens_facing.toggled());

    fx.editor.capture_into_slot(0);

    assert_eq!(fx.camera.bound_requests()[0].lens, LensFacing::Front);
}

#[test]
fn capture_flow_tests_failure_raises_notice_and_keeps_state() {
    let mut fx = common::fixture_with(StoreFault::None, CaptureFault::Shot);
    let picked = common::register(&fx.images, "picked", common::RED);
    fx.editor.pick_from_gallery(0, picked.clone());
    let version = fx.editor.session().version();

    assert!(!fx.editor.capture_into_slot(0));

    assert_eq!(
        fx.editor.session().slot(0).expect("slot").content,
        SlotContent::Committed(picked)
    );
    assert_eq!(fx.editor.session().version(), version);
    let notices = fx.editor.take_notices();
    assert!(matches!(
        notices.as_slice(),
        [Notice::CaptureFailed { index: 0, .. }]
    ));

    fx.camera.set_fault(CaptureFault::None);
    assert!(fx.editor.capture_into_slot(0), "retry should succeed");
}

#[test]
fn capture_flow_tests_confirm_and_cancel() {
    let mut fx = common::fixture();
    fx.editor.select_template("two_vertical").expect("stock template");

    fx.editor.capture_into_slot(0);
    fx.editor.capture_into_slot(1);
    let draft = fx
        .editor
        .session()
        .slot(0)
        .and_then(|slot| slot.content.draft().cloned())
        .expect("draft");

    assert!(fx.editor.confirm_draft(0));
    assert!(fx.editor.cancel_draft(1));

    assert_eq!(fx.editor.session().slot_images(), vec![Some(draft), None]);
    assert!(!fx.editor.capture_into_slot(5), "stale index is ignored");
}

#[test]
fn capture_flow_tests_triggers_fire_only_after_attach() {
    let mut fx = common::fixture();
    fx.editor.select_template("two_horizontal").expect("stock template");

    fx.editor.session_mut().request_capture(0);
    assert!(fx.editor.attach_camera_to_slot(0));
    assert_eq!(fx.editor.run_pending_captures(), 0);

    fx.editor.session_mut().request_capture(0);
    fx.editor.session_mut().request_capture(1);
    assert_eq!(fx.editor.run_pending_captures(), 1);
    assert!(fx.editor.session().slot(0).expect("slot").content.draft().is_some());
    assert!(fx.editor.session().slot(1).expect("slot").content.is_empty());
}

#[test]
fn capture_flow_tests_crop_and_gallery_paths() {
    let mut fx = common::fixture();
    fx.editor.select_template("two_vertical").expect("stock template");

    fx.editor.capture_into_slot(0);
    let cropped = ImageRef::new("file:///tmp/cropped_1.jpg");
    assert!(fx.editor.apply_crop_result(0, cropped.clone()));
    assert_eq!(
        fx.editor.session().slot(0).expect("slot").content.draft(),
        Some(&cropped)
    );

    let picked = ImageRef::new("file:///gallery/1.jpg");
    assert!(fx.editor.pick_from_gallery(1, picked.clone()));
    let recropped = ImageRef::new("file:///tmp/cropped_2.jpg");
    fx.editor.apply_crop_result(1, recropped.clone());
    assert_eq!(
        fx.editor.session().slot(1).expect("slot").content,
        SlotContent::Committed(recropped)
    );
}

#[test]
fn capture_flow_tests_template_change_targets_first_slot() {
    let mut fx = common::fixture();
    fx.editor.capture_into_slot(0);

    let target = fx.editor.select_template("grid_2x2").expect("stock template");
    assert_eq!(target, 0);
    assert!(fx.editor.select_template("unknown").is_err());
}

#[test]
fn capture_flow_tests_no_camera_raises_notice() {
    let fx = common::fixture();
    let mut editor = collage_app::CollageEditor::new(
        fx.editor.config().clone(),
        Default::default(),
        fx.images.clone(),
        fx.store.clone(),
    );

    assert!(!editor.capture_into_slot(0));
    assert!(matches!(
        editor.take_notices().as_slice(),
        [Notice::CaptureFailed { index: 0, reason }] if reason.contains("no camera")
    ));
}

#[test]
fn capture_flow_tests_advance_skips_filled_and_drafted_slots() {
    let mut fx = common::fixture();
    fx.editor.select_template("grid_2x2").expect("stock template");
    let picked = common::register(&fx.images, "picked", common::RED);
    fx.editor.pick_from_gallery(1, picked);
    fx.editor.capture_into_slot(2);

    assert_eq!(fx.editor.capture_and_advance(0), Some(3));
    assert!(fx.editor.session().slot(0).expect("slot").content.draft().is_some());
}

#[test]
fn capture_flow_tests_advance_goes_idle_after_last_open_slot() {
    let mut fx = common::fixture();
    fx.editor.select_template("two_vertical").expect("stock template");

    assert_eq!(fx.editor.capture_and_advance(1), None);
    assert_eq!(fx.editor.capture_and_advance(5), None);
    assert_eq!(fx.camera.bound_requests().len(), 1);
}

#[test]
fn capture_flow_tests_failed_capture_keeps_camera_on_slot() {
    let mut fx = common::fixture_with(StoreFault::None, CaptureFault::Bind);
    fx.editor.select_template("two_vertical").expect("stock template");

    assert_eq!(fx.editor.capture_and_advance(0), Some(0));
    assert!(fx.editor.session().slot(0).expect("slot").content.is_empty());
}
