#![warn(missing_docs)]
//! # collage-capture
//!
//! ## Purpose
//! Defines the still-capture contract the editor drives for camera slots.
//!
//! ## Responsibilities
//! - Define a backend-agnostic bind/capture trait.
//! - Pick the camera aspect ratio closest to a slot's shape.
//! - Track per-slot "take a photo now" trigger counters.
//! - Provide a file-copy backend for headless use and a deterministic
//!   synthetic backend for tests.
//!
//! ## Data flow
//! Editor settings + slot aspect -> [`CaptureRequest`] -> backend `bind` ->
//! [`CaptureHandle`] -> backend `capture` -> temp-file `ImageRef` that the
//! editor stores as the slot's draft.
//!
//! ## Ownership and lifetimes
//! Handles are plain values owned by the caller. Captured stills are files
//! named `cap_<unix-millis>.jpg`; this crate never holds pixel data.
//!
//! ## Error model
//! Bind and shot failures are reported as [`CaptureError`] values. They are
//! recoverable: the caller surfaces a notice and the user may retry.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use collage_core::{EditorSettings, FlashMode, ImageRef, LensFacing};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

/// Still-capture aspect ratios supported by camera backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CameraAspect {
    /// 4:3, the sensor-native ratio on most devices.
    #[default]
    Ratio4x3,
    /// 16:9.
    Ratio16x9,
}

impl CameraAspect {
    /// Long-edge over short-edge ratio.
    pub fn ratio(self) -> f32 {
        match self {
            Self::Ratio4x3 => 4.0 / 3.0,
            Self::Ratio16x9 => 16.0 / 9.0,
        }
    }
}

/// Returns the supported camera aspect closest to `slot_aspect` (width / height).
///
/// Ties go to 4:3. Non-finite input is treated as a square slot.
pub fn closest_camera_aspect(slot_aspect: f32) -> CameraAspect {
    let aspect = if slot_aspect.is_finite() {
        slot_aspect
    } else {
        1.0
    };
    let to_4x3 = (aspect - CameraAspect::Ratio4x3.ratio()).abs();
    let to_16x9 = (aspect - CameraAspect::Ratio16x9.ratio()).abs();
    if to_4x3 <= to_16x9 {
        CameraAspect::Ratio4x3
    } else {
        CameraAspect::Ratio16x9
    }
}

/// Configuration a backend is bound with before taking a still.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CaptureRequest {
    /// Which camera to use.
    pub lens: LensFacing,
    /// Flash behavior for the shot.
    pub flash: FlashMode,
    /// Output aspect ratio.
    pub aspect: CameraAspect,
}

impl CaptureRequest {
    /// Builds a request from the current editor settings and the target
    /// slot's aspect ratio.
    pub fn for_slot(settings: &EditorSettings, slot_aspect: f32) -> Self {
        Self {
            lens: settings.lens_facing,
            flash: settings.flash_mode,
            aspect: closest_camera_aspect(slot_aspect),
        }
    }
}

/// Opaque binding returned by [`CaptureBackend::bind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureHandle {
    /// Backend-assigned binding id.
    pub id: u64,
    /// Configuration the backend was bound with.
    pub request: CaptureRequest,
}

/// Trait implemented by concrete camera providers.
pub trait CaptureBackend: Send + Sync {
    /// Binds the camera with `request`.
    ///
    /// # Errors
    /// Returns [`CaptureError::Bind`] when the lens cannot be opened.
    fn bind(&self, request: CaptureRequest) -> Result<CaptureHandle, CaptureError>;

    /// Takes one still with a previously bound handle.
    ///
    /// # Errors
    /// Returns [`CaptureError::Shot`] or [`CaptureError::Io`] when no file
    /// was produced.
    fn capture(&self, handle: &CaptureHandle) -> Result<ImageRef, CaptureError>;
}

/// Binds `backend` and takes one still.
///
/// # Errors
/// Propagates the first bind or shot failure.
pub fn capture_still(
    backend: &dyn CaptureBackend,
    request: CaptureRequest,
) -> Result<ImageRef, CaptureError> {
    let handle = backend.bind(request).inspect_err(|error| {
        warn!(%error, lens = ?request.lens, "camera bind failed");
    })?;
    let image = backend.capture(&handle).inspect_err(|error| {
        warn!(%error, binding = handle.id, "still capture failed");
    })?;
    info!(image = %image, aspect = ?request.aspect, "still captured");
    Ok(image)
}

/// Temp file name for a camera still taken at `unix_millis`.
pub fn capture_filename(unix_millis: i64) -> String {
    format!("cap_{unix_millis}.jpg")
}

/// Current wall-clock time in unix milliseconds.
pub fn now_unix_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// Per-slot capture trigger counters.
///
/// Requesting a shot increments the slot's counter. A backend attached to
/// the slot consumes increments through [`CaptureTriggers::poll`]. Requests
/// made while nothing is attached are dropped, not queued: attaching
/// records the current counter as the baseline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureTriggers {
    requested: Vec<u64>,
    consumed: Vec<Option<u64>>,
}

impl CaptureTriggers {
    /// Creates counters for `slot_count` slots, none attached.
    pub fn new(slot_count: usize) -> Self {
        Self {
            requested: vec![0; slot_count],
            consumed: vec![None; slot_count],
        }
    }

    /// Number of slots tracked.
    pub fn slot_count(&self) -> usize {
        self.requested.len()
    }

    /// Current counter value for `index`.
    pub fn counter(&self, index: usize) -> Option<u64> {
        self.requested.get(index).copied()
    }

    /// Signals "take one photo now" for `index`.
    ///
    /// Returns `false` for out-of-range indices.
    pub fn request(&mut self, index: usize) -> bool {
        match self.requested.get_mut(index) {
            Some(counter) => {
                *counter = counter.wrapping_add(1);
                true
            }
            None => false,
        }
    }

    /// Attaches a backend to `index`, ignoring earlier requests.
    pub fn attach(&mut self, index: usize) -> bool {
        let Some(current) = self.requested.get(index).copied() else {
            return false;
        };
        self.consumed[index] = Some(current);
        true
    }

    /// Detaches the backend from `index`.
    pub fn detach(&mut self, index: usize) {
        if let Some(consumed) = self.consumed.get_mut(index) {
            *consumed = None;
        }
    }

    /// Returns `true` when a backend is attached to `index`.
    pub fn is_attached(&self, index: usize) -> bool {
        matches!(self.consumed.get(index), Some(Some(_)))
    }

    /// Consumes pending requests for an attached slot.
    ///
    /// Returns how many shots were requested since the last poll; `0` when
    /// nothing is pending or no backend is attached.
    pub fn poll(&mut self, index: usize) -> u64 {
        let (Some(requested), Some(Some(consumed))) =
            (self.requested.get(index).copied(), self.consumed.get_mut(index))
        else {
            return 0;
        };
        let pending = requested.wrapping_sub(*consumed);
        *consumed = requested;
        pending
    }
}

/// Backend that "captures" by copying a fixed still into a capture directory.
///
/// Used by the headless editor and demos where no camera is present.
#[derive(Debug)]
pub struct StillFileBackend {
    still: PathBuf,
    capture_dir: PathBuf,
    next_binding: Mutex<u64>,
}

impl StillFileBackend {
    /// Creates a backend copying `still` into `capture_dir` on every shot.
    pub fn new(still: impl Into<PathBuf>, capture_dir: impl Into<PathBuf>) -> Self {
        Self {
            still: still.into(),
            capture_dir: capture_dir.into(),
            next_binding: Mutex::new(0),
        }
    }

    /// Directory receiving captured stills.
    pub fn capture_dir(&self) -> &Path {
        &self.capture_dir
    }

    fn unused_target(&self) -> PathBuf {
        let millis = now_unix_millis();
        let mut target = self.capture_dir.join(capture_filename(millis));
        let mut bump = 1;
        while target.exists() {
            target = self.capture_dir.join(capture_filename(millis + bump));
            bump += 1;
        }
        target
    }
}

impl CaptureBackend for StillFileBackend {
    fn bind(&self, request: CaptureRequest) -> Result<CaptureHandle, CaptureError> {
        if !self.still.is_file() {
            return Err(CaptureError::Bind(format!(
                "still source is missing: {}",
                self.still.display()
            )));
        }
        let mut next = self
            .next_binding
            .lock()
            .map_err(|_| CaptureError::Bind("binding counter lock poisoned".to_string()))?;
        *next += 1;
        Ok(CaptureHandle { id: *next, request })
    }

    fn capture(&self, handle: &CaptureHandle) -> Result<ImageRef, CaptureError> {
        fs::create_dir_all(&self.capture_dir)?;
        let target = self.unused_target();
        fs::copy(&self.still, &target)?;
        debug!(binding = handle.id, target = %target.display(), "still copied");
        Ok(ImageRef::new(target.to_string_lossy().into_owned()))
    }
}

/// Which step of [`SyntheticCaptureBackend`] should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureFault {
    /// Every step succeeds.
    #[default]
    None,
    /// `bind` fails.
    Bind,
    /// `capture` fails after a successful bind.
    Shot,
}

#[derive(Debug, Default)]
struct SyntheticState {
    sequence: u64,
    fault: CaptureFault,
    binds: Vec<CaptureRequest>,
}

/// Deterministic synthetic backend for test and CI usage.
///
/// Shots yield `synthetic://capture/<n>/cap_<n>.jpg` references without
/// touching the filesystem.
#[derive(Debug, Default)]
pub struct SyntheticCaptureBackend {
    state: Mutex<SyntheticState>,
}

impl SyntheticCaptureBackend {
    /// Creates a backend where every step succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend failing at `fault`.
    pub fn with_fault(fault: CaptureFault) -> Self {
        let backend = Self::new();
        backend.set_fault(fault);
        backend
    }

    /// Switches the injected fault, e.g. to model a retry that succeeds.
    pub fn set_fault(&self, fault: CaptureFault) {
        if let Ok(mut state) = self.state.lock() {
            state.fault = fault;
        }
    }

    /// Requests the backend has been bound with, oldest first.
    pub fn bound_requests(&self) -> Vec<CaptureRequest> {
        self.state
            .lock()
            .map(|state| state.binds.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, SyntheticState>, CaptureError> {
        self.state
            .lock()
            .map_err(|_| CaptureError::Shot("synthetic state lock poisoned".to_string()))
    }
}

impl CaptureBackend for SyntheticCaptureBackend {
    fn bind(&self, request: CaptureRequest) -> Result<CaptureHandle, CaptureError> {
        let mut state = self.lock()?;
        if state.fault == CaptureFault::Bind {
            return Err(CaptureError::Bind("synthetic lens unavailable".to_string()));
        }
        state.binds.push(request);
        Ok(CaptureHandle {
            id: state.binds.len() as u64,
            request,
        })
    }

    fn capture(&self, _handle: &CaptureHandle) -> Result<ImageRef, CaptureError> {
        let mut state = self.lock()?;
        if state.fault == CaptureFault::Shot {
            return Err(CaptureError::Shot("synthetic shutter jammed".to_string()));
        }
        state.sequence += 1;
        let n = state.sequence;
        Ok(ImageRef::new(format!(
            "synthetic://capture/{n}/{}",
            capture_filename(n as i64)
        )))
    }
}

/// Capture layer error type.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The camera could not be bound with the requested configuration.
    #[error("camera bind failed: {0}")]
    Bind(String),
    /// The shot failed after a successful bind.
    #[error("still capture failed: {0}")]
    Shot(String),
    /// Writing the captured file failed.
    #[error("capture file I/O failed: {0}")]
    Io(#[from] std::io::Error),
}
