#![warn(missing_docs)]
//! # collage-app
//!
//! ## Purpose
//! Orchestrates session state, camera capture, thumbnail decode, and export
//! for the collage editor.
//!
//! ## Responsibilities
//! - Drive the capture -> draft -> confirm/cancel flow per slot.
//! - Apply gallery picks and crop results.
//! - Load slot thumbnails through the session's last-requested-wins tickets.
//! - Export the collage, record it in history, and raise user notices.
//! - Load export configuration from the environment.
//!
//! ## Data flow
//! UI events -> [`CollageEditor`] -> `CollageSession` mutations; capture and
//! decode go through collaborator traits; export renders a session snapshot
//! into the image store -> [`Notice`] for the UI.
//!
//! ## Ownership and lifetimes
//! The editor owns the session and holds collaborators behind `Arc` so the
//! same store or decoder can be shared with other components.
//!
//! ## Error model
//! Capture and export failures become [`Notice`] values and leave the
//! session usable. Setup failures (unknown template, bad canvas) are
//! returned as [`AppError`].

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use collage_capture::{CaptureBackend, CaptureRequest, capture_still};
use collage_core::{CoreError, EditorSettings, ImageRef, MAX_RECENT_EXPORTS, templates};
use collage_layout::slot_aspect;
use collage_render::{
    DEFAULT_ALBUM, DirectoryStore, EXPORT_JPEG_QUALITY, FsImageSource, ImageSource, ImageStore,
    RenderError, RenderJob, RenderStyle, render, render_and_save,
};
use collage_session::{CollageSession, Thumbnail, ThumbnailLookup};
use image::RgbaImage;
use thiserror::Error;
use tracing::{info, warn};

/// Build-time application version loaded from root `VERSION` file.
pub const APP_VERSION: &str = env!("COLLAGE_VERSION");

/// Default square export edge in pixels.
pub const DEFAULT_EXPORT_SIZE_PX: u32 = 2048;

/// Largest accepted export edge in pixels.
pub const MAX_EXPORT_SIZE_PX: u32 = 8192;

/// Default longest edge of decoded slot thumbnails.
pub const DEFAULT_THUMBNAIL_MAX_PX: u32 = 1024;

/// Returns the app version sourced from root `VERSION`.
pub fn app_version() -> &'static str {
    APP_VERSION
}

/// Export and decode configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    /// Square export edge in pixels.
    pub size_px: u32,
    /// JPEG quality, 1..=100.
    pub jpeg_quality: u8,
    /// Album sub-directory under the store root.
    pub album: String,
    /// Longest edge of decoded slot thumbnails.
    pub thumbnail_max_px: u32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            size_px: DEFAULT_EXPORT_SIZE_PX,
            jpeg_quality: EXPORT_JPEG_QUALITY,
            album: DEFAULT_ALBUM.to_string(),
            thumbnail_max_px: DEFAULT_THUMBNAIL_MAX_PX,
        }
    }
}

impl ExportConfig {
    /// Reads overrides from the process environment.
    ///
    /// Semantics:
    /// - `COLLAGE_EXPORT_SIZE_PX`: integer in `1..=8192`.
    /// - `COLLAGE_JPEG_QUALITY`: integer in `1..=100`.
    /// - `COLLAGE_ALBUM`: relative path without `..` components.
    ///
    /// Unset or invalid values keep the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ExportConfig::from_env`] with a caller-provided lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let size_px = lookup("COLLAGE_EXPORT_SIZE_PX")
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|size| is_valid_export_size(*size))
            .unwrap_or(defaults.size_px);

        let jpeg_quality = lookup("COLLAGE_JPEG_QUALITY")
            .and_then(|raw| raw.trim().parse::<u8>().ok())
            .filter(|quality| (1..=100).contains(quality))
            .unwrap_or(defaults.jpeg_quality);

        let album = lookup("COLLAGE_ALBUM")
            .map(|raw| raw.trim().to_string())
            .filter(|album| is_safe_album(album))
            .unwrap_or(defaults.album);

        Self {
            size_px,
            jpeg_quality,
            album,
            thumbnail_max_px: defaults.thumbnail_max_px,
        }
    }

    /// Replaces the export edge with a caller-provided override.
    ///
    /// # Errors
    /// Returns [`AppError::InvalidExportSize`] outside `1..=MAX_EXPORT_SIZE_PX`,
    /// the same range [`ExportConfig::from_lookup`] accepts.
    pub fn with_size_px(mut self, size_px: u32) -> Result<Self, AppError> {
        if !is_valid_export_size(size_px) {
            return Err(AppError::InvalidExportSize(size_px));
        }
        self.size_px = size_px;
        Ok(self)
    }
}

fn is_valid_export_size(size_px: u32) -> bool {
    (1..=MAX_EXPORT_SIZE_PX).contains(&size_px)
}

fn is_safe_album(album: &str) -> bool {
    let path = PathBuf::from(album);
    !album.is_empty()
        && path.is_relative()
        && path
            .components()
            .all(|part| matches!(part, std::path::Component::Normal(_)))
}

/// Transient user-facing message raised by editor flows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The camera could not bind or the shot failed; the user may retry.
    CaptureFailed {
        /// Target slot.
        index: usize,
        /// Human-readable cause.
        reason: String,
    },
    /// The collage was stored.
    ExportSaved(ImageRef),
    /// The collage could not be stored.
    ExportFailed,
}

/// Collage editor: session plus collaborators.
pub struct CollageEditor {
    session: CollageSession,
    images: Arc<dyn ImageSource>,
    store: Arc<dyn ImageStore>,
    camera: Option<Arc<dyn CaptureBackend>>,
    config: ExportConfig,
    notices: VecDeque<Notice>,
}

impl std::fmt::Debug for CollageEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollageEditor")
            .field("session", &self.session)
            .field("camera_bound", &self.camera.is_some())
            .field("config", &self.config)
            .field("notices", &self.notices)
            .finish_non_exhaustive()
    }
}

impl CollageEditor {
    /// Creates an editor without a camera.
    pub fn new(
        config: ExportConfig,
        settings: EditorSettings,
        images: Arc<dyn ImageSource>,
        store: Arc<dyn ImageStore>,
    ) -> Self {
        Self {
            session: CollageSession::new(settings),
            images,
            store,
            camera: None,
            config,
            notices: VecDeque::new(),
        }
    }

    /// Attaches a camera backend.
    pub fn with_camera(mut self, camera: Arc<dyn CaptureBackend>) -> Self {
        self.camera = Some(camera);
        self
    }

    /// Editing session.
    pub fn session(&self) -> &CollageSession {
        &self.session
    }

    /// Mutable editing session, for transforms and settings.
    pub fn session_mut(&mut self) -> &mut CollageSession {
        &mut self.session
    }

    /// Active export configuration.
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Drains pending notices, oldest first.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    /// Activates a stock template and returns the slot the camera should
    /// open on: the first slot with no image and no draft, else `0`.
    ///
    /// # Errors
    /// Returns [`AppError::Core`] when `id` is not a stock template.
    pub fn select_template(&mut self, id: &str) -> Result<usize, AppError> {
        self.session.select_template(id)?;
        Ok(self.session.first_open_slot())
    }

    /// Reloads export history from the image store.
    pub fn load_recent_exports(&mut self) {
        let recent = self.store.list_recent(MAX_RECENT_EXPORTS);
        self.session.restore_exports(recent);
    }

    /// Takes one still for slot `index` and stores it as the slot's draft.
    ///
    /// Returns `true` when a draft was stored. Failures raise
    /// [`Notice::CaptureFailed`] and leave the slot untouched.
    pub fn capture_into_slot(&mut self, index: usize) -> bool {
        let Some(rect) = self.session.template().slot(index).copied() else {
            return false;
        };
        let Some(camera) = self.camera.clone() else {
            self.notices.push_back(Notice::CaptureFailed {
                index,
                reason: "no camera attached".to_string(),
            });
            return false;
        };

        let canvas = self.config.size_px as f32;
        let settings = *self.session.settings();
        let aspect = slot_aspect(&rect, canvas, canvas, settings.spacing_px);
        let request = CaptureRequest::for_slot(&settings, aspect);

        match capture_still(camera.as_ref(), request) {
            Ok(draft) => self.session.set_draft(index, draft),
            Err(error) => {
                self.notices.push_back(Notice::CaptureFailed {
                    index,
                    reason: error.to_string(),
                });
                false
            }
        }
    }

    /// Captures into slot `index` and returns the slot the camera should
    /// target next.
    ///
    /// After a stored draft this is the next open slot after `index`, or
    /// `None` when every later slot already holds an image or draft, which
    /// leaves the camera idle. A failed capture keeps the camera on `index`.
    pub fn capture_and_advance(&mut self, index: usize) -> Option<usize> {
        if index >= self.session.slot_count() {
            return None;
        }
        if !self.capture_into_slot(index) {
            return Some(index);
        }
        self.session.next_open_slot_after(index)
    }

    /// Binds the camera to slot `index` for trigger-driven capture.
    pub fn attach_camera_to_slot(&mut self, index: usize) -> bool {
        self.session.capture_triggers_mut().attach(index)
    }

    /// Runs one capture for every attached slot with pending trigger
    /// requests; returns how many drafts were stored.
    ///
    /// Several requests for one slot collapse into a single shot, since each
    /// shot replaces the slot's draft.
    pub fn run_pending_captures(&mut self) -> usize {
        let pending: Vec<usize> = (0..self.session.slot_count())
            .filter(|index| self.session.capture_triggers_mut().poll(*index) > 0)
            .collect();
        pending
            .into_iter()
            .filter(|index| self.capture_into_slot(*index))
            .count()
    }

    /// Promotes slot `index`'s draft.
    pub fn confirm_draft(&mut self, index: usize) -> bool {
        self.session.confirm_draft(index)
    }

    /// Discards slot `index`'s draft.
    pub fn cancel_draft(&mut self, index: usize) -> bool {
        self.session.cancel_draft(index)
    }

    /// Applies a crop result: replaces a pending draft, else commits.
    pub fn apply_crop_result(&mut self, index: usize, image: ImageRef) -> bool {
        self.session.apply_crop_result(index, image)
    }

    /// Commits a gallery pick to slot `index`.
    pub fn pick_from_gallery(&mut self, index: usize, image: ImageRef) -> bool {
        self.session.set_slot_image(index, image)
    }

    /// Returns slot `index`'s thumbnail, decoding it on a cache miss.
    ///
    /// `None` when the slot is empty, the decode failed, or the result was
    /// superseded while decoding.
    pub fn load_thumbnail(&mut self, index: usize) -> Option<Thumbnail> {
        match self.session.thumbnail(index) {
            ThumbnailLookup::NoImage => None,
            ThumbnailLookup::Cached(thumbnail) => Some(thumbnail),
            ThumbnailLookup::Load(ticket) => {
                let decoded = self
                    .images
                    .decode(&ticket.image, self.config.thumbnail_max_px)
                    .map(Arc::new);
                let accepted = self
                    .session
                    .complete_thumbnail_load(ticket, decoded.clone());
                if accepted { decoded } else { None }
            }
        }
    }

    /// Renders the collage at `size_px` square for on-screen preview.
    ///
    /// Uses the same images and transforms as [`CollageEditor::export`].
    ///
    /// # Errors
    /// Returns [`AppError::Render`] for a zero or oversized canvas.
    pub fn render_preview(&self, size_px: u32) -> Result<RgbaImage, AppError> {
        let images = self.session.export_images();
        let transforms = self.session.slot_transforms();
        let job = RenderJob {
            template: self.session.template(),
            slot_images: &images,
            slot_transforms: &transforms,
            style: RenderStyle::from(self.session.settings()),
            width: size_px,
            height: size_px,
        };
        Ok(render(&job, self.images.as_ref())?)
    }

    /// Renders and stores the collage at the configured export size.
    ///
    /// Each slot uses its committed image, else its draft. On success the
    /// export is recorded in history and [`Notice::ExportSaved`] is raised;
    /// otherwise [`Notice::ExportFailed`].
    pub fn export(&mut self) -> Option<ImageRef> {
        let images = self.session.export_images();
        let transforms = self.session.slot_transforms();
        let job = RenderJob {
            template: self.session.template(),
            slot_images: &images,
            slot_transforms: &transforms,
            style: RenderStyle::from(self.session.settings()),
            width: self.config.size_px,
            height: self.config.size_px,
        };

        let saved = render_and_save(
            &job,
            self.images.as_ref(),
            self.store.as_ref(),
            self.config.jpeg_quality,
        );

        match saved {
            Some(image) => {
                info!(template = %self.session.template().id, image = %image, "export saved");
                self.session.record_export(image.clone());
                self.notices.push_back(Notice::ExportSaved(image.clone()));
                Some(image)
            }
            None => {
                warn!(template = %self.session.template().id, "export failed");
                self.notices.push_back(Notice::ExportFailed);
                None
            }
        }
    }
}

/// One `id  slots  name` line per stock template, in catalog order.
pub fn template_listing() -> Vec<String> {
    templates()
        .iter()
        .map(|template| {
            format!(
                "{:<16}{:>2}  {}",
                template.id,
                template.slot_count(),
                template.name
            )
        })
        .collect()
}

/// Fills `template_id`'s slots with `images` in order and exports the
/// collage into `<store_root>/<album>`.
///
/// # Errors
/// Returns [`AppError::InvalidExportSize`] for an export edge outside
/// `1..=MAX_EXPORT_SIZE_PX`, [`AppError::Core`] for an unknown template,
/// [`AppError::TooManyImages`] when `images` outnumber the slots, and
/// [`AppError::ExportFailed`] when nothing was stored.
pub fn export_files(
    template_id: &str,
    images: &[PathBuf],
    store_root: &Path,
    config: ExportConfig,
    settings: EditorSettings,
) -> Result<ImageRef, AppError> {
    if !is_valid_export_size(config.size_px) {
        return Err(AppError::InvalidExportSize(config.size_px));
    }
    let store = DirectoryStore::new(store_root, &config.album);
    let mut editor = CollageEditor::new(config, settings, Arc::new(FsImageSource), Arc::new(store));
    editor.select_template(template_id)?;

    let slots = editor.session().slot_count();
    if images.len() > slots {
        return Err(AppError::TooManyImages {
            template: template_id.to_string(),
            slots,
            images: images.len(),
        });
    }
    for (index, path) in images.iter().enumerate() {
        editor.pick_from_gallery(index, ImageRef::new(path.to_string_lossy().into_owned()));
    }

    editor.export().ok_or(AppError::ExportFailed)
}

/// App integration error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Template lookup or settings codec failure.
    #[error("core error: {0}")]
    Core(#[from] CoreError),
    /// Render or storage failure.
    #[error("render error: {0}")]
    Render(#[from] RenderError),
    /// Export edge outside `1..=MAX_EXPORT_SIZE_PX`.
    #[error("export size {0}px is outside 1..={max}", max = MAX_EXPORT_SIZE_PX)]
    InvalidExportSize(u32),
    /// The export could not be stored.
    #[error("export failed")]
    ExportFailed,
    /// Too many images for the chosen template.
    #[error("template {template} has {slots} slots but {images} images were given")]
    TooManyImages {
        /// Template id.
        template: String,
        /// Slot count.
        slots: usize,
        /// Images given.
        images: usize,
    },
}
