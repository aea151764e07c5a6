#![warn(missing_docs)]
//! # collage-session
//!
//! ## Purpose
//! Single owner of the mutable collage-editing state.
//!
//! ## Responsibilities
//! - Hold the active template and one [`SlotState`] per slot.
//! - Enforce the per-slot `Empty | Draft | Committed` state machine.
//! - Cache decoded thumbnails (LRU, explicit invalidation on replacement).
//! - Discard thumbnail decodes superseded by a newer request for the slot.
//! - Publish change notifications and immutable snapshots.
//! - Keep editor settings, capture triggers, and recent exports.
//!
//! ## Data flow
//! UI, camera, and gallery events call mutation methods on
//! [`CollageSession`] -> version bump + [`CollageEvent`] to subscribers ->
//! renderer reads a [`CollageSnapshot`] or the export view.
//!
//! ## Ownership and lifetimes
//! The session exclusively owns slot state; callers only get shared
//! references or cloned snapshots. Asynchronous decode work never holds a
//! borrow: it carries a [`ThumbnailTicket`] and hands the result back.
//!
//! ## Error model
//! Stale slot indices are expected races with in-flight async work, so every
//! slot mutation returns `bool` (`false` = ignored) instead of an error.
//! Only template lookup by id can fail, with `CoreError::UnknownTemplate`.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};

use collage_capture::CaptureTriggers;
use collage_core::{
    CoreError, EditorSettings, ImageRef, RecentExports, SlotTransform, Template, default_template,
    require_template,
};
use image::RgbaImage;
use lru::LruCache;
use tracing::{debug, info};

/// Number of decoded thumbnails kept in memory.
pub const THUMBNAIL_CACHE_CAPACITY: usize = 90;

/// Decoded, downscaled preview pixels shared between cache and UI.
pub type Thumbnail = Arc<RgbaImage>;

/// What a slot currently shows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SlotContent {
    /// Nothing assigned.
    #[default]
    Empty,
    /// Unconfirmed camera output. `committed` is the image the draft would
    /// replace, restored if the draft is cancelled.
    Draft {
        /// The pending capture.
        draft: ImageRef,
        /// Previously committed image, if any.
        committed: Option<ImageRef>,
    },
    /// Confirmed image.
    Committed(ImageRef),
}

impl SlotContent {
    /// The committed image, including one shadowed by a draft.
    pub fn committed(&self) -> Option<&ImageRef> {
        match self {
            Self::Empty => None,
            Self::Draft { committed, .. } => committed.as_ref(),
            Self::Committed(image) => Some(image),
        }
    }

    /// The pending draft, if any.
    pub fn draft(&self) -> Option<&ImageRef> {
        match self {
            Self::Draft { draft, .. } => Some(draft),
            _ => None,
        }
    }

    /// Image to show while editing: the draft when present.
    pub fn display_image(&self) -> Option<&ImageRef> {
        self.draft().or_else(|| self.committed())
    }

    /// Image to composite on export: the committed image, else the draft.
    pub fn export_image(&self) -> Option<&ImageRef> {
        self.committed().or_else(|| self.draft())
    }

    /// Returns `true` when the slot has neither draft nor committed image.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Per-slot state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SlotState {
    /// Assigned images.
    pub content: SlotContent,
    /// Pan/zoom applied when compositing.
    pub transform: SlotTransform,
}

/// Immutable copy of the session taken at a known version.
#[derive(Debug, Clone, PartialEq)]
pub struct CollageSnapshot {
    /// Session version the snapshot was taken at.
    pub version: u64,
    /// Active template.
    pub template: Template,
    /// One entry per template slot.
    pub slots: Vec<SlotState>,
    /// Editor settings.
    pub settings: EditorSettings,
}

impl CollageSnapshot {
    /// Committed images in slot order.
    pub fn slot_images(&self) -> Vec<Option<ImageRef>> {
        self.slots
            .iter()
            .map(|slot| slot.content.committed().cloned())
            .collect()
    }

    /// Draft captures in slot order.
    pub fn draft_captures(&self) -> Vec<Option<ImageRef>> {
        self.slots
            .iter()
            .map(|slot| slot.content.draft().cloned())
            .collect()
    }

    /// Images used for export, in slot order.
    pub fn export_images(&self) -> Vec<Option<ImageRef>> {
        self.slots
            .iter()
            .map(|slot| slot.content.export_image().cloned())
            .collect()
    }

    /// Transforms in slot order.
    pub fn slot_transforms(&self) -> Vec<SlotTransform> {
        self.slots.iter().map(|slot| slot.transform).collect()
    }
}

/// Change notification delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollageEvent {
    /// Template replaced; every slot was reset.
    TemplateChanged {
        /// New template id.
        template_id: String,
        /// New slot count.
        slot_count: usize,
    },
    /// One slot's content or transform changed.
    SlotChanged {
        /// Slot index.
        index: usize,
    },
    /// A thumbnail for the slot's current image became available.
    ThumbnailReady {
        /// Slot index.
        index: usize,
        /// Image the thumbnail was decoded from.
        image: ImageRef,
    },
    /// Editor settings changed.
    SettingsChanged,
    /// Recent export list changed.
    ExportsChanged,
}

/// Hit/miss counters for [`ThumbnailCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThumbnailCacheStats {
    /// Lookups served from the cache.
    pub hits: u64,
    /// Lookups that found nothing.
    pub misses: u64,
    /// Entries pushed out by capacity.
    pub evictions: u64,
}

/// Bounded LRU cache of thumbnails keyed by image reference.
#[derive(Debug)]
pub struct ThumbnailCache {
    entries: LruCache<ImageRef, Thumbnail>,
    stats: ThumbnailCacheStats,
}

impl ThumbnailCache {
    /// Creates a cache holding at most `capacity` thumbnails (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            stats: ThumbnailCacheStats::default(),
        }
    }

    /// Returns the cached thumbnail and marks it most recently used.
    pub fn get(&mut self, image: &ImageRef) -> Option<Thumbnail> {
        let hit = self.entries.get(image).cloned();
        match hit {
            Some(_) => self.stats.hits += 1,
            None => self.stats.misses += 1,
        }
        hit
    }

    /// Returns `true` when `image` is cached, without touching recency.
    pub fn contains(&self, image: &ImageRef) -> bool {
        self.entries.contains(image)
    }

    /// Stores a thumbnail, evicting the least recently used one when full.
    pub fn insert(&mut self, image: ImageRef, thumbnail: Thumbnail) {
        if let Some((evicted, _)) = self.entries.push(image.clone(), thumbnail) {
            if evicted != image {
                self.stats.evictions += 1;
            }
        }
    }

    /// Drops the thumbnail for `image`.
    pub fn invalidate(&mut self, image: &ImageRef) -> bool {
        self.entries.pop(image).is_some()
    }

    /// Number of cached thumbnails.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of thumbnails.
    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    /// Counter snapshot.
    pub fn stats(&self) -> ThumbnailCacheStats {
        self.stats
    }
}

impl Default for ThumbnailCache {
    fn default() -> Self {
        Self::new(THUMBNAIL_CACHE_CAPACITY)
    }
}

/// Claim on a slot's thumbnail, issued by [`CollageSession::begin_thumbnail_load`].
///
/// Only the most recently issued ticket for a slot can deliver a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailTicket {
    /// Slot the decode is for.
    pub index: usize,
    /// Image to decode.
    pub image: ImageRef,
    serial: u64,
}

/// Result of asking the session for a slot's thumbnail.
#[derive(Debug, Clone)]
pub enum ThumbnailLookup {
    /// The slot shows nothing, or the index is stale.
    NoImage,
    /// Served from the cache.
    Cached(Thumbnail),
    /// Not cached; decode `ticket.image` and hand the result to
    /// [`CollageSession::complete_thumbnail_load`].
    Load(ThumbnailTicket),
}

/// Collage editing session.
#[derive(Debug)]
pub struct CollageSession {
    template: Template,
    slots: Vec<SlotState>,
    settings: EditorSettings,
    triggers: CaptureTriggers,
    recent_exports: RecentExports,
    thumbnails: ThumbnailCache,
    latest_ticket: Vec<Option<u64>>,
    next_ticket: u64,
    version: u64,
    subscribers: Vec<Sender<CollageEvent>>,
}

impl Default for CollageSession {
    fn default() -> Self {
        Self::new(EditorSettings::default())
    }
}

impl CollageSession {
    /// Creates a session on the default template.
    pub fn new(settings: EditorSettings) -> Self {
        let template = default_template().clone();
        let slot_count = template.slot_count();
        Self {
            template,
            slots: vec![SlotState::default(); slot_count],
            settings,
            triggers: CaptureTriggers::new(slot_count),
            recent_exports: RecentExports::new(),
            thumbnails: ThumbnailCache::default(),
            latest_ticket: vec![None; slot_count],
            next_ticket: 0,
            version: 0,
            subscribers: Vec::new(),
        }
    }

    /// Monotonic counter bumped by every mutation.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Registers a change listener. Dropped receivers are pruned on the next
    /// notification.
    pub fn subscribe(&mut self) -> Receiver<CollageEvent> {
        let (sender, receiver) = mpsc::channel();
        self.subscribers.push(sender);
        receiver
    }

    /// Immutable copy of the current state.
    pub fn snapshot(&self) -> CollageSnapshot {
        CollageSnapshot {
            version: self.version,
            template: self.template.clone(),
            slots: self.slots.clone(),
            settings: self.settings,
        }
    }

    /// Active template.
    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Number of slots in the active template.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// State of one slot.
    pub fn slot(&self, index: usize) -> Option<&SlotState> {
        self.slots.get(index)
    }

    /// All slot states, in slot order.
    pub fn slots(&self) -> &[SlotState] {
        &self.slots
    }

    /// Committed images in slot order.
    pub fn slot_images(&self) -> Vec<Option<ImageRef>> {
        self.slots
            .iter()
            .map(|slot| slot.content.committed().cloned())
            .collect()
    }

    /// Images used for export in slot order (committed, else draft).
    pub fn export_images(&self) -> Vec<Option<ImageRef>> {
        self.slots
            .iter()
            .map(|slot| slot.content.export_image().cloned())
            .collect()
    }

    /// Transforms in slot order.
    pub fn slot_transforms(&self) -> Vec<SlotTransform> {
        self.slots.iter().map(|slot| slot.transform).collect()
    }

    /// First slot with neither draft nor committed image, else `0`.
    pub fn first_open_slot(&self) -> usize {
        self.slots
            .iter()
            .position(|slot| slot.content.is_empty())
            .unwrap_or(0)
    }

    /// First slot after `index` with neither draft nor committed image.
    ///
    /// Earlier slots are not revisited; `None` once no later slot is open.
    pub fn next_open_slot_after(&self, index: usize) -> Option<usize> {
        self.slots
            .iter()
            .enumerate()
            .skip(index.saturating_add(1))
            .find(|(_, slot)| slot.content.is_empty())
            .map(|(next, _)| next)
    }

    /// Replaces the template and resets every slot.
    ///
    /// Previous images, drafts, transforms, capture counters, and pending
    /// thumbnail tickets are all discarded; nothing carries over.
    pub fn set_template(&mut self, template: &Template) {
        let slot_count = template.slot_count();
        self.template = template.clone();
        self.slots = vec![SlotState::default(); slot_count];
        self.triggers = CaptureTriggers::new(slot_count);
        self.latest_ticket = vec![None; slot_count];
        self.version += 1;
        info!(template = %template.id, slot_count, "template changed");
        self.notify(CollageEvent::TemplateChanged {
            template_id: template.id.clone(),
            slot_count,
        });
    }

    /// Looks up a stock template by id and activates it.
    ///
    /// # Errors
    /// Returns [`CoreError::UnknownTemplate`] and leaves state untouched when
    /// `id` is not in the catalog.
    pub fn select_template(&mut self, id: &str) -> Result<(), CoreError> {
        let template = require_template(id)?;
        self.set_template(template);
        Ok(())
    }

    /// Commits `image` to slot `index`.
    ///
    /// Invalidates cached thumbnails for the previous and new references,
    /// resets the transform, and drops any draft.
    pub fn set_slot_image(&mut self, index: usize, image: ImageRef) -> bool {
        let Some(slot) = self.slots.get(index) else {
            return false;
        };
        let previous: Vec<ImageRef> = [slot.content.committed(), slot.content.draft()]
            .into_iter()
            .flatten()
            .cloned()
            .collect();
        for stale in &previous {
            self.thumbnails.invalidate(stale);
        }
        self.thumbnails.invalidate(&image);

        self.slots[index] = SlotState {
            content: SlotContent::Committed(image),
            transform: SlotTransform::default(),
        };
        self.slot_changed(index);
        true
    }

    /// Empties slot `index` and resets its transform.
    pub fn clear_slot(&mut self, index: usize) -> bool {
        if index >= self.slots.len() {
            return false;
        }
        self.slots[index] = SlotState::default();
        self.slot_changed(index);
        true
    }

    /// Replaces slot `index`'s transform as given.
    ///
    /// Values are stored unvalidated; the geometry engine re-clamps them.
    pub fn set_slot_transform(&mut self, index: usize, transform: SlotTransform) -> bool {
        let Some(slot) = self.slots.get_mut(index) else {
            return false;
        };
        slot.transform = transform;
        self.version += 1;
        self.notify(CollageEvent::SlotChanged { index });
        true
    }

    /// Applies a live pinch/pan gesture to slot `index`.
    pub fn apply_gesture(
        &mut self,
        index: usize,
        zoom_change: f32,
        pan_dx: f32,
        pan_dy: f32,
        slot_w: f32,
        slot_h: f32,
    ) -> bool {
        let Some(slot) = self.slots.get(index) else {
            return false;
        };
        let transform = slot
            .transform
            .apply_gesture(zoom_change, pan_dx, pan_dy, slot_w, slot_h);
        self.set_slot_transform(index, transform)
    }

    /// Stores fresh camera output as slot `index`'s draft.
    ///
    /// A committed image stays underneath and is restored on cancel. The
    /// draft reference's cached thumbnail is invalidated because capture
    /// paths may be reused by a retake.
    pub fn set_draft(&mut self, index: usize, draft: ImageRef) -> bool {
        let Some(slot) = self.slots.get(index) else {
            return false;
        };
        let committed = slot.content.committed().cloned();
        if let Some(old_draft) = slot.content.draft().cloned() {
            self.thumbnails.invalidate(&old_draft);
        }
        self.thumbnails.invalidate(&draft);

        self.slots[index].content = SlotContent::Draft { draft, committed };
        self.slot_changed(index);
        true
    }

    /// Promotes slot `index`'s draft to its committed image.
    ///
    /// Returns `false` when the slot holds no draft.
    pub fn confirm_draft(&mut self, index: usize) -> bool {
        let Some(draft) = self
            .slots
            .get(index)
            .and_then(|slot| slot.content.draft())
            .cloned()
        else {
            return false;
        };
        self.set_slot_image(index, draft)
    }

    /// Discards slot `index`'s draft, restoring any committed image.
    ///
    /// Returns `false` when the slot holds no draft.
    pub fn cancel_draft(&mut self, index: usize) -> bool {
        let Some(SlotContent::Draft { draft, committed }) =
            self.slots.get(index).map(|slot| slot.content.clone())
        else {
            return false;
        };
        self.thumbnails.invalidate(&draft);
        self.slots[index].content = match committed {
            Some(image) => SlotContent::Committed(image),
            None => SlotContent::Empty,
        };
        self.slot_changed(index);
        true
    }

    /// Applies an edited (cropped) image to slot `index`.
    ///
    /// A pending draft is replaced and stays a draft; otherwise the image is
    /// committed.
    pub fn apply_crop_result(&mut self, index: usize, image: ImageRef) -> bool {
        let Some(slot) = self.slots.get(index) else {
            return false;
        };
        if slot.content.draft().is_some() {
            self.set_draft(index, image)
        } else {
            self.set_slot_image(index, image)
        }
    }

    /// Looks up the thumbnail for slot `index`'s display image.
    ///
    /// On a miss, issues a ticket that supersedes any earlier one for the
    /// same slot.
    pub fn thumbnail(&mut self, index: usize) -> ThumbnailLookup {
        let Some(image) = self
            .slots
            .get(index)
            .and_then(|slot| slot.content.display_image())
            .cloned()
        else {
            return ThumbnailLookup::NoImage;
        };
        if let Some(cached) = self.thumbnails.get(&image) {
            return ThumbnailLookup::Cached(cached);
        }
        self.next_ticket += 1;
        self.latest_ticket[index] = Some(self.next_ticket);
        ThumbnailLookup::Load(ThumbnailTicket {
            index,
            image,
            serial: self.next_ticket,
        })
    }

    /// Delivers a decode result for `ticket`.
    ///
    /// Results from superseded tickets (a newer request for the slot, a slot
    /// mutation, or a template change since) are discarded and `false` is
    /// returned. A `None` result (decode failure) is accepted but caches
    /// nothing.
    pub fn complete_thumbnail_load(
        &mut self,
        ticket: ThumbnailTicket,
        thumbnail: Option<Thumbnail>,
    ) -> bool {
        let current = self.latest_ticket.get(ticket.index).copied().flatten();
        if current != Some(ticket.serial) {
            debug!(
                index = ticket.index,
                image = %ticket.image,
                "stale thumbnail discarded"
            );
            return false;
        }
        self.latest_ticket[ticket.index] = None;

        let Some(thumbnail) = thumbnail else {
            debug!(index = ticket.index, image = %ticket.image, "thumbnail unavailable");
            return true;
        };
        self.thumbnails.insert(ticket.image.clone(), thumbnail);
        self.notify(CollageEvent::ThumbnailReady {
            index: ticket.index,
            image: ticket.image,
        });
        true
    }

    /// Thumbnail cache, for inspection.
    pub fn thumbnail_cache(&self) -> &ThumbnailCache {
        &self.thumbnails
    }

    /// Current editor settings.
    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    /// Mutates editor settings in place, then notifies subscribers.
    pub fn update_settings(&mut self, update: impl FnOnce(&mut EditorSettings)) {
        let before = self.settings;
        update(&mut self.settings);
        if self.settings != before {
            self.version += 1;
            self.notify(CollageEvent::SettingsChanged);
        }
    }

    /// Signals "take one photo now" for slot `index`.
    pub fn request_capture(&mut self, index: usize) -> bool {
        self.triggers.request(index)
    }

    /// Per-slot capture trigger counters.
    pub fn capture_triggers(&self) -> &CaptureTriggers {
        &self.triggers
    }

    /// Mutable access for attaching, detaching, and polling capture backends.
    pub fn capture_triggers_mut(&mut self) -> &mut CaptureTriggers {
        &mut self.triggers
    }

    /// Export history, newest first.
    pub fn recent_exports(&self) -> &RecentExports {
        &self.recent_exports
    }

    /// Records a freshly saved export.
    pub fn record_export(&mut self, image: ImageRef) {
        self.recent_exports.push(image);
        self.version += 1;
        self.notify(CollageEvent::ExportsChanged);
    }

    /// Replaces export history with entries read back from storage.
    pub fn restore_exports(&mut self, newest_first: impl IntoIterator<Item = ImageRef>) {
        self.recent_exports.replace_all(newest_first);
        self.version += 1;
        self.notify(CollageEvent::ExportsChanged);
    }

    fn slot_changed(&mut self, index: usize) {
        // Invariant: any in-flight decode for this slot now targets stale content.
        self.latest_ticket[index] = None;
        self.version += 1;
        self.notify(CollageEvent::SlotChanged { index });
    }

    fn notify(&mut self, event: CollageEvent) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }
}
