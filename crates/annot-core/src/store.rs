//! Annotation store
//!
//! Owns the per-page annotation set of one open book together with its undo
//! history. Every operation that visibly changes the set records exactly one
//! history entry, so one user action is one undo step. Operations never fail:
//! targets that do not exist are treated as already gone.

use crate::hit;
use crate::history::History;
use annot_model::{
    Annotation, AnnotationId, AnnotationPatch, Color, EditorSettings, Location, PageAnnotationSet,
    PagePoint, PageSize, Shape, ShapeKind, Sticker, StickerValue, Stroke, StrokeKind, Tool,
};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::fmt;

/// Inverse-operation record of one committed mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryEntry {
    Insert { location: Location, annotation: Annotation },
    Remove { location: Location, annotation: Annotation },
    Update { location: Location, before: Annotation, after: Annotation },
    Clear { pages: Vec<(u32, Vec<Annotation>)> },
}

impl HistoryEntry {
    fn pages(&self) -> Vec<u32> {
        match self {
            Self::Insert { location, .. }
            | Self::Remove { location, .. }
            | Self::Update { location, .. } => vec![location.page],
            Self::Clear { pages } => pages.iter().map(|(page, _)| *page).collect(),
        }
    }

    fn revert(&self, annotations: &mut PageAnnotationSet) {
        match self {
            Self::Insert { location, .. } => {
                annotations.remove(*location);
            }
            Self::Remove { location, annotation } => {
                annotations.insert(*location, annotation.clone());
            }
            Self::Update { location, before, .. } => {
                if let Some(slot) = annotations.get_at_mut(*location) {
                    *slot = before.clone();
                }
            }
            Self::Clear { pages } => {
                for (page, cleared) in pages {
                    annotations.restore_page(*page, cleared.clone());
                }
            }
        }
    }

    fn apply(&self, annotations: &mut PageAnnotationSet) {
        match self {
            Self::Insert { location, annotation } => {
                annotations.insert(*location, annotation.clone());
            }
            Self::Remove { location, .. } => {
                annotations.remove(*location);
            }
            Self::Update { location, after, .. } => {
                if let Some(slot) = annotations.get_at_mut(*location) {
                    *slot = after.clone();
                }
            }
            Self::Clear { pages } => {
                for (page, _) in pages {
                    annotations.take_page(*page);
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Removed,
    Updated,
    Cleared,
    Undone,
    Redone,
}

/// Notification passed to observers after every visible change.
#[derive(Debug)]
pub struct StoreChange<'a> {
    pub kind: ChangeKind,
    pub pages: &'a [u32],
    pub revision: u64,
    pub annotations: &'a PageAnnotationSet,
}

pub type Observer = Box<dyn FnMut(&StoreChange<'_>)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Freehand stroke between `begin_stroke` and `commit_stroke`.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenStroke {
    pub page: u32,
    pub kind: StrokeKind,
    pub color: Color,
    pub points: Vec<PagePoint>,
}

impl OpenStroke {
    /// The stroke as it would look if committed now.
    pub fn preview(&self) -> Annotation {
        Annotation::stroke(
            self.kind,
            Stroke { id: AnnotationId(0), color: self.color, points: self.points.clone() },
        )
    }
}

pub struct AnnotationStore {
    annotations: PageAnnotationSet,
    history: History<HistoryEntry>,
    open_stroke: Option<OpenStroke>,
    extents: BTreeMap<u32, PageSize>,
    /// `None` once every id up to `u64::MAX` has been handed out.
    next_id: Option<u64>,
    revision: u64,
    sticker_min: f32,
    sticker_max: f32,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
}

impl fmt::Debug for AnnotationStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnnotationStore")
            .field("annotations", &self.annotations.len())
            .field("undo_depth", &self.history.undo_depth())
            .field("redo_depth", &self.history.redo_depth())
            .field("open_stroke", &self.open_stroke.is_some())
            .field("revision", &self.revision)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl AnnotationStore {
    pub fn new(settings: &EditorSettings) -> Self {
        Self::with_annotations(PageAnnotationSet::new(), settings)
    }

    /// Store for a book whose annotations were loaded from persistence.
    pub fn with_annotations(annotations: PageAnnotationSet, settings: &EditorSettings) -> Self {
        let next_id = annotations.max_id().map_or(Some(1), |id| id.0.checked_add(1));

        Self {
            annotations,
            history: History::new(settings.history_limit),
            open_stroke: None,
            extents: BTreeMap::new(),
            next_id,
            revision: 0,
            sticker_min: settings.sticker_min_size,
            sticker_max: settings.sticker_max_size.max(settings.sticker_min_size),
            observers: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn annotations(&self) -> &PageAnnotationSet {
        &self.annotations
    }

    pub fn page(&self, page: u32) -> &[Annotation] {
        self.annotations.page(page)
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.get(id)
    }

    /// Monotonic counter bumped by every visible change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo_depth(&self) -> usize {
        self.history.undo_depth()
    }

    pub fn redo_depth(&self) -> usize {
        self.history.redo_depth()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn open_stroke(&self) -> Option<&OpenStroke> {
        self.open_stroke.as_ref()
    }

    /// Records the natural size of a page once its image has loaded; sticker
    /// geometry on that page is clamped to it from then on.
    pub fn set_page_extent(&mut self, page: u32, size: PageSize) {
        if size.is_known() {
            self.extents.insert(page, size);
        }
    }

    pub fn page_extent(&self, page: u32) -> Option<PageSize> {
        self.extents.get(&page).copied()
    }

    pub fn subscribe(&mut self, observer: Observer) -> SubscriptionId {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.observers.push((id, observer));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| *existing != id);
        self.observers.len() != before
    }

    /// Opens a freehand stroke. Any stroke still open is discarded.
    pub fn begin_stroke(&mut self, page: u32, tool: Tool, color: Color, point: PagePoint) -> bool {
        let Some(kind) = tool.stroke_kind() else {
            debug!("begin_stroke ignored: {tool:?} does not draw strokes");
            return false;
        };
        if page == 0 {
            return false;
        }

        if self.open_stroke.is_some() {
            debug!("begin_stroke discarded a stroke that was still open");
        }
        self.open_stroke = Some(OpenStroke { page, kind, color, points: vec![point] });
        true
    }

    /// Appends a point to the open stroke; repeating the last point is a no-op.
    pub fn extend_stroke(&mut self, point: PagePoint) -> bool {
        let Some(stroke) = self.open_stroke.as_mut() else {
            return false;
        };

        if stroke.points.last() == Some(&point) {
            return false;
        }
        stroke.points.push(point);
        true
    }

    /// Closes the open stroke. Strokes with fewer than two points are dropped
    /// without touching the set or the history.
    pub fn commit_stroke(&mut self) -> Option<AnnotationId> {
        let stroke = self.open_stroke.take()?;
        if stroke.points.len() < 2 {
            debug!("dropping degenerate stroke with {} point(s)", stroke.points.len());
            return None;
        }

        let id = self.allocate_id()?;
        let annotation = Annotation::stroke(
            stroke.kind,
            Stroke { id, color: stroke.color, points: stroke.points },
        );
        self.insert(stroke.page, annotation);
        Some(id)
    }

    pub fn discard_stroke(&mut self) -> bool {
        self.open_stroke.take().is_some()
    }

    /// Commits a finished rect, circle or arrow. A shape whose endpoint equals
    /// its anchor is dropped.
    pub fn add_shape(
        &mut self,
        page: u32,
        kind: ShapeKind,
        color: Color,
        start: PagePoint,
        end: PagePoint,
    ) -> Option<AnnotationId> {
        if page == 0 || start.distance_to(&end) < 1e-3 {
            return None;
        }

        let id = self.allocate_id()?;
        self.insert(page, Annotation::shape(kind, Shape { id, color, start, end }));
        Some(id)
    }

    /// Removes everything on `page` touching the eraser circle. Each removal
    /// is its own history entry, so undo brings erased objects back one at a
    /// time, most recent first.
    pub fn erase_at(&mut self, page: u32, point: PagePoint, radius: f32) -> Vec<AnnotationId> {
        let hits: Vec<usize> = self
            .annotations
            .page(page)
            .iter()
            .enumerate()
            .filter(|(_, annotation)| hit::intersects_circle(annotation, point, radius))
            .map(|(index, _)| index)
            .collect();

        let mut erased = Vec::with_capacity(hits.len());
        for index in hits.into_iter().rev() {
            let location = Location { page, index };
            if let Some(annotation) = self.annotations.remove(location) {
                erased.push(annotation.id());
                self.record(HistoryEntry::Remove { location, annotation }, ChangeKind::Removed);
            }
        }
        erased
    }

    /// Places a sticker centered on `center`, clamped to the size limits and,
    /// when known, to the page bounds.
    pub fn place_sticker(
        &mut self,
        page: u32,
        value: StickerValue,
        center: PagePoint,
        size: f32,
    ) -> Option<AnnotationId> {
        if page == 0 {
            return None;
        }

        let id = self.allocate_id()?;
        let mut sticker = Sticker { id, value, x: 0.0, y: 0.0, size };
        sticker.size = self.clamp_size(page, size);
        sticker.x = center.x - sticker.size / 2.0;
        sticker.y = center.y - sticker.size / 2.0;
        self.clamp_position(page, &mut sticker);

        self.insert(page, Annotation::Sticker(sticker));
        Some(id)
    }

    /// Merges `patch` into the annotation with `id`. Unknown ids and patches
    /// that change nothing are no-ops and leave the history alone.
    pub fn update_annotation(
        &mut self,
        page: u32,
        id: AnnotationId,
        patch: &AnnotationPatch,
    ) -> bool {
        if patch.is_empty() {
            return false;
        }
        let Some(location) = self.annotations.find_on(page, id) else {
            debug!("update_annotation: {id} not found");
            return false;
        };
        let Some(before) = self.annotations.get_at(location).cloned() else {
            return false;
        };

        let mut after = before.clone();
        patch.apply(&mut after);
        if let Annotation::Sticker(sticker) = &mut after {
            sticker.size = self.clamp_size(location.page, sticker.size);
            self.clamp_position(location.page, sticker);
        }

        if after == before {
            return false;
        }

        if let Some(slot) = self.annotations.get_at_mut(location) {
            *slot = after.clone();
        }
        self.record(HistoryEntry::Update { location, before, after }, ChangeKind::Updated);
        true
    }

    pub fn remove_annotation(&mut self, page: u32, id: AnnotationId) -> bool {
        let Some(location) = self.annotations.find_on(page, id) else {
            debug!("remove_annotation: {id} already gone");
            return false;
        };
        let Some(annotation) = self.annotations.remove(location) else {
            return false;
        };

        self.record(HistoryEntry::Remove { location, annotation }, ChangeKind::Removed);
        true
    }

    /// Empties one page as a single undo step.
    pub fn clear_page(&mut self, page: u32) -> bool {
        let cleared = self.annotations.take_page(page);
        if cleared.is_empty() {
            return false;
        }

        self.record(HistoryEntry::Clear { pages: vec![(page, cleared)] }, ChangeKind::Cleared);
        true
    }

    /// Empties every page of the book as a single undo step.
    pub fn clear_book(&mut self) -> bool {
        let pages: Vec<(u32, Vec<Annotation>)> = self
            .annotations
            .page_numbers()
            .into_iter()
            .map(|page| (page, self.annotations.take_page(page)))
            .collect();
        if pages.is_empty() {
            return false;
        }

        self.record(HistoryEntry::Clear { pages }, ChangeKind::Cleared);
        true
    }

    pub fn undo(&mut self) -> bool {
        let Some(entry) = self.history.undo() else {
            return false;
        };

        entry.revert(&mut self.annotations);
        let pages = entry.pages();
        self.revision += 1;
        self.notify(ChangeKind::Undone, &pages);
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(entry) = self.history.redo() else {
            return false;
        };

        entry.apply(&mut self.annotations);
        let pages = entry.pages();
        self.revision += 1;
        self.notify(ChangeKind::Redone, &pages);
        true
    }

    fn allocate_id(&mut self) -> Option<AnnotationId> {
        let Some(id) = self.next_id else {
            warn!("annotation ids exhausted; refusing to add more");
            return None;
        };
        self.next_id = id.checked_add(1);
        Some(AnnotationId(id))
    }

    fn insert(&mut self, page: u32, annotation: Annotation) {
        let location = self.annotations.push(page, annotation.clone());
        self.record(HistoryEntry::Insert { location, annotation }, ChangeKind::Added);
    }

    fn record(&mut self, entry: HistoryEntry, kind: ChangeKind) {
        let pages = entry.pages();
        self.history.push(entry);
        self.revision += 1;
        self.notify(kind, &pages);
    }

    fn notify(&mut self, kind: ChangeKind, pages: &[u32]) {
        let change =
            StoreChange { kind, pages, revision: self.revision, annotations: &self.annotations };
        for (_, observer) in &mut self.observers {
            observer(&change);
        }
    }

    fn clamp_size(&self, page: u32, size: f32) -> f32 {
        let size = if size.is_nan() { self.sticker_min } else { size };
        let size = size.clamp(self.sticker_min, self.sticker_max);

        match self.extents.get(&page) {
            Some(extent) => size.min(extent.width.min(extent.height)),
            None => size,
        }
    }

    fn clamp_position(&self, page: u32, sticker: &mut Sticker) {
        let x = if sticker.x.is_finite() { sticker.x } else { 0.0 };
        let y = if sticker.y.is_finite() { sticker.y } else { 0.0 };

        match self.extents.get(&page) {
            Some(extent) => {
                sticker.x = x.clamp(0.0, (extent.width - sticker.size).max(0.0));
                sticker.y = y.clamp(0.0, (extent.height - sticker.size).max(0.0));
            }
            None => {
                sticker.x = x.max(0.0);
                sticker.y = y.max(0.0);
            }
        }
    }
}
