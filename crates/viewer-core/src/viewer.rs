use crate::layout::{self, PagePlacement};
use crate::navigation::{DisplayMode, NavOutcome, Navigator};
use crate::{CloseError, ViewerError};
use annot_core::{
    AnnotationEditor, AnnotationStore, InteractionState, PaintOutcome, RasterSurface,
    RenderPipeline, RepaintJob, RepaintReason, StoreChange, SubscriptionId, ToolbarCommand,
    TransformContext,
};
use annot_model::{
    AnnotationSink, BookId, EditorSettings, PageAnnotationSet, PageClassification, PageInfo,
    PageSize, SavePolicy, ScreenPoint,
};
use log::{debug, info, warn};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Horizontal gap between the two pages of a spread, in screen pixels.
pub const SPREAD_GAP: f32 = 16.0;

/// Viewer shell for one open book.
///
/// Owns the editor, navigation and the repaint queue. The store reports
/// every visible change through an observer that queues repaints and marks
/// the book dirty for persistence.
pub struct FlipbookViewer {
    book_id: BookId,
    pages: Vec<PageInfo>,
    sizes: HashMap<u32, PageSize>,
    classifications: HashMap<u32, PageClassification>,
    navigator: Navigator,
    zoom: f32,
    editor: AnnotationEditor,
    pipeline: Rc<RefCell<RenderPipeline>>,
    surfaces: HashMap<u32, RasterSurface>,
    dirty: Rc<Cell<bool>>,
    subscription: SubscriptionId,
    sink: Option<Box<dyn AnnotationSink>>,
    focus: u32,
}

impl std::fmt::Debug for FlipbookViewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlipbookViewer")
            .field("book_id", &self.book_id)
            .field("pages", &self.pages.len())
            .field("visible", &self.navigator.visible_pages())
            .field("zoom", &self.zoom)
            .field("dirty", &self.dirty.get())
            .finish()
    }
}

impl FlipbookViewer {
    /// Opens a book, landing on `initial_page` (clamped) before the first
    /// paint is queued.
    pub fn open(
        book_id: BookId,
        pages: Vec<PageInfo>,
        annotations: PageAnnotationSet,
        settings: EditorSettings,
        mode: DisplayMode,
        initial_page: Option<u32>,
    ) -> Result<Self, ViewerError> {
        if pages.is_empty() {
            return Err(ViewerError::EmptyBook(book_id));
        }

        let page_count = pages.iter().map(|page| page.page_number).max().unwrap_or_default();
        let mut navigator =
            Navigator::new(page_count, mode, Duration::from_millis(settings.flip_duration_ms));
        if let Some(page) = initial_page {
            if page == 0 || page > page_count {
                debug!("deep link to page {page} clamped to 1..={page_count}");
            }
            navigator.open_at(page);
        }

        let mut editor = AnnotationEditor::new(annotations, settings);
        let pipeline = Rc::new(RefCell::new(RenderPipeline::new()));
        let dirty = Rc::new(Cell::new(false));

        let subscription = {
            let pipeline = Rc::clone(&pipeline);
            let dirty = Rc::clone(&dirty);
            editor.store_mut().subscribe(Box::new(move |change: &StoreChange<'_>| {
                dirty.set(true);
                let mut pipeline = pipeline.borrow_mut();
                for page in change.pages {
                    pipeline.invalidate(*page, RepaintReason::AnnotationsChanged);
                }
            }))
        };

        info!(
            "opened book {book_id}: {} pages, {} annotations",
            pages.len(),
            editor.store().annotations().len()
        );

        let focus = navigator.current_page();
        let mut viewer = Self {
            book_id,
            pages,
            sizes: HashMap::new(),
            classifications: HashMap::new(),
            navigator,
            zoom: 1.0,
            editor,
            pipeline,
            surfaces: HashMap::new(),
            dirty,
            subscription,
            sink: None,
            focus,
        };
        viewer.sync_active_pages();
        Ok(viewer)
    }

    pub fn with_sink(mut self, sink: Box<dyn AnnotationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn book_id(&self) -> &BookId {
        &self.book_id
    }

    pub fn pages(&self) -> &[PageInfo] {
        &self.pages
    }

    pub fn editor(&self) -> &AnnotationEditor {
        &self.editor
    }

    pub fn store(&self) -> &AnnotationStore {
        self.editor.store()
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    pub fn visible_pages(&self) -> Vec<u32> {
        self.navigator.visible_pages()
    }

    /// Page that toolbar commands such as clear and sticker auto-place act on.
    pub fn focus_page(&self) -> u32 {
        self.focus
    }

    /// Records a page image's natural size once it has loaded.
    pub fn page_loaded(&mut self, page: u32, size: PageSize) -> Result<(), ViewerError> {
        if !self.pages.iter().any(|info| info.page_number == page) {
            return Err(ViewerError::UnknownPage(page));
        }
        if !size.is_known() {
            debug!("ignoring unusable size {size:?} for page {page}");
            return Ok(());
        }

        self.sizes.insert(page, size);
        self.editor.set_page_extent(page, size);
        self.pipeline.borrow_mut().invalidate(page, RepaintReason::PageChanged);
        Ok(())
    }

    pub fn set_classification(&mut self, page: u32, classification: PageClassification) {
        self.classifications.insert(page, classification);
    }

    /// Display label, falling back to the page number until the classifier
    /// has reported.
    pub fn page_label(&self, page: u32) -> String {
        self.classifications
            .get(&page)
            .copied()
            .unwrap_or_else(|| PageClassification::fallback(page))
            .label(page)
    }

    pub fn next(&mut self, now: Instant) -> NavOutcome {
        self.tick(now);
        let outcome = self.navigator.next(now);
        self.after_navigation(outcome)
    }

    pub fn previous(&mut self, now: Instant) -> NavOutcome {
        self.tick(now);
        let outcome = self.navigator.previous(now);
        self.after_navigation(outcome)
    }

    pub fn go_to(&mut self, page: u32, now: Instant) -> NavOutcome {
        self.tick(now);
        let outcome = self.navigator.go_to(page, now);
        self.after_navigation(outcome)
    }

    /// Advances the flip animation; call once per frame.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.navigator.tick(now) {
            return false;
        }

        self.sync_active_pages();
        true
    }

    pub fn set_mode(&mut self, mode: DisplayMode) -> bool {
        self.finish_gesture();
        let changed = self.navigator.set_mode(mode);
        self.sync_active_pages();
        changed
    }

    pub fn set_zoom(&mut self, zoom: f32) -> bool {
        let zoom = layout::clamp_zoom(zoom);
        if zoom == self.zoom {
            return false;
        }

        self.finish_gesture();
        self.zoom = zoom;
        self.pipeline.borrow_mut().invalidate_all(RepaintReason::ZoomChanged);
        true
    }

    pub fn zoom_in(&mut self) -> bool {
        self.set_zoom(layout::zoom_in(self.zoom))
    }

    pub fn zoom_out(&mut self) -> bool {
        self.set_zoom(layout::zoom_out(self.zoom))
    }

    /// Container-space placement of every visible page.
    pub fn layout(&self) -> Vec<PagePlacement> {
        let pages: Vec<(u32, Option<PageSize>)> = self
            .navigator
            .visible_pages()
            .into_iter()
            .map(|page| (page, self.sizes.get(&page).copied()))
            .collect();
        layout::layout_pages(&pages, self.zoom, SPREAD_GAP)
    }

    pub fn page_context(&self, page: u32) -> Option<TransformContext> {
        self.layout().into_iter().find(|placement| placement.page == page).map(|p| p.ctx)
    }

    pub fn execute(&mut self, command: ToolbarCommand) -> bool {
        let changed = self.editor.execute(command, self.focus);
        self.after_edit();
        changed
    }

    pub fn pointer_down(&mut self, point: ScreenPoint) -> bool {
        let layout = self.layout();
        let Some(placement) = layout::page_at(&layout, point) else {
            debug!("pointer down at {point:?} is not over a page");
            return false;
        };

        self.focus = placement.page;
        let handled = self.editor.on_pointer_down(placement.page, &placement.ctx, point);
        self.queue_preview_repaint();
        self.after_edit();
        handled
    }

    /// Moves and releases follow the page the gesture started on, even when
    /// the pointer has wandered onto the other half of the spread.
    pub fn pointer_move(&mut self, point: ScreenPoint) -> bool {
        let Some((page, ctx)) = self.gesture_target() else {
            return false;
        };
        let handled = self.editor.on_pointer_move(page, &ctx, point);
        self.queue_preview_repaint();
        self.after_edit();
        handled
    }

    pub fn pointer_up(&mut self, point: ScreenPoint) -> bool {
        let changed = match self.gesture_target() {
            Some((page, ctx)) => self.editor.on_pointer_up(page, &ctx, point),
            None => self.editor.finish_gesture(),
        };
        self.after_edit();
        changed
    }

    pub fn pointer_leave(&mut self) -> bool {
        self.finish_gesture()
    }

    /// Pops the next queued repaint, if any.
    pub fn next_repaint(&mut self) -> Option<RepaintJob> {
        self.pipeline.borrow_mut().pop_next()
    }

    /// Paints one job into the page's surface unless it went stale.
    pub fn paint(&mut self, job: &RepaintJob) -> PaintOutcome {
        let ctx = self.page_context(job.page);
        let pipeline = self.pipeline.borrow();
        let Some(ctx) = ctx.filter(|_| pipeline.is_current(job)) else {
            debug!("repaint of page {} dropped: page no longer displayed", job.page);
            return PaintOutcome::Stale;
        };

        let surface = self.surfaces.entry(job.page).or_default();
        let preview = self.editor.preview(job.page);
        pipeline.paint(
            job,
            surface,
            self.editor.store().page(job.page),
            preview.as_ref(),
            &ctx,
            self.editor.settings(),
        )
    }

    /// Drains the repaint queue.
    pub fn render_pending(&mut self) -> Vec<(u32, PaintOutcome)> {
        let mut outcomes = Vec::new();
        while let Some(job) = self.next_repaint() {
            outcomes.push((job.page, self.paint(&job)));
        }
        outcomes
    }

    pub fn surface(&self, page: u32) -> Option<&RasterSurface> {
        self.surfaces.get(&page)
    }

    /// Writes the annotation set to the sink if anything changed since the
    /// last successful save.
    pub fn flush(&mut self) -> Result<bool, ViewerError> {
        if !self.dirty.get() {
            return Ok(false);
        }
        let Some(sink) = self.sink.as_mut() else {
            return Ok(false);
        };

        sink.save_annotations(&self.book_id, self.editor.store().annotations())?;
        self.dirty.set(false);
        debug!("saved annotations for book {}", self.book_id);
        Ok(true)
    }

    /// Ends the session: finishes any gesture, flushes, and hands back the
    /// final annotation set. A failed flush still returns the set inside the
    /// error.
    pub fn close(mut self) -> Result<PageAnnotationSet, CloseError> {
        self.finish_gesture();
        let saved = self.flush();
        self.editor.store_mut().unsubscribe(self.subscription);
        let annotations = self.editor.store().annotations().clone();

        match saved {
            Ok(_) => {
                info!("closed book {}", self.book_id);
                Ok(annotations)
            }
            Err(source) => Err(CloseError { book_id: self.book_id, annotations, source }),
        }
    }

    fn finish_gesture(&mut self) -> bool {
        let changed = self.editor.finish_gesture();
        self.after_edit();
        changed
    }

    /// The uncommitted stroke or shape only exists in the editor, so the
    /// store observer never sees it.
    fn queue_preview_repaint(&mut self) {
        if let InteractionState::Drawing { page, .. } = self.editor.state() {
            self.pipeline.borrow_mut().invalidate(*page, RepaintReason::AnnotationsChanged);
        }
    }

    fn gesture_target(&self) -> Option<(u32, TransformContext)> {
        let page = self.editor.state().page()?;
        Some((page, self.page_context(page)?))
    }

    fn after_navigation(&mut self, outcome: NavOutcome) -> NavOutcome {
        match outcome {
            NavOutcome::Moved => {
                self.finish_gesture();
                self.sync_active_pages();
            }
            NavOutcome::FlipStarted => {
                self.finish_gesture();
            }
            NavOutcome::Ignored => debug!("navigation ignored: flip in progress"),
            NavOutcome::AtBoundary => {}
        }
        outcome
    }

    fn after_edit(&mut self) {
        if self.editor.settings().save_policy != SavePolicy::Immediate {
            return;
        }
        if let Err(error) = self.flush() {
            warn!("{error}; keeping changes in memory");
        }
    }

    fn sync_active_pages(&mut self) {
        let visible = self.navigator.visible_pages();
        if !visible.contains(&self.focus) {
            self.focus = visible.first().copied().unwrap_or(1);
        }
        self.surfaces.retain(|page, _| visible.contains(page));
        self.pipeline.borrow_mut().set_active_pages(&visible);
    }
}
