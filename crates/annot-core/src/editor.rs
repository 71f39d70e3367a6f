//! Pointer state machine tying the toolbar, the sticker layer and the
//! drawing engine to one [`AnnotationStore`].
//!
//! Every pointer entry point takes the page under the pointer and that page's
//! [`TransformContext`]. Events for a page whose image has not reported its
//! natural size are refused, never queued.

use crate::drawing::DrawGesture;
use crate::sticker::{self, DraftMode, StickerDraft, StickerHit, StickerOverlay};
use crate::store::AnnotationStore;
use crate::toolbar::{Toolbar, ToolbarCommand, ToolbarEffect};
use crate::transform::TransformContext;
use annot_model::{
    Annotation, AnnotationId, EditorSettings, PageAnnotationSet, PageSize, ScreenPoint, Tool,
};
use log::debug;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    Drawing { page: u32, gesture: DrawGesture },
    Dragging { page: u32, draft: StickerDraft, ctx: TransformContext },
    Resizing { page: u32, draft: StickerDraft, ctx: TransformContext },
}

impl InteractionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn page(&self) -> Option<u32> {
        match self {
            Self::Idle => None,
            Self::Drawing { page, .. }
            | Self::Dragging { page, .. }
            | Self::Resizing { page, .. } => Some(*page),
        }
    }
}

/// Editing session for one open book.
#[derive(Debug)]
pub struct AnnotationEditor {
    store: AnnotationStore,
    toolbar: Toolbar,
    settings: EditorSettings,
    state: InteractionState,
    selected: Option<(u32, AnnotationId)>,
}

impl AnnotationEditor {
    pub fn new(annotations: PageAnnotationSet, settings: EditorSettings) -> Self {
        Self {
            store: AnnotationStore::with_annotations(annotations, &settings),
            toolbar: Toolbar::new(settings.default_sticker.clone()),
            settings,
            state: InteractionState::Idle,
            selected: None,
        }
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut AnnotationStore {
        &mut self.store
    }

    pub fn toolbar(&self) -> &Toolbar {
        &self.toolbar
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn selected(&self) -> Option<AnnotationId> {
        self.selected.map(|(_, id)| id)
    }

    pub fn set_page_extent(&mut self, page: u32, size: PageSize) {
        self.store.set_page_extent(page, size);
    }

    /// Applies a toolbar command. Returns whether the annotation set changed.
    pub fn execute(&mut self, command: ToolbarCommand, page: u32) -> bool {
        let previous_tool = self.toolbar.tool();
        let effect = self.toolbar.apply(command);

        if self.toolbar.tool() != previous_tool {
            // mid-gesture tool switch: nothing from the gesture survives
            self.cancel_gesture();
            self.selected = None;
        }

        match effect {
            ToolbarEffect::None => false,
            ToolbarEffect::Undo => {
                self.cancel_gesture();
                self.store.undo()
            }
            ToolbarEffect::Redo => {
                self.cancel_gesture();
                self.store.redo()
            }
            ToolbarEffect::ClearPage => {
                self.cancel_gesture();
                self.selected = None;
                self.store.clear_page(page)
            }
            ToolbarEffect::ClearBook => {
                self.cancel_gesture();
                self.selected = None;
                self.store.clear_book()
            }
            ToolbarEffect::AutoPlace(value) => {
                let Some(extent) = self.store.page_extent(page) else {
                    debug!("auto-place on page {page} deferred: page size unknown");
                    self.toolbar.restore_pending();
                    return false;
                };
                let center = self.settings.sticker_anchor.resolve(extent);
                let size = self.settings.sticker_size;
                if self.store.place_sticker(page, value, center, size).is_none() {
                    self.toolbar.restore_pending();
                    return false;
                }
                true
            }
        }
    }

    pub fn on_pointer_down(
        &mut self,
        page: u32,
        ctx: &TransformContext,
        point: ScreenPoint,
    ) -> bool {
        let Some(page_point) = ctx.to_page_space(point) else {
            debug!("pointer down on page {page} ignored: image not loaded");
            return false;
        };
        self.store.set_page_extent(page, ctx.page_size());

        if !self.state.is_idle() {
            self.finish_gesture();
        }

        let tool = self.toolbar.tool();
        if !tool.paints() && self.press_sticker_layer(page, ctx, point) {
            return true;
        }

        if tool == Tool::Sticker {
            let value = self.toolbar.sticker().clone();
            let size = self.settings.sticker_size;
            return self.store.place_sticker(page, value, page_point, size).is_some();
        }

        match DrawGesture::begin(
            &mut self.store,
            page,
            tool,
            self.toolbar.color(),
            page_point,
            self.settings.eraser_radius,
        ) {
            Some(gesture) => {
                self.state = InteractionState::Drawing { page, gesture };
                true
            }
            None => false,
        }
    }

    pub fn on_pointer_move(
        &mut self,
        page: u32,
        ctx: &TransformContext,
        point: ScreenPoint,
    ) -> bool {
        if !ctx.is_ready() {
            return false;
        }

        match &mut self.state {
            InteractionState::Idle => false,
            InteractionState::Drawing { page: active, gesture } => {
                if *active != page {
                    return false;
                }
                let Some(page_point) = ctx.to_page_space(point) else {
                    return false;
                };
                gesture.extend(&mut self.store, page, page_point);
                true
            }
            InteractionState::Dragging { page: active, draft, ctx: active_ctx }
            | InteractionState::Resizing { page: active, draft, ctx: active_ctx } => {
                if *active != page {
                    return false;
                }
                draft.update(point);
                *active_ctx = *ctx;
                true
            }
        }
    }

    pub fn on_pointer_up(&mut self, page: u32, ctx: &TransformContext, point: ScreenPoint) -> bool {
        self.on_pointer_move(page, ctx, point);
        self.finish_gesture()
    }

    /// Leaving the canvas ends the gesture exactly like releasing the button.
    pub fn on_pointer_leave(&mut self) -> bool {
        self.finish_gesture()
    }

    /// Commits whatever the current gesture has made valid. Returns whether
    /// the annotation set changed.
    pub fn finish_gesture(&mut self) -> bool {
        match std::mem::take(&mut self.state) {
            InteractionState::Idle => false,
            InteractionState::Drawing { page, gesture } => {
                let erasing = matches!(gesture, DrawGesture::Erase { .. });
                gesture.finish(&mut self.store, page).is_some() || erasing
            }
            InteractionState::Dragging { page, draft, ctx }
            | InteractionState::Resizing { page, draft, ctx } => {
                if !draft.moved() {
                    return false;
                }
                let patch = draft.patch(&ctx, &self.settings);
                self.store.update_annotation(page, draft.id, &patch)
            }
        }
    }

    /// Drops the current gesture without committing anything.
    pub fn cancel_gesture(&mut self) {
        if let InteractionState::Drawing { gesture, .. } = std::mem::take(&mut self.state) {
            gesture.abandon(&mut self.store);
        }
    }

    /// Uncommitted stroke or shape on `page`, painted over the committed set.
    pub fn preview(&self, page: u32) -> Option<Annotation> {
        match &self.state {
            InteractionState::Drawing { page: active, gesture } if *active == page => {
                gesture.preview(&self.store)
            }
            _ => None,
        }
    }

    pub fn sticker_overlays(&self, page: u32, ctx: &TransformContext) -> Vec<StickerOverlay> {
        let draft = match &self.state {
            InteractionState::Dragging { page: active, draft, .. }
            | InteractionState::Resizing { page: active, draft, .. }
                if *active == page =>
            {
                Some(draft)
            }
            _ => None,
        };
        let selected =
            self.selected.filter(|(selected_page, _)| *selected_page == page).map(|(_, id)| id);

        sticker::overlays(self.store.page(page), ctx, &self.settings, selected, draft)
    }

    /// Routes a press to the sticker layer. Returns true when a sticker took it.
    fn press_sticker_layer(
        &mut self,
        page: u32,
        ctx: &TransformContext,
        point: ScreenPoint,
    ) -> bool {
        let overlays = self.sticker_overlays(page, ctx);
        let Some((id, hit)) = sticker::hit_test(&overlays, point) else {
            self.selected = None;
            return false;
        };

        if hit == StickerHit::Remove {
            self.selected = None;
            return self.store.remove_annotation(page, id);
        }

        let Some(origin) = self.store.get(id).and_then(Annotation::as_sticker) else {
            return false;
        };
        self.selected = Some((page, id));

        let ctx = *ctx;
        self.state = match hit {
            StickerHit::Resize => {
                let draft = StickerDraft::new(origin, DraftMode::Resize, point);
                InteractionState::Resizing { page, draft, ctx }
            }
            _ => {
                let draft = StickerDraft::new(origin, DraftMode::Drag, point);
                InteractionState::Dragging { page, draft, ctx }
            }
        };
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use annot_model::{AnnotationPatch, Color, PagePoint, StickerValue};

    fn editor() -> AnnotationEditor {
        AnnotationEditor::new(PageAnnotationSet::new(), EditorSettings::default())
    }

    fn ctx(zoom: f32) -> TransformContext {
        TransformContext::new(500.0, 700.0, zoom)
    }

    fn s(x: f32, y: f32) -> ScreenPoint {
        ScreenPoint::new(x, y)
    }

    fn sticker_at(editor: &AnnotationEditor, id: AnnotationId) -> (f32, f32, f32) {
        let sticker =
            editor.store().get(id).and_then(Annotation::as_sticker).expect("sticker expected");
        (sticker.x, sticker.y, sticker.size)
    }

    #[test]
    fn pencil_gesture_commits_one_stroke() {
        let mut editor = editor();
        editor.execute(ToolbarCommand::SelectTool(Tool::Pencil), 1);
        let ctx = ctx(2.0);

        assert!(editor.on_pointer_down(1, &ctx, s(20.0, 20.0)));
        for i in 1..=10 {
            editor.on_pointer_move(1, &ctx, s(20.0 + i as f32 * 4.0, 20.0));
        }
        assert!(editor.preview(1).is_some());
        assert!(editor.on_pointer_up(1, &ctx, s(64.0, 20.0)));

        let Some(Annotation::Pencil(stroke)) = editor.store().page(1).first() else {
            panic!("pencil stroke expected");
        };
        assert_eq!(stroke.points.first(), Some(&PagePoint::new(10.0, 10.0)));
        assert_eq!(stroke.points.last(), Some(&PagePoint::new(32.0, 10.0)));
        assert_eq!(editor.store().history_len(), 1);
        assert!(editor.state().is_idle());
    }

    #[test]
    fn unloaded_page_rejects_pointer_input() {
        let mut editor = editor();
        editor.execute(ToolbarCommand::SelectTool(Tool::Pencil), 1);
        let unloaded = TransformContext::new(0.0, 0.0, 1.0);

        assert!(!editor.on_pointer_down(1, &unloaded, s(1.0, 1.0)));
        assert!(!editor.on_pointer_move(1, &unloaded, s(5.0, 5.0)));
        assert!(editor.state().is_idle());
        assert!(editor.store().annotations().is_empty());
    }

    #[test]
    fn switching_tool_mid_stroke_discards_it() {
        let mut editor = editor();
        editor.execute(ToolbarCommand::SelectTool(Tool::Pencil), 1);
        let ctx = ctx(1.0);

        editor.on_pointer_down(1, &ctx, s(0.0, 0.0));
        for i in 1..=3 {
            editor.on_pointer_move(1, &ctx, s(i as f32 * 10.0, 0.0));
        }
        editor.execute(ToolbarCommand::SelectTool(Tool::Eraser), 1);
        editor.on_pointer_up(1, &ctx, s(40.0, 0.0));

        assert!(editor.store().page(1).is_empty());
        assert_eq!(editor.store().history_len(), 0);
        assert!(editor.store().open_stroke().is_none());
    }

    #[test]
    fn pointer_leave_commits_like_pointer_up() {
        let mut editor = editor();
        editor.execute(ToolbarCommand::SelectTool(Tool::Arrow), 2);
        let ctx = ctx(1.0);

        editor.on_pointer_down(2, &ctx, s(10.0, 10.0));
        editor.on_pointer_move(2, &ctx, s(90.0, 40.0));
        assert!(editor.on_pointer_leave());

        assert!(matches!(editor.store().page(2), [Annotation::Arrow(_)]));
        assert!(!editor.on_pointer_leave());
    }

    #[test]
    fn fifty_move_drag_is_one_history_entry() {
        let mut editor = editor();
        editor.set_page_extent(1, PageSize::new(500.0, 700.0));
        let id = editor
            .store_mut()
            .place_sticker(1, StickerValue::default(), PagePoint::new(125.0, 125.0), 50.0)
            .expect("sticker placed");
        let history = editor.store().history_len();
        let ctx = ctx(2.0);

        assert!(editor.on_pointer_down(1, &ctx, s(220.0, 220.0)));
        assert!(matches!(editor.state(), InteractionState::Dragging { .. }));
        for i in 1..=50 {
            editor.on_pointer_move(1, &ctx, s(220.0 + i as f32, 220.0 + i as f32));
            assert_eq!(sticker_at(&editor, id), (100.0, 100.0, 50.0));
        }
        assert!(editor.on_pointer_up(1, &ctx, s(270.0, 270.0)));

        assert_eq!(editor.store().history_len(), history + 1);
        assert_eq!(sticker_at(&editor, id), (125.0, 125.0, 50.0));
        assert_eq!(editor.selected(), Some(id));
    }

    #[test]
    fn drag_and_resize_clamp_to_page() {
        let mut editor = editor();
        editor.set_page_extent(1, PageSize::new(500.0, 700.0));
        let id = editor
            .store_mut()
            .place_sticker(1, StickerValue::default(), PagePoint::new(125.0, 125.0), 50.0)
            .expect("sticker placed");
        let ctx = ctx(1.0);

        editor.on_pointer_down(1, &ctx, s(110.0, 110.0));
        editor.on_pointer_up(1, &ctx, s(-20.0, -20.0));
        assert_eq!(sticker_at(&editor, id), (0.0, 0.0, 50.0));

        let overlays = editor.sticker_overlays(1, &ctx);
        let handle = overlays[0].resize_handle();
        let grip = s((handle.min_x + handle.max_x) / 2.0, (handle.min_y + handle.max_y) / 2.0);
        assert!(editor.on_pointer_down(1, &ctx, grip));
        assert!(matches!(editor.state(), InteractionState::Resizing { .. }));
        editor.on_pointer_up(1, &ctx, s(grip.x + 450.0, grip.y + 10.0));
        assert_eq!(sticker_at(&editor, id), (0.0, 0.0, 200.0));
    }

    #[test]
    fn remove_handle_deletes_selected_sticker() {
        let mut editor = editor();
        let id = editor
            .store_mut()
            .place_sticker(1, StickerValue::default(), PagePoint::new(100.0, 100.0), 40.0)
            .expect("sticker placed");
        let ctx = ctx(1.0);

        editor.on_pointer_down(1, &ctx, s(100.0, 100.0));
        editor.on_pointer_up(1, &ctx, s(100.0, 100.0));
        assert_eq!(editor.selected(), Some(id));
        assert_eq!(editor.store().history_len(), 1);

        assert!(editor.on_pointer_down(1, &ctx, s(120.0, 80.0)));
        assert!(editor.store().page(1).is_empty());
        assert_eq!(editor.selected(), None);
    }

    #[test]
    fn clicking_outside_deselects() {
        let mut editor = editor();
        editor.store_mut().place_sticker(
            1,
            StickerValue::default(),
            PagePoint::new(100.0, 100.0),
            40.0,
        );
        let ctx = ctx(1.0);

        editor.on_pointer_down(1, &ctx, s(100.0, 100.0));
        editor.on_pointer_up(1, &ctx, s(100.0, 100.0));
        assert!(editor.selected().is_some());

        assert!(!editor.on_pointer_down(1, &ctx, s(400.0, 400.0)));
        assert_eq!(editor.selected(), None);
    }

    #[test]
    fn sticker_mode_places_on_click_and_stays_in_mode() {
        let mut editor = editor();
        editor.execute(ToolbarCommand::SelectTool(Tool::Sticker), 1);
        let ctx = ctx(2.0);

        assert!(editor.on_pointer_down(1, &ctx, s(400.0, 400.0)));
        editor.on_pointer_up(1, &ctx, s(400.0, 400.0));
        assert_eq!(editor.toolbar().tool(), Tool::Sticker);

        let Some(Annotation::Sticker(sticker)) = editor.store().page(1).first() else {
            panic!("sticker expected");
        };
        assert_eq!((sticker.x, sticker.y, sticker.size), (168.0, 168.0, 64.0));
    }

    #[test]
    fn pending_sticker_auto_places_at_page_center_once() {
        let mut editor = editor();
        editor.set_page_extent(3, PageSize::new(500.0, 700.0));
        let heart = StickerValue::Emoji("\u{2764}".to_owned());

        editor.execute(ToolbarCommand::SelectSticker(heart.clone()), 3);
        assert!(editor.execute(ToolbarCommand::SelectTool(Tool::Sticker), 3));
        assert_eq!(editor.toolbar().tool(), Tool::None);

        let [Annotation::Sticker(sticker)] = editor.store().page(3) else {
            panic!("exactly one sticker expected");
        };
        assert_eq!(sticker.value, heart);
        assert_eq!((sticker.x, sticker.y), (218.0, 318.0));

        assert!(!editor.on_pointer_down(3, &ctx(1.0), s(10.0, 10.0)));
        assert_eq!(editor.store().page(3).len(), 1);
    }

    #[test]
    fn pending_sticker_survives_page_without_known_size() {
        let mut editor = editor();
        let heart = StickerValue::Emoji("\u{2764}".to_owned());

        editor.execute(ToolbarCommand::SelectSticker(heart.clone()), 2);
        assert!(!editor.execute(ToolbarCommand::SelectTool(Tool::Sticker), 2));
        assert!(editor.store().page(2).is_empty());
        assert_eq!(editor.toolbar().tool(), Tool::Sticker);
        assert!(editor.toolbar().sticker_pending());

        editor.set_page_extent(2, PageSize::new(500.0, 700.0));
        assert!(editor.execute(ToolbarCommand::SelectTool(Tool::Sticker), 2));
        assert!(matches!(editor.store().page(2), [Annotation::Sticker(s)] if s.value == heart));
        assert_eq!(editor.toolbar().tool(), Tool::None);
        assert!(!editor.toolbar().sticker_pending());
    }

    #[test]
    fn drawing_tools_paint_through_stickers() {
        let mut editor = editor();
        editor.store_mut().place_sticker(
            1,
            StickerValue::default(),
            PagePoint::new(100.0, 100.0),
            40.0,
        );
        editor.execute(ToolbarCommand::SelectTool(Tool::Highlighter), 1);
        editor.execute(ToolbarCommand::SelectColor(Color::YELLOW), 1);
        let ctx = ctx(1.0);

        editor.on_pointer_down(1, &ctx, s(100.0, 100.0));
        editor.on_pointer_up(1, &ctx, s(150.0, 100.0));

        let page = editor.store().page(1);
        assert!(matches!(page, [Annotation::Sticker(_), Annotation::Highlighter(_)]));
        let highlighter = &page[1];
        assert!(matches!(highlighter, Annotation::Highlighter(s) if s.color == Color::YELLOW));
    }

    #[test]
    fn undo_redo_through_toolbar() {
        let mut editor = editor();
        editor.store_mut().place_sticker(
            1,
            StickerValue::default(),
            PagePoint::new(100.0, 100.0),
            40.0,
        );
        let id = editor.store().page(1)[0].id();
        editor.store_mut().update_annotation(1, id, &AnnotationPatch::position(0.0, 0.0));

        assert!(editor.execute(ToolbarCommand::Undo, 1));
        assert_eq!(sticker_at(&editor, id), (80.0, 80.0, 40.0));
        assert!(editor.execute(ToolbarCommand::Undo, 1));
        assert!(!editor.execute(ToolbarCommand::Undo, 1));
        assert!(editor.execute(ToolbarCommand::Redo, 1));
        assert!(editor.execute(ToolbarCommand::ClearPage, 1));
        assert!(editor.store().page(1).is_empty());
    }
}
