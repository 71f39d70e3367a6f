//! Sticker interaction layer
//!
//! Stickers are not rasterized with the rest of the page. They form a second
//! ordered list of hit-testable screen regions composited over the raster
//! surface, so drag and resize can address them directly. Moves during a
//! gesture only touch a local [`StickerDraft`]; the store sees one update
//! when the gesture ends.

use crate::transform::TransformContext;
use annot_model::{
    Annotation, AnnotationId, AnnotationPatch, Bounds, EditorSettings, ScreenPoint, Sticker,
    StickerValue,
};

/// Edge length of the remove and resize affordances, in screen pixels.
pub const HANDLE_SIZE: f32 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StickerHit {
    Body,
    Remove,
    Resize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftMode {
    Drag,
    Resize,
}

/// Screen-space region of one placed sticker.
#[derive(Debug, Clone, PartialEq)]
pub struct StickerOverlay {
    pub id: AnnotationId,
    pub value: StickerValue,
    pub bounds: Bounds,
    pub selected: bool,
}

impl StickerOverlay {
    /// Top-right corner; only live while selected.
    pub fn remove_handle(&self) -> Bounds {
        handle_at(self.bounds.max_x, self.bounds.min_y)
    }

    /// Bottom-right corner; only live while selected.
    pub fn resize_handle(&self) -> Bounds {
        handle_at(self.bounds.max_x, self.bounds.max_y)
    }

    pub fn hit(&self, point: ScreenPoint) -> Option<StickerHit> {
        if self.selected {
            if self.remove_handle().contains(point.x, point.y) {
                return Some(StickerHit::Remove);
            }
            if self.resize_handle().contains(point.x, point.y) {
                return Some(StickerHit::Resize);
            }
        }

        self.bounds.contains(point.x, point.y).then_some(StickerHit::Body)
    }
}

fn handle_at(x: f32, y: f32) -> Bounds {
    let half = HANDLE_SIZE / 2.0;
    Bounds { min_x: x - half, min_y: y - half, max_x: x + half, max_y: y + half }
}

/// In-flight drag or resize of one sticker.
#[derive(Debug, Clone, PartialEq)]
pub struct StickerDraft {
    pub id: AnnotationId,
    pub mode: DraftMode,
    pub origin: Sticker,
    pub start: ScreenPoint,
    pub current: ScreenPoint,
}

impl StickerDraft {
    pub fn new(origin: &Sticker, mode: DraftMode, start: ScreenPoint) -> Self {
        Self { id: origin.id, mode, origin: origin.clone(), start, current: start }
    }

    pub fn update(&mut self, point: ScreenPoint) {
        self.current = point;
    }

    pub fn moved(&self) -> bool {
        self.current != self.start
    }

    /// Page-intrinsic `(x, y, size)` the sticker would have if the gesture
    /// ended now, clamped to the page and to the sticker size limits.
    pub fn geometry(&self, ctx: &TransformContext, settings: &EditorSettings) -> (f32, f32, f32) {
        let origin = &self.origin;
        let Some((dx, dy)) =
            ctx.to_page_delta(self.current.x - self.start.x, self.current.y - self.start.y)
        else {
            return (origin.x, origin.y, origin.size);
        };

        let page = ctx.page_size();
        let size = match self.mode {
            DraftMode::Drag => origin.size,
            DraftMode::Resize => {
                let delta = if dx.abs() >= dy.abs() { dx } else { dy };
                settings.clamp_sticker_size(origin.size + delta).min(page.width.min(page.height))
            }
        };
        let (x, y) = match self.mode {
            DraftMode::Drag => (origin.x + dx, origin.y + dy),
            DraftMode::Resize => (origin.x, origin.y),
        };

        (
            x.clamp(0.0, (page.width - size).max(0.0)),
            y.clamp(0.0, (page.height - size).max(0.0)),
            size,
        )
    }

    pub fn patch(&self, ctx: &TransformContext, settings: &EditorSettings) -> AnnotationPatch {
        let (x, y, size) = self.geometry(ctx, settings);
        match self.mode {
            DraftMode::Drag => AnnotationPatch::position(x, y),
            DraftMode::Resize => AnnotationPatch::geometry(x, y, size),
        }
    }
}

/// Overlays for the stickers of one page in paint order, with the draft's
/// geometry substituted for the sticker it moves.
pub fn overlays(
    annotations: &[Annotation],
    ctx: &TransformContext,
    settings: &EditorSettings,
    selected: Option<AnnotationId>,
    draft: Option<&StickerDraft>,
) -> Vec<StickerOverlay> {
    if !ctx.is_ready() {
        return Vec::new();
    }

    annotations
        .iter()
        .filter_map(Annotation::as_sticker)
        .map(|sticker| {
            let (x, y, size) = match draft {
                Some(draft) if draft.id == sticker.id => draft.geometry(ctx, settings),
                _ => (sticker.x, sticker.y, sticker.size),
            };

            StickerOverlay {
                id: sticker.id,
                value: sticker.value.clone(),
                bounds: Bounds {
                    min_x: ctx.origin.x + x * ctx.zoom,
                    min_y: ctx.origin.y + y * ctx.zoom,
                    max_x: ctx.origin.x + (x + size) * ctx.zoom,
                    max_y: ctx.origin.y + (y + size) * ctx.zoom,
                },
                selected: selected == Some(sticker.id),
            }
        })
        .collect()
}

/// Topmost overlay under `point`.
pub fn hit_test(
    overlays: &[StickerOverlay],
    point: ScreenPoint,
) -> Option<(AnnotationId, StickerHit)> {
    overlays.iter().rev().find_map(|overlay| overlay.hit(point).map(|hit| (overlay.id, hit)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sticker(id: u64, x: f32, y: f32, size: f32) -> Sticker {
        Sticker { id: AnnotationId(id), value: StickerValue::default(), x, y, size }
    }

    fn ctx(zoom: f32) -> TransformContext {
        TransformContext::new(500.0, 700.0, zoom)
    }

    #[test]
    fn overlay_scales_with_zoom_and_origin() {
        let annotations = vec![Annotation::Sticker(sticker(1, 10.0, 20.0, 50.0))];
        let ctx = ctx(2.0).with_origin(ScreenPoint::new(100.0, 0.0));

        let overlays = overlays(&annotations, &ctx, &EditorSettings::default(), None, None);
        assert_eq!(
            overlays[0].bounds,
            Bounds { min_x: 120.0, min_y: 40.0, max_x: 220.0, max_y: 140.0 }
        );
    }

    #[test]
    fn handles_only_hit_when_selected() {
        let annotations = vec![Annotation::Sticker(sticker(1, 100.0, 100.0, 50.0))];
        let settings = EditorSettings::default();
        let corner = ScreenPoint::new(148.0, 148.0);

        let idle = overlays(&annotations, &ctx(1.0), &settings, None, None);
        assert_eq!(hit_test(&idle, corner), Some((AnnotationId(1), StickerHit::Body)));
        assert_eq!(hit_test(&idle, ScreenPoint::new(158.0, 100.0)), None);

        let selected = overlays(&annotations, &ctx(1.0), &settings, Some(AnnotationId(1)), None);
        assert_eq!(hit_test(&selected, corner), Some((AnnotationId(1), StickerHit::Resize)));
        assert_eq!(
            hit_test(&selected, ScreenPoint::new(158.0, 100.0)),
            Some((AnnotationId(1), StickerHit::Remove))
        );
    }

    #[test]
    fn topmost_sticker_wins() {
        let annotations = vec![
            Annotation::Sticker(sticker(1, 0.0, 0.0, 100.0)),
            Annotation::Sticker(sticker(2, 50.0, 50.0, 100.0)),
        ];
        let overlays = overlays(&annotations, &ctx(1.0), &EditorSettings::default(), None, None);

        let topmost = |x, y| hit_test(&overlays, ScreenPoint::new(x, y)).map(|(id, _)| id);
        assert_eq!(topmost(75.0, 75.0), Some(AnnotationId(2)));
        assert_eq!(topmost(25.0, 25.0), Some(AnnotationId(1)));
    }

    #[test]
    fn drag_divides_by_zoom_and_clamps_to_page() {
        let settings = EditorSettings::default();
        let origin = sticker(1, 100.0, 100.0, 50.0);
        let mut draft = StickerDraft::new(&origin, DraftMode::Drag, ScreenPoint::new(250.0, 250.0));

        draft.update(ScreenPoint::new(290.0, 230.0));
        assert_eq!(draft.geometry(&ctx(2.0), &settings), (120.0, 90.0, 50.0));

        draft.update(ScreenPoint::new(250.0 - 260.0, 250.0 - 260.0));
        assert_eq!(draft.geometry(&ctx(2.0), &settings), (0.0, 0.0, 50.0));

        draft.update(ScreenPoint::new(5000.0, 5000.0));
        assert_eq!(draft.geometry(&ctx(2.0), &settings), (450.0, 650.0, 50.0));
    }

    #[test]
    fn resize_uses_larger_delta_and_size_limits() {
        let settings = EditorSettings::default();
        let origin = sticker(1, 100.0, 100.0, 50.0);
        let mut draft = StickerDraft::new(&origin, DraftMode::Resize, ScreenPoint::new(0.0, 0.0));

        draft.update(ScreenPoint::new(20.0, 60.0));
        assert_eq!(draft.geometry(&ctx(2.0), &settings), (100.0, 100.0, 80.0));

        draft.update(ScreenPoint::new(900.0, 0.0));
        assert_eq!(draft.geometry(&ctx(1.0), &settings), (100.0, 100.0, 200.0));

        draft.update(ScreenPoint::new(-900.0, 10.0));
        assert_eq!(draft.geometry(&ctx(1.0), &settings), (100.0, 100.0, 24.0));
    }

    #[test]
    fn resize_near_edge_refits_position() {
        let settings = EditorSettings::default();
        let origin = sticker(1, 420.0, 10.0, 60.0);
        let mut draft = StickerDraft::new(&origin, DraftMode::Resize, ScreenPoint::new(0.0, 0.0));

        draft.update(ScreenPoint::new(100.0, 0.0));
        assert_eq!(draft.geometry(&ctx(1.0), &settings), (340.0, 10.0, 160.0));
        assert_eq!(
            draft.patch(&ctx(1.0), &settings),
            AnnotationPatch::geometry(340.0, 10.0, 160.0)
        );
    }
}
