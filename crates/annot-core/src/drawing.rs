//! Drawing engine: turns one pointer gesture into store operations.

use crate::store::AnnotationStore;
use annot_model::{Annotation, AnnotationId, Color, PagePoint, Shape, ShapeKind, Tool};

/// Rect, circle or arrow between pointer-down and pointer-up. Lives outside
/// the store until it is committed.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeDraft {
    pub kind: ShapeKind,
    pub color: Color,
    pub anchor: PagePoint,
    pub current: PagePoint,
}

impl ShapeDraft {
    pub fn preview(&self) -> Annotation {
        Annotation::shape(
            self.kind,
            Shape { id: AnnotationId(0), color: self.color, start: self.anchor, end: self.current },
        )
    }
}

/// Tool-specific state of a gesture in progress.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawGesture {
    /// Points are buffered in the store's open stroke.
    Stroke,
    Shape(ShapeDraft),
    Erase { radius: f32 },
}

impl DrawGesture {
    /// Starts a gesture for a painting tool. Returns `None` for tools that do
    /// not paint.
    pub fn begin(
        store: &mut AnnotationStore,
        page: u32,
        tool: Tool,
        color: Color,
        point: PagePoint,
        eraser_radius: f32,
    ) -> Option<Self> {
        if tool.stroke_kind().is_some() {
            return store.begin_stroke(page, tool, color, point).then_some(Self::Stroke);
        }

        if let Some(kind) = tool.shape_kind() {
            return Some(Self::Shape(ShapeDraft { kind, color, anchor: point, current: point }));
        }

        if tool == Tool::Eraser {
            store.erase_at(page, point, eraser_radius);
            return Some(Self::Erase { radius: eraser_radius });
        }

        None
    }

    pub fn extend(&mut self, store: &mut AnnotationStore, page: u32, point: PagePoint) {
        match self {
            Self::Stroke => {
                store.extend_stroke(point);
            }
            Self::Shape(draft) => draft.current = point,
            Self::Erase { radius } => {
                store.erase_at(page, point, *radius);
            }
        }
    }

    /// Commits what is valid. Erasing already happened during the gesture.
    pub fn finish(self, store: &mut AnnotationStore, page: u32) -> Option<AnnotationId> {
        match self {
            Self::Stroke => store.commit_stroke(),
            Self::Shape(draft) => {
                store.add_shape(page, draft.kind, draft.color, draft.anchor, draft.current)
            }
            Self::Erase { .. } => None,
        }
    }

    /// Drops the gesture without committing anything.
    pub fn abandon(self, store: &mut AnnotationStore) {
        if matches!(self, Self::Stroke) {
            store.discard_stroke();
        }
    }

    /// Uncommitted geometry to paint over the committed set.
    pub fn preview(&self, store: &AnnotationStore) -> Option<Annotation> {
        match self {
            Self::Stroke => store.open_stroke().map(|stroke| stroke.preview()),
            Self::Shape(draft) => Some(draft.preview()),
            Self::Erase { .. } => None,
        }
    }
}
