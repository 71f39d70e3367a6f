//! Page annotation engine
//!
//! Framework-agnostic core of the flipbook annotation editor: the
//! [`AnnotationStore`] with its undo history, the pointer state machine in
//! [`AnnotationEditor`], the sticker overlay layer and the repaint pipeline.
//! Everything here runs on the caller's thread and never blocks.

pub mod drawing;
pub mod editor;
pub mod history;
pub mod hit;
pub mod render;
pub mod sticker;
pub mod store;
pub mod toolbar;
pub mod transform;

pub use drawing::{DrawGesture, ShapeDraft};
pub use editor::{AnnotationEditor, InteractionState};
pub use history::History;
pub use render::{
    paint_page, primitives_for, PaintOutcome, Primitive, RasterSurface, RenderPipeline,
    RepaintJob, RepaintReason, Surface,
};
pub use sticker::{DraftMode, StickerDraft, StickerHit, StickerOverlay, HANDLE_SIZE};
pub use store::{
    AnnotationStore, ChangeKind, HistoryEntry, Observer, OpenStroke, StoreChange, SubscriptionId,
};
pub use toolbar::{Toolbar, ToolbarCommand, ToolbarEffect};
pub use transform::TransformContext;
