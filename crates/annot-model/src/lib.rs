//! Plain data shared by the flipbook annotation crates: geometry, annotation
//! records, per-book annotation sets, page metadata and editor settings.

pub mod annotation;
pub mod book;
pub mod geometry;
pub mod settings;

pub use annotation::{
    Annotation, AnnotationId, AnnotationPatch, Color, Shape, ShapeKind, Sticker, StickerValue,
    Stroke, StrokeKind, Tool,
};
pub use book::{
    AnnotationSink, BookId, Location, PageAnnotationSet, PageClassification, PageInfo, PageType,
    SaveError,
};
pub use geometry::{Bounds, PagePoint, PageSize, ScreenPoint};
pub use settings::{EditorSettings, SavePolicy, StickerAnchor};

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("invalid color '{0}', expected #rgb, #rrggbb or #rrggbbaa")]
    InvalidColor(String),
    #[error("annotation id {0} is used more than once")]
    DuplicateId(AnnotationId),
    #[error("page numbers are 1-based, got {0}")]
    InvalidPage(u32),
}
