//! Flipbook viewer shell
//!
//! Single and spread page display with a timed flip that locks navigation,
//! the zoom ladder, container layout of the visible pages and the wiring
//! from the annotation store to repaints and persistence.

pub mod layout;
pub mod navigation;
pub mod viewer;

use annot_model::{BookId, PageAnnotationSet, SaveError};

pub use layout::{clamp_zoom, layout_pages, page_at, PagePlacement, MAX_ZOOM, MIN_ZOOM, ZOOM_STEP};
pub use navigation::{DisplayMode, NavOutcome, Navigator};
pub use viewer::{FlipbookViewer, SPREAD_GAP};

#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error("book {0} has no pages")]
    EmptyBook(BookId),
    #[error("page {0} is not part of this book")]
    UnknownPage(u32),
    #[error(transparent)]
    Save(#[from] SaveError),
}

/// The final save failed while closing. The annotations are handed back so
/// nothing from the session is lost.
#[derive(Debug, thiserror::Error)]
#[error("annotations for book {book_id} were not saved on close")]
pub struct CloseError {
    pub book_id: BookId,
    pub annotations: PageAnnotationSet,
    #[source]
    pub source: ViewerError,
}
