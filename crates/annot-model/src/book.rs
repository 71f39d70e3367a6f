use crate::annotation::{Annotation, AnnotationId};
use crate::ModelError;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(pub String);

impl BookId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where an annotation currently lives inside a [`PageAnnotationSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub page: u32,
    pub index: usize,
}

/// Per-page ordered annotations of one book, keyed by 1-based page number.
///
/// Order within a page is paint order: later entries draw on top. Pages with
/// no annotations are not stored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "BTreeMap<u32, Vec<Annotation>>")]
pub struct PageAnnotationSet {
    pages: BTreeMap<u32, Vec<Annotation>>,
}

impl PageAnnotationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set after checking page numbers and book-wide id uniqueness.
    pub fn from_pages(pages: BTreeMap<u32, Vec<Annotation>>) -> Result<Self, ModelError> {
        let mut seen = BTreeSet::new();

        for (page, annotations) in &pages {
            if *page == 0 {
                return Err(ModelError::InvalidPage(*page));
            }

            for annotation in annotations {
                if !seen.insert(annotation.id()) {
                    return Err(ModelError::DuplicateId(annotation.id()));
                }
            }
        }

        let pages = pages.into_iter().filter(|(_, annotations)| !annotations.is_empty()).collect();
        Ok(Self { pages })
    }

    pub fn page(&self, page: u32) -> &[Annotation] {
        self.pages.get(&page).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn pages(&self) -> impl Iterator<Item = (u32, &[Annotation])> {
        self.pages.iter().map(|(page, annotations)| (*page, annotations.as_slice()))
    }

    pub fn page_numbers(&self) -> Vec<u32> {
        self.pages.keys().copied().collect()
    }

    pub fn find(&self, id: AnnotationId) -> Option<Location> {
        self.pages.iter().find_map(|(page, annotations)| {
            annotations
                .iter()
                .position(|annotation| annotation.id() == id)
                .map(|index| Location { page: *page, index })
        })
    }

    /// Looks on `page` first, then anywhere in the book.
    pub fn find_on(&self, page: u32, id: AnnotationId) -> Option<Location> {
        self.page(page)
            .iter()
            .position(|annotation| annotation.id() == id)
            .map(|index| Location { page, index })
            .or_else(|| self.find(id))
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        let location = self.find(id)?;
        self.pages.get(&location.page)?.get(location.index)
    }

    pub fn get_at(&self, location: Location) -> Option<&Annotation> {
        self.pages.get(&location.page)?.get(location.index)
    }

    pub fn get_at_mut(&mut self, location: Location) -> Option<&mut Annotation> {
        self.pages.get_mut(&location.page)?.get_mut(location.index)
    }

    pub fn push(&mut self, page: u32, annotation: Annotation) -> Location {
        let annotations = self.pages.entry(page).or_default();
        annotations.push(annotation);
        Location { page, index: annotations.len() - 1 }
    }

    /// Inserts at `location`, clamping the index to the page length.
    pub fn insert(&mut self, location: Location, annotation: Annotation) {
        let annotations = self.pages.entry(location.page).or_default();
        let index = location.index.min(annotations.len());
        annotations.insert(index, annotation);
    }

    pub fn remove(&mut self, location: Location) -> Option<Annotation> {
        let annotations = self.pages.get_mut(&location.page)?;
        if location.index >= annotations.len() {
            return None;
        }

        let removed = annotations.remove(location.index);
        if annotations.is_empty() {
            self.pages.remove(&location.page);
        }
        Some(removed)
    }

    pub fn take_page(&mut self, page: u32) -> Vec<Annotation> {
        self.pages.remove(&page).unwrap_or_default()
    }

    pub fn restore_page(&mut self, page: u32, annotations: Vec<Annotation>) {
        if annotations.is_empty() {
            self.pages.remove(&page);
        } else {
            self.pages.insert(page, annotations);
        }
    }

    pub fn len(&self) -> usize {
        self.pages.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn max_id(&self) -> Option<AnnotationId> {
        self.pages.values().flatten().map(Annotation::id).max()
    }
}

impl Serialize for PageAnnotationSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.pages.serialize(serializer)
    }
}

impl TryFrom<BTreeMap<u32, Vec<Annotation>>> for PageAnnotationSet {
    type Error = ModelError;

    fn try_from(value: BTreeMap<u32, Vec<Annotation>>) -> Result<Self, Self::Error> {
        Self::from_pages(value)
    }
}

/// One page as delivered by the page source collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page_number: u32,
    pub image_url: String,
    pub thumbnail_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageType {
    Cover,
    Blank,
    #[default]
    Numbered,
}

/// Best-effort display classification of a page. Arrives asynchronously and
/// only affects labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageClassification {
    pub page_type: PageType,
    pub display_number: Option<u32>,
}

impl PageClassification {
    /// Classification assumed until the classifier reports.
    pub fn fallback(page_number: u32) -> Self {
        Self { page_type: PageType::Numbered, display_number: Some(page_number) }
    }

    pub fn label(&self, page_number: u32) -> String {
        match self.page_type {
            PageType::Cover => "Cover".to_owned(),
            PageType::Blank => "Blank".to_owned(),
            PageType::Numbered => self.display_number.unwrap_or(page_number).to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("failed to save annotations for book {book_id}: {message}")]
pub struct SaveError {
    pub book_id: BookId,
    pub message: String,
}

/// Persistence collaborator that receives the whole annotation set of a book
/// whenever it changes. Timing and debouncing are the implementor's concern.
pub trait AnnotationSink {
    fn save_annotations(
        &mut self,
        book_id: &BookId,
        pages: &PageAnnotationSet,
    ) -> Result<(), SaveError>;
}
