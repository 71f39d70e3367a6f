use anyhow::{Context, Result};
use annot_model::{BookId, PageAnnotationSet, PageClassification, PageInfo, PageSize};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Headless stand-in for the page source: page records plus the natural
/// size each page image would report once loaded.
#[derive(Debug, Clone, Deserialize)]
pub struct BookFile {
    pub book_id: BookId,
    pub pages: Vec<BookPage>,
    #[serde(default)]
    pub annotations: PageAnnotationSet,
    #[serde(default)]
    pub classifications: BTreeMap<u32, PageClassification>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookPage {
    #[serde(flatten)]
    pub info: PageInfo,
    pub width: f32,
    pub height: f32,
}

impl BookPage {
    pub fn size(&self) -> PageSize {
        PageSize::new(self.width, self.height)
    }
}

impl BookFile {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("file does not exist: {}", path.display());
        }

        let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_slice(&bytes).context("failed to parse book file")
    }

    pub fn page_infos(&self) -> Vec<PageInfo> {
        self.pages.iter().map(|page| page.info.clone()).collect()
    }

    pub fn page(&self, page_number: u32) -> Option<&BookPage> {
        self.pages.iter().find(|page| page.info.page_number == page_number)
    }
}

#[derive(Debug, Serialize)]
pub struct BookSummary {
    pub book_id: String,
    pub page_count: usize,
    pub annotation_count: usize,
    pub pages: Vec<PageSummary>,
}

#[derive(Debug, Serialize)]
pub struct PageSummary {
    pub page: u32,
    pub label: String,
    pub annotations: usize,
    pub types: BTreeMap<String, usize>,
}

pub fn summarize(book: &BookFile, annotations: &PageAnnotationSet) -> BookSummary {
    let pages = book
        .pages
        .iter()
        .map(|page| {
            let number = page.info.page_number;
            let label = book
                .classifications
                .get(&number)
                .copied()
                .unwrap_or_else(|| PageClassification::fallback(number))
                .label(number);

            let mut types = BTreeMap::new();
            for annotation in annotations.page(number) {
                *types.entry(annotation.type_name().to_owned()).or_insert(0) += 1;
            }

            PageSummary { page: number, label, annotations: annotations.page(number).len(), types }
        })
        .collect();

    BookSummary {
        book_id: book.book_id.to_string(),
        page_count: book.pages.len(),
        annotation_count: annotations.len(),
        pages,
    }
}
