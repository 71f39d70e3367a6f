use annot_model::{AnnotationSink, BookId, EditorSettings, PageAnnotationSet, SaveError};
use directories::ProjectDirs;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const ANNOTATIONS_SCHEMA_VERSION: u32 = 1;
const SETTINGS_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("unable to resolve local data directory")]
    NoDataDirectory,
    #[error("invalid book id: {0:?}")]
    InvalidBookId(String),
    #[error("unsupported schema version {found} (expected at most {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// JSON files under one root: `books/<book id>.json` per book and
/// `settings.json` for the editor settings.
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

#[derive(Debug, Serialize)]
struct AnnotationsEnvelopeRef<'a> {
    version: u32,
    book_id: &'a BookId,
    annotations: &'a PageAnnotationSet,
}

#[derive(Debug, Deserialize)]
struct AnnotationsEnvelope {
    version: u32,
    annotations: PageAnnotationSet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SettingsEnvelope {
    version: u32,
    settings: EditorSettings,
}

impl Storage {
    pub fn from_default_project() -> Result<Self, StorageError> {
        let dirs = ProjectDirs::from("dev", "Flipbook", "Flipbook")
            .ok_or(StorageError::NoDataDirectory)?;

        Ok(Self { root: dirs.data_local_dir().to_path_buf() })
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Annotations saved for `book_id`; an empty set if none were saved yet.
    pub fn load_annotations(&self, book_id: &BookId) -> Result<PageAnnotationSet, StorageError> {
        let path = self.book_path(book_id)?;
        if !path.exists() {
            debug!("no saved annotations for book {book_id}");
            return Ok(PageAnnotationSet::new());
        }

        let bytes = fs::read(&path)?;
        let envelope: AnnotationsEnvelope = serde_json::from_slice(&bytes)?;
        check_version(envelope.version, ANNOTATIONS_SCHEMA_VERSION)?;

        info!("loaded {} annotations for book {book_id}", envelope.annotations.len());
        Ok(envelope.annotations)
    }

    pub fn store_annotations(
        &self,
        book_id: &BookId,
        annotations: &PageAnnotationSet,
    ) -> Result<(), StorageError> {
        let path = self.book_path(book_id)?;
        let envelope =
            AnnotationsEnvelopeRef { version: ANNOTATIONS_SCHEMA_VERSION, book_id, annotations };

        write_atomically(&path, &serde_json::to_vec_pretty(&envelope)?)?;
        debug!("wrote {} annotations to {}", annotations.len(), path.display());
        Ok(())
    }

    pub fn delete_annotations(&self, book_id: &BookId) -> Result<bool, StorageError> {
        let path = self.book_path(book_id)?;
        if !path.exists() {
            return Ok(false);
        }

        fs::remove_file(path)?;
        Ok(true)
    }

    /// Books with saved annotations, sorted by id.
    pub fn list_books(&self) -> Result<Vec<BookId>, StorageError> {
        let dir = self.books_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut books: Vec<BookId> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                    return None;
                }
                path.file_stem().and_then(|stem| stem.to_str()).map(BookId::new)
            })
            .collect();
        books.sort();
        Ok(books)
    }

    pub fn load_settings(&self) -> Result<EditorSettings, StorageError> {
        let path = self.settings_path();
        if !path.exists() {
            return Ok(EditorSettings::default());
        }

        let bytes = fs::read(path)?;
        let envelope: SettingsEnvelope = serde_json::from_slice(&bytes)?;
        check_version(envelope.version, SETTINGS_SCHEMA_VERSION)?;

        Ok(envelope.settings)
    }

    pub fn save_settings(&self, settings: &EditorSettings) -> Result<(), StorageError> {
        let envelope =
            SettingsEnvelope { version: SETTINGS_SCHEMA_VERSION, settings: settings.clone() };

        write_atomically(&self.settings_path(), &serde_json::to_vec_pretty(&envelope)?)?;
        Ok(())
    }

    fn books_dir(&self) -> PathBuf {
        self.root.join("books")
    }

    fn book_path(&self, book_id: &BookId) -> Result<PathBuf, StorageError> {
        let id = book_id.as_str();
        let valid = !id.is_empty()
            && !id.starts_with('.')
            && id.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(StorageError::InvalidBookId(id.to_owned()));
        }

        Ok(self.books_dir().join(format!("{id}.json")))
    }

    fn settings_path(&self) -> PathBuf {
        self.root.join("settings.json")
    }
}

impl AnnotationSink for Storage {
    fn save_annotations(
        &mut self,
        book_id: &BookId,
        pages: &PageAnnotationSet,
    ) -> Result<(), SaveError> {
        self.store_annotations(book_id, pages)
            .map_err(|error| SaveError { book_id: book_id.clone(), message: error.to_string() })
    }
}

fn check_version(found: u32, supported: u32) -> Result<(), StorageError> {
    if found > supported {
        return Err(StorageError::UnsupportedVersion { found, supported });
    }
    Ok(())
}

/// Writes through a sibling temp file so a crash never leaves a torn file.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp = path.with_extension("json.tmp");
    fs::write(&temp, bytes)?;
    fs::rename(&temp, path)?;
    Ok(())
}
