//! Checklist loading.
//!
//! A checklist is plain text, one task per line. Lines that are blank after
//! trimming, or whose first non-whitespace character is `#`, are dropped.
//!
//! # Invariants
//! - Item indices are dense and zero-based (`items[i].index == i`)
//! - Item text is trimmed and non-empty
//! - A `Checklist` is never mutated after load

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Hard failure while reading a checklist source.
///
/// An empty checklist is *not* an error; see [`Checklist::load`].
#[derive(Debug, Error)]
pub enum ChecklistError {
    #[error("Failed to read checklist {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Checklist {path} is not valid UTF-8 text")]
    NotUtf8 { path: PathBuf },
}

/// A single step of a procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    index: usize,
    text: String,
}

impl ChecklistItem {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Ordered, immutable sequence of checklist items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checklist {
    items: Vec<ChecklistItem>,
}

impl Checklist {
    /// Parse raw checklist text.
    ///
    /// Fails soft: text with no surviving lines yields an empty checklist,
    /// which callers must check with [`Checklist::is_empty`].
    pub fn load(raw_text: &str) -> Self {
        let items = raw_text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .enumerate()
            .map(|(index, line)| ChecklistItem {
                index,
                text: line.to_string(),
            })
            .collect();

        Self { items }
    }

    /// Read and parse a checklist file.
    ///
    /// # Errors
    /// `ChecklistError` if the file cannot be read or is not UTF-8. A readable
    /// file with no task lines returns `Ok` with an empty checklist.
    pub async fn load_file(path: impl AsRef<Path>) -> Result<Self, ChecklistError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| ChecklistError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let text = String::from_utf8(bytes).map_err(|_| ChecklistError::NotUtf8 {
            path: path.to_path_buf(),
        })?;

        let checklist = Self::load(&text);
        tracing::debug!(
            "Loaded {} checklist items from {}",
            checklist.len(),
            path.display()
        );
        Ok(checklist)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ChecklistItem> {
        self.items.get(index)
    }

    pub fn items(&self) -> &[ChecklistItem] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChecklistItem> {
        self.items.iter()
    }
}
