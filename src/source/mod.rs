//! Document sources feeding ingestion
//!
//! The retrieval core only ever reads from a source: it lists documents once
//! and fetches each one's text.

use crate::error::{DocIndexError, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Read-only supplier of raw documents
pub trait DocumentSource: Send + Sync {
    /// Names of every available document
    fn list_documents(&self) -> Result<Vec<String>>;

    /// Text content of one document
    fn get_document_content(&self, name: &str) -> Result<String>;
}

/// Documents on disk under a root directory
///
/// Names are `/`-separated paths relative to the root. Hidden files and
/// directories are skipped, as is anything whose extension is not listed.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    extensions: Vec<String>,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>, extensions: &[String]) -> Self {
        Self {
            root: root.into(),
            extensions: extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn accepts(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
            .unwrap_or(false)
    }

    fn walk(&self, dir: &Path, names: &mut Vec<String>) -> Result<()> {
        let entries = std::fs::read_dir(dir).map_err(|e| DocIndexError::Io {
            source: e,
            context: format!("Failed to read directory: {:?}", dir),
        })?;

        for entry in entries {
            let entry = entry.map_err(|e| DocIndexError::Io {
                source: e,
                context: format!("Failed to read entry in {:?}", dir),
            })?;

            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }

            let path = entry.path();
            if path.is_dir() {
                self.walk(&path, names)?;
            } else if path.is_file() && self.accepts(&path) {
                if let Ok(relative) = path.strip_prefix(&self.root) {
                    let name = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/");
                    names.push(name);
                }
            }
        }

        Ok(())
    }
}

impl DocumentSource for DirectorySource {
    fn list_documents(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Err(DocIndexError::Source(format!(
                "Document directory not found: {:?}",
                self.root
            )));
        }

        let mut names = Vec::new();
        self.walk(&self.root, &mut names)?;
        names.sort();
        Ok(names)
    }

    fn get_document_content(&self, name: &str) -> Result<String> {
        if name.split('/').any(|part| part == "..") {
            return Err(DocIndexError::Source(format!(
                "Document name escapes the source root: {}",
                name
            )));
        }

        let path = self.root.join(name);
        std::fs::read_to_string(&path).map_err(|e| DocIndexError::Io {
            source: e,
            context: format!("Failed to read document: {:?}", path),
        })
    }
}

/// In-memory documents, keyed by name
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    documents: BTreeMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, name: &str, content: &str) -> Self {
        self.insert(name, content);
        self
    }

    pub fn insert(&mut self, name: &str, content: &str) {
        self.documents.insert(name.to_string(), content.to_string());
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl DocumentSource for MemorySource {
    fn list_documents(&self) -> Result<Vec<String>> {
        Ok(self.documents.keys().cloned().collect())
    }

    fn get_document_content(&self, name: &str) -> Result<String> {
        self.documents
            .get(name)
            .cloned()
            .ok_or_else(|| DocIndexError::Source(format!("Unknown document: {}", name)))
    }
}
