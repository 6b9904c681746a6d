//! Registry of open documents
//!
//! A [`Session`] owns every document it opened or was handed. Opening a
//! path that is already open returns the existing handle, so two callers
//! editing the same file share one document.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use bandsheet_core::{Document, DocumentSettings, Error, Result};

use crate::DocumentExt;

/// Opaque reference to a document held by a [`Session`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentHandle(usize);

struct Entry {
    document: Document,
    /// Canonical path the document was opened from or last saved to
    path: Option<PathBuf>,
}

/// Open-document registry
#[derive(Default)]
pub struct Session {
    /// Closed slots stay `None` so handles are never reused
    entries: Vec<Option<Entry>>,
    by_path: HashMap<PathBuf, DocumentHandle>,
    settings: DocumentSettings,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session whose opened documents use `settings`
    pub fn with_settings(settings: DocumentSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Number of open documents
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Handles of the open documents, oldest first
    pub fn handles(&self) -> impl Iterator<Item = DocumentHandle> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_some())
            .map(|(i, _)| DocumentHandle(i))
    }

    /// Register a document that has no file yet
    pub fn insert(&mut self, document: Document) -> DocumentHandle {
        self.push(Entry { document, path: None })
    }

    /// Open a file, or return the handle of the document already open for it
    pub fn open<P: AsRef<Path>>(&mut self, path: P) -> Result<DocumentHandle> {
        let path = canonical(path.as_ref())?;
        if let Some(&handle) = self.by_path.get(&path) {
            log::debug!("{} is already open", path.display());
            return Ok(handle);
        }

        let document = Document::open_with_settings(&path, self.settings)?;
        log::debug!("opened {} ({} tables)", path.display(), document.table_count());
        let handle = self.push(Entry {
            document,
            path: Some(path.clone()),
        });
        self.by_path.insert(path, handle);
        Ok(handle)
    }

    /// Handle of the document open for `path`, if any
    pub fn find<P: AsRef<Path>>(&self, path: P) -> Option<DocumentHandle> {
        let path = fs::canonicalize(path.as_ref()).ok()?;
        self.by_path.get(&path).copied()
    }

    pub fn get(&self, handle: DocumentHandle) -> Option<&Document> {
        self.entry(handle).map(|e| &e.document)
    }

    pub fn get_mut(&mut self, handle: DocumentHandle) -> Option<&mut Document> {
        self.entries
            .get_mut(handle.0)
            .and_then(Option::as_mut)
            .map(|e| &mut e.document)
    }

    /// File the document is bound to
    pub fn path(&self, handle: DocumentHandle) -> Option<&Path> {
        self.entry(handle).and_then(|e| e.path.as_deref())
    }

    /// Save a document back to the file it is bound to
    pub fn save(&self, handle: DocumentHandle) -> Result<()> {
        let entry = self.entry(handle).ok_or_else(|| closed(handle))?;
        let path = entry
            .path
            .as_deref()
            .ok_or_else(|| Error::other("document has no file; use save_as"))?;
        entry.document.save(path)
    }

    /// Save a document to `path` and bind it to that file
    ///
    /// Fails without writing when another open document is bound to `path`.
    pub fn save_as<P: AsRef<Path>>(&mut self, handle: DocumentHandle, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(other) = self.find(path) {
            if other != handle {
                return Err(Error::other(format!(
                    "{} is open as another document",
                    path.display()
                )));
            }
        }

        let entry = self.entry(handle).ok_or_else(|| closed(handle))?;
        entry.document.save(path)?;
        let path = canonical(path)?;

        if let Some(Some(entry)) = self.entries.get_mut(handle.0) {
            if let Some(old) = entry.path.replace(path.clone()) {
                self.by_path.remove(&old);
            }
        }
        self.by_path.insert(path, handle);
        Ok(())
    }

    /// Drop a document from the session, handing it back
    pub fn close(&mut self, handle: DocumentHandle) -> Option<Document> {
        let entry = self.entries.get_mut(handle.0)?.take()?;
        if let Some(path) = &entry.path {
            self.by_path.remove(path);
            log::debug!("closed {}", path.display());
        }
        Some(entry.document)
    }

    fn entry(&self, handle: DocumentHandle) -> Option<&Entry> {
        self.entries.get(handle.0).and_then(Option::as_ref)
    }

    fn push(&mut self, entry: Entry) -> DocumentHandle {
        self.entries.push(Some(entry));
        DocumentHandle(self.entries.len() - 1)
    }
}

fn canonical(path: &Path) -> Result<PathBuf> {
    fs::canonicalize(path).map_err(|e| Error::other(format!("{}: {}", path.display(), e)))
}

fn closed(handle: DocumentHandle) -> Error {
    Error::other(format!("document {} is not open", handle.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_handles_are_not_reused() {
        let mut session = Session::new();
        let a = session.insert(Document::new());
        assert!(session.close(a).is_some());
        let b = session.insert(Document::new());
        assert_ne!(a, b);
        assert!(session.get(a).is_none());
        assert!(session.close(a).is_none());
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn test_save_without_file() {
        let mut session = Session::new();
        let handle = session.insert(Document::new());
        assert!(session.save(handle).is_err());
        assert!(session.path(handle).is_none());
    }
}
