//! Knowledge folder access.
//!
//! The folder is walked fresh on every call; nothing is cached. Every file is
//! considered, hidden ones included, and no ignore rules apply. Symlinked
//! directories are not descended into.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

/// File path (as walked from the folder root) to its full text content.
pub type DocumentMap = BTreeMap<String, String>;

/// Read every UTF-8 file below `folder`.
///
/// A missing folder, or a path that is not a directory, yields an empty map.
/// Files that cannot be opened or are not valid UTF-8 are left out.
pub fn load_documents(folder: impl AsRef<Path>) -> DocumentMap {
    let folder = folder.as_ref();
    let mut documents = DocumentMap::new();
    if !folder.is_dir() {
        debug!(folder = %folder.display(), "knowledge folder not found");
        return documents;
    }

    for path in walk_files(folder) {
        match fs::read_to_string(&path) {
            Ok(content) => {
                documents.insert(path.to_string_lossy().into_owned(), content);
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "skipping unreadable file");
            }
        }
    }

    debug!(folder = %folder.display(), count = documents.len(), "loaded documents");
    documents
}

/// Number of files below `folder`, readable or not.
pub fn count_documents(folder: impl AsRef<Path>) -> usize {
    let folder = folder.as_ref();
    if !folder.is_dir() {
        return 0;
    }
    walk_files(folder).count()
}

fn walk_files(folder: &Path) -> impl Iterator<Item = PathBuf> {
    ignore::WalkBuilder::new(folder)
        .standard_filters(false)
        .follow_links(false)
        .build()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!(error = %e, "skipping unwalkable entry");
                None
            }
        })
        .filter(|entry| match entry.file_type() {
            Some(ft) if ft.is_file() => true,
            // Links to files count as files; links to directories do not.
            Some(ft) if ft.is_symlink() => !entry.path().is_dir(),
            _ => false,
        })
        .map(ignore::DirEntry::into_path)
}
