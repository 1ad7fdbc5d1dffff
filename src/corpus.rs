//! Corpus loading from a directory of plain-text files.
//!
//! Each `*.txt` file directly inside the directory is one document; its file
//! stem is the document id. Subdirectories and other extensions are skipped.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{EngineResult, SearchError};
use crate::types::DocumentId;

const DOCUMENT_EXTENSION: &str = "txt";

/// Reads every `*.txt` file in `dir` into an id-ordered map.
///
/// # Errors
/// - [`SearchError::CorpusNotFound`] when `dir` is not a directory
/// - [`SearchError::Io`] when a file cannot be read or is not valid UTF-8
pub fn load_corpus(dir: &Path) -> EngineResult<BTreeMap<DocumentId, String>> {
    if !dir.is_dir() {
        return Err(SearchError::CorpusNotFound {
            path: dir.to_path_buf(),
        });
    }

    let mut corpus = BTreeMap::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| SearchError::Io {
            path: e.path().unwrap_or(dir).to_path_buf(),
            source: e.into(),
        })?;

        let path = entry.path();
        if !entry.file_type().is_file()
            || path.extension().and_then(|ext| ext.to_str()) != Some(DOCUMENT_EXTENSION)
        {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
            debug!("Skipping file with non UTF-8 name: {}", path.display());
            continue;
        };

        let text = std::fs::read_to_string(path).map_err(|source| SearchError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        corpus.insert(DocumentId::from(stem), text);
    }

    debug!("Loaded {} documents from {}", corpus.len(), dir.display());
    Ok(corpus)
}
