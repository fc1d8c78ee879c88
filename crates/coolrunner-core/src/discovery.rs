//! Suite discovery - load every test module under a directory

use crate::loader::{LoadError, ModuleLoader};
use crate::suite::Export;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// One loaded module, or the reason it could not be loaded.
#[derive(Debug)]
pub enum Candidate {
    Module { path: PathBuf, export: Export },
    LoadFailure(LoadError),
}

impl Candidate {
    pub fn path(&self) -> &Path {
        match self {
            Candidate::Module { path, .. } => path,
            Candidate::LoadFailure(err) => err.path(),
        }
    }
}

/// Walk `root` depth-first in directory listing order and load every module
/// the loader recognises.
///
/// Failures never stop the walk; they come back as
/// [`Candidate::LoadFailure`] entries in the position the file was found.
pub fn discover<L: ModuleLoader + ?Sized>(root: &Path, loader: &L) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().unwrap_or(root).to_path_buf();
                tracing::warn!(path = %path.display(), "unreadable entry during discovery");
                candidates.push(Candidate::LoadFailure(LoadError::Io {
                    path,
                    source: Arc::new(err.into()),
                }));
                continue;
            }
        };

        if !entry.file_type().is_file() || !loader.is_module(entry.path()) {
            continue;
        }

        let path = entry.into_path();
        match loader.load_fresh(&path) {
            Ok(export) => {
                tracing::debug!(path = %path.display(), ?export, "loaded module");
                candidates.push(Candidate::Module { path, export });
            }
            Err(err) => {
                tracing::warn!(error = %err, "module failed to load");
                candidates.push(Candidate::LoadFailure(err));
            }
        }
    }

    candidates
}
