//! Module loader seam
//!
//! Discovery never evaluates files itself. It asks a [`ModuleLoader`] whether
//! a path is a test module and, if so, to load it fresh.

use crate::suite::Export;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// A test module that could not be loaded.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("failed to load {}: {message}", path.display())]
    Invalid { path: PathBuf, message: String },
}

impl LoadError {
    /// The file (or directory) that failed.
    pub fn path(&self) -> &Path {
        match self {
            LoadError::Io { path, .. } | LoadError::Invalid { path, .. } => path,
        }
    }
}

/// Loads test modules from disk.
pub trait ModuleLoader {
    /// Whether `path` is a test module this loader understands.
    fn is_module(&self, path: &Path) -> bool;

    /// Evaluate the module at `path`, bypassing anything memoised by earlier loads.
    fn load_fresh(&self, path: &Path) -> Result<Export, LoadError>;

    /// Forget anything memoised so the next run re-reads current file contents.
    fn invalidate(&self) {}
}

impl<L: ModuleLoader + ?Sized> ModuleLoader for &L {
    fn is_module(&self, path: &Path) -> bool {
        (**self).is_module(path)
    }

    fn load_fresh(&self, path: &Path) -> Result<Export, LoadError> {
        (**self).load_fresh(path)
    }

    fn invalidate(&self) {
        (**self).invalidate()
    }
}
