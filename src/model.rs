//! Model artifact loading.
//!
//! A [`ModelArtifact`] is an immutable, read-only, memory-mapped byte region
//! holding a compiled inference graph. The artifact is mapped rather than
//! read into process memory, so multiple classifier instances opened on the
//! same file share backing pages. It stays valid for the lifetime of the
//! owning classifier and is released when the last reference is dropped.

use crate::errors::{ClassifierError, ClassifierResult};
use memmap2::Mmap;
use std::fs::File;
use std::path::{Path, PathBuf};

/// An immutable, memory-mapped model artifact.
pub struct ModelArtifact {
    mmap: Mmap,
    path: PathBuf,
    name: String,
}

impl std::fmt::Debug for ModelArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelArtifact")
            .field("path", &self.path)
            .field("name", &self.name)
            .field("len", &self.mmap.len())
            .finish()
    }
}

impl ModelArtifact {
    /// Opens and memory-maps the model file at `path`, read-only.
    ///
    /// # Errors
    ///
    /// Returns `ClassifierError::ModelLoad` if the file cannot be located,
    /// opened, or mapped, or if it is empty.
    pub fn open(path: impl AsRef<Path>) -> ClassifierResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            ClassifierError::model_load(path, "failed to open model file", Some(Box::new(e)))
        })?;

        let metadata = file.metadata().map_err(|e| {
            ClassifierError::model_load(path, "failed to read model metadata", Some(Box::new(e)))
        })?;
        if metadata.len() == 0 {
            return Err(ClassifierError::model_load(
                path,
                "model file is empty",
                None,
            ));
        }

        // Safety: the mapping is read-only and the file is treated as
        // immutable for the life of the artifact.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| {
            ClassifierError::model_load(path, "failed to memory-map model file", Some(Box::new(e)))
        })?;

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown_model")
            .to_string();

        tracing::debug!(model = %name, bytes = mmap.len(), "memory-mapped model artifact");

        Ok(Self {
            mmap,
            path: path.to_path_buf(),
            name,
        })
    }

    /// Returns the mapped model bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.mmap
    }

    /// Returns the size of the mapped region in bytes.
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    /// Returns true if the mapped region is empty (never the case for a
    /// successfully opened artifact).
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// Returns the path the artifact was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the model name derived from the file stem.
    pub fn name(&self) -> &str {
        &self.name
    }
}
