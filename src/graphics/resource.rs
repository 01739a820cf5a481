//! Named resource lookup
//!
//! Resources are found by name on an ordered list of directories; the first
//! directory containing the file wins.

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::model::Mesh;

/// Errors that can occur while locating or loading resources
#[derive(Error, Debug)]
pub enum ResourceError {
    #[error("Resource \"{name}\" not found in {searched:?}")]
    NotFound { name: String, searched: Vec<PathBuf> },
    #[error("Failed to load {path}: {reason}")]
    Load { path: PathBuf, reason: String },
    #[error("Model {0} contains no triangles")]
    EmptyModel(PathBuf),
}

/// Resolves resource names against a search path
#[derive(Debug, Clone, Default)]
pub struct ResourceLoader {
    search_paths: Vec<PathBuf>,
}

impl ResourceLoader {
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Find the first existing file with this name
    pub fn locate(&self, name: &str) -> Result<PathBuf, ResourceError> {
        let direct = Path::new(name);
        if direct.is_absolute() && direct.is_file() {
            return Ok(direct.to_path_buf());
        }

        self.search_paths
            .iter()
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| ResourceError::NotFound {
                name: name.to_string(),
                searched: self.search_paths.clone(),
            })
    }

    /// Locate and load an OBJ model
    pub fn load_model(&self, name: &str) -> Result<Mesh, ResourceError> {
        let path = self.locate(name)?;
        Mesh::load_obj(&path)
    }
}
