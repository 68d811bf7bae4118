//! Modules backed by plain directories on disk.
//!
//! Layout of one module:
//!
//! ```text
//! <modules_dir>/<module>/
//!     META-INF/services/script-engine-factory   one identifier per line
//!     engines/<identifier>.json                 EngineDescriptor as JSON
//! ```
//!
//! The directory name is the module id.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use scripthub_core::error::BoxError;
use scripthub_core::{EngineDescriptor, Module, ModuleHost, ModuleId};

/// Sub-directory holding descriptor definitions.
pub const ENGINES_DIR: &str = "engines";

/// Errors raised while instantiating a descriptor from a module directory.
#[derive(Debug, thiserror::Error)]
pub enum DescriptorLoadError {
    #[error("Invalid engine identifier '{0}'")]
    InvalidIdentifier(String),

    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Identifiers map straight onto file names, so only a conservative
/// character set is accepted.
fn is_safe_identifier(identifier: &str) -> bool {
    !identifier.is_empty()
        && identifier.len() <= 128
        && !identifier.starts_with('.')
        && identifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}

/// A module rooted at a directory.
#[derive(Debug, Clone)]
pub struct DirectoryModule {
    id: ModuleId,
    root: PathBuf,
}

impl DirectoryModule {
    /// Module whose id is the final component of `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let id = root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| root.display().to_string());
        Self {
            id: ModuleId::new(id),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn descriptor_path(&self, identifier: &str) -> PathBuf {
        self.root
            .join(ENGINES_DIR)
            .join(format!("{identifier}.json"))
    }

    fn load_descriptor(&self, identifier: &str) -> Result<EngineDescriptor, DescriptorLoadError> {
        if !is_safe_identifier(identifier) {
            return Err(DescriptorLoadError::InvalidIdentifier(identifier.to_string()));
        }
        let path = self.descriptor_path(identifier);
        let raw = std::fs::read_to_string(&path).map_err(|source| DescriptorLoadError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| DescriptorLoadError::Parse { path, source })
    }
}

impl Module for DirectoryModule {
    fn id(&self) -> ModuleId {
        self.id.clone()
    }

    fn read_resource(&self, path: &str) -> std::io::Result<Option<String>> {
        let full = self.root.join(path);
        match std::fs::read_to_string(&full) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn instantiate(&self, identifier: &str) -> Result<EngineDescriptor, BoxError> {
        Ok(self.load_descriptor(identifier)?)
    }
}

/// [`ModuleHost`] treating every sub-directory of `modules_dir` as an
/// active module.
#[derive(Debug, Clone)]
pub struct DirectoryHost {
    modules_dir: PathBuf,
}

impl DirectoryHost {
    pub fn new(modules_dir: impl Into<PathBuf>) -> Self {
        Self {
            modules_dir: modules_dir.into(),
        }
    }

    /// Sub-directories of the modules directory, sorted by name.
    pub fn modules(&self) -> std::io::Result<Vec<DirectoryModule>> {
        let mut roots = Vec::new();
        for entry in std::fs::read_dir(&self.modules_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                roots.push(entry.path());
            }
        }
        roots.sort();
        Ok(roots.into_iter().map(DirectoryModule::new).collect())
    }
}

impl ModuleHost for DirectoryHost {
    fn active_modules(&self) -> Vec<Arc<dyn Module>> {
        match self.modules() {
            Ok(modules) => modules
                .into_iter()
                .map(|m| Arc::new(m) as Arc<dyn Module>)
                .collect(),
            Err(err) => {
                tracing::warn!(
                    dir = %self.modules_dir.display(),
                    error = %err,
                    "Cannot list modules directory, starting without modules",
                );
                Vec::new()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
