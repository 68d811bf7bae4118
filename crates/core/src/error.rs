use crate::module::ModuleId;

/// Boxed error returned by [`Module::instantiate`](crate::module::Module::instantiate).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Contract violations surfaced to callers of the administrative API.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Invalid engine descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Engine '{name}' version '{version}' is already bound")]
    AlreadyBound { name: String, version: String },

    #[error("Registry has been shut down")]
    ShutDown,
}

/// Failures while harvesting descriptors from a module.
///
/// These are logged and reported, never propagated to lookups.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("Cannot read engine manifest of module {module}: {source}")]
    ManifestUnreadable {
        module: ModuleId,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot instantiate engine '{identifier}' from module {module}: {source}")]
    Instantiation {
        module: ModuleId,
        identifier: String,
        #[source]
        source: BoxError,
    },
}

impl DiscoveryError {
    /// The module the failure was recorded against.
    pub fn module(&self) -> &ModuleId {
        match self {
            Self::ManifestUnreadable { module, .. } | Self::Instantiation { module, .. } => module,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
