//! Hot-pluggable modules and descriptor discovery.
//!
//! A [`Module`] advertises script engines by carrying a manifest at
//! [`ENGINE_MANIFEST_PATH`] that lists one engine identifier per line.
//! Discovery reads the manifest and asks the module to instantiate each
//! identifier; failures are collected per entry and never abort the scan.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::descriptor::EngineDescriptor;
use crate::error::{BoxError, DiscoveryError};

/// Well-known resource path of the engine discovery manifest.
pub const ENGINE_MANIFEST_PATH: &str = "META-INF/services/script-engine-factory";

/// Stable identity of a module across activations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleId(String);

impl ModuleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModuleId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A unit of code that may appear and disappear at runtime.
pub trait Module: Send + Sync {
    fn id(&self) -> ModuleId;

    /// Read a resource shipped inside the module.
    ///
    /// Returns `Ok(None)` when the module has no such resource.
    fn read_resource(&self, path: &str) -> std::io::Result<Option<String>>;

    /// Create the descriptor for one manifest identifier.
    fn instantiate(&self, identifier: &str) -> Result<EngineDescriptor, BoxError>;
}

/// Environment that knows which modules are currently active.
///
/// Only consulted once, when the registry starts; later changes arrive
/// through the registry's `notify_module_*` calls.
pub trait ModuleHost {
    fn active_modules(&self) -> Vec<Arc<dyn Module>>;
}

/// Descriptors harvested from one module manifest.
#[derive(Debug, Default)]
pub struct ModuleHarvest {
    pub descriptors: Vec<Arc<EngineDescriptor>>,
    pub failures: Vec<DiscoveryError>,
}

/// Identifiers listed in a manifest, in order.
///
/// Surrounding whitespace is trimmed; blank lines and `#` comments are
/// skipped.
pub fn manifest_entries(manifest: &str) -> impl Iterator<Item = &str> {
    manifest
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}

/// Scan `module` for engine descriptors.
///
/// * `Ok(None)`: the module carries no manifest.
/// * `Err(_)`: the manifest exists but could not be read.
/// * `Ok(Some(harvest))`: every entry was attempted; entries that failed
///   to instantiate or validate are listed in `harvest.failures`.
pub fn harvest(module: &dyn Module) -> Result<Option<ModuleHarvest>, DiscoveryError> {
    let id = module.id();
    let manifest = module
        .read_resource(ENGINE_MANIFEST_PATH)
        .map_err(|source| DiscoveryError::ManifestUnreadable {
            module: id.clone(),
            source,
        })?;

    let Some(manifest) = manifest else {
        return Ok(None);
    };

    let mut harvest = ModuleHarvest::default();
    for identifier in manifest_entries(&manifest) {
        let loaded = module.instantiate(identifier).and_then(|descriptor| {
            descriptor.validate()?;
            Ok(descriptor)
        });

        match loaded {
            Ok(descriptor) => {
                tracing::info!(
                    module = %id,
                    engine = %descriptor.name,
                    version = %descriptor.version,
                    language = %descriptor.language_name,
                    language_version = %descriptor.language_version,
                    "Discovered script engine",
                );
                harvest.descriptors.push(Arc::new(descriptor));
            }
            Err(source) => {
                let err = DiscoveryError::Instantiation {
                    module: id.clone(),
                    identifier: identifier.to_string(),
                    source,
                };
                tracing::warn!(error = %err, "Skipping script engine manifest entry");
                harvest.failures.push(err);
            }
        }
    }

    Ok(Some(harvest))
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------

/// In-memory module used by the unit tests of this crate.
#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;

    use super::*;

    #[derive(Debug, Default)]
    pub struct StaticModule {
        pub id: String,
        pub manifest: Option<String>,
        pub engines: HashMap<String, EngineDescriptor>,
        pub unreadable: bool,
    }

    impl StaticModule {
        pub fn new(id: &str) -> Self {
            Self {
                id: id.to_string(),
                ..Default::default()
            }
        }

        /// Add `descriptor` under `identifier` and list it in the manifest.
        pub fn with_engine(mut self, identifier: &str, descriptor: EngineDescriptor) -> Self {
            self.engines.insert(identifier.to_string(), descriptor);
            self.with_entry(identifier)
        }

        /// List `identifier` in the manifest without backing it.
        pub fn with_entry(mut self, identifier: &str) -> Self {
            let manifest = self.manifest.get_or_insert_with(String::new);
            manifest.push_str(identifier);
            manifest.push('\n');
            self
        }

        pub fn unreadable(mut self) -> Self {
            self.unreadable = true;
            self
        }
    }

    impl Module for StaticModule {
        fn id(&self) -> ModuleId {
            ModuleId::new(self.id.as_str())
        }

        fn read_resource(&self, path: &str) -> std::io::Result<Option<String>> {
            if self.unreadable {
                return Err(std::io::Error::other("resource stream closed"));
            }
            if path == ENGINE_MANIFEST_PATH {
                Ok(self.manifest.clone())
            } else {
                Ok(None)
            }
        }

        fn instantiate(&self, identifier: &str) -> Result<EngineDescriptor, BoxError> {
            self.engines
                .get(identifier)
                .cloned()
                .ok_or_else(|| format!("unknown engine '{identifier}'").into())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
