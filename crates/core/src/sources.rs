//! The two descriptor feeds merged by the registry.
//!
//! [`ProviderSources`] is plain data: it performs no locking and no index
//! maintenance. The registry owns it behind its exclusion domain and
//! invalidates the capability index after every effective mutation.

use std::sync::Arc;

use serde::Serialize;

use crate::descriptor::EngineDescriptor;
use crate::module::ModuleId;

/// Where a descriptor came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "module", rename_all = "snake_case")]
pub enum EngineSource {
    Module(ModuleId),
    Service,
}

#[derive(Debug)]
struct ModuleContribution {
    module: ModuleId,
    descriptors: Vec<Arc<EngineDescriptor>>,
}

/// Module-sourced and service-sourced descriptor sets.
#[derive(Debug, Default)]
pub struct ProviderSources {
    /// In module registration order.
    modules: Vec<ModuleContribution>,
    /// In bind order.
    services: Vec<Arc<EngineDescriptor>>,
}

impl ProviderSources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the contribution of `module`.
    ///
    /// A module that is already present keeps its registration slot and has
    /// its descriptors replaced. Returns the descriptors that were replaced.
    pub fn insert_module(
        &mut self,
        module: ModuleId,
        descriptors: Vec<Arc<EngineDescriptor>>,
    ) -> Vec<Arc<EngineDescriptor>> {
        match self.modules.iter_mut().find(|c| c.module == module) {
            Some(existing) => std::mem::replace(&mut existing.descriptors, descriptors),
            None => {
                self.modules.push(ModuleContribution {
                    module,
                    descriptors,
                });
                Vec::new()
            }
        }
    }

    /// Drop the contribution of `module`, returning it if it was present.
    pub fn remove_module(&mut self, module: &ModuleId) -> Option<Vec<Arc<EngineDescriptor>>> {
        let pos = self.modules.iter().position(|c| &c.module == module)?;
        Some(self.modules.remove(pos).descriptors)
    }

    pub fn contains_module(&self, module: &ModuleId) -> bool {
        self.modules.iter().any(|c| &c.module == module)
    }

    pub fn module_ids(&self) -> impl Iterator<Item = &ModuleId> {
        self.modules.iter().map(|c| &c.module)
    }

    /// Add a service-bound descriptor.
    ///
    /// Returns `false` without changing anything when an equal descriptor
    /// is already bound.
    pub fn bind(&mut self, descriptor: Arc<EngineDescriptor>) -> bool {
        if self.services.iter().any(|d| **d == *descriptor) {
            return false;
        }
        self.services.push(descriptor);
        true
    }

    /// Remove the service-bound descriptor equal to `descriptor`.
    pub fn unbind(&mut self, descriptor: &EngineDescriptor) -> Option<Arc<EngineDescriptor>> {
        let pos = self.services.iter().position(|d| **d == *descriptor)?;
        Some(self.services.remove(pos))
    }

    /// Every known descriptor in rebuild order: modules first (registration
    /// order), then services (bind order).
    pub fn descriptors(&self) -> impl Iterator<Item = &Arc<EngineDescriptor>> {
        self.entries().map(|(_, d)| d)
    }

    /// Like [`descriptors`](Self::descriptors), paired with their source.
    pub fn entries(&self) -> impl Iterator<Item = (EngineSource, &Arc<EngineDescriptor>)> {
        let modules = self.modules.iter().flat_map(|c| {
            c.descriptors
                .iter()
                .map(move |d| (EngineSource::Module(c.module.clone()), d))
        });
        let services = self.services.iter().map(|d| (EngineSource::Service, d));
        modules.chain(services)
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty() && self.services.is_empty()
    }

    /// Drop both feeds, returning every descriptor that was present.
    pub fn clear(&mut self) -> Vec<Arc<EngineDescriptor>> {
        let drained = self.descriptors().cloned().collect();
        self.modules.clear();
        self.services.clear();
        drained
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
