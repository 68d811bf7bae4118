//! The script-engine registry: lifecycle coordination and resolution.
//!
//! [`ScriptEngineRegistry`] owns both provider feeds, the bindings
//! aggregator and the cached [`CapabilityIndex`] behind one `RwLock`.
//! Every mutation takes the write lock and marks the index stale; the next
//! lookup rebuilds it from the full union of descriptors. Lookups against a
//! fresh index only hold the read lock long enough to clone an `Arc`.
//!
//! Hosts drive the registry explicitly:
//!
//! * [`start`](ScriptEngineRegistry::start) seeds it from the modules that
//!   are already active;
//! * [`notify_module_activated`](ScriptEngineRegistry::notify_module_activated)
//!   and [`notify_module_deactivated`](ScriptEngineRegistry::notify_module_deactivated)
//!   follow module lifecycle changes;
//! * [`bind_descriptor`](ScriptEngineRegistry::bind_descriptor) and
//!   [`unbind_descriptor`](ScriptEngineRegistry::unbind_descriptor) follow
//!   directly registered engines.
//!
//! Events for one mutation are posted after the state lock is released but
//! before the next mutation's events, so a sink observes them in the order
//! the mutations were applied.

use std::collections::HashMap;
use std::fmt;
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::bindings::{collect_bindings, BindingsAggregator, BindingsProvider};
use crate::descriptor::EngineDescriptor;
use crate::error::{DiscoveryError, RegistryError};
use crate::events::{EngineTopic, EventSink, ScriptEngineEvent};
use crate::index::CapabilityIndex;
use crate::module::{self, Module, ModuleHost, ModuleId};
use crate::naming;
use crate::sources::{EngineSource, ProviderSources};

// ---------------------------------------------------------------------------
// Public result types
// ---------------------------------------------------------------------------

/// A resource matched to the engine that handles it.
#[derive(Clone)]
pub struct ScriptResolution {
    pub path: String,
    pub extension: String,
    pub engine: Arc<EngineDescriptor>,
    /// Generic providers first, then providers scoped to `engine`.
    pub providers: Vec<Arc<dyn BindingsProvider>>,
}

impl ScriptResolution {
    /// Assemble the execution context by running every provider in order.
    pub fn bindings(&self) -> Map<String, Value> {
        collect_bindings(&self.providers)
    }
}

impl fmt::Debug for ScriptResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptResolution")
            .field("path", &self.path)
            .field("extension", &self.extension)
            .field("engine", &self.engine.name)
            .field("providers", &self.providers.len())
            .finish()
    }
}

/// Outcome of a module activation.
#[derive(Debug)]
pub struct ActivationReport {
    pub module: ModuleId,
    /// Whether the module is now part of the module-sourced feed.
    pub tracked: bool,
    pub loaded: Vec<Arc<EngineDescriptor>>,
    pub failures: Vec<DiscoveryError>,
}

impl ActivationReport {
    fn untracked(module: ModuleId) -> Self {
        Self {
            module,
            tracked: false,
            loaded: Vec::new(),
            failures: Vec::new(),
        }
    }
}

/// Diagnostic view of one known descriptor.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineInfo {
    pub descriptor: EngineDescriptor,
    pub source: EngineSource,
    /// Extensions this descriptor currently wins in the index.
    pub active_extensions: Vec<String>,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Everything guarded by the registry's exclusion domain.
struct RegistryState {
    sources: ProviderSources,
    bindings: BindingsAggregator,
    /// `None` while stale.
    index: Option<Arc<CapabilityIndex>>,
    /// Bumped on every deactivation; an activation whose harvest straddles
    /// one is discarded.
    stop_epochs: HashMap<ModuleId, u64>,
    running: bool,
}

impl RegistryState {
    fn stop_epoch(&self, module: &ModuleId) -> u64 {
        self.stop_epochs.get(module).copied().unwrap_or(0)
    }

    fn invalidate(&mut self) {
        self.index = None;
    }

    fn ensure_index(&mut self) -> Arc<CapabilityIndex> {
        if let Some(index) = &self.index {
            return Arc::clone(index);
        }
        let index = Arc::new(CapabilityIndex::build(self.sources.descriptors()));
        tracing::debug!(
            extensions = index.extensions().len(),
            "Rebuilt script engine index",
        );
        index.log_bindings();
        self.index = Some(Arc::clone(&index));
        index
    }
}

/// Registry of script engines discovered from modules and bound services.
///
/// Designed to be shared as `Arc<ScriptEngineRegistry>`; every method takes
/// `&self`.
pub struct ScriptEngineRegistry {
    state: RwLock<RegistryState>,
    event_sink: RwLock<Option<Arc<dyn EventSink>>>,
    /// Taken under the state write lock and held while posting, so events
    /// leave in mutation order.
    event_order: Mutex<()>,
}

impl Default for ScriptEngineRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptEngineRegistry {
    /// Create an empty, running registry with no event sink.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RegistryState {
                sources: ProviderSources::new(),
                bindings: BindingsAggregator::new(),
                index: None,
                stop_epochs: HashMap::new(),
                running: true,
            }),
            event_sink: RwLock::new(None),
            event_order: Mutex::new(()),
        }
    }

    // ---- locking ----------------------------------------------------------

    // Every mutation leaves the state consistent before it can panic, so a
    // poisoned lock is safe to keep using.
    fn read_state(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Must be acquired while the state write lock is still held.
    fn event_order(&self) -> MutexGuard<'_, ()> {
        self.event_order.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against a fresh index, rebuilding it first if stale.
    fn with_fresh_index<R>(&self, f: impl FnOnce(&CapabilityIndex, &RegistryState) -> R) -> R {
        {
            let state = self.read_state();
            if let Some(index) = &state.index {
                return f(index.as_ref(), &*state);
            }
        }
        let mut state = self.write_state();
        let index = state.ensure_index();
        f(index.as_ref(), &*state)
    }

    /// Whether the cached index reflects the current descriptor set.
    pub fn is_index_fresh(&self) -> bool {
        self.read_state().index.is_some()
    }

    // ---- event sink -------------------------------------------------------

    /// Attach the sink that receives engine notifications, replacing any
    /// previous one.
    pub fn attach_event_sink(&self, sink: Arc<dyn EventSink>) {
        *self.event_sink.write().unwrap_or_else(PoisonError::into_inner) = Some(sink);
    }

    /// Detach the current sink. Later notifications are dropped.
    pub fn detach_event_sink(&self) -> Option<Arc<dyn EventSink>> {
        self.event_sink
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn post_events(&self, topic: EngineTopic, descriptors: &[Arc<EngineDescriptor>]) {
        if descriptors.is_empty() {
            return;
        }
        let sink = self
            .event_sink
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(sink) = sink else {
            tracing::trace!(topic = topic.as_str(), "No event sink attached, dropping");
            return;
        };
        for descriptor in descriptors {
            sink.post_event(ScriptEngineEvent::new(topic, descriptor));
        }
    }

    // ---- module feed ------------------------------------------------------

    /// Seed the module feed from every module the host reports as active.
    pub fn start(&self, host: &dyn ModuleHost) -> Vec<ActivationReport> {
        let modules = host.active_modules();
        tracing::info!(modules = modules.len(), "Scanning active modules for script engines");
        modules
            .iter()
            .map(|module| self.notify_module_activated(module.as_ref()))
            .collect()
    }

    /// React to `module` becoming active.
    ///
    /// The manifest is read and instantiated before the registry lock is
    /// taken. Modules without a manifest, or whose manifest cannot be read,
    /// contribute nothing and are not tracked.
    pub fn notify_module_activated(&self, module: &dyn Module) -> ActivationReport {
        let id = module.id();
        let epoch = {
            let state = self.read_state();
            if !state.running {
                tracing::debug!(module = %id, "Registry shut down, ignoring module activation");
                return ActivationReport::untracked(id);
            }
            state.stop_epoch(&id)
        };

        let harvest = match module::harvest(module) {
            Ok(Some(harvest)) => harvest,
            Ok(None) => {
                tracing::debug!(module = %id, "Module carries no script engine manifest");
                return ActivationReport::untracked(id);
            }
            Err(err) => {
                tracing::warn!(error = %err, "Module contributes no script engines");
                let mut report = ActivationReport::untracked(id);
                report.failures.push(err);
                return report;
            }
        };

        let (replaced, _order) = {
            let mut state = self.write_state();
            if !state.running {
                return ActivationReport::untracked(id);
            }
            if state.stop_epoch(&id) != epoch {
                tracing::debug!(
                    module = %id,
                    "Module stopped while activating, discarding its engines",
                );
                let mut report = ActivationReport::untracked(id);
                report.failures = harvest.failures;
                return report;
            }
            let replaced = state
                .sources
                .insert_module(id.clone(), harvest.descriptors.clone());
            state.invalidate();
            (replaced, self.event_order())
        };

        tracing::info!(
            module = %id,
            engines = harvest.descriptors.len(),
            failures = harvest.failures.len(),
            "Module script engines registered",
        );

        self.post_events(EngineTopic::Removed, &replaced);
        self.post_events(EngineTopic::Added, &harvest.descriptors);

        ActivationReport {
            module: id,
            tracked: true,
            loaded: harvest.descriptors,
            failures: harvest.failures,
        }
    }

    /// React to `module` being stopped. Unknown modules are ignored.
    ///
    /// Returns whether the module was tracked. An activation of the same
    /// module still in progress is discarded either way.
    pub fn notify_module_deactivated(&self, module: &ModuleId) -> bool {
        let (removed, _order) = {
            let mut state = self.write_state();
            if !state.running {
                tracing::debug!(module = %module, "Registry shut down, ignoring module deactivation");
                return false;
            }
            *state.stop_epochs.entry(module.clone()).or_default() += 1;
            let Some(removed) = state.sources.remove_module(module) else {
                return false;
            };
            state.invalidate();
            (removed, self.event_order())
        };

        tracing::info!(module = %module, engines = removed.len(), "Module script engines removed");
        self.post_events(EngineTopic::Removed, &removed);
        true
    }

    // ---- service feed -----------------------------------------------------

    /// Bind a descriptor supplied directly by the host.
    pub fn bind_descriptor(
        &self,
        descriptor: EngineDescriptor,
    ) -> Result<Arc<EngineDescriptor>, RegistryError> {
        descriptor.validate()?;
        let descriptor = Arc::new(descriptor);

        let _order = {
            let mut state = self.write_state();
            if !state.running {
                return Err(RegistryError::ShutDown);
            }
            if !state.sources.bind(Arc::clone(&descriptor)) {
                return Err(RegistryError::AlreadyBound {
                    name: descriptor.name.clone(),
                    version: descriptor.version.clone(),
                });
            }
            state.invalidate();
            self.event_order()
        };

        tracing::info!(
            engine = %descriptor.name,
            version = %descriptor.version,
            language = %descriptor.language_name,
            language_version = %descriptor.language_version,
            "Adding script engine",
        );
        self.post_events(EngineTopic::Added, std::slice::from_ref(&descriptor));
        Ok(descriptor)
    }

    /// Unbind a previously bound descriptor. Absent descriptors are ignored.
    ///
    /// Returns whether anything was removed.
    pub fn unbind_descriptor(&self, descriptor: &EngineDescriptor) -> bool {
        let (removed, _order) = {
            let mut state = self.write_state();
            let Some(removed) = state.sources.unbind(descriptor) else {
                return false;
            };
            state.invalidate();
            (removed, self.event_order())
        };

        tracing::info!(
            engine = %removed.name,
            version = %removed.version,
            "Removing script engine",
        );
        self.post_events(EngineTopic::Removed, std::slice::from_ref(&removed));
        true
    }

    // ---- bindings providers -----------------------------------------------

    /// Register a bindings provider, generic when `engine` is `None`.
    ///
    /// Returns `false` for a duplicate or once the registry is shut down.
    pub fn register_bindings_provider(
        &self,
        provider: Arc<dyn BindingsProvider>,
        engine: Option<&str>,
    ) -> bool {
        let added = {
            let mut state = self.write_state();
            if !state.running {
                tracing::debug!(
                    engine = engine.unwrap_or("*"),
                    "Registry shut down, ignoring bindings provider",
                );
                return false;
            }
            state.bindings.register(provider, engine)
        };
        tracing::debug!(engine = engine.unwrap_or("*"), added, "Registered bindings provider");
        added
    }

    /// Unregister a bindings provider from the set chosen by `engine`.
    pub fn unregister_bindings_provider(
        &self,
        provider: &Arc<dyn BindingsProvider>,
        engine: Option<&str>,
    ) -> bool {
        let removed = self.write_state().bindings.unregister(provider, engine);
        tracing::debug!(engine = engine.unwrap_or("*"), removed, "Unregistered bindings provider");
        removed
    }

    /// Snapshot of the providers that apply to `engine_name`.
    pub fn bindings_providers_for(&self, engine_name: &str) -> Vec<Arc<dyn BindingsProvider>> {
        self.read_state().bindings.resolve(engine_name)
    }

    // ---- lookups ----------------------------------------------------------

    pub fn lookup_by_extension(&self, extension: &str) -> Option<Arc<EngineDescriptor>> {
        self.with_fresh_index(|index, _| index.by_extension(extension).cloned())
    }

    pub fn lookup_by_mime_type(&self, mime_type: &str) -> Option<Arc<EngineDescriptor>> {
        self.with_fresh_index(|index, _| index.by_mime_type(mime_type).cloned())
    }

    /// Match `path` to an engine by its extension and join the bindings
    /// providers for that engine.
    pub fn resolve_by_path(&self, path: &str) -> Option<ScriptResolution> {
        let extension = naming::extension_of(path);
        self.with_fresh_index(|index, state| {
            let engine = index.by_extension(extension)?;
            Some(ScriptResolution {
                path: path.to_string(),
                extension: extension.to_string(),
                engine: Arc::clone(engine),
                providers: state.bindings.resolve(&engine.name),
            })
        })
    }

    /// First content type of the engine handling the extension of `name`.
    pub fn mime_type_for_name(&self, name: &str) -> Option<String> {
        let engine = self.lookup_by_extension(naming::extension_of(name))?;
        engine.canonical_mime_type().map(str::to_string)
    }

    /// First extension of the engine handling `mime_type`.
    pub fn extension_for_mime_type(&self, mime_type: &str) -> Option<String> {
        let engine = self.lookup_by_mime_type(mime_type)?;
        engine.canonical_extension().map(str::to_string)
    }

    /// Every known descriptor with its source, in index build order.
    pub fn engines(&self) -> Vec<EngineInfo> {
        self.with_fresh_index(|index, state| {
            state
                .sources
                .entries()
                .map(|(source, descriptor)| EngineInfo {
                    descriptor: EngineDescriptor::clone(descriptor),
                    source,
                    active_extensions: descriptor
                        .extensions
                        .iter()
                        .filter(|ext| index.handles_extension(ext, descriptor))
                        .cloned()
                        .collect(),
                })
                .collect()
        })
    }

    // ---- teardown ---------------------------------------------------------

    /// Clear every feed, drop the event sink and stop following modules.
    ///
    /// Lookups keep working against an empty index; binds are rejected.
    pub fn shutdown(&self) {
        {
            let mut state = self.write_state();
            state.running = false;
            let dropped = state.sources.clear();
            state.bindings.clear();
            state.stop_epochs.clear();
            state.invalidate();
            tracing::info!(engines = dropped.len(), "Script engine registry shut down");
        }
        self.detach_event_sink();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
