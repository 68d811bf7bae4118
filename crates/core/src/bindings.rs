//! Context enrichment (bindings) providers, generic or scoped per engine.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};

/// Contributes extra values to the execution context of a script.
pub trait BindingsProvider: Send + Sync {
    fn add_bindings(&self, bindings: &mut Map<String, Value>);
}

/// Providers compare by identity, not by value.
fn same_provider(a: &Arc<dyn BindingsProvider>, b: &Arc<dyn BindingsProvider>) -> bool {
    std::ptr::eq(Arc::as_ptr(a).cast::<()>(), Arc::as_ptr(b).cast::<()>())
}

/// Registered bindings providers.
///
/// A provider registered without a target engine lands in the generic set;
/// one registered with a target lands in that engine's set only.
#[derive(Default)]
pub struct BindingsAggregator {
    generic: Vec<Arc<dyn BindingsProvider>>,
    per_engine: HashMap<String, Vec<Arc<dyn BindingsProvider>>>,
}

impl BindingsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `provider`. Returns `false` if it was already registered
    /// for the same target.
    pub fn register(&mut self, provider: Arc<dyn BindingsProvider>, engine: Option<&str>) -> bool {
        let set = match engine {
            None => &mut self.generic,
            Some(name) => self.per_engine.entry(name.to_string()).or_default(),
        };
        if set.iter().any(|p| same_provider(p, &provider)) {
            return false;
        }
        set.push(provider);
        true
    }

    /// Remove `provider` from the set chosen by `engine`. Absent providers
    /// are ignored.
    pub fn unregister(
        &mut self,
        provider: &Arc<dyn BindingsProvider>,
        engine: Option<&str>,
    ) -> bool {
        match engine {
            None => remove_provider(&mut self.generic, provider),
            Some(name) => {
                let Some(set) = self.per_engine.get_mut(name) else {
                    return false;
                };
                let removed = remove_provider(set, provider);
                if set.is_empty() {
                    self.per_engine.remove(name);
                }
                removed
            }
        }
    }

    /// Providers that apply to `engine_name`: the generic set followed by
    /// the engine's own set.
    ///
    /// The returned vector is a snapshot; later registrations do not affect
    /// it.
    pub fn resolve(&self, engine_name: &str) -> Vec<Arc<dyn BindingsProvider>> {
        let scoped = self.per_engine.get(engine_name).into_iter().flatten();
        self.generic.iter().chain(scoped).cloned().collect()
    }

    pub fn generic_count(&self) -> usize {
        self.generic.len()
    }

    pub fn engine_count(&self, engine_name: &str) -> usize {
        self.per_engine.get(engine_name).map_or(0, Vec::len)
    }

    pub fn clear(&mut self) {
        self.generic.clear();
        self.per_engine.clear();
    }
}

fn remove_provider(
    set: &mut Vec<Arc<dyn BindingsProvider>>,
    provider: &Arc<dyn BindingsProvider>,
) -> bool {
    let before = set.len();
    set.retain(|p| !same_provider(p, provider));
    set.len() != before
}

/// Run `providers` in order against a fresh bindings map.
pub fn collect_bindings(providers: &[Arc<dyn BindingsProvider>]) -> Map<String, Value> {
    let mut bindings = Map::new();
    for provider in providers {
        provider.add_bindings(&mut bindings);
    }
    bindings
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
