//! Extension / content-type lookup index derived from the descriptor union.

use std::collections::HashMap;
use std::sync::Arc;

use crate::descriptor::EngineDescriptor;

/// Lookup structure from extension and content type to the engine that
/// handles them.
///
/// Always rebuilt from scratch; when two descriptors claim the same key the
/// one visited last wins.
#[derive(Debug, Default)]
pub struct CapabilityIndex {
    by_extension: HashMap<String, Arc<EngineDescriptor>>,
    by_mime_type: HashMap<String, Arc<EngineDescriptor>>,
}

impl CapabilityIndex {
    /// Build an index by visiting `descriptors` in order.
    pub fn build<'a, I>(descriptors: I) -> Self
    where
        I: IntoIterator<Item = &'a Arc<EngineDescriptor>>,
    {
        let mut index = Self::default();
        for descriptor in descriptors {
            for ext in &descriptor.extensions {
                index
                    .by_extension
                    .insert(ext.clone(), Arc::clone(descriptor));
            }
            for ty in &descriptor.mime_types {
                index
                    .by_mime_type
                    .insert(ty.clone(), Arc::clone(descriptor));
            }
        }
        index
    }

    pub fn by_extension(&self, extension: &str) -> Option<&Arc<EngineDescriptor>> {
        self.by_extension.get(extension)
    }

    pub fn by_mime_type(&self, mime_type: &str) -> Option<&Arc<EngineDescriptor>> {
        self.by_mime_type.get(mime_type)
    }

    /// Whether `descriptor` is the instance currently winning `extension`.
    pub fn handles_extension(&self, extension: &str, descriptor: &Arc<EngineDescriptor>) -> bool {
        self.by_extension
            .get(extension)
            .is_some_and(|winner| Arc::ptr_eq(winner, descriptor))
    }

    /// All indexed extensions, sorted.
    pub fn extensions(&self) -> Vec<&str> {
        let mut exts: Vec<&str> = self.by_extension.keys().map(String::as_str).collect();
        exts.sort_unstable();
        exts
    }

    pub fn is_empty(&self) -> bool {
        self.by_extension.is_empty() && self.by_mime_type.is_empty()
    }

    /// Log which engine ended up handling each extension.
    pub fn log_bindings(&self) {
        for ext in self.extensions() {
            if let Some(engine) = self.by_extension.get(ext) {
                tracing::info!(
                    extension = %ext,
                    engine = %engine.name,
                    version = %engine.version,
                    "Script extension is now handled by engine",
                );
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(name: &str, exts: &[&str], types: &[&str]) -> Arc<EngineDescriptor> {
        Arc::new(
            EngineDescriptor::builder(name)
                .extensions(exts.iter().copied())
                .mime_types(types.iter().copied())
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn empty_union_yields_empty_index() {
        let index = CapabilityIndex::build(std::iter::empty());
        assert!(index.is_empty());
        assert!(index.by_extension("js").is_none());
        assert!(index.by_mime_type("text/javascript").is_none());
    }

    #[test]
    fn later_descriptor_wins_collisions() {
        let a = engine("a", &["x", "only-a"], &["text/x"]);
        let b = engine("b", &["x"], &["text/x"]);
        let index = CapabilityIndex::build([&a, &b]);

        assert_eq!(index.by_extension("x").unwrap().name, "b");
        assert_eq!(index.by_mime_type("text/x").unwrap().name, "b");
        assert_eq!(index.by_extension("only-a").unwrap().name, "a");
        assert!(index.handles_extension("x", &b));
        assert!(!index.handles_extension("x", &a));
    }

    #[test]
    fn matching_is_exact_and_case_sensitive() {
        let a = engine("a", &["js"], &["text/javascript"]);
        let index = CapabilityIndex::build([&a]);

        assert!(index.by_extension("JS").is_none());
        assert!(index.by_extension(".js").is_none());
        assert!(index.by_mime_type("text/*").is_none());
    }

    #[test]
    fn extensions_are_sorted() {
        let a = engine("a", &["zz", "aa", "mm"], &[]);
        let index = CapabilityIndex::build([&a]);
        assert_eq!(index.extensions(), vec!["aa", "mm", "zz"]);
    }
}
