//! JSON output produced by the host binary.

use serde::Serialize;
use serde_json::{Map, Value};

use scripthub_core::{BindingsProvider, ScriptEngineRegistry};

/// Fixed set of bindings contributed by the host itself.
#[derive(Debug, Clone, Default)]
pub struct StaticBindings {
    values: Map<String, Value>,
}

impl StaticBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl BindingsProvider for StaticBindings {
    fn add_bindings(&self, bindings: &mut Map<String, Value>) {
        for (key, value) in &self.values {
            bindings.insert(key.clone(), value.clone());
        }
    }
}

/// Resolution outcome for one path.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathReport {
    pub path: String,
    pub extension: String,
    /// `None` when no engine handles the extension.
    pub engine: Option<String>,
    pub engine_version: Option<String>,
    pub mime_type: Option<String>,
    pub bindings: Map<String, Value>,
}

/// Resolve `path` and describe the outcome.
pub fn report_path(registry: &ScriptEngineRegistry, path: &str) -> PathReport {
    let extension = scripthub_core::naming::extension_of(path).to_string();
    match registry.resolve_by_path(path) {
        Some(resolution) => PathReport {
            path: resolution.path.clone(),
            extension,
            engine: Some(resolution.engine.name.clone()),
            engine_version: Some(resolution.engine.version.clone()),
            mime_type: resolution.engine.canonical_mime_type().map(str::to_string),
            bindings: resolution.bindings(),
        },
        None => PathReport {
            path: path.to_string(),
            extension,
            engine: None,
            engine_version: None,
            mime_type: None,
            bindings: Map::new(),
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use scripthub_core::EngineDescriptor;

    use super::*;

    #[test]
    fn resolved_path_includes_engine_and_bindings() {
        let registry = ScriptEngineRegistry::new();
        registry
            .bind_descriptor(
                EngineDescriptor::builder("rhino")
                    .version("1.7")
                    .extension("ecma")
                    .mime_type("text/ecmascript")
                    .build()
                    .unwrap(),
            )
            .unwrap();
        registry.register_bindings_provider(
            Arc::new(StaticBindings::new().with("host", "test")),
            None,
        );

        let report = report_path(&registry, "/apps/page/html.ecma");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["engine"], "rhino");
        assert_eq!(json["engineVersion"], "1.7");
        assert_eq!(json["mimeType"], "text/ecmascript");
        assert_eq!(json["extension"], "ecma");
        assert_eq!(json["bindings"]["host"], "test");
    }

    #[test]
    fn unresolved_path_reports_null_engine() {
        let registry = ScriptEngineRegistry::new();
        let report = report_path(&registry, "/apps/page/html.jsp");
        let json = serde_json::to_value(&report).unwrap();
        assert!(json["engine"].is_null());
        assert_eq!(json["extension"], "jsp");
        assert!(json["bindings"].as_object().unwrap().is_empty());
    }
}
