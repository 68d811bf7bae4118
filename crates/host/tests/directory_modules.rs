//! Integration tests for directory-backed modules.
//!
//! Builds module trees in a temporary directory and drives the registry
//! through [`DirectoryHost`] and [`DirectoryModule`].

use std::fs;
use std::path::Path;

use assert_matches::assert_matches;
use scripthub_core::{DiscoveryError, Module, ScriptEngineRegistry, ENGINE_MANIFEST_PATH};
use scripthub_host::directory::{DirectoryHost, DirectoryModule, ENGINES_DIR};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn write_manifest(module: &Path, lines: &[&str]) {
    let manifest = module.join(ENGINE_MANIFEST_PATH);
    fs::create_dir_all(manifest.parent().expect("manifest has a parent"))
        .expect("create manifest dir");
    fs::write(manifest, lines.join("\n")).expect("write manifest");
}

fn write_engine(module: &Path, identifier: &str, json: serde_json::Value) {
    let dir = module.join(ENGINES_DIR);
    fs::create_dir_all(&dir).expect("create engines dir");
    fs::write(dir.join(format!("{identifier}.json")), json.to_string()).expect("write engine");
}

fn engine_json(name: &str, ext: &str, mime: &str) -> serde_json::Value {
    serde_json::json!({
        "name": name,
        "version": "1.0",
        "languageName": name,
        "languageVersion": "1",
        "extensions": [ext],
        "mimeTypes": [mime]
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// A manifest with a missing and a malformed entry still loads the rest.
#[test]
fn partial_manifest_loads_valid_entries() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let module_dir = tmp.path().join("js-engines");
    write_manifest(&module_dir, &["# engines", "rhino", "missing", "", "broken", "nashorn"]);
    write_engine(&module_dir, "rhino", engine_json("rhino", "ecma", "text/ecmascript"));
    write_engine(&module_dir, "nashorn", engine_json("nashorn", "js", "text/javascript"));
    fs::write(module_dir.join(ENGINES_DIR).join("broken.json"), "{ not json").unwrap();

    let registry = ScriptEngineRegistry::new();
    let report = registry.notify_module_activated(&DirectoryModule::new(&module_dir));

    assert!(report.tracked);
    assert_eq!(report.module.as_str(), "js-engines");
    let loaded: Vec<&str> = report.loaded.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(loaded, vec!["rhino", "nashorn"]);
    assert_eq!(report.failures.len(), 2);
    for failure in &report.failures {
        assert_matches!(failure, DiscoveryError::Instantiation { .. });
    }

    assert_eq!(registry.lookup_by_extension("ecma").unwrap().name, "rhino");
    assert_eq!(
        registry.extension_for_mime_type("text/javascript").as_deref(),
        Some("js")
    );
}

/// Directories without a manifest are scanned but not tracked.
#[test]
fn host_seeds_registry_from_directory() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let a = tmp.path().join("a-module");
    let b = tmp.path().join("b-module");
    let plain = tmp.path().join("plain");
    fs::create_dir_all(&plain).unwrap();
    fs::write(tmp.path().join("README"), "not a module").unwrap();

    write_manifest(&a, &["first"]);
    write_engine(&a, "first", engine_json("first", "x", "text/x"));
    write_manifest(&b, &["second"]);
    write_engine(&b, "second", engine_json("second", "x", "text/y"));

    let registry = ScriptEngineRegistry::new();
    let reports = registry.start(&DirectoryHost::new(tmp.path()));

    let tracked: Vec<&str> = reports
        .iter()
        .filter(|r| r.tracked)
        .map(|r| r.module.as_str())
        .collect();
    assert_eq!(tracked, vec!["a-module", "b-module"]);
    assert_eq!(reports.len(), 3);

    // Modules register in directory order, so b-module wins "x".
    assert_eq!(registry.lookup_by_extension("x").unwrap().name, "second");
    assert_eq!(registry.mime_type_for_name("/content/item.x").as_deref(), Some("text/y"));

    assert!(registry.notify_module_deactivated(&DirectoryModule::new(&b).id()));
    assert_eq!(registry.lookup_by_extension("x").unwrap().name, "first");
}

/// A missing modules directory yields an empty, working registry.
#[test]
fn missing_modules_dir_starts_empty() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let registry = ScriptEngineRegistry::new();
    let reports = registry.start(&DirectoryHost::new(tmp.path().join("absent")));

    assert!(reports.is_empty());
    assert!(registry.engines().is_empty());
    assert!(registry.resolve_by_path("/a/b.js").is_none());
}

/// Descriptors failing validation are recorded like any other failure.
#[test]
fn invalid_descriptor_file_is_skipped() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let module_dir = tmp.path().join("m");
    write_manifest(&module_dir, &["noext"]);
    write_engine(
        &module_dir,
        "noext",
        serde_json::json!({ "name": "noext", "extensions": [] }),
    );

    let registry = ScriptEngineRegistry::new();
    let report = registry.notify_module_activated(&DirectoryModule::new(&module_dir));

    assert!(report.tracked);
    assert!(report.loaded.is_empty());
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].to_string().contains("at least one extension"));
}
