//! Identity and capability metadata for one script engine.

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// Metadata describing one script-engine implementation.
///
/// Descriptors are never mutated once handed to the registry; they are
/// shared as `Arc<EngineDescriptor>` between the provider sources and the
/// capability index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineDescriptor {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub language_name: String,
    #[serde(default)]
    pub language_version: String,
    /// File extensions claimed by the engine, in declaration order.
    #[serde(default)]
    pub extensions: Vec<String>,
    /// Content types claimed by the engine. The first one is canonical.
    #[serde(default)]
    pub mime_types: Vec<String>,
}

impl EngineDescriptor {
    /// Start building a descriptor for the engine called `name`.
    pub fn builder(name: impl Into<String>) -> EngineDescriptorBuilder {
        EngineDescriptorBuilder {
            descriptor: Self {
                name: name.into(),
                version: String::new(),
                language_name: String::new(),
                language_version: String::new(),
                extensions: Vec::new(),
                mime_types: Vec::new(),
            },
        }
    }

    /// Check the descriptor against the registration contract.
    ///
    /// A usable descriptor has a non-blank name, claims at least one
    /// extension, and contains no blank extension or content-type strings.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.name.trim().is_empty() {
            return Err(RegistryError::InvalidDescriptor(
                "Engine name must not be empty".into(),
            ));
        }

        if self.extensions.is_empty() {
            return Err(RegistryError::InvalidDescriptor(format!(
                "Engine '{}' must claim at least one extension",
                self.name
            )));
        }

        if self.extensions.iter().any(|e| e.trim().is_empty()) {
            return Err(RegistryError::InvalidDescriptor(format!(
                "Engine '{}' declares a blank extension",
                self.name
            )));
        }

        if self.mime_types.iter().any(|m| m.trim().is_empty()) {
            return Err(RegistryError::InvalidDescriptor(format!(
                "Engine '{}' declares a blank mime type",
                self.name
            )));
        }

        Ok(())
    }

    /// The first declared content type, if any.
    pub fn canonical_mime_type(&self) -> Option<&str> {
        self.mime_types.first().map(String::as_str)
    }

    /// The first declared extension, if any.
    pub fn canonical_extension(&self) -> Option<&str> {
        self.extensions.first().map(String::as_str)
    }
}

/// Fluent constructor for [`EngineDescriptor`].
///
/// Duplicate extensions and mime types are dropped, keeping the first
/// occurrence so the canonical entries stay put.
#[derive(Debug, Clone)]
pub struct EngineDescriptorBuilder {
    descriptor: EngineDescriptor,
}

impl EngineDescriptorBuilder {
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.descriptor.version = version.into();
        self
    }

    pub fn language(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.descriptor.language_name = name.into();
        self.descriptor.language_version = version.into();
        self
    }

    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        push_unique(&mut self.descriptor.extensions, extension.into());
        self
    }

    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for ext in extensions {
            push_unique(&mut self.descriptor.extensions, ext.into());
        }
        self
    }

    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        push_unique(&mut self.descriptor.mime_types, mime_type.into());
        self
    }

    pub fn mime_types<I, S>(mut self, mime_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for ty in mime_types {
            push_unique(&mut self.descriptor.mime_types, ty.into());
        }
        self
    }

    /// Validate and return the descriptor.
    pub fn build(self) -> Result<EngineDescriptor, RegistryError> {
        self.descriptor.validate()?;
        Ok(self.descriptor)
    }
}

fn push_unique(values: &mut Vec<String>, value: String) {
    if !values.contains(&value) {
        values.push(value);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
