//! Script-engine resolution registry.
//!
//! Discovers script-engine descriptors from two independent feeds
//! (hot-pluggable [`module::Module`]s carrying a discovery manifest, and
//! descriptors bound directly by a host service layer), keeps a lazily
//! rebuilt extension / content-type index over their union, and joins
//! matches against the registered [`bindings::BindingsProvider`]s.
//!
//! The entry point is [`registry::ScriptEngineRegistry`]. Nothing in this
//! crate executes scripts; it only answers which engine handles a resource
//! and with what auxiliary context.

pub mod bindings;
pub mod descriptor;
pub mod error;
pub mod events;
pub mod index;
pub mod module;
pub mod naming;
pub mod registry;
pub mod sources;

pub use bindings::{BindingsAggregator, BindingsProvider};
pub use descriptor::{EngineDescriptor, EngineDescriptorBuilder};
pub use error::{DiscoveryError, RegistryError};
pub use events::{EngineTopic, EventSink, ScriptEngineEvent};
pub use index::CapabilityIndex;
pub use module::{Module, ModuleHost, ModuleId, ENGINE_MANIFEST_PATH};
pub use registry::{ActivationReport, EngineInfo, ScriptEngineRegistry, ScriptResolution};
pub use sources::{EngineSource, ProviderSources};
