//! Notifications emitted when engines come and go.
//!
//! The registry publishes a [`ScriptEngineEvent`] to an optional
//! [`EventSink`] each time a descriptor is added or removed. Delivery is
//! fire-and-forget: with no sink attached the event is simply dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::descriptor::EngineDescriptor;

/// Event topic for script-engine changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineTopic {
    #[serde(rename = "script_engine.added")]
    Added,
    #[serde(rename = "script_engine.removed")]
    Removed,
}

impl EngineTopic {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Added => "script_engine.added",
            Self::Removed => "script_engine.removed",
        }
    }
}

/// A script engine was added to or removed from the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptEngineEvent {
    pub topic: EngineTopic,
    pub engine_name: String,
    pub engine_version: String,
    pub extensions: Vec<String>,
    pub language_name: String,
    pub language_version: String,
    pub mime_types: Vec<String>,
    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl ScriptEngineEvent {
    pub fn new(topic: EngineTopic, descriptor: &EngineDescriptor) -> Self {
        Self {
            topic,
            engine_name: descriptor.name.clone(),
            engine_version: descriptor.version.clone(),
            extensions: descriptor.extensions.clone(),
            language_name: descriptor.language_name.clone(),
            language_version: descriptor.language_version.clone(),
            mime_types: descriptor.mime_types.clone(),
            timestamp: Utc::now(),
        }
    }
}

/// Receiver of engine notifications.
///
/// The registry calls `post_event` on the thread that performed the
/// mutation, one mutation at a time, so events arrive in the order the
/// registry applied them. Implementations must not block and must not
/// mutate the registry from inside `post_event`.
pub trait EventSink: Send + Sync {
    fn post_event(&self, event: ScriptEngineEvent);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
