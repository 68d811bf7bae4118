use std::path::PathBuf;

use scripthub_events::bus::DEFAULT_CAPACITY;

/// Default directory scanned for modules.
const DEFAULT_MODULES_DIR: &str = "./modules";

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Host configuration loaded from environment variables.
///
/// All fields have defaults suitable for local use.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Directory whose sub-directories are loaded as modules.
    pub modules_dir: PathBuf,
    /// Broadcast buffer size for engine events.
    pub event_capacity: usize,
    pub log_format: LogFormat,
}

impl HostConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default     |
    /// |----------------------------|-------------|
    /// | `SCRIPTHUB_MODULES_DIR`    | `./modules` |
    /// | `SCRIPTHUB_EVENT_CAPACITY` | `256`       |
    /// | `LOG_FORMAT`               | `text`      |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let modules_dir = lookup("SCRIPTHUB_MODULES_DIR")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODULES_DIR.into())
            .into();

        let event_capacity = match lookup("SCRIPTHUB_EVENT_CAPACITY") {
            None => DEFAULT_CAPACITY,
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    tracing::warn!(
                        value = %raw,
                        default = DEFAULT_CAPACITY,
                        "SCRIPTHUB_EVENT_CAPACITY must be a positive integer, using default",
                    );
                    DEFAULT_CAPACITY
                }
            },
        };

        let log_format = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Self {
            modules_dir,
            event_capacity,
            log_format,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> HostConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        HostConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = config(&[]);
        assert_eq!(cfg.modules_dir, PathBuf::from("./modules"));
        assert_eq!(cfg.event_capacity, DEFAULT_CAPACITY);
        assert_eq!(cfg.log_format, LogFormat::Text);
    }

    #[test]
    fn values_are_read_from_lookup() {
        let cfg = config(&[
            ("SCRIPTHUB_MODULES_DIR", "/srv/modules"),
            ("SCRIPTHUB_EVENT_CAPACITY", "32"),
            ("LOG_FORMAT", "JSON"),
        ]);
        assert_eq!(cfg.modules_dir, PathBuf::from("/srv/modules"));
        assert_eq!(cfg.event_capacity, 32);
        assert_eq!(cfg.log_format, LogFormat::Json);
    }

    #[test]
    fn invalid_capacity_falls_back_to_default() {
        assert_eq!(
            config(&[("SCRIPTHUB_EVENT_CAPACITY", "lots")]).event_capacity,
            DEFAULT_CAPACITY
        );
        assert_eq!(
            config(&[("SCRIPTHUB_EVENT_CAPACITY", "0")]).event_capacity,
            DEFAULT_CAPACITY
        );
    }
}
