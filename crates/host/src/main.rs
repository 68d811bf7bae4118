//! `scripthub-host` -- loads script-engine modules from a directory and
//! resolves paths against them.
//!
//! Every sub-directory of the modules directory is activated as a module.
//! The binary prints the resulting engine listing as JSON, then one JSON
//! line per path given on the command line describing which engine (if
//! any) handles it.
//!
//! # Environment variables
//!
//! | Variable                   | Required | Default     | Description                     |
//! |----------------------------|----------|-------------|---------------------------------|
//! | `SCRIPTHUB_MODULES_DIR`    | no       | `./modules` | Directory scanned for modules   |
//! | `SCRIPTHUB_EVENT_CAPACITY` | no       | `256`       | Engine event buffer size        |
//! | `LOG_FORMAT`               | no       | `text`      | `text` or `json` log output     |
//! | `RUST_LOG`                 | no       | see below   | Tracing filter                  |

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scripthub_core::ScriptEngineRegistry;
use scripthub_events::{log_events, EngineEventBus};
use scripthub_host::config::{HostConfig, LogFormat};
use scripthub_host::directory::DirectoryHost;
use scripthub_host::report::{report_path, StaticBindings};

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "scripthub_host=info,scripthub_core=info,scripthub_events=info".into());

    // Logs go to stderr so stdout stays machine-readable.
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = HostConfig::from_env();
    init_tracing(config.log_format);

    tracing::info!(
        modules_dir = %config.modules_dir.display(),
        event_capacity = config.event_capacity,
        "Starting scripthub-host",
    );

    // --- Event bus ---
    let bus = Arc::new(EngineEventBus::new(config.event_capacity));
    let event_logger = tokio::spawn(log_events(bus.subscribe()));

    // --- Registry ---
    let registry = ScriptEngineRegistry::new();
    registry.attach_event_sink(bus.clone());
    registry.register_bindings_provider(
        Arc::new(
            StaticBindings::new()
                .with("host", "scripthub-host")
                .with("modulesDir", config.modules_dir.display().to_string()),
        ),
        None,
    );

    let host = DirectoryHost::new(&config.modules_dir);
    let reports = registry.start(&host);
    let failures: usize = reports.iter().map(|r| r.failures.len()).sum();
    tracing::info!(
        modules = reports.iter().filter(|r| r.tracked).count(),
        failures,
        "Module scan complete",
    );

    // --- Output ---
    let engines = serde_json::to_string_pretty(&registry.engines())
        .context("Failed to serialize engine listing")?;
    println!("{engines}");

    for path in std::env::args().skip(1) {
        let line = serde_json::to_string(&report_path(&registry, &path))
            .with_context(|| format!("Failed to serialize report for {path}"))?;
        println!("{line}");
    }

    // --- Shutdown ---
    registry.shutdown();
    drop(bus);
    let logged = event_logger.await.context("Event logger task failed")?;
    tracing::info!(events = logged, "scripthub-host finished");

    Ok(())
}
