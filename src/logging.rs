use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::domain::XTVError;

const DEFAULT_FILTER: &str = "info";

/// Sends all tracing output to `path`; the terminal itself belongs to the UI.
/// `RUST_LOG` overrides the default level.
pub fn init(path: &Path) -> Result<(), XTVError> {
    let file = File::create(path)?;
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let file_layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(ErrorLayer::default())
        .try_init()
        .map_err(|e| XTVError::Logging(e.to_string()))?;

    tracing::info!(log_file = %path.display(), "Logging initialized");
    Ok(())
}
