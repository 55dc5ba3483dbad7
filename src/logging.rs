use crate::core::LoggingConfig;
use crate::errors::{AgentError, Result};
use std::path::Path;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Overrides `logging.level` when set, using `EnvFilter` directive syntax.
pub const LOG_ENV: &str = "HARVEST_LOG";

/// Install the global subscriber: console output (text or JSON) plus an
/// optional plain-text log file.
///
/// Keep the returned guard alive until exit or buffered file lines are lost.
pub fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = env_filter(config)?;

    let (file_layer, guard) = match &config.file {
        Some(path) => {
            let (writer, guard) = file_writer(path)?;
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let text_layer = (!config.json).then(|| fmt::layer().with_target(true));
    let json_layer = config.json.then(|| fmt::layer().json());

    tracing_subscriber::registry()
        .with(filter)
        .with(text_layer)
        .with(json_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| AgentError::ConfigurationError(format!("logging already initialized: {}", e)))?;

    Ok(guard)
}

fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV) {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level).map_err(|e| {
        AgentError::ConfigurationError(format!("invalid log level '{}': {}", config.level, e))
    })
}

fn file_writer(path: &Path) -> Result<(NonBlocking, WorkerGuard)> {
    let file_name = path.file_name().ok_or_else(|| {
        AgentError::ConfigurationError(format!("log file '{}' has no file name", path.display()))
    })?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    Ok(tracing_appender::non_blocking(appender))
}
