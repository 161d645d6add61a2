//! Tracing initialisation for vetmap host services.
//!
//! The pipeline itself only emits events; the host decides the output
//! format. [`init_tracing`] reads `VETMAP_LOG_FORMAT` ("json" or "text")
//! and installs the global subscriber accordingly. Calling it more than
//! once is harmless: only the first call takes effect.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Log output format for the global subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    /// Newline-delimited JSON, for log aggregation pipelines.
    Json,
}

impl LogFormat {
    /// Read the format from `VETMAP_LOG_FORMAT`; anything other than
    /// "json" means plain text.
    pub fn from_env() -> Self {
        match std::env::var("VETMAP_LOG_FORMAT") {
            Ok(value) if value.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Install the global tracing subscriber with the format from the
/// environment and `level` as the default verbosity.
///
/// `RUST_LOG` overrides the level filter when set.
pub fn init_tracing(level: Level) {
    init_tracing_with(LogFormat::from_env(), level);
}

/// Install the global tracing subscriber with an explicit format.
pub fn init_tracing_with(format: LogFormat, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_target(false).json())
                .try_init()
                .ok();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_target(false))
                .try_init()
                .ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_init_is_harmless() {
        init_tracing_with(LogFormat::Text, Level::WARN);
        init_tracing_with(LogFormat::Json, Level::INFO);
    }
}
