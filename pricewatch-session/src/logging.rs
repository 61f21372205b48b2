//! Structured logging setup.

use crate::config::LoggingConfig;
use std::sync::Once;
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Crates whose chatter is capped at `warn`.
const NOISY: [&str; 2] = ["hyper=warn", "reqwest=warn"];

/// Install the global `tracing` subscriber. Later calls are no-ops, as is a
/// call made after some other subscriber was installed.
pub fn init_logging(config: &LoggingConfig) {
    INIT.call_once(|| {
        let level = parse_level(&config.level);
        let mut filter = EnvFilter::builder()
            .with_default_directive(level.into())
            .from_env_lossy();
        for directive in NOISY {
            if let Ok(d) = directive.parse::<Directive>() {
                filter = filter.add_directive(d);
            }
        }

        let installed = if config.json {
            tracing_subscriber::fmt()
                .json()
                .with_target(true)
                .with_thread_names(true)
                .with_env_filter(filter)
                .try_init()
        } else {
            tracing_subscriber::fmt()
                .with_target(true)
                .with_env_filter(filter)
                .try_init()
        };

        if installed.is_ok() {
            tracing::info!(level = %level, json = config.json, "logging initialized");
        }
    });
}

/// Unknown names fall back to `info`.
fn parse_level(level: &str) -> LevelFilter {
    level.trim().parse().unwrap_or(LevelFilter::INFO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names_are_case_insensitive() {
        assert_eq!(parse_level("DEBUG"), LevelFilter::DEBUG);
        assert_eq!(parse_level(" Warn "), LevelFilter::WARN);
        assert_eq!(parse_level("off"), LevelFilter::OFF);
        assert_eq!(parse_level("verbose"), LevelFilter::INFO);
    }

    #[test]
    fn repeated_init_is_harmless() {
        let config = LoggingConfig::default();
        init_logging(&config);
        init_logging(&LoggingConfig {
            level: "trace".into(),
            json: true,
        });
    }
}
