use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Install the process-wide tracing subscriber.
///
/// `RUST_LOG` overrides `config.level`. Only the first successful call in a
/// process installs anything; returns false when a subscriber already exists.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let installed = if config.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_target(true).with_span_list(true))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()
    };
    installed.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_a_noop() {
        let config = LoggingConfig {
            enabled: true,
            level: "debug".into(),
            json: true,
        };
        // Another test may have installed one already; either way the
        // next call must not install a second subscriber.
        let _ = init_logging(&config);
        assert!(!init_logging(&config));
    }
}
