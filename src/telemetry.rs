use super::config::LoggingConfig;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::util::SubscriberInitExt;

/// Install the global fmt subscriber. `DEALS_LOG` takes precedence over the
/// configured filter. Returns `false` if a subscriber was already installed.
pub fn init(config: &LoggingConfig) -> bool {
    let (filter, rejected) = resolve_filter(config);

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .finish()
        .try_init()
        .is_ok();

    if let Some(err) = rejected {
        tracing::warn!(filter = %config.filter, "invalid log filter, falling back to info: {err}");
    }
    installed
}

// Returns the filter to install and, if the configured one did not parse, why.
fn resolve_filter(config: &LoggingConfig) -> (EnvFilter, Option<ParseError>) {
    if let Ok(filter) = EnvFilter::try_from_env("DEALS_LOG") {
        return (filter, None);
    }
    match EnvFilter::try_new(&config.filter) {
        Ok(filter) => (filter, None),
        Err(err) => (EnvFilter::new("info"), Some(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_harmless() {
        let config = LoggingConfig::default();

        let _ = init(&config);
        assert!(!init(&config));
    }

    #[test]
    fn bad_filter_falls_back_to_info() {
        let config = LoggingConfig {
            filter: "deal_negotiation=loud".to_string(),
        };

        if std::env::var("DEALS_LOG").is_err() {
            assert!(resolve_filter(&config).1.is_some());
        }
        assert!(resolve_filter(&LoggingConfig::default()).1.is_none());
    }
}
