//! Shared tracing/logging initialization.
//!
//! The `bgw` binary logs to stderr so log lines never end up in the relayed
//! shell output on stdout.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialise the global tracing subscriber.
///
/// * `default_filter` -- default `RUST_LOG` value when the env-var is not set
///   (e.g. `"buggywhip=warn"`).
/// * `log_json` -- when `true`, emit structured JSON log lines instead of the
///   human-readable format.
pub fn init_tracing(default_filter: &str, log_json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
    );
    if log_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Build the filter directive for all buggywhip crates at `level`.
pub fn default_filter(level: &str) -> String {
    ["buggywhip_core", "buggywhip_driver", "buggywhip_cli", "bgw"]
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_covers_every_crate() {
        let filter = default_filter("debug");
        assert!(filter.contains("buggywhip_driver=debug"));
        assert!(filter.contains("buggywhip_cli=debug"));
        assert!(filter.contains("bgw=debug"));
    }
}
