//! Logging setup for the Knightlink binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Workspace crates whose spans and events the default filter lets through.
const CRATES: &[&str] = &[
    "knightlink",
    "knightlink_transport",
    "knightlink_match",
    "knightlink_client",
];

/// Initialises the tracing subscriber with a default level for the
/// workspace crates and the binary itself.
///
/// `RUST_LOG` overrides the default entirely.
///
/// # Examples
///
/// ```no_run
/// use knightlink::logger::setup_logger;
///
/// setup_logger("knightlink-server", "info");
/// ```
pub fn setup_logger(binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directives(binary_name, default_log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Builds e.g. `knightlink=info,knightlink_match=info,...,knightlink_server=info`.
fn default_directives(binary_name: &str, level: &str) -> String {
    CRATES
        .iter()
        .copied()
        .chain(std::iter::once(binary_name))
        .map(|target| format!("{}={level}", target.replace('-', "_")))
        .collect::<Vec<_>>()
        .join(",")
}
