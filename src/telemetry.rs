//! Logging initialization.
//!
//! Controlled by two environment variables:
//! - `NBMERGE_LOG` → an [`EnvFilter`] directive (e.g. `debug`,
//!   `nbmerge::merge::align=trace`); unset or invalid falls back to `warn`
//! - `NBMERGE_LOG_FORMAT=json` → JSON lines instead of human-readable text
//!
//! Everything goes to stderr; stdout is reserved for command output.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

/// Env var holding the filter directive.
pub const LOG_ENV: &str = "NBMERGE_LOG";

/// Env var selecting the output format.
pub const LOG_FORMAT_ENV: &str = "NBMERGE_LOG_FORMAT";

const DEFAULT_FILTER: &str = "warn";

/// Install the global subscriber. Call once, at the top of `main()`.
///
/// A second call (or a subscriber installed by someone else) is ignored.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let json = wants_json(std::env::var(LOG_FORMAT_ENV).ok().as_deref());

    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };

    if let Err(e) = result {
        eprintln!("warning: logging already initialized: {e}");
    }
}

fn wants_json(format: Option<&str>) -> bool {
    format.is_some_and(|f| f.trim().eq_ignore_ascii_case("json"))
}
