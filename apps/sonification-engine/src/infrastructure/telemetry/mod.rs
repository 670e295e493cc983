//! Tracing Integration
//!
//! Configures the tracing subscriber for structured logs.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Log filter (default: `sonification_engine=info`)
//!
//! # Usage
//!
//! ```ignore
//! use sonification_engine::infrastructure::telemetry;
//!
//! // Initialize once at startup.
//! telemetry::init();
//! ```

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Default directive applied under the env filter.
const DEFAULT_DIRECTIVE: &str = "sonification_engine=info";

/// Initialize the tracing subscriber.
///
/// Idempotent: repeated calls (tests, embedded usage) leave the first
/// subscriber in place.
#[allow(clippy::expect_used)]
pub fn init() {
    let env_filter = EnvFilter::from_default_env().add_directive(
        DEFAULT_DIRECTIVE
            .parse()
            .expect("static directive 'sonification_engine=info' is valid"),
    );

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init();
        init();
    }
}
