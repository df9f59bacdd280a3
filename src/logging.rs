//! Logger initialisation
//!
//! `RUST_LOG` wins when set. Otherwise the default filter is `info`, raised to
//! `debug` when `LOG_LEVEL=HIGH`, which makes launch details and every
//! captured output line visible.

use std::env;

/// Whether verbose logging was requested through `LOG_LEVEL=HIGH`
#[must_use]
pub fn is_high_log_level() -> bool {
    env::var("LOG_LEVEL").is_ok_and(|level| level.eq_ignore_ascii_case("high"))
}

/// Install the global `env_logger` logger
///
/// Safe to call more than once; later calls are ignored.
pub fn init() {
    let default_filter = if is_high_log_level() { "debug" } else { "info" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .try_init();

    if is_high_log_level() {
        log::debug!("High logging enabled: launch details and process output are logged");
    }
}
