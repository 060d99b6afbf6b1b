//! This module provides a built-in logger implementation.
//!
//! The built-in logger implementation uses the `env_logger` crate. It is
//! enabled by the Cargo feature "builtin_env_logger" which is enabled by
//! default. When enabled, it is initialized once during [`crate::CodeCache`]
//! construction and will show logs of level INFO or lower.
//!
//! Embedders that already run their own `log`-compatible logger can disable
//! the "builtin_env_logger" feature and register their own implementation
//! before constructing the cache.

use log::debug;

/// Attempt to init an env_logger for the cache. Does nothing if the
/// "builtin_env_logger" feature is disabled.
pub(crate) fn try_init() {
    cfg_if::cfg_if! {
        if #[cfg(feature = "builtin_env_logger")] {
            let result = env_logger::try_init_from_env(
                env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
            );

            match result {
                Ok(()) => {
                    debug!("codecache initialized the logger.");
                }
                Err(e) => {
                    debug!("codecache failed to initialize the built-in env_logger: {e}");
                }
            }
        } else {
            debug!("codecache didn't initialize the built-in env_logger. The Cargo feature \"builtin_env_logger\" is not enabled.");
        }
    }
}
