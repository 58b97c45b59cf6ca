//! Logging utilities and structured logging support

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system with a default filter.
///
/// `level` is any `env_logger` filter string (`"info"`, `"deferred_engine=debug"`).
/// A `RUST_LOG` variable in the environment takes precedence. Calling this more
/// than once is harmless; later calls are ignored.
pub fn init_with_level(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    if env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .try_init()
        .is_err()
    {
        log::debug!("Logger already initialized; keeping existing configuration");
    }
}
