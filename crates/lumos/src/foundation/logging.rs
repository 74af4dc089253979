//! Logging utilities

pub use log::{debug, error, info, trace, warn};

use log::LevelFilter;

/// Initialize logging with a fallback filter used when `RUST_LOG` is unset
///
/// `default_filter` accepts the usual `env_logger` directives, e.g. `"info"` or
/// `"lumos=debug"`. Calling this more than once is harmless; later calls are ignored.
pub fn init_with_level(default_filter: &str) {
    let env = env_logger::Env::default().default_filter_or(default_filter);
    if env_logger::Builder::from_env(env).try_init().is_err() {
        log::debug!("Logger already initialized, keeping existing configuration");
    }
}

/// Parse a level name into a filter, falling back to `Info`
pub fn level_filter(name: &str) -> LevelFilter {
    name.parse().unwrap_or(LevelFilter::Info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_filter_parsing() {
        assert_eq!(level_filter("debug"), LevelFilter::Debug);
        assert_eq!(level_filter("TRACE"), LevelFilter::Trace);
        assert_eq!(level_filter("off"), LevelFilter::Off);
        assert_eq!(level_filter("nonsense"), LevelFilter::Info);
    }

    #[test]
    fn test_repeated_init_is_harmless() {
        init_with_level("warn");
        init_with_level("debug");
    }
}
