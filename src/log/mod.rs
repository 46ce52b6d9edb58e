//! The `log` module configures the crate's logging facilities. Logging describes what the engine
//! is doing internally (construction, regulations, infection updates); it is not to be confused
//! with _reporting_ (see [`crate::report`]), which records model output.
//!
//! This module (re)exports the five logging macros: `error!`, `warn!`, `info!`, `debug!` and
//! `trace!` where `error!` represents the highest-priority log messages and `trace!` the lowest.
//!
//! Logging is _disabled_ by default. It can be controlled programmatically:
//!
//!  - `enable_logging()`: turns on all log messages
//!  - `disable_logging()`: turns off all log messages
//!  - `set_log_level(level: LevelFilter)`: enables only log messages with priority at least `level`
//!  - `init_logging_from_env()`: reads the level from the `PANDEMIC_SIM_LOG` environment variable
//!
//! Per-module filtering is available through `set_module_filter()` and `remove_module_filter()`:
//!
//! ```rust
//! use pandemic_sim::log::{set_log_level, set_module_filter, LevelFilter};
//!
//! // Engine level summaries only...
//! set_log_level(LevelFilter::Info);
//! // ...but every contact batch from the sampler.
//! set_module_filter("pandemic_sim::contacts", LevelFilter::Trace);
//! ```
#[cfg(feature = "logging")]
mod standard_logger;

#[cfg(not(feature = "logging"))]
mod null_logger;

use std::str::FromStr;
use std::sync::{LazyLock, Mutex, MutexGuard};

pub use log::{debug, error, info, trace, warn, LevelFilter};
#[cfg(feature = "logging")]
use log4rs::Handle;

use crate::hashing::HashMap;

/// Environment variable read by [`init_logging_from_env`].
pub const LOG_ENV_VAR: &str = "PANDEMIC_SIM_LOG";

// Logging disabled
const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Off;

/// A global instance of the logging configuration.
static LOG_CONFIGURATION: LazyLock<Mutex<LogConfiguration>> = LazyLock::new(Mutex::default);

/// Holds logging configuration: the global level, module specific levels and, with the
/// `logging` feature, a handle to the installed `log4rs` logger.
///
/// Loggers are installed process wide, so only one instance of this struct exists. The public API
/// are free functions which fetch the singleton and call the appropriate member function.
#[derive(Debug)]
pub(in crate::log) struct LogConfiguration {
    /// Level for modules ("targets") without an explicit filter. `LevelFilter::Off` disables
    /// logging.
    pub(in crate::log) global_log_level: LevelFilter,
    /// Module path to level filter.
    pub(in crate::log) module_filters: HashMap<String, LevelFilter>,

    #[cfg(feature = "logging")]
    root_handle: Option<Handle>,
}

impl Default for LogConfiguration {
    fn default() -> Self {
        Self {
            global_log_level: DEFAULT_LOG_LEVEL,
            module_filters: HashMap::default(),

            #[cfg(feature = "logging")]
            root_handle: None,
        }
    }
}

impl LogConfiguration {
    fn set_log_level(&mut self, level: LevelFilter) {
        self.global_log_level = level;
        self.set_config();
    }

    fn set_module_filter(&mut self, module: &str, level: LevelFilter) {
        if self.module_filters.insert(module.to_string(), level) != Some(level) {
            self.set_config();
        }
    }

    fn remove_module_filter(&mut self, module: &str) {
        if self.module_filters.remove(module).is_some() {
            self.set_config();
        }
    }
}

/// Enables the logger with no global level filter / full logging. Equivalent to
/// `set_log_level(LevelFilter::Trace)`.
pub fn enable_logging() {
    set_log_level(LevelFilter::Trace);
}

/// Disables logging completely. Equivalent to `set_log_level(LevelFilter::Off)`.
pub fn disable_logging() {
    set_log_level(LevelFilter::Off);
}

/// Sets the global log level. A global filter level of `LevelFilter::Off` disables logging.
pub fn set_log_level(level: LevelFilter) {
    get_log_configuration().set_log_level(level);
}

/// Sets a level filter for the given module path, e.g. `"pandemic_sim::sim"`.
pub fn set_module_filter(module_path: &str, level_filter: LevelFilter) {
    get_log_configuration().set_module_filter(module_path, level_filter);
}

/// Removes a module-specific level filter. The global level filter will apply to the module.
pub fn remove_module_filter(module_path: &str) {
    get_log_configuration().remove_module_filter(module_path);
}

/// Sets the global log level from [`LOG_ENV_VAR`] (`off`, `error`, `warn`, `info`, `debug` or
/// `trace`). Returns the level that was applied, or `None` if the variable is unset or invalid,
/// in which case the configuration is left untouched.
pub fn init_logging_from_env() -> Option<LevelFilter> {
    let value = std::env::var(LOG_ENV_VAR).ok()?;
    let level = LevelFilter::from_str(value.trim()).ok()?;
    set_log_level(level);
    Some(level)
}

/// Fetches a mutable reference to the global `LogConfiguration`.
fn get_log_configuration() -> MutexGuard<'static, LogConfiguration> {
    LOG_CONFIGURATION.lock().expect("Mutex poisoned")
}

#[cfg(test)]
mod tests {
    use super::{
        get_log_configuration, remove_module_filter, set_log_level, set_module_filter,
        LevelFilter,
    };
    use log::{error, trace};
    use std::sync::{LazyLock, Mutex};

    // Force logging tests to run serially for consistent behavior.
    static TEST_MUTEX: LazyLock<Mutex<()>> = LazyLock::new(Mutex::default);

    #[test]
    fn test_set_log_level() {
        let _guard = TEST_MUTEX.lock().expect("Mutex poisoned");
        set_log_level(LevelFilter::Error);
        {
            let config = get_log_configuration();
            assert_eq!(config.global_log_level, LevelFilter::Error);
            error!("test_set_log_level: global set to error");
            trace!("test_set_log_level: NOT EMITTED");
        }
        set_log_level(LevelFilter::Off);
        assert_eq!(get_log_configuration().global_log_level, LevelFilter::Off);
    }

    #[test]
    fn test_set_remove_module_filters() {
        let _guard = TEST_MUTEX.lock().expect("Mutex poisoned");
        set_module_filter("pandemic_sim::contacts", LevelFilter::Debug);
        set_module_filter("pandemic_sim::sim", LevelFilter::Info);
        {
            let config = get_log_configuration();
            assert_eq!(
                config.module_filters.get("pandemic_sim::contacts"),
                Some(&LevelFilter::Debug)
            );
            assert_eq!(
                config.module_filters.get("pandemic_sim::sim"),
                Some(&LevelFilter::Info)
            );
        }

        remove_module_filter("pandemic_sim::contacts");
        remove_module_filter("pandemic_sim::sim");
        assert!(get_log_configuration().module_filters.is_empty());
    }
}
