//! Logging configuration for rule mining.
//!
//! The miner emits `tracing` events for every pass. [`LogConfig`] controls how
//! much of that detail is emitted and how long logged rule texts may get;
//! [`setup::init_logging`] installs a subscriber for applications that don't
//! bring their own.

use tracing::Level;

/// Logging configuration for a mining run.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Base log level for mining components
    pub base_level: Level,
    /// Whether to log the outcome of every pass
    pub log_stage_details: bool,
    /// Whether to log dataset loading and description
    pub log_data_operations: bool,
    /// Number of top rules logged after each pass
    pub log_top_rules: usize,
    /// Maximum length for logged rule texts
    pub max_field_length: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            base_level: Level::INFO,
            log_stage_details: false,
            log_data_operations: true,
            log_top_rules: 0,
            max_field_length: 256,
        }
    }
}

impl LogConfig {
    /// Creates a verbose configuration suitable for debugging.
    pub fn verbose() -> Self {
        Self {
            base_level: Level::DEBUG,
            log_stage_details: true,
            log_data_operations: true,
            log_top_rules: 5,
            max_field_length: 1024,
        }
    }

    /// Creates a minimal configuration for production.
    pub fn production() -> Self {
        Self {
            base_level: Level::WARN,
            log_stage_details: false,
            log_data_operations: false,
            log_top_rules: 0,
            max_field_length: 128,
        }
    }

    /// Same as [`LogConfig::default`].
    pub fn balanced() -> Self {
        Self::default()
    }

    pub fn with_top_rules(mut self, n: usize) -> Self {
        self.log_top_rules = n;
        self
    }
}

/// Logs at debug level when the config's stage details are enabled.
#[macro_export]
macro_rules! log_stage {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_stage_details {
            tracing::debug!($($arg)*);
        }
    };
}

/// Logs at info level when the config's data operations are enabled.
#[macro_export]
macro_rules! log_data_op {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_data_operations {
            tracing::info!($($arg)*);
        }
    };
}

/// Truncates a string to at most `max_length` bytes, on a char boundary.
pub fn truncate_field(value: &str, max_length: usize) -> String {
    if value.len() <= max_length {
        return value.to_string();
    }
    let mut end = max_length;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...(truncated)", &value[..end])
}

/// Subscriber installation.
pub mod setup {
    use tracing::Level;

    use crate::error::{MiningError, Result};

    /// Configuration for [`init_logging`].
    #[derive(Debug, Clone)]
    pub struct LoggingConfig {
        /// Log level for the application
        pub level: Level,
        /// Log level for this crate specifically
        pub rules_level: Level,
        /// Whether to use JSON output format
        pub json_format: bool,
        /// Environment filter override
        pub env_filter: Option<String>,
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            Self {
                level: Level::INFO,
                rules_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }
    }

    impl LoggingConfig {
        pub fn production() -> Self {
            Self {
                level: Level::WARN,
                rules_level: Level::INFO,
                json_format: true,
                env_filter: None,
            }
        }

        pub fn development() -> Self {
            Self {
                level: Level::DEBUG,
                rules_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }

        pub fn with_level(mut self, level: Level) -> Self {
            self.level = level;
            self
        }

        pub fn with_rules_level(mut self, level: Level) -> Self {
            self.rules_level = level;
            self
        }

        pub fn with_json_format(mut self, enabled: bool) -> Self {
            self.json_format = enabled;
            self
        }

        pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
            self.env_filter = Some(filter.into());
            self
        }

        /// Builds the environment filter string.
        pub fn env_filter(&self) -> String {
            match &self.env_filter {
                Some(filter) => filter.clone(),
                None => format!(
                    "{},term_rules={}",
                    self.level.as_str().to_lowercase(),
                    self.rules_level.as_str().to_lowercase()
                ),
            }
        }
    }

    /// Installs a global `tracing` subscriber. `RUST_LOG` takes precedence
    /// over the configured filter.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use term_rules::logging::setup::{init_logging, LoggingConfig};
    ///
    /// init_logging(LoggingConfig::development().with_json_format(true)).unwrap();
    /// ```
    pub fn init_logging(config: LoggingConfig) -> Result<()> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.env_filter()));

        let fmt_layer = if config.json_format {
            tracing_subscriber::fmt::layer().json().boxed()
        } else {
            tracing_subscriber::fmt::layer().boxed()
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| MiningError::Configuration(format!("failed to install subscriber: {e}")))
    }
}
