pub mod config;
pub mod errors;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use errors::{Disposition, InteractionError, FAILURE_MESSAGE, FORBIDDEN_MESSAGE};
