pub mod config;
pub mod error;
pub mod scalar;

pub use config::resolve::{resolve, resolve_at, resolve_without_defaults};
/// Same as [`resolve`].
pub use config::resolve::resolve as resolve_config;
pub use config::{ConfigContext, Schema, Settings};
pub use error::{ConfigError, Result, ScalarError};
