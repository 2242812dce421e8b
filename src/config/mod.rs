//! Layered configuration loading
//!
//! A settings value is resolved from three sources, weakest first:
//! declared defaults, the TOML config file (after `$VAR` / `${VAR}`
//! expansion), and values the caller set on the struct before loading.
//! Defaults only fill fields still at their zero value. By default a key
//! present in the file overwrites a preset value; use
//! [`Precedence::PresetWins`] to keep presets instead.
//!
//! The file path comes from `--confpath` (default `../conf/config.toml`) and
//! printing from `--printconf` (default on).
//!
//! # Example
//!
//! ```no_run
//! use layercfg::config::{Schema, Settings};
//! use layercfg::scalar::{Duration, LogLevel};
//! use serde::Serialize;
//!
//! #[derive(Default, Serialize)]
//! struct Server {
//!     addr: String,
//!     level: LogLevel,
//!     idle_timeout: Duration,
//! }
//!
//! impl Settings for Server {
//!     fn schema() -> Schema<Self> {
//!         Schema::new()
//!             .field_with_default("addr", |s: &mut Server| &mut s.addr, "0.0.0.0:8080")
//!             .field_with_default("level", |s: &mut Server| &mut s.level, LogLevel::Info)
//!             .field("idle_timeout", |s: &mut Server| &mut s.idle_timeout)
//!     }
//! }
//!
//! let mut server = Server::default();
//! layercfg::resolve(&mut server).expect("Failed to load config");
//! println!("Listening on {}", server.addr);
//! ```

pub mod context;
pub mod expand;
pub mod resolve;
pub mod schema;

pub use context::{ConfigArgs, ConfigContext, Precedence, PrintGate, DEFAULT_CONF_PATH};
pub use expand::{expand, expand_with};
pub use resolve::{decode_with_env, load_table, render};
pub use schema::{FieldError, Preset, Presets, Schema, Settings};
