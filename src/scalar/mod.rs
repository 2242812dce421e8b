//! Scalar value types with a lossless text form
//!
//! Each type parses from text with `FromStr`, prints its canonical form with
//! `Display`, and goes through serde as a string so it can sit directly in a
//! TOML-backed settings struct.
//!
//! # Example
//!
//! ```
//! use layercfg::scalar::{Duration, LogLevel, LogSize};
//!
//! let level: LogLevel = "WARN".parse().unwrap();
//! let size: LogSize = "64M".parse().unwrap();
//! let flush: Duration = "1500ms".parse().unwrap();
//!
//! assert_eq!(level.to_string(), "warn");
//! assert_eq!(size.size(), 64 * 1024 * 1024);
//! assert_eq!(flush.to_string(), "1.5s");
//! ```

pub mod duration;
pub mod level;
pub mod size;

pub use duration::Duration;
pub use level::LogLevel;
pub use size::LogSize;
