use std::path::PathBuf;

use thiserror::Error;

/// Main error type for layercfg
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}\n\nTroubleshooting:\n- Check the path passed with --confpath=<path>\n- Relative paths resolve against the working directory", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", .path.display())]
    Syntax {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to decode config file {}: field `{key}`: {source}", .path.display())]
    Field {
        path: PathBuf,
        key: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Render error: {0}")]
    Render(#[from] toml::ser::Error),
}

/// Scalar text decoding errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScalarError {
    #[error("unsupported log level \"{0}\"")]
    UnsupportedLevel(String),

    #[error("unsupported log size \"{text}\": {reason}")]
    UnsupportedSize { text: String, reason: &'static str },

    #[error("invalid duration \"{text}\": {reason}")]
    InvalidDuration { text: String, reason: &'static str },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_error_names_path() {
        let err = ConfigError::Read {
            path: PathBuf::from("../conf/missing.toml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        let msg = err.to_string();
        assert!(msg.contains("../conf/missing.toml"));
        assert!(msg.contains("no such file"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_scalar_error_messages() {
        assert_eq!(
            ScalarError::UnsupportedLevel("bogus".to_string()).to_string(),
            "unsupported log level \"bogus\""
        );
        let size = ScalarError::UnsupportedSize {
            text: "5".to_string(),
            reason: "too short",
        };
        assert_eq!(size.to_string(), "unsupported log size \"5\": too short");
    }
}
