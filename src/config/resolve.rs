use std::fs;
use std::path::Path;

use toml::Table;

use super::context::{ConfigContext, Precedence};
use super::expand::expand;
use super::schema::{Presets, Schema, Settings};
use crate::error::{ConfigError, Result};

/// Read `path`, expand environment tokens and parse it as a TOML table.
pub fn load_table(path: &Path) -> Result<Table> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&expand(&raw)).map_err(|source| ConfigError::Syntax {
        path: path.to_path_buf(),
        source,
    })
}

/// Decode `path` into `target` without defaults or printing. Keys present in
/// the file overwrite the matching fields.
pub fn decode_with_env<T: Settings>(path: &Path, target: &mut T) -> Result<()> {
    decode_file(&T::schema(), path, target, None)
}

/// TOML text of `target`.
pub fn render<T: Settings>(target: &T) -> Result<String> {
    Ok(toml::to_string_pretty(target)?)
}

fn decode_file<T: Settings>(
    schema: &Schema<T>,
    path: &Path,
    target: &mut T,
    presets: Option<&Presets>,
) -> Result<()> {
    let table = load_table(path)?;
    schema
        .decode(target, &table, presets)
        .map_err(|e| ConfigError::Field {
            path: path.to_path_buf(),
            key: e.key,
            source: e.source,
        })
}

impl ConfigContext {
    /// Apply defaults, then decode the configured file into `target`.
    ///
    /// The `config file:` line prints at most once per gate; the resolved
    /// config prints on every successful call when printing is on.
    pub fn resolve<T: Settings>(&self, target: &mut T) -> Result<()> {
        self.print_path_once();
        self.load(target, self.conf_path(), true)?;
        self.print_resolved(target);
        Ok(())
    }

    /// Like [`resolve`](Self::resolve) without applying defaults.
    pub fn resolve_without_defaults<T: Settings>(&self, target: &mut T) -> Result<()> {
        self.print_path_once();
        self.load(target, self.conf_path(), false)?;
        self.print_resolved(target);
        Ok(())
    }

    /// Like [`resolve`](Self::resolve) but reads `path`. The path line is not gated.
    pub fn resolve_at<T: Settings>(&self, target: &mut T, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if self.print_conf() {
            self.emit(&format!("config file:{}\n", path.display()));
        }
        self.load(target, path, true)?;
        self.print_resolved(target);
        Ok(())
    }

    fn load<T: Settings>(&self, target: &mut T, path: &Path, with_defaults: bool) -> Result<()> {
        let schema = T::schema();
        let presets = match self.precedence() {
            Precedence::PresetWins => Some(schema.snapshot(target)),
            Precedence::FileWins => None,
        };
        if with_defaults {
            schema.apply_defaults(target);
        }
        tracing::debug!(
            path = %path.display(),
            with_defaults,
            precedence = ?self.precedence(),
            "resolving config"
        );

        let result = decode_file(&schema, path, target, presets.as_ref());
        if let Err(err) = &result {
            tracing::error!(error = %err, "config resolution failed");
        }
        result
    }

    fn print_path_once(&self) {
        self.gate().run_once(|| {
            if self.print_conf() {
                self.emit(&format!("config file:{}\n", self.conf_path().display()));
            }
        });
    }

    fn print_resolved<T: Settings>(&self, target: &T) {
        if !self.print_conf() {
            return;
        }
        match render(target) {
            Ok(text) => self.emit(&text),
            Err(err) => tracing::warn!(error = %err, "failed to render resolved config"),
        }
    }
}

/// Resolve `target` with the process-wide context.
pub fn resolve<T: Settings>(target: &mut T) -> Result<()> {
    ConfigContext::global().resolve(target)
}

/// Resolve `target` with the process-wide context, skipping defaults.
pub fn resolve_without_defaults<T: Settings>(target: &mut T) -> Result<()> {
    ConfigContext::global().resolve_without_defaults(target)
}

/// Resolve `target` from `path` with the process-wide print settings.
pub fn resolve_at<T: Settings>(target: &mut T, path: impl AsRef<Path>) -> Result<()> {
    ConfigContext::global().resolve_at(target, path)
}
