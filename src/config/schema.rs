use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use toml::{Table, Value};

/// A type that can be resolved from defaults and a config file
pub trait Settings: Serialize + Sized + 'static {
    /// Field bindings: TOML key, accessor and optional default for each field.
    fn schema() -> Schema<Self>;
}

/// Decode failure for a single field, keyed by its dotted path
#[derive(Error, Debug)]
#[error("{key}: {source}")]
pub struct FieldError {
    pub key: String,
    #[source]
    pub source: toml::de::Error,
}

impl FieldError {
    fn nested_under(mut self, section: &str) -> Self {
        self.key = format!("{section}.{}", self.key);
        self
    }
}

/// Whether each field held a non-zero value when the snapshot was taken
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Presets(Vec<Preset>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preset {
    Leaf(bool),
    Section(Presets),
}

impl Presets {
    /// Number of leaf fields marked as preset, sections included.
    #[must_use]
    pub fn count(&self) -> usize {
        self.0
            .iter()
            .map(|p| match p {
                Preset::Leaf(set) => usize::from(*set),
                Preset::Section(nested) => nested.count(),
            })
            .sum()
    }
}

trait Node<T>: Send + Sync {
    fn key(&self) -> &str;
    fn apply_defaults(&self, target: &mut T);
    fn snapshot(&self, target: &mut T) -> Preset;
    fn decode(&self, target: &mut T, value: &Value, preset: Option<&Preset>)
        -> Result<(), FieldError>;
}

struct Leaf<T, V> {
    key: String,
    access: fn(&mut T) -> &mut V,
    default: Option<V>,
}

impl<T, V> Node<T> for Leaf<T, V>
where
    T: 'static,
    V: DeserializeOwned + Default + PartialEq + Clone + Send + Sync + 'static,
{
    fn key(&self) -> &str {
        &self.key
    }

    fn apply_defaults(&self, target: &mut T) {
        if let Some(default) = &self.default {
            let slot = (self.access)(target);
            if *slot == V::default() {
                *slot = default.clone();
            }
        }
    }

    fn snapshot(&self, target: &mut T) -> Preset {
        Preset::Leaf(*(self.access)(target) != V::default())
    }

    fn decode(
        &self,
        target: &mut T,
        value: &Value,
        preset: Option<&Preset>,
    ) -> Result<(), FieldError> {
        if matches!(preset, Some(Preset::Leaf(true))) {
            tracing::trace!(key = %self.key, "keeping preset value over config file");
            return Ok(());
        }
        let decoded: V = value.clone().try_into().map_err(|source| FieldError {
            key: self.key.clone(),
            source,
        })?;
        *(self.access)(target) = decoded;
        Ok(())
    }
}

struct Section<T, S> {
    key: String,
    access: fn(&mut T) -> &mut S,
    schema: Schema<S>,
}

impl<T, S> Node<T> for Section<T, S>
where
    T: 'static,
    S: 'static,
{
    fn key(&self) -> &str {
        &self.key
    }

    fn apply_defaults(&self, target: &mut T) {
        self.schema.apply_defaults((self.access)(target));
    }

    fn snapshot(&self, target: &mut T) -> Preset {
        Preset::Section(self.schema.snapshot((self.access)(target)))
    }

    fn decode(
        &self,
        target: &mut T,
        value: &Value,
        preset: Option<&Preset>,
    ) -> Result<(), FieldError> {
        let Some(table) = value.as_table() else {
            return Err(FieldError {
                key: self.key.clone(),
                source: serde::de::Error::custom(format!(
                    "expected a table, found {}",
                    value.type_str()
                )),
            });
        };
        let nested = match preset {
            Some(Preset::Section(presets)) => Some(presets),
            _ => None,
        };
        self.schema
            .decode((self.access)(target), table, nested)
            .map_err(|e| e.nested_under(&self.key))
    }
}

/// Explicit field bindings for a settings type
///
/// Fields are registered once with their TOML key and, optionally, a default.
/// A field's zero value is `V::default()`; defaults only replace zero values,
/// and decoding only touches fields whose key appears in the file.
///
/// ```
/// use layercfg::config::Schema;
/// use layercfg::scalar::LogLevel;
///
/// #[derive(Default)]
/// struct Log {
///     level: LogLevel,
///     dir: String,
/// }
///
/// let schema = Schema::new()
///     .field_with_default("level", |l: &mut Log| &mut l.level, LogLevel::Info)
///     .field("dir", |l: &mut Log| &mut l.dir);
///
/// let mut log = Log::default();
/// schema.apply_defaults(&mut log);
/// assert_eq!(log.level, LogLevel::Info);
/// ```
pub struct Schema<T> {
    nodes: Vec<Box<dyn Node<T>>>,
}

impl<T: 'static> Default for Schema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Schema<T> {
    #[must_use]
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Bind a field with no default.
    #[must_use]
    pub fn field<V>(self, key: &str, access: fn(&mut T) -> &mut V) -> Self
    where
        V: DeserializeOwned + Default + PartialEq + Clone + Send + Sync + 'static,
    {
        self.push(Leaf {
            key: key.to_string(),
            access,
            default: None,
        })
    }

    /// Bind a field that falls back to `default` while it holds its zero value.
    #[must_use]
    pub fn field_with_default<V>(
        self,
        key: &str,
        access: fn(&mut T) -> &mut V,
        default: impl Into<V>,
    ) -> Self
    where
        V: DeserializeOwned + Default + PartialEq + Clone + Send + Sync + 'static,
    {
        self.push(Leaf {
            key: key.to_string(),
            access,
            default: Some(default.into()),
        })
    }

    /// Bind a nested table to a sub-struct with its own schema.
    #[must_use]
    pub fn section<S: 'static>(
        self,
        key: &str,
        access: fn(&mut T) -> &mut S,
        schema: Schema<S>,
    ) -> Self {
        self.push(Section {
            key: key.to_string(),
            access,
            schema,
        })
    }

    fn push(mut self, node: impl Node<T> + 'static) -> Self {
        self.nodes.push(Box::new(node));
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Fill every zero-valued field that declares a default.
    pub fn apply_defaults(&self, target: &mut T) {
        for node in &self.nodes {
            node.apply_defaults(target);
        }
    }

    /// Record which fields currently hold a non-zero value.
    pub fn snapshot(&self, target: &mut T) -> Presets {
        Presets(self.nodes.iter().map(|n| n.snapshot(target)).collect())
    }

    /// Overwrite every bound field whose key is present in `table`.
    ///
    /// Keys match exactly first, then ignoring ASCII case. Unknown keys are
    /// ignored. Fields marked in `presets` are left alone.
    pub fn decode(
        &self,
        target: &mut T,
        table: &Table,
        presets: Option<&Presets>,
    ) -> Result<(), FieldError> {
        for (idx, node) in self.nodes.iter().enumerate() {
            let Some(value) = lookup(table, node.key()) else {
                continue;
            };
            let preset = presets.and_then(|p| p.0.get(idx));
            node.decode(target, value, preset)?;
        }
        Ok(())
    }
}

fn lookup<'a>(table: &'a Table, key: &str) -> Option<&'a Value> {
    table.get(key).or_else(|| {
        table
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}
