//! # Text Resolver
//!
//! Maps a hierarchical text path plus a locale to a display string. Menus
//! query it once per node and locale while compiling; lists query it for
//! every reply option.
//!
//! [`Catalog`] is the bundled implementation: one TOML file per locale in a
//! directory, nested tables flattened into `/`-separated paths.
//!
//! ```toml
//! # lang/en.toml
//! greeting = "Hello there"
//!
//! [flow1]
//! greetings = "Say hello"
//!
//! [flow1.order]
//! pizza = "Pizza"
//! ```
//!
//! resolves `flow1/order/pizza` to `Pizza` for `en`. A node that has both
//! a label and children needs a quoted key, since a TOML key cannot be a
//! string and a table at once:
//!
//! ```toml
//! [flow1]
//! order = "Order"
//! "order/pizza" = "Pizza"
//! ```

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use log::{debug, warn};
use tokio::fs;

use crate::validation::validate_locale;

/// Separator between the segments of a text path.
pub const PATH_SEPARATOR: char = '/';

pub trait TextResolver: Send + Sync {
    /// Display string for `path` in `locale`.
    fn resolve(&self, path: &str, locale: &str) -> String;

    /// Whether any text is known for `locale`.
    fn has_locale(&self, locale: &str) -> bool;
}

/// In-memory translation table.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    locales: HashMap<String, HashMap<String, String>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, locale: &str, path: &str, text: &str) -> Self {
        self.insert(locale, path, text);
        self
    }

    pub fn insert(&mut self, locale: &str, path: &str, text: &str) {
        self.locales
            .entry(locale.to_string())
            .or_default()
            .insert(path.to_string(), text.to_string());
    }

    /// Make `locale` known even before any text is added.
    pub fn add_locale(&mut self, locale: &str) {
        self.locales.entry(locale.to_string()).or_default();
    }

    /// Known locales, sorted.
    pub fn locales(&self) -> Vec<String> {
        self.locales
            .keys()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn get(&self, path: &str, locale: &str) -> Option<&str> {
        self.locales
            .get(locale)
            .and_then(|texts| texts.get(path))
            .map(String::as_str)
    }

    /// Number of texts known for `locale`.
    pub fn len(&self, locale: &str) -> usize {
        self.locales.get(locale).map_or(0, HashMap::len)
    }

    /// Merge one locale document (TOML source) into the catalog.
    pub fn load_str(&mut self, locale: &str, source: &str) -> Result<()> {
        validate_locale(locale)?;
        let table: toml::Table =
            toml::from_str(source).map_err(|e| anyhow!("Failed to parse locale {}: {}", locale, e))?;
        let entries = self.locales.entry(locale.to_string()).or_default();
        flatten(&table, "", entries);
        Ok(())
    }

    /// Load every `<locale>.toml` file in `dir`.
    pub async fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut catalog = Catalog::new();
        let mut entries = fs::read_dir(dir)
            .await
            .with_context(|| format!("Failed to read locale directory {}", dir.display()))?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                continue;
            }
            let Some(locale) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let source = fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read locale file {}", path.display()))?;
            catalog.load_str(locale, &source)?;
            debug!(
                "loaded locale {} ({} texts) from {}",
                locale,
                catalog.len(locale),
                path.display()
            );
        }
        if catalog.locales.is_empty() {
            return Err(anyhow!("No locale files found in {}", dir.display()));
        }
        Ok(catalog)
    }
}

fn flatten(table: &toml::Table, prefix: &str, out: &mut HashMap<String, String>) {
    for (key, value) in table {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}{PATH_SEPARATOR}{key}")
        };
        match value {
            toml::Value::Table(inner) => flatten(inner, &path, out),
            toml::Value::String(s) => {
                out.insert(path, s.clone());
            }
            toml::Value::Integer(_) | toml::Value::Float(_) | toml::Value::Boolean(_) => {
                out.insert(path, value.to_string());
            }
            other => warn!("ignoring non-text value at {}: {}", path, other.type_str()),
        }
    }
}

impl TextResolver for Catalog {
    /// Missing texts fall back to the path itself so the gap is visible in
    /// the rendered menu.
    fn resolve(&self, path: &str, locale: &str) -> String {
        match self.get(path, locale) {
            Some(text) => text.to_string(),
            None => {
                warn!("missing text for {} in locale {}", path, locale);
                path.to_string()
            }
        }
    }

    fn has_locale(&self, locale: &str) -> bool {
        self.locales.contains_key(locale)
    }
}
