use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::error::{Chainable, Result};
use crate::resource::{StringList, TreeOptions, Comparator, newest_first};
use crate::value::{Dict, Format, Value, Yaml};

pub const CONFIG_FILE: &str = "configuration.yaml";
pub const CONTENT_DIR: &str = "content";
pub const LAYOUT_DIR: &str = "layout";
pub const STATIC_DIR: &str = "static";
pub const LOCALES_DIR: &str = "locales";
pub const OUTPUT_DIR: &str = "output";

/// Site-wide settings read from `configuration.yaml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Configuration {
    #[serde(default = "Configuration::default_locales")]
    pub locales: StringList,
    /// Renders at the output root instead of below its own directory.
    #[serde(default)]
    pub default_locale: Option<String>,
    #[serde(default)]
    pub use_ugly_url: bool,
    #[serde(default = "Configuration::default_ignore_patterns")]
    pub ignore_patterns: StringList,
    #[serde(default)]
    pub taxonomies: StringList,
    /// Every other key, exposed to templates as `config`.
    #[serde(flatten)]
    pub globals: FxHashMap<String, Value>,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            locales: Self::default_locales(),
            default_locale: None,
            use_ugly_url: false,
            ignore_patterns: Self::default_ignore_patterns(),
            taxonomies: StringList::default(),
            globals: FxHashMap::default(),
        }
    }
}

impl Configuration {
    fn default_locales() -> StringList {
        StringList(vec!["en".into()])
    }

    fn default_ignore_patterns() -> StringList {
        StringList(TreeOptions::DEFAULT_IGNORE.iter().map(|s| s.to_string()).collect())
    }

    /// Reads `<base>/configuration.yaml`, if it exists, and applies
    /// `overrides` on top of it, replacing top-level keys.
    pub fn load(base: &Path, overrides: Dict) -> Result<Self> {
        let path = base.join(CONFIG_FILE);
        let mut map = match path.is_file() {
            true => match Yaml::read::<Value>(&path)? {
                Value::Mapping(map) => map,
                Value::Null => Dict::new(),
                _ => return err! {
                    kind = Configuration;
                    "configuration must be a mapping of keys to values",
                    "path" => path.display(),
                },
            },
            false => Dict::new(),
        };

        map.extend(overrides);
        let config = Self::from_dict(map).chain_with(|| error! {
            "invalid configuration",
            "path" => path.display(),
        })?;

        tracing::debug!(?config, "loaded configuration");
        Ok(config)
    }

    pub fn from_dict(map: Dict) -> Result<Self> {
        let config: Configuration = serde_yaml::from_value(Value::Mapping(map))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.locales.is_empty() {
            return err!(kind = Configuration; "at least one locale must be configured");
        }

        if let Some(default) = &self.default_locale {
            if !self.locales.contains(default) {
                return err! {
                    kind = Configuration;
                    "default locale is not one of the configured locales",
                    "default-locale" => default,
                    "locales" => self.locales.join(", "),
                };
            }
        }

        Ok(())
    }

    /// The locale used for files rendered outside of a locale pass.
    pub fn fallback_locale(&self) -> &str {
        self.default_locale.as_deref()
            .or_else(|| self.locales.first().map(|s| s.as_str()))
            .unwrap_or("en")
    }

    /// The output directory, relative to the output root, of `locale`.
    ///
    /// ```
    /// use quire::config::Configuration;
    /// use quire::resource::StringList;
    ///
    /// let mut config = Configuration::default();
    /// assert_eq!(config.locale_prefix("en"), None);
    ///
    /// config.locales = StringList(vec!["en".into(), "de".into()]);
    /// assert_eq!(config.locale_prefix("en"), Some("en"));
    ///
    /// config.default_locale = Some("en".into());
    /// assert_eq!(config.locale_prefix("en"), None);
    /// assert_eq!(config.locale_prefix("de"), Some("de"));
    /// ```
    pub fn locale_prefix<'a>(&self, locale: &'a str) -> Option<&'a str> {
        if self.locales.len() <= 1 || self.default_locale.as_deref() == Some(locale) {
            return None;
        }

        Some(locale)
    }

    pub fn tree_options(&self, comparator: Comparator) -> Result<TreeOptions> {
        TreeOptions::new(&self.ignore_patterns[..], comparator)
    }

    pub fn default_tree_options(&self) -> Result<TreeOptions> {
        self.tree_options(newest_first)
    }
}

/// Parses a `key=value` override. The value is read as YAML, so `-D
/// use-ugly-url=true` yields a boolean.
///
/// ```
/// use quire::config::parse_define;
/// use quire::value::Value;
///
/// let (key, value) = parse_define("use-ugly-url=true").unwrap();
/// assert_eq!(key, Value::from("use-ugly-url"));
/// assert_eq!(value, Value::Bool(true));
///
/// assert!(parse_define("no-equals-sign").is_err());
/// ```
pub fn parse_define(define: &str) -> Result<(Value, Value)> {
    let Some((key, value)) = define.split_once('=') else {
        return err! {
            kind = Configuration;
            "configuration override must have the form key=value",
            "override" => define,
        };
    };

    let value = match value.is_empty() {
        true => Value::Null,
        false => Yaml::from_str::<Value>(value)
            .unwrap_or_else(|_| Value::String(value.to_string())),
    };

    Ok((Value::String(key.trim().to_string()), value))
}

/// The directories a build reads from and writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitePaths {
    pub base: PathBuf,
    pub content: PathBuf,
    pub layout: PathBuf,
    pub static_dir: PathBuf,
    pub locales: PathBuf,
    pub output: PathBuf,
}

impl SitePaths {
    /// The conventional layout below `base`, with output at `<base>/output`
    /// unless `output` is given.
    pub fn new<P: AsRef<Path>>(base: P, output: Option<PathBuf>) -> Self {
        let base = base.as_ref().to_path_buf();
        SitePaths {
            content: base.join(CONTENT_DIR),
            layout: base.join(LAYOUT_DIR),
            static_dir: base.join(STATIC_DIR),
            locales: base.join(LOCALES_DIR),
            output: output.unwrap_or_else(|| base.join(OUTPUT_DIR)),
            base,
        }
    }

    /// The message bundle for `locale`, or an empty mapping if there is none.
    pub fn messages(&self, locale: &str) -> Result<Dict> {
        let path = self.locales.join(format!("{locale}.yaml"));
        if !path.is_file() {
            return Ok(Dict::new());
        }

        match Yaml::read::<Value>(&path)? {
            Value::Mapping(map) => Ok(map),
            Value::Null => Ok(Dict::new()),
            _ => err! {
                kind = Configuration;
                "locale messages must be a mapping of keys to values",
                "path" => path.display(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Configuration::load(dir.path(), Dict::new()).unwrap();
        assert_eq!(config.locales.0, ["en"]);
        assert!(!config.use_ugly_url);
        assert_eq!(config.fallback_locale(), "en");
        assert!(config.ignore_patterns.contains(&"*.swp".to_string()));
    }

    #[test]
    fn load_merges_overrides() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "\
locales: [en, de, fr]
use-ugly-url: false
taxonomies: tags
title: My Site
").unwrap();

        let mut overrides = Dict::new();
        let (key, value) = parse_define("use-ugly-url=true").unwrap();
        overrides.insert(key, value);
        let (key, value) = parse_define("title=Other").unwrap();
        overrides.insert(key, value);

        let config = Configuration::load(dir.path(), overrides).unwrap();
        assert_eq!(config.locales.0, ["en", "de", "fr"]);
        assert!(config.use_ugly_url);
        assert_eq!(config.taxonomies.0, ["tags"]);
        assert_eq!(config.globals["title"], Value::from("Other"));
        assert_eq!(config.locale_prefix("fr"), Some("fr"));
        assert_eq!(config.fallback_locale(), "en");
    }

    #[test]
    fn invalid_configuration() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "locales: [en]\ndefault-locale: de\n").unwrap();
        let error = Configuration::load(dir.path(), Dict::new()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Configuration);

        fs::write(dir.path().join(CONFIG_FILE), "use-ugly-url: [1, 2]\n").unwrap();
        let error = Configuration::load(dir.path(), Dict::new()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Configuration);
        assert!(error.to_string().contains(CONFIG_FILE));

        fs::write(dir.path().join(CONFIG_FILE), "- just\n- a list\n").unwrap();
        assert!(Configuration::load(dir.path(), Dict::new()).is_err());
    }

    #[test]
    fn messages() {
        let dir = tempfile::tempdir().unwrap();
        let paths = SitePaths::new(dir.path(), None);
        assert!(paths.messages("en").unwrap().is_empty());

        fs::create_dir_all(&paths.locales).unwrap();
        fs::write(paths.locales.join("de.yaml"), "greeting: Hallo\n").unwrap();
        let messages = paths.messages("de").unwrap();
        assert_eq!(messages.get("greeting"), Some(&Value::from("Hallo")));
        assert_eq!(paths.output, dir.path().join("output"));
    }
}
