use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::{Chainable, ErrorDetail, Result};

/// Any front-matter or configuration value.
pub type Value = serde_yaml::Value;

/// A string-keyed (by convention) mapping of values.
pub type Dict = serde_yaml::Mapping;

pub trait Format: Sized {
    /// The data format's error type.
    type Error: serde::de::Error + ErrorDetail + 'static;

    /// Parses `string` as the data format `Self` into a `T`.
    fn from_str<T: DeserializeOwned>(string: &str) -> Result<T, Self::Error>;

    /// Reads the file at `path` and parses it as a `T`.
    fn read<T: DeserializeOwned>(path: &Path) -> Result<T> {
        let string = fs::read_to_string(path).chain_with(|| error! {
            "failed to read data file",
            "path" => path.display(),
        })?;

        Self::from_str(&string).chain_with(|| error! {
            "failed to parse data file",
            "path" => path.display(),
        })
    }
}

macro_rules! impl_format {
    ($name:ident : $func:expr, $E:ty) => (
        #[derive(Debug, Default, Clone, Copy)]
        pub struct $name;

        impl Format for $name {
            type Error = $E;

            fn from_str<T: DeserializeOwned>(s: &str) -> Result<T, $E> {
                $func(s)
            }
        }
    );
}

impl_format!(Yaml: serde_yaml::from_str, serde_yaml::Error);

/// Renders a scalar value as a string. Returns `None` for null, sequences,
/// mappings and tagged values.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) | Value::Tagged(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_as_strings() {
        let list: Value = Yaml::from_str("[en, 3, true, ~, [de]]").unwrap();
        let strings: Vec<_> = list.as_sequence().unwrap().iter().map(scalar_to_string).collect();
        assert_eq!(strings, [Some("en".to_string()), Some("3".into()), Some("true".into()), None, None]);
    }

    #[test]
    fn read_data_files() {
        let dir = tempfile::tempdir().unwrap();
        let (good, bad) = (dir.path().join("a.yaml"), dir.path().join("b.yaml"));
        fs::write(&good, "title: Hi\ncount: 3\n").unwrap();
        fs::write(&bad, "title: [unclosed\n").unwrap();

        let data: Dict = Yaml::read(&good).unwrap();
        assert_eq!(data.get("count"), Some(&Value::from(3)));

        let error = Yaml::read::<Dict>(&bad).unwrap_err();
        assert!(error.to_string().contains("b.yaml"));
        assert!(Yaml::read::<Dict>(&dir.path().join("missing.yaml")).is_err());
    }
}
