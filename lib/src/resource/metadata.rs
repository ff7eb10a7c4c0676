use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use derive_more::Deref;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::value::{Dict, Value};

pub trait MetaKey: 'static {
    const KEY: &'static str;

    type Value: DeserializeOwned + fmt::Debug;
}

#[macro_export]
macro_rules! define_meta_key {
    ($($v:vis $T:ident : $key:literal => $V:ty),+ $(,)?) => {
        $(
            #[derive(Debug, Clone, Copy)]
            $v struct $T;

            impl $crate::resource::MetaKey for $T {
                const KEY: &'static str = $key;
                type Value = $V;
            }
        )+
    }
}

define_meta_key! {
    pub OnlyForLocales : "only-for-locales" => StringList,
    pub OverrideOutputToPath : "override-output-to-path" => String,
    pub OverrideLocale : "override-locale" => String,
    pub OverrideLayout : "override-layout" => String,
    pub OverrideUseUglyUrl : "override-use-ugly-url" => bool,

    pub PaginateOverDirectory : "paginate-over-directory" => String,
    pub PaginateOverTaxonomy : "paginate-over-taxonomy" => String,
    pub IncludeAll : "include-all" => String,

    pub PaginateMatch : "paginate-match" => StringList,
    pub PaginateRecursive : "paginate-recursive" => bool,
    pub PaginatePageSize : "paginate-page-size" => usize,
    pub PaginateAtDepth : "paginate-at-depth" => usize,

    pub Date : "date" => String,
}

/// A list of strings that may be written as a single string in YAML.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Deref)]
#[serde(from = "OneOrMany")]
pub struct StringList(pub Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for StringList {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(s) => StringList(vec![s]),
            OneOrMany::Many(v) => StringList(v),
        }
    }
}

/// Front-matter metadata of a file. Read once; never modified afterwards.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Metadata {
    #[serde(rename = "rawMap")]
    map: Arc<Dict>,
}

impl Metadata {
    pub fn new(map: Dict) -> Self {
        Metadata { map: Arc::new(map) }
    }

    #[inline(always)]
    pub fn raw(&self) -> &Dict {
        &self.map
    }

    #[inline(always)]
    pub fn get_raw(&self, key: &str) -> Option<&Value> {
        self.map.get(key).filter(|v| !v.is_null())
    }

    #[inline(always)]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get_raw(key).is_some()
    }

    #[inline(always)]
    pub fn contains<K: MetaKey>(&self, _: K) -> bool {
        self.contains_key(K::KEY)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns the typed value for `K`, `Err` with the raw value if it has the
    /// wrong type, or `None` if the key is absent or null.
    #[inline]
    pub fn get<K: MetaKey>(&self, _: K) -> Option<Result<K::Value, Value>> {
        let value = self.get_raw(K::KEY)?;
        Some(serde_yaml::from_value(value.clone()).map_err(|_| value.clone()))
    }

    /// Like [`Metadata::get()`] but turns a type mismatch into an error.
    pub fn read<K: MetaKey>(&self, key: K) -> Result<Option<K::Value>> {
        match self.get(key) {
            Some(Ok(value)) => Ok(Some(value)),
            Some(Err(value)) => err! {
                kind = Configuration;
                "unexpected metadata value type",
                "key" => K::KEY,
                "expected" => std::any::type_name::<K::Value>(),
                "actual type" => kind_of(&value),
            },
            None => Ok(None),
        }
    }

    /// Checks that every reserved key has a value of the expected type and that
    /// `date`, if present, parses.
    pub fn validate(&self) -> Result<()> {
        self.read(OnlyForLocales)?;
        self.read(OverrideOutputToPath)?;
        self.read(OverrideLocale)?;
        self.read(OverrideLayout)?;
        self.read(OverrideUseUglyUrl)?;
        self.read(PaginateOverDirectory)?;
        self.read(PaginateOverTaxonomy)?;
        self.read(IncludeAll)?;
        self.read(PaginateMatch)?;
        self.read(PaginateRecursive)?;
        self.read(PaginatePageSize)?;
        self.read(PaginateAtDepth)?;
        self.date()?;
        Ok(())
    }

    /// The parsed `date` override, if any.
    pub fn date(&self) -> Result<Option<NaiveDateTime>> {
        let Some(string) = self.read(Date)? else {
            return Ok(None);
        };

        parse_date(&string).map(Some).ok_or_else(|| error! {
            kind = Configuration;
            "invalid date in metadata",
            "key" => Date::KEY,
            "value" => string,
            "accepted formats" => "YYYY-MM-DD, YYYY-MM-DD HH:MM[:SS], RFC 3339",
        })
    }
}

fn parse_date(string: &str) -> Option<NaiveDateTime> {
    let string = string.trim();
    DateTime::parse_from_rfc3339(string).map(|dt| dt.naive_utc())
        .or_else(|_| NaiveDateTime::parse_from_str(string, "%Y-%m-%d %H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(string, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(string, "%Y-%m-%d %H:%M"))
        .or_else(|_| string.parse::<NaiveDate>().map(|d| d.and_hms_opt(0, 0, 0).unwrap_or_default()))
        .ok()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

impl fmt::Display for Metadata {
    #[inline(always)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#?}", self.map)
    }
}
