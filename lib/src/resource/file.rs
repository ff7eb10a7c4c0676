use std::cmp::Ordering;
use std::fs;
use std::io::{self, BufRead};
use std::path::Path;
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use chrono::{DateTime, NaiveDateTime, Utc};
use once_cell::sync::OnceCell;

use crate::error::{Chainable, Result};
use crate::resource::{EntryId, Metadata};
use crate::value::{Dict, Format, Value, Yaml};

/// Orders files within a directory, a taxonomy group, or a pagination source.
pub type Comparator = fn(&FileResource, &FileResource) -> Ordering;

/// Newest first: by `date` metadata or creation time, then by name.
pub fn newest_first(a: &FileResource, b: &FileResource) -> Ordering {
    b.date.cmp(&a.date).then_with(|| a.file_name.cmp(&b.file_name))
}

#[derive(Debug)]
pub struct FileResource {
    pub id: EntryId,
    pub parent: EntryId,
    pub path: Arc<Path>,
    /// Path relative to the root of the tree containing this file.
    pub relative_path: Arc<Path>,
    pub file_name: String,
    pub metadata: Metadata,
    /// The `date` metadata if present, else the file's creation time.
    pub date: NaiveDateTime,
    content: OnceCell<Option<Arc<str>>>,
}

impl FileResource {
    pub(crate) fn new(
        id: EntryId,
        parent: EntryId,
        path: Arc<Path>,
        relative_path: Arc<Path>,
        fs_metadata: &fs::Metadata,
    ) -> Result<Self> {
        let metadata = FrontMatter::read(&path)
            .and_then(|meta| meta.validate().map(|_| meta))
            .chain_with(|| error! {
                "invalid front matter",
                "file" => path.display(),
            })?;

        let date = match metadata.date()? {
            Some(date) => date,
            None => {
                let created = fs_metadata.created()
                    .or_else(|_| fs_metadata.modified())
                    .unwrap_or(UNIX_EPOCH);

                DateTime::<Utc>::from(created).naive_utc()
            }
        };

        let file_name = path.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(FileResource {
            id,
            parent,
            path,
            relative_path,
            file_name,
            metadata,
            date,
            content: OnceCell::new(),
        })
    }

    /// The body of the file with front matter removed, or `None` if the file
    /// isn't valid UTF-8. Read on first access and cached.
    pub fn content(&self) -> Result<Option<Arc<str>>> {
        let content = self.content.get_or_try_init(|| {
            let bytes = fs::read(&self.path).chain_with(|| error! {
                "failed to read file",
                "path" => self.path.display(),
            })?;

            let content = String::from_utf8(bytes).ok().map(|string| {
                match FrontMatter::split(&string) {
                    Some((_, body)) => Arc::from(body),
                    None => Arc::from(string),
                }
            });

            Ok::<_, crate::error::Error>(content)
        })?;

        Ok(content.clone())
    }

    /// The dot-separated suffixes of the file name, right to left:
    /// `test.en.txt.peb` → `[peb, txt, en]`.
    pub fn file_extensions(&self) -> Vec<&str> {
        match self.file_name.split_once('.') {
            Some((_, extensions)) => extensions.split('.').rev().collect(),
            None => vec![],
        }
    }

    /// The file name up to the first dot: `test.en.txt.peb` → `test`.
    pub fn file_name_without_extensions(&self) -> &str {
        match self.file_name.split_once('.') {
            Some((name, _)) => name,
            None => &self.file_name,
        }
    }

    /// The first extension equal to one of `locales`, if any.
    pub fn locale_tag<'a>(&'a self, locales: &[String]) -> Option<&'a str> {
        self.file_extensions()
            .into_iter()
            .find(|ext| locales.iter().any(|locale| locale == ext))
    }
}

/// YAML front matter: a first non-blank line of exactly `---`, closed by
/// another line of exactly `---`.
pub struct FrontMatter;

impl FrontMatter {
    const DELIMITER: &'static str = "---";

    fn is_delimiter(line: &str) -> bool {
        line.trim_end_matches(['\n', '\r']) == Self::DELIMITER
    }

    /// Splits `input` into its front matter and body. Returns `None` if
    /// `input` has no (closed) front matter.
    pub fn split(input: &str) -> Option<(&str, &str)> {
        let mut lines = input.split_inclusive('\n');
        let mut offset = 0;
        let opening = loop {
            let line = lines.next()?;
            offset += line.len();
            if !line.trim().is_empty() {
                break line;
            }
        };

        if !Self::is_delimiter(opening) {
            return None;
        }

        let start = offset;
        for line in lines {
            if Self::is_delimiter(line) {
                return Some((&input[start..offset], &input[offset + line.len()..]));
            }

            offset += line.len();
        }

        None
    }

    /// Parses front-matter YAML into metadata. Empty front matter is empty
    /// metadata; anything but a mapping is an error.
    pub fn parse(yaml: &str) -> Result<Metadata> {
        match Yaml::from_str::<Value>(yaml)? {
            Value::Null => Ok(Metadata::default()),
            Value::Mapping(map) => Ok(Metadata::new(map)),
            _ => err!(kind = Configuration; "front matter must be a mapping of keys to values"),
        }
    }

    /// Reads only as much of the file at `path` as needed to extract its
    /// front matter.
    pub fn read(path: &Path) -> Result<Metadata> {
        let file = fs::File::open(path).chain_with(|| error! {
            "failed to open file for reading",
            "path" => path.display(),
        })?;

        let mut reader = io::BufReader::new(file);
        let mut yaml = String::new();
        let mut opened = false;
        let mut buffer = Vec::new();
        loop {
            buffer.clear();
            if reader.read_until(b'\n', &mut buffer)? == 0 {
                return Ok(Metadata::new(Dict::new()));
            }

            let Ok(line) = std::str::from_utf8(&buffer) else {
                return Ok(Metadata::new(Dict::new()));
            };

            match (opened, Self::is_delimiter(line)) {
                (false, _) if line.trim().is_empty() => continue,
                (false, true) => opened = true,
                (false, false) => return Ok(Metadata::new(Dict::new())),
                (true, true) => return Self::parse(&yaml),
                (true, false) => yaml.push_str(line),
            }
        }
    }
}
