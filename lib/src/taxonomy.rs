use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use crate::resource::{Comparator, Directory, FileResource};
use crate::value::{scalar_to_string, Value};

/// Files grouped by the values of configured metadata properties, such as
/// `tags` or `authors`.
#[derive(Debug, Default)]
pub struct Taxonomy<'a> {
    groups: FxHashMap<String, BTreeMap<String, Vec<&'a FileResource>>>,
}

impl<'a> Taxonomy<'a> {
    /// Indexes every file visible in `dir` and below under each value of each
    /// property in `groups`. A sequence value contributes one membership per
    /// distinct element.
    pub fn new<S: AsRef<str>>(groups: &[S], dir: &dyn Directory<'a>, comparator: Comparator) -> Self {
        let mut taxonomy = Taxonomy::default();
        for group in groups {
            taxonomy.groups.insert(group.as_ref().to_string(), BTreeMap::new());
        }

        for file in dir.walk_files() {
            for (group, tags) in taxonomy.groups.iter_mut() {
                let Some(value) = file.metadata.get_raw(group) else {
                    continue;
                };

                for tag in tag_values(value) {
                    let files = tags.entry(tag).or_default();
                    if !files.iter().any(|f| f.id == file.id) {
                        files.push(file);
                    }
                }
            }
        }

        for tags in taxonomy.groups.values_mut() {
            for files in tags.values_mut() {
                files.sort_by(|a, b| comparator(a, b));
            }
        }

        taxonomy
    }

    /// The tags of `group` and their files, ordered by tag. `None` if `group`
    /// isn't a configured taxonomy.
    pub fn group(&self, group: &str) -> Option<&BTreeMap<String, Vec<&'a FileResource>>> {
        self.groups.get(group)
    }
}

fn tag_values(value: &Value) -> Vec<String> {
    match value {
        Value::Sequence(seq) => seq.iter().filter_map(scalar_to_string).collect(),
        value => scalar_to_string(value).into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::resource::{newest_first, DirView, LocaleAware, LocaleFilter, ResourceTree, TreeOptions};

    #[test]
    fn groups_files_by_tag() {
        let dir = tempfile::tempdir().unwrap();
        let files = [
            ("a.md", "---\ndate: 2024-01-01\ntags: [rust, web, rust]\nauthors: ana\n---\n"),
            ("sub/b.md", "---\ndate: 2024-02-01\ntags: rust\n---\n"),
            ("c.md", "---\ntags: ~\n---\n"),
            ("d.de.md", "---\ntags: [rust, 2024, true]\n---\n"),
        ];

        for (path, contents) in files {
            let path = dir.path().join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
        }

        let tree = ResourceTree::build(dir.path(), &TreeOptions::default()).unwrap();
        let locales = vec!["en".to_string(), "de".to_string()];
        let en = LocaleAware::new(DirView::root(&tree).boxed(), LocaleFilter::new("en", &locales));
        let taxonomy = Taxonomy::new(&["tags", "authors", "series"], &en, newest_first);

        let names = |group: &str, tag: &str| taxonomy.group(group)
            .and_then(|tags| tags.get(tag))
            .map(|files| files.iter().map(|f| f.file_name.as_str()).collect::<Vec<_>>())
            .unwrap_or_default();

        assert_eq!(names("tags", "rust"), ["b.md", "a.md"]);
        assert_eq!(names("tags", "web"), ["a.md"]);
        assert_eq!(names("authors", "ana"), ["a.md"]);
        assert!(names("tags", "2024").is_empty());
        assert!(taxonomy.group("series").unwrap().is_empty());
        assert!(taxonomy.group("categories").is_none());
        assert_eq!(taxonomy.group("tags").unwrap().keys().collect::<Vec<_>>(), ["rust", "web"]);

        let de = LocaleAware::new(DirView::root(&tree).boxed(), LocaleFilter::new("de", &locales));
        let taxonomy = Taxonomy::new(&["tags"], &de, newest_first);
        assert_eq!(taxonomy.group("tags").unwrap().keys().collect::<Vec<_>>(), ["2024", "rust", "true", "web"]);
    }
}
