//! Output file names and paths.
//!
//! A file's extension chain, read right to left, decides its output name. The
//! outermost extension selects a renderer. A renderer either fixes the output
//! extension (Markdown always emits `html`) or keeps the next extension of the
//! chain (`page.html.peb` emits `html`). Locale tags are dropped and any other
//! extensions stay where they were. `html` output not named `index` gets a
//! clean URL (`name/index.html`) unless ugly URLs are requested.

use std::path::{Path, PathBuf};

use crate::config::Configuration;
use crate::error::Result;
use crate::render::Renderers;
use crate::resource::{FileResource, OverrideOutputToPath, OverrideUseUglyUrl};
use crate::util::PathExt;

/// The resolved output name of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputName {
    /// The name up to the output extension, residual extensions included.
    pub base: String,
    /// The output extension. Empty only for files without extensions.
    pub extension: String,
    /// `true` if the file is written as `base/index.html`.
    pub clean: bool,
}

impl OutputName {
    /// The final path of the file relative to its directory.
    pub fn file_name(&self) -> PathBuf {
        match (self.clean, self.extension.is_empty()) {
            (true, _) => Path::new(&self.base).join("index.html"),
            (false, true) => PathBuf::from(&self.base),
            (false, false) => PathBuf::from(format!("{}.{}", self.base, self.extension)),
        }
    }
}

/// Computes output names and paths from the registered renderers and the
/// site configuration.
#[derive(Debug, Clone, Copy)]
pub struct Naming<'a> {
    pub renderers: &'a Renderers,
    pub config: &'a Configuration,
}

impl<'a> Naming<'a> {
    pub fn new(renderers: &'a Renderers, config: &'a Configuration) -> Self {
        Naming { renderers, config }
    }

    /// `true` if `file` should get an ugly URL: the file's own override if it
    /// has one, else the configured default.
    pub fn use_ugly_url(&self, file: &FileResource) -> bool {
        match file.metadata.get(OverrideUseUglyUrl) {
            Some(Ok(ugly)) => ugly,
            _ => self.config.use_ugly_url,
        }
    }

    pub fn output_name(&self, file: &FileResource) -> OutputName {
        let extensions = file.file_extensions();
        let Some(&first_original) = extensions.first() else {
            return OutputName { base: file.file_name.clone(), extension: String::new(), clean: false };
        };

        let chain: Vec<&str> = extensions.into_iter()
            .filter(|ext| !self.config.locales.iter().any(|locale| locale == ext))
            .collect();

        let (mut extension, consumed) = match chain.first() {
            Some(&first) => match self.renderers.resource(first) {
                Some(renderer) => match renderer.output_extension() {
                    Some(fixed) => (fixed.to_string(), 1),
                    None => match chain.get(1) {
                        Some(&next) => (next.to_string(), 2),
                        None => (String::new(), 1),
                    },
                },
                None => (first.to_string(), 1),
            },
            None => (String::new(), 0),
        };

        if extension.is_empty() {
            extension = first_original.to_string();
        }

        let mut base = file.file_name_without_extensions().to_string();
        for residual in chain.iter().skip(consumed).rev() {
            base.push('.');
            base.push_str(residual);
        }

        let clean = extension == "html"
            && base != "index"
            && !file.metadata.contains(OverrideOutputToPath)
            && !self.use_ugly_url(file);

        OutputName { base, extension, clean }
    }

    /// The path, relative to the output root, `file` is written to when
    /// rendered for `locale`.
    pub fn output_path(&self, file: &FileResource, locale: &str) -> Result<PathBuf> {
        if let Some(path) = file.metadata.read(OverrideOutputToPath)? {
            return check_output_path(Path::new(&path), file);
        }

        let mut path = PathBuf::new();
        if let Some(prefix) = self.config.locale_prefix(locale) {
            path.push(prefix);
        }

        if let Some(parent) = file.relative_path.parent() {
            path.push(parent);
        }

        path.push(self.output_name(file).file_name());
        check_output_path(&path, file)
    }

    /// Splits `path`, the output path of `file`, into its directory and the
    /// final name `file` contributes to it (`post/index.html` for clean URLs).
    pub fn split_output_path(&self, path: &Path, file: &FileResource) -> (PathBuf, PathBuf) {
        let name = match file.metadata.contains(OverrideOutputToPath) {
            true => PathBuf::from(path.file_name().unwrap_or_default()),
            false => self.output_name(file).file_name(),
        };

        let depth = name.components().count();
        let dir = path.ancestors().nth(depth).unwrap_or(Path::new(""));
        (dir.to_path_buf(), name)
    }

    /// The path of page `n` (≥ 2) of a sequence whose first page is at
    /// `first`.
    pub fn page_path(&self, first: &Path, n: usize, file: &FileResource) -> PathBuf {
        let dir = first.parent().unwrap_or(Path::new("")).join("page");
        match self.use_ugly_url(file) {
            true => dir.join(format!("{n}.html")),
            false => dir.join(n.to_string()).join("index.html"),
        }
    }

    /// The path of a named subpage of the page at `first`, such as an
    /// include-all entry. Subpages live below `first`: `book/part/index.html`
    /// or, with ugly URLs, `book/part.html` for a first page at `book.html`.
    pub fn subpage_path(&self, first: &Path, stem: &Path, file: &FileResource) -> PathBuf {
        let dir = first.parent().unwrap_or(Path::new(""));
        match self.use_ugly_url(file) {
            true => {
                let mut name = stem.as_os_str().to_os_string();
                name.push(".html");
                let first_stem = first.file_stem().unwrap_or_default();
                dir.join(first_stem).join(name)
            }
            false => dir.join(stem).join("index.html"),
        }
    }
}

/// Checks that `path` is relative and stays inside the output root.
fn check_output_path(path: &Path, file: &FileResource) -> Result<PathBuf> {
    let normalized = match path.has_root() {
        true => None,
        false => path.normalize().filter(|p| !p.as_os_str().is_empty()),
    };

    normalized.ok_or_else(|| error! {
        kind = Configuration;
        "output path must be relative and inside the output directory",
        "output path" => path.display(),
        "resource" => file.path.display(),
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::render::tests::renderers;
    use crate::resource::{ResourceTree, StringList, TreeOptions};

    struct Fixture {
        _dir: tempfile::TempDir,
        tree: ResourceTree,
    }

    impl Fixture {
        fn new(files: &[(&str, &str)]) -> Self {
            let dir = tempfile::tempdir().unwrap();
            for (path, contents) in files {
                let path = dir.path().join(path);
                fs::create_dir_all(path.parent().unwrap()).unwrap();
                fs::write(path, contents).unwrap();
            }

            let tree = ResourceTree::build(dir.path(), &TreeOptions::default()).unwrap();
            Fixture { _dir: dir, tree }
        }

        fn file(&self, path: &str) -> &FileResource {
            self.tree.get(path).and_then(|e| e.as_file()).unwrap()
        }
    }

    fn config(locales: &[&str], ugly: bool) -> Configuration {
        Configuration {
            locales: StringList(locales.iter().map(|s| s.to_string()).collect()),
            use_ugly_url: ugly,
            ..Configuration::default()
        }
    }

    fn name(naming: &Naming<'_>, file: &FileResource) -> String {
        naming.output_name(file).file_name().to_string_lossy().into_owned()
    }

    #[test]
    fn extension_chains() {
        let fixture = Fixture::new(&[
            ("index.html", ""), ("index.html.peb", ""), ("post.md", ""), ("a.b.md", ""),
            ("data.json.peb", ""), ("page.en.peb", ""), ("page.html.en.peb", ""),
            ("README", ""), ("style.css", ""), ("raw.peb", ""), ("about.html", ""),
        ]);

        let (renderers, config) = (renderers(), config(&["en", "de"], false));
        let naming = Naming::new(&renderers, &config);
        let expected = [
            ("index.html", "index.html"),
            ("index.html.peb", "index.html"),
            ("post.md", "post/index.html"),
            ("a.b.md", "a.b/index.html"),
            ("data.json.peb", "data.json"),
            ("page.en.peb", "page.peb"),
            ("page.html.en.peb", "page/index.html"),
            ("README", "README"),
            ("style.css", "style.css"),
            ("raw.peb", "raw.peb"),
            ("about.html", "about/index.html"),
        ];

        for (input, output) in expected {
            assert_eq!(name(&naming, fixture.file(input)), output, "{input}");
        }
    }

    #[test]
    fn ugly_urls_global_and_per_file() {
        let fixture = Fixture::new(&[
            ("post.md", ""),
            ("ugly.md", "---\noverride-use-ugly-url: true\n---\n"),
            ("clean.md", "---\noverride-use-ugly-url: false\n---\n"),
        ]);

        let renderers = renderers();
        for locales in [&["en"][..], &["en", "de", "fr"][..]] {
            let clean = config(locales, false);
            let naming = Naming::new(&renderers, &clean);
            assert_eq!(name(&naming, fixture.file("post.md")), "post/index.html");
            assert_eq!(name(&naming, fixture.file("ugly.md")), "ugly.html");
            assert_eq!(name(&naming, fixture.file("clean.md")), "clean/index.html");

            let ugly = config(locales, true);
            let naming = Naming::new(&renderers, &ugly);
            assert_eq!(name(&naming, fixture.file("post.md")), "post.html");
            assert_eq!(name(&naming, fixture.file("ugly.md")), "ugly.html");
            assert_eq!(name(&naming, fixture.file("clean.md")), "clean/index.html");
        }
    }

    #[test]
    fn output_paths() {
        let fixture = Fixture::new(&[
            ("blog/post.md", ""),
            ("blog/moved.md", "---\noverride-output-to-path: feeds/../feed.xml\n---\n"),
            ("escape.md", "---\noverride-output-to-path: ../../etc/passwd\n---\n"),
            ("absolute.md", "---\noverride-output-to-path: /etc/passwd\n---\n"),
        ]);

        let renderers = renderers();
        let single = config(&["en"], false);
        let naming = Naming::new(&renderers, &single);
        let post = fixture.file("blog/post.md");
        assert_eq!(naming.output_path(post, "en").unwrap(), Path::new("blog/post/index.html"));
        assert_eq!(naming.output_path(fixture.file("blog/moved.md"), "en").unwrap(), Path::new("feed.xml"));

        let error = naming.output_path(fixture.file("escape.md"), "en").unwrap_err();
        assert_eq!(error.kind(), crate::error::ErrorKind::Configuration);
        assert!(naming.output_path(fixture.file("absolute.md"), "en").is_err());

        let mut multi = config(&["en", "de"], false);
        let naming = Naming::new(&renderers, &multi);
        assert_eq!(naming.output_path(post, "de").unwrap(), Path::new("de/blog/post/index.html"));
        assert_eq!(naming.output_path(post, "en").unwrap(), Path::new("en/blog/post/index.html"));

        multi.default_locale = Some("en".into());
        let naming = Naming::new(&renderers, &multi);
        assert_eq!(naming.output_path(post, "en").unwrap(), Path::new("blog/post/index.html"));
    }

    #[test]
    fn page_paths() {
        let fixture = Fixture::new(&[
            ("index.html.peb", ""),
            ("tags.md", ""),
            ("list.peb", "---\noverride-use-ugly-url: true\n---\n"),
        ]);
        let (renderers, config) = (renderers(), config(&["en"], false));
        let naming = Naming::new(&renderers, &config);

        let index = fixture.file("index.html.peb");
        assert_eq!(naming.page_path(Path::new("index.html"), 2, index), Path::new("page/2/index.html"));
        assert_eq!(naming.page_path(Path::new("de/blog/index.html"), 3, index), Path::new("de/blog/page/3/index.html"));
        assert_eq!(naming.subpage_path(Path::new("book/index.html"), Path::new("ch1/s2"), index), Path::new("book/ch1/s2/index.html"));

        let (dir, name) = naming.split_output_path(Path::new("de/blog/tags/index.html"), fixture.file("tags.md"));
        assert_eq!((dir.as_path(), name.as_path()), (Path::new("de/blog"), Path::new("tags/index.html")));

        let list = fixture.file("list.peb");
        assert_eq!(naming.page_path(Path::new("list.peb"), 2, list), Path::new("page/2.html"));
        assert_eq!(naming.subpage_path(Path::new("list.html"), Path::new("rust"), list), Path::new("list/rust.html"));
        assert_eq!(naming.subpage_path(Path::new("de/book.html"), Path::new("ch1/s2"), list), Path::new("de/book/ch1/s2.html"));
    }
}
