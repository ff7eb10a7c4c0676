#![doc = svgbobdoc::transform!(
//! Flattening a directory of content into a linked sequence of documents.
//!
//! A file pairs with the directory of the same name, which holds its
//! subsections. With a cutoff depth of 1, `intro.md` and `part.md` each become
//! an entry, and `part.md` absorbs everything under `part/`:
//!
//! ```svgbob
//! book/                 entry 0: intro.md
//!  +-- intro.md         entry 1: part.md + a.md + b.md
//!  +-- part.md
//!  +-- part/
//!       +-- a.md
//!       +-- b.md
//! ```
)]

use std::path::{Path, PathBuf};
use std::rc::Rc;

use once_cell::sync::Lazy;
use once_cell::unsync::OnceCell;
use regex::Regex;
use serde::Serialize;
use serde_json::json;

use crate::directive::has_trigger;
use crate::error::Result;
use crate::paginate::PathAndModel;
use crate::render::{Model, RenderContext};
use crate::resource::{Directory, FileResource, PaginateAtDepth};
use crate::util::{natural_cmp, relative_url};

pub const DEFAULT_DEPTH: usize = 1;

/// A file, the directory sharing its name, or both.
#[derive(Debug)]
pub struct DocumentNode<'a> {
    pub name: String,
    pub file: Option<&'a FileResource>,
    pub children: Vec<DocumentNode<'a>>,
}

/// The files of a directory arranged as a tree of sections.
#[derive(Debug)]
pub struct StructuredDocument<'a> {
    pub nodes: Vec<DocumentNode<'a>>,
}

/// One output of a flattened document.
#[derive(Debug, Clone, Default)]
pub struct DocumentEntry<'a> {
    /// The node names leading to this entry, joined.
    pub stem: PathBuf,
    /// The file of the node this entry was emitted for, if it has one.
    pub own: Option<&'a FileResource>,
    /// `own` followed by every file it absorbs, in document order.
    pub files: Vec<&'a FileResource>,
}

impl<'a> StructuredDocument<'a> {
    /// Files carrying a directive are left out.
    pub fn new(dir: &dyn Directory<'a>) -> Self {
        StructuredDocument { nodes: DocumentNode::children_of(dir) }
    }

    /// The entries of this document for cutoff depth `cutoff`, where children
    /// of the root are at depth 1. A cutoff of 0 yields a single entry.
    pub fn flatten(&self, cutoff: usize) -> Vec<DocumentEntry<'a>> {
        let mut entries = vec![];
        if cutoff == 0 {
            let mut entry = DocumentEntry::default();
            self.nodes.iter().for_each(|node| node.collect(&mut entry.files));
            entries.push(entry);
        } else {
            for node in &self.nodes {
                node.flatten(1, cutoff, Path::new(""), &mut entries);
            }
        }

        entries
    }
}

impl<'a> DocumentNode<'a> {
    fn children_of(dir: &dyn Directory<'a>) -> Vec<DocumentNode<'a>> {
        let mut dirs = dir.directories();
        let mut nodes = vec![];
        for file in dir.files() {
            if has_trigger(file) {
                continue;
            }

            let name = file.file_name_without_extensions().to_string();
            let children = match dirs.iter().position(|d| d.key() == name) {
                Some(i) => DocumentNode::children_of(&*dirs.remove(i)),
                None => vec![],
            };

            nodes.push(DocumentNode { name, file: Some(file), children });
        }

        for dir in dirs {
            let children = DocumentNode::children_of(&*dir);
            nodes.push(DocumentNode { name: dir.key().to_string(), file: None, children });
        }

        nodes.sort_by(|a, b| natural_cmp(&a.name, &b.name));
        nodes
    }

    fn collect(&self, files: &mut Vec<&'a FileResource>) {
        files.extend(self.file);
        self.children.iter().for_each(|child| child.collect(files));
    }

    fn flatten(&self, depth: usize, cutoff: usize, prefix: &Path, entries: &mut Vec<DocumentEntry<'a>>) {
        let stem = prefix.join(&self.name);
        if depth < cutoff {
            if let Some(file) = self.file {
                entries.push(DocumentEntry { stem: stem.clone(), own: Some(file), files: vec![file] });
            }

            for child in &self.children {
                child.flatten(depth + 1, cutoff, &stem, entries);
            }
        } else {
            let mut files = vec![];
            self.collect(&mut files);
            if !files.is_empty() {
                entries.push(DocumentEntry { stem, own: self.file, files });
            }
        }
    }
}

/// A heading and the headings nested under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toc {
    pub level: usize,
    pub title: String,
    pub id: Option<String>,
    pub children: Vec<Toc>,
}

static HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<h([1-6])(\s[^>]*)?>(.*?)</h([1-6])>").expect("heading regex")
});

static ID: Lazy<Regex> = Lazy::new(|| Regex::new(r#"\bid\s*=\s*"([^"]*)""#).expect("id regex"));

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("tag regex"));

impl Toc {
    /// The headings of `html`, nested by level.
    ///
    /// ```
    /// use quire::document::Toc;
    ///
    /// let toc = Toc::parse("<h1 id=\"a\">A</h1><h2>B <em>b</em></h2><h1>C</h1>");
    /// assert_eq!(toc.len(), 2);
    /// assert_eq!(toc[0].id.as_deref(), Some("a"));
    /// assert_eq!(toc[0].children[0].title, "B b");
    /// assert_eq!(toc[1].title, "C");
    /// ```
    pub fn parse(html: &str) -> Vec<Toc> {
        let mut roots = vec![];
        for heading in Toc::headings(html) {
            Toc::insert(&mut roots, heading);
        }

        roots
    }

    /// The headings of `html` in document order, without nesting.
    pub fn headings(html: &str) -> impl Iterator<Item = Toc> + '_ {
        HEADING.captures_iter(html)
            .filter(|caps| caps[1] == caps[4])
            .map(|caps| Toc {
                level: caps[1].parse().unwrap_or(1),
                title: text_of(&caps[3]),
                id: caps.get(2).and_then(|attrs| Some(ID.captures(attrs.as_str())?[1].to_string())),
                children: vec![],
            })
    }

    fn insert(nodes: &mut Vec<Toc>, entry: Toc) {
        match nodes.last_mut() {
            Some(last) if last.level < entry.level => Toc::insert(&mut last.children, entry),
            _ => nodes.push(entry),
        }
    }
}

fn text_of(html: &str) -> String {
    TAG.replace_all(html, "")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}

#[derive(Debug)]
struct RenderedEntry {
    path: PathBuf,
    content: String,
    title: String,
    toc: Vec<Toc>,
}

/// Flattens the content directory `target` into entries, the first at
/// `first` and the rest at subpages of it.
pub fn include_all<'p, 'a: 'p>(
    ctx: &'p RenderContext<'a>,
    file: &'p FileResource,
    target: &Path,
    first: PathBuf,
) -> Result<Vec<PathAndModel<'p>>> {
    let Some(dir) = ctx.root.get_directory(target) else {
        return err! {
            kind = Configuration;
            "include-all target does not exist in this locale",
            "target" => target.display(),
            "resource" => file.path.display(),
        };
    };

    let cutoff = file.metadata.read(PaginateAtDepth)?.unwrap_or(DEFAULT_DEPTH);
    let mut entries = StructuredDocument::new(&*dir).flatten(cutoff);
    if entries.is_empty() {
        entries.push(DocumentEntry::default());
    }

    let paths: Vec<PathBuf> = entries.iter()
        .enumerate()
        .map(|(i, entry)| match i {
            0 => first.clone(),
            _ => ctx.naming.subpage_path(&first, &entry.stem, file),
        })
        .collect();

    tracing::debug!(resource = %file.relative_path.display(), entries = entries.len(), "flattening document");
    let shared = Rc::new((entries, paths, OnceCell::new()));
    Ok((0..shared.1.len()).map(|i| {
        let shared = shared.clone();
        let path = shared.1[i].clone();
        PathAndModel::new(path, file, move || {
            let (entries, paths, rendered) = &*shared;
            let rendered = rendered.get_or_try_init(|| render_entries(ctx, entries, paths))?;
            let mut model = Model::new();
            model.insert("document".into(), document_model(rendered, i));
            Ok(model)
        })
    }).collect())
}

fn render_entries(ctx: &RenderContext<'_>, entries: &[DocumentEntry<'_>], paths: &[PathBuf]) -> Result<Vec<RenderedEntry>> {
    entries.iter().zip(paths).map(|(entry, path)| {
        let mut parts = Vec::with_capacity(entry.files.len());
        for item in &entry.files {
            let model = ctx.base_model(item, path)?;
            parts.push(ctx.render_content(item, &model)?);
        }

        let own = entry.own.and(parts.first()).map_or("", |s| s.as_str());
        let title = Toc::headings(own).next()
            .map(|heading| heading.title)
            .unwrap_or_else(|| entry.stem.file_name().map_or(String::new(), |n| n.to_string_lossy().into_owned()));

        let content = parts.join("\n");
        let toc = Toc::parse(&content);
        Ok(RenderedEntry { path: path.clone(), content, title, toc })
    }).collect()
}

fn document_model(entries: &[RenderedEntry], i: usize) -> serde_json::Value {
    let current = &entries[i];
    let link = |j: usize| json!({
        "title": entries[j].title,
        "url": relative_url(&current.path, &entries[j].path),
        "position": j,
    });

    json!({
        "content": current.content,
        "title": current.title,
        "toc": current.toc,
        "position": i,
        "count": entries.len(),
        "previous": i.checked_sub(1).map(link),
        "next": (i + 1 < entries.len()).then(|| link(i + 1)),
        "summary": (0..entries.len()).map(link).collect::<Vec<_>>(),
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::resource::{DirView, ResourceTree, TreeOptions};

    fn tree(files: &[&str]) -> (tempfile::TempDir, ResourceTree) {
        let dir = tempfile::tempdir().unwrap();
        for path in files {
            let path = dir.path().join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "").unwrap();
        }

        let tree = ResourceTree::build(dir.path(), &TreeOptions::default()).unwrap();
        (dir, tree)
    }

    fn describe(entries: &[DocumentEntry<'_>]) -> Vec<(String, Vec<String>)> {
        entries.iter()
            .map(|e| (
                e.stem.to_string_lossy().into_owned(),
                e.files.iter().map(|f| f.relative_path.to_string_lossy().into_owned()).collect(),
            ))
            .collect()
    }

    #[test]
    fn pairs_files_with_directories() {
        let (_dir, tree) = tree(&["ch2.md", "ch10.md", "ch2/a.md", "ch2/b.md", "ch2/b/x.md", "appendix/z.md"]);
        let document = StructuredDocument::new(&DirView::root(&tree));
        let names = document.nodes.iter().map(|n| (n.name.as_str(), n.file.is_some())).collect::<Vec<_>>();
        assert_eq!(names, [("appendix", false), ("ch2", true), ("ch10", true)]);
        assert_eq!(document.nodes[1].children.len(), 2);
        assert_eq!(document.nodes[1].children[1].children[0].name, "x");
    }

    #[test]
    fn directories_pair_by_key() {
        let (_dir, tree) = tree(&["part.md", "part.d/a.md", "notes.d/n.md"]);
        let document = StructuredDocument::new(&DirView::root(&tree));
        let names = document.nodes.iter().map(|n| (n.name.as_str(), n.file.is_some())).collect::<Vec<_>>();
        assert_eq!(names, [("notes", false), ("part", true)]);
        assert_eq!(document.nodes[1].children[0].name, "a");
    }

    fn expect(stem: &str, files: &[&str]) -> (String, Vec<String>) {
        (stem.to_string(), files.iter().map(|f| f.to_string()).collect())
    }

    #[test]
    fn cutoffs() {
        let (_dir, tree) = tree(&["a.md", "a/x.md", "a/x/deep.md", "b.md", "c/y.md"]);
        let document = StructuredDocument::new(&DirView::root(&tree));

        let entries = document.flatten(0);
        assert_eq!(describe(&entries), [expect("", &["a.md", "a/x.md", "a/x/deep.md", "b.md", "c/y.md"])]);

        let entries = document.flatten(1);
        assert_eq!(describe(&entries), [
            expect("a", &["a.md", "a/x.md", "a/x/deep.md"]),
            expect("b", &["b.md"]),
            expect("c", &["c/y.md"]),
        ]);
        assert!(entries[2].own.is_none());

        let entries = document.flatten(2);
        assert_eq!(describe(&entries), [
            expect("a", &["a.md"]),
            expect("a/x", &["a/x.md", "a/x/deep.md"]),
            expect("b", &["b.md"]),
            expect("c/y", &["c/y.md"]),
        ]);
    }

    #[test]
    fn directive_files_are_left_out() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("book.html.peb"), "---\ninclude-all: .\n---\n").unwrap();
        fs::write(dir.path().join("one.md"), "").unwrap();
        let tree = ResourceTree::build(dir.path(), &TreeOptions::default()).unwrap();
        let document = StructuredDocument::new(&DirView::root(&tree));
        assert_eq!(document.nodes.len(), 1);
        assert_eq!(document.nodes[0].name, "one");
    }

    #[test]
    fn toc_nesting() {
        let toc = Toc::parse("<h2>A</h2><h3>A.1</h3><h4>A.1.a</h4><h3>A.2</h3><h1>B</h1><h3>B.x</h3><h2>B.1</h2><h5>bad</h6>");
        let shape = |t: &Toc| (t.title.clone(), t.children.iter().map(|c| c.title.clone()).collect::<Vec<_>>());
        assert_eq!(toc.iter().map(shape).collect::<Vec<_>>(), [
            ("A".to_string(), vec!["A.1".to_string(), "A.2".to_string()]),
            ("B".to_string(), vec!["B.x".to_string(), "B.1".to_string()]),
        ]);
        assert_eq!(toc[0].children[0].children[0].title, "A.1.a");
        assert_eq!(Toc::parse("<h1>Fish &amp; Chips</h1>")[0].title, "Fish & Chips");
    }

    #[test]
    fn entry_links() {
        let entry = |path: &str, title: &str| RenderedEntry {
            path: path.into(),
            content: String::new(),
            title: title.into(),
            toc: vec![],
        };

        let entries = [entry("book/index.html", "Intro"), entry("book/part/index.html", "Part"), entry("book/zz/index.html", "End")];
        let model = document_model(&entries, 1);
        assert_eq!(model["position"], 1);
        assert_eq!(model["count"], 3);
        assert_eq!(model["previous"]["url"], "../index.html");
        assert_eq!(model["previous"]["title"], "Intro");
        assert_eq!(model["next"]["url"], "../zz/index.html");
        assert_eq!(model["summary"][1]["url"], "index.html");

        let model = document_model(&entries, 0);
        assert!(model["previous"].is_null());
        assert_eq!(model["next"]["url"], "part/index.html");
    }
}
