use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::resource::{DirectoryEntry, EntryId, FileResource, OnlyForLocales, OverrideOutputToPath, ResourceTree};

pub type DynDirectory<'a> = Box<dyn Directory<'a> + 'a>;

/// A view of one directory in a [`ResourceTree`].
///
/// Implementors supply the tree, the directory's id, the files visible in the
/// view, and a way to view any other directory through the same lens. Every
/// other operation is derived, so child directories and parents of a decorated
/// directory are decorated identically.
pub trait Directory<'a>: fmt::Debug {
    fn tree(&self) -> &'a ResourceTree;

    fn id(&self) -> EntryId;

    /// Views the directory `id` the way `self` is viewed.
    fn wrap(&self, id: EntryId) -> DynDirectory<'a>;

    /// The visible files, in tree order.
    fn files(&self) -> Vec<&'a FileResource>;

    fn entry(&self) -> &'a DirectoryEntry {
        self.tree().directory(self.id())
    }

    fn path(&self) -> &'a Path {
        &self.entry().path
    }

    /// The path relative to the root of the tree.
    fn relative_path(&self) -> &'a Path {
        &self.entry().relative_path
    }

    fn name(&self) -> &'a str {
        &self.entry().name
    }

    /// The key this directory is found by: its name without its extension.
    fn key(&self) -> &'a str {
        directory_key(self.name())
    }

    fn parent(&self) -> Option<DynDirectory<'a>> {
        self.entry().parent.map(|id| self.wrap(id))
    }

    fn directories(&self) -> Vec<DynDirectory<'a>> {
        self.entry().directories.iter().map(|&id| self.wrap(id)).collect()
    }

    /// The visible file named exactly `name`.
    fn file(&self, name: &str) -> Option<&'a FileResource> {
        self.files().into_iter().find(|file| file.file_name == name)
    }

    /// The child directory keyed by `name`: the directory's name without its
    /// extension.
    fn directory(&self, name: &str) -> Option<DynDirectory<'a>> {
        let tree = self.tree();
        self.entry().directories.iter()
            .find(|&&id| directory_key(&tree.directory(id).name) == name)
            .map(|&id| self.wrap(id))
    }

    /// Walks `relative` one segment at a time through [`Directory::directory()`].
    fn get_directory(&self, relative: &Path) -> Option<DynDirectory<'a>> {
        let mut current = self.wrap(self.id());
        for segment in relative.components() {
            let segment = segment.as_os_str().to_str()?;
            current = current.directory(segment)?;
        }

        Some(current)
    }

    /// This directory followed by every descendant directory, pre-order.
    fn walk_directories(&self) -> Vec<DynDirectory<'a>> {
        let mut directories = vec![self.wrap(self.id())];
        for child in self.directories() {
            directories.extend(child.walk_directories());
        }

        directories
    }

    /// Every visible file in this directory and below, pre-order.
    fn walk_files(&self) -> Vec<&'a FileResource> {
        self.walk_directories().iter().flat_map(|dir| dir.files()).collect()
    }
}

fn directory_key(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

/// The undecorated view of a directory.
#[derive(Clone, Copy)]
pub struct DirView<'a> {
    tree: &'a ResourceTree,
    id: EntryId,
}

impl<'a> DirView<'a> {
    pub fn new(tree: &'a ResourceTree, id: EntryId) -> Self {
        DirView { tree, id }
    }

    pub fn root(tree: &'a ResourceTree) -> Self {
        DirView::new(tree, tree.root_id())
    }

    pub fn boxed(self) -> DynDirectory<'a> {
        Box::new(self)
    }
}

impl<'a> Directory<'a> for DirView<'a> {
    fn tree(&self) -> &'a ResourceTree {
        self.tree
    }

    fn id(&self) -> EntryId {
        self.id
    }

    fn wrap(&self, id: EntryId) -> DynDirectory<'a> {
        DirView::new(self.tree, id).boxed()
    }

    fn files(&self) -> Vec<&'a FileResource> {
        let tree = self.tree;
        self.entry().files.iter().filter_map(|&id| tree.file(id)).collect()
    }
}

impl fmt::Debug for DirView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DirView").field(&self.path()).finish()
    }
}

/// Decides whether a file belongs to a locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleFilter {
    pub locale: String,
    pub locales: Vec<String>,
}

impl LocaleFilter {
    pub fn new(locale: impl Into<String>, locales: &[String]) -> Self {
        LocaleFilter { locale: locale.into(), locales: locales.to_vec() }
    }

    /// An explicit `only-for-locales` decides. Otherwise the file is included
    /// if its locale tag is `self.locale` or it has none.
    pub fn includes(&self, file: &FileResource) -> bool {
        match file.metadata.get(OnlyForLocales) {
            Some(Ok(only)) => only.iter().any(|l| *l == self.locale),
            Some(Err(_)) => false,
            None => match file.locale_tag(&self.locales) {
                Some(tag) => tag == self.locale,
                None => true,
            }
        }
    }
}

/// Shows only the files of the wrapped directory that belong to a locale.
#[derive(Debug)]
pub struct LocaleAware<'a> {
    inner: DynDirectory<'a>,
    filter: Arc<LocaleFilter>,
}

impl<'a> LocaleAware<'a> {
    pub fn new(inner: DynDirectory<'a>, filter: LocaleFilter) -> Self {
        LocaleAware { inner, filter: Arc::new(filter) }
    }
}

impl<'a> Directory<'a> for LocaleAware<'a> {
    fn tree(&self) -> &'a ResourceTree {
        self.inner.tree()
    }

    fn id(&self) -> EntryId {
        self.inner.id()
    }

    fn wrap(&self, id: EntryId) -> DynDirectory<'a> {
        Box::new(LocaleAware { inner: self.inner.wrap(id), filter: self.filter.clone() })
    }

    fn files(&self) -> Vec<&'a FileResource> {
        let mut files = self.inner.files();
        files.retain(|file| self.filter.includes(file));
        files
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideMode {
    /// Exclude files that declare `override-output-to-path`.
    Hide,
    /// Include only files that declare `override-output-to-path`.
    ShowOnlyOverride,
}

impl OverrideMode {
    pub fn includes(self, file: &FileResource) -> bool {
        let overridden = file.metadata.contains(OverrideOutputToPath);
        match self {
            OverrideMode::Hide => !overridden,
            OverrideMode::ShowOnlyOverride => overridden,
        }
    }
}

/// Partitions files by whether they declare an explicit output path.
#[derive(Debug)]
pub struct OverrideAware<'a> {
    inner: DynDirectory<'a>,
    mode: OverrideMode,
}

impl<'a> OverrideAware<'a> {
    pub fn new(inner: DynDirectory<'a>, mode: OverrideMode) -> Self {
        OverrideAware { inner, mode }
    }
}

impl<'a> Directory<'a> for OverrideAware<'a> {
    fn tree(&self) -> &'a ResourceTree {
        self.inner.tree()
    }

    fn id(&self) -> EntryId {
        self.inner.id()
    }

    fn wrap(&self, id: EntryId) -> DynDirectory<'a> {
        Box::new(OverrideAware { inner: self.inner.wrap(id), mode: self.mode })
    }

    fn files(&self) -> Vec<&'a FileResource> {
        let mut files = self.inner.files();
        files.retain(|file| self.mode.includes(file));
        files
    }
}
