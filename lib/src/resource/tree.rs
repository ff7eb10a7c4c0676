use std::sync::Arc;
use std::path::{Path, PathBuf};
use std::{fs, fmt};

use rustc_hash::FxHashMap;

use crate::error::{Chainable, Result};
use crate::resource::{Comparator, FileResource, newest_first};

#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct EntryId(pub(crate) usize);

/// An immutable arena of the files and directories below a root directory.
pub struct ResourceTree {
    entries: Vec<Entry>,
    map: FxHashMap<Arc<Path>, EntryId>,
}

#[derive(Debug)]
pub enum Entry {
    File(FileResource),
    Directory(DirectoryEntry),
}

#[derive(Debug)]
pub struct DirectoryEntry {
    pub id: EntryId,
    /// `None` only for the root.
    pub parent: Option<EntryId>,
    pub path: Arc<Path>,
    pub relative_path: Arc<Path>,
    pub name: String,
    pub depth: usize,
    pub files: Vec<EntryId>,
    pub directories: Vec<EntryId>,
}

#[derive(Debug, Clone)]
pub struct TreeOptions {
    /// File and directory names matching any of these are skipped entirely.
    pub ignore: Vec<glob::Pattern>,
    pub comparator: Comparator,
}

#[derive(Default, Debug)]
struct FsMetadata(Option<fs::Metadata>);

impl TreeOptions {
    pub const DEFAULT_IGNORE: &'static [&'static str] = &[".*", "*~", "#*#", "*.swp", "*.bak"];

    pub fn new<S: AsRef<str>>(ignore: &[S], comparator: Comparator) -> Result<Self> {
        let ignore = ignore.iter()
            .map(|pattern| glob::Pattern::new(pattern.as_ref()).chain_with(|| error! {
                kind = Configuration;
                "invalid ignore pattern",
                "pattern" => pattern.as_ref(),
            }))
            .collect::<Result<Vec<_>>>()?;

        Ok(TreeOptions { ignore, comparator })
    }

    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignore.iter().any(|pattern| pattern.matches(name))
    }
}

impl Default for TreeOptions {
    fn default() -> Self {
        let ignore = Self::DEFAULT_IGNORE.iter()
            .filter_map(|pattern| glob::Pattern::new(pattern).ok())
            .collect();

        TreeOptions { ignore, comparator: newest_first }
    }
}

impl ResourceTree {
    pub fn build<P: AsRef<Path>>(root: P, options: &TreeOptions) -> Result<Self> {
        use jwalk::WalkDirGeneric;

        let root = root.as_ref();
        if !root.is_dir() {
            return err! {
                kind = MissingDirectory;
                "directory does not exist",
                "path" => root.display(),
            };
        }

        let root = fs::canonicalize(root).chain_with(|| error! {
            "failed to resolve directory",
            "path" => root.display(),
        })?;

        let filter = options.clone();
        let walker = WalkDirGeneric::<FsMetadata>::new(&root)
            .follow_links(true)
            .skip_hidden(false)
            .sort(true)
            .process_read_dir(move |_, _, _, entries| {
                entries.retain(|e| match e {
                    Ok(e) => !filter.is_ignored(&e.file_name.to_string_lossy()),
                    Err(_) => true,
                });

                entries.iter_mut()
                    .filter_map(|e| e.as_mut().ok())
                    .for_each(|e| e.client_state = FsMetadata(e.metadata().ok()))
            });

        let mut tree = ResourceTree { entries: vec![], map: FxHashMap::default() };
        for entry in walker {
            let entry = entry.chain_with(|| error! {
                "failed to walk directory",
                "root" => root.display(),
            })?;

            tree.insert(entry)?;
        }

        tree.sort(options.comparator);
        tracing::debug!(root = %root.display(), entries = tree.entries.len(), "built resource tree");
        Ok(tree)
    }

    fn insert(&mut self, mut entry: jwalk::DirEntry<FsMetadata>) -> Result<EntryId> {
        let id = EntryId(self.entries.len());
        let path: Arc<Path> = Arc::from(entry.path().into_boxed_path());
        let parent = self.map.get(&*entry.parent_path).copied().filter(|_| entry.depth > 0);
        let name = entry.file_name.to_string_lossy().into_owned();
        let relative_path: Arc<Path> = match parent {
            Some(parent) => Arc::from(self.directory(parent).relative_path.join(&name)),
            None => Arc::from(PathBuf::new()),
        };

        let new_entry = if entry.file_type.is_dir() || parent.is_none() {
            Entry::Directory(DirectoryEntry {
                id,
                parent,
                path: path.clone(),
                relative_path,
                name,
                depth: entry.depth,
                files: vec![],
                directories: vec![],
            })
        } else {
            let metadata = match entry.client_state.0.take() {
                Some(metadata) => metadata,
                None => entry.metadata().chain_with(|| error! {
                    "failed to read file metadata",
                    "path" => path.display(),
                })?,
            };

            let parent = parent.unwrap_or(EntryId(0));
            Entry::File(FileResource::new(id, parent, path.clone(), relative_path, &metadata)?)
        };

        if let Some(parent) = parent {
            let is_dir = matches!(new_entry, Entry::Directory(_));
            if let Entry::Directory(dir) = &mut self.entries[parent.0] {
                match is_dir {
                    true => dir.directories.push(id),
                    false => dir.files.push(id),
                }
            }
        }

        self.map.insert(path, id);
        self.entries.push(new_entry);
        Ok(id)
    }

    fn sort(&mut self, comparator: Comparator) {
        for i in 0..self.entries.len() {
            let (mut files, mut directories) = match &mut self.entries[i] {
                Entry::Directory(dir) => (std::mem::take(&mut dir.files), std::mem::take(&mut dir.directories)),
                Entry::File(_) => continue,
            };

            files.sort_by(|&a, &b| match (self.file(a), self.file(b)) {
                (Some(a), Some(b)) => comparator(a, b),
                _ => a.0.cmp(&b.0),
            });

            directories.sort_by(|&a, &b| self.directory(a).name.cmp(&self.directory(b).name));
            if let Entry::Directory(dir) = &mut self.entries[i] {
                dir.files = files;
                dir.directories = directories;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn root_id(&self) -> EntryId {
        EntryId(0)
    }

    pub fn root(&self) -> &DirectoryEntry {
        self.directory(self.root_id())
    }

    /// The canonical path of the root directory.
    pub fn root_path(&self) -> &Path {
        &self.root().path
    }

    /// The directory with id `id`.
    ///
    /// # Panics
    ///
    /// If `id` refers to a file. Ids stored in [`DirectoryEntry::directories`]
    /// and [`FileResource::parent`] always refer to directories.
    pub fn directory(&self, id: EntryId) -> &DirectoryEntry {
        match &self[id] {
            Entry::Directory(dir) => dir,
            Entry::File(file) => panic!("entry {id:?} ({}) is not a directory", file.path.display()),
        }
    }

    pub fn file(&self, id: EntryId) -> Option<&FileResource> {
        self[id].as_file()
    }

    /// Looks up an entry by its path relative to the root.
    pub fn get<P: AsRef<Path>>(&self, relative: P) -> Option<&Entry> {
        let full_path = self.root_path().join(relative.as_ref());
        self.map.get(&*full_path).map(|&id| &self[id])
    }

    pub fn get_directory<P: AsRef<Path>>(&self, relative: P) -> Option<&DirectoryEntry> {
        self.get(relative).and_then(Entry::as_directory)
    }

    /// The file (not a directory) at `relative`.
    pub fn get_file<P: AsRef<Path>>(&self, relative: P) -> Option<&FileResource> {
        self.get(relative).and_then(Entry::as_file)
    }

    /// Every file in the tree in walk order.
    pub fn files(&self) -> impl Iterator<Item = &FileResource> {
        self.entries.iter().filter_map(Entry::as_file)
    }
}

impl Entry {
    pub fn path(&self) -> &Path {
        match self {
            Entry::File(file) => &file.path,
            Entry::Directory(dir) => &dir.path,
        }
    }

    pub fn as_file(&self) -> Option<&FileResource> {
        match self {
            Entry::File(file) => Some(file),
            Entry::Directory(_) => None,
        }
    }

    pub fn as_directory(&self) -> Option<&DirectoryEntry> {
        match self {
            Entry::Directory(dir) => Some(dir),
            Entry::File(_) => None,
        }
    }
}

impl jwalk::ClientState for FsMetadata {
    type ReadDirState = ();
    type DirEntryState = Self;
}

impl std::ops::Index<EntryId> for ResourceTree {
    type Output = Entry;

    fn index(&self, index: EntryId) -> &Self::Output {
        &self.entries[index.0]
    }
}

impl fmt::Debug for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Debug for ResourceTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceTree")
            .field("root", &self.entries.first().map(Entry::path))
            .field("len", &self.entries.len())
            .finish()
    }
}
