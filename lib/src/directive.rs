use std::path::{Path, PathBuf};

use crate::config::SitePaths;
use crate::document;
use crate::error::Result;
use crate::paginate::{self, PathAndModel};
use crate::render::RenderContext;
use crate::resource::{FileResource, IncludeAll, MetaKey, PaginateOverDirectory, PaginateOverTaxonomy};
use crate::util::PathExt;

/// What a file asks to be expanded into, beyond its own single output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `paginate-over-directory`: pages over a content or static directory.
    Directory(String),
    /// `paginate-over-taxonomy`: one paginated sequence per tag of a group.
    Taxonomy(String),
    /// `include-all`: a directory flattened into linked documents.
    IncludeAll(String),
}

/// A directive target resolved against the site's directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Relative to the content root.
    Content(PathBuf),
    /// Relative to the static root.
    Static(PathBuf),
}

const TRIGGERS: &[&str] = &[PaginateOverDirectory::KEY, PaginateOverTaxonomy::KEY, IncludeAll::KEY];

/// `true` if `file` declares any directive.
pub fn has_trigger(file: &FileResource) -> bool {
    TRIGGERS.iter().any(|key| file.metadata.contains_key(key))
}

impl Directive {
    /// The directive declared by `file`, if any. Declaring more than one is an
    /// error.
    pub fn of(file: &FileResource) -> Result<Option<Directive>> {
        let declared: Vec<&str> = TRIGGERS.iter()
            .copied()
            .filter(|key| file.metadata.contains_key(key))
            .collect();

        if declared.len() > 1 {
            return err! {
                kind = Configuration;
                "a file may declare at most one of paginate-over-directory, \
                    paginate-over-taxonomy and include-all",
                "declared" => declared.join(", "),
                "resource" => file.path.display(),
            };
        }

        if let Some(target) = file.metadata.read(PaginateOverDirectory)? {
            return Ok(Some(Directive::Directory(target)));
        }

        if let Some(group) = file.metadata.read(PaginateOverTaxonomy)? {
            return Ok(Some(Directive::Taxonomy(group)));
        }

        if let Some(target) = file.metadata.read(IncludeAll)? {
            return Ok(Some(Directive::IncludeAll(target)));
        }

        Ok(None)
    }

    pub fn key(&self) -> &'static str {
        match self {
            Directive::Directory(_) => PaginateOverDirectory::KEY,
            Directive::Taxonomy(_) => PaginateOverTaxonomy::KEY,
            Directive::IncludeAll(_) => IncludeAll::KEY,
        }
    }

    /// The outputs of `file`, whose own output path is `first`.
    pub fn expand<'p, 'a: 'p>(
        &self,
        ctx: &'p RenderContext<'a>,
        file: &'p FileResource,
        first: PathBuf,
    ) -> Result<Vec<PathAndModel<'p>>> {
        match self {
            Directive::Directory(target) => match Target::resolve(ctx.paths, file, self.key(), target)? {
                Target::Content(dir) => paginate::over_directory(ctx, file, &dir, first),
                Target::Static(dir) => paginate::over_static(ctx, file, &dir, first),
            },
            Directive::Taxonomy(group) => paginate::over_taxonomy(ctx, file, group, first),
            Directive::IncludeAll(target) => match Target::resolve(ctx.paths, file, self.key(), target)? {
                Target::Content(dir) => document::include_all(ctx, file, &dir, first),
                Target::Static(_) => err! {
                    kind = Configuration;
                    "include-all target must be a content directory",
                    "target" => target,
                    "resource" => file.path.display(),
                },
            },
        }
    }
}

/// Every output of `file` for the pass of `ctx`.
pub fn expand<'p, 'a: 'p>(ctx: &'p RenderContext<'a>, file: &'p FileResource) -> Result<Vec<PathAndModel<'p>>> {
    let path = ctx.naming.output_path(file, &ctx.locale)?;
    match Directive::of(file)? {
        Some(directive) => directive.expand(ctx, file, path),
        None => Ok(vec![PathAndModel::plain(path, file)]),
    }
}

impl Target {
    /// Resolves `target`, relative to the content root, lexically. It must
    /// stay inside the base directory and land in the content or static root.
    pub fn resolve(paths: &SitePaths, file: &FileResource, key: &str, target: &str) -> Result<Target> {
        let invalid = |reason: &str| error! {
            kind = Configuration;
            "invalid directive target",
            "reason" => reason,
            "key" => key,
            "target" => target,
            "resource" => file.path.display(),
        };

        let resolved = paths.content.join(target).normalize()
            .filter(|path| path.is_within(&paths.base))
            .ok_or_else(|| invalid("target is outside of the base directory"))?;

        let relative = |root: &Path| {
            let root = root.normalize()?;
            resolved.strip_prefix(root).ok().map(Path::to_path_buf)
        };

        if let Some(dir) = relative(&paths.content) {
            return Ok(Target::Content(dir));
        }

        if let Some(dir) = relative(&paths.static_dir) {
            return Ok(Target::Static(dir));
        }

        Err(invalid("target is neither in the content nor in the static directory"))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::error::ErrorKind;
    use crate::resource::{ResourceTree, TreeOptions};

    fn tree(files: &[(&str, &str)]) -> (tempfile::TempDir, ResourceTree) {
        let dir = tempfile::tempdir().unwrap();
        for (path, contents) in files {
            fs::write(dir.path().join(path), contents).unwrap();
        }

        let tree = ResourceTree::build(dir.path(), &TreeOptions::default()).unwrap();
        (dir, tree)
    }

    fn file<'t>(tree: &'t ResourceTree, name: &str) -> &'t FileResource {
        tree.get(name).and_then(|e| e.as_file()).unwrap()
    }

    #[test]
    fn detection() {
        let (_dir, tree) = tree(&[
            ("plain.md", "---\ntitle: x\n---\n"),
            ("list.peb", "---\npaginate-over-directory: post\n---\n"),
            ("tags.peb", "---\npaginate-over-taxonomy: tags\n---\n"),
            ("book.peb", "---\ninclude-all: book\npaginate-at-depth: 2\n---\n"),
            ("both.peb", "---\npaginate-over-directory: post\ninclude-all: book\n---\n"),
        ]);

        assert_eq!(Directive::of(file(&tree, "plain.md")).unwrap(), None);
        assert_eq!(Directive::of(file(&tree, "list.peb")).unwrap(), Some(Directive::Directory("post".into())));
        assert_eq!(Directive::of(file(&tree, "tags.peb")).unwrap(), Some(Directive::Taxonomy("tags".into())));
        assert_eq!(Directive::of(file(&tree, "book.peb")).unwrap(), Some(Directive::IncludeAll("book".into())));
        assert!(has_trigger(file(&tree, "both.peb")));
        assert!(!has_trigger(file(&tree, "plain.md")));

        let error = Directive::of(file(&tree, "both.peb")).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Configuration);
        assert!(error.to_string().contains("both.peb"));
    }

    #[test]
    fn wrongly_typed_trigger_fails_tree_construction() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("typed.peb"), "---\npaginate-over-taxonomy: [tags]\n---\n").unwrap();
        let error = ResourceTree::build(dir.path(), &TreeOptions::default()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn target_resolution() {
        let (_dir, tree) = tree(&[("index.peb", "")]);
        let paths = SitePaths::new("/site", None);
        let file = file(&tree, "index.peb");
        let resolve = |target| Target::resolve(&paths, file, "paginate-over-directory", target);

        assert_eq!(resolve("post").unwrap(), Target::Content("post".into()));
        assert_eq!(resolve("./post/../news").unwrap(), Target::Content("news".into()));
        assert_eq!(resolve("").unwrap(), Target::Content("".into()));
        assert_eq!(resolve("../static/images").unwrap(), Target::Static("images".into()));

        for outside in ["../../etc", "../layout", "/etc"] {
            let error = resolve(outside).unwrap_err();
            assert_eq!(error.kind(), ErrorKind::Configuration, "{outside}");
            assert!(error.to_string().contains("index.peb"));
        }
    }
}
