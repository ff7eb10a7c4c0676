use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::render::{LayoutRenderer, Renderers};
use crate::resource::{FileResource, OverrideLayout, ResourceTree};

/// A layout chosen for a file.
#[derive(Debug, Clone, Copy)]
pub struct Layout<'a> {
    /// Path relative to the layout root.
    pub path: &'a Path,
    pub renderer: &'a dyn LayoutRenderer,
}

/// Finds the layout that wraps a rendered file.
///
/// A file's own `override-layout` wins. Otherwise the file's directory is
/// mirrored under the layout root and, for each layout engine in registration
/// order, `<dir>/<name>.<ext>.<engine>` is tried. Failing that, each directory
/// from the file's up to the layout root is tried for
/// `<dir>/index.<ext>.<engine>`.
#[derive(Debug, Clone, Copy)]
pub struct LayoutResolver<'a> {
    /// `None` if there is no layout directory.
    pub layouts: Option<&'a ResourceTree>,
    pub renderers: &'a Renderers,
}

impl<'a> LayoutResolver<'a> {
    pub fn new(layouts: Option<&'a ResourceTree>, renderers: &'a Renderers) -> Self {
        LayoutResolver { layouts, renderers }
    }

    /// The layout for `file` whose rendered output has extension `extension`,
    /// if any.
    pub fn resolve(&self, file: &FileResource, extension: &str) -> Result<Option<Layout<'a>>> {
        if let Some(layout) = file.metadata.read(OverrideLayout)? {
            return self.explicit(file, &layout).map(Some);
        }

        let Some(tree) = self.layouts else {
            return Ok(None);
        };

        if extension.is_empty() {
            return Ok(None);
        }

        let dir = file.relative_path.parent().unwrap_or(Path::new(""));
        let name = file.file_name_without_extensions();
        for engine in self.renderers.layout_extensions() {
            let candidate = dir.join(format!("{name}.{extension}.{engine}"));
            if let Some(layout) = self.found(tree, &candidate, engine) {
                return Ok(Some(layout));
            }
        }

        let mut dir = Some(dir);
        while let Some(current) = dir {
            for engine in self.renderers.layout_extensions() {
                let candidate = current.join(format!("index.{extension}.{engine}"));
                if let Some(layout) = self.found(tree, &candidate, engine) {
                    return Ok(Some(layout));
                }
            }

            dir = current.parent();
        }

        Ok(None)
    }

    fn found(&self, tree: &'a ResourceTree, candidate: &Path, engine: &str) -> Option<Layout<'a>> {
        let file = tree.get_file(candidate)?;
        let renderer = self.renderers.layout(engine)?;
        tracing::trace!(layout = %candidate.display(), "found layout");
        Some(Layout { path: &file.relative_path, renderer })
    }

    fn explicit(&self, file: &FileResource, layout: &str) -> Result<Layout<'a>> {
        let missing = |reason: &str| error! {
            kind = MissingLayout;
            "layout does not exist",
            "layout" => layout,
            "reason" => reason,
            "resource" => file.path.display(),
        };

        let tree = self.layouts.ok_or_else(|| missing("there is no layout directory"))?;
        let path = PathBuf::from(layout);
        let layout_file = tree.get_file(&path)
            .ok_or_else(|| missing("no such file in the layout directory"))?;

        let engine = layout_file.file_extensions().first().copied().unwrap_or_default();
        let renderer = self.renderers.layout(engine)
            .ok_or_else(|| missing("no layout engine is registered for its extension"))?;

        Ok(Layout { path: &layout_file.relative_path, renderer })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::error::ErrorKind;
    use crate::render::tests::renderers;
    use crate::resource::TreeOptions;

    fn write(root: &Path, path: &str, contents: &str) {
        let path = root.join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn build(root: &Path) -> ResourceTree {
        ResourceTree::build(root, &TreeOptions::default()).unwrap()
    }

    fn resolve(layouts: &Path, content: &ResourceTree, file: &str, renderers: &Renderers) -> Option<String> {
        let layouts = build(layouts);
        let resolver = LayoutResolver::new(Some(&layouts), renderers);
        let file = content.get(file).and_then(|e| e.as_file()).unwrap();
        let found = resolver.resolve(file, "html").unwrap();
        found.map(|layout| layout.path.to_string_lossy().into_owned())
    }

    #[test]
    fn precedence() {
        let dir = tempfile::tempdir().unwrap();
        let (content, layouts) = (dir.path().join("content"), dir.path().join("layout"));
        write(&content, "blog/post.md", "");
        write(&content, "blog/2024/deep.md", "");
        write(&content, "about.md", "");
        let renderers = renderers();

        write(&layouts, "index.html.peb", "");
        let content = build(&content);
        assert_eq!(resolve(&layouts, &content, "about.md", &renderers).as_deref(), Some("index.html.peb"));
        assert_eq!(resolve(&layouts, &content, "blog/2024/deep.md", &renderers).as_deref(), Some("index.html.peb"));

        write(&layouts, "blog/index.html.jinja", "");
        assert_eq!(resolve(&layouts, &content, "blog/2024/deep.md", &renderers).as_deref(), Some("blog/index.html.jinja"));

        write(&layouts, "blog/index.html.peb", "");
        assert_eq!(resolve(&layouts, &content, "blog/post.md", &renderers).as_deref(), Some("blog/index.html.peb"));

        write(&layouts, "blog/post.html.jinja", "");
        assert_eq!(resolve(&layouts, &content, "blog/post.md", &renderers).as_deref(), Some("blog/post.html.jinja"));

        fs::remove_file(layouts.join("blog/post.html.jinja")).unwrap();
        assert_eq!(resolve(&layouts, &content, "blog/post.md", &renderers).as_deref(), Some("blog/index.html.peb"));
    }

    #[test]
    fn unmatched_and_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let (content, layouts) = (dir.path().join("content"), dir.path().join("layout"));
        write(&content, "feed.xml.peb", "");
        write(&layouts, "index.html.peb", "");
        let renderers = renderers();
        let content = build(&content);

        let layout_tree = build(&layouts);
        let file = content.get("feed.xml.peb").and_then(|e| e.as_file()).unwrap();
        let resolver = LayoutResolver::new(Some(&layout_tree), &renderers);
        assert!(resolver.resolve(file, "xml").unwrap().is_none());

        let resolver = LayoutResolver::new(None, &renderers);
        assert!(resolver.resolve(file, "xml").unwrap().is_none());
    }

    #[test]
    fn explicit_layouts() {
        let dir = tempfile::tempdir().unwrap();
        let (content, layouts) = (dir.path().join("content"), dir.path().join("layout"));
        write(&content, "special.md", "---\noverride-layout: special/page.html.peb\n---\n");
        write(&content, "broken.md", "---\noverride-layout: nope.html.peb\n---\n");
        write(&layouts, "special/page.html.peb", "");
        write(&layouts, "index.html.peb", "");
        let renderers = renderers();
        let content = build(&content);

        assert_eq!(resolve(&layouts, &content, "special.md", &renderers).as_deref(), Some("special/page.html.peb"));

        let layout_tree = build(&layouts);
        let resolver = LayoutResolver::new(Some(&layout_tree), &renderers);
        let broken = content.get("broken.md").and_then(|e| e.as_file()).unwrap();
        let error = resolver.resolve(broken, "html").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::MissingLayout);
        assert!(error.to_string().contains("broken.md"));

        let resolver = LayoutResolver::new(None, &renderers);
        assert_eq!(resolver.resolve(broken, "html").unwrap_err().kind(), ErrorKind::MissingLayout);
    }
}
