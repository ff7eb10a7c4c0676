//! Building a whole site: one pass per locale, then one pass over the files
//! that name their own output path.

use std::fs;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;

use crate::config::{Configuration, SitePaths};
use crate::directive::{self, has_trigger};
use crate::error::{Chainable, Result};
use crate::layout::LayoutResolver;
use crate::naming::Naming;
use crate::render::{RenderContext, Renderers};
use crate::resource::*;
use crate::taxonomy::Taxonomy;
use crate::util::PathExt;
use crate::value::Dict;

/// What a build wrote.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildReport {
    /// Files copied from the static directory.
    pub static_files: usize,
    pub passes: Vec<PassReport>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub locale: String,
    /// `true` for the pass over files with `override-output-to-path`.
    pub overrides: bool,
    pub written: usize,
}

impl BuildReport {
    /// Every file written, static files included.
    pub fn total(&self) -> usize {
        self.static_files + self.passes.iter().map(|p| p.written).sum::<usize>()
    }
}

/// A site rooted at a base directory, ready to be built.
#[derive(Debug)]
pub struct Site {
    paths: SitePaths,
    config: Configuration,
    renderers: Renderers,
}

impl Site {
    /// Reads the configuration of the site at `base`, applying `overrides`.
    /// Output goes to `output` or `<base>/output`. Both are made absolute
    /// first, relative to the current directory.
    pub fn new<P: AsRef<Path>>(base: P, output: Option<PathBuf>, overrides: Dict) -> Result<Self> {
        let absolute = |path: &Path| path.absolutize().chain_with(|| error! {
            kind = Io;
            "failed to resolve path",
            "path" => path.display(),
        });

        let base = absolute(base.as_ref())?;
        let output = output.as_deref().map(absolute).transpose()?;
        let paths = SitePaths::new(base, output);
        if !paths.content.is_dir() {
            return err! {
                kind = MissingDirectory;
                "content directory does not exist",
                "path" => paths.content.display(),
            };
        }

        let config = Configuration::load(&paths.base, overrides)?;
        let renderers = Renderers::with_defaults(&paths);
        Ok(Site { paths, config, renderers })
    }

    pub fn paths(&self) -> &SitePaths {
        &self.paths
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// The renderers files and layouts are rendered with. Registering a
    /// renderer for an extension replaces the default one.
    pub fn renderers_mut(&mut self) -> &mut Renderers {
        &mut self.renderers
    }

    /// Cleans the output directory and renders the whole site into it.
    pub fn build(&self) -> Result<BuildReport> {
        let (paths, config) = (&self.paths, &self.config);
        self.clean_output()?;

        let options = config.default_tree_options()?;
        let static_tree = match paths.static_dir.is_dir() {
            true => Some(ResourceTree::build(&paths.static_dir, &options)?),
            false => None,
        };

        let mut report = BuildReport::default();
        if let Some(tree) = &static_tree {
            report.static_files = copy_static(tree, &paths.output)?;
            tracing::info!(files = report.static_files, "copied static files");
        }

        let content = ResourceTree::build(&paths.content, &options)?;
        let layouts = match paths.layout.is_dir() {
            true => Some(ResourceTree::build(&paths.layout, &options)?),
            false => None,
        };

        let mut writer = Writer::new(&paths.output);
        for locale in config.locales.iter() {
            let ctx = self.context(&content, layouts.as_ref(), static_tree.as_ref(), locale)?;
            let written = writer.pass(&ctx, ctx.root.walk_files())?;
            tracing::info!(%locale, written, "rendered locale");
            report.passes.push(PassReport { locale: locale.clone(), overrides: false, written });
        }

        let overridden = OverrideAware::new(DirView::root(&content).boxed(), OverrideMode::ShowOnlyOverride)
            .walk_files();

        let mut by_locale: Vec<(String, Vec<&FileResource>)> = vec![];
        for file in overridden {
            let locale = file.metadata.read(OverrideLocale)?
                .unwrap_or_else(|| config.fallback_locale().to_string());

            match by_locale.iter_mut().find(|(l, _)| *l == locale) {
                Some((_, files)) => files.push(file),
                None => by_locale.push((locale, vec![file])),
            }
        }

        for (locale, files) in by_locale {
            let ctx = self.context(&content, layouts.as_ref(), static_tree.as_ref(), &locale)?;
            let written = writer.pass(&ctx, files)?;
            tracing::info!(%locale, written, "rendered files with explicit output paths");
            report.passes.push(PassReport { locale, overrides: true, written });
        }

        Ok(report)
    }

    fn clean_output(&self) -> Result<()> {
        let output = &self.paths.output;
        let protected = [&self.paths.base, &self.paths.content, &self.paths.layout, &self.paths.static_dir];
        if protected.iter().any(|dir| dir.may_be_within(output)) {
            return err! {
                kind = Configuration;
                "output directory must not contain the site's sources",
                "output" => output.display(),
            };
        }

        if output.exists() {
            fs::remove_dir_all(output).chain_with(|| error! {
                kind = Io;
                "failed to clean output directory",
                "path" => output.display(),
            })?;
        }

        fs::create_dir_all(output).chain_with(|| error! {
            kind = Io;
            "failed to create output directory",
            "path" => output.display(),
        })
    }

    /// The context files are rendered in for `locale`: the content tree seen
    /// through the locale, without files that name their own output path.
    fn context<'a>(
        &'a self,
        content: &'a ResourceTree,
        layouts: Option<&'a ResourceTree>,
        static_tree: Option<&'a ResourceTree>,
        locale: &str,
    ) -> Result<RenderContext<'a>> {
        let filter = LocaleFilter::new(locale, &self.config.locales);
        let localized = LocaleAware::new(DirView::root(content).boxed(), filter);
        let root: DynDirectory<'a> = Box::new(OverrideAware::new(Box::new(localized), OverrideMode::Hide));
        let taxonomy = Taxonomy::new(&self.config.taxonomies[..], &*root, newest_first);
        let messages = serde_json::to_value(self.paths.messages(locale)?)?;

        Ok(RenderContext {
            config: &self.config,
            paths: &self.paths,
            renderers: &self.renderers,
            naming: Naming::new(&self.renderers, &self.config),
            layouts: LayoutResolver::new(layouts, &self.renderers),
            root,
            static_tree,
            taxonomy,
            locale: locale.to_string(),
            messages,
        })
    }
}

/// Builds the site at `base`. See [`Site::build()`].
pub fn build<P: AsRef<Path>>(base: P, output: Option<PathBuf>, overrides: Dict) -> Result<BuildReport> {
    Site::new(base, output, overrides)?.build()
}

fn copy_static(tree: &ResourceTree, output: &Path) -> Result<usize> {
    let mut copied = 0;
    for file in tree.files() {
        copy_file(&file.path, &output.join(&file.relative_path))?;
        copied += 1;
    }

    Ok(copied)
}

fn copy_file(from: &Path, to: &Path) -> Result<()> {
    let io_error = || error! {
        kind = Io;
        "failed to copy file",
        "from" => from.display(),
        "to" => to.display(),
    };

    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).chain_with(io_error)?;
    }

    fs::copy(from, to).chain_with(io_error)?;
    Ok(())
}

/// Writes rendered files below the output root, noting each path written.
struct Writer<'o> {
    output: &'o Path,
    written: FxHashSet<PathBuf>,
}

impl<'o> Writer<'o> {
    fn new(output: &'o Path) -> Self {
        Writer { output, written: FxHashSet::default() }
    }

    fn pass(&mut self, ctx: &RenderContext<'_>, files: Vec<&FileResource>) -> Result<usize> {
        let mut written = 0;
        for file in files {
            written += self.file(ctx, file).chain_with(|| error! {
                "failed to build file",
                "resource" => file.path.display(),
                "locale" => &ctx.locale,
            })?;
        }

        Ok(written)
    }

    /// Renders every output of `file`. A file no renderer handles and without
    /// a directive is copied as is.
    fn file(&mut self, ctx: &RenderContext<'_>, file: &FileResource) -> Result<usize> {
        let outputs = directive::expand(ctx, file)?;
        let verbatim = ctx.renderers.resource_for(file).is_none() && !has_trigger(file);

        let mut written = 0;
        for output in outputs {
            let path = output.path.clone();
            let target = self.claim(&path, file);
            if verbatim {
                copy_file(&file.path, &target)?;
            } else {
                let extra = output.model()?;
                let mut model = ctx.base_model(file, &path)?;
                model.extend(extra);

                let content = ctx.render_content(file, &model)?;
                let rendered = ctx.apply_layout(file, content, model)?;
                write_file(&target, &rendered)?;
            }

            tracing::debug!(resource = %file.relative_path.display(), output = %path.display(), "wrote");
            written += 1;
        }

        Ok(written)
    }

    fn claim(&mut self, path: &Path, file: &FileResource) -> PathBuf {
        if !self.written.insert(path.to_path_buf()) {
            tracing::warn!(
                output = %path.display(),
                resource = %file.relative_path.display(),
                "output path written more than once"
            );
        }

        self.output.join(path)
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    let io_error = || error! {
        kind = Io;
        "failed to write output file",
        "path" => path.display(),
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).chain_with(io_error)?;
    }

    fs::write(path, contents).chain_with(io_error)
}
