use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;

use serde_json::json;

use crate::config::{Configuration, SitePaths};
use crate::error::{Chainable, Result};
use crate::layout::LayoutResolver;
use crate::naming::Naming;
use crate::resource::{DynDirectory, FileResource, ResourceTree};
use crate::taxonomy::Taxonomy;
use crate::util::PathExt;

/// The data handed to a renderer: a JSON object.
pub type Model = serde_json::Map<String, serde_json::Value>;

/// Turns the content of a file into rendered text.
pub trait ResourceRenderer: Send + Sync + Debug {
    /// The extension every output of this renderer has, if fixed. Renderers
    /// without one keep the next extension of the file: `page.html.peb`
    /// renders to `page.html`.
    fn output_extension(&self) -> Option<&str>;

    fn render(&self, file: &FileResource, locale: &str, model: &Model) -> Result<String>;
}

/// Wraps rendered content, available in the model as `content`, in a layout.
pub trait LayoutRenderer: Send + Sync + Debug {
    fn render(&self, layout: &Path, file: &FileResource, locale: &str, model: &Model) -> Result<String>;
}

/// The renderers available to a build, keyed by file extension, in
/// registration order.
#[derive(Debug, Default, Clone)]
pub struct Renderers {
    resources: Vec<(String, Arc<dyn ResourceRenderer>)>,
    layouts: Vec<(String, Arc<dyn LayoutRenderer>)>,
}

impl Renderers {
    pub fn new() -> Self {
        Renderers::default()
    }

    /// Markdown for `md`; the template engine for `peb`, both as a content
    /// renderer and as a layout renderer.
    pub fn with_defaults(paths: &SitePaths) -> Self {
        use crate::markdown::MarkdownRenderer;
        use crate::templating::TemplateEngine;

        let engine = Arc::new(TemplateEngine::new(&paths.layout));
        let mut renderers = Renderers::new();
        renderers.register_resource("md", Arc::new(MarkdownRenderer::default()));
        renderers.register_resource("peb", engine.clone());
        renderers.register_layout("peb", engine);
        renderers
    }

    /// Registers `renderer` for `extension`, replacing any earlier one.
    pub fn register_resource(&mut self, extension: &str, renderer: Arc<dyn ResourceRenderer>) {
        match self.resources.iter_mut().find(|(ext, _)| ext == extension) {
            Some((_, existing)) => *existing = renderer,
            None => self.resources.push((extension.to_string(), renderer)),
        }
    }

    /// Registers `renderer` for `extension`, replacing any earlier one.
    pub fn register_layout(&mut self, extension: &str, renderer: Arc<dyn LayoutRenderer>) {
        match self.layouts.iter_mut().find(|(ext, _)| ext == extension) {
            Some((_, existing)) => *existing = renderer,
            None => self.layouts.push((extension.to_string(), renderer)),
        }
    }

    pub fn resource(&self, extension: &str) -> Option<&dyn ResourceRenderer> {
        self.resources.iter()
            .find(|(ext, _)| ext == extension)
            .map(|(_, renderer)| &**renderer)
    }

    pub fn layout(&self, extension: &str) -> Option<&dyn LayoutRenderer> {
        self.layouts.iter()
            .find(|(ext, _)| ext == extension)
            .map(|(_, renderer)| &**renderer)
    }

    /// Layout extensions in registration order.
    pub fn layout_extensions(&self) -> impl Iterator<Item = &str> {
        self.layouts.iter().map(|(ext, _)| ext.as_str())
    }

    /// The renderer for the outermost extension of `file`, if there is one.
    pub fn resource_for(&self, file: &FileResource) -> Option<&dyn ResourceRenderer> {
        self.resource(file.file_extensions().first()?)
    }
}

/// Everything needed to render files for one locale.
#[derive(Debug)]
pub struct RenderContext<'a> {
    pub config: &'a Configuration,
    pub paths: &'a SitePaths,
    pub renderers: &'a Renderers,
    pub naming: Naming<'a>,
    pub layouts: LayoutResolver<'a>,
    /// The content root as seen by this pass.
    pub root: DynDirectory<'a>,
    pub static_tree: Option<&'a ResourceTree>,
    pub taxonomy: Taxonomy<'a>,
    pub locale: String,
    pub messages: serde_json::Value,
}

impl<'a> RenderContext<'a> {
    /// The model every render of `file` at `output_path` starts from.
    pub fn base_model(&self, file: &FileResource, output_path: &Path) -> Result<Model> {
        let mut model = Model::new();
        insert(&mut model, "metadata", &file.metadata)?;
        insert(&mut model, "locale", &self.locale)?;
        insert(&mut model, "locales", &*self.config.locales)?;
        model.insert("messages".into(), self.messages.clone());
        insert(&mut model, "config", &self.config.globals)?;
        model.insert("outputPath".into(), json!(output_path.to_url()));
        model.insert("relativeRootPath".into(), json!(relative_root_path(output_path)));
        Ok(model)
    }

    /// Renders `file` with the renderer for its outermost extension. Files
    /// without one render to their content.
    pub fn render_content(&self, file: &FileResource, model: &Model) -> Result<String> {
        match self.renderers.resource_for(file) {
            Some(renderer) => renderer.render(file, &self.locale, model).chain_with(|| error! {
                kind = Template;
                "failed to render resource",
                "resource" => file.path.display(),
                "locale" => &self.locale,
            }),
            None => Ok(file.content()?.as_deref().unwrap_or_default().to_string()),
        }
    }

    /// Wraps `content`, the rendered `file`, in its layout if it has one.
    pub fn apply_layout(&self, file: &FileResource, content: String, mut model: Model) -> Result<String> {
        let extension = self.naming.output_name(file).extension;
        let Some(layout) = self.layouts.resolve(file, &extension)? else {
            return Ok(content);
        };

        model.insert("content".into(), json!(content));
        layout.renderer.render(layout.path, file, &self.locale, &model).chain_with(|| error! {
            kind = Template;
            "failed to render layout",
            "layout" => layout.path.display(),
            "resource" => file.path.display(),
        })
    }
}

/// The relative URL from the output file at `output_path` to the output root.
///
/// ```
/// use std::path::Path;
/// use quire::render::relative_root_path;
///
/// assert_eq!(relative_root_path(Path::new("index.html")), "./");
/// assert_eq!(relative_root_path(Path::new("de/post/index.html")), "../..");
/// ```
pub fn relative_root_path(output_path: &Path) -> String {
    let depth = output_path.parent().map_or(0, |p| p.components().count());
    match depth {
        0 => "./".into(),
        n => vec![".."; n].join("/"),
    }
}

/// Inserts `key` into `model`, serializing `value`.
pub fn insert<T: serde::Serialize + ?Sized>(model: &mut Model, key: &str, value: &T) -> Result<()> {
    model.insert(key.to_string(), serde_json::to_value(value)?);
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Uppercases content; outputs `html`.
    #[derive(Debug)]
    pub struct Shout;

    impl ResourceRenderer for Shout {
        fn output_extension(&self) -> Option<&str> {
            Some("html")
        }

        fn render(&self, file: &FileResource, _: &str, _: &Model) -> Result<String> {
            Ok(file.content()?.as_deref().unwrap_or_default().to_uppercase())
        }
    }

    #[derive(Debug)]
    pub struct Echo;

    impl ResourceRenderer for Echo {
        fn output_extension(&self) -> Option<&str> {
            None
        }

        fn render(&self, file: &FileResource, _: &str, _: &Model) -> Result<String> {
            Ok(file.content()?.as_deref().unwrap_or_default().to_string())
        }
    }

    impl LayoutRenderer for Echo {
        fn render(&self, layout: &Path, _: &FileResource, _: &str, model: &Model) -> Result<String> {
            let content = model.get("content").and_then(|v| v.as_str()).unwrap_or_default();
            Ok(format!("[{}]{content}", layout.display()))
        }
    }

    pub fn renderers() -> Renderers {
        let mut renderers = Renderers::new();
        renderers.register_resource("md", Arc::new(Shout));
        renderers.register_resource("peb", Arc::new(Echo));
        renderers.register_layout("peb", Arc::new(Echo));
        renderers.register_layout("jinja", Arc::new(Echo));
        renderers
    }

    #[test]
    fn registration_order_and_replacement() {
        let mut renderers = renderers();
        assert_eq!(renderers.layout_extensions().collect::<Vec<_>>(), ["peb", "jinja"]);
        assert_eq!(renderers.resource("md").unwrap().output_extension(), Some("html"));

        renderers.register_resource("md", Arc::new(Echo));
        assert_eq!(renderers.resource("md").unwrap().output_extension(), None);
        assert!(renderers.resource("html").is_none());
    }
}
