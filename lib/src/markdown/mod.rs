//! Markdown content rendering, backed by `pulldown-cmark`.

mod plugin;
mod auto_heading;

pub use plugin::Plugin;
pub use auto_heading::AutoHeading;

use pulldown_cmark::{html, Options, Parser};

use crate::error::Result;
use crate::render::{Model, ResourceRenderer};
use crate::resource::FileResource;

/// Renders Markdown to HTML: tables, footnotes, strikethrough, task lists and
/// heading attributes are enabled, and headings get slug ids.
///
/// ```
/// use quire::markdown::MarkdownRenderer;
///
/// let html = MarkdownRenderer::default().render_str("# Hello, World\n\n*hi*");
/// assert_eq!(html, "<h1 id=\"hello-world\">Hello, World</h1>\n<p><em>hi</em></p>\n");
/// ```
#[derive(Debug, Clone)]
pub struct MarkdownRenderer {
    options: Options,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        let excluded = Options::ENABLE_SMART_PUNCTUATION
            | Options::ENABLE_YAML_STYLE_METADATA_BLOCKS
            | Options::ENABLE_PLUSES_DELIMITED_METADATA_BLOCKS;

        MarkdownRenderer { options: Options::all().difference(excluded) }
    }
}

impl MarkdownRenderer {
    pub fn with_options(options: Options) -> Self {
        MarkdownRenderer { options }
    }

    pub fn render_str(&self, input: &str) -> String {
        let mut headings = AutoHeading::default();
        let events = headings.remap(Parser::new_ext(input, self.options));
        let mut output = String::with_capacity(input.len() + input.len() / 2);
        html::push_html(&mut output, events);
        output
    }
}

impl ResourceRenderer for MarkdownRenderer {
    fn output_extension(&self) -> Option<&str> {
        Some("html")
    }

    fn render(&self, file: &FileResource, _: &str, _: &Model) -> Result<String> {
        let content = file.content()?;
        Ok(self.render_str(content.as_deref().unwrap_or_default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_ids() {
        let html = MarkdownRenderer::default().render_str("# Intro\n\n## Intro\n\n## `code` bits\n\n### Custom {#mine}\n\n# Intro\n");
        assert!(html.contains("<h1 id=\"intro\">Intro</h1>"));
        assert!(html.contains("<h2 id=\"intro-1\">Intro</h2>"));
        assert!(html.contains("<h2 id=\"code-bits\"><code>code</code> bits</h2>"));
        assert!(html.contains("<h3 id=\"mine\">Custom</h3>"));
        assert!(html.contains("<h1 id=\"intro-2\">Intro</h1>"));
    }

    #[test]
    fn extensions() {
        let html = MarkdownRenderer::default().render_str("---\n\n| a |\n|---|\n| b |\n\n~~gone~~ \"quoted\"\n");
        assert!(html.starts_with("<hr />"));
        assert!(html.contains("<table>"));
        assert!(html.contains("<del>gone</del>"));
        assert!(html.contains("quoted"));
        assert!(!html.contains('“'));
    }
}
