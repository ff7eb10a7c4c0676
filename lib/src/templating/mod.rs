//! Template rendering, backed by `minijinja`. Template files carry the `peb`
//! extension.

mod minijinja;

pub use self::minijinja::TemplateEngine;
