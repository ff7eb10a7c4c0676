#![doc = svgbobdoc::transform!(
//! A library for resolving, paginating and rendering static site content.
//!
//! # Overview
//!
//! A site is a base directory with a conventional layout:
//!
//! ```svgbob
//!  site/
//!   +-- configuration.yaml     locales, URL style, taxonomies, globals
//!   +-- content/               files to render, with optional front matter
//!   +-- layout/                layouts wrapping rendered content
//!   +-- static/                copied to the output root as is
//!   +-- locales/<locale>.yaml  message bundles
//!   +-- output/                everything written by a build
//! ```
//!
//! The content directory is read once into a [`resource::ResourceTree`]. The
//! rest of a build sees it through decorated [`resource::Directory`] views:
//!
//! ```svgbob
//!  +----------------+     +-------------+     +---------------+
//!  |  ResourceTree  +---->+ LocaleAware +---->+ OverrideAware |
//!  +----------------+     +-------------+     +-------+-------+
//!                                                     |
//!                      +------------------------------+
//!                      |
//!                      v
//!        +-------------+-------------+        +-----------------+
//!        | directive expansion       +------->+ render, layout, |
//!        | (pages, tags, documents)  |        | write           |
//!        +---------------------------+        +-----------------+
//! ```
//!
//! ## Rendering
//!
//! Every file visible in a locale is expanded into one or more output paths,
//! each paired with a lazily computed model:
//!
//! 1. A file's output name is derived from its extension chain. The outermost
//!    extension selects a renderer: `post.md` renders to `post/index.html`,
//!    `feed.xml.peb` to `feed.xml`. See [`naming`].
//! 2. A file with `paginate-over-directory`, `paginate-over-taxonomy` or
//!    `include-all` in its front matter expands into several outputs. See
//!    [`paginate`] and [`document`].
//! 3. Each output is rendered with the file's renderer, then wrapped in the
//!    layout found for it. See [`layout`].
//!
//! Files no renderer handles are copied verbatim. Files declaring
//! `override-output-to-path` are rendered once, after every locale.
//!
//! [`build::build()`] runs the whole pipeline.
)]

#[macro_use]
pub mod error;
pub mod util;
pub mod value;
pub mod config;
pub mod resource;
pub mod naming;
pub mod layout;
pub mod taxonomy;
pub mod paginate;
pub mod document;
pub mod directive;
pub mod render;
pub mod markdown;
pub mod templating;
pub mod build;

pub use build::{build, BuildReport, Site};
pub use error::{Error, ErrorKind, Result};
