//! Expansion of one file into a linked sequence of pages.
//!
//! Page 1 is written where the file would be written anyway. Page `n ≥ 2` is
//! written to `page/<n>/index.html` (or `page/<n>.html` with ugly URLs) next
//! to page 1. Models are computed only when a page is written.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use derive_more::Debug;
use serde::Serialize;
use serde_json::json;

use crate::directive;
use crate::error::Result;
use crate::render::{Model, RenderContext};
use crate::resource::{DirView, Directory, FileResource, PaginateMatch, PaginatePageSize, PaginateRecursive};
use crate::util::{natural_cmp, relative_dir_url, relative_url, PathExt};

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// `max(ceil(total / size), 1)`.
///
/// ```
/// use quire::paginate::page_count;
///
/// assert_eq!(page_count(0, 10), 1);
/// assert_eq!(page_count(10, 10), 1);
/// assert_eq!(page_count(11, 10), 2);
/// assert_eq!(page_count(20, 10), 2);
/// ```
pub fn page_count(total: usize, size: usize) -> usize {
    total.div_ceil(size.max(1)).max(1)
}

type LinkFn = Arc<dyn Fn(usize, usize) -> String + Send + Sync>;

/// One page of a paginated sequence.
#[derive(Debug, Clone)]
pub struct Page<T> {
    /// 1-based.
    pub number: usize,
    pub size: usize,
    pub count: usize,
    pub total: usize,
    #[debug(ignore)]
    links: LinkFn,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    /// The relative URL from this page to page `target`.
    pub fn link(&self, target: usize) -> String {
        (self.links)(self.number, target)
    }

    pub fn previous(&self) -> Option<String> {
        (self.number > 1).then(|| self.link(self.number - 1))
    }

    pub fn next(&self) -> Option<String> {
        (self.number < self.count).then(|| self.link(self.number + 1))
    }
}

impl<T: Serialize> Page<T> {
    /// The `pagination` model of this page.
    pub fn to_model(&self) -> Result<serde_json::Value> {
        let mut model = json!({
            "page": self.number,
            "pageSize": self.size,
            "pageCount": self.count,
            "totalItems": self.total,
            "pageUrls": (1..=self.count).map(|n| self.link(n)).collect::<Vec<_>>(),
            "items": serde_json::to_value(&self.items)?,
        });

        if let Some(previous) = self.previous() {
            model["previousPageUrl"] = json!(previous);
        }

        if let Some(next) = self.next() {
            model["nextPageUrl"] = json!(next);
        }

        Ok(model)
    }
}

/// The output paths of a sequence of pages and the links between them.
#[derive(Debug, Clone)]
pub struct PageLinks {
    paths: Arc<[PathBuf]>,
}

impl PageLinks {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        PageLinks { paths: paths.into() }
    }

    pub fn path(&self, n: usize) -> &Path {
        &self.paths[n - 1]
    }

    /// The link from page `from` to page `to`. Links to page 1 point at its
    /// directory when page 1 is an `index.html`.
    pub fn link(&self, from: usize, to: usize) -> String {
        match to {
            1 => relative_dir_url(self.path(from), self.path(to)),
            _ => relative_url(self.path(from), self.path(to)),
        }
    }

    fn link_fn(&self) -> LinkFn {
        let links = self.clone();
        Arc::new(move |from, to| links.link(from, to))
    }
}

/// An output path and the deferred computation of the model it's rendered
/// with. The model holds only what's specific to the path: `pagination`,
/// `tag`, `document`.
#[derive(Debug)]
pub struct PathAndModel<'p> {
    pub path: PathBuf,
    pub file: &'p FileResource,
    #[debug(ignore)]
    supplier: Box<dyn FnOnce() -> Result<Model> + 'p>,
}

impl<'p> PathAndModel<'p> {
    pub fn new<F>(path: PathBuf, file: &'p FileResource, supplier: F) -> Self
        where F: FnOnce() -> Result<Model> + 'p
    {
        PathAndModel { path, file, supplier: Box::new(supplier) }
    }

    /// A path with no extra model.
    pub fn plain(path: PathBuf, file: &'p FileResource) -> Self {
        PathAndModel::new(path, file, || Ok(Model::new()))
    }

    pub fn model(self) -> Result<Model> {
        (self.supplier)()
    }
}

/// Splits `items` into pages of `size` starting at `first`. The model of page
/// `n` has `pagination` with the items of the page, each mapped through
/// `item_model` together with the page's output path, plus `extra`.
pub fn paginate<'p, T, F>(
    ctx: &RenderContext<'_>,
    file: &'p FileResource,
    first: PathBuf,
    items: Vec<T>,
    size: usize,
    extra: Model,
    item_model: F,
) -> Vec<PathAndModel<'p>>
    where T: 'p, F: Fn(&T, &Path) -> Result<serde_json::Value> + 'p
{
    let total = items.len();
    let count = page_count(total, size);
    let paths = std::iter::once(first.clone())
        .chain((2..=count).map(|n| ctx.naming.page_path(&first, n, file)))
        .collect::<Vec<_>>();

    let links = PageLinks::new(paths);
    let items = Arc::new(items);
    let item_model = Arc::new(item_model);
    (1..=count).map(|number| {
        let path = links.path(number).to_path_buf();
        let (items, item_model, extra) = (items.clone(), item_model.clone(), extra.clone());
        let links = links.link_fn();
        let current = path.clone();
        PathAndModel::new(path, file, move || {
            let start = (number - 1) * size;
            let end = (start + size).min(items.len());
            let page_items = items[start.min(end)..end].iter()
                .map(|item| (*item_model)(item, &current))
                .collect::<Result<Vec<_>>>()?;

            let page = Page { number, size, count, total, links, items: page_items };
            let mut model = extra;
            model.insert("pagination".into(), page.to_model()?);
            Ok(model)
        })
    }).collect()
}

/// The page size of `file`: `paginate-page-size` or the default.
pub fn page_size(file: &FileResource) -> Result<usize> {
    match file.metadata.read(PaginatePageSize)? {
        Some(0) => err! {
            kind = Configuration;
            "page size must be positive",
            "resource" => file.path.display(),
        },
        Some(size) => Ok(size),
        None => Ok(DEFAULT_PAGE_SIZE),
    }
}

fn match_patterns(file: &FileResource) -> Result<Vec<glob::Pattern>> {
    let patterns = file.metadata.read(PaginateMatch)?.unwrap_or_default();
    patterns.iter()
        .map(|pattern| glob::Pattern::new(pattern).map_err(|e| error! {
            kind = Configuration;
            "invalid paginate-match pattern",
            "pattern" => pattern,
            "cause" => e,
            "resource" => file.path.display(),
        }))
        .collect()
}

fn matches(patterns: &[glob::Pattern], file: &FileResource) -> bool {
    patterns.is_empty() || patterns.iter().any(|p| p.matches(&file.file_name))
}

/// Pages over the files of the content directory `target` (relative to the
/// content root), as seen by this pass.
pub fn over_directory<'p, 'a: 'p>(
    ctx: &'p RenderContext<'a>,
    file: &'p FileResource,
    target: &Path,
    first: PathBuf,
) -> Result<Vec<PathAndModel<'p>>> {
    let size = page_size(file)?;
    let patterns = match_patterns(file)?;
    let Some(dir) = ctx.root.get_directory(target) else {
        return err! {
            kind = Configuration;
            "pagination target does not exist in this locale",
            "target" => target.display(),
            "resource" => file.path.display(),
        };
    };

    let items: Vec<&'a FileResource> = dir.files().into_iter()
        .filter(|item| item.id != file.id)
        .filter(|item| !directive::has_trigger(item))
        .filter(|item| matches(&patterns, item))
        .collect();

    tracing::debug!(resource = %file.relative_path.display(), items = items.len(), "paginating directory");
    Ok(paginate(ctx, file, first, items, size, Model::new(), move |item, current| {
        content_item(ctx, item, current)
    }))
}

/// The model of a content file listed on a page at `current`.
pub fn content_item(ctx: &RenderContext<'_>, item: &FileResource, current: &Path) -> Result<serde_json::Value> {
    let path = ctx.naming.output_path(item, &ctx.locale)?;
    let model = ctx.base_model(item, &path)?;
    let content = ctx.render_content(item, &model)?;
    Ok(json!({
        "metadata": item.metadata,
        "content": content,
        "outputPath": path.to_url(),
        "relativeUrlToContent": relative_url(current, &path),
    }))
}

/// Pages over the files of the static directory `target` (relative to the
/// static root), in descending natural order of file name.
pub fn over_static<'p, 'a: 'p>(
    ctx: &'p RenderContext<'a>,
    file: &'p FileResource,
    target: &Path,
    first: PathBuf,
) -> Result<Vec<PathAndModel<'p>>> {
    let size = page_size(file)?;
    let patterns = match_patterns(file)?;
    let dir = ctx.static_tree
        .and_then(|tree| Some(DirView::new(tree, tree.get_directory(target)?.id)));

    let Some(dir) = dir else {
        return err! {
            kind = Configuration;
            "pagination target does not exist",
            "target" => target.display(),
            "resource" => file.path.display(),
        };
    };

    let mut items = match file.metadata.read(PaginateRecursive)?.unwrap_or(false) {
        true => dir.walk_files(),
        false => dir.files(),
    };

    items.retain(|item| matches(&patterns, item));
    items.sort_by(|a, b| natural_cmp(&b.file_name, &a.file_name)
        .then_with(|| b.relative_path.cmp(&a.relative_path)));

    Ok(paginate(ctx, file, first, items, size, Model::new(), |item, current| {
        let path = item.relative_path.to_url();
        Ok(json!({
            "name": item.file_name,
            "outputPath": path,
            "relativeUrlToContent": relative_url(current, Path::new(&path)),
            "metadata": item.metadata,
        }))
    }))
}

/// One paginated sequence per tag of the taxonomy `group`, each rooted at
/// `<dir>/<tag>/<name>` where `first` is `<dir>/<name>`.
pub fn over_taxonomy<'p, 'a: 'p>(
    ctx: &'p RenderContext<'a>,
    file: &'p FileResource,
    group: &str,
    first: PathBuf,
) -> Result<Vec<PathAndModel<'p>>> {
    let size = page_size(file)?;
    let Some(tags) = ctx.taxonomy.group(group) else {
        return err! {
            kind = Configuration;
            "unknown taxonomy",
            "taxonomy" => group,
            "configured" => ctx.config.taxonomies.join(", "),
            "resource" => file.path.display(),
        };
    };

    let (dir, name) = ctx.naming.split_output_path(&first, file);
    let mut pages = vec![];
    for (tag, files) in tags {
        let mut extra = Model::new();
        extra.insert("tag".into(), json!(tag));

        let Some(segment) = tag_segment(tag) else {
            return err! {
                kind = Configuration;
                "tag cannot be used as a path segment",
                "taxonomy" => group,
                "tag" => tag,
                "resource" => file.path.display(),
            };
        };

        let root = dir.join(segment).join(&name);
        pages.extend(paginate(ctx, file, root, files.clone(), size, extra, move |item, current| {
            content_item(ctx, item, current)
        }));
    }

    Ok(pages)
}

/// `tag` as a single, non-empty path segment, if it has one.
fn tag_segment(tag: &str) -> Option<String> {
    let plain = Path::new(tag).components().count() == 1
        && matches!(Path::new(tag).components().next(), Some(std::path::Component::Normal(_)));

    let segment = match plain {
        true => tag.to_string(),
        false => crate::util::slugify(tag),
    };

    (!segment.is_empty()).then_some(segment)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn links(paths: &[&str]) -> PageLinks {
        PageLinks::new(paths.iter().map(PathBuf::from).collect())
    }

    /// Resolves `url` against the directory of `from`, mapping directory
    /// links to their `index.html`.
    fn resolve(from: &Path, url: &str) -> PathBuf {
        let base = from.parent().unwrap_or(Path::new(""));
        let mut path = base.join(url).normalize().unwrap();
        if url.ends_with('/') {
            path.push("index.html");
        }

        path
    }

    #[test]
    fn page_count_law() {
        for size in 1..=12 {
            for total in 0..=50 {
                let count = page_count(total, size);
                assert!(count >= 1);
                assert!(count * size >= total);
                assert!(total == 0 || (count - 1) * size < total);
            }
        }
    }

    #[test]
    fn links_back_to_first_page_use_its_directory() {
        let clean = links(&["blog/index.html", "blog/page/2/index.html", "blog/page/3/index.html"]);
        assert_eq!(clean.link(2, 1), "../../");
        assert_eq!(clean.link(3, 2), "../2/index.html");
        assert_eq!(clean.link(1, 2), "page/2/index.html");
        assert_eq!(clean.link(1, 1), "./");

        let ugly = links(&["list.html", "page/2.html"]);
        assert_eq!(ugly.link(2, 1), "../list.html");
        assert_eq!(ugly.link(1, 2), "page/2.html");
    }

    #[test]
    fn link_symmetry() {
        for paths in [
            &["index.html", "page/2/index.html", "page/3/index.html", "page/4/index.html"][..],
            &["de/blog/index.html", "de/blog/page/2/index.html", "de/blog/page/3/index.html"][..],
            &["posts.html", "page/2.html", "page/3.html"][..],
        ] {
            let links = links(paths);
            for i in 2..=paths.len() {
                let back = resolve(links.path(i), &links.link(i, i - 1));
                assert_eq!(back, links.path(i - 1));

                let forward = resolve(links.path(i - 1), &links.link(i - 1, i));
                assert_eq!(forward, links.path(i));
            }
        }
    }

    #[test]
    fn page_model() {
        let links = links(&["index.html", "page/2/index.html", "page/3/index.html"]);
        let page = Page { number: 2, size: 2, count: 3, total: 5, links: links.link_fn(), items: vec!["c", "d"] };
        let model = page.to_model().unwrap();
        assert_eq!(model["page"], 2);
        assert_eq!(model["pageCount"], 3);
        assert_eq!(model["totalItems"], 5);
        assert_eq!(model["previousPageUrl"], "../../");
        assert_eq!(model["nextPageUrl"], "../3/index.html");
        assert_eq!(model["pageUrls"], json!(["../../", "index.html", "../3/index.html"]));
        assert_eq!(model["items"], json!(["c", "d"]));

        let first = Page { number: 1, size: 2, count: 1, total: 0, links: links.link_fn(), items: Vec::<u8>::new() };
        let model = first.to_model().unwrap();
        assert!(model.get("previousPageUrl").is_none());
        assert!(model.get("nextPageUrl").is_none());
    }

    #[test]
    fn tag_segments() {
        assert_eq!(tag_segment("rust").as_deref(), Some("rust"));
        assert_eq!(tag_segment("../etc").as_deref(), Some("etc"));
        assert_eq!(tag_segment("a/b").as_deref(), Some("a-b"));
        assert_eq!(tag_segment("."), None);
        assert_eq!(tag_segment(".."), None);
        assert_eq!(tag_segment(""), None);
    }
}
