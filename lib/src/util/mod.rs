mod path_ext;
mod natural;

pub use path_ext::*;
pub use natural::*;

use std::path::{Path, PathBuf, Component};

/// Convert spaces to hyphens. Remove characters that aren't alphanumerics,
/// underscores, or hyphens. Convert to lowercase. Also strip leading and
/// trailing whitespace.
pub fn slugify(string: &str) -> String {
    let mut output = String::with_capacity(string.len());

    let mut need_dash = false;
    for ch in string.chars() {
        for b in deunicode::deunicode_char(ch).unwrap_or("-").bytes() {
            match b {
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' => {
                    if need_dash {
                        output.push('-');
                        need_dash = false;
                    }

                    output.push(b.to_ascii_lowercase() as char);
                }
                _ => need_dash = !output.is_empty(),
            }
        }
    }

    output
}

/// A helper function to determine the relative path to `path` from `base`.
///
/// Returns `None` if there is no relative path from `base` to `path`, that is,
/// `base` and `path` do not share a common ancestor. `path` and `base` must be
/// either both absolute or both relative; returns `None` if one is relative and
/// the other absolute.
///
/// ```
/// use std::path::Path;
/// use quire::util::diff_paths;
///
/// // Paths must be both relative or both absolute.
/// assert_eq!(diff_paths("/a/b/c", "b/c"), None);
/// assert_eq!(diff_paths("a/b/c", "/b/c"), None);
///
/// // The root/relative root is always a common ancestor.
/// assert_eq!(diff_paths("/a/b/c", "/b/c"), Some("../../a/b/c".into()));
/// assert_eq!(diff_paths("index.html", "page/2"), Some("../../index.html".into()));
/// assert_eq!(diff_paths("page/3/index.html", "page/2"), Some("../3/index.html".into()));
/// assert_eq!(diff_paths("post/a/index.html", ""), Some("post/a/index.html".into()));
/// ```
// Copyright 2021 Sergio Benitez
// Copyright 2012-2015 The Rust Project Developers.
// Copyright 2017 The Rust Project Developers.
// Adapted from `figment`, which adapted from `pathdiff`, which itself adapted
// from rustc's path_relative_from.
pub fn diff_paths<P, B>(path: P, base: B) -> Option<PathBuf>
     where P: AsRef<Path>, B: AsRef<Path>
{
    let (path, base) = (path.as_ref(), base.as_ref());
    if path.has_root() != base.has_root() {
        return None;
    }

    let mut ita = path.components();
    let mut itb = base.components();
    let mut comps: Vec<Component> = vec![];
    loop {
        match (ita.next(), itb.next()) {
            (None, None) => break,
            (Some(a), None) => {
                comps.push(a);
                comps.extend(ita.by_ref());
                break;
            }
            (None, _) => comps.push(Component::ParentDir),
            (Some(a), Some(b)) if comps.is_empty() && a == b => (),
            (Some(a), Some(b)) if b == Component::CurDir => comps.push(a),
            (Some(_), Some(b)) if b == Component::ParentDir => return None,
            (Some(a), Some(_)) => {
                comps.push(Component::ParentDir);
                for _ in itb {
                    comps.push(Component::ParentDir);
                }
                comps.push(a);
                comps.extend(ita.by_ref());
                break;
            }
        }
    }

    Some(comps.iter().map(|c| c.as_os_str()).collect())
}

/// The relative URL leading from the output file `from` to the output file
/// `to`. Both are relative to the same output root.
///
/// ```
/// use quire::util::relative_url;
///
/// assert_eq!(relative_url("page/2/index.html", "page/3/index.html"), "../3/index.html");
/// assert_eq!(relative_url("index.html", "post/a/index.html"), "post/a/index.html");
/// assert_eq!(relative_url("post/a/index.html", "style.css"), "../../style.css");
/// ```
pub fn relative_url<F: AsRef<Path>, T: AsRef<Path>>(from: F, to: T) -> String {
    let base = from.as_ref().parent().unwrap_or(Path::new(""));
    diff_paths(to.as_ref(), base)
        .unwrap_or_else(|| to.as_ref().to_path_buf())
        .to_url()
}

/// Like [`relative_url()`], but a target named `index.html` is linked through
/// its directory.
///
/// ```
/// use quire::util::relative_dir_url;
///
/// assert_eq!(relative_dir_url("page/2/index.html", "index.html"), "../../");
/// assert_eq!(relative_dir_url("page/2.html", "index.html"), "../");
/// assert_eq!(relative_dir_url("index.html", "index.html"), "./");
/// assert_eq!(relative_dir_url("page/2.html", "list.html"), "../list.html");
/// ```
pub fn relative_dir_url<F: AsRef<Path>, T: AsRef<Path>>(from: F, to: T) -> String {
    let url = relative_url(from, to);
    match url.strip_suffix("index.html") {
        Some("") => "./".into(),
        Some(dir) if dir.ends_with('/') => dir.into(),
        _ => url,
    }
}

#[cfg(test)]
mod slug_tests {
    #[test]
    fn test_slugify() {
        use crate::util::slugify;

        assert_eq!(slugify("My Test String!!!1!1"), "my-test-string-1-1");
        assert_eq!(slugify("test\nit   now!"), "test-it-now");
        assert_eq!(slugify("  --test_-_cool- -  "), "test_-_cool");
        assert_eq!(slugify("Æúű--cool?"), "aeuu-cool");
        assert_eq!(slugify("You & Me"), "you-me");
    }
}
