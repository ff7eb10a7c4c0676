use std::io;
use std::path::{Path, PathBuf, Component};

pub trait PathExt: AsRef<Path> {
    /// Lexically resolves `.` and `..` components. Returns `None` if a `..`
    /// would climb above the start of a relative path or above the root of an
    /// absolute one.
    fn normalize(&self) -> Option<PathBuf>;

    /// `true` if `self` lies lexically inside `root` (or is `root`).
    fn is_within<P: AsRef<Path>>(&self, root: P) -> bool;

    /// `true` unless `self` is known to lie outside of `root`. A path that
    /// cannot be normalized may lie anywhere.
    fn may_be_within<P: AsRef<Path>>(&self, root: P) -> bool;

    /// An absolute, normalized path to `self`. The longest prefix that exists
    /// is canonicalized, so links are resolved and prefixes agree with paths
    /// read from the filesystem.
    fn absolutize(&self) -> io::Result<PathBuf>;

    /// The path's normal components joined with `/`.
    fn to_url(&self) -> String;
}

impl PathExt for Path {
    fn normalize(&self) -> Option<PathBuf> {
        let mut normalized = PathBuf::new();
        let mut depth = 0usize;
        for component in self.components() {
            match component {
                Component::CurDir => continue,
                Component::ParentDir => {
                    depth = depth.checked_sub(1)?;
                    normalized.pop();
                }
                Component::Normal(c) => {
                    depth += 1;
                    normalized.push(c);
                }
                c@(Component::RootDir | Component::Prefix(_)) => normalized.push(c),
            }
        }

        Some(normalized)
    }

    fn is_within<P: AsRef<Path>>(&self, root: P) -> bool {
        match (self.normalize(), root.as_ref().normalize()) {
            (Some(path), Some(root)) => path.starts_with(root),
            _ => false,
        }
    }

    fn may_be_within<P: AsRef<Path>>(&self, root: P) -> bool {
        match (self.normalize(), root.as_ref().normalize()) {
            (Some(path), Some(root)) => path.starts_with(root),
            _ => true,
        }
    }

    fn absolutize(&self) -> io::Result<PathBuf> {
        let absolute = std::path::absolute(self)?;
        let Some(normalized) = absolute.normalize() else {
            let message = format!("{} climbs above the root", self.display());
            return Err(io::Error::new(io::ErrorKind::InvalidInput, message));
        };

        let mut existing = normalized.as_path();
        let mut missing = vec![];
        while !existing.exists() {
            match (existing.parent(), existing.file_name()) {
                (Some(parent), Some(name)) => {
                    missing.push(name);
                    existing = parent;
                }
                _ => break,
            }
        }

        let mut resolved = existing.canonicalize()?;
        resolved.extend(missing.into_iter().rev());
        Ok(resolved)
    }

    fn to_url(&self) -> String {
        let mut url = String::new();
        for component in self.components() {
            let segment = match component {
                Component::ParentDir => "..".into(),
                Component::Normal(c) => c.to_string_lossy(),
                _ => continue,
            };

            if !url.is_empty() {
                url.push('/');
            }

            url.push_str(&segment);
        }

        url
    }
}

impl PathExt for PathBuf {
    fn normalize(&self) -> Option<PathBuf> {
        self.as_path().normalize()
    }

    fn is_within<P: AsRef<Path>>(&self, root: P) -> bool {
        self.as_path().is_within(root)
    }

    fn may_be_within<P: AsRef<Path>>(&self, root: P) -> bool {
        self.as_path().may_be_within(root)
    }

    fn absolutize(&self) -> io::Result<PathBuf> {
        self.as_path().absolutize()
    }

    fn to_url(&self) -> String {
        self.as_path().to_url()
    }
}
