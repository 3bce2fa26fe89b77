use std::path::{Component, Path, PathBuf};

fn is_root_like(path: Option<&str>) -> bool {
    matches!(path, None | Some("") | Some("/"))
}

/// Remote directory currently being listed, relative to the shared link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteDir {
    AtShareRoot,
    AtPath(String),
}

impl RemoteDir {
    /// Collapses the three spellings of "root" (absent, `""`, `"/"`) into one.
    pub fn from_raw(path: Option<&str>) -> Self {
        match path {
            Some(p) if !is_root_like(Some(p)) => Self::AtPath(p.to_string()),
            _ => Self::AtShareRoot,
        }
    }

    /// Path argument for the listing call. The share root is listed as `""`.
    pub fn list_path(&self) -> &str {
        match self {
            Self::AtShareRoot => "",
            Self::AtPath(p) => p,
        }
    }

    pub fn child_path(&self, name: &str) -> String {
        match self {
            Self::AtShareRoot => format!("/{name}"),
            Self::AtPath(p) => format!("{}/{name}", p.trim_end_matches('/')),
        }
    }

    pub fn child(&self, name: &str) -> Self {
        Self::AtPath(self.child_path(name))
    }
}

impl std::fmt::Display for RemoteDir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AtShareRoot => f.write_str("/"),
            Self::AtPath(p) => f.write_str(p),
        }
    }
}

/// Remote path that maps onto the local destination root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareRoot {
    Root,
    Path(String),
}

impl ShareRoot {
    pub fn from_raw(path: Option<&str>) -> Self {
        match path {
            Some(p) if !is_root_like(Some(p)) => Self::Path(p.to_string()),
            _ => Self::Root,
        }
    }

    /// Remote `full_path` made relative to this root.
    pub fn relative(&self, full_path: &str) -> PathBuf {
        match self {
            Self::Root => PathBuf::from(full_path.strip_prefix('/').unwrap_or(full_path)),
            Self::Path(root) => relative_path(Path::new(full_path), Path::new(root)),
        }
    }

    pub fn local_path(&self, local_root: &Path, full_path: &str) -> PathBuf {
        local_root.join(self.relative(full_path))
    }
}

fn normal_components(path: &Path) -> Vec<&std::ffi::OsStr> {
    let mut out = Vec::new();
    for c in path.components() {
        match c {
            Component::Normal(x) => out.push(x),
            Component::ParentDir => {
                out.pop();
            }
            _ => {}
        }
    }
    out
}

/// Lexical relative path from `base` to `path`, walking up with `..` where the
/// two diverge. Neither side touches the filesystem.
fn relative_path(path: &Path, base: &Path) -> PathBuf {
    let path = normal_components(path);
    let base = normal_components(base);

    let common = path
        .iter()
        .zip(base.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..base.len() {
        rel.push("..");
    }
    for c in &path[common..] {
        rel.push(c);
    }

    if rel.as_os_str().is_empty() {
        rel.push(".");
    }
    rel
}
