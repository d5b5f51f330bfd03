use serde::Serialize;
use std::path::{Path, PathBuf};

/// A request travelling through the resolver's stages.
///
/// Hooks treat requests as immutable: a hook that wants to change one
/// clones it with the fields it overrides and hands the copy to
/// [`Resolver::do_resolve`](super::Resolver::do_resolve).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    /// Absolute path currently being resolved; `None` when the request is
    /// not (yet) a file path.
    pub path: Option<PathBuf>,
    /// The specifier being resolved, relative to `path`.
    pub request: Option<String>,
    /// `?query` suffix of the specifier.
    pub query: String,
    /// `#fragment` suffix of the specifier.
    pub fragment: String,
    /// Directory of the nearest `package.json`.
    pub description_file_root: Option<PathBuf>,
    /// Path of the nearest `package.json`.
    pub description_file_path: Option<PathBuf>,
    /// `path` relative to `description_file_root`, `./`-prefixed.
    pub relative_path: Option<String>,
}

impl ResolveRequest {
    /// Create a request for a concrete file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Set the specifier.
    #[must_use]
    pub fn with_request(mut self, request: impl Into<String>) -> Self {
        self.request = Some(request.into());
        self
    }

    /// Attach the package boundary and derive `description_file_path` and
    /// `relative_path` from it.
    #[must_use]
    pub fn with_description_file_root(mut self, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        self.description_file_path = Some(root.join(crate::paths::DESCRIPTION_FILE));
        self.relative_path = self
            .path
            .as_deref()
            .and_then(|p| p.strip_prefix(&root).ok())
            .map(relative_specifier);
        self.description_file_root = Some(root);
        self
    }

    /// Display form used in stack entries and log lines.
    #[must_use]
    pub fn describe(&self) -> String {
        format!(
            "({}) {}{}{}",
            self.path
                .as_deref()
                .map_or_else(String::new, |p| p.display().to_string()),
            self.request.as_deref().unwrap_or(""),
            self.query,
            self.fragment
        )
    }
}

fn relative_specifier(rest: &Path) -> String {
    let rest = rest.to_string_lossy().replace('\\', "/");
    if rest.is_empty() {
        ".".to_string()
    } else {
        format!("./{rest}")
    }
}
