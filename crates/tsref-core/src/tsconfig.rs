//! Minimal `tsconfig.json` model.
//!
//! Only `compilerOptions.rootDir` and `compilerOptions.outDir` are read.
//! `extends` is not followed and nothing is validated.

use crate::error::Error;
use crate::paths;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tsref_util::jsonc;

/// File name of the project configuration inside a package boundary.
pub const TSCONFIG_FILE: &str = "tsconfig.json";

/// Parsed project configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TsConfig {
    #[serde(default)]
    pub compiler_options: Option<CompilerOptions>,
}

/// The subset of `compilerOptions` the redirector cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerOptions {
    #[serde(default)]
    pub root_dir: Option<String>,
    #[serde(default)]
    pub out_dir: Option<String>,
}

impl CompilerOptions {
    /// `rootDir`, treating an empty string as unset.
    #[must_use]
    pub fn root_dir(&self) -> Option<&str> {
        self.root_dir.as_deref().filter(|s| !s.is_empty())
    }

    /// `outDir`, treating an empty string as unset.
    #[must_use]
    pub fn out_dir(&self) -> Option<&str> {
        self.out_dir.as_deref().filter(|s| !s.is_empty())
    }

    /// Both directories anchored at `base`, or `None` unless both are set.
    #[must_use]
    pub fn anchored_dirs(&self, base: &Path) -> Option<SourceLayout> {
        Some(SourceLayout {
            root_dir: paths::join(base, self.root_dir()?),
            out_dir: paths::join(base, self.out_dir()?),
        })
    }
}

/// Anchored source and output trees of one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLayout {
    pub root_dir: PathBuf,
    pub out_dir: PathBuf,
}

impl SourceLayout {
    /// Map a path under `out_dir` to the same relative path under `root_dir`.
    ///
    /// Returns `None` when `path` is not under `out_dir`. The prefix test is
    /// per path component, so `dist2/a.js` is not under `dist`.
    #[must_use]
    pub fn to_source(&self, path: &Path) -> Option<PathBuf> {
        let rest = path.strip_prefix(&self.out_dir).ok()?;
        if rest.as_os_str().is_empty() {
            Some(self.root_dir.clone())
        } else {
            Some(self.root_dir.join(rest))
        }
    }

    /// Whether source and output share one tree.
    #[must_use]
    pub fn is_same_tree(&self) -> bool {
        self.root_dir == self.out_dir
    }
}

/// Parse `tsconfig.json` bytes, tolerating comments and trailing commas.
///
/// Invalid UTF-8 is replaced rather than rejected. `path` is only used for
/// error reporting.
pub fn parse_tsconfig(path: &Path, bytes: &[u8]) -> Result<TsConfig, Error> {
    let text = String::from_utf8_lossy(bytes);
    serde_json::from_str(&jsonc::normalize(&text)).map_err(|source| Error::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}
