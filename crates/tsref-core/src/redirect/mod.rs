//! Redirect resolution from a TypeScript project's `outDir` to its `rootDir`.
//!
//! Tapped onto the `file` stage. When a concrete file sits under the
//! compiled-output tree of a project whose `tsconfig.json` declares both
//! `rootDir` and `outDir`, the request is re-issued against the
//! `internal-resolve` stage pointing at the matching source file, so
//! linked workspace packages resolve to their sources without a build.
//!
//! Any failure to apply (no symlink info, no config, a malformed config,
//! a path outside `outDir`) silently declines and resolution continues
//! unmodified. Only failures of the delegated resolution propagate.

use crate::fs::{FileSystem, FsError};
use crate::paths;
use crate::resolver::{
    stages, DependencyTracker, Hook, HookResult, ResolveContext, ResolveRequest, ResolveTraceStep,
    Resolver, ResolverPlugin,
};
use crate::tsconfig::{parse_tsconfig, CompilerOptions, SourceLayout, TSCONFIG_FILE};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Hook name reported in logs.
pub const HOOK_NAME: &str = "path-redirector";

/// Where the redirector listens and where it sends rewritten requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedirectOptions {
    /// Stage the hook is tapped onto.
    pub source: String,
    /// Stage redirected requests are handed to.
    pub target: String,
}

impl Default for RedirectOptions {
    fn default() -> Self {
        Self {
            source: stages::FILE.to_string(),
            target: stages::INTERNAL_RESOLVE.to_string(),
        }
    }
}

impl RedirectOptions {
    /// Set the source stage.
    #[must_use]
    pub fn with_source(mut self, stage: impl Into<String>) -> Self {
        self.source = stage.into();
        self
    }

    /// Set the target stage.
    #[must_use]
    pub fn with_target(mut self, stage: impl Into<String>) -> Self {
        self.target = stage.into();
        self
    }
}

/// Why a request was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclineReason {
    /// Request has no `path` or no `description_file_root`.
    MissingFields,
    /// The package boundary could not be read as a link or directory.
    LinkUnreadable,
    /// The package boundary lives inside `node_modules`.
    NodeModules,
    /// No `tsconfig.json` at the package boundary.
    ConfigMissing,
    /// `tsconfig.json` exists but could not be read.
    ConfigUnreadable,
    /// `tsconfig.json` is not valid JSON (comments and trailing commas allowed).
    ConfigInvalid,
    /// `tsconfig.json` has no `compilerOptions`.
    NoCompilerOptions,
    /// `rootDir` or `outDir` is not set.
    DirsNotSet,
    /// `rootDir` and `outDir` are the same directory.
    SameDir,
    /// The path is not under `outDir`.
    OutsideOutDir,
}

impl DeclineReason {
    /// Stable machine-readable code.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::MissingFields => "MISSING_FIELDS",
            Self::LinkUnreadable => "LINK_UNREADABLE",
            Self::NodeModules => "NODE_MODULES",
            Self::ConfigMissing => "CONFIG_MISSING",
            Self::ConfigUnreadable => "CONFIG_UNREADABLE",
            Self::ConfigInvalid => "CONFIG_INVALID",
            Self::NoCompilerOptions => "NO_COMPILER_OPTIONS",
            Self::DirsNotSet => "DIRS_NOT_SET",
            Self::SameDir => "SAME_DIR",
            Self::OutsideOutDir => "OUTSIDE_OUT_DIR",
        }
    }
}

impl std::fmt::Display for DeclineReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::MissingFields => "request has no path or package boundary",
            Self::LinkUnreadable => "package boundary could not be resolved",
            Self::NodeModules => "package boundary is inside node_modules",
            Self::ConfigMissing => "no tsconfig.json at package boundary",
            Self::ConfigUnreadable => "tsconfig.json could not be read",
            Self::ConfigInvalid => "tsconfig.json could not be parsed",
            Self::NoCompilerOptions => "tsconfig.json has no compilerOptions",
            Self::DirsNotSet => "rootDir or outDir is not set",
            Self::SameDir => "rootDir and outDir are the same directory",
            Self::OutsideOutDir => "path is not under outDir",
        };
        write!(f, "{s}")
    }
}

/// A chosen redirection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    /// Original file path.
    pub from: PathBuf,
    /// Matching path under `rootDir`.
    pub to: PathBuf,
    /// Anchored `rootDir`/`outDir` the decision was based on.
    pub layout: SourceLayout,
    /// Request to hand to the target stage.
    pub request: ResolveRequest,
}

impl Redirect {
    /// Diagnostic message recorded with the delegated resolution.
    #[must_use]
    pub fn message(&self) -> String {
        format!(
            "source redirected from \"{}\" to \"{}\"",
            self.from.display(),
            self.to.display()
        )
    }
}

/// Outcome of [`PathRedirector::plan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Decline(DeclineReason),
    Redirect(Redirect),
}

/// Resolver plugin that sends `outDir` files back to `rootDir`.
#[derive(Debug, Clone, Default)]
pub struct PathRedirector {
    options: RedirectOptions,
}

impl PathRedirector {
    /// Create a redirector on the default stages.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a redirector with explicit stages.
    #[must_use]
    pub fn with_options(options: RedirectOptions) -> Self {
        Self { options }
    }

    /// Stages this redirector uses.
    #[must_use]
    pub fn options(&self) -> &RedirectOptions {
        &self.options
    }

    /// Decide whether `request` should be redirected.
    ///
    /// Reads the boundary symlink and `tsconfig.json` fresh on every call and
    /// records the config path on `tracker`: as a missing dependency when it
    /// does not exist, as a file dependency whenever it was read.
    pub async fn plan(
        &self,
        resolver: &Resolver,
        request: &ResolveRequest,
        tracker: &dyn DependencyTracker,
    ) -> Decision {
        match plan_steps(resolver, request, tracker).await {
            Ok(redirect) => Decision::Redirect(redirect),
            Err(reason) => Decision::Decline(reason),
        }
    }
}

async fn plan_steps(
    resolver: &Resolver,
    request: &ResolveRequest,
    tracker: &dyn DependencyTracker,
) -> Result<Redirect, DeclineReason> {
    let (Some(path), Some(root)) = (&request.path, &request.description_file_root) else {
        return Err(DeclineReason::MissingFields);
    };
    let fs = resolver.file_system();

    let canonical_root = resolve_link(resolver, root).await?;
    if paths::is_in_node_modules(&canonical_root) {
        return Err(DeclineReason::NodeModules);
    }

    let config_path = resolver.join(root, TSCONFIG_FILE);
    let options = read_compiler_options(fs, &config_path, tracker).await?;

    let layout = options
        .anchored_dirs(root)
        .ok_or(DeclineReason::DirsNotSet)?;
    if layout.is_same_tree() {
        return Err(DeclineReason::SameDir);
    }

    let to = layout
        .to_source(path)
        .ok_or(DeclineReason::OutsideOutDir)?;

    let mut redirected = request.clone();
    redirected.path = Some(root.clone());
    redirected.request = Some(to.to_string_lossy().into_owned());

    Ok(Redirect {
        from: path.clone(),
        to,
        layout,
        request: redirected,
    })
}

/// Resolve one level of symlink on the package boundary.
///
/// A boundary that is not a link is already canonical. A link target is
/// taken relative to the boundary's parent.
async fn resolve_link(resolver: &Resolver, root: &Path) -> Result<PathBuf, DeclineReason> {
    match resolver.file_system().read_link(root).await {
        Ok(target) if target.as_os_str().is_empty() => Err(DeclineReason::LinkUnreadable),
        Ok(target) => Ok(resolver.join(&resolver.join(root, ".."), target)),
        Err(FsError::NotALink(_)) => Ok(root.to_path_buf()),
        Err(e) => {
            tracing::trace!(root = %root.display(), error = %e, "cannot read package boundary");
            Err(DeclineReason::LinkUnreadable)
        }
    }
}

async fn read_compiler_options(
    fs: &dyn FileSystem,
    config_path: &Path,
    tracker: &dyn DependencyTracker,
) -> Result<CompilerOptions, DeclineReason> {
    let bytes = match fs.read_file(config_path).await {
        Ok(bytes) => bytes,
        Err(FsError::NotFound(_)) => {
            tracker.record_missing_dependency(config_path);
            return Err(DeclineReason::ConfigMissing);
        }
        Err(e) => {
            tracing::trace!(error = %e, "cannot read tsconfig");
            return Err(DeclineReason::ConfigUnreadable);
        }
    };
    tracker.record_file_dependency(config_path);

    let config = parse_tsconfig(config_path, &bytes).map_err(|e| {
        tracing::trace!(error = %e, "ignoring tsconfig");
        DeclineReason::ConfigInvalid
    })?;
    config
        .compiler_options
        .ok_or(DeclineReason::NoCompilerOptions)
}

#[async_trait]
impl Hook for PathRedirector {
    fn name(&self) -> &str {
        HOOK_NAME
    }

    async fn call(
        &self,
        resolver: &Resolver,
        request: &ResolveRequest,
        ctx: &ResolveContext,
    ) -> HookResult {
        match self.plan(resolver, request, ctx).await {
            Decision::Decline(reason) => {
                tracing::trace!(code = reason.code(), request = %request.describe(), "not redirecting: {reason}");
                ctx.log(
                    ResolveTraceStep::new(&self.options.source, false, reason.to_string())
                        .with_code(reason.code()),
                );
                Ok(None)
            }
            Decision::Redirect(redirect) => {
                let message = redirect.message();
                tracing::debug!(
                    from = %redirect.from.display(),
                    to = %redirect.to.display(),
                    "redirecting to source"
                );
                resolver
                    .do_resolve(&self.options.target, redirect.request, Some(&message), ctx)
                    .await
            }
        }
    }
}

impl ResolverPlugin for PathRedirector {
    fn apply(self, resolver: &mut Resolver) {
        let source = self.options.source.clone();
        resolver.tap(&source, Arc::new(self));
    }
}
