//! Hook-based resolution pipeline.
//!
//! The resolver is a set of named stages. Hooks tap a stage and are called
//! in registration order with `(request, context)`; each either declines
//! (`Ok(None)`), answers (`Ok(Some(request))`), or fails. A hook may hand a
//! rewritten request to another stage with [`Resolver::do_resolve`], which
//! is how plugins redirect resolution.
//!
//! Only the pipeline lives here. Module resolution proper (extension
//! probing, `node_modules` lookup, exports maps) is the job of whatever
//! hooks the host taps onto the stages.

mod context;
mod request;
pub mod trace;

pub use context::{DependencyTracker, ResolveContext};
pub use request::ResolveRequest;
pub use trace::{ResolveTrace, ResolveTraceStep};

use crate::fs::FileSystem;
use crate::paths;
use async_trait::async_trait;
use rustc_hash::FxHashMap as HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Result of a hook or stage: a final request, no answer, or a failure.
pub type HookResult = Result<Option<ResolveRequest>, ResolveError>;

/// Failure of a resolution chain.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Recursion in resolving\nStack:\n  {}", .stack.join("\n  "))]
    Recursion { stack: Vec<String> },

    #[error("[{hook}] {message}")]
    Hook { hook: String, message: String },
}

impl ResolveError {
    /// Create a hook failure.
    pub fn hook(hook: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Hook {
            hook: hook.into(),
            message: message.into(),
        }
    }
}

/// Stage names used by the pipeline.
pub mod stages {
    pub const RESOLVE: &str = "resolve";
    pub const INTERNAL_RESOLVE: &str = "internal-resolve";
    pub const PARSED_RESOLVE: &str = "parsed-resolve";
    pub const DESCRIBED_RESOLVE: &str = "described-resolve";
    pub const RAW_FILE: &str = "raw-file";
    pub const FILE: &str = "file";
    pub const FINAL_FILE: &str = "final-file";
    pub const EXISTING_FILE: &str = "existing-file";
    pub const RESOLVED: &str = "resolved";
}

/// A callback tapped onto a stage.
#[async_trait]
pub trait Hook: Send + Sync {
    /// Hook name for logs and error messages.
    fn name(&self) -> &str;

    /// Handle `request`.
    ///
    /// Return `Ok(None)` to let the next hook (or the rest of resolution)
    /// handle it.
    async fn call(
        &self,
        resolver: &Resolver,
        request: &ResolveRequest,
        ctx: &ResolveContext,
    ) -> HookResult;
}

/// Something that installs hooks into a resolver.
pub trait ResolverPlugin {
    /// Tap this plugin's hooks onto `resolver`.
    fn apply(self, resolver: &mut Resolver);
}

/// The resolution pipeline.
pub struct Resolver {
    fs: Arc<dyn FileSystem>,
    hooks: HashMap<String, Vec<Arc<dyn Hook>>>,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut stages: Vec<_> = self.hooks.keys().collect();
        stages.sort();
        f.debug_struct("Resolver").field("stages", &stages).finish()
    }
}

impl Resolver {
    /// Create a resolver with no hooks over `fs`.
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            hooks: HashMap::default(),
        }
    }

    /// Filesystem hooks should read through.
    #[must_use]
    pub fn file_system(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    /// Join and normalize paths the way every hook should.
    #[must_use]
    pub fn join(&self, base: &Path, rel: impl AsRef<Path>) -> PathBuf {
        paths::join(base, rel)
    }

    /// Tap `hook` onto `stage`, after any hooks already there.
    pub fn tap(&mut self, stage: &str, hook: Arc<dyn Hook>) {
        tracing::trace!(stage, hook = hook.name(), "tapped hook");
        self.hooks.entry(stage.to_string()).or_default().push(hook);
    }

    /// Install a plugin.
    pub fn apply(&mut self, plugin: impl ResolverPlugin) -> &mut Self {
        plugin.apply(self);
        self
    }

    /// Names of the hooks on `stage`, in call order.
    #[must_use]
    pub fn hook_names(&self, stage: &str) -> Vec<&str> {
        self.hooks
            .get(stage)
            .map(|hooks| hooks.iter().map(|h| h.name()).collect())
            .unwrap_or_default()
    }

    /// Run `request` through `stage`.
    ///
    /// `message`, when given, is appended to the context's trace before any
    /// hook runs. The first hook that answers or fails decides the outcome;
    /// a stage with no hooks, or whose hooks all decline, yields `Ok(None)`.
    pub async fn do_resolve(
        &self,
        stage: &str,
        request: ResolveRequest,
        message: Option<&str>,
        ctx: &ResolveContext,
    ) -> HookResult {
        let ctx = ctx.enter(format!("{stage}: {}", request.describe()))?;

        if let Some(message) = message {
            tracing::debug!(stage, "{message}");
            ctx.log(ResolveTraceStep::new(stage, true, message));
        }

        let Some(hooks) = self.hooks.get(stage) else {
            return Ok(None);
        };

        for hook in hooks {
            tracing::trace!(
                stage,
                hook = hook.name(),
                request = %request.describe(),
                "calling hook"
            );
            if let Some(result) = hook.call(self, &request, &ctx).await? {
                return Ok(Some(result));
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Declines, counting calls.
    struct Pass {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Hook for Pass {
        fn name(&self) -> &str {
            "pass"
        }

        async fn call(&self, _: &Resolver, _: &ResolveRequest, _: &ResolveContext) -> HookResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }
    }

    /// Answers with the request it was given.
    struct Echo;

    #[async_trait]
    impl Hook for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn call(
            &self,
            _: &Resolver,
            request: &ResolveRequest,
            _: &ResolveContext,
        ) -> HookResult {
            Ok(Some(request.clone()))
        }
    }

    /// Always fails.
    struct Fail;

    #[async_trait]
    impl Hook for Fail {
        fn name(&self) -> &str {
            "fail"
        }

        async fn call(&self, _: &Resolver, _: &ResolveRequest, _: &ResolveContext) -> HookResult {
            Err(ResolveError::hook("fail", "boom"))
        }
    }

    /// Forwards every request to the same stage unchanged.
    struct Loop;

    #[async_trait]
    impl Hook for Loop {
        fn name(&self) -> &str {
            "loop"
        }

        async fn call(
            &self,
            resolver: &Resolver,
            request: &ResolveRequest,
            ctx: &ResolveContext,
        ) -> HookResult {
            resolver
                .do_resolve(stages::FILE, request.clone(), None, ctx)
                .await
        }
    }

    fn resolver() -> Resolver {
        Resolver::new(Arc::new(MemoryFileSystem::new()))
    }

    #[tokio::test]
    async fn test_empty_stage_yields_nothing() {
        let resolver = resolver();
        let result = resolver
            .do_resolve(stages::FILE, ResolveRequest::new("/a.js"), None, &ResolveContext::new())
            .await
            .unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_hooks_run_in_order_until_answered() {
        let first = Arc::new(Pass {
            calls: AtomicUsize::new(0),
        });
        let last = Arc::new(Pass {
            calls: AtomicUsize::new(0),
        });
        let mut resolver = resolver();
        resolver.tap(stages::FILE, first.clone());
        resolver.tap(stages::FILE, Arc::new(Echo));
        resolver.tap(stages::FILE, last.clone());

        assert_eq!(resolver.hook_names(stages::FILE), ["pass", "echo", "pass"]);

        let request = ResolveRequest::new("/a.js");
        let result = resolver
            .do_resolve(stages::FILE, request.clone(), None, &ResolveContext::new())
            .await
            .unwrap();

        assert_eq!(result, Some(request));
        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
        assert_eq!(last.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failure_stops_the_stage() {
        let mut resolver = resolver();
        resolver.tap(stages::FILE, Arc::new(Fail));
        resolver.tap(stages::FILE, Arc::new(Echo));

        let err = resolver
            .do_resolve(stages::FILE, ResolveRequest::new("/a.js"), None, &ResolveContext::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "[fail] boom");
    }

    #[tokio::test]
    async fn test_message_is_traced() {
        let resolver = resolver();
        let ctx = ResolveContext::new();
        resolver
            .do_resolve(stages::INTERNAL_RESOLVE, ResolveRequest::new("/a.js"), Some("hello"), &ctx)
            .await
            .unwrap();

        let trace = ctx.trace();
        assert_eq!(trace.steps.len(), 1);
        assert_eq!(trace.steps[0].stage, stages::INTERNAL_RESOLVE);
        assert_eq!(trace.steps[0].detail, "hello");
    }

    #[tokio::test]
    async fn test_recursion_is_detected() {
        let mut resolver = resolver();
        resolver.tap(stages::FILE, Arc::new(Loop));

        let err = resolver
            .do_resolve(stages::FILE, ResolveRequest::new("/a.js"), None, &ResolveContext::new())
            .await
            .unwrap_err();
        match err {
            ResolveError::Recursion { stack } => {
                assert_eq!(stack, ["file: (/a.js) ", "file: (/a.js) "]);
            }
            other => panic!("expected recursion, got {other:?}"),
        }
    }

    #[test]
    fn test_debug_lists_stages() {
        let mut resolver = resolver();
        resolver.tap(stages::FILE, Arc::new(Echo));
        assert_eq!(format!("{resolver:?}"), r#"Resolver { stages: ["file"] }"#);
    }
}
