use super::trace::{ResolveTrace, ResolveTraceStep};
use super::ResolveError;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Append-only record of the paths a resolution decision depended on.
///
/// Hosts use the recorded paths for cache invalidation: a change to a file
/// dependency, or the appearance of a missing one, invalidates the decision.
/// Insertion order carries no meaning.
pub trait DependencyTracker: Send + Sync {
    /// The decision depended on the contents of `path`.
    fn record_file_dependency(&self, path: &Path);

    /// The decision depended on `path` not existing.
    fn record_missing_dependency(&self, path: &Path);
}

#[derive(Debug, Default)]
struct Dependencies {
    files: Mutex<BTreeSet<PathBuf>>,
    missing: Mutex<BTreeSet<PathBuf>>,
}

/// Per-resolution context shared by every hook along one resolution.
///
/// Clones share the dependency sets and the trace, so hooks running
/// concurrently against the same context all feed one record. The stack is
/// per chain: [`Resolver::do_resolve`](super::Resolver::do_resolve) hands
/// each nested call its own extended copy.
#[derive(Debug, Clone, Default)]
pub struct ResolveContext {
    dependencies: Arc<Dependencies>,
    trace: Arc<Mutex<ResolveTrace>>,
    stack: Vec<String>,
}

impl ResolveContext {
    /// Create an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded file dependencies, sorted.
    #[must_use]
    pub fn file_dependencies(&self) -> Vec<PathBuf> {
        lock(&self.dependencies.files).iter().cloned().collect()
    }

    /// Snapshot of recorded missing dependencies, sorted.
    #[must_use]
    pub fn missing_dependencies(&self) -> Vec<PathBuf> {
        lock(&self.dependencies.missing).iter().cloned().collect()
    }

    /// Snapshot of the trace.
    #[must_use]
    pub fn trace(&self) -> ResolveTrace {
        lock(&self.trace).clone()
    }

    /// Append a step to the shared trace.
    pub fn log(&self, step: ResolveTraceStep) {
        lock(&self.trace).add_step(step);
    }

    /// Stack entries of the current chain, outermost first.
    #[must_use]
    pub fn stack(&self) -> &[String] {
        &self.stack
    }

    /// Child context for a nested resolution identified by `entry`.
    ///
    /// Fails when `entry` is already on the stack, which means resolution
    /// would loop forever.
    pub(crate) fn enter(&self, entry: String) -> Result<Self, ResolveError> {
        if self.stack.contains(&entry) {
            let mut stack = self.stack.clone();
            stack.push(entry);
            return Err(ResolveError::Recursion { stack });
        }

        let mut child = self.clone();
        child.stack.push(entry);
        Ok(child)
    }
}

impl DependencyTracker for ResolveContext {
    fn record_file_dependency(&self, path: &Path) {
        lock(&self.dependencies.files).insert(path.to_path_buf());
    }

    fn record_missing_dependency(&self, path: &Path) {
        lock(&self.dependencies.missing).insert(path.to_path_buf());
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
