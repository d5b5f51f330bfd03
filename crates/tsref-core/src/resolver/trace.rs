//! Resolution log.
//!
//! Hooks append human-readable steps as they decide; hosts print the log
//! when explaining why a request ended up where it did.

use serde::Serialize;

/// A single step in the resolution trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolveTraceStep {
    /// Stage the step was taken on (e.g., "file", "internal-resolve").
    pub stage: String,
    /// Whether this step moved resolution forward
    pub ok: bool,
    /// Human-readable description of what happened
    pub detail: String,
    /// Machine-readable reason code, if the step has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ResolveTraceStep {
    /// Create a new trace step.
    pub fn new(stage: impl Into<String>, ok: bool, detail: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            ok,
            detail: detail.into(),
            code: None,
        }
    }

    /// Set the reason code for this step.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Complete resolution trace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolveTrace {
    /// Ordered list of resolution steps
    pub steps: Vec<ResolveTraceStep>,
}

impl ResolveTrace {
    /// Create a new empty trace.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a step to the trace.
    pub fn add_step(&mut self, step: ResolveTraceStep) {
        self.steps.push(step);
    }

    /// Whether any step carries `code`.
    #[must_use]
    pub fn has_code(&self, code: &str) -> bool {
        self.steps.iter().any(|s| s.code.as_deref() == Some(code))
    }
}
