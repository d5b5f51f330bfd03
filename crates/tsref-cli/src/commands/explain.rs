use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tsref_core::resolver::ResolveTraceStep;
use tsref_core::version::EXPLAIN_SCHEMA_VERSION;
use tsref_core::{
    paths, stages, Config, Error, Hook, HookResult, PathRedirector, ResolveContext,
    ResolveRequest, Resolver, TokioFileSystem,
};

/// Explain result for JSON output.
#[derive(Debug, Serialize)]
struct ExplainResult {
    schema_version: u32,
    file: String,
    description_file_root: String,
    redirected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    file_dependencies: Vec<String>,
    missing_dependencies: Vec<String>,
    trace: Vec<ResolveTraceStep>,
}

/// Terminal hook on the target stage: reports the redirected request as-is
/// instead of resolving it further.
struct ReportTarget;

#[async_trait::async_trait]
impl Hook for ReportTarget {
    fn name(&self) -> &str {
        "report-target"
    }

    async fn call(&self, _: &Resolver, request: &ResolveRequest, _: &ResolveContext) -> HookResult {
        Ok(Some(request.clone()))
    }
}

/// Run the explain command.
///
/// Pushes `file` through the `file` stage of a resolver carrying only the
/// redirector, then reports where it went and what the decision read.
pub fn run(config: &Config, file: &Path, root: Option<&Path>, json: bool) -> Result<()> {
    let file = config.absolutize(file);
    let root = match root {
        Some(root) => config.absolutize(root),
        None => {
            let start = file.parent().unwrap_or(file.as_path());
            paths::description_file_root(start)
                .ok_or_else(|| Error::BoundaryNotFound {
                    start: start.to_path_buf(),
                })
                .into_diagnostic()?
        }
    };

    tracing::debug!(file = %file.display(), root = %root.display(), "explaining");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .into_diagnostic()?;
    let result = runtime.block_on(explain(&file, &root)).into_diagnostic()?;

    if json {
        let out = serde_json::to_string_pretty(&result).into_diagnostic()?;
        println!("{out}");
    } else {
        print_human(&result);
    }

    Ok(())
}

async fn explain(file: &Path, root: &Path) -> Result<ExplainResult, tsref_core::ResolveError> {
    let mut resolver = Resolver::new(Arc::new(TokioFileSystem));
    resolver.apply(PathRedirector::new());
    resolver.tap(stages::INTERNAL_RESOLVE, Arc::new(ReportTarget));

    let request = ResolveRequest::new(file).with_description_file_root(root);
    let ctx = ResolveContext::new();
    let outcome = resolver
        .do_resolve(stages::FILE, request, None, &ctx)
        .await?;

    let trace = ctx.trace();
    let declined = trace.steps.iter().find(|s| !s.ok);
    let code = declined.and_then(|s| s.code.clone());
    let reason = declined.map(|s| s.detail.clone());

    Ok(ExplainResult {
        schema_version: EXPLAIN_SCHEMA_VERSION,
        file: display(file),
        description_file_root: display(root),
        redirected: outcome.is_some(),
        target: outcome.and_then(|r| r.request),
        code,
        reason,
        file_dependencies: ctx.file_dependencies().iter().map(|p| display(p)).collect(),
        missing_dependencies: ctx
            .missing_dependencies()
            .iter()
            .map(|p| display(p))
            .collect(),
        trace: trace.steps,
    })
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

/// Print the explain result in human-readable format.
fn print_human(result: &ExplainResult) {
    println!("File: {}", result.file);
    println!("Package boundary: {}", result.description_file_root);
    println!();

    if let Some(ref target) = result.target {
        println!("Redirected: {target}");
    } else {
        println!("Status: NOT REDIRECTED");
        if let Some(ref code) = result.code {
            println!("Reason: {code}");
        }
        if let Some(ref reason) = result.reason {
            println!("Message: {reason}");
        }
    }
    println!();

    println!("Resolution trace:");
    for (i, step) in result.trace.iter().enumerate() {
        let status = if step.ok { "OK" } else { "SKIP" };
        println!("  {}. [{}] {}: {}", i + 1, status, step.stage, step.detail);
    }

    if !result.file_dependencies.is_empty() || !result.missing_dependencies.is_empty() {
        println!();
        println!("Depends on:");
        for path in &result.file_dependencies {
            println!("  file:    {path}");
        }
        for path in &result.missing_dependencies {
            println!("  missing: {path}");
        }
    }
}
