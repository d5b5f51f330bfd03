//! Integration tests for the redirector against a real filesystem.
//!
//! These tests lay out workspaces on disk (including symlinked packages)
//! and drive the resolver through `TokioFileSystem`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tsref_core::{
    stages, Decision, DeclineReason, Hook, HookResult, PathRedirector, ResolveContext,
    ResolveRequest, Resolver, TokioFileSystem,
};

/// Answers the target stage with the request it receives.
struct Target;

#[async_trait::async_trait]
impl Hook for Target {
    fn name(&self) -> &str {
        "target"
    }

    async fn call(&self, _: &Resolver, request: &ResolveRequest, _: &ResolveContext) -> HookResult {
        Ok(Some(request.clone()))
    }
}

fn resolver() -> Resolver {
    let mut resolver = Resolver::new(Arc::new(TokioFileSystem));
    resolver.apply(PathRedirector::new());
    resolver.tap(stages::INTERNAL_RESOLVE, Arc::new(Target));
    resolver
}

/// Create a package at `dir` with a tsconfig and one built and one source file.
fn create_package(dir: &Path, tsconfig: &str) {
    fs::create_dir_all(dir.join("src")).unwrap();
    fs::create_dir_all(dir.join("dist")).unwrap();
    fs::write(dir.join("package.json"), r#"{ "name": "lib", "main": "dist/index.js" }"#).unwrap();
    fs::write(dir.join("tsconfig.json"), tsconfig).unwrap();
    fs::write(dir.join("src/index.ts"), "export const x = 1;\n").unwrap();
    fs::write(dir.join("dist/index.js"), "exports.x = 1;\n").unwrap();
}

const TSCONFIG: &str = r#"{
  // project reference target
  "compilerOptions": {
    "composite": true,
    "rootDir": "src",
    "outDir": "dist",
  },
}"#;

fn request(path: &Path, root: &Path) -> ResolveRequest {
    ResolveRequest::new(path).with_description_file_root(root)
}

#[tokio::test]
async fn test_redirects_built_file_in_plain_package() {
    let dir = TempDir::new().unwrap();
    let pkg = dir.path().join("packages/lib");
    create_package(&pkg, TSCONFIG);

    let ctx = ResolveContext::new();
    let result = resolver()
        .do_resolve(
            stages::FILE,
            request(&pkg.join("dist/index.js"), &pkg),
            None,
            &ctx,
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        result.request.map(PathBuf::from),
        Some(pkg.join("src").join("index.js"))
    );
    assert_eq!(result.path, Some(pkg.clone()));
    assert_eq!(ctx.file_dependencies(), vec![pkg.join("tsconfig.json")]);
}

#[tokio::test]
async fn test_missing_tsconfig_on_disk() {
    let dir = TempDir::new().unwrap();
    let pkg = dir.path().join("lib");
    fs::create_dir_all(pkg.join("dist")).unwrap();

    let ctx = ResolveContext::new();
    let result = resolver()
        .do_resolve(stages::FILE, request(&pkg.join("dist/a.js"), &pkg), None, &ctx)
        .await
        .unwrap();

    assert!(result.is_none());
    assert_eq!(ctx.missing_dependencies(), vec![pkg.join("tsconfig.json")]);
    assert!(ctx.trace().has_code("CONFIG_MISSING"));
}

#[tokio::test]
async fn test_missing_boundary_directory_declines() {
    let dir = TempDir::new().unwrap();
    let pkg = dir.path().join("gone");

    let ctx = ResolveContext::new();
    let decision = PathRedirector::new()
        .plan(&resolver(), &request(&pkg.join("dist/a.js"), &pkg), &ctx)
        .await;

    assert_eq!(decision, Decision::Decline(DeclineReason::LinkUnreadable));
    assert!(ctx.missing_dependencies().is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlinked_workspace_package_redirects() {
    let dir = TempDir::new().unwrap();
    let pkg = dir.path().join("packages/lib");
    create_package(&pkg, TSCONFIG);

    let app_modules = dir.path().join("app/node_modules");
    fs::create_dir_all(&app_modules).unwrap();
    let link = app_modules.join("lib");
    std::os::unix::fs::symlink("../../packages/lib", &link).unwrap();

    let ctx = ResolveContext::new();
    let decision = PathRedirector::new()
        .plan(&resolver(), &request(&link.join("dist/index.js"), &link), &ctx)
        .await;

    match decision {
        Decision::Redirect(redirect) => {
            assert_eq!(redirect.to, link.join("src").join("index.js"));
        }
        Decision::Decline(reason) => panic!("declined: {reason}"),
    }
    assert_eq!(ctx.file_dependencies(), vec![link.join("tsconfig.json")]);
}

#[cfg(unix)]
#[tokio::test]
async fn test_installed_package_is_left_alone() {
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("node_modules/.store/lib@1.0.0");
    create_package(&store, TSCONFIG);

    let vendor = dir.path().join("vendor");
    fs::create_dir_all(&vendor).unwrap();
    let link = vendor.join("lib");
    std::os::unix::fs::symlink(&store, &link).unwrap();

    let ctx = ResolveContext::new();
    let decision = PathRedirector::new()
        .plan(&resolver(), &request(&link.join("dist/index.js"), &link), &ctx)
        .await;

    assert_eq!(decision, Decision::Decline(DeclineReason::NodeModules));
    assert!(ctx.file_dependencies().is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn test_unreadable_tsconfig_is_ignored() {
    let dir = TempDir::new().unwrap();
    let pkg = dir.path().join("lib");
    create_package(&pkg, TSCONFIG);
    // a directory where the file should be cannot be read as a file
    fs::remove_file(pkg.join("tsconfig.json")).unwrap();
    fs::create_dir(pkg.join("tsconfig.json")).unwrap();

    let ctx = ResolveContext::new();
    let decision = PathRedirector::new()
        .plan(&resolver(), &request(&pkg.join("dist/index.js"), &pkg), &ctx)
        .await;

    assert_eq!(decision, Decision::Decline(DeclineReason::ConfigUnreadable));
    assert!(ctx.file_dependencies().is_empty());
    assert!(ctx.missing_dependencies().is_empty());
}
