use regex_lite::Regex;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

/// Name of the file that marks a package boundary.
pub const DESCRIPTION_FILE: &str = "package.json";

/// Find the package boundary by walking up from `start` looking for `package.json`.
///
/// Returns the first directory containing one, or `None` if none is found.
/// A relative `start` is searched only up to its first component; the empty
/// path is never returned.
#[must_use]
pub fn description_file_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        if current.as_os_str().is_empty() {
            return None;
        }

        if current.join(DESCRIPTION_FILE).is_file() {
            return Some(current);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Join `rel` onto `base` and normalize the result lexically.
///
/// An absolute `rel` replaces `base`. `.` segments are dropped and `..`
/// segments consume the preceding normal segment. Nothing touches the disk,
/// so symlinks are not followed.
#[must_use]
pub fn join(base: &Path, rel: impl AsRef<Path>) -> PathBuf {
    normalize(&base.join(rel))
}

/// Lexically normalize a path.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::Normal(_) => {
                out.push(component);
            }
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `..` at the root stays at the root
                Some(Component::RootDir | Component::Prefix(_)) => {}
                Some(Component::ParentDir | Component::CurDir) | None => {
                    out.push(component);
                }
            },
        }
    }

    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

fn node_modules_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"[/\\]node_modules[/\\]").ok())
        .as_ref()
}

/// Whether `path` has a `node_modules` segment with a separator on both sides.
///
/// Matching is case-sensitive and accepts either separator, so Windows-style
/// paths are recognized on every platform.
#[must_use]
pub fn is_in_node_modules(path: &Path) -> bool {
    node_modules_pattern().is_some_and(|re| re.is_match(&path.to_string_lossy()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_description_file_root_with_package_json() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("dist").join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();

        let root = description_file_root(&nested);
        assert_eq!(root, Some(dir.path().to_path_buf()));
    }

    #[test]
    fn test_description_file_root_prefers_nearest() {
        let dir = tempdir().unwrap();
        let inner = dir.path().join("packages").join("lib");
        let nested = inner.join("dist");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();
        fs::write(inner.join("package.json"), "{}").unwrap();

        assert_eq!(description_file_root(&nested), Some(inner));
    }

    #[test]
    fn test_description_file_root_ignores_directory_named_package_json() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a");
        fs::create_dir_all(nested.join("package.json")).unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();

        assert_eq!(
            description_file_root(&nested),
            Some(dir.path().to_path_buf())
        );
    }

    #[test]
    fn test_description_file_root_never_empty() {
        assert_eq!(description_file_root(Path::new("")), None);
        // walks "dist" then stops instead of probing the process cwd as ""
        assert_eq!(
            description_file_root(Path::new("tsref-no-such-dir/dist")),
            None
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_join_relative() {
        assert_eq!(join(Path::new("/proj"), "src"), PathBuf::from("/proj/src"));
        assert_eq!(
            join(Path::new("/proj"), "./build/out"),
            PathBuf::from("/proj/build/out")
        );
        assert_eq!(
            join(Path::new("/proj/pkg"), "../shared/src"),
            PathBuf::from("/proj/shared/src")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_join_absolute_replaces_base() {
        assert_eq!(join(Path::new("/proj"), "/other/src"), PathBuf::from("/other/src"));
    }

    #[cfg(unix)]
    #[test]
    fn test_join_trailing_slash_and_dots() {
        assert_eq!(join(Path::new("/proj"), "dist/"), PathBuf::from("/proj/dist"));
        assert_eq!(join(Path::new("/proj"), "."), PathBuf::from("/proj"));
        assert_eq!(join(Path::new("/proj/a"), "../.."), PathBuf::from("/"));
        assert_eq!(join(Path::new("/"), "../../x"), PathBuf::from("/x"));
    }

    #[test]
    fn test_normalize_relative() {
        assert_eq!(normalize(Path::new("a/../..")), PathBuf::from(".."));
        assert_eq!(normalize(Path::new("./")), PathBuf::from("."));
        assert_eq!(normalize(Path::new("../a/./b")), PathBuf::from("../a/b"));
    }

    #[test]
    fn test_is_in_node_modules() {
        assert!(is_in_node_modules(Path::new("/proj/node_modules/pkg")));
        assert!(is_in_node_modules(Path::new(
            "/proj/node_modules/.pnpm/pkg@1.0.0/node_modules/pkg"
        )));
        assert!(is_in_node_modules(Path::new(r"C:\proj\node_modules\pkg")));
        assert!(is_in_node_modules(Path::new(r"C:\proj/node_modules\pkg")));
    }

    #[test]
    fn test_is_not_in_node_modules() {
        assert!(!is_in_node_modules(Path::new("/proj/packages/pkg")));
        // needs a separator on both sides
        assert!(!is_in_node_modules(Path::new("/proj/node_modules")));
        assert!(!is_in_node_modules(Path::new("/proj/my_node_modules/pkg")));
        assert!(!is_in_node_modules(Path::new("/proj/node_modules_old/pkg")));
        // case-sensitive
        assert!(!is_in_node_modules(Path::new("/proj/Node_Modules/pkg")));
    }
}
