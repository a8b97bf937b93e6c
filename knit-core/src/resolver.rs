//! Module specifier resolution.
//!
//! A module key is a root-relative path string such as `./src/a.js`. It is
//! the identity of a module in the graph and the literal embedded in
//! rewritten load calls, so every specifier naming the same file must map to
//! the same key.

use std::path::{Component, Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{BuildError, Result};

/// Directory that bare package specifiers resolve into.
pub const PACKAGE_DIR: &str = "node_modules";

/// Package references: `lodash`, `$jquery`, `_private`.
static BARE_SPECIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z$_][A-Za-z0-9_]*$").expect("bare specifier pattern"));

/// Check whether a specifier is a bare package reference.
pub fn is_bare_specifier(specifier: &str) -> bool {
    BARE_SPECIFIER.is_match(specifier)
}

/// Resolve an import specifier to a canonical module key.
///
/// `importer_dir` is the directory of the importing module, either relative
/// to `root` (a key directory such as `./src`) or absolute.
///
/// Bare identifiers resolve to `./node_modules/<name>` regardless of the
/// importer. Everything else is resolved lexically against `importer_dir`
/// and expressed relative to `root`, with `.js` appended when the last
/// path segment has no extension.
pub fn resolve_specifier(importer_dir: &Path, specifier: &str, root: &Path) -> String {
    if is_bare_specifier(specifier) {
        return format!("./{}/{}", PACKAGE_DIR, specifier);
    }

    let spec_path = Path::new(specifier);
    let target = if spec_path.is_absolute() {
        normalize_path(spec_path)
    } else {
        normalize_path(&root.join(importer_dir).join(spec_path))
    };
    let relative = relative_path(&normalize_path(root), &target);

    let mut key = path_to_key(&relative);
    if needs_js_extension(specifier) {
        key.push_str(".js");
    }
    key
}

/// Directory part of a module key, used as the importer directory of the
/// module's own dependencies.
///
/// This is the key's parent even when the key was completed to an
/// `index.js`: `./node_modules/lodash` resolves its own `./util` against
/// `./node_modules`, not `./node_modules/lodash`. Relative requires inside
/// packages are therefore not supported.
pub fn key_dir(key: &str) -> &str {
    match key.rfind('/') {
        Some(0) => "/",
        Some(idx) => &key[..idx],
        None => ".",
    }
}

/// Map a module key to the concrete file that backs it.
///
/// Keys ending in `.js` name their file directly. Keys with another extension
/// are used as-is when that file exists. Otherwise `<key>.js` and then
/// `<key>/index.js` are probed, first existing file wins. Directory keys
/// (`.`, `./..`) only probe `index.js`, so the root itself never becomes
/// `<root>.js` next to the project.
pub fn complete_file_path(root: &Path, key: &str) -> Result<PathBuf> {
    let base = normalize_path(&root.join(key));

    if key.ends_with(".js") {
        return if base.is_file() {
            Ok(base)
        } else {
            Err(unresolved(key))
        };
    }

    if !is_directory_key(key) {
        if Path::new(key).extension().is_some() && base.is_file() {
            return Ok(base);
        }

        let with_ext = normalize_path(&root.join(format!("{}.js", key)));
        if with_ext.is_file() {
            return Ok(with_ext);
        }
    }

    let index = base.join("index.js");
    if index.is_file() {
        return Ok(index);
    }

    Err(unresolved(key))
}

fn is_directory_key(key: &str) -> bool {
    key.ends_with('/')
        || matches!(
            Path::new(key).components().next_back(),
            None | Some(Component::CurDir) | Some(Component::ParentDir)
        )
}

fn unresolved(key: &str) -> BuildError {
    BuildError::Resolution {
        key: key.to_string(),
        specifier: key.to_string(),
        importer: None,
    }
}

/// Directory-like specifiers (`.`, `..`, `./lib/`) are completed by probing
/// for `index.js`, so they never get an extension appended.
fn needs_js_extension(specifier: &str) -> bool {
    if specifier.ends_with('/') || specifier.ends_with('\\') {
        return false;
    }
    match Path::new(specifier).components().next_back() {
        Some(Component::Normal(segment)) => Path::new(segment).extension().is_none(),
        _ => false,
    }
}

/// Collapse `.` and `..` components without touching the filesystem.
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let mut out: Vec<Component> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out.iter().map(|c| c.as_os_str()).collect()
}

/// Path of `target` relative to `base`; both must already be normalized.
fn relative_path(base: &Path, target: &Path) -> PathBuf {
    let base: Vec<Component> = base.components().collect();
    let target: Vec<Component> = target.components().collect();

    let common = base
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..base.len() {
        relative.push("..");
    }
    for component in &target[common..] {
        relative.push(component.as_os_str());
    }
    relative
}

/// Render a relative path as a key: `./` prefix and `/` separators.
fn path_to_key(relative: &Path) -> String {
    let segments: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if segments.is_empty() {
        ".".to_string()
    } else {
        format!("./{}", segments.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn root() -> PathBuf {
        PathBuf::from("/project")
    }

    #[test]
    fn test_bare_specifier_grammar() {
        assert!(is_bare_specifier("lodash"));
        assert!(is_bare_specifier("$"));
        assert!(is_bare_specifier("_under_score1"));
        assert!(!is_bare_specifier("./lodash"));
        assert!(!is_bare_specifier("/abs"));
        assert!(!is_bare_specifier("lodash/fp"));
        assert!(!is_bare_specifier("1abc"));
        assert!(!is_bare_specifier("lodash-es"));
        assert!(!is_bare_specifier(""));
    }

    #[test]
    fn test_package_key_ignores_importer() {
        let a = resolve_specifier(Path::new("./src"), "lodash", &root());
        let b = resolve_specifier(Path::new("./src/deep/er"), "lodash", &root());
        assert_eq!(a, "./node_modules/lodash");
        assert_eq!(a, b);
    }

    #[test]
    fn test_relative_specifiers() {
        assert_eq!(
            resolve_specifier(Path::new("./src"), "./a", &root()),
            "./src/a.js"
        );
        assert_eq!(
            resolve_specifier(Path::new("./src"), "./a.js", &root()),
            "./src/a.js"
        );
        assert_eq!(
            resolve_specifier(Path::new("./src/lib"), "../util/x", &root()),
            "./src/util/x.js"
        );
        assert_eq!(
            resolve_specifier(Path::new("./src"), "./data.json", &root()),
            "./src/data.json"
        );
    }

    #[test]
    fn test_entry_anchored_at_root() {
        assert_eq!(
            resolve_specifier(&root(), "./src/index.js", &root()),
            "./src/index.js"
        );
        assert_eq!(
            resolve_specifier(Path::new("."), "src/index", &root()),
            "./src/index.js"
        );
    }

    #[test]
    fn test_absolute_specifier_made_relative() {
        assert_eq!(
            resolve_specifier(Path::new("./src"), "/project/lib/x", &root()),
            "./lib/x.js"
        );
        assert_eq!(
            resolve_specifier(Path::new("./src"), "/elsewhere/y.js", &root()),
            "./../elsewhere/y.js"
        );
    }

    #[test]
    fn test_directory_specifiers_keep_no_extension() {
        assert_eq!(resolve_specifier(Path::new("./src"), ".", &root()), "./src");
        assert_eq!(resolve_specifier(Path::new("./src"), "..", &root()), ".");
        assert_eq!(
            resolve_specifier(Path::new("./src"), "./lib/", &root()),
            "./src/lib"
        );
    }

    #[test]
    fn test_key_dir() {
        assert_eq!(key_dir("./src/index.js"), "./src");
        assert_eq!(key_dir("./index.js"), ".");
        assert_eq!(key_dir("./node_modules/lodash"), "./node_modules");
        assert_eq!(key_dir("index.js"), ".");
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(Path::new("/a/./b/../c")),
            PathBuf::from("/a/c")
        );
        assert_eq!(normalize_path(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(normalize_path(Path::new("../a")), PathBuf::from("../a"));
    }

    #[test]
    fn test_complete_file_path_probe_order() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let root = dir.path();
        fs::create_dir_all(root.join("node_modules/lodash")).unwrap();
        fs::write(root.join("node_modules/lodash/index.js"), "module.exports = 1;").unwrap();
        fs::create_dir_all(root.join("node_modules/both")).unwrap();
        fs::write(root.join("node_modules/both.js"), "").unwrap();
        fs::write(root.join("node_modules/both/index.js"), "").unwrap();
        fs::write(root.join("main.js"), "").unwrap();
        fs::write(root.join("data.json"), "{}").unwrap();

        assert_eq!(
            complete_file_path(root, "./node_modules/lodash").unwrap(),
            root.join("node_modules/lodash/index.js")
        );
        assert_eq!(
            complete_file_path(root, "./node_modules/both").unwrap(),
            root.join("node_modules/both.js")
        );
        assert_eq!(
            complete_file_path(root, "./main.js").unwrap(),
            root.join("main.js")
        );
        assert_eq!(
            complete_file_path(root, "./data.json").unwrap(),
            root.join("data.json")
        );
    }

    #[test]
    fn test_complete_file_path_missing() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let err = complete_file_path(dir.path(), "./src/a.js").unwrap_err();
        match err {
            BuildError::Resolution { key, .. } => assert_eq!(key, "./src/a.js"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(complete_file_path(dir.path(), "./node_modules/nope").is_err());
    }

    #[test]
    fn test_parent_specifier_stays_inside_root() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let root = dir.path().join("proj");
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(dir.path().join("proj.js"), "module.exports = 'outside';").unwrap();

        let key = resolve_specifier(Path::new("./src"), "..", &root);
        assert_eq!(key, ".");
        assert!(complete_file_path(&root, &key).is_err());

        fs::write(root.join("index.js"), "").unwrap();
        assert_eq!(
            complete_file_path(&root, &key).unwrap(),
            root.join("index.js")
        );
    }

    #[test]
    fn test_directory_keys() {
        assert!(is_directory_key("."));
        assert!(is_directory_key("./.."));
        assert!(is_directory_key("./lib/"));
        assert!(!is_directory_key("./lib"));
        assert!(!is_directory_key("./node_modules/lodash"));
    }
}
