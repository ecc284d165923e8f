//! Lexical path helpers.

use std::path::{Component, Path, PathBuf};

/// Resolve `.` and `..` components without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Relative path that leads from directory `from` to `to`.
///
/// Both paths should be absolute (or both relative to the same directory).
pub fn relative_to(from: &Path, to: &Path) -> PathBuf {
    let from = normalize(from);
    let to = normalize(to);
    let from: Vec<_> = from.components().collect();
    let to: Vec<_> = to.components().collect();

    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for component in &from[common..] {
        if !matches!(component, Component::CurDir) {
            rel.push("..");
        }
    }
    for component in &to[common..] {
        rel.push(component.as_os_str());
    }
    if rel.as_os_str().is_empty() {
        rel.push(".");
    }
    rel
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("a/b/../c/./d", "a/c/d")]
    #[case("../x", "../x")]
    #[case("/a/../../b", "/b")]
    #[case("a/..", ".")]
    #[case("base/../upstream", "upstream")]
    fn normalize_collapses_dots(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize(Path::new(input)), PathBuf::from(expected));
    }

    #[rstest]
    #[case("/tmp/overlay", "/srv/app/base", "../../srv/app/base")]
    #[case("/srv/app", "/srv/app/base", "base")]
    #[case("/srv/app", "/srv/app", ".")]
    #[case("/srv/app/overlay", "/srv/app/base", "../base")]
    fn relative_paths(#[case] from: &str, #[case] to: &str, #[case] expected: &str) {
        assert_eq!(relative_to(Path::new(from), Path::new(to)), PathBuf::from(expected));
    }
}
