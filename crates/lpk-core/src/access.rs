//! Per-unit asset access control.
//!
//! A unit may read an asset only if its normalized path equals one of the
//! unit's permitted patterns, or starts with a pattern that ends in `/`.
//! Nothing else grants access.

use lpk_schema::LearningUnit;

/// Normalize a package-relative asset path.
///
/// Empty and `.` segments are dropped and `..` pops the previous segment.
/// Returns `None` for paths that are absolute, contain a backslash or NUL,
/// are empty after normalization, or climb above the package root.
pub fn normalize_asset_path(path: &str) -> Option<String> {
    if path.starts_with('/') || path.contains('\\') || path.contains('\0') {
        return None;
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        return None;
    }
    let mut normalized = segments.join("/");
    // A trailing slash names a directory; keep it so it never equals a file pattern.
    if path.ends_with('/') {
        normalized.push('/');
    }
    Some(normalized)
}

/// Whether one permitted pattern admits an already-normalized path.
pub fn pattern_allows(pattern: &str, path: &str) -> bool {
    if pattern.is_empty() {
        return false;
    }
    path == pattern || (pattern.ends_with('/') && path.starts_with(pattern))
}

/// Whether `unit` may read `requested_path`.
pub fn is_asset_accessible(unit: &LearningUnit, requested_path: &str) -> bool {
    let Some(path) = normalize_asset_path(requested_path) else {
        return false;
    };
    unit.permitted_assets
        .iter()
        .any(|pattern| pattern_allows(pattern, &path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lpk_schema::{PackageId, UnitId};

    fn unit(patterns: &[&str]) -> LearningUnit {
        LearningUnit::new(
            PackageId::new("com.example.unit").unwrap(),
            UnitId::new("u1"),
            "i.png",
            patterns.iter().map(ToString::to_string).collect(),
        )
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_asset_path("a/./b//c").as_deref(), Some("a/b/c"));
        assert_eq!(normalize_asset_path("a/x/../b").as_deref(), Some("a/b"));
        assert_eq!(normalize_asset_path("assets/").as_deref(), Some("assets/"));
        assert_eq!(normalize_asset_path("../etc/passwd"), None);
        assert_eq!(normalize_asset_path("a/../../b"), None);
        assert_eq!(normalize_asset_path("/etc/passwd"), None);
        assert_eq!(normalize_asset_path("a\\b"), None);
        assert_eq!(normalize_asset_path("."), None);
        assert_eq!(normalize_asset_path(""), None);
    }

    #[test]
    fn test_directory_prefix_and_exact_match() {
        let u = unit(&["assets/", "data/level1.json"]);
        assert!(is_asset_accessible(&u, "assets/icon.png"));
        assert!(is_asset_accessible(&u, "assets/deep/nested/file.mp3"));
        assert!(is_asset_accessible(&u, "data/level1.json"));
        assert!(!is_asset_accessible(&u, "data/level2.json"));
        assert!(!is_asset_accessible(&u, "secrets/key.txt"));
    }

    #[test]
    fn test_prefix_requires_separator() {
        let u = unit(&["assets/", "data"]);
        assert!(!is_asset_accessible(&u, "assets-private/key.txt"));
        assert!(!is_asset_accessible(&u, "data/file.json"));
        assert!(is_asset_accessible(&u, "data"));
    }

    #[test]
    fn test_traversal_is_denied() {
        let u = unit(&["assets/"]);
        assert!(!is_asset_accessible(&u, "assets/../secrets/key.txt"));
        assert!(!is_asset_accessible(&u, "../assets/icon.png"));
        assert!(is_asset_accessible(&u, "assets/sub/../icon.png"));
    }

    #[test]
    fn test_no_patterns_no_access() {
        let u = unit(&[]);
        assert!(!is_asset_accessible(&u, "i.png"));
        assert!(!pattern_allows("", "i.png"));
    }
}
