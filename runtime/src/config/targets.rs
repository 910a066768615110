//! Target list files for batch runs.

use crate::error::ConfigError;
use std::path::Path;
use tracing::warn;

/// Read a target list: one domain per line, `#` comments and blank lines ignored.
pub fn parse_target_list(path: &Path) -> Result<Vec<String>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::TargetList {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut targets = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        match sanitize_target(trimmed) {
            Some(target) => targets.push(target),
            None => warn!(line = idx + 1, "skipping invalid target {trimmed:?}"),
        }
    }

    if targets.is_empty() {
        return Err(ConfigError::TargetList {
            path: path.to_path_buf(),
            reason: "no valid targets".into(),
        });
    }
    Ok(targets)
}

/// Strip a scheme and trailing slash. Anything shorter than 3 chars is rejected.
pub fn sanitize_target(raw: &str) -> Option<String> {
    let target = raw.trim();
    let target = target
        .strip_prefix("http://")
        .or_else(|| target.strip_prefix("https://"))
        .unwrap_or(target);
    let target = target.strip_suffix('/').unwrap_or(target);
    (target.len() >= 3).then(|| target.to_string())
}

/// Directory-friendly name for a target: the first label, wildcards skipped.
pub fn target_dir_name(target: &str) -> String {
    let base = target.strip_prefix("*.").unwrap_or(target);
    let first = base.split('.').next().filter(|s| !s.is_empty()).unwrap_or(base);
    first
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' => '_',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_list(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("targets.txt");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_comments_blanks_and_whitespace() {
        let (_dir, path) = write_list(
            "# Main targets\n  example.com  \n\n*.bugcrowd.com\n# trailing\ngithub.com",
        );
        assert_eq!(
            parse_target_list(&path).unwrap(),
            vec!["example.com", "*.bugcrowd.com", "github.com"]
        );
    }

    #[test]
    fn test_protocols_and_slashes_stripped() {
        let (_dir, path) = write_list("https://example.com\nhttp://google.com\ngithub.com/\n");
        assert_eq!(
            parse_target_list(&path).unwrap(),
            vec!["example.com", "google.com", "github.com"]
        );
    }

    #[test]
    fn test_empty_and_comment_only_lists_fail() {
        let (_dir, path) = write_list("\n\n   \n");
        assert!(parse_target_list(&path).is_err());

        let (_dir, path) = write_list("# one\n# two");
        assert!(parse_target_list(&path).is_err());
    }

    #[test]
    fn test_short_targets_skipped() {
        let (_dir, path) = write_list("ab\nexample.com\n");
        assert_eq!(parse_target_list(&path).unwrap(), vec!["example.com"]);
    }

    #[test]
    fn test_missing_file() {
        let err = parse_target_list(Path::new("/definitely/not/here.txt")).unwrap_err();
        assert!(matches!(err, ConfigError::TargetList { .. }));
    }

    #[test]
    fn test_target_dir_name() {
        assert_eq!(target_dir_name("example.com"), "example");
        assert_eq!(target_dir_name("*.bugcrowd.com"), "bugcrowd");
        assert_eq!(target_dir_name("host:8080"), "host_8080");
    }
}
