//! Name validation for entries created in shared storage
//!
//! Shared storage on mobile devices is usually FAT-derived, so the
//! forbidden set matches what those filesystems reject.

use crate::{FsError, Result};

/// Characters rejected in a single path component
const FORBIDDEN_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Longest component most shared-storage filesystems accept (bytes)
pub const MAX_NAME_BYTES: usize = 255;

/// Longest prefix of `name` that fits in `max_bytes`, cut on a char boundary
pub fn truncate_name(name: &str, max_bytes: usize) -> &str {
    if name.len() <= max_bytes {
        return name;
    }

    let mut cut = max_bytes;
    while !name.is_char_boundary(cut) {
        cut -= 1;
    }
    &name[..cut]
}

/// Replace characters that cannot appear in a component with `_`.
/// Used for names the façade generates itself (e.g. trash entries).
pub fn sanitize_name(name: &str) -> String {
    let mut result: String = name
        .chars()
        .map(|c| if c.is_control() || FORBIDDEN_CHARS.contains(&c) { '_' } else { c })
        .collect();

    while result.ends_with(' ') || result.ends_with('.') {
        result.pop();
    }

    let keep = truncate_name(&result, MAX_NAME_BYTES).len();
    result.truncate(keep);

    if result.is_empty() {
        result = "_unnamed".to_string();
    }

    result
}

/// Check a user-supplied component name
pub fn is_valid_name(name: &str) -> bool {
    validate_name(name).is_ok()
}

/// Validate a user-supplied component name, naming the problem on failure
pub fn validate_name(name: &str) -> Result<()> {
    let reason = if name.trim().is_empty() {
        Some("name is empty")
    } else if name == "." || name == ".." {
        Some("name is reserved")
    } else if name.chars().any(|c| c.is_control() || FORBIDDEN_CHARS.contains(&c)) {
        Some("name contains a forbidden character")
    } else if name.len() > MAX_NAME_BYTES {
        Some("name is too long")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(FsError::InvalidPath(format!("{:?}: {}", name, reason))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_separators() {
        assert_eq!(sanitize_name("a/b\\c"), "a_b_c");
        assert_eq!(sanitize_name("what?.txt"), "what_.txt");
    }

    #[test]
    fn test_sanitize_trailing_and_empty() {
        assert_eq!(sanitize_name("report. "), "report");
        assert_eq!(sanitize_name("..."), "_unnamed");
    }

    #[test]
    fn test_sanitize_truncates_on_char_boundary() {
        let long = "あ".repeat(100);
        let sanitized = sanitize_name(&long);
        assert!(sanitized.len() <= MAX_NAME_BYTES);
        assert!(sanitized.chars().all(|c| c == 'あ'));
    }

    #[test]
    fn test_truncate_name() {
        assert_eq!(truncate_name("short.txt", 255), "short.txt");
        assert_eq!(truncate_name("abcdef", 3), "abc");
        assert_eq!(truncate_name("aあ", 2), "a");
    }

    #[test]
    fn test_validate() {
        assert!(is_valid_name("Holiday Photos"));
        assert!(is_valid_name(".nomedia"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name(".."));
        assert!(!is_valid_name("a/b"));
        assert!(!is_valid_name("tab\there"));
    }
}
