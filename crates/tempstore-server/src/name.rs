use std::fmt;

use crate::storage::StoreError;

/// Longest name most filesystems will accept for a single path component.
const MAX_NAME_BYTES: usize = 255;

/// A validated key in the store namespace.
///
/// Names are client-supplied, so anything that could escape the store
/// directory or collide with staging files is rejected outright rather
/// than rewritten.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileName(String);

impl FileName {
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        if raw.trim().is_empty() {
            return Err(StoreError::Validation("file name is empty".into()));
        }
        if raw == "." || raw == ".." {
            return Err(StoreError::Validation(format!(
                "'{raw}' is not a valid file name"
            )));
        }
        if raw.len() > MAX_NAME_BYTES {
            return Err(StoreError::Validation(format!(
                "file name exceeds {MAX_NAME_BYTES} bytes"
            )));
        }
        if raw.starts_with('.') {
            return Err(StoreError::Validation(
                "file names may not start with '.'".into(),
            ));
        }
        if let Some(c) = raw
            .chars()
            .find(|c| matches!(c, '/' | '\\') || c.is_control())
        {
            return Err(StoreError::Validation(format!(
                "file name contains forbidden character {c:?}"
            )));
        }

        Ok(Self(raw.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FileName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_names() {
        for name in ["a.txt", "photo.jpg", "report final (2).pdf", "名前.txt", "no-extension"] {
            let parsed = FileName::parse(name).unwrap();
            assert_eq!(parsed.as_str(), name);
        }
    }

    #[test]
    fn test_rejects_traversal() {
        for name in ["../etc/passwd", "a/b.txt", "..\\win.ini", "dir\\file", "..", "."] {
            assert!(
                matches!(FileName::parse(name), Err(StoreError::Validation(_))),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn test_rejects_empty_and_hidden() {
        assert!(matches!(FileName::parse(""), Err(StoreError::Validation(_))));
        assert!(matches!(FileName::parse("   "), Err(StoreError::Validation(_))));
        assert!(matches!(FileName::parse(".staging-abc"), Err(StoreError::Validation(_))));
        assert!(matches!(FileName::parse(".bashrc"), Err(StoreError::Validation(_))));
    }

    #[test]
    fn test_rejects_control_characters_and_long_names() {
        assert!(matches!(FileName::parse("a\0b"), Err(StoreError::Validation(_))));
        assert!(matches!(FileName::parse("a\nb"), Err(StoreError::Validation(_))));
        let long = "x".repeat(MAX_NAME_BYTES + 1);
        assert!(matches!(FileName::parse(&long), Err(StoreError::Validation(_))));
        let max = "x".repeat(MAX_NAME_BYTES);
        assert!(FileName::parse(&max).is_ok());
    }
}
