use thiserror::Error;

/// Longest file name accepted, in bytes.
pub const MAX_FILENAME_LEN: usize = 255;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct ValidationError {
    pub code: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Checks that a caller-supplied file name is a single, plain path component.
/// The name is used verbatim as object key and staging file name; it is
/// never rewritten.
pub fn validate_filename(filename: &str) -> Result<&str, ValidationError> {
    if filename.is_empty() {
        return Err(ValidationError::new(
            "INVALID_FILENAME",
            "Filename cannot be empty",
        ));
    }

    if filename.len() > MAX_FILENAME_LEN {
        return Err(ValidationError::new(
            "INVALID_FILENAME",
            format!("Filename exceeds {} bytes", MAX_FILENAME_LEN),
        ));
    }

    if filename == "." || filename == ".." || filename.contains('/') || filename.contains('\\')
    {
        tracing::warn!("Path traversal attempt detected: {:?}", filename);
        return Err(ValidationError::new(
            "INVALID_FILENAME",
            "Filename must not contain path components",
        ));
    }

    if filename.chars().any(char::is_control) {
        return Err(ValidationError::new(
            "INVALID_FILENAME",
            "Filename contains control characters",
        ));
    }

    Ok(filename)
}

/// A search term of at most one character counts as no file name at all.
pub fn is_blank_filename(filename: &str) -> bool {
    filename.chars().count() <= 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_filename_accepts_plain_names() {
        assert_eq!(validate_filename("report.pdf").unwrap(), "report.pdf");
        assert_eq!(validate_filename("my file.doc").unwrap(), "my file.doc");
        assert_eq!(validate_filename("测试_hindi.mp3").unwrap(), "测试_hindi.mp3");
        assert!(validate_filename("..hidden").is_ok());
    }

    #[test]
    fn test_validate_filename_rejects_traversal() {
        for name in ["", ".", "..", "../etc/passwd", "a/b.txt", "..\\windows", "/tmp/x"] {
            let err = validate_filename(name).unwrap_err();
            assert_eq!(err.code, "INVALID_FILENAME", "name: {:?}", name);
        }
    }

    #[test]
    fn test_validate_filename_rejects_control_and_long_names() {
        assert!(validate_filename("bad\nname.txt").is_err());
        assert!(validate_filename("nul\0.txt").is_err());
        assert!(validate_filename(&"a".repeat(MAX_FILENAME_LEN)).is_ok());
        assert!(validate_filename(&"a".repeat(MAX_FILENAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_is_blank_filename() {
        assert!(is_blank_filename(""));
        assert!(is_blank_filename("a"));
        assert!(is_blank_filename("é"));
        assert!(!is_blank_filename("ab"));
    }
}
