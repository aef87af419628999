use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to create session directory {path}: {source}")]
    CreateDirError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read session data: {0}")]
    ReadError(std::io::Error),
    #[error("Failed to write session data: {0}")]
    WriteError(std::io::Error),
    #[error("Failed to parse session line {line}: {source}")]
    ParseError {
        line: usize,
        source: serde_json::Error,
    },
    #[error("Failed to serialize message: {0}")]
    SerializeError(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_display() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error = SessionError::ParseError { line: 3, source };
        assert!(
            format!("{}", error).starts_with("Failed to parse session line 3: "),
            "{error}"
        );

        let error = SessionError::WriteError(std::io::Error::other("disk full"));
        assert_eq!(format!("{}", error), "Failed to write session data: disk full");
    }
}
