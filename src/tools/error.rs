use thiserror::Error;

/// Failure of a single tool call. The dispatcher renders it as `Error: <message>`.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("unknown tool {0}")]
    UnknownTool(String),

    #[error("missing argument '{0}'")]
    MissingArgument(&'static str),

    #[error("invalid argument '{key}': expected {expected}")]
    InvalidArgument {
        key: &'static str,
        expected: &'static str,
    },

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("path must be under project root: {0}")]
    OutsideRoot(String),

    #[error("not a file or not found: {0}")]
    NotAFile(String),

    #[error("file too large (max {0} bytes)")]
    FileTooLarge(u64),

    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error("invalid regex pattern: {0}")]
    InvalidPattern(String),

    #[error("command timed out after {0}s")]
    Timeout(u64),

    #[error("provide 'updates' (object of key: value).")]
    MissingUpdates,

    #[error("no valid key: value pairs in 'updates'.")]
    NoValidUpdates,

    #[error("url is required.")]
    UrlRequired,

    #[error("invalid url.")]
    InvalidUrl,

    #[error("failed to load page: {0}")]
    PageLoad(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
