use chrono::Local;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, error};

use crate::llm::ChatMessage;
use crate::session::SessionError;

/// One conversation's append-only transcript file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    path: PathBuf,
}

impl SessionHandle {
    #[cfg(test)]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[cfg(test)]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// File name without extension, e.g. `session_2026-02-23T01-26-44`.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    pub(crate) root: PathBuf,
}

impl SessionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates (or reopens, within the same second) the session file for this run.
    pub fn start(&self) -> Result<SessionHandle, SessionError> {
        fs::create_dir_all(&self.root).map_err(|source| {
            error!(?source, "Failed to create session directory: {:?}", self.root);
            SessionError::CreateDirError {
                path: self.root.clone(),
                source,
            }
        })?;
        let ts = Local::now().format("%Y-%m-%dT%H-%M-%S");
        let path = self.root.join(format!("session_{ts}.jsonl"));
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(SessionError::WriteError)?;
        debug!(path = %path.display(), "session started");
        Ok(SessionHandle { path })
    }

    /// Reads the transcript back in order. A missing file is an empty history.
    pub fn load_history(&self, handle: &SessionHandle) -> Result<Vec<ChatMessage>, SessionError> {
        let text = match fs::read_to_string(&handle.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(SessionError::ReadError(e)),
        };
        text.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line)
                    .map_err(|source| SessionError::ParseError { line: i + 1, source })
            })
            .collect()
    }

    pub fn append_messages(
        &self,
        handle: &SessionHandle,
        messages: &[ChatMessage],
    ) -> Result<(), SessionError> {
        if messages.is_empty() {
            return Ok(());
        }
        let mut buf = String::new();
        for m in messages {
            buf.push_str(&serde_json::to_string(m)?);
            buf.push('\n');
        }
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&handle.path)
            .map_err(SessionError::WriteError)?;
        f.write_all(buf.as_bytes()).map_err(|e| {
            error!(?e, "Failed to append to session file: {:?}", handle.path);
            SessionError::WriteError(e)
        })
    }
}
