use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::ToolsConfig;
use crate::workspace::USER_MEMORY_FILE;

/// The tool collaborators the dispatcher calls into.
///
/// File tools are confined to `root`; the profile tool writes the long-term
/// memory file inside the workspace directory.
#[derive(Debug, Clone)]
pub struct Toolbox {
    pub(crate) root: PathBuf,
    pub(crate) memory_path: PathBuf,
    pub(crate) cfg: ToolsConfig,
    pub(crate) http: reqwest::Client,
}

impl Toolbox {
    pub fn new(root: &Path, workspace_dir: &Path, cfg: ToolsConfig) -> Result<Self> {
        let root = root
            .canonicalize()
            .with_context(|| format!("resolve project root {}", root.display()))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.browse_timeout_ms))
            .user_agent(concat!("personal-ai/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build http client")?;
        Ok(Self {
            root,
            memory_path: workspace_dir.join(USER_MEMORY_FILE),
            cfg,
            http,
        })
    }

    /// Display form of a path relative to the project root.
    pub(crate) fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .display()
            .to_string()
    }
}
