use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::session::SessionHandle;

pub const TOTAL_FILE: &str = "total.json";

/// Receives per-call token counts from the turn driver.
pub trait UsageSink: Send + Sync {
    fn record_usage(&self, session: Option<&SessionHandle>, input: u64, output: u64)
    -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageCounts {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

impl UsageCounts {
    fn add(&mut self, input: u64, output: u64) {
        self.input_tokens = self.input_tokens.saturating_add(input);
        self.output_tokens = self.output_tokens.saturating_add(output);
        self.total_tokens = self
            .total_tokens
            .saturating_add(input.saturating_add(output));
    }
}

/// Cumulative token counts on disk: one file for all sessions, one per session.
#[derive(Debug, Clone)]
pub struct MetricsStore {
    dir: PathBuf,
}

impl MetricsStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn session_file(&self, session: &SessionHandle) -> PathBuf {
        self.dir.join(format!("{}.json", session.stem()))
    }

    fn read_counts(path: &Path) -> UsageCounts {
        fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    fn bump(&self, path: &Path, input: u64, output: u64) -> Result<()> {
        let mut counts = Self::read_counts(path);
        counts.add(input, output);
        let json = serde_json::to_string_pretty(&counts)?;
        fs::write(path, json).with_context(|| format!("write metrics {}", path.display()))
    }

    pub fn total_usage(&self) -> UsageCounts {
        Self::read_counts(&self.dir.join(TOTAL_FILE))
    }

    pub fn session_usage(&self, session: &SessionHandle) -> UsageCounts {
        Self::read_counts(&self.session_file(session))
    }
}

impl UsageSink for MetricsStore {
    fn record_usage(
        &self,
        session: Option<&SessionHandle>,
        input: u64,
        output: u64,
    ) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create metrics dir {}", self.dir.display()))?;
        self.bump(&self.dir.join(TOTAL_FILE), input, output)?;
        if let Some(session) = session {
            self.bump(&self.session_file(session), input, output)?;
        }
        debug!(input, output, "recorded token usage");
        Ok(())
    }
}
