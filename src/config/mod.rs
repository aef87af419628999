use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::Cli;
use crate::llm::DEFAULT_MAX_TOOL_ROUNDS;

pub const PROJECT_CONFIG_DIR: &str = ".pai";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub project_root: PathBuf,
    pub workspace_dir: PathBuf,
    pub llm: LlmConfig,
    pub tools: ToolsConfig,
    // 0 disables the ceiling
    pub max_tool_rounds: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LlmConfig {
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5_000,
            request_timeout_ms: 600_000, // 10 minutes
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ToolsConfig {
    pub max_file_size: u64,
    pub exec_timeout_secs: u64,
    pub search_max_results: usize,
    pub browse_timeout_ms: u64,
    pub browse_default_wait_ms: u64,
    pub browse_max_text_chars: usize,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            max_file_size: 512 * 1024,
            exec_timeout_secs: 60,
            search_max_results: 50,
            browse_timeout_ms: 30_000,
            browse_default_wait_ms: 2_000,
            browse_max_text_chars: 80_000,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub project_root: Option<PathBuf>,
    pub workspace_dir: Option<PathBuf>,
    pub max_tool_rounds: Option<usize>,
    pub llm: Option<PartialLlmConfig>,
    pub tools: Option<PartialToolsConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PartialLlmConfig {
    pub connect_timeout_ms: Option<u64>,
    pub request_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PartialToolsConfig {
    pub max_file_size: Option<u64>,
    pub exec_timeout_secs: Option<u64>,
    pub search_max_results: Option<usize>,
    pub browse_timeout_ms: Option<u64>,
    pub browse_default_wait_ms: Option<u64>,
    pub browse_max_text_chars: Option<usize>,
}

impl PartialLlmConfig {
    /// Field-wise merge; `self` wins.
    fn or(self, other: Self) -> Self {
        Self {
            connect_timeout_ms: self.connect_timeout_ms.or(other.connect_timeout_ms),
            request_timeout_ms: self.request_timeout_ms.or(other.request_timeout_ms),
        }
    }

    fn resolve(self) -> LlmConfig {
        let d = LlmConfig::default();
        LlmConfig {
            connect_timeout_ms: self.connect_timeout_ms.unwrap_or(d.connect_timeout_ms),
            request_timeout_ms: self.request_timeout_ms.unwrap_or(d.request_timeout_ms),
        }
    }
}

impl PartialToolsConfig {
    fn or(self, other: Self) -> Self {
        Self {
            max_file_size: self.max_file_size.or(other.max_file_size),
            exec_timeout_secs: self.exec_timeout_secs.or(other.exec_timeout_secs),
            search_max_results: self.search_max_results.or(other.search_max_results),
            browse_timeout_ms: self.browse_timeout_ms.or(other.browse_timeout_ms),
            browse_default_wait_ms: self.browse_default_wait_ms.or(other.browse_default_wait_ms),
            browse_max_text_chars: self.browse_max_text_chars.or(other.browse_max_text_chars),
        }
    }

    fn resolve(self) -> ToolsConfig {
        let d = ToolsConfig::default();
        ToolsConfig {
            max_file_size: self.max_file_size.unwrap_or(d.max_file_size),
            exec_timeout_secs: self.exec_timeout_secs.unwrap_or(d.exec_timeout_secs),
            search_max_results: self.search_max_results.unwrap_or(d.search_max_results),
            browse_timeout_ms: self.browse_timeout_ms.unwrap_or(d.browse_timeout_ms),
            browse_default_wait_ms: self
                .browse_default_wait_ms
                .unwrap_or(d.browse_default_wait_ms),
            browse_max_text_chars: self
                .browse_max_text_chars
                .unwrap_or(d.browse_max_text_chars),
        }
    }
}

fn non_blank(v: String) -> Option<String> {
    let v = v.trim();
    if v.is_empty() {
        None
    } else {
        Some(v.to_string())
    }
}

/// Filter directive for the tracing subscriber. Settled before any config
/// file is read so that loading them is itself logged.
pub fn log_level(cli: &Cli, env: impl Fn(&str) -> Option<String>) -> String {
    cli.log_level
        .clone()
        .or_else(|| env("RUST_LOG").and_then(non_blank))
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
}

impl AppConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("resolve current dir")?;
        let project_cfg = load_project_config(&cwd).unwrap_or_default();
        let file_cfg = load_file_config().unwrap_or_default();
        Ok(Self::resolve(
            cli,
            |key| std::env::var(key).ok(),
            project_cfg,
            file_cfg,
            cwd,
        ))
    }

    /// Layers CLI flags over environment, project file, global file and
    /// defaults, in that order.
    pub fn resolve(
        cli: &Cli,
        env: impl Fn(&str) -> Option<String>,
        project_cfg: FileConfig,
        file_cfg: FileConfig,
        cwd: PathBuf,
    ) -> Self {
        let env = |key: &str| env(key).and_then(non_blank);

        let api_key = cli
            .api_key
            .clone()
            .or_else(|| env("LLM_API_KEY"))
            .or_else(|| env("GEMINI_API_KEY"))
            .or(project_cfg.api_key)
            .or(file_cfg.api_key);
        let base_url = cli
            .base_url
            .clone()
            .or_else(|| env("LLM_BASE_URL"))
            .or(project_cfg.base_url)
            .or(file_cfg.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let model = cli
            .model
            .clone()
            .or_else(|| env("LLM_MODEL"))
            .or(project_cfg.model)
            .or(file_cfg.model)
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let project_root = project_cfg
            .project_root
            .or(file_cfg.project_root)
            .unwrap_or(cwd);
        let workspace_dir = cli
            .workspace
            .clone()
            .or_else(|| env("WORKSPACE_PATH").map(PathBuf::from))
            .or(project_cfg.workspace_dir)
            .or(file_cfg.workspace_dir)
            .unwrap_or_else(|| project_root.join("workspace"));
        let workspace_dir = if workspace_dir.is_absolute() {
            workspace_dir
        } else {
            project_root.join(workspace_dir)
        };

        let max_tool_rounds = cli
            .max_tool_rounds
            .or_else(|| {
                let raw = env("PAI_MAX_TOOL_ROUNDS")?;
                raw.parse::<usize>()
                    .inspect_err(|e| warn!(value = %raw, error = %e, "ignoring PAI_MAX_TOOL_ROUNDS"))
                    .ok()
            })
            .or(project_cfg.max_tool_rounds)
            .or(file_cfg.max_tool_rounds)
            .unwrap_or(DEFAULT_MAX_TOOL_ROUNDS);

        let llm = project_cfg
            .llm
            .unwrap_or_default()
            .or(file_cfg.llm.unwrap_or_default())
            .resolve();
        let tools = project_cfg
            .tools
            .unwrap_or_default()
            .or(file_cfg.tools.unwrap_or_default())
            .resolve();

        Self {
            base_url,
            model,
            api_key,
            project_root,
            workspace_dir,
            llm,
            tools,
            max_tool_rounds,
        }
    }
}

fn parse_config_file(path: &Path) -> Result<Option<FileConfig>> {
    let s = fs::read_to_string(path)
        .with_context(|| format!("read config file: {}", path.display()))?;
    match toml::from_str::<FileConfig>(&s) {
        Ok(cfg) => {
            info!(path = %path.display(), "loaded config file");
            Ok(Some(cfg))
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "parse config failed");
            Ok(None)
        }
    }
}

fn global_candidate_paths() -> Vec<PathBuf> {
    let mut v = Vec::new();
    if let Ok(p) = std::env::var("PAI_CONFIG") {
        v.push(PathBuf::from(p));
    }
    if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
        v.push(Path::new(&xdg_home).join("personal-ai/config.toml"));
    } else if let Some(home) = dirs::home_dir() {
        v.push(home.join(".config/personal-ai/config.toml"));
    }
    v
}

/// First global config file that exists and parses.
pub fn load_file_config() -> Result<FileConfig> {
    for p in global_candidate_paths() {
        if p.exists()
            && let Some(cfg) = parse_config_file(&p)?
        {
            return Ok(cfg);
        }
    }
    Ok(FileConfig::default())
}

/// Load project-specific configuration from .pai/config.toml
pub fn load_project_config(project_root: &Path) -> Result<FileConfig> {
    let path = project_root.join(PROJECT_CONFIG_DIR).join("config.toml");
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    Ok(parse_config_file(&path)?.unwrap_or_default())
}
