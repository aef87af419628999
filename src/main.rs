mod config;
mod llm;
mod logging;
mod metrics;
mod session;
mod tools;
mod workspace;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use dotenvy::dotenv;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::llm::{ChatMessage, OpenAIClient, ToolRuntime, TurnContext, run_turn};
use crate::logging::{EventLog, init_logging};
use crate::metrics::MetricsStore;
use crate::session::SessionStore;
use crate::tools::Toolbox;
use crate::workspace::Workspace;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "pai",
    version,
    about = "Personal assistant with file, shell, web and memory tools"
)]
pub struct Cli {
    /// OpenAI-compatible API base URL (env LLM_BASE_URL)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Model name (env LLM_MODEL)
    #[arg(long)]
    pub model: Option<String>,

    /// API key (env LLM_API_KEY or GEMINI_API_KEY recommended)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Workspace directory holding memory, sessions, metrics and logs (env WORKSPACE_PATH)
    #[arg(long)]
    pub workspace: Option<PathBuf>,

    /// Log level (error,warn,info,debug,trace)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Tool rounds allowed per turn, 0 for unlimited
    #[arg(long)]
    pub max_tool_rounds: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    init_logging(&config::log_level(&cli, |k| std::env::var(k).ok()))?;

    let cfg = AppConfig::from_cli(&cli)?;
    info!(
        base_url = %cfg.base_url,
        model = %cfg.model,
        workspace = %cfg.workspace_dir.display(),
        max_tool_rounds = cfg.max_tool_rounds,
        "app config"
    );

    let Some(api_key) = cfg.api_key.clone() else {
        println!("Set LLM_API_KEY (or GEMINI_API_KEY) in .env");
        return Ok(());
    };
    run_repl(cfg, api_key).await
}

async fn run_repl(cfg: AppConfig, api_key: String) -> Result<()> {
    let workspace = Workspace::new(&cfg.workspace_dir);
    workspace.ensure()?;

    let client = OpenAIClient::new(cfg.base_url.clone(), api_key)?.with_llm_config(&cfg.llm)?;
    let toolbox = Toolbox::new(&cfg.project_root, workspace.dir(), cfg.tools.clone())?;
    let events = EventLog::new(workspace.logs_dir());
    let metrics = MetricsStore::new(workspace.metrics_dir());
    let runtime = ToolRuntime::new(&client, cfg.model.clone(), &toolbox, &events, &metrics)
        .with_max_rounds(cfg.max_tool_rounds);

    let sessions = SessionStore::new(workspace.sessions_dir());
    let session = sessions.start()?;
    let mut history: Vec<ChatMessage> = sessions.load_history(&session)?;
    println!("Session: {}", session.file_name());
    println!("Say \"exit\" or \"quit\" to end.\n");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("You: ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else { break };
        let line = line?;
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            break;
        }

        let ctx = TurnContext::new(uuid::Uuid::new_v4().to_string(), Some(session.clone()));
        let instructions = workspace.system_prompt()?;
        match run_turn(&runtime, &ctx, &instructions, &history, input).await {
            Ok(outcome) => {
                if let Err(e) = sessions.append_messages(&session, &outcome.transcript) {
                    error!(error = %e, "failed to persist turn");
                }
                history.extend(outcome.transcript);
                println!("Agent: {}\n", outcome.final_text);
            }
            Err(e) => {
                error!(request_id = %ctx.request_id, error = %e, "turn failed");
                eprintln!("LLM error: {e}\n");
            }
        }
    }

    let usage = metrics.session_usage(&session);
    let total = metrics.total_usage();
    info!(
        input_tokens = usage.input_tokens,
        output_tokens = usage.output_tokens,
        total_tokens = usage.total_tokens,
        all_sessions_total_tokens = total.total_tokens,
        "session finished"
    );
    Ok(())
}
