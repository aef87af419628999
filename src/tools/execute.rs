use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::tools::{ToolError, Toolbox};

fn render_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stdout = stdout.trim();
    let mut out = if stdout.is_empty() {
        "(no stdout)".to_string()
    } else {
        stdout.to_string()
    };
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        out.push_str("\nstderr: ");
        out.push_str(stderr);
    }
    if !output.status.success() {
        match output.status.code() {
            Some(code) => out.push_str(&format!("\nExit code: {code}")),
            None => out.push_str("\nExit code: terminated by signal"),
        }
    }
    out
}

impl Toolbox {
    /// Runs `command` through `sh -c` in the project root. The child is killed
    /// when the time budget runs out.
    pub async fn exec_command(&self, command: &str) -> Result<String, ToolError> {
        let secs = self.cfg.exec_timeout_secs;
        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;
        debug!(command, "spawned shell command");
        match tokio::time::timeout(Duration::from_secs(secs), child.wait_with_output()).await {
            Ok(output) => Ok(render_output(&output?)),
            Err(_) => Err(ToolError::Timeout(secs)),
        }
    }
}
