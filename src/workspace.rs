use anyhow::{Context, Result};
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const USER_MEMORY_FILE: &str = "user_memory.yaml";
pub const AGENT_FILE: &str = "AGENT.md";

pub const DEFAULT_AGENT_MD: &str = r#"# Agent rules

## User memory (YAML above)

- **Use it**: The "User:" YAML block above is long-term memory. Use it to personalize replies.
- **Keys: snake_case**: All keys are snake_case (e.g. name, what_to_call_them, timezone). Use snake_case when updating.
- **Update it (required)**: Whenever the user shares any personal fact or preference (name, interests, hobbies, favorites, timezone), you must call update_user_profile in the same turn with updates: { "snake_case_key": "value" }. Do not skip this when the user introduces themselves or shares preferences.

**Reply**: Never mention saving, profile, or memory. Answer naturally.
"#;

/// The directory holding long-term memory, agent rules, sessions, metrics and logs.
#[derive(Debug, Clone)]
pub struct Workspace {
    dir: PathBuf,
}

fn scalar_text(v: &Value) -> Option<String> {
    let text = match v {
        Value::Null => return None,
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => serde_yaml::to_string(other).ok()?,
    };
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

impl Workspace {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.dir.join("sessions")
    }

    pub fn metrics_dir(&self) -> PathBuf {
        self.dir.join("metrics")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.dir.join("logs")
    }

    /// Creates the directory and seeds the memory and rules files if absent.
    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create workspace {}", self.dir.display()))?;
        for (name, default) in [(USER_MEMORY_FILE, ""), (AGENT_FILE, DEFAULT_AGENT_MD)] {
            let p = self.dir.join(name);
            if !p.exists() {
                fs::write(&p, default).with_context(|| format!("seed {}", p.display()))?;
                debug!(path = %p.display(), "seeded workspace file");
            }
        }
        Ok(())
    }

    /// Long-term memory as compact YAML, blank and null values dropped.
    /// Empty when the file is missing, malformed or has nothing to say.
    pub fn load_user_memory_yaml(&self) -> String {
        let Ok(raw) = fs::read_to_string(self.dir.join(USER_MEMORY_FILE)) else {
            return String::new();
        };
        let data = match serde_yaml::from_str::<Value>(&raw) {
            Ok(Value::Mapping(map)) => map,
            Ok(_) => return String::new(),
            Err(e) => {
                warn!(error = %e, "user memory is not valid YAML; ignoring");
                return String::new();
            }
        };
        let clean: Mapping = data
            .iter()
            .filter_map(|(k, v)| {
                let key = scalar_text(k)?;
                let value = scalar_text(v)?;
                Some((Value::String(key), Value::String(value)))
            })
            .collect();
        if clean.is_empty() {
            return String::new();
        }
        serde_yaml::to_string(&clean).unwrap_or_default()
    }

    /// Memory block followed by the agent rules, separated by a blank line.
    /// Rebuilt every turn so profile updates show up immediately.
    pub fn system_prompt(&self) -> Result<String> {
        self.ensure()?;
        let mut parts = Vec::new();
        let memory = self.load_user_memory_yaml();
        if !memory.is_empty() {
            parts.push(format!("User:\n{}", memory.trim()));
        }
        if let Ok(agent) = fs::read_to_string(self.dir.join(AGENT_FILE)) {
            parts.push(agent);
        }
        Ok(parts.join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn ensure_seeds_missing_files_only() {
        let dir = tempdir().unwrap();
        let ws = Workspace::new(dir.path().join("ws"));
        ws.ensure().unwrap();
        assert_eq!(fs::read_to_string(ws.dir().join(USER_MEMORY_FILE)).unwrap(), "");
        assert_eq!(
            fs::read_to_string(ws.dir().join(AGENT_FILE)).unwrap(),
            DEFAULT_AGENT_MD
        );

        fs::write(ws.dir().join(AGENT_FILE), "custom rules").unwrap();
        ws.ensure().unwrap();
        assert_eq!(
            fs::read_to_string(ws.dir().join(AGENT_FILE)).unwrap(),
            "custom rules"
        );
    }

    #[test]
    fn memory_drops_blank_values_and_keeps_order() {
        let dir = tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        fs::write(
            dir.path().join(USER_MEMORY_FILE),
            "name: Ada\nnickname: ''\nage: 36\nnothing: null\nlanguage: Rust\n",
        )
        .unwrap();
        assert_eq!(
            ws.load_user_memory_yaml(),
            "name: Ada\nage: '36'\nlanguage: Rust\n"
        );
    }

    #[test]
    fn memory_is_empty_when_absent_or_not_a_mapping() {
        let dir = tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        assert_eq!(ws.load_user_memory_yaml(), "");
        fs::write(dir.path().join(USER_MEMORY_FILE), "- a\n- b\n").unwrap();
        assert_eq!(ws.load_user_memory_yaml(), "");
        fs::write(dir.path().join(USER_MEMORY_FILE), "key: [unclosed").unwrap();
        assert_eq!(ws.load_user_memory_yaml(), "");
    }

    #[test]
    fn system_prompt_joins_memory_and_rules() {
        let dir = tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        ws.ensure().unwrap();
        fs::write(dir.path().join(AGENT_FILE), "Be brief.").unwrap();
        assert_eq!(ws.system_prompt().unwrap(), "Be brief.");

        fs::write(dir.path().join(USER_MEMORY_FILE), "name: Ada\n").unwrap();
        assert_eq!(ws.system_prompt().unwrap(), "User:\nname: Ada\n\nBe brief.");
    }
}
