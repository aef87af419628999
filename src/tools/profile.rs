use serde_json::Value;
use serde_yaml::Mapping;
use std::fs;

use crate::tools::{ToolError, Toolbox};

/// Lowercase, spaces and hyphens to `_`, runs collapsed, edges stripped.
pub(crate) fn to_snake_case(key: &str) -> String {
    let lowered = key.trim().to_lowercase().replace([' ', '-'], "_");
    let mut out = String::with_capacity(lowered.len());
    for ch in lowered.chars() {
        if ch == '_' && out.ends_with('_') {
            continue;
        }
        out.push(ch);
    }
    out.trim_matches('_').to_string()
}

fn stringify(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.replace('\n', " "))
    }
}

impl Toolbox {
    fn load_memory(&self) -> Mapping {
        let Ok(raw) = fs::read_to_string(&self.memory_path) else {
            return Mapping::new();
        };
        match serde_yaml::from_str::<serde_yaml::Value>(&raw) {
            Ok(serde_yaml::Value::Mapping(map)) => map,
            _ => Mapping::new(),
        }
    }

    /// Merges `updates` into the long-term memory file. A key whose normalized
    /// form matches an existing entry replaces it and moves to the end.
    pub fn update_user_profile(&self, updates: Option<&Value>) -> Result<String, ToolError> {
        let updates = match updates {
            Some(Value::Object(map)) if !map.is_empty() => map,
            _ => return Err(ToolError::MissingUpdates),
        };
        if let Some(parent) = self.memory_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut data = self.load_memory();

        let mut updated = Vec::new();
        for (key, raw) in updates {
            let Some(value) = stringify(raw) else { continue };
            let snake = to_snake_case(key);
            if snake.is_empty() {
                continue;
            }
            data = data
                .into_iter()
                .filter(|(k, _)| k.as_str().map(to_snake_case).as_deref() != Some(snake.as_str()))
                .collect();
            data.insert(serde_yaml::Value::String(snake.clone()), value.into());
            updated.push(snake);
        }
        if updated.is_empty() {
            return Err(ToolError::NoValidUpdates);
        }

        let text = serde_yaml::to_string(&data).map_err(anyhow::Error::from)?;
        fs::write(&self.memory_path, text)?;
        Ok(format!("Updated: {}", updated.join(", ")))
    }
}
