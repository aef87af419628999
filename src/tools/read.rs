use std::fs;

use crate::tools::{ToolError, Toolbox};

impl Toolbox {
    pub fn read_file(&self, path: &str) -> Result<String, ToolError> {
        let full = self.resolve_path(path)?;
        let meta = match fs::metadata(&full) {
            Ok(meta) if meta.is_file() => meta,
            _ => return Err(ToolError::NotAFile(path.to_string())),
        };
        if meta.len() > self.cfg.max_file_size {
            return Err(ToolError::FileTooLarge(self.cfg.max_file_size));
        }
        let bytes = fs::read(&full)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
