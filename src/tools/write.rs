use std::fs;

use crate::tools::{ToolError, Toolbox};

impl Toolbox {
    pub fn write_file(&self, path: &str, content: &str) -> Result<String, ToolError> {
        let full = self.resolve_path(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&full, content)?;
        Ok(format!("Wrote {} bytes to {}", content.len(), path))
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ToolsConfig;
    use crate::tools::Toolbox;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn creates_parent_directories_and_overwrites() {
        let dir = tempdir().unwrap();
        let tb = Toolbox::new(dir.path(), dir.path(), ToolsConfig::default()).unwrap();
        assert_eq!(
            tb.write_file("a/b/c.txt", "first").unwrap(),
            "Wrote 5 bytes to a/b/c.txt"
        );
        tb.write_file("a/b/c.txt", "2nd").unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("a/b/c.txt")).unwrap(), "2nd");
    }

    #[test]
    fn byte_count_is_utf8_length() {
        let dir = tempdir().unwrap();
        let tb = Toolbox::new(dir.path(), dir.path(), ToolsConfig::default()).unwrap();
        assert_eq!(tb.write_file("u.txt", "héllo").unwrap(), "Wrote 6 bytes to u.txt");
    }

    #[test]
    fn refuses_to_write_outside_root() {
        let dir = tempdir().unwrap();
        let tb = Toolbox::new(dir.path(), dir.path(), ToolsConfig::default()).unwrap();
        let err = tb.write_file("../escape.txt", "x").unwrap_err();
        assert_eq!(err.to_string(), "path must be under project root: ../escape.txt");
        assert!(!dir.path().parent().unwrap().join("escape.txt").exists());
    }
}
