use ignore::WalkBuilder;
use regex::RegexBuilder;
use std::fs;

use crate::tools::{ToolError, Toolbox};

impl Toolbox {
    /// Lists files under `directory` whose contents match `pattern`, one
    /// `<path>: (match)` line per file with paths relative to the project root.
    pub fn search_files(&self, directory: &str, pattern: &str) -> Result<String, ToolError> {
        let base = self.resolve_path(directory)?;
        if !base.is_dir() {
            return Err(ToolError::NotADirectory(directory.to_string()));
        }
        let re = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|_| ToolError::InvalidPattern(pattern.to_string()))?;

        let mut hits = Vec::new();
        for entry in WalkBuilder::new(&base).standard_filters(false).build() {
            let Ok(entry) = entry else { continue };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let path = entry.path();
            match entry.metadata() {
                Ok(meta) if meta.len() <= self.cfg.max_file_size => {}
                _ => continue,
            }
            let Ok(bytes) = fs::read(path) else { continue };
            if re.is_match(&String::from_utf8_lossy(&bytes)) {
                hits.push(self.relative(path));
            }
        }

        if hits.is_empty() {
            return Ok("No matches found.".to_string());
        }
        hits.sort();
        hits.truncate(self.cfg.search_max_results);
        Ok(hits
            .iter()
            .map(|p| format!("{p}: (match)"))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ToolsConfig;
    use crate::tools::Toolbox;
    use std::fs;
    use tempfile::tempdir;

    fn toolbox_with(cfg: ToolsConfig) -> (tempfile::TempDir, Toolbox) {
        let dir = tempdir().unwrap();
        let tb = Toolbox::new(dir.path(), dir.path(), cfg).unwrap();
        (dir, tb)
    }

    #[test]
    fn matches_case_insensitively_and_reports_relative_paths() {
        let (dir, tb) = toolbox_with(ToolsConfig::default());
        fs::create_dir_all(dir.path().join("docs/deep")).unwrap();
        fs::write(dir.path().join("docs/a.md"), "Rust is great").unwrap();
        fs::write(dir.path().join("docs/deep/b.md"), "I like RUST").unwrap();
        fs::write(dir.path().join("docs/c.md"), "python").unwrap();
        fs::write(dir.path().join("docs/.hidden"), "rust").unwrap();

        let out = tb.search_files("docs", "rust").unwrap();
        assert_eq!(
            out,
            "docs/.hidden: (match)\ndocs/a.md: (match)\ndocs/deep/b.md: (match)"
        );
    }

    #[test]
    fn result_count_is_capped() {
        let (dir, tb) = toolbox_with(ToolsConfig {
            search_max_results: 2,
            ..ToolsConfig::default()
        });
        for i in 0..5 {
            fs::write(dir.path().join(format!("f{i}.txt")), "needle").unwrap();
        }
        let out = tb.search_files(".", "needle").unwrap();
        assert_eq!(out.lines().count(), 2);
        assert_eq!(out.lines().next().unwrap(), "f0.txt: (match)");
    }

    #[test]
    fn no_match_and_error_cases() {
        let (dir, tb) = toolbox_with(ToolsConfig::default());
        fs::write(dir.path().join("a.txt"), "hay").unwrap();
        assert_eq!(tb.search_files(".", "needle").unwrap(), "No matches found.");
        assert_eq!(
            tb.search_files(".", "(").unwrap_err().to_string(),
            "invalid regex pattern: ("
        );
        assert_eq!(
            tb.search_files("a.txt", "hay").unwrap_err().to_string(),
            "not a directory: a.txt"
        );
        assert!(tb.search_files("..", "hay").is_err());
    }

    #[test]
    fn oversized_files_are_skipped() {
        let (dir, tb) = toolbox_with(ToolsConfig {
            max_file_size: 8,
            ..ToolsConfig::default()
        });
        fs::write(dir.path().join("small.txt"), "needle").unwrap();
        fs::write(dir.path().join("large.txt"), "needle needle needle").unwrap();
        assert_eq!(tb.search_files(".", "needle").unwrap(), "small.txt: (match)");
    }
}
