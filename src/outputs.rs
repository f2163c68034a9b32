//! Step outputs, exported variables and the rendered run summary
//!
//! Values are appended to the files named by the CI runner (`GITHUB_OUTPUT`,
//! `GITHUB_ENV`, `GITHUB_STEP_SUMMARY`); the run summary replaces the summary
//! file instead. When a file is not configured the value is printed to stdout.

use rand::{distributions::Alphanumeric, Rng};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct StepOutputs {
    pub output_file: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
    pub summary_file: Option<PathBuf>,
}

impl StepOutputs {
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = |name: &str| lookup(name).filter(|v| !v.is_empty()).map(PathBuf::from);
        Self {
            output_file: path("GITHUB_OUTPUT"),
            env_file: path("GITHUB_ENV"),
            summary_file: path("GITHUB_STEP_SUMMARY"),
        }
    }

    pub fn set_output(&self, name: &str, value: &str) -> std::io::Result<()> {
        debug!(name, "Setting step output");
        append_key_value(self.output_file.as_ref(), name, value)
    }

    pub fn export_variable(&self, name: &str, value: &str) -> std::io::Result<()> {
        debug!(name, "Exporting variable");
        append_key_value(self.env_file.as_ref(), name, value)
    }

    /// Append to the step summary
    pub fn write_summary(&self, markdown: &str) -> std::io::Result<()> {
        self.summary(markdown, false)
    }

    /// Replace whatever the step summary already holds
    pub fn replace_summary(&self, markdown: &str) -> std::io::Result<()> {
        self.summary(markdown, true)
    }

    fn summary(&self, markdown: &str, overwrite: bool) -> std::io::Result<()> {
        match &self.summary_file {
            Some(path) => {
                let mut options = OpenOptions::new();
                options.create(true);
                if overwrite {
                    options.write(true).truncate(true);
                } else {
                    options.append(true);
                }
                options.open(path)?.write_all(markdown.as_bytes())
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(markdown.as_bytes())?;
                stdout.flush()
            }
        }
    }
}

/// `name=value`, or heredoc form with a random delimiter for multi-line values
pub fn key_value_entry(name: &str, value: &str) -> String {
    if !value.contains('\n') {
        return format!("{}={}\n", name, value);
    }

    let delimiter = loop {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(16)
            .map(char::from)
            .collect();
        let candidate = format!("ghadelimiter_{}", suffix);
        if !value.contains(&candidate) {
            break candidate;
        }
    };

    format!("{}<<{}\n{}\n{}\n", name, delimiter, value, delimiter)
}

fn append_key_value(path: Option<&PathBuf>, name: &str, value: &str) -> std::io::Result<()> {
    let entry = key_value_entry(name, value);
    match path {
        Some(path) => {
            let mut file = OpenOptions::new().create(true).append(true).open(path)?;
            file.write_all(entry.as_bytes())
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(entry.as_bytes())?;
            stdout.flush()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_single_line_entry() {
        assert_eq!(key_value_entry("target", "main@abc1234"), "target=main@abc1234\n");
        assert_eq!(key_value_entry("base", ""), "base=\n");
    }

    #[test]
    fn test_multi_line_entry_uses_delimiter() {
        let entry = key_value_entry("loci_summary", "line one\nline two");
        let mut lines = entry.lines();
        let header = lines.next().unwrap();
        let (name, delimiter) = header.split_once("<<").unwrap();

        assert_eq!(name, "loci_summary");
        assert!(delimiter.starts_with("ghadelimiter_"));
        assert_eq!(lines.next(), Some("line one"));
        assert_eq!(lines.next(), Some("line two"));
        assert_eq!(lines.next(), Some(delimiter));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_files_are_appended() {
        let dir = TempDir::new().unwrap();
        let outputs = StepOutputs {
            output_file: Some(dir.path().join("output")),
            env_file: Some(dir.path().join("env")),
            summary_file: Some(dir.path().join("summary.md")),
        };

        outputs.set_output("target", "t").unwrap();
        outputs.set_output("base", "b").unwrap();
        outputs.export_variable("LOCI_TARGET", "t").unwrap();
        outputs.write_summary("# LOCI Summary\n").unwrap();

        assert_eq!(std::fs::read_to_string(dir.path().join("output")).unwrap(), "target=t\nbase=b\n");
        assert_eq!(std::fs::read_to_string(dir.path().join("env")).unwrap(), "LOCI_TARGET=t\n");
        assert_eq!(
            std::fs::read_to_string(dir.path().join("summary.md")).unwrap(),
            "# LOCI Summary\n"
        );
    }

    #[test]
    fn test_replace_summary_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("summary.md");
        let outputs = StepOutputs {
            summary_file: Some(path.clone()),
            ..StepOutputs::default()
        };

        outputs.write_summary("# LOCI Upload Status\n").unwrap();
        outputs.write_summary("extra\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# LOCI Upload Status\nextra\n");

        outputs.replace_summary("# LOCI Summary\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# LOCI Summary\n");
    }

    #[test]
    fn test_from_vars_ignores_empty_paths() {
        let outputs = StepOutputs::from_vars(|name| match name {
            "GITHUB_OUTPUT" => Some("/tmp/out".to_string()),
            "GITHUB_ENV" => Some(String::new()),
            _ => None,
        });
        assert_eq!(outputs.output_file, Some(PathBuf::from("/tmp/out")));
        assert_eq!(outputs.env_file, None);
        assert_eq!(outputs.summary_file, None);
    }
}
