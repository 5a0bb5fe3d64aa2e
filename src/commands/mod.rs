pub mod recent;
pub mod render;
pub mod scan;
pub mod status;

use crate::wr::util::write_atomic;
use anyhow::{Context, Result};
use serde::Serialize;
use std::io::{self, BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    pub details: Vec<String>,
    pub issues: Vec<String>,
}

impl CommandReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ok: true,
            details: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn detail(&mut self, text: impl Into<String>) {
        self.details.push(text.into());
    }

    pub fn issue(&mut self, text: impl Into<String>) {
        self.ok = false;
        self.issues.push(text.into());
    }
}

/// Writes a rendered Markdown artifact to `output`, or to stdout when no
/// path is given. Files are replaced atomically.
pub fn write_artifact<R>(output: Option<&Path>, render: R) -> Result<()>
where
    R: FnOnce(&mut dyn Write) -> io::Result<()>,
{
    match output {
        Some(path) => {
            let mut buf = Vec::new();
            render(&mut buf).context("failed to render report")?;
            let text = String::from_utf8(buf).context("report is not valid UTF-8")?;
            write_atomic(path, &text)
        }
        None => {
            let stdout = io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            render(&mut out).context("failed to write report to stdout")?;
            out.flush().context("failed to flush stdout")?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn issues_flip_ok() {
        let mut report = CommandReport::new("scan");
        report.detail("pages=1");
        assert!(report.ok);
        report.issue("lock held");
        assert!(!report.ok);
        assert_eq!(report.details, vec!["pages=1"]);
        assert_eq!(report.issues, vec!["lock held"]);
    }

    #[test]
    fn artifact_goes_to_file_when_asked() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("out").join("README.md");
        write_artifact(Some(&path), |out| writeln!(out, "## hello")).expect("write");
        assert_eq!(fs::read_to_string(&path).expect("read"), "## hello\n");
    }
}
