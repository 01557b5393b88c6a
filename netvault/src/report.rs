//! End-of-run report.

use std::fmt;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Local};

use crate::collector::Collector;
use crate::driver::Outcome;
use crate::error::{ArtifactError, Result};

/// Summary of one run.
#[derive(Debug, Clone)]
pub struct Report {
    /// When the run started.
    pub started: DateTime<Local>,

    /// Wall-clock duration of the run.
    pub elapsed: Duration,

    /// Successful actions.
    pub completed: Vec<Outcome>,

    /// Failed actions, with diagnostics.
    pub failed: Vec<Outcome>,
}

impl Report {
    /// Snapshot the collector.
    pub fn new(started: DateTime<Local>, elapsed: Duration, collector: &Collector) -> Self {
        Self {
            started,
            elapsed,
            completed: collector.successes(),
            failed: collector.failures(),
        }
    }

    /// True if nothing failed.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Append the rendered report to `path`.
    pub fn append_to(&self, path: &Path) -> Result<()> {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| {
                file.write_all(b"\n")?;
                Ok(file)
            })
            .map_err(|source| ArtifactError::Io {
                op: "append",
                path: path.to_path_buf(),
                source,
            })?;
        write!(file, "{self}").map_err(|source| {
            ArtifactError::Io {
                op: "append",
                path: path.to_path_buf(),
                source,
            }
            .into()
        })
    }
}

fn hms(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60)
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "-------------------------")?;
        writeln!(f)?;
        writeln!(f, "{}", self.started.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(f, "Elapsed time: {}", hms(self.elapsed))?;

        writeln!(f)?;
        writeln!(f, "Completed:")?;
        if self.completed.is_empty() {
            writeln!(f, "\tNONE")?;
        }
        for outcome in &self.completed {
            writeln!(f, "\t{outcome}")?;
        }

        writeln!(f)?;
        writeln!(f, "Failed:")?;
        if self.failed.is_empty() {
            writeln!(f, "\tNONE")?;
        }
        for outcome in &self.failed {
            match outcome.diagnostic() {
                Some(reason) => writeln!(f, "\t{outcome} ({reason})")?,
                None => writeln!(f, "\t{outcome}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn started() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_render() {
        let collector = Collector::new();
        collector.record(Outcome::success("sw1", "running-config"));
        collector.record(Outcome::failure(
            "sw2",
            "running-config",
            "Transfer failed: device reported 'Error'",
        ));
        let report = Report::new(started(), Duration::from_secs(3725), &collector);

        assert_eq!(
            report.to_string(),
            "-------------------------\n\n\
             2026-03-01 12:00:00\n\
             Elapsed time: 1:02:05\n\n\
             Completed:\n\tsw1 - running-config\n\n\
             Failed:\n\tsw2 - running-config (Transfer failed: device reported 'Error')\n"
        );
        assert!(!report.is_clean());
    }

    #[test]
    fn test_render_empty_lists() {
        let report = Report::new(started(), Duration::ZERO, &Collector::new());
        let text = report.to_string();
        assert!(text.contains("Completed:\n\tNONE\n"));
        assert!(text.contains("Failed:\n\tNONE\n"));
        assert!(report.is_clean());
    }

    #[test]
    fn test_append_to() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("netvault.log");
        std::fs::write(&path, "earlier line\n").unwrap();
        let report = Report::new(started(), Duration::ZERO, &Collector::new());

        report.append_to(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("earlier line\n\n-------------------------"));
    }
}
