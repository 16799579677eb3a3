//! Startup helpers: health check, platform detection and data pulls.

use std::io::ErrorKind;
use std::path::Path;
use std::process::Command;

use crate::data::Catalog;

/// Environment variable naming the hosting platform (`cloud` or `local`)
pub const PLATFORM_ENV: &str = "TRANSFERMARKT_PLATFORM";

/// Environment variable set to `true` when running without a terminal
pub const HEADLESS_ENV: &str = "TRANSFERMARKT_HEADLESS";

const MAX_OUTPUT_LINES: usize = 50;
const MAX_LINE_LENGTH: usize = 200;

/// Where the process is running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Cloud,
    Local,
}

impl Platform {
    /// Detect the platform from the environment
    pub fn detect() -> Self {
        Self::from_vars(
            std::env::var(PLATFORM_ENV).ok().as_deref(),
            std::env::var(HEADLESS_ENV).ok().as_deref(),
        )
    }

    fn from_vars(platform: Option<&str>, headless: Option<&str>) -> Self {
        let is_cloud = platform
            .map(|p| p.trim().eq_ignore_ascii_case("cloud"))
            .unwrap_or(false);
        let is_headless = headless
            .map(|h| h.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if is_cloud || is_headless {
            Platform::Cloud
        } else {
            Platform::Local
        }
    }

    /// Whether data should be pulled before the first read
    pub fn should_pull(self) -> bool {
        self == Platform::Cloud
    }
}

/// Health check outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Health {
    Ok,
    MissingAssets(Vec<String>),
}

/// Answer a health check. The shallow check never touches the data; the
/// deep check verifies the required asset files are present.
pub fn health_check(catalog: Option<&Catalog>) -> Health {
    match catalog {
        None => Health::Ok,
        Some(catalog) => {
            let missing = catalog.missing_required();
            if missing.is_empty() {
                Health::Ok
            } else {
                Health::MissingAssets(missing)
            }
        }
    }
}

/// Cap command output for display: at most `max_lines` lines of at most
/// `max_line_len` characters each.
pub fn truncate_output(output: &str, max_lines: usize, max_line_len: usize) -> String {
    if output.is_empty() {
        return String::new();
    }
    let lines: Vec<&str> = output.lines().collect();
    let mut kept = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        if i >= max_lines {
            kept.push(format!(
                "... (truncated - too many lines, total {})",
                lines.len()
            ));
            break;
        }
        let len = line.chars().count();
        if len > max_line_len {
            let head: String = line.chars().take(max_line_len).collect();
            kept.push(format!(
                "{head}... (truncated - line too long, original length {len})"
            ));
        } else {
            kept.push(line.to_string());
        }
    }
    kept.join("\n")
}

/// Result of a `dvc pull`
#[derive(Debug, Clone)]
pub struct PullReport {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub error: Option<String>,
}

/// Fetch the prep directory with `dvc pull`. Failures are reported, never
/// fatal: the dashboard falls back to whatever files are already present.
pub fn pull_data(prep_dir: &Path) -> PullReport {
    pull_with(Command::new("dvc").arg("pull").arg(prep_dir).arg("-v"))
}

fn pull_with(command: &mut Command) -> PullReport {
    log::info!("Running {command:?}");
    match command.output() {
        Ok(output) => {
            let report = PullReport {
                success: output.status.success(),
                stdout: truncate_output(
                    &String::from_utf8_lossy(&output.stdout),
                    MAX_OUTPUT_LINES,
                    MAX_LINE_LENGTH,
                ),
                stderr: truncate_output(
                    &String::from_utf8_lossy(&output.stderr),
                    MAX_OUTPUT_LINES,
                    MAX_LINE_LENGTH,
                ),
                error: (!output.status.success())
                    .then(|| format!("data pull failed with {}", output.status)),
            };
            if report.success {
                log::info!("Data pull completed");
            } else {
                log::warn!("Data pull failed: {}", report.stderr);
            }
            report
        }
        Err(e) => {
            let error = if e.kind() == ErrorKind::NotFound {
                "dvc command not found, install dvc to pull the data".to_string()
            } else {
                format!("could not run data pull: {e}")
            };
            log::warn!("{error}");
            PullReport {
                success: false,
                stdout: String::new(),
                stderr: String::new(),
                error: Some(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::testing::fixture_catalog;

    #[test]
    fn test_platform_detection() {
        assert_eq!(Platform::from_vars(Some("cloud"), None), Platform::Cloud);
        assert_eq!(Platform::from_vars(Some(" CLOUD "), None), Platform::Cloud);
        assert_eq!(Platform::from_vars(None, Some("true")), Platform::Cloud);
        assert_eq!(Platform::from_vars(Some("local"), Some("false")), Platform::Local);
        assert_eq!(Platform::from_vars(None, None), Platform::Local);
        assert!(!Platform::Local.should_pull());
    }

    #[test]
    fn test_truncate_long_lines_and_line_count() {
        let output = "a\nbbbbbbbbbb\nc\nd";
        let truncated = truncate_output(output, 3, 4);
        let lines: Vec<&str> = truncated.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "a");
        assert_eq!(lines[1], "bbbb... (truncated - line too long, original length 10)");
        assert_eq!(lines[3], "... (truncated - too many lines, total 4)");
        assert_eq!(truncate_output("", 3, 4), "");
    }

    #[test]
    fn test_shallow_health_is_ok_without_data() {
        assert_eq!(health_check(None), Health::Ok);
    }

    #[test]
    fn test_deep_health_checks_files() {
        let (_dir, catalog) = fixture_catalog();
        assert_eq!(health_check(Some(&catalog)), Health::Ok);

        let empty = tempfile::tempdir().unwrap();
        let catalog = Catalog::new(empty.path());
        assert!(matches!(health_check(Some(&catalog)), Health::MissingAssets(m) if m.len() == 3));
    }

    #[test]
    fn test_missing_binary_is_reported() {
        let report = pull_with(&mut Command::new("definitely-not-a-real-dvc-binary"));
        assert!(!report.success);
        assert!(report.error.unwrap().contains("not found"));
    }
}
