// src/backup/report.rs

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use super::{BackupManager, RestorePoint};

pub const LOG_HEADER: &str = "LatencyOptimizer Backup Log";
pub const EMPTY_HISTORY_LINE: &str = "No restore points.";

/// Renders the full history as a human-readable text report. Deterministic
/// for a given history; not intended for re-import.
pub fn render_log(points: &[RestorePoint]) -> String {
    let mut out = String::new();
    out.push_str(LOG_HEADER);
    out.push('\n');
    out.push_str(&"=".repeat(LOG_HEADER.len() + 1));
    out.push_str("\n\n");

    for point in points {
        let _ = writeln!(out, "[{}] Restore Point: {}", point.timestamp, point.name);
        let _ = writeln!(out, "  Registry values: {}", point.reg_values.len());
        for capture in &point.reg_values {
            let _ = writeln!(out, "    {}", capture.location);
        }
        let _ = writeln!(out, "  Services: {}", point.services.len());
        for capture in &point.services {
            let _ = writeln!(
                out,
                "    {} (start type {})",
                capture.service,
                capture.start_mode.as_raw()
            );
        }
        out.push('\n');
    }
    out
}

/// One status line per restore point, for the UI's history panel.
pub fn status_lines(points: &[RestorePoint]) -> Vec<String> {
    if points.is_empty() {
        return vec![EMPTY_HISTORY_LINE.to_string()];
    }
    points
        .iter()
        .enumerate()
        .map(|(i, point)| {
            format!(
                "[{}] {} - {}  ({} reg, {} svc)",
                i + 1,
                point.timestamp,
                point.name,
                point.reg_values.len(),
                point.services.len()
            )
        })
        .collect()
}

impl BackupManager {
    /// Writes the rendered report to `path`. The sink is the only thing that
    /// can fail here; rendering itself is infallible.
    pub fn export_log(&self, path: &Path) -> Result<()> {
        fs::write(path, render_log(self.restore_points()))
            .with_context(|| format!("Failed to write backup log to '{}'", path.display()))
    }

    pub fn status_lines(&self) -> Vec<String> {
        status_lines(self.restore_points())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{RegistryLocation, RegistryRoot, ServiceStartMode};

    fn sample_history() -> BackupManager {
        let mut backup = BackupManager::new();
        backup.capture_dword(
            RegistryLocation::new(
                RegistryRoot::LocalMachine,
                "SYSTEM\\CurrentControlSet\\Services\\Tcpip\\Parameters",
                "TCPNoDelay",
            ),
            0,
        );
        backup.capture_service_state("SysMain", ServiceStartMode::Automatic);
        backup.create_restore_point("Before: Disable Nagle's Algorithm");
        backup
    }

    #[test]
    fn empty_history_summary_is_the_sentinel_line() {
        let lines = status_lines(&[]);
        assert_eq!(lines, vec![EMPTY_HISTORY_LINE.to_string()]);
    }

    #[test]
    fn status_lines_number_points_from_one() {
        let mut backup = sample_history();
        backup.create_restore_point("Manual restore point");

        let lines = backup.status_lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("[1] "));
        assert!(lines[0].contains("Before: Disable Nagle's Algorithm"));
        assert!(lines[0].ends_with("(1 reg, 1 svc)"));
        assert!(lines[1].starts_with("[2] "));
        assert!(lines[1].ends_with("(0 reg, 0 svc)"));
    }

    #[test]
    fn rendered_log_lists_every_entry() {
        let backup = sample_history();
        let text = render_log(backup.restore_points());

        assert!(text.starts_with(LOG_HEADER));
        assert!(text.contains("Restore Point: Before: Disable Nagle's Algorithm"));
        assert!(text.contains("Registry values: 1"));
        assert!(text.contains(
            "HKLM\\SYSTEM\\CurrentControlSet\\Services\\Tcpip\\Parameters -> TCPNoDelay"
        ));
        assert!(text.contains("Services: 1"));
        assert!(text.contains("SysMain (start type 2)"));
    }

    #[test]
    fn render_is_deterministic() {
        let backup = sample_history();
        assert_eq!(
            render_log(backup.restore_points()),
            render_log(backup.restore_points())
        );
    }

    #[test]
    fn export_fails_only_on_the_sink() {
        let backup = sample_history();
        let result = backup.export_log(Path::new("/nonexistent-dir/backup.txt"));
        assert!(result.is_err());
    }
}
