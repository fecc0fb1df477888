// src/backup/mod.rs
//
// Restore-point subsystem: every backup-participating tweak records the prior
// value of each location it is about to mutate, and the accumulated captures
// are sealed into named, timestamped restore points that can be replayed.

pub mod report;
pub mod restore;

use chrono::Local;

use crate::state::{RegistryLocation, RegistryValue, ServiceStartMode};

/// A single saved registry value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapturedValue {
    pub location: RegistryLocation,
    pub value: RegistryValue,
}

/// A single saved service start mode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceStateCapture {
    pub service: String,
    pub start_mode: ServiceStartMode,
}

/// One restore point: a named snapshot of all values captured since the
/// previous one was sealed. Immutable once pushed onto the history.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RestorePoint {
    pub name: String,
    pub timestamp: String,
    pub reg_values: Vec<CapturedValue>,
    pub services: Vec<ServiceStateCapture>,
}

impl RestorePoint {
    pub fn is_empty(&self) -> bool {
        self.reg_values.is_empty() && self.services.is_empty()
    }

    pub fn entry_count(&self) -> usize {
        self.reg_values.len() + self.services.len()
    }
}

/// Owner of the restore-point history and the in-progress accumulator.
///
/// Purely in-memory; never touches the OS itself. Captures are appended by
/// tweaks immediately before they mutate the corresponding location, so a
/// finalized point always holds pre-mutation state.
#[derive(Debug, Default)]
pub struct BackupManager {
    points: Vec<RestorePoint>,
    current: RestorePoint,
}

impl BackupManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the prior DWORD at `location`. The caller must have read the
    /// value from the live system immediately before calling; locations with
    /// no existing value are simply never captured.
    pub fn capture_dword(&mut self, location: RegistryLocation, value: u32) {
        tracing::debug!("Captured {} = {}", location, value);
        self.current.reg_values.push(CapturedValue {
            location,
            value: RegistryValue::Dword(value),
        });
    }

    /// Records the prior REG_SZ string at `location`.
    pub fn capture_sz(&mut self, location: RegistryLocation, value: String) {
        tracing::debug!("Captured {} = '{}'", location, value);
        self.current.reg_values.push(CapturedValue {
            location,
            value: RegistryValue::Sz(value),
        });
    }

    /// Records the prior start mode of `service`. Callers skip services whose
    /// query returned the undefined sentinel.
    pub fn capture_service_state(&mut self, service: &str, start_mode: ServiceStartMode) {
        tracing::debug!("Captured service '{}' start mode {:?}", service, start_mode);
        self.current.services.push(ServiceStateCapture {
            service: service.to_string(),
            start_mode,
        });
    }

    /// Seals the accumulator into a named restore point at the end of the
    /// history and starts a fresh one. Infallible: a point with zero captures
    /// is still a valid (empty) point.
    pub fn create_restore_point(&mut self, name: &str) -> &RestorePoint {
        let mut point = std::mem::take(&mut self.current);
        point.name = name.to_string();
        point.timestamp = current_timestamp();
        tracing::debug!(
            "Restore point '{}' sealed with {} entries",
            point.name,
            point.entry_count()
        );
        self.points.push(point);
        self.points.last().expect("just pushed")
    }

    /// Chronological history, oldest first.
    pub fn restore_points(&self) -> &[RestorePoint] {
        &self.points
    }

    /// Number of captures sitting in the not-yet-sealed accumulator.
    pub fn pending_captures(&self) -> usize {
        self.current.entry_count()
    }

    /// Discards the whole history and the accumulator. Irreversible.
    pub fn clear(&mut self) {
        tracing::debug!("Clearing {} restore points", self.points.len());
        self.points.clear();
        self.current = RestorePoint::default();
    }
}

fn current_timestamp() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::RegistryRoot;

    fn location(value_name: &str) -> RegistryLocation {
        RegistryLocation::new(RegistryRoot::LocalMachine, "SOFTWARE\\Test", value_name)
    }

    #[test]
    fn finalize_seals_accumulator_and_starts_fresh() {
        let mut backup = BackupManager::new();
        backup.capture_dword(location("A"), 1);
        backup.create_restore_point("first");

        assert_eq!(backup.pending_captures(), 0);

        // Later captures must not leak into the sealed point.
        backup.capture_dword(location("B"), 2);
        let first = &backup.restore_points()[0];
        assert_eq!(first.name, "first");
        assert_eq!(first.reg_values.len(), 1);
        assert_eq!(first.reg_values[0].location, location("A"));
    }

    #[test]
    fn history_preserves_insertion_order() {
        let mut backup = BackupManager::new();
        backup.create_restore_point("a");
        backup.create_restore_point("b");

        let names: Vec<&str> = backup
            .restore_points()
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn captures_keep_their_kind() {
        let mut backup = BackupManager::new();
        backup.capture_dword(location("Depth"), 128);
        backup.capture_sz(location("MouseSpeed"), "1".to_string());
        backup.capture_service_state("SysMain", ServiceStartMode::Automatic);
        let point = backup.create_restore_point("p").clone();

        assert_eq!(point.reg_values[0].value, RegistryValue::Dword(128));
        assert_eq!(point.reg_values[1].value, RegistryValue::Sz("1".to_string()));
        assert_eq!(point.services[0].service, "SysMain");
        assert_eq!(point.entry_count(), 3);
    }

    #[test]
    fn timestamp_is_iso8601_second_precision() {
        let mut backup = BackupManager::new();
        let point = backup.create_restore_point("stamped");
        // e.g. 2026-08-30T14:03:59
        assert_eq!(point.timestamp.len(), 19);
        assert_eq!(&point.timestamp[4..5], "-");
        assert_eq!(&point.timestamp[10..11], "T");
    }

    #[test]
    fn clear_wipes_history_and_accumulator() {
        let mut backup = BackupManager::new();
        backup.capture_dword(location("A"), 1);
        backup.create_restore_point("old");
        backup.capture_dword(location("B"), 2);

        backup.clear();
        assert!(backup.restore_points().is_empty());
        assert_eq!(backup.pending_captures(), 0);

        // A fresh point only contains post-clear captures.
        backup.capture_dword(location("C"), 3);
        let point = backup.create_restore_point("new").clone();
        assert_eq!(point.reg_values.len(), 1);
        assert_eq!(point.reg_values[0].location, location("C"));
    }
}
