// src/backup/restore.rs

use crate::state::{RegistryValue, SystemStateAccess};

use super::{BackupManager, RestorePoint};

/// Writes every captured entry of `point` back through the accessor.
///
/// Best-effort, not transactional: a failed write is logged and counted but
/// never stops the remaining entries. Returns `true` only when every entry
/// was written successfully.
pub fn apply_restore_point(point: &RestorePoint, state: &dyn SystemStateAccess) -> bool {
    let mut ok = true;
    for capture in &point.reg_values {
        let written = match &capture.value {
            RegistryValue::Dword(v) => state.write_dword(&capture.location, *v),
            RegistryValue::Sz(s) => state.write_sz(&capture.location, s),
        };
        if let Err(e) = written {
            tracing::warn!(
                "Restore of '{}' failed to write {}: {:?}",
                point.name,
                capture.location,
                e
            );
            ok = false;
        }
    }
    for capture in &point.services {
        if let Err(e) = state.set_service_start_mode(&capture.service, capture.start_mode) {
            tracing::warn!(
                "Restore of '{}' failed to reset service '{}': {:?}",
                point.name,
                capture.service,
                e
            );
            ok = false;
        }
    }
    ok
}

impl BackupManager {
    /// Replays only the most recent restore point. Returns `false` without
    /// attempting any write when the history is empty.
    pub fn restore_latest(&self, state: &dyn SystemStateAccess) -> bool {
        match self.points.last() {
            Some(point) => apply_restore_point(point, state),
            None => {
                tracing::warn!("Restore requested with no restore points");
                false
            }
        }
    }

    /// Replays every restore point oldest-first, AND-folding the outcomes.
    ///
    /// When two points captured the same location, the later point's value is
    /// written last and wins. That later capture may itself be stale relative
    /// to mutations that were never captured; there is deliberately no
    /// de-duplication by location across points.
    pub fn restore_all(&self, state: &dyn SystemStateAccess) -> bool {
        let mut ok = true;
        for point in &self.points {
            ok &= apply_restore_point(point, state);
        }
        ok
    }
}
