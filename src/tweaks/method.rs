// src/tweaks/method.rs

use anyhow::Result;

use crate::backup::BackupManager;
use crate::state::SystemStateAccess;

use super::TweakId;

/// Behavior shared by all tweak kinds. Implementations are stateless
/// descriptions of what to read and write; all OS access goes through the
/// passed-in accessor so the same definitions drive production and tests.
pub trait TweakMethod: Send + Sync {
    /// Whether the tweak currently appears to be applied.
    fn initial_state(&self, id: TweakId, state: &dyn SystemStateAccess) -> Result<bool>;

    /// Applies the tweak. Backup-participating kinds capture the current
    /// value of every location they are about to mutate into `backup`'s
    /// accumulator before the first write.
    fn apply(
        &self,
        id: TweakId,
        state: &dyn SystemStateAccess,
        backup: &mut BackupManager,
    ) -> Result<()>;

    /// Reverts the tweak to its stock configuration. This is the tweak's own
    /// notion of "default", independent of the restore-point history.
    fn revert(&self, id: TweakId, state: &dyn SystemStateAccess) -> Result<()>;

    /// Whether `apply` records captures worth sealing into a restore point.
    fn participates_in_backup(&self) -> bool {
        true
    }
}
