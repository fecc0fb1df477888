// src/orchestrator.rs

use std::{
    sync::{Arc, Mutex},
    thread,
};

use anyhow::Error;
use crossbeam::channel;
use tracing::error;

use crate::backup::BackupManager;
use crate::state::SystemStateAccess;
use crate::tweaks::{method::TweakMethod, TweakId};

/// Represents the result of a processed task.
#[derive(Debug)]
pub struct TweakResult {
    pub id: TweakId,
    pub success: bool,
    pub error: Option<Error>,
    pub enabled_state: Option<bool>, // Some(true) if enabled, Some(false) if disabled, None if unknown
    pub action: TweakAction,
}

/// Represents a task to be processed.
#[derive(Clone)]
pub struct TweakTask {
    pub id: TweakId,
    pub name: &'static str,
    pub method: Arc<dyn TweakMethod>,
    pub action: TweakAction,
}

/// Actions that can be performed on a tweak.
#[derive(Debug, Clone)]
pub enum TweakAction {
    Apply,
    Revert,
    ReadInitialState,
}

/// The orchestrator managing task execution.
///
/// Each submitted task runs on its own thread against the shared state
/// accessor. Apply tasks hold the backup manager lock from the first
/// capture through `create_restore_point`, so concurrent applies cannot
/// interleave their captures into one accumulator.
pub struct TaskOrchestrator {
    backup: Arc<Mutex<BackupManager>>,
    state: Arc<dyn SystemStateAccess>,
    result_receiver: channel::Receiver<TweakResult>,
    result_sender: channel::Sender<TweakResult>,
}

impl TaskOrchestrator {
    pub fn new(backup: Arc<Mutex<BackupManager>>, state: Arc<dyn SystemStateAccess>) -> Self {
        let (result_sender, result_receiver) = channel::unbounded::<TweakResult>();
        Self {
            backup,
            state,
            result_sender,
            result_receiver,
        }
    }

    /// Submits a new task to be processed.
    pub fn submit_task(&self, task: TweakTask) -> anyhow::Result<()> {
        let result_sender = self.result_sender.clone();
        let backup = Arc::clone(&self.backup);
        let state = Arc::clone(&self.state);

        thread::spawn(move || {
            let result = match task.action {
                TweakAction::Apply => {
                    // Only backup-participating methods run under the backup
                    // lock. Command methods never capture, and their
                    // subprocesses can take seconds; they get a scratch
                    // accumulator instead so the UI thread is never blocked
                    // behind them.
                    let outcome = if task.method.participates_in_backup() {
                        let mut backup = backup.lock().unwrap();
                        task.method
                            .apply(task.id, state.as_ref(), &mut backup)
                            .map(|()| {
                                backup.create_restore_point(&format!("Before: {}", task.name));
                            })
                    } else {
                        let mut scratch = BackupManager::new();
                        task.method.apply(task.id, state.as_ref(), &mut scratch)
                    };
                    match outcome {
                        Ok(()) => TweakResult {
                            id: task.id,
                            success: true,
                            error: None,
                            enabled_state: Some(true),
                            action: TweakAction::Apply,
                        },
                        Err(e) => TweakResult {
                            id: task.id,
                            success: false,
                            error: Some(e),
                            enabled_state: None,
                            action: TweakAction::Apply,
                        },
                    }
                }
                TweakAction::Revert => match task.method.revert(task.id, state.as_ref()) {
                    Ok(()) => TweakResult {
                        id: task.id,
                        success: true,
                        error: None,
                        enabled_state: Some(false),
                        action: TweakAction::Revert,
                    },
                    Err(e) => TweakResult {
                        id: task.id,
                        success: false,
                        error: Some(e),
                        enabled_state: None,
                        action: TweakAction::Revert,
                    },
                },
                TweakAction::ReadInitialState => {
                    match task.method.initial_state(task.id, state.as_ref()) {
                        Ok(enabled) => TweakResult {
                            id: task.id,
                            success: true,
                            error: None,
                            enabled_state: Some(enabled),
                            action: TweakAction::ReadInitialState,
                        },
                        Err(e) => TweakResult {
                            id: task.id,
                            success: false,
                            error: Some(e),
                            enabled_state: None,
                            action: TweakAction::ReadInitialState,
                        },
                    }
                }
            };
            if let Err(e) = result_sender.send(result) {
                error!("Failed to send result: {:?}", e);
            }
        });
        Ok(())
    }

    /// Attempts to receive a task result without blocking.
    pub fn try_recv_result(&self) -> Option<TweakResult> {
        self.result_receiver.try_recv().ok()
    }
}

/// Counts down the startup fan-out of initial-state reads.
///
/// A failed read still counts as finished; completion never hinges on a
/// probe that cannot succeed.
#[derive(Debug)]
pub struct InitialStateProgress {
    outstanding: usize,
}

impl InitialStateProgress {
    pub fn new(total: usize) -> Self {
        Self { outstanding: total }
    }

    pub fn note_read_finished(&mut self) {
        self.outstanding = self.outstanding.saturating_sub(1);
    }

    pub fn complete(&self) -> bool {
        self.outstanding == 0
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::state::testing::MemoryState;
    use crate::state::{RegistryLocation, RegistryRoot};
    use crate::tweaks::registry::disable_network_throttling;

    fn wait_for_result(orchestrator: &TaskOrchestrator) -> TweakResult {
        for _ in 0..200 {
            if let Some(result) = orchestrator.try_recv_result() {
                return result;
            }
            thread::sleep(Duration::from_millis(10));
        }
        panic!("no result within two seconds");
    }

    #[test]
    fn apply_task_seals_a_named_restore_point() {
        let state = Arc::new(MemoryState::new());
        let backup = Arc::new(Mutex::new(BackupManager::new()));
        let orchestrator = TaskOrchestrator::new(Arc::clone(&backup), state.clone());

        let location = RegistryLocation::new(
            RegistryRoot::LocalMachine,
            "SOFTWARE\\Microsoft\\Windows NT\\CurrentVersion\\Multimedia\\SystemProfile",
            "NetworkThrottlingIndex",
        );
        state.seed_dword(location.clone(), 10);

        let tweak = disable_network_throttling();
        orchestrator
            .submit_task(TweakTask {
                id: tweak.id,
                name: tweak.name,
                method: Arc::clone(&tweak.method),
                action: TweakAction::Apply,
            })
            .unwrap();

        let result = wait_for_result(&orchestrator);
        assert!(result.success);
        assert_eq!(result.enabled_state, Some(true));

        let backup = backup.lock().unwrap();
        let points = backup.restore_points();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].name, "Before: Disable Network Throttling");
        assert_eq!(backup.pending_captures(), 0);
    }

    #[test]
    fn read_initial_state_reports_enablement() {
        let state = Arc::new(MemoryState::new());
        let backup = Arc::new(Mutex::new(BackupManager::new()));
        let orchestrator = TaskOrchestrator::new(backup, state);

        let tweak = disable_network_throttling();
        orchestrator
            .submit_task(TweakTask {
                id: tweak.id,
                name: tweak.name,
                method: Arc::clone(&tweak.method),
                action: TweakAction::ReadInitialState,
            })
            .unwrap();

        let result = wait_for_result(&orchestrator);
        assert!(result.success);
        assert_eq!(result.enabled_state, Some(false));
    }

    #[test]
    fn non_participating_apply_runs_without_the_backup_lock() {
        use crate::tweaks::command::CommandTweak;

        let state = Arc::new(MemoryState::new());
        let backup = Arc::new(Mutex::new(BackupManager::new()));
        let orchestrator = TaskOrchestrator::new(Arc::clone(&backup), state);

        // Hold the lock for the whole task; a command-style apply must
        // complete anyway.
        let guard = backup.lock().unwrap();

        orchestrator
            .submit_task(TweakTask {
                id: TweakId::ProcessIdleTasks,
                name: "Process Idle Tasks",
                method: Arc::new(CommandTweak {
                    apply: vec![],
                    revert: vec![],
                    probe: None,
                }),
                action: TweakAction::Apply,
            })
            .unwrap();

        let result = wait_for_result(&orchestrator);
        assert!(result.success);
        assert!(guard.restore_points().is_empty());
        assert_eq!(guard.pending_captures(), 0);
        drop(guard);
    }

    #[test]
    fn initial_state_progress_counts_failed_reads_as_finished() {
        let mut progress = InitialStateProgress::new(2);
        assert!(!progress.complete());

        progress.note_read_finished();
        progress.note_read_finished();
        assert!(progress.complete());

        // Stray late results must not underflow.
        progress.note_read_finished();
        assert!(progress.complete());
    }

    #[test]
    fn empty_catalog_is_immediately_complete() {
        assert!(InitialStateProgress::new(0).complete());
    }

    #[test]
    fn failed_apply_reports_the_error() {
        let state = Arc::new(MemoryState::new());
        let backup = Arc::new(Mutex::new(BackupManager::new()));
        let orchestrator = TaskOrchestrator::new(Arc::clone(&backup), state.clone());

        let location = RegistryLocation::new(
            RegistryRoot::LocalMachine,
            "SOFTWARE\\Microsoft\\Windows NT\\CurrentVersion\\Multimedia\\SystemProfile",
            "NetworkThrottlingIndex",
        );
        state.fail_writes_to("NetworkThrottlingIndex");
        state.seed_dword(location, 10);

        let tweak = disable_network_throttling();
        orchestrator
            .submit_task(TweakTask {
                id: tweak.id,
                name: tweak.name,
                method: Arc::clone(&tweak.method),
                action: TweakAction::Apply,
            })
            .unwrap();

        let result = wait_for_result(&orchestrator);
        assert!(!result.success);
        assert!(result.error.is_some());
        assert_eq!(result.enabled_state, None);

        // A failed apply leaves no sealed restore point behind.
        assert!(backup.lock().unwrap().restore_points().is_empty());
    }
}
