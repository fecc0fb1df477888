// src/tweaks/service.rs

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{debug, warn};

use crate::backup::BackupManager;
use crate::state::{ServiceStartMode, SystemStateAccess};

use super::{method::TweakMethod, Tweak, TweakCategory, TweakId, TweakRisk};

/// One Windows service the tweak reconfigures.
pub struct ServiceTarget {
    pub service: &'static str,
    pub target: ServiceStartMode,
    pub revert: ServiceStartMode,
    /// Stop the service after switching its start type.
    pub stop_on_apply: bool,
    /// Start the service again when reverting.
    pub start_on_revert: bool,
}

impl ServiceTarget {
    fn disable(service: &'static str, revert: ServiceStartMode) -> Self {
        Self {
            service,
            target: ServiceStartMode::Disabled,
            revert,
            stop_on_apply: true,
            start_on_revert: true,
        }
    }
}

/// A tweak that changes service start types and running state.
pub struct ServiceTweak {
    pub targets: Vec<ServiceTarget>,
}

impl TweakMethod for ServiceTweak {
    fn initial_state(&self, _id: TweakId, state: &dyn SystemStateAccess) -> Result<bool> {
        for target in &self.targets {
            let mode = state
                .service_start_mode(target.service)
                .with_context(|| format!("Failed to query service '{}'", target.service))?;
            if mode != Some(target.target) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn apply(
        &self,
        id: TweakId,
        state: &dyn SystemStateAccess,
        backup: &mut BackupManager,
    ) -> Result<()> {
        // Current start modes go into the accumulator before anything is
        // reconfigured, so a restore point can put them back.
        for target in &self.targets {
            match state
                .service_start_mode(target.service)
                .with_context(|| format!("Failed to query service '{}'", target.service))?
            {
                Some(mode) => backup.capture_service_state(target.service, mode),
                None => bail!("Service '{}' does not exist", target.service),
            }
        }

        for target in &self.targets {
            state
                .set_service_start_mode(target.service, target.target)
                .with_context(|| format!("Failed to reconfigure service '{}'", target.service))?;
            debug!("{:?} -> '{}' start type set to {:?}", id, target.service, target.target);

            if target.stop_on_apply {
                // A service that refuses to stop will still be disabled on the
                // next boot, so the failure is logged rather than propagated.
                if let Err(e) = state.stop_service(target.service) {
                    warn!("Could not stop service '{}': {:#}", target.service, e);
                }
            }
        }
        Ok(())
    }

    fn revert(&self, id: TweakId, state: &dyn SystemStateAccess) -> Result<()> {
        for target in self.targets.iter().rev() {
            state
                .set_service_start_mode(target.service, target.revert)
                .with_context(|| format!("Failed to reconfigure service '{}'", target.service))?;
            debug!("{:?} -> '{}' start type set to {:?}", id, target.service, target.revert);

            if target.start_on_revert {
                if let Err(e) = state.start_service(target.service) {
                    warn!("Could not start service '{}': {:#}", target.service, e);
                }
            }
        }
        Ok(())
    }
}

pub fn all_service_tweaks() -> Vec<Tweak> {
    vec![
        disable_sysmain(),
        disable_windows_search(),
        disable_print_spooler(),
        disable_diagnostics_services(),
    ]
}

pub fn disable_sysmain() -> Tweak {
    Tweak::new(
        TweakId::DisableSysMain,
        "Disable SysMain (Superfetch)",
        "Stops and disables the SysMain prefetcher. Its background disk and memory \
         activity can cause stutter on systems with an SSD.",
        TweakCategory::Services,
        TweakRisk::Safe,
        Arc::new(ServiceTweak {
            targets: vec![ServiceTarget::disable("SysMain", ServiceStartMode::Automatic)],
        }),
        false,
    )
}

pub fn disable_windows_search() -> Tweak {
    Tweak::new(
        TweakId::DisableWindowsSearch,
        "Disable Windows Search Indexing",
        "Stops and disables the WSearch indexer. File searches become slower but its \
         background I/O goes away entirely.",
        TweakCategory::Services,
        TweakRisk::Medium,
        Arc::new(ServiceTweak {
            targets: vec![ServiceTarget::disable("WSearch", ServiceStartMode::Automatic)],
        }),
        false,
    )
}

pub fn disable_print_spooler() -> Tweak {
    Tweak::new(
        TweakId::DisablePrintSpooler,
        "Disable Print Spooler",
        "Stops and disables the Spooler service. Printing stops working while this is \
         applied.",
        TweakCategory::Services,
        TweakRisk::Medium,
        Arc::new(ServiceTweak {
            targets: vec![ServiceTarget::disable("Spooler", ServiceStartMode::Automatic)],
        }),
        false,
    )
}

pub fn disable_diagnostics_services() -> Tweak {
    Tweak::new(
        TweakId::DisableDiagnosticsServices,
        "Disable Diagnostics Services",
        "Stops and disables the Diagnostic Policy Service and the WAP push message \
         router, both frequent sources of background telemetry activity.",
        TweakCategory::Services,
        TweakRisk::Medium,
        Arc::new(ServiceTweak {
            targets: vec![
                ServiceTarget::disable("DiagSvc", ServiceStartMode::Manual),
                ServiceTarget::disable("dmwappushservice", ServiceStartMode::Manual),
            ],
        }),
        false,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::MemoryState;

    #[test]
    fn apply_captures_modes_then_disables_and_stops() {
        let state = MemoryState::new();
        let mut backup = BackupManager::new();
        let tweak = disable_sysmain();

        state.seed_service("SysMain", ServiceStartMode::Automatic);

        tweak
            .method
            .apply(tweak.id, &state, &mut backup)
            .expect("apply");

        assert_eq!(state.service_mode("SysMain"), Some(ServiceStartMode::Disabled));
        assert_eq!(backup.pending_captures(), 1);
    }

    #[test]
    fn apply_refuses_when_a_service_is_missing() {
        let state = MemoryState::new();
        let mut backup = BackupManager::new();
        let tweak = disable_diagnostics_services();

        state.seed_service("DiagSvc", ServiceStartMode::Manual);
        // dmwappushservice absent.

        assert!(tweak.method.apply(tweak.id, &state, &mut backup).is_err());
    }

    #[test]
    fn restore_puts_the_original_start_mode_back() {
        let state = MemoryState::new();
        let mut backup = BackupManager::new();
        let tweak = disable_windows_search();

        state.seed_service("WSearch", ServiceStartMode::Automatic);

        tweak
            .method
            .apply(tweak.id, &state, &mut backup)
            .expect("apply");
        backup.create_restore_point("Before: Disable Windows Search Indexing");
        assert_eq!(state.service_mode("WSearch"), Some(ServiceStartMode::Disabled));

        assert!(backup.restore_latest(&state));
        assert_eq!(state.service_mode("WSearch"), Some(ServiceStartMode::Automatic));
    }

    #[test]
    fn initial_state_reflects_start_mode() {
        let state = MemoryState::new();
        let tweak = disable_print_spooler();

        state.seed_service("Spooler", ServiceStartMode::Automatic);
        assert!(!tweak.method.initial_state(tweak.id, &state).unwrap());

        state.seed_service("Spooler", ServiceStartMode::Disabled);
        assert!(tweak.method.initial_state(tweak.id, &state).unwrap());
    }

    #[test]
    fn revert_restores_the_stock_start_mode() {
        let state = MemoryState::new();
        let mut backup = BackupManager::new();
        let tweak = disable_sysmain();

        state.seed_service("SysMain", ServiceStartMode::Automatic);
        tweak
            .method
            .apply(tweak.id, &state, &mut backup)
            .expect("apply");
        tweak.method.revert(tweak.id, &state).expect("revert");

        assert_eq!(state.service_mode("SysMain"), Some(ServiceStartMode::Automatic));
    }
}
