// src/tweaks/registry.rs

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use crate::backup::BackupManager;
use crate::state::{RegistryLocation, RegistryRoot, RegistryValue, SystemStateAccess};

use super::{method::TweakMethod, Tweak, TweakCategory, TweakId, TweakRisk};

/// What `revert` does to a modified location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RevertAction {
    /// Write back a known stock value.
    Set(RegistryValue),
    /// The value does not exist on a stock system; reverting deletes it.
    Delete,
}

/// One registry write that is part of a tweak.
#[derive(Clone, Debug)]
pub struct RegistryModification {
    pub location: RegistryLocation,
    pub target: RegistryValue,
    pub revert: RevertAction,
}

impl RegistryModification {
    fn set(
        root: RegistryRoot,
        subkey: &str,
        value_name: &str,
        target: RegistryValue,
        revert: RegistryValue,
    ) -> Self {
        Self {
            location: RegistryLocation::new(root, subkey, value_name),
            target,
            revert: RevertAction::Set(revert),
        }
    }

    fn delete_on_revert(
        root: RegistryRoot,
        subkey: &str,
        value_name: &str,
        target: RegistryValue,
    ) -> Self {
        Self {
            location: RegistryLocation::new(root, subkey, value_name),
            target,
            revert: RevertAction::Delete,
        }
    }
}

/// A tweak made up purely of registry writes.
pub struct RegistryTweak {
    pub modifications: Vec<RegistryModification>,
}

impl RegistryTweak {
    fn read_current(
        &self,
        modification: &RegistryModification,
        state: &dyn SystemStateAccess,
    ) -> Result<Option<RegistryValue>> {
        let location = &modification.location;
        let value = match modification.target {
            RegistryValue::Dword(_) => state
                .read_dword(location)
                .with_context(|| format!("Failed to read '{}'", location))?
                .map(RegistryValue::Dword),
            RegistryValue::Sz(_) => state
                .read_sz(location)
                .with_context(|| format!("Failed to read '{}'", location))?
                .map(RegistryValue::Sz),
        };
        Ok(value)
    }

    fn write(
        &self,
        location: &RegistryLocation,
        value: &RegistryValue,
        state: &dyn SystemStateAccess,
    ) -> Result<()> {
        match value {
            RegistryValue::Dword(v) => state.write_dword(location, *v),
            RegistryValue::Sz(s) => state.write_sz(location, s),
        }
        .with_context(|| format!("Failed to write '{}'", location))
    }
}

impl TweakMethod for RegistryTweak {
    fn initial_state(&self, id: TweakId, state: &dyn SystemStateAccess) -> Result<bool> {
        for modification in &self.modifications {
            match self.read_current(modification, state)? {
                Some(current) if current == modification.target => {}
                _ => return Ok(false),
            }
        }
        debug!("{:?} -> all registry values at target", id);
        Ok(true)
    }

    fn apply(
        &self,
        id: TweakId,
        state: &dyn SystemStateAccess,
        backup: &mut BackupManager,
    ) -> Result<()> {
        // Capture-before-mutate: every location that currently holds a value
        // goes into the accumulator before anything is written. Locations
        // with no existing value have nothing to restore and are skipped.
        for modification in &self.modifications {
            match self.read_current(modification, state)? {
                Some(RegistryValue::Dword(v)) => {
                    backup.capture_dword(modification.location.clone(), v)
                }
                Some(RegistryValue::Sz(s)) => backup.capture_sz(modification.location.clone(), s),
                None => debug!(
                    "{:?} -> '{}' has no current value, not captured",
                    id, modification.location
                ),
            }
        }

        for modification in &self.modifications {
            self.write(&modification.location, &modification.target, state)?;
            debug!(
                "{:?} -> set '{}' to {}",
                id, modification.location, modification.target
            );
        }
        Ok(())
    }

    fn revert(&self, id: TweakId, state: &dyn SystemStateAccess) -> Result<()> {
        for modification in self.modifications.iter().rev() {
            match &modification.revert {
                RevertAction::Set(value) => {
                    self.write(&modification.location, value, state)?;
                    debug!(
                        "{:?} -> restored '{}' to {}",
                        id, modification.location, value
                    );
                }
                RevertAction::Delete => {
                    state
                        .delete_value(&modification.location)
                        .with_context(|| format!("Failed to delete '{}'", modification.location))?;
                    debug!("{:?} -> deleted '{}'", id, modification.location);
                }
            }
        }
        Ok(())
    }
}

const TCP_PARAMETERS: &str = "SYSTEM\\CurrentControlSet\\Services\\Tcpip\\Parameters";
const SYSTEM_PROFILE: &str = "SOFTWARE\\Microsoft\\Windows NT\\CurrentVersion\\Multimedia\\SystemProfile";
const MMCSS_GAMES: &str =
    "SOFTWARE\\Microsoft\\Windows NT\\CurrentVersion\\Multimedia\\SystemProfile\\Tasks\\Games";
const MEMORY_MANAGEMENT: &str =
    "SYSTEM\\CurrentControlSet\\Control\\Session Manager\\Memory Management";
const PRIORITY_CONTROL: &str = "SYSTEM\\CurrentControlSet\\Control\\PriorityControl";
const MOUSE_KEY: &str = "Control Panel\\Mouse";
// Display adapter class key, device 0000.
const NV_DISPLAY_CLASS: &str =
    "SYSTEM\\CurrentControlSet\\Control\\Class\\{4d36e968-e325-11ce-bfc1-08002be10318}\\0000";
// Network adapter class key, device 0000.
const NET_CLASS: &str =
    "SYSTEM\\CurrentControlSet\\Control\\Class\\{4d36e972-e325-11ce-bfc1-08002be10318}\\0000";

pub fn all_registry_tweaks() -> Vec<Tweak> {
    vec![
        disable_nagle(),
        disable_network_throttling(),
        network_interrupt_affinity(),
        disable_mouse_acceleration(),
        mouse_data_queue_size(),
        disable_paging_executive(),
        large_system_cache(),
        win32_priority_separation(),
        games_scheduling_priority(),
        disable_nvidia_hdcp(),
        nvidia_per_cpu_dpc(),
        disable_usb_selective_suspend(),
        delivery_optimization_mode(),
    ]
}

pub fn disable_nagle() -> Tweak {
    Tweak::new(
        TweakId::DisableNagle,
        "Disable Nagle's Algorithm",
        "Sets TCPNoDelay and TcpAckFrequency to 1 for lower TCP latency. Nagle batching \
         improves throughput but can add up to 200 ms on interactive connections.",
        TweakCategory::Network,
        TweakRisk::Safe,
        Arc::new(RegistryTweak {
            modifications: vec![
                RegistryModification::delete_on_revert(
                    RegistryRoot::LocalMachine,
                    TCP_PARAMETERS,
                    "TCPNoDelay",
                    RegistryValue::Dword(1),
                ),
                RegistryModification::delete_on_revert(
                    RegistryRoot::LocalMachine,
                    TCP_PARAMETERS,
                    "TcpAckFrequency",
                    RegistryValue::Dword(1),
                ),
            ],
        }),
        false,
    )
}

pub fn disable_network_throttling() -> Tweak {
    Tweak::new(
        TweakId::DisableNetworkThrottling,
        "Disable Network Throttling",
        "Removes the multimedia network throttle (NetworkThrottlingIndex=0xFFFFFFFF) and \
         reserves no CPU for background multimedia (SystemResponsiveness=0).",
        TweakCategory::Network,
        TweakRisk::Safe,
        Arc::new(RegistryTweak {
            modifications: vec![
                RegistryModification::set(
                    RegistryRoot::LocalMachine,
                    SYSTEM_PROFILE,
                    "NetworkThrottlingIndex",
                    RegistryValue::Dword(0xFFFF_FFFF),
                    RegistryValue::Dword(10),
                ),
                RegistryModification::set(
                    RegistryRoot::LocalMachine,
                    SYSTEM_PROFILE,
                    "SystemResponsiveness",
                    RegistryValue::Dword(0),
                    RegistryValue::Dword(20),
                ),
            ],
        }),
        false,
    )
}

pub fn network_interrupt_affinity() -> Tweak {
    Tweak::new(
        TweakId::NetworkInterruptAffinity,
        "Pin Network Interrupts to CPU 0",
        "Sets IrqPolicySpecifiedProcessors for the network adapter so its interrupts stay \
         on one core, reducing cross-core DPC jitter.",
        TweakCategory::Network,
        TweakRisk::Medium,
        Arc::new(RegistryTweak {
            modifications: vec![
                RegistryModification::delete_on_revert(
                    RegistryRoot::LocalMachine,
                    NET_CLASS,
                    "*InterruptAffinityPolicy",
                    RegistryValue::Dword(5),
                ),
                RegistryModification::delete_on_revert(
                    RegistryRoot::LocalMachine,
                    NET_CLASS,
                    "*InterruptAffinity",
                    RegistryValue::Dword(0x01),
                ),
            ],
        }),
        true,
    )
}

pub fn disable_mouse_acceleration() -> Tweak {
    Tweak::new(
        TweakId::DisableMouseAcceleration,
        "Disable Mouse Acceleration",
        "Zeroes MouseSpeed and both MouseThreshold values so pointer distance maps 1:1 to \
         physical movement.",
        TweakCategory::Input,
        TweakRisk::Safe,
        Arc::new(RegistryTweak {
            modifications: vec![
                RegistryModification::set(
                    RegistryRoot::CurrentUser,
                    MOUSE_KEY,
                    "MouseSpeed",
                    RegistryValue::Sz("0".to_string()),
                    RegistryValue::Sz("1".to_string()),
                ),
                RegistryModification::set(
                    RegistryRoot::CurrentUser,
                    MOUSE_KEY,
                    "MouseThreshold1",
                    RegistryValue::Sz("0".to_string()),
                    RegistryValue::Sz("6".to_string()),
                ),
                RegistryModification::set(
                    RegistryRoot::CurrentUser,
                    MOUSE_KEY,
                    "MouseThreshold2",
                    RegistryValue::Sz("0".to_string()),
                    RegistryValue::Sz("10".to_string()),
                ),
            ],
        }),
        false,
    )
}

pub fn mouse_data_queue_size() -> Tweak {
    Tweak::new(
        TweakId::MouseDataQueueSize,
        "Raise Mouse Data Queue Size",
        "Sets MouseDataQueueSize to 128 for the mouse class and HID drivers, helping \
         high-polling-rate mice avoid dropped packets.",
        TweakCategory::Input,
        TweakRisk::Safe,
        Arc::new(RegistryTweak {
            modifications: vec![
                RegistryModification::set(
                    RegistryRoot::LocalMachine,
                    "SYSTEM\\CurrentControlSet\\Services\\mouclass\\Parameters",
                    "MouseDataQueueSize",
                    RegistryValue::Dword(128),
                    RegistryValue::Dword(100),
                ),
                RegistryModification::set(
                    RegistryRoot::LocalMachine,
                    "SYSTEM\\CurrentControlSet\\Services\\mouhid\\Parameters",
                    "MouseDataQueueSize",
                    RegistryValue::Dword(128),
                    RegistryValue::Dword(100),
                ),
            ],
        }),
        true,
    )
}

pub fn disable_paging_executive() -> Tweak {
    Tweak::new(
        TweakId::DisablePagingExecutive,
        "Disable Paging Executive",
        "Keeps kernel-mode drivers and system code in RAM instead of paging them to disk.",
        TweakCategory::Memory,
        TweakRisk::Safe,
        Arc::new(RegistryTweak {
            modifications: vec![RegistryModification::set(
                RegistryRoot::LocalMachine,
                MEMORY_MANAGEMENT,
                "DisablePagingExecutive",
                RegistryValue::Dword(1),
                RegistryValue::Dword(0),
            )],
        }),
        true,
    )
}

pub fn large_system_cache() -> Tweak {
    Tweak::new(
        TweakId::LargeSystemCache,
        "Large System Cache",
        "Favors the file-system cache over process working sets. Can help data-heavy \
         background workloads; desktops usually prefer this off.",
        TweakCategory::Memory,
        TweakRisk::Medium,
        Arc::new(RegistryTweak {
            modifications: vec![RegistryModification::set(
                RegistryRoot::LocalMachine,
                MEMORY_MANAGEMENT,
                "LargeSystemCache",
                RegistryValue::Dword(1),
                RegistryValue::Dword(0),
            )],
        }),
        true,
    )
}

pub fn win32_priority_separation() -> Tweak {
    Tweak::new(
        TweakId::Win32PrioritySeparation,
        "Foreground Priority Separation",
        "Sets Win32PrioritySeparation to 26 (short, variable quanta favoring the \
         foreground process).",
        TweakCategory::Scheduler,
        TweakRisk::Safe,
        Arc::new(RegistryTweak {
            modifications: vec![RegistryModification::set(
                RegistryRoot::LocalMachine,
                PRIORITY_CONTROL,
                "Win32PrioritySeparation",
                RegistryValue::Dword(26),
                RegistryValue::Dword(2),
            )],
        }),
        false,
    )
}

pub fn games_scheduling_priority() -> Tweak {
    Tweak::new(
        TweakId::GamesSchedulingPriority,
        "Raise Games Task Priority",
        "Raises the MMCSS 'Games' task profile: GPU priority 8, CPU priority 6, High \
         scheduling and SFIO categories.",
        TweakCategory::Scheduler,
        TweakRisk::Safe,
        Arc::new(RegistryTweak {
            modifications: vec![
                RegistryModification::set(
                    RegistryRoot::LocalMachine,
                    MMCSS_GAMES,
                    "GPU Priority",
                    RegistryValue::Dword(8),
                    RegistryValue::Dword(2),
                ),
                RegistryModification::set(
                    RegistryRoot::LocalMachine,
                    MMCSS_GAMES,
                    "Priority",
                    RegistryValue::Dword(6),
                    RegistryValue::Dword(2),
                ),
                RegistryModification::set(
                    RegistryRoot::LocalMachine,
                    MMCSS_GAMES,
                    "Scheduling Category",
                    RegistryValue::Sz("High".to_string()),
                    RegistryValue::Sz("Medium".to_string()),
                ),
                RegistryModification::set(
                    RegistryRoot::LocalMachine,
                    MMCSS_GAMES,
                    "SFIO Priority",
                    RegistryValue::Sz("High".to_string()),
                    RegistryValue::Sz("Normal".to_string()),
                ),
            ],
        }),
        false,
    )
}

pub fn disable_nvidia_hdcp() -> Tweak {
    Tweak::new(
        TweakId::DisableNvidiaHdcp,
        "Disable NVIDIA HDCP",
        "Turns off HDCP negotiation on the display adapter (RmHdcpEnable=0). Protected \
         video playback will stop working while applied.",
        TweakCategory::Gpu,
        TweakRisk::Medium,
        Arc::new(RegistryTweak {
            modifications: vec![RegistryModification::set(
                RegistryRoot::LocalMachine,
                NV_DISPLAY_CLASS,
                "RmHdcpEnable",
                RegistryValue::Dword(0),
                RegistryValue::Dword(1),
            )],
        }),
        true,
    )
}

pub fn nvidia_per_cpu_dpc() -> Tweak {
    Tweak::new(
        TweakId::NvidiaPerCpuDpc,
        "NVIDIA Per-CPU DPC Steering",
        "Enables RmGpsPsEnablePerCpuCoreDpc so the NVIDIA driver spreads its DPCs across \
         cores instead of stacking them on CPU 0.",
        TweakCategory::Gpu,
        TweakRisk::Medium,
        Arc::new(RegistryTweak {
            modifications: vec![RegistryModification::delete_on_revert(
                RegistryRoot::LocalMachine,
                NV_DISPLAY_CLASS,
                "RmGpsPsEnablePerCpuCoreDpc",
                RegistryValue::Dword(1),
            )],
        }),
        true,
    )
}

pub fn disable_usb_selective_suspend() -> Tweak {
    Tweak::new(
        TweakId::DisableUsbSelectiveSuspend,
        "Disable USB Selective Suspend",
        "Stops USB hubs from power-gating idle devices, avoiding wake-up latency on \
         mice and keyboards.",
        TweakCategory::Power,
        TweakRisk::Safe,
        Arc::new(RegistryTweak {
            modifications: vec![RegistryModification::set(
                RegistryRoot::LocalMachine,
                "SYSTEM\\CurrentControlSet\\Services\\USB",
                "DisableSelectiveSuspend",
                RegistryValue::Dword(1),
                RegistryValue::Dword(0),
            )],
        }),
        false,
    )
}

pub fn delivery_optimization_mode() -> Tweak {
    Tweak::new(
        TweakId::DeliveryOptimizationMode,
        "Disable Update Peer Delivery",
        "Sets DODownloadMode to 0 so Windows Update stops seeding to and fetching from \
         peers in the background.",
        TweakCategory::Services,
        TweakRisk::Safe,
        Arc::new(RegistryTweak {
            modifications: vec![RegistryModification::set(
                RegistryRoot::LocalMachine,
                "SOFTWARE\\Policies\\Microsoft\\Windows\\DeliveryOptimization",
                "DODownloadMode",
                RegistryValue::Dword(0),
                RegistryValue::Dword(1),
            )],
        }),
        false,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::MemoryState;

    #[test]
    fn apply_captures_prior_values_before_writing() {
        let state = MemoryState::new();
        let mut backup = BackupManager::new();
        let tweak = disable_network_throttling();

        let throttle = RegistryLocation::new(
            RegistryRoot::LocalMachine,
            SYSTEM_PROFILE,
            "NetworkThrottlingIndex",
        );
        let responsiveness = RegistryLocation::new(
            RegistryRoot::LocalMachine,
            SYSTEM_PROFILE,
            "SystemResponsiveness",
        );
        state.seed_dword(throttle.clone(), 10);
        state.seed_dword(responsiveness.clone(), 20);

        tweak
            .method
            .apply(tweak.id, &state, &mut backup)
            .expect("apply");

        assert_eq!(state.dword_at(&throttle), Some(0xFFFF_FFFF));
        assert_eq!(state.dword_at(&responsiveness), Some(0));
        assert_eq!(backup.pending_captures(), 2);
    }

    #[test]
    fn locations_without_a_value_are_not_captured() {
        let state = MemoryState::new();
        let mut backup = BackupManager::new();
        let tweak = disable_nagle();

        // TCPNoDelay/TcpAckFrequency absent on a stock system.
        tweak
            .method
            .apply(tweak.id, &state, &mut backup)
            .expect("apply");

        assert_eq!(backup.pending_captures(), 0);
    }

    #[test]
    fn restore_undoes_an_applied_tweak_end_to_end() {
        let state = MemoryState::new();
        let mut backup = BackupManager::new();
        let tweak = win32_priority_separation();

        let location = RegistryLocation::new(
            RegistryRoot::LocalMachine,
            PRIORITY_CONTROL,
            "Win32PrioritySeparation",
        );
        state.seed_dword(location.clone(), 2);

        tweak
            .method
            .apply(tweak.id, &state, &mut backup)
            .expect("apply");
        backup.create_restore_point("Before: Foreground Priority Separation");
        assert_eq!(state.dword_at(&location), Some(26));

        assert!(backup.restore_latest(&state));
        assert_eq!(state.dword_at(&location), Some(2));
    }

    #[test]
    fn initial_state_tracks_target_values() {
        let state = MemoryState::new();
        let mut backup = BackupManager::new();
        let tweak = disable_mouse_acceleration();

        assert!(!tweak.method.initial_state(tweak.id, &state).unwrap());

        tweak
            .method
            .apply(tweak.id, &state, &mut backup)
            .expect("apply");
        assert!(tweak.method.initial_state(tweak.id, &state).unwrap());

        tweak.method.revert(tweak.id, &state).expect("revert");
        assert!(!tweak.method.initial_state(tweak.id, &state).unwrap());
    }

    #[test]
    fn revert_deletes_values_marked_delete_on_revert() {
        let state = MemoryState::new();
        let mut backup = BackupManager::new();
        let tweak = disable_nagle();

        tweak
            .method
            .apply(tweak.id, &state, &mut backup)
            .expect("apply");
        tweak.method.revert(tweak.id, &state).expect("revert");

        let location =
            RegistryLocation::new(RegistryRoot::LocalMachine, TCP_PARAMETERS, "TCPNoDelay");
        assert_eq!(state.dword_at(&location), None);
    }

    #[test]
    fn catalog_locations_are_well_formed() {
        for tweak in all_registry_tweaks() {
            assert!(!tweak.name.is_empty());
        }
    }
}
