// src/tweaks/command.rs

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use crate::backup::BackupManager;
use crate::state::SystemStateAccess;
use crate::ui::TweakWidget;

use super::{method::TweakMethod, Tweak, TweakCategory, TweakId, TweakRisk};

/// One external program invocation.
#[derive(Clone, Debug)]
pub struct CommandSpec {
    pub program: &'static str,
    pub args: &'static [&'static str],
}

/// How `initial_state` decides whether the tweak is active: run `program`
/// and look for `match_on` in its output, case-insensitively.
#[derive(Clone, Debug)]
pub struct StateProbe {
    pub program: &'static str,
    pub args: &'static [&'static str],
    pub match_on: &'static str,
}

/// A tweak driven by system utilities (netsh, bcdedit, powercfg, ...).
///
/// These change state the registry snapshot cannot capture, so they opt
/// out of the backup accumulator and rely on their revert commands.
pub struct CommandTweak {
    pub apply: Vec<CommandSpec>,
    pub revert: Vec<CommandSpec>,
    pub probe: Option<StateProbe>,
}

impl CommandTweak {
    fn run_all(&self, id: TweakId, specs: &[CommandSpec]) -> Result<()> {
        for spec in specs {
            crate::utils::commands::run_command(spec.program, spec.args)
                .with_context(|| format!("'{} {}' failed", spec.program, spec.args.join(" ")))?;
            debug!("{:?} -> ran '{} {}'", id, spec.program, spec.args.join(" "));
        }
        Ok(())
    }
}

impl TweakMethod for CommandTweak {
    fn initial_state(&self, _id: TweakId, _state: &dyn SystemStateAccess) -> Result<bool> {
        let Some(probe) = &self.probe else {
            // No probe means the tool cannot tell; treat as not applied.
            return Ok(false);
        };
        let output = crate::utils::commands::capture_output(probe.program, probe.args)
            .with_context(|| format!("'{}' probe failed", probe.program))?;
        Ok(output
            .to_lowercase()
            .contains(&probe.match_on.to_lowercase()))
    }

    fn apply(
        &self,
        id: TweakId,
        _state: &dyn SystemStateAccess,
        _backup: &mut BackupManager,
    ) -> Result<()> {
        self.run_all(id, &self.apply)
    }

    fn revert(&self, id: TweakId, _state: &dyn SystemStateAccess) -> Result<()> {
        self.run_all(id, &self.revert)
    }

    fn participates_in_backup(&self) -> bool {
        false
    }
}

pub fn all_command_tweaks() -> Vec<Tweak> {
    vec![
        disable_tcp_auto_tuning(),
        disable_memory_compression(),
        use_platform_clock(),
        disable_dynamic_tick(),
        ultimate_performance_plan(),
        process_idle_tasks(),
    ]
}

pub fn disable_tcp_auto_tuning() -> Tweak {
    Tweak::new(
        TweakId::DisableTcpAutoTuning,
        "Disable TCP Auto-Tuning",
        "Fixes the TCP receive window via netsh. Removes auto-tuning jitter at the cost \
         of throughput on fast, high-latency links.",
        TweakCategory::Network,
        TweakRisk::Medium,
        Arc::new(CommandTweak {
            apply: vec![CommandSpec {
                program: "netsh",
                args: &["interface", "tcp", "set", "global", "autotuninglevel=disabled"],
            }],
            revert: vec![CommandSpec {
                program: "netsh",
                args: &["interface", "tcp", "set", "global", "autotuninglevel=normal"],
            }],
            probe: Some(StateProbe {
                program: "netsh",
                args: &["interface", "tcp", "show", "global"],
                match_on: "disabled",
            }),
        }),
        false,
    )
}

pub fn disable_memory_compression() -> Tweak {
    Tweak::new(
        TweakId::DisableMemoryCompression,
        "Disable Memory Compression",
        "Turns off the kernel memory compression store, trading a little RAM headroom \
         for less CPU time in the System process.",
        TweakCategory::Memory,
        TweakRisk::Safe,
        Arc::new(CommandTweak {
            apply: vec![CommandSpec {
                program: "powershell",
                args: &["-NoProfile", "-Command", "Disable-MMAgent -MemoryCompression"],
            }],
            revert: vec![CommandSpec {
                program: "powershell",
                args: &["-NoProfile", "-Command", "Enable-MMAgent -MemoryCompression"],
            }],
            probe: Some(StateProbe {
                program: "powershell",
                args: &["-NoProfile", "-Command", "(Get-MMAgent).MemoryCompression"],
                match_on: "false",
            }),
        }),
        true,
    )
}

pub fn use_platform_clock() -> Tweak {
    Tweak::new(
        TweakId::UsePlatformClock,
        "Force Platform Clock (HPET)",
        "Makes the kernel time off the platform clock with enhanced TSC sync. Helps on \
         hardware with unstable TSC; hurts where the TSC is already reliable.",
        TweakCategory::Timers,
        TweakRisk::High,
        Arc::new(CommandTweak {
            apply: vec![
                CommandSpec {
                    program: "bcdedit",
                    args: &["/set", "useplatformclock", "true"],
                },
                CommandSpec {
                    program: "bcdedit",
                    args: &["/set", "tscsyncpolicy", "enhanced"],
                },
            ],
            revert: vec![
                CommandSpec {
                    program: "bcdedit",
                    args: &["/deletevalue", "useplatformclock"],
                },
                CommandSpec {
                    program: "bcdedit",
                    args: &["/deletevalue", "tscsyncpolicy"],
                },
            ],
            probe: Some(StateProbe {
                program: "bcdedit",
                args: &["/enum", "{current}"],
                match_on: "useplatformclock",
            }),
        }),
        true,
    )
}

pub fn disable_dynamic_tick() -> Tweak {
    Tweak::new(
        TweakId::DisableDynamicTick,
        "Disable Dynamic Tick",
        "Keeps the scheduler tick firing at a fixed rate instead of coalescing idle \
         ticks, smoothing timer latency at a small power cost.",
        TweakCategory::Timers,
        TweakRisk::Medium,
        Arc::new(CommandTweak {
            apply: vec![CommandSpec {
                program: "bcdedit",
                args: &["/set", "disabledynamictick", "yes"],
            }],
            revert: vec![CommandSpec {
                program: "bcdedit",
                args: &["/deletevalue", "disabledynamictick"],
            }],
            probe: Some(StateProbe {
                program: "bcdedit",
                args: &["/enum", "{current}"],
                match_on: "disabledynamictick",
            }),
        }),
        true,
    )
}

const ULTIMATE_PLAN_GUID: &str = "e9a42b02-d5df-448d-aa00-03f14749eb61";

pub fn ultimate_performance_plan() -> Tweak {
    Tweak::new(
        TweakId::UltimatePerformancePlan,
        "Ultimate Performance Power Plan",
        "Duplicates and activates the hidden Ultimate Performance scheme, which disables \
         most CPU and device power gating.",
        TweakCategory::Power,
        TweakRisk::Safe,
        Arc::new(CommandTweak {
            apply: vec![
                CommandSpec {
                    program: "powercfg",
                    args: &["/duplicatescheme", ULTIMATE_PLAN_GUID],
                },
                CommandSpec {
                    program: "powercfg",
                    args: &["/setactive", ULTIMATE_PLAN_GUID],
                },
            ],
            revert: vec![CommandSpec {
                // Stock "Balanced" scheme.
                program: "powercfg",
                args: &["/setactive", "381b4222-f694-41f0-9685-ff5bb260df2e"],
            }],
            probe: Some(StateProbe {
                program: "powercfg",
                args: &["/getactivescheme"],
                match_on: ULTIMATE_PLAN_GUID,
            }),
        }),
        false,
    )
}

pub fn process_idle_tasks() -> Tweak {
    Tweak::new(
        TweakId::ProcessIdleTasks,
        "Process Idle Tasks",
        "Runs every queued idle-time maintenance task immediately, so deferred \
         housekeeping does not kick in mid-session.",
        TweakCategory::Scheduler,
        TweakRisk::Safe,
        Arc::new(CommandTweak {
            apply: vec![CommandSpec {
                program: "rundll32.exe",
                args: &["advapi32.dll,ProcessIdleTasks"],
            }],
            // One-shot: there is nothing to undo.
            revert: vec![],
            probe: None,
        }),
        false,
    )
    .with_widget(TweakWidget::Button)
}
