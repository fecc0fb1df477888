// src/tweaks/mod.rs

pub mod command;
pub mod method;
pub mod registry;
pub mod service;

use std::sync::Arc;

use indexmap::IndexMap;
use strum_macros::{Display, EnumIter};

pub use method::TweakMethod;

use crate::ui::TweakWidget;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TweakId {
    DisableNagle,
    DisableNetworkThrottling,
    DisableTcpAutoTuning,
    NetworkInterruptAffinity,
    DisableMouseAcceleration,
    MouseDataQueueSize,
    DisablePagingExecutive,
    LargeSystemCache,
    DisableMemoryCompression,
    Win32PrioritySeparation,
    GamesSchedulingPriority,
    DisableNvidiaHdcp,
    NvidiaPerCpuDpc,
    UsePlatformClock,
    DisableDynamicTick,
    UltimatePerformancePlan,
    DisableUsbSelectiveSuspend,
    DeliveryOptimizationMode,
    DisableSysMain,
    DisableWindowsSearch,
    DisablePrintSpooler,
    DisableDiagnosticsServices,
    ProcessIdleTasks,
}

/// Column/grouping label shown in the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum TweakCategory {
    Network,
    Input,
    Memory,
    Scheduler,
    Gpu,
    Timers,
    Power,
    Services,
}

impl TweakCategory {
    pub fn left() -> Vec<Self> {
        vec![Self::Network, Self::Input, Self::Timers]
    }

    pub fn middle() -> Vec<Self> {
        vec![Self::Memory, Self::Scheduler, Self::Gpu]
    }

    pub fn right() -> Vec<Self> {
        vec![Self::Power, Self::Services]
    }
}

/// How likely a tweak is to cause trouble; only `Safe` tweaks take part in
/// "Apply All Safe".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TweakRisk {
    Safe,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TweakStatus {
    Idle,
    Busy,
    Failed(String),
}

/// A single reversible optimisation and its UI state.
#[derive(Clone)]
pub struct Tweak {
    pub id: TweakId,
    pub name: &'static str,
    pub description: &'static str,
    pub category: TweakCategory,
    pub risk: TweakRisk,
    pub method: Arc<dyn TweakMethod>,
    pub widget: TweakWidget,
    pub status: TweakStatus,
    pub enabled: bool,
    pub requires_reboot: bool,
    pub pending_reboot: bool,
}

impl Tweak {
    pub fn new(
        id: TweakId,
        name: &'static str,
        description: &'static str,
        category: TweakCategory,
        risk: TweakRisk,
        method: Arc<dyn TweakMethod>,
        requires_reboot: bool,
    ) -> Self {
        Self {
            id,
            name,
            description,
            category,
            risk,
            method,
            widget: TweakWidget::Toggle,
            status: TweakStatus::Idle,
            enabled: false,
            requires_reboot,
            pending_reboot: false,
        }
    }

    /// One-shot actions render as a button instead of a toggle.
    pub fn with_widget(mut self, widget: TweakWidget) -> Self {
        self.widget = widget;
        self
    }
}

/// The full catalog in display order.
pub fn all_tweaks() -> IndexMap<TweakId, Tweak> {
    let mut tweaks = IndexMap::new();
    for tweak in registry::all_registry_tweaks()
        .into_iter()
        .chain(service::all_service_tweaks())
        .chain(command::all_command_tweaks())
    {
        tweaks.insert(tweak.id, tweak);
    }
    tweaks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_ids_are_unique() {
        let tweaks = all_tweaks();
        let from_lists = registry::all_registry_tweaks().len()
            + service::all_service_tweaks().len()
            + command::all_command_tweaks().len();
        assert_eq!(tweaks.len(), from_lists, "duplicate TweakId in catalog");
    }

    #[test]
    fn catalog_metadata_is_well_formed() {
        for (id, tweak) in all_tweaks() {
            assert_eq!(id, tweak.id);
            assert!(!tweak.name.is_empty(), "{:?} has no name", id);
            assert!(!tweak.description.is_empty(), "{:?} has no description", id);
        }
    }

    #[test]
    fn every_category_column_is_assigned() {
        use strum::IntoEnumIterator;
        let mut assigned = TweakCategory::left();
        assigned.extend(TweakCategory::middle());
        assigned.extend(TweakCategory::right());
        for category in TweakCategory::iter() {
            assert!(
                assigned.contains(&category),
                "{} missing from column layout",
                category
            );
        }
    }
}
