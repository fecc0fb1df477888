// src/state.rs

use std::fmt;

use anyhow::Result;

/// Registry hive a location lives under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RegistryRoot {
    LocalMachine,
    CurrentUser,
    ClassesRoot,
    Users,
    CurrentConfig,
}

impl RegistryRoot {
    /// Short label used in reports and log lines ("HKLM", "HKCU", ...).
    pub fn label(&self) -> &'static str {
        match self {
            RegistryRoot::LocalMachine => "HKLM",
            RegistryRoot::CurrentUser => "HKCU",
            RegistryRoot::ClassesRoot => "HKCR",
            RegistryRoot::Users => "HKU",
            RegistryRoot::CurrentConfig => "HKCC",
        }
    }
}

/// Fully-qualified identity of a single registry value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RegistryLocation {
    pub root: RegistryRoot,
    pub subkey: String,
    pub value_name: String,
}

impl RegistryLocation {
    pub fn new(root: RegistryRoot, subkey: &str, value_name: &str) -> Self {
        Self {
            root,
            subkey: subkey.to_string(),
            value_name: value_name.to_string(),
        }
    }
}

impl fmt::Display for RegistryLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\\{} -> {}",
            self.root.label(),
            self.subkey,
            self.value_name
        )
    }
}

/// Typed registry payload. Replaces raw byte buffers with an explicit kind tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryValue {
    Dword(u32),
    Sz(String),
}

impl fmt::Display for RegistryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryValue::Dword(v) => write!(f, "Dword({})", v),
            RegistryValue::Sz(s) => write!(f, "Sz({})", s),
        }
    }
}

/// Service start mode as reported by the Service Control Manager.
///
/// The SCM's `SERVICE_NO_CHANGE` sentinel is not representable here; accessors
/// return `None` instead, and such services are never captured.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceStartMode {
    Boot,
    System,
    Automatic,
    Manual,
    Disabled,
}

impl ServiceStartMode {
    /// Maps a raw `dwStartType` DWORD. Returns `None` for values outside the
    /// documented range (including the no-change sentinel).
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(ServiceStartMode::Boot),
            1 => Some(ServiceStartMode::System),
            2 => Some(ServiceStartMode::Automatic),
            3 => Some(ServiceStartMode::Manual),
            4 => Some(ServiceStartMode::Disabled),
            _ => None,
        }
    }

    pub fn as_raw(&self) -> u32 {
        match self {
            ServiceStartMode::Boot => 0,
            ServiceStartMode::System => 1,
            ServiceStartMode::Automatic => 2,
            ServiceStartMode::Manual => 3,
            ServiceStartMode::Disabled => 4,
        }
    }
}

/// Narrow capability interface over the OS state the tweaks mutate and the
/// restore engine replays into. Production code uses [`SystemState`]; tests
/// use an in-memory implementation.
pub trait SystemStateAccess: Send + Sync {
    fn read_dword(&self, location: &RegistryLocation) -> Result<Option<u32>>;
    fn write_dword(&self, location: &RegistryLocation, value: u32) -> Result<()>;
    fn read_sz(&self, location: &RegistryLocation) -> Result<Option<String>>;
    fn write_sz(&self, location: &RegistryLocation, value: &str) -> Result<()>;
    fn delete_value(&self, location: &RegistryLocation) -> Result<()>;

    /// `Ok(None)` when the service does not exist or reports no usable mode.
    fn service_start_mode(&self, service: &str) -> Result<Option<ServiceStartMode>>;
    fn set_service_start_mode(&self, service: &str, mode: ServiceStartMode) -> Result<()>;
    fn stop_service(&self, service: &str) -> Result<()>;
    fn start_service(&self, service: &str) -> Result<()>;
}

/// Live accessor backed by winreg and the Service Control Manager.
#[cfg(windows)]
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemState;

#[cfg(windows)]
impl SystemStateAccess for SystemState {
    fn read_dword(&self, location: &RegistryLocation) -> Result<Option<u32>> {
        match crate::utils::registry::read_value(location)? {
            Some(RegistryValue::Dword(v)) => Ok(Some(v)),
            Some(other) => {
                anyhow::bail!("'{}' holds {:?}, expected REG_DWORD", location, other)
            }
            None => Ok(None),
        }
    }

    fn write_dword(&self, location: &RegistryLocation, value: u32) -> Result<()> {
        crate::utils::registry::write_value(location, &RegistryValue::Dword(value))
            .map_err(Into::into)
    }

    fn read_sz(&self, location: &RegistryLocation) -> Result<Option<String>> {
        match crate::utils::registry::read_value(location)? {
            Some(RegistryValue::Sz(s)) => Ok(Some(s)),
            Some(other) => {
                anyhow::bail!("'{}' holds {:?}, expected REG_SZ", location, other)
            }
            None => Ok(None),
        }
    }

    fn write_sz(&self, location: &RegistryLocation, value: &str) -> Result<()> {
        crate::utils::registry::write_value(location, &RegistryValue::Sz(value.to_string()))
            .map_err(Into::into)
    }

    fn delete_value(&self, location: &RegistryLocation) -> Result<()> {
        crate::utils::registry::delete_value(location).map_err(Into::into)
    }

    fn service_start_mode(&self, service: &str) -> Result<Option<ServiceStartMode>> {
        crate::utils::services::query_start_mode(service).map_err(Into::into)
    }

    fn set_service_start_mode(&self, service: &str, mode: ServiceStartMode) -> Result<()> {
        crate::utils::services::set_start_mode(service, mode).map_err(Into::into)
    }

    fn stop_service(&self, service: &str) -> Result<()> {
        crate::utils::services::stop_service(service).map_err(Into::into)
    }

    fn start_service(&self, service: &str) -> Result<()> {
        crate::utils::services::start_service(service).map_err(Into::into)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use super::*;

    /// In-memory stand-in for the Windows registry and SCM, with an optional
    /// set of locations whose writes fail.
    #[derive(Default)]
    pub struct MemoryState {
        pub values: Mutex<HashMap<RegistryLocation, RegistryValue>>,
        pub services: Mutex<HashMap<String, ServiceStartMode>>,
        pub failing_writes: Mutex<HashSet<String>>,
    }

    impl MemoryState {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn seed_dword(&self, location: RegistryLocation, value: u32) {
            self.values
                .lock()
                .unwrap()
                .insert(location, RegistryValue::Dword(value));
        }

        pub fn seed_sz(&self, location: RegistryLocation, value: &str) {
            self.values
                .lock()
                .unwrap()
                .insert(location, RegistryValue::Sz(value.to_string()));
        }

        pub fn seed_service(&self, name: &str, mode: ServiceStartMode) {
            self.services
                .lock()
                .unwrap()
                .insert(name.to_string(), mode);
        }

        /// Makes every subsequent write to `value_name` fail.
        pub fn fail_writes_to(&self, value_name: &str) {
            self.failing_writes
                .lock()
                .unwrap()
                .insert(value_name.to_string());
        }

        pub fn dword_at(&self, location: &RegistryLocation) -> Option<u32> {
            match self.values.lock().unwrap().get(location) {
                Some(RegistryValue::Dword(v)) => Some(*v),
                _ => None,
            }
        }

        pub fn sz_at(&self, location: &RegistryLocation) -> Option<String> {
            match self.values.lock().unwrap().get(location) {
                Some(RegistryValue::Sz(s)) => Some(s.clone()),
                _ => None,
            }
        }

        pub fn service_mode(&self, name: &str) -> Option<ServiceStartMode> {
            self.services.lock().unwrap().get(name).copied()
        }

        fn check_writable(&self, name: &str) -> Result<()> {
            if self.failing_writes.lock().unwrap().contains(name) {
                anyhow::bail!("simulated write failure for '{}'", name);
            }
            Ok(())
        }
    }

    impl SystemStateAccess for MemoryState {
        fn read_dword(&self, location: &RegistryLocation) -> Result<Option<u32>> {
            Ok(self.dword_at(location))
        }

        fn write_dword(&self, location: &RegistryLocation, value: u32) -> Result<()> {
            self.check_writable(&location.value_name)?;
            self.values
                .lock()
                .unwrap()
                .insert(location.clone(), RegistryValue::Dword(value));
            Ok(())
        }

        fn read_sz(&self, location: &RegistryLocation) -> Result<Option<String>> {
            Ok(self.sz_at(location))
        }

        fn write_sz(&self, location: &RegistryLocation, value: &str) -> Result<()> {
            self.check_writable(&location.value_name)?;
            self.values
                .lock()
                .unwrap()
                .insert(location.clone(), RegistryValue::Sz(value.to_string()));
            Ok(())
        }

        fn delete_value(&self, location: &RegistryLocation) -> Result<()> {
            self.check_writable(&location.value_name)?;
            self.values.lock().unwrap().remove(location);
            Ok(())
        }

        fn service_start_mode(&self, service: &str) -> Result<Option<ServiceStartMode>> {
            Ok(self.service_mode(service))
        }

        fn set_service_start_mode(&self, service: &str, mode: ServiceStartMode) -> Result<()> {
            self.check_writable(service)?;
            self.services
                .lock()
                .unwrap()
                .insert(service.to_string(), mode);
            Ok(())
        }

        fn stop_service(&self, _service: &str) -> Result<()> {
            Ok(())
        }

        fn start_service(&self, _service: &str) -> Result<()> {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_mode_raw_mapping_round_trips() {
        for raw in 0..=4 {
            let mode = ServiceStartMode::from_raw(raw).unwrap();
            assert_eq!(mode.as_raw(), raw);
        }
    }

    #[test]
    fn start_mode_sentinel_is_not_capturable() {
        // SERVICE_NO_CHANGE
        assert_eq!(ServiceStartMode::from_raw(0xFFFF_FFFF), None);
        assert_eq!(ServiceStartMode::from_raw(5), None);
    }

    #[test]
    fn location_display_uses_root_label() {
        let location = RegistryLocation::new(
            RegistryRoot::LocalMachine,
            "SYSTEM\\CurrentControlSet\\Control\\PriorityControl",
            "Win32PrioritySeparation",
        );
        assert_eq!(
            location.to_string(),
            "HKLM\\SYSTEM\\CurrentControlSet\\Control\\PriorityControl -> Win32PrioritySeparation"
        );
    }
}
