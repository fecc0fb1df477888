// src/utils/registry.rs

use winreg::{
    enums::{
        RegType::{REG_DWORD, REG_SZ},
        HKEY_CLASSES_ROOT, HKEY_CURRENT_CONFIG, HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE, HKEY_USERS,
        KEY_READ, KEY_WRITE,
    },
    RegKey,
};

use crate::errors::RegistryError;
use crate::state::{RegistryLocation, RegistryRoot, RegistryValue};

fn hive(root: RegistryRoot) -> RegKey {
    RegKey::predef(match root {
        RegistryRoot::LocalMachine => HKEY_LOCAL_MACHINE,
        RegistryRoot::CurrentUser => HKEY_CURRENT_USER,
        RegistryRoot::ClassesRoot => HKEY_CLASSES_ROOT,
        RegistryRoot::Users => HKEY_USERS,
        RegistryRoot::CurrentConfig => HKEY_CURRENT_CONFIG,
    })
}

/// Reads the value at `location`.
///
/// # Returns
///
/// - `Ok(Some(RegistryValue))` if the value exists and is REG_DWORD or REG_SZ.
/// - `Ok(None)` if the key or value does not exist.
/// - `Err(RegistryError)` for access failures or unsupported value types.
pub fn read_value(location: &RegistryLocation) -> Result<Option<RegistryValue>, RegistryError> {
    let key = match hive(location.root).open_subkey_with_flags(&location.subkey, KEY_READ) {
        Ok(key) => key,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(RegistryError::KeyOpen(location.subkey.clone(), e)),
    };

    let raw = match key.get_raw_value(&location.value_name) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(RegistryError::ReadValue(location.to_string(), e)),
    };

    match raw.vtype {
        REG_DWORD => {
            if raw.bytes.len() < 4 {
                return Err(RegistryError::UnsupportedType(location.to_string()));
            }
            let dword =
                u32::from_le_bytes([raw.bytes[0], raw.bytes[1], raw.bytes[2], raw.bytes[3]]);
            Ok(Some(RegistryValue::Dword(dword)))
        }
        REG_SZ => {
            let wide: Vec<u16> = raw
                .bytes
                .chunks_exact(2)
                .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
                .take_while(|&c| c != 0)
                .collect();
            Ok(Some(RegistryValue::Sz(String::from_utf16_lossy(&wide))))
        }
        _ => Err(RegistryError::UnsupportedType(location.to_string())),
    }
}

/// Creates or overwrites the value at `location`, creating intermediate keys
/// as needed.
pub fn write_value(
    location: &RegistryLocation,
    value: &RegistryValue,
) -> Result<(), RegistryError> {
    let (key, _) = hive(location.root)
        .create_subkey(&location.subkey)
        .map_err(|e| RegistryError::KeyCreate(location.subkey.clone(), e))?;

    let result = match value {
        RegistryValue::Dword(v) => key.set_value(&location.value_name, v),
        RegistryValue::Sz(s) => key.set_value(&location.value_name, s),
    };
    result.map_err(|e| RegistryError::SetValue(location.to_string(), e))
}

/// Deletes the value at `location`. A missing key or value counts as success.
pub fn delete_value(location: &RegistryLocation) -> Result<(), RegistryError> {
    let key = match hive(location.root).open_subkey_with_flags(&location.subkey, KEY_WRITE) {
        Ok(key) => key,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(RegistryError::KeyOpen(location.subkey.clone(), e)),
    };

    match key.delete_value(&location.value_name) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(RegistryError::DeleteValue(location.to_string(), e)),
    }
}
