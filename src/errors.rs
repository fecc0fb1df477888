// src/errors.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Failed to open registry key '{0}': {1}")]
    KeyOpen(String, std::io::Error),

    #[error("Failed to create registry key '{0}': {1}")]
    KeyCreate(String, std::io::Error),

    #[error("Failed to read registry value '{0}': {1}")]
    ReadValue(String, std::io::Error),

    #[error("Failed to set registry value '{0}': {1}")]
    SetValue(String, std::io::Error),

    #[error("Failed to delete registry value '{0}': {1}")]
    DeleteValue(String, std::io::Error),

    #[error("Unsupported registry value type for '{0}'")]
    UnsupportedType(String),
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Failed to open Service Control Manager: {0}")]
    ManagerOpen(String),

    #[error("Failed to open service '{0}': {1}")]
    ServiceOpen(String, String),

    #[error("No such service '{0}'")]
    NotFound(String),

    #[error("Failed to query service '{0}': {1}")]
    Query(String, String),

    #[error("Failed to reconfigure service '{0}': {1}")]
    Configure(String, String),

    #[error("Failed to control service '{0}': {1}")]
    Control(String, String),

    #[error("Invalid service name '{0}'")]
    InvalidName(String),
}

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Failed to launch '{0}': {1}")]
    Launch(String, std::io::Error),

    #[error("'{0}' exited with status {1}")]
    ExitStatus(String, i32),
}
