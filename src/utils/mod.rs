// src/utils/mod.rs

pub mod commands;
#[cfg(windows)]
pub mod registry;
#[cfg(windows)]
pub mod services;
#[cfg(windows)]
pub mod windows;
