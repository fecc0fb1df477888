// src/lib.rs

pub mod backup;
pub mod constants;
pub mod errors;
pub mod orchestrator;
pub mod state;
pub mod tweaks;
pub mod ui;
pub mod utils;
