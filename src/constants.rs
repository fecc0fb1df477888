// src/constants.rs

pub const UI_SPACING: f32 = 10.0; // Spacing between UI elements
pub const UI_PADDING: f32 = 3.0; // Padding inside UI elements

// Controls the dimensions of each tweak container.
pub const TWEAK_CONTAINER_HEIGHT: f32 = 30.0;
pub const TWEAK_CONTAINER_WIDTH: f32 = 300.0;

pub const COLUMN_WIDTH: f32 = TWEAK_CONTAINER_WIDTH + UI_SPACING;

pub const WINDOW_WIDTH: f32 = COLUMN_WIDTH * 3.0 + UI_SPACING * 4.0;
pub const WINDOW_HEIGHT: f32 = 840.0;

pub const LABEL_FONT_SIZE: f32 = 14.0;

/// File the backup log is exported to, next to the executable.
pub const BACKUP_LOG_FILE: &str = "backup_log.txt";

/// Name given to restore points created from the toolbar button.
pub const MANUAL_RESTORE_POINT: &str = "Manual restore point";
