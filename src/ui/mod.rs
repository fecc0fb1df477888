// src/ui/mod.rs

pub mod button;
pub mod switch;

/// Which control a tweak renders as.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TweakWidget {
    /// Reversible on/off tweaks.
    Toggle,
    /// One-shot actions.
    Button,
}
