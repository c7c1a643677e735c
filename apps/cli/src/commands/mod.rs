//! Command implementations for the Stratum CLI.

pub mod list;
pub mod presets;
pub mod show;
