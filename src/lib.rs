//! Orbit propagation and ground-station visibility windows.

pub mod cancel;
pub mod config;
pub mod orbit;
pub mod predict;
pub mod tracker;
