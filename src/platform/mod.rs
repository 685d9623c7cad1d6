// wellmatrix - platform/mod.rs
//
// Platform abstraction layer: config file loading, platform directories,
// filesystem helpers.
// Must NOT depend on: app.

pub mod config;
pub mod fs;
