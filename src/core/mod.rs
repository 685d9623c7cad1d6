// wellmatrix - core/mod.rs
//
// Core business logic layer.
// Must NOT depend on: platform or app.

pub mod discovery;
pub mod export;
pub mod grouping;
pub mod matrix;
pub mod model;
pub mod parser;
pub mod postprocess;
pub mod selector;
pub mod stats;
