// wellmatrix - app/mod.rs
//
// Application layer: run orchestration on top of core and platform.

pub mod run;
