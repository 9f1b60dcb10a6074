//! Data models for the gsedit format engine

pub mod cfg;
pub mod roster;

pub use cfg::*;
pub use roster::*;
