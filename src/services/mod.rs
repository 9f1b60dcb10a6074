//! Services for gsedit: the identity directory and the resolution pipeline

pub mod directory;
pub mod identity;

pub use directory::*;
pub use identity::*;
