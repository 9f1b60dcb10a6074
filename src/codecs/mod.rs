//! Format codecs: privileges XML, dedicated cfg, and the format detector

pub mod cfg;
pub mod detect;
pub mod privileges;

pub use detect::*;
