//! envseal core - shared paths and configuration for envseal tools
//!
//! Keeps the tool defaults (key file name, key environment variable,
//! skeleton rendering, editor) in one place so the library and the
//! binary agree on them.

pub mod config;
pub mod paths;

pub use config::{Config, KeyConfig, SkeletonConfig};
pub use paths::Paths;
