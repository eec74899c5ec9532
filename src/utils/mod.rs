//! Utility modules: developer log sink, logger configuration, numeric conversions.
pub mod devlog;
pub mod logger;
pub mod num;
