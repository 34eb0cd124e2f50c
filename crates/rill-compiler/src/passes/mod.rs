//! The two-pass driver: declaration registration, then body compilation.

pub mod compilation;
pub mod registration;

pub use compilation::compile_unit;
