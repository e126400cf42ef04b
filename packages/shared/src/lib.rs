//! Utilities shared by the Quill collaboration packages.

pub mod logger;
pub mod time;
