//! Backends module - File cache operations
//!
//! Provides:
//! - warm: Two-pass cache warming
//! - clear: Clearing the OS file cache

pub mod clear;
pub mod warm;
