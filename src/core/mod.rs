//! Core module - Data model, enumeration and progress rendering
//!
//! This module provides:
//! - Targets, file entries and per-target run state
//! - Restartable file enumeration
//! - The rate-limited progress reporter
//! - Unit conversions

pub mod model;
pub mod paths;
pub mod render;
pub mod util;
