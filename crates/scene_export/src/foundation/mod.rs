//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the exporter:
//! - Math types and single-axis rotation helpers
//! - Arena keys and handle maps
//! - Logging utilities

pub mod math;
pub mod collections;
pub mod logging;
