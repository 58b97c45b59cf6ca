//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Math types and the transform constructors every pass relies on
//! - Frame timing
//! - Logging utilities

pub mod math;
pub mod time;
pub mod logging;
