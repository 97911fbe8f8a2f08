//! Foundation module - Core utilities and types
//!
//! This module provides small utilities used throughout the crate:
//! - Integer geometry value types
//! - Logging setup

pub mod geometry;
pub mod logging;

pub use geometry::{Area, Point, Rect};
