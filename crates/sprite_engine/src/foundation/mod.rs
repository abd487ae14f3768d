//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Math types and operations
//! - The per-layer linked list
//! - Downcasting of boxed trait objects
//! - Logging utilities

pub mod collections;
pub mod downcast;
pub mod logging;
pub mod math;
