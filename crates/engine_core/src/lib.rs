//! Core simulation types shared by the physics, canopy and driver crates.
//!
//! This crate provides the foundational types used across all systems:
//! - Transform and spatial helpers
//! - Fixed-step simulation clock
//! - Common component types for ECS

pub mod components;
pub mod time;
pub mod transform;

pub use components::*;
pub use time::*;
pub use transform::*;

// Re-export commonly used types
pub use glam::{Mat3, Mat4, Quat, Vec2, Vec3, Vec4};
pub use hecs::{Entity, World};

/// Standard gravity in m/s², pointing down the Y axis.
pub const GRAVITY: Vec3 = Vec3::new(0.0, -9.81, 0.0);
