//! Physics collaborator for the jump simulation, built on Rapier3D.

pub mod collision;
pub mod physics_world;

pub use collision::*;
pub use physics_world::*;

// Re-export Rapier for downstream crates
pub use rapier3d;

// Re-export common Rapier types
pub use rapier3d::prelude::{ColliderHandle, ImpulseJointHandle, RigidBodyHandle};
