//! Collision groups and filtering.

use rapier3d::prelude::*;

/// Collision groups for the bodies taking part in a jump.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionGroup {
    /// Static environment (terrain, exits, buildings)
    Environment = 1 << 0,
    /// Jumper body
    Jumper = 1 << 1,
    /// Canopy envelope
    Canopy = 1 << 2,
    /// Riser and line segments
    Rope = 1 << 3,
    /// Helper bodies that never collide (fixed points, anchors)
    Helper = 1 << 4,
}

impl CollisionGroup {
    /// Create a collision group for environment.
    pub fn environment() -> (Group, Group) {
        let membership = Group::from_bits_retain(Self::Environment as u32);
        let filter = Group::ALL;
        (membership, filter)
    }

    /// Create a collision group for the jumper.
    pub fn jumper() -> (Group, Group) {
        let membership = Group::from_bits_retain(Self::Jumper as u32);
        let filter = Group::from_bits_retain(Self::Environment as u32 | Self::Canopy as u32);
        (membership, filter)
    }

    /// Create a collision group for the canopy. Canopy and jumper touch
    /// (wraps), lines never collide with the canopy they hang from.
    pub fn canopy() -> (Group, Group) {
        let membership = Group::from_bits_retain(Self::Canopy as u32);
        let filter = Group::from_bits_retain(Self::Environment as u32 | Self::Jumper as u32);
        (membership, filter)
    }

    /// Create a collision group for rope segments.
    pub fn rope() -> (Group, Group) {
        let membership = Group::from_bits_retain(Self::Rope as u32);
        let filter = Group::from_bits_retain(Self::Environment as u32);
        (membership, filter)
    }

    /// Create a collision group for helper bodies.
    pub fn helper() -> (Group, Group) {
        let membership = Group::from_bits_retain(Self::Helper as u32);
        (membership, Group::NONE)
    }
}

/// Component linking an ECS entity to its physics handles.
#[derive(Debug, Clone, Copy)]
pub struct PhysicsBody {
    pub rigid_body: RigidBodyHandle,
    pub collider: Option<ColliderHandle>,
}

impl PhysicsBody {
    pub fn new(rigid_body: RigidBodyHandle) -> Self {
        Self {
            rigid_body,
            collider: None,
        }
    }

    pub fn with_collider(rigid_body: RigidBodyHandle, collider: ColliderHandle) -> Self {
        Self {
            rigid_body,
            collider: Some(collider),
        }
    }
}
