//! Physics world management with Rapier3D.

use engine_core::{Transform, Vec3};
use rapier3d::na::{Isometry3, Quaternion, Translation3, UnitQuaternion};
use rapier3d::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

/// Physics world shared between the scene loop and the systems that own
/// bodies inside it. The simulation is single-threaded, so a `RefCell` is
/// enough; borrows must never be held across calls into other systems.
pub type SharedPhysicsWorld = Rc<RefCell<PhysicsWorld>>;

/// Convert a glam vector into a Rapier vector.
pub fn to_vector(v: Vec3) -> Vector<Real> {
    vector![v.x, v.y, v.z]
}

/// Convert a Rapier vector into a glam vector.
pub fn from_vector(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

/// Convert a glam vector into a Rapier point.
pub fn to_point(v: Vec3) -> Point<Real> {
    point![v.x, v.y, v.z]
}

/// Convert a transform into an isometry (scale is dropped).
pub fn to_isometry(transform: &Transform) -> Isometry<Real> {
    let q = transform.rotation;
    Isometry3::from_parts(
        Translation3::new(transform.position.x, transform.position.y, transform.position.z),
        UnitQuaternion::from_quaternion(Quaternion::new(q.w, q.x, q.y, q.z)),
    )
}

/// Convert an isometry into a unit-scale transform.
pub fn from_isometry(iso: &Isometry<Real>) -> Transform {
    let pos = iso.translation.vector;
    let rot = iso.rotation;
    Transform {
        position: Vec3::new(pos.x, pos.y, pos.z),
        rotation: glam::Quat::from_xyzw(rot.i, rot.j, rot.k, rot.w),
        scale: Vec3::ONE,
    }
}

/// A contact reported for one of a body's colliders during the last step.
#[derive(Debug, Clone, Copy)]
pub struct ContactPoint {
    /// World-space contact position.
    pub point: Vec3,
    /// Total normal impulse of the contact pair.
    pub impulse: f32,
    /// The collider on the other side of the contact.
    pub other: ColliderHandle,
}

/// Main physics world containing all simulation state.
pub struct PhysicsWorld {
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub gravity: Vector<Real>,
    pub integration_parameters: IntegrationParameters,
    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    /// Create a new physics world with default gravity.
    pub fn new() -> Self {
        Self::with_gravity(engine_core::GRAVITY)
    }

    /// Create a physics world with custom gravity (zero for settling tests).
    pub fn with_gravity(gravity: Vec3) -> Self {
        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            gravity: to_vector(gravity),
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
        }
    }

    /// Wrap the world for shared ownership.
    pub fn shared(self) -> SharedPhysicsWorld {
        Rc::new(RefCell::new(self))
    }

    /// Step the physics simulation.
    pub fn step(&mut self) {
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );
    }

    /// Length of one physics step in seconds.
    pub fn timestep(&self) -> f32 {
        self.integration_parameters.dt
    }

    /// Set the length of one physics step in seconds.
    pub fn set_timestep(&mut self, dt: f32) {
        if !(dt > 0.0 && dt.is_finite()) {
            log::warn!("Ignoring invalid physics timestep {}", dt);
            return;
        }
        self.integration_parameters.dt = dt;
    }

    /// Gravity as a glam vector.
    pub fn gravity(&self) -> Vec3 {
        from_vector(&self.gravity)
    }

    /// Add a dynamic rigid body and return its handle.
    pub fn add_dynamic_body(&mut self, position: Vec3) -> RigidBodyHandle {
        let rigid_body = RigidBodyBuilder::dynamic()
            .translation(to_vector(position))
            .build();
        self.rigid_body_set.insert(rigid_body)
    }

    /// Add a dynamic rigid body with a full pose and initial velocity.
    pub fn add_dynamic_body_with_pose(
        &mut self,
        pose: &Transform,
        linear_velocity: Vec3,
    ) -> RigidBodyHandle {
        let rigid_body = RigidBodyBuilder::dynamic()
            .position(to_isometry(pose))
            .linvel(to_vector(linear_velocity))
            .build();
        self.rigid_body_set.insert(rigid_body)
    }

    /// Add a static rigid body (fixed points, terrain, obstacles).
    pub fn add_fixed_body(&mut self, position: Vec3) -> RigidBodyHandle {
        let rigid_body = RigidBodyBuilder::fixed()
            .translation(to_vector(position))
            .build();
        self.rigid_body_set.insert(rigid_body)
    }

    /// Add a ball collider of a given mass to a rigid body.
    pub fn add_ball_collider(
        &mut self,
        body_handle: RigidBodyHandle,
        radius: f32,
        mass: f32,
        groups: (Group, Group),
    ) -> ColliderHandle {
        let collider = ColliderBuilder::ball(radius)
            .mass(mass)
            .collision_groups(InteractionGroups::new(groups.0, groups.1))
            .build();
        self.collider_set.insert_with_parent(collider, body_handle, &mut self.rigid_body_set)
    }

    /// Add a box collider of a given mass to a rigid body.
    pub fn add_box_collider(
        &mut self,
        body_handle: RigidBodyHandle,
        half_extents: Vec3,
        mass: f32,
        groups: (Group, Group),
    ) -> ColliderHandle {
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .mass(mass)
            .collision_groups(InteractionGroups::new(groups.0, groups.1))
            .build();
        self.collider_set.insert_with_parent(collider, body_handle, &mut self.rigid_body_set)
    }

    /// Set linear and angular damping of a body.
    pub fn set_damping(&mut self, handle: RigidBodyHandle, linear: f32, angular: f32) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.set_linear_damping(linear);
            body.set_angular_damping(angular);
        }
    }

    /// Connect two bodies with a rope joint that only limits the maximum
    /// distance between the anchors.
    pub fn add_rope_joint(
        &mut self,
        body1: RigidBodyHandle,
        anchor1: Vec3,
        body2: RigidBodyHandle,
        anchor2: Vec3,
        max_distance: f32,
    ) -> ImpulseJointHandle {
        let joint = RopeJointBuilder::new(max_distance)
            .local_anchor1(to_point(anchor1))
            .local_anchor2(to_point(anchor2))
            .build();
        self.impulse_joint_set.insert(body1, body2, joint, true)
    }

    /// Remove a joint. Returns false if it was already gone.
    pub fn remove_joint(&mut self, handle: ImpulseJointHandle) -> bool {
        self.impulse_joint_set.remove(handle, true).is_some()
    }

    /// Get the transform of a rigid body.
    pub fn get_body_transform(&self, handle: RigidBodyHandle) -> Option<Transform> {
        self.rigid_body_set
            .get(handle)
            .map(|body| from_isometry(body.position()))
    }

    /// Get the linear velocity of a rigid body.
    pub fn get_body_velocity(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        self.rigid_body_set
            .get(handle)
            .map(|body| from_vector(body.linvel()))
    }

    /// Teleport a body and overwrite its velocity.
    pub fn set_body_state(&mut self, handle: RigidBodyHandle, pose: &Transform, linear_velocity: Vec3) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.set_position(to_isometry(pose), true);
            body.set_linvel(to_vector(linear_velocity), true);
            body.set_angvel(vector![0.0, 0.0, 0.0], true);
        }
    }

    /// Clear the user forces and torques accumulated on a body.
    pub fn reset_forces(&mut self, handle: RigidBodyHandle) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.reset_forces(true);
            body.reset_torques(true);
        }
    }

    /// Add a persistent force at the body's center of mass.
    pub fn apply_force(&mut self, handle: RigidBodyHandle, force: Vec3) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.add_force(to_vector(force), true);
        }
    }

    /// Add a persistent force at a world-space point.
    pub fn apply_force_at_point(&mut self, handle: RigidBodyHandle, force: Vec3, point: Vec3) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.add_force_at_point(to_vector(force), to_point(point), true);
        }
    }

    /// Add a persistent torque.
    pub fn apply_torque(&mut self, handle: RigidBodyHandle, torque: Vec3) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.add_torque(to_vector(torque), true);
        }
    }

    /// Apply an impulse at a world-space point of a dynamic body.
    pub fn apply_impulse_at_point(&mut self, handle: RigidBodyHandle, impulse: Vec3, point: Vec3) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.apply_impulse_at_point(to_vector(impulse), to_point(point), true);
        }
    }

    /// Contacts touching any collider of a body during the last step.
    pub fn contacts_with(&self, handle: RigidBodyHandle) -> Vec<ContactPoint> {
        let mut contacts = Vec::new();
        let Some(body) = self.rigid_body_set.get(handle) else {
            return contacts;
        };
        for &collider in body.colliders() {
            for pair in self.narrow_phase.contact_pairs_with(collider) {
                if !pair.has_any_active_contact {
                    continue;
                }
                let other = if pair.collider1 == collider {
                    pair.collider2
                } else {
                    pair.collider1
                };
                let Some(reference) = self.collider_set.get(pair.collider1) else {
                    continue;
                };
                let point = pair
                    .manifolds
                    .iter()
                    .flat_map(|m| m.points.iter())
                    .next()
                    .map(|p| reference.position() * p.local_p1);
                if let Some(point) = point {
                    contacts.push(ContactPoint {
                        point: Vec3::new(point.x, point.y, point.z),
                        impulse: pair.total_impulse_magnitude(),
                        other,
                    });
                }
            }
        }
        contacts
    }

    /// Whether a body handle is still alive.
    pub fn contains_body(&self, handle: RigidBodyHandle) -> bool {
        self.rigid_body_set.contains(handle)
    }

    /// Number of rigid bodies in the world.
    pub fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }

    /// Number of impulse joints in the world.
    pub fn joint_count(&self) -> usize {
        self.impulse_joint_set.len()
    }

    /// Remove a rigid body and its colliders and joints.
    pub fn remove_body(&mut self, handle: RigidBodyHandle) -> bool {
        self.rigid_body_set
            .remove(
                handle,
                &mut self.island_manager,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                true,
            )
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CollisionGroup;

    #[test]
    fn isometry_roundtrip_keeps_pose() {
        let t = Transform::from_position_rotation(
            Vec3::new(1.0, 2.0, 3.0),
            glam::Quat::from_rotation_z(0.4),
        );
        let back = from_isometry(&to_isometry(&t));
        assert!((back.position - t.position).length() < 1e-5);
        assert!(back.rotation.dot(t.rotation).abs() > 0.9999);
    }

    #[test]
    fn rope_joint_stops_at_max_distance() {
        let mut world = PhysicsWorld::with_gravity(Vec3::ZERO);
        let anchor = world.add_fixed_body(Vec3::ZERO);
        let bob = world.add_dynamic_body(Vec3::new(1.0, 0.0, 0.0));
        world.add_ball_collider(bob, 0.05, 1.0, CollisionGroup::rope());
        world.add_rope_joint(anchor, Vec3::ZERO, bob, Vec3::ZERO, 2.0);

        world.apply_impulse_at_point(bob, Vec3::new(10.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
        let v = world.get_body_velocity(bob).unwrap_or(Vec3::ZERO);
        assert!((v.x - 10.0).abs() < 1e-3, "velocity {}", v.x);

        // impulses on fixed bodies are ignored
        world.apply_impulse_at_point(anchor, Vec3::X, Vec3::ZERO);
        assert_eq!(world.get_body_velocity(anchor), Some(Vec3::ZERO));

        for _ in 0..120 {
            world.step();
            let p = world.get_body_transform(bob).map(|t| t.position).unwrap_or(Vec3::NAN);
            assert!(p.length() < 2.5, "distance {}", p.length());
        }
        let p = world.get_body_transform(bob).map(|t| t.position).unwrap_or(Vec3::NAN);
        assert!(p.length() < 2.2, "settled at {}", p.length());
    }

    #[test]
    fn remove_is_idempotent() {
        let mut world = PhysicsWorld::with_gravity(Vec3::ZERO);
        let a = world.add_fixed_body(Vec3::ZERO);
        let b = world.add_dynamic_body(Vec3::X);
        let j = world.add_rope_joint(a, Vec3::ZERO, b, Vec3::ZERO, 2.0);
        assert!(world.remove_joint(j));
        assert!(!world.remove_joint(j));
        assert!(world.remove_body(b));
        assert!(!world.remove_body(b));
        assert!(!world.contains_body(b));
        assert!(world.contains_body(a));
        assert_eq!(world.body_count(), 1);
    }
}
