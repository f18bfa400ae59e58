//! Multi-segment jointed chain spanning two anchors.
//!
//! A chain with `N` joints owns `N - 1` segment bodies. Joint `0` ties the
//! first actor to segment `0`, joint `N - 1` ties the last segment to the
//! second actor, so the chain has `N` spans of `length / N` each.
//!
//! Each span is a damped spring applied as velocity impulses from
//! [`RopeChain::update`], with stiffness scaled to the segment mass and
//! capped to what the step can integrate. A max-distance joint per span is
//! only a hard stop; it is slack while the chain behaves.

use engine_core::{Transform, Vec3};
use physics::{CollisionGroup, ImpulseJointHandle, PhysicsWorld, RigidBodyHandle};

/// Spring tuning shared by every chain of a canopy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RopeTuning {
    /// Natural frequency of one span with a segment on it, Hz.
    pub frequency: f32,
    /// 1 is critical damping.
    pub damping_ratio: f32,
    /// Span stretch ratio above which the chain is reset for the tick.
    pub max_stretch: f32,
}

impl Default for RopeTuning {
    fn default() -> Self {
        Self {
            frequency: 2.0,
            damping_ratio: 0.6,
            max_stretch: 3.0,
        }
    }
}

impl RopeTuning {
    /// Span stiffness (N/m) and damping (N·s/m) for segments of `mass` at a
    /// step of `dt`. Both are capped so that the stiffest chain mode stays
    /// inside the stable range of an explicit update.
    pub fn coefficients(&self, mass: f32, dt: f32) -> (f32, f32) {
        let omega = std::f32::consts::TAU * self.frequency.max(0.0);
        let mut stiffness = mass * omega * omega;
        let mut damping = 2.0 * self.damping_ratio.max(0.0) * mass * omega;
        if dt > 0.0 {
            stiffness = stiffness.min(mass / (8.0 * dt * dt));
            damping = damping.min(0.375 * mass / dt);
        }
        (stiffness, damping)
    }
}

/// Outcome of a per-tick chain check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RopeStatus {
    /// Not connected to anything.
    Idle,
    /// Segments behaved; span springs applied.
    Nominal,
    /// Segments were non-finite or overstretched and were put back on the
    /// straight line between the anchors.
    Clamped,
    /// An anchor itself was unusable; the chain was left alone this tick.
    Ignored,
}

const SEGMENT_RADIUS: f32 = 0.02;
/// Air drag on segments, 1/s.
const SEGMENT_DAMPING: f32 = 1.0;

#[derive(Debug)]
pub struct RopeChain {
    num_joints: usize,
    mass: f32,
    length: f32,
    tuning: RopeTuning,
    segments: Vec<RigidBodyHandle>,
    joints: Vec<ImpulseJointHandle>,
    actor1: Option<RigidBodyHandle>,
    anchor1: Vec3,
    actor2: Option<RigidBodyHandle>,
    anchor2: Vec3,
    clamped: bool,
}

impl RopeChain {
    pub fn new(num_joints: usize, mass: f32, length: f32, tuning: RopeTuning) -> Self {
        assert!(num_joints >= 1, "a rope needs at least one joint");
        assert!(length > 0.0, "rope length must be positive");
        Self {
            num_joints,
            mass,
            length,
            tuning,
            segments: Vec::new(),
            joints: Vec::new(),
            actor1: None,
            anchor1: Vec3::ZERO,
            actor2: None,
            anchor2: Vec3::ZERO,
            clamped: false,
        }
    }

    pub fn num_joints(&self) -> usize {
        self.num_joints
    }

    pub fn length(&self) -> f32 {
        self.length
    }

    /// Rest length of one span.
    pub fn span_length(&self) -> f32 {
        self.length / self.num_joints as f32
    }

    /// Longest a span may get before its hard stop engages.
    pub fn stop_length(&self) -> f32 {
        self.span_length() * 0.5 * (1.0 + self.tuning.max_stretch.max(1.0))
    }

    /// Mass of one segment body.
    pub fn segment_mass(&self) -> f32 {
        if self.num_joints > 1 {
            self.mass / (self.num_joints - 1) as f32
        } else {
            0.0
        }
    }

    pub fn is_initialized(&self) -> bool {
        !self.joints.is_empty()
    }

    pub fn anchor1(&self) -> Vec3 {
        self.anchor1
    }

    pub fn segments(&self) -> &[RigidBodyHandle] {
        &self.segments
    }

    /// Build segments and joints between two actors. Anchors are in each
    /// actor's local space. Re-initializing releases the previous chain.
    pub fn initialize(
        &mut self,
        world: &mut PhysicsWorld,
        actor1: RigidBodyHandle,
        anchor1: Vec3,
        actor2: RigidBodyHandle,
        anchor2: Vec3,
    ) {
        self.release(world);
        self.actor1 = Some(actor1);
        self.anchor1 = anchor1;
        self.actor2 = Some(actor2);
        self.anchor2 = anchor2;

        let (p1, v1) = anchor_state(world, actor1, anchor1);
        let (p2, v2) = anchor_state(world, actor2, anchor2);
        let n = self.num_joints;
        let segment_mass = self.segment_mass().max(1e-3);

        for i in 0..n.saturating_sub(1) {
            let t = (i + 1) as f32 / n as f32;
            let pose = Transform::from_position(p1.lerp(p2, t));
            let body = world.add_dynamic_body_with_pose(&pose, v1.lerp(v2, t));
            world.add_ball_collider(body, SEGMENT_RADIUS, segment_mass, CollisionGroup::rope());
            world.set_damping(body, SEGMENT_DAMPING, 1.0);
            self.segments.push(body);
        }

        let stop = self.stop_length();
        for i in 0..n {
            let (a, anchor_a) = self.node(i);
            let (b, anchor_b) = self.node(i + 1);
            if let (Some(a), Some(b)) = (a, b) {
                self.joints.push(world.add_rope_joint(a, anchor_a, b, anchor_b, stop));
            }
        }
        log::debug!(
            "Rope initialized: {} joints, span {:.3} m, segment mass {:.3} kg",
            n,
            self.span_length(),
            segment_mass
        );
    }

    /// Body and local anchor of node `i`: 0 is the first actor, `N` the
    /// second, everything between a segment.
    fn node(&self, i: usize) -> (Option<RigidBodyHandle>, Vec3) {
        if i == 0 {
            (self.actor1, self.anchor1)
        } else if i == self.num_joints {
            (self.actor2, self.anchor2)
        } else {
            (self.segments.get(i - 1).copied(), Vec3::ZERO)
        }
    }

    /// Move the first actor's attachment point, e.g. as a slider travels
    /// down the lines.
    pub fn set_anchor1(&mut self, world: &mut PhysicsWorld, anchor1: Vec3) {
        self.anchor1 = anchor1;
        let (Some(actor1), Some(first)) = (self.actor1, self.joints.first().copied()) else {
            return;
        };
        world.remove_joint(first);
        let (body_b, anchor_b) = self.node(1);
        if let Some(body_b) = body_b {
            self.joints[0] = world.add_rope_joint(actor1, anchor1, body_b, anchor_b, self.stop_length());
        }
    }

    /// World positions of both anchors and every segment, in chain order.
    pub fn node_positions(&self, world: &PhysicsWorld) -> Vec<Vec3> {
        let (Some(actor1), Some(actor2)) = (self.actor1, self.actor2) else {
            return Vec::new();
        };
        let mut nodes = Vec::with_capacity(self.segments.len() + 2);
        nodes.push(anchor_state(world, actor1, self.anchor1).0);
        for &segment in &self.segments {
            let p = world
                .get_body_transform(segment)
                .map(|t| t.position)
                .unwrap_or(Vec3::NAN);
            nodes.push(p);
        }
        nodes.push(anchor_state(world, actor2, self.anchor2).0);
        nodes
    }

    /// Check the chain after a physics step and load the span springs for
    /// the next one. Degenerate segments are put back on the anchor line;
    /// nothing is reported upward beyond the returned status.
    pub fn update(&mut self, world: &mut PhysicsWorld) -> RopeStatus {
        let (Some(actor1), Some(actor2)) = (self.actor1, self.actor2) else {
            return RopeStatus::Idle;
        };
        let (p1, v1) = anchor_state(world, actor1, self.anchor1);
        let (p2, v2) = anchor_state(world, actor2, self.anchor2);
        if !(p1.is_finite() && p2.is_finite() && v1.is_finite() && v2.is_finite()) {
            return RopeStatus::Ignored;
        }

        let limit = self.span_length() * self.tuning.max_stretch;
        let nodes = self.node_positions(world);
        let mut velocities = Vec::with_capacity(nodes.len());
        velocities.push(v1);
        for &segment in &self.segments {
            velocities.push(world.get_body_velocity(segment).unwrap_or(Vec3::NAN));
        }
        velocities.push(v2);
        let degenerate = nodes.iter().chain(&velocities).any(|v| !v.is_finite())
            || nodes.windows(2).any(|pair| pair[1].distance(pair[0]) > limit);

        if degenerate {
            if !self.clamped {
                log::warn!("Rope chain degenerate, resetting segments onto anchor line");
            }
            self.clamped = true;
            let n = self.num_joints as f32;
            for (i, &segment) in self.segments.iter().enumerate() {
                let t = (i + 1) as f32 / n;
                world.set_body_state(segment, &Transform::from_position(p1.lerp(p2, t)), v1.lerp(v2, t));
            }
            return RopeStatus::Clamped;
        }
        self.clamped = false;

        if self.segments.is_empty() {
            return RopeStatus::Nominal;
        }
        let dt = world.timestep();
        let (stiffness, damping) = self.tuning.coefficients(self.segment_mass().max(1e-3), dt);
        let rest = self.span_length();
        let fallback = (p2 - p1).try_normalize().unwrap_or(Vec3::X);
        for i in 0..self.num_joints {
            let (Some(a), _) = self.node(i) else { continue };
            let (Some(b), _) = self.node(i + 1) else { continue };
            let offset = nodes[i + 1] - nodes[i];
            let distance = offset.length();
            let dir = if distance > 1e-6 { offset / distance } else { fallback };
            let closing = (velocities[i + 1] - velocities[i]).dot(dir);
            let tension = stiffness * (distance - rest) + damping * closing;
            let impulse = dir * tension * dt;
            world.apply_impulse_at_point(a, impulse, nodes[i]);
            world.apply_impulse_at_point(b, -impulse, nodes[i + 1]);
        }
        RopeStatus::Nominal
    }

    /// Release joints and segment bodies. Safe to call repeatedly.
    pub fn release(&mut self, world: &mut PhysicsWorld) {
        for joint in self.joints.drain(..) {
            world.remove_joint(joint);
        }
        for segment in self.segments.drain(..) {
            world.remove_body(segment);
        }
        self.actor1 = None;
        self.actor2 = None;
        self.clamped = false;
    }
}

/// World position and velocity of a local anchor on a body.
fn anchor_state(world: &PhysicsWorld, body: RigidBodyHandle, anchor: Vec3) -> (Vec3, Vec3) {
    let position = world
        .get_body_transform(body)
        .map(|t| t.transform_point(anchor))
        .unwrap_or(Vec3::NAN);
    let velocity = world.get_body_velocity(body).unwrap_or(Vec3::ZERO);
    (position, velocity)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_anchors(world: &mut PhysicsWorld, distance: f32) -> (RigidBodyHandle, RigidBodyHandle) {
        (
            world.add_fixed_body(Vec3::ZERO),
            world.add_fixed_body(Vec3::new(distance, 0.0, 0.0)),
        )
    }

    #[test]
    fn segment_mass_and_span_split_evenly() {
        let rope = RopeChain::new(5, 2.0, 10.0, RopeTuning::default());
        assert!((rope.segment_mass() - 0.5).abs() < 1e-6);
        assert!((rope.span_length() - 2.0).abs() < 1e-6);
    }

    /// Knock three of the four segments off their rest spots, along the
    /// line and sideways.
    fn displace(world: &mut PhysicsWorld, rope: &RopeChain) {
        let moves = [
            (0, Vec3::new(1.4, 0.0, 0.0)),
            (1, Vec3::new(5.0, 0.0, 0.0)),
            (3, Vec3::new(8.0, 0.5, 0.0)),
        ];
        for (i, p) in moves {
            world.set_body_state(rope.segments()[i], &Transform::from_position(p), Vec3::ZERO);
        }
    }

    fn spans(rope: &RopeChain, world: &PhysicsWorld) -> Vec<f32> {
        rope.node_positions(world)
            .windows(2)
            .map(|pair| pair[1].distance(pair[0]))
            .collect()
    }

    #[test]
    fn displaced_five_span_chain_settles_to_even_spacing() {
        let mut world = PhysicsWorld::with_gravity(Vec3::ZERO);
        let (a, b) = two_anchors(&mut world, 10.0);
        let mut rope = RopeChain::new(5, 0.5, 10.0, RopeTuning::default());
        rope.initialize(&mut world, a, Vec3::ZERO, b, Vec3::ZERO);
        assert_eq!(rope.segments().len(), 4);
        displace(&mut world, &rope);

        assert!(spans(&rope, &world).iter().any(|s| (s - 2.0).abs() > 1.0));

        for _ in 0..720 {
            world.step();
            assert_eq!(rope.update(&mut world), RopeStatus::Nominal);
        }
        let nodes = rope.node_positions(&world);
        assert_eq!(nodes.len(), 6);
        for spacing in spans(&rope, &world) {
            assert!((spacing - 2.0).abs() < 0.05, "spacing {}", spacing);
        }
        for &segment in rope.segments() {
            let v = world.get_body_velocity(segment).unwrap_or(Vec3::NAN);
            assert!(v.length() < 0.1, "segment still moving at {}", v.length());
        }
    }

    #[test]
    fn coefficients_scale_with_mass_and_cap_for_coarse_steps() {
        let tuning = RopeTuning::default();
        let (k1, c1) = tuning.coefficients(0.1, 1.0 / 60.0);
        let (k2, c2) = tuning.coefficients(0.2, 1.0 / 60.0);
        assert!((k2 - 2.0 * k1).abs() < 1e-4);
        assert!((c2 - 2.0 * c1).abs() < 1e-4);

        let stiff = RopeTuning {
            frequency: 50.0,
            damping_ratio: 5.0,
            ..tuning
        };
        let dt = 1.0 / 30.0;
        let (k, c) = stiff.coefficients(0.1, dt);
        assert!(4.0 * k * dt * dt / 0.1 <= 0.5 + 1e-5);
        assert!(4.0 * c * dt / 0.1 <= 1.5 + 1e-5);
    }

    #[test]
    fn lost_anchor_is_ignored() {
        let mut world = PhysicsWorld::with_gravity(Vec3::ZERO);
        let (a, b) = two_anchors(&mut world, 10.0);
        let mut rope = RopeChain::new(5, 0.5, 10.0, RopeTuning::default());
        rope.initialize(&mut world, a, Vec3::ZERO, b, Vec3::ZERO);
        let before: Vec<Vec3> = rope.segments()
            .iter()
            .filter_map(|&s| world.get_body_transform(s).map(|t| t.position))
            .collect();

        world.remove_body(b);
        assert!(!rope.node_positions(&world)[5].is_finite());
        assert_eq!(rope.update(&mut world), RopeStatus::Ignored);
        let after: Vec<Vec3> = rope.segments()
            .iter()
            .filter_map(|&s| world.get_body_transform(s).map(|t| t.position))
            .collect();
        assert_eq!(before, after);
        for &segment in rope.segments() {
            assert_eq!(world.get_body_velocity(segment), Some(Vec3::ZERO));
        }
    }

    #[test]
    fn overstretched_segment_is_clamped_back() {
        let mut world = PhysicsWorld::with_gravity(Vec3::ZERO);
        let (a, b) = two_anchors(&mut world, 10.0);
        let mut rope = RopeChain::new(5, 0.5, 10.0, RopeTuning::default());
        rope.initialize(&mut world, a, Vec3::ZERO, b, Vec3::ZERO);

        let victim = rope.segments()[1];
        world.set_body_state(victim, &Transform::from_position(Vec3::new(4.0, 500.0, 0.0)), Vec3::ZERO);
        assert_eq!(rope.update(&mut world), RopeStatus::Clamped);

        let p = world.get_body_transform(victim).map(|t| t.position).unwrap_or(Vec3::NAN);
        assert!((p - Vec3::new(4.0, 0.0, 0.0)).length() < 1e-4);
        assert_eq!(rope.update(&mut world), RopeStatus::Nominal);
    }

    #[test]
    fn set_anchor1_keeps_joint_count() {
        let mut world = PhysicsWorld::with_gravity(Vec3::ZERO);
        let (a, b) = two_anchors(&mut world, 10.0);
        let mut rope = RopeChain::new(5, 0.5, 10.0, RopeTuning::default());
        rope.initialize(&mut world, a, Vec3::ZERO, b, Vec3::ZERO);
        let joints = world.joint_count();
        rope.set_anchor1(&mut world, Vec3::new(0.0, 0.5, 0.0));
        assert_eq!(world.joint_count(), joints);
        assert_eq!(rope.anchor1(), Vec3::new(0.0, 0.5, 0.0));
        assert!((rope.node_positions(&world)[0].y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn release_is_idempotent() {
        let mut world = PhysicsWorld::with_gravity(Vec3::ZERO);
        let (a, b) = two_anchors(&mut world, 10.0);
        let mut rope = RopeChain::new(5, 0.5, 10.0, RopeTuning::default());
        rope.initialize(&mut world, a, Vec3::ZERO, b, Vec3::ZERO);
        assert_eq!(world.body_count(), 6);
        assert!(rope.is_initialized());
        rope.release(&mut world);
        assert!(!rope.is_initialized());
        assert_eq!(world.body_count(), 2);
        assert_eq!(world.joint_count(), 0);
        rope.release(&mut world);
        assert_eq!(world.body_count(), 2);
        assert_eq!(rope.update(&mut world), RopeStatus::Idle);
    }
}
