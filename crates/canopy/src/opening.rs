//! Opening sequencer: turns a pilotchute extraction into a connected,
//! opening canopy.

use crate::config::CanopyConfig;
use crate::controls::Deep;
use crate::gear::RiserSet;
use crate::malfunction::{MalfunctionGenerator, MalfunctionOutcome};
use crate::simulator::{CanopySimulator, CanopyState};
use engine_core::{Transform, Vec3};
use physics::RigidBodyHandle;
use rand::Rng;

/// Off-heading limit at rigging skill 0 and 1, degrees.
const WORST_TURN: f32 = 170.0;
const BEST_TURN: f32 = 90.0;
/// Brake setting held until the canopy is fully inflated.
pub const SHALLOW_BRAKES: f32 = 0.7;

/// Largest off-heading turn (degrees) for a rigging skill in [0, 1].
pub fn off_heading_limit(rigging_skill: f32) -> f32 {
    let s = rigging_skill.clamp(0.0, 1.0);
    WORST_TURN * (1.0 - s) + BEST_TURN * s
}

pub fn sample_off_heading<R: Rng + ?Sized>(rng: &mut R, rigging_skill: f32) -> f32 {
    let turn = off_heading_limit(rigging_skill);
    rng.gen_range(-turn..=turn)
}

/// Canopy pose at line stretch. The canopy's up axis points against the
/// carrier's velocity, its nose follows `heading` turned by `turn_degrees`
/// about that axis, and it sits `line_length` back along the velocity.
pub fn deployment_pose(
    carrier_position: Vec3,
    velocity: Vec3,
    heading: Vec3,
    turn_degrees: f32,
    line_length: f32,
) -> Transform {
    let up = {
        let u = -velocity.normalize_or_zero();
        if u == Vec3::ZERO {
            Vec3::Y
        } else {
            u
        }
    };
    // canopy local +Z is up and +Y is the nose; looking_along puts +Z on
    // its first direction and +Y as close to the second as possible
    let mut pose = Transform::looking_along(carrier_position + up * line_length, up, heading);
    pose.rotate_axis(up, turn_degrees.to_radians());
    pose
}

/// Jumper-side data needed to deploy.
#[derive(Debug, Clone, Copy)]
pub struct Deployment {
    pub carrier: RigidBodyHandle,
    pub carrier_pose: Transform,
    pub velocity: Vec3,
    pub jumper_anchors: RiserSet<Vec3>,
    pub rigging_skill: f32,
    /// Index into the gear's pilotchute options.
    pub pilotchute: usize,
    /// Pilotchute speed at extraction.
    pub pilotchute_velocity: f32,
}

#[derive(Debug, Clone)]
pub struct CanopyOpening {
    generator: MalfunctionGenerator,
    holding: bool,
    turn: f32,
}

impl CanopyOpening {
    pub fn new(config: &CanopyConfig) -> Self {
        Self {
            generator: MalfunctionGenerator::from_config(config),
            holding: false,
            turn: 0.0,
        }
    }

    pub fn is_holding_brakes(&self) -> bool {
        self.holding
    }

    /// Off-heading turn sampled by the last deploy, degrees.
    pub fn turn(&self) -> f32 {
        self.turn
    }

    /// Sample malfunctions and heading, then connect and open the canopy.
    pub fn deploy<R: Rng + ?Sized>(
        &mut self,
        canopy: &mut CanopySimulator,
        rng: &mut R,
        deployment: &Deployment,
    ) -> MalfunctionOutcome {
        let reference = canopy.gear().pilotchute(deployment.pilotchute).reference_velocity;
        let outcome = self
            .generator
            .generate(rng, deployment.pilotchute_velocity, reference);
        self.turn = sample_off_heading(rng, deployment.rigging_skill);
        log::debug!("additional turn (off-heading): {:.1}", self.turn);

        let pose = deployment_pose(
            deployment.carrier_pose.position,
            deployment.velocity,
            deployment.carrier_pose.forward(),
            self.turn,
            canopy.gear().line_length,
        );
        canopy.connect(deployment.carrier, deployment.jumper_anchors);
        canopy.open(
            &pose,
            deployment.velocity,
            outcome.left_low,
            outcome.right_low,
            outcome.linetwists,
        );
        self.holding = true;
        self.hold(canopy);
        outcome
    }

    /// Call once per tick until it returns false.
    pub fn update(&mut self, canopy: &mut CanopySimulator) -> bool {
        if !self.holding {
            return false;
        }
        if canopy.state() == CanopyState::Opening {
            self.hold(canopy);
            return true;
        }
        self.holding = false;
        if canopy.is_opened() {
            canopy.set_deep(Deep::LeftBrake, 0.0);
            canopy.set_deep(Deep::RightBrake, 0.0);
        }
        false
    }

    fn hold(&self, canopy: &mut CanopySimulator) {
        canopy.set_deep(Deep::LeftBrake, SHALLOW_BRAKES);
        canopy.set_deep(Deep::RightBrake, SHALLOW_BRAKES);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn off_heading_limit_interpolates_with_skill() {
        assert_eq!(off_heading_limit(0.0), 170.0);
        assert_eq!(off_heading_limit(1.0), 90.0);
        assert!((off_heading_limit(0.5) - 130.0).abs() < 1e-4);
    }

    #[test]
    fn off_heading_stays_within_limit() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut min = f32::MAX;
        let mut max = f32::MIN;
        for _ in 0..2000 {
            let turn = sample_off_heading(&mut rng, 1.0);
            assert!(turn.abs() <= 90.0);
            min = min.min(turn);
            max = max.max(turn);
        }
        assert!(min < -80.0 && max > 80.0);
    }

    #[test]
    fn pose_faces_away_from_velocity() {
        let velocity = Vec3::new(0.0, -40.0, 0.0);
        let pose = deployment_pose(Vec3::ZERO, velocity, Vec3::new(0.0, 0.0, -1.0), 0.0, 3.0);
        assert!((pose.position - Vec3::new(0.0, 3.0, 0.0)).length() < 1e-5);
        let up = pose.rotation * Vec3::Z;
        let nose = pose.rotation * Vec3::Y;
        assert!(up.dot(Vec3::Y) > 0.999);
        assert!(nose.dot(Vec3::new(0.0, 0.0, -1.0)) > 0.999);
    }

    #[test]
    fn turn_rotates_nose_about_up_axis() {
        let velocity = Vec3::new(0.0, -40.0, 0.0);
        let pose = deployment_pose(Vec3::ZERO, velocity, Vec3::new(0.0, 0.0, -1.0), 90.0, 3.0);
        let up = pose.rotation * Vec3::Z;
        let nose = pose.rotation * Vec3::Y;
        assert!(up.dot(Vec3::Y) > 0.999);
        assert!(nose.dot(Vec3::new(0.0, 0.0, -1.0)).abs() < 1e-4);
        assert!((pose.position - Vec3::new(0.0, 3.0, 0.0)).length() < 1e-5);
    }
}
