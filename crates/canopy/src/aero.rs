//! Per-tick canopy aerodynamics.
//!
//! The wing is split into two halves so brakes, warps, line-overs and
//! collapse act asymmetrically. Each half gets `q * A/2 * (cl * lift + cd *
//! drag)` applied at its half-span point. Lift is perpendicular to both the
//! airflow and the span, so a canopy dropping straight down is pulled
//! forward into a glide.

use crate::controls::{ControlDeeps, Deep};
use crate::gear::{AeroCoefficients, AeroPose};
use engine_core::{Transform, Vec3};

/// Lift lost on a side at full line-over severity.
const LINEOVER_LIFT_LOSS: f32 = 0.6;
/// Extra drag coefficient at full warp.
const WARP_DRAG: f32 = 0.3;
/// Yaw torque (N·m) per full turn of line twists, capped at four turns.
const TWIST_TORQUE: f32 = 25.0;
/// Beyond one full twist the brake lines are locked.
const BRAKE_LOCK_TWIST: f32 = 360.0;

/// Everything the force model reads for one tick.
#[derive(Debug, Clone, Copy)]
pub struct AeroInput {
    pub pose: Transform,
    pub velocity: Vec3,
    pub wind: Vec3,
    pub deeps: ControlDeeps,
    pub inflation: f32,
    pub left_collapse: f32,
    pub right_collapse: f32,
    pub left_low: f32,
    pub right_low: f32,
    pub linetwists: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HalfForce {
    pub force: Vec3,
    /// World-space application point.
    pub point: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AeroForces {
    pub left: HalfForce,
    pub right: HalfForce,
    pub torque: Vec3,
}

impl AeroForces {
    pub fn total(&self) -> Vec3 {
        self.left.force + self.right.force
    }

    fn zero(pose: &Transform) -> Self {
        let half = HalfForce {
            force: Vec3::ZERO,
            point: pose.position,
        };
        Self {
            left: half,
            right: half,
            torque: Vec3::ZERO,
        }
    }
}

/// Coefficients for one wing half from its brake and riser inputs.
pub fn blend_pose(aero: &AeroCoefficients, brake: f32, front: f32, rear: f32, warp: f32) -> AeroPose {
    let mut pose = aero.flight.lerp(aero.full_brakes, brake.clamp(0.0, 1.0));
    pose = pose.lerp(aero.front_risers, front.clamp(0.0, 1.0));
    pose = pose.lerp(aero.rear_risers, rear.clamp(0.0, 1.0));
    pose.cd += WARP_DRAG * warp.clamp(0.0, 1.0);
    pose
}

pub fn compute(
    aero: &AeroCoefficients,
    area: f32,
    span: f32,
    air_density: f32,
    input: &AeroInput,
) -> AeroForces {
    let pose = &input.pose;
    let air = input.velocity - input.wind;
    let speed = air.length();
    let inflation = input.inflation.clamp(0.0, 1.0);
    if speed <= 1e-4 || inflation <= 0.0 || !air.is_finite() || !pose.is_finite() {
        return AeroForces::zero(pose);
    }

    let v_hat = air / speed;
    let span_axis = pose.rotation * Vec3::X;
    let lift_dir = span_axis.cross(v_hat).normalize_or_zero();
    let drag_dir = -v_hat;
    let q = 0.5 * air_density * speed * speed;
    let half_area = 0.5 * area;

    let brakes_locked = input.linetwists.abs() > BRAKE_LOCK_TWIST;
    let brake = |deep: Deep| if brakes_locked { 0.0 } else { input.deeps.get(deep) };

    let half = |side: f32, pose_coeffs: AeroPose, collapse: f32, low: f32| {
        let scale = inflation * (1.0 - collapse.clamp(0.0, 1.0));
        let lift = pose_coeffs.cl * (1.0 - LINEOVER_LIFT_LOSS * low.clamp(0.0, 1.0));
        let force = (lift_dir * lift + drag_dir * pose_coeffs.cd) * (q * half_area * scale);
        HalfForce {
            force,
            point: pose.transform_point(Vec3::new(side * 0.25 * span, 0.0, 0.0)),
        }
    };

    let left_coeffs = blend_pose(
        aero,
        brake(Deep::LeftBrake),
        input.deeps.get(Deep::FrontLeftRiser),
        input.deeps.get(Deep::BackLeftRiser),
        input.deeps.get(Deep::LeftWarp),
    );
    let right_coeffs = blend_pose(
        aero,
        brake(Deep::RightBrake),
        input.deeps.get(Deep::FrontRightRiser),
        input.deeps.get(Deep::BackRightRiser),
        input.deeps.get(Deep::RightWarp),
    );

    let turns = (input.linetwists / 360.0).clamp(-4.0, 4.0);
    let torque = pose.rotation * Vec3::Z * (turns * TWIST_TORQUE * inflation);

    AeroForces {
        left: half(-1.0, left_coeffs, input.left_collapse, input.left_low),
        right: half(1.0, right_coeffs, input.right_collapse, input.right_low),
        torque,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gear::GearDatabase;

    fn input(velocity: Vec3) -> AeroInput {
        AeroInput {
            pose: Transform::default(),
            velocity,
            wind: Vec3::ZERO,
            deeps: ControlDeeps::default(),
            inflation: 1.0,
            left_collapse: 0.0,
            right_collapse: 0.0,
            left_low: 0.0,
            right_low: 0.0,
            linetwists: 0.0,
        }
    }

    fn forces(input: &AeroInput) -> AeroForces {
        let db = GearDatabase::builtin();
        let gear = db.record(2);
        compute(&gear.aero, gear.area, gear.span, 1.225, input)
    }

    #[test]
    fn still_air_or_packed_canopy_has_no_force() {
        assert_eq!(forces(&input(Vec3::ZERO)).total(), Vec3::ZERO);
        let mut packed = input(Vec3::new(0.0, 10.0, -5.0));
        packed.inflation = 0.0;
        assert_eq!(forces(&packed).total(), Vec3::ZERO);
    }

    #[test]
    fn falling_canopy_is_held_up_and_pushed_forward() {
        let f = forces(&input(Vec3::new(0.0, 0.0, -10.0))).total();
        // drag opposes the fall, lift points along +Y (forward)
        assert!(f.z > 0.0);
        assert!(f.y > 0.0);
        assert!(f.x.abs() < 1e-3);
    }

    #[test]
    fn left_brake_drags_the_left_half() {
        let mut i = input(Vec3::new(0.0, 10.0, -4.0));
        i.deeps.set(Deep::LeftBrake, 1.0);
        let f = forces(&i);
        assert!(f.left.force.length() > f.right.force.length());
        assert!(f.left.point.x < 0.0 && f.right.point.x > 0.0);
    }

    #[test]
    fn lineover_and_collapse_cut_lift_on_their_side() {
        let clean = forces(&input(Vec3::new(0.0, 10.0, -4.0)));
        let mut i = input(Vec3::new(0.0, 10.0, -4.0));
        i.left_low = 1.0;
        i.right_collapse = 0.5;
        let f = forces(&i);
        assert!(f.left.force.length() < clean.left.force.length());
        assert!((f.right.force.length() - 0.5 * clean.right.force.length()).abs() < 1e-3);
    }

    #[test]
    fn heavy_twists_lock_brakes_and_yaw() {
        let mut i = input(Vec3::new(0.0, 10.0, -4.0));
        i.deeps.set(Deep::LeftBrake, 1.0);
        let braked = forces(&i);
        i.linetwists = 720.0;
        let twisted = forces(&i);
        let clean = forces(&input(Vec3::new(0.0, 10.0, -4.0)));
        assert!(braked.left.force.length() > clean.left.force.length());
        assert!((twisted.left.force - twisted.right.force).length() < 1e-3);
        assert!(twisted.torque.z > 0.0);

        i.linetwists = -720.0;
        assert!(forces(&i).torque.z < 0.0);
    }

    #[test]
    fn wind_changes_airspeed() {
        let mut i = input(Vec3::new(0.0, 10.0, 0.0));
        i.wind = Vec3::new(0.0, 10.0, 0.0);
        assert_eq!(forces(&i).total(), Vec3::ZERO);
    }
}
