//! Common ECS components used by the simulation driver.

use glam::Vec3;

/// Velocity component for moving entities.
#[derive(Debug, Clone, Copy, Default)]
pub struct Velocity {
    pub linear: Vec3,
    pub angular: Vec3,
}

impl Velocity {
    pub fn new(linear: Vec3) -> Self {
        Self {
            linear,
            angular: Vec3::ZERO,
        }
    }

    /// Horizontal component (Y removed), optionally including wind.
    pub fn horizontal(&self, wind: Vec3) -> Vec3 {
        let v = self.linear + wind;
        Vec3::new(v.x, 0.0, v.z)
    }
}

/// Tag component for a jumper entity.
#[derive(Debug, Clone, Copy, Default)]
pub struct Jumper {
    /// Rigging skill in [0, 1]; affects off-heading on deployment.
    pub rigging_skill: f32,
    /// Canopy piloting skill in [0, 1]; affects malfunction handling speed.
    pub canopy_skill: f32,
}

/// Height above ground level in metres.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Altitude(pub f32);

impl Altitude {
    pub fn is_landed(&self) -> bool {
        self.0 <= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horizontal_velocity_drops_vertical_and_adds_wind() {
        let v = Velocity::new(Vec3::new(3.0, -50.0, 1.0));
        let h = v.horizontal(Vec3::new(1.0, 5.0, 0.0));
        assert_eq!(h, Vec3::new(4.0, 0.0, 1.0));
    }
}
