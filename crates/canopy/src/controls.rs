//! Control surface deeps pushed in by the flight-control loop.

use serde::{Deserialize, Serialize};

/// One control surface of the canopy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Deep {
    LeftBrake,
    RightBrake,
    LeftWarp,
    RightWarp,
    FrontLeftRiser,
    FrontRightRiser,
    BackLeftRiser,
    BackRightRiser,
}

/// Current control deeps, each clamped to [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControlDeeps {
    left_brake: f32,
    right_brake: f32,
    left_warp: f32,
    right_warp: f32,
    front_left_riser: f32,
    front_right_riser: f32,
    back_left_riser: f32,
    back_right_riser: f32,
}

/// Clamp a deep to [0, 1]; NaN becomes 0.
pub fn clamp_deep(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

impl ControlDeeps {
    pub fn get(&self, deep: Deep) -> f32 {
        match deep {
            Deep::LeftBrake => self.left_brake,
            Deep::RightBrake => self.right_brake,
            Deep::LeftWarp => self.left_warp,
            Deep::RightWarp => self.right_warp,
            Deep::FrontLeftRiser => self.front_left_riser,
            Deep::FrontRightRiser => self.front_right_riser,
            Deep::BackLeftRiser => self.back_left_riser,
            Deep::BackRightRiser => self.back_right_riser,
        }
    }

    pub fn set(&mut self, deep: Deep, value: f32) {
        let value = clamp_deep(value);
        let slot = match deep {
            Deep::LeftBrake => &mut self.left_brake,
            Deep::RightBrake => &mut self.right_brake,
            Deep::LeftWarp => &mut self.left_warp,
            Deep::RightWarp => &mut self.right_warp,
            Deep::FrontLeftRiser => &mut self.front_left_riser,
            Deep::FrontRightRiser => &mut self.front_right_riser,
            Deep::BackLeftRiser => &mut self.back_left_riser,
            Deep::BackRightRiser => &mut self.back_right_riser,
        };
        *slot = value;
    }

    /// Mean pull on the warp (riser spread) controls.
    pub fn riser_spread(&self) -> f32 {
        0.5 * (self.left_warp + self.right_warp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_clamps_into_unit_range() {
        let mut d = ControlDeeps::default();
        d.set(Deep::LeftBrake, 1.7);
        d.set(Deep::RightBrake, -0.3);
        d.set(Deep::LeftWarp, f32::NAN);
        assert_eq!(d.get(Deep::LeftBrake), 1.0);
        assert_eq!(d.get(Deep::RightBrake), 0.0);
        assert_eq!(d.get(Deep::LeftWarp), 0.0);
    }

    #[test]
    fn each_deep_has_its_own_slot() {
        let all = [
            Deep::LeftBrake,
            Deep::RightBrake,
            Deep::LeftWarp,
            Deep::RightWarp,
            Deep::FrontLeftRiser,
            Deep::FrontRightRiser,
            Deep::BackLeftRiser,
            Deep::BackRightRiser,
        ];
        let mut d = ControlDeeps::default();
        for (i, deep) in all.iter().enumerate() {
            d.set(*deep, i as f32 / 10.0);
        }
        for (i, deep) in all.iter().enumerate() {
            assert!((d.get(*deep) - i as f32 / 10.0).abs() < 1e-6);
        }
    }
}
