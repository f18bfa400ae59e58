//! Flight-control integration: jumper inputs onto the canopy each tick.

use crate::simulator::CanopySimulator;
use serde::{Deserialize, Serialize};

/// Raw control input from the player or an NPC brain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpinalCord {
    pub left: f32,
    pub right: f32,
    pub left_warp: f32,
    pub right_warp: f32,
    pub front_left: f32,
    pub front_right: f32,
    pub back_left: f32,
    pub back_right: f32,
    pub wlo: bool,
    pub hook: bool,
}

/// Fraction of control authority lost to shock in [0, 1]. Light shock
/// barely matters; full shock costs 90%.
pub fn control_penalty(shock: f32) -> f32 {
    let s = shock.clamp(0.0, 1.0);
    0.9 * s * s
}

/// Push one tick of control input into the canopy.
pub fn apply_controls(canopy: &mut CanopySimulator, cord: &SpinalCord, shock: f32) {
    let authority = 1.0 - control_penalty(shock);
    canopy.set_left_deep(cord.left * authority);
    canopy.set_right_deep(cord.right * authority);
    canopy.set_left_warp_deep(cord.left_warp * authority);
    canopy.set_right_warp_deep(cord.right_warp * authority);
    canopy.set_front_left_riser_deep(cord.front_left * authority);
    canopy.set_front_right_riser_deep(cord.front_right * authority);
    canopy.set_back_left_riser_deep(cord.back_left * authority);
    canopy.set_back_right_riser_deep(cord.back_right * authority);
    canopy.set_wlo_toggles(cord.wlo);
    canopy.set_hook_knife(cord.hook);
}
