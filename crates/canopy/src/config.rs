//! Canopy tuning. Loaded from `canopy.ron` at startup; every field falls back
//! to its default when missing.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tuning constants shared by every canopy simulator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanopyConfig {
    /// Joints per riser chain (segments = joints - 1).
    #[serde(default = "default_rope_joints")]
    pub rope_joints: usize,
    /// Mass of one riser chain in kg.
    #[serde(default = "default_rope_mass")]
    pub rope_mass: f32,
    /// Natural frequency of a chain span in Hz. Stiffness follows the
    /// segment mass.
    #[serde(default = "default_rope_frequency")]
    pub rope_frequency: f32,
    #[serde(default = "default_rope_damping_ratio")]
    pub rope_damping_ratio: f32,
    /// Segment stretch ratio above which a chain is treated as degenerate.
    #[serde(default = "default_rope_max_stretch")]
    pub rope_max_stretch: f32,
    /// Rough joint max distance as a multiple of line length.
    #[serde(default = "default_rough_joint_slack")]
    pub rough_joint_slack: f32,

    /// Ease-in exponent of the inflation curve.
    #[serde(default = "default_inflation_exponent")]
    pub inflation_exponent: f32,
    /// Seconds for the slider to travel down the lines.
    #[serde(default = "default_slider_time")]
    pub slider_time: f32,
    /// Rate (1/s) at which warp animation follows the warp deeps.
    #[serde(default = "default_warp_rate")]
    pub warp_rate: f32,

    /// Bound on procedural bone angular speed (rad/s).
    #[serde(default = "default_bone_rate")]
    pub bone_rate: f32,
    /// Critical damping factor of bone smoothing (1/s).
    #[serde(default = "default_bone_stiffness")]
    pub bone_stiffness: f32,

    /// Cells with openness below this are collapse triggers.
    #[serde(default = "default_cell_trigger_openness")]
    pub cell_trigger_openness: f32,
    #[serde(default = "default_max_collapse_areas")]
    pub max_collapse_areas: usize,

    /// Seconds to fully pull the WLO toggles at zero skill.
    #[serde(default = "default_wlo_pull_time")]
    pub wlo_pull_time: f32,
    /// Line-over severity decay per second at full WLO weight.
    #[serde(default = "default_lineover_decay")]
    pub lineover_decay: f32,
    /// Seconds of held action that commit the hook knife.
    #[serde(default = "default_hook_knife_time")]
    pub hook_knife_time: f32,
    /// Line-twist unwind speed at full riser spread (deg/s).
    #[serde(default = "default_linetwist_unwind_rate")]
    pub linetwist_unwind_rate: f32,
    /// Fraction of the unwind speed applied without any riser spread.
    #[serde(default = "default_linetwist_passive_unwind")]
    pub linetwist_passive_unwind: f32,

    /// Force (N) at or above which a cohesion rips free.
    #[serde(default = "default_rip_threshold")]
    pub rip_threshold: f32,
    /// Contact impulse (N·s) that entangles a flying canopy.
    #[serde(default = "default_entangle_impulse")]
    pub entangle_impulse: f32,
    #[serde(default = "default_air_density")]
    pub air_density: f32,

    /// Line-over probability at the pilotchute reference velocity.
    #[serde(default = "default_lineover_base")]
    pub lineover_base: f32,
    /// Pilotchute velocity (m/s) below which line twists never happen.
    #[serde(default = "default_linetwists_onset")]
    pub linetwists_onset: f32,
    /// Pilotchute velocity (m/s) at which line-twist probability peaks.
    #[serde(default = "default_linetwists_full")]
    pub linetwists_full: f32,
    #[serde(default = "default_linetwists_max")]
    pub linetwists_max: f32,
}

fn default_rope_joints() -> usize {
    5
}
fn default_rope_mass() -> f32 {
    0.25
}
fn default_rope_frequency() -> f32 {
    2.0
}
fn default_rope_damping_ratio() -> f32 {
    0.6
}
fn default_rope_max_stretch() -> f32 {
    3.0
}
fn default_rough_joint_slack() -> f32 {
    1.15
}
fn default_inflation_exponent() -> f32 {
    2.0
}
fn default_slider_time() -> f32 {
    1.5
}
fn default_warp_rate() -> f32 {
    2.0
}
fn default_bone_rate() -> f32 {
    3.0
}
fn default_bone_stiffness() -> f32 {
    12.0
}
fn default_cell_trigger_openness() -> f32 {
    0.5
}
fn default_max_collapse_areas() -> usize {
    16
}
fn default_wlo_pull_time() -> f32 {
    1.0
}
fn default_lineover_decay() -> f32 {
    0.5
}
fn default_hook_knife_time() -> f32 {
    2.0
}
fn default_linetwist_unwind_rate() -> f32 {
    360.0
}
fn default_linetwist_passive_unwind() -> f32 {
    0.25
}
fn default_rip_threshold() -> f32 {
    2500.0
}
fn default_entangle_impulse() -> f32 {
    400.0
}
fn default_air_density() -> f32 {
    1.225
}
fn default_lineover_base() -> f32 {
    0.05
}
fn default_linetwists_onset() -> f32 {
    20.0
}
fn default_linetwists_full() -> f32 {
    60.0
}
fn default_linetwists_max() -> f32 {
    0.35
}

impl Default for CanopyConfig {
    fn default() -> Self {
        Self {
            rope_joints: default_rope_joints(),
            rope_mass: default_rope_mass(),
            rope_frequency: default_rope_frequency(),
            rope_damping_ratio: default_rope_damping_ratio(),
            rope_max_stretch: default_rope_max_stretch(),
            rough_joint_slack: default_rough_joint_slack(),
            inflation_exponent: default_inflation_exponent(),
            slider_time: default_slider_time(),
            warp_rate: default_warp_rate(),
            bone_rate: default_bone_rate(),
            bone_stiffness: default_bone_stiffness(),
            cell_trigger_openness: default_cell_trigger_openness(),
            max_collapse_areas: default_max_collapse_areas(),
            wlo_pull_time: default_wlo_pull_time(),
            lineover_decay: default_lineover_decay(),
            hook_knife_time: default_hook_knife_time(),
            linetwist_unwind_rate: default_linetwist_unwind_rate(),
            linetwist_passive_unwind: default_linetwist_passive_unwind(),
            rip_threshold: default_rip_threshold(),
            entangle_impulse: default_entangle_impulse(),
            air_density: default_air_density(),
            lineover_base: default_lineover_base(),
            linetwists_onset: default_linetwists_onset(),
            linetwists_full: default_linetwists_full(),
            linetwists_max: default_linetwists_max(),
        }
    }
}

impl CanopyConfig {
    /// Parse a config from RON text.
    pub fn from_ron_str(data: &str) -> Result<Self> {
        Ok(ron::from_str(data)?)
    }

    /// Load config from a RON file. If the file is missing or invalid,
    /// returns the default config.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(data) => match Self::from_ron_str(&data) {
                Ok(c) => c,
                Err(e) => {
                    log::warn!("Invalid canopy config at {:?}: {}, using defaults", path, e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Save config as pretty RON. Logs on error.
    pub fn save(&self, path: &Path) {
        if let Ok(s) = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()) {
            if let Err(e) = std::fs::write(path, s) {
                log::warn!("Could not write canopy config to {:?}: {}", path, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_ron_fills_defaults() {
        let c = CanopyConfig::from_ron_str("(rope_joints: 8, rip_threshold: 100.0)").unwrap();
        assert_eq!(c.rope_joints, 8);
        assert_eq!(c.rip_threshold, 100.0);
        assert_eq!(c.slider_time, default_slider_time());
    }

    #[test]
    fn invalid_ron_is_error() {
        assert!(CanopyConfig::from_ron_str("(rope_joints: \"many\")").is_err());
    }

    #[test]
    fn saved_config_loads_back() {
        let path = std::env::temp_dir().join(format!("canopy-config-{}.ron", std::process::id()));
        let config = CanopyConfig {
            rope_joints: 7,
            rip_threshold: 1800.0,
            ..CanopyConfig::default()
        };
        config.save(&path);
        let back = CanopyConfig::load(&path);
        let _ = std::fs::remove_file(&path);
        assert_eq!(back.rope_joints, 7);
        assert_eq!(back.rip_threshold, 1800.0);
        assert_eq!(back.slider_time, default_slider_time());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let c = CanopyConfig::load(Path::new("/nonexistent/canopy.ron"));
        assert_eq!(c.rope_joints, default_rope_joints());
    }
}
