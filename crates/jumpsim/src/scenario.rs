//! Jump scenario. Loaded from `scenario.ron`; every field falls back to its
//! default when missing.

use canopy::SpinalCord;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Control input that takes effect `at` seconds after deployment and holds
/// until the next phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlPhase {
    pub at: f32,
    pub cord: SpinalCord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Canopy gear id in the gear database.
    #[serde(default)]
    pub gear_id: u32,
    /// Optional RON gear table replacing the built-in line-up.
    #[serde(default)]
    pub gear_file: Option<PathBuf>,
    #[serde(default = "default_pilotchute")]
    pub pilotchute: usize,
    /// Exit height above ground in metres.
    #[serde(default = "default_exit_altitude")]
    pub exit_altitude: f32,
    /// Seconds of free fall before the pilotchute is thrown.
    #[serde(default = "default_freefall_time")]
    pub freefall_time: f32,
    #[serde(default = "default_jumper_mass")]
    pub jumper_mass: f32,
    #[serde(default = "default_skill")]
    pub rigging_skill: f32,
    #[serde(default = "default_skill")]
    pub canopy_skill: f32,
    /// Malfunction dice seed; the same seed replays the same jump.
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_tick_rate")]
    pub tick_rate: f32,
    /// Hard stop for the run, seconds.
    #[serde(default = "default_max_time")]
    pub max_time: f32,
    #[serde(default)]
    pub wind: [f32; 3],
    /// Cut away this many seconds after deployment.
    #[serde(default)]
    pub cut_away_after: Option<f32>,
    #[serde(default)]
    pub controls: Vec<ControlPhase>,
}

fn default_pilotchute() -> usize {
    1
}
fn default_exit_altitude() -> f32 {
    1200.0
}
fn default_freefall_time() -> f32 {
    8.0
}
fn default_jumper_mass() -> f32 {
    85.0
}
fn default_skill() -> f32 {
    0.5
}
fn default_tick_rate() -> f32 {
    60.0
}
fn default_max_time() -> f32 {
    240.0
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            gear_id: 0,
            gear_file: None,
            pilotchute: default_pilotchute(),
            exit_altitude: default_exit_altitude(),
            freefall_time: default_freefall_time(),
            jumper_mass: default_jumper_mass(),
            rigging_skill: default_skill(),
            canopy_skill: default_skill(),
            seed: 0,
            tick_rate: default_tick_rate(),
            max_time: default_max_time(),
            wind: [0.0; 3],
            cut_away_after: None,
            controls: Vec::new(),
        }
    }
}

impl ScenarioConfig {
    /// Load a scenario. A missing file gives the default jump; an invalid
    /// one is an error so a typo never silently runs the wrong scenario.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(data) => Ok(ron::from_str(&data)?),
            Err(_) => {
                log::info!("No scenario at {:?}, using default jump", path);
                Ok(Self::default())
            }
        }
    }

    /// Control input in effect `t` seconds after deployment.
    pub fn controls_at(&self, t: f32) -> SpinalCord {
        self.controls
            .iter()
            .filter(|phase| phase.at <= t)
            .max_by(|a, b| a.at.total_cmp(&b.at))
            .map(|phase| phase.cord)
            .unwrap_or_default()
    }
}
