//! Parachute canopy subsystem.
//!
//! - Riser chains linking the jumper to the canopy
//! - Procedural bones driven by control deeps and canopy shape
//! - Collapse areas rebuilt from per-cell openness
//! - Deployment malfunctions and the actions that resolve them
//! - The canopy simulator tying all of it to the physics world

pub mod aero;
pub mod collapse;
pub mod config;
pub mod controls;
pub mod error;
pub mod flight;
pub mod gear;
pub mod malfunction;
pub mod opening;
pub mod pab;
pub mod rope;
pub mod simulator;

pub use collapse::{CellSample, CollapseArea, CollapseModel};
pub use config::CanopyConfig;
pub use controls::{ControlDeeps, Deep};
pub use error::{CanopyError, Result};
pub use flight::{apply_controls, control_penalty, SpinalCord};
pub use gear::{CanopyClass, CanopyGear, GearDatabase, RiserSet};
pub use malfunction::{MalfunctionGenerator, MalfunctionOutcome};
pub use opening::{CanopyOpening, Deployment};
pub use pab::{BonePose, BoneSet, CanopyRig};
pub use rope::{RopeChain, RopeStatus, RopeTuning};
pub use simulator::{CanopySimulator, CanopyState, MalfunctionSignature};
