//! Immutable per-gear physical constants, looked up by gear id.

use crate::controls::Deep;
use crate::error::{CanopyError, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Canopy design class. Drives how readily collapse areas merge and how
/// large a merged area must be before cells stop flying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CanopyClass {
    Base,
    Student,
    Sport,
    HighPerformance,
}

impl CanopyClass {
    fn aspect_factor(aspect: f32) -> f32 {
        (aspect / 2.0).clamp(0.5, 2.0)
    }

    /// Boundary gap (m) below which two collapse areas merge.
    pub fn union_threshold(self, aspect: f32) -> f32 {
        let base = match self {
            CanopyClass::Base => 0.6,
            CanopyClass::Student => 0.5,
            CanopyClass::Sport => 0.4,
            CanopyClass::HighPerformance => 0.3,
        };
        base * Self::aspect_factor(aspect)
    }

    /// Radius (m) a merged area must exceed before its cells go inactive.
    pub fn collapse_radius(self, aspect: f32) -> f32 {
        let base = match self {
            CanopyClass::Base => 1.2,
            CanopyClass::Student => 1.0,
            CanopyClass::Sport => 0.8,
            CanopyClass::HighPerformance => 0.6,
        };
        base * Self::aspect_factor(aspect)
    }
}

/// Lift and drag coefficients for one control pose.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AeroPose {
    pub cl: f32,
    pub cd: f32,
}

impl AeroPose {
    pub fn lerp(self, other: AeroPose, t: f32) -> AeroPose {
        AeroPose {
            cl: self.cl + (other.cl - self.cl) * t,
            cd: self.cd + (other.cd - self.cd) * t,
        }
    }
}

/// Coefficients per pose; intermediate deeps blend between them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AeroCoefficients {
    pub flight: AeroPose,
    pub full_brakes: AeroPose,
    pub front_risers: AeroPose,
    pub rear_risers: AeroPose,
}

/// Four values, one per riser.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RiserSet<T> {
    pub front_left: T,
    pub front_right: T,
    pub rear_left: T,
    pub rear_right: T,
}

impl<T> RiserSet<T> {
    pub fn new(front_left: T, front_right: T, rear_left: T, rear_right: T) -> Self {
        Self {
            front_left,
            front_right,
            rear_left,
            rear_right,
        }
    }

    pub fn as_array(&self) -> [&T; 4] {
        [&self.front_left, &self.front_right, &self.rear_left, &self.rear_right]
    }
}

/// Canopy-wide shape values a Section bone can follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectionShape {
    LeftWarp,
    RightWarp,
    Inflation,
    Collapse,
    LeftLineover,
    RightLineover,
}

/// What drives a procedural bone's target angle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoneDriver {
    /// Follows a control deep (brakes, risers).
    Flap(Deep),
    /// Follows a canopy-wide shape value.
    Section(SectionShape),
}

/// Procedural bone descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoneDesc {
    pub name: String,
    pub driver: BoneDriver,
    /// Local rotation axis.
    pub axis: Vec3,
    /// Angle (rad) at driver value 0.
    pub min_angle: f32,
    /// Angle (rad) at driver value 1.
    pub max_angle: f32,
    /// Bone whose angle limits this one.
    #[serde(default)]
    pub constraint: Option<String>,
    /// Allowed deviation (rad) from the constraint bone's angle.
    #[serde(default)]
    pub constraint_slack: f32,
}

/// Pilotchute option for a canopy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PilotchuteGear {
    /// Diameter in metres.
    pub size: f32,
    /// Recommended deployment velocity (m/s).
    pub reference_velocity: f32,
}

/// A canopy gear record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanopyGear {
    pub id: u32,
    pub name: String,
    pub texture: String,
    pub class: CanopyClass,
    /// Canopy mass in kg.
    pub mass: f32,
    /// Wing area in m².
    pub area: f32,
    /// Span in m.
    pub span: f32,
    /// Length of lines plus risers in m.
    pub line_length: f32,
    /// Seconds from line stretch to full inflation.
    pub opening_time: f32,
    pub glide_ratio: f32,
    /// Whether the slider starts up (skydiving) or is removed (BASE).
    pub slider_up: bool,
    pub aero: AeroCoefficients,
    pub pilotchutes: Vec<PilotchuteGear>,
    /// Canopy-side riser attachment points, canopy local space.
    pub anchors: RiserSet<Vec3>,
    /// Number of cells along the span.
    pub cells: usize,
    pub bones: Vec<BoneDesc>,
}

impl CanopyGear {
    /// Span² / area.
    pub fn aspect(&self) -> f32 {
        self.span * self.span / self.area
    }

    pub fn chord(&self) -> f32 {
        self.area / self.span
    }

    /// Suspended weight (N) per m² of wing.
    pub fn wing_loading(&self, weight: f32) -> f32 {
        weight / self.area
    }

    pub fn union_threshold(&self) -> f32 {
        self.class.union_threshold(self.aspect())
    }

    pub fn collapse_radius(&self) -> f32 {
        self.class.collapse_radius(self.aspect())
    }

    /// Panics on a missing pilotchute index; equipment is validated upstream.
    pub fn pilotchute(&self, index: usize) -> &PilotchuteGear {
        assert!(
            index < self.pilotchutes.len(),
            "canopy {} has no pilotchute #{}",
            self.id,
            index
        );
        &self.pilotchutes[index]
    }

    /// Centre of each cell along the span, canopy local space.
    pub fn cell_centers(&self) -> Vec<Vec3> {
        let n = self.cells.max(1);
        let width = self.span / n as f32;
        (0..n)
            .map(|i| Vec3::new(-0.5 * self.span + width * (i as f32 + 0.5), 0.0, 0.0))
            .collect()
    }
}

/// All canopy records known to the game.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GearDatabase {
    records: Vec<CanopyGear>,
}

impl GearDatabase {
    pub fn new(records: Vec<CanopyGear>) -> Self {
        Self { records }
    }

    /// Parse a RON list of canopy records.
    pub fn from_ron_str(data: &str) -> Result<Self> {
        let records: Vec<CanopyGear> = ron::from_str(data)?;
        Ok(Self { records })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_ron_str(&data)
    }

    pub fn get(&self, id: u32) -> Option<&CanopyGear> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn try_record(&self, id: u32) -> Result<&CanopyGear> {
        self.get(id).ok_or(CanopyError::UnknownGear(id))
    }

    /// Record lookup for ids that come from validated equipment. An unknown
    /// id is a caller bug.
    pub fn record(&self, id: u32) -> &CanopyGear {
        match self.get(id) {
            Some(r) => r,
            None => panic!("no canopy gear with id {}", id),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &CanopyGear> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The stock canopy line-up.
    pub fn builtin() -> Self {
        Self::new(vec![
            builtin_canopy(
                0,
                "Trainer 260",
                CanopyClass::Student,
                24.2,
                8.2,
                3.2,
                2.8,
                true,
                2.6,
            ),
            builtin_canopy(1, "Cliff 230", CanopyClass::Base, 21.4, 7.0, 3.0, 1.6, false, 2.4),
            builtin_canopy(2, "Sprint 170", CanopyClass::Sport, 15.8, 7.3, 2.9, 2.2, true, 2.9),
            builtin_canopy(
                3,
                "Blade 105",
                CanopyClass::HighPerformance,
                9.8,
                6.4,
                2.6,
                1.8,
                true,
                3.2,
            ),
        ])
    }
}

#[allow(clippy::too_many_arguments)]
fn builtin_canopy(
    id: u32,
    name: &str,
    class: CanopyClass,
    area: f32,
    span: f32,
    line_length: f32,
    opening_time: f32,
    slider_up: bool,
    glide_ratio: f32,
) -> CanopyGear {
    let chord = area / span;
    let flight_cl = 0.9;
    let anchor = |x: f32, y: f32| Vec3::new(x * span * 0.35, y * chord * 0.3, -0.2);
    CanopyGear {
        id,
        name: name.to_string(),
        texture: format!("canopy_{}", id),
        class,
        mass: 2.0 + area * 0.12,
        area,
        span,
        line_length,
        opening_time,
        glide_ratio,
        slider_up,
        aero: AeroCoefficients {
            flight: AeroPose {
                cl: flight_cl,
                cd: flight_cl / glide_ratio,
            },
            full_brakes: AeroPose { cl: 1.3, cd: 0.9 },
            front_risers: AeroPose {
                cl: 0.7,
                cd: 0.7 / (glide_ratio * 0.8),
            },
            rear_risers: AeroPose {
                cl: 1.0,
                cd: 1.0 / (glide_ratio * 1.1),
            },
        },
        pilotchutes: vec![
            PilotchuteGear {
                size: 0.8,
                reference_velocity: 25.0,
            },
            PilotchuteGear {
                size: 1.0,
                reference_velocity: 35.0,
            },
            PilotchuteGear {
                size: 1.2,
                reference_velocity: 45.0,
            },
        ],
        anchors: RiserSet::new(anchor(-1.0, 1.0), anchor(1.0, 1.0), anchor(-1.0, -1.0), anchor(1.0, -1.0)),
        cells: match class {
            CanopyClass::Base | CanopyClass::Student => 7,
            _ => 9,
        },
        bones: default_bones(),
    }
}

fn bone(name: &str, driver: BoneDriver, axis: Vec3, max_angle: f32) -> BoneDesc {
    BoneDesc {
        name: name.to_string(),
        driver,
        axis,
        min_angle: 0.0,
        max_angle,
        constraint: None,
        constraint_slack: 0.0,
    }
}

/// Brake flaps, trailing-edge tails limited by their flap, warp sections
/// and a crown section that folds with collapse.
pub fn default_bones() -> Vec<BoneDesc> {
    let mut tail_left = bone("tail_left", BoneDriver::Flap(Deep::LeftBrake), Vec3::X, 1.4);
    tail_left.constraint = Some("flap_left".to_string());
    tail_left.constraint_slack = 0.25;
    let mut tail_right = bone("tail_right", BoneDriver::Flap(Deep::RightBrake), Vec3::X, 1.4);
    tail_right.constraint = Some("flap_right".to_string());
    tail_right.constraint_slack = 0.25;
    vec![
        tail_left,
        tail_right,
        bone("flap_left", BoneDriver::Flap(Deep::LeftBrake), Vec3::X, 1.1),
        bone("flap_right", BoneDriver::Flap(Deep::RightBrake), Vec3::X, 1.1),
        bone(
            "section_left",
            BoneDriver::Section(SectionShape::LeftWarp),
            Vec3::Y,
            0.4,
        ),
        bone(
            "section_right",
            BoneDriver::Section(SectionShape::RightWarp),
            Vec3::Y,
            -0.4,
        ),
        bone(
            "crown",
            BoneDriver::Section(SectionShape::Collapse),
            Vec3::X,
            0.9,
        ),
    ]
}
