//! Procedural animated bones (PABs).
//!
//! Bones are not keyframed: each tick a bone eases toward a target angle
//! derived from control deeps (flaps) or canopy-wide shape (sections). A bone
//! may be constrained by a sibling, in which case it stays within a slack of
//! the sibling's angle; constraint bones always update first.

use crate::controls::ControlDeeps;
use crate::error::{CanopyError, Result};
use crate::gear::{BoneDesc, BoneDriver, SectionShape};
use engine_core::{Quat, Transform, TransformRaw, Vec3};
use std::collections::HashMap;

/// Rendering-side skeleton of the canopy model.
pub trait CanopyRig {
    fn bone_count(&self) -> usize;
    fn bone_index(&self, name: &str) -> Option<usize>;
    fn local_transform(&self, bone: usize) -> Transform;
    fn set_local_transform(&mut self, bone: usize, transform: Transform);
    /// Bind the canopy texture used for the model and its signature overlay.
    fn set_canopy_texture(&mut self, _texture: &str) {}
}

/// In-memory skeleton: named bones with local transforms.
#[derive(Debug, Clone, Default)]
pub struct BonePose {
    names: Vec<String>,
    transforms: Vec<Transform>,
    texture: Option<String>,
}

impl BonePose {
    pub fn new(names: impl IntoIterator<Item = String>) -> Self {
        let names: Vec<String> = names.into_iter().collect();
        let transforms = vec![Transform::default(); names.len()];
        Self {
            names,
            transforms,
            texture: None,
        }
    }

    /// One bone per descriptor, at identity.
    pub fn from_descs(descs: &[BoneDesc]) -> Self {
        Self::new(descs.iter().map(|d| d.name.clone()))
    }

    pub fn texture(&self) -> Option<&str> {
        self.texture.as_deref()
    }

    /// Palette for GPU skinning upload.
    pub fn to_raw(&self) -> Vec<TransformRaw> {
        self.transforms.iter().map(TransformRaw::from).collect()
    }
}

impl CanopyRig for BonePose {
    fn bone_count(&self) -> usize {
        self.names.len()
    }

    fn bone_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    fn local_transform(&self, bone: usize) -> Transform {
        self.transforms.get(bone).copied().unwrap_or_default()
    }

    fn set_local_transform(&mut self, bone: usize, transform: Transform) {
        if let Some(slot) = self.transforms.get_mut(bone) {
            *slot = transform;
        }
    }

    fn set_canopy_texture(&mut self, texture: &str) {
        self.texture = Some(texture.to_string());
    }
}

/// Snapshot of everything a bone target can depend on.
#[derive(Debug, Clone, Copy, Default)]
pub struct CanopyShape {
    pub deeps: ControlDeeps,
    /// Smoothed warp animation values.
    pub left_warp: f32,
    pub right_warp: f32,
    pub inflation: f32,
    /// Fraction of cells aerodynamically inactive.
    pub collapse: f32,
    pub left_low: f32,
    pub right_low: f32,
}

impl CanopyShape {
    pub fn section_value(&self, shape: SectionShape) -> f32 {
        match shape {
            SectionShape::LeftWarp => self.left_warp,
            SectionShape::RightWarp => self.right_warp,
            SectionShape::Inflation => self.inflation,
            SectionShape::Collapse => self.collapse,
            SectionShape::LeftLineover => self.left_low,
            SectionShape::RightLineover => self.right_low,
        }
    }
}

/// Target angle of a bone for the given canopy shape.
pub fn target_angle(desc: &BoneDesc, shape: &CanopyShape) -> f32 {
    let value = match desc.driver {
        BoneDriver::Flap(deep) => shape.deeps.get(deep),
        BoneDriver::Section(section) => shape.section_value(section),
    };
    desc.min_angle + (desc.max_angle - desc.min_angle) * value.clamp(0.0, 1.0)
}

/// Move `current` toward `target` with critical-damping style easing, never
/// faster than `max_rate` and never past the target.
pub fn approach(current: f32, target: f32, dt: f32, stiffness: f32, max_rate: f32) -> f32 {
    let delta = target - current;
    let eased = delta * (1.0 - (-stiffness * dt).exp());
    let limit = max_rate * dt;
    current + eased.clamp(-limit, limit)
}

#[derive(Debug, Clone)]
pub struct ProceduralBone {
    desc: BoneDesc,
    angle: f32,
    constraint: Option<usize>,
    frame: Option<usize>,
    rest: Transform,
}

impl ProceduralBone {
    pub fn name(&self) -> &str {
        &self.desc.name
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn desc(&self) -> &BoneDesc {
        &self.desc
    }
}

/// Bones in dependency order.
#[derive(Debug, Clone)]
pub struct BoneSet {
    bones: Vec<ProceduralBone>,
    order: Vec<usize>,
}

impl BoneSet {
    /// Validate descriptors and fix the update order.
    pub fn new(descs: &[BoneDesc]) -> Result<Self> {
        let mut index = HashMap::new();
        for (i, desc) in descs.iter().enumerate() {
            if index.insert(desc.name.as_str(), i).is_some() {
                return Err(CanopyError::DuplicateBone(desc.name.clone()));
            }
        }

        let mut bones = Vec::with_capacity(descs.len());
        for desc in descs {
            let constraint = match &desc.constraint {
                Some(name) => Some(
                    *index
                        .get(name.as_str())
                        .ok_or_else(|| CanopyError::UnknownBone(name.clone()))?,
                ),
                None => None,
            };
            bones.push(ProceduralBone {
                desc: desc.clone(),
                angle: desc.min_angle,
                constraint,
                frame: None,
                rest: Transform::default(),
            });
        }

        // Kahn's algorithm; ties keep declaration order.
        let mut remaining: Vec<usize> = bones
            .iter()
            .map(|b| usize::from(b.constraint.is_some()))
            .collect();
        let mut order = Vec::with_capacity(bones.len());
        let mut placed = vec![false; bones.len()];
        while order.len() < bones.len() {
            let next = (0..bones.len()).find(|&i| !placed[i] && remaining[i] == 0);
            let Some(i) = next else {
                let stuck = (0..bones.len()).find(|&i| !placed[i]).unwrap_or(0);
                return Err(CanopyError::BoneCycle(bones[stuck].desc.name.clone()));
            };
            placed[i] = true;
            order.push(i);
            for (j, bone) in bones.iter().enumerate() {
                if bone.constraint == Some(i) {
                    remaining[j] -= 1;
                }
            }
        }

        Ok(Self { bones, order })
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ProceduralBone> {
        self.bones.iter().find(|b| b.desc.name == name)
    }

    /// Bone names in update order.
    pub fn update_order(&self) -> Vec<&str> {
        self.order.iter().map(|&i| self.bones[i].name()).collect()
    }

    /// Resolve rig frames and capture their rest transforms. Bones without
    /// a matching frame still simulate but are not written out.
    pub fn bind(&mut self, rig: &dyn CanopyRig) {
        for bone in &mut self.bones {
            bone.frame = rig.bone_index(&bone.desc.name);
            match bone.frame {
                Some(frame) => bone.rest = rig.local_transform(frame),
                None => log::debug!("Canopy rig has no frame for bone {}", bone.desc.name),
            }
        }
    }

    /// Advance every bone one tick.
    pub fn update(&mut self, shape: &CanopyShape, dt: f32, stiffness: f32, max_rate: f32) {
        for k in 0..self.order.len() {
            let i = self.order[k];
            let target = target_angle(&self.bones[i].desc, shape);
            let mut angle = approach(self.bones[i].angle, target, dt, stiffness, max_rate);
            if let Some(c) = self.bones[i].constraint {
                let anchor = self.bones[c].angle;
                let slack = self.bones[i].desc.constraint_slack.abs();
                angle = angle.clamp(anchor - slack, anchor + slack);
            }
            self.bones[i].angle = angle;
        }
    }

    /// Drop rig bindings and return every bone to its rest angle.
    pub fn reset(&mut self) {
        for bone in &mut self.bones {
            bone.angle = bone.desc.min_angle;
            bone.frame = None;
            bone.rest = Transform::default();
        }
    }

    pub fn is_bound(&self) -> bool {
        self.bones.iter().any(|b| b.frame.is_some())
    }

    /// Write bone rotations to the rig.
    pub fn apply(&self, rig: &mut dyn CanopyRig) {
        for bone in &self.bones {
            let Some(frame) = bone.frame else { continue };
            let axis = bone.desc.axis.normalize_or_zero();
            let axis = if axis == Vec3::ZERO { Vec3::X } else { axis };
            let mut transform = bone.rest;
            transform.rotation = bone.rest.rotation * Quat::from_axis_angle(axis, bone.angle);
            rig.set_local_transform(frame, transform);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::Deep;
    use crate::gear::default_bones;

    fn flap(name: &str, deep: Deep) -> BoneDesc {
        BoneDesc {
            name: name.to_string(),
            driver: BoneDriver::Flap(deep),
            axis: Vec3::X,
            min_angle: 0.0,
            max_angle: 1.0,
            constraint: None,
            constraint_slack: 0.0,
        }
    }

    #[test]
    fn flap_converges_monotonically_within_rate() {
        let mut set = BoneSet::new(&[flap("flap", Deep::LeftBrake)]).unwrap();
        let dt = 1.0 / 60.0;
        let rate = 3.0;
        for deep in [0.0_f32, 0.35, 0.8, 1.0] {
            let mut shape = CanopyShape::default();
            shape.deeps.set(Deep::LeftBrake, deep);
            let target = deep;
            let mut previous = set.get("flap").unwrap().angle();
            let start_side = (target - previous).signum();
            for _ in 0..600 {
                set.update(&shape, dt, 12.0, rate);
                let angle = set.get("flap").unwrap().angle();
                assert!((angle - previous).abs() <= rate * dt + 1e-6);
                // never crosses the target
                assert!((target - angle) * start_side >= -1e-6);
                // moves only toward the target
                assert!((angle - previous) * start_side >= -1e-6);
                previous = angle;
            }
            assert!((previous - target).abs() < 1e-3, "angle {} target {}", previous, target);
        }
    }

    #[test]
    fn constraint_bones_update_first() {
        let set = BoneSet::new(&default_bones()).unwrap();
        let order = set.update_order();
        let pos = |n: &str| order.iter().position(|o| *o == n).unwrap();
        assert!(pos("flap_left") < pos("tail_left"));
        assert!(pos("flap_right") < pos("tail_right"));
    }

    #[test]
    fn constrained_bone_stays_within_slack() {
        let mut lead = flap("lead", Deep::RightBrake);
        lead.max_angle = 0.2;
        let mut follower = flap("follower", Deep::RightBrake);
        follower.max_angle = 1.0;
        follower.constraint = Some("lead".to_string());
        follower.constraint_slack = 0.1;
        let mut set = BoneSet::new(&[follower, lead]).unwrap();
        let mut shape = CanopyShape::default();
        shape.deeps.set(Deep::RightBrake, 1.0);
        for _ in 0..600 {
            set.update(&shape, 1.0 / 60.0, 12.0, 3.0);
        }
        let lead = set.get("lead").unwrap().angle();
        let follower = set.get("follower").unwrap().angle();
        assert!((lead - 0.2).abs() < 1e-3);
        assert!((follower - 0.3).abs() < 1e-3);
    }

    #[test]
    fn cycles_and_unknown_constraints_are_rejected() {
        let mut a = flap("a", Deep::LeftBrake);
        let mut b = flap("b", Deep::LeftBrake);
        a.constraint = Some("b".to_string());
        b.constraint = Some("a".to_string());
        assert!(matches!(BoneSet::new(&[a.clone(), b]), Err(CanopyError::BoneCycle(_))));

        a.constraint = Some("missing".to_string());
        assert!(matches!(BoneSet::new(&[a]), Err(CanopyError::UnknownBone(_))));

        let c = flap("c", Deep::LeftBrake);
        assert!(matches!(
            BoneSet::new(&[c.clone(), c]),
            Err(CanopyError::DuplicateBone(_))
        ));
    }

    #[test]
    fn section_follows_canopy_shape() {
        let desc = BoneDesc {
            name: "crown".to_string(),
            driver: BoneDriver::Section(SectionShape::Collapse),
            axis: Vec3::X,
            min_angle: 0.0,
            max_angle: 0.8,
            constraint: None,
            constraint_slack: 0.0,
        };
        let shape = CanopyShape {
            collapse: 0.5,
            ..Default::default()
        };
        assert!((target_angle(&desc, &shape) - 0.4).abs() < 1e-6);
    }

    #[test]
    fn apply_writes_rotation_relative_to_rest() {
        let descs = [flap("flap", Deep::LeftBrake)];
        let mut rig = BonePose::from_descs(&descs);
        rig.set_local_transform(0, Transform::from_position(Vec3::new(0.0, 1.0, 0.0)));
        let mut set = BoneSet::new(&descs).unwrap();
        set.bind(&rig);
        let mut shape = CanopyShape::default();
        shape.deeps.set(Deep::LeftBrake, 1.0);
        for _ in 0..600 {
            set.update(&shape, 1.0 / 60.0, 12.0, 3.0);
        }
        set.apply(&mut rig);
        let t = rig.local_transform(0);
        assert_eq!(t.position, Vec3::new(0.0, 1.0, 0.0));
        let (axis, angle) = t.rotation.to_axis_angle();
        assert!((angle - 1.0).abs() < 1e-2);
        assert!(axis.dot(Vec3::X) > 0.99);
        assert_eq!(rig.to_raw().len(), rig.bone_count());
    }
}
