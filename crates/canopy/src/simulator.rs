//! Canopy simulator: owns the canopy body, riser chains, procedural bones,
//! collapse areas and malfunction state of one deployed parachute.
//!
//! The simulator never steps the physics world. The scene loop steps it and
//! calls [`CanopySimulator::update`] once per sub-step.

use crate::aero::{self, AeroInput};
use crate::collapse::{CellSample, CollapseArea, CollapseModel};
use crate::config::CanopyConfig;
use crate::controls::{clamp_deep, ControlDeeps, Deep};
use crate::error::Result;
use crate::gear::{CanopyGear, RiserSet};
use crate::malfunction::{decay_lineover, unwind_linetwists, HookKnife, WloToggles};
use crate::pab::{BoneSet, CanopyRig, CanopyShape};
use crate::rope::{RopeChain, RopeTuning};
use engine_core::{Transform, Vec3};
use physics::{CollisionGroup, ImpulseJointHandle, PhysicsWorld, RigidBodyHandle, SharedPhysicsWorld};

/// Structural state. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanopyState {
    /// Stowed in the container, nothing simulated.
    Packed,
    /// Bound to the carrier, no canopy physics yet.
    Connected,
    /// Canopy physics live, inflating.
    Opening,
    /// Fully inflated. Partial collapse is a continuous sub-state.
    Flying,
    /// Snagged on a fixed point.
    Cohesion,
    /// Released from the carrier. Terminal until `reset`.
    CutAway,
}

/// Read-only malfunction snapshot for the HUD signature overlay.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MalfunctionSignature {
    pub left_low: f32,
    pub right_low: f32,
    pub linetwists: f32,
    /// Toggles every `SIGNATURE_BLINK` seconds while a malfunction is active.
    pub blink: bool,
    pub wlo_weight: f32,
    pub hook_knife_weight: f32,
}

impl MalfunctionSignature {
    pub fn is_active(&self) -> bool {
        self.left_low > 0.0 || self.right_low > 0.0 || self.linetwists != 0.0
    }
}

/// One riser: canopy-side attachment, its chain and its rough joint.
#[derive(Debug)]
struct RiserAnchor {
    canopy: Vec3,
    rope: RopeChain,
    rough_joint: Option<ImpulseJointHandle>,
}

const SIGNATURE_BLINK: f32 = 0.25;
/// Canopy-side riser ends gather this close to the centre with the slider up.
const SLIDER_GATHER: f32 = 0.25;
/// Brake authority kept on a side whose lines were cut by the hook knife.
const CUT_BRAKE_AUTHORITY: f32 = 0.5;
const ENVELOPE_THICKNESS: f32 = 0.15;
const COHESION_SLACK: f32 = 0.05;

pub struct CanopySimulator {
    physics: SharedPhysicsWorld,
    rig: Box<dyn CanopyRig>,
    gear: CanopyGear,
    config: CanopyConfig,
    state: CanopyState,

    // ── Physics handles ──
    carrier: Option<RigidBodyHandle>,
    jumper_anchors: RiserSet<Vec3>,
    canopy_body: Option<RigidBodyHandle>,
    risers: Vec<RiserAnchor>,
    fixed_point: Option<RigidBodyHandle>,
    cohesion_joint: Option<ImpulseJointHandle>,

    // ── Shape ──
    bones: BoneSet,
    collapse: CollapseModel,
    cells: Vec<CellSample>,
    default_cells: Vec<CellSample>,
    deeps: ControlDeeps,
    left_warp: f32,
    right_warp: f32,
    opening_timer: f32,
    inflation: f32,
    slider: f32,

    // ── Malfunctions ──
    left_low: f32,
    right_low: f32,
    linetwists: f32,
    wlo_effective: bool,
    lineover_eliminated: bool,
    wlo: WloToggles,
    hook_knife: HookKnife,
    pilot_skill: f32,
    left_brake_authority: f32,
    right_brake_authority: f32,
    blink_timer: f32,
    blink: bool,

    // ── Environment ──
    wind_enabled: bool,
    wind: Vec3,
    last_velocity: Option<Vec3>,
    burden: f32,
}

impl CanopySimulator {
    /// Validate the gear's bone descriptors and create a packed canopy.
    pub fn new(
        physics: SharedPhysicsWorld,
        rig: Box<dyn CanopyRig>,
        gear: CanopyGear,
        config: CanopyConfig,
    ) -> Result<Self> {
        let bones = BoneSet::new(&gear.bones)?;
        let collapse = CollapseModel::new(
            config.max_collapse_areas,
            gear.union_threshold(),
            gear.collapse_radius(),
            config.cell_trigger_openness,
        );
        let cell_radius = 0.5 * gear.span / gear.cells.max(1) as f32;
        let default_cells = gear
            .cell_centers()
            .into_iter()
            .map(|center| CellSample {
                center,
                radius: cell_radius,
                openness: 1.0,
            })
            .collect();

        Ok(Self {
            physics,
            rig,
            gear,
            config,
            state: CanopyState::Packed,
            carrier: None,
            jumper_anchors: RiserSet::default(),
            canopy_body: None,
            risers: Vec::new(),
            fixed_point: None,
            cohesion_joint: None,
            bones,
            collapse,
            cells: Vec::new(),
            default_cells,
            deeps: ControlDeeps::default(),
            left_warp: 0.0,
            right_warp: 0.0,
            opening_timer: 0.0,
            inflation: 0.0,
            slider: 0.0,
            left_low: 0.0,
            right_low: 0.0,
            linetwists: 0.0,
            wlo_effective: false,
            lineover_eliminated: false,
            wlo: WloToggles::default(),
            hook_knife: HookKnife::default(),
            pilot_skill: 0.5,
            left_brake_authority: 1.0,
            right_brake_authority: 1.0,
            blink_timer: 0.0,
            blink: false,
            wind_enabled: false,
            wind: Vec3::ZERO,
            last_velocity: None,
            burden: 0.0,
        })
    }

    // ── Lifecycle ────────────────────────────────────────────────────────

    /// Bind to the carrying body. Anchors are in the carrier's local space.
    pub fn connect(&mut self, carrier: RigidBodyHandle, anchors: RiserSet<Vec3>) {
        assert!(
            self.state == CanopyState::Packed,
            "connect() on a canopy in state {:?}",
            self.state
        );
        self.carrier = Some(carrier);
        self.jumper_anchors = anchors;
        self.state = CanopyState::Connected;
        log::info!("Canopy {} connected", self.gear.name);
    }

    /// Instantiate canopy physics at `pose` moving with `velocity`, with the
    /// given initial malfunction state. At most one line-over may be set.
    pub fn open(&mut self, pose: &Transform, velocity: Vec3, left_low: f32, right_low: f32, linetwists: f32) {
        assert!(
            self.state == CanopyState::Connected,
            "open() on a canopy in state {:?}",
            self.state
        );
        assert!(
            left_low == 0.0 || right_low == 0.0,
            "line-over on both sides ({}, {})",
            left_low,
            right_low
        );
        let Some(carrier) = self.carrier else {
            unreachable!("connected canopy without carrier");
        };

        let tuning = RopeTuning {
            frequency: self.config.rope_frequency,
            damping_ratio: self.config.rope_damping_ratio,
            max_stretch: self.config.rope_max_stretch,
        };
        self.slider = if self.gear.slider_up { 0.0 } else { 1.0 };

        {
            let mut world = self.physics.borrow_mut();
            let body = world.add_dynamic_body_with_pose(pose, velocity);
            let half = Vec3::new(0.5 * self.gear.span, 0.5 * self.gear.chord(), ENVELOPE_THICKNESS);
            world.add_box_collider(body, half, self.gear.mass, CollisionGroup::canopy());
            world.set_damping(body, 0.05, 2.0);
            self.canopy_body = Some(body);

            let canopy_anchors = self.gear.anchors.as_array();
            let jumper_anchors = self.jumper_anchors.as_array();
            let max_distance = self.gear.line_length * self.config.rough_joint_slack;
            for (&canopy, &jumper) in canopy_anchors.into_iter().zip(jumper_anchors) {
                let mut rope = RopeChain::new(
                    self.config.rope_joints,
                    self.config.rope_mass,
                    self.gear.line_length,
                    tuning,
                );
                let start = slider_anchor(canopy, self.slider);
                rope.initialize(&mut world, body, start, carrier, jumper);
                let rough = world.add_rope_joint(carrier, jumper, body, canopy, max_distance);
                self.risers.push(RiserAnchor {
                    canopy,
                    rope,
                    rough_joint: Some(rough),
                });
            }
        }

        self.bones.bind(self.rig.as_ref());
        self.rig.set_canopy_texture(&self.gear.texture);

        self.left_low = left_low.clamp(0.0, 1.0);
        self.right_low = right_low.clamp(0.0, 1.0);
        self.linetwists = linetwists;
        self.wlo_effective = true;
        self.lineover_eliminated = false;
        self.opening_timer = 0.0;
        self.inflation = 0.0;
        self.last_velocity = None;
        self.state = CanopyState::Opening;
        log::info!(
            "Canopy {} opening (LOW {:.2}/{:.2}, twists {:.0})",
            self.gear.name,
            self.left_low,
            self.right_low,
            self.linetwists
        );
    }

    /// Release everything and become `CutAway`. Repeated calls and calls on
    /// a packed canopy do nothing.
    pub fn cut_away(&mut self) {
        match self.state {
            CanopyState::Packed | CanopyState::CutAway => return,
            _ => {}
        }
        self.release_resources();
        self.state = CanopyState::CutAway;
        log::info!("Canopy {} cut away", self.gear.name);
    }

    /// Return a packed or cut-away canopy to `Packed` for reuse.
    pub fn reset(&mut self) {
        assert!(
            matches!(self.state, CanopyState::Packed | CanopyState::CutAway),
            "reset() on a canopy in state {:?}",
            self.state
        );
        self.release_resources();
        self.carrier = None;
        self.deeps = ControlDeeps::default();
        self.left_warp = 0.0;
        self.right_warp = 0.0;
        self.inflation = 0.0;
        self.opening_timer = 0.0;
        self.left_low = 0.0;
        self.right_low = 0.0;
        self.linetwists = 0.0;
        self.wlo_effective = false;
        self.lineover_eliminated = false;
        self.wlo = WloToggles::default();
        self.hook_knife = HookKnife::default();
        self.left_brake_authority = 1.0;
        self.right_brake_authority = 1.0;
        self.burden = 0.0;
        self.blink = false;
        self.blink_timer = 0.0;
        self.cells.clear();
        self.state = CanopyState::Packed;
    }

    /// Single teardown path shared by `cut_away`, `reset` and `Drop`.
    fn release_resources(&mut self) {
        let Ok(mut world) = self.physics.try_borrow_mut() else {
            log::warn!("Physics world busy, canopy {} resources leaked", self.gear.name);
            return;
        };
        release_cohesion(&mut world, &mut self.cohesion_joint, &mut self.fixed_point);
        for mut riser in self.risers.drain(..) {
            riser.rope.release(&mut world);
            if let Some(joint) = riser.rough_joint.take() {
                world.remove_joint(joint);
            }
        }
        if let Some(body) = self.canopy_body.take() {
            world.remove_body(body);
        }
        drop(world);

        self.bones.reset();
        self.collapse.clear();
        self.last_velocity = None;
    }

    // ── Per-tick update ──────────────────────────────────────────────────

    pub fn update(&mut self, dt: f32) {
        if dt <= 0.0 || !self.is_opened() {
            return;
        }
        self.update_inflation(dt);
        self.update_slider_and_warps(dt);
        self.update_collapse();
        self.update_malfunctions(dt);
        self.update_ropes_and_bones(dt);
        self.update_burden(dt);
        self.apply_aerodynamics();
    }

    fn update_inflation(&mut self, dt: f32) {
        if self.state != CanopyState::Opening {
            return;
        }
        self.opening_timer += dt;
        let t = (self.opening_timer / self.gear.opening_time.max(1e-3)).min(1.0);
        self.inflation = t.powf(self.config.inflation_exponent);
        if t >= 1.0 {
            self.inflation = 1.0;
            self.state = CanopyState::Flying;
            log::info!("Canopy {} fully inflated after {:.2}s", self.gear.name, self.opening_timer);
        }
    }

    fn update_slider_and_warps(&mut self, dt: f32) {
        if self.slider < 1.0 && self.inflation > 0.0 {
            self.slider = (self.slider + dt / self.config.slider_time.max(1e-3)).min(1.0);
            let mut world = self.physics.borrow_mut();
            for riser in &mut self.risers {
                riser
                    .rope
                    .set_anchor1(&mut world, slider_anchor(riser.canopy, self.slider));
            }
        }
        let step = self.config.warp_rate * dt;
        let follow = |current: f32, target: f32| current + (target - current).clamp(-step, step);
        self.left_warp = follow(self.left_warp, self.deeps.get(Deep::LeftWarp));
        self.right_warp = follow(self.right_warp, self.deeps.get(Deep::RightWarp));
    }

    fn update_collapse(&mut self) {
        let cells = if self.cells.is_empty() {
            &self.default_cells
        } else {
            &self.cells
        };
        self.collapse.rebuild(cells);
    }

    fn update_malfunctions(&mut self, dt: f32) {
        self.wlo.simulate(dt, self.config.wlo_pull_time, self.pilot_skill);
        if self.wlo_effective && self.has_lineover() {
            let weight = self.wlo.weight();
            self.left_low = decay_lineover(self.left_low, dt, self.config.lineover_decay, weight);
            self.right_low = decay_lineover(self.right_low, dt, self.config.lineover_decay, weight);
            if !self.has_lineover() {
                self.mark_lineover_eliminated("WLO");
            }
        }

        self.hook_knife.simulate(dt, self.config.hook_knife_time);
        if self.hook_knife.is_committed() {
            self.commit_hook_knife();
        }

        if self.linetwists != 0.0 {
            self.linetwists = unwind_linetwists(
                self.linetwists,
                dt,
                self.config.linetwist_unwind_rate,
                self.config.linetwist_passive_unwind,
                self.deeps.riser_spread(),
            );
            if self.linetwists == 0.0 {
                log::info!("Canopy {} line twists cleared", self.gear.name);
            }
        }

        if self.signature_active() {
            self.blink_timer += dt;
            while self.blink_timer >= SIGNATURE_BLINK {
                self.blink_timer -= SIGNATURE_BLINK;
                self.blink = !self.blink;
            }
        } else {
            self.blink_timer = 0.0;
            self.blink = false;
        }
    }

    fn commit_hook_knife(&mut self) {
        self.hook_knife.reset();
        if self.left_low > 0.0 {
            self.left_low = 0.0;
            self.left_brake_authority = CUT_BRAKE_AUTHORITY;
            self.mark_lineover_eliminated("hook knife");
        }
        if self.right_low > 0.0 {
            self.right_low = 0.0;
            self.right_brake_authority = CUT_BRAKE_AUTHORITY;
            self.mark_lineover_eliminated("hook knife");
        }
        if self.state == CanopyState::Cohesion {
            let mut world = self.physics.borrow_mut();
            release_cohesion(&mut world, &mut self.cohesion_joint, &mut self.fixed_point);
            drop(world);
            self.state = CanopyState::Flying;
            log::info!("Canopy {} cut free with the hook knife", self.gear.name);
        }
    }

    fn mark_lineover_eliminated(&mut self, by: &str) {
        if !self.lineover_eliminated {
            self.lineover_eliminated = true;
            log::info!("Canopy {} line-over eliminated ({})", self.gear.name, by);
        }
    }

    fn update_ropes_and_bones(&mut self, dt: f32) {
        {
            let mut world = self.physics.borrow_mut();
            for riser in &mut self.risers {
                riser.rope.update(&mut world);
            }
        }
        let shape = CanopyShape {
            deeps: self.effective_deeps(),
            left_warp: self.left_warp,
            right_warp: self.right_warp,
            inflation: self.inflation,
            collapse: self.collapse.inactive_fraction(),
            left_low: self.left_low,
            right_low: self.right_low,
        };
        self.bones
            .update(&shape, dt, self.config.bone_stiffness, self.config.bone_rate);
        self.bones.apply(self.rig.as_mut());
    }

    fn update_burden(&mut self, dt: f32) {
        let Some(body) = self.canopy_body else { return };
        let world = self.physics.borrow();
        let Some(velocity) = world.get_body_velocity(body).filter(|v| v.is_finite()) else {
            return;
        };
        if let Some(last) = self.last_velocity {
            let acceleration = (velocity - last) / dt;
            self.burden = self.gear.mass * (acceleration - world.gravity()).length();
        }
        self.last_velocity = Some(velocity);
    }

    fn apply_aerodynamics(&mut self) {
        let Some(body) = self.canopy_body else { return };
        let mut world = self.physics.borrow_mut();
        let (Some(pose), Some(velocity)) = (world.get_body_transform(body), world.get_body_velocity(body)) else {
            return;
        };
        let cells = if self.cells.is_empty() {
            &self.default_cells
        } else {
            &self.cells
        };
        let input = AeroInput {
            pose,
            velocity,
            wind: if self.wind_enabled { self.wind } else { Vec3::ZERO },
            deeps: self.effective_deeps(),
            inflation: self.inflation,
            left_collapse: self.collapse.side_inactive_fraction(cells, true),
            right_collapse: self.collapse.side_inactive_fraction(cells, false),
            left_low: self.left_low,
            right_low: self.right_low,
            linetwists: self.linetwists,
        };
        let forces = aero::compute(
            &self.gear.aero,
            self.gear.area,
            self.gear.span,
            self.config.air_density,
            &input,
        );
        world.reset_forces(body);
        world.apply_force_at_point(body, forces.left.force, forces.left.point);
        world.apply_force_at_point(body, forces.right.force, forces.right.point);
        world.apply_torque(body, forces.torque);
    }

    // ── Cohesion ─────────────────────────────────────────────────────────

    /// Snag a flying canopy on a fixed world point. Returns whether the
    /// canopy entered cohesion.
    pub fn entangle(&mut self, point: Vec3) -> bool {
        if self.state != CanopyState::Flying {
            log::debug!("entangle() ignored in state {:?}", self.state);
            return false;
        }
        let Some(body) = self.canopy_body else { return false };
        let mut world = self.physics.borrow_mut();
        let Some(pose) = world.get_body_transform(body) else {
            return false;
        };
        let fixed = world.add_fixed_body(point);
        let local = pose.inverse_transform_point(point);
        let joint = world.add_rope_joint(fixed, Vec3::ZERO, body, local, COHESION_SLACK);
        drop(world);
        self.fixed_point = Some(fixed);
        self.cohesion_joint = Some(joint);
        self.state = CanopyState::Cohesion;
        log::info!("Canopy {} entangled at {:?}", self.gear.name, point);
        true
    }

    /// Tear the canopy free of its snag if `force` reaches the rip
    /// threshold. Returns whether it ripped.
    pub fn rip(&mut self, force: f32) -> bool {
        if self.state != CanopyState::Cohesion || force < self.config.rip_threshold {
            return false;
        }
        let mut world = self.physics.borrow_mut();
        release_cohesion(&mut world, &mut self.cohesion_joint, &mut self.fixed_point);
        drop(world);
        self.state = CanopyState::Flying;
        log::info!("Canopy {} ripped free ({:.0} N)", self.gear.name, force);
        true
    }

    /// Contact callback: a hard enough hit while flying entangles the canopy.
    pub fn on_contact(&mut self, point: Vec3, impulse: f32) -> bool {
        self.state == CanopyState::Flying && impulse >= self.config.entangle_impulse && self.entangle(point)
    }

    /// Feed the strongest canopy contact of the last step to `on_contact`.
    pub fn poll_contacts(&mut self) -> bool {
        let Some(body) = self.canopy_body else { return false };
        let strongest = self
            .physics
            .borrow()
            .contacts_with(body)
            .into_iter()
            .max_by(|a, b| a.impulse.total_cmp(&b.impulse));
        match strongest {
            Some(contact) => self.on_contact(contact.point, contact.impulse),
            None => false,
        }
    }

    // ── Controls ─────────────────────────────────────────────────────────

    pub fn set_deep(&mut self, deep: Deep, value: f32) {
        self.deeps.set(deep, value);
    }

    pub fn set_left_deep(&mut self, value: f32) {
        self.set_deep(Deep::LeftBrake, value);
    }

    pub fn set_right_deep(&mut self, value: f32) {
        self.set_deep(Deep::RightBrake, value);
    }

    pub fn set_left_warp_deep(&mut self, value: f32) {
        self.set_deep(Deep::LeftWarp, value);
    }

    pub fn set_right_warp_deep(&mut self, value: f32) {
        self.set_deep(Deep::RightWarp, value);
    }

    pub fn set_front_left_riser_deep(&mut self, value: f32) {
        self.set_deep(Deep::FrontLeftRiser, value);
    }

    pub fn set_front_right_riser_deep(&mut self, value: f32) {
        self.set_deep(Deep::FrontRightRiser, value);
    }

    pub fn set_back_left_riser_deep(&mut self, value: f32) {
        self.set_deep(Deep::BackLeftRiser, value);
    }

    pub fn set_back_right_riser_deep(&mut self, value: f32) {
        self.set_deep(Deep::BackRightRiser, value);
    }

    pub fn set_wlo_toggles(&mut self, trigger: bool) {
        self.wlo.set_trigger(trigger);
    }

    pub fn set_hook_knife(&mut self, trigger: bool) {
        self.hook_knife.set_trigger(trigger);
    }

    /// Canopy piloting skill in [0, 1]; scales how fast the WLO toggles are
    /// reached.
    pub fn set_pilot_skill(&mut self, skill: f32) {
        self.pilot_skill = clamp_deep(skill);
    }

    /// Override line-over severities and whether WLO resolves them.
    pub fn set_lineover(&mut self, left_low: f32, right_low: f32, wlo_is_effective: bool) {
        assert!(
            left_low == 0.0 || right_low == 0.0,
            "line-over on both sides ({}, {})",
            left_low,
            right_low
        );
        self.left_low = left_low.clamp(0.0, 1.0);
        self.right_low = right_low.clamp(0.0, 1.0);
        self.wlo_effective = wlo_is_effective;
        self.lineover_eliminated = false;
    }

    pub fn set_wlo_effective(&mut self, effective: bool) {
        self.wlo_effective = effective;
    }

    pub fn set_linetwists(&mut self, angle: f32) {
        self.linetwists = angle;
    }

    pub fn enable_wind(&mut self, enabled: bool) {
        self.wind_enabled = enabled;
    }

    pub fn set_wind(&mut self, wind: Vec3) {
        self.wind = wind;
    }

    /// Per-cell openness from the envelope model. An empty list means every
    /// cell is fully open.
    pub fn set_cells(&mut self, cells: Vec<CellSample>) {
        self.cells = cells;
    }

    fn effective_deeps(&self) -> ControlDeeps {
        let mut deeps = self.deeps;
        deeps.set(Deep::LeftBrake, deeps.get(Deep::LeftBrake) * self.left_brake_authority);
        deeps.set(Deep::RightBrake, deeps.get(Deep::RightBrake) * self.right_brake_authority);
        deeps
    }

    // ── Queries ──────────────────────────────────────────────────────────

    pub fn state(&self) -> CanopyState {
        self.state
    }

    pub fn gear(&self) -> &CanopyGear {
        &self.gear
    }

    pub fn rig(&self) -> &dyn CanopyRig {
        self.rig.as_ref()
    }

    pub fn bones(&self) -> &BoneSet {
        &self.bones
    }

    pub fn deeps(&self) -> &ControlDeeps {
        &self.deeps
    }

    pub fn get_inflation(&self) -> f32 {
        self.inflation
    }

    pub fn slider_progress(&self) -> f32 {
        self.slider
    }

    pub fn is_connected(&self) -> bool {
        matches!(
            self.state,
            CanopyState::Connected | CanopyState::Opening | CanopyState::Flying | CanopyState::Cohesion
        )
    }

    pub fn is_opened(&self) -> bool {
        matches!(
            self.state,
            CanopyState::Opening | CanopyState::Flying | CanopyState::Cohesion
        )
    }

    pub fn is_cohesion_state(&self) -> bool {
        self.state == CanopyState::Cohesion
    }

    pub fn is_cut_away(&self) -> bool {
        self.state == CanopyState::CutAway
    }

    pub fn get_left_low(&self) -> f32 {
        self.left_low
    }

    pub fn get_right_low(&self) -> f32 {
        self.right_low
    }

    pub fn get_linetwists(&self) -> f32 {
        self.linetwists
    }

    pub fn lineover_is_eliminated(&self) -> bool {
        self.lineover_eliminated
    }

    pub fn wlo_is_effective(&self) -> bool {
        self.wlo_effective
    }

    fn has_lineover(&self) -> bool {
        self.left_low > 0.0 || self.right_low > 0.0
    }

    fn signature_active(&self) -> bool {
        self.has_lineover() || self.linetwists != 0.0
    }

    pub fn collapse_areas(&self) -> &[CollapseArea] {
        self.collapse.areas()
    }

    pub fn collapse_fraction(&self) -> f32 {
        self.collapse.inactive_fraction()
    }

    /// Overburden force (N) on the canopy during the last tick.
    pub fn burden(&self) -> f32 {
        self.burden
    }

    pub fn wing_loading(&self, weight: f32) -> f32 {
        self.gear.wing_loading(weight)
    }

    pub fn canopy_body(&self) -> Option<RigidBodyHandle> {
        self.canopy_body
    }

    pub fn canopy_pose(&self) -> Option<Transform> {
        self.canopy_body
            .and_then(|body| self.physics.borrow().get_body_transform(body))
    }

    /// Positions of every riser chain, canopy end first.
    pub fn riser_nodes(&self) -> Vec<Vec<Vec3>> {
        let world = self.physics.borrow();
        self.risers.iter().map(|r| r.rope.node_positions(&world)).collect()
    }

    pub fn signature(&self) -> MalfunctionSignature {
        MalfunctionSignature {
            left_low: self.left_low,
            right_low: self.right_low,
            linetwists: self.linetwists,
            blink: self.blink,
            wlo_weight: self.wlo.weight(),
            hook_knife_weight: self.hook_knife.weight(),
        }
    }
}

impl Drop for CanopySimulator {
    fn drop(&mut self) {
        self.release_resources();
    }
}

/// Canopy-side riser attachment for a slider descent progress in [0, 1].
fn slider_anchor(anchor: Vec3, progress: f32) -> Vec3 {
    (anchor * SLIDER_GATHER).lerp(anchor, progress.clamp(0.0, 1.0))
}

fn release_cohesion(
    world: &mut PhysicsWorld,
    joint: &mut Option<ImpulseJointHandle>,
    fixed_point: &mut Option<RigidBodyHandle>,
) {
    if let Some(joint) = joint.take() {
        world.remove_joint(joint);
    }
    if let Some(body) = fixed_point.take() {
        world.remove_body(body);
    }
}
