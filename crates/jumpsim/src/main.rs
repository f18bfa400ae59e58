//! Headless jump driver: exit, free fall, deployment, canopy flight and an
//! optional cutaway, stepped at a fixed rate and logged.

mod freefall;
mod scenario;

use anyhow::{Context, Result};
use canopy::{
    apply_controls, BonePose, CanopyConfig, CanopyOpening, CanopySimulator, Deployment, GearDatabase,
    MalfunctionOutcome, RiserSet,
};
use engine_core::{Altitude, Jumper, SimClock, Vec3, Velocity};
use physics::{CollisionGroup, PhysicsBody, PhysicsWorld, SharedPhysicsWorld};
use rand::rngs::StdRng;
use rand::SeedableRng;
use scenario::ScenarioConfig;
use std::path::{Path, PathBuf};

/// Harness attachment points, jumper local space.
fn harness_anchors() -> RiserSet<Vec3> {
    RiserSet::new(
        Vec3::new(-0.18, 0.55, 0.05),
        Vec3::new(0.18, 0.55, 0.05),
        Vec3::new(-0.18, 0.55, -0.05),
        Vec3::new(0.18, 0.55, -0.05),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Freefall,
    Canopy,
    CutAway,
    Landed,
}

struct Jump {
    physics: SharedPhysicsWorld,
    world: hecs::World,
    jumper: hecs::Entity,
    canopy: CanopySimulator,
    opening: CanopyOpening,
    rng: StdRng,
    scenario: ScenarioConfig,
    phase: Phase,
    time: f32,
    deployed_at: f32,
}

impl Jump {
    fn new(scenario: ScenarioConfig, canopy_config: CanopyConfig) -> Result<Self> {
        let gear_db = match &scenario.gear_file {
            Some(path) => GearDatabase::load(path)
                .with_context(|| format!("loading gear table {:?}", path))?,
            None => GearDatabase::builtin(),
        };
        let gear = gear_db
            .try_record(scenario.gear_id)
            .context("scenario gear_id")?
            .clone();
        log::info!(
            "Gear: {} ({:?}, {:.1} m², wing loading {:.1} N/m²)",
            gear.name,
            gear.class,
            gear.area,
            gear.wing_loading(scenario.jumper_mass * engine_core::GRAVITY.length())
        );

        let physics = PhysicsWorld::new().shared();
        physics.borrow_mut().set_timestep(1.0 / scenario.tick_rate);

        let (body, collider) = {
            let mut w = physics.borrow_mut();
            let body = w.add_dynamic_body(Vec3::new(0.0, scenario.exit_altitude, 0.0));
            let collider = w.add_ball_collider(body, 0.35, scenario.jumper_mass, CollisionGroup::jumper());
            (body, collider)
        };

        let mut world = hecs::World::new();
        let jumper = world.spawn((
            Jumper {
                rigging_skill: scenario.rigging_skill,
                canopy_skill: scenario.canopy_skill,
            },
            PhysicsBody::with_collider(body, collider),
            Velocity::default(),
            Altitude(scenario.exit_altitude),
        ));

        let rig = Box::new(BonePose::from_descs(&gear.bones));
        let mut canopy = CanopySimulator::new(physics.clone(), rig, gear, canopy_config.clone())
            .context("canopy gear has invalid bones")?;
        canopy.set_pilot_skill(scenario.canopy_skill);
        let wind = Vec3::from_array(scenario.wind);
        if wind != Vec3::ZERO {
            canopy.enable_wind(true);
            canopy.set_wind(wind);
        }

        Ok(Self {
            physics,
            world,
            jumper,
            canopy,
            opening: CanopyOpening::new(&canopy_config),
            rng: StdRng::seed_from_u64(scenario.seed),
            scenario,
            phase: Phase::Freefall,
            time: 0.0,
            deployed_at: 0.0,
        })
    }

    fn jumper_body(&self) -> Result<PhysicsBody> {
        Ok(*self
            .world
            .get::<&PhysicsBody>(self.jumper)
            .context("jumper entity lost its body")?)
    }

    /// Pull physics state into the jumper's components.
    fn sync(&mut self) {
        let physics = self.physics.borrow();
        for (_, (body, velocity, altitude)) in self
            .world
            .query_mut::<(&PhysicsBody, &mut Velocity, &mut Altitude)>()
        {
            if let Some(v) = physics.get_body_velocity(body.rigid_body) {
                velocity.linear = v;
            }
            if let Some(t) = physics.get_body_transform(body.rigid_body) {
                altitude.0 = t.position.y;
            }
        }
    }

    fn tick(&mut self, dt: f32) -> Result<()> {
        let body = self.jumper_body()?.rigid_body;
        let velocity = self.world.get::<&Velocity>(self.jumper)?.linear;
        let wind = Vec3::from_array(self.scenario.wind);

        {
            let mut w = self.physics.borrow_mut();
            w.reset_forces(body);
            if self.phase != Phase::Canopy {
                w.apply_force(body, freefall::air_resistance(velocity, wind, self.scenario.jumper_mass));
            }
        }

        match self.phase {
            Phase::Freefall if self.time >= self.scenario.freefall_time => self.deploy(body, velocity)?,
            Phase::Canopy => self.fly(),
            _ => {}
        }

        self.physics.borrow_mut().step();
        self.canopy.update(dt);
        self.sync();
        self.time += dt;

        if self.world.get::<&Altitude>(self.jumper)?.is_landed() {
            self.phase = Phase::Landed;
        }
        Ok(())
    }

    fn deploy(&mut self, body: physics::RigidBodyHandle, velocity: Vec3) -> Result<()> {
        let carrier_pose = self
            .physics
            .borrow()
            .get_body_transform(body)
            .context("jumper body missing at deployment")?;
        let rigging_skill = self.world.get::<&Jumper>(self.jumper)?.rigging_skill;
        let deployment = Deployment {
            carrier: body,
            carrier_pose,
            velocity,
            jumper_anchors: harness_anchors(),
            rigging_skill,
            pilotchute: self.scenario.pilotchute,
            pilotchute_velocity: velocity.length(),
        };
        let outcome: MalfunctionOutcome = self.opening.deploy(&mut self.canopy, &mut self.rng, &deployment);
        log::info!(
            "Deployed at {:.0} m, {:.1} m/s: LOW {:.2}/{:.2}, twists {:.0}°, off-heading {:.0}°",
            carrier_pose.position.y,
            velocity.length(),
            outcome.left_low,
            outcome.right_low,
            outcome.linetwists,
            self.opening.turn()
        );
        self.phase = Phase::Canopy;
        self.deployed_at = self.time;
        Ok(())
    }

    fn fly(&mut self) {
        let since = self.time - self.deployed_at;
        if !self.opening.update(&mut self.canopy) {
            let cord = self.scenario.controls_at(since);
            apply_controls(&mut self.canopy, &cord, 0.0);
        }
        self.canopy.poll_contacts();
        if self.canopy.is_cohesion_state() {
            self.canopy.rip(self.canopy.burden());
        }
        if let Some(after) = self.scenario.cut_away_after {
            if since >= after {
                self.canopy.cut_away();
                self.phase = Phase::CutAway;
            }
        }
    }

    fn report(&self) -> Result<()> {
        let altitude = self.world.get::<&Altitude>(self.jumper)?.0;
        let velocity = self.world.get::<&Velocity>(self.jumper)?.linear;
        let signature = self.canopy.signature();
        log::info!(
            "t={:6.1}s {:?} alt {:7.1} m  vh {:5.1} vv {:6.1} m/s  canopy {:?} infl {:.2}  LOW {:.2}/{:.2} twists {:.0} burden {:.0} N",
            self.time,
            self.phase,
            altitude,
            Vec3::new(velocity.x, 0.0, velocity.z).length(),
            velocity.y,
            self.canopy.state(),
            self.canopy.get_inflation(),
            signature.left_low,
            signature.right_low,
            signature.linetwists,
            self.canopy.burden()
        );
        Ok(())
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let scenario_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("scenario.ron"));
    let scenario = ScenarioConfig::load(&scenario_path)
        .with_context(|| format!("parsing scenario {:?}", scenario_path))?;
    let canopy_config = CanopyConfig::load(Path::new("canopy.ron"));

    log::info!("Starting jump simulation (seed {})", scenario.seed);
    let tick_rate = scenario.tick_rate;
    let max_time = scenario.max_time;
    let mut jump = Jump::new(scenario, canopy_config)?;
    let mut clock = SimClock::new(tick_rate);
    let frame = 1.0 / 30.0;
    let mut next_report = 0.0;

    while jump.phase != Phase::Landed && jump.time < max_time {
        for _ in 0..clock.advance(frame) {
            jump.tick(clock.fixed_timestep())?;
            if jump.phase == Phase::Landed {
                break;
            }
        }
        if jump.time >= next_report {
            jump.report()?;
            next_report += 1.0;
        }
    }

    jump.report()?;
    log::info!(
        "Jump finished after {:.1}s ({} ticks): {:?}",
        clock.elapsed_seconds(),
        clock.tick_count(),
        jump.phase
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_jump_deploys_and_opens() {
        let scenario = ScenarioConfig {
            exit_altitude: 3000.0,
            freefall_time: 2.0,
            seed: 1,
            ..Default::default()
        };
        let mut jump = Jump::new(scenario, CanopyConfig::default()).unwrap();
        let dt = 1.0 / 60.0;
        for _ in 0..(6.0 / dt) as usize {
            jump.tick(dt).unwrap();
        }
        assert_eq!(jump.phase, Phase::Canopy);
        assert!(jump.canopy.is_opened());
        assert!(jump.canopy.get_inflation() > 0.0);
    }

    #[test]
    fn scripted_cutaway_releases_canopy() {
        let scenario = ScenarioConfig {
            exit_altitude: 3000.0,
            freefall_time: 1.0,
            cut_away_after: Some(1.0),
            ..Default::default()
        };
        let mut jump = Jump::new(scenario, CanopyConfig::default()).unwrap();
        let dt = 1.0 / 60.0;
        for _ in 0..(3.0 / dt) as usize {
            jump.tick(dt).unwrap();
        }
        assert_eq!(jump.phase, Phase::CutAway);
        assert!(jump.canopy.is_cut_away());
        assert_eq!(jump.physics.borrow().body_count(), 1);
    }
}
