//! Deployment malfunctions and the actions that resolve them.
//!
//! Malfunctions are sampled once, at line stretch, by the opening sequencer.
//! After that they are continuous severities: line-over weight per side and
//! a line-twist angle, both worked off over time rather than toggled.

use crate::config::CanopyConfig;
use rand::Rng;

/// Initial malfunction state handed to `CanopySimulator::open`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MalfunctionOutcome {
    pub left_low: f32,
    pub right_low: f32,
    /// Degrees; positive twists right, negative twists left.
    pub linetwists: f32,
}

impl MalfunctionOutcome {
    pub fn is_clean(&self) -> bool {
        self.left_low == 0.0 && self.right_low == 0.0 && self.linetwists == 0.0
    }
}

/// One-shot malfunction dice.
#[derive(Debug, Clone, Copy)]
pub struct MalfunctionGenerator {
    lineover_base: f32,
    linetwists_onset: f32,
    linetwists_full: f32,
    linetwists_max: f32,
}

impl MalfunctionGenerator {
    pub fn from_config(config: &CanopyConfig) -> Self {
        Self {
            lineover_base: config.lineover_base,
            linetwists_onset: config.linetwists_onset,
            linetwists_full: config.linetwists_full,
            linetwists_max: config.linetwists_max,
        }
    }

    /// Line-over chance from pilotchute velocity over its reference velocity.
    /// Grows with the square of the ratio.
    pub fn lineover_probability(&self, velocity_ratio: f32) -> f32 {
        let ratio = velocity_ratio.max(0.0);
        (self.lineover_base * ratio * ratio).clamp(0.0, 1.0)
    }

    /// Line-twist chance from pilotchute velocity: zero below onset, ramping
    /// linearly to the maximum at full.
    pub fn linetwists_probability(&self, pilotchute_velocity: f32) -> f32 {
        let span = (self.linetwists_full - self.linetwists_onset).max(1e-3);
        let t = ((pilotchute_velocity - self.linetwists_onset) / span).clamp(0.0, 1.0);
        t * self.linetwists_max
    }

    /// Roll the dice. Right line-over is only rolled when the left one did
    /// not happen, so at most one side is ever affected.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        pilotchute_velocity: f32,
        reference_velocity: f32,
    ) -> MalfunctionOutcome {
        let ratio = if reference_velocity > 0.0 {
            pilotchute_velocity / reference_velocity
        } else {
            0.0
        };
        let lineover = self.lineover_probability(ratio);
        let left = rng.gen::<f32>() < lineover;
        let right = !left && rng.gen::<f32>() < lineover;
        let left_low = if left { rng.gen_range(0.5..=1.0) } else { 0.0 };
        let right_low = if right { rng.gen_range(0.5..=1.0) } else { 0.0 };

        let twists_dice = rng.gen::<f32>();
        let twisted = twists_dice < self.linetwists_probability(pilotchute_velocity);
        log::debug!("linetwists dice: {:.2}", twists_dice);
        let magnitude: f32 = rng.gen_range(720.0..=1440.0);
        let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        let linetwists = if twisted { magnitude * sign } else { 0.0 };

        MalfunctionOutcome {
            left_low,
            right_low,
            linetwists,
        }
    }
}

/// Weight of the weight-shift (WLO toggles) action, rising while held.
#[derive(Debug, Clone, Copy, Default)]
pub struct WloToggles {
    trigger: bool,
    weight: f32,
}

impl WloToggles {
    pub fn set_trigger(&mut self, trigger: bool) {
        self.trigger = trigger;
    }

    pub fn weight(&self) -> f32 {
        self.weight
    }

    /// Skilled pilots reach the toggles faster.
    pub fn simulate(&mut self, dt: f32, pull_time: f32, skill: f32) {
        let time = pull_time.max(1e-3) * (1.5 - skill.clamp(0.0, 1.0));
        let step = dt / time;
        self.weight = if self.trigger {
            (self.weight + step).min(1.0)
        } else {
            (self.weight - step).max(0.0)
        };
    }
}

/// Commitment weight of the hook-knife action.
#[derive(Debug, Clone, Copy, Default)]
pub struct HookKnife {
    trigger: bool,
    weight: f32,
}

impl HookKnife {
    pub fn set_trigger(&mut self, trigger: bool) {
        self.trigger = trigger;
    }

    pub fn weight(&self) -> f32 {
        self.weight
    }

    pub fn is_committed(&self) -> bool {
        self.weight >= 1.0
    }

    pub fn simulate(&mut self, dt: f32, commit_time: f32) {
        let step = dt / commit_time.max(1e-3);
        self.weight = if self.trigger {
            (self.weight + step).min(1.0)
        } else {
            (self.weight - step).max(0.0)
        };
    }

    pub fn reset(&mut self) {
        self.weight = 0.0;
    }
}

/// Decay one line-over severity under the current WLO weight.
pub fn decay_lineover(severity: f32, dt: f32, decay_rate: f32, wlo_weight: f32) -> f32 {
    (severity - decay_rate * wlo_weight * dt).max(0.0)
}

/// Unwind a line-twist angle toward zero. `spread` is how hard the risers
/// are being pulled apart, in [0, 1].
pub fn unwind_linetwists(angle: f32, dt: f32, rate: f32, passive: f32, spread: f32) -> f32 {
    let passive = passive.clamp(0.0, 1.0);
    let speed = rate * (passive + (1.0 - passive) * spread.clamp(0.0, 1.0));
    let remaining = (angle.abs() - speed * dt).max(0.0);
    remaining * angle.signum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn generator(lineover_base: f32) -> MalfunctionGenerator {
        MalfunctionGenerator {
            lineover_base,
            linetwists_onset: 20.0,
            linetwists_full: 60.0,
            linetwists_max: 0.5,
        }
    }

    #[test]
    fn lineover_sides_are_mutually_exclusive() {
        let gen = generator(0.6);
        let mut rng = StdRng::seed_from_u64(7);
        let mut lefts = 0;
        let mut rights = 0;
        for _ in 0..5000 {
            let m = gen.generate(&mut rng, 40.0, 40.0);
            assert!(m.left_low == 0.0 || m.right_low == 0.0);
            assert!((0.0..=1.0).contains(&m.left_low));
            assert!((0.0..=1.0).contains(&m.right_low));
            if m.left_low > 0.0 {
                assert!(m.left_low >= 0.5);
                lefts += 1;
            }
            if m.right_low > 0.0 {
                rights += 1;
            }
        }
        // left is rolled first, right only when left missed
        assert!(lefts > 2500 && lefts < 3500, "lefts {}", lefts);
        assert!(rights > 1000 && rights < 1800, "rights {}", rights);
    }

    #[test]
    fn linetwist_magnitude_and_sign() {
        let gen = generator(0.0);
        let mut rng = StdRng::seed_from_u64(11);
        let mut positive = 0;
        let mut twisted = 0;
        for _ in 0..4000 {
            let m = gen.generate(&mut rng, 80.0, 40.0);
            if m.linetwists == 0.0 {
                continue;
            }
            twisted += 1;
            assert!((720.0..=1440.0).contains(&m.linetwists.abs()));
            if m.linetwists > 0.0 {
                positive += 1;
            }
        }
        assert!(twisted > 1700 && twisted < 2300, "twisted {}", twisted);
        let share = positive as f32 / twisted as f32;
        assert!((share - 0.5).abs() < 0.06, "positive share {}", share);
    }

    #[test]
    fn slow_pilotchute_never_twists() {
        let gen = generator(0.0);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..500 {
            let m = gen.generate(&mut rng, 10.0, 40.0);
            assert_eq!(m.linetwists, 0.0);
            assert!(m.is_clean());
        }
    }

    #[test]
    fn probabilities_are_monotonic() {
        let gen = generator(0.05);
        let mut last_low = 0.0;
        let mut last_twist = 0.0;
        for i in 0..40 {
            let low = gen.lineover_probability(i as f32 * 0.1);
            let twist = gen.linetwists_probability(i as f32 * 2.5);
            assert!(low >= last_low && twist >= last_twist);
            last_low = low;
            last_twist = twist;
        }
    }

    #[test]
    fn same_seed_same_outcome() {
        let gen = generator(0.4);
        let a = gen.generate(&mut StdRng::seed_from_u64(99), 50.0, 40.0);
        let b = gen.generate(&mut StdRng::seed_from_u64(99), 50.0, 40.0);
        assert_eq!(a, b);
    }

    #[test]
    fn wlo_weight_ramps_with_trigger() {
        let mut wlo = WloToggles::default();
        wlo.set_trigger(true);
        for _ in 0..30 {
            wlo.simulate(1.0 / 60.0, 1.0, 0.5);
        }
        assert!((wlo.weight() - 0.5).abs() < 1e-4);
        for _ in 0..60 {
            wlo.simulate(1.0 / 60.0, 1.0, 0.5);
        }
        assert_eq!(wlo.weight(), 1.0);
        wlo.set_trigger(false);
        for _ in 0..120 {
            wlo.simulate(1.0 / 60.0, 1.0, 0.5);
        }
        assert_eq!(wlo.weight(), 0.0);
    }

    #[test]
    fn hook_knife_commits_after_hold() {
        let mut knife = HookKnife::default();
        knife.set_trigger(true);
        for _ in 0..119 {
            knife.simulate(1.0 / 60.0, 2.0);
        }
        assert!(!knife.is_committed());
        knife.simulate(1.0 / 60.0, 2.0);
        knife.simulate(1.0 / 60.0, 2.0);
        assert!(knife.is_committed());
    }

    #[test]
    fn twists_unwind_toward_zero_keeping_sign() {
        let mut angle = -900.0;
        for _ in 0..60 {
            angle = unwind_linetwists(angle, 1.0 / 60.0, 360.0, 0.25, 1.0);
        }
        assert!((angle + 540.0).abs() < 0.5);
        for _ in 0..600 {
            angle = unwind_linetwists(angle, 1.0 / 60.0, 360.0, 0.25, 1.0);
        }
        assert_eq!(angle, 0.0);
    }
}
