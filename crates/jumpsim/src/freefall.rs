//! Free-fall air resistance for the jumper body.

use engine_core::{Vec3, GRAVITY};

/// Belly-to-earth terminal velocity, m/s.
pub const TERMINAL_VELOCITY: f32 = 55.0;

/// Normalised resistance at `ratio` = speed / terminal speed. Equals 1 at
/// terminal speed and grows steeply past it.
pub fn resistance_power(ratio: f32) -> f32 {
    ((ratio.max(0.0)).powf(1.4).exp() - 1.0) / 1.718
}

/// Air resistance force on a falling body of `mass` moving at `velocity`
/// through air moving at `wind`.
pub fn air_resistance(velocity: Vec3, wind: Vec3, mass: f32) -> Vec3 {
    let air = velocity - wind;
    let speed = air.length();
    if speed <= 1e-4 {
        return Vec3::ZERO;
    }
    -air / speed * resistance_power(speed / TERMINAL_VELOCITY) * mass * GRAVITY.length()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_speed_balances_weight() {
        let mass = 85.0;
        let f = air_resistance(Vec3::new(0.0, -TERMINAL_VELOCITY, 0.0), Vec3::ZERO, mass);
        let weight = mass * GRAVITY.length();
        assert!((f.y - weight).abs() / weight < 0.01, "force {}", f.y);
    }

    #[test]
    fn resistance_opposes_airflow() {
        let f = air_resistance(Vec3::new(10.0, -30.0, 0.0), Vec3::new(10.0, 0.0, 0.0), 80.0);
        assert!(f.y > 0.0);
        assert!(f.x.abs() < 1e-4);
        assert_eq!(air_resistance(Vec3::ZERO, Vec3::ZERO, 80.0), Vec3::ZERO);
    }
}
