//! Kinematic movement and the player's dash motor.

use serde::{Deserialize, Serialize};

use bossroom_common::Vec2;

use crate::ports::MovementActuator;

// ============================================================================
// Kinematic body
// ============================================================================

/// A point body moved directly by the core.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct KinematicBody {
    position: Vec2,
    last_delta: Vec2,
}

impl KinematicBody {
    /// Creates a body at `position`.
    #[must_use]
    pub const fn new(position: Vec2) -> Self {
        Self {
            position,
            last_delta: Vec2::ZERO,
        }
    }

    /// Displacement applied by the last move.
    #[must_use]
    pub fn last_delta(&self) -> Vec2 {
        self.last_delta
    }

    /// Whether the last move actually displaced the body.
    #[must_use]
    pub fn is_moving(&self) -> bool {
        self.last_delta != Vec2::ZERO
    }
}

impl MovementActuator for KinematicBody {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn move_to(&mut self, target: Vec2) {
        self.last_delta = target - self.position;
        self.position = target;
    }

    fn halt(&mut self) {
        self.last_delta = Vec2::ZERO;
    }
}

// ============================================================================
// Look direction
// ============================================================================

/// Four-way look direction used when a dash has no input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LookDirection {
    /// Facing up
    Up,
    /// Facing down (default)
    #[default]
    Down,
    /// Facing left
    Left,
    /// Facing right
    Right,
}

impl LookDirection {
    /// Convert direction to a unit vector (+y is up).
    #[must_use]
    pub fn to_vec2(self) -> Vec2 {
        match self {
            Self::Up => Vec2::Y,
            Self::Down => Vec2::NEG_Y,
            Self::Left => Vec2::NEG_X,
            Self::Right => Vec2::X,
        }
    }

    /// Dominant axis of `v`, or `None` for a zero vector.
    #[must_use]
    pub fn from_vec2(v: Vec2) -> Option<Self> {
        if v == Vec2::ZERO {
            return None;
        }
        if v.x.abs() > v.y.abs() {
            if v.x > 0.0 {
                Some(Self::Right)
            } else {
                Some(Self::Left)
            }
        } else if v.y > 0.0 {
            Some(Self::Up)
        } else {
            Some(Self::Down)
        }
    }
}

// ============================================================================
// Dash motor
// ============================================================================

/// Walk and dash tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashConfig {
    /// Walk speed (units per second).
    pub move_speed: f32,
    /// Dash speed (units per second).
    pub dash_speed: f32,
    /// Dash length (seconds).
    pub dash_duration: f32,
    /// Time between dash starts (seconds).
    pub dash_cooldown: f32,
    /// Steer the dash with input while it runs.
    pub allow_air_turn: bool,
}

impl Default for DashConfig {
    fn default() -> Self {
        Self {
            move_speed: 5.0,
            dash_speed: 14.0,
            dash_duration: 0.15,
            dash_cooldown: 0.4,
            allow_air_turn: true,
        }
    }
}

impl DashConfig {
    /// Clamp values to valid ranges.
    pub fn validate(&mut self) {
        self.move_speed = self.move_speed.clamp(0.0, 100.0);
        self.dash_speed = self.dash_speed.clamp(0.0, 200.0);
        self.dash_duration = self.dash_duration.clamp(0.0, 5.0);
        self.dash_cooldown = self.dash_cooldown.clamp(0.0, 30.0);
    }
}

/// Turns movement input into per-tick displacement, with a dash.
#[derive(Debug, Clone, Default)]
pub struct DashMotor {
    config: DashConfig,
    dash_remaining: f32,
    cooldown: f32,
    dash_dir: Vec2,
    look: LookDirection,
}

impl DashMotor {
    /// Creates an idle motor.
    #[must_use]
    pub fn new(config: DashConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Motor tuning.
    #[must_use]
    pub fn config(&self) -> &DashConfig {
        &self.config
    }

    /// Whether a dash is running.
    #[must_use]
    pub fn is_dashing(&self) -> bool {
        self.dash_remaining > 0.0
    }

    /// Seconds until the next dash may start.
    #[must_use]
    pub fn cooldown_remaining(&self) -> f32 {
        self.cooldown
    }

    /// Current look direction.
    #[must_use]
    pub fn look(&self) -> LookDirection {
        self.look
    }

    /// Points the look direction along `dir`. Zero vectors are ignored.
    pub fn look_toward(&mut self, dir: Vec2) {
        if let Some(look) = LookDirection::from_vec2(dir) {
            self.look = look;
        }
    }

    /// Advances one tick and returns the displacement to apply.
    ///
    /// The dash cooldown runs from the moment the dash starts.
    pub fn tick(&mut self, dt: f32, input: Vec2, dash_pressed: bool) -> Vec2 {
        let dt = dt.max(0.0);
        let input = input.normalize_or_zero();
        self.cooldown = (self.cooldown - dt).max(0.0);

        if dash_pressed && !self.is_dashing() && self.cooldown <= 0.0 {
            self.dash_dir = if input == Vec2::ZERO {
                self.look.to_vec2()
            } else {
                input
            };
            self.dash_remaining = self.config.dash_duration;
            self.cooldown = self.config.dash_cooldown;
        }

        if self.is_dashing() {
            if self.config.allow_air_turn && input != Vec2::ZERO {
                self.dash_dir = input;
            }
            let step = dt.min(self.dash_remaining);
            self.dash_remaining -= step;
            return self.dash_dir * self.config.dash_speed * step;
        }

        input * self.config.move_speed * dt
    }

    /// Stops any dash in progress.
    pub fn cancel(&mut self) {
        self.dash_remaining = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec2, b: Vec2) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn test_body_tracks_last_delta() {
        let mut body = KinematicBody::new(Vec2::ZERO);
        body.move_by(Vec2::new(1.0, 2.0));
        assert_eq!(body.position(), Vec2::new(1.0, 2.0));
        assert!(body.is_moving());

        body.halt();
        assert!(!body.is_moving());
        assert_eq!(body.position(), Vec2::new(1.0, 2.0));
    }

    #[test]
    fn test_look_direction_dominant_axis() {
        assert_eq!(LookDirection::from_vec2(Vec2::new(0.9, 0.2)), Some(LookDirection::Right));
        assert_eq!(LookDirection::from_vec2(Vec2::new(-0.1, -0.8)), Some(LookDirection::Down));
        assert_eq!(LookDirection::from_vec2(Vec2::new(0.5, 0.5)), Some(LookDirection::Up));
        assert_eq!(LookDirection::from_vec2(Vec2::ZERO), None);
        assert_eq!(LookDirection::default().to_vec2(), Vec2::NEG_Y);
    }

    #[test]
    fn test_walk_is_normalized() {
        let mut motor = DashMotor::new(DashConfig::default());
        let delta = motor.tick(0.1, Vec2::new(3.0, 4.0), false);
        assert!(approx(delta, Vec2::new(0.3, 0.4)));
    }

    #[test]
    fn test_dash_covers_speed_times_duration() {
        let mut motor = DashMotor::new(DashConfig::default());
        let mut travelled = motor.tick(0.05, Vec2::X, true);
        assert!(motor.is_dashing());
        for _ in 0..5 {
            travelled += motor.tick(0.05, Vec2::ZERO, false);
        }
        assert!(!motor.is_dashing());
        // 14 * 0.15 along +x; idle ticks after the dash add nothing.
        assert!(approx(travelled, Vec2::new(2.1, 0.0)));
    }

    #[test]
    fn test_idle_dash_uses_look_direction() {
        let mut motor = DashMotor::new(DashConfig::default());
        let delta = motor.tick(0.1, Vec2::ZERO, true);
        assert!(approx(delta, Vec2::new(0.0, -1.4)));

        let mut motor = DashMotor::new(DashConfig::default());
        motor.look_toward(Vec2::new(-2.0, 0.5));
        let delta = motor.tick(0.1, Vec2::ZERO, true);
        assert!(approx(delta, Vec2::new(-1.4, 0.0)));
    }

    #[test]
    fn test_dash_cooldown_gates_restart() {
        let mut motor = DashMotor::new(DashConfig::default());
        motor.tick(0.15, Vec2::X, true);
        assert!(!motor.is_dashing());

        motor.tick(0.1, Vec2::X, true);
        assert!(!motor.is_dashing());

        motor.tick(0.5, Vec2::X, true);
        assert!(motor.is_dashing());
    }

    #[test]
    fn test_air_turn_steers_dash() {
        let mut motor = DashMotor::new(DashConfig::default());
        motor.tick(0.05, Vec2::X, true);
        let delta = motor.tick(0.05, Vec2::Y, false);
        assert!(approx(delta, Vec2::new(0.0, 0.7)));

        let mut motor = DashMotor::new(DashConfig {
            allow_air_turn: false,
            ..DashConfig::default()
        });
        motor.tick(0.05, Vec2::X, true);
        let delta = motor.tick(0.05, Vec2::Y, false);
        assert!(approx(delta, Vec2::new(0.7, 0.0)));
    }
}
