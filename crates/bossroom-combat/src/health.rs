//! Health pools and the damage capability.
//!
//! A [`HealthPool`] only ever loses health. Damage inside the
//! invulnerability window is ignored, and the pool reports death exactly
//! once.

use serde::{Deserialize, Serialize};

use bossroom_common::Vec2;

// ============================================================================
// Configuration
// ============================================================================

/// Tuning for a health pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Maximum (and starting) health.
    pub max_hp: i32,
    /// Invulnerability window after a hit (seconds).
    pub i_frame_duration: f32,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self::boss()
    }
}

impl HealthConfig {
    /// Boss defaults.
    #[must_use]
    pub fn boss() -> Self {
        Self {
            max_hp: 300,
            i_frame_duration: 0.10,
        }
    }

    /// Player defaults.
    #[must_use]
    pub fn player() -> Self {
        Self {
            max_hp: 100,
            i_frame_duration: 0.3,
        }
    }

    /// Clamp values to valid ranges.
    pub fn validate(&mut self) {
        self.max_hp = self.max_hp.max(1);
        self.i_frame_duration = self.i_frame_duration.clamp(0.0, 10.0);
    }
}

// ============================================================================
// Damage capability
// ============================================================================

/// Outcome of a damage call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DamageResult {
    /// Health actually changed.
    pub applied: bool,
    /// This call caused death.
    pub killed: bool,
}

impl DamageResult {
    /// Nothing happened.
    pub const NONE: Self = Self {
        applied: false,
        killed: false,
    };
}

/// Anything that can receive damage and report death.
pub trait Damageable {
    /// Applies damage without positional information.
    fn apply_damage(&mut self, amount: i32, now: f32) -> DamageResult;

    /// Applies damage coming from a world position.
    ///
    /// Dispatchers always call this. Types that care where a hit came from
    /// override it; the rest fall back to [`Damageable::apply_damage`].
    fn apply_damage_from(&mut self, amount: i32, source_position: Vec2, now: f32) -> DamageResult {
        let _ = source_position;
        self.apply_damage(amount, now)
    }

    /// Whether the receiver is dead.
    fn is_dead(&self) -> bool;
}

// ============================================================================
// Health pool
// ============================================================================

/// Current and maximum health with an invulnerability window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthPool {
    max_hp: i32,
    current_hp: i32,
    i_frame_duration: f32,
    invulnerable_until: f32,
    dead: bool,
}

impl Default for HealthPool {
    fn default() -> Self {
        Self::from_config(&HealthConfig::default())
    }
}

impl HealthPool {
    /// Creates a full pool. `max_hp` is clamped to at least 1.
    #[must_use]
    pub fn new(max_hp: i32, i_frame_duration: f32) -> Self {
        let max_hp = max_hp.max(1);
        Self {
            max_hp,
            current_hp: max_hp,
            i_frame_duration: i_frame_duration.max(0.0),
            invulnerable_until: f32::NEG_INFINITY,
            dead: false,
        }
    }

    /// Creates a full pool from config.
    #[must_use]
    pub fn from_config(config: &HealthConfig) -> Self {
        Self::new(config.max_hp, config.i_frame_duration)
    }

    /// Current health.
    #[must_use]
    pub fn current(&self) -> i32 {
        self.current_hp
    }

    /// Maximum health.
    #[must_use]
    pub fn max(&self) -> i32 {
        self.max_hp
    }

    /// Health as a fraction of maximum.
    #[must_use]
    pub fn fraction(&self) -> f32 {
        self.current_hp as f32 / self.max_hp as f32
    }

    /// End of the current invulnerability window.
    #[must_use]
    pub fn invulnerable_until(&self) -> f32 {
        self.invulnerable_until
    }

    /// Whether damage at `now` would be ignored by the i-frame window.
    #[must_use]
    pub fn is_invulnerable(&self, now: f32) -> bool {
        now < self.invulnerable_until
    }
}

impl Damageable for HealthPool {
    fn apply_damage(&mut self, amount: i32, now: f32) -> DamageResult {
        if self.dead || self.current_hp <= 0 || self.is_invulnerable(now) {
            return DamageResult::NONE;
        }

        let amount = amount.max(0);
        if amount == 0 {
            return DamageResult::NONE;
        }

        self.current_hp = (self.current_hp - amount).clamp(0, self.max_hp);

        if self.current_hp == 0 {
            self.dead = true;
            return DamageResult {
                applied: true,
                killed: true,
            };
        }

        self.invulnerable_until = now + self.i_frame_duration;
        DamageResult {
            applied: true,
            killed: false,
        }
    }

    fn is_dead(&self) -> bool {
        self.dead
    }
}
