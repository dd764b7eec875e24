//! One boss, one player and their projectiles, ticked in a fixed order.
//!
//! Per tick:
//! 1. player intent and boss decisions (movement, timed resolve points)
//! 2. projectile motion
//! 3. hit resolution: player strikes, then boss hitbox and volleys, then
//!    projectile hits
//! 4. death checks
//! 5. sweep of destroyed projectiles
//!
//! A killing blow and the death it causes land in the same tick.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use bossroom_common::Vec2;

use crate::boss::{BossBehavior, BossConfig};
use crate::events::NotificationBus;
use crate::health::Damageable;
use crate::hit_resolver::Hittable;
use crate::movement::KinematicBody;
use crate::player::{PlayerAvatar, PlayerConfig, PlayerIntent};
use crate::ports::AnimationSignal;
use crate::projectile::ProjectileSystem;
use crate::world::CombatWorld;

/// Encounter setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncounterConfig {
    /// Boss tuning.
    pub boss: BossConfig,
    /// Player tuning.
    pub player: PlayerConfig,
    /// Boss spawn position.
    pub boss_start: Vec2,
    /// Player spawn position.
    pub player_start: Vec2,
}

impl Default for EncounterConfig {
    fn default() -> Self {
        Self {
            boss: BossConfig::default(),
            player: PlayerConfig::default(),
            boss_start: Vec2::new(0.0, 3.0),
            player_start: Vec2::new(0.0, -3.0),
        }
    }
}

impl EncounterConfig {
    /// Clamp values to valid ranges.
    pub fn validate(&mut self) {
        self.boss.validate();
        self.player.validate();
    }
}

/// How the encounter stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EncounterOutcome {
    /// Both sides alive.
    #[default]
    Ongoing,
    /// The boss died.
    BossDefeated,
    /// The player died.
    PlayerDefeated,
}

impl EncounterOutcome {
    /// Whether the encounter has ended.
    #[must_use]
    pub const fn is_over(&self) -> bool {
        !matches!(self, Self::Ongoing)
    }
}

/// A running boss fight.
#[derive(Debug)]
pub struct Encounter {
    boss: BossBehavior,
    player: PlayerAvatar,
    projectiles: ProjectileSystem,
    elapsed: f32,
    ticks: u64,
    outcome: EncounterOutcome,
}

impl Encounter {
    /// Spawns both sides, reporting to `bus`.
    #[must_use]
    pub fn new(config: &EncounterConfig, bus: &NotificationBus) -> Self {
        let boss = BossBehavior::new(
            config.boss.clone(),
            Box::new(KinematicBody::new(config.boss_start)),
            Box::new(bus.sink()),
        );
        let player = PlayerAvatar::new(&config.player, config.player_start, Box::new(bus.sink()));
        Self::from_parts(boss, player)
    }

    /// Wraps an already built boss and player.
    #[must_use]
    pub fn from_parts(boss: BossBehavior, player: PlayerAvatar) -> Self {
        info!(boss = %boss.id(), player = %player.id(), "encounter started");
        Self {
            boss,
            player,
            projectiles: ProjectileSystem::new(),
            elapsed: 0.0,
            ticks: 0,
            outcome: EncounterOutcome::Ongoing,
        }
    }

    /// Attaches an animation signal to the boss.
    #[must_use]
    pub fn with_boss_animation(mut self, animation: Box<dyn AnimationSignal>) -> Self {
        self.boss = self.boss.with_animation(animation);
        self
    }

    /// The boss.
    #[must_use]
    pub fn boss(&self) -> &BossBehavior {
        &self.boss
    }

    /// The boss, for externally signaled resolve points.
    pub fn boss_mut(&mut self) -> &mut BossBehavior {
        &mut self.boss
    }

    /// The player.
    #[must_use]
    pub fn player(&self) -> &PlayerAvatar {
        &self.player
    }

    /// The player, for externally signaled strikes.
    pub fn player_mut(&mut self) -> &mut PlayerAvatar {
        &mut self.player
    }

    /// Projectiles in flight.
    #[must_use]
    pub fn projectiles(&self) -> &ProjectileSystem {
        &self.projectiles
    }

    /// Seconds of fighting so far. Stops when the outcome is decided.
    #[must_use]
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Ticks run so far.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// Current outcome.
    #[must_use]
    pub fn outcome(&self) -> EncounterOutcome {
        self.outcome
    }

    /// Advances one tick.
    pub fn tick(&mut self, dt: f32, intent: &PlayerIntent) -> EncounterOutcome {
        let dt = dt.max(0.0);
        self.ticks += 1;

        if self.outcome.is_over() {
            // Let the boss finish dying and stray bullets fly out.
            self.boss.tick(dt, &self.player);
            self.projectiles.advance(dt);
            self.projectiles.sweep();
            return self.outcome;
        }

        self.elapsed += dt;
        let now = self.elapsed;

        self.player.tick(dt, intent);
        self.boss.tick(dt, &self.player);

        self.projectiles.advance(dt);

        {
            let mut world = CombatWorld::new(&mut self.projectiles, now).with_body(&mut self.boss);
            self.player.resolve(&mut world);
        }
        {
            let mut world =
                CombatWorld::new(&mut self.projectiles, now).with_body(&mut self.player);
            self.boss.resolve(&mut world);
        }
        let hits = {
            let mut bodies: [&mut dyn Hittable; 2] = [&mut self.player, &mut self.boss];
            self.projectiles.resolve_hits(&mut bodies, now)
        };
        if !hits.is_empty() {
            debug!(count = hits.len(), "projectile hits");
        }

        self.boss.check_death();
        self.outcome = if self.boss.state().is_terminal() {
            EncounterOutcome::BossDefeated
        } else if self.player.is_dead() {
            EncounterOutcome::PlayerDefeated
        } else {
            EncounterOutcome::Ongoing
        };
        if self.outcome.is_over() {
            info!(outcome = ?self.outcome, elapsed = self.elapsed, "encounter decided");
        }

        self.projectiles.sweep();
        self.outcome
    }
}
