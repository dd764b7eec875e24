//! The player avatar: health, dash movement and the melee/parry actor.

use serde::{Deserialize, Serialize};
use tracing::info;

use bossroom_common::{EntityId, PlacedShape, Vec2};

use crate::actor::{CombatActor, MeleeConfig, StrikeReport};
use crate::events::CombatNotification;
use crate::health::{DamageResult, Damageable, HealthConfig, HealthPool};
use crate::hit_resolver::{layers, Collider, Hittable};
use crate::movement::{DashConfig, DashMotor, KinematicBody};
use crate::ports::{MovementActuator, PresentationSink, Target, TargetProvider};
use crate::world::CombatWorld;

/// What the player wants to do this tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerIntent {
    /// Movement input. Normalized by the motor.
    pub move_dir: Vec2,
    /// Aim direction. Zero keeps the previous aim.
    pub aim: Vec2,
    /// Normal attack pressed this tick.
    pub attack_pressed: bool,
    /// Sweep charge started this tick.
    pub charge_started: bool,
    /// Sweep charge released this tick.
    pub charge_released: bool,
    /// Dash pressed this tick.
    pub dash_pressed: bool,
}

impl PlayerIntent {
    /// Intent that only moves.
    #[must_use]
    pub fn moving(dir: Vec2) -> Self {
        Self {
            move_dir: dir,
            ..Self::default()
        }
    }

    /// Set the aim.
    #[must_use]
    pub fn with_aim(mut self, aim: Vec2) -> Self {
        self.aim = aim;
        self
    }

    /// Press attack.
    #[must_use]
    pub fn with_attack(mut self) -> Self {
        self.attack_pressed = true;
        self
    }

    /// Same movement and aim with every one-shot press cleared.
    ///
    /// Used when one frame of input drives several fixed ticks.
    #[must_use]
    pub fn held_only(&self) -> Self {
        Self {
            move_dir: self.move_dir,
            aim: self.aim,
            ..Self::default()
        }
    }
}

/// Player tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Health pool.
    pub health: HealthConfig,
    /// Walk and dash.
    pub dash: DashConfig,
    /// Melee and parry.
    pub melee: MeleeConfig,
    /// Body collider radius.
    pub body_radius: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            health: HealthConfig::player(),
            dash: DashConfig::default(),
            melee: MeleeConfig::default(),
            body_radius: 0.35,
        }
    }
}

impl PlayerConfig {
    /// Clamp values to valid ranges.
    pub fn validate(&mut self) {
        self.health.validate();
        self.dash.validate();
        self.melee.validate();
        self.body_radius = self.body_radius.clamp(0.05, 5.0);
    }
}

/// The player-controlled body.
pub struct PlayerAvatar {
    id: EntityId,
    health: HealthPool,
    body: KinematicBody,
    motor: DashMotor,
    actor: CombatActor,
    body_radius: f32,
    aim: Vec2,
    sink: Box<dyn PresentationSink>,
}

impl PlayerAvatar {
    /// Spawns a player at `position`.
    #[must_use]
    pub fn new(config: &PlayerConfig, position: Vec2, sink: Box<dyn PresentationSink>) -> Self {
        let id = EntityId::new();
        Self {
            id,
            health: HealthPool::from_config(&config.health),
            body: KinematicBody::new(position),
            motor: DashMotor::new(config.dash.clone()),
            actor: CombatActor::new(id, config.melee.clone()),
            body_radius: config.body_radius,
            aim: Vec2::NEG_Y,
            sink,
        }
    }

    /// Entity id.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// World position.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.body.position()
    }

    /// Unit aim direction.
    #[must_use]
    pub fn aim(&self) -> Vec2 {
        self.aim
    }

    /// Health pool.
    #[must_use]
    pub fn health(&self) -> &HealthPool {
        &self.health
    }

    /// Melee actor.
    #[must_use]
    pub fn actor(&self) -> &CombatActor {
        &self.actor
    }

    /// Melee actor, for externally signaled strikes.
    pub fn actor_mut(&mut self) -> &mut CombatActor {
        &mut self.actor
    }

    /// Dash motor.
    #[must_use]
    pub fn motor(&self) -> &DashMotor {
        &self.motor
    }

    /// Applies movement and attack intent.
    pub fn tick(&mut self, dt: f32, intent: &PlayerIntent) {
        if self.is_dead() {
            return;
        }

        if let Some(aim) = intent.aim.try_normalize() {
            self.aim = aim;
        }
        self.motor.look_toward(self.aim);

        let delta = self.motor.tick(dt, intent.move_dir, intent.dash_pressed);
        if delta == Vec2::ZERO {
            self.body.halt();
        } else {
            self.body.move_by(delta);
        }

        self.actor.tick(dt);
        if intent.attack_pressed {
            self.actor.try_attack();
        }
        if intent.charge_started {
            self.actor.start_charge();
        }
        if intent.charge_released {
            self.actor.release_charge();
        }
    }

    /// Resolves pending strikes against `world`.
    pub fn resolve(&mut self, world: &mut CombatWorld<'_>) -> Vec<StrikeReport> {
        if self.is_dead() {
            self.actor.cancel();
            return Vec::new();
        }

        let reports = self.actor.resolve(self.position(), self.aim, world);
        for report in &reports {
            self.sink.notify(CombatNotification::AttackResolved {
                attacker: self.id,
                hit: report.hit(),
                armored: report.armored,
            });
            for &projectile in &report.parried {
                self.sink.notify(CombatNotification::Parried {
                    by: self.id,
                    projectile,
                });
            }
        }
        reports
    }
}

impl Damageable for PlayerAvatar {
    fn apply_damage(&mut self, amount: i32, now: f32) -> DamageResult {
        let source = self.position();
        self.apply_damage_from(amount, source, now)
    }

    fn apply_damage_from(&mut self, amount: i32, source_position: Vec2, now: f32) -> DamageResult {
        let before = self.health.current();
        let result = self.health.apply_damage(amount, now);
        if result.applied {
            self.sink.notify(CombatNotification::Damaged {
                entity: self.id,
                amount: before - self.health.current(),
                remaining: self.health.current(),
                source: source_position,
            });
        }
        if result.killed {
            self.motor.cancel();
            self.actor.cancel();
            self.body.halt();
            info!(player = %self.id, "player died");
            self.sink.notify(CombatNotification::Death { entity: self.id });
        }
        result
    }

    fn is_dead(&self) -> bool {
        self.health.is_dead()
    }
}

impl Hittable for PlayerAvatar {
    fn entity_id(&self) -> EntityId {
        self.id
    }

    fn collider(&self) -> Option<Collider> {
        if self.is_dead() {
            return None;
        }
        Some(Collider::body(
            self.id,
            PlacedShape::circle(self.position(), self.body_radius),
            layers::PLAYER,
        ))
    }
}

/// A living player is the boss's target.
impl TargetProvider for PlayerAvatar {
    fn target(&self) -> Option<Target> {
        (!self.is_dead()).then(|| Target::new(self.id, self.position()))
    }
}

impl std::fmt::Debug for PlayerAvatar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerAvatar")
            .field("id", &self.id)
            .field("position", &self.position())
            .field("health", &self.health.current())
            .field("aim", &self.aim)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projectile::ProjectileSystem;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<CombatNotification>>>);

    impl PresentationSink for Recorder {
        fn notify(&mut self, notification: CombatNotification) {
            self.0.lock().unwrap().push(notification);
        }
    }

    impl Recorder {
        fn take(&self) -> Vec<CombatNotification> {
            std::mem::take(&mut *self.0.lock().unwrap())
        }
    }

    fn player(recorder: &Recorder) -> PlayerAvatar {
        PlayerAvatar::new(&PlayerConfig::default(), Vec2::ZERO, Box::new(recorder.clone()))
    }

    #[test]
    fn test_walks_with_intent() {
        let recorder = Recorder::default();
        let mut p = player(&recorder);
        p.tick(0.5, &PlayerIntent::moving(Vec2::X));
        assert!((p.position() - Vec2::new(2.5, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_damage_notifies_and_death_disables_collider() {
        let recorder = Recorder::default();
        let mut p = player(&recorder);

        let result = p.apply_damage_from(30, Vec2::X, 0.0);
        assert!(result.applied);
        assert!(matches!(
            recorder.take().as_slice(),
            [CombatNotification::Damaged { amount: 30, remaining: 70, .. }]
        ));

        p.apply_damage_from(500, Vec2::X, 1.0);
        let events = recorder.take();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], CombatNotification::Death { .. }));
        assert!(p.collider().is_none());
        assert!(p.target().is_none());

        // Dead bodies stay silent.
        p.apply_damage_from(5, Vec2::X, 2.0);
        assert!(recorder.take().is_empty());
    }

    #[test]
    fn test_miss_still_reports_attack_resolved() {
        let recorder = Recorder::default();
        let mut p = player(&recorder);
        let mut projectiles = ProjectileSystem::new();

        p.tick(0.016, &PlayerIntent::default().with_aim(Vec2::X).with_attack());
        {
            let mut world = CombatWorld::new(&mut projectiles, 0.0);
            p.resolve(&mut world);
        }
        assert_eq!(
            recorder.take(),
            vec![CombatNotification::AttackResolved {
                attacker: p.id(),
                hit: false,
                armored: false,
            }]
        );
    }

    #[test]
    fn test_parry_is_reported() {
        let recorder = Recorder::default();
        let mut p = player(&recorder);
        let mut projectiles = ProjectileSystem::new();
        let bullet = projectiles.spawn(Vec2::new(0.7, 0.0), Vec2::NEG_X, 7.0, 8);

        p.tick(0.016, &PlayerIntent::default().with_aim(Vec2::X).with_attack());
        {
            let mut world = CombatWorld::new(&mut projectiles, 0.0);
            p.resolve(&mut world);
        }
        let events = recorder.take();
        assert!(events.contains(&CombatNotification::Parried {
            by: p.id(),
            projectile: bullet,
        }));
        assert!(!projectiles.is_active(bullet));
    }
}
