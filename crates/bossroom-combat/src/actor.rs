//! Player melee and parry.
//!
//! A [`CombatActor`] owns cooldowns and a queue of pending strikes. Each
//! strike runs one hit query with a frontal arc. Entities it touches take
//! damage, and projectiles it touches are parried instead. The parry branch
//! always wins for projectile colliders.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use bossroom_common::{EntityId, Vec2};

use crate::health::DamageResult;
use crate::hit_resolver::{layers, AttackSwing, ColliderOwner, HitQuery, HitResolver};
use crate::projectile::ProjectileId;
use crate::world::CombatWorld;

/// Melee tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeleeConfig {
    // === Cooldowns ===
    /// Cooldown after a normal attack (seconds).
    pub normal_cooldown: f32,
    /// Cooldown after a released sweep (seconds).
    pub sweep_cooldown: f32,

    // === Hit area ===
    /// Radius of the strike circle.
    pub hit_radius: f32,
    /// Distance from the body to the strike circle's center.
    pub forward_offset: f32,
    /// Only hit targets in front.
    pub front_only: bool,
    /// Full frontal arc (degrees) when `front_only` is set.
    pub frontal_arc: f32,
    /// Layers a strike can touch.
    pub hittable_layers: layers::Flags,

    // === Damage ===
    /// Normal attack damage.
    pub normal_damage: i32,
    /// First sweep stage damage.
    pub sweep_first_damage: i32,
    /// Second sweep stage damage.
    pub sweep_second_damage: i32,
    /// Sweep finisher damage.
    pub sweep_finisher_damage: i32,

    // === Resolve points ===
    /// Strike as soon as a normal attack starts.
    pub auto_hit_on_normal: bool,
    /// Strike the finisher as soon as a sweep is released.
    pub auto_hit_on_sweep: bool,
}

impl Default for MeleeConfig {
    fn default() -> Self {
        Self {
            normal_cooldown: 0.5,
            sweep_cooldown: 1.0,
            hit_radius: 0.9,
            forward_offset: 0.5,
            front_only: true,
            frontal_arc: 120.0,
            hittable_layers: layers::PLAYER_MELEE,
            normal_damage: 12,
            sweep_first_damage: 8,
            sweep_second_damage: 12,
            sweep_finisher_damage: 18,
            auto_hit_on_normal: true,
            auto_hit_on_sweep: true,
        }
    }
}

impl MeleeConfig {
    /// Clamp values to valid ranges.
    pub fn validate(&mut self) {
        self.normal_cooldown = self.normal_cooldown.clamp(0.0, 30.0);
        self.sweep_cooldown = self.sweep_cooldown.clamp(0.0, 30.0);
        self.hit_radius = self.hit_radius.clamp(0.0, 20.0);
        self.forward_offset = self.forward_offset.clamp(0.0, 20.0);
        self.frontal_arc = self.frontal_arc.clamp(0.0, 360.0);
        self.normal_damage = self.normal_damage.max(0);
        self.sweep_first_damage = self.sweep_first_damage.max(0);
        self.sweep_second_damage = self.sweep_second_damage.max(0);
        self.sweep_finisher_damage = self.sweep_finisher_damage.max(0);
    }
}

/// Which strike a resolve point belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrikeKind {
    /// Normal attack.
    Normal,
    /// First sweep stage.
    SweepFirst,
    /// Second sweep stage.
    SweepSecond,
    /// Sweep finisher.
    SweepFinisher,
}

impl StrikeKind {
    /// Damage this strike deals under `config`.
    #[must_use]
    pub fn damage(self, config: &MeleeConfig) -> i32 {
        match self {
            Self::Normal => config.normal_damage,
            Self::SweepFirst => config.sweep_first_damage,
            Self::SweepSecond => config.sweep_second_damage,
            Self::SweepFinisher => config.sweep_finisher_damage,
        }
    }
}

/// Result of one strike.
#[derive(Debug, Clone, PartialEq)]
pub struct StrikeReport {
    /// Strike that ran.
    pub kind: StrikeKind,
    /// Bodies struck and what they reported.
    pub damaged: Vec<(EntityId, DamageResult)>,
    /// Projectiles destroyed by parry.
    pub parried: Vec<ProjectileId>,
    /// Whether any struck target was armored.
    pub armored: bool,
}

impl StrikeReport {
    /// Whether the strike touched anything.
    #[must_use]
    pub fn hit(&self) -> bool {
        !self.damaged.is_empty() || !self.parried.is_empty()
    }
}

/// Melee/parry actor.
#[derive(Debug, Clone)]
pub struct CombatActor {
    owner: EntityId,
    config: MeleeConfig,
    cooldown: f32,
    charging: bool,
    swing: AttackSwing,
    pending: VecDeque<StrikeKind>,
}

impl CombatActor {
    /// Creates an actor for `owner`.
    #[must_use]
    pub fn new(owner: EntityId, config: MeleeConfig) -> Self {
        Self {
            owner,
            config,
            cooldown: 0.0,
            charging: false,
            swing: AttackSwing::new(),
            pending: VecDeque::new(),
        }
    }

    /// Entity this actor strikes for.
    #[must_use]
    pub fn owner(&self) -> EntityId {
        self.owner
    }

    /// Actor tuning.
    #[must_use]
    pub fn config(&self) -> &MeleeConfig {
        &self.config
    }

    /// Seconds until another attack may start.
    #[must_use]
    pub fn cooldown_remaining(&self) -> f32 {
        self.cooldown
    }

    /// Whether a sweep is being charged.
    #[must_use]
    pub fn is_charging(&self) -> bool {
        self.charging
    }

    /// Strikes waiting for the next resolve.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Swings resolved so far.
    #[must_use]
    pub fn swing_count(&self) -> u64 {
        self.swing.swing_count()
    }

    /// Advances cooldowns.
    pub fn tick(&mut self, dt: f32) {
        if self.cooldown > 0.0 {
            self.cooldown = (self.cooldown - dt.max(0.0)).max(0.0);
        }
    }

    fn ready(&self) -> bool {
        self.cooldown <= 0.0
    }

    /// Starts a normal attack if the cooldown allows. Charging does not block it.
    pub fn try_attack(&mut self) -> bool {
        if !self.ready() {
            return false;
        }
        self.cooldown = self.config.normal_cooldown;
        if self.config.auto_hit_on_normal {
            self.pending.push_back(StrikeKind::Normal);
        }
        true
    }

    /// Starts charging a sweep if the cooldown allows.
    pub fn start_charge(&mut self) -> bool {
        if !self.ready() {
            return false;
        }
        self.charging = true;
        true
    }

    /// Releases the sweep. Always ends the charge; the sweep itself only
    /// fires once the cooldown has run out.
    pub fn release_charge(&mut self) -> bool {
        self.charging = false;
        if !self.ready() {
            return false;
        }
        self.cooldown = self.config.sweep_cooldown;
        if self.config.auto_hit_on_sweep {
            self.pending.push_back(StrikeKind::SweepFinisher);
        }
        true
    }

    /// Queues an externally signaled strike.
    pub fn signal(&mut self, kind: StrikeKind) {
        self.pending.push_back(kind);
    }

    /// Drops pending strikes and any charge.
    pub fn cancel(&mut self) {
        self.pending.clear();
        self.charging = false;
    }

    /// Runs every pending strike from `position` toward `aim`.
    pub fn resolve(
        &mut self,
        position: Vec2,
        aim: Vec2,
        world: &mut CombatWorld<'_>,
    ) -> Vec<StrikeReport> {
        let mut reports = Vec::with_capacity(self.pending.len());
        while let Some(kind) = self.pending.pop_front() {
            reports.push(self.strike(kind, position, aim, world));
        }
        reports
    }

    fn strike(
        &mut self,
        kind: StrikeKind,
        position: Vec2,
        aim: Vec2,
        world: &mut CombatWorld<'_>,
    ) -> StrikeReport {
        // Every strike is its own swing.
        self.swing.begin();

        let forward = aim.normalize_or_zero();
        let center = position + forward * self.config.forward_offset;
        let mut query = HitQuery::circle(center, self.config.hit_radius, forward)
            .with_layers(self.config.hittable_layers)
            .excluding(self.owner);
        if self.config.front_only {
            query = query.with_frontal_arc(self.config.frontal_arc);
        }

        let colliders = world.colliders();
        let hits = HitResolver::resolve_new(&query, &colliders, &mut self.swing);
        let damage = kind.damage(&self.config);

        let mut report = StrikeReport {
            kind,
            damaged: Vec::new(),
            parried: Vec::new(),
            armored: false,
        };
        for hit in hits {
            report.armored |= hit.armored;
            match hit.owner {
                ColliderOwner::Projectile(id) => {
                    if world.parry(id) {
                        report.parried.push(id);
                    }
                },
                ColliderOwner::Entity(id) => {
                    if let Some(result) = world.damage(id, damage, position) {
                        report.damaged.push((id, result));
                    }
                },
            }
        }

        debug!(
            owner = %self.owner,
            ?kind,
            damaged = report.damaged.len(),
            parried = report.parried.len(),
            "strike resolved"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{Damageable, HealthPool};
    use crate::hit_resolver::{Collider, Hittable};
    use crate::projectile::ProjectileSystem;
    use bossroom_common::PlacedShape;

    struct Dummy {
        id: EntityId,
        center: Vec2,
        radius: f32,
        health: HealthPool,
        armored: bool,
        calls: u32,
    }

    impl Dummy {
        fn at(raw: u64, center: Vec2) -> Self {
            Self {
                id: EntityId::from_raw(raw),
                center,
                radius: 0.4,
                health: HealthPool::new(100, 0.0),
                armored: false,
                calls: 0,
            }
        }
    }

    impl Damageable for Dummy {
        fn apply_damage(&mut self, amount: i32, now: f32) -> DamageResult {
            self.calls += 1;
            self.health.apply_damage(amount, now)
        }

        fn is_dead(&self) -> bool {
            self.health.is_dead()
        }
    }

    impl Hittable for Dummy {
        fn entity_id(&self) -> EntityId {
            self.id
        }

        fn collider(&self) -> Option<Collider> {
            (!self.is_dead()).then(|| {
                Collider::body(self.id, PlacedShape::circle(self.center, self.radius), layers::BOSS)
                    .with_armored(self.armored)
            })
        }
    }

    fn actor() -> CombatActor {
        CombatActor::new(EntityId::from_raw(1), MeleeConfig::default())
    }

    #[test]
    fn test_normal_attack_hits_in_front() {
        let mut projectiles = ProjectileSystem::new();
        let mut boss = Dummy::at(2, Vec2::new(1.0, 0.0));
        let mut actor = actor();

        assert!(actor.try_attack());
        let reports = {
            let mut world = CombatWorld::new(&mut projectiles, 0.0).with_body(&mut boss);
            actor.resolve(Vec2::ZERO, Vec2::X, &mut world)
        };
        assert_eq!(reports.len(), 1);
        assert!(reports[0].hit());
        assert_eq!(boss.health.current(), 88);
    }

    #[test]
    fn test_target_behind_is_missed() {
        let mut projectiles = ProjectileSystem::new();
        let mut boss = Dummy::at(2, Vec2::new(-0.6, 0.0));
        let mut actor = actor();

        actor.try_attack();
        let reports = {
            let mut world = CombatWorld::new(&mut projectiles, 0.0).with_body(&mut boss);
            actor.resolve(Vec2::ZERO, Vec2::X, &mut world)
        };
        assert!(!reports[0].hit());
        assert_eq!(boss.calls, 0);
    }

    #[test]
    fn test_body_overlapping_wielder_but_behind_swing_is_missed() {
        // Boss pressed against the player's back, reaching past the origin.
        let mut projectiles = ProjectileSystem::new();
        let mut boss = Dummy::at(2, Vec2::new(-0.2, 0.0));
        boss.radius = 0.5;
        let mut actor = actor();

        actor.try_attack();
        let reports = {
            let mut world = CombatWorld::new(&mut projectiles, 0.0).with_body(&mut boss);
            actor.resolve(Vec2::ZERO, Vec2::X, &mut world)
        };
        assert!(!reports[0].hit());
        assert_eq!(boss.health.current(), 100);
    }

    #[test]
    fn test_cooldown_gates_attacks() {
        let mut actor = actor();
        assert!(actor.try_attack());
        assert!(!actor.try_attack());
        actor.tick(0.3);
        assert!(!actor.try_attack());
        actor.tick(0.3);
        assert!(actor.try_attack());
        assert_eq!(actor.pending_count(), 2);
    }

    #[test]
    fn test_parry_wins_over_damage() {
        let mut projectiles = ProjectileSystem::new();
        let bullet = projectiles.spawn_projectile(
            crate::projectile::Projectile::new(Vec2::new(0.8, 0.0), Vec2::NEG_X, 7.0, 8)
                .with_owner(EntityId::from_raw(2)),
        );
        let mut actor = actor();

        actor.try_attack();
        let reports = {
            let mut world = CombatWorld::new(&mut projectiles, 0.0);
            actor.resolve(Vec2::ZERO, Vec2::X, &mut world)
        };
        assert_eq!(reports[0].parried, vec![bullet]);
        assert!(reports[0].damaged.is_empty());
        assert!(!projectiles.is_active(bullet));
    }

    #[test]
    fn test_charged_sweep_releases_finisher() {
        let mut projectiles = ProjectileSystem::new();
        let mut boss = Dummy::at(2, Vec2::new(0.0, 1.0));
        let mut actor = actor();

        assert!(actor.start_charge());
        assert!(actor.is_charging());
        assert!(actor.release_charge());
        assert!(!actor.is_charging());
        assert!((actor.cooldown_remaining() - 1.0).abs() < f32::EPSILON);

        {
            let mut world = CombatWorld::new(&mut projectiles, 0.0).with_body(&mut boss);
            actor.resolve(Vec2::ZERO, Vec2::Y, &mut world);
        }
        assert_eq!(boss.health.current(), 82);
    }

    #[test]
    fn test_attack_allowed_while_charging() {
        let mut actor = actor();
        assert!(actor.start_charge());
        assert!(actor.try_attack());
        assert!(actor.is_charging());

        // The attack's cooldown swallows the release but still ends the charge.
        assert!(!actor.release_charge());
        assert!(!actor.is_charging());
        assert_eq!(actor.pending_count(), 1);
        assert!((actor.cooldown_remaining() - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_charge_gated_by_cooldown() {
        let mut actor = actor();
        actor.try_attack();
        assert!(!actor.start_charge());
        assert!(!actor.is_charging());

        actor.tick(0.5);
        assert!(actor.start_charge());
        actor.tick(0.2);
        assert!(actor.release_charge());
        assert_eq!(actor.pending_count(), 2);
    }

    #[test]
    fn test_release_fires_once_cooldown_is_clear() {
        let mut actor = actor();
        assert!(actor.release_charge());
        assert!(!actor.release_charge());
        actor.tick(1.0);
        assert!(actor.release_charge());
        assert_eq!(actor.pending_count(), 2);
    }

    #[test]
    fn test_each_signaled_stage_is_a_new_swing() {
        let mut projectiles = ProjectileSystem::new();
        let mut boss = Dummy::at(2, Vec2::new(1.0, 0.0));
        let config = MeleeConfig {
            auto_hit_on_sweep: false,
            ..MeleeConfig::default()
        };
        let mut actor = CombatActor::new(EntityId::from_raw(1), config);

        actor.signal(StrikeKind::SweepFirst);
        actor.signal(StrikeKind::SweepSecond);
        let reports = {
            let mut world = CombatWorld::new(&mut projectiles, 0.0).with_body(&mut boss);
            actor.resolve(Vec2::ZERO, Vec2::X, &mut world)
        };
        assert_eq!(reports.len(), 2);
        assert_eq!(boss.calls, 2);
        assert_eq!(boss.health.current(), 80);
        assert_eq!(actor.swing_count(), 2);
    }

    #[test]
    fn test_armored_target_reported() {
        let mut projectiles = ProjectileSystem::new();
        let mut boss = Dummy::at(2, Vec2::new(1.0, 0.0));
        boss.armored = true;
        let mut actor = actor();

        actor.try_attack();
        let reports = {
            let mut world = CombatWorld::new(&mut projectiles, 0.0).with_body(&mut boss);
            actor.resolve(Vec2::ZERO, Vec2::X, &mut world)
        };
        assert!(reports[0].armored);
    }
}
