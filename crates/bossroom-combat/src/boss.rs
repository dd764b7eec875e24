//! Boss behavior state machine.
//!
//! Each tick the boss picks one of:
//! - degrade to [`BossState::Idle`] when there is no target
//! - keep attacking or keep firing until a resolve point or timeout ends it
//! - start a bullet hell (wins ties with a melee attack)
//! - start a melee attack
//! - chase or hold position
//!
//! Hitboxes and volleys run at resolve points. The timeline generates them
//! or the animation layer signals them through [`BossBehavior::signal`].
//! Either way they are only executed by [`BossBehavior::resolve`], after
//! every tick has finished moving.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use bossroom_common::{EntityId, PlacedShape, Vec2};

use crate::bullet_pattern::{BulletSpawn, BulletSpawner, BulletSpawnerConfig, HellPattern};
use crate::events::CombatNotification;
use crate::health::{DamageResult, Damageable, HealthConfig, HealthPool};
use crate::hit_resolver::{
    layers, AttackSwing, Collider, ColliderOwner, HitQuery, HitResolver, Hittable,
};
use crate::ports::{
    AnimState, AnimationSignal, MovementActuator, PresentationSink, Target, TargetProvider,
};
use crate::projectile::ProjectileId;
use crate::world::CombatWorld;

/// Slack for comparing accumulated timers against configured durations.
pub const TIMER_EPSILON: f32 = 1e-4;

/// Cooldown value that keeps a dead boss from ever re-triggering.
pub const DEAD_COOLDOWN: f32 = 999.0;

// ============================================================================
// Configuration
// ============================================================================

/// Seconds after state entry at which resolve points fire by themselves.
///
/// `None` leaves a point to the animation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveTimeline {
    /// Melee hitbox.
    pub attack_hit: Option<f32>,
    /// End of the melee swing.
    pub attack_end: Option<f32>,
    /// Bullet hell volley.
    pub hell_burst: Option<f32>,
    /// End of the bullet hell.
    pub hell_end: Option<f32>,
}

impl Default for ResolveTimeline {
    fn default() -> Self {
        Self {
            attack_hit: Some(0.4),
            attack_end: Some(0.8),
            hell_burst: Some(0.3),
            hell_end: Some(1.5),
        }
    }
}

impl ResolveTimeline {
    /// No generated points. Everything comes from [`BossBehavior::signal`].
    #[must_use]
    pub const fn external() -> Self {
        Self {
            attack_hit: None,
            attack_end: None,
            hell_burst: None,
            hell_end: None,
        }
    }

    /// Clamp values to valid ranges.
    pub fn validate(&mut self) {
        for at in [
            &mut self.attack_hit,
            &mut self.attack_end,
            &mut self.hell_burst,
            &mut self.hell_end,
        ]
        .into_iter()
        .flatten()
        {
            *at = at.clamp(0.0, 60.0);
        }
    }

    fn points_for(&self, state: BossState) -> [(ResolvePoint, Option<f32>); 2] {
        match state {
            BossState::BulletHell => [
                (ResolvePoint::HellFireBurst, self.hell_burst),
                (ResolvePoint::HellEnd, self.hell_end),
            ],
            _ => [
                (ResolvePoint::AttackHit, self.attack_hit),
                (ResolvePoint::AttackEnd, self.attack_end),
            ],
        }
    }
}

/// Boss tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BossConfig {
    // === Movement ===
    /// Chase speed (units per second).
    pub move_speed: f32,
    /// Hold position inside this distance.
    pub stop_distance: f32,
    /// Seconds between chase direction updates.
    pub repath_interval: f32,

    // === Melee ===
    /// Melee trigger distance.
    pub attack_range: f32,
    /// Seconds between melee attacks.
    pub attack_cooldown: f32,
    /// Melee damage.
    pub melee_damage: i32,
    /// Safety timeout for a swing (seconds).
    pub max_attack_duration: f32,
    /// Full size of the melee hitbox.
    pub hitbox_size: Vec2,
    /// Hitbox distance in front of the boss.
    pub forward_offset: f32,

    // === Bullet hell ===
    /// Seconds between bullet hells.
    pub hell_cooldown: f32,
    /// Delay before the first bullet hell.
    pub first_hell_delay: f32,
    /// Safety timeout for a bullet hell (seconds).
    pub max_hell_duration: f32,
    /// Only start a bullet hell near the target.
    pub hell_only_when_in_range: bool,
    /// Pattern fired at the volley point.
    pub hell_pattern: HellPattern,
    /// Bullet spawner.
    pub spawner: BulletSpawnerConfig,

    // === Facing ===
    /// Keep facing the target every tick.
    pub face_target_always: bool,
    /// Freeze facing while attacking or firing.
    pub lock_facing_during_attack: bool,
    /// Horizontal distance under which facing does not flip.
    pub flip_dead_zone: f32,

    // === Body ===
    /// Health pool.
    pub health: HealthConfig,
    /// Body collider radius.
    pub body_radius: f32,
    /// Armored bodies change hit feedback.
    pub armored: bool,
    /// Seconds spent dying before dead.
    pub dying_duration: f32,

    // === Resolve points ===
    /// Generated resolve points.
    pub timeline: ResolveTimeline,
}

impl Default for BossConfig {
    fn default() -> Self {
        Self {
            move_speed: 3.0,
            stop_distance: 1.3,
            repath_interval: 0.05,
            attack_range: 1.8,
            attack_cooldown: 1.0,
            melee_damage: 12,
            max_attack_duration: 1.2,
            hitbox_size: Vec2::new(1.4, 0.6),
            forward_offset: 0.6,
            hell_cooldown: 10.0,
            first_hell_delay: 0.0,
            max_hell_duration: 2.0,
            hell_only_when_in_range: false,
            hell_pattern: HellPattern::RadialBurst,
            spawner: BulletSpawnerConfig::default(),
            face_target_always: true,
            lock_facing_during_attack: true,
            flip_dead_zone: 0.02,
            health: HealthConfig::boss(),
            body_radius: 0.5,
            armored: false,
            dying_duration: 1.0,
            timeline: ResolveTimeline::default(),
        }
    }
}

impl BossConfig {
    /// Clamp values to valid ranges.
    pub fn validate(&mut self) {
        self.move_speed = self.move_speed.clamp(0.0, 100.0);
        self.stop_distance = self.stop_distance.max(0.0);
        self.repath_interval = self.repath_interval.clamp(0.0, 10.0);
        self.attack_range = self.attack_range.max(0.0);
        self.attack_cooldown = self.attack_cooldown.clamp(0.0, 60.0);
        self.melee_damage = self.melee_damage.max(0);
        self.max_attack_duration = self.max_attack_duration.clamp(0.01, 60.0);
        self.hitbox_size = self.hitbox_size.max(Vec2::ZERO);
        self.forward_offset = self.forward_offset.max(0.0);
        self.hell_cooldown = self.hell_cooldown.clamp(0.0, 600.0);
        self.first_hell_delay = self.first_hell_delay.clamp(0.0, 600.0);
        self.max_hell_duration = self.max_hell_duration.clamp(0.01, 60.0);
        self.flip_dead_zone = self.flip_dead_zone.max(0.0);
        self.body_radius = self.body_radius.clamp(0.05, 10.0);
        self.dying_duration = self.dying_duration.clamp(0.0, 30.0);
        self.spawner.validate();
        self.health.validate();
        self.timeline.validate();
    }
}

// ============================================================================
// State
// ============================================================================

/// What the boss is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BossState {
    /// No target, or close enough to hold position.
    #[default]
    Idle,
    /// Seeking the target.
    Chasing,
    /// Melee swing in progress.
    Attacking,
    /// Firing bullet patterns.
    BulletHell,
    /// Playing out death.
    Dying,
    /// Terminal.
    Dead,
}

impl BossState {
    /// Whether the boss has died.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Dying | Self::Dead)
    }

    /// Whether an attack or bullet hell is running.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        matches!(self, Self::Attacking | Self::BulletHell)
    }
}

/// Keyframes inside a swing or a bullet hell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolvePoint {
    /// Swing starts; forgets previous hits.
    AttackBegin,
    /// Melee hitbox runs.
    AttackHit,
    /// Swing ends.
    AttackEnd,
    /// Bullet hell starts; drops any leftover sequence.
    HellBegin,
    /// Volley fires.
    HellFireBurst,
    /// Bullet hell ends.
    HellEnd,
}

/// What a call to [`BossBehavior::resolve`] did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BossResolveReport {
    /// Points processed, in order.
    pub points: Vec<ResolvePoint>,
    /// Bodies the melee hitbox damaged.
    pub struck: Vec<EntityId>,
    /// Projectiles spawned.
    pub spawned: Vec<ProjectileId>,
}

// ============================================================================
// Behavior
// ============================================================================

/// The boss.
pub struct BossBehavior {
    id: EntityId,
    config: BossConfig,
    health: HealthPool,
    actuator: Box<dyn MovementActuator>,
    sink: Box<dyn PresentationSink>,
    animation: Option<Box<dyn AnimationSignal>>,
    spawner: BulletSpawner,
    swing: AttackSwing,
    pending: VecDeque<ResolvePoint>,
    state: BossState,
    state_timer: f32,
    fired: [bool; 2],
    anim_seen: bool,
    attack_cooldown: f32,
    hell_cooldown: f32,
    repath_timer: f32,
    move_dir: Vec2,
    facing: f32,
    last_target: Option<Target>,
    dying_timer: f32,
}

impl BossBehavior {
    /// Creates a boss driven through `actuator`, reporting to `sink`.
    #[must_use]
    pub fn new(
        config: BossConfig,
        actuator: Box<dyn MovementActuator>,
        sink: Box<dyn PresentationSink>,
    ) -> Self {
        Self {
            id: EntityId::new(),
            health: HealthPool::from_config(&config.health),
            spawner: BulletSpawner::new(config.spawner.clone()),
            hell_cooldown: config.first_hell_delay,
            config,
            actuator,
            sink,
            animation: None,
            swing: AttackSwing::new(),
            pending: VecDeque::new(),
            state: BossState::Idle,
            state_timer: 0.0,
            fired: [false; 2],
            anim_seen: false,
            attack_cooldown: 0.0,
            repath_timer: 0.0,
            move_dir: Vec2::ZERO,
            facing: 1.0,
            last_target: None,
            dying_timer: 0.0,
        }
    }

    /// Attaches an animation signal used as a fallback exit.
    #[must_use]
    pub fn with_animation(mut self, animation: Box<dyn AnimationSignal>) -> Self {
        self.animation = Some(animation);
        self
    }

    /// Entity id.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Boss tuning.
    #[must_use]
    pub fn config(&self) -> &BossConfig {
        &self.config
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> BossState {
        self.state
    }

    /// Seconds since the current attack or bullet hell started.
    #[must_use]
    pub fn state_timer(&self) -> f32 {
        self.state_timer
    }

    /// World position.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.actuator.position()
    }

    /// Horizontal facing sign (+1 right, -1 left).
    #[must_use]
    pub fn facing(&self) -> f32 {
        self.facing
    }

    /// Health pool.
    #[must_use]
    pub fn health(&self) -> &HealthPool {
        &self.health
    }

    /// Melee cooldown remaining.
    #[must_use]
    pub fn attack_cooldown(&self) -> f32 {
        self.attack_cooldown
    }

    /// Bullet hell cooldown remaining.
    #[must_use]
    pub fn hell_cooldown(&self) -> f32 {
        self.hell_cooldown
    }

    /// Bullet spawner.
    #[must_use]
    pub fn spawner(&self) -> &BulletSpawner {
        &self.spawner
    }

    /// Resolve points waiting for [`BossBehavior::resolve`].
    #[must_use]
    pub fn pending_points(&self) -> usize {
        self.pending.len()
    }

    /// Swings started so far.
    #[must_use]
    pub fn swing_count(&self) -> u64 {
        self.swing.swing_count()
    }

    /// Queues a resolve point signaled from outside.
    pub fn signal(&mut self, point: ResolvePoint) {
        if self.state.is_terminal() {
            return;
        }
        self.pending.push_back(point);
    }

    // ------------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------------

    /// Advances timers and picks what to do this tick.
    pub fn tick(&mut self, dt: f32, targets: &dyn TargetProvider) {
        let dt = dt.max(0.0);
        match self.state {
            BossState::Dead => return,
            BossState::Dying => {
                self.dying_timer += dt;
                if self.dying_timer + TIMER_EPSILON >= self.config.dying_duration {
                    self.state = BossState::Dead;
                    info!(boss = %self.id, "boss dead");
                }
                return;
            },
            _ => {},
        }

        self.spawner.advance(dt);

        let Some(target) = targets.target() else {
            self.degrade_to_idle();
            return;
        };
        self.last_target = Some(target);

        if self.attack_cooldown > 0.0 {
            self.attack_cooldown = (self.attack_cooldown - dt).max(0.0);
        }
        if self.hell_cooldown > 0.0 {
            self.hell_cooldown = (self.hell_cooldown - dt).max(0.0);
        }

        let to_target = target.position - self.position();
        let distance = to_target.length();

        self.repath_timer -= dt;
        if self.repath_timer <= 0.0 {
            self.repath_timer = self.config.repath_interval;
            self.move_dir = to_target.normalize_or_zero();
        }

        let locked = self.config.lock_facing_during_attack && self.state.is_busy();
        if self.config.face_target_always && !locked {
            self.face(to_target);
        }

        match self.state {
            BossState::Attacking => {
                self.advance_busy(dt, AnimState::Attack, self.config.max_attack_duration);
                return;
            },
            BossState::BulletHell => {
                self.advance_busy(dt, AnimState::BulletHell, self.config.max_hell_duration);
                return;
            },
            _ => {},
        }

        let hell_ready = self.hell_cooldown <= 0.0
            && (!self.config.hell_only_when_in_range
                || distance <= self.config.attack_range * 1.2);
        if hell_ready {
            self.start_hell(to_target);
            return;
        }

        if distance <= self.config.attack_range && self.attack_cooldown <= 0.0 {
            self.start_attack(to_target);
            return;
        }

        if distance > self.config.stop_distance {
            self.actuator.move_by(self.move_dir * self.config.move_speed * dt);
            self.state = BossState::Chasing;
        } else {
            self.actuator.halt();
            self.state = BossState::Idle;
        }
    }

    fn advance_busy(&mut self, dt: f32, clip: AnimState, max_duration: f32) {
        self.state_timer += dt;
        self.actuator.halt();

        let points = self.config.timeline.points_for(self.state);
        for (slot, (point, at)) in points.into_iter().enumerate() {
            let Some(at) = at else {
                continue;
            };
            if !self.fired[slot] && self.state_timer + TIMER_EPSILON >= at {
                self.fired[slot] = true;
                self.pending.push_back(point);
            }
        }

        let timed_out = self.state_timer + TIMER_EPSILON >= max_duration;
        if timed_out || self.clip_finished(clip) {
            if timed_out {
                debug!(boss = %self.id, state = ?self.state, "safety timeout");
            }
            self.leave_busy();
        }
    }

    /// Whether the clip for the current state played and has now left.
    fn clip_finished(&mut self, clip: AnimState) -> bool {
        let Some(animation) = &self.animation else {
            return false;
        };
        if animation.is_in_state(clip) {
            self.anim_seen = true;
            return false;
        }
        self.anim_seen && !animation.is_transitioning()
    }

    fn enter_busy(&mut self, state: BossState, to_target: Vec2) {
        self.state = state;
        self.state_timer = 0.0;
        self.fired = [false; 2];
        self.anim_seen = false;
        self.actuator.halt();
        self.face(to_target);
    }

    fn start_attack(&mut self, to_target: Vec2) {
        self.enter_busy(BossState::Attacking, to_target);
        self.attack_cooldown = self.config.attack_cooldown;
        self.swing.begin();
        debug!(boss = %self.id, "attack started");
    }

    fn start_hell(&mut self, to_target: Vec2) {
        // Waves left over from the previous hell end here.
        self.spawner.cancel();
        self.enter_busy(BossState::BulletHell, to_target);
        self.hell_cooldown = self.config.hell_cooldown;
        debug!(boss = %self.id, pattern = ?self.config.hell_pattern, "bullet hell started");
    }

    fn leave_busy(&mut self) {
        self.state = BossState::Chasing;
        self.state_timer = 0.0;
    }

    fn degrade_to_idle(&mut self) {
        if self.state != BossState::Idle {
            debug!(boss = %self.id, from = ?self.state, "target lost");
        }
        self.state = BossState::Idle;
        self.state_timer = 0.0;
        self.last_target = None;
        self.move_dir = Vec2::ZERO;
        self.pending.clear();
        self.spawner.cancel();
        self.actuator.halt();
    }

    fn face(&mut self, to_target: Vec2) {
        if to_target.x.abs() > self.config.flip_dead_zone {
            self.facing = to_target.x.signum();
        }
    }

    // ------------------------------------------------------------------------
    // Resolve points
    // ------------------------------------------------------------------------

    /// Executes queued resolve points and due sequence steps against `world`.
    pub fn resolve(&mut self, world: &mut CombatWorld<'_>) -> BossResolveReport {
        let mut report = BossResolveReport::default();
        if self.state.is_terminal() {
            self.pending.clear();
            return report;
        }

        while let Some(point) = self.pending.pop_front() {
            report.points.push(point);
            match point {
                ResolvePoint::AttackBegin => self.swing.begin(),
                ResolvePoint::AttackHit => {
                    if self.state == BossState::Attacking {
                        self.perform_hitbox(world, &mut report);
                    }
                },
                ResolvePoint::AttackEnd => {
                    if self.state == BossState::Attacking {
                        self.leave_busy();
                    }
                },
                ResolvePoint::HellBegin => {
                    self.spawner.cancel();
                },
                ResolvePoint::HellFireBurst => {
                    if self.state == BossState::BulletHell {
                        let aim = self.aim();
                        let spawns = self.spawner.fire(self.config.hell_pattern, aim);
                        self.spawn_all(&spawns, world, &mut report);
                    }
                },
                ResolvePoint::HellEnd => {
                    if self.state == BossState::BulletHell {
                        self.leave_busy();
                    }
                },
            }
        }

        let due = self.spawner.drain_due();
        self.spawn_all(&due, world, &mut report);
        report
    }

    fn aim(&self) -> Vec2 {
        self.last_target
            .and_then(|t| (t.position - self.position()).try_normalize())
            .unwrap_or(Vec2::new(self.facing, 0.0))
    }

    fn perform_hitbox(&mut self, world: &mut CombatWorld<'_>, report: &mut BossResolveReport) {
        let origin = self.position();
        let dir = self.aim();
        let center = origin + dir * self.config.forward_offset;
        let query = HitQuery::rect(center, self.config.hitbox_size, dir)
            .with_layers(layers::BOSS_MELEE)
            .excluding(self.id);

        let colliders = world.colliders();
        let hits = HitResolver::resolve_new(&query, &colliders, &mut self.swing);

        let mut hit = false;
        let mut armored = false;
        for resolved in hits {
            let ColliderOwner::Entity(target) = resolved.owner else {
                continue;
            };
            if world.damage(target, self.config.melee_damage, origin).is_some() {
                hit = true;
                armored |= resolved.armored;
                report.struck.push(target);
            }
        }

        debug!(boss = %self.id, hit, "hitbox resolved");
        self.sink.notify(CombatNotification::AttackResolved {
            attacker: self.id,
            hit,
            armored,
        });
    }

    fn spawn_all(
        &self,
        spawns: &[BulletSpawn],
        world: &mut CombatWorld<'_>,
        report: &mut BossResolveReport,
    ) {
        if spawns.is_empty() {
            return;
        }
        let center = self.position();
        for spawn in spawns {
            let projectile = self.spawner.projectile(spawn, center, self.id);
            report.spawned.push(world.spawn(projectile));
        }
        debug!(boss = %self.id, count = spawns.len(), "volley fired");
    }

    // ------------------------------------------------------------------------
    // Death
    // ------------------------------------------------------------------------

    /// Enters [`BossState::Dying`] if health ran out. Returns true only on
    /// the call that performs the transition.
    pub fn check_death(&mut self) -> bool {
        if !self.health.is_dead() || self.state.is_terminal() {
            return false;
        }

        self.state = BossState::Dying;
        self.dying_timer = 0.0;
        self.state_timer = 0.0;
        self.attack_cooldown = DEAD_COOLDOWN;
        self.hell_cooldown = DEAD_COOLDOWN;
        self.move_dir = Vec2::ZERO;
        self.actuator.halt();
        self.spawner.set_enabled(false);
        self.pending.clear();
        self.swing.clear();
        info!(boss = %self.id, "boss dying");
        true
    }
}

impl Damageable for BossBehavior {
    fn apply_damage(&mut self, amount: i32, now: f32) -> DamageResult {
        let source = self.position();
        self.apply_damage_from(amount, source, now)
    }

    fn apply_damage_from(&mut self, amount: i32, source_position: Vec2, now: f32) -> DamageResult {
        if self.state.is_terminal() {
            return DamageResult::NONE;
        }
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
            self.sink.notify(CombatNotification::Death { entity: self.id });
        }
        result
    }

    fn is_dead(&self) -> bool {
        self.health.is_dead()
    }
}

impl Hittable for BossBehavior {
    fn entity_id(&self) -> EntityId {
        self.id
    }

    fn collider(&self) -> Option<Collider> {
        if self.state.is_terminal() || self.health.is_dead() {
            return None;
        }
        Some(
            Collider::body(
                self.id,
                PlacedShape::circle(self.position(), self.config.body_radius),
                layers::BOSS,
            )
            .with_armored(self.config.armored),
        )
    }
}

impl std::fmt::Debug for BossBehavior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BossBehavior")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("position", &self.position())
            .field("health", &self.health.current())
            .field("attack_cooldown", &self.attack_cooldown)
            .field("hell_cooldown", &self.hell_cooldown)
            .finish_non_exhaustive()
    }
}
