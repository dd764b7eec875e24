//! Kinematic projectiles.
//!
//! Bullets travel in a straight line at constant speed, expire after a
//! fixed lifetime, and damage the first body on their hit mask they touch.
//! A parry destroys a bullet outright and always wins over its damage path.
//!
//! # Example
//!
//! ```
//! use bossroom_combat::projectile::ProjectileSystem;
//! use bossroom_common::Vec2;
//!
//! let mut system = ProjectileSystem::new();
//! let id = system.spawn(Vec2::ZERO, Vec2::X, 7.0, 8);
//! system.advance(1.0 / 60.0);
//! assert!(system.is_active(id));
//! ```

use std::collections::BTreeMap;
use std::fmt;

use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

use bossroom_common::{EntityId, PlacedShape, Vec2};

use crate::health::{DamageResult, Damageable};
use crate::hit_resolver::{layers, Collider, Hittable};

/// Default bullet lifetime in seconds.
pub const DEFAULT_LIFETIME: f32 = 6.0;

/// Default bullet collision radius.
pub const DEFAULT_RADIUS: f32 = 0.15;

/// Slowest a projectile may travel.
pub const MIN_SPEED: f32 = 0.01;

/// Identifier of a spawned projectile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectileId(u64);

impl ProjectileId {
    /// Creates an id from a raw value.
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProjectileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "projectile#{}", self.0)
    }
}

/// Projectile state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProjectileState {
    /// In flight.
    #[default]
    Active,
    /// Lifetime ran out.
    Expired,
    /// Destroyed after hitting a target.
    Spent,
    /// Destroyed by a parry.
    Parried,
}

impl ProjectileState {
    /// Whether the projectile is still in flight.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// A single projectile.
#[derive(Debug, Clone)]
pub struct Projectile {
    /// Assigned on spawn.
    pub id: ProjectileId,
    /// Entity that fired it.
    pub owner: Option<EntityId>,
    /// World position.
    pub position: Vec2,
    /// Unit travel direction.
    pub direction: Vec2,
    /// Units per second.
    pub speed: f32,
    /// Damage dealt on hit.
    pub damage: i32,
    /// Seconds left before expiry.
    pub remaining_life: f32,
    /// Collision radius.
    pub radius: f32,
    /// Layer the projectile itself sits on.
    pub layer: layers::Flags,
    /// Layers the projectile can damage.
    pub hittable_layers: layers::Flags,
    /// Destroy after the first hit.
    pub destroy_on_hit: bool,
    /// Current state.
    pub state: ProjectileState,
    /// Bodies already hit (for projectiles that pass through).
    hit_bodies: AHashSet<EntityId>,
}

impl Default for Projectile {
    fn default() -> Self {
        Self {
            id: ProjectileId(0),
            owner: None,
            position: Vec2::ZERO,
            direction: Vec2::X,
            speed: 6.0,
            damage: 8,
            remaining_life: DEFAULT_LIFETIME,
            radius: DEFAULT_RADIUS,
            layer: layers::BOSS_PROJECTILE,
            hittable_layers: layers::PLAYER,
            destroy_on_hit: true,
            state: ProjectileState::Active,
            hit_bodies: AHashSet::new(),
        }
    }
}

impl Projectile {
    /// Creates a projectile. A zero direction falls back to +x; speed and
    /// damage are clamped.
    #[must_use]
    pub fn new(origin: Vec2, direction: Vec2, speed: f32, damage: i32) -> Self {
        let direction = direction.try_normalize().unwrap_or(Vec2::X);
        Self {
            position: origin,
            direction,
            speed: speed.max(MIN_SPEED),
            damage: damage.max(0),
            ..Self::default()
        }
    }

    /// Set the firing entity.
    #[must_use]
    pub fn with_owner(mut self, owner: EntityId) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Set the lifetime in seconds.
    #[must_use]
    pub fn with_lifetime(mut self, seconds: f32) -> Self {
        self.remaining_life = seconds.max(0.0);
        self
    }

    /// Set the collision radius.
    #[must_use]
    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius.max(0.0);
        self
    }

    /// Set the projectile's own layer.
    #[must_use]
    pub fn with_layer(mut self, layer: layers::Flags) -> Self {
        self.layer = layer;
        self
    }

    /// Set the layers it can damage.
    #[must_use]
    pub fn with_hittable_layers(mut self, mask: layers::Flags) -> Self {
        self.hittable_layers = mask;
        self
    }

    /// Set whether the first hit destroys it.
    #[must_use]
    pub fn with_destroy_on_hit(mut self, destroy: bool) -> Self {
        self.destroy_on_hit = destroy;
        self
    }

    /// Check if in flight.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Velocity vector.
    #[must_use]
    pub fn velocity(&self) -> Vec2 {
        self.direction * self.speed
    }

    /// Advance one tick.
    pub fn update(&mut self, dt: f32) {
        if !self.is_active() {
            return;
        }
        self.position += self.velocity() * dt;
        self.remaining_life -= dt;
        if self.remaining_life <= 0.0 {
            self.state = ProjectileState::Expired;
        }
    }

    /// Collision area.
    #[must_use]
    pub fn area(&self) -> PlacedShape {
        PlacedShape::circle(self.position, self.radius)
    }

    /// Collider for queries; `None` once destroyed.
    #[must_use]
    pub fn collider(&self) -> Option<Collider> {
        self.is_active().then(|| {
            Collider::projectile(
                self.id,
                self.owner.unwrap_or(EntityId::NULL),
                self.area(),
                self.layer,
            )
        })
    }

    /// Destroy by parry. Unconditional while in flight.
    pub fn parry(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.state = ProjectileState::Parried;
        true
    }
}

/// Projectiles only take damage as a parry: any hit destroys them.
impl Damageable for Projectile {
    fn apply_damage(&mut self, _amount: i32, _now: f32) -> DamageResult {
        if self.parry() {
            DamageResult {
                applied: true,
                killed: true,
            }
        } else {
            DamageResult::NONE
        }
    }

    fn is_dead(&self) -> bool {
        !self.is_active()
    }
}

/// A projectile that struck a body.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectileHit {
    /// Projectile that hit.
    pub projectile: ProjectileId,
    /// Body that was struck.
    pub target: EntityId,
    /// Damage dispatched.
    pub damage: i32,
    /// What the body reported.
    pub result: DamageResult,
    /// Whether the projectile was destroyed by the hit.
    pub destroyed: bool,
}

/// Owns every projectile in flight.
#[derive(Debug)]
pub struct ProjectileSystem {
    projectiles: BTreeMap<ProjectileId, Projectile>,
    next_id: u64,
    spawned: u64,
}

impl Default for ProjectileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectileSystem {
    /// Create an empty system.
    #[must_use]
    pub fn new() -> Self {
        Self {
            projectiles: BTreeMap::new(),
            next_id: 1,
            spawned: 0,
        }
    }

    /// Spawn a default bullet.
    pub fn spawn(
        &mut self,
        origin: Vec2,
        direction: Vec2,
        speed: f32,
        damage: i32,
    ) -> ProjectileId {
        self.spawn_projectile(Projectile::new(origin, direction, speed, damage))
    }

    /// Spawn a configured projectile.
    pub fn spawn_projectile(&mut self, mut projectile: Projectile) -> ProjectileId {
        let id = ProjectileId(self.next_id);
        self.next_id += 1;
        self.spawned += 1;
        projectile.id = id;
        self.projectiles.insert(id, projectile);
        id
    }

    /// Get a projectile by id.
    #[must_use]
    pub fn get(&self, id: ProjectileId) -> Option<&Projectile> {
        self.projectiles.get(&id)
    }

    /// Whether `id` is still in flight.
    #[must_use]
    pub fn is_active(&self, id: ProjectileId) -> bool {
        self.get(id).is_some_and(Projectile::is_active)
    }

    /// Move every projectile and expire old ones. Returns expired ids.
    pub fn advance(&mut self, dt: f32) -> Vec<ProjectileId> {
        let mut expired = Vec::new();
        for projectile in self.projectiles.values_mut() {
            if !projectile.is_active() {
                continue;
            }
            projectile.update(dt);
            if projectile.state == ProjectileState::Expired {
                expired.push(projectile.id);
            }
        }
        expired
    }

    /// Parry a projectile. Returns false if it was not in flight.
    pub fn parry(&mut self, id: ProjectileId) -> bool {
        let parried = self.projectiles.get_mut(&id).is_some_and(Projectile::parry);
        if parried {
            debug!("{id} parried");
        }
        parried
    }

    /// Resolve projectile-vs-body overlaps.
    ///
    /// Each active projectile damages the first body on its hit mask that it
    /// overlaps, skipping its shooter and bodies it already hit. Projectiles
    /// destroyed earlier in the tick (for example by a parry) are skipped.
    pub fn resolve_hits(
        &mut self,
        bodies: &mut [&mut dyn Hittable],
        now: f32,
    ) -> Vec<ProjectileHit> {
        let mut hits = Vec::new();

        for projectile in self.projectiles.values_mut() {
            if !projectile.is_active() {
                continue;
            }
            let area = projectile.area();

            for body in bodies.iter_mut() {
                let Some(collider) = body.collider() else {
                    continue;
                };
                if collider.layer & projectile.hittable_layers == 0 {
                    continue;
                }
                if projectile.owner == Some(collider.root) {
                    continue;
                }
                let target = body.entity_id();
                if projectile.hit_bodies.contains(&target) || !area.overlaps(&collider.area) {
                    continue;
                }

                let result = body.apply_damage_from(projectile.damage, projectile.position, now);
                projectile.hit_bodies.insert(target);
                if projectile.destroy_on_hit {
                    projectile.state = ProjectileState::Spent;
                }
                hits.push(ProjectileHit {
                    projectile: projectile.id,
                    target,
                    damage: projectile.damage,
                    result,
                    destroyed: projectile.destroy_on_hit,
                });
                break;
            }
        }

        hits
    }

    /// Colliders of every projectile in flight.
    pub fn colliders(&self) -> impl Iterator<Item = Collider> + '_ {
        self.projectiles.values().filter_map(Projectile::collider)
    }

    /// Remove destroyed projectiles. Returns how many were removed.
    pub fn sweep(&mut self) -> usize {
        let before = self.projectiles.len();
        self.projectiles.retain(|_, p| p.is_active());
        before - self.projectiles.len()
    }

    /// Get count of projectiles in flight.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.projectiles.values().filter(|p| p.is_active()).count()
    }

    /// Total projectiles ever spawned.
    #[must_use]
    pub fn spawned_total(&self) -> u64 {
        self.spawned
    }

    /// Iterate over projectiles in spawn order.
    pub fn iter(&self) -> impl Iterator<Item = &Projectile> {
        self.projectiles.values()
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.projectiles.clear();
    }
}
