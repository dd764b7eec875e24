//! Borrowed view of everything an attacker can touch during hit resolution.

use tracing::debug;

use bossroom_common::{EntityId, Vec2};

use crate::health::DamageResult;
use crate::hit_resolver::{Collider, Hittable};
use crate::projectile::{Projectile, ProjectileId, ProjectileSystem};

/// The other bodies and the projectile system, as seen by one attacker.
///
/// The attacker itself is never part of its own world, so it can mutate
/// itself while dispatching damage to everyone else.
pub struct CombatWorld<'a> {
    bodies: Vec<&'a mut dyn Hittable>,
    projectiles: &'a mut ProjectileSystem,
    now: f32,
}

impl<'a> CombatWorld<'a> {
    /// Creates a world around the projectile system at time `now`.
    pub fn new(projectiles: &'a mut ProjectileSystem, now: f32) -> Self {
        Self {
            bodies: Vec::new(),
            projectiles,
            now,
        }
    }

    /// Adds a body.
    #[must_use]
    pub fn with_body(mut self, body: &'a mut dyn Hittable) -> Self {
        self.bodies.push(body);
        self
    }

    /// Current simulation time.
    #[must_use]
    pub fn now(&self) -> f32 {
        self.now
    }

    /// Colliders of every enabled body and projectile in flight.
    #[must_use]
    pub fn colliders(&self) -> Vec<Collider> {
        self.bodies
            .iter()
            .filter_map(|b| b.collider())
            .chain(self.projectiles.colliders())
            .collect()
    }

    /// Dispatches damage to a body. Returns `None` if no such body exists.
    pub fn damage(&mut self, target: EntityId, amount: i32, source: Vec2) -> Option<DamageResult> {
        let now = self.now;
        let body = self.bodies.iter_mut().find(|b| b.entity_id() == target)?;
        let result = body.apply_damage_from(amount, source, now);
        debug!(%target, amount, applied = result.applied, "damage dispatched");
        Some(result)
    }

    /// Destroys a projectile by parry.
    pub fn parry(&mut self, id: ProjectileId) -> bool {
        self.projectiles.parry(id)
    }

    /// Spawns a projectile.
    pub fn spawn(&mut self, projectile: Projectile) -> ProjectileId {
        self.projectiles.spawn_projectile(projectile)
    }

    /// Read access to the projectile system.
    #[must_use]
    pub fn projectiles(&self) -> &ProjectileSystem {
        &*self.projectiles
    }
}

impl std::fmt::Debug for CombatWorld<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombatWorld")
            .field("bodies", &self.bodies.len())
            .field("projectiles", &self.projectiles.active_count())
            .field("now", &self.now)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{Damageable, HealthPool};
    use crate::hit_resolver::layers;
    use bossroom_common::PlacedShape;

    struct Body {
        id: EntityId,
        health: HealthPool,
        last_source: Option<Vec2>,
    }

    impl Damageable for Body {
        fn apply_damage(&mut self, amount: i32, now: f32) -> DamageResult {
            self.health.apply_damage(amount, now)
        }

        fn apply_damage_from(&mut self, amount: i32, source: Vec2, now: f32) -> DamageResult {
            self.last_source = Some(source);
            self.apply_damage(amount, now)
        }

        fn is_dead(&self) -> bool {
            self.health.is_dead()
        }
    }

    impl Hittable for Body {
        fn entity_id(&self) -> EntityId {
            self.id
        }

        fn collider(&self) -> Option<Collider> {
            (!self.is_dead()).then(|| {
                Collider::body(self.id, PlacedShape::circle(Vec2::ZERO, 0.5), layers::PLAYER)
            })
        }
    }

    #[test]
    fn test_damage_prefers_positional_path() {
        let mut projectiles = ProjectileSystem::new();
        let mut body = Body {
            id: EntityId::from_raw(5),
            health: HealthPool::new(10, 0.0),
            last_source: None,
        };
        {
            let mut world = CombatWorld::new(&mut projectiles, 1.0).with_body(&mut body);
            let result = world.damage(EntityId::from_raw(5), 4, Vec2::new(2.0, 0.0));
            assert_eq!(result.map(|r| r.applied), Some(true));
            assert!(world.damage(EntityId::from_raw(99), 4, Vec2::ZERO).is_none());
        }
        assert_eq!(body.last_source, Some(Vec2::new(2.0, 0.0)));
        assert_eq!(body.health.current(), 6);
    }

    #[test]
    fn test_colliders_skip_dead_bodies() {
        let mut projectiles = ProjectileSystem::new();
        projectiles.spawn(Vec2::ONE, Vec2::X, 1.0, 1);
        let mut body = Body {
            id: EntityId::from_raw(5),
            health: HealthPool::new(1, 0.0),
            last_source: None,
        };
        let mut world = CombatWorld::new(&mut projectiles, 0.0).with_body(&mut body);
        assert_eq!(world.colliders().len(), 2);

        world.damage(EntityId::from_raw(5), 5, Vec2::ZERO);
        assert_eq!(world.colliders().len(), 1);
    }
}
