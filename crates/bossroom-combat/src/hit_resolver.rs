//! Static hit resolution.
//!
//! This module provides:
//! - Collision layer flags
//! - Colliders that know their owner and root entity
//! - Hit queries (box or circle) with layer filter, self exclusion and an
//!   optional frontal arc
//! - Per-swing hit tracking
//!
//! The resolver is stateless. Callers that must not hit a target twice in
//! one swing pass an [`AttackSwing`] and clear it when the swing starts.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use bossroom_common::{angle_between_deg, EntityId, PlacedShape, Shape, Vec2, EPSILON_SQ};

use crate::health::Damageable;
use crate::projectile::ProjectileId;

// ============================================================================
// Collision layers
// ============================================================================

/// Collision layer flags.
pub mod layers {
    /// Layer flag type.
    pub type Flags = u32;

    /// Player body.
    pub const PLAYER: Flags = 1 << 0;
    /// Boss body.
    pub const BOSS: Flags = 1 << 1;
    /// Projectiles fired by the player.
    pub const PLAYER_PROJECTILE: Flags = 1 << 2;
    /// Projectiles fired by the boss.
    pub const BOSS_PROJECTILE: Flags = 1 << 3;
    /// Walls and props.
    pub const ENVIRONMENT: Flags = 1 << 4;
    /// All layers.
    pub const ALL: Flags = 0xFFFF_FFFF;
    /// No layers.
    pub const NONE: Flags = 0;

    /// What a player swing can touch: the boss and its bullets.
    pub const PLAYER_MELEE: Flags = BOSS | BOSS_PROJECTILE;
    /// What boss attacks can touch.
    pub const BOSS_MELEE: Flags = PLAYER;
}

// ============================================================================
// Colliders
// ============================================================================

/// What a collider belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ColliderOwner {
    /// A body with health.
    Entity(EntityId),
    /// A projectile. Melee parries these instead of damaging them.
    Projectile(ProjectileId),
}

impl ColliderOwner {
    /// Whether this collider is tagged as a projectile.
    #[must_use]
    pub const fn is_projectile(&self) -> bool {
        matches!(self, Self::Projectile(_))
    }

    /// Entity id, if this is a body.
    #[must_use]
    pub const fn entity(&self) -> Option<EntityId> {
        match self {
            Self::Entity(id) => Some(*id),
            Self::Projectile(_) => None,
        }
    }
}

/// A collider at its current placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collider {
    /// What the collider belongs to.
    pub owner: ColliderOwner,
    /// Root entity of the owning hierarchy (the shooter for projectiles).
    pub root: EntityId,
    /// Shape in the world.
    pub area: PlacedShape,
    /// Layer this collider sits on.
    pub layer: layers::Flags,
    /// Armored colliders change hit feedback.
    pub armored: bool,
}

impl Collider {
    /// Creates a body collider rooted at its own entity.
    #[must_use]
    pub fn body(entity: EntityId, area: PlacedShape, layer: layers::Flags) -> Self {
        Self {
            owner: ColliderOwner::Entity(entity),
            root: entity,
            area,
            layer,
            armored: false,
        }
    }

    /// Creates a projectile collider rooted at its shooter.
    #[must_use]
    pub fn projectile(
        id: ProjectileId,
        shooter: EntityId,
        area: PlacedShape,
        layer: layers::Flags,
    ) -> Self {
        Self {
            owner: ColliderOwner::Projectile(id),
            root: shooter,
            area,
            layer,
            armored: false,
        }
    }

    /// Marks the collider armored.
    #[must_use]
    pub const fn with_armored(mut self, armored: bool) -> Self {
        self.armored = armored;
        self
    }
}

/// A damageable body that exposes a collider.
pub trait Hittable: Damageable {
    /// Entity id of this body.
    fn entity_id(&self) -> EntityId;

    /// Current collider, or `None` while disabled (for example after death).
    fn collider(&self) -> Option<Collider>;
}

// ============================================================================
// Queries
// ============================================================================

/// A static overlap query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitQuery {
    /// Query area. The frontal arc is measured from its center.
    pub area: PlacedShape,
    /// Forward direction (unit, or zero for "no preference").
    pub forward: Vec2,
    /// Layers the query can touch.
    pub layer_mask: layers::Flags,
    /// Root whose colliders are skipped.
    pub exclude_root: Option<EntityId>,
    /// Full frontal arc in degrees.
    pub frontal_arc: Option<f32>,
}

impl HitQuery {
    /// Circle query centered on `center`.
    #[must_use]
    pub fn circle(center: Vec2, radius: f32, forward: Vec2) -> Self {
        Self {
            area: PlacedShape::circle(center, radius),
            forward: forward.normalize_or_zero(),
            layer_mask: layers::ALL,
            exclude_root: None,
            frontal_arc: None,
        }
    }

    /// Box query of full `size` centered on `center`, rotated to `forward`.
    #[must_use]
    pub fn rect(center: Vec2, size: Vec2, forward: Vec2) -> Self {
        let forward = forward.normalize_or_zero();
        Self {
            area: PlacedShape::new(Shape::rect(size.x, size.y), center).facing(forward),
            forward,
            layer_mask: layers::ALL,
            exclude_root: None,
            frontal_arc: None,
        }
    }

    /// Restricts the layers the query can touch.
    #[must_use]
    pub const fn with_layers(mut self, mask: layers::Flags) -> Self {
        self.layer_mask = mask;
        self
    }

    /// Skips colliders rooted at `root`.
    #[must_use]
    pub const fn excluding(mut self, root: EntityId) -> Self {
        self.exclude_root = Some(root);
        self
    }

    /// Keeps only targets within `arc_deg` total around `forward`.
    #[must_use]
    pub fn with_frontal_arc(mut self, arc_deg: f32) -> Self {
        self.frontal_arc = Some(arc_deg.clamp(0.0, 360.0));
        self
    }

    /// Whether `collider` passes the layer and root filters.
    fn admits(&self, collider: &Collider) -> bool {
        if collider.layer & self.layer_mask == 0 {
            return false;
        }
        self.exclude_root != Some(collider.root)
    }

    /// Whether a target whose nearest point is `nearest` lies in the arc.
    fn in_arc(&self, nearest: Vec2) -> bool {
        let Some(arc) = self.frontal_arc else {
            return true;
        };
        if self.forward == Vec2::ZERO {
            return true;
        }
        let to_target = nearest - self.area.center;
        // Center inside the target: no direction to measure, skip it.
        if to_target.length_squared() < EPSILON_SQ {
            return false;
        }
        angle_between_deg(self.forward, to_target) <= arc * 0.5
    }
}

/// A collider selected by a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedHit {
    /// What was hit.
    pub owner: ColliderOwner,
    /// Root entity of what was hit.
    pub root: EntityId,
    /// Point of the target nearest to the query center.
    pub nearest_point: Vec2,
    /// Whether the target is armored.
    pub armored: bool,
}

// ============================================================================
// Swing tracking
// ============================================================================

/// Targets already hit during one swing.
#[derive(Debug, Clone, Default)]
pub struct AttackSwing {
    hit_set: AHashSet<ColliderOwner>,
    swings: u64,
}

impl AttackSwing {
    /// Creates an empty swing tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new swing, forgetting previous hits.
    pub fn begin(&mut self) {
        self.hit_set.clear();
        self.swings += 1;
    }

    /// Forgets hits without counting a new swing.
    pub fn clear(&mut self) {
        self.hit_set.clear();
    }

    /// Records a hit. Returns false if the target was already hit.
    pub fn register(&mut self, target: ColliderOwner) -> bool {
        self.hit_set.insert(target)
    }

    /// Whether `target` was hit this swing.
    #[must_use]
    pub fn has_hit(&self, target: ColliderOwner) -> bool {
        self.hit_set.contains(&target)
    }

    /// Number of targets hit this swing.
    #[must_use]
    pub fn hit_count(&self) -> usize {
        self.hit_set.len()
    }

    /// Number of swings started.
    #[must_use]
    pub fn swing_count(&self) -> u64 {
        self.swings
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Stateless overlap resolver.
#[derive(Debug, Clone, Copy, Default)]
pub struct HitResolver;

impl HitResolver {
    /// Returns every collider the query touches right now.
    #[must_use]
    pub fn resolve(query: &HitQuery, colliders: &[Collider]) -> Vec<ResolvedHit> {
        colliders
            .iter()
            .filter(|c| query.admits(c))
            .filter(|c| query.area.overlaps(&c.area))
            .filter_map(|c| {
                let nearest = c.area.closest_point(query.area.center);
                query.in_arc(nearest).then_some(ResolvedHit {
                    owner: c.owner,
                    root: c.root,
                    nearest_point: nearest,
                    armored: c.armored,
                })
            })
            .collect()
    }

    /// Like [`HitResolver::resolve`], but skips and records targets in `swing`.
    pub fn resolve_new(
        query: &HitQuery,
        colliders: &[Collider],
        swing: &mut AttackSwing,
    ) -> Vec<ResolvedHit> {
        let mut hits = Self::resolve(query, colliders);
        hits.retain(|hit| swing.register(hit.owner));
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(raw: u64, center: Vec2, radius: f32, layer: layers::Flags) -> Collider {
        Collider::body(
            EntityId::from_raw(raw),
            PlacedShape::circle(center, radius),
            layer,
        )
    }

    #[test]
    fn test_circle_query_hits_overlapping() {
        let colliders = [
            body(1, Vec2::new(1.0, 0.0), 0.3, layers::BOSS),
            body(2, Vec2::new(5.0, 0.0), 0.3, layers::BOSS),
        ];
        let query = HitQuery::circle(Vec2::ZERO, 0.9, Vec2::X);
        let hits = HitResolver::resolve(&query, &colliders);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].owner, ColliderOwner::Entity(EntityId::from_raw(1)));
    }

    #[test]
    fn test_layer_filter() {
        let colliders = [body(1, Vec2::new(0.5, 0.0), 0.3, layers::PLAYER)];
        let query = HitQuery::circle(Vec2::ZERO, 1.0, Vec2::X).with_layers(layers::BOSS);
        assert!(HitResolver::resolve(&query, &colliders).is_empty());
    }

    #[test]
    fn test_excludes_own_root() {
        let me = EntityId::from_raw(7);
        let colliders = [
            Collider::body(me, PlacedShape::circle(Vec2::ZERO, 0.5), layers::BOSS),
            body(8, Vec2::new(0.6, 0.0), 0.3, layers::PLAYER),
        ];
        let query = HitQuery::circle(Vec2::ZERO, 1.0, Vec2::X).excluding(me);
        let hits = HitResolver::resolve(&query, &colliders);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].root, EntityId::from_raw(8));
    }

    #[test]
    fn test_frontal_arc_filters_behind() {
        let colliders = [
            body(1, Vec2::new(0.8, 0.0), 0.2, layers::BOSS),
            body(2, Vec2::new(-0.8, 0.0), 0.2, layers::BOSS),
            body(3, Vec2::new(0.0, 0.8), 0.2, layers::BOSS),
        ];
        let query = HitQuery::circle(Vec2::ZERO, 1.0, Vec2::X).with_frontal_arc(120.0);
        let hits = HitResolver::resolve(&query, &colliders);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].root, EntityId::from_raw(1));
    }

    #[test]
    fn test_frontal_arc_uses_nearest_point() {
        // A wide body centered behind the origin whose edge reaches in front.
        let wide = Collider::body(
            EntityId::from_raw(1),
            PlacedShape::new(Shape::rect(4.0, 0.4), Vec2::new(-0.5, 0.5)),
            layers::BOSS,
        );
        let query = HitQuery::circle(Vec2::ZERO, 1.0, Vec2::new(1.0, 1.0)).with_frontal_arc(120.0);
        let hits = HitResolver::resolve(&query, &[wide]);
        assert_eq!(hits.len(), 1);

        // The body's own center is outside the arc.
        let to_center = wide.area.center - query.area.center;
        assert!(angle_between_deg(query.forward, to_center) > 60.0);
    }

    #[test]
    fn test_target_behind_swing_center_is_skipped() {
        // Swing centered ahead of a body at (0, 0): the body overlaps the
        // circle but its nearest point sits behind the center.
        let colliders = [body(1, Vec2::new(-0.2, 0.0), 0.5, layers::BOSS)];
        let query = HitQuery::circle(Vec2::new(0.5, 0.0), 0.9, Vec2::X).with_frontal_arc(120.0);
        assert!(HitResolver::resolve(&query, &colliders).is_empty());

        // Same swing, target ahead of the center.
        let colliders = [body(1, Vec2::new(1.2, 0.0), 0.5, layers::BOSS)];
        assert_eq!(HitResolver::resolve(&query, &colliders).len(), 1);
    }

    #[test]
    fn test_center_inside_target_is_skipped() {
        let colliders = [body(1, Vec2::ZERO, 1.0, layers::BOSS)];
        let query = HitQuery::circle(Vec2::ZERO, 0.5, Vec2::X).with_frontal_arc(120.0);
        assert!(HitResolver::resolve(&query, &colliders).is_empty());

        // Without an arc the same overlap is a hit.
        let query = HitQuery::circle(Vec2::ZERO, 0.5, Vec2::X);
        assert_eq!(HitResolver::resolve(&query, &colliders).len(), 1);
    }

    #[test]
    fn test_rect_query_is_oriented() {
        let colliders = [
            body(1, Vec2::new(0.0, 1.0), 0.1, layers::PLAYER),
            body(2, Vec2::new(1.0, 0.0), 0.1, layers::PLAYER),
        ];
        // Long thin box pointing up.
        let query = HitQuery::rect(Vec2::ZERO, Vec2::new(2.4, 0.4), Vec2::Y);
        let hits = HitResolver::resolve(&query, &colliders);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].root, EntityId::from_raw(1));
    }

    #[test]
    fn test_projectile_colliders_are_tagged() {
        let shooter = EntityId::from_raw(1);
        let bullet = Collider::projectile(
            ProjectileId::from_raw(4),
            shooter,
            PlacedShape::circle(Vec2::new(0.3, 0.0), 0.1),
            layers::BOSS_PROJECTILE,
        );
        let query = HitQuery::circle(Vec2::ZERO, 0.9, Vec2::X).with_layers(layers::PLAYER_MELEE);
        let hits = HitResolver::resolve(&query, &[bullet]);
        assert_eq!(hits.len(), 1);
        assert!(hits[0].owner.is_projectile());
        assert_eq!(hits[0].owner.entity(), None);
    }

    #[test]
    fn test_swing_dedupes_repeated_resolves() {
        let colliders = [
            body(1, Vec2::new(0.5, 0.0), 0.3, layers::PLAYER),
            body(2, Vec2::new(0.0, 0.5), 0.3, layers::PLAYER),
        ];
        let query = HitQuery::circle(Vec2::ZERO, 1.0, Vec2::X);
        let mut swing = AttackSwing::new();
        swing.begin();

        let first = HitResolver::resolve_new(&query, &colliders, &mut swing);
        assert_eq!(first.len(), 2);
        for _ in 0..5 {
            assert!(HitResolver::resolve_new(&query, &colliders, &mut swing).is_empty());
        }
        assert_eq!(swing.hit_count(), 2);

        swing.begin();
        assert_eq!(HitResolver::resolve_new(&query, &colliders, &mut swing).len(), 2);
        assert_eq!(swing.swing_count(), 2);
    }

    #[test]
    fn test_armored_flag_carried() {
        let armored = body(1, Vec2::new(0.5, 0.0), 0.3, layers::BOSS).with_armored(true);
        let query = HitQuery::circle(Vec2::ZERO, 1.0, Vec2::X);
        let hits = HitResolver::resolve(&query, &[armored]);
        assert!(hits[0].armored);
    }
}
