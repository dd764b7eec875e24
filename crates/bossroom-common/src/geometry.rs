//! 2D shapes and static overlap queries.
//!
//! Provides:
//! - Circle and oriented box shapes
//! - Shapes placed in the world with a center and rotation
//! - Overlap tests between placed shapes
//! - Nearest point on a placed shape to an arbitrary point
//! - Unsigned vector angles in degrees
//!
//! All queries are instantaneous: they test where shapes are now, not
//! where they travelled during a tick.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Squared length below which a vector is treated as zero.
pub const EPSILON_SQ: f32 = 1e-6;

// ============================================================================
// Shapes
// ============================================================================

/// Shape of a collider or query area, in local space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    /// Circle around the center.
    Circle {
        /// Radius in world units.
        radius: f32,
    },
    /// Box around the center, rotated with its placement.
    Box {
        /// Half of the width and height in world units.
        half_extents: Vec2,
    },
}

impl Default for Shape {
    fn default() -> Self {
        Self::Circle { radius: 0.5 }
    }
}

impl Shape {
    /// Creates a circle shape. Negative radii are clamped to zero.
    #[must_use]
    pub fn circle(radius: f32) -> Self {
        Self::Circle {
            radius: radius.max(0.0),
        }
    }

    /// Creates a box shape from its full size.
    #[must_use]
    pub fn rect(width: f32, height: f32) -> Self {
        Self::Box {
            half_extents: Vec2::new(width.max(0.0), height.max(0.0)) * 0.5,
        }
    }

    /// Radius of the smallest circle around the center that contains the shape.
    #[must_use]
    pub fn bounding_radius(&self) -> f32 {
        match self {
            Self::Circle { radius } => *radius,
            Self::Box { half_extents } => half_extents.length(),
        }
    }
}

// ============================================================================
// Placed shapes
// ============================================================================

/// A shape placed in the world.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacedShape {
    /// Local shape.
    pub shape: Shape,
    /// World-space center.
    pub center: Vec2,
    /// Rotation in radians (0 = local x axis points right).
    pub rotation: f32,
}

impl PlacedShape {
    /// Places a shape with no rotation.
    #[must_use]
    pub fn new(shape: Shape, center: Vec2) -> Self {
        Self {
            shape,
            center,
            rotation: 0.0,
        }
    }

    /// Creates a placed circle.
    #[must_use]
    pub fn circle(center: Vec2, radius: f32) -> Self {
        Self::new(Shape::circle(radius), center)
    }

    /// Sets the rotation in radians.
    #[must_use]
    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    /// Rotates the shape so its local x axis points along `direction`.
    ///
    /// A zero direction leaves the rotation unchanged.
    #[must_use]
    pub fn facing(self, direction: Vec2) -> Self {
        if direction.length_squared() < EPSILON_SQ {
            return self;
        }
        self.with_rotation(direction.y.atan2(direction.x))
    }

    /// Local x and y axes in world space.
    fn axes(&self) -> (Vec2, Vec2) {
        let x = Vec2::from_angle(self.rotation);
        (x, x.perp())
    }

    /// Converts a world point into this shape's local frame.
    fn to_local(&self, point: Vec2) -> Vec2 {
        let (ax, ay) = self.axes();
        let d = point - self.center;
        Vec2::new(d.dot(ax), d.dot(ay))
    }

    /// Converts a local point back into world space.
    fn to_world(&self, local: Vec2) -> Vec2 {
        let (ax, ay) = self.axes();
        self.center + ax * local.x + ay * local.y
    }

    /// Returns the point of this shape nearest to `point`.
    ///
    /// Points inside the shape are returned unchanged.
    #[must_use]
    pub fn closest_point(&self, point: Vec2) -> Vec2 {
        match self.shape {
            Shape::Circle { radius } => {
                let d = point - self.center;
                if d.length_squared() <= radius * radius {
                    point
                } else {
                    self.center + d.normalize_or_zero() * radius
                }
            },
            Shape::Box { half_extents } => {
                let local = self.to_local(point).clamp(-half_extents, half_extents);
                self.to_world(local)
            },
        }
    }

    /// Checks whether a point lies inside the shape.
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        match self.shape {
            Shape::Circle { radius } => point.distance_squared(self.center) <= radius * radius,
            Shape::Box { half_extents } => {
                let local = self.to_local(point);
                local.x.abs() <= half_extents.x && local.y.abs() <= half_extents.y
            },
        }
    }

    /// Checks whether two placed shapes overlap (touching counts).
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        // Cheap rejection on bounding circles first.
        let reach = self.shape.bounding_radius() + other.shape.bounding_radius();
        if self.center.distance_squared(other.center) > reach * reach {
            return false;
        }

        match (self.shape, other.shape) {
            (Shape::Circle { .. }, Shape::Circle { .. }) => true,
            (Shape::Circle { radius }, Shape::Box { .. }) => {
                circle_box_overlap(self.center, radius, other)
            },
            (Shape::Box { .. }, Shape::Circle { radius }) => {
                circle_box_overlap(other.center, radius, self)
            },
            (Shape::Box { half_extents: ha }, Shape::Box { half_extents: hb }) => {
                box_box_overlap(self, ha, other, hb)
            },
        }
    }
}

fn circle_box_overlap(center: Vec2, radius: f32, rect: &PlacedShape) -> bool {
    let closest = rect.closest_point(center);
    closest.distance_squared(center) <= radius * radius
}

/// Separating axis test for two oriented boxes.
fn box_box_overlap(a: &PlacedShape, ha: Vec2, b: &PlacedShape, hb: Vec2) -> bool {
    let (ax, ay) = a.axes();
    let (bx, by) = b.axes();
    let delta = b.center - a.center;

    [ax, ay, bx, by].iter().all(|&axis| {
        let ra = ha.x * ax.dot(axis).abs() + ha.y * ay.dot(axis).abs();
        let rb = hb.x * bx.dot(axis).abs() + hb.y * by.dot(axis).abs();
        delta.dot(axis).abs() <= ra + rb
    })
}

// ============================================================================
// Angles
// ============================================================================

/// Unsigned angle between two vectors in degrees, in `[0, 180]`.
///
/// Returns 0 when either vector is (near) zero.
#[must_use]
pub fn angle_between_deg(a: Vec2, b: Vec2) -> f32 {
    let denom = (a.length_squared() * b.length_squared()).sqrt();
    if denom < EPSILON_SQ {
        return 0.0;
    }
    (a.dot(b) / denom).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Unit vector at `degrees` counter-clockwise from +x.
#[must_use]
pub fn direction_from_deg(degrees: f32) -> Vec2 {
    Vec2::from_angle(degrees.to_radians())
}

/// Angle of a vector in degrees, in `(-180, 180]`.
#[must_use]
pub fn direction_to_deg(direction: Vec2) -> f32 {
    direction.y.atan2(direction.x).to_degrees()
}
