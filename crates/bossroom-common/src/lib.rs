//! # Bossroom Common
//!
//! Shared types for the boss room encounter crates.
//!
//! This crate provides:
//! - Entity ids
//! - Boundary error types
//! - 2D geometry: shapes, placed shapes, overlap and nearest-point queries
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod geometry;
pub mod ids;

pub use glam::Vec2;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::geometry::*;
    pub use crate::ids::*;
    pub use glam::Vec2;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_generation() {
        let id1 = EntityId::new();
        let id2 = EntityId::new();
        assert_ne!(id1, id2);
        assert!(id1.is_valid());
    }

    #[test]
    fn test_prelude_geometry() {
        let circle = PlacedShape::circle(Vec2::ZERO, 1.0);
        assert!(circle.contains(Vec2::new(0.5, 0.5)));
    }
}
