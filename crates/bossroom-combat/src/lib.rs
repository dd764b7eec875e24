//! # Bossroom Combat
//!
//! Combat core for a 2D boss encounter.
//!
//! This crate provides:
//! - Health pools with invulnerability windows and one-shot death
//! - Static hit resolution with layer filters, self exclusion and frontal arcs
//! - Kinematic projectiles with parry support
//! - Bullet pattern generators and cancellable pattern sequences
//! - The boss behavior state machine
//! - The player's melee/parry actor and dash movement
//! - Collaborator ports for presentation, movement, animation and targeting
//! - An encounter that ticks all of the above in a fixed order

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod actor;
pub mod boss;
pub mod bullet_pattern;
pub mod encounter;
pub mod events;
pub mod health;
pub mod hit_resolver;
pub mod movement;
pub mod player;
pub mod ports;
pub mod projectile;
pub mod world;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::actor::*;
    pub use crate::boss::*;
    pub use crate::bullet_pattern::*;
    pub use crate::encounter::*;
    pub use crate::events::*;
    pub use crate::health::*;
    pub use crate::hit_resolver::*;
    pub use crate::movement::*;
    pub use crate::player::*;
    pub use crate::ports::*;
    pub use crate::projectile::*;
    pub use crate::world::*;
}

pub use prelude::*;
