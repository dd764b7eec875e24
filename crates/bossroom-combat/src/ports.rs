//! Collaborator ports.
//!
//! The combat core talks to the rest of the game only through these traits:
//! - [`PresentationSink`]: fire-and-forget feedback (flash, SFX, UI)
//! - [`MovementActuator`]: applies motion the core asks for
//! - [`AnimationSignal`]: read-only view of the animation state
//! - [`TargetProvider`]: who the boss is after, if anyone

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use bossroom_common::{EntityId, Vec2};

use crate::events::CombatNotification;

// ============================================================================
// Presentation
// ============================================================================

/// Consumer of combat notifications.
///
/// Calls must return immediately; the core never waits on presentation.
pub trait PresentationSink {
    /// Delivers one notification.
    fn notify(&mut self, notification: CombatNotification);
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl PresentationSink for NullSink {
    fn notify(&mut self, _notification: CombatNotification) {}
}

// ============================================================================
// Movement
// ============================================================================

/// Applies motion requested by the core.
///
/// The core does not know how motion is integrated; it only reads back the
/// resulting position.
pub trait MovementActuator {
    /// Current world position.
    fn position(&self) -> Vec2;

    /// Moves to an absolute position.
    fn move_to(&mut self, target: Vec2);

    /// Moves by a delta.
    fn move_by(&mut self, delta: Vec2) {
        let next = self.position() + delta;
        self.move_to(next);
    }

    /// Stops any residual motion.
    fn halt(&mut self) {}
}

// ============================================================================
// Animation
// ============================================================================

/// Animation states the core can ask about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AnimState {
    /// Melee swing clip.
    Attack = 1,
    /// Bullet hell clip.
    BulletHell = 2,
    /// Death clip.
    Death = 3,
}

impl AnimState {
    /// Convert from u8.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Attack),
            2 => Some(Self::BulletHell),
            3 => Some(Self::Death),
            _ => None,
        }
    }
}

/// Read-only view of the animation player.
///
/// Only consulted as a fallback exit for long-running states; the core
/// never depends on clip content.
pub trait AnimationSignal {
    /// Whether the current clip is `state`.
    fn is_in_state(&self, state: AnimState) -> bool;

    /// Whether the animator is blending between clips.
    fn is_transitioning(&self) -> bool;
}

#[derive(Debug, Default)]
struct AnimationFlags {
    state: AtomicU8,
    transitioning: AtomicBool,
}

/// Shared handle an animation driver writes and the core reads.
///
/// Clones share the same flags.
#[derive(Debug, Clone, Default)]
pub struct AnimationHandle {
    flags: Arc<AnimationFlags>,
}

impl AnimationHandle {
    /// Creates a handle with no active clip.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the current clip.
    pub fn set_state(&self, state: Option<AnimState>) {
        let raw = state.map_or(0, |s| s as u8);
        self.flags.state.store(raw, Ordering::Relaxed);
    }

    /// Sets whether a blend is in progress.
    pub fn set_transitioning(&self, transitioning: bool) {
        self.flags
            .transitioning
            .store(transitioning, Ordering::Relaxed);
    }

    /// Current clip, if any.
    #[must_use]
    pub fn state(&self) -> Option<AnimState> {
        AnimState::from_u8(self.flags.state.load(Ordering::Relaxed))
    }
}

impl AnimationSignal for AnimationHandle {
    fn is_in_state(&self, state: AnimState) -> bool {
        self.state() == Some(state)
    }

    fn is_transitioning(&self) -> bool {
        self.flags.transitioning.load(Ordering::Relaxed)
    }
}

// ============================================================================
// Targeting
// ============================================================================

/// A target the boss can pursue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Target {
    /// Target entity.
    pub id: EntityId,
    /// Target world position.
    pub position: Vec2,
}

impl Target {
    /// Creates a target.
    #[must_use]
    pub const fn new(id: EntityId, position: Vec2) -> Self {
        Self { id, position }
    }
}

/// Supplies the current target.
pub trait TargetProvider {
    /// Current target, or `None` when it is destroyed or absent.
    fn target(&self) -> Option<Target>;
}

impl TargetProvider for Option<Target> {
    fn target(&self) -> Option<Target> {
        *self
    }
}

impl TargetProvider for Target {
    fn target(&self) -> Option<Target> {
        Some(*self)
    }
}
