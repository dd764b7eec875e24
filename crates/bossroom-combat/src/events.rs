//! Combat notifications and the bus that carries them to presentation.

use crossbeam_channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use tracing::trace;

use bossroom_common::{EntityId, Vec2};

use crate::ports::PresentationSink;
use crate::projectile::ProjectileId;

/// Notifications the core emits for feedback layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CombatNotification {
    /// An entity lost health.
    Damaged {
        /// Entity that was hurt
        entity: EntityId,
        /// Damage applied
        amount: i32,
        /// Health left after the hit
        remaining: i32,
        /// Where the damage came from
        source: Vec2,
    },
    /// An entity died. Fires once per entity.
    Death {
        /// Entity that died
        entity: EntityId,
    },
    /// A melee resolve point finished, hit or miss.
    AttackResolved {
        /// Attacking entity
        attacker: EntityId,
        /// Whether anything was struck
        hit: bool,
        /// Whether a struck target was armored
        armored: bool,
    },
    /// A projectile was parried.
    Parried {
        /// Entity that parried
        by: EntityId,
        /// Destroyed projectile
        projectile: ProjectileId,
    },
}

impl CombatNotification {
    /// Entity the notification is about.
    #[must_use]
    pub fn subject(&self) -> EntityId {
        match self {
            Self::Damaged { entity, .. } | Self::Death { entity } => *entity,
            Self::AttackResolved { attacker, .. } => *attacker,
            Self::Parried { by, .. } => *by,
        }
    }
}

/// Bounded channel of notifications, drained once per frame.
#[derive(Debug)]
pub struct NotificationBus {
    sender: Sender<CombatNotification>,
    receiver: Receiver<CombatNotification>,
    capacity: usize,
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl NotificationBus {
    /// Creates a bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Publishes a notification. Dropped if the bus is full.
    pub fn publish(&self, notification: CombatNotification) {
        if self.sender.try_send(notification).is_err() {
            trace!("notification bus full, dropping");
        }
    }

    /// Drains all pending notifications.
    pub fn drain(&self) -> Vec<CombatNotification> {
        self.receiver.try_iter().collect()
    }

    /// Returns the number of pending notifications.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Creates a sink that publishes onto this bus.
    #[must_use]
    pub fn sink(&self) -> ChannelSink {
        ChannelSink {
            sender: self.sender.clone(),
        }
    }
}

/// [`PresentationSink`] backed by a [`NotificationBus`] sender.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: Sender<CombatNotification>,
}

impl PresentationSink for ChannelSink {
    fn notify(&mut self, notification: CombatNotification) {
        // Presentation must never stall combat.
        if self.sender.try_send(notification).is_err() {
            trace!("notification bus full, dropping");
        }
    }
}
