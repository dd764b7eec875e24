//! Input translation for the runner.
//!
//! Raw key and mouse state becomes a [`PlayerIntent`]; the combat core never
//! sees devices. [`Autopilot`] presses keys on its own for headless runs.

use std::collections::HashSet;

use bossroom_combat::PlayerIntent;
use bossroom_common::Vec2;

/// Keys the runner cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// Move up
    W,
    /// Move left
    A,
    /// Move down
    S,
    /// Move right
    D,
    /// Dash
    Space,
}

/// Mouse buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Normal attack
    Left,
    /// Hold to charge the sweep, release to swing
    Right,
}

/// Device state for one frame, with edge detection.
#[derive(Debug, Default)]
pub struct InputState {
    /// Keys held down
    keys: HashSet<KeyCode>,
    /// Keys that went down this frame
    just_pressed_keys: HashSet<KeyCode>,
    /// Buttons held down
    buttons: HashSet<MouseButton>,
    /// Buttons that went down this frame
    just_pressed_buttons: HashSet<MouseButton>,
    /// Buttons that came up this frame
    just_released_buttons: HashSet<MouseButton>,
    /// Cursor in world coordinates
    cursor: Vec2,
}

impl InputState {
    /// Create an empty input state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A key went down.
    pub fn press_key(&mut self, key: KeyCode) {
        if self.keys.insert(key) {
            self.just_pressed_keys.insert(key);
        }
    }

    /// A key came up.
    pub fn release_key(&mut self, key: KeyCode) {
        self.keys.remove(&key);
    }

    /// A mouse button went down.
    pub fn press_button(&mut self, button: MouseButton) {
        if self.buttons.insert(button) {
            self.just_pressed_buttons.insert(button);
        }
    }

    /// A mouse button came up.
    pub fn release_button(&mut self, button: MouseButton) {
        if self.buttons.remove(&button) {
            self.just_released_buttons.insert(button);
        }
    }

    /// Move the cursor to a world position.
    pub fn set_cursor(&mut self, world: Vec2) {
        self.cursor = world;
    }

    /// Release everything that is held.
    pub fn release_all(&mut self) {
        self.keys.clear();
        let held: Vec<MouseButton> = self.buttons.iter().copied().collect();
        for button in held {
            self.release_button(button);
        }
    }

    /// Check if a key is held.
    #[must_use]
    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.keys.contains(&key)
    }

    /// Check if a key went down this frame.
    #[must_use]
    pub fn is_key_just_pressed(&self, key: KeyCode) -> bool {
        self.just_pressed_keys.contains(&key)
    }

    /// Raw movement axis from WASD, not normalized.
    #[must_use]
    pub fn move_axis(&self) -> Vec2 {
        let mut axis = Vec2::ZERO;
        if self.is_key_pressed(KeyCode::D) {
            axis.x += 1.0;
        }
        if self.is_key_pressed(KeyCode::A) {
            axis.x -= 1.0;
        }
        if self.is_key_pressed(KeyCode::W) {
            axis.y += 1.0;
        }
        if self.is_key_pressed(KeyCode::S) {
            axis.y -= 1.0;
        }
        axis
    }

    /// Translate to the core's intent for a player standing at `player`.
    #[must_use]
    pub fn intent(&self, player: Vec2) -> PlayerIntent {
        PlayerIntent {
            move_dir: self.move_axis().normalize_or_zero(),
            aim: (self.cursor - player).normalize_or_zero(),
            attack_pressed: self.just_pressed_buttons.contains(&MouseButton::Left),
            charge_started: self.just_pressed_buttons.contains(&MouseButton::Right),
            charge_released: self.just_released_buttons.contains(&MouseButton::Right),
            dash_pressed: self.is_key_just_pressed(KeyCode::Space),
        }
    }

    /// Clear per-frame edges. Call once the intent has been consumed.
    pub fn end_frame(&mut self) {
        self.just_pressed_keys.clear();
        self.just_pressed_buttons.clear();
        self.just_released_buttons.clear();
    }
}

// ============================================================================
// Autopilot
// ============================================================================

/// Scripted player for headless runs.
///
/// Walks into melee range, swings on a fixed rhythm, charges a sweep now and
/// then and side-dashes periodically to thin out incoming volleys.
#[derive(Debug, Clone)]
pub struct Autopilot {
    /// Distance to the boss it tries to hold
    pub engage_range: f32,
    /// Seconds between normal swings
    pub attack_interval: f32,
    /// Seconds between side-dashes
    pub dash_interval: f32,
    /// Seconds between charged sweeps
    pub charge_interval: f32,
    /// How long a sweep is charged
    pub charge_hold: f32,
    attack_timer: f32,
    dash_timer: f32,
    charge_timer: f32,
    holding: Option<f32>,
    strafe_right: bool,
}

impl Default for Autopilot {
    fn default() -> Self {
        Self {
            engage_range: 1.2,
            attack_interval: 0.55,
            dash_interval: 2.5,
            charge_interval: 4.0,
            charge_hold: 0.6,
            attack_timer: 0.0,
            dash_timer: 0.0,
            charge_timer: 0.0,
            holding: None,
            strafe_right: true,
        }
    }
}

impl Autopilot {
    /// Press keys for this frame. `boss` is `None` once there is nothing to fight.
    pub fn drive(&mut self, dt: f32, player: Vec2, boss: Option<Vec2>, input: &mut InputState) {
        let Some(boss) = boss else {
            self.holding = None;
            input.release_all();
            return;
        };

        self.attack_timer += dt;
        self.dash_timer += dt;
        self.charge_timer += dt;

        input.set_cursor(boss);
        for key in [KeyCode::W, KeyCode::A, KeyCode::S, KeyCode::D, KeyCode::Space] {
            input.release_key(key);
        }

        let to_boss = boss - player;
        let distance = to_boss.length();

        if self.dash_timer >= self.dash_interval {
            self.dash_timer = 0.0;
            let side = if self.strafe_right { KeyCode::D } else { KeyCode::A };
            self.strafe_right = !self.strafe_right;
            input.press_key(side);
            input.press_key(KeyCode::Space);
            return;
        }

        if distance > self.engage_range {
            let threshold = distance * 0.3;
            if to_boss.x > threshold {
                input.press_key(KeyCode::D);
            } else if to_boss.x < -threshold {
                input.press_key(KeyCode::A);
            }
            if to_boss.y > threshold {
                input.press_key(KeyCode::W);
            } else if to_boss.y < -threshold {
                input.press_key(KeyCode::S);
            }
            return;
        }

        if let Some(held) = self.holding.as_mut() {
            *held += dt;
            if *held >= self.charge_hold {
                self.holding = None;
                input.release_button(MouseButton::Right);
            }
            return;
        }

        if self.charge_timer >= self.charge_interval {
            self.charge_timer = 0.0;
            self.holding = Some(0.0);
            input.press_button(MouseButton::Right);
        } else if self.attack_timer >= self.attack_interval {
            self.attack_timer = 0.0;
            input.press_button(MouseButton::Left);
            input.release_button(MouseButton::Left);
        }
    }
}
