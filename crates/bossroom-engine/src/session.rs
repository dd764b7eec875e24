//! Scene-session glue around the encounter.
//!
//! The combat core only emits notifications. This module turns deaths into
//! scene changes:
//! - [`GameSession`] is process-wide state that outlives scenes
//! - [`SceneFader`] fades out, loads, then fades in
//! - [`SceneDirector`] decides which scene comes next and when

use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use bossroom_combat::{CombatNotification, EncounterOutcome};
use bossroom_common::{BossroomError, EntityId};

/// Scene names and transition timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Scene holding the fight
    pub boss_room_scene: String,
    /// Scene loaded after the boss dies
    pub next_scene: String,
    /// Scene loaded after the player dies
    pub game_over_scene: String,
    /// Length of each half of a fade (seconds)
    pub fade_duration: f32,
    /// Wait between the boss dying and leaving the room (seconds)
    pub boss_death_delay: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            boss_room_scene: "BossRoom".to_string(),
            next_scene: "NextLevel".to_string(),
            game_over_scene: "Game over".to_string(),
            fade_duration: 0.6,
            boss_death_delay: 2.0,
        }
    }
}

impl SessionConfig {
    /// Clamp values to valid ranges.
    pub fn validate(&mut self) {
        self.fade_duration = self.fade_duration.clamp(0.0, 10.0);
        self.boss_death_delay = self.boss_death_delay.clamp(0.0, 60.0);
    }

    /// Every scene name the session may load.
    #[must_use]
    pub fn scenes(&self) -> [&str; 3] {
        [
            self.boss_room_scene.as_str(),
            self.next_scene.as_str(),
            self.game_over_scene.as_str(),
        ]
    }
}

// ============================================================================
// Game session
// ============================================================================

/// Process-wide session, alive from first use until [`GameSession::teardown`].
static SESSION: RwLock<Option<GameSession>> = RwLock::new(None);

/// Serializes tests that touch [`SESSION`].
#[cfg(test)]
pub(crate) static SESSION_TEST_LOCK: parking_lot::Mutex<()> = parking_lot::Mutex::new(());

/// State that survives scene changes.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSession {
    current_scene: String,
    last_run_seconds: Option<f32>,
    runs_recorded: u32,
}

impl GameSession {
    /// A fresh session standing in the boss room.
    #[must_use]
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            current_scene: config.boss_room_scene.clone(),
            last_run_seconds: None,
            runs_recorded: 0,
        }
    }

    /// Run `f` on the global session, creating it from `config` on first use.
    pub fn with_global<R>(config: &SessionConfig, f: impl FnOnce(&mut GameSession) -> R) -> R {
        let mut guard = SESSION.write();
        let session = guard.get_or_insert_with(|| {
            info!(scene = %config.boss_room_scene, "game session created");
            Self::new(config)
        });
        f(session)
    }

    /// Read access to the global session, if one exists.
    pub fn global() -> Option<MappedRwLockReadGuard<'static, GameSession>> {
        RwLockReadGuard::try_map(SESSION.read(), Option::as_ref).ok()
    }

    /// Drop the global session. Returns it if one existed.
    pub fn teardown() -> Option<GameSession> {
        let session = SESSION.write().take();
        if session.is_some() {
            info!("game session torn down");
        }
        session
    }

    /// Record how long the last boss run took.
    pub fn record_run(&mut self, seconds: f32) {
        self.last_run_seconds = Some(seconds.max(0.0));
        self.runs_recorded += 1;
        info!(seconds = seconds, "boss run recorded");
    }

    /// Note that `scene` is now loaded.
    pub fn enter_scene(&mut self, scene: &str) {
        self.current_scene = scene.to_string();
    }

    /// Duration of the last recorded run.
    #[must_use]
    pub fn last_run_seconds(&self) -> Option<f32> {
        self.last_run_seconds
    }

    /// Runs recorded in this session.
    #[must_use]
    pub fn runs_recorded(&self) -> u32 {
        self.runs_recorded
    }

    /// Currently loaded scene.
    #[must_use]
    pub fn current_scene(&self) -> &str {
        &self.current_scene
    }
}

// ============================================================================
// Scene loading
// ============================================================================

/// Loads scenes by name.
pub trait SceneLoader {
    /// Load `scene`, replacing the current one.
    fn load(&mut self, scene: &str) -> Result<(), BossroomError>;
}

/// Loader for headless runs: validates the name and logs the switch.
#[derive(Debug, Clone, Default)]
pub struct LoggingSceneLoader {
    known: Vec<String>,
    history: Vec<String>,
}

impl LoggingSceneLoader {
    /// A loader that accepts the given scene names.
    #[must_use]
    pub fn new<I, S>(scenes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known: scenes.into_iter().map(Into::into).collect(),
            history: Vec::new(),
        }
    }

    /// Scenes loaded so far, oldest first.
    #[must_use]
    pub fn history(&self) -> &[String] {
        &self.history
    }
}

impl SceneLoader for LoggingSceneLoader {
    fn load(&mut self, scene: &str) -> Result<(), BossroomError> {
        if !self.known.iter().any(|known| known == scene) {
            return Err(BossroomError::UnknownScene(scene.to_string()));
        }
        info!(scene = scene, "scene loaded");
        self.history.push(scene.to_string());
        Ok(())
    }
}

// ============================================================================
// Fader
// ============================================================================

/// Where a fade stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FadePhase {
    /// Nothing covering the screen.
    #[default]
    Clear,
    /// Darkening before the load.
    FadingOut,
    /// Brightening after the load.
    FadingIn,
}

/// Fade out, load, fade in. Requests made mid-fade are ignored.
#[derive(Debug, Clone)]
pub struct SceneFader {
    duration: f32,
    phase: FadePhase,
    timer: f32,
    target: Option<String>,
}

impl SceneFader {
    /// A fader whose halves each take `duration` seconds.
    #[must_use]
    pub fn new(duration: f32) -> Self {
        Self {
            duration: duration.max(0.0),
            phase: FadePhase::Clear,
            timer: 0.0,
            target: None,
        }
    }

    /// Whether a fade is running.
    #[must_use]
    pub fn is_fading(&self) -> bool {
        self.phase != FadePhase::Clear
    }

    /// Screen cover from 0 (clear) to 1 (black).
    #[must_use]
    pub fn opacity(&self) -> f32 {
        let t = if self.duration > 0.0 {
            (self.timer / self.duration).clamp(0.0, 1.0)
        } else {
            1.0
        };
        match self.phase {
            FadePhase::Clear => 0.0,
            FadePhase::FadingOut => t,
            FadePhase::FadingIn => 1.0 - t,
        }
    }

    /// Start a transition to `scene`. Returns false if one is already running.
    pub fn request(&mut self, scene: &str) -> bool {
        if self.is_fading() {
            debug!(scene = scene, "fade in progress, request ignored");
            return false;
        }
        self.phase = FadePhase::FadingOut;
        self.timer = 0.0;
        self.target = Some(scene.to_string());
        true
    }

    /// Advance the fade. Returns the scene loaded during this call, if any.
    ///
    /// A failed load aborts the fade and clears the screen.
    pub fn advance(
        &mut self,
        dt: f32,
        loader: &mut dyn SceneLoader,
    ) -> Result<Option<String>, BossroomError> {
        match self.phase {
            FadePhase::Clear => Ok(None),
            FadePhase::FadingOut => {
                self.timer += dt.max(0.0);
                if self.timer < self.duration {
                    return Ok(None);
                }
                let Some(scene) = self.target.take() else {
                    self.phase = FadePhase::Clear;
                    return Ok(None);
                };
                if let Err(e) = loader.load(&scene) {
                    self.phase = FadePhase::Clear;
                    self.timer = 0.0;
                    return Err(e);
                }
                self.phase = FadePhase::FadingIn;
                self.timer = 0.0;
                Ok(Some(scene))
            },
            FadePhase::FadingIn => {
                self.timer += dt.max(0.0);
                if self.timer >= self.duration {
                    self.phase = FadePhase::Clear;
                    self.timer = 0.0;
                }
                Ok(None)
            },
        }
    }
}

// ============================================================================
// Director
// ============================================================================

/// Turns deaths into scene transitions.
///
/// Boss death waits `boss_death_delay`, records the run time and moves on.
/// Player death goes straight to the game-over scene. Only the first death
/// leads anywhere.
///
/// The encounter outcome is authoritative; death notifications only get the
/// same transition started a little earlier when they arrive.
#[derive(Debug, Clone)]
pub struct SceneDirector {
    config: SessionConfig,
    boss: EntityId,
    player: EntityId,
    boss_death_timer: Option<f32>,
    pending: Option<String>,
    requested: Option<String>,
}

impl SceneDirector {
    /// Watch for the deaths of `boss` and `player`.
    #[must_use]
    pub fn new(config: SessionConfig, boss: EntityId, player: EntityId) -> Self {
        Self {
            config,
            boss,
            player,
            boss_death_timer: None,
            pending: None,
            requested: None,
        }
    }

    /// Whether a transition has been decided.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.boss_death_timer.is_some() || self.pending.is_some() || self.requested.is_some()
    }

    /// Scene handed to the fader, once it accepted it.
    #[must_use]
    pub fn requested_scene(&self) -> Option<&str> {
        self.requested.as_deref()
    }

    /// Feed one notification.
    pub fn observe(&mut self, notification: &CombatNotification) {
        let CombatNotification::Death { entity } = notification else {
            return;
        };
        if *entity == self.boss {
            self.boss_died();
        } else if *entity == self.player {
            self.player_died();
        }
    }

    /// Feed the encounter's current outcome. Works even when notifications
    /// were dropped on a full bus.
    pub fn observe_outcome(&mut self, outcome: EncounterOutcome) {
        match outcome {
            EncounterOutcome::Ongoing => {},
            EncounterOutcome::BossDefeated => self.boss_died(),
            EncounterOutcome::PlayerDefeated => self.player_died(),
        }
    }

    fn boss_died(&mut self) {
        if self.is_triggered() {
            return;
        }
        info!(delay = self.config.boss_death_delay, "boss died, leaving room");
        self.boss_death_timer = Some(0.0);
    }

    fn player_died(&mut self) {
        if self.is_triggered() {
            return;
        }
        info!("player died, game over");
        self.pending = Some(self.config.game_over_scene.clone());
    }

    /// Advance timers and hand due transitions to `fader`.
    pub fn update(
        &mut self,
        dt: f32,
        run_seconds: f32,
        session: &mut GameSession,
        fader: &mut SceneFader,
    ) {
        if let Some(timer) = self.boss_death_timer.as_mut() {
            *timer += dt.max(0.0);
            if *timer >= self.config.boss_death_delay {
                self.boss_death_timer = None;
                session.record_run(run_seconds);
                self.pending = Some(self.config.next_scene.clone());
            }
        }

        if let Some(scene) = self.pending.take() {
            if fader.request(&scene) {
                self.requested = Some(scene);
            } else {
                // Fader busy, try again next frame.
                self.pending = Some(scene);
            }
        }
    }
}
