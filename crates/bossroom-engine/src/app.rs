//! Run loop.
//!
//! One frame: read input, run the due fixed steps of the encounter, hand the
//! outcome and the drained combat notifications to the scene director,
//! advance the fader. The bus may drop notifications when full, so scene
//! changes follow the encounter outcome.
//! The run ends once a death has led to a finished scene change, or when the
//! configured time limit is reached.

use anyhow::Result;
use tracing::{debug, info};

use bossroom_combat::{Encounter, EncounterOutcome, NotificationBus};

use crate::config::SimulationConfig;
use crate::input::{Autopilot, InputState};
use crate::session::{GameSession, LoggingSceneLoader, SceneDirector, SceneFader};
use crate::timing::StepClock;

/// What a finished run looked like.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// How the fight ended
    pub outcome: EncounterOutcome,
    /// Seconds of fighting
    pub fight_seconds: f32,
    /// Simulated seconds including the aftermath
    pub total_seconds: f32,
    /// Fixed steps run
    pub steps: u64,
    /// Frames that fell behind and dropped their backlog
    pub dropped_frames: u64,
    /// Average frame length in milliseconds
    pub average_frame_ms: f32,
    /// Boss health at the end
    pub boss_hp: i32,
    /// Player health at the end
    pub player_hp: i32,
    /// Scene loaded at the end
    pub scene: String,
    /// Run time recorded by the session
    pub last_run_seconds: Option<f32>,
}

/// Owns everything a run needs.
#[derive(Debug)]
pub struct Runner {
    config: SimulationConfig,
    bus: NotificationBus,
    encounter: Encounter,
    clock: StepClock,
    input: InputState,
    autopilot: Option<Autopilot>,
    director: SceneDirector,
    fader: SceneFader,
    loader: LoggingSceneLoader,
    sim_time: f32,
}

impl Runner {
    /// Build a runner from validated configuration.
    #[must_use]
    pub fn new(config: SimulationConfig) -> Self {
        let settings = &config.simulation;
        let bus = NotificationBus::new(settings.bus_capacity);
        let encounter = Encounter::new(&config.encounter, &bus);

        let mut clock = StepClock::new(settings.fixed_dt);
        if settings.realtime {
            clock = clock.with_realtime(settings.target_fps);
        }
        let autopilot = settings.autopilot.then(Autopilot::default);

        let director = SceneDirector::new(
            config.session.clone(),
            encounter.boss().id(),
            encounter.player().id(),
        );
        let fader = SceneFader::new(config.session.fade_duration);
        let loader = LoggingSceneLoader::new(config.session.scenes());

        Self {
            config,
            bus,
            encounter,
            clock,
            input: InputState::new(),
            autopilot,
            director,
            fader,
            loader,
            sim_time: 0.0,
        }
    }

    /// Run one frame. Returns false when the run is over.
    pub fn frame(&mut self) -> Result<bool> {
        let dt = self.clock.frame_dt(self.config.simulation.frame_dt);
        self.sim_time += dt;

        let player = self.encounter.player().position();
        if let Some(autopilot) = self.autopilot.as_mut() {
            let boss = self.encounter.boss();
            let boss = (!boss.state().is_terminal()).then(|| boss.position());
            autopilot.drive(dt, player, boss, &mut self.input);
        }

        let intent = self.input.intent(player);
        let steps = self.clock.accumulate(dt);
        for step in 0..steps {
            let intent = if step == 0 { intent } else { intent.held_only() };
            self.encounter.tick(self.clock.fixed_dt(), &intent);
        }
        // Presses wait for the first step that can see them.
        if steps > 0 {
            self.input.end_frame();
        }

        for notification in self.bus.drain() {
            debug!(?notification, "combat");
            self.director.observe(&notification);
        }
        self.director.observe_outcome(self.encounter.outcome());

        let fight_seconds = self.encounter.elapsed();
        GameSession::with_global(&self.config.session, |session| {
            self.director.update(dt, fight_seconds, session, &mut self.fader);
        });
        if let Some(scene) = self.fader.advance(dt, &mut self.loader)? {
            GameSession::with_global(&self.config.session, |session| session.enter_scene(&scene));
        }
        if self.fader.is_fading() {
            debug!(opacity = self.fader.opacity(), "fading");
        }

        self.clock.sleep_remainder();

        let transitioned = self.director.requested_scene().is_some() && !self.fader.is_fading();
        Ok(!transitioned && self.sim_time < self.config.simulation.max_seconds)
    }

    /// Run frames until the run is over.
    pub fn run_to_end(&mut self) -> Result<RunSummary> {
        self.clock.reset();
        while self.frame()? {}
        Ok(self.summary())
    }

    /// Snapshot of the run so far.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        let (scene, last_run_seconds) = match GameSession::global() {
            Some(session) => (session.current_scene().to_string(), session.last_run_seconds()),
            None => (self.config.session.boss_room_scene.clone(), None),
        };
        RunSummary {
            outcome: self.encounter.outcome(),
            fight_seconds: self.encounter.elapsed(),
            total_seconds: self.sim_time,
            steps: self.clock.steps(),
            dropped_frames: self.clock.dropped_frames(),
            average_frame_ms: self.clock.average_frame_time_ms(),
            boss_hp: self.encounter.boss().health().current(),
            player_hp: self.encounter.player().health().current(),
            scene,
            last_run_seconds,
        }
    }
}

/// Load configuration, run the encounter to its end and log a summary.
pub fn run(config_path: &str) -> Result<()> {
    let mut config = SimulationConfig::load_from(config_path);
    config.validate();

    info!(
        fixed_dt = config.simulation.fixed_dt,
        autopilot = config.simulation.autopilot,
        realtime = config.simulation.realtime,
        "starting boss room"
    );

    let mut runner = Runner::new(config);
    if runner.clock.is_realtime() {
        info!("Pacing frames against the wall clock");
    }
    let result = runner.run_to_end();
    // The session ends with the process even when the run failed.
    let session = GameSession::teardown();
    let summary = result?;

    info!(
        outcome = ?summary.outcome,
        fight_seconds = summary.fight_seconds,
        total_seconds = summary.total_seconds,
        steps = summary.steps,
        dropped_frames = summary.dropped_frames,
        average_frame_ms = summary.average_frame_ms,
        boss_hp = summary.boss_hp,
        player_hp = summary.player_hp,
        scene = %summary.scene,
        "run finished"
    );
    if let Some(session) = session {
        if let Some(seconds) = session.last_run_seconds() {
            info!(runs = session.runs_recorded(), "Boss cleared in {seconds:.2}s");
        }
    }
    if !summary.outcome.is_over() {
        info!("Time limit reached before the fight ended");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::MouseButton;
    use crate::session::SESSION_TEST_LOCK;
    use bossroom_combat::{CombatNotification, HealthConfig};
    use bossroom_common::Vec2;

    fn headless(autopilot: bool) -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.simulation.autopilot = autopilot;
        config.simulation.max_seconds = 60.0;
        config.session.fade_duration = 0.2;
        config.session.boss_death_delay = 0.5;
        config
    }

    #[test]
    fn test_player_death_leads_to_game_over() {
        let _guard = SESSION_TEST_LOCK.lock();
        GameSession::teardown();

        let mut config = headless(false);
        config.encounter.player.health = HealthConfig {
            max_hp: 1,
            i_frame_duration: 0.3,
        };

        let mut runner = Runner::new(config);
        let summary = runner.run_to_end().expect("run");
        GameSession::teardown();

        assert_eq!(summary.outcome, EncounterOutcome::PlayerDefeated);
        assert_eq!(summary.scene, "Game over");
        assert_eq!(summary.player_hp, 0);
        assert_eq!(summary.last_run_seconds, None);
        assert!(summary.total_seconds < 10.0);
    }

    #[test]
    fn test_autopilot_clears_fragile_boss() {
        let _guard = SESSION_TEST_LOCK.lock();
        GameSession::teardown();

        let mut config = headless(true);
        config.encounter.boss.health = HealthConfig {
            max_hp: 12,
            i_frame_duration: 0.1,
        };
        config.encounter.boss_start = Vec2::new(0.0, 2.0);
        config.encounter.player_start = Vec2::ZERO;

        let mut runner = Runner::new(config);
        let summary = runner.run_to_end().expect("run");
        GameSession::teardown();

        assert_eq!(summary.outcome, EncounterOutcome::BossDefeated);
        assert_eq!(summary.scene, "NextLevel");
        assert_eq!(summary.last_run_seconds, Some(summary.fight_seconds));
        assert!(summary.total_seconds > summary.fight_seconds);
    }

    #[test]
    fn test_boss_kill_on_full_bus_still_leaves_room() {
        let _guard = SESSION_TEST_LOCK.lock();
        GameSession::teardown();

        let mut config = headless(false);
        config.simulation.bus_capacity = 16;
        config.encounter.boss.health = HealthConfig {
            max_hp: 12,
            i_frame_duration: 0.1,
        };
        config.encounter.boss.first_hell_delay = 100.0;
        config.encounter.boss_start = Vec2::new(0.0, 1.4);
        config.encounter.player_start = Vec2::ZERO;

        let mut runner = Runner::new(config);
        let filler = CombatNotification::AttackResolved {
            attacker: runner.encounter.player().id(),
            hit: false,
            armored: false,
        };
        runner.input.set_cursor(Vec2::new(0.0, 1.4));
        runner.input.press_button(MouseButton::Left);

        // Keep the bus full so every death notification is dropped.
        let mut running = true;
        while running {
            while runner.bus.pending_count() < runner.bus.capacity() {
                runner.bus.publish(filler.clone());
            }
            running = runner.frame().expect("frame");
        }
        let summary = runner.summary();
        GameSession::teardown();

        assert_eq!(summary.outcome, EncounterOutcome::BossDefeated);
        assert_eq!(summary.boss_hp, 0);
        assert_eq!(summary.scene, "NextLevel");
        assert_eq!(summary.last_run_seconds, Some(summary.fight_seconds));
    }

    #[test]
    fn test_time_limit_stops_the_run() {
        let _guard = SESSION_TEST_LOCK.lock();
        GameSession::teardown();

        let mut config = headless(false);
        config.simulation.max_seconds = 1.0;
        config.encounter.boss.first_hell_delay = 100.0;
        config.encounter.boss_start = Vec2::new(0.0, 50.0);

        let mut runner = Runner::new(config);
        let summary = runner.run_to_end().expect("run");
        GameSession::teardown();

        assert_eq!(summary.outcome, EncounterOutcome::Ongoing);
        assert_eq!(summary.scene, "BossRoom");
        assert!((summary.total_seconds - 1.0).abs() < 0.05);
        assert!(summary.steps >= 59);
    }
}
