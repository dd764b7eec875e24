//! Bullet pattern generation.
//!
//! This module provides:
//! - Pure direction generators (radial burst, aimed spread)
//! - Multi-step sequences (radial waves, spiral) driven by a tick clock
//! - A runner that keeps at most one sequence in flight
//! - A spawner that turns pattern output into projectiles
//!
//! Sequences never block: the runner is advanced with the frame delta and
//! drained for the steps that came due. Starting a sequence cancels the
//! previous one before it can emit again.

use serde::{Deserialize, Serialize};
use tracing::debug;

use bossroom_common::{direction_from_deg, EntityId, Vec2};

use crate::hit_resolver::layers;
use crate::projectile::{Projectile, MIN_SPEED};

/// Slack when comparing elapsed time against step deadlines.
const STEP_EPSILON: f32 = 1e-4;

// ============================================================================
// Pure generators
// ============================================================================

/// `count` directions evenly spaced around the circle, starting at
/// `angle_offset_deg`. A zero count is treated as one.
pub fn radial_burst(
    count: u32,
    angle_offset_deg: f32,
) -> impl ExactSizeIterator<Item = Vec2> + Clone {
    let count = count.max(1);
    let slice = 360.0 / count as f32;
    (0..count).map(move |i| direction_from_deg(angle_offset_deg + i as f32 * slice))
}

/// `count` directions spanning `total_angle_deg`, centered on
/// `target_direction`. A single shot goes exactly along the target
/// direction; a zero target direction aims along +x.
pub fn aimed_spread(
    count: u32,
    total_angle_deg: f32,
    target_direction: Vec2,
) -> impl ExactSizeIterator<Item = Vec2> + Clone {
    let count = count.max(1);
    let forward = target_direction.try_normalize().unwrap_or(Vec2::X);
    (0..count).map(move |i| {
        // count == 1 would divide by zero below.
        let t = if count == 1 {
            0.0
        } else {
            i as f32 / (count - 1) as f32 - 0.5
        };
        let angle = t * total_angle_deg;
        if angle == 0.0 {
            forward
        } else {
            Vec2::from_angle(angle.to_radians()).rotate(forward)
        }
    })
}

// ============================================================================
// Sequences
// ============================================================================

/// Repeated radial bursts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RadialWaves {
    /// Bullets per wave.
    pub count: u32,
    /// Number of waves.
    pub waves: u32,
    /// Seconds between waves.
    pub interval: f32,
    /// Extra speed added per wave.
    pub speed_increment: f32,
    /// Rotate each wave by half a slice.
    pub phase_shift: bool,
    /// Angle of the first bullet of the first wave.
    pub angle_offset: f32,
}

/// One bullet per step, turning by a fixed angle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spiral {
    /// Number of shots.
    pub total_shots: u32,
    /// Degrees turned per shot.
    pub step_deg: f32,
    /// Seconds between shots.
    pub interval: f32,
    /// Angle of the first shot.
    pub start_deg: f32,
}

/// A multi-step pattern.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PatternSequence {
    /// Radial waves.
    RadialWaves(RadialWaves),
    /// Spiral.
    Spiral(Spiral),
}

/// One emission of a sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternStep {
    /// Step index within the sequence.
    pub index: u32,
    /// Directions fired this step.
    pub directions: Vec<Vec2>,
    /// Speed added on top of the base bullet speed.
    pub speed_bonus: f32,
}

impl PatternSequence {
    /// Number of steps.
    #[must_use]
    pub fn steps(&self) -> u32 {
        match self {
            Self::RadialWaves(w) => w.waves.max(1),
            Self::Spiral(s) => s.total_shots.max(1),
        }
    }

    /// Seconds between steps.
    #[must_use]
    pub fn interval(&self) -> f32 {
        match self {
            Self::RadialWaves(w) => w.interval.max(0.0),
            Self::Spiral(s) => s.interval.max(0.0),
        }
    }

    /// Computes step `index`.
    #[must_use]
    pub fn step(&self, index: u32) -> PatternStep {
        match self {
            Self::RadialWaves(w) => {
                let count = w.count.max(1);
                let shift = if w.phase_shift {
                    index as f32 * 180.0 / count as f32
                } else {
                    0.0
                };
                PatternStep {
                    index,
                    directions: radial_burst(count, w.angle_offset + shift).collect(),
                    speed_bonus: index as f32 * w.speed_increment,
                }
            },
            Self::Spiral(s) => PatternStep {
                index,
                directions: vec![direction_from_deg(s.start_deg + index as f32 * s.step_deg)],
                speed_bonus: 0.0,
            },
        }
    }
}

#[derive(Debug, Clone)]
struct RunningSequence {
    sequence: PatternSequence,
    emitted: u32,
    elapsed: f32,
    generation: u64,
}

/// Runs at most one pattern sequence at a time.
#[derive(Debug, Clone, Default)]
pub struct PatternRunner {
    active: Option<RunningSequence>,
    generation: u64,
}

impl PatternRunner {
    /// Creates an idle runner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts `sequence`, cancelling any sequence already in flight.
    /// Returns the new generation number.
    pub fn start(&mut self, sequence: PatternSequence) -> u64 {
        self.cancel();
        self.generation += 1;
        self.active = Some(RunningSequence {
            sequence,
            emitted: 0,
            elapsed: 0.0,
            generation: self.generation,
        });
        debug!(generation = self.generation, "pattern sequence started");
        self.generation
    }

    /// Cancels the sequence in flight. Returns whether one was running.
    pub fn cancel(&mut self) -> bool {
        match self.active.take() {
            Some(running) => {
                debug!(
                    generation = running.generation,
                    emitted = running.emitted,
                    "pattern sequence cancelled"
                );
                true
            },
            None => false,
        }
    }

    /// Advances the sequence clock.
    pub fn advance(&mut self, dt: f32) {
        if let Some(running) = self.active.as_mut() {
            running.elapsed += dt.max(0.0);
        }
    }

    /// Returns the steps that are due, in order.
    pub fn drain_due(&mut self) -> Vec<PatternStep> {
        let mut due = Vec::new();
        let Some(running) = self.active.as_mut() else {
            return due;
        };

        let steps = running.sequence.steps();
        let interval = running.sequence.interval();
        while running.emitted < steps
            && running.elapsed + STEP_EPSILON >= running.emitted as f32 * interval
        {
            due.push(running.sequence.step(running.emitted));
            running.emitted += 1;
        }

        if running.emitted >= steps {
            self.active = None;
        }
        due
    }

    /// Whether a sequence is in flight.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Generation of the latest started sequence.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

// ============================================================================
// Spawner
// ============================================================================

/// Pattern a boss fires when its bullet hell peaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HellPattern {
    /// One radial ring.
    #[default]
    RadialBurst,
    /// Several interleaved rings.
    RadialWaves,
    /// Rotating single shots.
    Spiral,
    /// Fan aimed at the target.
    AimedSpread,
}

/// Bullet spawner tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulletSpawnerConfig {
    // === Bullet ===
    /// Base bullet speed.
    pub bullet_speed: f32,
    /// Damage per bullet.
    pub bullet_damage: i32,
    /// Bullet lifetime (seconds).
    pub bullet_life: f32,
    /// Bullet collision radius.
    pub bullet_radius: f32,
    /// Distance from the center bullets appear at.
    pub spawn_radius: f32,
    /// Destroy bullets on their first hit.
    pub destroy_on_hit: bool,

    // === Radial ===
    /// Bullets per ring.
    pub radial_count: u32,
    /// Angle of the first bullet (degrees).
    pub angle_offset: f32,

    // === Waves ===
    /// Number of rings.
    pub waves: u32,
    /// Seconds between rings.
    pub wave_interval: f32,
    /// Speed added per ring.
    pub wave_speed_add: f32,
    /// Interleave successive rings.
    pub phase_shift: bool,

    // === Spiral ===
    /// Number of spiral shots.
    pub spiral_count: u32,
    /// Degrees per spiral shot.
    pub spiral_step_deg: f32,
    /// Seconds between spiral shots.
    pub spiral_interval: f32,
    /// First spiral angle.
    pub spiral_start_deg: f32,

    // === Aimed spread ===
    /// Bullets in the fan.
    pub spread_count: u32,
    /// Total fan angle (degrees).
    pub spread_angle: f32,
}

impl Default for BulletSpawnerConfig {
    fn default() -> Self {
        Self {
            bullet_speed: 7.0,
            bullet_damage: 8,
            bullet_life: 6.0,
            bullet_radius: 0.15,
            spawn_radius: 0.0,
            destroy_on_hit: true,
            radial_count: 24,
            angle_offset: 0.0,
            waves: 3,
            wave_interval: 0.15,
            wave_speed_add: 1.5,
            phase_shift: true,
            spiral_count: 36,
            spiral_step_deg: 12.0,
            spiral_interval: 0.05,
            spiral_start_deg: 0.0,
            spread_count: 5,
            spread_angle: 30.0,
        }
    }
}

impl BulletSpawnerConfig {
    /// Clamp values to valid ranges.
    pub fn validate(&mut self) {
        self.bullet_speed = self.bullet_speed.max(MIN_SPEED);
        self.bullet_damage = self.bullet_damage.max(0);
        self.bullet_life = self.bullet_life.clamp(0.05, 60.0);
        self.bullet_radius = self.bullet_radius.clamp(0.01, 5.0);
        self.spawn_radius = self.spawn_radius.max(0.0);
        self.radial_count = self.radial_count.clamp(1, 512);
        self.waves = self.waves.clamp(1, 64);
        self.wave_interval = self.wave_interval.max(0.0);
        self.spiral_count = self.spiral_count.clamp(1, 1024);
        self.spiral_interval = self.spiral_interval.max(0.0);
        self.spread_count = self.spread_count.clamp(1, 128);
        self.spread_angle = self.spread_angle.clamp(0.0, 360.0);
    }

    /// Radial waves with this tuning.
    #[must_use]
    pub fn radial_waves(&self) -> RadialWaves {
        RadialWaves {
            count: self.radial_count,
            waves: self.waves,
            interval: self.wave_interval,
            speed_increment: self.wave_speed_add,
            phase_shift: self.phase_shift,
            angle_offset: self.angle_offset,
        }
    }

    /// Spiral with this tuning.
    #[must_use]
    pub fn spiral(&self) -> Spiral {
        Spiral {
            total_shots: self.spiral_count,
            step_deg: self.spiral_step_deg,
            interval: self.spiral_interval,
            start_deg: self.spiral_start_deg,
        }
    }
}

/// One bullet to spawn, relative to the spawner's center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BulletSpawn {
    /// Unit travel direction.
    pub direction: Vec2,
    /// Distance from the center along `direction`.
    pub spawn_offset: f32,
    /// Multiplier on the base bullet speed.
    pub speed_multiplier: f32,
}

/// Turns patterns into bullets. Owns the pattern runner.
#[derive(Debug, Clone)]
pub struct BulletSpawner {
    config: BulletSpawnerConfig,
    runner: PatternRunner,
    enabled: bool,
}

impl Default for BulletSpawner {
    fn default() -> Self {
        Self::new(BulletSpawnerConfig::default())
    }
}

impl BulletSpawner {
    /// Creates an enabled spawner.
    #[must_use]
    pub fn new(config: BulletSpawnerConfig) -> Self {
        Self {
            config,
            runner: PatternRunner::new(),
            enabled: true,
        }
    }

    /// Spawner tuning.
    #[must_use]
    pub fn config(&self) -> &BulletSpawnerConfig {
        &self.config
    }

    /// Whether the spawner may fire.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enables or disables firing. Disabling cancels any sequence.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.runner.cancel();
        }
    }

    /// Whether a sequence is in flight.
    #[must_use]
    pub fn is_sequence_running(&self) -> bool {
        self.runner.is_running()
    }

    fn spawns(&self, directions: impl Iterator<Item = Vec2>, speed_bonus: f32) -> Vec<BulletSpawn> {
        let base = self.config.bullet_speed.max(MIN_SPEED);
        let speed_multiplier = (base + speed_bonus) / base;
        directions
            .map(|direction| BulletSpawn {
                direction,
                spawn_offset: self.config.spawn_radius,
                speed_multiplier,
            })
            .collect()
    }

    /// One radial ring, immediately.
    pub fn radial_burst(&self) -> Vec<BulletSpawn> {
        if !self.enabled {
            return Vec::new();
        }
        self.spawns(radial_burst(self.config.radial_count, self.config.angle_offset), 0.0)
    }

    /// A fan toward `aim`, immediately.
    pub fn aimed_spread(&self, aim: Vec2) -> Vec<BulletSpawn> {
        if !self.enabled {
            return Vec::new();
        }
        self.spawns(
            aimed_spread(self.config.spread_count, self.config.spread_angle, aim),
            0.0,
        )
    }

    /// Starts a sequence, replacing any in flight.
    pub fn start(&mut self, sequence: PatternSequence) -> u64 {
        if !self.enabled {
            return self.runner.generation();
        }
        self.runner.start(sequence)
    }

    /// Fires `pattern`. Sequences start now and emit their first step now.
    pub fn fire(&mut self, pattern: HellPattern, aim: Vec2) -> Vec<BulletSpawn> {
        match pattern {
            HellPattern::RadialBurst => self.radial_burst(),
            HellPattern::AimedSpread => self.aimed_spread(aim),
            HellPattern::RadialWaves => {
                self.start(PatternSequence::RadialWaves(self.config.radial_waves()));
                self.drain_due()
            },
            HellPattern::Spiral => {
                self.start(PatternSequence::Spiral(self.config.spiral()));
                self.drain_due()
            },
        }
    }

    /// Advances the sequence clock.
    pub fn advance(&mut self, dt: f32) {
        self.runner.advance(dt);
    }

    /// Bullets from every step that came due.
    pub fn drain_due(&mut self) -> Vec<BulletSpawn> {
        if !self.enabled {
            return Vec::new();
        }
        let steps = self.runner.drain_due();
        steps
            .into_iter()
            .flat_map(|step| self.spawns(step.directions.into_iter(), step.speed_bonus))
            .collect()
    }

    /// Cancels the sequence in flight.
    pub fn cancel(&mut self) -> bool {
        self.runner.cancel()
    }

    /// Builds the projectile for `spawn` around `center`.
    #[must_use]
    pub fn projectile(&self, spawn: &BulletSpawn, center: Vec2, owner: EntityId) -> Projectile {
        let speed = (self.config.bullet_speed * spawn.speed_multiplier).max(MIN_SPEED);
        Projectile::new(
            center + spawn.direction * spawn.spawn_offset,
            spawn.direction,
            speed,
            self.config.bullet_damage,
        )
        .with_owner(owner)
        .with_lifetime(self.config.bullet_life)
        .with_radius(self.config.bullet_radius)
        .with_layer(layers::BOSS_PROJECTILE)
        .with_hittable_layers(layers::PLAYER)
        .with_destroy_on_hit(self.config.destroy_on_hit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bossroom_common::direction_to_deg;
    use proptest::prelude::*;

    fn degrees(v: Vec2) -> f32 {
        direction_to_deg(v).rem_euclid(360.0)
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_radial_burst_24() {
        let dirs: Vec<_> = radial_burst(24, 0.0).collect();
        assert_eq!(dirs.len(), 24);
        for (i, d) in dirs.iter().enumerate() {
            let expected = i as f32 * 15.0;
            let got = degrees(*d);
            // 0 and 360 are the same direction.
            assert!(close(got, expected) || close(got, expected + 360.0), "{i}: {got}");
        }
    }

    #[test]
    fn test_radial_burst_zero_count() {
        assert_eq!(radial_burst(0, 90.0).len(), 1);
    }

    #[test]
    fn test_aimed_spread_single_is_exact() {
        let d = Vec2::new(0.6, 0.8);
        let dirs: Vec<_> = aimed_spread(1, 30.0, d).collect();
        assert_eq!(dirs, vec![d]);
    }

    #[test]
    fn test_aimed_spread_five_over_forty() {
        let dirs: Vec<_> = aimed_spread(5, 40.0, Vec2::X).collect();
        let angles: Vec<f32> = dirs.iter().map(|d| direction_to_deg(*d)).collect();
        let expected = [-20.0, -10.0, 0.0, 10.0, 20.0];
        for (got, want) in angles.iter().zip(expected) {
            assert!(close(*got, want), "{got} != {want}");
        }
        assert_eq!(dirs[2], Vec2::X);
    }

    #[test]
    fn test_aimed_spread_zero_target() {
        let dirs: Vec<_> = aimed_spread(1, 30.0, Vec2::ZERO).collect();
        assert_eq!(dirs, vec![Vec2::X]);
    }

    #[test]
    fn test_waves_phase_shift_and_speed() {
        let seq = PatternSequence::RadialWaves(RadialWaves {
            count: 4,
            waves: 3,
            interval: 0.15,
            speed_increment: 1.5,
            phase_shift: true,
            angle_offset: 0.0,
        });
        let second = seq.step(1);
        assert!(close(degrees(second.directions[0]), 45.0));
        assert!(close(second.speed_bonus, 1.5));
        let third = seq.step(2);
        assert!(close(degrees(third.directions[0]), 90.0));
        assert!(close(third.speed_bonus, 3.0));
    }

    #[test]
    fn test_spiral_steps() {
        let seq = PatternSequence::Spiral(Spiral {
            total_shots: 36,
            step_deg: 12.0,
            interval: 0.05,
            start_deg: 30.0,
        });
        assert_eq!(seq.steps(), 36);
        let step = seq.step(2);
        assert_eq!(step.directions.len(), 1);
        assert!(close(degrees(step.directions[0]), 54.0));
    }

    #[test]
    fn test_runner_emits_on_schedule() {
        let mut runner = PatternRunner::new();
        runner.start(PatternSequence::RadialWaves(RadialWaves {
            count: 8,
            waves: 3,
            interval: 0.15,
            speed_increment: 1.5,
            phase_shift: false,
            angle_offset: 0.0,
        }));

        assert_eq!(runner.drain_due().len(), 1);
        runner.advance(0.1);
        assert!(runner.drain_due().is_empty());
        runner.advance(0.05);
        assert_eq!(runner.drain_due()[0].index, 1);
        runner.advance(0.15);
        assert_eq!(runner.drain_due()[0].index, 2);
        assert!(!runner.is_running());
    }

    #[test]
    fn test_runner_catches_up_on_long_frames() {
        let mut runner = PatternRunner::new();
        runner.start(PatternSequence::Spiral(Spiral {
            total_shots: 5,
            step_deg: 10.0,
            interval: 0.05,
            start_deg: 0.0,
        }));
        runner.advance(1.0);
        let steps = runner.drain_due();
        assert_eq!(steps.iter().map(|s| s.index).collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_restart_cancels_prior_sequence() {
        let waves = PatternSequence::RadialWaves(RadialWaves {
            count: 24,
            waves: 3,
            interval: 0.15,
            speed_increment: 1.5,
            phase_shift: true,
            angle_offset: 0.0,
        });
        let mut runner = PatternRunner::new();
        let first = runner.start(waves);
        let mut emitted = runner.drain_due().len();
        runner.advance(0.1);
        emitted += runner.drain_due().len();
        assert_eq!(emitted, 1);

        let second = runner.start(waves);
        assert!(second > first);
        for _ in 0..20 {
            emitted += runner.drain_due().len();
            runner.advance(0.05);
        }
        // One step from the cancelled run plus the full new run.
        assert_eq!(emitted, 1 + 3);
    }

    #[test]
    fn test_cancel_stops_emission() {
        let mut runner = PatternRunner::new();
        runner.start(PatternSequence::Spiral(Spiral {
            total_shots: 10,
            step_deg: 12.0,
            interval: 0.05,
            start_deg: 0.0,
        }));
        runner.drain_due();
        assert!(runner.cancel());
        runner.advance(1.0);
        assert!(runner.drain_due().is_empty());
        assert!(!runner.cancel());
    }

    #[test]
    fn test_spawner_waves_speed_multiplier() {
        let mut spawner = BulletSpawner::new(BulletSpawnerConfig::default());
        let first = spawner.fire(HellPattern::RadialWaves, Vec2::X);
        assert_eq!(first.len(), 24);
        assert!(close(first[0].speed_multiplier, 1.0));

        spawner.advance(0.15);
        let second = spawner.drain_due();
        assert_eq!(second.len(), 24);
        let p = spawner.projectile(&second[0], Vec2::ZERO, EntityId::from_raw(1));
        assert!(close(p.speed, 8.5));
        assert_eq!(p.damage, 8);
        assert_eq!(p.owner, Some(EntityId::from_raw(1)));
    }

    #[test]
    fn test_spawner_spawn_radius_offsets_origin() {
        let config = BulletSpawnerConfig {
            spawn_radius: 0.5,
            ..BulletSpawnerConfig::default()
        };
        let spawner = BulletSpawner::new(config);
        let spawns = spawner.aimed_spread(Vec2::Y);
        assert_eq!(spawns.len(), 5);
        let p = spawner.projectile(&spawns[2], Vec2::new(1.0, 1.0), EntityId::from_raw(1));
        assert!(close(p.position.x, 1.0));
        assert!(close(p.position.y, 1.5));
    }

    #[test]
    fn test_disabled_spawner_is_silent() {
        let mut spawner = BulletSpawner::new(BulletSpawnerConfig::default());
        spawner.fire(HellPattern::Spiral, Vec2::X);
        assert!(spawner.is_sequence_running());

        spawner.set_enabled(false);
        assert!(!spawner.is_sequence_running());
        assert!(spawner.fire(HellPattern::RadialBurst, Vec2::X).is_empty());
        assert!(spawner.fire(HellPattern::Spiral, Vec2::X).is_empty());
    }

    #[test]
    fn test_config_validate() {
        let mut config = BulletSpawnerConfig {
            bullet_speed: -1.0,
            radial_count: 0,
            waves: 0,
            spread_angle: 720.0,
            ..BulletSpawnerConfig::default()
        };
        config.validate();
        assert_eq!(config.bullet_speed, MIN_SPEED);
        assert_eq!(config.radial_count, 1);
        assert_eq!(config.waves, 1);
        assert_eq!(config.spread_angle, 360.0);
    }

    proptest! {
        #[test]
        fn prop_radial_burst_unit_and_even(count in 1u32..64, offset in -360.0f32..360.0) {
            let dirs: Vec<_> = radial_burst(count, offset).collect();
            prop_assert_eq!(dirs.len(), count as usize);
            let slice = 360.0 / count as f32;
            for pair in dirs.windows(2) {
                prop_assert!((pair[0].length() - 1.0).abs() < 1e-4);
                let gap = bossroom_common::angle_between_deg(pair[0], pair[1]);
                prop_assert!((gap - slice.min(360.0 - slice)).abs() < 1e-2);
            }
        }

        #[test]
        fn prop_aimed_spread_symmetric(
            count in 2u32..16,
            total in 0.0f32..170.0,
            aim in 0.0f32..360.0,
        ) {
            let forward = direction_from_deg(aim);
            let dirs: Vec<_> = aimed_spread(count, total, forward).collect();
            let first = bossroom_common::angle_between_deg(forward, dirs[0]);
            let last = bossroom_common::angle_between_deg(forward, dirs[dirs.len() - 1]);
            prop_assert!((first - total / 2.0).abs() < 1e-2);
            prop_assert!((last - total / 2.0).abs() < 1e-2);
        }
    }
}
