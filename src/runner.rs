//! Run state machine: owns the run clock, phase sequencing, accumulated
//! results, the bounded sample buffer and the cycle history.
//!
//! The machine is advanced by `tick(now)` on a fixed cadence while a run is
//! active. Time is injected: the tick itself never reads the wall clock, so
//! tests drive it with synthetic instants. Everything the driver renders is
//! a read-only projection of this state.

use crate::model::{
    CycleInterval, MeasurementResult, Phase, RecordStatus, RunConfig, RunMode, SpeedSample,
    TestRecord, DEFAULT_MONITOR_DURATION,
};
use crate::profiles::{self, ProfileCategory};
use crate::synth;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};
use time::OffsetDateTime;

/// Tick cadence the driver is expected to run at.
pub const TICK: Duration = Duration::from_millis(50);

const PING_DURATION: Duration = Duration::from_millis(2000);
const DOWNLOAD_DURATION: Duration = Duration::from_millis(5000);
const UPLOAD_DURATION: Duration = Duration::from_millis(5000);
/// Expected quick-run length: ping + download + upload.
const QUICK_RUN_DURATION: Duration = Duration::from_millis(2000 + 5000 + 5000);

/// Most-recent samples kept for the live chart; older ones are evicted.
const SAMPLE_CAP: usize = 80;

#[derive(Debug, Clone)]
struct RunClock {
    phase: Phase,
    phase_started: Instant,
    run_started: Instant,
    running: bool,
    total_budget: Duration,
    time_remaining: Duration,
    next_cycle_in: Duration,
}

impl RunClock {
    fn new(now: Instant) -> Self {
        Self {
            phase: Phase::Idle,
            phase_started: now,
            run_started: now,
            running: false,
            total_budget: Duration::ZERO,
            time_remaining: Duration::ZERO,
            next_cycle_in: Duration::ZERO,
        }
    }
}

pub struct TestRunner<R: Rng = StdRng> {
    cfg: RunConfig,
    mode: RunMode,
    category: ProfileCategory,
    clock: RunClock,
    results: MeasurementResult,
    current_mbps: f64,
    progress: f64,
    samples: Vec<SpeedSample>,
    records: Vec<TestRecord>,
    next_record_id: u64,
    rng: R,
}

impl TestRunner<StdRng> {
    pub fn new(cfg: RunConfig, mode: RunMode) -> Self {
        Self::with_rng(cfg, mode, StdRng::from_entropy())
    }
}

impl<R: Rng> TestRunner<R> {
    pub fn with_rng(cfg: RunConfig, mode: RunMode, rng: R) -> Self {
        let category = profiles::find(&cfg.profile_id)
            .map(|p| p.category)
            .unwrap_or(ProfileCategory::General);
        Self {
            cfg,
            mode,
            category,
            clock: RunClock::new(Instant::now()),
            results: MeasurementResult::default(),
            current_mbps: 0.0,
            progress: 0.0,
            samples: Vec::new(),
            records: Vec::new(),
            next_record_id: 0,
            rng,
        }
    }

    pub fn phase(&self) -> Phase {
        self.clock.phase
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn config(&self) -> &RunConfig {
        &self.cfg
    }

    pub fn results(&self) -> &MeasurementResult {
        &self.results
    }

    pub fn current_mbps(&self) -> f64 {
        self.current_mbps
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn samples(&self) -> &[SpeedSample] {
        &self.samples
    }

    pub fn records(&self) -> &[TestRecord] {
        &self.records
    }

    pub fn time_remaining(&self) -> Duration {
        self.clock.time_remaining
    }

    pub fn next_cycle_in(&self) -> Duration {
        self.clock.next_cycle_in
    }

    pub fn is_running(&self) -> bool {
        self.clock.running
    }

    /// Begin a run. Ignored unless the machine is idle or a previous run has
    /// completed; the configuration is frozen for the run's lifetime.
    pub fn start(&mut self, now: Instant) {
        if !self.clock.phase.is_restartable() {
            return;
        }

        self.results = MeasurementResult::default();
        self.samples.clear();
        self.current_mbps = 0.0;
        self.progress = 0.0;

        if self.mode == RunMode::Monitoring {
            self.records.clear();
            self.next_record_id = 0;
            let budget = if self.cfg.duration.is_zero() {
                DEFAULT_MONITOR_DURATION
            } else {
                self.cfg.duration
            };
            self.clock.total_budget = budget;
            self.clock.time_remaining = budget;
            self.clock.next_cycle_in = Duration::ZERO;
        }

        self.clock.phase = Phase::Ping;
        self.clock.phase_started = now;
        self.clock.run_started = now;
        self.clock.running = true;
    }

    /// Cancel synchronously: the phase is forced back to idle and the next
    /// tick becomes a no-op.
    pub fn stop(&mut self) {
        self.clock.phase = Phase::Idle;
        self.clock.running = false;
        self.current_mbps = 0.0;
    }

    /// Switch run mode and reseed duration/interval defaults from the new
    /// mode's default profile. Rejected while a run is active.
    pub fn set_mode(&mut self, mode: RunMode) -> bool {
        if !self.clock.phase.is_restartable() {
            return false;
        }
        self.mode = mode;
        let default = profiles::default_for(mode);
        self.cfg.profile_id = default.id.to_string();
        self.cfg.duration = default.duration;
        self.cfg.interval = default.interval;
        self.category = default.category;
        self.clock.phase = Phase::Idle;
        self.results = MeasurementResult::default();
        self.progress = 0.0;
        true
    }

    /// Select a profile; non-manual profiles also reseed duration/interval.
    /// Rejected while a run is active or for unknown ids.
    pub fn set_profile(&mut self, id: &str) -> bool {
        if !self.clock.phase.is_restartable() {
            return false;
        }
        let Some(profile) = profiles::find(id) else {
            return false;
        };
        self.cfg.profile_id = profile.id.to_string();
        self.category = profile.category;
        if profile.connection != profiles::ConnectionType::Manual {
            self.cfg.duration = profile.duration;
            self.cfg.interval = profile.interval;
        }
        true
    }

    /// Advance the machine by one tick. Per-tick order: progress recompute,
    /// then the monitoring budget check (exhaustion ends the run regardless
    /// of phase), then the waiting countdown (which replaces simulation for
    /// that tick), then phase simulation.
    pub fn tick(&mut self, now: Instant) {
        if !self.clock.running {
            return;
        }

        self.update_progress(now);

        if self.mode == RunMode::Monitoring {
            if self.clock.time_remaining.is_zero() {
                self.clock.phase = Phase::Complete;
                self.clock.running = false;
                self.progress = 100.0;
                return;
            }
            self.clock.time_remaining = self.clock.time_remaining.saturating_sub(TICK);

            if self.clock.phase == Phase::Waiting {
                self.clock.next_cycle_in = self.clock.next_cycle_in.saturating_sub(TICK);
                if self.clock.next_cycle_in.is_zero() {
                    self.begin_cycle(now);
                }
                return;
            }
        }

        let elapsed = now.saturating_duration_since(self.clock.phase_started);
        match self.clock.phase {
            Phase::Ping => self.tick_ping(now, elapsed),
            Phase::Download => self.tick_download(now, elapsed),
            Phase::Upload => self.tick_upload(now, elapsed),
            _ => {}
        }
    }

    fn update_progress(&mut self, now: Instant) {
        match self.mode {
            RunMode::Quick => {
                let elapsed = now
                    .saturating_duration_since(self.clock.run_started)
                    .as_secs_f64();
                self.progress = (elapsed / QUICK_RUN_DURATION.as_secs_f64() * 100.0).min(100.0);
            }
            RunMode::Monitoring => {
                let budget = self.clock.total_budget.as_secs_f64();
                if budget > 0.0 {
                    let consumed = budget - self.clock.time_remaining.as_secs_f64();
                    // Held just below 100 until the budget is actually spent.
                    self.progress = (consumed / budget * 100.0).min(99.9);
                }
            }
        }
    }

    fn tick_ping(&mut self, now: Instant, elapsed: Duration) {
        self.results.ping_ms = self.rng.gen_range(25.0..45.0);
        self.results.jitter_ms = self.rng.gen_range(0.0..8.0);
        // Occasional benign loss blip rather than sustained loss.
        self.results.loss_pct = if self.rng.gen::<f64>() > 0.98 {
            self.rng.gen::<f64>()
        } else {
            0.0
        };

        if elapsed >= PING_DURATION {
            self.clock.phase = Phase::Download;
            self.clock.phase_started = now;
        }
    }

    fn tick_download(&mut self, now: Instant, elapsed: Duration) {
        let target = self.category.download_target_mbps();
        let mbps = synth::synthesize(elapsed, target, DOWNLOAD_DURATION, &mut self.rng);
        self.current_mbps = mbps;
        self.results.download_mbps = mbps;
        self.push_sample(now, mbps);

        if elapsed >= DOWNLOAD_DURATION {
            self.clock.phase = Phase::Upload;
            self.clock.phase_started = now;
        }
    }

    fn tick_upload(&mut self, now: Instant, elapsed: Duration) {
        let target = self.category.upload_target_mbps();
        let mbps = synth::synthesize(elapsed, target, UPLOAD_DURATION, &mut self.rng);
        self.current_mbps = mbps;
        self.results.upload_mbps = mbps;
        self.push_sample(now, mbps);

        if elapsed >= UPLOAD_DURATION {
            self.finish_cycle(now);
        }
    }

    fn finish_cycle(&mut self, now: Instant) {
        match self.mode {
            RunMode::Quick => {
                self.clock.phase = Phase::Complete;
                self.clock.running = false;
                self.current_mbps = 0.0;
                self.progress = 100.0;
            }
            RunMode::Monitoring => {
                self.push_record();
                match self.cfg.interval {
                    CycleInterval::Every(interval) => {
                        self.clock.phase = Phase::Waiting;
                        self.clock.next_cycle_in = interval;
                        self.current_mbps = 0.0;
                    }
                    CycleInterval::Continuous => self.begin_cycle(now),
                }
            }
        }
    }

    /// Start the next measurement cycle from reset values.
    fn begin_cycle(&mut self, now: Instant) {
        self.clock.phase = Phase::Ping;
        self.clock.phase_started = now;
        self.results = MeasurementResult::default();
    }

    fn push_record(&mut self) {
        let record = TestRecord {
            id: self.next_record_id,
            timestamp: OffsetDateTime::now_utc(),
            ping_ms: self.results.ping_ms,
            download_mbps: self.results.download_mbps,
            upload_mbps: self.results.upload_mbps,
            status: RecordStatus::classify(&self.results),
        };
        self.next_record_id += 1;
        self.records.push(record);
    }

    fn push_sample(&mut self, now: Instant, mbps: f64) {
        let at_secs = now
            .saturating_duration_since(self.clock.run_started)
            .as_secs_f64();
        self.samples.push(SpeedSample { at_secs, mbps });
        if self.samples.len() > SAMPLE_CAP {
            let excess = self.samples.len() - SAMPLE_CAP;
            self.samples.drain(0..excess);
        }
    }
}
