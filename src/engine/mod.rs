//! Fixed-rate control loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::controller::{HapticController, TickReport};
use crate::error::{HapticError, Result};
use crate::link::RobotLink;

/// Above this rate the arm's transport cannot keep up.
pub const RECOMMENDED_MAX_RATE_HZ: f64 = 400.0;

/// Accepted tick rates.
pub const MIN_RATE_HZ: f64 = 1.0;
pub const MAX_RATE_HZ: f64 = 10_000.0;

/// Configuration for the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlLoopConfig {
    /// Tick rate in Hz. Default: 250.
    pub tick_rate_hz: f64,
    /// Maximum ticks run back to back to catch up after a stall. Default: 4.
    pub max_catchup_ticks: u32,
}

impl Default for ControlLoopConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 250.0,
            max_catchup_ticks: 4,
        }
    }
}

impl ControlLoopConfig {
    pub fn with_rate(mut self, tick_rate_hz: f64) -> Self {
        self.tick_rate_hz = tick_rate_hz;
        self
    }

    /// Tick period.
    ///
    /// Rates outside [`MIN_RATE_HZ`]..=[`MAX_RATE_HZ`] are clamped into
    /// range, and a NaN rate gives the slowest period.
    pub fn period(&self) -> Duration {
        let rate = if self.tick_rate_hz.is_nan() {
            MIN_RATE_HZ
        } else {
            self.tick_rate_hz.clamp(MIN_RATE_HZ, MAX_RATE_HZ)
        };
        Duration::from_secs_f64(1.0 / rate)
    }

    pub fn validate(&self) -> Result<()> {
        if !(MIN_RATE_HZ..=MAX_RATE_HZ).contains(&self.tick_rate_hz) {
            return Err(HapticError::InvalidConfig(format!(
                "tick rate must be within {MIN_RATE_HZ}..={MAX_RATE_HZ} Hz, got {}",
                self.tick_rate_hz
            )));
        }
        if self.max_catchup_ticks == 0 {
            return Err(HapticError::InvalidConfig(
                "max_catchup_ticks must be at least 1".into(),
            ));
        }
        if self.tick_rate_hz > RECOMMENDED_MAX_RATE_HZ {
            warn!(
                rate = self.tick_rate_hz,
                "tick rate above the recommended {RECOMMENDED_MAX_RATE_HZ} Hz"
            );
        }
        Ok(())
    }
}

/// Counters collected over one run of the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopStats {
    pub ticks: u64,
    /// Ticks dropped because the loop fell too far behind.
    pub skipped_ticks: u64,
    /// Ticks that took longer than one period.
    pub overruns: u64,
    pub max_tick_time: Duration,
    pub elapsed: Duration,
}

/// Drives a [`HapticController`] at a fixed rate on the calling thread.
pub struct ControlLoop {
    config: ControlLoopConfig,
    stop: Arc<AtomicBool>,
}

impl ControlLoop {
    pub fn new(config: ControlLoopConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn config(&self) -> &ControlLoopConfig {
        &self.config
    }

    /// Flag that ends [`run`](Self::run) at the next iteration when set.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Tick `controller` until stopped or until `max_duration` elapses.
    ///
    /// Uses a fixed timestep accumulator: every tick sees the same `dt`,
    /// a late iteration runs up to `max_catchup_ticks` ticks, and anything
    /// beyond that is dropped.
    pub fn run<L: RobotLink>(
        &self,
        controller: &mut HapticController<L>,
        max_duration: Option<Duration>,
        mut on_tick: impl FnMut(&TickReport),
    ) -> LoopStats {
        let period = self.config.period();
        let dt = period.as_secs_f32();
        let max_catchup = self.config.max_catchup_ticks;

        let mut stats = LoopStats::default();
        let started = Instant::now();
        let mut last = started;
        let mut accumulator = Duration::ZERO;

        info!(rate = self.config.tick_rate_hz, "control loop running");
        while !self.stop.load(Ordering::Acquire) {
            if max_duration.is_some_and(|limit| started.elapsed() >= limit) {
                break;
            }

            let now = Instant::now();
            accumulator += now - last;
            last = now;

            let mut substeps = 0u32;
            while accumulator >= period && substeps < max_catchup {
                let tick_start = Instant::now();
                let report = controller.tick(dt);
                let took = tick_start.elapsed();

                stats.max_tick_time = stats.max_tick_time.max(took);
                if took > period {
                    stats.overruns += 1;
                    warn!(?took, ?period, "control tick overran its period");
                }
                on_tick(&report);

                accumulator -= period;
                substeps += 1;
                stats.ticks += 1;
            }

            // Clamp accumulator to avoid spiral of death
            if accumulator > period * max_catchup {
                let skipped = (accumulator.as_nanos() / period.as_nanos()) as u64;
                warn!(skipped, "control loop fell behind, dropping ticks");
                stats.skipped_ticks += skipped;
                accumulator = Duration::ZERO;
            }

            if let Some(wait) = period.checked_sub(accumulator) {
                thread::sleep(wait);
            }
        }

        stats.elapsed = started.elapsed();
        info!(
            ticks = stats.ticks,
            skipped = stats.skipped_ticks,
            overruns = stats.overruns,
            "control loop stopped"
        );
        stats
    }
}
