//! Fixed-rate tick clock for the Mudlink dispatcher.
//!
//! The dispatcher sweeps every connection and receiver once per tick. The
//! [`TickScheduler`] decides *when* a tick happens and keeps an eye on how
//! much of each tick's budget the sweep used:
//!
//! ```ignore
//! let mut ticks = TickScheduler::new(TickConfig::default());
//! loop {
//!     let info = ticks.wait_for_tick().await;
//!     dispatcher.tick();
//!     ticks.record_tick_end();
//! }
//! ```
//!
//! A late wake-up never triggers a burst of catch-up ticks: missed ticks
//! are counted, and the next one is scheduled a full period from now.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tick rate and budget thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// Ticks per second, clamped to `1..=MAX_TICK_RATE_HZ`.
    pub tick_rate_hz: u32,
    /// Fraction of the tick budget (0.0–1.0) above which a warning is logged.
    pub budget_warn_threshold: f64,
    /// Fraction of the tick budget above which the tick counts as critical.
    pub budget_critical_threshold: f64,
    /// Track average and peak tick time.
    pub metrics_enabled: bool,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 20,
            budget_warn_threshold: 0.80,
            budget_critical_threshold: 1.0,
            metrics_enabled: true,
        }
    }
}

impl TickConfig {
    /// Highest supported tick rate.
    pub const MAX_TICK_RATE_HZ: u32 = 128;

    /// Default config at the given rate.
    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self {
            tick_rate_hz,
            ..Self::default()
        }
    }

    /// Brings every field into range.
    ///
    /// The rate is clamped to `1..=MAX_TICK_RATE_HZ`, the thresholds to
    /// `0.0..=1.0`, and the warn threshold never exceeds the critical one.
    pub fn validated(mut self) -> Self {
        let rate = self.tick_rate_hz.clamp(1, Self::MAX_TICK_RATE_HZ);
        if rate != self.tick_rate_hz {
            warn!(requested = self.tick_rate_hz, using = rate, "tick rate out of range");
            self.tick_rate_hz = rate;
        }
        if self.budget_critical_threshold.is_nan() {
            self.budget_critical_threshold = 1.0;
        }
        self.budget_critical_threshold = self.budget_critical_threshold.clamp(0.0, 1.0);
        self.budget_warn_threshold = self
            .budget_warn_threshold
            .clamp(0.0, self.budget_critical_threshold);
        self
    }

    /// Length of one tick at the configured rate (after clamping).
    pub fn tick_duration(&self) -> Duration {
        let rate = self.tick_rate_hz.clamp(1, Self::MAX_TICK_RATE_HZ);
        Duration::from_secs_f64(1.0 / f64::from(rate))
    }
}

// ---------------------------------------------------------------------------
// Per-tick info and metrics
// ---------------------------------------------------------------------------

/// What [`TickScheduler::wait_for_tick`] hands back for each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickInfo {
    /// Tick number, starting at 1.
    pub tick: u64,
    /// The fixed tick length, regardless of how late the tick fired.
    pub dt: Duration,
    /// The tick woke up more than 10% of a period late.
    pub overrun: bool,
    /// Whole periods missed before this tick.
    pub ticks_skipped: u64,
}

/// Running totals kept by the scheduler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickMetrics {
    pub total_ticks: u64,
    pub total_overruns: u64,
    pub total_skipped: u64,
    /// Exponential moving average of the work time (α = 0.1).
    pub avg_tick_time: Duration,
    pub max_tick_time: Duration,
    /// Work time of the last tick over the budget. Above 1.0 means late.
    pub budget_utilization: f64,
}

const EMA_ALPHA: f64 = 0.1;

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Paces the dispatcher at a fixed rate.
#[derive(Debug)]
pub struct TickScheduler {
    config: TickConfig,
    period: Duration,
    tick_count: u64,
    next_tick: Instant,
    /// When the current tick's work began; taken by `record_tick_end`.
    work_started: Option<Instant>,
    paused: bool,
    metrics: TickMetrics,
}

impl TickScheduler {
    /// Creates a scheduler whose first tick is one period from now.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        let period = config.tick_duration();
        debug!(
            rate_hz = config.tick_rate_hz,
            period_ms = period.as_secs_f64() * 1000.0,
            "tick scheduler created"
        );

        Self {
            config,
            period,
            tick_count: 0,
            next_tick: Instant::now() + period,
            work_started: None,
            paused: false,
            metrics: TickMetrics::default(),
        }
    }

    /// Waits for the next tick.
    ///
    /// While paused this never resolves; use it inside `tokio::select!`
    /// if something else must stay responsive.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        if self.paused {
            std::future::pending::<()>().await;
        }

        let due = self.next_tick;
        time::sleep_until(due).await;

        let now = Instant::now();
        let late_by = now.saturating_duration_since(due);
        let overrun = late_by > self.period / 10;
        let ticks_skipped = if overrun {
            (late_by.as_nanos() / self.period.as_nanos()) as u64
        } else {
            0
        };
        if ticks_skipped > 0 {
            warn!(
                tick = self.tick_count + 1,
                skipped = ticks_skipped,
                late_ms = late_by.as_secs_f64() * 1000.0,
                "dispatcher fell behind, skipping ticks"
            );
        }

        self.tick_count += 1;
        self.next_tick = now + self.period;
        self.work_started = Some(now);
        self.metrics.total_ticks += 1;
        self.metrics.total_skipped += ticks_skipped;
        if overrun {
            self.metrics.total_overruns += 1;
        }
        trace!(tick = self.tick_count, overrun, "tick");

        TickInfo {
            tick: self.tick_count,
            dt: self.period,
            overrun,
            ticks_skipped,
        }
    }

    /// Marks the end of the current tick's work.
    ///
    /// Updates budget utilization and metrics, and warns when the work
    /// crossed a threshold. Does nothing if no tick is in progress.
    pub fn record_tick_end(&mut self) {
        let Some(started) = self.work_started.take() else {
            return;
        };
        let elapsed = started.elapsed();
        let utilization = elapsed.as_secs_f64() / self.period.as_secs_f64();
        self.metrics.budget_utilization = utilization;

        if utilization >= self.config.budget_critical_threshold {
            warn!(
                tick = self.tick_count,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                utilization_pct = format!("{:.1}", utilization * 100.0),
                "tick exceeded its budget"
            );
        } else if utilization >= self.config.budget_warn_threshold {
            warn!(
                tick = self.tick_count,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                utilization_pct = format!("{:.1}", utilization * 100.0),
                "tick close to its budget"
            );
        }

        if self.config.metrics_enabled {
            self.metrics.max_tick_time = self.metrics.max_tick_time.max(elapsed);
            let avg = self.metrics.avg_tick_time.as_secs_f64();
            self.metrics.avg_tick_time = Duration::from_secs_f64(
                avg * (1.0 - EMA_ALPHA) + elapsed.as_secs_f64() * EMA_ALPHA,
            );
        }
    }

    /// Stops ticking until [`resume`](Self::resume).
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            debug!(tick = self.tick_count, "tick scheduler paused");
        }
    }

    /// Restarts ticking one period from now, without catching up on the
    /// time spent paused.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.next_tick = Instant::now() + self.period;
            debug!(tick = self.tick_count, "tick scheduler resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Ticks fired so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// The effective (clamped) rate.
    pub fn tick_rate_hz(&self) -> u32 {
        self.config.tick_rate_hz
    }

    pub fn tick_duration(&self) -> Duration {
        self.period
    }

    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }
}
