//! Fixed-interval scheduling of `observe` calls.
//!
//! Ticks never overlap: each one runs to completion before the next is
//! scheduled, and the sleep only covers whatever is left of the period.

use std::ops::ControlFlow;
use std::thread;
use std::time::{Duration, Instant};

use log::debug;

use crate::config::OverlayConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Poller {
    interval: Duration,
    initial_delay: Duration,
    max_ticks: Option<usize>,
}

impl Poller {
    pub fn new(interval: Duration, initial_delay: Duration) -> Self {
        Self {
            interval,
            initial_delay,
            max_ticks: None,
        }
    }

    pub fn from_config(config: &OverlayConfig) -> Self {
        Self::new(
            Duration::from_millis(config.poll_interval_ms),
            Duration::from_millis(config.initial_delay_ms),
        )
    }

    /// Stop after `ticks` calls even if the callback never breaks.
    pub fn with_max_ticks(mut self, ticks: usize) -> Self {
        self.max_ticks = Some(ticks);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Call `tick` with the 0-based tick number until it breaks or the tick
    /// budget runs out. Returns the number of ticks run.
    pub fn run<F>(&self, mut tick: F) -> usize
    where
        F: FnMut(usize) -> ControlFlow<()>,
    {
        thread::sleep(self.initial_delay);
        let mut n = 0;
        loop {
            if self.max_ticks.is_some_and(|max| n >= max) {
                break;
            }
            let started = Instant::now();
            let flow = tick(n);
            n += 1;
            if flow.is_break() {
                debug!("polling stopped by caller after {n} ticks");
                break;
            }
            if let Some(rest) = self.interval.checked_sub(started.elapsed()) {
                thread::sleep(rest);
            }
        }
        n
    }
}
