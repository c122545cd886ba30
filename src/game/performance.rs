//! Frame-budget tracking
//!
//! Measures how much of the tick budget the simulation uses and throttles
//! arcade spawning before the frame rate suffers.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// How close recent ticks came to the frame budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetStatus {
    /// Under 30% of budget
    Comfortable,
    /// Under 70% of budget
    Nominal,
    /// Under 100% of budget; spawning pauses
    Strained,
    /// Over budget
    Overloaded,
}

impl BudgetStatus {
    pub fn allows_spawning(&self) -> bool {
        matches!(self, BudgetStatus::Comfortable | BudgetStatus::Nominal)
    }
}

/// Minimum samples before the monitor will change its status
const MIN_SAMPLES: usize = 10;

pub struct FrameBudget {
    samples: VecDeque<Duration>,
    window: usize,
    budget: Duration,
    status: BudgetStatus,
    started: Option<Instant>,
    last_entity_count: usize,
}

impl FrameBudget {
    pub fn new(tick_rate: u32) -> Self {
        // Two seconds of history
        let window = (tick_rate as usize * 2).max(MIN_SAMPLES);
        Self {
            samples: VecDeque::with_capacity(window),
            window,
            budget: Duration::from_secs_f32(1.0 / tick_rate.max(1) as f32),
            status: BudgetStatus::Comfortable,
            started: None,
            last_entity_count: 0,
        }
    }

    pub fn tick_start(&mut self) {
        self.started = Some(Instant::now());
    }

    pub fn tick_end(&mut self, entity_count: usize) {
        if let Some(start) = self.started.take() {
            self.record(start.elapsed());
            self.last_entity_count = entity_count;
        }
    }

    fn record(&mut self, duration: Duration) {
        self.samples.push_back(duration);
        while self.samples.len() > self.window {
            self.samples.pop_front();
        }

        if self.samples.len() < MIN_SAMPLES {
            return;
        }

        let previous = self.status;
        let usage = self.usage();
        self.status = if usage < 0.3 {
            BudgetStatus::Comfortable
        } else if usage < 0.7 {
            BudgetStatus::Nominal
        } else if usage < 1.0 {
            BudgetStatus::Strained
        } else {
            BudgetStatus::Overloaded
        };

        if self.status != previous {
            tracing::debug!("{}", self.status_message());
        }
    }

    /// Fraction of the tick budget used on average (1.0 = exactly on budget)
    pub fn usage(&self) -> f32 {
        self.average().as_secs_f32() / self.budget.as_secs_f32()
    }

    pub fn average(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }
        let sum: Duration = self.samples.iter().sum();
        sum / self.samples.len() as u32
    }

    pub fn p95(&self) -> Duration {
        let mut sorted: Vec<_> = self.samples.iter().copied().collect();
        sorted.sort();
        let idx = (sorted.len() as f32 * 0.95) as usize;
        sorted.get(idx.min(sorted.len().saturating_sub(1))).copied().unwrap_or(Duration::ZERO)
    }

    pub fn status(&self) -> BudgetStatus {
        self.status
    }

    pub fn last_entity_count(&self) -> usize {
        self.last_entity_count
    }

    pub fn status_message(&self) -> String {
        format!(
            "Frame budget {:?}: {:.1}% used, {} entities",
            self.status,
            self.usage() * 100.0,
            self.last_entity_count
        )
    }

    /// How many of `requested` new spawns fit in the remaining headroom
    pub fn spawn_allowance(&self, live: usize, requested: usize) -> usize {
        if self.samples.len() < MIN_SAMPLES {
            return requested;
        }
        if !self.status.allows_spawning() {
            return 0;
        }

        let usage = self.usage();
        if usage < 0.5 {
            return requested;
        }
        // Scale the population only as far as the measured headroom allows
        let ceiling = (live.max(1) as f32 / usage).floor() as usize;
        requested.min(ceiling.saturating_sub(live))
    }
}

impl Default for FrameBudget {
    fn default() -> Self {
        Self::new(60)
    }
}
