//! Repeat timers for continuous actions.
//!
//! One timer exists per action identity, not per physical slot: two controls
//! mapped to the same continuous action share one cadence. The scheduler is
//! a plain deadline table; the engine loop sleeps until `next_deadline` and
//! then collects due fires with `poll_due`. Keeping the data structure
//! synchronous means a release sample processed in the same scheduling turn
//! always cancels the timer before it can fire again.

use crate::mapping::actions::{Action, ActionInput};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Base repeat period at speed factor 1.0. The per-slot speed factor divides
/// this, so doubling the factor halves the inter-fire interval.
pub const REPEAT_BASE_INTERVAL: Duration = Duration::from_millis(100);

/// Repeat interval for a given speed factor.
pub fn repeat_interval(speed_factor: f32) -> Duration {
    REPEAT_BASE_INTERVAL.div_f64(speed_factor as f64)
}

#[derive(Debug, Clone)]
struct RepeatEntry {
    interval: Duration,
    /// Latest magnitude/direction from the driving control; updated while
    /// held without touching the timer phase.
    drive: ActionInput,
    last_fire: Instant,
    next_fire: Instant,
}

/// Deadline table implementing press → repeat → release semantics.
#[derive(Debug, Default)]
pub struct RepeatScheduler {
    entries: HashMap<Action, RepeatEntry>,
}

impl RepeatScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a timer for `key`, with the first fire due immediately.
    ///
    /// Returns `true` if the timer was newly created, in which case the
    /// caller performs the immediate first fire and `now` counts as its
    /// timestamp. If a timer for `key` already exists (idempotent re-press),
    /// this only refreshes the stored parameters and returns `false`.
    pub fn start(&mut self, key: Action, interval: Duration, drive: ActionInput, now: Instant) -> bool {
        if self.entries.contains_key(&key) {
            self.refresh(key, interval, drive);
            return false;
        }

        debug!("Repeat timer started for {}", key);
        self.entries.insert(
            key,
            RepeatEntry {
                interval,
                drive,
                last_fire: now,
                next_fire: now + interval,
            },
        );
        true
    }

    /// Updates interval and drive for a running timer without restarting its
    /// phase: the next fire is re-derived from the last fire, so a deeper
    /// deflection accelerates the cadence without waiting out the old tick.
    pub fn refresh(&mut self, key: Action, interval: Duration, drive: ActionInput) {
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.interval = interval;
            entry.drive = drive;
            entry.next_fire = entry.last_fire + interval;
        }
    }

    /// Cancels the timer for `key`. No-op when none is running.
    pub fn stop(&mut self, key: Action) {
        if self.entries.remove(&key).is_some() {
            debug!("Repeat timer stopped for {}", key);
        }
    }

    /// Cancels every timer. Double-stop is a no-op, not an error.
    pub fn stop_all(&mut self) {
        if !self.entries.is_empty() {
            debug!("Cancelling {} repeat timers", self.entries.len());
        }
        self.entries.clear();
    }

    pub fn is_running(&self, key: Action) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn active_count(&self) -> usize {
        self.entries.len()
    }

    /// Earliest pending deadline, for the engine loop to sleep until.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.values().map(|entry| entry.next_fire).min()
    }

    /// Collects all fires due at `now` and advances their deadlines.
    /// Returned in deadline order for deterministic dispatch.
    pub fn poll_due(&mut self, now: Instant) -> Vec<(Action, ActionInput)> {
        let mut due: Vec<(Instant, Action)> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.next_fire <= now)
            .map(|(key, entry)| (entry.next_fire, *key))
            .collect();
        due.sort_by_key(|(deadline, _)| *deadline);

        due.into_iter()
            .filter_map(|(_, key)| {
                let entry = self.entries.get_mut(&key)?;
                entry.last_fire = now;
                entry.next_fire = now + entry.interval;
                Some((key, entry.drive.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn drive(value: f32) -> ActionInput {
        ActionInput {
            value,
            speed_factor: 1.0,
            direction: Some(value.signum()),
            background: false,
        }
    }

    #[test]
    fn doubling_the_speed_factor_halves_the_interval() {
        assert_eq!(repeat_interval(1.0), Duration::from_millis(100));
        assert_eq!(repeat_interval(2.0), Duration::from_millis(50));
        assert_eq!(repeat_interval(0.5), Duration::from_millis(200));
    }

    #[test]
    fn start_is_immediate_and_then_periodic() {
        let mut scheduler = RepeatScheduler::new();
        let t0 = Instant::now();

        assert!(scheduler.start(Action::ScrollDown, Duration::from_millis(100), drive(1.0), t0));
        assert_eq!(scheduler.next_deadline(), Some(t0 + Duration::from_millis(100)));

        // Nothing due before the period elapses.
        assert!(scheduler.poll_due(t0 + Duration::from_millis(99)).is_empty());

        let fires = scheduler.poll_due(t0 + Duration::from_millis(100));
        assert_eq!(fires, vec![(Action::ScrollDown, drive(1.0))]);
        assert_eq!(
            scheduler.next_deadline(),
            Some(t0 + Duration::from_millis(200))
        );
    }

    #[test]
    fn restart_does_not_double_schedule() {
        let mut scheduler = RepeatScheduler::new();
        let t0 = Instant::now();

        assert!(scheduler.start(Action::ScrollUp, Duration::from_millis(100), drive(1.0), t0));
        assert!(!scheduler.start(
            Action::ScrollUp,
            Duration::from_millis(100),
            drive(0.9),
            t0 + Duration::from_millis(10)
        ));

        assert_eq!(scheduler.active_count(), 1);
        // Phase unchanged: still due at t0 + 100ms, with the refreshed drive.
        let fires = scheduler.poll_due(t0 + Duration::from_millis(100));
        assert_eq!(fires, vec![(Action::ScrollUp, drive(0.9))]);
    }

    #[test]
    fn refresh_rederives_deadline_from_last_fire() {
        let mut scheduler = RepeatScheduler::new();
        let t0 = Instant::now();

        scheduler.start(Action::ScrollRight, Duration::from_millis(200), drive(0.5), t0);

        // Deeper deflection at t0+50ms: new interval counts from the last
        // fire (t0), not from the refresh.
        scheduler.refresh(Action::ScrollRight, Duration::from_millis(80), drive(1.0));
        assert_eq!(
            scheduler.next_deadline(),
            Some(t0 + Duration::from_millis(80))
        );

        let fires = scheduler.poll_due(t0 + Duration::from_millis(80));
        assert_eq!(fires, vec![(Action::ScrollRight, drive(1.0))]);
    }

    #[test]
    fn stop_cancels_pending_fires() {
        let mut scheduler = RepeatScheduler::new();
        let t0 = Instant::now();

        scheduler.start(Action::ForwardTab, Duration::from_millis(40), drive(1.0), t0);
        scheduler.stop(Action::ForwardTab);

        assert!(!scheduler.is_running(Action::ForwardTab));
        assert!(scheduler.poll_due(t0 + Duration::from_secs(1)).is_empty());
        assert_eq!(scheduler.next_deadline(), None);

        // Stopping again is a no-op.
        scheduler.stop(Action::ForwardTab);
    }

    #[test]
    fn stop_all_is_idempotent() {
        let mut scheduler = RepeatScheduler::new();
        let t0 = Instant::now();

        scheduler.start(Action::ScrollUp, Duration::from_millis(40), drive(1.0), t0);
        scheduler.start(Action::ForwardTab, Duration::from_millis(40), drive(1.0), t0);

        scheduler.stop_all();
        scheduler.stop_all();

        assert_eq!(scheduler.active_count(), 0);
        assert!(scheduler.poll_due(t0 + Duration::from_secs(1)).is_empty());
    }

    #[test]
    fn missed_deadlines_catch_up_on_next_poll() {
        let mut scheduler = RepeatScheduler::new();
        let t0 = Instant::now();

        scheduler.start(Action::ScrollDown, Duration::from_millis(100), drive(1.0), t0);

        // Poll arrives late; one fire is collected and the cadence re-anchors
        // on the actual poll time.
        let late = t0 + Duration::from_millis(350);
        assert_eq!(scheduler.poll_due(late).len(), 1);
        assert_eq!(
            scheduler.next_deadline(),
            Some(late + Duration::from_millis(100))
        );
    }

    #[test]
    fn timers_for_distinct_actions_are_independent() {
        let mut scheduler = RepeatScheduler::new();
        let t0 = Instant::now();

        scheduler.start(Action::ScrollDown, Duration::from_millis(50), drive(1.0), t0);
        scheduler.start(Action::ForwardTab, Duration::from_millis(100), drive(1.0), t0);

        let fires = scheduler.poll_due(t0 + Duration::from_millis(50));
        assert_eq!(fires.len(), 1);
        assert_eq!(fires[0].0, Action::ScrollDown);

        scheduler.stop(Action::ScrollDown);
        assert!(scheduler.is_running(Action::ForwardTab));
    }
}
