/*
 * backoff.rs
 *
 * Restart scheduling, spec §4.5. The delay announced and used for the next
 * deadline is always the *pre-doubling* value of `current`; doubling (or
 * resetting, on a long-enough run) happens after, so it only affects the
 * cycle after next. Keeping `on_reap` as the single entry point mirrors the
 * teacher's habit of collapsing a numbered pseudocode procedure into one
 * function with a clear return value rather than scattering the steps
 * across call sites.
 */

use crate::interval::Interval;
use crate::time_math;

pub struct BackoffState {
    restart_initial: Interval,
    cooloff: Interval,
    maximum: Interval,
    current: Interval,
    deadline_ns: Option<u64>,
}

impl BackoffState {
    #[must_use]
    pub fn new(restart_initial: Interval, cooloff: Interval, maximum: Interval) -> Self {
        Self {
            restart_initial,
            cooloff,
            maximum,
            current: restart_initial,
            deadline_ns: None,
        }
    }

    /// Monotonic instant at which the next spawn should occur. Meaningful
    /// only while no child exists.
    #[must_use]
    pub fn deadline_ns(&self) -> Option<u64> {
        self.deadline_ns
    }

    /// Clear the deadline; called once a new child has been spawned.
    pub fn clear_deadline(&mut self) {
        self.deadline_ns = None;
    }

    /// Apply spec §4.5's five-step procedure after a reap. Returns the delay
    /// that was applied (for the "restarting in ..." log line) and records
    /// the new deadline.
    pub fn on_reap(&mut self, started_at_ns: u64, reap_instant_ns: u64) -> Interval {
        let uptime_ns = time_math::elapsed_ns(started_at_ns, reap_instant_ns).unwrap_or(0);
        if uptime_ns >= ns(self.cooloff) {
            self.current = self.restart_initial;
        }

        let applied = self.current;
        self.deadline_ns = Some(time_math::advance_ns(reap_instant_ns, ns(applied)));
        self.current = applied.saturating_double(self.maximum);
        applied
    }
}

fn ns(interval: Interval) -> u64 {
    u64::try_from(interval.as_duration().as_nanos()).unwrap_or(u64::MAX)
}
