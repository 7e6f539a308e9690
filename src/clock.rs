/*
 * clock.rs
 *
 * Monotonic time source for uptime/backoff arithmetic. The teacher's
 * runner.rs reaches for mach_continuous_time on Darwin; the direct Linux
 * counterpart is clock_gettime(CLOCK_MONOTONIC), read through the same
 * raw-libc-plus-errno-helper style as the rest of this crate.
 */

/// Current monotonic time in nanoseconds since an arbitrary epoch.
///
/// Only meaningful relative to another call to this function; never compare
/// it across process restarts or with wall-clock time.
#[must_use]
pub fn now_ns() -> u64 {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // SAFETY: ts is a valid, stack-allocated timespec; CLOCK_MONOTONIC is
    // supported on every Linux kernel this crate targets.
    let ret = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) };
    debug_assert_eq!(ret, 0, "clock_gettime(CLOCK_MONOTONIC) cannot fail here");
    (ts.tv_sec as u64)
        .saturating_mul(1_000_000_000)
        .saturating_add(ts.tv_nsec as u64)
}
