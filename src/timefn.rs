// timefn - monotonic elapsed-time measurement for the statistics tables.
//
// std::time::Instant is monotonic and MT-safe on all supported platforms,
// so no platform-specific clock handling is needed.

use std::time::Instant;

/// Opaque timestamp.  The absolute value is not meaningful; use it only to
/// compute a span between two measurements.
#[derive(Clone, Copy)]
pub struct TimeT {
    t: Instant,
}

/// Returns the current monotonic timestamp.
pub fn get_time() -> TimeT {
    TimeT { t: Instant::now() }
}

/// Seconds elapsed since `clock_start`.
pub fn clock_span_secs(clock_start: TimeT) -> f64 {
    clock_start.t.elapsed().as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spans_are_non_negative_and_monotonic() {
        let start = get_time();
        let a = clock_span_secs(start);
        let b = clock_span_secs(start);
        assert!(a >= 0.0);
        assert!(b >= a);
    }
}
