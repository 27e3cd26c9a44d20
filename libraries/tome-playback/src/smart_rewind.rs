//! Smart rewind
//!
//! Maps how long playback was paused to how far to back up on resume.
//! Short pauses need nothing; longer ones get progressively larger rewinds
//! with diminishing returns per unit of pause time.

/// Pauses shorter than this resume exactly where they stopped
pub const MIN_PAUSE_FOR_REWIND_MS: u64 = 3_000;

/// Default ceiling on the rewind offset
pub const DEFAULT_MAX_REWIND_SECONDS: u32 = 45;

/// (pause seconds, rewind seconds) anchor points, ascending
const REWIND_CURVE: [(f64, f64); 8] = [
    (3.0, 3.0),
    (10.0, 5.0),
    (30.0, 10.0),
    (120.0, 15.0),
    (300.0, 20.0),
    (900.0, 25.0),
    (3_600.0, 30.0),
    (86_400.0, 45.0),
];

/// Rewind offset in whole seconds for a pause of `pause_duration_ms`
///
/// Piecewise-linear across the anchor curve, clamped to
/// `max_rewind_seconds` and rounded to the nearest second.
pub fn calculate_smart_rewind_seconds(pause_duration_ms: u64, max_rewind_seconds: u32) -> u32 {
    if pause_duration_ms < MIN_PAUSE_FOR_REWIND_MS {
        return 0;
    }

    let pause_seconds = pause_duration_ms as f64 / 1000.0;
    let rewind = interpolate(pause_seconds).min(f64::from(max_rewind_seconds));

    rewind.round().max(0.0) as u32
}

fn interpolate(pause_seconds: f64) -> f64 {
    for pair in REWIND_CURVE.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];
        if pause_seconds <= x1 {
            let t = ((pause_seconds - x0) / (x1 - x0)).clamp(0.0, 1.0);
            return y0 + t * (y1 - y0);
        }
    }

    REWIND_CURVE[REWIND_CURVE.len() - 1].1
}
