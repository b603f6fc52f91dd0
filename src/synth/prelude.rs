// Shared math helpers for the render path.

pub use core::f32::consts::{FRAC_1_SQRT_2, PI, TAU};

/// Values below this magnitude are treated as denormal and flushed.
const DENORMAL_THRESHOLD: f32 = 1e-20;

/// Flush denormal-range values to zero.
///
/// Feedback paths (biquad state, reverb combs) decay towards zero forever;
/// once they reach the subnormal range the FPU slows down drastically.
#[inline(always)]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < DENORMAL_THRESHOLD {
        0.0
    } else {
        x
    }
}

/// Linear interpolation from `from` to `to` by `t` in [0, 1].
#[inline]
pub fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}

/// Convert decibels to a linear gain factor.
#[inline]
pub fn db_to_gain(db: f32) -> f32 {
    10.0f32.powf(db * 0.05)
}

/// Equal-tempered frequency of a (possibly fractional) MIDI note, A4 = 440 Hz.
#[inline]
pub fn midi_note_to_hz(note: f32) -> f32 {
    440.0 * 2.0f32.powf((note - 69.0) / 12.0)
}
