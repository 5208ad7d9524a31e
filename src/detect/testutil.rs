//! Deterministic signal generators shared by the detection tests.

use super::SAMPLE_RATE;

/// Seeded pseudo-noise in [-1, 1] (64-bit LCG).
pub fn noise(seed: u64, len: usize) -> Vec<f32> {
    let mut state = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15).wrapping_add(1);
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((state >> 40) as f32 / (1u64 << 24) as f32) * 2.0 - 1.0
        })
        .collect()
}

/// Noise at double amplitude; a spliced segment of this dominates the
/// correlation against the unit-amplitude fill.
pub fn loud_noise(seed: u64, len: usize) -> Vec<f32> {
    noise(seed, len).iter().map(|v| v * 2.0).collect()
}

pub fn sine(freq_hz: f32, len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| (2.0 * std::f32::consts::PI * freq_hz * i as f32 / SAMPLE_RATE as f32).sin())
        .collect()
}

/// `total_secs` of seeded noise with `intro` spliced in at `at_secs`.
pub fn with_intro(seed: u64, total_secs: usize, intro: &[f32], at_secs: usize) -> Vec<f32> {
    let mut samples = noise(seed, total_secs * SAMPLE_RATE as usize);
    let at = at_secs * SAMPLE_RATE as usize;
    samples[at..at + intro.len()].copy_from_slice(intro);
    samples
}
