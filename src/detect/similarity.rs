use crate::dsp::convolver::OverlapSaveConvolver;
use crate::dsp::signal::FloatSignal;

use super::{CorrelateResult, SAMPLE_RATE};

/// Finds the sample offset in `source` where `patch` matches best, via an
/// overlap-save cross-correlation. Ties go to the first maximum.
pub fn best_patch_position(source: &FloatSignal, patch: &FloatSignal) -> CorrelateResult {
    assert!(
        source.len() >= patch.len(),
        "best_patch_position: patch cannot be longer than source"
    );

    let mut convolver = OverlapSaveConvolver::new(source, patch);
    convolver.execute_xcorr();
    let xcorr = convolver.extract_result();

    // index P-1 holds the first full-overlap alignment (patch start at
    // sample 0); earlier indices hang off the start of the source
    let patch_len = patch.len();
    let mut max = 0.0f32;
    let mut max_idx = 0usize;
    for (i, &value) in xcorr.data().iter().enumerate().skip(patch_len - 1) {
        if value > max {
            max = value;
            max_idx = i - (patch_len - 1);
        }
    }

    CorrelateResult {
        sample_index: max_idx as u64,
        value: max,
        timestamp: max_idx as f32 / SAMPLE_RATE as f32,
    }
}

/// Scores how similar two clips are, as the peak Pearson correlation over
/// all alignments. Both directions are searched because each direction only
/// covers one half of the alignment space when the clips are nearly the same
/// length; the better of the two wins.
pub fn how_close_are_signals(one: &FloatSignal, two: &FloatSignal) -> CorrelateResult {
    let size = one.len().min(two.len());
    let forward = pearson_peak(&one.data()[..size], &two.data()[..size]);
    let reverse = pearson_peak(&two.data()[..size], &one.data()[..size]);
    if forward.value > reverse.value {
        forward
    } else {
        reverse
    }
}

fn pearson_peak(source: &[f32], patch: &[f32]) -> CorrelateResult {
    // normalize copies so that a plain dot product yields the Pearson
    // coefficient; the shared file signals are never normalized in place
    let mut a = FloatSignal::from_slice(source);
    let mut b = FloatSignal::from_slice(patch);
    let n = a.len() as f32;

    let mean = a.mean();
    a -= mean;
    let std = a.std();
    a /= std * n;

    let mean = b.mean();
    b -= mean;
    let std = b.std();
    b /= std;

    best_patch_position(&a, &b)
}

/// Copies `[start_secs, end_secs)` out of a signal. A slice running past the
/// end of the source is zero-padded; a slice starting past the end is a
/// programming error.
pub fn signal_slice(signal: &FloatSignal, start_secs: f32, end_secs: f32) -> FloatSignal {
    let start = (start_secs * SAMPLE_RATE as f32) as usize;
    let end = (end_secs * SAMPLE_RATE as f32) as usize;
    assert!(
        start < signal.len(),
        "signal_slice: slice starts past the end of the signal"
    );

    let size = end - start;
    let available = size.min(signal.len() - start);
    let mut slice = FloatSignal::new(size);
    slice.data_mut()[..available].copy_from_slice(&signal.data()[start..start + available]);
    slice
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::testutil::{noise, sine};

    #[test]
    fn finds_patch_cut_from_source() {
        // 64 Hz at 1024 Hz: 16-sample period, so any whole-period alignment
        // of the probe is equivalent; the peak must be one of them and carry
        // the full-overlap energy
        let source = FloatSignal::from_slice(&sine(64.0, 4096));
        let patch = FloatSignal::from_slice(&source.data()[512..1536]);

        let result = best_patch_position(&source, &patch);
        assert!(result.value > 0.0);
        assert!((result.value - 512.0).abs() < 1.0, "value = {}", result.value);
        let phase = result.sample_index % 16;
        assert!(phase == 0 || phase == 1 || phase == 15, "phase = {phase}");
    }

    #[test]
    fn finds_known_shift() {
        let mut samples = vec![0.0f32; 8192];
        for v in &mut samples[2000..2256] {
            *v = 1.0;
        }
        let source = FloatSignal::from_slice(&samples);
        let patch = FloatSignal::from_slice(&vec![1.0f32; 256]);

        let result = best_patch_position(&source, &patch);
        assert_eq!(result.sample_index, 2000);
        assert!((result.value - 256.0).abs() < 0.5);
        assert!((result.timestamp - 2000.0 / 1024.0).abs() < 1e-4);
    }

    #[test]
    fn identical_clips_score_near_one() {
        let a = FloatSignal::from_slice(&noise(42, 2048));
        let b = FloatSignal::from_slice(&noise(42, 2048));
        let result = how_close_are_signals(&a, &b);
        assert!(result.value >= 0.999, "value = {}", result.value);
    }

    #[test]
    fn unrelated_sines_score_low() {
        let a = FloatSignal::from_slice(&sine(50.0, 4096));
        let b = FloatSignal::from_slice(&sine(51.0, 4096));
        let result = how_close_are_signals(&a, &b);
        assert!(result.value < 0.1, "value = {}", result.value);
    }

    #[test]
    fn closeness_is_symmetric() {
        let mut left = noise(7, 3000);
        left.extend_from_slice(&noise(8, 1000));
        let mut right = noise(7, 3000);
        right.extend_from_slice(&noise(9, 1000));
        let a = FloatSignal::from_slice(&left);
        let b = FloatSignal::from_slice(&right);

        let ab = how_close_are_signals(&a, &b);
        let ba = how_close_are_signals(&b, &a);
        assert!((ab.value - ba.value).abs() < 1e-5);
    }

    #[test]
    fn slice_copies_the_window() {
        let samples: Vec<f32> = (0..4096).map(|i| i as f32).collect();
        let signal = FloatSignal::from_slice(&samples);

        let slice = signal_slice(&signal, 1.0, 2.0);
        assert_eq!(slice.len(), SAMPLE_RATE as usize);
        assert_eq!(slice[0], 1024.0);
        assert_eq!(slice[slice.len() - 1], 2047.0);
    }

    #[test]
    fn slice_zero_pads_past_the_end() {
        let signal = FloatSignal::from_slice(&vec![1.0f32; 2048]);

        // signal is 2s long; ask for [1s, 4s)
        let slice = signal_slice(&signal, 1.0, 4.0);
        assert_eq!(slice.len(), 3 * SAMPLE_RATE as usize);
        assert!(slice.data()[..1024].iter().all(|&v| v == 1.0));
        assert!(slice.data()[1024..].iter().all(|&v| v == 0.0));
    }

    #[test]
    #[should_panic]
    fn slice_starting_past_the_end_panics() {
        let signal = FloatSignal::from_slice(&vec![0.0f32; 1024]);
        let _ = signal_slice(&signal, 2.0, 3.0);
    }
}
