use rayon::prelude::*;

use super::fft::{pow2_ceil, FftBackwardPlan, FftForwardPlan};
use super::signal::{ComplexSignal, FloatSignal};
use super::spectral::{spectral_convolution, spectral_correlation};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Conv,
    Xcorr,
}

struct Chunk {
    forward: FftForwardPlan,
    backward: FftBackwardPlan,
}

/// Overlap-save convolution/cross-correlation of a signal with a patch.
///
/// With signal length S, patch length P (P <= S) and result length
/// U = S + P - 1: the patch is zero-padded to the chunk size
/// X = 2 * pow2_ceil(P), the signal is padded with P - 1 zeros in front and
/// X - (U mod L) behind (L = X - P + 1 is the stride), and one chunk of
/// length X starts at every multiple of L. Each execution runs three
/// data-parallel phases over the chunks: forward FFTs, spectral multiply
/// against the patch spectrum, inverse FFTs with 1/X normalization.
///
/// The assembled result follows the most-negative-lag-first indexing:
/// for 0 <= i < U, result[i] = dot(patch, signal[i-(P-1) ..= i]), with the
/// signal zero-padded on the left (the patch is reversed for convolution).
/// Full patch overlap starting at sample k of the signal therefore lands at
/// result index k + P - 1.
pub struct OverlapSaveConvolver {
    result_len: usize,
    chunk_size: usize,
    stride: usize,
    patch_plan: FftForwardPlan,
    chunks: Vec<Chunk>,
    state: Option<Mode>,
}

impl OverlapSaveConvolver {
    pub fn new(signal: &FloatSignal, patch: &FloatSignal) -> Self {
        assert!(
            patch.len() <= signal.len(),
            "overlap-save: len(signal) cannot be smaller than len(patch)"
        );

        let patch_len = patch.len();
        let result_len = signal.len() + patch_len - 1;
        let chunk_size = 2 * pow2_ceil(patch_len);
        let spectrum_len = chunk_size / 2 + 1;
        let stride = chunk_size - patch_len + 1;

        let padded_patch = FloatSignal::padded(patch.data(), 0, chunk_size - patch_len);
        let patch_plan = FftForwardPlan::new(padded_patch, ComplexSignal::new(spectrum_len));

        let padded_signal = FloatSignal::padded(
            signal.data(),
            patch_len - 1,
            chunk_size - (result_len % stride),
        );

        let mut chunks = Vec::new();
        let mut offset = 0;
        while offset + chunk_size <= padded_signal.len() {
            let view =
                FloatSignal::from_slice(&padded_signal.data()[offset..offset + chunk_size]);
            chunks.push(Chunk {
                forward: FftForwardPlan::new(view, ComplexSignal::new(spectrum_len)),
                backward: FftBackwardPlan::new(
                    ComplexSignal::new(spectrum_len),
                    FloatSignal::new(chunk_size),
                ),
            });
            offset += stride;
        }

        Self {
            result_len,
            chunk_size,
            stride,
            patch_plan,
            chunks,
            state: None,
        }
    }

    pub fn execute_conv(&mut self) {
        self.execute(Mode::Conv);
    }

    pub fn execute_xcorr(&mut self) {
        self.execute(Mode::Xcorr);
    }

    fn execute(&mut self, mode: Mode) {
        self.patch_plan.execute();
        self.chunks
            .par_iter_mut()
            .for_each(|chunk| chunk.forward.execute());

        let patch_spectrum = self.patch_plan.spectrum();
        self.chunks.par_iter_mut().for_each(|chunk| match mode {
            Mode::Conv => spectral_convolution(
                chunk.forward.spectrum(),
                patch_spectrum,
                chunk.backward.spectrum_mut(),
            ),
            Mode::Xcorr => spectral_correlation(
                chunk.forward.spectrum(),
                patch_spectrum,
                chunk.backward.spectrum_mut(),
            ),
        });

        let norm = self.chunk_size as f32;
        self.chunks.par_iter_mut().for_each(|chunk| {
            chunk.backward.execute();
            *chunk.backward.real_mut() /= norm;
        });

        self.state = Some(mode);
    }

    /// Assembles the result of the last executed operation into a fresh
    /// signal of length S + P - 1. Panics if called before any execution.
    pub fn extract_result(&self) -> FloatSignal {
        let mode = self
            .state
            .expect("extract_result called before execute_conv or execute_xcorr");

        // convolution aliases the first P-1 samples of each chunk, xcorr the
        // last P-1
        let discard_offset = match mode {
            Mode::Conv => self.chunk_size - self.stride,
            Mode::Xcorr => 0,
        };

        let mut result = FloatSignal::new(self.result_len);
        for (i, chunk) in self.chunks.iter().enumerate() {
            let begin = i * self.stride;
            let copy = self.stride.min(self.result_len - begin);
            result.data_mut()[begin..begin + copy].copy_from_slice(
                &chunk.backward.real().data()[discard_offset..discard_offset + copy],
            );
        }
        result
    }

    #[allow(dead_code)]
    pub fn result_len(&self) -> usize {
        self.result_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // reference: result[i] = dot(patch, signal[i-(P-1) ..= i]), zero-padded
    fn direct_xcorr(signal: &[f32], patch: &[f32]) -> Vec<f32> {
        let p = patch.len();
        let u = signal.len() + p - 1;
        (0..u)
            .map(|i| {
                patch
                    .iter()
                    .enumerate()
                    .map(|(j, &pv)| {
                        let k = i as isize - (p as isize - 1) + j as isize;
                        if k >= 0 && (k as usize) < signal.len() {
                            pv * signal[k as usize]
                        } else {
                            0.0
                        }
                    })
                    .sum()
            })
            .collect()
    }

    fn direct_conv(signal: &[f32], patch: &[f32]) -> Vec<f32> {
        let u = signal.len() + patch.len() - 1;
        let mut out = vec![0.0f32; u];
        for (i, &s) in signal.iter().enumerate() {
            for (j, &p) in patch.iter().enumerate() {
                out[i + j] += s * p;
            }
        }
        out
    }

    fn test_signal(len: usize, step: f32) -> FloatSignal {
        FloatSignal::from_slice(
            &(0..len).map(|i| (i as f32 * step).sin()).collect::<Vec<_>>(),
        )
    }

    #[test]
    fn result_has_length_s_plus_p_minus_1() {
        let signal = test_signal(100, 0.1);
        let patch = test_signal(13, 0.3);
        let mut convolver = OverlapSaveConvolver::new(&signal, &patch);
        convolver.execute_xcorr();
        assert_eq!(convolver.extract_result().len(), 100 + 13 - 1);
        assert_eq!(convolver.result_len(), 112);
    }

    #[test]
    fn xcorr_matches_direct_computation() {
        let signal = test_signal(200, 0.17);
        let patch = test_signal(23, 0.41);
        let mut convolver = OverlapSaveConvolver::new(&signal, &patch);
        convolver.execute_xcorr();
        let result = convolver.extract_result();

        let reference = direct_xcorr(signal.data(), patch.data());
        assert_eq!(result.len(), reference.len());
        for (i, (a, b)) in result.data().iter().zip(reference.iter()).enumerate() {
            assert!((a - b).abs() < 1e-3, "xcorr mismatch at {i}: {a} vs {b}");
        }
    }

    #[test]
    fn conv_matches_direct_computation() {
        let signal = test_signal(150, 0.23);
        let patch = test_signal(17, 0.31);
        let mut convolver = OverlapSaveConvolver::new(&signal, &patch);
        convolver.execute_conv();
        let result = convolver.extract_result();

        let reference = direct_conv(signal.data(), patch.data());
        assert_eq!(result.len(), reference.len());
        for (i, (a, b)) in result.data().iter().zip(reference.iter()).enumerate() {
            assert!((a - b).abs() < 1e-3, "conv mismatch at {i}: {a} vs {b}");
        }
    }

    #[test]
    fn xcorr_full_overlap_indexing() {
        // value at index k + P - 1 is dot(patch, signal[k..k+P])
        let signal = test_signal(64, 0.37);
        let patch = FloatSignal::from_slice(&signal.data()[20..28]);
        let mut convolver = OverlapSaveConvolver::new(&signal, &patch);
        convolver.execute_xcorr();
        let result = convolver.extract_result();

        let p = patch.len();
        for k in 0..(signal.len() - p) {
            let expected: f32 = patch
                .data()
                .iter()
                .zip(&signal.data()[k..k + p])
                .map(|(a, b)| a * b)
                .sum();
            let got = result.data()[k + p - 1];
            assert!(
                (got - expected).abs() < 1e-3,
                "index contract broken at k={k}: {got} vs {expected}"
            );
        }
    }

    #[test]
    fn xcorr_then_conv_on_same_convolver() {
        let signal = test_signal(90, 0.13);
        let patch = test_signal(11, 0.29);
        let mut convolver = OverlapSaveConvolver::new(&signal, &patch);

        convolver.execute_xcorr();
        convolver.execute_conv();
        let result = convolver.extract_result();

        let reference = direct_conv(signal.data(), patch.data());
        for (a, b) in result.data().iter().zip(reference.iter()) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    #[should_panic]
    fn extract_before_execute_panics() {
        let signal = test_signal(64, 0.1);
        let patch = test_signal(8, 0.2);
        let convolver = OverlapSaveConvolver::new(&signal, &patch);
        let _ = convolver.extract_result();
    }

    #[test]
    #[should_panic]
    fn patch_longer_than_signal_panics() {
        let signal = test_signal(8, 0.1);
        let patch = test_signal(64, 0.2);
        let _ = OverlapSaveConvolver::new(&signal, &patch);
    }
}
