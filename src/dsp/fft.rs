use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use realfft::num_complex::Complex;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};

use super::signal::{ComplexSignal, FloatSignal};

/// Plan construction must be serialized; executing already-built plans is
/// safe from multiple threads. The planner also caches plans by size, so
/// repeated convolver construction reuses them.
static PLANNER: Lazy<Mutex<RealFftPlanner<f32>>> =
    Lazy::new(|| Mutex::new(RealFftPlanner::new()));

/// Smallest power of two >= x.
pub fn pow2_ceil(x: usize) -> usize {
    x.next_power_of_two()
}

/// A forward/backward pair must satisfy complex_len == real_len/2 + 1.
/// Violating this is a programming error.
fn check_real_complex_ratio(real_len: usize, complex_len: usize, what: &str) {
    assert_eq!(
        complex_len,
        real_len / 2 + 1,
        "{what}: complex length must equal real length / 2 + 1"
    );
}

// Planning itself cannot fail, so the lock result errors only when a prior
// panic poisoned the mutex; that panic has already torn down the pipeline,
// so these unwraps cannot introduce a new failure mode.
fn plan_forward(len: usize) -> Arc<dyn RealToComplex<f32>> {
    PLANNER.lock().unwrap().plan_fft_forward(len)
}

fn plan_backward(len: usize) -> Arc<dyn ComplexToReal<f32>> {
    PLANNER.lock().unwrap().plan_fft_inverse(len)
}

/// 1-D real-to-complex transform bound to its two buffers.
pub struct FftForwardPlan {
    fft: Arc<dyn RealToComplex<f32>>,
    real: FloatSignal,
    spectrum: ComplexSignal,
    // realfft uses its input as scratch, so each execution transforms a copy
    // and `real` stays intact for re-execution
    work: Vec<f32>,
    scratch: Vec<Complex<f32>>,
}

impl FftForwardPlan {
    pub fn new(real: FloatSignal, spectrum: ComplexSignal) -> Self {
        check_real_complex_ratio(real.len(), spectrum.len(), "FftForwardPlan");
        let fft = plan_forward(real.len());
        let work = vec![0.0; real.len()];
        let scratch = fft.make_scratch_vec();
        Self {
            fft,
            real,
            spectrum,
            work,
            scratch,
        }
    }

    pub fn execute(&mut self) {
        self.work.copy_from_slice(self.real.data());
        self.fft
            .process_with_scratch(&mut self.work, self.spectrum.data_mut(), &mut self.scratch)
            .expect("buffer sizes verified at construction");
    }

    pub fn spectrum(&self) -> &ComplexSignal {
        &self.spectrum
    }
}

/// 1-D complex-to-real transform bound to its two buffers.
pub struct FftBackwardPlan {
    fft: Arc<dyn ComplexToReal<f32>>,
    spectrum: ComplexSignal,
    real: FloatSignal,
    scratch: Vec<Complex<f32>>,
}

impl FftBackwardPlan {
    pub fn new(spectrum: ComplexSignal, real: FloatSignal) -> Self {
        check_real_complex_ratio(real.len(), spectrum.len(), "FftBackwardPlan");
        let fft = plan_backward(real.len());
        let scratch = fft.make_scratch_vec();
        Self {
            fft,
            spectrum,
            real,
            scratch,
        }
    }

    pub fn execute(&mut self) {
        self.fft
            .process_with_scratch(self.spectrum.data_mut(), self.real.data_mut(), &mut self.scratch)
            .expect("buffer sizes verified at construction");
    }

    pub fn spectrum_mut(&mut self) -> &mut ComplexSignal {
        &mut self.spectrum
    }

    pub fn real(&self) -> &FloatSignal {
        &self.real
    }

    pub fn real_mut(&mut self) -> &mut FloatSignal {
        &mut self.real
    }
}

/// Pre-plans every FFT size listed in the cache file (one size per line) so
/// the planner lock is never contended once the pipeline runs. A missing or
/// unparseable file is a warning, not an error.
pub fn load_plan_cache(path: &Path) {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            log::warn!("Could not read plan cache {}: {}", path.display(), err);
            return;
        }
    };

    let mut prepared = 0usize;
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line.parse::<usize>() {
            Ok(size) if size > 0 => {
                plan_forward(size);
                plan_backward(size);
                prepared += 1;
            }
            _ => {
                log::warn!(
                    "Ignoring invalid plan cache entry in {}: {:?}",
                    path.display(),
                    line
                );
            }
        }
    }
    log::info!("Prepared {} FFT plan sizes from {}", prepared, path.display());
}

/// Writes a plan cache covering all powers of two in [2^min_pow, 2^max_pow],
/// planning each size along the way.
pub fn write_plan_cache(path: &Path, min_pow: u32, max_pow: u32) -> Result<()> {
    let mut out = String::new();
    for pow in min_pow..=max_pow {
        let size = 1usize << pow;
        plan_forward(size);
        plan_backward(size);
        out.push_str(&size.to_string());
        out.push('\n');
    }
    std::fs::write(path, out)
        .with_context(|| format!("Failed to write plan cache: {}", path.display()))?;
    Ok(())
}
