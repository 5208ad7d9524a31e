use std::ops::{AddAssign, DivAssign, Index, IndexMut, MulAssign, SubAssign};

use realfft::num_complex::Complex;

/// Owned single-channel float buffer. All FFT work in this crate runs on
/// these; the realfft backend operates on plain `Vec<f32>` buffers, so no
/// extra alignment discipline is needed.
#[derive(Clone, Debug, Default)]
pub struct FloatSignal {
    data: Vec<f32>,
}

impl FloatSignal {
    /// Zero-filled signal of the given length.
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0.0; size],
        }
    }

    pub fn from_slice(source: &[f32]) -> Self {
        Self {
            data: source.to_vec(),
        }
    }

    /// Longer zero-filled buffer with `source` copied in at offset
    /// `pad_before`; `pad_after` zeros follow it.
    pub fn padded(source: &[f32], pad_before: usize, pad_after: usize) -> Self {
        let mut data = vec![0.0; source.len() + pad_before + pad_after];
        data[pad_before..pad_before + source.len()].copy_from_slice(source);
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn mean(&self) -> f32 {
        let sum: f32 = self.data.iter().sum();
        sum / self.data.len() as f32
    }

    /// Population standard deviation.
    pub fn std(&self) -> f32 {
        let mean = self.mean();
        let sum: f32 = self
            .data
            .iter()
            .map(|&x| {
                let d = (x - mean).abs();
                d * d
            })
            .sum();
        (sum / self.data.len() as f32).sqrt()
    }
}

impl From<Vec<f32>> for FloatSignal {
    fn from(data: Vec<f32>) -> Self {
        Self { data }
    }
}

impl Index<usize> for FloatSignal {
    type Output = f32;

    fn index(&self, idx: usize) -> &f32 {
        &self.data[idx]
    }
}

impl IndexMut<usize> for FloatSignal {
    fn index_mut(&mut self, idx: usize) -> &mut f32 {
        &mut self.data[idx]
    }
}

impl AddAssign<f32> for FloatSignal {
    fn add_assign(&mut self, x: f32) {
        for v in &mut self.data {
            *v += x;
        }
    }
}

impl SubAssign<f32> for FloatSignal {
    fn sub_assign(&mut self, x: f32) {
        for v in &mut self.data {
            *v -= x;
        }
    }
}

impl MulAssign<f32> for FloatSignal {
    fn mul_assign(&mut self, x: f32) {
        for v in &mut self.data {
            *v *= x;
        }
    }
}

impl DivAssign<f32> for FloatSignal {
    fn div_assign(&mut self, x: f32) {
        for v in &mut self.data {
            *v /= x;
        }
    }
}

/// Owned buffer of complex spectrum bins.
#[derive(Clone, Debug, Default)]
pub struct ComplexSignal {
    data: Vec<Complex<f32>>,
}

impl ComplexSignal {
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![Complex::new(0.0, 0.0); size],
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[Complex<f32>] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [Complex<f32>] {
        &mut self.data
    }
}

impl AddAssign<f32> for ComplexSignal {
    fn add_assign(&mut self, x: f32) {
        for v in &mut self.data {
            v.re += x;
        }
    }
}

impl AddAssign<Complex<f32>> for ComplexSignal {
    fn add_assign(&mut self, x: Complex<f32>) {
        for v in &mut self.data {
            *v += x;
        }
    }
}

impl MulAssign<f32> for ComplexSignal {
    fn mul_assign(&mut self, x: f32) {
        for v in &mut self.data {
            v.re *= x;
            v.im *= x;
        }
    }
}
