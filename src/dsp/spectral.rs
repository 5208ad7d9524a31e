use super::signal::ComplexSignal;

/// Element-wise complex multiply: result[i] = a[i] * b[i].
///
/// Not parallelized internally; callers run this from parallel contexts.
pub fn spectral_convolution(a: &ComplexSignal, b: &ComplexSignal, result: &mut ComplexSignal) {
    assert!(
        a.len() == b.len() && b.len() == result.len(),
        "spectral_convolution: all buffer lengths must be equal"
    );
    let (a, b, r) = (a.data(), b.data(), result.data_mut());
    for i in 0..r.len() {
        r[i] = a[i] * b[i];
    }
}

/// Element-wise conjugate multiply: result[i] = a[i] * conj(b[i]).
pub fn spectral_correlation(a: &ComplexSignal, b: &ComplexSignal, result: &mut ComplexSignal) {
    assert!(
        a.len() == b.len() && b.len() == result.len(),
        "spectral_correlation: all buffer lengths must be equal"
    );
    let (a, b, r) = (a.data(), b.data(), result.data_mut());
    for i in 0..r.len() {
        r[i] = a[i] * b[i].conj();
    }
}
