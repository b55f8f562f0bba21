use faer::Mat;

use crate::modes::synthesize;
use crate::types::{DmdError, ModeSet, C64};

/// Evaluate the DMD expansion at continuous times.
///
/// x(s) = Re Σⱼ φⱼ · bⱼ · exp(ln(λⱼ) / ds · s)
///
/// `ds` is the snapshot spacing the operator was built with, so s = k · ds
/// reproduces the discrete evolution λᵏ. Column k of the output is the
/// state at `s_range[k]`.
///
/// # Arguments
/// * `set` - Eigenvalues, modes and amplitudes.
/// * `s_range` - Times at which to evaluate, in output column order.
/// * `ds` - Snapshot spacing (non-zero).
///
/// # Returns
/// Matrix (n_vars × s_range.len()) of reconstructed snapshots.
pub fn reconstruct(set: &ModeSet, s_range: &[f64], ds: f64) -> Result<Mat<f64>, DmdError> {
    if ds == 0.0 || !ds.is_finite() {
        return Err(DmdError::InvalidInput(format!(
            "step width ds must be non-zero and finite, got {ds}"
        )));
    }
    if let Some(s) = s_range.iter().find(|s| !s.is_finite()) {
        return Err(DmdError::InvalidInput(format!("non-finite time value {s}")));
    }
    let rank = set.len();
    if set.amplitudes.len() != rank || set.modes.iter().any(|row| row.len() != rank) {
        return Err(DmdError::ShapeMismatch(format!(
            "{rank} eigenvalues but {} amplitudes / ragged mode matrix",
            set.amplitudes.len()
        )));
    }
    if let Some(j) = set.eigenvalues.iter().position(|ev| ev.norm() == 0.0) {
        return Err(DmdError::NumericalDegeneracy(format!(
            "eigenvalue {j} is zero; its logarithm is undefined"
        )));
    }

    // Continuous-time exponents ω = ln(λ) / ds
    let omegas: Vec<C64> = set.eigenvalues.iter().map(|ev| ev.ln() / ds).collect();

    let mut out = Mat::<f64>::zeros(set.n_vars(), s_range.len());
    let mut coeffs = vec![C64::zero(); rank];

    for (k, &s) in s_range.iter().enumerate() {
        for j in 0..rank {
            coeffs[j] = (omegas[j] * s).exp() * set.amplitudes[j];
        }
        for (i, val) in synthesize(&set.modes, &coeffs).into_iter().enumerate() {
            out[(i, k)] = val.re;
        }
    }

    Ok(out)
}

/// Evenly spaced times t0, t0 + dt, … up to and including t1.
pub fn time_range(t0: f64, t1: f64, dt: f64) -> Result<Vec<f64>, DmdError> {
    if !(dt > 0.0 && dt.is_finite()) {
        return Err(DmdError::InvalidInput(format!(
            "time step must be positive, got {dt}"
        )));
    }
    if !(t0.is_finite() && t1.is_finite()) || t1 < t0 {
        return Err(DmdError::InvalidInput(format!(
            "invalid time range [{t0}, {t1}]"
        )));
    }
    // Tolerate t1 landing a rounding error short of a grid point
    let steps = ((t1 - t0) / dt + 1e-9).floor() as usize;
    Ok((0..=steps).map(|k| t0 + k as f64 * dt).collect())
}
