//! Truncated SVD of snapshot matrices.
//!
//! [`truncated_svd`] factors X and keeps either a fixed number of singular
//! triplets ([`Truncation::Rank`]) or every singular value above a threshold
//! ([`Truncation::Tolerance`]). The factorisation itself is either the dense
//! economy SVD or a randomized range-finder estimate.

use faer::Mat;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use tracing::debug;

use crate::types::{DmdError, SvdComponents, SvdMethod, Truncation};
use crate::utils::default_tolerance;

/// Factor `x` and truncate according to `truncation`.
///
/// Fails when a fixed rank exceeds the available rank, when a tolerance
/// keeps nothing, or when a kept singular value is numerically zero (the
/// operator estimator divides by them).
pub fn truncated_svd(
    x: &Mat<f64>,
    truncation: Truncation,
    method: SvdMethod,
) -> Result<SvdComponents, DmdError> {
    let full = factor(x, method)?;
    reduce(&full, truncation, (x.nrows(), x.ncols()))
}

/// Apply `truncation` to an already computed factorisation of a matrix of
/// shape `dims`, rejecting numerically zero kept singular values.
pub fn reduce(
    full: &SvdComponents,
    truncation: Truncation,
    dims: (usize, usize),
) -> Result<SvdComponents, DmdError> {
    let rank = select_rank(&full.s, truncation)?;
    let svd = truncate(full, rank)?;
    check_nondegenerate(&svd.s, dims.0, dims.1)?;

    debug!(
        rank,
        sigma_max = svd.s.first().copied().unwrap_or(0.0),
        sigma_min = svd.s.last().copied().unwrap_or(0.0),
        "truncated SVD"
    );
    Ok(svd)
}

/// Economy factorisation of `x`: U (m × k), s (k), V (n × k), k = min(m, n)
/// for the dense backend or `n_components` for the randomized one.
pub fn factor(x: &Mat<f64>, method: SvdMethod) -> Result<SvdComponents, DmdError> {
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(DmdError::InvalidInput("cannot factor an empty matrix".into()));
    }
    match method {
        SvdMethod::Exact => economy_svd(x),
        SvdMethod::Randomized {
            n_components,
            n_oversamples,
            n_power_iter,
            seed,
        } => randomized_svd(x, n_components, n_oversamples, n_power_iter, seed),
    }
}

/// Number of singular values kept under `truncation`.
///
/// `singular_values` must be sorted in descending order.
pub fn select_rank(singular_values: &[f64], truncation: Truncation) -> Result<usize, DmdError> {
    let available = singular_values.len();
    match truncation {
        Truncation::Rank(r) => {
            if r == 0 {
                return Err(DmdError::InvalidInput("truncation rank must be positive".into()));
            }
            if r > available {
                return Err(DmdError::InvalidInput(format!(
                    "truncation rank {r} exceeds available rank {available}"
                )));
            }
            Ok(r)
        }
        Truncation::Tolerance(tol) => {
            if !(tol.is_finite() && tol > 0.0) {
                return Err(DmdError::InvalidInput(format!(
                    "singular value tolerance must be positive and finite, got {tol}"
                )));
            }
            let kept = singular_values.iter().take_while(|&&s| s > tol).count();
            if kept == 0 {
                return Err(DmdError::NumericalDegeneracy(format!(
                    "no singular value exceeds tolerance {tol}"
                )));
            }
            Ok(kept)
        }
    }
}

/// Keep the leading `rank` singular triplets.
pub fn truncate(full: &SvdComponents, rank: usize) -> Result<SvdComponents, DmdError> {
    if rank > full.rank() {
        return Err(DmdError::InvalidInput(format!(
            "cannot keep {rank} of {} singular triplets",
            full.rank()
        )));
    }
    Ok(SvdComponents {
        u: full.u.subcols(0, rank).to_owned(),
        s: full.s[..rank].to_vec(),
        v: full.v.subcols(0, rank).to_owned(),
    })
}

fn check_nondegenerate(s: &[f64], nrows: usize, ncols: usize) -> Result<(), DmdError> {
    let max_sv = s.first().copied().unwrap_or(0.0);
    let cutoff = default_tolerance(max_sv, nrows, ncols);
    for (i, &si) in s.iter().enumerate() {
        if !(si > cutoff) {
            return Err(DmdError::NumericalDegeneracy(format!(
                "singular value {i} = {si:e} is numerically zero; lower the truncation rank"
            )));
        }
    }
    Ok(())
}

fn economy_svd(x: &Mat<f64>) -> Result<SvdComponents, DmdError> {
    let svd = x.svd().map_err(|e| DmdError::SvdFailed(format!("{e:?}")))?;
    let k = x.nrows().min(x.ncols());
    let s_col = svd.S().column_vector();
    Ok(SvdComponents {
        u: svd.U().subcols(0, k).to_owned(),
        s: (0..k).map(|i| s_col[i]).collect(),
        v: svd.V().subcols(0, k).to_owned(),
    })
}

fn randomized_svd(
    x: &Mat<f64>,
    n_components: usize,
    n_oversamples: usize,
    n_power_iter: usize,
    seed: u64,
) -> Result<SvdComponents, DmdError> {
    let (m, n) = (x.nrows(), x.ncols());
    let max_rank = m.min(n);
    if n_components == 0 || n_components > max_rank {
        return Err(DmdError::InvalidInput(format!(
            "randomized SVD needs 1 ≤ n_components ≤ {max_rank}, got {n_components}"
        )));
    }
    let sketch = (n_components + n_oversamples).min(max_rank);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut omega = Mat::<f64>::zeros(n, sketch);
    for j in 0..sketch {
        for i in 0..n {
            omega[(i, j)] = rng.sample(StandardNormal);
        }
    }

    // Range finder with power iterations: Q spans range(X (XᵀX)^q Ω)
    let mut q = range_basis(&(x * &omega));
    for _ in 0..n_power_iter {
        let z = range_basis(&(x.transpose() * &q));
        q = range_basis(&(x * &z));
    }

    let b = q.transpose() * x; // (sketch × n)
    let small = b.svd().map_err(|e| DmdError::SvdFailed(format!("{e:?}")))?;
    let s_col = small.S().column_vector();

    let u = &q * small.U().subcols(0, n_components);
    Ok(SvdComponents {
        u,
        s: (0..n_components).map(|i| s_col[i]).collect(),
        v: small.V().subcols(0, n_components).to_owned(),
    })
}

/// Orthonormal basis of the column space of `y` (thin Q of its QR factorisation).
fn range_basis(y: &Mat<f64>) -> Mat<f64> {
    y.qr().compute_thin_Q()
}
