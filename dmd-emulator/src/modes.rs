//! Eigendecomposition of the linear operator, mode projection, and
//! amplitude fitting.

use faer::Mat;

use crate::types::{DmdError, C64};
use crate::utils::pinv;

/// Eigenpairs of a real square operator, sorted by descending |λ|.
#[derive(Debug, Clone)]
pub struct Eigenpairs {
    /// Eigenvalues λ (r).
    pub values: Vec<C64>,
    /// Real parts of the eigenvectors (r × r), column j pairs with λ_j.
    pub vectors_re: Mat<f64>,
    /// Imaginary parts of the eigenvectors (r × r).
    pub vectors_im: Mat<f64>,
}

/// Eigendecompose a real square matrix.
///
/// Eigenpairs are returned in descending order of magnitude; ties keep the
/// order reported by the solver. The canonical ordering makes repeated fits
/// on identical data produce identical outputs.
pub fn eigendecompose(a: &Mat<f64>) -> Result<Eigenpairs, DmdError> {
    let n = a.nrows();
    if n == 0 || a.ncols() != n {
        return Err(DmdError::InvalidInput(format!(
            "operator must be square and non-empty, got {} × {}",
            a.nrows(),
            a.ncols()
        )));
    }

    let eigen = a
        .as_ref()
        .eigen()
        .map_err(|e| DmdError::EigenFailed(format!("{e:?}")))?;
    let eigenvalues_diag = eigen.S().column_vector();
    let eigenvectors = eigen.U();

    let raw: Vec<C64> = (0..n)
        .map(|j| {
            let ev = eigenvalues_diag[j];
            C64::new(ev.re, ev.im)
        })
        .collect();
    if raw.iter().any(|ev| !ev.is_finite()) {
        return Err(DmdError::EigenFailed("non-finite eigenvalue".into()));
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&p, &q| raw[q].norm().total_cmp(&raw[p].norm()));

    let mut values = Vec::with_capacity(n);
    let mut vectors_re = Mat::<f64>::zeros(n, n);
    let mut vectors_im = Mat::<f64>::zeros(n, n);
    for (dst, &src) in order.iter().enumerate() {
        values.push(raw[src]);
        for i in 0..n {
            let v = eigenvectors[(i, src)];
            vectors_re[(i, dst)] = v.re;
            vectors_im[(i, dst)] = v.im;
        }
    }

    Ok(Eigenpairs {
        values,
        vectors_re,
        vectors_im,
    })
}

/// Lift eigenvectors into state space: Φ = P W for a real (m × r) map P.
///
/// With P = U_r this is the projected-mode formula; with P = X' V_r Σ_r⁻¹
/// followed by [`scale_by_inverse_eigenvalues`] it gives exact DMD modes.
pub fn project_modes(p: &Mat<f64>, eig: &Eigenpairs) -> Result<Vec<Vec<C64>>, DmdError> {
    let rank = eig.values.len();
    if p.ncols() != rank {
        return Err(DmdError::ShapeMismatch(format!(
            "projection has {} columns, operator has rank {rank}",
            p.ncols()
        )));
    }
    let modes_re = p * &eig.vectors_re;
    let modes_im = p * &eig.vectors_im;

    // Row-major: modes[i][j] = mode j at variable i
    let n_vars = p.nrows();
    let mut modes = vec![vec![C64::zero(); rank]; n_vars];
    for i in 0..n_vars {
        for j in 0..rank {
            modes[i][j] = C64::new(modes_re[(i, j)], modes_im[(i, j)]);
        }
    }
    Ok(modes)
}

/// Eigenvectors themselves as modes (exact DMD, Φ = W).
pub fn eigenvector_modes(eig: &Eigenpairs) -> Vec<Vec<C64>> {
    let n = eig.values.len();
    (0..n)
        .map(|i| {
            (0..n)
                .map(|j| C64::new(eig.vectors_re[(i, j)], eig.vectors_im[(i, j)]))
                .collect()
        })
        .collect()
}

/// Divide mode column j by λ_j.
pub fn scale_by_inverse_eigenvalues(
    modes: &mut [Vec<C64>],
    eigenvalues: &[C64],
) -> Result<(), DmdError> {
    if let Some(j) = eigenvalues.iter().position(|ev| ev.norm() == 0.0) {
        return Err(DmdError::NumericalDegeneracy(format!(
            "eigenvalue {j} is zero; exact modes are undefined"
        )));
    }
    for row in modes.iter_mut() {
        for (m, &ev) in row.iter_mut().zip(eigenvalues) {
            *m = *m / ev;
        }
    }
    Ok(())
}

/// Solve for amplitudes b = argmin ‖Φ b − x₀‖₂.
///
/// The complex system is embedded as the real system
/// `[Re Φ, −Im Φ; Im Φ, Re Φ] [Re b; Im b] = [x₀; 0]` and solved with the
/// SVD pseudo-inverse, which gives the minimum-norm solution when Φ is rank
/// deficient or has more columns than rows.
pub fn solve_amplitudes(modes: &[Vec<C64>], x0: &[f64]) -> Result<Vec<C64>, DmdError> {
    let n_vars = modes.len();
    if x0.len() != n_vars {
        return Err(DmdError::ShapeMismatch(format!(
            "initial condition has length {}, modes have {n_vars} rows",
            x0.len()
        )));
    }
    let rank = modes.first().map_or(0, |row| row.len());
    if rank == 0 {
        return Ok(Vec::new());
    }

    let mut max_abs = 0.0_f64;
    let mut embedded = Mat::<f64>::zeros(2 * n_vars, 2 * rank);
    for i in 0..n_vars {
        for j in 0..rank {
            let m = modes[i][j];
            if !m.is_finite() {
                return Err(DmdError::NumericalDegeneracy(
                    "modes contain non-finite entries".into(),
                ));
            }
            max_abs = max_abs.max(m.norm());
            embedded[(i, j)] = m.re;
            embedded[(i, j + rank)] = -m.im;
            embedded[(i + n_vars, j)] = m.im;
            embedded[(i + n_vars, j + rank)] = m.re;
        }
    }
    if max_abs == 0.0 {
        return Err(DmdError::NumericalDegeneracy(
            "all modes are zero; amplitudes are undefined".into(),
        ));
    }

    let mut rhs = Mat::<f64>::zeros(2 * n_vars, 1);
    for (i, &v) in x0.iter().enumerate() {
        rhs[(i, 0)] = v;
    }

    let embedded_pinv = pinv(&embedded, None)?;
    let sol = &embedded_pinv * &rhs;
    Ok((0..rank)
        .map(|j| C64::new(sol[(j, 0)], sol[(j + rank, 0)]))
        .collect())
}

/// Φ c for mode coefficients c; with c = b this is the state at time zero.
pub fn synthesize(modes: &[Vec<C64>], amplitudes: &[C64]) -> Vec<C64> {
    modes
        .iter()
        .map(|row| {
            let mut acc = C64::zero();
            for (m, &b) in row.iter().zip(amplitudes) {
                acc += *m * b;
            }
            acc
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_near(a: f64, b: f64, eps: f64) {
        assert!(
            (a - b).abs() < eps,
            "expected {a} ≈ {b} (diff = {})",
            (a - b).abs()
        );
    }

    #[test]
    fn test_eigendecompose_sorted_by_magnitude() {
        let mut a = Mat::<f64>::zeros(3, 3);
        a[(0, 0)] = 0.2;
        a[(1, 1)] = -0.9;
        a[(2, 2)] = 0.5;
        let eig = eigendecompose(&a).unwrap();
        let mags: Vec<f64> = eig.values.iter().map(|v| v.norm()).collect();
        assert_near(mags[0], 0.9, 1e-10);
        assert_near(mags[1], 0.5, 1e-10);
        assert_near(mags[2], 0.2, 1e-10);
    }

    #[test]
    fn test_eigenpairs_satisfy_definition() {
        // Rotation-like matrix with complex eigenvalues 0.8 ± 0.3i
        let mut a = Mat::<f64>::zeros(2, 2);
        a[(0, 0)] = 0.8;
        a[(0, 1)] = -0.3;
        a[(1, 0)] = 0.3;
        a[(1, 1)] = 0.8;
        let eig = eigendecompose(&a).unwrap();
        for j in 0..2 {
            let lambda = eig.values[j];
            assert_near(lambda.re, 0.8, 1e-10);
            assert_near(lambda.im.abs(), 0.3, 1e-10);
            for i in 0..2 {
                // (A v)_i = λ v_i
                let mut av = C64::zero();
                for k in 0..2 {
                    av += C64::new(eig.vectors_re[(k, j)], eig.vectors_im[(k, j)]) * a[(i, k)];
                }
                let lv = lambda * C64::new(eig.vectors_re[(i, j)], eig.vectors_im[(i, j)]);
                assert_near(av.re, lv.re, 1e-10);
                assert_near(av.im, lv.im, 1e-10);
            }
        }
    }

    #[test]
    fn test_amplitudes_reproduce_initial_condition() {
        let modes = vec![
            vec![C64::new(1.0, 0.5), C64::new(0.0, 1.0)],
            vec![C64::new(0.3, 0.0), C64::new(2.0, -1.0)],
            vec![C64::new(-1.0, 0.2), C64::new(0.5, 0.5)],
        ];
        let b_true = vec![C64::new(0.7, -0.1), C64::new(-0.2, 0.4)];
        let x0: Vec<f64> = synthesize(&modes, &b_true).iter().map(|z| z.re).collect();
        let b = solve_amplitudes(&modes, &x0).unwrap();
        let recon = synthesize(&modes, &b);
        for (r, x) in recon.iter().zip(&x0) {
            assert_near(r.re, *x, 1e-8);
        }
    }

    #[test]
    fn test_amplitudes_underdetermined_min_norm() {
        // One equation, two unknowns: minimum-norm solution splits evenly.
        let modes = vec![vec![C64::from_re(1.0), C64::from_re(1.0)]];
        let b = solve_amplitudes(&modes, &[2.0]).unwrap();
        assert_near(b[0].re, 1.0, 1e-10);
        assert_near(b[1].re, 1.0, 1e-10);
        assert_near(b[0].im, 0.0, 1e-10);
    }

    #[test]
    fn test_amplitudes_singular_modes() {
        // Duplicate columns: rank deficient, still solvable in least squares.
        let modes = vec![
            vec![C64::from_re(1.0), C64::from_re(1.0)],
            vec![C64::from_re(2.0), C64::from_re(2.0)],
        ];
        let b = solve_amplitudes(&modes, &[1.0, 2.0]).unwrap();
        let recon = synthesize(&modes, &b);
        assert_near(recon[0].re, 1.0, 1e-10);
        assert_near(recon[1].re, 2.0, 1e-10);
    }

    #[test]
    fn test_amplitudes_zero_modes_fail() {
        let modes = vec![vec![C64::zero()], vec![C64::zero()]];
        assert!(matches!(
            solve_amplitudes(&modes, &[1.0, 1.0]),
            Err(DmdError::NumericalDegeneracy(_))
        ));
    }

    #[test]
    fn test_scale_by_zero_eigenvalue_fails() {
        let mut modes = vec![vec![C64::from_re(1.0)]];
        assert!(scale_by_inverse_eigenvalues(&mut modes, &[C64::zero()]).is_err());
    }
}
