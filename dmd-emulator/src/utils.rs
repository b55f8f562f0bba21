use faer::Mat;

use crate::types::DmdError;

/// Validate that a matrix meets minimum dimension requirements and contains no NaN/Inf.
pub fn validate_matrix(x: &Mat<f64>, min_rows: usize, min_cols: usize) -> Result<(), DmdError> {
    let (rows, cols) = (x.nrows(), x.ncols());
    if rows < min_rows {
        return Err(DmdError::InvalidInput(format!(
            "matrix has {rows} rows, need at least {min_rows}"
        )));
    }
    if cols < min_cols {
        return Err(DmdError::InvalidInput(format!(
            "matrix has {cols} columns, need at least {min_cols}"
        )));
    }
    for j in 0..cols {
        for i in 0..rows {
            let val = x[(i, j)];
            if val.is_nan() || val.is_infinite() {
                return Err(DmdError::InvalidInput(
                    "matrix contains NaN or Inf values".to_string(),
                ));
            }
        }
    }
    Ok(())
}

/// Split a snapshot matrix into the time-shifted pair (X, X').
///
/// X = data[:, 0..nobs-1], X' = data[:, 1..nobs].
pub fn snapshot_pair(data: &Mat<f64>, nobs: usize) -> Result<(Mat<f64>, Mat<f64>), DmdError> {
    if nobs < 2 {
        return Err(DmdError::InvalidInput(format!(
            "nobs must be at least 2, got {nobs}"
        )));
    }
    if nobs > data.ncols() {
        return Err(DmdError::InvalidInput(format!(
            "nobs = {nobs} exceeds the {} available snapshots",
            data.ncols()
        )));
    }
    validate_matrix(data, 1, nobs)?;

    let x = data.subcols(0, nobs - 1).to_owned();
    let xp = data.subcols(1, nobs - 1).to_owned();
    Ok((x, xp))
}

/// Compute the Moore-Penrose pseudo-inverse via SVD.
pub fn pinv(a: &Mat<f64>, tol: Option<f64>) -> Result<Mat<f64>, DmdError> {
    let svd = a.svd().map_err(|e| DmdError::SvdFailed(format!("{e:?}")))?;
    let u = svd.U();
    let s_col = svd.S().column_vector();
    let v = svd.V();

    let k = s_col.nrows();
    let max_sv = (0..k).map(|i| s_col[i].abs()).fold(0.0_f64, f64::max);

    let tol = tol.unwrap_or_else(|| default_tolerance(max_sv, a.nrows(), a.ncols()));

    // pinv(A) = V S_inv U^T
    let m = a.nrows();
    let n = a.ncols();
    let mut result = Mat::<f64>::zeros(n, m);

    for idx in 0..k {
        let si = s_col[idx];
        if si.abs() > tol {
            let si_inv = 1.0 / si;
            for j in 0..n {
                for i in 0..m {
                    result[(j, i)] += v[(j, idx)] * si_inv * u[(i, idx)];
                }
            }
        }
    }

    Ok(result)
}

/// Relative cutoff below which a singular value is treated as zero.
pub fn default_tolerance(max_sv: f64, nrows: usize, ncols: usize) -> f64 {
    max_sv * nrows.max(ncols) as f64 * f64::EPSILON
}

/// Flatten a matrix in row-major order.
pub fn flatten(m: &Mat<f64>) -> Vec<f64> {
    let mut out = Vec::with_capacity(m.nrows() * m.ncols());
    for i in 0..m.nrows() {
        for j in 0..m.ncols() {
            out.push(m[(i, j)]);
        }
    }
    out
}

/// Inverse of [`flatten`].
pub fn unflatten(values: &[f64], nrows: usize, ncols: usize) -> Result<Mat<f64>, DmdError> {
    if values.len() != nrows * ncols {
        return Err(DmdError::ShapeMismatch(format!(
            "cannot reshape {} values into {nrows} × {ncols}",
            values.len()
        )));
    }
    Ok(Mat::from_fn(nrows, ncols, |i, j| values[i * ncols + j]))
}

/// Column j of a matrix as a vector.
pub fn column(m: &Mat<f64>, j: usize) -> Vec<f64> {
    (0..m.nrows()).map(|i| m[(i, j)]).collect()
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
    fn test_validate_matrix_ok() {
        let m = Mat::<f64>::identity(3, 3);
        assert!(validate_matrix(&m, 1, 1).is_ok());
    }

    #[test]
    fn test_validate_matrix_too_small() {
        let m = Mat::<f64>::identity(2, 2);
        assert!(validate_matrix(&m, 3, 1).is_err());
    }

    #[test]
    fn test_validate_matrix_nan() {
        let mut m = Mat::<f64>::zeros(2, 2);
        m[(0, 0)] = 1.0;
        m[(0, 1)] = f64::NAN;
        assert!(validate_matrix(&m, 1, 1).is_err());
    }

    #[test]
    fn test_snapshot_pair_shift() {
        let data = Mat::from_fn(2, 5, |i, j| (10 * i + j) as f64);
        let (x, xp) = snapshot_pair(&data, 4).unwrap();
        assert_eq!((x.nrows(), x.ncols()), (2, 3));
        assert_eq!((xp.nrows(), xp.ncols()), (2, 3));
        for j in 0..3 {
            assert_eq!(x[(1, j)], (10 + j) as f64);
            assert_eq!(xp[(1, j)], (10 + j + 1) as f64);
        }
    }

    #[test]
    fn test_snapshot_pair_rejects_bad_nobs() {
        let data = Mat::<f64>::zeros(2, 5);
        assert!(snapshot_pair(&data, 1).is_err());
        assert!(snapshot_pair(&data, 6).is_err());
    }

    #[test]
    fn test_pinv_identity() {
        let m = Mat::<f64>::identity(3, 3);
        let m_inv = pinv(&m, None).unwrap();
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_near(m_inv[(i, j)], expected, 1e-10);
            }
        }
    }

    #[test]
    fn test_pinv_rectangular() {
        let mut m = Mat::<f64>::zeros(3, 2);
        m[(0, 0)] = 1.0;
        m[(1, 1)] = 1.0;
        let m_inv = pinv(&m, None).unwrap();
        assert_eq!(m_inv.nrows(), 2);
        assert_eq!(m_inv.ncols(), 3);
        // A * pinv(A) * A should equal A
        let product = &m * &m_inv * &m;
        for i in 0..3 {
            for j in 0..2 {
                assert_near(product[(i, j)], m[(i, j)], 1e-10);
            }
        }
    }

    #[test]
    fn test_flatten_row_major() {
        let m = Mat::from_fn(2, 3, |i, j| (3 * i + j) as f64);
        let flat = flatten(&m);
        assert_eq!(flat, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        let back = unflatten(&flat, 2, 3).unwrap();
        assert_eq!(back[(1, 2)], 5.0);
        assert!(unflatten(&flat, 4, 2).is_err());
    }
}
