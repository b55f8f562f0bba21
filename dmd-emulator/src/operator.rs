use faer::Mat;

use crate::types::{DmdError, SvdComponents};
use crate::utils::pinv;

/// Reduced operator Ã = U_rᵀ X' V_r Σ_r⁻¹ (r × r).
///
/// This is the least-squares linear map X → X' expressed in the basis U_r.
pub fn reduced_operator(svd: &SvdComponents, xp: &Mat<f64>) -> Result<Mat<f64>, DmdError> {
    let rank = svd.rank();
    if xp.nrows() != svd.u.nrows() || xp.ncols() != svd.v.nrows() {
        return Err(DmdError::ShapeMismatch(format!(
            "X' is {} × {}, basis expects {} × {}",
            xp.nrows(),
            xp.ncols(),
            svd.u.nrows(),
            svd.v.nrows()
        )));
    }
    if let Some(i) = svd.s.iter().position(|&s| s == 0.0 || !s.is_finite()) {
        return Err(DmdError::NumericalDegeneracy(format!(
            "singular value {i} cannot be inverted"
        )));
    }

    let ut_xp = svd.u.transpose() * xp; // (r × n-1)
    let ut_xp_v = &ut_xp * &svd.v; // (r × r)

    // Multiply by Σ⁻¹ (scale columns)
    let mut a_tilde = Mat::<f64>::zeros(rank, rank);
    for i in 0..rank {
        for j in 0..rank {
            a_tilde[(i, j)] = ut_xp_v[(i, j)] / svd.s[j];
        }
    }
    Ok(a_tilde)
}

/// Exact operator A = X' X⁺ (m × m).
pub fn exact_operator(x: &Mat<f64>, xp: &Mat<f64>) -> Result<Mat<f64>, DmdError> {
    if x.nrows() != xp.nrows() || x.ncols() != xp.ncols() {
        return Err(DmdError::ShapeMismatch(format!(
            "X is {} × {} but X' is {} × {}",
            x.nrows(),
            x.ncols(),
            xp.nrows(),
            xp.ncols()
        )));
    }
    let x_pinv = pinv(x, None)?;
    Ok(xp * &x_pinv)
}

/// X' V_r Σ_r⁻¹ (m × r), the image of the reduced coordinates under one step.
pub fn shifted_projection(svd: &SvdComponents, xp: &Mat<f64>) -> Mat<f64> {
    let xp_v = xp * &svd.v;
    let mut out = Mat::<f64>::zeros(xp.nrows(), svd.rank());
    for i in 0..xp.nrows() {
        for j in 0..svd.rank() {
            out[(i, j)] = xp_v[(i, j)] / svd.s[j];
        }
    }
    out
}
