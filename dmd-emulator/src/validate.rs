use faer::Mat;

use crate::types::{DmdError, ValidationReport};

/// Compare a prediction against reference snapshots of the same shape.
///
/// For each column k the relative error is ‖pred[:, k] − ref[:, k]‖ /
/// ‖ref[:, k]‖; a reference column with (near) zero norm contributes its
/// absolute error instead. Row 0 is treated as the energy observable and
/// its absolute error is reported per column.
pub fn compare(prediction: &Mat<f64>, reference: &Mat<f64>) -> Result<ValidationReport, DmdError> {
    if prediction.nrows() != reference.nrows() || prediction.ncols() != reference.ncols() {
        return Err(DmdError::Validation(format!(
            "prediction is {} × {} but reference is {} × {}",
            prediction.nrows(),
            prediction.ncols(),
            reference.nrows(),
            reference.ncols()
        )));
    }
    let (n_vars, n_time) = (reference.nrows(), reference.ncols());
    if n_vars == 0 || n_time == 0 {
        return Err(DmdError::Validation("cannot compare empty matrices".into()));
    }

    let mut sum_sq = 0.0;
    let mut relative_errors = Vec::with_capacity(n_time);
    let mut first_row_abs_errors = Vec::with_capacity(n_time);

    for k in 0..n_time {
        let mut diff_sq = 0.0;
        let mut ref_sq = 0.0;
        for i in 0..n_vars {
            let diff = prediction[(i, k)] - reference[(i, k)];
            diff_sq += diff * diff;
            ref_sq += reference[(i, k)] * reference[(i, k)];
        }
        sum_sq += diff_sq;

        let ref_norm = ref_sq.sqrt();
        relative_errors.push(if ref_norm > 1e-14 {
            diff_sq.sqrt() / ref_norm
        } else {
            diff_sq.sqrt()
        });
        first_row_abs_errors.push((prediction[(0, k)] - reference[(0, k)]).abs());
    }

    let rmse = (sum_sq / (n_vars * n_time) as f64).sqrt();
    let max_relative_error = relative_errors.iter().copied().fold(0.0, f64::max);

    Ok(ValidationReport {
        relative_errors,
        first_row_abs_errors,
        rmse,
        max_relative_error,
    })
}
