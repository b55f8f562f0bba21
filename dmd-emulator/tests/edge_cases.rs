//! Edge case and precondition tests.

use approx::assert_abs_diff_eq;
use dmd_emulator::*;
use faer::Mat;

fn decay_system(lambda: f64, n_time: usize) -> Mat<f64> {
    Mat::from_fn(2, n_time, |i, k| {
        let d = lambda.powi(k as i32);
        if i == 0 {
            1.0 + d
        } else {
            2.0 - 0.5 * d
        }
    })
}

fn rank_config(rank: usize) -> DmdConfig {
    DmdConfig {
        nobs: 10,
        truncation: Truncation::Rank(rank),
        ..Default::default()
    }
}

fn rkoi_config() -> RkoiConfig {
    RkoiConfig {
        nobs: 10,
        truncation: Truncation::Rank(2),
        interpolation: InterpolationKind::Linear,
    }
}

// ============================================================================
// Edge cases: tiny systems
// ============================================================================

#[test]
fn constant_single_variable() {
    let data = Mat::from_fn(1, 10, |_, _| 3.0);
    let mut emu = StandardDmd::new(rank_config(1));
    emu.fit(&data).unwrap();
    assert_abs_diff_eq!(emu.eigenvalues().unwrap()[0].re, 1.0, epsilon = 1e-12);

    let pred = emu.predict(&[0.0, 4.0, 25.0], 1.0).unwrap();
    for k in 0..3 {
        assert_abs_diff_eq!(pred[(0, k)], 3.0, epsilon = 1e-10);
    }
}

#[test]
fn minimum_snapshot_count() {
    // nobs = 2 leaves a single snapshot pair; x₁ = 2 x₀
    let mut data = Mat::<f64>::zeros(2, 2);
    data[(0, 0)] = 1.0;
    data[(1, 0)] = 0.5;
    data[(0, 1)] = 2.0;
    data[(1, 1)] = 1.0;
    let mut emu = StandardDmd::new(DmdConfig {
        nobs: 2,
        truncation: Truncation::Rank(1),
        ..Default::default()
    });
    let result = emu.fit(&data).unwrap();
    assert_eq!(result.rank, 1);
    assert_abs_diff_eq!(result.modes.eigenvalues[0].re, 2.0, epsilon = 1e-12);

    let pred = emu.predict(&[1.0], 1.0).unwrap();
    assert_abs_diff_eq!(pred[(0, 0)], 2.0, epsilon = 1e-10);
    assert_abs_diff_eq!(pred[(1, 0)], 1.0, epsilon = 1e-10);
}

#[test]
fn negative_eigenvalue_alternates_at_integer_steps() {
    // λ = -0.5 goes through the complex logarithm
    let data = decay_system(-0.5, 12);
    let mut emu = StandardDmd::new(rank_config(2));
    emu.fit(&data).unwrap();
    let pred = emu.predict(&[1.0, 2.0, 3.0], 1.0).unwrap();
    for (col, k) in [1usize, 2, 3].into_iter().enumerate() {
        assert_abs_diff_eq!(pred[(0, col)], data[(0, k)], epsilon = 1e-8);
        assert_abs_diff_eq!(pred[(1, col)], data[(1, k)], epsilon = 1e-8);
    }
}

#[test]
fn nobs_limits_training_window() {
    // snapshots past nobs are ignored, even if they break the dynamics
    let mut data = decay_system(0.5, 14);
    for i in 0..2 {
        data[(i, 13)] = 1e6;
    }
    let mut emu = StandardDmd::new(rank_config(2));
    let result = emu.fit(&data).unwrap();
    assert_eq!(result.data_dim, (2, 10));
    assert_abs_diff_eq!(result.modes.eigenvalues[1].re, 0.5, epsilon = 1e-10);
}

// ============================================================================
// Invalid inputs and numerical degeneracy
// ============================================================================

#[test]
fn rank_exceeding_data_is_rejected() {
    let data = decay_system(0.5, 12);
    assert!(dmd(&data, &rank_config(3)).is_err());
    assert!(dmd(&data, &rank_config(0)).is_err());
}

#[test]
fn nobs_out_of_bounds() {
    let data = decay_system(0.5, 5);
    assert!(matches!(
        dmd(&data, &rank_config(2)),
        Err(DmdError::InvalidInput(_))
    ));
    let cfg = DmdConfig {
        nobs: 1,
        ..rank_config(1)
    };
    assert!(matches!(
        dmd(&decay_system(0.5, 12), &cfg),
        Err(DmdError::InvalidInput(_))
    ));
}

#[test]
fn non_finite_data_is_rejected() {
    let mut data = decay_system(0.5, 12);
    data[(1, 3)] = f64::NAN;
    assert!(matches!(
        dmd(&data, &rank_config(2)),
        Err(DmdError::InvalidInput(_))
    ));
}

#[test]
fn zero_data_is_numerically_degenerate() {
    let data = Mat::<f64>::zeros(2, 12);
    assert!(matches!(
        dmd(&data, &rank_config(1)),
        Err(DmdError::NumericalDegeneracy(_))
    ));
    let tol = DmdConfig {
        truncation: Truncation::Tolerance(1e-8),
        ..rank_config(1)
    };
    assert!(dmd(&data, &tol).is_err());
}

#[test]
fn zero_step_width_is_rejected() {
    let mut emu = StandardDmd::new(rank_config(2));
    emu.fit(&decay_system(0.5, 12)).unwrap();
    assert!(matches!(
        emu.predict(&[0.0, 1.0], 0.0),
        Err(DmdError::InvalidInput(_))
    ));
}

#[test]
fn empty_time_range_gives_empty_prediction() {
    let mut emu = StandardDmd::new(rank_config(2));
    emu.fit(&decay_system(0.5, 12)).unwrap();
    let pred = emu.predict(&[], 1.0).unwrap();
    assert_eq!((pred.nrows(), pred.ncols()), (2, 0));
}

// ============================================================================
// Preconditions
// ============================================================================

#[test]
fn standard_predict_before_fit() {
    let emu = StandardDmd::new(rank_config(2));
    let err = emu.predict(&[0.0], 1.0).unwrap_err();
    assert!(matches!(err, DmdError::NotFitted("standard DMD")));
    assert!(err.to_string().contains("standard DMD"));
    assert!(emu.operator().is_err());
    assert!(emu.basis().is_err());
    assert!(emu.modes().is_err());
    assert!(emu.amplitudes().is_err());
}

#[test]
fn rkoi_preconditions_are_distinct() {
    let mut emu = Rkoi::new(rkoi_config());
    assert!(matches!(
        emu.predict(&[0.0], 1.0),
        Err(DmdError::NotFitted("rKOI"))
    ));
    assert!(matches!(emu.interp_dmd(0.5), Err(DmdError::NotFitted("rKOI"))));
    assert!(matches!(emu.training(), Err(DmdError::NotFitted("rKOI"))));

    let data = vec![decay_system(0.5, 12), decay_system(0.8, 12)];
    emu.fit(&data, &[0.0, 1.0]).unwrap();
    assert!(matches!(
        emu.predict(&[0.0], 1.0),
        Err(DmdError::NotInterpolated)
    ));
    assert!(matches!(emu.eigenvalues(), Err(DmdError::NotInterpolated)));
    assert!(emu.training().is_ok());
}

#[test]
fn refit_invalidates_interpolation() {
    let data = vec![decay_system(0.5, 12), decay_system(0.8, 12)];
    let mut emu = Rkoi::new(rkoi_config());
    emu.fit(&data, &[0.0, 1.0]).unwrap();
    emu.interp_dmd(0.5).unwrap();
    assert_eq!(emu.status(), RkoiStatus::Interpolated);

    emu.fit(&data, &[0.0, 1.0]).unwrap();
    assert_eq!(emu.status(), RkoiStatus::Fitted);
    assert!(matches!(
        emu.predict(&[0.0], 1.0),
        Err(DmdError::NotInterpolated)
    ));
}

#[test]
fn failed_rkoi_fit_leaves_unfitted() {
    let data = vec![decay_system(0.5, 12), decay_system(0.8, 12)];
    let mut emu = Rkoi::new(rkoi_config());
    emu.fit(&data, &[0.0, 1.0]).unwrap();
    emu.interp_dmd(0.5).unwrap();

    assert!(emu.fit(&data, &[0.0, 0.0]).is_err());
    assert_eq!(emu.status(), RkoiStatus::Unfitted);
}

// ============================================================================
// rKOI training-set validation
// ============================================================================

#[test]
fn rkoi_needs_two_parameters() {
    let mut emu = Rkoi::new(rkoi_config());
    let data = vec![decay_system(0.5, 12)];
    assert!(matches!(
        emu.fit(&data, &[0.0]),
        Err(DmdError::InvalidInput(_))
    ));
}

#[test]
fn rkoi_length_mismatch() {
    let mut emu = Rkoi::new(rkoi_config());
    let data = vec![decay_system(0.5, 12), decay_system(0.8, 12)];
    assert!(matches!(
        emu.fit(&data, &[0.0, 0.5, 1.0]),
        Err(DmdError::InvalidInput(_))
    ));
}

#[test]
fn rkoi_duplicate_or_non_finite_parameters() {
    let mut emu = Rkoi::new(rkoi_config());
    let data = vec![decay_system(0.5, 12), decay_system(0.8, 12)];
    assert!(matches!(
        emu.fit(&data, &[0.5, 0.5]),
        Err(DmdError::InvalidInput(_))
    ));
    assert!(matches!(
        emu.fit(&data, &[0.5, f64::NAN]),
        Err(DmdError::InvalidInput(_))
    ));
}

#[test]
fn rkoi_state_dimension_mismatch() {
    let mut emu = Rkoi::new(rkoi_config());
    let wide = Mat::from_fn(3, 12, |i, k| (i + 1) as f64 + 0.5_f64.powi(k as i32));
    let data = vec![decay_system(0.5, 12), wide];
    assert!(matches!(
        emu.fit(&data, &[0.0, 1.0]),
        Err(DmdError::ShapeMismatch(_))
    ));
}

#[test]
fn rkoi_nan_query_parameter() {
    let mut emu = Rkoi::new(rkoi_config());
    let data = vec![decay_system(0.5, 12), decay_system(0.8, 12)];
    emu.fit(&data, &[0.0, 1.0]).unwrap();
    assert!(matches!(
        emu.interp_dmd(f64::NAN),
        Err(DmdError::InvalidInput(_))
    ));
}

#[test]
fn compare_rejects_shape_mismatch() {
    let mut emu = StandardDmd::new(rank_config(2));
    let data = decay_system(0.5, 12);
    emu.fit(&data).unwrap();
    let pred = emu.predict(&[0.0, 1.0], 1.0).unwrap();
    assert!(matches!(compare(&pred, &data), Err(DmdError::Validation(_))));
}
