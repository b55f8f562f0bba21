//! Physical constraints on DMD spectra.
//!
//! DMD eigenvalues stand for e^(ω ds). A decaying or steady system should
//! have no dominant mode that grows (λ > 1) and no complex or negative
//! eigenvalue feeding the logarithm of the analytic expansion. Two filters
//! are provided:
//!
//! - [`enforce_background`] for standard DMD: the largest-magnitude
//!   eigenvalue becomes exactly 1 and every eigenvalue is made real.
//! - [`filter_interpolated`] for rKOI: real parts only, positive eigenvalues
//!   only, sorted descending, dominant eigenvalue clamped to at most 1.

use tracing::warn;

use crate::types::{DmdError, ModeSet, C64};

/// Pin the largest-magnitude eigenvalue to 1 (the steady background mode)
/// and discard the imaginary part of every eigenvalue.
pub fn enforce_background(eigenvalues: &mut [C64]) {
    let dominant = eigenvalues
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.norm().total_cmp(&b.norm()))
        .map(|(i, _)| i);

    if let Some(i) = dominant {
        eigenvalues[i] = C64::from_re(1.0);
    }
    for ev in eigenvalues.iter_mut() {
        ev.im = 0.0;
    }
}

/// Filter an interpolated spectrum into a physically admissible one.
///
/// Eigenvalue, mode column and amplitude are kept or dropped together.
/// Fails when no positive eigenvalue survives.
pub fn filter_interpolated(set: ModeSet) -> Result<ModeSet, DmdError> {
    let ModeSet {
        eigenvalues,
        modes,
        amplitudes,
    } = set;
    if amplitudes.len() != eigenvalues.len() {
        return Err(DmdError::ShapeMismatch(format!(
            "{} amplitudes for {} eigenvalues",
            amplitudes.len(),
            eigenvalues.len()
        )));
    }

    let real: Vec<f64> = eigenvalues.iter().map(|ev| ev.re).collect();
    let mut keep: Vec<usize> = (0..real.len()).filter(|&j| real[j] > 0.0).collect();
    if keep.len() < real.len() {
        warn!(
            dropped = real.len() - keep.len(),
            kept = keep.len(),
            "dropping non-positive eigenvalues from interpolated operator"
        );
    }
    if keep.is_empty() {
        return Err(DmdError::NumericalDegeneracy(
            "interpolated operator has no positive real eigenvalue".into(),
        ));
    }

    keep.sort_by(|&a, &b| real[b].total_cmp(&real[a]));

    let mut filtered_eigs: Vec<C64> = keep.iter().map(|&j| C64::from_re(real[j])).collect();
    let filtered_modes: Vec<Vec<C64>> = modes
        .iter()
        .map(|row| keep.iter().map(|&j| row[j]).collect())
        .collect();
    let filtered_amps: Vec<C64> = keep.iter().map(|&j| amplitudes[j]).collect();

    if filtered_eigs[0].re > 1.0 {
        filtered_eigs[0] = C64::from_re(1.0);
    }

    Ok(ModeSet {
        eigenvalues: filtered_eigs,
        modes: filtered_modes,
        amplitudes: filtered_amps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enforce_background_pins_dominant() {
        let mut eigs = vec![
            C64::new(0.5, 0.1),
            C64::new(-0.2, 1.1),
            C64::new(0.9, -0.05),
        ];
        enforce_background(&mut eigs);
        // |-0.2 + 1.1i| is the largest
        assert_eq!(eigs[1], C64::from_re(1.0));
        assert_eq!(eigs[0], C64::from_re(0.5));
        assert_eq!(eigs[2], C64::from_re(0.9));
    }

    #[test]
    fn test_enforce_background_empty() {
        let mut eigs: Vec<C64> = Vec::new();
        enforce_background(&mut eigs);
        assert!(eigs.is_empty());
    }

    #[test]
    fn test_filter_keeps_matched_triples() {
        let set = ModeSet {
            eigenvalues: vec![
                C64::new(0.3, 0.2),
                C64::new(-0.5, 0.0),
                C64::new(1.2, 0.0),
                C64::new(0.0, 0.4),
            ],
            modes: vec![
                vec![
                    C64::from_re(1.0),
                    C64::from_re(2.0),
                    C64::from_re(3.0),
                    C64::from_re(4.0),
                ],
                vec![
                    C64::from_re(10.0),
                    C64::from_re(20.0),
                    C64::from_re(30.0),
                    C64::from_re(40.0),
                ],
            ],
            amplitudes: vec![
                C64::from_re(0.1),
                C64::from_re(0.2),
                C64::from_re(0.3),
                C64::from_re(0.4),
            ],
        };
        let out = filter_interpolated(set).unwrap();

        // 1.2 (clamped to 1) then 0.3; -0.5 and 0.0 dropped
        assert_eq!(out.eigenvalues, vec![C64::from_re(1.0), C64::from_re(0.3)]);
        assert_eq!(out.amplitudes, vec![C64::from_re(0.3), C64::from_re(0.1)]);
        assert_eq!(out.modes[0], vec![C64::from_re(3.0), C64::from_re(1.0)]);
        assert_eq!(out.modes[1], vec![C64::from_re(30.0), C64::from_re(10.0)]);
    }

    #[test]
    fn test_filter_leaves_subunit_dominant() {
        let set = ModeSet {
            eigenvalues: vec![C64::from_re(0.4), C64::from_re(0.8)],
            modes: vec![vec![C64::from_re(1.0), C64::from_re(1.0)]],
            amplitudes: vec![C64::from_re(1.0), C64::from_re(2.0)],
        };
        let out = filter_interpolated(set).unwrap();
        assert_eq!(out.eigenvalues, vec![C64::from_re(0.8), C64::from_re(0.4)]);
        assert_eq!(out.amplitudes, vec![C64::from_re(2.0), C64::from_re(1.0)]);
    }

    #[test]
    fn test_filter_all_negative_fails() {
        let set = ModeSet {
            eigenvalues: vec![C64::from_re(-0.4)],
            modes: vec![vec![C64::from_re(1.0)]],
            amplitudes: vec![C64::from_re(1.0)],
        };
        assert!(matches!(
            filter_interpolated(set),
            Err(DmdError::NumericalDegeneracy(_))
        ));
    }
}
