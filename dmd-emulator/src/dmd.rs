use faer::Mat;
use tracing::info;

use crate::modes::{
    eigendecompose, eigenvector_modes, project_modes, scale_by_inverse_eigenvalues,
    solve_amplitudes, Eigenpairs,
};
use crate::operator::{exact_operator, reduced_operator, shifted_projection};
use crate::physics::enforce_background;
use crate::reconstruct::reconstruct;
use crate::svd::truncated_svd;
use crate::types::{DmdConfig, DmdError, DmdResult, ModeProjection, ModeSet, SvdComponents, C64};
use crate::utils::{column, snapshot_pair};

/// Perform Dynamic Mode Decomposition on a snapshot matrix.
///
/// # Arguments
/// * `data` - Snapshot matrix (m variables × n snapshots), columns are time-ordered.
/// * `config` - DMD configuration; only the first `config.nobs` columns are used.
///
/// # Algorithm
/// 1. Split into X = data[:, 0..nobs-1] and X' = data[:, 1..nobs]
/// 2. Reduced: truncated SVD X ≈ U Σ Vᵀ, Ã = Uᵀ X' V Σ⁻¹, eigenpairs Ã W = W Λ,
///    Φ = U W (or X' V Σ⁻¹ W Λ⁻¹ for exact modes)
/// 3. Exact: A = X' X⁺, eigenpairs A W = W Λ, Φ = W
/// 4. Amplitudes: b = argmin ‖Φ b − x₀‖
/// 5. Optionally pin the dominant eigenvalue to 1 and drop imaginary parts
pub fn dmd(data: &Mat<f64>, config: &DmdConfig) -> Result<DmdResult, DmdError> {
    let (x, xp) = snapshot_pair(data, config.nobs)?;
    let n_vars = x.nrows();
    let x0 = column(&x, 0);

    let (operator, svd, modes, mut eigenvalues) = if config.exact {
        let a = exact_operator(&x, &xp)?;
        let eig = eigendecompose(&a)?;
        let modes = eigenvector_modes(&eig);
        (a, None, modes, eig.values)
    } else {
        let svd = truncated_svd(&x, config.truncation, config.svd_method)?;
        let a_tilde = reduced_operator(&svd, &xp)?;
        let eig = eigendecompose(&a_tilde)?;
        let modes = reduced_modes(&svd, &xp, &eig, config.projection)?;
        (a_tilde, Some(svd), modes, eig.values)
    };

    let amplitudes = solve_amplitudes(&modes, &x0)?;

    if config.enforce_physics {
        enforce_background(&mut eigenvalues);
    }

    let rank = eigenvalues.len();
    info!(
        rank,
        n_vars,
        nobs = config.nobs,
        exact = config.exact,
        enforce_physics = config.enforce_physics,
        "fitted standard DMD"
    );

    Ok(DmdResult {
        operator,
        svd,
        modes: ModeSet {
            eigenvalues,
            modes,
            amplitudes,
        },
        rank,
        x_first: x0,
        data_dim: (n_vars, config.nobs),
        exact: config.exact,
        physics_enforced: config.enforce_physics,
    })
}

fn reduced_modes(
    svd: &SvdComponents,
    xp: &Mat<f64>,
    eig: &Eigenpairs,
    projection: ModeProjection,
) -> Result<Vec<Vec<C64>>, DmdError> {
    match projection {
        ModeProjection::Projected => project_modes(&svd.u, eig),
        ModeProjection::ExactModes => {
            let mut modes = project_modes(&shifted_projection(svd, xp), eig)?;
            scale_by_inverse_eigenvalues(&mut modes, &eig.values)?;
            Ok(modes)
        }
    }
}

/// Standard DMD emulator: fit once on a snapshot matrix, then predict at
/// arbitrary continuous times.
#[derive(Debug, Clone, Default)]
pub struct StandardDmd {
    config: DmdConfig,
    fitted: Option<DmdResult>,
}

impl StandardDmd {
    pub fn new(config: DmdConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }

    pub fn config(&self) -> &DmdConfig {
        &self.config
    }

    /// Build the DMD operator from `data`, replacing any previous fit.
    ///
    /// On failure the estimator is left unfitted.
    pub fn fit(&mut self, data: &Mat<f64>) -> Result<&DmdResult, DmdError> {
        self.fitted = None;
        let result = dmd(data, &self.config)?;
        Ok(&*self.fitted.insert(result))
    }

    /// Reconstruct snapshots at each time in `s_range`; `ds` is the snapshot
    /// spacing of the training data.
    pub fn predict(&self, s_range: &[f64], ds: f64) -> Result<Mat<f64>, DmdError> {
        reconstruct(&self.result()?.modes, s_range, ds)
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Full fit record.
    pub fn result(&self) -> Result<&DmdResult, DmdError> {
        self.fitted.as_ref().ok_or(DmdError::NotFitted("standard DMD"))
    }

    /// Ã (reduced) or A (exact).
    pub fn operator(&self) -> Result<&Mat<f64>, DmdError> {
        Ok(&self.result()?.operator)
    }

    /// U_r; `None` for exact DMD.
    pub fn basis(&self) -> Result<Option<&Mat<f64>>, DmdError> {
        Ok(self.result()?.basis())
    }

    pub fn eigenvalues(&self) -> Result<&[C64], DmdError> {
        Ok(&self.result()?.modes.eigenvalues)
    }

    pub fn modes(&self) -> Result<&[Vec<C64>], DmdError> {
        Ok(&self.result()?.modes.modes)
    }

    pub fn amplitudes(&self) -> Result<&[C64], DmdError> {
        Ok(&self.result()?.modes.amplitudes)
    }
}
