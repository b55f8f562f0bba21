//! Parametric DMD by reduced Koopman Operator Interpolation (rKOI).
//!
//! One reduced DMD fit per training parameter yields (Ã, U_r, b). Each is
//! flattened into a column of a stack and a 1-D interpolator is fitted along
//! the parameter axis for each stack. At a query parameter the three
//! quantities are interpolated, Ã is eigendecomposed again, and the physical
//! filter is applied to the resulting spectrum.
//!
//! Reference: Huhn et al. (2022), arXiv:2204.12006.

use faer::Mat;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::interp::StackInterpolator;
use crate::modes::{eigendecompose, project_modes, solve_amplitudes};
use crate::operator::reduced_operator;
use crate::physics::filter_interpolated;
use crate::reconstruct::reconstruct;
use crate::svd::{factor, reduce, select_rank};
use crate::types::{
    DmdError, ModeSet, ReducedFit, RkoiConfig, SvdComponents, SvdMethod, Truncation, C64,
};
use crate::utils::{column, flatten, snapshot_pair, unflatten};

/// Lifecycle of an [`Rkoi`] emulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RkoiStatus {
    Unfitted,
    Fitted,
    Interpolated,
}

/// Training stacks and their interpolators.
#[derive(Debug, Clone)]
pub struct TrainingSet {
    /// Training parameters in the order given to `fit`.
    pub parameters: Vec<f64>,
    /// Flattened Ã per parameter ((r·r) × n_params).
    pub operator_stack: Mat<f64>,
    /// Flattened U_r per parameter ((m·r) × n_params).
    pub basis_stack: Mat<f64>,
    /// Amplitudes per parameter (2r × n_params): rows 0..r hold Re b,
    /// rows r..2r hold Im b.
    pub amplitude_stack: Mat<f64>,
    /// Common reduced rank r.
    pub rank: usize,
    /// State dimension m.
    pub n_vars: usize,
    operator_interp: StackInterpolator,
    basis_interp: StackInterpolator,
    amplitude_interp: StackInterpolator,
}

impl TrainingSet {
    /// Inclusive parameter range covered by the training set.
    pub fn range(&self) -> (f64, f64) {
        self.operator_interp.range()
    }

    /// Shape of Ã.
    pub fn operator_shape(&self) -> (usize, usize) {
        (self.rank, self.rank)
    }

    /// Shape of U_r.
    pub fn basis_shape(&self) -> (usize, usize) {
        (self.n_vars, self.rank)
    }

    /// Training amplitudes of parameter column `k` as complex numbers.
    pub fn amplitudes(&self, k: usize) -> Vec<C64> {
        split_complex(&column(&self.amplitude_stack, k), self.rank)
    }
}

/// Operator materialised at one query parameter.
#[derive(Debug, Clone)]
pub struct InterpolatedOperator {
    /// Query parameter.
    pub parameter: f64,
    /// Interpolated Ã (r × r), before eigendecomposition.
    pub operator: Mat<f64>,
    /// Interpolated U_r (m × r).
    pub basis: Mat<f64>,
    /// Interpolated amplitudes (r), before filtering.
    pub raw_amplitudes: Vec<C64>,
    /// Eigenvalues of the interpolated Ã, before filtering.
    pub raw_eigenvalues: Vec<C64>,
    /// Filtered eigenvalues, modes and amplitudes used for prediction.
    pub modes: ModeSet,
}

#[derive(Debug, Clone)]
enum RkoiState {
    Unfitted,
    Fitted(TrainingSet),
    Interpolated(TrainingSet, InterpolatedOperator),
}

/// Parametric DMD emulator.
///
/// `fit` → `interp_dmd(p)` → `predict`. `interp_dmd` may be repeated for new
/// parameters without refitting; `fit` discards any interpolated operator.
#[derive(Debug, Clone)]
pub struct Rkoi {
    config: RkoiConfig,
    state: RkoiState,
}

impl Default for Rkoi {
    fn default() -> Self {
        Self::new(RkoiConfig::default())
    }
}

impl Rkoi {
    pub fn new(config: RkoiConfig) -> Self {
        Self {
            config,
            state: RkoiState::Unfitted,
        }
    }

    pub fn config(&self) -> &RkoiConfig {
        &self.config
    }

    pub fn status(&self) -> RkoiStatus {
        match self.state {
            RkoiState::Unfitted => RkoiStatus::Unfitted,
            RkoiState::Fitted(_) => RkoiStatus::Fitted,
            RkoiState::Interpolated(..) => RkoiStatus::Interpolated,
        }
    }

    /// Fit one reduced DMD per training matrix and build the interpolators.
    ///
    /// `data_list[k]` is the snapshot matrix observed at `parameters[k]`.
    /// Every matrix must have the same state dimension. With
    /// [`Truncation::Tolerance`] all matrices are truncated to the smallest
    /// kept rank so that flattened shapes agree.
    pub fn fit(
        &mut self,
        data_list: &[Mat<f64>],
        parameters: &[f64],
    ) -> Result<&TrainingSet, DmdError> {
        self.state = RkoiState::Unfitted;

        if data_list.len() != parameters.len() {
            return Err(DmdError::InvalidInput(format!(
                "{} snapshot matrices but {} parameters",
                data_list.len(),
                parameters.len()
            )));
        }
        if data_list.len() < 2 {
            return Err(DmdError::InvalidInput(
                "rKOI needs at least 2 training parameters".into(),
            ));
        }
        let n_vars = data_list[0].nrows();
        if let Some((k, d)) = data_list.iter().enumerate().find(|(_, d)| d.nrows() != n_vars) {
            return Err(DmdError::ShapeMismatch(format!(
                "training matrix {k} has {} rows, matrix 0 has {n_vars}",
                d.nrows()
            )));
        }

        let nobs = self.config.nobs;
        let factored: Vec<(Mat<f64>, Mat<f64>, SvdComponents)> = data_list
            .par_iter()
            .map(|data| {
                let (x, xp) = snapshot_pair(data, nobs)?;
                let full = factor(&x, SvdMethod::Exact)?;
                Ok((x, xp, full))
            })
            .collect::<Result<_, DmdError>>()?;

        let rank = common_rank(&factored, self.config.truncation)?;

        let fits: Vec<ReducedFit> = factored
            .par_iter()
            .map(|(x, xp, full)| fit_reduced(x, xp, full, rank))
            .collect::<Result<_, DmdError>>()?;

        for (p, f) in parameters.iter().zip(&fits) {
            debug!(
                parameter = p,
                dominant = f.eigenvalues.first().map(|ev| ev.norm()).unwrap_or(0.0),
                "fitted training operator"
            );
        }

        let training = build_training_set(parameters, &fits, rank, n_vars, &self.config)?;
        info!(
            n_params = parameters.len(),
            rank,
            n_vars,
            range_min = training.range().0,
            range_max = training.range().1,
            "fitted rKOI interpolators"
        );

        self.state = RkoiState::Fitted(training);
        self.training()
    }

    /// Materialise the DMD operator at `param`.
    ///
    /// Fails with [`DmdError::OutOfRange`] outside the training range. On any
    /// failure a previously interpolated operator is discarded.
    pub fn interp_dmd(&mut self, param: f64) -> Result<&InterpolatedOperator, DmdError> {
        let training = match std::mem::replace(&mut self.state, RkoiState::Unfitted) {
            RkoiState::Unfitted => return Err(DmdError::NotFitted("rKOI")),
            RkoiState::Fitted(t) | RkoiState::Interpolated(t, _) => t,
        };

        match interpolate(&training, param) {
            Ok(op) => {
                info!(
                    parameter = param,
                    n_modes = op.modes.len(),
                    dominant = op.modes.eigenvalues[0].re,
                    "interpolated rKOI operator"
                );
                self.state = RkoiState::Interpolated(training, op);
                self.interpolated()
            }
            Err(e) => {
                self.state = RkoiState::Fitted(training);
                Err(e)
            }
        }
    }

    /// Reconstruct snapshots at the interpolated parameter for each time in
    /// `s_range`.
    pub fn predict(&self, s_range: &[f64], ds: f64) -> Result<Mat<f64>, DmdError> {
        reconstruct(&self.interpolated()?.modes, s_range, ds)
    }

    /// Training stacks; requires `fit`.
    pub fn training(&self) -> Result<&TrainingSet, DmdError> {
        match &self.state {
            RkoiState::Unfitted => Err(DmdError::NotFitted("rKOI")),
            RkoiState::Fitted(t) | RkoiState::Interpolated(t, _) => Ok(t),
        }
    }

    /// Interpolated operator; requires `fit` and `interp_dmd`.
    pub fn interpolated(&self) -> Result<&InterpolatedOperator, DmdError> {
        match &self.state {
            RkoiState::Unfitted => Err(DmdError::NotFitted("rKOI")),
            RkoiState::Fitted(_) => Err(DmdError::NotInterpolated),
            RkoiState::Interpolated(_, op) => Ok(op),
        }
    }

    pub fn operator(&self) -> Result<&Mat<f64>, DmdError> {
        Ok(&self.interpolated()?.operator)
    }

    pub fn basis(&self) -> Result<&Mat<f64>, DmdError> {
        Ok(&self.interpolated()?.basis)
    }

    pub fn eigenvalues(&self) -> Result<&[C64], DmdError> {
        Ok(&self.interpolated()?.modes.eigenvalues)
    }

    pub fn modes(&self) -> Result<&[Vec<C64>], DmdError> {
        Ok(&self.interpolated()?.modes.modes)
    }

    pub fn amplitudes(&self) -> Result<&[C64], DmdError> {
        Ok(&self.interpolated()?.modes.amplitudes)
    }
}

/// Rank shared by every training matrix.
fn common_rank(
    factored: &[(Mat<f64>, Mat<f64>, SvdComponents)],
    truncation: Truncation,
) -> Result<usize, DmdError> {
    let ranks: Vec<usize> = factored
        .iter()
        .map(|(_, _, full)| select_rank(&full.s, truncation))
        .collect::<Result<_, _>>()?;
    let rank = ranks.iter().copied().min().unwrap_or(0);
    if ranks.iter().any(|&r| r != rank) {
        warn!(
            ?ranks,
            rank, "tolerance keeps different ranks per parameter; truncating all to the smallest"
        );
    }
    Ok(rank)
}

/// Reduced operator, basis and amplitudes of one training matrix.
fn fit_reduced(
    x: &Mat<f64>,
    xp: &Mat<f64>,
    full: &SvdComponents,
    rank: usize,
) -> Result<ReducedFit, DmdError> {
    let svd = reduce(full, Truncation::Rank(rank), (x.nrows(), x.ncols()))?;
    let operator = reduced_operator(&svd, xp)?;
    let eig = eigendecompose(&operator)?;
    let modes = project_modes(&svd.u, &eig)?;
    let amplitudes = solve_amplitudes(&modes, &column(x, 0))?;
    Ok(ReducedFit {
        operator,
        basis: svd.u,
        amplitudes,
        eigenvalues: eig.values,
    })
}

fn build_training_set(
    parameters: &[f64],
    fits: &[ReducedFit],
    rank: usize,
    n_vars: usize,
    config: &RkoiConfig,
) -> Result<TrainingSet, DmdError> {
    let n_params = fits.len();
    let mut operator_stack = Mat::<f64>::zeros(rank * rank, n_params);
    let mut basis_stack = Mat::<f64>::zeros(n_vars * rank, n_params);
    let mut amplitude_stack = Mat::<f64>::zeros(2 * rank, n_params);

    for (k, fit) in fits.iter().enumerate() {
        let a = flatten(&fit.operator);
        let u = flatten(&fit.basis);
        if a.len() != rank * rank || u.len() != n_vars * rank || fit.amplitudes.len() != rank {
            return Err(DmdError::ShapeMismatch(format!(
                "training fit {k} has shapes Ã {} × {}, U_r {} × {}, expected rank {rank}",
                fit.operator.nrows(),
                fit.operator.ncols(),
                fit.basis.nrows(),
                fit.basis.ncols()
            )));
        }
        for (i, v) in a.into_iter().enumerate() {
            operator_stack[(i, k)] = v;
        }
        for (i, v) in u.into_iter().enumerate() {
            basis_stack[(i, k)] = v;
        }
        for (i, b) in fit.amplitudes.iter().enumerate() {
            amplitude_stack[(i, k)] = b.re;
            amplitude_stack[(i + rank, k)] = b.im;
        }
    }

    let kind = config.interpolation;
    Ok(TrainingSet {
        parameters: parameters.to_vec(),
        operator_interp: StackInterpolator::new(parameters, &operator_stack, kind)?,
        basis_interp: StackInterpolator::new(parameters, &basis_stack, kind)?,
        amplitude_interp: StackInterpolator::new(parameters, &amplitude_stack, kind)?,
        operator_stack,
        basis_stack,
        amplitude_stack,
        rank,
        n_vars,
    })
}

fn interpolate(training: &TrainingSet, param: f64) -> Result<InterpolatedOperator, DmdError> {
    let rank = training.rank;
    let operator = unflatten(&training.operator_interp.eval(param)?, rank, rank)?;
    let basis = unflatten(&training.basis_interp.eval(param)?, training.n_vars, rank)?;
    let raw_amplitudes = split_complex(&training.amplitude_interp.eval(param)?, rank);

    let eig = eigendecompose(&operator)?;
    let modes = project_modes(&basis, &eig)?;
    let raw_eigenvalues = eig.values;

    let filtered = filter_interpolated(ModeSet {
        eigenvalues: raw_eigenvalues.clone(),
        modes,
        amplitudes: raw_amplitudes.clone(),
    })?;

    Ok(InterpolatedOperator {
        parameter: param,
        operator,
        basis,
        raw_amplitudes,
        raw_eigenvalues,
        modes: filtered,
    })
}

/// Rebuild complex values from `[re₀ … re_{r-1}, im₀ … im_{r-1}]`.
fn split_complex(values: &[f64], rank: usize) -> Vec<C64> {
    (0..rank)
        .map(|j| C64::new(values[j], values[j + rank]))
        .collect()
}
