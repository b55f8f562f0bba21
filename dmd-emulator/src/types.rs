use faer::Mat;

use crate::interp::InterpolationKind;

/// Error types for DMD emulation.
#[derive(Debug, thiserror::Error)]
pub enum DmdError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{0} emulator is not fitted; call fit() first")]
    NotFitted(&'static str),

    #[error("rKOI operator is not interpolated; call interp_dmd() first")]
    NotInterpolated,

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("numerical degeneracy: {0}")]
    NumericalDegeneracy(String),

    #[error("parameter {value} outside training range [{min}, {max}]")]
    OutOfRange { value: f64, min: f64, max: f64 },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("SVD computation failed: {0}")]
    SvdFailed(String),

    #[error("eigendecomposition failed: {0}")]
    EigenFailed(String),

    #[error("i/o error: {0}")]
    Io(String),

    #[error("parse error: {0}")]
    Parse(String),
}

/// Rank selection for the truncated SVD.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Truncation {
    /// Keep the top `r` singular values.
    Rank(usize),
    /// Keep every singular value strictly greater than the threshold.
    Tolerance(f64),
}

impl Default for Truncation {
    fn default() -> Self {
        Truncation::Rank(6)
    }
}

/// Backend used to factor the snapshot matrix.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SvdMethod {
    /// Economy SVD of the full matrix.
    #[default]
    Exact,
    /// Randomized range-finder SVD (Halko, Martinsson & Tropp 2011).
    ///
    /// Only the first `n_components` singular triplets are estimated; the
    /// truncation is then applied on top of those.
    Randomized {
        n_components: usize,
        n_oversamples: usize,
        n_power_iter: usize,
        seed: u64,
    },
}

/// How dynamic modes are lifted back into state space in reduced DMD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModeProjection {
    /// Φ = U_r W.
    #[default]
    Projected,
    /// Φ = X' V_r Σ_r⁻¹ W Λ⁻¹ (Tu et al. 2014).
    ExactModes,
}

/// Configuration for standard DMD.
#[derive(Debug, Clone)]
pub struct DmdConfig {
    /// Number of snapshot columns used to build the operator.
    pub nobs: usize,
    /// SVD truncation policy (ignored when `exact` is set).
    pub truncation: Truncation,
    /// Build the full operator A = X' X⁺ instead of the reduced one.
    pub exact: bool,
    /// SVD backend.
    pub svd_method: SvdMethod,
    /// Mode projection for the reduced operator.
    pub projection: ModeProjection,
    /// Pin the dominant eigenvalue to 1 and drop imaginary parts.
    pub enforce_physics: bool,
}

impl Default for DmdConfig {
    fn default() -> Self {
        Self {
            nobs: 10,
            truncation: Truncation::default(),
            exact: false,
            svd_method: SvdMethod::default(),
            projection: ModeProjection::default(),
            enforce_physics: false,
        }
    }
}

/// Configuration for the rKOI parametric emulator.
#[derive(Debug, Clone)]
pub struct RkoiConfig {
    /// Number of snapshot columns used per training matrix.
    pub nobs: usize,
    /// SVD truncation policy shared by every training matrix.
    pub truncation: Truncation,
    /// Interpolation scheme along the parameter axis.
    pub interpolation: InterpolationKind,
}

impl Default for RkoiConfig {
    fn default() -> Self {
        Self {
            nobs: 10,
            truncation: Truncation::default(),
            interpolation: InterpolationKind::default(),
        }
    }
}

/// Components of the truncated SVD.
#[derive(Debug, Clone)]
pub struct SvdComponents {
    /// Left singular vectors (m × r).
    pub u: Mat<f64>,
    /// Singular values (r), descending.
    pub s: Vec<f64>,
    /// Right singular vectors (n × r), columns are right singular vectors.
    pub v: Mat<f64>,
}

impl SvdComponents {
    /// Number of retained singular triplets.
    pub fn rank(&self) -> usize {
        self.s.len()
    }
}

/// Complex number type (re, im).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct C64 {
    pub re: f64,
    pub im: f64,
}

impl C64 {
    /// Create a new complex number.
    pub fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    /// Real number embedded in the complex plane.
    pub fn from_re(re: f64) -> Self {
        Self { re, im: 0.0 }
    }

    /// Magnitude |z| = sqrt(re² + im²).
    pub fn norm(&self) -> f64 {
        self.re.hypot(self.im)
    }

    /// Squared magnitude re² + im².
    pub fn norm_sqr(&self) -> f64 {
        self.re * self.re + self.im * self.im
    }

    /// Phase angle atan2(im, re).
    pub fn arg(&self) -> f64 {
        self.im.atan2(self.re)
    }

    /// Complex conjugate (re, -im).
    pub fn conj(&self) -> Self {
        Self {
            re: self.re,
            im: -self.im,
        }
    }

    /// Principal logarithm ln|z| + i arg(z).
    pub fn ln(&self) -> Self {
        Self {
            re: self.norm().ln(),
            im: self.arg(),
        }
    }

    /// Exponential e^re (cos im + i sin im).
    pub fn exp(&self) -> Self {
        let r = self.re.exp();
        Self {
            re: r * self.im.cos(),
            im: r * self.im.sin(),
        }
    }

    /// Whether both parts are finite.
    pub fn is_finite(&self) -> bool {
        self.re.is_finite() && self.im.is_finite()
    }

    /// The zero complex number (0 + 0i).
    pub fn zero() -> Self {
        Self { re: 0.0, im: 0.0 }
    }
}

impl std::ops::Add for C64 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            re: self.re + rhs.re,
            im: self.im + rhs.im,
        }
    }
}

impl std::ops::AddAssign for C64 {
    fn add_assign(&mut self, rhs: Self) {
        self.re += rhs.re;
        self.im += rhs.im;
    }
}

impl std::ops::Sub for C64 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self {
            re: self.re - rhs.re,
            im: self.im - rhs.im,
        }
    }
}

impl std::ops::Mul for C64 {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        Self {
            re: self.re * rhs.re - self.im * rhs.im,
            im: self.re * rhs.im + self.im * rhs.re,
        }
    }
}

impl std::ops::Mul<f64> for C64 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self {
            re: self.re * rhs,
            im: self.im * rhs,
        }
    }
}

impl std::ops::Div for C64 {
    type Output = Self;
    fn div(self, rhs: Self) -> Self {
        let denom = rhs.norm_sqr();
        Self {
            re: (self.re * rhs.re + self.im * rhs.im) / denom,
            im: (self.im * rhs.re - self.re * rhs.im) / denom,
        }
    }
}

impl std::ops::Div<f64> for C64 {
    type Output = Self;
    fn div(self, rhs: f64) -> Self {
        Self {
            re: self.re / rhs,
            im: self.im / rhs,
        }
    }
}

/// Eigenvalues, dynamic modes and amplitudes: everything the analytic
/// expansion needs.
#[derive(Debug, Clone)]
pub struct ModeSet {
    /// Eigenvalues λ (r).
    pub eigenvalues: Vec<C64>,
    /// DMD modes Φ (m × r), row-major: `modes[i][j]` is mode j at variable i.
    pub modes: Vec<Vec<C64>>,
    /// Amplitudes b (r).
    pub amplitudes: Vec<C64>,
}

impl ModeSet {
    /// Number of modes.
    pub fn len(&self) -> usize {
        self.eigenvalues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.eigenvalues.is_empty()
    }

    /// Number of state variables.
    pub fn n_vars(&self) -> usize {
        self.modes.len()
    }

    /// Get mode column j.
    pub fn mode(&self, j: usize) -> Vec<C64> {
        self.modes.iter().map(|row| row[j]).collect()
    }
}

/// Result of a standard DMD fit.
#[derive(Debug, Clone)]
pub struct DmdResult {
    /// Linear operator: Ã (r × r) for reduced DMD, A (m × m) for exact DMD.
    pub operator: Mat<f64>,
    /// Truncated SVD of X (reduced DMD only).
    pub svd: Option<SvdComponents>,
    /// Eigenvalues, modes and amplitudes after any physical constraint.
    pub modes: ModeSet,
    /// Number of modes.
    pub rank: usize,
    /// First snapshot X[:, 0].
    pub x_first: Vec<f64>,
    /// (state dimension, snapshots used).
    pub data_dim: (usize, usize),
    /// Whether the exact (full) operator was built.
    pub exact: bool,
    /// Whether the physical constraint was applied to the eigenvalues.
    pub physics_enforced: bool,
}

impl DmdResult {
    /// Reduced basis U_r (reduced DMD only).
    pub fn basis(&self) -> Option<&Mat<f64>> {
        self.svd.as_ref().map(|s| &s.u)
    }

    /// Number of state variables.
    pub fn n_vars(&self) -> usize {
        self.data_dim.0
    }
}

/// Reduced quantities of one rKOI training matrix, before flattening.
#[derive(Debug, Clone)]
pub struct ReducedFit {
    /// Reduced operator A_r (r × r).
    pub operator: Mat<f64>,
    /// Reduced basis U_r (m × r).
    pub basis: Mat<f64>,
    /// Amplitudes b (r), paired with the eigenvectors of A_r.
    pub amplitudes: Vec<C64>,
    /// Eigenvalues of A_r.
    pub eigenvalues: Vec<C64>,
}

/// Per-snapshot comparison between a prediction and reference data.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    /// ‖pred[:, k] − ref[:, k]‖ / ‖ref[:, k]‖ for every column k.
    pub relative_errors: Vec<f64>,
    /// |pred[0, k] − ref[0, k]| for every column k (first observable).
    pub first_row_abs_errors: Vec<f64>,
    /// Root mean square error over all entries.
    pub rmse: f64,
    /// Largest per-column relative error.
    pub max_relative_error: f64,
}
