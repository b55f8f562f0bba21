//! 1-D interpolation of stacked vectors along a parameter axis.
//!
//! A stack is a matrix whose column k holds the flattened quantity fitted at
//! parameter value `knots[k]`. Every row is interpolated independently, but
//! all rows share the knot search, so each scheme is expressed as a pair of
//! knot weights.

use faer::Mat;

use crate::types::DmdError;

/// Knot weights of a 1-D interpolation scheme.
pub trait Interpolate1D: Sync + Send {
    /// Return `[(i, wᵢ), (j, wⱼ)]` such that f(x) = wᵢ yᵢ + wⱼ yⱼ.
    ///
    /// `xs` is strictly increasing with at least two entries and
    /// `xs[0] <= x <= xs[n-1]`.
    fn weights(&self, xs: &[f64], x: f64) -> [(usize, f64); 2];
}

/// Interpolation scheme along the parameter axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpolationKind {
    /// Piecewise linear.
    #[default]
    Linear,
    /// Value of the closest knot (ties go to the lower knot).
    Nearest,
    /// Value of the closest knot at or below x.
    Previous,
    /// Value of the closest knot at or above x.
    Next,
}

static LINEAR: LinearInterp = LinearInterp;
static NEAREST: NearestInterp = NearestInterp;
static PREVIOUS: PreviousInterp = PreviousInterp;
static NEXT: NextInterp = NextInterp;

impl InterpolationKind {
    pub fn as_interpolator(&self) -> &'static dyn Interpolate1D {
        match self {
            Self::Linear => &LINEAR,
            Self::Nearest => &NEAREST,
            Self::Previous => &PREVIOUS,
            Self::Next => &NEXT,
        }
    }
}

impl std::str::FromStr for InterpolationKind {
    type Err = DmdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linear" => Ok(Self::Linear),
            "nearest" => Ok(Self::Nearest),
            "previous" => Ok(Self::Previous),
            "next" => Ok(Self::Next),
            other => Err(DmdError::InvalidInput(format!(
                "unknown interpolation kind '{other}'"
            ))),
        }
    }
}

/// Return `i` such that `xs[i] <= x < xs[i+1]`, clamped to `[0, n-2]`.
fn find_interval(xs: &[f64], x: f64) -> usize {
    let n = xs.len();
    // partition_point gives the first index with xs[idx] > x
    let idx = xs.partition_point(|&v| v <= x);
    idx.saturating_sub(1).min(n - 2)
}

struct LinearInterp;

impl Interpolate1D for LinearInterp {
    fn weights(&self, xs: &[f64], x: f64) -> [(usize, f64); 2] {
        let i = find_interval(xs, x);
        let t = (x - xs[i]) / (xs[i + 1] - xs[i]);
        // (1 - t) y₀ + t y₁ is exact at both knots
        [(i, 1.0 - t), (i + 1, t)]
    }
}

struct NearestInterp;

impl Interpolate1D for NearestInterp {
    fn weights(&self, xs: &[f64], x: f64) -> [(usize, f64); 2] {
        let i = find_interval(xs, x);
        let pick = if x - xs[i] <= xs[i + 1] - x { i } else { i + 1 };
        [(pick, 1.0), (pick, 0.0)]
    }
}

struct PreviousInterp;

impl Interpolate1D for PreviousInterp {
    fn weights(&self, xs: &[f64], x: f64) -> [(usize, f64); 2] {
        let i = find_interval(xs, x);
        let pick = if x >= xs[i + 1] { i + 1 } else { i };
        [(pick, 1.0), (pick, 0.0)]
    }
}

struct NextInterp;

impl Interpolate1D for NextInterp {
    fn weights(&self, xs: &[f64], x: f64) -> [(usize, f64); 2] {
        let i = find_interval(xs, x);
        let pick = if x <= xs[i] { i } else { i + 1 };
        [(pick, 1.0), (pick, 0.0)]
    }
}

/// Interpolator over a stack of flattened vectors (rows = entries,
/// columns = parameter knots).
#[derive(Debug, Clone)]
pub struct StackInterpolator {
    knots: Vec<f64>,
    stack: Mat<f64>,
    kind: InterpolationKind,
}

impl StackInterpolator {
    /// Build an interpolator. Knots may be given in any order; the stack
    /// columns are reordered with them.
    ///
    /// Fails on fewer than two knots, non-finite or duplicate knots, or a
    /// column count that differs from the number of knots.
    pub fn new(knots: &[f64], stack: &Mat<f64>, kind: InterpolationKind) -> Result<Self, DmdError> {
        if knots.len() < 2 {
            return Err(DmdError::InvalidInput(format!(
                "interpolation needs at least 2 parameter values, got {}",
                knots.len()
            )));
        }
        if stack.ncols() != knots.len() {
            return Err(DmdError::ShapeMismatch(format!(
                "stack has {} columns for {} parameter values",
                stack.ncols(),
                knots.len()
            )));
        }
        if let Some(p) = knots.iter().find(|p| !p.is_finite()) {
            return Err(DmdError::InvalidInput(format!("non-finite parameter {p}")));
        }

        let mut order: Vec<usize> = (0..knots.len()).collect();
        order.sort_by(|&a, &b| knots[a].total_cmp(&knots[b]));
        let sorted: Vec<f64> = order.iter().map(|&k| knots[k]).collect();
        if let Some(w) = sorted.windows(2).find(|w| w[0] == w[1]) {
            return Err(DmdError::InvalidInput(format!(
                "duplicate parameter value {}",
                w[0]
            )));
        }

        let reordered = Mat::from_fn(stack.nrows(), stack.ncols(), |i, k| stack[(i, order[k])]);
        Ok(Self {
            knots: sorted,
            stack: reordered,
            kind,
        })
    }

    /// Sorted parameter knots.
    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    /// Inclusive training range.
    pub fn range(&self) -> (f64, f64) {
        (self.knots[0], self.knots[self.knots.len() - 1])
    }

    pub fn kind(&self) -> InterpolationKind {
        self.kind
    }

    /// Number of interpolated entries.
    pub fn len(&self) -> usize {
        self.stack.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.nrows() == 0
    }

    /// Evaluate every row at parameter `x`.
    ///
    /// No extrapolation: `x` outside the knot range is an
    /// [`DmdError::OutOfRange`] error.
    pub fn eval(&self, x: f64) -> Result<Vec<f64>, DmdError> {
        if x.is_nan() {
            return Err(DmdError::InvalidInput("parameter is NaN".into()));
        }
        let (min, max) = self.range();
        if x < min || x > max {
            return Err(DmdError::OutOfRange { value: x, min, max });
        }

        let [(i, wi), (j, wj)] = self.kind.as_interpolator().weights(&self.knots, x);
        Ok((0..self.stack.nrows())
            .map(|r| wi * self.stack[(r, i)] + wj * self.stack[(r, j)])
            .collect())
    }
}
