//! # dmd-emulator
//!
//! Dynamic Mode Decomposition emulators for snapshot data of flows such as
//! the IMSRG ground-state energy flow.
//!
//! Two emulators are provided:
//!
//! - **Standard DMD** ([`StandardDmd`], [`dmd()`]): fit one operator on a
//!   single trajectory (reduced via truncated SVD, or exact) and evaluate the
//!   analytic mode expansion at any continuous time
//! - **rKOI** ([`Rkoi`]): reduced Koopman Operator Interpolation. One reduced
//!   operator per training parameter, interpolated entry-wise to predict the
//!   trajectory at an unseen parameter
//!
//! Supporting pieces: truncated / randomized SVD ([`svd`]), eigen-mode
//! extraction ([`modes`]), physical spectrum filters ([`physics`]),
//! 1-D stack interpolation ([`interp`]), snapshot loaders ([`io`]) and
//! prediction checks ([`validate`]).
//!
//! ## Quick Start
//!
//! ```rust
//! use dmd_emulator::{DmdConfig, StandardDmd, Truncation};
//!
//! // Steady background plus a mode decaying by 0.5 per snapshot
//! let n = 12;
//! let mut data = faer::Mat::<f64>::zeros(2, n);
//! for k in 0..n {
//!     let d = 0.5_f64.powi(k as i32);
//!     data[(0, k)] = 1.0 + d;
//!     data[(1, k)] = 1.0 - d;
//! }
//!
//! let mut emu = StandardDmd::new(DmdConfig {
//!     nobs: 10,
//!     truncation: Truncation::Rank(2),
//!     ..Default::default()
//! });
//! emu.fit(&data).unwrap();
//!
//! // ds = 1: snapshot k sits at s = k
//! let pred = emu.predict(&[0.0, 1.0, 2.5], 1.0).unwrap();
//! assert!((pred[(0, 1)] - 1.5).abs() < 1e-6);
//! ```
//!
//! ## References
//!
//! - Schmid (2010), *J. Fluid Mech.*, 656, 5-28
//! - Kutz et al. (2016), *Dynamic Mode Decomposition*, SIAM
//! - Tu et al. (2014), *J. Comput. Dyn.*, 1(2), 391-421
//! - Huhn et al. (2022), arXiv:2204.12006

pub mod types;
pub mod utils;

pub mod dmd;
pub mod interp;
pub mod io;
pub mod modes;
pub mod operator;
pub mod physics;
pub mod reconstruct;
pub mod rkoi;
pub mod svd;
pub mod validate;

pub use dmd::{dmd, StandardDmd};
pub use interp::{InterpolationKind, StackInterpolator};
pub use io::{
    load_data_list, load_imsrg_log, load_parameters, load_snapshot_csv, write_prediction_csv,
};
pub use physics::{enforce_background, filter_interpolated};
pub use reconstruct::{reconstruct, time_range};
pub use rkoi::{InterpolatedOperator, Rkoi, RkoiStatus, TrainingSet};
pub use svd::truncated_svd;
pub use types::{
    DmdConfig, DmdError, DmdResult, ModeProjection, ModeSet, ReducedFit, RkoiConfig,
    SvdComponents, SvdMethod, Truncation, ValidationReport, C64,
};
pub use validate::compare;
