//! dmd-emulate - command line front end
//!
//! Fits a standard or parametric (rKOI) DMD emulator on snapshot files and
//! prints the emulated first observable (the flow energy) over a time grid.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use dmd_emulator::{
    compare, load_data_list, load_imsrg_log, load_parameters, load_snapshot_csv, time_range,
    write_prediction_csv, DmdConfig, DmdError, InterpolationKind, Rkoi, RkoiConfig, StandardDmd,
    Truncation,
};
use faer::Mat;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "dmd-emulate")]
#[command(about = "Emulate a dynamical system with DMD (intended for IMSRG flows)", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Standard DMD emulation of a single trajectory
    Standard {
        /// Snapshot file, one snapshot per row
        data_path: PathBuf,

        #[command(flatten)]
        common: CommonArgs,

        /// Pin the dominant eigenvalue to 1 and make the spectrum real
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        enforce_physics: bool,
    },

    /// Parametric emulation across a parameter sweep
    Parametric {
        /// Text file listing one snapshot file per line
        data_path: PathBuf,

        /// Text file with one training parameter per line, same order as the list
        param_list: PathBuf,

        /// Parameter to emulate (must lie inside the training range)
        test_param: f64,

        /// Reference snapshots at the test parameter, used by --compare
        #[arg(long = "test-path")]
        test_path: Option<PathBuf>,

        /// Parametric emulator type
        #[arg(short = 'e', long = "emu-type", value_enum, default_value = "rkoi")]
        emu_type: EmuType,

        /// Interpolation along the parameter axis
        #[arg(long, value_enum, default_value = "linear")]
        interp: InterpArg,

        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Number of snapshots per DMD operator
    #[arg(short = 'N', long, default_value_t = 10)]
    nobs: usize,

    /// Compute the full operator instead of the reduced one
    #[arg(short = 'E', long)]
    exact: bool,

    /// SVD truncation rank
    #[arg(short = 'T', long, default_value_t = 6)]
    trunc: usize,

    /// Singular value tolerance (takes precedence over --trunc)
    #[arg(short = 't', long)]
    tol: Option<f64>,

    /// Start of the emulation window
    #[arg(long, default_value_t = 0.0)]
    t0: f64,

    /// End of the emulation window (inclusive)
    #[arg(long, default_value_t = 10.0)]
    t1: f64,

    /// Emulation step width, also the snapshot spacing of the data
    #[arg(long, default_value_t = 0.1)]
    dt: f64,

    /// Snapshot file format
    #[arg(long = "log-format", value_enum, default_value = "csv")]
    log_format: LogFormat,

    /// Write the reconstructed snapshots to this CSV file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Compare the emulation against reference snapshots
    #[arg(long)]
    compare: bool,
}

impl CommonArgs {
    fn truncation(&self) -> Truncation {
        match self.tol {
            Some(tol) => Truncation::Tolerance(tol),
            None => Truncation::Rank(self.trunc),
        }
    }

    fn load(&self, path: &Path) -> Result<Mat<f64>> {
        self.log_format
            .load(path)
            .with_context(|| format!("failed to load snapshots from {}", path.display()))
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Csv,
    Imsrg,
}

impl LogFormat {
    fn load(self, path: &Path) -> Result<Mat<f64>, DmdError> {
        match self {
            LogFormat::Csv => load_snapshot_csv(path),
            LogFormat::Imsrg => load_imsrg_log(path),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EmuType {
    /// Reduced Koopman operator interpolation
    Rkoi,
    /// Reduced eigenpair interpolation
    Repi,
}

#[derive(Clone, Copy, ValueEnum)]
enum InterpArg {
    Linear,
    Nearest,
    Previous,
    Next,
}

impl From<InterpArg> for InterpolationKind {
    fn from(arg: InterpArg) -> Self {
        match arg {
            InterpArg::Linear => InterpolationKind::Linear,
            InterpArg::Nearest => InterpolationKind::Nearest,
            InterpArg::Previous => InterpolationKind::Previous,
            InterpArg::Next => InterpolationKind::Next,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Standard {
            data_path,
            common,
            enforce_physics,
        } => run_standard(&data_path, &common, enforce_physics),
        Commands::Parametric {
            data_path,
            param_list,
            test_param,
            test_path,
            emu_type,
            interp,
            common,
        } => {
            if emu_type == EmuType::Repi {
                bail!("emulator type rEPI is not implemented; use --emu-type rkoi");
            }
            run_rkoi(
                &data_path,
                &param_list,
                test_param,
                test_path.as_deref(),
                interp.into(),
                &common,
            )
        }
    }
}

fn run_standard(data_path: &Path, common: &CommonArgs, enforce_physics: bool) -> Result<()> {
    info!(path = %data_path.display(), "reading single flow data");
    let data = common.load(data_path)?;

    let mut emu = StandardDmd::new(DmdConfig {
        nobs: common.nobs,
        truncation: common.truncation(),
        exact: common.exact,
        enforce_physics,
        ..Default::default()
    });
    emu.fit(&data).context("standard DMD fit failed")?;

    let s_range = time_range(common.t0, common.t1, common.dt)?;
    let pred = emu
        .predict(&s_range, common.dt)
        .context("standard DMD prediction failed")?;

    // the training trajectory doubles as reference data
    report(&s_range, &pred, common, Some(&data))
}

fn run_rkoi(
    data_path: &Path,
    param_list: &Path,
    test_param: f64,
    test_path: Option<&Path>,
    interpolation: InterpolationKind,
    common: &CommonArgs,
) -> Result<()> {
    let data_list = load_data_list(data_path, |p| common.log_format.load(p))
        .with_context(|| format!("failed to load data list {}", data_path.display()))?;
    let params = load_parameters(param_list)
        .with_context(|| format!("failed to load parameters from {}", param_list.display()))?;
    let test_data = test_path.map(|p| common.load(p)).transpose()?;

    if common.exact {
        info!("--exact is ignored by rKOI, which always uses the reduced operator");
    }

    let mut emu = Rkoi::new(RkoiConfig {
        nobs: common.nobs,
        truncation: common.truncation(),
        interpolation,
    });
    emu.fit(&data_list, &params).context("rKOI fit failed")?;
    for (p, d) in params.iter().zip(&data_list) {
        println!("{p:>12.6} | E0 = {:.16} ({} x {})", d[(0, 0)], d.nrows(), d.ncols());
    }
    emu.interp_dmd(test_param)
        .with_context(|| format!("rKOI interpolation at {test_param} failed"))?;

    let s_range = time_range(common.t0, common.t1, common.dt)?;
    let pred = emu
        .predict(&s_range, common.dt)
        .context("rKOI prediction failed")?;

    report(&s_range, &pred, common, test_data.as_ref())
}

fn report(
    s_range: &[f64],
    pred: &Mat<f64>,
    common: &CommonArgs,
    reference: Option<&Mat<f64>>,
) -> Result<()> {
    println!("{:<10} | {:<10}", "s", "E");
    println!("-----------------------");
    for (k, s) in s_range.iter().enumerate() {
        println!("{s:10.7} | {:10.7}", pred[(0, k)]);
    }

    if let Some(out) = &common.output {
        write_prediction_csv(out, s_range, pred)
            .with_context(|| format!("failed to write {}", out.display()))?;
        info!(path = %out.display(), "wrote prediction");
    }

    if common.compare {
        let Some(reference) = reference else {
            bail!("--compare needs reference data (--test-path for parametric runs)");
        };
        let report = compare(pred, reference).context("prediction and reference differ in shape")?;
        println!();
        println!("RMSE:                {:.6e}", report.rmse);
        println!("Max relative error:  {:.6e}", report.max_relative_error);
        println!(
            "Final energy error:  {:.6e}",
            report.first_row_abs_errors.last().copied().unwrap_or(0.0)
        );
    }
    Ok(())
}
