//! # fit 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/fit.rs`

use crate::cli::simulate::DiffractionArgs;
use crate::fitting::DeformationParameters;

use clap::Args;
use std::path::PathBuf;

/// fit 子命令参数
#[derive(Args, Debug)]
pub struct FitArgs {
    /// Reference structure file (POSCAR/CONTCAR or *.vasp)
    pub structure: PathBuf,

    /// Observed spots CSV (columns: position, x, y, intensity; pixels from the direct beam)
    pub observed: PathBuf,

    /// Output fit CSV (position, d11..d33, cost, iterations, converged)
    #[arg(short, long, default_value = "fit.csv")]
    pub output: PathBuf,

    /// Detector calibration (Å⁻¹ per pixel)
    #[arg(long)]
    pub calibration: f64,

    #[command(flatten)]
    pub diffraction: DiffractionArgs,

    /// Starting deformation d11,...,d33 (default identity)
    #[arg(long, allow_hyphen_values = true)]
    pub start: Option<DeformationParameters>,

    /// Parameters to refine; the rest stay at their starting values
    #[arg(long, value_delimiter = ',', default_value = "d11,d12,d21,d22")]
    pub free: Vec<String>,

    /// Fit only this navigation position
    #[arg(long)]
    pub position: Option<usize>,

    /// Maximum simplex iterations per position
    #[arg(long, default_value_t = 400)]
    pub max_iter: usize,

    /// Convergence tolerance on the cost spread (pixels²)
    #[arg(long, default_value_t = 1e-8)]
    pub tolerance: f64,

    /// Initial simplex step for every free parameter
    #[arg(long, default_value_t = 0.01)]
    pub step: f64,

    /// Only compare spots within this radius from the direct beam (pixels)
    #[arg(long)]
    pub detector_radius: Option<f64>,

    /// Ignore spots weaker than this fraction of the strongest spot
    #[arg(long, default_value_t = 0.01)]
    pub min_intensity: f64,

    /// Number of parallel jobs (0 = auto)
    #[arg(short, long, default_value_t = 0, env = "EMSTRAIN_JOBS")]
    pub jobs: usize,

    /// Number of fitted positions to list
    #[arg(long, default_value_t = 10)]
    pub show: usize,
}
