//! # simulate 子命令 CLI 定义
//!
//! 同时定义 `simulate` 与 `fit` 共用的衍射模拟参数。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs`, `cli/fit.rs` 使用
//! - 参数传递给 `commands/simulate.rs`

use crate::diffraction::ElectronDiffractionCalculator;
use crate::fitting::DeformationParameters;

use clap::{Args, ValueEnum};
use std::path::PathBuf;

/// 电子衍射模拟参数
#[derive(Args, Debug, Clone)]
pub struct DiffractionArgs {
    /// Accelerating voltage in kV
    #[arg(long, default_value_t = 200.0)]
    pub voltage: f64,

    /// Largest reciprocal-lattice vector to simulate (Å⁻¹)
    #[arg(long, default_value_t = 1.0)]
    pub reciprocal_radius: f64,

    /// Maximum excitation error for a reflection to appear (Å⁻¹)
    #[arg(long, default_value_t = 0.02)]
    pub excitation_error: f64,
}

impl DiffractionArgs {
    pub fn calculator(&self) -> ElectronDiffractionCalculator {
        ElectronDiffractionCalculator::new(self.voltage, self.reciprocal_radius, self.excitation_error)
    }
}

/// 斑点图输出格式
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum PatternOutputFormat {
    /// PNG image
    Png,
    /// SVG vector image
    Svg,
    /// CSV spot list (g, pixel position, hkl, intensity)
    Csv,
}

/// simulate 子命令参数
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Structure file (POSCAR/CONTCAR or *.vasp)
    pub structure: PathBuf,

    /// Output file
    #[arg(short, long, default_value = "pattern.png")]
    pub output: PathBuf,

    /// Output format (auto-detected from extension if not specified)
    #[arg(short, long, value_enum)]
    pub format: Option<PatternOutputFormat>,

    /// Deformation matrix d11,d12,d13,d21,d22,d23,d31,d32,d33 (row-major, default identity)
    #[arg(long, allow_hyphen_values = true)]
    pub deformation: Option<DeformationParameters>,

    /// Detector calibration (Å⁻¹ per pixel)
    #[arg(long, default_value_t = 0.01)]
    pub calibration: f64,

    #[command(flatten)]
    pub diffraction: DiffractionArgs,

    /// Write the deformed structure as POSCAR
    #[arg(long)]
    pub save_deformed: Option<PathBuf>,

    /// Label spots with Miller indices (hkl)
    #[arg(long, default_value_t = false)]
    pub label_spots: bool,

    /// Number of strongest spots to label / list
    #[arg(long, default_value_t = 10)]
    pub label_count: usize,

    /// Figure width in pixels (for PNG) or points (for SVG)
    #[arg(long, default_value_t = 1000)]
    pub width: u32,

    /// Figure height in pixels (for PNG) or points (for SVG)
    #[arg(long, default_value_t = 1000)]
    pub height: u32,

    /// Title for the plot (default: structure name)
    #[arg(long)]
    pub title: Option<String>,
}
