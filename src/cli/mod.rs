//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `strain`: 张量场极分解与应变图
//! - `simulate`: 形变结构的电子衍射模拟
//! - `fit`: 逐位置拟合形变参数
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: strain, simulate, fit

pub mod fit;
pub mod simulate;
pub mod strain;

use clap::{Parser, Subcommand};

/// emstrain - 电子显微应变分析与衍射正向模型拟合
#[derive(Parser)]
#[command(name = "emstrain")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(
    about = "Strain mapping and diffraction forward-model fitting for electron microscopy",
    long_about = None
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Polar-decompose a displacement-gradient tensor field into strain maps
    Strain(strain::StrainArgs),

    /// Simulate the electron diffraction pattern of a (deformed) structure
    Simulate(simulate::SimulateArgs),

    /// Fit deformation parameters to observed diffraction spots
    Fit(fit::FitArgs),
}
