//! # strain 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/strain.rs`

use clap::Args;
use std::path::PathBuf;

/// strain 子命令参数
#[derive(Args, Debug)]
pub struct StrainArgs {
    /// Tensor field CSV: navigation index columns followed by d11, d12, ... (2x2 or 3x3, row-major)
    pub input: PathBuf,

    /// Output strain CSV (columns: navigation indices, e11, e22, e12, theta)
    #[arg(short, long, default_value = "strain.csv")]
    pub output: PathBuf,

    /// Also plot strain maps (PNG or SVG by extension; 2D navigation only)
    #[arg(long)]
    pub maps: Option<PathBuf>,

    /// Save the rotation field R as a tensor CSV
    #[arg(long)]
    pub save_rotation: Option<PathBuf>,

    /// Save the stretch field U as a tensor CSV
    #[arg(long)]
    pub save_stretch: Option<PathBuf>,

    /// Figure width in pixels (for PNG) or points (for SVG)
    #[arg(long, default_value_t = 1200)]
    pub width: u32,

    /// Figure height in pixels (for PNG) or points (for SVG)
    #[arg(long, default_value_t = 1200)]
    pub height: u32,
}
