//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `parsers/`, `strain/`, `fitting/`, `diffraction/`, `utils/`
//! - 子模块: strain, simulate, fit

pub mod fit;
pub mod simulate;
pub mod strain;

use crate::cli::Commands;
use crate::error::Result;

/// 执行命令
pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Strain(args) => strain::execute(args),
        Commands::Simulate(args) => simulate::execute(args),
        Commands::Fit(args) => fit::execute(args),
    }
}
