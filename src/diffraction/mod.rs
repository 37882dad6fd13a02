//! # 电子衍射模块
//!
//! 提供电子衍射图样的运动学模拟、绘图与数据导出。
//!
//! ## 子模块
//! - `scattering`: 原子散射因子（X 射线 → 电子，Mott–Bethe）
//! - `calculator`: 电子衍射斑点计算
//! - `simulation`: 模拟结果（斑点列表 + 标定）
//! - `plot`: 图表生成
//! - `export`: 数据导出
//!
//! ## 依赖关系
//! - 被 `fitting/` 与 `commands/` 使用
//! - 使用 `models/structure.rs`

pub mod calculator;
pub mod export;
pub mod plot;
pub mod scattering;
pub mod simulation;

pub use calculator::ElectronDiffractionCalculator;
pub use simulation::{DiffractionSimulation, DiffractionSpot};

use crate::error::Result;
use crate::models::Crystal;

/// 衍射模拟能力：给定结构，返回模拟的衍射图样
///
/// 实现不得修改传入的结构。
pub trait DiffractionSimulator {
    fn simulate(&self, structure: &Crystal) -> Result<DiffractionSimulation>;
}

impl DiffractionSimulator for ElectronDiffractionCalculator {
    fn simulate(&self, structure: &Crystal) -> Result<DiffractionSimulation> {
        self.calculate_ed_data(structure)
    }
}
