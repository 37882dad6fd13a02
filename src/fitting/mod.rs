//! # 衍射正向模型拟合模块
//!
//! 九个形变参数 d11..d33（按行优先组成 3×3 形变矩阵）驱动的正向模型：
//! 每次求值先形变参考结构，再模拟衍射图样并附加探测器标定。
//!
//! ## 子模块
//! - `deformation`: 结构形变（`StructureDeformer` / `LatticeDeformation`）
//! - `objective`: 观测图样与代价函数
//! - `simplex`: 单纯形最小化（argmin Nelder–Mead）
//! - `export`: 拟合结果导出
//!
//! ## 并发
//! `simulate_with` 只需 `&self`，多个位置可在同一个模型上并行拟合；
//! 修改模型自带的参数需要 `&mut self`，由借用检查保证不会与求值并发。
//!
//! ## 依赖关系
//! - 被 `commands/simulate.rs`, `commands/fit.rs` 调用
//! - 使用 `diffraction/` 的 `DiffractionSimulator`
//! - 使用 `batch/runner.rs` 并行拟合多个位置

pub mod deformation;
pub mod export;
pub mod objective;
pub mod simplex;

pub use deformation::{LatticeDeformation, StructureDeformer};
pub use objective::{ObjectiveSettings, ObservedPattern, ObservedSpot, PatternObjective};
use simplex::Simplex;

use crate::batch::BatchRunner;
use crate::diffraction::{DiffractionSimulation, DiffractionSimulator};
use crate::error::{EmStrainError, Result};
use crate::models::Crystal;

use argmin::core::CostFunction;
use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 参数名，顺序即形变矩阵的行优先顺序
pub const PARAMETER_NAMES: [&str; 9] = [
    "d11", "d12", "d13", "d21", "d22", "d23", "d31", "d32", "d33",
];

/// 九个形变参数（行优先的 3×3 形变矩阵），默认为单位矩阵
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeformationParameters([f64; 9]);

impl Default for DeformationParameters {
    fn default() -> Self {
        Self::identity()
    }
}

impl DeformationParameters {
    pub fn identity() -> Self {
        Self([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0])
    }

    pub fn new(values: [f64; 9]) -> Self {
        Self(values)
    }

    /// 参数名 -> 下标；未知名称报 `InvalidArgument`
    pub fn index_of(name: &str) -> Result<usize> {
        PARAMETER_NAMES
            .iter()
            .position(|&n| n == name)
            .ok_or_else(|| {
                EmStrainError::InvalidArgument(format!(
                    "Unknown deformation parameter '{}' (expected one of {})",
                    name,
                    PARAMETER_NAMES.join(", ")
                ))
            })
    }

    pub fn get(&self, name: &str) -> Result<f64> {
        Ok(self.0[Self::index_of(name)?])
    }

    pub fn set(&mut self, name: &str, value: f64) -> Result<()> {
        self.0[Self::index_of(name)?] = value;
        Ok(())
    }

    pub fn as_array(&self) -> &[f64; 9] {
        &self.0
    }

    pub fn as_mut_array(&mut self) -> &mut [f64; 9] {
        &mut self.0
    }

    /// 行优先组装的形变矩阵 [[d11 d12 d13] [d21 d22 d23] [d31 d32 d33]]
    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::from_row_slice(&self.0)
    }
}

impl FromStr for DeformationParameters {
    type Err = EmStrainError;

    /// 解析 `d11,d12,...,d33` 形式的逗号分隔列表
    fn from_str(s: &str) -> Result<Self> {
        let values: Vec<f64> = s
            .split(',')
            .map(|v| {
                v.trim().parse::<f64>().map_err(|_| {
                    EmStrainError::InvalidArgument(format!("Invalid deformation entry '{}'", v))
                })
            })
            .collect::<Result<_>>()?;

        let values: [f64; 9] = values.try_into().map_err(|v: Vec<f64>| {
            EmStrainError::InvalidArgument(format!(
                "Deformation needs 9 comma-separated values (d11..d33), got {}",
                v.len()
            ))
        })?;
        Ok(Self(values))
    }
}

impl fmt::Display for DeformationParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values: Vec<String> = self.0.iter().map(|v| format!("{:.6}", v)).collect();
        write!(f, "{}", values.join(","))
    }
}

/// 衍射正向模型
///
/// 模拟器、形变器、参考结构和标定在构造后不可变；
/// 模型自带一份可修改的形变参数。
#[derive(Debug, Clone)]
pub struct ForwardModel<S, D = LatticeDeformation> {
    simulator: S,
    deformer: D,
    structure: Crystal,
    calibration: f64,
    parameters: DeformationParameters,
}

impl<S: DiffractionSimulator> ForwardModel<S> {
    /// 以单位形变创建模型
    pub fn new(simulator: S, structure: Crystal, calibration: f64) -> Result<Self> {
        if !(calibration > 0.0 && calibration.is_finite()) {
            return Err(EmStrainError::InvalidArgument(format!(
                "Calibration must be positive, got {}",
                calibration
            )));
        }
        Ok(Self {
            simulator,
            deformer: LatticeDeformation,
            structure,
            calibration,
            parameters: DeformationParameters::identity(),
        })
    }
}

impl<S: DiffractionSimulator, D: StructureDeformer> ForwardModel<S, D> {
    pub fn with_deformer<E: StructureDeformer>(self, deformer: E) -> ForwardModel<S, E> {
        ForwardModel {
            simulator: self.simulator,
            deformer,
            structure: self.structure,
            calibration: self.calibration,
            parameters: self.parameters,
        }
    }

    pub fn with_parameters(mut self, parameters: DeformationParameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn structure(&self) -> &Crystal {
        &self.structure
    }

    /// 标定（Å⁻¹/像素）
    pub fn calibration(&self) -> f64 {
        self.calibration
    }

    pub fn simulator(&self) -> &S {
        &self.simulator
    }

    pub fn parameters(&self) -> &DeformationParameters {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut DeformationParameters {
        &mut self.parameters
    }

    pub fn parameter(&self, name: &str) -> Result<f64> {
        self.parameters.get(name)
    }

    pub fn set_parameter(&mut self, name: &str, value: f64) -> Result<()> {
        self.parameters.set(name, value)
    }

    /// 形状函数占位：恒为 1.0
    ///
    /// 拟合不经过它；代价由 `PatternObjective` 对 `simulate` 的结果计算。
    pub fn function(&self, _x: f64) -> f64 {
        1.0
    }

    /// 用当前参数模拟
    pub fn simulate(&self) -> Result<DiffractionSimulation> {
        self.simulate_with(&self.parameters)
    }

    /// 用给定参数模拟：形变参考结构 -> 模拟 -> 附加标定
    pub fn simulate_with(&self, parameters: &DeformationParameters) -> Result<DiffractionSimulation> {
        let deformed = self.deformed_structure(parameters)?;
        let simulation = self.simulator.simulate(&deformed)?;
        Ok(simulation.with_calibration(self.calibration))
    }

    /// 给定参数下的形变结构
    pub fn deformed_structure(&self, parameters: &DeformationParameters) -> Result<Crystal> {
        self.deformer.deform(&self.structure, &parameters.matrix())
    }
}

/// 拟合设置
#[derive(Debug, Clone, PartialEq)]
pub struct FitConfig {
    pub max_iterations: usize,
    pub tolerance: f64,
    /// 初始单纯形步长
    pub initial_step: f64,
    /// 参与拟合的参数（按 `PARAMETER_NAMES` 顺序），其余固定为起始值
    pub free: [bool; 9],
    pub objective: ObjectiveSettings,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            max_iterations: 400,
            tolerance: 1e-8,
            initial_step: 0.01,
            // 入射束沿 z，面内分量决定斑点位置
            free: [true, true, false, true, true, false, false, false, false],
            objective: ObjectiveSettings::default(),
        }
    }
}

impl FitConfig {
    /// 由参数名列表设置自由参数
    pub fn with_free_parameters<T: AsRef<str>>(mut self, names: &[T]) -> Result<Self> {
        let mut free = [false; 9];
        for name in names {
            free[DeformationParameters::index_of(name.as_ref())?] = true;
        }
        self.free = free;
        Ok(self)
    }

    pub fn free_names(&self) -> Vec<&'static str> {
        PARAMETER_NAMES
            .iter()
            .zip(self.free)
            .filter_map(|(&name, free)| free.then_some(name))
            .collect()
    }
}

/// 单个图样的拟合结果
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    pub parameters: DeformationParameters,
    pub cost: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// 自由参数子空间上的拟合问题：x -> 组装参数 -> 模拟 -> 代价
struct FitProblem<'a, S, D> {
    model: &'a ForwardModel<S, D>,
    objective: &'a PatternObjective,
    start: DeformationParameters,
    free: &'a [usize],
}

impl<S, D> CostFunction for FitProblem<'_, S, D>
where
    S: DiffractionSimulator,
    D: StructureDeformer,
{
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, x: &Vec<f64>) -> std::result::Result<f64, argmin::core::Error> {
        let simulation = self.model.simulate_with(&assemble(&self.start, self.free, x))?;
        let cost = self.objective.cost(&simulation)?;
        // NaN 视为无穷大，保证单纯形排序全序
        Ok(if cost.is_nan() { f64::INFINITY } else { cost })
    }
}

/// 起始参数中替换自由分量
fn assemble(start: &DeformationParameters, free: &[usize], x: &[f64]) -> DeformationParameters {
    let mut parameters = *start;
    for (&i, &value) in free.iter().zip(x) {
        parameters.as_mut_array()[i] = value;
    }
    parameters
}

/// 拟合单个观测图样，以模型当前参数为起点
pub fn fit_pattern<S, D>(
    model: &ForwardModel<S, D>,
    observed: &ObservedPattern,
    config: &FitConfig,
) -> Result<FitResult>
where
    S: DiffractionSimulator,
    D: StructureDeformer,
{
    let objective = PatternObjective::new(observed, config.objective.clone())?;
    let simplex = Simplex::new(config.max_iterations, config.tolerance, config.initial_step)?;

    let start = *model.parameters();
    let free: Vec<usize> = (0..9).filter(|&i| config.free[i]).collect();
    let x0: Vec<f64> = free.iter().map(|&i| start.as_array()[i]).collect();

    let problem = FitProblem {
        model,
        objective: &objective,
        start,
        free: &free,
    };
    let minimum = simplex.minimize(problem, &x0)?;

    Ok(FitResult {
        parameters: assemble(&start, &free, &minimum.point),
        cost: minimum.value,
        iterations: minimum.iterations,
        converged: minimum.converged,
    })
}

/// 并行拟合多个导航位置，结果按输入顺序返回
///
/// 单个位置失败不影响其他位置；`jobs` 为 0 时使用全部 CPU。
pub fn fit_map<S, D>(
    model: &ForwardModel<S, D>,
    patterns: &[(usize, ObservedPattern)],
    config: &FitConfig,
    jobs: usize,
) -> Result<Vec<(usize, Result<FitResult>)>>
where
    S: DiffractionSimulator + Sync,
    D: StructureDeformer + Sync,
{
    BatchRunner::new(jobs).run(patterns, "Fitting", |(position, observed)| {
        (*position, fit_pattern(model, observed, config))
    })
}
