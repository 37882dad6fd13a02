//! # 单纯形最小化（argmin Nelder–Mead）
//!
//! 以起点和各轴 `initial_step` 构造初始单纯形，交给 argmin 的 `NelderMead`
//! 经 `Executor` 迭代。系数取 argmin 默认值：反射 1，扩展 2，收缩 0.5，缩小 0.5。
//!
//! 收敛条件：单纯形顶点代价的标准差 < tolerance（`with_sd_tolerance`）；
//! 达到 `max_iterations` 时停止并标记为未收敛。
//!
//! 代价函数返回的 `EmStrainError` 原样穿过 argmin 传回调用方。
//!
//! ## 依赖关系
//! - 被 `fitting/mod.rs` 的拟合循环使用
//! - 使用 `argmin` / `argmin-math`（`Vec<f64>` 参数）

use crate::error::{EmStrainError, Result};

use argmin::core::{CostFunction, Executor, State, TerminationReason};
use argmin::solver::neldermead::NelderMead;

/// 最小化结果
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    pub point: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Nelder–Mead 设置
#[derive(Debug, Clone, Copy)]
pub struct Simplex {
    max_iterations: usize,
    tolerance: f64,
    initial_step: f64,
}

impl Simplex {
    pub fn new(max_iterations: usize, tolerance: f64, initial_step: f64) -> Result<Self> {
        if !(tolerance > 0.0 && tolerance.is_finite()) {
            return Err(EmStrainError::InvalidArgument(format!(
                "Tolerance must be positive, got {}",
                tolerance
            )));
        }
        if !(initial_step > 0.0 && initial_step.is_finite()) {
            return Err(EmStrainError::InvalidArgument(format!(
                "Initial simplex step must be positive, got {}",
                initial_step
            )));
        }
        Ok(Self {
            max_iterations,
            tolerance,
            initial_step,
        })
    }

    /// 从 `start` 出发最小化 `problem`
    pub fn minimize<P>(&self, problem: P, start: &[f64]) -> Result<Minimum>
    where
        P: CostFunction<Param = Vec<f64>, Output = f64>,
    {
        // 没有自由参数：求值一次即为结果
        if start.is_empty() {
            let value = problem.cost(&Vec::new()).map_err(from_argmin)?;
            return Ok(Minimum {
                point: Vec::new(),
                value,
                iterations: 0,
                converged: true,
            });
        }

        let mut vertices = vec![start.to_vec()];
        for axis in 0..start.len() {
            let mut vertex = start.to_vec();
            vertex[axis] += self.initial_step;
            vertices.push(vertex);
        }

        let solver = NelderMead::new(vertices)
            .with_sd_tolerance(self.tolerance)
            .map_err(from_argmin)?;

        let result = Executor::new(problem, solver)
            .configure(|state| state.max_iters(self.max_iterations as u64))
            .run()
            .map_err(from_argmin)?;

        let state = result.state();
        let point = state
            .get_best_param()
            .cloned()
            .ok_or_else(|| EmStrainError::Other("Simplex finished without a best point".to_string()))?;

        Ok(Minimum {
            point,
            value: state.get_best_cost(),
            iterations: state.get_iter() as usize,
            converged: matches!(
                state.get_termination_reason(),
                Some(TerminationReason::SolverConverged)
            ),
        })
    }
}

/// argmin 错误 -> `EmStrainError`；代价函数自身的错误原样取回
fn from_argmin(err: argmin::core::Error) -> EmStrainError {
    match err.downcast::<EmStrainError>() {
        Ok(e) => e,
        Err(other) => EmStrainError::Other(format!("Optimizer failed: {}", other)),
    }
}
