//! # 图样比对代价函数
//!
//! 观测斑点与标定后的模拟斑点之间的对称强度加权最近邻距离
//! （chamfer 距离，单位 像素²）：
//!
//! ```text
//! cost = Σ_o w_o · min_s |o − s|² / Σ_o w_o  +  Σ_s w_s · min_o |s − o|² / Σ_s w_s
//! ```
//!
//! 权重为各自归一化到最强斑点的强度，两侧都忽略低于阈值的弱斑点。
//!
//! ## 依赖关系
//! - 被 `fitting/mod.rs` 的拟合循环使用
//! - 使用 `diffraction/simulation.rs`

use crate::diffraction::DiffractionSimulation;
use crate::error::{EmStrainError, Result};

/// 单个观测斑点（像素，原点为直射束）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObservedSpot {
    pub x: f64,
    pub y: f64,
    pub intensity: f64,
}

/// 一个导航位置的观测图样
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObservedPattern {
    spots: Vec<ObservedSpot>,
}

impl ObservedPattern {
    pub fn new(spots: Vec<ObservedSpot>) -> Self {
        Self { spots }
    }

    /// 由模拟结果生成"观测"图样（需要标定）
    pub fn from_simulation(simulation: &DiffractionSimulation) -> Result<Self> {
        let pixels = simulation.calibrated_coordinates()?;
        let spots = pixels
            .iter()
            .zip(simulation.normalized_intensities())
            .map(|(p, intensity)| ObservedSpot {
                x: p[0],
                y: p[1],
                intensity,
            })
            .collect();
        Ok(Self { spots })
    }

    pub fn spots(&self) -> &[ObservedSpot] {
        &self.spots
    }

    pub fn len(&self) -> usize {
        self.spots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spots.is_empty()
    }
}

/// 代价函数设置
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectiveSettings {
    /// 探测器半径（像素）；只比较半径内的斑点
    pub detector_radius: Option<f64>,
    /// 最小相对强度（0-1），低于此值的观测/模拟斑点均忽略
    pub min_relative_intensity: f64,
    /// 模拟图样为空时的代价
    pub empty_penalty: f64,
}

impl Default for ObjectiveSettings {
    fn default() -> Self {
        Self {
            detector_radius: None,
            min_relative_intensity: 0.01,
            empty_penalty: 1e6,
        }
    }
}

/// 加权点：(x, y, 权重)
type WeightedPoint = (f64, f64, f64);

/// 观测图样的代价函数
#[derive(Debug, Clone)]
pub struct PatternObjective {
    observed: Vec<WeightedPoint>,
    settings: ObjectiveSettings,
}

impl PatternObjective {
    /// 创建代价函数；探测器半径内没有观测斑点时报错
    pub fn new(observed: &ObservedPattern, settings: ObjectiveSettings) -> Result<Self> {
        if let Some(radius) = settings.detector_radius {
            if !(radius > 0.0 && radius.is_finite()) {
                return Err(EmStrainError::InvalidArgument(format!(
                    "Detector radius must be positive, got {}",
                    radius
                )));
            }
        }
        if !(0.0..=1.0).contains(&settings.min_relative_intensity) {
            return Err(EmStrainError::InvalidArgument(format!(
                "Relative intensity threshold must be within [0, 1], got {}",
                settings.min_relative_intensity
            )));
        }

        let inside = |x: f64, y: f64| match settings.detector_radius {
            Some(r) => x.hypot(y) <= r,
            None => true,
        };

        let max = observed
            .spots()
            .iter()
            .map(|s| s.intensity)
            .fold(0.0, f64::max);
        let points: Vec<WeightedPoint> = observed
            .spots()
            .iter()
            .filter(|s| inside(s.x, s.y))
            .map(|s| {
                let weight = if max > 0.0 { s.intensity / max } else { 1.0 };
                (s.x, s.y, weight)
            })
            .filter(|&(_, _, weight)| weight >= settings.min_relative_intensity)
            .collect();

        if points.is_empty() {
            return Err(EmStrainError::InvalidArgument(
                "No observed spots inside the detector radius".to_string(),
            ));
        }

        Ok(Self {
            observed: points,
            settings,
        })
    }

    /// 计算模拟图样的代价；模拟结果必须已附加标定
    pub fn cost(&self, simulation: &DiffractionSimulation) -> Result<f64> {
        let pixels = simulation.calibrated_coordinates()?;
        let intensities = simulation.normalized_intensities();
        let threshold = 100.0 * self.settings.min_relative_intensity;

        let simulated: Vec<WeightedPoint> = pixels
            .iter()
            .zip(intensities)
            .filter(|&(p, i)| {
                i > 0.0
                    && i >= threshold
                    && self
                        .settings
                        .detector_radius
                        .map_or(true, |r| p[0].hypot(p[1]) <= r)
            })
            .map(|(p, i)| (p[0], p[1], i / 100.0))
            .collect();

        if simulated.is_empty() {
            return Ok(self.settings.empty_penalty);
        }

        Ok(directed_distance(&self.observed, &simulated)
            + directed_distance(&simulated, &self.observed))
    }
}

/// 从 `from` 到 `to` 的加权平均最近邻平方距离
fn directed_distance(from: &[WeightedPoint], to: &[WeightedPoint]) -> f64 {
    let mut total = 0.0;
    let mut weights = 0.0;
    for &(x, y, w) in from {
        let nearest = to
            .iter()
            .map(|&(u, v, _)| (x - u).powi(2) + (y - v).powi(2))
            .fold(f64::INFINITY, f64::min);
        total += w * nearest;
        weights += w;
    }
    if weights > 0.0 {
        total / weights
    } else {
        0.0
    }
}
