//! # 衍射模拟结果
//!
//! 电子衍射斑点列表，坐标为倒空间笛卡尔坐标（Å⁻¹），
//! 附加标定（Å⁻¹/像素）后可换算为探测器像素坐标。
//!
//! ## 依赖关系
//! - 由 `diffraction/calculator.rs` 生成
//! - 被 `fitting/`, `diffraction/plot.rs`, `diffraction/export.rs` 使用

use crate::error::{EmStrainError, Result};

use serde::{Deserialize, Serialize};

/// 单个衍射斑点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffractionSpot {
    /// 倒格矢笛卡尔坐标 [gx, gy, gz]（Å⁻¹，不含 2π）
    pub coordinates: [f64; 3],
    /// Miller 指数 [h, k, l]
    pub indices: [i32; 3],
    /// 运动学强度（任意单位）
    pub intensity: f64,
}

impl DiffractionSpot {
    /// 倒格矢长度 |g|
    pub fn g_magnitude(&self) -> f64 {
        let [x, y, z] = self.coordinates;
        (x * x + y * y + z * z).sqrt()
    }
}

/// 电子衍射模拟图样
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffractionSimulation {
    /// 斑点列表（按强度降序）
    pub spots: Vec<DiffractionSpot>,
    /// 电子波长（Å）
    pub wavelength: f64,
    /// 结构名称
    pub structure_name: String,
    /// 标定：每像素对应的倒空间长度（Å⁻¹/像素）
    pub calibration: Option<f64>,
}

impl DiffractionSimulation {
    /// 附加标定
    pub fn with_calibration(mut self, calibration: f64) -> Self {
        self.calibration = Some(calibration);
        self
    }

    pub fn len(&self) -> usize {
        self.spots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spots.is_empty()
    }

    /// 最强斑点强度
    pub fn max_intensity(&self) -> f64 {
        self.spots.iter().map(|s| s.intensity).fold(0.0, f64::max)
    }

    /// 归一化到 0-100 的强度（与 `spots` 顺序一致）
    pub fn normalized_intensities(&self) -> Vec<f64> {
        let max = self.max_intensity();
        self.spots
            .iter()
            .map(|s| if max > 0.0 { 100.0 * s.intensity / max } else { 0.0 })
            .collect()
    }

    /// 探测器像素坐标 (x, y) = (gx, gy) / calibration
    pub fn calibrated_coordinates(&self) -> Result<Vec<[f64; 2]>> {
        let calibration = match self.calibration {
            Some(c) if c > 0.0 && c.is_finite() => c,
            Some(c) => {
                return Err(EmStrainError::InvalidArgument(format!(
                    "Calibration must be positive, got {}",
                    c
                )))
            }
            None => {
                return Err(EmStrainError::InvalidArgument(
                    "Simulation has no calibration attached".to_string(),
                ))
            }
        };

        Ok(self
            .spots
            .iter()
            .map(|s| [s.coordinates[0] / calibration, s.coordinates[1] / calibration])
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simulation() -> DiffractionSimulation {
        DiffractionSimulation {
            spots: vec![
                DiffractionSpot {
                    coordinates: [0.5, 0.0, 0.0],
                    indices: [2, 0, 0],
                    intensity: 4.0,
                },
                DiffractionSpot {
                    coordinates: [0.0, -0.25, 0.0],
                    indices: [0, -1, 0],
                    intensity: 1.0,
                },
            ],
            wavelength: 0.0251,
            structure_name: "test".to_string(),
            calibration: None,
        }
    }

    #[test]
    fn test_calibrated_coordinates_need_calibration() {
        let err = simulation().calibrated_coordinates().unwrap_err();
        assert!(matches!(err, EmStrainError::InvalidArgument(_)));
    }

    #[test]
    fn test_calibrated_coordinates() {
        let sim = simulation().with_calibration(0.01);
        let xy = sim.calibrated_coordinates().unwrap();
        assert!((xy[0][0] - 50.0).abs() < 1e-9);
        assert!((xy[1][1] + 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalized_intensities() {
        let norm = simulation().normalized_intensities();
        assert_eq!(norm, vec![100.0, 25.0]);
    }
}
