//! # 电子衍射计算器
//!
//! 运动学近似下的电子衍射斑点图样计算，电子束沿笛卡尔 +z 方向。
//!
//! ## 算法概述
//! 1. 由加速电压计算相对论电子波长 λ，Ewald 球半径 1/λ
//! 2. 遍历倒易半径内的 (hkl) 点 g = h b1 + k b2 + l b3（不含 2π）
//! 3. 计算 g 到 Ewald 球面的距离（激发误差），超过上限的点丢弃
//! 4. 用电子散射因子计算结构因子 F(hkl)
//! 5. 强度 = |F|² · (1 − 激发误差/激发误差上限)
//!
//! ## 依赖关系
//! - 实现 `diffraction::DiffractionSimulator`
//! - 使用 `models/structure.rs` 的 Crystal, Lattice
//! - 使用 `diffraction/scattering.rs` 获取电子散射因子

use crate::diffraction::scattering::{self, ScatteringFactorParams};
use crate::diffraction::simulation::{DiffractionSimulation, DiffractionSpot};
use crate::error::{EmStrainError, Result};
use crate::models::Crystal;

use std::f64::consts::PI;

/// 普朗克常数 (J·s)
const PLANCK: f64 = 6.626_070_15e-34;
/// 电子静止质量 (kg)
const ELECTRON_MASS: f64 = 9.109_383_701_5e-31;
/// 元电荷 (C)
const ELEMENTARY_CHARGE: f64 = 1.602_176_634e-19;
/// 光速 (m/s)
const SPEED_OF_LIGHT: f64 = 2.997_924_58e8;

/// (hkl) 搜索网格的点数上限；超过时报错而不是截断
const MAX_SEARCH_POINTS: f64 = 1e8;

/// 低于此强度的斑点视为消光
const MIN_INTENSITY: f64 = 1e-10;

/// 相对论电子波长（Å）
///
/// λ = h / sqrt(2 m₀ e V (1 + eV / 2 m₀ c²))
pub fn electron_wavelength(accelerating_voltage_kv: f64) -> f64 {
    let energy = ELEMENTARY_CHARGE * accelerating_voltage_kv * 1e3;
    let momentum = (2.0 * ELECTRON_MASS * energy
        * (1.0 + energy / (2.0 * ELECTRON_MASS * SPEED_OF_LIGHT * SPEED_OF_LIGHT)))
        .sqrt();
    PLANCK / momentum * 1e10
}

/// 电子衍射计算器
#[derive(Debug, Clone)]
pub struct ElectronDiffractionCalculator {
    /// 加速电压（kV）
    accelerating_voltage: f64,
    /// 倒易空间截断半径（Å⁻¹）
    reciprocal_radius: f64,
    /// 最大激发误差（Å⁻¹）
    max_excitation_error: f64,
}

impl ElectronDiffractionCalculator {
    /// 创建新的电子衍射计算器
    pub fn new(accelerating_voltage: f64, reciprocal_radius: f64, max_excitation_error: f64) -> Self {
        Self {
            accelerating_voltage,
            reciprocal_radius,
            max_excitation_error,
        }
    }

    pub fn accelerating_voltage(&self) -> f64 {
        self.accelerating_voltage
    }

    pub fn reciprocal_radius(&self) -> f64 {
        self.reciprocal_radius
    }

    pub fn max_excitation_error(&self) -> f64 {
        self.max_excitation_error
    }

    /// 电子波长（Å）
    pub fn wavelength(&self) -> f64 {
        electron_wavelength(self.accelerating_voltage)
    }

    /// 计算结构的电子衍射斑点图样
    pub fn calculate_ed_data(&self, crystal: &Crystal) -> Result<DiffractionSimulation> {
        self.validate()?;

        if crystal.atoms.is_empty() {
            return Err(EmStrainError::SimulationError(format!(
                "Structure '{}' has no atoms",
                crystal.name
            )));
        }

        // 散射因子在 hkl 循环前逐原子解析，未知元素直接报错
        let factors = crystal
            .atoms
            .iter()
            .map(|atom| {
                scattering::lookup(&atom.element).ok_or_else(|| {
                    EmStrainError::SimulationError(format!(
                        "Unknown element '{}' in structure '{}'",
                        atom.element, crystal.name
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let recip = crystal.lattice.reciprocal().ok_or_else(|| {
            EmStrainError::SimulationError(format!(
                "Structure '{}' has a degenerate lattice",
                crystal.name
            ))
        })?;

        let wavelength = self.wavelength();
        let r_sphere = 1.0 / wavelength;

        // |h| = |g · a| ≤ |g||a|
        let bounds = crystal
            .lattice
            .lengths()
            .map(|len| (self.reciprocal_radius * len).ceil().max(1.0));
        let search_points: f64 = bounds.iter().map(|b| 2.0 * b + 1.0).product();
        if !(search_points <= MAX_SEARCH_POINTS) {
            return Err(EmStrainError::SimulationError(format!(
                "hkl search of {:.0} points for '{}' is too large (limit {:.0}); \
                 reduce the reciprocal radius",
                search_points, crystal.name, MAX_SEARCH_POINTS
            )));
        }
        let max_index = bounds.map(|b| b as i32);

        let mut spots = Vec::new();

        for h in -max_index[0]..=max_index[0] {
            for k in -max_index[1]..=max_index[1] {
                for l in -max_index[2]..=max_index[2] {
                    if h == 0 && k == 0 && l == 0 {
                        continue;
                    }

                    let g = reciprocal_vector(&recip, h, k, l);
                    let g_mag = (g[0] * g[0] + g[1] * g[1] + g[2] * g[2]).sqrt();
                    if g_mag > self.reciprocal_radius {
                        continue;
                    }

                    let excitation = match excitation_error(&g, r_sphere) {
                        Some(e) if e <= self.max_excitation_error => e,
                        _ => continue,
                    };

                    // s = sin(θ)/λ = 1/(2d) = |g|/2
                    let (f_real, f_imag) =
                        structure_factor(crystal, &factors, [h, k, l], g_mag / 2.0);
                    let shape = 1.0 - excitation / self.max_excitation_error;
                    let intensity = (f_real * f_real + f_imag * f_imag) * shape;

                    if intensity < MIN_INTENSITY {
                        continue;
                    }

                    spots.push(DiffractionSpot {
                        coordinates: g,
                        indices: [h, k, l],
                        intensity,
                    });
                }
            }
        }

        spots.sort_by(|a, b| b.intensity.total_cmp(&a.intensity));

        Ok(DiffractionSimulation {
            spots,
            wavelength,
            structure_name: crystal.name.clone(),
            calibration: None,
        })
    }

    fn validate(&self) -> Result<()> {
        let checks = [
            ("accelerating voltage", self.accelerating_voltage),
            ("reciprocal radius", self.reciprocal_radius),
            ("max excitation error", self.max_excitation_error),
        ];
        for (name, value) in checks {
            if !(value.is_finite() && value > 0.0) {
                return Err(EmStrainError::SimulationError(format!(
                    "Invalid {}: {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// 倒格矢 g = h*b1 + k*b2 + l*b3
fn reciprocal_vector(recip: &[[f64; 3]; 3], h: i32, k: i32, l: i32) -> [f64; 3] {
    let (hf, kf, lf) = (h as f64, k as f64, l as f64);
    [
        hf * recip[0][0] + kf * recip[1][0] + lf * recip[2][0],
        hf * recip[0][1] + kf * recip[1][1] + lf * recip[2][1],
        hf * recip[0][2] + kf * recip[1][2] + lf * recip[2][2],
    ]
}

/// g 到 Ewald 球面的距离；球面在该径向距离处不存在时返回 `None`
///
/// 球心位于 (0, 0, 1/λ)，球面过原点。
fn excitation_error(g: &[f64; 3], r_sphere: f64) -> Option<f64> {
    let r_spot2 = g[0] * g[0] + g[1] * g[1];
    let r_sphere2 = r_sphere * r_sphere;
    if r_spot2 > r_sphere2 {
        return None;
    }
    let z_sphere = r_sphere - (r_sphere2 - r_spot2).sqrt();
    Some((z_sphere - g[2]).abs())
}

/// 结构因子 F = Σ f_e(s) exp(2πi(hx + ky + lz))
///
/// `factors` 与 `crystal.atoms` 一一对应。
fn structure_factor(
    crystal: &Crystal,
    factors: &[ScatteringFactorParams],
    hkl: [i32; 3],
    s: f64,
) -> (f64, f64) {
    let mut f_real = 0.0;
    let mut f_imag = 0.0;

    for (atom, params) in crystal.atoms.iter().zip(factors) {
        let f_atom = params.electron(s);
        let [x, y, z] = atom.position;
        let phase = 2.0 * PI * (hkl[0] as f64 * x + hkl[1] as f64 * y + hkl[2] as f64 * z);
        f_real += f_atom * phase.cos();
        f_imag += f_atom * phase.sin();
    }

    (f_real, f_imag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Atom, Lattice};

    fn aluminium() -> Crystal {
        Crystal::new(
            "Al",
            Lattice::cubic(4.05),
            vec![
                Atom::new("Al", [0.0, 0.0, 0.0]),
                Atom::new("Al", [0.5, 0.5, 0.0]),
                Atom::new("Al", [0.5, 0.0, 0.5]),
                Atom::new("Al", [0.0, 0.5, 0.5]),
            ],
        )
    }

    fn find(sim: &DiffractionSimulation, hkl: [i32; 3]) -> Option<&DiffractionSpot> {
        sim.spots.iter().find(|s| s.indices == hkl)
    }

    #[test]
    fn test_wavelength_200kv() {
        let lambda = electron_wavelength(200.0);
        assert!((lambda - 0.02508).abs() < 1e-4, "got {}", lambda);
    }

    #[test]
    fn test_wavelength_300kv() {
        let lambda = ElectronDiffractionCalculator::new(300.0, 1.0, 0.01).wavelength();
        assert!((lambda - 0.01969).abs() < 1e-4, "got {}", lambda);
    }

    #[test]
    fn test_simple_cubic_zone_axis() {
        let crystal = Crystal::new("Cu", Lattice::cubic(4.0), vec![Atom::new("Cu", [0.0; 3])]);
        let calc = ElectronDiffractionCalculator::new(200.0, 0.6, 0.02);
        let sim = calc.calculate_ed_data(&crystal).unwrap();

        let spot = find(&sim, [1, 0, 0]).expect("(100) should be excited");
        assert!((spot.g_magnitude() - 0.25).abs() < 1e-12);
        assert!(find(&sim, [0, 0, 1]).is_none(), "(001) lies far off the Ewald sphere");
        assert!(sim.calibration.is_none());
    }

    #[test]
    fn test_fcc_extinctions() {
        let calc = ElectronDiffractionCalculator::new(200.0, 0.8, 0.02);
        let sim = calc.calculate_ed_data(&aluminium()).unwrap();

        assert!(find(&sim, [1, 0, 0]).is_none());
        assert!(find(&sim, [1, 1, 0]).is_none());
        assert!(find(&sim, [2, 0, 0]).is_some());
        assert!(find(&sim, [2, 2, 0]).is_some());
    }

    #[test]
    fn test_fourfold_symmetry() {
        let calc = ElectronDiffractionCalculator::new(200.0, 0.8, 0.02);
        let sim = calc.calculate_ed_data(&aluminium()).unwrap();

        let a = find(&sim, [2, 0, 0]).unwrap().intensity;
        let b = find(&sim, [0, 2, 0]).unwrap().intensity;
        let c = find(&sim, [-2, 0, 0]).unwrap().intensity;
        assert!((a - b).abs() / a < 1e-9);
        assert!((a - c).abs() / a < 1e-9);
    }

    #[test]
    fn test_spots_sorted_by_intensity() {
        let calc = ElectronDiffractionCalculator::new(200.0, 1.0, 0.02);
        let sim = calc.calculate_ed_data(&aluminium()).unwrap();
        assert!(!sim.is_empty());
        for pair in sim.spots.windows(2) {
            assert!(pair[0].intensity >= pair[1].intensity);
        }
    }

    #[test]
    fn test_compressed_lattice_moves_spots_outward() {
        let calc = ElectronDiffractionCalculator::new(200.0, 0.8, 0.02);
        let base = calc.calculate_ed_data(&aluminium()).unwrap();

        let squeezed = aluminium().with_lattice(Lattice::from_vectors([
            [4.05 * 0.99, 0.0, 0.0],
            [0.0, 4.05, 0.0],
            [0.0, 0.0, 4.05],
        ]));
        let strained = calc.calculate_ed_data(&squeezed).unwrap();

        let g0 = find(&base, [2, 0, 0]).unwrap().coordinates[0];
        let g1 = find(&strained, [2, 0, 0]).unwrap().coordinates[0];
        assert!((g1 / g0 - 1.0 / 0.99).abs() < 1e-9);
    }

    #[test]
    fn test_large_cell_keeps_high_order_reflections() {
        // a = 120 Å：(55 0 0) 的 |g| ≈ 0.458 Å⁻¹，仍在倒易半径 0.5 内
        let crystal = Crystal::new(
            "supercell",
            Lattice::from_vectors([[120.0, 0.0, 0.0], [0.0, 4.0, 0.0], [0.0, 0.0, 4.0]]),
            vec![Atom::new("Si", [0.0; 3])],
        );
        let sim = ElectronDiffractionCalculator::new(200.0, 0.5, 0.02)
            .calculate_ed_data(&crystal)
            .unwrap();

        let spot = find(&sim, [55, 0, 0]).expect("(55 0 0) lies inside the reciprocal radius");
        assert!((spot.g_magnitude() - 55.0 / 120.0).abs() < 1e-12);
        let max_h = sim.spots.iter().map(|s| s.indices[0].abs()).max().unwrap();
        assert!(max_h >= 59, "max |h| = {}", max_h);
    }

    #[test]
    fn test_oversized_search_fails() {
        let crystal = Crystal::new("huge", Lattice::cubic(1000.0), vec![Atom::new("Si", [0.0; 3])]);
        let err = ElectronDiffractionCalculator::new(200.0, 2.0, 0.02)
            .calculate_ed_data(&crystal)
            .unwrap_err();
        assert!(matches!(err, EmStrainError::SimulationError(_)));
    }

    #[test]
    fn test_unknown_element_fails() {
        let crystal = Crystal::new("mystery", Lattice::cubic(4.0), vec![Atom::new("Qq", [0.0; 3])]);
        let err = ElectronDiffractionCalculator::new(200.0, 1.0, 0.02)
            .calculate_ed_data(&crystal)
            .unwrap_err();
        match err {
            EmStrainError::SimulationError(msg) => assert!(msg.contains("Qq"), "{}", msg),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_degenerate_lattice_fails() {
        let crystal = Crystal::new(
            "flat",
            Lattice::from_vectors([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]]),
            vec![Atom::new("Si", [0.0; 3])],
        );
        let err = ElectronDiffractionCalculator::new(200.0, 1.0, 0.02)
            .calculate_ed_data(&crystal)
            .unwrap_err();
        assert!(matches!(err, EmStrainError::SimulationError(_)));
    }

    #[test]
    fn test_invalid_settings_fail() {
        let err = ElectronDiffractionCalculator::new(0.0, 1.0, 0.02)
            .calculate_ed_data(&aluminium())
            .unwrap_err();
        assert!(matches!(err, EmStrainError::SimulationError(_)));

        let err = ElectronDiffractionCalculator::new(200.0, 1.0, -0.1)
            .calculate_ed_data(&aluminium())
            .unwrap_err();
        assert!(matches!(err, EmStrainError::SimulationError(_)));
    }
}
