//! # 结构形变
//!
//! 用 3×3 形变矩阵 F 作用于参考结构，返回新结构，不修改输入。
//!
//! ## 依赖关系
//! - 被 `fitting/mod.rs`（`ForwardModel`）使用
//! - 使用 `models/structure.rs`

use crate::error::{EmStrainError, Result};
use crate::models::{Crystal, Lattice};

use nalgebra::Matrix3;

/// 结构形变能力
pub trait StructureDeformer {
    fn deform(&self, structure: &Crystal, deformation: &Matrix3<f64>) -> Result<Crystal>;
}

/// 晶格矢量形变：每个晶格矢量 v 变为 F·v，分数坐标不变
#[derive(Debug, Clone, Copy, Default)]
pub struct LatticeDeformation;

impl StructureDeformer for LatticeDeformation {
    fn deform(&self, structure: &Crystal, deformation: &Matrix3<f64>) -> Result<Crystal> {
        if deformation.iter().any(|v| !v.is_finite()) {
            return Err(EmStrainError::DeformationError(
                "Deformation matrix contains non-finite entries".to_string(),
            ));
        }

        let det = deformation.determinant();
        if det.abs() < 1e-10 {
            return Err(EmStrainError::DeformationError(format!(
                "Deformation matrix is singular (det = {:.3e})",
                det
            )));
        }

        // 晶格矩阵按行存放矢量：L' = L · Fᵀ
        let lattice = structure.lattice.to_matrix3() * deformation.transpose();
        Ok(structure.with_lattice(Lattice::from_matrix3(&lattice)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Atom;

    fn crystal() -> Crystal {
        Crystal::new(
            "test",
            Lattice::from_parameters(3.0, 4.0, 5.0, 90.0, 90.0, 90.0),
            vec![Atom::new("Si", [0.25, 0.5, 0.75])],
        )
    }

    #[test]
    fn test_identity_leaves_lattice_unchanged() {
        let base = crystal();
        let deformed = LatticeDeformation.deform(&base, &Matrix3::identity()).unwrap();
        assert_eq!(deformed.lattice, base.lattice);
        assert_eq!(deformed.atoms, base.atoms);
    }

    #[test]
    fn test_vectors_transform_as_f_times_v() {
        let base = crystal();
        let f = Matrix3::new(1.0, 0.1, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0);
        let deformed = LatticeDeformation.deform(&base, &f).unwrap();

        // b = (0, 4, 0) -> F·b = (0.4, 4, 0)
        let b = deformed.lattice.matrix[1];
        assert!((b[0] - 0.4).abs() < 1e-12);
        assert!((b[1] - 4.0).abs() < 1e-12);
        // 分数坐标不变，基结构不变
        assert_eq!(deformed.atoms[0].position, [0.25, 0.5, 0.75]);
        assert!((base.lattice.matrix[1][0]).abs() < 1e-12);
    }

    #[test]
    fn test_singular_and_non_finite_rejected() {
        let base = crystal();
        let singular = Matrix3::new(1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0);
        assert!(matches!(
            LatticeDeformation.deform(&base, &singular).unwrap_err(),
            EmStrainError::DeformationError(_)
        ));

        let mut nan = Matrix3::identity();
        nan[(2, 2)] = f64::NAN;
        assert!(matches!(
            LatticeDeformation.deform(&base, &nan).unwrap_err(),
            EmStrainError::DeformationError(_)
        ));
    }
}
