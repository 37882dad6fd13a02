//! # 应变场分析模块
//!
//! 对位移梯度张量场逐位置做右极分解，并在小应变近似下导出应变图。
//!
//! ## 输出通道（固定顺序）
//! - e11 = 1 − U[0,0]
//! - e22 = 1 − U[1,1]
//! - e12 = U[0,1]
//! - theta = −asin(R[1,0])（弧度）
//!
//! 小应变近似按原样保留（1 − U，而非对数应变）。转角只用 R[1,0] 一个元素，
//! 仅在 |theta| < 90° 时有意义；asin 参数越界时报 `DomainError`，不做截断。
//!
//! ## 失败策略
//! 严格、整批失败：任一位置分解失败则整个调用返回
//! `DecompositionError { position, .. }`，输出中不会出现 NaN。
//!
//! ## 依赖关系
//! - 被 `commands/strain.rs` 调用
//! - 使用 `models/tensor_field.rs`
//! - 使用 `rayon` 逐位置并行（各位置写入互不相交的输出槽）

pub mod export;
pub mod polar;

pub use polar::{polar_decomposition, PolarDecomposition};

use crate::error::{EmStrainError, Result};
use crate::models::{StrainField, TensorField};

use nalgebra::DMatrix;
use rayon::prelude::*;

/// 对张量场逐位置做右极分解，返回 (R 场, U 场)
pub fn decompose(field: &TensorField) -> Result<(TensorField, TensorField)> {
    let results = field
        .tensors()
        .par_iter()
        .enumerate()
        .map(|(position, tensor)| polar::polar_at(position, tensor))
        .collect::<Result<Vec<_>>>()?;

    let (rotations, stretches): (Vec<_>, Vec<_>) = results
        .into_iter()
        .map(|p| (p.rotation, p.stretch))
        .unzip();

    let nav_shape = field.nav_shape().to_vec();
    Ok((
        TensorField::new(nav_shape.clone(), rotations)?,
        TensorField::new(nav_shape, stretches)?,
    ))
}

/// 旋转矩阵对应的转角：−asin(R[1,0])
pub fn rotation_angle(rotation: &DMatrix<f64>) -> Result<f64> {
    rotation_angle_at(0, rotation)
}

fn rotation_angle_at(position: usize, rotation: &DMatrix<f64>) -> Result<f64> {
    if rotation.nrows() < 2 || rotation.ncols() < 2 {
        return Err(EmStrainError::ShapeError(format!(
            "Rotation at position {} is {}x{}, need at least 2x2",
            position,
            rotation.nrows(),
            rotation.ncols()
        )));
    }

    let value = rotation[(1, 0)];
    if !value.is_finite() || value.abs() > 1.0 {
        return Err(EmStrainError::DomainError { position, value });
    }

    Ok(-value.asin())
}

/// 由已有的 (R, U) 场计算应变图
pub fn strain_from_decomposition(rotation: &TensorField, stretch: &TensorField) -> Result<StrainField> {
    if rotation.nav_shape() != stretch.nav_shape() {
        return Err(EmStrainError::ShapeError(format!(
            "Rotation field {:?} and stretch field {:?} differ in navigation shape",
            rotation.nav_shape(),
            stretch.nav_shape()
        )));
    }

    let values = rotation
        .tensors()
        .par_iter()
        .zip(stretch.tensors().par_iter())
        .enumerate()
        .map(|(position, (r, u))| -> Result<[f64; 4]> {
            let theta = rotation_angle_at(position, r)?;
            Ok([1.0 - u[(0, 0)], 1.0 - u[(1, 1)], u[(0, 1)], theta])
        })
        .collect::<Result<Vec<_>>>()?;

    StrainField::new(rotation.nav_shape().to_vec(), values)
}

/// 分解张量场并计算 (e11, e22, e12, theta) 应变图
pub fn strain_summary(field: &TensorField) -> Result<StrainField> {
    let (rotation, stretch) = decompose(field)?;
    strain_from_decomposition(&rotation, &stretch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StrainChannel;

    fn rotation_2x2(theta: f64) -> DMatrix<f64> {
        let (s, c) = theta.sin_cos();
        DMatrix::from_row_slice(2, 2, &[c, -s, s, c])
    }

    #[test]
    fn test_identity_field_has_zero_strain() {
        let field = TensorField::uniform(vec![2, 3], DMatrix::identity(3, 3)).unwrap();
        let strain = strain_summary(&field).unwrap();

        assert_eq!(strain.nav_shape(), &[2, 3]);
        for v in strain.values() {
            for component in v {
                assert!(component.abs() < 1e-12, "expected zero strain, got {:?}", v);
            }
        }
    }

    #[test]
    fn test_identity_decomposition() {
        let field = TensorField::uniform(vec![4], DMatrix::identity(2, 2)).unwrap();
        let (r, u) = decompose(&field).unwrap();
        for (rt, ut) in r.tensors().iter().zip(u.tensors()) {
            assert!((rt - DMatrix::<f64>::identity(2, 2)).norm() < 1e-12);
            assert!((ut - DMatrix::<f64>::identity(2, 2)).norm() < 1e-12);
        }
    }

    #[test]
    fn test_small_rotation_sign_convention() {
        let field = TensorField::uniform(vec![1], rotation_2x2(0.05)).unwrap();
        let strain = strain_summary(&field).unwrap();
        let [e11, e22, e12, theta] = strain.get(0).unwrap();

        assert!(e11.abs() < 1e-12);
        assert!(e22.abs() < 1e-12);
        assert!(e12.abs() < 1e-12);
        assert!((theta + 0.05).abs() < 1e-12, "theta = {}", theta);
    }

    #[test]
    fn test_stretch_channels() {
        // D = diag(1.01, 0.98)：e11 = -0.01, e22 = 0.02
        let d = DMatrix::from_row_slice(3, 3, &[1.01, 0.0, 0.0, 0.0, 0.98, 0.0, 0.0, 0.0, 1.0]);
        let field = TensorField::uniform(vec![1, 1], d).unwrap();
        let strain = strain_summary(&field).unwrap();
        let [e11, e22, e12, theta] = strain.get(0).unwrap();

        assert!((e11 + 0.01).abs() < 1e-12);
        assert!((e22 - 0.02).abs() < 1e-12);
        assert!(e12.abs() < 1e-12);
        assert!(theta.abs() < 1e-12);
    }

    #[test]
    fn test_shear_channel() {
        let d = DMatrix::from_row_slice(2, 2, &[1.0, 0.01, 0.01, 1.0]);
        let field = TensorField::uniform(vec![1], d).unwrap();
        let strain = strain_summary(&field).unwrap();
        assert!((strain.channel(StrainChannel::E12)[0] - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_channel_order_matches_per_position_input() {
        let tensors = vec![
            DMatrix::from_row_slice(2, 2, &[0.99, 0.0, 0.0, 1.0]),
            rotation_2x2(-0.02),
        ];
        let field = TensorField::new(vec![2], tensors).unwrap();
        let strain = strain_summary(&field).unwrap();

        let e11 = strain.channel(StrainChannel::E11);
        let theta = strain.channel(StrainChannel::Theta);
        assert!((e11[0] - 0.01).abs() < 1e-12);
        assert!(e11[1].abs() < 1e-12);
        assert!(theta[0].abs() < 1e-12);
        assert!((theta[1] - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_singular_position_aborts_whole_field() {
        let tensors = vec![
            DMatrix::identity(2, 2),
            DMatrix::identity(2, 2),
            DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]),
        ];
        let field = TensorField::new(vec![3], tensors).unwrap();

        let err = strain_summary(&field).unwrap_err();
        assert!(matches!(err, EmStrainError::DecompositionError { position: 2, .. }));
    }

    #[test]
    fn test_rotation_angle_domain_error() {
        let mut r = DMatrix::identity(2, 2);
        r[(1, 0)] = 1.0 + 1e-9;
        let err = rotation_angle(&r).unwrap_err();
        assert!(matches!(err, EmStrainError::DomainError { .. }));
    }

    #[test]
    fn test_rotation_angle_beyond_ninety_degrees_aliases() {
        // asin 只看 R[1,0]：120° 与 60° 给出同一个角度
        let a = rotation_angle(&rotation_2x2(120f64.to_radians())).unwrap();
        let b = rotation_angle(&rotation_2x2(60f64.to_radians())).unwrap();
        assert!((a - b).abs() < 1e-12);
    }
}
