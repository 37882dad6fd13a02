//! # 极分解
//!
//! 右极分解 D = R·U：R 为正交旋转矩阵（det = +1），U 为对称半正定伸长矩阵。
//!
//! ## 算法
//! 由奇异值分解 D = W Σ Vᵀ 得到：
//! - R = W Vᵀ
//! - U = V Σ Vᵀ（显式对称化）
//!
//! ## 失败条件
//! - 非有限元素
//! - SVD 不收敛
//! - 奇异或病态（最小奇异值 ≤ n·ε·最大奇异值）
//! - 行列式 ≤ 0（旋转部分将是非正常的反射）
//!
//! ## 依赖关系
//! - 被 `strain/mod.rs` 调用
//! - 使用 `nalgebra` 的 SVD

use crate::error::{EmStrainError, Result};

use nalgebra::DMatrix;

/// 单个张量的极分解结果
#[derive(Debug, Clone, PartialEq)]
pub struct PolarDecomposition {
    /// 正交旋转矩阵 R
    pub rotation: DMatrix<f64>,
    /// 对称伸长矩阵 U
    pub stretch: DMatrix<f64>,
}

/// 单个张量的右极分解
///
/// 单独调用时错误中的位置记为 0。
pub fn polar_decomposition(tensor: &DMatrix<f64>) -> Result<PolarDecomposition> {
    polar_at(0, tensor)
}

/// 指定位置的右极分解，错误携带该位置
pub(crate) fn polar_at(position: usize, tensor: &DMatrix<f64>) -> Result<PolarDecomposition> {
    if !tensor.is_square() {
        return Err(EmStrainError::ShapeError(format!(
            "Tensor at position {} is {}x{}, polar decomposition needs a square matrix",
            position,
            tensor.nrows(),
            tensor.ncols()
        )));
    }

    let fail = |reason: String| EmStrainError::DecompositionError { position, reason };

    if tensor.iter().any(|v| !v.is_finite()) {
        return Err(fail("tensor contains non-finite values".to_string()));
    }

    let n = tensor.nrows();
    let svd = tensor
        .clone()
        .try_svd(true, true, f64::EPSILON, 0)
        .ok_or_else(|| fail("SVD did not converge".to_string()))?;

    let singular = &svd.singular_values;
    let (s_max, s_min) = (singular.max(), singular.min());
    if s_max <= 0.0 || s_min <= n as f64 * f64::EPSILON * s_max {
        return Err(fail(format!(
            "tensor is singular (singular values {:.3e} .. {:.3e})",
            s_min, s_max
        )));
    }

    let det = tensor.determinant();
    if det <= 0.0 {
        return Err(fail(format!(
            "determinant {:.6e} is not positive, rotation would be improper",
            det
        )));
    }

    let (w, v_t) = match (svd.u, svd.v_t) {
        (Some(u), Some(v_t)) => (u, v_t),
        _ => return Err(fail("SVD did not return singular vectors".to_string())),
    };

    let rotation = &w * &v_t;
    let stretch = v_t.transpose() * DMatrix::from_diagonal(singular) * &v_t;
    let stretch = (&stretch + stretch.transpose()) * 0.5;

    Ok(PolarDecomposition { rotation, stretch })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn max_abs_diff(a: &DMatrix<f64>, b: &DMatrix<f64>) -> f64 {
        (a - b).iter().fold(0.0_f64, |acc, v| acc.max(v.abs()))
    }

    #[test]
    fn test_identity_decomposes_to_identity() {
        let p = polar_decomposition(&DMatrix::identity(3, 3)).unwrap();
        assert!(max_abs_diff(&p.rotation, &DMatrix::identity(3, 3)) < 1e-12);
        assert!(max_abs_diff(&p.stretch, &DMatrix::identity(3, 3)) < 1e-12);
    }

    #[test]
    fn test_pure_rotation_2x2() {
        let theta: f64 = 0.05;
        let (s, c) = theta.sin_cos();
        let d = DMatrix::from_row_slice(2, 2, &[c, -s, s, c]);
        let p = polar_decomposition(&d).unwrap();

        assert!(max_abs_diff(&p.rotation, &d) < 1e-12);
        assert!(max_abs_diff(&p.stretch, &DMatrix::identity(2, 2)) < 1e-12);
    }

    #[test]
    fn test_pure_stretch_is_kept_in_u() {
        let d = DMatrix::from_row_slice(3, 3, &[1.02, 0.01, 0.0, 0.01, 0.97, 0.0, 0.0, 0.0, 1.0]);
        let p = polar_decomposition(&d).unwrap();

        assert!(max_abs_diff(&p.rotation, &DMatrix::identity(3, 3)) < 1e-10);
        assert!(max_abs_diff(&p.stretch, &d) < 1e-10);
    }

    #[test]
    fn test_singular_tensor_fails() {
        let d = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        let err = polar_decomposition(&d).unwrap_err();
        assert!(matches!(err, EmStrainError::DecompositionError { position: 0, .. }));
    }

    #[test]
    fn test_zero_tensor_fails() {
        let err = polar_decomposition(&DMatrix::zeros(3, 3)).unwrap_err();
        assert!(matches!(err, EmStrainError::DecompositionError { .. }));
    }

    #[test]
    fn test_reflection_fails() {
        let d = DMatrix::from_row_slice(2, 2, &[-1.0, 0.0, 0.0, 1.0]);
        let err = polar_decomposition(&d).unwrap_err();
        assert!(matches!(err, EmStrainError::DecompositionError { .. }));
    }

    #[test]
    fn test_non_square_is_shape_error() {
        let d = DMatrix::from_row_slice(2, 3, &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        let err = polar_decomposition(&d).unwrap_err();
        assert!(matches!(err, EmStrainError::ShapeError(_)));
    }

    #[test]
    fn test_position_is_reported() {
        let err = polar_at(17, &DMatrix::zeros(2, 2)).unwrap_err();
        assert!(matches!(err, EmStrainError::DecompositionError { position: 17, .. }));
    }

    fn tensor_strategy(n: usize) -> impl Strategy<Value = DMatrix<f64>> {
        prop::collection::vec(-2.0f64..2.0, n * n)
            .prop_map(move |values| DMatrix::from_row_slice(n, n, &values))
    }

    /// 2×2 或 3×3 的随机张量
    fn any_tensor() -> impl Strategy<Value = DMatrix<f64>> {
        (2usize..=3).prop_flat_map(tensor_strategy)
    }

    proptest! {
        /// R·U 重构原张量
        #[test]
        fn recomposition_reproduces_tensor(d in any_tensor()) {
            prop_assume!(d.determinant() > 0.05);
            let p = polar_decomposition(&d).unwrap();
            let rebuilt = &p.rotation * &p.stretch;
            prop_assert!(max_abs_diff(&rebuilt, &d) < 1e-9);
        }

        /// R 正交且 det = +1
        #[test]
        fn rotation_is_proper_orthogonal(d in any_tensor()) {
            prop_assume!(d.determinant() > 0.05);
            let n = d.nrows();
            let p = polar_decomposition(&d).unwrap();
            let rrt = &p.rotation * p.rotation.transpose();
            prop_assert!(max_abs_diff(&rrt, &DMatrix::identity(n, n)) < 1e-9);
            prop_assert!((p.rotation.determinant() - 1.0).abs() < 1e-9);
        }

        /// U 对称且半正定
        #[test]
        fn stretch_is_symmetric(d in any_tensor()) {
            prop_assume!(d.determinant() > 0.05);
            let p = polar_decomposition(&d).unwrap();
            prop_assert!(max_abs_diff(&p.stretch, &p.stretch.transpose()) < 1e-12);
            let eigenvalues = p.stretch.clone().symmetric_eigenvalues();
            prop_assert!(eigenvalues.iter().all(|&v| v > -1e-9));
        }
    }
}
