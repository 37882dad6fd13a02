//! # 拟合结果导出
//!
//! ## 列
//! position, d11 .. d33, cost, iterations, converged
//!
//! 输出可直接作为 `strain` 命令的张量场输入（`position` 为一维导航列）。
//!
//! ## 依赖关系
//! - 被 `commands/fit.rs` 调用
//! - 使用 `csv` 库写入 CSV 文件

use crate::error::{EmStrainError, Result};
use crate::fitting::{FitResult, PARAMETER_NAMES};

use std::path::Path;

/// 导出拟合结果（每个位置一行）
pub fn fits_to_csv(fits: &[(usize, FitResult)], output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;

    let mut header = vec!["position"];
    header.extend(PARAMETER_NAMES);
    header.extend(["cost", "iterations", "converged"]);
    wtr.write_record(&header)?;

    for (position, fit) in fits {
        let mut record = vec![position.to_string()];
        record.extend(fit.parameters.as_array().iter().map(|v| format!("{:.8}", v)));
        record.push(format!("{:.6e}", fit.cost));
        record.push(fit.iterations.to_string());
        record.push(fit.converged.to_string());
        wtr.write_record(&record)?;
    }

    wtr.flush().map_err(|e| EmStrainError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fitting::DeformationParameters;
    use crate::parsers::tensor_csv::read_tensor_field;

    #[test]
    fn test_fit_csv_feeds_strain_input() {
        let fits = vec![
            (
                0,
                FitResult {
                    parameters: DeformationParameters::identity(),
                    cost: 0.0,
                    iterations: 12,
                    converged: true,
                },
            ),
            (
                1,
                FitResult {
                    parameters: "1.01,0,0,0,0.99,0,0,0,1".parse().unwrap(),
                    cost: 1.5e-3,
                    iterations: 80,
                    converged: false,
                },
            ),
        ];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fit.csv");

        fits_to_csv(&fits, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines[0],
            "position,d11,d12,d13,d21,d22,d23,d31,d32,d33,cost,iterations,converged"
        );
        assert!(lines[2].ends_with(",1.500000e-3,80,false"));

        let field = read_tensor_field(&path).unwrap();
        assert_eq!(field.nav_shape(), &[2]);
        assert!((field.get(1).unwrap()[(0, 0)] - 1.01).abs() < 1e-12);
    }
}
