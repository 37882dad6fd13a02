//! # 应变场与张量场导出
//!
//! ## 列
//! - 应变场：导航索引列, e11, e22, e12, theta
//! - 张量场：导航索引列, d11, d12, ...（行优先）
//!
//! 导航列名：一维 `x`，二维 `y,x`，三维 `z,y,x`，更高维 `i0,i1,...`。
//! 张量场的输出格式与 `parsers::tensor_csv` 的输入格式一致。
//!
//! ## 依赖关系
//! - 被 `commands/strain.rs` 调用
//! - 使用 `csv` 库写入 CSV 文件

use crate::error::{EmStrainError, Result};
use crate::models::{StrainChannel, StrainField, TensorField};

use std::path::Path;

fn axis_names(ndim: usize) -> Vec<String> {
    match ndim {
        1 => vec!["x".to_string()],
        2 => vec!["y".to_string(), "x".to_string()],
        3 => vec!["z".to_string(), "y".to_string(), "x".to_string()],
        n => (0..n).map(|k| format!("i{}", k)).collect(),
    }
}

fn flush(wtr: &mut csv::Writer<std::fs::File>, output_path: &Path) -> Result<()> {
    wtr.flush().map_err(|e| EmStrainError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    })
}

/// 导出应变场
pub fn strain_to_csv(field: &StrainField, output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;

    let mut header = axis_names(field.nav_shape().len());
    header.extend(StrainChannel::ALL.iter().map(|c| c.name().to_string()));
    wtr.write_record(&header)?;

    for (position, values) in field.values().iter().enumerate() {
        let mut record: Vec<String> = field
            .nav_index(position)
            .iter()
            .map(|i| i.to_string())
            .collect();
        record.extend(values.iter().map(|v| format!("{:.8e}", v)));
        wtr.write_record(&record)?;
    }

    flush(&mut wtr, output_path)
}

/// 导出张量场（R 或 U）
pub fn tensor_field_to_csv(field: &TensorField, output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;
    let rank = field.rank();

    let mut header = axis_names(field.nav_shape().len());
    for i in 1..=rank {
        for j in 1..=rank {
            header.push(format!("d{}{}", i, j));
        }
    }
    wtr.write_record(&header)?;

    for (position, tensor) in field.tensors().iter().enumerate() {
        let mut record: Vec<String> = field
            .nav_index(position)
            .iter()
            .map(|i| i.to_string())
            .collect();
        for i in 0..rank {
            for j in 0..rank {
                record.push(format!("{:.10e}", tensor[(i, j)]));
            }
        }
        wtr.write_record(&record)?;
    }

    flush(&mut wtr, output_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::tensor_csv::read_tensor_field;
    use nalgebra::DMatrix;

    #[test]
    fn test_axis_names() {
        assert_eq!(axis_names(2), vec!["y", "x"]);
        assert_eq!(axis_names(4), vec!["i0", "i1", "i2", "i3"]);
    }

    #[test]
    fn test_strain_to_csv() {
        let field = StrainField::new(
            vec![1, 2],
            vec![[0.01, -0.02, 0.0, 0.05], [0.0, 0.0, 0.0, 0.0]],
        )
        .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strain.csv");

        strain_to_csv(&field, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "y,x,e11,e22,e12,theta");
        assert!(lines[1].starts_with("0,0,1.00000000e-2,-2.00000000e-2,"));
        assert!(lines[2].starts_with("0,1,"));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_tensor_field_csv_reads_back() {
        let tensors = vec![
            DMatrix::from_row_slice(2, 2, &[1.0, 0.1, -0.1, 1.0]),
            DMatrix::from_row_slice(2, 2, &[0.98, 0.0, 0.0, 1.02]),
            DMatrix::identity(2, 2),
        ];
        let field = TensorField::new(vec![3], tensors).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stretch.csv");

        tensor_field_to_csv(&field, &path).unwrap();
        let back = read_tensor_field(&path).unwrap();

        assert_eq!(back.nav_shape(), field.nav_shape());
        for (a, b) in back.tensors().iter().zip(field.tensors()) {
            assert!((a - b).abs().max() < 1e-9);
        }
    }
}
