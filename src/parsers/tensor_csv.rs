//! # 张量场 CSV 读取
//!
//! ## 格式
//! ```text
//! y,x,d11,d12,d21,d22
//! 0,0,1.0,0.0,0.0,1.0
//! 0,1,0.99,0.01,-0.01,1.0
//! ```
//!
//! - 分量列之前的列为导航索引（整数，行优先），导航形状取各轴最大索引 + 1
//! - 分量列为 `d11 d12 d21 d22`（2×2）或 `d11 .. d33`（3×3），按名称匹配；
//!   其后的其他列被忽略，因此 `fit` 命令的输出可直接作为输入
//! - 每个位置必须恰好出现一次
//! - 没有导航列时，行号即位置（一维导航）
//!
//! ## 依赖关系
//! - 被 `commands/strain.rs` 调用
//! - 使用 `models/tensor_field.rs`

use crate::error::{EmStrainError, Result};
use crate::models::tensor_field::linear_position;
use crate::models::TensorField;

use std::path::Path;

/// 分量列名是否形如 `dij`（i, j ∈ 1..=3）
fn component_index(name: &str) -> Option<(usize, usize)> {
    let bytes = name.as_bytes();
    if bytes.len() != 3 || bytes[0] != b'd' {
        return None;
    }
    let row = (bytes[1] as char).to_digit(10)? as usize;
    let col = (bytes[2] as char).to_digit(10)? as usize;
    ((1..=3).contains(&row) && (1..=3).contains(&col)).then_some((row - 1, col - 1))
}

/// 读取张量场 CSV
pub fn read_tensor_field(path: &Path) -> Result<TensorField> {
    if !path.is_file() {
        return Err(EmStrainError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let fail = |reason: String| EmStrainError::ParseError {
        format: "tensor csv".to_string(),
        path: path.display().to_string(),
        reason,
    };

    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
    let headers = rdr.headers()?.clone();

    let first_component = headers
        .iter()
        .position(|h| component_index(h).is_some())
        .ok_or_else(|| fail("No tensor component columns (d11, d12, ...)".to_string()))?;
    let nav_axes = first_component;

    // 分量列之后的其他列（如拟合结果中的 cost）忽略
    let components: Vec<(usize, (usize, usize))> = headers
        .iter()
        .enumerate()
        .skip(nav_axes)
        .filter_map(|(column, name)| component_index(name).map(|ij| (column, ij)))
        .collect();

    let rank = match components.len() {
        4 => 2,
        9 => 3,
        n => {
            return Err(EmStrainError::ShapeError(format!(
                "Expected 4 (2x2) or 9 (3x3) tensor components, found {}",
                n
            )))
        }
    };
    let mut seen = vec![[false; 3]; 3];
    for &(_, (i, j)) in &components {
        if i >= rank || j >= rank || seen[i][j] {
            return Err(EmStrainError::ShapeError(format!(
                "Component columns do not form a {}x{} tensor",
                rank, rank
            )));
        }
        seen[i][j] = true;
    }

    let mut rows: Vec<(Vec<usize>, Vec<f64>)> = Vec::new();
    for (line, record) in rdr.records().enumerate() {
        let record = record?;
        let line = line + 2;

        let index = (0..nav_axes)
            .map(|axis| {
                record[axis].parse::<usize>().map_err(|_| {
                    fail(format!(
                        "Line {}: invalid navigation index '{}' in column '{}'",
                        line, &record[axis], &headers[axis]
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut values = vec![0.0; rank * rank];
        for &(column, (i, j)) in &components {
            values[i * rank + j] = record[column].parse::<f64>().map_err(|_| {
                fail(format!(
                    "Line {}: invalid value '{}' in column '{}'",
                    line, &record[column], &headers[column]
                ))
            })?;
        }

        rows.push((index, values));
    }

    if rows.is_empty() {
        return Err(fail("No tensor rows".to_string()));
    }

    let nav_shape: Vec<usize> = if nav_axes == 0 {
        vec![rows.len()]
    } else {
        (0..nav_axes)
            .map(|axis| {
                let max = rows.iter().map(|(index, _)| index[axis]).max().unwrap_or(0);
                max.checked_add(1).ok_or_else(|| {
                    EmStrainError::ShapeError(format!(
                        "Navigation index {} in column '{}' is out of range",
                        max, &headers[axis]
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?
    };

    // 每个位置恰好一行：位置总数必须等于行数，之后才分配
    let positions = nav_shape
        .iter()
        .try_fold(1usize, |acc, &len| acc.checked_mul(len))
        .ok_or_else(|| {
            EmStrainError::ShapeError(format!("Navigation shape {:?} is too large", nav_shape))
        })?;
    if positions != rows.len() {
        return Err(EmStrainError::ShapeError(format!(
            "Navigation shape {:?} has {} positions but the file has {} rows",
            nav_shape,
            positions,
            rows.len()
        )));
    }

    let mut slots: Vec<Option<Vec<f64>>> = vec![None; positions];
    for (row, (index, values)) in rows.into_iter().enumerate() {
        let position = if nav_axes == 0 {
            row
        } else {
            linear_position(&nav_shape, &index).ok_or_else(|| {
                EmStrainError::ShapeError(format!("Navigation index {:?} out of range", index))
            })?
        };
        if slots[position].replace(values).is_some() {
            return Err(EmStrainError::ShapeError(format!(
                "Navigation index {:?} appears more than once",
                index
            )));
        }
    }

    let components = slots
        .into_iter()
        .enumerate()
        .map(|(position, slot)| {
            slot.ok_or_else(|| {
                EmStrainError::ShapeError(format!(
                    "No tensor for position {} of navigation shape {:?}",
                    position, nav_shape
                ))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    TensorField::from_components(nav_shape, rank, &components)
}
