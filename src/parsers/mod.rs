//! # 解析器模块
//!
//! 读取参考结构、张量场与观测斑点文件。
//!
//! ## 依赖关系
//! - 被 `commands/` 模块使用
//! - 使用 `models/` 数据模型
//! - 子模块: poscar, tensor_csv, spots_csv

pub mod poscar;
pub mod spots_csv;
pub mod tensor_csv;

use crate::error::{EmStrainError, Result};
use crate::models::Crystal;
use std::path::Path;

/// 从文件路径推断格式并解析结构
pub fn parse_structure_file(path: &Path) -> Result<Crystal> {
    if !path.is_file() {
        return Err(EmStrainError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");

    if ext == "vasp" || ext == "poscar" || name.starts_with("POSCAR") || name.starts_with("CONTCAR")
    {
        return poscar::parse_poscar_file(path);
    }

    Err(EmStrainError::UnsupportedFormat(format!(
        "Cannot determine format for: {} (expected POSCAR/CONTCAR or *.vasp)",
        path.display()
    )))
}
