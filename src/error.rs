//! # 统一错误处理模块
//!
//! 定义 emstrain 的所有错误类型，使用 `thiserror` 派生。
//!
//! ## 错误分类
//! - 形状错误：张量不是方阵或阶数不符
//! - 分解错误：奇异、病态或非有限的张量
//! - 定义域错误：转角提取时 asin 参数越界
//! - 形变/模拟错误：正向模型中外部能力的失败，原样向上传播
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// emstrain 统一错误类型
#[derive(Error, Debug)]
pub enum EmStrainError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ─────────────────────────────────────────────────────────────
    // 解析错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to parse {format} file: {path}\nReason: {reason}")]
    ParseError {
        format: String,
        path: String,
        reason: String,
    },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    // ─────────────────────────────────────────────────────────────
    // 张量场错误
    // ─────────────────────────────────────────────────────────────
    #[error("Shape error: {0}")]
    ShapeError(String),

    #[error("Polar decomposition failed at position {position}: {reason}")]
    DecompositionError { position: usize, reason: String },

    #[error("Rotation angle undefined at position {position}: asin argument {value} outside [-1, 1]")]
    DomainError { position: usize, value: f64 },

    // ─────────────────────────────────────────────────────────────
    // 正向模型错误
    // ─────────────────────────────────────────────────────────────
    #[error("Structure deformation failed: {0}")]
    DeformationError(String),

    #[error("Diffraction simulation failed: {0}")]
    SimulationError(String),

    // ─────────────────────────────────────────────────────────────
    // 参数错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ─────────────────────────────────────────────────────────────
    // CSV 错误
    // ─────────────────────────────────────────────────────────────
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    // ─────────────────────────────────────────────────────────────
    // 其他
    // ─────────────────────────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, EmStrainError>;
