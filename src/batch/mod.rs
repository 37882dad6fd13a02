//! # 批量处理模块
//!
//! 提供统一的逐项并行处理能力。
//!
//! ## 功能
//! - 并行处理（线程数可配置）
//! - 进度反馈与统计
//!
//! ## 依赖关系
//! - 被 `fitting/` 和 `commands/fit.rs` 使用
//! - 使用 `rayon` 进行并行处理
//! - 使用 `indicatif` 显示进度

pub mod runner;

pub use runner::{BatchResult, BatchRunner, ProcessResult};
