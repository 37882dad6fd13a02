//! # 数据模型模块
//!
//! 定义晶体结构、张量场与应变场数据模型。
//!
//! ## 依赖关系
//! - 被 `parsers/`, `strain/`, `diffraction/`, `fitting/` 使用
//! - 子模块: structure, tensor_field

pub mod structure;
pub mod tensor_field;

pub use structure::{Atom, Crystal, Lattice};
pub use tensor_field::{StrainChannel, StrainField, TensorField};
