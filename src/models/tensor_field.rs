//! # 张量场与应变场数据模型
//!
//! `TensorField` 按扫描位置（导航维度，行优先/C 顺序）存储二阶张量，
//! 每个位置一个 `rank × rank` 方阵，`rank` 为 2 或 3。
//! `StrainField` 为每个位置存储 4 个通道：(e11, e22, e12, theta)。
//!
//! ## 依赖关系
//! - 被 `strain/`, `parsers/tensor_csv.rs`, `diffraction/export.rs` 使用
//! - 使用 `nalgebra::DMatrix` 存储张量

use crate::error::{EmStrainError, Result};

use nalgebra::DMatrix;

/// 张量场：导航形状 + 每个位置一个方阵
#[derive(Debug, Clone, PartialEq)]
pub struct TensorField {
    nav_shape: Vec<usize>,
    rank: usize,
    tensors: Vec<DMatrix<f64>>,
}

impl TensorField {
    /// 创建张量场并校验形状
    ///
    /// 要求：导航形状非空且各轴长度 > 0，位置数与张量数一致，
    /// 所有张量均为同阶（2 或 3）方阵且元素有限。
    pub fn new(nav_shape: Vec<usize>, tensors: Vec<DMatrix<f64>>) -> Result<Self> {
        if nav_shape.is_empty() || nav_shape.contains(&0) {
            return Err(EmStrainError::ShapeError(format!(
                "Invalid navigation shape {:?}",
                nav_shape
            )));
        }

        let expected: usize = nav_shape.iter().product();
        if tensors.len() != expected {
            return Err(EmStrainError::ShapeError(format!(
                "Navigation shape {:?} needs {} tensors, got {}",
                nav_shape,
                expected,
                tensors.len()
            )));
        }

        let rank = tensors[0].nrows();
        if rank != 2 && rank != 3 {
            return Err(EmStrainError::ShapeError(format!(
                "Tensor rank must be 2 or 3, got {}",
                rank
            )));
        }

        for (position, tensor) in tensors.iter().enumerate() {
            if !tensor.is_square() || tensor.nrows() != rank {
                return Err(EmStrainError::ShapeError(format!(
                    "Tensor at position {} is {}x{}, expected {}x{}",
                    position,
                    tensor.nrows(),
                    tensor.ncols(),
                    rank,
                    rank
                )));
            }
            if tensor.iter().any(|v| !v.is_finite()) {
                return Err(EmStrainError::ShapeError(format!(
                    "Tensor at position {} contains non-finite values",
                    position
                )));
            }
        }

        Ok(Self {
            nav_shape,
            rank,
            tensors,
        })
    }

    /// 从行优先的 rank×rank 分量数组创建
    pub fn from_components(nav_shape: Vec<usize>, rank: usize, components: &[Vec<f64>]) -> Result<Self> {
        let tensors = components
            .iter()
            .enumerate()
            .map(|(position, values)| {
                if values.len() != rank * rank {
                    return Err(EmStrainError::ShapeError(format!(
                        "Position {} has {} components, expected {}",
                        position,
                        values.len(),
                        rank * rank
                    )));
                }
                Ok(DMatrix::from_row_slice(rank, rank, values))
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(nav_shape, tensors)
    }

    /// 所有位置均为同一张量的均匀场
    pub fn uniform(nav_shape: Vec<usize>, tensor: DMatrix<f64>) -> Result<Self> {
        let n = nav_shape.iter().product();
        Self::new(nav_shape, vec![tensor; n])
    }

    pub fn nav_shape(&self) -> &[usize] {
        &self.nav_shape
    }

    /// 张量阶数（2 或 3）
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// 位置总数
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    pub fn tensors(&self) -> &[DMatrix<f64>] {
        &self.tensors
    }

    pub fn get(&self, position: usize) -> Option<&DMatrix<f64>> {
        self.tensors.get(position)
    }

    /// 线性位置 -> 多维导航索引
    pub fn nav_index(&self, position: usize) -> Vec<usize> {
        nav_index(&self.nav_shape, position)
    }
}

/// 应变场通道，顺序固定为 (e11, e22, e12, theta)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrainChannel {
    E11,
    E22,
    E12,
    Theta,
}

impl StrainChannel {
    /// 输出通道顺序
    pub const ALL: [StrainChannel; 4] = [
        StrainChannel::E11,
        StrainChannel::E22,
        StrainChannel::E12,
        StrainChannel::Theta,
    ];

    pub fn index(self) -> usize {
        match self {
            StrainChannel::E11 => 0,
            StrainChannel::E22 => 1,
            StrainChannel::E12 => 2,
            StrainChannel::Theta => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            StrainChannel::E11 => "e11",
            StrainChannel::E22 => "e22",
            StrainChannel::E12 => "e12",
            StrainChannel::Theta => "theta",
        }
    }
}

impl std::fmt::Display for StrainChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 应变场：每个位置 4 个通道
#[derive(Debug, Clone, PartialEq)]
pub struct StrainField {
    nav_shape: Vec<usize>,
    values: Vec<[f64; 4]>,
}

impl StrainField {
    pub fn new(nav_shape: Vec<usize>, values: Vec<[f64; 4]>) -> Result<Self> {
        let expected: usize = nav_shape.iter().product();
        if values.len() != expected {
            return Err(EmStrainError::ShapeError(format!(
                "Navigation shape {:?} needs {} strain entries, got {}",
                nav_shape,
                expected,
                values.len()
            )));
        }
        Ok(Self { nav_shape, values })
    }

    pub fn nav_shape(&self) -> &[usize] {
        &self.nav_shape
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 单个位置的 (e11, e22, e12, theta)
    pub fn get(&self, position: usize) -> Option<[f64; 4]> {
        self.values.get(position).copied()
    }

    pub fn values(&self) -> &[[f64; 4]] {
        &self.values
    }

    /// 提取单个通道（按位置顺序）
    pub fn channel(&self, channel: StrainChannel) -> Vec<f64> {
        self.values.iter().map(|v| v[channel.index()]).collect()
    }

    pub fn nav_index(&self, position: usize) -> Vec<usize> {
        nav_index(&self.nav_shape, position)
    }
}

/// 行优先线性位置 -> 多维索引
fn nav_index(shape: &[usize], mut position: usize) -> Vec<usize> {
    let mut index = vec![0; shape.len()];
    for (axis, &len) in shape.iter().enumerate().rev() {
        index[axis] = position % len;
        position /= len;
    }
    index
}

/// 多维索引 -> 行优先线性位置；越界返回 `None`
pub fn linear_position(shape: &[usize], index: &[usize]) -> Option<usize> {
    if shape.len() != index.len() {
        return None;
    }
    let mut position = 0;
    for (&i, &len) in index.iter().zip(shape) {
        if i >= len {
            return None;
        }
        position = position * len + i;
    }
    Some(position)
}
