//! # VASP POSCAR 格式读写
//!
//! 读取正向模型的参考结构，并可写出形变后的结构。
//!
//! ## POSCAR 格式说明
//! ```text
//! Comment line (structure name)
//! 1.0                    # scaling factor
//! a1 a2 a3               # lattice vector a
//! b1 b2 b3               # lattice vector b
//! c1 c2 c3               # lattice vector c
//! Element1 Element2 ...  # element symbols (VASP 5+)
//! n1 n2 ...              # number of atoms per element
//! Selective dynamics     # optional
//! Direct/Cartesian       # coordinate type
//! x1 y1 z1               # atom positions
//! ```
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 和 `commands/simulate.rs` 使用
//! - 使用 `models/structure.rs`

use crate::error::{EmStrainError, Result};
use crate::models::{Atom, Crystal, Lattice};

use std::fs;
use std::path::Path;

/// 解析 POSCAR/CONTCAR 文件
pub fn parse_poscar_file(path: &Path) -> Result<Crystal> {
    let content = fs::read_to_string(path).map_err(|e| EmStrainError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    let default_name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown");

    parse_poscar_content(&content, default_name)
}

/// 从字符串内容解析 POSCAR 格式
pub fn parse_poscar_content(content: &str, default_name: &str) -> Result<Crystal> {
    let lines: Vec<&str> = content
        .lines()
        .map(str::trim)
        .collect();

    let fail = |reason: String| EmStrainError::ParseError {
        format: "poscar".to_string(),
        path: default_name.to_string(),
        reason,
    };

    if lines.len() < 8 {
        return Err(fail("File too short".to_string()));
    }

    let name = match lines[0] {
        "" => default_name.to_string(),
        comment => comment.to_string(),
    };

    let scale: f64 = lines[1]
        .split_whitespace()
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| fail(format!("Invalid scaling factor '{}'", lines[1])))?;
    if scale <= 0.0 {
        return Err(fail(format!(
            "Volume-style (negative) scaling factor {} is not supported",
            scale
        )));
    }

    let mut matrix = [[0.0; 3]; 3];
    for (i, row) in matrix.iter_mut().enumerate() {
        let values = parse_floats(lines[2 + i], 3)
            .ok_or_else(|| fail(format!("Invalid lattice vector at line {}", 3 + i)))?;
        *row = [values[0] * scale, values[1] * scale, values[2] * scale];
    }
    let lattice = Lattice::from_vectors(matrix);

    // VASP 5+ 有元素行；VASP 4 直接是数目行
    let first = lines[5].split_whitespace().next().unwrap_or("");
    let (elements, counts, mut cursor): (Vec<String>, Vec<usize>, usize) =
        if first.parse::<usize>().is_ok() {
            let counts = parse_counts(lines[5]);
            let elements = (1..=counts.len()).map(|i| format!("X{}", i)).collect();
            (elements, counts, 6)
        } else {
            let elements = lines[5].split_whitespace().map(String::from).collect();
            (elements, parse_counts(lines[6]), 7)
        };

    if elements.len() != counts.len() || counts.is_empty() {
        return Err(fail(format!(
            "{} element symbols but {} atom counts",
            elements.len(),
            counts.len()
        )));
    }

    if lines
        .get(cursor)
        .is_some_and(|l| l.to_lowercase().starts_with('s'))
    {
        cursor += 1;
    }

    let coord_type = lines
        .get(cursor)
        .ok_or_else(|| fail("Missing coordinate type line".to_string()))?
        .to_lowercase();
    let is_cartesian = coord_type.starts_with('c') || coord_type.starts_with('k');
    cursor += 1;

    let total: usize = counts.iter().sum();
    let species = elements
        .iter()
        .zip(&counts)
        .flat_map(|(element, &n)| std::iter::repeat(element).take(n));

    let mut atoms = Vec::with_capacity(total);
    for (offset, element) in species.enumerate() {
        let line = lines.get(cursor + offset).ok_or_else(|| {
            fail(format!("Expected {} atom positions, found {}", total, offset))
        })?;
        let values = parse_floats(line, 3)
            .ok_or_else(|| fail(format!("Invalid atom position at line {}", cursor + offset + 1)))?;

        let mut position = [values[0], values[1], values[2]];
        if is_cartesian {
            position = lattice.to_fractional(position.map(|v| v * scale));
        }
        atoms.push(Atom::new(element.clone(), position));
    }

    let mut crystal = Crystal::new(name, lattice, atoms);
    crystal.source_format = Some("poscar".to_string());

    Ok(crystal)
}

/// 取一行的前 `n` 个浮点数
fn parse_floats(line: &str, n: usize) -> Option<Vec<f64>> {
    let values: Vec<f64> = line
        .split_whitespace()
        .take(n)
        .map(|s| s.parse().ok())
        .collect::<Option<_>>()?;
    (values.len() == n).then_some(values)
}

fn parse_counts(line: &str) -> Vec<usize> {
    line.split_whitespace()
        .map_while(|s| s.parse().ok())
        .collect()
}

/// 将 Crystal 转换为 POSCAR 格式字符串（Direct 坐标）
pub fn to_poscar_string(crystal: &Crystal) -> String {
    // 保持元素首次出现的顺序
    let mut species: Vec<(&str, Vec<[f64; 3]>)> = Vec::new();
    for atom in &crystal.atoms {
        match species.iter_mut().find(|(el, _)| *el == atom.element) {
            Some((_, positions)) => positions.push(atom.position),
            None => species.push((atom.element.as_str(), vec![atom.position])),
        }
    }

    let mut out = format!("{}\n1.0\n", crystal.name);
    for row in &crystal.lattice.matrix {
        out.push_str(&format!(
            "  {:16.10}  {:16.10}  {:16.10}\n",
            row[0], row[1], row[2]
        ));
    }

    let symbols: Vec<&str> = species.iter().map(|(el, _)| *el).collect();
    let counts: Vec<String> = species.iter().map(|(_, p)| p.len().to_string()).collect();
    out.push_str(&format!("   {}\n   {}\nDirect\n", symbols.join("   "), counts.join("   ")));

    for (_, positions) in &species {
        for p in positions {
            out.push_str(&format!("  {:16.10}  {:16.10}  {:16.10}\n", p[0], p[1], p[2]));
        }
    }

    out
}

/// 写出 POSCAR 文件
pub fn write_poscar_file(crystal: &Crystal, path: &Path) -> Result<()> {
    fs::write(path, to_poscar_string(crystal)).map_err(|e| EmStrainError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })
}
