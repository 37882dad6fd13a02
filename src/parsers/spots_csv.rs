//! # 观测斑点 CSV 读取
//!
//! ## 格式
//! ```text
//! position,x,y,intensity
//! 0,49.8,0.2,100
//! 0,-50.1,0.0,97.5
//! 1,...
//! ```
//!
//! x, y 为以直射束为原点的探测器像素坐标。
//!
//! ## 依赖关系
//! - 被 `commands/fit.rs` 调用
//! - 生成 `fitting/objective.rs` 中的 `ObservedPattern`

use crate::error::{EmStrainError, Result};
use crate::fitting::{ObservedPattern, ObservedSpot};

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct ObservedRow {
    position: usize,
    x: f64,
    y: f64,
    intensity: f64,
}

/// 读取观测斑点，按位置分组（位置升序）
pub fn read_observed_patterns(path: &Path) -> Result<Vec<(usize, ObservedPattern)>> {
    if !path.is_file() {
        return Err(EmStrainError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
    let mut grouped: BTreeMap<usize, Vec<ObservedSpot>> = BTreeMap::new();

    for (line, row) in rdr.deserialize::<ObservedRow>().enumerate() {
        let row = row?;
        if !(row.x.is_finite() && row.y.is_finite() && row.intensity.is_finite())
            || row.intensity < 0.0
        {
            return Err(EmStrainError::ParseError {
                format: "spots csv".to_string(),
                path: path.display().to_string(),
                reason: format!("Line {}: spot values must be finite with intensity >= 0", line + 2),
            });
        }
        grouped.entry(row.position).or_default().push(ObservedSpot {
            x: row.x,
            y: row.y,
            intensity: row.intensity,
        });
    }

    if grouped.is_empty() {
        return Err(EmStrainError::ParseError {
            format: "spots csv".to_string(),
            path: path.display().to_string(),
            reason: "No observed spots".to_string(),
        });
    }

    Ok(grouped
        .into_iter()
        .map(|(position, spots)| (position, ObservedPattern::new(spots)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_observed_patterns_grouped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("observed.csv");
        std::fs::write(
            &path,
            "position,x,y,intensity
3,10.0,0.0,50
0,49.8,0.2,100
0,-50.1,0.0,97.5
",
        )
        .unwrap();

        let patterns = read_observed_patterns(&path).unwrap();
        assert_eq!(patterns.len(), 2);
        assert_eq!(patterns[0].0, 0);
        assert_eq!(patterns[0].1.spots().len(), 2);
        assert_eq!(patterns[1].0, 3);
        assert!((patterns[1].1.spots()[0].x - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_negative_intensity_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("observed.csv");
        std::fs::write(&path, "position,x,y,intensity\n0,1,1,-2\n").unwrap();

        let err = read_observed_patterns(&path).unwrap_err();
        assert!(matches!(err, EmStrainError::ParseError { .. }));
    }

    #[test]
    fn test_missing_column_is_csv_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("observed.csv");
        std::fs::write(&path, "position,x,y\n0,1,1\n").unwrap();

        let err = read_observed_patterns(&path).unwrap_err();
        assert!(matches!(err, EmStrainError::CsvError(_)));
    }
}
