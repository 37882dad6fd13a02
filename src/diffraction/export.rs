//! # 衍射数据导出
//!
//! 导出模拟斑点列表为 CSV。
//!
//! ## 列
//! gx, gy, gz (Å⁻¹), x, y (像素，无标定时为空), h, k, l, intensity (0-100)
//!
//! ## 依赖关系
//! - 被 `commands/simulate.rs` 调用
//! - 使用 `csv` 库写入 CSV 文件

use crate::diffraction::DiffractionSimulation;
use crate::error::{EmStrainError, Result};

use std::path::Path;

/// 导出斑点列表为 CSV 格式
pub fn spots_to_csv(simulation: &DiffractionSimulation, output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;

    wtr.write_record(["gx", "gy", "gz", "x", "y", "h", "k", "l", "intensity"])?;

    let pixels = match simulation.calibration {
        Some(_) => Some(simulation.calibrated_coordinates()?),
        None => None,
    };
    let intensities = simulation.normalized_intensities();

    for (i, spot) in simulation.spots.iter().enumerate() {
        let [gx, gy, gz] = spot.coordinates;
        let [h, k, l] = spot.indices;
        let (x, y) = match &pixels {
            Some(p) => (format!("{:.3}", p[i][0]), format!("{:.3}", p[i][1])),
            None => (String::new(), String::new()),
        };

        wtr.write_record(&[
            format!("{:.6}", gx),
            format!("{:.6}", gy),
            format!("{:.6}", gz),
            x,
            y,
            h.to_string(),
            k.to_string(),
            l.to_string(),
            format!("{:.4}", intensities[i]),
        ])?;
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
    use crate::diffraction::DiffractionSpot;

    #[test]
    fn test_spots_to_csv_with_calibration() {
        let sim = DiffractionSimulation {
            spots: vec![DiffractionSpot {
                coordinates: [0.5, 0.0, 0.003],
                indices: [2, 0, 0],
                intensity: 12.0,
            }],
            wavelength: 0.0251,
            structure_name: "Al".to_string(),
            calibration: Some(0.01),
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spots.csv");
        spots_to_csv(&sim, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "gx,gy,gz,x,y,h,k,l,intensity");
        assert_eq!(lines[1], "0.500000,0.000000,0.003000,50.000,0.000,2,0,0,100.0000");
    }
}
