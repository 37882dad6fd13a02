//! # simulate 子命令实现
//!
//! 读取结构，按给定形变矩阵形变后计算电子衍射斑点，输出图像或斑点列表。
//!
//! ## 依赖关系
//! - 使用 `cli/simulate.rs` 定义的 SimulateArgs
//! - 使用 `fitting/` 的 `ForwardModel` 完成形变 + 模拟 + 标定
//! - 使用 `diffraction/` 模块绘图与导出
//! - 使用 `parsers/` 读写结构

use crate::cli::simulate::{PatternOutputFormat, SimulateArgs};
use crate::diffraction::{export, plot, DiffractionSimulation};
use crate::error::Result;
use crate::fitting::ForwardModel;
use crate::models::Crystal;
use crate::parsers::{self, poscar};
use crate::utils::output;

use std::path::Path;

/// 执行衍射模拟
pub fn execute(args: SimulateArgs) -> Result<()> {
    output::print_header("Electron Diffraction Simulation");

    let crystal = parsers::parse_structure_file(&args.structure)?;
    output::print_success(&format!(
        "Loaded structure: {} ({}, {} atoms, {})",
        crystal.name,
        crystal.formula(),
        crystal.atoms.len(),
        crystal.source_format.as_deref().unwrap_or("unknown format")
    ));

    print_lattice("Reference lattice", &crystal);

    let calculator = args.diffraction.calculator();
    output::print_info(&format!(
        "{:.0} kV (λ = {:.5} Å), |g| ≤ {} Å⁻¹, excitation error ≤ {} Å⁻¹",
        calculator.accelerating_voltage(),
        calculator.wavelength(),
        calculator.reciprocal_radius(),
        calculator.max_excitation_error()
    ));

    let model = ForwardModel::new(calculator, crystal, args.calibration)?
        .with_parameters(args.deformation.unwrap_or_default());
    output::print_matrix("Deformation", &model.parameters().matrix());

    let deformed = model.deformed_structure(model.parameters())?;
    print_lattice("Deformed lattice", &deformed);
    if let Some(path) = &args.save_deformed {
        poscar::write_poscar_file(&deformed, path)?;
        output::print_success(&format!("Deformed structure saved to '{}'", path.display()));
    }

    let simulation = model.simulate()?;
    if simulation.is_empty() {
        output::print_warning("No reflections satisfy the excitation condition");
    } else {
        output::print_success(&format!("Calculated {} diffraction spots", simulation.len()));
    }

    let format = args
        .format
        .unwrap_or_else(|| guess_format_from_extension(&args.output));

    match format {
        PatternOutputFormat::Png | PatternOutputFormat::Svg => {
            let title = args
                .title
                .clone()
                .unwrap_or_else(|| model.structure().name.clone());
            let label_count = if args.label_spots { args.label_count } else { 0 };
            plot::generate_pattern_plot(
                &simulation,
                &args.output,
                &title,
                args.width,
                args.height,
                label_count,
                format == PatternOutputFormat::Svg,
            )?;
        }
        PatternOutputFormat::Csv => export::spots_to_csv(&simulation, &args.output)?,
    }
    output::print_success(&format!("Pattern saved to '{}'", args.output.display()));

    print_spot_table(&simulation, args.label_count)?;

    Ok(())
}

fn print_lattice(label: &str, crystal: &Crystal) {
    let (a, b, c, alpha, beta, gamma) = crystal.lattice.parameters();
    output::print_info(&format!(
        "{}: a={:.4} b={:.4} c={:.4} Å, α={:.2}° β={:.2}° γ={:.2}°, V={:.3} Å³",
        label,
        a,
        b,
        c,
        alpha,
        beta,
        gamma,
        crystal.lattice.volume()
    ));
}

/// 从文件扩展名推断输出格式
fn guess_format_from_extension(path: &Path) -> PatternOutputFormat {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .as_deref()
    {
        Some("svg") => PatternOutputFormat::Svg,
        Some("csv") => PatternOutputFormat::Csv,
        _ => PatternOutputFormat::Png,
    }
}

/// 打印最强斑点表格
fn print_spot_table(simulation: &DiffractionSimulation, count: usize) -> Result<()> {
    use tabled::{Table, Tabled};

    #[derive(Tabled)]
    struct SpotRow {
        #[tabled(rename = "(hkl)")]
        hkl: String,
        #[tabled(rename = "|g| (Å⁻¹)")]
        g: String,
        #[tabled(rename = "x (px)")]
        x: String,
        #[tabled(rename = "y (px)")]
        y: String,
        #[tabled(rename = "I (%)")]
        intensity: String,
    }

    let pixels = simulation.calibrated_coordinates()?;
    let intensities = simulation.normalized_intensities();

    let rows: Vec<SpotRow> = simulation
        .spots
        .iter()
        .zip(&pixels)
        .zip(&intensities)
        .take(count)
        .map(|((spot, p), i)| {
            let [h, k, l] = spot.indices;
            SpotRow {
                hkl: format!("({} {} {})", h, k, l),
                g: format!("{:.4}", spot.g_magnitude()),
                x: format!("{:.2}", p[0]),
                y: format!("{:.2}", p[1]),
                intensity: format!("{:.1}", i),
            }
        })
        .collect();

    if !rows.is_empty() {
        output::print_header(&format!("Top {} Diffraction Spots", rows.len()));
        println!("{}", Table::new(&rows));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_format_from_extension() {
        assert_eq!(
            guess_format_from_extension(Path::new("a.SVG")),
            PatternOutputFormat::Svg
        );
        assert_eq!(
            guess_format_from_extension(Path::new("spots.csv")),
            PatternOutputFormat::Csv
        );
        assert_eq!(
            guess_format_from_extension(Path::new("pattern")),
            PatternOutputFormat::Png
        );
    }
}
