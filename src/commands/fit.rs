//! # fit 子命令实现
//!
//! 对每个导航位置的观测斑点独立拟合形变参数。
//!
//! ## 功能
//! - 单纯形拟合（只改动 `--free` 指定的参数）
//! - 多位置并行（rayon，`--jobs`）
//! - 汇总成功/失败并导出拟合结果 CSV
//!
//! ## 依赖关系
//! - 使用 `cli/fit.rs` 定义的 FitArgs
//! - 使用 `fitting/` 模块（`ForwardModel`, `fit_map`）
//! - 使用 `batch/` 汇总结果
//! - 使用 `strain/` 求拟合形变的面内转角
//! - 使用 `parsers/` 读取结构与观测斑点

use crate::batch::{BatchResult, ProcessResult};
use crate::cli::fit::FitArgs;
use crate::error::{EmStrainError, Result};
use crate::fitting::{self, export, FitConfig, FitResult, ForwardModel, ObjectiveSettings};
use crate::parsers::{self, spots_csv};
use crate::strain;
use crate::utils::output;

use nalgebra::DMatrix;

/// 执行拟合
pub fn execute(args: FitArgs) -> Result<()> {
    output::print_header("Diffraction Forward-Model Fit");

    let crystal = parsers::parse_structure_file(&args.structure)?;
    output::print_success(&format!(
        "Loaded structure: {} ({}, {} atoms)",
        crystal.name,
        crystal.formula(),
        crystal.atoms.len()
    ));

    let mut patterns = spots_csv::read_observed_patterns(&args.observed)?;
    if let Some(position) = args.position {
        patterns.retain(|(p, _)| *p == position);
        if patterns.is_empty() {
            return Err(EmStrainError::InvalidArgument(format!(
                "No observed spots for position {}",
                position
            )));
        }
    }
    let total_spots: usize = patterns.iter().map(|(_, p)| p.len()).sum();
    output::print_success(&format!(
        "Loaded {} observed spots at {} positions",
        total_spots,
        patterns.len()
    ));

    let mut model = ForwardModel::new(args.diffraction.calculator(), crystal, args.calibration)?;
    if let Some(start) = args.start {
        *model.parameters_mut() = start;
    }

    let config = FitConfig {
        max_iterations: args.max_iter,
        tolerance: args.tolerance,
        initial_step: args.step,
        objective: ObjectiveSettings {
            detector_radius: args.detector_radius,
            min_relative_intensity: args.min_intensity,
            ..Default::default()
        },
        ..Default::default()
    }
    .with_free_parameters(&args.free)?;

    output::print_info(&format!(
        "Refining {} (λ = {:.5} Å, calibration {} Å⁻¹/px)",
        config.free_names().join(", "),
        model.simulator().wavelength(),
        model.calibration()
    ));

    let results = fitting::fit_map(&model, &patterns, &config, args.jobs)?;

    let mut summary = BatchResult::default();
    let mut fits: Vec<(usize, FitResult)> = Vec::with_capacity(results.len());
    for (position, result) in results {
        match result {
            Ok(fit) => {
                summary.merge(ProcessResult::Success(position.to_string()));
                fits.push((position, fit));
            }
            Err(e) => summary.merge(ProcessResult::Failed(
                format!("position {}", position),
                e.to_string(),
            )),
        }
    }

    output::print_separator();
    output::print_success(&format!(
        "Fit complete: {} success, {} failed",
        summary.success, summary.failed
    ));

    if !summary.failures.is_empty() {
        output::print_warning("Failed positions:");
        for (item, err) in summary.failures.iter().take(10) {
            output::print_error(&format!("  {}: {}", item, err));
        }
        if summary.failures.len() > 10 {
            output::print_warning(&format!("  ... and {} more", summary.failures.len() - 10));
        }
    }

    if fits.is_empty() {
        return Err(EmStrainError::Other(format!(
            "All {} positions failed to fit",
            summary.total()
        )));
    }

    let unconverged = fits.iter().filter(|(_, f)| !f.converged).count();
    if unconverged > 0 {
        output::print_warning(&format!(
            "{} positions hit the iteration limit ({}) before converging",
            unconverged, config.max_iterations
        ));
    }

    if let [(position, fit)] = fits.as_slice() {
        output::print_matrix(
            &format!("Fitted deformation (position {})", position),
            &fit.parameters.matrix(),
        );
    }

    export::fits_to_csv(&fits, &args.output)?;
    output::print_done(&format!("Fit results saved to '{}'", args.output.display()));

    print_fit_table(&fits, args.show);

    Ok(())
}

/// 拟合形变的面内转角：极分解后取 −asin(R[1,0])
fn in_plane_rotation(fit: &FitResult) -> Result<f64> {
    let matrix = DMatrix::from_row_slice(3, 3, fit.parameters.as_array());
    let decomposition = strain::polar_decomposition(&matrix)?;
    strain::rotation_angle(&decomposition.rotation)
}

/// 打印拟合结果表格（面内分量）
fn print_fit_table(fits: &[(usize, FitResult)], count: usize) {
    use tabled::{Table, Tabled};

    #[derive(Tabled)]
    struct FitRow {
        #[tabled(rename = "Position")]
        position: usize,
        #[tabled(rename = "d11")]
        d11: String,
        #[tabled(rename = "d12")]
        d12: String,
        #[tabled(rename = "d21")]
        d21: String,
        #[tabled(rename = "d22")]
        d22: String,
        #[tabled(rename = "θ (mrad)")]
        theta: String,
        #[tabled(rename = "Cost (px²)")]
        cost: String,
        #[tabled(rename = "Iter")]
        iterations: usize,
        #[tabled(rename = "Conv")]
        converged: String,
    }

    let rows: Vec<FitRow> = fits
        .iter()
        .take(count)
        .map(|(position, fit)| {
            let d = fit.parameters.as_array();
            FitRow {
                position: *position,
                d11: format!("{:.5}", d[0]),
                d12: format!("{:.5}", d[1]),
                d21: format!("{:.5}", d[3]),
                d22: format!("{:.5}", d[4]),
                theta: in_plane_rotation(fit)
                    .map(|t| format!("{:.3}", t * 1e3))
                    .unwrap_or_else(|_| "-".to_string()),
                cost: format!("{:.3e}", fit.cost),
                iterations: fit.iterations,
                converged: if fit.converged { "yes" } else { "no" }.to_string(),
            }
        })
        .collect();

    if !rows.is_empty() {
        output::print_header(&format!("Fitted Deformations ({} of {})", rows.len(), fits.len()));
        println!("{}", Table::new(&rows));
    }
}
