//! # 图表生成
//!
//! 使用 `plotters` 生成衍射斑点图与应变图。
//!
//! ## 功能
//! - 斑点图：面积正比于强度，可选 hkl 标注，中心标出直射束
//! - 应变图：(e11, e22, e12, theta) 四幅热图，蓝-白-红对称色标
//! - 支持 PNG 和 SVG 输出
//!
//! ## 依赖关系
//! - 被 `commands/simulate.rs`, `commands/strain.rs` 调用
//! - 使用 `diffraction/simulation.rs`, `models/tensor_field.rs`
//! - 使用 `plotters` 渲染图表

use crate::diffraction::DiffractionSimulation;
use crate::error::{EmStrainError, Result};
use crate::models::{StrainChannel, StrainField};

use plotters::prelude::*;
use std::path::Path;

fn plot_err<E: std::fmt::Debug>(e: E) -> EmStrainError {
    EmStrainError::Other(format!("Plotting failed: {:?}", e))
}

/// 生成衍射斑点图
#[allow(clippy::too_many_arguments)]
pub fn generate_pattern_plot(
    simulation: &DiffractionSimulation,
    output_path: &Path,
    title: &str,
    width: u32,
    height: u32,
    label_count: usize,
    use_svg: bool,
) -> Result<()> {
    if use_svg {
        let root = SVGBackend::new(output_path, (width, height)).into_drawing_area();
        draw_pattern(&root, simulation, title, label_count)?;
        root.present().map_err(plot_err)?;
    } else {
        let root = BitMapBackend::new(output_path, (width, height)).into_drawing_area();
        draw_pattern(&root, simulation, title, label_count)?;
        root.present().map_err(plot_err)?;
    }
    Ok(())
}

/// 绘制斑点图的核心逻辑
fn draw_pattern<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    simulation: &DiffractionSimulation,
    title: &str,
    label_count: usize,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).map_err(plot_err)?;

    // 有标定时用像素坐标，否则用倒空间坐标
    let (points, unit): (Vec<[f64; 2]>, &str) = match simulation.calibration {
        Some(_) => (simulation.calibrated_coordinates()?, "px"),
        None => (
            simulation
                .spots
                .iter()
                .map(|s| [s.coordinates[0], s.coordinates[1]])
                .collect(),
            "Å⁻¹",
        ),
    };

    let extent = points
        .iter()
        .map(|p| p[0].abs().max(p[1].abs()))
        .fold(0.0_f64, f64::max)
        .max(1e-6)
        * 1.1;

    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 28).into_font())
        .margin(30)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(-extent..extent, -extent..extent)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(format!("x ({})", unit))
        .y_desc(format!("y ({})", unit))
        .x_label_style(("sans-serif", 16))
        .y_label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 18))
        .draw()
        .map_err(plot_err)?;

    let intensities = simulation.normalized_intensities();
    let spot_color = RGBColor(0, 102, 204);

    chart
        .draw_series(points.iter().zip(&intensities).map(|(p, i)| {
            let radius = (2.0 + 10.0 * (i / 100.0).sqrt()) as i32;
            Circle::new((p[0], p[1]), radius, spot_color.mix(0.8).filled())
        }))
        .map_err(plot_err)?;

    // 直射束
    chart
        .draw_series(std::iter::once(Cross::new(
            (0.0, 0.0),
            6,
            BLACK.stroke_width(2),
        )))
        .map_err(plot_err)?;

    let text_style = ("sans-serif", 12).into_font().color(&BLACK);
    for (spot, p) in simulation.spots.iter().zip(&points).take(label_count) {
        let [h, k, l] = spot.indices;
        chart
            .draw_series(std::iter::once(Text::new(
                format!("({} {} {})", h, k, l),
                (p[0], p[1] + extent * 0.03),
                text_style.clone(),
            )))
            .map_err(plot_err)?;
    }

    Ok(())
}

/// 生成应变图（四幅热图，仅支持二维导航形状）
pub fn generate_strain_maps(
    field: &StrainField,
    output_path: &Path,
    width: u32,
    height: u32,
    use_svg: bool,
) -> Result<()> {
    if field.nav_shape().len() != 2 {
        return Err(EmStrainError::ShapeError(format!(
            "Strain maps need a 2D navigation shape, got {:?}",
            field.nav_shape()
        )));
    }

    if use_svg {
        let root = SVGBackend::new(output_path, (width, height)).into_drawing_area();
        draw_strain_maps(&root, field)?;
        root.present().map_err(plot_err)?;
    } else {
        let root = BitMapBackend::new(output_path, (width, height)).into_drawing_area();
        draw_strain_maps(&root, field)?;
        root.present().map_err(plot_err)?;
    }
    Ok(())
}

fn draw_strain_maps<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    field: &StrainField,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).map_err(plot_err)?;

    let (rows, cols) = (field.nav_shape()[0], field.nav_shape()[1]);
    let panels = root.split_evenly((2, 2));

    for (panel, channel) in panels.iter().zip(StrainChannel::ALL) {
        let values = field.channel(channel);
        let scale = values.iter().fold(0.0_f64, |m, v| m.max(v.abs())).max(1e-12);

        let mut chart = ChartBuilder::on(panel)
            .caption(
                format!("{} (±{:.2e})", channel, scale),
                ("sans-serif", 20).into_font(),
            )
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(40)
            .build_cartesian_2d(0..cols, 0..rows)
            .map_err(plot_err)?;

        chart
            .configure_mesh()
            .disable_mesh()
            .draw()
            .map_err(plot_err)?;

        chart
            .draw_series(values.iter().enumerate().map(|(position, v)| {
                let (y, x) = (position / cols, position % cols);
                // 行 0 画在顶部
                let top = rows - y;
                Rectangle::new([(x, top - 1), (x + 1, top)], diverging(v / scale).filled())
            }))
            .map_err(plot_err)?;
    }

    Ok(())
}

/// 蓝-白-红色标，t ∈ [-1, 1]
fn diverging(t: f64) -> RGBColor {
    let t = t.clamp(-1.0, 1.0);
    let fade = |full: u8| (255.0 - (255.0 - full as f64) * t.abs()).round() as u8;
    if t < 0.0 {
        RGBColor(fade(33), fade(102), 255)
    } else {
        RGBColor(255, fade(64), fade(33))
    }
}
