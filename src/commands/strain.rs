//! # strain 子命令实现
//!
//! 读取张量场，逐位置极分解，导出 (e11, e22, e12, theta) 应变场。
//!
//! ## 依赖关系
//! - 使用 `cli/strain.rs` 定义的 StrainArgs
//! - 使用 `parsers/tensor_csv.rs` 读取张量场
//! - 使用 `strain/` 模块计算与导出
//! - 使用 `diffraction/plot.rs` 绘制应变图

use crate::cli::strain::StrainArgs;
use crate::diffraction::plot;
use crate::error::Result;
use crate::models::{StrainChannel, StrainField, TensorField};
use crate::parsers::tensor_csv;
use crate::strain::{self, export};
use crate::utils::{output, progress};

use std::path::Path;

/// 执行应变分析
pub fn execute(args: StrainArgs) -> Result<()> {
    output::print_header("Strain Field Analysis");

    let field = tensor_csv::read_tensor_field(&args.input)?;
    output::print_success(&format!(
        "Loaded {} tensors ({}x{}, navigation shape {:?})",
        field.len(),
        field.rank(),
        field.rank(),
        field.nav_shape()
    ));

    let spinner = progress::create_spinner("Polar decomposition");
    let strain_field = if args.save_rotation.is_some() || args.save_stretch.is_some() {
        decompose_and_save(&field, &args)
    } else {
        strain::strain_summary(&field)
    };
    spinner.finish_and_clear();
    let strain_field = strain_field?;

    output::print_success(&format!(
        "Decomposed {} positions into rotation and stretch",
        strain_field.len()
    ));

    export::strain_to_csv(&strain_field, &args.output)?;
    output::print_success(&format!("Strain field saved to '{}'", args.output.display()));

    for (name, path) in [("Rotation", &args.save_rotation), ("Stretch", &args.save_stretch)] {
        if let Some(path) = path {
            output::print_success(&format!("{} field saved to '{}'", name, path.display()));
        }
    }

    if let Some(path) = &args.maps {
        if strain_field.nav_shape().len() == 2 {
            plot::generate_strain_maps(&strain_field, path, args.width, args.height, is_svg(path))?;
            output::print_success(&format!("Strain maps saved to '{}'", path.display()));
        } else {
            output::print_warning(&format!(
                "Strain maps need a 2D navigation shape, got {:?}; skipping plot",
                strain_field.nav_shape()
            ));
        }
    }

    print_channel_table(&strain_field);

    Ok(())
}

/// 分解并保存 R/U 场，再计算应变
fn decompose_and_save(field: &TensorField, args: &StrainArgs) -> Result<StrainField> {
    let (rotation, stretch) = strain::decompose(field)?;

    if let Some(path) = &args.save_rotation {
        export::tensor_field_to_csv(&rotation, path)?;
    }
    if let Some(path) = &args.save_stretch {
        export::tensor_field_to_csv(&stretch, path)?;
    }

    strain::strain_from_decomposition(&rotation, &stretch)
}

fn is_svg(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("svg"))
}

/// 打印各通道统计
fn print_channel_table(field: &StrainField) {
    use tabled::{Table, Tabled};

    #[derive(Tabled)]
    struct ChannelRow {
        #[tabled(rename = "Channel")]
        channel: String,
        #[tabled(rename = "Min")]
        min: String,
        #[tabled(rename = "Max")]
        max: String,
        #[tabled(rename = "Mean")]
        mean: String,
    }

    let rows: Vec<ChannelRow> = StrainChannel::ALL
        .iter()
        .map(|&channel| {
            let values = field.channel(channel);
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let mean = values.iter().sum::<f64>() / values.len().max(1) as f64;
            ChannelRow {
                channel: channel.to_string(),
                min: format!("{:.3e}", min),
                max: format!("{:.3e}", max),
                mean: format!("{:.3e}", mean),
            }
        })
        .collect();

    output::print_header("Strain Channels");
    println!("{}", Table::new(&rows));
}
