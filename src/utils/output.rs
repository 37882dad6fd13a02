//! # 美化输出工具
//!
//! 提供统一的终端输出样式。
//!
//! ## 依赖关系
//! - 被所有 `commands/` 模块使用
//! - 使用 `colored` crate

use colored::Colorize;
use nalgebra::Matrix3;

/// 打印成功消息
pub fn print_success(msg: &str) {
    println!("{} {}", "[OK]".green().bold(), msg);
}

/// 打印错误消息
pub fn print_error(msg: &str) {
    eprintln!("{} {}", "[ERR]".red().bold(), msg);
}

/// 打印警告消息
pub fn print_warning(msg: &str) {
    println!("{} {}", "[WARN]".yellow().bold(), msg);
}

/// 打印信息消息
pub fn print_info(msg: &str) {
    println!("{} {}", "[*]".blue().bold(), msg);
}

/// 打印完成消息
pub fn print_done(msg: &str) {
    println!("{} {}", "[DONE]".green().bold(), msg);
}

/// 打印标题栏
pub fn print_header(title: &str) {
    let line = "─".repeat(60);
    println!("\n{}", line.dimmed());
    println!("  {}", title.bold());
    println!("{}\n", line.dimmed());
}

/// 打印分隔线
pub fn print_separator() {
    println!("{}", "─".repeat(60).dimmed());
}

/// 打印 3×3 矩阵，偏离单位矩阵的元素高亮
pub fn print_matrix(label: &str, m: &Matrix3<f64>) {
    println!("  {}", label.bold());
    for i in 0..3 {
        let row: Vec<String> = (0..3)
            .map(|j| {
                let text = format!("{:>11.6}", m[(i, j)]);
                let identity = if i == j { 1.0 } else { 0.0 };
                if (m[(i, j)] - identity).abs() > 1e-9 {
                    text.cyan().to_string()
                } else {
                    text
                }
            })
            .collect();
        println!("    [{} ]", row.join(""));
    }
}
