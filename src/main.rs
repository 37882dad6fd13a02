//! # emstrain - 电子显微应变分析与衍射正向模型拟合
//!
//! 将应变图分析与衍射图样拟合统一成单一可执行文件。
//!
//! ## 子命令
//! - `strain`   - 位移梯度张量场极分解，导出 (e11, e22, e12, theta) 应变图
//! - `simulate` - 形变结构的运动学电子衍射模拟
//! - `fit`      - 逐位置拟合 9 个形变参数 d11..d33
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── parsers/     (结构、张量场、观测斑点读取)
//!   │     ├── strain/      (极分解与应变图)
//!   │     ├── fitting/     (正向模型与拟合循环)
//!   │     ├── diffraction/ (电子衍射模拟、绘图、导出)
//!   │     └── models/      (数据模型)
//!   ├── batch/      (并行批处理)
//!   ├── utils/      (工具函数)
//!   └── error.rs    (错误处理)
//! ```

mod batch;
mod cli;
mod commands;
mod diffraction;
mod error;
mod fitting;
mod models;
mod parsers;
mod strain;
mod utils;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
