//! # Colorwave 主色提取 · 命令行入口
//!
//! 本文件仅负责日志初始化、运行时创建与退出码。
//! 参数解析与输出格式见 `cli` 模块。

use std::process::ExitCode;

use clap::Parser;
use colorwave_palette::cli::{self, Cli};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match Cli::try_parse() {
        Ok(args) => args,
        Err(err) => {
            // 帮助信息退出码为 0，参数错误为 2
            let _ = err.print();
            return ExitCode::from(u8::try_from(err.exit_code()).unwrap_or(2));
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            log::error!("创建 tokio 运行时失败: {err}");
            return ExitCode::FAILURE;
        }
    };

    let reports = match runtime.block_on(cli::run(&args)) {
        Ok(reports) => reports,
        Err(err) => {
            log::error!("初始化失败 [{}]: {err}", err.code());
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    if args.json {
        match cli::render_json(&reports) {
            Ok(json) => println!("{json}"),
            Err(err) => {
                eprintln!("{err}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("{}", cli::render_plain(&reports));
    }

    if reports.iter().any(cli::SourceReport::is_failure) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
