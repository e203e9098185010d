//! # Colorwave 主色提取 · 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 前端 (命令行 / 宿主应用)                  │
//! │                                                          │
//! │  cli ── clap 参数解析 ── 并发提取 ── 文本 / JSON 输出    │
//! │       │  (统一错误处理: AppError)                        │
//! └───────┼──────────────────────────────────────────────────┘
//!         ↕ Result<Vec<String>, ExtractError>
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕            取色核心                              │
//! │                                                          │
//! │  ┌─ color_extractor                                      │
//! │  │   ├─ handler     ColorExtractor 编排 + 阶段耗时       │
//! │  │   ├─ loader      data / blob / http(s) / file 加载    │
//! │  │   ├─ object_url  临时对象 URL (RAII)                  │
//! │  │   ├─ pipeline    解码·像素限制·降采样                  │
//! │  │   └─ palette     采样·量化·频次·区分度挑选 (纯函数)   │
//! │  │                                                       │
//! │  └─ error ────── AppError (前端统一错误类型)              │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 前端统一错误类型 `AppError`，可序列化为字符串 |
//! | [`color_extractor`] | 从 URL 或上传文件提取最多 5 个主色 |
//! | [`cli`] | 命令行参数解析（clap）、并发提取与结果输出 |

pub mod cli;
pub mod color_extractor;
pub mod error;
