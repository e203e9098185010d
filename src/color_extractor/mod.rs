//! # 主色提取模块（color_extractor）
//!
//! ## 设计思路
//!
//! 该模块将"图片来源识别 → 加载校验 → 解码缩放 → 采样量化 → 区分度挑选"
//! 按职责拆分为多个子模块，避免单文件膨胀与耦合。
//!
//! - `handler`：`ColorExtractor` 编排整条处理流水线
//! - `loader`：负责 data/blob/http(s)/file URL 加载与体积校验
//! - `object_url`：文件取色用的临时对象 URL（RAII 撤销）
//! - `pipeline`：负责解码、像素限制、降采样到有界工作分辨率
//! - `palette`：纯算法，采样、量化、频次统计、贪心挑选
//! - `config/error/source`：配置、错误、中间数据模型
//!
//! ## 实现思路
//!
//! 对外仅暴露必要类型，I/O 细节保持 `mod` 私有。
//! `palette` 不做任何 I/O 与日志，可以直接对 `RasterImage` 调用，便于测试。
//!
//! ## 新同事快速上手
//!
//! 可以按下面顺序理解调用链：
//!
//! ```text
//! extract_from_file（类型检查 → ObjectUrl 守卫）
//!    ↓
//! extract_from_url（配置快照 + 阶段耗时日志）
//!    ├─ loader.rs（来源加载 + 体积安全校验）
//!    ├─ pipeline.rs（解码 + 像素限制 + 降采样）
//!    └─ palette.rs（采样 + 量化 + 挑选）
//!    ↓
//! Vec<String>（#rrggbb，最具代表性的在前）
//! ```
//!
//! ## 分层职责建议
//!
//! - 阈值与步长变更优先改 `config.rs` 的默认值
//! - 取色规则变更优先改 `palette.rs`
//! - 新的 URL 协议优先改 `loader.rs`

mod config;
mod error;
mod handler;
mod loader;
mod object_url;
pub mod palette;
mod pipeline;
mod source;

pub use config::{ExtractorConfig, ResizeFilter};
pub use error::ExtractError;
pub use handler::{ColorExtractor, ResultPalette};
pub use palette::PaletteSelection;
pub use pipeline::working_dimensions;
pub use source::{ImageSource, RasterImage, UploadedFile};
