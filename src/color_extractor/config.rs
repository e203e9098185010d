//! # 配置模块
//!
//! ## 设计思路
//!
//! 将取色算法的全部数值参数与资源限制集中到 `ExtractorConfig`，
//! 默认值与浏览器端取色结果保持一致（200 边长、每 4 像素采样、量化步长 10、
//! 区分阈值 60、调色板 5 色），修改默认值会改变同一图片的输出。
//!
//! ## 实现思路
//!
//! - `Default` 提供与参考行为一致的参数组合。
//! - `#[serde(default)]` 允许 JSON 配置只覆盖部分字段。
//! - `validate` 在构造提取器与切换配置时统一做范围校验。
//! - 网络超时默认关闭，由调用方自行决定是否设置。

use std::path::Path;

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use super::ExtractError;

/// 调色板颜色数上限，输出永远不超过 5 色。
const MAX_PALETTE_SIZE: usize = 5;

/// 降采样滤镜。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeFilter {
    Nearest,
    Bilinear,
    CatmullRom,
    Lanczos3,
}

impl ResizeFilter {
    /// 映射为 `image` 的滤镜，用于 fast_image_resize 失败时的回退路径。
    pub(crate) fn to_image_filter(self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Bilinear => FilterType::Triangle,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }

    pub(crate) fn to_fast_filter(self) -> fast_image_resize::FilterType {
        match self {
            Self::Nearest => fast_image_resize::FilterType::Box,
            Self::Bilinear => fast_image_resize::FilterType::Bilinear,
            Self::CatmullRom => fast_image_resize::FilterType::CatmullRom,
            Self::Lanczos3 => fast_image_resize::FilterType::Lanczos3,
        }
    }
}

/// 取色配置。
///
/// 字段覆盖加载、解码、降采样与取色四个阶段。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// 工作分辨率长边上限（像素）。
    pub max_dimension: u32,
    /// 采样步长：每隔多少个像素取一个样本。
    pub sample_stride: usize,
    /// 低于该 alpha 的像素视为透明并跳过。
    pub min_alpha: u8,
    /// 三通道均大于该值视为近白色背景。
    pub near_white_floor: u8,
    /// 三通道均小于该值视为近黑色背景。
    pub near_black_ceiling: u8,
    /// 量化步长，通道值四舍五入到该值的倍数（上限 255）。
    pub quantize_step: u8,
    /// 贪心选色时两色之间必须超过的 RGB 欧氏距离。
    pub distinct_threshold: f64,
    /// 调色板目标颜色数。
    pub palette_size: usize,
    /// 降采样滤镜。
    pub resize_filter: ResizeFilter,
    /// 读取原始字节时允许的最大体积（字节）。
    pub max_file_size: u64,
    /// 解码后像素上限（`width * height`）。
    ///
    /// 完整解码发生在降采样之前，RGBA 缓冲区占用 `4 * 像素数` 字节，
    /// 默认 4000 万像素约 160 MB；超过上限的图片按 `ImageLoad` 拒绝。
    pub max_decoded_pixels: u64,
    /// 最大重定向次数。
    pub max_redirects: usize,
    /// 整体下载超时（秒），`None` 表示不设置。
    pub download_timeout_secs: Option<u64>,
    /// 建立连接超时（秒），`None` 表示不设置。
    pub connect_timeout_secs: Option<u64>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_dimension: 200,
            sample_stride: 4,
            min_alpha: 128,
            near_white_floor: 240,
            near_black_ceiling: 15,
            quantize_step: 10,
            distinct_threshold: 60.0,
            palette_size: 5,
            resize_filter: ResizeFilter::Bilinear,
            max_file_size: 50 * 1024 * 1024,
            max_decoded_pixels: 40_000_000,
            max_redirects: 5,
            download_timeout_secs: None,
            connect_timeout_secs: None,
        }
    }
}

impl ExtractorConfig {
    /// 从 JSON 文件加载配置，缺省字段使用默认值，加载后立即校验。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use colorwave_palette::color_extractor::ExtractorConfig;
    /// use std::path::Path;
    ///
    /// let config = ExtractorConfig::from_json_file(Path::new("palette.json"))?;
    /// # Ok::<(), colorwave_palette::color_extractor::ExtractError>(())
    /// ```
    pub fn from_json_file(path: &Path) -> Result<Self, ExtractError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ExtractError::InvalidConfig(format!("无法读取配置文件 {}：{}", path.display(), e))
        })?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ExtractError> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| ExtractError::InvalidConfig(format!("配置解析失败：{}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// 校验参数范围。
    pub fn validate(&self) -> Result<(), ExtractError> {
        if self.max_dimension == 0 {
            return Err(ExtractError::InvalidConfig("max_dimension 必须大于 0".to_string()));
        }
        if self.sample_stride == 0 {
            return Err(ExtractError::InvalidConfig("sample_stride 必须大于 0".to_string()));
        }
        if self.quantize_step == 0 {
            return Err(ExtractError::InvalidConfig("quantize_step 必须大于 0".to_string()));
        }
        if !(1..=MAX_PALETTE_SIZE).contains(&self.palette_size) {
            return Err(ExtractError::InvalidConfig(format!(
                "palette_size 必须在 1~{} 之间",
                MAX_PALETTE_SIZE
            )));
        }
        if !self.distinct_threshold.is_finite() || self.distinct_threshold < 0.0 {
            return Err(ExtractError::InvalidConfig(
                "distinct_threshold 必须是非负有限数".to_string(),
            ));
        }
        if self.max_file_size == 0 || self.max_decoded_pixels == 0 {
            return Err(ExtractError::InvalidConfig(
                "max_file_size 与 max_decoded_pixels 必须大于 0".to_string(),
            ));
        }
        if matches!(self.download_timeout_secs, Some(0))
            || matches!(self.connect_timeout_secs, Some(0))
        {
            return Err(ExtractError::InvalidConfig("超时时间必须大于 0 秒".to_string()));
        }

        Ok(())
    }
}
