//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `ColorExtractor` 只负责流程编排与配置管理，处理链路固定为：
//! 1. 读取配置快照
//! 2. 按来源加载原始字节
//! 3. 解码并光栅化为有界分辨率的 RGBA
//! 4. 取色
//!
//! ## 实现思路
//!
//! - 配置通过 `Arc<RwLock<ExtractorConfig>>` 支持运行时切换。
//! - 单次调用内使用"同一配置快照"，避免处理中途配置漂移。
//! - 解码与取色是 CPU 密集操作，放到 `spawn_blocking` 执行，多个调用互不阻塞。
//! - 文件取色通过 `ObjectUrl` 守卫复用 URL 链路，守卫离开作用域即撤销。
//! - 记录 `load/decode/extract/total` 阶段耗时，便于性能诊断。

use std::sync::{Arc, RwLock};
use std::time::Instant;

use super::object_url::BlobRegistry;
use super::palette::{self, PaletteSelection};
use super::source::{ImageSource, RasterImage, UploadedFile};
use super::{ExtractError, ExtractorConfig};

/// 调色板：最具代表性的颜色在前，每项为 `#rrggbb`。
pub type ResultPalette = Vec<String>;

/// 取色器。
///
/// 不在调用之间缓存任何像素或频次数据，可以放进 `Arc` 在多个任务间共享。
pub struct ColorExtractor {
    pub(super) config: Arc<RwLock<ExtractorConfig>>,
    pub(super) blobs: Arc<BlobRegistry>,
}

impl ColorExtractor {
    /// 根据初始配置创建取色器，配置不合法时返回 `InvalidConfig`。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use colorwave_palette::color_extractor::{ColorExtractor, ExtractorConfig};
    ///
    /// # async fn demo() -> Result<(), colorwave_palette::color_extractor::ExtractError> {
    /// let extractor = ColorExtractor::new(ExtractorConfig::default())?;
    /// let palette = extractor.extract_from_url("https://example.com/logo.png").await?;
    /// assert!(palette.len() <= 5);
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(config: ExtractorConfig) -> Result<Self, ExtractError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            blobs: Arc::new(BlobRegistry::new()),
        })
    }

    /// 获取配置快照。
    pub fn config_snapshot(&self) -> Result<ExtractorConfig, ExtractError> {
        self.config
            .read()
            .map(|cfg| cfg.clone())
            .map_err(|_| ExtractError::InvalidConfig("配置读取锁已中毒".to_string()))
    }

    /// 替换配置，校验失败时保持原配置不变。
    pub fn set_config(&self, config: ExtractorConfig) -> Result<(), ExtractError> {
        config.validate()?;

        let mut current = self
            .config
            .write()
            .map_err(|_| ExtractError::InvalidConfig("配置写入锁已中毒".to_string()))?;

        log::info!(
            "⚙️ 已切换取色配置（max_dimension={}, stride={}, step={}, threshold={}, size={}）",
            config.max_dimension,
            config.sample_stride,
            config.quantize_step,
            config.distinct_threshold,
            config.palette_size
        );
        *current = config;

        Ok(())
    }

    /// 当前存活的临时对象 URL 数量，调用结束后应为 0。
    pub fn active_object_urls(&self) -> usize {
        self.blobs.len()
    }

    /// 按来源分派。
    pub async fn extract(&self, source: &ImageSource) -> Result<ResultPalette, ExtractError> {
        match source {
            ImageSource::Url(url) => self.extract_from_url(url).await,
            ImageSource::File(file) => self.extract_from_file(file).await,
        }
    }

    /// 从 URL 提取调色板。
    pub async fn extract_from_url(&self, url: &str) -> Result<ResultPalette, ExtractError> {
        let selection = self.extract_selection_from_url(url).await?;
        Ok(selection.colors)
    }

    /// 从 URL 提取调色板，并返回区分度与采样统计。
    pub async fn extract_selection_from_url(&self, url: &str) -> Result<PaletteSelection, ExtractError> {
        let config = self.config_snapshot()?;
        let total_start = Instant::now();

        let load_start = Instant::now();
        let raw = self.load_from_url(url, &config).await?;
        let load_elapsed = load_start.elapsed();

        let (selection, decode_elapsed, extract_elapsed) = tokio::task::spawn_blocking(move || {
            let decode_start = Instant::now();
            let raster = Self::decode_and_rasterize(&raw, &config)?;
            let decode_elapsed = decode_start.elapsed();

            let extract_start = Instant::now();
            let selection = palette::extract_palette(&raster, &config);
            Ok::<_, ExtractError>((selection, decode_elapsed, extract_start.elapsed()))
        })
        .await
        .map_err(|e| ExtractError::Raster(format!("解码线程执行失败：{}", e)))??;

        log::info!(
            "🎨 取色完成 - colors={:?} distinct={} backfilled={} sampled={} buckets={}",
            selection.colors,
            selection.distinct_count,
            selection.backfilled(),
            selection.summary.sampled,
            selection.summary.buckets
        );
        log::info!(
            "✅ 图片处理完成 - load={}ms decode={}ms extract={}ms total={}ms",
            load_elapsed.as_millis(),
            decode_elapsed.as_millis(),
            extract_elapsed.as_millis(),
            total_start.elapsed().as_millis()
        );

        Ok(selection)
    }

    /// 从上传文件提取调色板。
    ///
    /// 声明的媒体类型不是图片时直接返回 `InvalidFileType`，不尝试解码。
    /// 临时对象 URL 在任何返回路径上都会被撤销。
    pub async fn extract_from_file(&self, file: &UploadedFile) -> Result<ResultPalette, ExtractError> {
        if !file.is_image() {
            let declared = if file.media_type().is_empty() {
                "<未声明>"
            } else {
                file.media_type()
            };
            return Err(ExtractError::InvalidFileType(format!(
                "{} 的类型为 {}，需要 image/*",
                file.name(),
                declared
            )));
        }

        let object_url = BlobRegistry::create_object_url(&self.blobs, file.bytes().clone());
        log::info!("📎 文件取色 - {} ({}, {} bytes)", file.name(), file.media_type(), file.bytes().len());

        self.extract_from_url(object_url.as_str()).await
    }

    /// 对已光栅化的像素缓冲区直接取色（跳过加载与解码）。
    pub fn extract_from_raster(&self, raster: &RasterImage) -> Result<PaletteSelection, ExtractError> {
        let config = self.config_snapshot()?;
        Ok(palette::extract_palette(raster, &config))
    }
}
