//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将"外部输入类型"和"流水线中间结果"解耦：
//! - `ImageSource` / `UploadedFile` 表示调用方提供的来源
//! - `RawImageData` 表示已加载但未解码的字节
//! - `RasterImage` 表示可直接扫描的 RGBA 像素缓冲区
//!
//! `RasterImage` 是解码与取色之间的窄接口：测试可直接构造合成像素，
//! 无需真实解码器。

use std::path::Path;

use bytes::Bytes;

use super::ExtractError;

const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

/// 图片输入来源。
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// URL 来源（http/https/data/blob/file）。
    Url(String),
    /// 上传的文件。
    File(UploadedFile),
}

/// 上传文件：文件名、声明的媒体类型与内容字节。
///
/// 媒体类型是"声明值"，与浏览器 `File.type` 一致，不代表内容一定可解码。
#[derive(Debug, Clone)]
pub struct UploadedFile {
    name: String,
    media_type: String,
    bytes: Bytes,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes: bytes.into(),
        }
    }

    /// 从本地路径读取文件。
    ///
    /// 媒体类型优先按扩展名推断；扩展名未知时按文件签名嗅探；
    /// 仍无法识别则声明为 `application/octet-stream`。
    pub fn from_path(path: &Path) -> Result<Self, ExtractError> {
        let bytes = std::fs::read(path).map_err(|e| {
            ExtractError::ImageLoad(format!("无法读取文件 {}：{}", path.display(), e))
        })?;

        let media_type = Self::declared_media_type(path, &bytes);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        log::debug!("📁 读取本地文件 - {} ({}, {} bytes)", name, media_type, bytes.len());

        Ok(Self::new(name, media_type, bytes))
    }

    fn declared_media_type(path: &Path, bytes: &[u8]) -> String {
        if let Ok(format) = image::ImageFormat::from_path(path) {
            return format.to_mime_type().to_string();
        }

        infer::get(bytes)
            .map(|kind| kind.mime_type().to_string())
            .unwrap_or_else(|| FALLBACK_MEDIA_TYPE.to_string())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// 声明的媒体类型是否为图片（`image/*`，忽略参数与大小写）。
    pub fn is_image(&self) -> bool {
        self.media_type
            .split(';')
            .next()
            .map(|base| base.trim().to_ascii_lowercase().starts_with("image/"))
            .unwrap_or(false)
    }
}

/// 加载阶段输出：原始字节与来源标识。
pub(crate) struct RawImageData {
    /// 原始图片字节。
    pub(crate) bytes: Bytes,
    /// 来源提示（用于日志与诊断）。
    pub(crate) source_hint: &'static str,
}

/// RGBA 像素缓冲区，每通道 1 字节，行优先。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RasterImage {
    /// 构造像素缓冲区，要求 `pixels.len() == width * height * 4`。
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, ExtractError> {
        let expected_len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|count| count.checked_mul(4))
            .ok_or_else(|| ExtractError::Raster("像素缓冲区尺寸溢出".to_string()))?;

        if pixels.len() != expected_len {
            return Err(ExtractError::Raster(format!(
                "像素数据长度异常：{}（期望 {}）",
                pixels.len(),
                expected_len
            )));
        }

        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// 用单一颜色填充的缓冲区。
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self::from_fn(width, height, |_, _| rgba)
    }

    /// 逐像素生成缓冲区，`f(x, y)` 返回 RGBA。
    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> [u8; 4],
    {
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
        for y in 0..height {
            for x in 0..width {
                pixels.extend_from_slice(&f(x, y));
            }
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel_count(&self) -> usize {
        self.pixels.len() / 4
    }
}
