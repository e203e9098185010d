//! # 解码与光栅化流水线模块
//!
//! ## 设计思路
//!
//! 将"字节 → 图像 → 有界工作分辨率 → RGBA"的过程集中管理。
//! 先读 header 尺寸做像素上限检查，再完整解码，避免超大图片占满内存。
//!
//! ## 实现思路
//!
//! 1. 猜测格式并读取 header 尺寸
//! 2. 按像素上限快速拒绝
//! 3. 完整解码
//! 4. 长边超过上限时按比例缩小（向下取整，至少 1 像素），未超过则保持原始像素
//! 5. 转换 RGBA，并校验字节长度一致性

use std::io::Cursor;

use fast_image_resize as fr;
use image::{DynamicImage, GenericImageView, ImageBuffer, Rgba};

use super::source::{RasterImage, RawImageData};
use super::{ColorExtractor, ExtractError, ExtractorConfig, ResizeFilter};

impl ColorExtractor {
    /// 将原始字节解码为有界分辨率的 RGBA 像素缓冲区。
    pub(crate) fn decode_and_rasterize(
        raw: &RawImageData,
        config: &ExtractorConfig,
    ) -> Result<RasterImage, ExtractError> {
        let (header_width, header_height) = Self::inspect_dimensions_from_memory(&raw.bytes)?;
        Self::validate_pixel_limits(config, header_width, header_height)?;

        let decoded = image::load_from_memory(&raw.bytes)
            .map_err(|e| ExtractError::ImageLoad(format!("图片解码失败：{}", e)))?;

        let (raw_width, raw_height) = decoded.dimensions();
        if raw_width == 0 || raw_height == 0 {
            return Err(ExtractError::Raster(format!(
                "无法为 {}x{} 的图片创建像素缓冲区",
                raw_width, raw_height
            )));
        }
        Self::validate_pixel_limits(config, raw_width, raw_height)?;

        let (width, height) = working_dimensions(raw_width, raw_height, config.max_dimension);
        let scaled = if (width, height) == (raw_width, raw_height) {
            decoded
        } else {
            Self::downscale(&decoded, width, height, config.resize_filter)
        };

        let rgba = scaled.to_rgba8();
        let (out_width, out_height) = rgba.dimensions();
        let raster = RasterImage::new(out_width, out_height, rgba.into_raw())?;

        log::info!(
            "✅ 图片解码成功 - 来源: {} 原始尺寸: {}x{} 工作尺寸: {}x{}",
            raw.source_hint,
            raw_width,
            raw_height,
            out_width,
            out_height
        );

        Ok(raster)
    }

    /// 仅通过图片头信息读取宽高。
    fn inspect_dimensions_from_memory(bytes: &[u8]) -> Result<(u32, u32), ExtractError> {
        let reader = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| ExtractError::ImageLoad(format!("无法识别图片格式：{}", e)))?;

        if reader.format().is_none() {
            return Err(ExtractError::ImageLoad("无法识别图片格式".to_string()));
        }

        reader
            .into_dimensions()
            .map_err(|e| ExtractError::ImageLoad(format!("无法读取图片尺寸：{}", e)))
    }

    fn validate_pixel_limits(
        config: &ExtractorConfig,
        width: u32,
        height: u32,
    ) -> Result<(), ExtractError> {
        let pixels = u64::from(width) * u64::from(height);

        if pixels > config.max_decoded_pixels {
            return Err(ExtractError::ImageLoad(format!(
                "图片像素过大：{} 像素（限制：{} 像素）",
                pixels, config.max_decoded_pixels
            )));
        }

        Ok(())
    }

    fn downscale(image: &DynamicImage, width: u32, height: u32, filter: ResizeFilter) -> DynamicImage {
        log::debug!(
            "🧩 降采样：{}x{} -> {}x{}（filter={:?}）",
            image.width(),
            image.height(),
            width,
            height,
            filter
        );

        match Self::resize_with_fast_image_resize(image, width, height, filter) {
            Ok(resized) => resized,
            Err(err) => {
                log::warn!("⚠️ fast_image_resize 降采样失败，回退 image::resize_exact：{}", err);
                image.resize_exact(width, height, filter.to_image_filter())
            }
        }
    }

    fn resize_with_fast_image_resize(
        image: &DynamicImage,
        target_width: u32,
        target_height: u32,
        filter: ResizeFilter,
    ) -> Result<DynamicImage, ExtractError> {
        let src = image.to_rgba8();
        let (src_width, src_height) = src.dimensions();

        let src_image = fr::images::Image::from_vec_u8(
            src_width,
            src_height,
            src.into_raw(),
            fr::PixelType::U8x4,
        )
        .map_err(|e| ExtractError::Raster(format!("构建源图像缓冲失败：{}", e)))?;

        let mut dst_image = fr::images::Image::new(target_width, target_height, fr::PixelType::U8x4);

        let mut resizer = fr::Resizer::new();
        let options =
            fr::ResizeOptions::new().resize_alg(fr::ResizeAlg::Convolution(filter.to_fast_filter()));

        resizer
            .resize(&src_image, &mut dst_image, Some(&options))
            .map_err(|e| ExtractError::Raster(format!("fast_image_resize 执行失败：{}", e)))?;

        let rgba = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(
            target_width,
            target_height,
            dst_image.into_vec(),
        )
        .ok_or_else(|| ExtractError::Raster("fast_image_resize 输出缓冲长度异常".to_string()))?;

        Ok(DynamicImage::ImageRgba8(rgba))
    }
}

/// 计算有界工作分辨率：长边不超过 `max_dimension`，保持宽高比，向下取整且至少 1。
pub fn working_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let longer = width.max(height);
    if longer <= max_dimension || longer == 0 {
        return (width, height);
    }

    let scale = |side: u32| -> u32 {
        let scaled = u64::from(side) * u64::from(max_dimension) / u64::from(longer);
        (scaled as u32).max(1)
    };

    (scale(width), scale(height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use image::ImageFormat;

    fn png_bytes(width: u32, height: u32, f: impl Fn(u32, u32) -> [u8; 4]) -> Bytes {
        let img = ImageBuffer::from_fn(width, height, |x, y| Rgba(f(x, y)));
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut cursor, ImageFormat::Png)
            .expect("failed to encode test image");
        Bytes::from(cursor.into_inner())
    }

    fn raw(bytes: Bytes) -> RawImageData {
        RawImageData {
            bytes,
            source_hint: "test",
        }
    }

    #[test]
    fn working_dimensions_bound_longer_side() {
        assert_eq!(working_dimensions(400, 300, 200), (200, 150));
        assert_eq!(working_dimensions(300, 400, 200), (150, 200));
        assert_eq!(working_dimensions(1000, 3, 200), (200, 1));
        assert_eq!(working_dimensions(640, 480, 200), (200, 150));
        assert_eq!(working_dimensions(300, 200, 200), (200, 133));
    }

    #[test]
    fn working_dimensions_keep_small_images() {
        assert_eq!(working_dimensions(10, 10, 200), (10, 10));
        assert_eq!(working_dimensions(200, 50, 200), (200, 50));
        assert_eq!(working_dimensions(0, 0, 200), (0, 0));
    }

    #[test]
    fn small_image_keeps_exact_pixels() {
        let bytes = png_bytes(3, 2, |x, y| [x as u8 * 50, y as u8 * 50, 7, 255]);
        let raster = ColorExtractor::decode_and_rasterize(&raw(bytes), &ExtractorConfig::default())
            .expect("decode should succeed");

        assert_eq!((raster.width(), raster.height()), (3, 2));
        assert_eq!(&raster.pixels()[..8], &[0, 0, 7, 255, 50, 0, 7, 255]);
    }

    #[test]
    fn large_image_is_downscaled_to_bound() {
        let bytes = png_bytes(800, 400, |_, _| [200, 30, 30, 255]);
        let raster = ColorExtractor::decode_and_rasterize(&raw(bytes), &ExtractorConfig::default())
            .expect("decode should succeed");

        assert_eq!((raster.width(), raster.height()), (200, 100));
        assert_eq!(raster.pixels().len(), 200 * 100 * 4);
        // 纯色图缩放后颜色基本不变（允许定点运算的 1 级误差）
        let expected = [200_u8, 30, 30, 255];
        assert!(raster.pixels().chunks_exact(4).all(|p| {
            p.iter().zip(expected).all(|(&got, want)| got.abs_diff(want) <= 1)
        }));
    }

    #[test]
    fn non_image_bytes_are_load_error() {
        let result = ColorExtractor::decode_and_rasterize(
            &raw(Bytes::from_static(b"<html>not an image</html>")),
            &ExtractorConfig::default(),
        );
        assert!(matches!(result, Err(ExtractError::ImageLoad(_))));
    }

    #[test]
    fn truncated_png_is_load_error() {
        let bytes = png_bytes(16, 16, |_, _| [10, 200, 10, 255]);
        let truncated = bytes.slice(..bytes.len() / 2);
        let result =
            ColorExtractor::decode_and_rasterize(&raw(truncated), &ExtractorConfig::default());
        assert!(matches!(result, Err(ExtractError::ImageLoad(_))));
    }

    #[test]
    fn rejects_too_many_pixels_before_decode() {
        let mut config = ExtractorConfig::default();
        config.max_decoded_pixels = 100;

        let bytes = png_bytes(20, 20, |_, _| [1, 2, 3, 255]);
        let result = ColorExtractor::decode_and_rasterize(&raw(bytes), &config);
        assert!(matches!(result, Err(ExtractError::ImageLoad(_))));
    }

    #[test]
    fn fast_resize_matches_requested_size() {
        let img = DynamicImage::ImageRgba8(ImageBuffer::from_pixel(50, 20, Rgba([90, 90, 200, 255])));
        let resized = ColorExtractor::resize_with_fast_image_resize(&img, 25, 10, ResizeFilter::Bilinear)
            .expect("resize should succeed");

        assert_eq!(resized.dimensions(), (25, 10));
    }
}
