//! # 取色算法模块
//!
//! ## 设计思路
//!
//! 纯函数实现，不做 I/O、不打日志，输入 `RasterImage` 与配置，输出调色板。
//! 所有中间状态（频次表、候选列表）都是单次调用内的局部数据，调用结束即释放。
//!
//! ## 实现思路
//!
//! 1. 按固定步长在行优先的扁平像素序列上采样
//! 2. 跳过透明、近白、近黑像素
//! 3. 每通道四舍五入到量化步长的倍数（上限 255），作为分桶键
//! 4. 统计每个桶的频次，首次出现顺序决定同频次时的先后
//! 5. 频次降序稳定排序后贪心选色：与已选颜色的 RGB 欧氏距离必须全部超过阈值
//! 6. 不足目标数量时按频次顺序回填（不再要求区分度，但不重复）

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use super::{ExtractorConfig, RasterImage};

static HEX_COLOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("十六进制颜色正则无效")
});

/// 8 位 RGB 三元组。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    fn packed(self) -> u32 {
        (u32::from(self.r) << 16) | (u32::from(self.g) << 8) | u32::from(self.b)
    }
}

/// 频次表中的一项：量化后的颜色、十六进制表示与出现次数。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorFrequencyEntry {
    pub quantized: Rgb,
    pub hex: String,
    pub count: u32,
}

/// 扫描阶段的统计数据。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplingSummary {
    /// 按步长采到的像素数。
    pub sampled: usize,
    /// alpha 过低被跳过的像素数。
    pub transparent: usize,
    /// 近白或近黑被跳过的像素数。
    pub neutral: usize,
    /// 量化后的桶数。
    pub buckets: usize,
}

/// 取色结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteSelection {
    /// 最具代表性的颜色在前，格式 `#rrggbb`。
    pub colors: Vec<String>,
    /// 满足区分度要求的颜色数（`colors` 的前缀），其后为回填颜色。
    pub distinct_count: usize,
    pub summary: SamplingSummary,
}

impl PaletteSelection {
    /// 回填的颜色数。
    pub fn backfilled(&self) -> usize {
        self.colors.len() - self.distinct_count
    }
}

/// 将通道值四舍五入到 `step` 的倍数，结果不超过 255。
///
/// 255 按四舍五入会得到 260，这里截断为 255，保证输出始终是合法的两位十六进制。
pub fn quantize_channel(value: u8, step: u8) -> u8 {
    let step = u16::from(step.max(1));
    let rounded = (u16::from(value) + step / 2) / step * step;
    rounded.min(255) as u8
}

pub fn quantize(rgb: Rgb, step: u8) -> Rgb {
    Rgb::new(
        quantize_channel(rgb.r, step),
        quantize_channel(rgb.g, step),
        quantize_channel(rgb.b, step),
    )
}

/// RGB 空间欧氏距离。
pub fn color_distance(a: Rgb, b: Rgb) -> f64 {
    let dr = f64::from(a.r) - f64::from(b.r);
    let dg = f64::from(a.g) - f64::from(b.g);
    let db = f64::from(a.b) - f64::from(b.b);
    (dr * dr + dg * dg + db * db).sqrt()
}

/// 小写 `#rrggbb`。
pub fn to_hex(rgb: Rgb) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb.r, rgb.g, rgb.b)
}

/// 是否为 `#` 开头的 6 位十六进制颜色（大小写均可）。
pub fn is_hex_color(value: &str) -> bool {
    HEX_COLOR.is_match(value)
}

fn is_neutral(r: u8, g: u8, b: u8, config: &ExtractorConfig) -> bool {
    let white = config.near_white_floor;
    let black = config.near_black_ceiling;
    (r > white && g > white && b > white) || (r < black && g < black && b < black)
}

/// 扫描像素并构建频次表，返回按频次降序（同频次按首次出现顺序）排列的条目。
pub fn build_frequency_table(
    raster: &RasterImage,
    config: &ExtractorConfig,
) -> (Vec<ColorFrequencyEntry>, SamplingSummary) {
    let mut summary = SamplingSummary::default();
    let mut entries: Vec<ColorFrequencyEntry> = Vec::new();
    let mut index_by_key: HashMap<u32, usize> = HashMap::new();

    for pixel in raster.pixels().chunks_exact(4).step_by(config.sample_stride.max(1)) {
        summary.sampled += 1;

        let &[r, g, b, a] = pixel else {
            continue;
        };

        if a < config.min_alpha {
            summary.transparent += 1;
            continue;
        }
        if is_neutral(r, g, b, config) {
            summary.neutral += 1;
            continue;
        }

        let quantized = quantize(Rgb::new(r, g, b), config.quantize_step);
        match index_by_key.get(&quantized.packed()) {
            Some(&idx) => {
                if let Some(entry) = entries.get_mut(idx) {
                    entry.count += 1;
                }
            }
            None => {
                index_by_key.insert(quantized.packed(), entries.len());
                entries.push(ColorFrequencyEntry {
                    quantized,
                    hex: to_hex(quantized),
                    count: 1,
                });
            }
        }
    }

    // sort_by 是稳定排序，同频次保留首次出现顺序
    entries.sort_by(|a, b| b.count.cmp(&a.count));
    summary.buckets = entries.len();

    (entries, summary)
}

/// 在已排序的候选上执行贪心选色与回填。
///
/// 返回选中颜色与其中满足区分度的数量。
pub fn select_distinct(ranked: &[ColorFrequencyEntry], config: &ExtractorConfig) -> (Vec<String>, usize) {
    let target = config.palette_size;
    let mut selected: Vec<&ColorFrequencyEntry> = Vec::with_capacity(target);

    for candidate in ranked {
        if selected.len() >= target {
            break;
        }
        let distinct = selected
            .iter()
            .all(|chosen| color_distance(chosen.quantized, candidate.quantized) > config.distinct_threshold);
        if distinct {
            selected.push(candidate);
        }
    }

    let distinct_count = selected.len();

    if selected.len() < target {
        for candidate in ranked {
            if selected.len() >= target {
                break;
            }
            if !selected.iter().any(|chosen| chosen.hex == candidate.hex) {
                selected.push(candidate);
            }
        }
    }

    let colors = selected.into_iter().map(|entry| entry.hex.clone()).collect();
    (colors, distinct_count)
}

/// 从像素缓冲区提取调色板。
pub fn extract_palette(raster: &RasterImage, config: &ExtractorConfig) -> PaletteSelection {
    let (ranked, summary) = build_frequency_table(raster, config);
    let (colors, distinct_count) = select_distinct(&ranked, config);

    debug_assert!(colors.iter().all(|hex| is_hex_color(hex)));

    PaletteSelection {
        colors,
        distinct_count,
        summary,
    }
}
