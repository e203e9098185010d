//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 取色链路上的所有失败都归入单一错误枚举，调用侧可按分支匹配，
//! 也可以通过 `code()` 拿到稳定的机器可读错误码。
//!
//! - `ImageLoad`：资源无法获取或无法解码（网络失败、404、格式损坏、超出体积限制）
//! - `InvalidFileType`：上传文件声明的媒体类型不是图片，在解码前直接拒绝
//! - `Raster`：无法构建可读取像素的缓冲区
//! - `InvalidConfig`：配置参数超出允许范围
//!
//! 所有错误对单次提取调用都是终止性的，内部不做重试。

/// 取色流程统一错误类型。
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("图片加载失败：{0}")]
    ImageLoad(String),

    #[error("文件类型无效：{0}")]
    InvalidFileType(String),

    #[error("像素缓冲区错误：{0}")]
    Raster(String),

    #[error("配置无效：{0}")]
    InvalidConfig(String),
}

impl ExtractError {
    /// 稳定错误码，供命令行 JSON 输出与调用方分支判断使用。
    pub fn code(&self) -> &'static str {
        match self {
            Self::ImageLoad(_) => "image_load",
            Self::InvalidFileType(_) => "invalid_file_type",
            Self::Raster(_) => "raster",
            Self::InvalidConfig(_) => "invalid_config",
        }
    }
}

impl From<ExtractError> for String {
    fn from(error: ExtractError) -> Self {
        error.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(ExtractError::ImageLoad("x".into()).code(), "image_load");
        assert_eq!(ExtractError::InvalidFileType("x".into()).code(), "invalid_file_type");
        assert_eq!(ExtractError::Raster("x".into()).code(), "raster");
        assert_eq!(ExtractError::InvalidConfig("x".into()).code(), "invalid_config");
    }

    #[test]
    fn display_keeps_detail_message() {
        let message: String = ExtractError::ImageLoad("HTTP 404".into()).into();
        assert!(message.contains("HTTP 404"));
    }
}
