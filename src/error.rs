//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义前端统一的 `AppError` 枚举，命令行与宿主应用只需处理这一种错误。
//! 取色核心的 `ExtractError` 原样包裹，保留其错误码。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `ExtractError`、`std::io::Error`、`serde_json::Error` 提供 `From` 转换，无需手动 map。
//! - 实现 `Serialize` 将错误序列化为字符串，便于输出 JSON 记录。

use serde::Serialize;

use crate::color_extractor::ExtractError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 取色流水线错误（加载 / 解码 / 取色 / 配置）
    #[error("{0}")]
    Extraction(#[from] ExtractError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 结果序列化失败
    #[error("JSON 序列化失败: {0}")]
    Json(#[from] serde_json::Error),

    /// 提取任务异常退出（panic 或被取消）
    #[error("提取任务执行失败: {0}")]
    Task(String),
}

impl AppError {
    /// 稳定的机器可读错误码。
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Extraction(err) => err.code(),
            AppError::Io(_) => "io",
            AppError::Json(_) => "json",
            AppError::Task(_) => "task",
        }
    }
}

/// 将错误序列化为人类可读的字符串。
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_error_keeps_code_and_message() {
        let err = AppError::from(ExtractError::InvalidFileType("notes.txt".to_string()));
        assert_eq!(err.code(), "invalid_file_type");
        assert_eq!(
            err.to_string(),
            ExtractError::InvalidFileType("notes.txt".to_string()).to_string()
        );
    }

    #[test]
    fn serializes_as_display_string() {
        let err = AppError::Task("task panicked".to_string());
        let json = serde_json::to_string(&err).expect("serialize should succeed");
        assert_eq!(json, "\"提取任务执行失败: task panicked\"");
    }

    #[test]
    fn io_error_converts() {
        let err: AppError = std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
        assert_eq!(err.code(), "io");
    }
}
