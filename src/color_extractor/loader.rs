//! # 加载模块
//!
//! ## 设计思路
//!
//! 统一处理不同 URL 形式的原始字节加载，输出 `RawImageData` 交给解码流水线。
//! 这里只负责"拿到字节"，格式是否可解码由解码阶段判断。
//!
//! ## 实现思路
//!
//! - `http`/`https`：reqwest 流式下载，校验状态码与体积上限。
//! - `data:`：解析 Base64 Data URL，解码前先估算体积。
//! - `blob:`：从临时对象注册表取回文件字节。
//! - `file://`：读取本地文件，读取前检查 metadata 体积。
//! - 所有失败统一映射为 `ExtractError::ImageLoad`，不做重试。

use std::path::Path;
use std::time::Duration;

use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;

use super::object_url::BLOB_URL_PREFIX;
use super::source::RawImageData;
use super::{ColorExtractor, ExtractError, ExtractorConfig};

const BUFFER_INITIAL_CAPACITY: usize = 16 * 1024;
const DATA_URL_LOG_PREFIX_LEN: usize = 32;

impl ColorExtractor {
    /// 按 URL 形式加载图片原始字节。
    pub(super) async fn load_from_url(
        &self,
        url: &str,
        config: &ExtractorConfig,
    ) -> Result<RawImageData, ExtractError> {
        let url = url.trim();
        log::info!("🌐 开始加载图片 - URL: {}", Self::redact_url_for_log(url));

        if has_scheme(url, "data") {
            return Self::load_from_data_url(url, config);
        }
        if has_scheme(url, "blob") {
            return self.load_from_object_url(url, config);
        }

        let parsed = reqwest::Url::parse(url)
            .map_err(|e| ExtractError::ImageLoad(format!("URL 格式错误：{}", e)))?;

        match parsed.scheme() {
            "http" | "https" => {
                let bytes = Self::download(parsed, config).await?;
                Ok(RawImageData {
                    bytes,
                    source_hint: "url",
                })
            }
            "file" => {
                let path = parsed
                    .to_file_path()
                    .map_err(|_| ExtractError::ImageLoad(format!("无效的文件 URL：{}", url)))?;
                Self::load_from_path(&path, config)
            }
            other => Err(ExtractError::ImageLoad(format!("不支持的 URL 协议：{}", other))),
        }
    }

    fn load_from_object_url(
        &self,
        url: &str,
        config: &ExtractorConfig,
    ) -> Result<RawImageData, ExtractError> {
        // 注册表中的键统一使用小写协议名
        let url = format!("blob:{}", &url["blob:".len()..]);
        if !url.starts_with(BLOB_URL_PREFIX) {
            return Err(ExtractError::ImageLoad(format!("未知的 blob URL：{}", url)));
        }

        let bytes = self
            .blobs
            .resolve(&url)
            .ok_or_else(|| ExtractError::ImageLoad(format!("临时对象 URL 已失效：{}", url)))?;
        Self::ensure_within_size_limit(bytes.len() as u64, config, "文件")?;

        Ok(RawImageData {
            bytes,
            source_hint: "blob",
        })
    }

    fn load_from_path(path: &Path, config: &ExtractorConfig) -> Result<RawImageData, ExtractError> {
        log::info!("📁 开始读取本地图片 - 路径: {}", path.display());

        let metadata = std::fs::metadata(path)
            .map_err(|e| ExtractError::ImageLoad(format!("无法读取文件信息：{}", e)))?;
        Self::ensure_within_size_limit(metadata.len(), config, "文件")?;

        let bytes = std::fs::read(path)
            .map_err(|e| ExtractError::ImageLoad(format!("无法读取图片文件：{}", e)))?;

        Ok(RawImageData {
            bytes: Bytes::from(bytes),
            source_hint: "file",
        })
    }

    fn load_from_data_url(url: &str, config: &ExtractorConfig) -> Result<RawImageData, ExtractError> {
        let bytes = Self::parse_base64_data_url(url, config.max_file_size)?;
        Self::ensure_within_size_limit(bytes.len() as u64, config, "Data URL")?;

        Ok(RawImageData {
            bytes: Bytes::from(bytes),
            source_hint: "data-url",
        })
    }

    /// 流式下载，边读边校验体积上限。
    async fn download(url: reqwest::Url, config: &ExtractorConfig) -> Result<Bytes, ExtractError> {
        log::debug!("📡 发送 HTTP 请求...");

        let client = Self::build_http_client(config)?;
        let response = client
            .get(url.clone())
            .header(
                reqwest::header::ACCEPT,
                "image/avif,image/webp,image/apng,image/svg+xml,image/*,*/*;q=0.8",
            )
            .send()
            .await
            .map_err(|e| Self::map_reqwest_error(e, url.as_str(), config))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractError::ImageLoad(format!(
                "HTTP {}: {}",
                status.as_u16(),
                Self::status_message(status.as_u16())
            )));
        }

        if let Some(ct) = response.headers().get(reqwest::header::CONTENT_TYPE) {
            log::debug!("📄 响应类型: {}", ct.to_str().unwrap_or("<non-ascii>"));
        }

        let total_len = response.content_length();
        if let Some(size) = total_len {
            Self::ensure_within_size_limit(size, config, "文件")?;
        }

        let initial_capacity = total_len
            .map(|len| len.min(config.max_file_size) as usize)
            .filter(|len| *len > 0)
            .unwrap_or(BUFFER_INITIAL_CAPACITY);
        let mut buffer = Vec::with_capacity(initial_capacity);
        let mut response = response;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Self::map_reqwest_error(e, url.as_str(), config))?
        {
            let received = (buffer.len() + chunk.len()) as u64;
            if received > config.max_file_size {
                return Err(ExtractError::ImageLoad("下载内容超过大小限制".to_string()));
            }
            buffer.extend_from_slice(&chunk);
        }

        log::debug!("✅ 下载完成 - {} bytes", buffer.len());

        Ok(Bytes::from(buffer))
    }

    fn build_http_client(config: &ExtractorConfig) -> Result<reqwest::Client, ExtractError> {
        let mut builder =
            reqwest::Client::builder().redirect(reqwest::redirect::Policy::limited(config.max_redirects));

        if let Some(secs) = config.download_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = config.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }

        builder
            .build()
            .map_err(|e| ExtractError::ImageLoad(format!("无法创建 HTTP 客户端：{}", e)))
    }

    fn ensure_within_size_limit(
        size: u64,
        config: &ExtractorConfig,
        what: &str,
    ) -> Result<(), ExtractError> {
        if size > config.max_file_size {
            return Err(ExtractError::ImageLoad(format!(
                "{}过大：{:.2} MB（限制：{:.2} MB）",
                what,
                size as f64 / 1024.0 / 1024.0,
                config.max_file_size as f64 / 1024.0 / 1024.0
            )));
        }
        Ok(())
    }

    fn estimate_base64_decoded_upper_bound_len(base64_data: &str) -> Result<u64, ExtractError> {
        let len = base64_data.trim().len() as u64;
        let groups = len
            .checked_add(3)
            .ok_or_else(|| ExtractError::ImageLoad("Base64 输入长度溢出".to_string()))?
            / 4;

        groups
            .checked_mul(3)
            .ok_or_else(|| ExtractError::ImageLoad("Base64 解码体积估算溢出".to_string()))
    }

    /// 解析 `data:<mime>;base64,<payload>`，仅支持 Base64 编码。
    pub(crate) fn parse_base64_data_url(data: &str, max_file_size: u64) -> Result<Vec<u8>, ExtractError> {
        let normalized = data.trim();
        let (header, payload) = normalized
            .split_once(',')
            .ok_or_else(|| ExtractError::ImageLoad("Data URL 缺少数据段".to_string()))?;

        if !header.to_ascii_lowercase().ends_with(";base64") {
            return Err(ExtractError::ImageLoad("仅支持 Base64 编码的 Data URL".to_string()));
        }

        let estimated_len = Self::estimate_base64_decoded_upper_bound_len(payload)?;
        if estimated_len > max_file_size {
            return Err(ExtractError::ImageLoad(format!(
                "Base64 预计解码体积过大：{:.2} MB（限制：{:.2} MB）",
                estimated_len as f64 / 1024.0 / 1024.0,
                max_file_size as f64 / 1024.0 / 1024.0
            )));
        }

        general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| ExtractError::ImageLoad(format!("Base64 解码失败：{}", e)))
    }

    /// 统一映射 reqwest 错误。
    fn map_reqwest_error(e: reqwest::Error, url: &str, config: &ExtractorConfig) -> ExtractError {
        let redacted = Self::redact_url_for_log(url);
        let err_msg = e.to_string().replace(url, &redacted);

        if e.is_timeout() {
            let secs = config
                .download_timeout_secs
                .or(config.connect_timeout_secs)
                .unwrap_or_default();
            ExtractError::ImageLoad(format!("下载超时（{}秒）：{}", secs, err_msg))
        } else if e.is_connect() {
            ExtractError::ImageLoad(format!("无法连接：{}", err_msg))
        } else if e.is_redirect() {
            ExtractError::ImageLoad(format!("重定向次数超过限制（{}）", config.max_redirects))
        } else {
            ExtractError::ImageLoad(format!("请求失败：{}", err_msg))
        }
    }

    /// 日志中隐藏查询参数与 fragment；Data URL 只保留前缀。
    pub(crate) fn redact_url_for_log(url: &str) -> String {
        if has_scheme(url, "data") {
            let prefix: String = url.chars().take(DATA_URL_LOG_PREFIX_LEN).collect();
            return format!("{}…({} bytes)", prefix, url.len());
        }
        if has_scheme(url, "blob") {
            return url.to_string();
        }

        let Ok(parsed) = reqwest::Url::parse(url) else {
            return "<invalid-url>".to_string();
        };

        let host = parsed.host_str().unwrap_or_default();
        let port = parsed.port().map(|p| format!(":{}", p)).unwrap_or_default();

        format!("{}://{}{}{}", parsed.scheme(), host, port, parsed.path())
    }

    fn status_message(code: u16) -> &'static str {
        match code {
            404 => "未找到",
            403 => "访问被拒绝",
            500..=599 => "服务器错误",
            _ => "请求失败",
        }
    }
}

/// 协议名比较忽略大小写（`DATA:`、`Blob:` 与小写等价）。
pub(crate) fn has_scheme(url: &str, scheme: &str) -> bool {
    url.len() > scheme.len()
        && url.as_bytes()[scheme.len()] == b':'
        && url[..scheme.len()].eq_ignore_ascii_case(scheme)
}
