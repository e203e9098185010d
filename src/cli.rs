//! # 命令行前端模块
//!
//! ## 设计思路
//!
//! 命令行只做三件事：解析参数（clap derive）、并发调用 `ColorExtractor`、格式化输出。
//! 单个来源失败不影响其他来源，失败信息按来源逐条报告。
//!
//! ## 实现思路
//!
//! - 包含 `://` 或以 `data:` 开头的参数视为 URL，其余视为本地文件路径。
//! - 每个来源一个 tokio 任务，共享同一个 `Arc<ColorExtractor>`。
//! - 报告顺序与参数顺序一致，与任务完成顺序无关。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;

use crate::color_extractor::{ColorExtractor, ExtractError, ExtractorConfig, ImageSource, UploadedFile};
use crate::error::AppError;

const DISPLAY_SOURCE_MAX_CHARS: usize = 48;

/// 命令行参数。
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "colorwave-palette")]
#[command(about = "从图片 URL 或本地图片文件提取最多 5 个主色")]
pub struct Cli {
    /// 从 JSON 文件读取取色配置
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// 以 JSON 数组输出结果
    #[arg(long, default_value_t = false)]
    pub json: bool,
    /// 图片 URL（http/https/data/file）或本地图片路径
    #[arg(required = true, value_name = "SOURCE")]
    pub sources: Vec<String>,
}

impl Cli {
    /// 读取配置文件；未指定时使用默认配置。
    pub fn load_config(&self) -> Result<ExtractorConfig, AppError> {
        match &self.config {
            Some(path) => Ok(ExtractorConfig::from_json_file(path)?),
            None => Ok(ExtractorConfig::default()),
        }
    }
}

/// 判断参数是否应当按 URL 处理。
pub fn is_url_source(arg: &str) -> bool {
    arg.contains("://") || arg.get(..5).is_some_and(|prefix| prefix.eq_ignore_ascii_case("data:"))
}

/// 将命令行参数转换为图片来源；本地文件在此读取。
pub fn classify_source(arg: &str) -> Result<ImageSource, ExtractError> {
    if is_url_source(arg) {
        return Ok(ImageSource::Url(arg.to_string()));
    }
    UploadedFile::from_path(Path::new(arg)).map(ImageSource::File)
}

/// 单个来源的提取结果。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

impl SourceReport {
    fn success(source: String, colors: Vec<String>) -> Self {
        Self {
            source,
            colors: Some(colors),
            error: None,
            code: None,
        }
    }

    fn failure(source: String, error: &AppError) -> Self {
        Self {
            source,
            colors: None,
            error: Some(error.to_string()),
            code: Some(error.code()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// 按参数顺序并发提取所有来源。
pub async fn run(cli: &Cli) -> Result<Vec<SourceReport>, AppError> {
    let config = cli.load_config()?;
    let extractor = Arc::new(ColorExtractor::new(config)?);
    Ok(run_sources(extractor, &cli.sources).await)
}

/// 使用给定的取色器并发处理来源列表。
pub async fn run_sources(extractor: Arc<ColorExtractor>, sources: &[String]) -> Vec<SourceReport> {
    let handles: Vec<_> = sources
        .iter()
        .cloned()
        .map(|source| {
            let extractor = Arc::clone(&extractor);
            tokio::spawn(async move {
                let image_source = classify_source(&source)?;
                extractor.extract(&image_source).await
            })
        })
        .collect();

    let mut reports = Vec::with_capacity(handles.len());
    for (source, handle) in sources.iter().zip(handles) {
        let outcome = match handle.await {
            Ok(result) => result.map_err(AppError::from),
            Err(join_err) => Err(AppError::Task(join_err.to_string())),
        };

        let report = match outcome {
            Ok(colors) => SourceReport::success(source.clone(), colors),
            Err(err) => {
                log::warn!("⚠️ 取色失败 - {}: {}", display_source(source), err);
                SourceReport::failure(source.clone(), &err)
            }
        };
        reports.push(report);
    }

    let failed = reports.iter().filter(|r| r.is_failure()).count();
    log::info!("📊 处理完成 - 成功: {} 失败: {}", reports.len() - failed, failed);

    reports
}

/// 文本输出：每个来源一行。
pub fn render_plain(reports: &[SourceReport]) -> String {
    reports
        .iter()
        .map(|report| {
            let label = display_source(&report.source);
            match (&report.colors, &report.error) {
                (Some(colors), _) if colors.is_empty() => format!("{}: (无可用颜色)", label),
                (Some(colors), _) => format!("{}: {}", label, colors.join(" ")),
                (None, Some(error)) => format!(
                    "{}: 错误[{}] {}",
                    label,
                    report.code.unwrap_or("unknown"),
                    error
                ),
                (None, None) => format!("{}:", label),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// JSON 输出：结果记录数组。
pub fn render_json(reports: &[SourceReport]) -> Result<String, AppError> {
    Ok(serde_json::to_string_pretty(reports)?)
}

/// Data URL 太长，输出时只保留前缀。
fn display_source(source: &str) -> String {
    if source.starts_with("data:") && source.chars().count() > DISPLAY_SOURCE_MAX_CHARS {
        let prefix: String = source.chars().take(DISPLAY_SOURCE_MAX_CHARS).collect();
        return format!("{}…", prefix);
    }
    source.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::error::ErrorKind;

    fn parse(values: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("colorwave-palette").chain(values.iter().copied()))
    }

    #[test]
    fn parses_flags_and_sources() {
        let cli = parse(&["--json", "--config", "cfg.json", "a.png", "https://x/y.png"])
            .expect("parse should succeed");

        assert!(cli.json);
        assert_eq!(cli.config, Some(PathBuf::from("cfg.json")));
        assert_eq!(cli.sources, ["a.png", "https://x/y.png"]);
    }

    #[test]
    fn rejects_missing_sources_and_unknown_flags() {
        let missing = parse(&[]).expect_err("sources are required");
        assert_eq!(missing.kind(), ErrorKind::MissingRequiredArgument);
        assert_eq!(missing.exit_code(), 2);

        assert!(parse(&["a.png", "--config"]).is_err());

        let unknown = parse(&["--fast", "a.png"]).expect_err("unknown flag");
        assert_eq!(unknown.kind(), ErrorKind::UnknownArgument);
    }

    #[test]
    fn help_is_reported_as_display_help() {
        let help = parse(&["--help"]).expect_err("help short-circuits parsing");
        assert_eq!(help.kind(), ErrorKind::DisplayHelp);
        assert_eq!(help.exit_code(), 0);
    }

    #[test]
    fn double_dash_ends_flag_parsing() {
        let cli = parse(&["--", "--json"]).expect("parse should succeed");
        assert!(!cli.json);
        assert_eq!(cli.sources, ["--json"]);
    }

    #[test]
    fn missing_config_file_is_invalid_config() {
        let cli = parse(&["--config", "./missing-colorwave-config.json", "a.png"])
            .expect("parse should succeed");
        let result = cli.load_config();
        assert!(matches!(result, Err(AppError::Extraction(ExtractError::InvalidConfig(_)))));
    }

    #[test]
    fn classifies_urls_and_paths() {
        assert!(is_url_source("https://cdn.example.com/logo.png"));
        assert!(is_url_source("file:///tmp/logo.png"));
        assert!(is_url_source("data:image/png;base64,AAAA"));
        assert!(is_url_source("DATA:image/png;base64,AAAA"));
        assert!(!is_url_source("./logo.png"));
        assert!(!is_url_source("C:\\images\\logo.png"));

        let missing = classify_source("./definitely-missing-colorwave.png");
        assert!(matches!(missing, Err(ExtractError::ImageLoad(_))));
    }

    #[test]
    fn renders_plain_lines() {
        let reports = vec![
            SourceReport::success("a.png".to_string(), vec!["#ff0000".to_string(), "#0000ff".to_string()]),
            SourceReport::success("b.png".to_string(), vec![]),
            SourceReport::failure(
                "c.txt".to_string(),
                &AppError::from(ExtractError::InvalidFileType("c.txt".to_string())),
            ),
        ];

        let output = render_plain(&reports);
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines[0], "a.png: #ff0000 #0000ff");
        assert_eq!(lines[1], "b.png: (无可用颜色)");
        assert!(lines[2].starts_with("c.txt: 错误[invalid_file_type]"));
    }

    #[test]
    fn renders_json_records() {
        let reports = vec![
            SourceReport::success("a.png".to_string(), vec!["#ff0000".to_string()]),
            SourceReport::failure(
                "b.png".to_string(),
                &AppError::from(ExtractError::ImageLoad("HTTP 404".to_string())),
            ),
        ];

        let json = render_json(&reports).expect("render should succeed");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");

        assert_eq!(value[0]["colors"][0], "#ff0000");
        assert!(value[0].get("error").is_none());
        assert_eq!(value[1]["code"], "image_load");
        assert!(value[1].get("colors").is_none());
    }

    #[test]
    fn long_data_urls_are_shortened_for_display() {
        let source = format!("data:image/png;base64,{}", "A".repeat(200));
        let label = display_source(&source);
        assert!(label.ends_with('…'));
        assert_eq!(label.chars().count(), DISPLAY_SOURCE_MAX_CHARS + 1);
        assert_eq!(display_source("logo.png"), "logo.png");
    }

    #[tokio::test]
    async fn run_sources_keeps_argument_order() {
        let extractor = Arc::new(ColorExtractor::new(ExtractorConfig::default()).expect("extractor init failed"));
        let sources = vec![
            "ftp://example.com/a.png".to_string(),
            "./missing-colorwave-input.png".to_string(),
        ];

        let reports = run_sources(extractor, &sources).await;

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].source, sources[0]);
        assert_eq!(reports[1].source, sources[1]);
        assert!(reports.iter().all(SourceReport::is_failure));
        assert!(reports.iter().all(|r| r.code == Some("image_load")));
    }
}
