//! 检查器配置模块
//!
//! 提供断链检查的配置管理功能，支持从YAML文件加载配置。

use crate::epub::error::{EpubError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "linkcheck.yaml";

/// 报告输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// 人类可读的文本报告
    #[default]
    Text,
    /// JSON格式，便于程序处理
    Json,
}

impl ReportFormat {
    /// 报告文件的扩展名
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Text => "log",
            ReportFormat::Json => "json",
        }
    }
}

/// 断链检查配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    /// 视为外部链接的URL协议（不区分大小写）
    pub external_schemes: Vec<String>,
    /// 是否把外部链接也记录到报告中
    pub report_external: bool,
    /// 携带 `href` 的超链接元素名称
    pub link_elements: Vec<String>,
    /// 报告输出目录，未设置时使用EPUB文件所在目录
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    /// 报告格式
    pub report_format: ReportFormat,
    /// 工作线程数，0表示使用可用的CPU数
    pub jobs: usize,
    /// 是否把报告写入文件
    pub write_report: bool,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            external_schemes: [
                "http", "https", "mailto", "ftp", "ftps", "tel", "sms",
                "data", "javascript", "file", "urn", "news", "irc",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            report_external: false,
            link_elements: vec!["a".to_string(), "area".to_string()],
            output_dir: None,
            report_format: ReportFormat::Text,
            jobs: 0,
            write_report: true,
        }
    }
}

impl CheckerConfig {
    /// 从指定的配置文件加载配置
    ///
    /// 文件中缺失的字段使用默认值。
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| EpubError::ConfigError(format!("无法读取配置文件 {}: {}", path.display(), e)))?;

        Self::from_yaml(&content)
    }

    /// 从YAML文本解析配置
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yml::from_str(content)
            .map_err(|e| EpubError::ConfigError(format!("配置文件格式错误: {}", e)))
    }

    /// 生成默认配置文件
    ///
    /// # 参数
    /// * `path` - 配置文件的写入路径
    pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let yaml_content = serde_yml::to_string(&Self::default())
            .map_err(|e| EpubError::ConfigError(format!("序列化配置失败: {}", e)))?;

        let content_with_header = format!(
            "# EPUB断链检查配置文件\n# external_schemes 中的协议不会被检查\n# jobs 为 0 时使用全部CPU\n\n{}",
            yaml_content
        );

        fs::write(path.as_ref(), content_with_header)
            .map_err(|e| EpubError::ConfigError(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }

    /// 加载配置
    ///
    /// 未指定路径时直接使用默认配置；指定的文件不存在时，
    /// 先在该位置生成默认配置文件再使用默认配置。
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        if path.exists() {
            return Self::from_file(path);
        }

        log::info!("配置文件 {} 不存在，生成默认配置", path.display());
        if let Err(e) = Self::generate_default_config(path) {
            log::warn!("{}", e);
        }
        Ok(Self::default())
    }

    /// 判断链接是否使用了外部协议
    pub fn is_external_scheme(&self, scheme: &str) -> bool {
        self.external_schemes
            .iter()
            .any(|s| s.eq_ignore_ascii_case(scheme))
    }

    /// 判断元素是否为超链接元素
    pub fn is_link_element(&self, name: &str) -> bool {
        self.link_elements
            .iter()
            .any(|e| e.eq_ignore_ascii_case(name))
    }

    /// 实际使用的工作线程数
    pub fn effective_jobs(&self) -> usize {
        if self.jobs > 0 {
            return self.jobs;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}
