//! 报告生成模块
//!
//! 把断链结果渲染为确定性的文本或JSON报告，并写入带时间戳的报告文件。

use crate::check::config::ReportFormat;
use crate::check::resolve::Finding;
use crate::epub::error::Result;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// 报告文件名前缀
const REPORT_PREFIX: &str = "epub_link_check_";

/// 检查运行的结果状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    /// 没有发现断链
    Clean,
    /// 发现了指定数量的断链
    Broken(usize),
}

impl CheckStatus {
    /// 对应的进程退出码
    pub fn exit_code(&self) -> u8 {
        match self {
            CheckStatus::Clean => 0,
            CheckStatus::Broken(_) => 1,
        }
    }
}

/// 一次检查运行的报告
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// 包文件路径
    pub package: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// 生成时间
    pub generated_at: String,
    /// 检查的文档数
    pub documents_checked: usize,
    /// 检查的链接数
    pub links_checked: usize,
    /// 跳过的外部链接数
    pub external_links: usize,
    /// 断链结果（按清单顺序、再按文档内出现顺序）
    pub findings: Vec<Finding>,
    #[serde(skip)]
    timestamp: DateTime<Local>,
}

impl Report {
    /// 创建报告
    pub fn new(package: impl Into<String>, generated_at: DateTime<Local>) -> Self {
        Self {
            package: package.into(),
            title: None,
            generated_at: generated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            documents_checked: 0,
            links_checked: 0,
            external_links: 0,
            findings: Vec::new(),
            timestamp: generated_at,
        }
    }

    /// 结果状态
    pub fn status(&self) -> CheckStatus {
        if self.findings.is_empty() {
            CheckStatus::Clean
        } else {
            CheckStatus::Broken(self.findings.len())
        }
    }

    /// 结构化的断链结果
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// 按源文档分组的断链结果，保持源文档首次出现的顺序
    pub fn grouped(&self) -> Vec<(&str, Vec<&Finding>)> {
        let mut groups: Vec<(&str, Vec<&Finding>)> = Vec::new();
        for finding in &self.findings {
            match groups.last_mut() {
                Some((source, items)) if *source == finding.source => items.push(finding),
                _ => groups.push((finding.source.as_str(), vec![finding])),
            }
        }
        groups
    }

    /// 渲染文本报告
    pub fn render_text(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "EPUB断链检查报告: {}", self.package);
        if let Some(title) = &self.title {
            let _ = writeln!(out, "书名: {}", title);
        }
        let _ = writeln!(out, "生成时间: {}", self.generated_at);
        let _ = writeln!(out, "检查文档数: {}", self.documents_checked);
        let _ = writeln!(out, "检查链接数: {}", self.links_checked);
        let _ = writeln!(out, "外部链接数(未检查): {}", self.external_links);
        let _ = writeln!(out, "断链总数: {}", self.findings.len());

        if self.findings.is_empty() {
            let _ = writeln!(out, "\n没有发现断链，所有链接均有效。");
            return out;
        }

        let _ = writeln!(out, "\n断链详情:");
        for (source, findings) in self.grouped() {
            let _ = writeln!(out, "\n源文件: {}", source);
            for finding in findings {
                let _ = writeln!(out, "  - 链接: {}", finding.href);
                let _ = writeln!(out, "    原因: {} ({})", finding.reason.description(), finding.reason);
                if let Some(detail) = &finding.detail {
                    let _ = writeln!(out, "    说明: {}", detail);
                }
                if let Some(target) = &finding.target {
                    match &finding.fragment {
                        Some(fragment) => {
                            let _ = writeln!(out, "    目标: {}#{}", target, fragment);
                        }
                        None => {
                            let _ = writeln!(out, "    目标: {}", target);
                        }
                    }
                }
                if let Some(line) = finding.line {
                    let _ = writeln!(out, "    行号: {}", line);
                }
                let _ = writeln!(out, "    链接文本: {}", finding.text.as_deref().unwrap_or("无文本"));
            }
        }

        out
    }

    /// 渲染JSON报告
    pub fn render_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// 按指定格式渲染
    pub fn render(&self, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Text => Ok(self.render_text()),
            ReportFormat::Json => self.render_json(),
        }
    }

    /// 报告文件名，如 `epub_link_check_20250101_120000.log`
    pub fn file_name(&self, format: ReportFormat) -> String {
        format!(
            "{}{}.{}",
            REPORT_PREFIX,
            self.timestamp.format("%Y%m%d_%H%M%S"),
            format.extension()
        )
    }

    /// 把报告写入目录，返回报告文件路径
    pub fn write_to<P: AsRef<Path>>(&self, dir: P, format: ReportFormat) -> Result<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let path = dir.join(self.file_name(format));
        fs::write(&path, self.render(format)?)?;
        log::debug!("报告已保存到: {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::resolve::FindingReason;
    use chrono::TimeZone;

    fn timestamp() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 1, 8, 30, 5).unwrap()
    }

    fn finding(source: &str, href: &str, reason: FindingReason) -> Finding {
        Finding {
            source: source.to_string(),
            href: href.to_string(),
            reason,
            target: Some("chap1.xhtml".to_string()),
            fragment: None,
            detail: None,
            line: Some(3),
            text: Some("第一章".to_string()),
        }
    }

    fn sample_report() -> Report {
        let mut report = Report::new("book.epub", timestamp());
        report.documents_checked = 2;
        report.links_checked = 4;
        report.findings = vec![
            finding("intro.xhtml", "chap1.xhtml#x", FindingReason::FragmentMissing),
            finding("intro.xhtml", "chap9.xhtml", FindingReason::TargetFileMissing),
            finding("chap1.xhtml", "../x.xhtml", FindingReason::MalformedReference),
        ];
        report
    }

    #[test]
    fn test_status() {
        assert_eq!(Report::new("a.epub", timestamp()).status(), CheckStatus::Clean);
        assert_eq!(sample_report().status(), CheckStatus::Broken(3));
        assert_eq!(CheckStatus::Broken(3).exit_code(), 1);
    }

    #[test]
    fn test_grouped_keeps_order() {
        let report = sample_report();
        let groups = report.grouped();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "intro.xhtml");
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].0, "chap1.xhtml");
    }

    #[test]
    fn test_render_text() {
        let text = sample_report().render_text();
        assert!(text.contains("断链总数: 3"));
        assert!(text.contains("源文件: intro.xhtml"));
        assert!(text.contains("原因: 目标文件不存在 (target file missing)"));
        assert!(text.find("源文件: intro.xhtml").unwrap() < text.find("源文件: chap1.xhtml").unwrap());
        assert_eq!(text, sample_report().render_text());
    }

    #[test]
    fn test_render_clean_report() {
        let text = Report::new("a.epub", timestamp()).render_text();
        assert!(text.contains("没有发现断链"));
    }

    #[test]
    fn test_render_json() {
        let json = sample_report().render_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["findings"].as_array().unwrap().len(), 3);
        assert_eq!(value["findings"][0]["reason"], "fragment-missing");
        assert_eq!(value["generated_at"], "2025-03-01 08:30:05");
    }

    #[test]
    fn test_write_to_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_report().write_to(dir.path(), ReportFormat::Text).unwrap();

        assert_eq!(path.file_name().unwrap(), "epub_link_check_20250301_083005.log");
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("断链详情"));
    }
}
