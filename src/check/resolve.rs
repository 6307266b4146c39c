//! 链接解析模块
//!
//! 判断链接能否在文档图中解析。解析是 (链接, 文档图, 配置) 的纯函数，
//! 相同输入总是产生相同的结果。

use crate::check::graph::DocumentGraph;
use crate::check::link::{Link, LinkKind};
use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// 断链原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FindingReason {
    /// 目标文件不存在
    TargetFileMissing,
    /// 目标文件存在但锚点不存在
    FragmentMissing,
    /// 引用格式错误
    MalformedReference,
    /// 外部链接（仅在配置要求时报告）
    ExternalLink,
}

impl FindingReason {
    /// 原因代码
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingReason::TargetFileMissing => "target file missing",
            FindingReason::FragmentMissing => "fragment missing",
            FindingReason::MalformedReference => "malformed reference",
            FindingReason::ExternalLink => "external link (not checked)",
        }
    }

    /// 原因的中文描述
    pub fn description(&self) -> &'static str {
        match self {
            FindingReason::TargetFileMissing => "目标文件不存在",
            FindingReason::FragmentMissing => "目标文件中不存在该锚点",
            FindingReason::MalformedReference => "引用格式错误",
            FindingReason::ExternalLink => "外部链接（未检查）",
        }
    }
}

impl Display for FindingReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// 一个断链结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    /// 源文档ID
    pub source: String,
    /// 原始href
    pub href: String,
    pub reason: FindingReason,
    /// 规范化后的目标文件
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fragment: Option<String>,
    /// 补充说明（如格式错误的原因）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// 链接文本
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Finding {
    fn from_link(link: &Link, reason: FindingReason) -> Self {
        Self {
            source: link.source.clone(),
            href: link.href.clone(),
            reason,
            target: link.target().map(str::to_string),
            fragment: link.fragment().map(str::to_string),
            detail: None,
            line: link.line,
            text: link.text.clone(),
        }
    }
}

/// 链接的解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<'g> {
    /// 解析到内容文档（可能带锚点）
    Document { id: &'g str, fragment: Option<String> },
    /// 解析到非文档资源，不检查锚点
    Resource,
    /// 外部链接，不检查
    External,
    /// 断链
    Broken(Finding),
}

impl Resolution<'_> {
    /// 取出断链结果
    pub fn into_finding(self) -> Option<Finding> {
        match self {
            Resolution::Broken(finding) => Some(finding),
            _ => None,
        }
    }
}

/// 解析单个链接
///
/// # 参数
/// * `graph` - 只读的文档图
/// * `link` - 待解析的链接
/// * `report_external` - 是否把外部链接记录为断链结果
pub fn resolve<'g>(graph: &'g DocumentGraph, link: &Link, report_external: bool) -> Resolution<'g> {
    match &link.kind {
        LinkKind::External => {
            if report_external {
                Resolution::Broken(Finding::from_link(link, FindingReason::ExternalLink))
            } else {
                Resolution::External
            }
        }
        LinkKind::Malformed { reason } => {
            let mut finding = Finding::from_link(link, FindingReason::MalformedReference);
            finding.detail = Some(reason.clone());
            Resolution::Broken(finding)
        }
        LinkKind::InternalFile { target } => match graph.document(target) {
            Some(document) => Resolution::Document { id: &document.id, fragment: None },
            None if graph.is_resource(target) => Resolution::Resource,
            None => Resolution::Broken(Finding::from_link(link, FindingReason::TargetFileMissing)),
        },
        LinkKind::InternalFragment { target, fragment } => match graph.document(target) {
            Some(document) if document.has_anchor(fragment) => Resolution::Document {
                id: &document.id,
                fragment: Some(fragment.clone()),
            },
            Some(_) => Resolution::Broken(Finding::from_link(link, FindingReason::FragmentMissing)),
            None if graph.is_resource(target) => Resolution::Resource,
            None => Resolution::Broken(Finding::from_link(link, FindingReason::TargetFileMissing)),
        },
    }
}

/// 解析链接并只返回断链结果
pub fn find_broken(graph: &DocumentGraph, link: &Link, report_external: bool) -> Option<Finding> {
    resolve(graph, link, report_external).into_finding()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::config::CheckerConfig;
    use crate::check::link::classify;
    use crate::epub::package::Package;

    fn scenario_graph() -> DocumentGraph {
        let mut package = Package::new();
        package.add_document("intro.xhtml", r#"<html><body><h1 id="top">简介</h1></body></html>"#);
        package.add_document("chap1.xhtml", "<html><body><p>第一章</p></body></html>");
        package.add_resource("images/fig.png");
        DocumentGraph::build(&package, &CheckerConfig::default()).unwrap()
    }

    fn link(source: &str, href: &str) -> Link {
        Link {
            source: source.to_string(),
            href: href.to_string(),
            kind: classify(source, href, &CheckerConfig::default()),
            line: Some(1),
            text: None,
        }
    }

    #[test]
    fn test_scenario() {
        let graph = scenario_graph();

        let finding = find_broken(&graph, &link("intro.xhtml", "chap1.xhtml#missing"), false).unwrap();
        assert_eq!(finding.reason, FindingReason::FragmentMissing);
        assert_eq!(finding.target.as_deref(), Some("chap1.xhtml"));
        assert_eq!(finding.fragment.as_deref(), Some("missing"));

        assert_eq!(find_broken(&graph, &link("intro.xhtml", "#top"), false), None);

        let finding = find_broken(&graph, &link("intro.xhtml", "chap9.xhtml"), false).unwrap();
        assert_eq!(finding.reason, FindingReason::TargetFileMissing);

        assert_eq!(find_broken(&graph, &link("intro.xhtml", "https://example.com"), false), None);
    }

    #[test]
    fn test_resolution_targets_graph_document() {
        let graph = scenario_graph();
        match resolve(&graph, &link("chap1.xhtml", "intro.xhtml#top"), false) {
            Resolution::Document { id, fragment } => {
                assert_eq!(id, "intro.xhtml");
                assert_eq!(fragment.as_deref(), Some("top"));
            }
            other => panic!("期望解析到文档, 得到: {:?}", other),
        }
    }

    #[test]
    fn test_resource_target() {
        let graph = scenario_graph();
        assert_eq!(resolve(&graph, &link("intro.xhtml", "images/fig.png"), false), Resolution::Resource);
        assert_eq!(resolve(&graph, &link("intro.xhtml", "images/fig.png#x"), false), Resolution::Resource);
    }

    #[test]
    fn test_malformed_reference() {
        let graph = scenario_graph();
        let finding = find_broken(&graph, &link("intro.xhtml", "../up.xhtml"), false).unwrap();
        assert_eq!(finding.reason, FindingReason::MalformedReference);
        assert!(finding.detail.is_some());
        assert_eq!(finding.target, None);
    }

    #[test]
    fn test_report_external() {
        let graph = scenario_graph();
        let finding = find_broken(&graph, &link("intro.xhtml", "https://example.com"), true).unwrap();
        assert_eq!(finding.reason, FindingReason::ExternalLink);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let graph = scenario_graph();
        let links = vec![
            link("intro.xhtml", "chap1.xhtml#missing"),
            link("intro.xhtml", "chap9.xhtml"),
            link("chap1.xhtml", "#nowhere"),
        ];

        let first: Vec<Finding> = links.iter().filter_map(|l| find_broken(&graph, l, false)).collect();
        let second: Vec<Finding> = links.iter().filter_map(|l| find_broken(&graph, l, false)).collect();
        assert_eq!(first.len(), 3);
        assert_eq!(serde_json::to_string(&first).unwrap(), serde_json::to_string(&second).unwrap());
    }
}
