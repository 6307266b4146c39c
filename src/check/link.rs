//! 链接提取模块
//!
//! 按文档顺序提取文档中的超链接并对目标进行分类。提取只做字符串和
//! 标记处理，不查询文档图。

use crate::check::config::CheckerConfig;
use crate::check::graph::Document;
use crate::check::markup::Element;
use crate::check::path;
use serde::Serialize;

/// 链接目标的分类
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum LinkKind {
    /// 外部链接，不检查
    External,
    /// 指向包内文件
    InternalFile { target: String },
    /// 指向包内文件中的锚点
    InternalFragment { target: String, fragment: String },
    /// 无法规范化的引用
    Malformed { reason: String },
}

/// 文档中的一个超链接
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    /// 源文档ID
    pub source: String,
    /// 原始href
    pub href: String,
    #[serde(flatten)]
    pub kind: LinkKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Link {
    /// 规范化后的目标文件
    pub fn target(&self) -> Option<&str> {
        match &self.kind {
            LinkKind::InternalFile { target } | LinkKind::InternalFragment { target, .. } => {
                Some(target.as_str())
            }
            _ => None,
        }
    }

    /// 目标锚点
    pub fn fragment(&self) -> Option<&str> {
        match &self.kind {
            LinkKind::InternalFragment { fragment, .. } => Some(fragment.as_str()),
            _ => None,
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self.kind, LinkKind::External)
    }
}

/// 对链接目标进行分类
///
/// # 参数
/// * `source` - 源文档ID
/// * `href` - 原始href（调用方负责去除首尾空白）
/// * `config` - 检查配置（外部协议列表）
///
/// # 示例
///
/// ```rust
/// use epub_linkcheck::check::{classify, CheckerConfig, LinkKind};
///
/// let config = CheckerConfig::default();
/// assert_eq!(classify("a/x.xhtml", "https://example.com", &config), LinkKind::External);
/// assert_eq!(
///     classify("a/x.xhtml", "b/../c.xhtml#sec", &config),
///     LinkKind::InternalFragment { target: "a/c.xhtml".to_string(), fragment: "sec".to_string() }
/// );
/// ```
pub fn classify(source: &str, href: &str, config: &CheckerConfig) -> LinkKind {
    if href.is_empty() || href.starts_with("//") {
        return LinkKind::External;
    }
    if let Some(scheme) = scheme_of(href) {
        if config.is_external_scheme(scheme) {
            return LinkKind::External;
        }
    }

    if let Some(fragment) = href.strip_prefix('#') {
        return internal(source.to_string(), fragment);
    }

    let (file, fragment) = match href.split_once('#') {
        Some((file, fragment)) => (file, fragment),
        None => (href, ""),
    };

    // 查询参数不参与文件定位
    let file = file.split_once('?').map_or(file, |(file, _)| file);
    if file.is_empty() {
        return internal(source.to_string(), fragment);
    }

    match path::resolve(source, file) {
        Ok(target) => internal(target, fragment),
        Err(e) => LinkKind::Malformed { reason: e.to_string() },
    }
}

fn internal(target: String, fragment: &str) -> LinkKind {
    if fragment.is_empty() {
        return LinkKind::InternalFile { target };
    }

    // 锚点同样按URL解码，无法解码时按原文匹配
    let fragment = match path::decode(fragment) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => fragment.to_string(),
    };
    LinkKind::InternalFragment { target, fragment }
}

/// 提取URL协议部分（`scheme:`），不符合协议语法时返回None
fn scheme_of(href: &str) -> Option<&str> {
    let (scheme, _) = href.split_once(':')?;
    let mut chars = scheme.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    if chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        Some(scheme)
    } else {
        None
    }
}

/// 文档中链接的惰性序列
///
/// 每次调用 [`extract_links`] 都会从头开始产生相同的序列。
pub struct Links<'a> {
    document: &'a Document,
    elements: std::slice::Iter<'a, Element>,
    config: &'a CheckerConfig,
}

impl Iterator for Links<'_> {
    type Item = Link;

    fn next(&mut self) -> Option<Link> {
        for element in self.elements.by_ref() {
            if !self.config.is_link_element(&element.name) {
                continue;
            }
            let Some(href) = element.attr("href") else {
                continue;
            };

            let href = href.trim();
            let text = collapse_whitespace(&element.text);

            return Some(Link {
                source: self.document.id.clone(),
                href: href.to_string(),
                kind: classify(&self.document.id, href, self.config),
                line: element.line,
                text: (!text.is_empty()).then_some(text),
            });
        }
        None
    }
}

/// 按文档顺序提取文档中的链接
pub fn extract_links<'a>(document: &'a Document, config: &'a CheckerConfig) -> Links<'a> {
    Links {
        document,
        elements: document.elements.iter(),
        config,
    }
}

/// 合并连续空白，用作链接上下文
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
