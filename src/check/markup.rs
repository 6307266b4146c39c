//! 标记树模块
//!
//! 把文档标记解析为按文档顺序排列的元素列表。XHTML使用quick_xml严格解析，
//! 语法错误会作为错误返回；`text/html` 文档使用scraper宽松解析。

use once_cell::sync::Lazy;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use scraper::{Html, Selector};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// 全部元素的选择器
static ALL_ELEMENTS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("*").expect("常量选择器必须合法"));

/// 文档的标记类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkupKind {
    /// `application/xhtml+xml`，严格XML解析
    Xhtml,
    /// `text/html`，宽松HTML解析
    Html,
}

impl MarkupKind {
    /// 根据媒体类型确定标记类型，非文档类型返回None
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        // 忽略 `; charset=utf-8` 之类的参数
        let essence = media_type.split(';').next().unwrap_or_default();
        match essence.trim().to_ascii_lowercase().as_str() {
            "application/xhtml+xml" => Some(MarkupKind::Xhtml),
            "text/html" => Some(MarkupKind::Html),
            _ => None,
        }
    }
}

/// 元素属性
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// 去掉命名空间前缀的小写属性名
    pub name: String,
    pub value: String,
}

/// 标记树中的一个元素
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// 去掉命名空间前缀的小写元素名
    pub name: String,
    pub attributes: Vec<Attribute>,
    /// 起始标签所在行（从1开始），宽松解析时未知
    pub line: Option<usize>,
    /// 元素内的文本，只对需要采集文本的元素填充
    pub text: String,
}

impl Element {
    /// 获取属性值
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }
}

/// 标记解析错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupError {
    pub line: usize,
    pub message: String,
}

impl Display for MarkupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "第{}行: {}", self.line, self.message)
    }
}

impl std::error::Error for MarkupError {}

/// 解析文档标记
///
/// # 参数
/// * `content` - 文档的原始标记
/// * `kind` - 标记类型
/// * `capture_text` - 判断元素（按小写本地名）是否需要采集内部文本
///
/// # 返回值
/// * `Result<Vec<Element>, MarkupError>` - 按文档顺序排列的元素
pub fn parse<F>(content: &str, kind: MarkupKind, capture_text: F) -> Result<Vec<Element>, MarkupError>
where
    F: Fn(&str) -> bool,
{
    match kind {
        MarkupKind::Xhtml => parse_xhtml(content, capture_text),
        MarkupKind::Html => Ok(parse_html(content, capture_text)),
    }
}

/// 按字节偏移计算行号，只向前推进
struct LineCounter<'a> {
    content: &'a str,
    offset: usize,
    line: usize,
}

impl<'a> LineCounter<'a> {
    fn new(content: &'a str) -> Self {
        Self { content, offset: 0, line: 1 }
    }

    fn line_at(&mut self, position: usize) -> usize {
        let position = position.min(self.content.len());
        if position > self.offset {
            let skipped = &self.content.as_bytes()[self.offset..position];
            self.line += skipped.iter().filter(|&&b| b == b'\n').count();
            self.offset = position;
        }
        self.line
    }
}

/// 严格解析XHTML
fn parse_xhtml<F>(content: &str, capture_text: F) -> Result<Vec<Element>, MarkupError>
where
    F: Fn(&str) -> bool,
{
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(false);
    reader.config_mut().check_end_names = true;

    let mut lines = LineCounter::new(content);
    let mut elements = Vec::new();
    // 已打开元素的 (名称, 在elements中的下标)
    let mut open: Vec<(String, usize)> = Vec::new();
    // 正在采集文本的元素下标
    let mut capturing: Vec<usize> = Vec::new();
    let mut buf = Vec::new();

    loop {
        let position = usize::try_from(reader.buffer_position()).unwrap_or(usize::MAX);
        let line = lines.line_at(position);

        let event = reader.read_event_into(&mut buf).map_err(|e| MarkupError {
            line,
            message: e.to_string(),
        })?;

        match event {
            Event::Start(ref e) => {
                let element = read_element(e, line)?;
                if capture_text(element.name.as_str()) {
                    capturing.push(elements.len());
                }
                open.push((element.name.clone(), elements.len()));
                elements.push(element);
            }
            Event::Empty(ref e) => {
                elements.push(read_element(e, line)?);
            }
            Event::End(ref e) => {
                let name = local_name(e.local_name().as_ref());
                match open.pop() {
                    Some((open_name, index)) if open_name == name => {
                        if capturing.last() == Some(&index) {
                            capturing.pop();
                        }
                    }
                    Some((open_name, _)) => {
                        return Err(MarkupError {
                            line,
                            message: format!("结束标签 </{}> 与 <{}> 不匹配", name, open_name),
                        });
                    }
                    None => {
                        return Err(MarkupError {
                            line,
                            message: format!("多余的结束标签 </{}>", name),
                        });
                    }
                }
            }
            Event::Text(ref e) => {
                let text = e
                    .unescape()
                    .map(|t| t.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(e).into_owned());
                append_text(&mut elements, &capturing, &text);
            }
            Event::CData(ref e) => {
                append_text(&mut elements, &capturing, &String::from_utf8_lossy(e));
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some((name, index)) = open.last() {
        return Err(MarkupError {
            line: elements[*index].line.unwrap_or(1),
            message: format!("元素 <{}> 没有闭合", name),
        });
    }

    Ok(elements)
}

/// 把文本追加到所有正在采集文本的元素
fn append_text(elements: &mut [Element], capturing: &[usize], text: &str) {
    for &index in capturing {
        elements[index].text.push_str(text);
    }
}

/// 读取起始标签的名称和属性
fn read_element(e: &BytesStart, line: usize) -> Result<Element, MarkupError> {
    let mut attributes = Vec::new();

    for attr_result in e.attributes() {
        let attr = attr_result.map_err(|err| MarkupError {
            line,
            message: format!("属性解析错误: {}", err),
        })?;
        let value = attr
            .unescape_value()
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
        attributes.push(Attribute {
            name: local_name(attr.key.local_name().as_ref()),
            value,
        });
    }

    Ok(Element {
        name: local_name(e.local_name().as_ref()),
        attributes,
        line: Some(line),
        text: String::new(),
    })
}

fn local_name(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).to_ascii_lowercase()
}

/// 宽松解析HTML
fn parse_html<F>(content: &str, capture_text: F) -> Vec<Element>
where
    F: Fn(&str) -> bool,
{
    let document = Html::parse_document(content);
    if !document.errors.is_empty() {
        log::warn!("HTML解析时修正了 {} 处错误", document.errors.len());
    }

    document
        .select(&ALL_ELEMENTS)
        .map(|element| {
            let value = element.value();
            let name = value.name().to_ascii_lowercase();
            let text = if capture_text(name.as_str()) {
                element.text().collect()
            } else {
                String::new()
            };
            Element {
                name,
                attributes: value
                    .attrs()
                    .map(|(name, value)| Attribute {
                        name: local_name(name.rsplit(':').next().unwrap_or(name).as_bytes()),
                        value: value.to_string(),
                    })
                    .collect(),
                line: None,
                text,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_link(name: &str) -> bool {
        name == "a"
    }

    const CHAPTER: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<head><title>第一章</title></head>
<body>
<h1 id="top">第一章</h1>
<p>见<a href="chap2.xhtml#sec1">第二章 <em>第一节</em></a>。</p>
<p xml:id="legacy"><a href="#top"/></p>
</body>
</html>"##;

    #[test]
    fn test_parse_xhtml_elements() {
        let elements = parse(CHAPTER, MarkupKind::Xhtml, is_link).unwrap();
        let names: Vec<&str> = elements.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["html", "head", "title", "body", "h1", "p", "a", "em", "p", "a"]);

        let h1 = &elements[4];
        assert_eq!(h1.attr("id"), Some("top"));
        assert_eq!(h1.line, Some(6));

        let link = &elements[6];
        assert_eq!(link.attr("href"), Some("chap2.xhtml#sec1"));
        assert_eq!(link.text, "第二章 第一节");
        assert_eq!(link.line, Some(7));

        assert_eq!(elements[8].attr("id"), Some("legacy"));
        assert_eq!(elements[9].attr("href"), Some("#top"));
        assert_eq!(elements[9].text, "");
    }

    #[test]
    fn test_xhtml_mismatched_end_tag() {
        let result = parse("<html><body><p>文本</div></body></html>", MarkupKind::Xhtml, is_link);
        assert!(result.is_err());
    }

    #[test]
    fn test_xhtml_unclosed_element() {
        let result = parse("<html>\n<body>\n<p>文本", MarkupKind::Xhtml, is_link);
        assert!(result.is_err());
    }

    #[test]
    fn test_xhtml_duplicate_attribute() {
        let result = parse(r#"<html><p id="a" id="b"/></html>"#, MarkupKind::Xhtml, is_link);
        assert!(result.is_err());
    }

    #[test]
    fn test_xhtml_unknown_entity_is_kept() {
        let elements = parse("<html><a href=\"x.xhtml\">a&nbsp;b</a></html>", MarkupKind::Xhtml, is_link).unwrap();
        assert_eq!(elements[1].text, "a&nbsp;b");
    }

    #[test]
    fn test_parse_html_is_lenient() {
        let elements = parse("<p id=intro>Intro<a href='chap1.html'>Chapter 1</a>", MarkupKind::Html, is_link).unwrap();
        let link = elements.iter().find(|e| e.name == "a").unwrap();
        assert_eq!(link.attr("href"), Some("chap1.html"));
        assert_eq!(link.text, "Chapter 1");
        assert_eq!(link.line, None);
        assert!(elements.iter().any(|e| e.attr("id") == Some("intro")));
    }

    #[test]
    fn test_markup_kind_from_media_type() {
        assert_eq!(MarkupKind::from_media_type("application/xhtml+xml"), Some(MarkupKind::Xhtml));
        assert_eq!(MarkupKind::from_media_type("text/html"), Some(MarkupKind::Html));
        assert_eq!(MarkupKind::from_media_type("image/png"), None);
        assert_eq!(
            MarkupKind::from_media_type("application/xhtml+xml; charset=utf-8"),
            Some(MarkupKind::Xhtml)
        );
        assert_eq!(MarkupKind::from_media_type("Text/HTML ;charset=gbk"), Some(MarkupKind::Html));
        assert_eq!(MarkupKind::from_media_type("text/css; charset=utf-8"), None);
    }
}
