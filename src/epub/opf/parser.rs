//! OPF解析器模块
//!
//! 提供OPF（Open Packaging Format）文件的XML解析功能。清单项按其在文件中出现的顺序保存。

use crate::epub::error::{EpubError, Result};
use crate::epub::opf::{manifest::ManifestItem, spine::SpineItem};
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

/// OPF文件解析结果
#[derive(Debug, Clone, Default)]
pub struct Opf {
    /// EPUB版本
    pub version: String,
    /// 书名（dc:title）
    pub title: Option<String>,
    /// 清单项(文件列表)，保持文件中的顺序
    pub manifest: Vec<ManifestItem>,
    /// 脊柱(阅读顺序)
    pub spine: Vec<SpineItem>,
}

/// 当前所在的OPF区块
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Metadata,
    Manifest,
    Spine,
}

impl Opf {
    /// 解析OPF文件内容
    ///
    /// # 参数
    /// * `xml_content` - OPF文件的XML内容
    ///
    /// # 返回值
    /// * `Result<Opf, EpubError>` - 解析后的OPF信息
    pub fn parse_xml(xml_content: &str) -> Result<Opf> {
        let mut reader = Reader::from_str(xml_content);
        reader.config_mut().trim_text(true);
        reader.config_mut().expand_empty_elements = true;

        let mut opf = Opf::default();
        let mut section = Section::None;
        let mut in_title = false;
        let mut title = String::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => match e.local_name().as_ref() {
                    b"package" => {
                        opf.version = find_attr(e, b"version")?.unwrap_or_default();
                    }
                    b"metadata" => section = Section::Metadata,
                    b"manifest" => section = Section::Manifest,
                    b"spine" => section = Section::Spine,
                    b"title" if section == Section::Metadata && opf.title.is_none() => {
                        in_title = true;
                        title.clear();
                    }
                    b"item" if section == Section::Manifest => {
                        if let Some(item) = Self::parse_manifest_item(e)? {
                            opf.manifest.push(item);
                        }
                    }
                    b"itemref" if section == Section::Spine => {
                        if let Some(item) = Self::parse_spine_item(e)? {
                            opf.spine.push(item);
                        }
                    }
                    _ => {}
                },
                Event::End(ref e) => match e.local_name().as_ref() {
                    b"metadata" | b"manifest" | b"spine" => section = Section::None,
                    b"title" if in_title => {
                        in_title = false;
                        let text = title.trim();
                        if !text.is_empty() {
                            opf.title = Some(text.to_string());
                        }
                    }
                    _ => {}
                },
                Event::Text(e) if in_title => {
                    title.push_str(&e.unescape()?);
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(opf)
    }

    /// 解析清单项，缺少必需属性时返回None
    fn parse_manifest_item(e: &BytesStart) -> Result<Option<ManifestItem>> {
        let mut id = String::new();
        let mut href = String::new();
        let mut media_type = String::new();

        for attr_result in e.attributes() {
            let attr = attr_result.map_err(|err| EpubError::XmlError(quick_xml::Error::InvalidAttr(err)))?;
            match attr.key.local_name().as_ref() {
                b"id" => id = attr_value(&attr),
                b"href" => href = attr_value(&attr),
                b"media-type" => media_type = attr_value(&attr),
                _ => {}
            }
        }

        if id.is_empty() || href.is_empty() || media_type.is_empty() {
            log::warn!("忽略不完整的清单项: id={:?} href={:?}", id, href);
            return Ok(None);
        }

        Ok(Some(ManifestItem::new(id, href, media_type)))
    }

    /// 解析脊柱项
    fn parse_spine_item(e: &BytesStart) -> Result<Option<SpineItem>> {
        Ok(find_attr(e, b"idref")?
            .filter(|idref| !idref.is_empty())
            .map(SpineItem::new))
    }

    /// 根据ID获取清单项
    pub fn get_manifest_item(&self, id: &str) -> Option<&ManifestItem> {
        self.manifest.iter().find(|item| item.id == id)
    }

    /// 按清单顺序获取所有内容文档
    pub fn documents(&self) -> impl Iterator<Item = &ManifestItem> {
        self.manifest.iter().filter(|item| item.is_document())
    }

    /// 获取所有非文档资源
    pub fn resources(&self) -> impl Iterator<Item = &ManifestItem> {
        self.manifest.iter().filter(|item| !item.is_document())
    }

    /// 找出脊柱中引用了不存在清单项的ID
    pub fn dangling_spine_refs(&self) -> Vec<&str> {
        self.spine
            .iter()
            .filter(|item| self.get_manifest_item(&item.idref).is_none())
            .map(|item| item.idref.as_str())
            .collect()
    }
}

/// 查找指定属性的值
fn find_attr(e: &BytesStart, name: &[u8]) -> Result<Option<String>> {
    for attr_result in e.attributes() {
        let attr = attr_result.map_err(|err| EpubError::XmlError(quick_xml::Error::InvalidAttr(err)))?;
        if attr.key.local_name().as_ref() == name {
            return Ok(Some(attr_value(&attr)));
        }
    }
    Ok(None)
}

/// 读取属性值，无法反转义时保留原文
fn attr_value(attr: &Attribute) -> String {
    attr.unescape_value()
        .map(|v| v.into_owned())
        .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_OPF: &str = r#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0">
<metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
<dc:title>Python 3 文档</dc:title>
<dc:creator>Python Software Foundation</dc:creator>
</metadata>
<manifest>
<item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
<item id="chap_2" href="text/chap_2.xhtml" media-type="application/xhtml+xml"/>
<item id="chap_1" href="text/chap_1.xhtml" media-type="application/xhtml+xml"/>
<item id="css" href="style/main.css" media-type="text/css"/>
<item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
<item id="broken" href="missing-type.xhtml"/>
</manifest>
<spine toc="ncx">
<itemref idref="nav" linear="no"/>
<itemref idref="chap_1"/>
<itemref idref="chap_2"/>
</spine>
</package>"#;

    #[test]
    fn test_parse_sample_opf() {
        let opf = Opf::parse_xml(SAMPLE_OPF).expect("解析OPF失败");

        assert_eq!(opf.version, "3.0");
        assert_eq!(opf.title.as_deref(), Some("Python 3 文档"));
        assert_eq!(opf.manifest.len(), 5);
        assert_eq!(opf.spine.len(), 3);
        assert_eq!(opf.spine[1].idref, "chap_1");
    }

    #[test]
    fn test_documents_keep_manifest_order() {
        let opf = Opf::parse_xml(SAMPLE_OPF).unwrap();

        let documents: Vec<&str> = opf.documents().map(|item| item.href.as_str()).collect();
        assert_eq!(documents, vec!["nav.xhtml", "text/chap_2.xhtml", "text/chap_1.xhtml"]);

        let resources: Vec<&str> = opf.resources().map(|item| item.href.as_str()).collect();
        assert_eq!(resources, vec!["style/main.css", "toc.ncx"]);
    }

    #[test]
    fn test_dangling_spine_refs() {
        let opf = Opf::parse_xml(
            r#"<package version="2.0"><manifest><item id="a" href="a.xhtml" media-type="application/xhtml+xml"/></manifest>
<spine><itemref idref="a"/><itemref idref="ghost"/></spine></package>"#,
        )
        .unwrap();

        assert_eq!(opf.title, None);
        assert_eq!(opf.dangling_spine_refs(), vec!["ghost"]);
    }

    #[test]
    fn test_escaped_href() {
        let opf = Opf::parse_xml(
            r#"<package version="3.0"><manifest><item id="q" href="q&amp;a.xhtml" media-type="application/xhtml+xml"/></manifest></package>"#,
        )
        .unwrap();
        assert_eq!(opf.manifest[0].href, "q&a.xhtml");
    }
}
