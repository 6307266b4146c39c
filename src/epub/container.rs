//! container.xml解析模块
//!
//! 定位包内的OPF文件。

use crate::check::path;
use crate::epub::error::{EpubError, Result};
use quick_xml::events::Event;
use quick_xml::reader::Reader;

/// container.xml在包内的路径
pub const CONTAINER_PATH: &str = "META-INF/container.xml";

/// OPF文件的媒体类型
const OPF_MEDIA_TYPE: &str = "application/oebps-package+xml";

/// Container.xml中的rootfile信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootFile {
    pub full_path: String,
    pub media_type: String,
}

/// Container.xml的解析结果
#[derive(Debug, Clone)]
pub struct Container {
    pub rootfiles: Vec<RootFile>,
}

impl Container {
    /// 解析container.xml内容
    ///
    /// # 参数
    /// * `xml_content` - container.xml的文件内容
    ///
    /// # 返回值
    /// * `Result<Container, EpubError>` - 解析后的Container信息
    pub fn parse_xml(xml_content: &str) -> Result<Container> {
        let mut reader = Reader::from_str(xml_content);
        reader.config_mut().trim_text(true);
        reader.config_mut().expand_empty_elements = true;

        let mut rootfiles = Vec::new();
        let mut buf = Vec::new();
        let mut in_rootfiles = false;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => match e.local_name().as_ref() {
                    b"rootfiles" => in_rootfiles = true,
                    b"rootfile" if in_rootfiles => {
                        let mut full_path = String::new();
                        let mut media_type = String::new();

                        for attr_result in e.attributes() {
                            let attr = attr_result.map_err(|e| EpubError::XmlError(quick_xml::Error::InvalidAttr(e)))?;
                            let value = attr.unescape_value()?.into_owned();
                            match attr.key.local_name().as_ref() {
                                b"full-path" => full_path = value,
                                b"media-type" => media_type = value,
                                _ => {}
                            }
                        }

                        if !full_path.is_empty() {
                            rootfiles.push(RootFile { full_path, media_type });
                        }
                    }
                    _ => {}
                },
                Event::End(ref e) => {
                    if e.local_name().as_ref() == b"rootfiles" {
                        in_rootfiles = false;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if rootfiles.is_empty() {
            return Err(EpubError::ContainerParseError("没有找到任何rootfile条目".to_string()));
        }

        Ok(Container { rootfiles })
    }

    /// 获取主要的OPF文件路径
    ///
    /// 优先选择 `application/oebps-package+xml` 类型的rootfile，返回包内规范路径。
    ///
    /// # 错误
    /// 路径无法规范化时返回 `MalformedPackage`。
    pub fn get_opf_path(&self) -> Result<String> {
        let rootfile = self
            .rootfiles
            .iter()
            .find(|rf| rf.media_type == OPF_MEDIA_TYPE)
            .or_else(|| self.rootfiles.first())
            .ok_or_else(|| EpubError::ContainerParseError("container.xml中没有找到有效的rootfile".to_string()))?;

        path::canonicalize(&rootfile.full_path)
            .map_err(|e| EpubError::malformed(CONTAINER_PATH, format!("rootfile路径 {} 无效: {}", rootfile.full_path, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_container_xml() {
        let container_xml = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
    <rootfiles>
        <rootfile full-path="OEBPS/toc.ncx" media-type="application/x-dtbncx+xml"/>
        <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
    </rootfiles>
</container>"#;

        let container = Container::parse_xml(container_xml).unwrap();
        assert_eq!(container.rootfiles.len(), 2);
        assert_eq!(container.rootfiles[0].full_path, "OEBPS/toc.ncx");
        assert_eq!(container.get_opf_path().unwrap(), "OEBPS/content.opf");
    }

    #[test]
    fn test_opf_path_is_canonical() {
        let container = Container {
            rootfiles: vec![RootFile {
                full_path: "./OEBPS/../content.opf".to_string(),
                media_type: String::new(),
            }],
        };
        assert_eq!(container.get_opf_path().unwrap(), "content.opf");
    }

    #[test]
    fn test_opf_path_outside_package() {
        let container = Container {
            rootfiles: vec![RootFile {
                full_path: "../content.opf".to_string(),
                media_type: OPF_MEDIA_TYPE.to_string(),
            }],
        };
        assert!(matches!(container.get_opf_path(), Err(EpubError::MalformedPackage { .. })));
    }

    #[test]
    fn test_missing_rootfile() {
        let result = Container::parse_xml("<container><rootfiles></rootfiles></container>");
        assert!(matches!(result, Err(EpubError::ContainerParseError(_))));
    }
}
