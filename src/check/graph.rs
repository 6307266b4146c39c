//! 文档图模块
//!
//! 根据包清单构建只读的文档图：每个内容文档及其定义的锚点集合，
//! 以及可作为链接目标的非文档资源。

use crate::check::config::CheckerConfig;
use crate::check::markup::{self, Element, MarkupKind};
use crate::epub::error::{EpubError, Result};
use crate::epub::package::Package;
use std::collections::{HashMap, HashSet};

/// 文档图中的一个内容文档
#[derive(Debug, Clone)]
pub struct Document {
    /// 包内规范路径
    pub id: String,
    pub media_type: String,
    /// 按文档顺序排列的元素
    pub elements: Vec<Element>,
    /// 文档内定义的锚点
    pub anchors: HashSet<String>,
}

impl Document {
    /// 解析文档标记并收集锚点
    ///
    /// 锚点来自任意元素的 `id` 属性（包括 `xml:id`）以及 `<a>` 元素的 `name` 属性。
    pub fn parse(id: &str, media_type: &str, content: &str, config: &CheckerConfig) -> Result<Self> {
        let kind = MarkupKind::from_media_type(media_type).ok_or_else(|| {
            EpubError::malformed(id, format!("不支持的文档媒体类型: {}", media_type))
        })?;

        let elements = markup::parse(content, kind, |name| config.is_link_element(name))
            .map_err(|e| EpubError::malformed(id, format!("标记无法解析: {}", e)))?;

        let mut anchors = HashSet::new();
        for element in &elements {
            let is_anchor_link = element.name == "a";
            for attr in &element.attributes {
                // `id` 与 `xml:id` 去掉前缀后同名，两者都要收集
                if attr.name == "id" || (is_anchor_link && attr.name == "name") {
                    anchors.insert(attr.value.clone());
                }
            }
        }

        Ok(Self {
            id: id.to_string(),
            media_type: media_type.to_string(),
            elements,
            anchors,
        })
    }

    /// 检查文档是否定义了锚点
    pub fn has_anchor(&self, anchor: &str) -> bool {
        self.anchors.contains(anchor)
    }
}

/// 文档图，构建后只读
#[derive(Debug, Clone, Default)]
pub struct DocumentGraph {
    documents: Vec<Document>,
    index: HashMap<String, usize>,
    resources: HashSet<String>,
}

impl DocumentGraph {
    /// 从包视图构建文档图
    ///
    /// # 错误
    /// 清单项缺少内容、清单ID重复或标记无法解析时返回 `MalformedPackage`。
    pub fn build(package: &Package, config: &CheckerConfig) -> Result<Self> {
        let mut graph = DocumentGraph::default();

        for entry in &package.manifest {
            if graph.index.contains_key(&entry.id) {
                return Err(EpubError::malformed(&entry.id, "清单中的文档ID重复"));
            }

            let content = package
                .content(&entry.id)
                .ok_or_else(|| EpubError::malformed(&entry.id, "清单引用的文件没有对应内容"))?;

            let document = Document::parse(&entry.id, &entry.media_type, content, config)?;
            log::debug!("📄 {}: {} 个元素, {} 个锚点", document.id, document.elements.len(), document.anchors.len());

            graph.index.insert(entry.id.clone(), graph.documents.len());
            graph.documents.push(document);
        }

        for resource in &package.resources {
            if !graph.index.contains_key(resource) {
                graph.resources.insert(resource.clone());
            }
        }

        Ok(graph)
    }

    /// 按清单顺序排列的文档
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// 根据ID获取文档
    pub fn document(&self, id: &str) -> Option<&Document> {
        self.index.get(id).map(|&i| &self.documents[i])
    }

    /// 文档的锚点集合
    pub fn anchors(&self, id: &str) -> Option<&HashSet<String>> {
        self.document(id).map(|d| &d.anchors)
    }

    /// 检查路径是否为非文档资源
    pub fn is_resource(&self, id: &str) -> bool {
        self.resources.contains(id)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
