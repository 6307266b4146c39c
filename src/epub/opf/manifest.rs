//! 清单模块
//!
//! 提供EPUB包中文件清单的结构定义。

use crate::check::markup::MarkupKind;

/// 清单项信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    /// 项目ID
    pub id: String,
    /// 文件路径(相对于OPF文件)
    pub href: String,
    /// 媒体类型
    pub media_type: String,
}

impl ManifestItem {
    /// 创建新的清单项
    pub fn new(id: impl Into<String>, href: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            href: href.into(),
            media_type: media_type.into(),
        }
    }

    /// 标记类型，非内容文档返回None
    pub fn markup_kind(&self) -> Option<MarkupKind> {
        MarkupKind::from_media_type(&self.media_type)
    }

    /// 检查是否为需要检查链接的内容文档
    pub fn is_document(&self) -> bool {
        self.markup_kind().is_some()
    }
}
