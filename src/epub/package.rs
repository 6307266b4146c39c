//! 包视图模块
//!
//! 断链检查只依赖EPUB包的“清单 + 内容”视图：按清单顺序排列的内容文档、
//! 非文档资源的路径，以及每个内容文档的原始标记。

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// 清单中的一个内容文档
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageEntry {
    /// 包内规范路径，同时作为文档ID
    pub id: String,
    /// 媒体类型
    pub media_type: String,
}

impl PackageEntry {
    pub fn new(id: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            media_type: media_type.into(),
        }
    }

    /// 创建XHTML内容文档
    pub fn xhtml(id: impl Into<String>) -> Self {
        Self::new(id, "application/xhtml+xml")
    }
}

/// EPUB包的清单与内容视图
#[derive(Debug, Clone, Default)]
pub struct Package {
    /// 包文件路径（从内存构建时为空）
    pub source: Option<PathBuf>,
    /// 书名
    pub title: Option<String>,
    /// 内容文档清单（有序）
    pub manifest: Vec<PackageEntry>,
    /// 非文档资源（图片、样式表等）的包内路径
    pub resources: Vec<String>,
    contents: HashMap<String, String>,
}

impl Package {
    /// 创建空的包视图
    pub fn new() -> Self {
        Self::default()
    }

    /// 由清单和内容直接构建包视图
    ///
    /// 清单与内容是否一致由 [`DocumentGraph::build`](crate::check::DocumentGraph::build) 检查。
    pub fn from_parts(manifest: Vec<PackageEntry>, contents: HashMap<String, String>) -> Self {
        Self {
            manifest,
            contents,
            ..Self::default()
        }
    }

    /// 设置包文件路径
    pub fn with_source<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.source = Some(path.as_ref().to_path_buf());
        self
    }

    /// 设置书名
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// 添加XHTML内容文档
    pub fn add_document(&mut self, id: impl Into<String>, content: impl Into<String>) {
        let id = id.into();
        self.contents.insert(id.clone(), content.into());
        self.manifest.push(PackageEntry::xhtml(id));
    }

    /// 添加清单项，内容另行提供
    pub fn add_entry(&mut self, entry: PackageEntry) {
        self.manifest.push(entry);
    }

    /// 设置文档内容
    pub fn set_content(&mut self, id: impl Into<String>, content: impl Into<String>) {
        self.contents.insert(id.into(), content.into());
    }

    /// 添加非文档资源
    pub fn add_resource(&mut self, id: impl Into<String>) {
        self.resources.push(id.into());
    }

    /// 获取文档内容
    pub fn content(&self, id: &str) -> Option<&str> {
        self.contents.get(id).map(String::as_str)
    }

    /// 包的显示名称
    pub fn display_name(&self) -> String {
        match &self.source {
            Some(path) => path.display().to_string(),
            None => "<内存>".to_string(),
        }
    }
}
