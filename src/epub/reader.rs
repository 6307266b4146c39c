use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use zip::ZipArchive;
use zip::result::ZipError;

use crate::check::path;
use crate::epub::container::{CONTAINER_PATH, Container};
use crate::epub::error::{EpubError, Result};
use crate::epub::opf::{ManifestItem, Opf};
use crate::epub::package::{Package, PackageEntry};

/// EPUB的mimetype
const EPUB_MIMETYPE: &str = "application/epub+zip";

/// 表示一个EPUB文件
pub struct Epub {
    path: PathBuf,
    archive: ZipArchive<File>,
}

impl Epub {
    /// 从文件路径创建Epub实例
    ///
    /// # 参数
    /// * `path` - epub文件的路径
    ///
    /// # 返回值
    /// * `Result<Epub, EpubError>` - 成功返回Epub实例，失败返回错误
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Epub> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let archive = ZipArchive::new(file)?;

        let mut epub = Epub {
            path: path.to_path_buf(),
            archive,
        };
        epub.validate()?;

        Ok(epub)
    }

    /// 验证EPUB文件的合法性
    ///
    /// 检查步骤：
    /// 1. 检查是否存在mimetype文件
    /// 2. 验证mimetype文件的内容是否为"application/epub+zip"
    fn validate(&mut self) -> Result<()> {
        let mut file = match self.archive.by_name("mimetype") {
            Ok(file) => file,
            Err(_) => return Err(EpubError::MissingMimetype),
        };

        let mut content = String::new();
        file.read_to_string(&mut content)?;

        // 去除可能的换行符和空白字符
        let content = content.trim();
        if content != EPUB_MIMETYPE {
            return Err(EpubError::InvalidMimetype {
                expected: EPUB_MIMETYPE.to_string(),
                found: content.to_string(),
            });
        }

        log::debug!("✅ EPUB验证成功: mimetype文件正确");
        Ok(())
    }

    /// 提取指定文件的内容
    ///
    /// # 参数
    /// * `filename` - 要提取的文件名
    ///
    /// # 返回值
    /// * `Result<String, EpubError>` - 文件内容
    pub fn extract_file(&mut self, filename: &str) -> Result<String> {
        let mut file = self.archive.by_name(filename)?;
        let mut content = String::new();
        file.read_to_string(&mut content)?;
        Ok(content)
    }

    /// 解析container.xml文件
    ///
    /// # 返回值
    /// * `Result<Container, EpubError>` - 解析后的Container信息
    pub fn parse_container(&mut self) -> Result<Container> {
        let container_content = self.extract_file(CONTAINER_PATH).map_err(|e| match e {
            EpubError::Zip(ZipError::FileNotFound) => EpubError::InvalidEpub(format!("缺少{}", CONTAINER_PATH)),
            other => other,
        })?;
        Container::parse_xml(&container_content)
    }

    /// 获取主要的OPF文件路径
    ///
    /// # 返回值
    /// * `Result<String, EpubError>` - OPF文件的包内规范路径
    pub fn get_opf_path(&mut self) -> Result<String> {
        self.parse_container()?.get_opf_path()
    }

    /// 解析OPF文件
    ///
    /// # 返回值
    /// * `Result<Opf, EpubError>` - 解析后的OPF信息
    fn parse_opf_at(&mut self, opf_path: &str) -> Result<Opf> {
        let opf_content = self.extract_file(opf_path).map_err(|e| match e {
            EpubError::Zip(ZipError::FileNotFound) => EpubError::malformed(opf_path, "container.xml引用的OPF文件不存在"),
            other => other,
        })?;

        Opf::parse_xml(&opf_content).map_err(|e| match e {
            EpubError::XmlError(xml_err) => EpubError::OpfParseError(format!("XML解析错误: {}", xml_err)),
            other => other,
        })
    }

    /// 读取包的清单与内容视图
    ///
    /// 清单中的href经百分号解码后相对于OPF文件解析为包内规范路径。内容文档按清单顺序读取，
    /// 其余清单项作为资源记录。清单中存在但压缩包中缺失的文档不会在这里报错，
    /// 由文档图构建时作为包结构错误报告。
    ///
    /// # 错误
    /// * OPF无法定位或解析
    /// * 清单href无法规范化，或脊柱引用了不存在的清单项
    /// * 内容文档无法读取或不是UTF-8文本
    pub fn load_package(&mut self) -> Result<Package> {
        let opf_path = self.get_opf_path()?;
        let opf = self.parse_opf_at(&opf_path)?;
        log::debug!("📦 OPF: {} (EPUB {}), {} 个清单项", opf_path, opf.version, opf.manifest.len());

        if let Some(idref) = opf.dangling_spine_refs().first() {
            return Err(EpubError::malformed(&opf_path, format!("脊柱引用了不存在的清单项: {}", idref)));
        }

        let mut package = Package::new().with_source(&self.path);
        package.title = opf.title.clone();

        for item in opf.documents() {
            let id = resolve_href(&opf_path, item)?;
            if let Some(content) = self.read_document(&id)? {
                package.set_content(&id, content);
            }
            package.add_entry(PackageEntry::new(id, item.media_type.clone()));
        }

        for item in opf.resources() {
            package.add_resource(resolve_href(&opf_path, item)?);
        }

        log::info!(
            "📚 读取了 {} 个内容文档和 {} 个资源",
            package.manifest.len(),
            package.resources.len()
        );
        Ok(package)
    }

    /// 读取内容文档，压缩包中不存在时返回None
    fn read_document(&mut self, id: &str) -> Result<Option<String>> {
        let mut file = match self.archive.by_name(id) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => {
                log::warn!("清单中的文档在压缩包中不存在: {}", id);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .map_err(|e| EpubError::malformed(id, format!("无法读取文档: {}", e)))?;

        let mut content = String::from_utf8(bytes).map_err(|_| EpubError::malformed(id, "文档不是有效的UTF-8文本"))?;
        if content.starts_with('\u{feff}') {
            content.remove(0);
        }
        Ok(Some(content))
    }
}

/// 把清单href（URL，可能带百分号编码）解析为包内规范路径
fn resolve_href(opf_path: &str, item: &ManifestItem) -> Result<String> {
    path::resolve(opf_path, &item.href).map_err(|e| {
        EpubError::malformed(opf_path, format!("清单项 {} 的路径 {} 无效: {}", item.id, item.href, e))
    })
}
