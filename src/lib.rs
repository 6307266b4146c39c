pub mod epub;
pub mod check;

// === 核心API重新导出 ===

/// 断链检查器（主要接口）
pub use check::{CheckOutcome, LinkChecker};

/// 检查配置
pub use check::{CheckerConfig, ReportFormat};

/// 检查结果
pub use check::{CheckStatus, Finding, FindingReason, Report};

/// 错误处理
pub use epub::{EpubError, Result};

// === 底层组件（高级用法） ===

/// EPUB读取与包视图
pub use epub::{Epub, Package, PackageEntry};

/// 文档图与链接
pub use check::{Document, DocumentGraph, Link, LinkKind};

// === 库信息 ===

/// 库的版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 库的描述
pub const DESCRIPTION: &str = "EPUB内部链接与锚点的断链检查工具";

// === 便捷函数 ===

/// 检查EPUB文件中的断链
///
/// 这是 `LinkChecker::check_path` 的便捷包装函数，不写入报告文件。
///
/// # 参数
/// * `path` - EPUB文件路径
/// * `config` - 检查配置
///
/// # 返回值
/// * `Result<Report>` - 检查报告；包无法打开或结构错误时返回错误
///
/// # 示例
///
/// ```rust,no_run
/// use epub_linkcheck::CheckerConfig;
///
/// let report = epub_linkcheck::check("book.epub", CheckerConfig::default())?;
/// println!("断链数: {}", report.findings().len());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn check<P: AsRef<std::path::Path>>(path: P, config: CheckerConfig) -> Result<Report> {
    LinkChecker::new(config).check_path(path)
}
