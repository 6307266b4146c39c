pub mod error;
pub mod container;
pub mod reader;
pub mod opf;
pub mod package;

// 重新导出错误处理
pub use error::{EpubError, Result};

// 重新导出容器相关
pub use container::{Container, RootFile};

// 重新导出EPUB读取器和包视图
pub use reader::Epub;
pub use package::{Package, PackageEntry};

// 重新导出OPF相关
pub use opf::{ManifestItem, Opf, SpineItem};
