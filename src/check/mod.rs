//! EPUB断链检查模块
//!
//! 处理流程：包视图 → 文档图 → 链接提取 → 链接解析 → 报告。

pub mod checker;
pub mod config;
pub mod graph;
pub mod link;
pub mod markup;
pub mod path;
pub mod report;
pub mod resolve;

pub use checker::{CheckOutcome, LinkChecker};
pub use config::{CheckerConfig, ReportFormat};
pub use graph::{Document, DocumentGraph};
pub use link::{Link, LinkKind, Links, classify, extract_links};
pub use report::{CheckStatus, Report};
pub use resolve::{Finding, FindingReason, Resolution, find_broken, resolve};
