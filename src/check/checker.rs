//! 断链检查驱动模块
//!
//! 先同步构建文档图，再按文档并行提取和解析链接，最后按清单顺序合并结果。

use crate::check::config::CheckerConfig;
use crate::check::graph::{Document, DocumentGraph};
use crate::check::link::extract_links;
use crate::check::report::Report;
use crate::check::resolve::{Finding, find_broken};
use crate::epub::error::Result;
use crate::epub::package::Package;
use crate::epub::reader::Epub;
use chrono::Local;
use std::path::{Path, PathBuf};

/// 单个文档的检查结果
#[derive(Debug, Default)]
struct DocumentResult {
    links: usize,
    external: usize,
    findings: Vec<Finding>,
}

/// 一次完整运行的结果
#[derive(Debug)]
pub struct CheckOutcome {
    pub report: Report,
    /// 报告文件路径（未写入文件时为None）
    pub report_path: Option<PathBuf>,
}

/// EPUB断链检查器
#[derive(Debug, Clone, Default)]
pub struct LinkChecker {
    config: CheckerConfig,
}

impl LinkChecker {
    pub fn new(config: CheckerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    /// 检查EPUB文件并按配置写入报告
    ///
    /// # 参数
    /// * `path` - EPUB文件路径
    ///
    /// # 返回值
    /// * `Result<CheckOutcome>` - 报告及报告文件路径；包无法打开时返回错误
    pub fn run<P: AsRef<Path>>(&self, path: P) -> Result<CheckOutcome> {
        let path = path.as_ref();
        let report = self.check_path(path)?;

        let report_path = if self.config.write_report {
            let dir = match &self.config.output_dir {
                Some(dir) => dir.clone(),
                None => path
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_default(),
            };
            Some(report.write_to(dir, self.config.report_format)?)
        } else {
            None
        };

        Ok(CheckOutcome { report, report_path })
    }

    /// 打开EPUB文件并检查
    pub fn check_path<P: AsRef<Path>>(&self, path: P) -> Result<Report> {
        let mut epub = Epub::new(path.as_ref())?;
        let package = epub.load_package()?;
        self.check_package(&package)
    }

    /// 检查包视图
    ///
    /// 包结构错误时在产生任何断链结果之前返回 `MalformedPackage`。
    pub fn check_package(&self, package: &Package) -> Result<Report> {
        let graph = DocumentGraph::build(package, &self.config)?;

        let mut report = Report::new(package.display_name(), Local::now());
        report.title = package.title.clone();
        self.fill_report(&graph, &mut report);
        Ok(report)
    }

    /// 检查已构建的文档图，把结果填入报告
    pub fn fill_report(&self, graph: &DocumentGraph, report: &mut Report) {
        let results = self.check_documents(graph);

        report.documents_checked = graph.len();
        for result in results {
            report.links_checked += result.links;
            report.external_links += result.external;
            report.findings.extend(result.findings);
        }

        log::info!(
            "检查了 {} 个文档中的 {} 个链接，发现 {} 个断链",
            report.documents_checked,
            report.links_checked,
            report.findings.len()
        );
    }

    /// 检查文档图中的全部文档，结果按清单顺序返回
    fn check_documents(&self, graph: &DocumentGraph) -> Vec<DocumentResult> {
        let documents = graph.documents();
        let jobs = self.config.effective_jobs().min(documents.len()).max(1);

        if jobs == 1 {
            return documents
                .iter()
                .map(|document| self.check_document(graph, document))
                .collect();
        }

        let chunk_size = documents.len().div_ceil(jobs);
        log::debug!("使用 {} 个线程检查 {} 个文档", jobs, documents.len());

        std::thread::scope(|scope| {
            let handles: Vec<_> = documents
                .chunks(chunk_size)
                .map(|chunk| {
                    scope.spawn(move || {
                        chunk
                            .iter()
                            .map(|document| self.check_document(graph, document))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            // 按分块顺序合并，保证输出与线程调度无关
            handles
                .into_iter()
                .flat_map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
                })
                .collect()
        })
    }

    /// 提取并解析单个文档中的链接
    fn check_document(&self, graph: &DocumentGraph, document: &Document) -> DocumentResult {
        let mut result = DocumentResult::default();

        for link in extract_links(document, &self.config) {
            result.links += 1;
            if link.is_external() {
                result.external += 1;
            }
            if let Some(finding) = find_broken(graph, &link, self.config.report_external) {
                result.findings.push(finding);
            }
        }

        log::debug!(
            "🔗 {}: {} 个链接, {} 个断链",
            document.id,
            result.links,
            result.findings.len()
        );
        result
    }
}
