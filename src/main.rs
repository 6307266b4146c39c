use clap::Parser;
use epub_linkcheck::check::config::DEFAULT_CONFIG_PATH;
use epub_linkcheck::{CheckOutcome, CheckerConfig, LinkChecker, Report, ReportFormat, Result};
use std::path::PathBuf;
use std::process::ExitCode;

/// 📚 EPUB断链检查工具
#[derive(Parser)]
#[command(name = "epub-linkcheck")]
#[command(about = "检查EPUB文件中的内部链接和锚点是否有效")]
#[command(version)]
struct Args {
    /// EPUB文件路径
    #[arg(help = "要检查的EPUB文件路径")]
    epub_file: PathBuf,

    /// 配置文件路径
    #[arg(short, long, help = "YAML配置文件路径（不存在时生成默认配置）")]
    config: Option<PathBuf>,

    /// 报告输出目录
    #[arg(short, long, help = "报告输出目录（默认为EPUB文件所在目录）")]
    output_dir: Option<PathBuf>,

    /// 报告格式
    #[arg(long, value_enum, help = "报告文件格式")]
    format: Option<FormatArg>,

    /// 报告外部链接
    #[arg(long, help = "把外部链接也记录到报告中")]
    report_external: bool,

    /// 工作线程数
    #[arg(short, long, help = "并行检查的线程数（0表示使用全部CPU）")]
    jobs: Option<usize>,

    /// 不写入报告文件
    #[arg(long, help = "只在终端输出结果，不写入报告文件")]
    no_report: bool,

    /// 详细输出模式
    #[arg(short, long, help = "显示详细信息")]
    verbose: bool,
}

/// 报告格式
#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    /// 纯文本报告（.log）
    Text,
    /// JSON报告（.json）
    Json,
}

impl From<FormatArg> for ReportFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Text => ReportFormat::Text,
            FormatArg::Json => ReportFormat::Json,
        }
    }
}

/// 退出码：包无法打开或结构错误
const EXIT_FATAL: u8 = 2;

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    println!("📚 EPUB断链检查工具 v{}", epub_linkcheck::VERSION);
    println!("正在检查EPUB文件: {}", args.epub_file.display());

    match run(&args) {
        Ok(outcome) => {
            print_summary(&outcome.report, args.verbose);
            if let Some(path) = &outcome.report_path {
                println!("📝 报告已保存到: {}", path.display());
            }
            ExitCode::from(outcome.report.status().exit_code())
        }
        Err(e) => {
            eprintln!("❌ 错误: {}", e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

/// 根据详细模式初始化日志
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn run(args: &Args) -> Result<CheckOutcome> {
    let config = load_config(args)?;
    if args.verbose {
        println!(
            "🔍 外部协议: {} 个, 线程数: {}, 报告格式: {:?}",
            config.external_schemes.len(),
            config.effective_jobs(),
            config.report_format
        );
    }

    LinkChecker::new(config).run(&args.epub_file)
}

/// 加载配置文件并应用命令行参数
fn load_config(args: &Args) -> Result<CheckerConfig> {
    // 未指定配置文件时，使用当前目录下已存在的默认配置
    let config_path = args.config.clone().or_else(|| {
        let path = PathBuf::from(DEFAULT_CONFIG_PATH);
        path.exists().then_some(path)
    });

    let mut config = CheckerConfig::load(config_path.as_deref())?;
    if let Some(path) = &config_path {
        log::info!("使用配置文件: {}", path.display());
    }

    if let Some(dir) = &args.output_dir {
        config.output_dir = Some(dir.clone());
    }
    if let Some(format) = args.format {
        config.report_format = format.into();
    }
    if let Some(jobs) = args.jobs {
        config.jobs = jobs;
    }
    if args.report_external {
        config.report_external = true;
    }
    if args.no_report {
        config.write_report = false;
    }

    Ok(config)
}

fn print_summary(report: &Report, verbose: bool) {
    println!("\n📊 检查结果:");
    if let Some(title) = &report.title {
        println!("  书名: {}", title);
    }
    println!("  检查文档数: {}", report.documents_checked);
    println!("  检查链接数: {}", report.links_checked);
    println!("  外部链接数: {}", report.external_links);

    if report.findings().is_empty() {
        println!("\n✅ 没有发现断链");
        return;
    }

    println!("\n⚠️  发现 {} 个断链:", report.findings().len());
    for (source, findings) in report.grouped() {
        println!("\n  📄 {}", source);
        for finding in findings {
            match finding.line {
                Some(line) => println!("    - 第{}行 {} ({})", line, finding.href, finding.reason.description()),
                None => println!("    - {} ({})", finding.href, finding.reason.description()),
            }
            if verbose {
                if let Some(detail) = &finding.detail {
                    println!("      说明: {}", detail);
                }
                if let Some(text) = &finding.text {
                    println!("      链接文本: {}", text);
                }
            }
        }
    }
}
