use clap::{Parser, Subcommand};
use kindleforge::config::DEFAULT_CONFIG_PATH;
use kindleforge::{ForgeConfig, PackageSummary, Result, Rules};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// 📚 KindleForge - TXT转EPUB与EPUB样式调整工具
#[derive(Parser)]
#[command(name = "kindleforge")]
#[command(about = "将TXT小说转换为EPUB，或统一EPUB的行高与段间距")]
#[command(version)]
struct Args {
    /// 配置文件路径
    #[arg(short, long, global = true, help = "配置文件路径（不存在时生成默认配置）")]
    config: Option<PathBuf>,

    /// 详细输出模式
    #[arg(short, long, global = true, help = "显示调试日志")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// TXT转换为EPUB
    Convert {
        #[arg(help = "要转换的TXT文件路径")]
        input: PathBuf,
        #[arg(short, long, help = "输出文件路径（默认：输入目录下的<书名>.epub）")]
        output: Option<PathBuf>,
    },
    /// 调整EPUB样式
    Restyle {
        #[arg(help = "要调整的EPUB文件路径")]
        input: PathBuf,
        #[arg(short, long, help = "输出文件路径（默认：输入目录下清理后的文件名）")]
        output: Option<PathBuf>,
    },
    /// 查看EPUB结构
    Inspect {
        #[arg(help = "要查看的EPUB文件路径")]
        input: PathBuf,
    },
    /// 生成默认配置文件
    InitConfig {
        #[arg(help = "配置文件路径")]
        path: Option<PathBuf>,
    },
}

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    println!("📚 KindleForge - TXT/EPUB处理工具");

    match run(args) {
        Ok(_) => println!("🎉 处理完成！"),
        Err(e) => {
            eprintln!("❌ 错误: {}", e);
            std::process::exit(1);
        }
    }
}

fn run(args: Args) -> Result<()> {
    if let Command::InitConfig { path } = &args.command {
        let path = path.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        ForgeConfig::generate_default_config(&path)?;
        println!("📝 已生成默认配置文件: {}", path.display());
        return Ok(());
    }

    let config = load_config(args.config.as_deref())?;
    let rules = Rules::compile(&config)?;

    match args.command {
        Command::Convert { input, output } => {
            println!("正在转换TXT文件: {}", input.display());
            let bytes = std::fs::read(&input)?;
            let conversion = kindleforge::txt_bytes_to_epub(&bytes, &file_name(&input), &rules)?;

            println!("  📖 书名: {}", conversion.book_info.title);
            if conversion.book_info.author.is_empty() {
                println!("  ✍️  作者: {}", rules.unknown_author);
            } else {
                println!("  ✍️  作者: {}", conversion.book_info.author);
            }

            let target = output.unwrap_or_else(|| sibling(&input, &conversion.filename));
            std::fs::write(&target, &conversion.bytes)?;
            println!("  💾 已写入: {} ({} 字节)", target.display(), conversion.bytes.len());
        }
        Command::Restyle { input, output } => {
            println!("正在调整EPUB样式: {}", input.display());
            let bytes = std::fs::read(&input)?;
            let conversion = kindleforge::restyle(&bytes, &file_name(&input), &rules)?;

            let target = output.unwrap_or_else(|| sibling(&input, &conversion.filename));
            if target == input {
                println!("  ⚠️  输出路径与输入相同，将覆盖原文件");
            }
            std::fs::write(&target, &conversion.bytes)?;
            println!("  💾 已写入: {} ({} 字节)", target.display(), conversion.bytes.len());
        }
        Command::Inspect { input } => {
            println!("正在检查EPUB文件: {}", input.display());
            let summary = PackageSummary::from_path(&input)?;
            display_summary(&summary);
        }
        Command::InitConfig { .. } => {}
    }

    Ok(())
}

/// 读取配置：显式指定的路径必须存在，默认路径不存在时生成
fn load_config(path: Option<&Path>) -> Result<ForgeConfig> {
    match path {
        Some(path) => ForgeConfig::from_file(path),
        None => ForgeConfig::load_or_init(DEFAULT_CONFIG_PATH),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn sibling(input: &Path, name: &str) -> PathBuf {
    input.parent().map(|dir| dir.join(name)).unwrap_or_else(|| PathBuf::from(name))
}

fn display_summary(summary: &PackageSummary) {
    println!("\n📁 EPUB文件内容:");
    for (i, entry) in summary.entries.iter().enumerate() {
        println!(
            "  {}. {} ({}, {} → {} 字节)",
            i + 1,
            entry.name,
            if entry.is_stored() { "不压缩" } else { "压缩" },
            entry.size,
            entry.compressed_size
        );
    }
    println!("  共找到 {} 个文件", summary.entries.len());

    if summary.has_valid_mimetype() {
        println!("  ✅ mimetype正确（第一个条目，不压缩）");
    } else {
        println!("  ⚠️  mimetype异常: {:?}", summary.mimetype);
    }

    let metadata = &summary.opf.metadata;
    println!("\n📊 元数据信息:");
    println!("  📚 OPF文件: {}", summary.opf_path);
    println!("  📖 EPUB版本: {}", summary.opf.version);
    println!("    标题: {}", metadata.title);
    println!("    作者: {}", metadata.creator);
    println!("    语言: {}", metadata.language);
    if !metadata.identifier.is_empty() {
        println!("    标识符: {}", metadata.identifier);
    }
    if !metadata.modified.is_empty() {
        println!("    最后修改: {}", metadata.modified);
    }
    println!("    清单项目: {} 个", summary.opf.manifest.len());
    println!("    样式文件: {} 个", summary.opf.get_css_paths().len());

    println!("\n📑 阅读顺序:");
    for (i, path) in summary.spine_paths().iter().enumerate() {
        println!("  {}. {}", i + 1, path);
    }

    match &summary.ncx {
        Some((path, ncx)) => {
            println!("\n🧭 NCX导航信息 ({}):", path);
            println!("  导航深度: {}", ncx.get_depth());
            for point in ncx.get_all_nav_points() {
                println!("  {}. {} -> {}", point.play_order, point.label, point.src);
            }
        }
        None => println!("\n🧭 没有NCX文件"),
    }

    match &summary.nav {
        Some((path, nav)) => {
            println!("\n🗂️  导航文档 ({}):", path);
            for (i, entry) in nav.entries.iter().enumerate() {
                println!("  {}. {} -> {}", i + 1, entry.label, entry.href);
            }
        }
        None => println!("\n🗂️  没有EPUB3导航文档"),
    }

    if summary.is_order_consistent() {
        println!("\n✅ 脊柱、NCX与导航文档顺序一致");
    } else {
        println!("\n⚠️  脊柱、NCX与导航文档顺序不一致");
    }
}
