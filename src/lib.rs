pub mod config;
pub mod convert;
pub mod epub;
pub mod error;
pub mod service;
pub mod text;

// === 核心API重新导出 ===

/// 转换流水线
pub use convert::{Conversion, output_filename, restyle, txt_bytes_to_epub, txt_to_epub};

/// 错误处理
pub use error::{ForgeError, Result};

/// 配置与编译后的规则
pub use config::{ForgeConfig, Rules, StyleSpec};

// === 数据结构 ===

/// 书籍信息与章节
pub use text::{BookInfo, Chapter, Language, NormalizedText, SourceEncoding};

// === 底层组件（高级用法） ===

/// EPUB构建、读取与样式调整
pub use epub::{BuildOptions, Epub, PackageSummary, build_epub, clean_filename, restyle_epub};

/// 投递编排
pub use service::{Attachment, Dispatcher, FileSource, Mailer, Messenger, Outcome, Update, UpdateCache};

// === 库信息 ===

/// KindleForge库的版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// KindleForge库的描述
pub const DESCRIPTION: &str = "将TXT小说转换为EPUB并调整EPUB排版样式";

// === 便捷函数 ===

/// 使用内置规则转换TXT文件
///
/// 这是 `txt_bytes_to_epub` 配合 `Rules::builtin()` 的便捷包装函数。
///
/// # 参数
/// * `path` - TXT文件路径
///
/// # 返回值
/// * `Result<Conversion>` - 转换结果
///
/// # 示例
///
/// ```no_run
/// let conversion = kindleforge::convert_file("凡人修仙传.txt")?;
/// std::fs::write(&conversion.filename, &conversion.bytes)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn convert_file<P: AsRef<std::path::Path>>(path: P) -> Result<Conversion> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    txt_bytes_to_epub(&bytes, &filename, Rules::builtin())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_description() {
        assert!(!DESCRIPTION.is_empty());
    }

    #[test]
    fn test_convert_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("《雪中悍刀行》作者：烽火戏诸侯.txt");
        let body = "北凉王府龙盘虎踞于清凉山，占地广袤。".repeat(10);
        std::fs::write(&path, format!("第一章 小二上酒\n{}\n", body)).unwrap();

        let conversion = convert_file(&path).unwrap();
        assert_eq!(conversion.book_info.title, "雪中悍刀行");
        assert_eq!(conversion.book_info.author, "烽火戏诸侯");
        assert_eq!(conversion.filename, "雪中悍刀行.epub");

        let summary = PackageSummary::from_bytes(&conversion.bytes).unwrap();
        assert!(summary.is_order_consistent());
    }
}
