//! 转换流水线
//!
//! TXT：语言识别 → 标点规范化 → 书名作者提取 → 章节切分 → 短章合并 → 打包。
//! EPUB：样式调整，文件名去掉来源网站标记。

use crate::config::Rules;
use crate::epub::builder::{BuildOptions, build_epub};
use crate::epub::restyle::{clean_filename, restyle_epub};
use crate::error::Result;
use crate::text::{
    self,
    BookInfo,
    extract_book_info_from_content,
    extract_book_info_from_filename,
    merge_short_chapters,
    parse_chapters,
    resolve_book_info,
};

/// 一次转换的结果
#[derive(Debug, Clone)]
pub struct Conversion {
    /// EPUB归档
    pub bytes: Vec<u8>,
    /// 书名和作者
    pub book_info: BookInfo,
    /// 建议的输出文件名
    pub filename: String,
}

/// TXT文本转换为EPUB
///
/// # 参数
/// * `text` - 已解码的全文
/// * `filename` - 原始文件名，用于提取书名作者
/// * `rules` - 编译后的规则集
///
/// # 返回值
/// * `Result<Conversion>` - 识别不到任何章节时返回 `NoChapters`
pub fn txt_to_epub(text: &str, filename: &str, rules: &Rules) -> Result<Conversion> {
    txt_to_epub_with(text, filename, rules, &BuildOptions::fresh())
}

/// 同 [`txt_to_epub`]，使用给定的标识符与修改时间
pub fn txt_to_epub_with(text: &str, filename: &str, rules: &Rules, options: &BuildOptions) -> Result<Conversion> {
    let (normalized, language) = text::normalize_str(text);

    let book_info = resolve_book_info(
        extract_book_info_from_filename(filename, rules),
        extract_book_info_from_content(&normalized, rules),
    );

    let chapters = parse_chapters(&normalized, rules)?;
    let parsed_count = chapters.len();
    let chapters = merge_short_chapters(chapters, rules);
    tracing::debug!("章节: 识别 {} 个，合并后 {} 个", parsed_count, chapters.len());

    let bytes = build_epub(&book_info, &chapters, rules, options)?;
    let filename = output_filename(&book_info.title, filename);

    tracing::info!(
        "转换完成: 《{}》 作者: {} 语言: {} 章节: {} 大小: {} 字节",
        book_info.title,
        if book_info.author.is_empty() { &rules.unknown_author } else { &book_info.author },
        language.code(),
        chapters.len(),
        bytes.len()
    );

    Ok(Conversion {
        bytes,
        book_info,
        filename,
    })
}

/// TXT原始字节转换为EPUB，编码自动检测
pub fn txt_bytes_to_epub(bytes: &[u8], filename: &str, rules: &Rules) -> Result<Conversion> {
    let (decoded, encoding) = text::decode_text(bytes);
    tracing::debug!("检测编码: {}", encoding.name());
    txt_to_epub(&decoded, filename, rules)
}

/// 调整EPUB样式
///
/// # 参数
/// * `bytes` - 原始EPUB
/// * `filename` - 原始文件名
/// * `rules` - 编译后的规则集，使用其中的 `styles.epub`
pub fn restyle(bytes: &[u8], filename: &str, rules: &Rules) -> Result<Conversion> {
    let output = restyle_epub(bytes, &rules.styles.epub)?;
    let filename = clean_filename(filename, rules);
    let book_info = extract_book_info_from_filename(&filename, rules);

    tracing::info!("样式调整完成: {} ({} → {} 字节)", filename, bytes.len(), output.len());

    Ok(Conversion {
        bytes: output,
        book_info,
        filename,
    })
}

/// 输出文件名：`<书名>.epub`
///
/// 书名中的路径分隔符和Windows保留字符替换为 `_`；书名为空时使用原文件名（去掉扩展名）。
pub fn output_filename(title: &str, original: &str) -> String {
    let title = title.trim();
    let stem = if title.is_empty() {
        original
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(original)
            .trim()
    } else {
        title
    };
    let stem = if stem.is_empty() { "book" } else { stem };

    let safe: String = stem
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    format!("{}.epub", safe)
}
