//! EPUB包构建模块
//!
//! 把书籍信息和章节列表组装成一个完整的EPUB3归档（同时带有NCX，兼容Kindle）。
//!
//! 归档布局：
//! ```text
//! mimetype                 (第一个条目，不压缩)
//! META-INF/container.xml
//! content.opf
//! toc.ncx
//! OEBPS/styles.css
//! OEBPS/nav.xhtml
//! OEBPS/chapter_N.xhtml
//! ```

use crate::config::Rules;
use crate::epub::container::{CONTAINER_PATH, Container};
use crate::epub::nav::{NavDocument, NavEntry};
use crate::epub::ncx::{NavMap, NavPoint, Ncx, NcxMetadata};
use crate::epub::opf::{
    CSS_MEDIA_TYPE, ManifestItem, Metadata, NCX_MEDIA_TYPE, Opf, SpineItem, XHTML_MEDIA_TYPE,
};
use crate::epub::style::generate_css;
use crate::error::{ForgeError, Result};
use crate::text::{BookInfo, Chapter};
use quick_xml::escape::escape;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// mimetype条目的路径
pub const MIMETYPE_PATH: &str = "mimetype";
/// EPUB的mimetype内容
pub const EPUB_MIMETYPE: &str = "application/epub+zip";
/// OPF包文件路径
pub const OPF_PATH: &str = "content.opf";
/// NCX文件路径
pub const NCX_PATH: &str = "toc.ncx";
/// 内容目录
pub const CONTENT_DIR: &str = "OEBPS";
/// 样式表文件名
pub const STYLESHEET_NAME: &str = "styles.css";
/// 导航文档文件名
pub const NAV_NAME: &str = "nav.xhtml";
/// 导航文档和目录标题
const TOC_TITLE: &str = "目录";

/// 条目的压缩方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// 不压缩
    Stored,
    /// DEFLATE，最高压缩级别
    Deflated,
}

/// 归档中的一个条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub path: String,
    pub data: Vec<u8>,
    pub compression: Compression,
}

impl ArchiveEntry {
    pub fn stored(path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            data: data.into(),
            compression: Compression::Stored,
        }
    }

    pub fn deflated(path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            data: data.into(),
            compression: Compression::Deflated,
        }
    }
}

/// 每次构建都会变化的值
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// 书籍唯一标识符（UUID，不含 `urn:uuid:` 前缀）
    pub identifier: String,
    /// 修改时间，形如 `2024-01-02T03:04:05Z`
    pub modified: String,
}

impl BuildOptions {
    /// 随机UUID v4 + 当前UTC时间
    pub fn fresh() -> Self {
        Self {
            identifier: uuid::Uuid::new_v4().to_string(),
            modified: chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        }
    }
}

/// 构建EPUB
///
/// # 参数
/// * `book_info` - 书名和作者，作者为空时写入配置中的未知作者
/// * `chapters` - 有序章节列表
/// * `rules` - 编译后的规则集，提供语言标签、样式和未知作者
/// * `options` - 标识符与修改时间
///
/// # 返回值
/// * `Result<Vec<u8>>` - EPUB归档字节，章节为空时返回 `NoChapters`
pub fn build_epub(
    book_info: &BookInfo,
    chapters: &[Chapter],
    rules: &Rules,
    options: &BuildOptions,
) -> Result<Vec<u8>> {
    let entries = package_entries(book_info, chapters, rules, options)?;
    tracing::debug!("写入EPUB归档: {} 个条目", entries.len());
    write_archive(&entries)
}

/// 按归档顺序生成所有条目
pub fn package_entries(
    book_info: &BookInfo,
    chapters: &[Chapter],
    rules: &Rules,
    options: &BuildOptions,
) -> Result<Vec<ArchiveEntry>> {
    if chapters.is_empty() {
        return Err(ForgeError::NoChapters);
    }

    let author = if book_info.author.trim().is_empty() {
        rules.unknown_author.as_str()
    } else {
        book_info.author.as_str()
    };

    let mut entries = vec![
        ArchiveEntry::stored(MIMETYPE_PATH, EPUB_MIMETYPE),
        ArchiveEntry::deflated(CONTAINER_PATH, Container::for_package(OPF_PATH).to_xml()),
        ArchiveEntry::deflated(
            OPF_PATH,
            build_opf(&book_info.title, author, chapters, rules, options).to_xml(),
        ),
        ArchiveEntry::deflated(
            NCX_PATH,
            build_ncx(&book_info.title, author, chapters, options).to_xml(),
        ),
        ArchiveEntry::deflated(content_path(STYLESHEET_NAME), generate_css(&rules.styles.txt)),
        ArchiveEntry::deflated(content_path(NAV_NAME), build_nav(&book_info.title, chapters).to_xhtml()),
    ];

    entries.extend(
        chapters
            .iter()
            .map(|chapter| ArchiveEntry::deflated(content_path(&chapter.file_name()), chapter_xhtml(chapter))),
    );

    Ok(entries)
}

/// 把条目依次写入ZIP归档
pub fn write_archive(entries: &[ArchiveEntry]) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(9));

    for entry in entries {
        let options = match entry.compression {
            Compression::Stored => stored,
            Compression::Deflated => deflated,
        };
        writer.start_file(entry.path.as_str(), options)?;
        writer.write_all(&entry.data)?;
    }

    Ok(writer.finish()?.into_inner())
}

fn content_path(name: &str) -> String {
    format!("{}/{}", CONTENT_DIR, name)
}

fn build_opf(title: &str, author: &str, chapters: &[Chapter], rules: &Rules, options: &BuildOptions) -> Opf {
    let mut manifest = vec![
        ManifestItem::new("ncx", NCX_PATH, NCX_MEDIA_TYPE),
        ManifestItem::with_properties("nav", content_path(NAV_NAME), XHTML_MEDIA_TYPE, "nav"),
        ManifestItem::new("css", content_path(STYLESHEET_NAME), CSS_MEDIA_TYPE),
    ];
    manifest.extend(
        chapters
            .iter()
            .map(|chapter| ManifestItem::new(chapter.id.as_str(), content_path(&chapter.file_name()), XHTML_MEDIA_TYPE)),
    );

    let mut spine = vec![SpineItem::new("nav")];
    spine.extend(chapters.iter().map(|chapter| SpineItem::new(chapter.id.as_str())));

    Opf {
        version: "3.0".to_string(),
        metadata: Metadata {
            identifier: options.identifier.clone(),
            title: title.to_string(),
            creator: author.to_string(),
            language: rules.language_tag.clone(),
            modified: options.modified.clone(),
        },
        manifest,
        spine,
        spine_toc: Some("ncx".to_string()),
    }
}

fn build_ncx(title: &str, author: &str, chapters: &[Chapter], options: &BuildOptions) -> Ncx {
    let mut nav_map = NavMap::new();
    for (i, chapter) in chapters.iter().enumerate() {
        let order = i as u32 + 1;
        nav_map.add_nav_point(NavPoint::new(
            format!("navpoint-{}", order),
            order,
            chapter.title.as_str(),
            content_path(&chapter.file_name()),
        ));
    }

    Ncx {
        version: "2005-1".to_string(),
        metadata: NcxMetadata {
            uid: Some(options.identifier.clone()),
            depth: Some(1),
            total_page_count: Some(0),
            max_page_number: Some(0),
        },
        doc_title: Some(title.to_string()),
        doc_author: Some(author.to_string()),
        nav_map,
    }
}

fn build_nav(title: &str, chapters: &[Chapter]) -> NavDocument {
    NavDocument {
        title: TOC_TITLE.to_string(),
        heading: title.to_string(),
        toc_heading: TOC_TITLE.to_string(),
        entries: chapters
            .iter()
            .map(|chapter| NavEntry {
                label: chapter.title.clone(),
                href: chapter.file_name(),
            })
            .collect(),
    }
}

/// 生成章节XHTML
///
/// 章节标题作为 `<h2>`，正文每个非空行（去除首尾空白后）成为一个 `<p>`。
pub fn chapter_xhtml(chapter: &Chapter) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<head>
  <meta charset="UTF-8"/>
  <title>{title}</title>
  <link rel="stylesheet" type="text/css" href="{stylesheet}"/>
</head>
<body>
  <h2>{title}</h2>
  {paragraphs}
</body>
</html>"#,
        title = escape(&chapter.title),
        stylesheet = STYLESHEET_NAME,
        paragraphs = paragraphs_xhtml(&chapter.content)
    )
}

/// 正文 → `<p>` 段落
pub fn paragraphs_xhtml(content: &str) -> String {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| format!("<p>{}</p>", escape(line)))
        .collect::<Vec<_>>()
        .join("\n")
}
