//! EPUB包检查
//!
//! 读回一个EPUB归档的结构：条目及其压缩方式、OPF、NCX、导航文档。
//! 所有链接都解析为归档内的完整路径，便于比较三处目录的顺序。

use crate::epub::builder::{EPUB_MIMETYPE, MIMETYPE_PATH};
use crate::epub::nav::NavDocument;
use crate::epub::ncx::Ncx;
use crate::epub::opf::Opf;
use crate::epub::reader::{Epub, parent_directory, resolve_path};
use crate::error::Result;
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use zip::CompressionMethod;

/// 归档条目概要
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrySummary {
    pub name: String,
    pub compression: CompressionMethod,
    pub size: u64,
    pub compressed_size: u64,
}

impl EntrySummary {
    pub fn is_stored(&self) -> bool {
        self.compression == CompressionMethod::Stored
    }
}

/// EPUB包概要
#[derive(Debug, Clone)]
pub struct PackageSummary {
    /// 条目，按归档顺序
    pub entries: Vec<EntrySummary>,
    /// mimetype条目内容（去除首尾空白）
    pub mimetype: String,
    /// OPF文件路径
    pub opf_path: String,
    /// 解析后的OPF
    pub opf: Opf,
    /// NCX路径及内容
    pub ncx: Option<(String, Ncx)>,
    /// 导航文档路径及内容
    pub nav: Option<(String, NavDocument)>,
}

impl PackageSummary {
    /// 从归档字节读取概要
    ///
    /// # 参数
    /// * `bytes` - EPUB归档
    ///
    /// # 返回值
    /// * `Result<PackageSummary>` - 归档、container.xml、OPF、NCX或导航文档无法解析时返回错误
    pub fn from_bytes(bytes: &[u8]) -> Result<PackageSummary> {
        let mut epub = Epub::new(Cursor::new(bytes))?;
        PackageSummary::from_epub(&mut epub)
    }

    /// 从文件读取概要
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<PackageSummary> {
        let mut epub = Epub::from_path(path)?;
        PackageSummary::from_epub(&mut epub)
    }

    /// 从已打开的归档读取概要
    pub fn from_epub<R: Read + Seek>(epub: &mut Epub<R>) -> Result<PackageSummary> {
        let mut entries = Vec::with_capacity(epub.len());
        {
            let archive = epub.archive_mut();
            for i in 0..archive.len() {
                let entry = archive.by_index_raw(i)?;
                entries.push(EntrySummary {
                    name: entry.name().to_string(),
                    compression: entry.compression(),
                    size: entry.size(),
                    compressed_size: entry.compressed_size(),
                });
            }
        }

        let mimetype = String::from_utf8_lossy(&epub.extract_binary_file(MIMETYPE_PATH)?)
            .trim()
            .to_string();

        let opf_path = epub.get_opf_path()?;
        let opf_dir = parent_directory(&opf_path).to_string();
        let opf = epub.parse_opf()?;
        let ncx = epub.parse_ncx(&opf, &opf_dir)?;
        let nav = epub.parse_nav(&opf, &opf_dir)?;

        Ok(PackageSummary {
            entries,
            mimetype,
            opf_path,
            opf,
            ncx,
            nav,
        })
    }

    /// mimetype是否为第一个条目、不压缩且内容正确
    pub fn has_valid_mimetype(&self) -> bool {
        self.entries
            .first()
            .is_some_and(|entry| entry.name == MIMETYPE_PATH && entry.is_stored())
            && self.mimetype == EPUB_MIMETYPE
    }

    fn opf_directory(&self) -> &str {
        parent_directory(&self.opf_path)
    }

    /// 脊柱中章节文档的完整路径（不含导航文档），按阅读顺序
    pub fn spine_paths(&self) -> Vec<String> {
        let opf_dir = self.opf_directory();
        self.opf
            .get_chapter_paths()
            .iter()
            .map(|href| resolve_path(opf_dir, href))
            .collect()
    }

    /// NCX中导航点指向的完整路径，按playOrder
    pub fn ncx_paths(&self) -> Vec<String> {
        self.ncx
            .as_ref()
            .map(|(path, ncx)| {
                let dir = parent_directory(path);
                ncx.get_chapter_paths()
                    .iter()
                    .map(|src| resolve_path(dir, src))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 导航文档中链接的完整路径，按出现顺序
    pub fn nav_paths(&self) -> Vec<String> {
        self.nav
            .as_ref()
            .map(|(path, nav)| {
                let dir = parent_directory(path);
                nav.hrefs().iter().map(|href| resolve_path(dir, href)).collect()
            })
            .unwrap_or_default()
    }

    /// NCX中的章节标题
    pub fn ncx_titles(&self) -> Vec<String> {
        self.ncx
            .as_ref()
            .map(|(_, ncx)| ncx.get_all_nav_points().iter().map(|p| p.label.clone()).collect())
            .unwrap_or_default()
    }

    /// 三处目录顺序是否一致
    pub fn is_order_consistent(&self) -> bool {
        let spine = self.spine_paths();
        (self.ncx.is_none() || self.ncx_paths() == spine) && (self.nav.is_none() || self.nav_paths() == spine)
    }
}
