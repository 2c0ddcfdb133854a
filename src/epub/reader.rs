use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use zip::ZipArchive;

use crate::epub::builder::{EPUB_MIMETYPE, MIMETYPE_PATH};
use crate::epub::container::{CONTAINER_PATH, Container};
use crate::epub::nav::NavDocument;
use crate::epub::ncx::Ncx;
use crate::epub::opf::Opf;
use crate::error::{ForgeError, Result};

/// 表示一个已打开的EPUB归档
pub struct Epub<R: Read + Seek> {
    archive: ZipArchive<R>,
}

impl Epub<Cursor<Vec<u8>>> {
    /// 从内存中的字节创建Epub实例
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Epub::new(Cursor::new(bytes))
    }
}

impl Epub<File> {
    /// 从文件路径创建Epub实例
    ///
    /// # 参数
    /// * `path` - epub文件的路径
    ///
    /// # 返回值
    /// * `Result<Epub<File>>` - 成功返回Epub实例，失败返回错误
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Epub::new(File::open(path)?)
    }
}

impl<R: Read + Seek> Epub<R> {
    /// 打开归档并检查mimetype
    pub fn new(reader: R) -> Result<Self> {
        let archive = ZipArchive::new(reader)?;

        let mut epub = Epub { archive };
        epub.validate()?;

        Ok(epub)
    }

    /// 验证EPUB文件
    ///
    /// mimetype条目必须存在；内容不是 `application/epub+zip` 时只记录警告，
    /// 不少阅读器也会照常打开这样的文件。
    fn validate(&mut self) -> Result<()> {
        let content = match self.archive.by_name(MIMETYPE_PATH) {
            Ok(mut file) => {
                let mut content = Vec::new();
                file.read_to_end(&mut content)?;
                content
            }
            Err(_) => return Err(ForgeError::MissingMimetype),
        };

        let content = String::from_utf8_lossy(&content);
        if content.trim() != EPUB_MIMETYPE {
            tracing::warn!("mimetype内容异常: {:?}，继续处理", content.trim());
        }

        Ok(())
    }

    /// 归档中的条目数
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archive.len() == 0
    }

    /// 列出EPUB文件中的所有条目
    pub fn list_files(&mut self) -> Result<Vec<String>> {
        let mut files = Vec::with_capacity(self.archive.len());

        for i in 0..self.archive.len() {
            let file = self.archive.by_index_raw(i)?;
            files.push(file.name().to_string());
        }

        Ok(files)
    }

    /// 底层ZIP归档，供需要逐条目访问的调用方使用
    pub fn archive_mut(&mut self) -> &mut ZipArchive<R> {
        &mut self.archive
    }

    /// 提取指定文件的文本内容
    ///
    /// # 参数
    /// * `filename` - 要提取的文件名
    ///
    /// # 返回值
    /// * `Result<String>` - 文件内容，非UTF-8时返回IO错误
    pub fn extract_file(&mut self, filename: &str) -> Result<String> {
        let mut file = self.archive.by_name(filename)?;
        let mut content = String::new();
        file.read_to_string(&mut content)?;
        Ok(content)
    }

    /// 提取指定文件的二进制内容
    pub fn extract_binary_file(&mut self, filename: &str) -> Result<Vec<u8>> {
        let mut file = self.archive.by_name(filename)?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;
        Ok(buffer)
    }

    /// 解析container.xml文件
    pub fn parse_container(&mut self) -> Result<Container> {
        let container_content = self.extract_file(CONTAINER_PATH)?;
        Container::parse_xml(&container_content)
    }

    /// 获取主要的OPF文件路径
    pub fn get_opf_path(&mut self) -> Result<String> {
        let container = self.parse_container()?;

        container
            .get_opf_path()
            .ok_or_else(|| ForgeError::InvalidEpub("container.xml中没有指定OPF文件".to_string()))
    }

    /// 获取OPF文件所在的目录，位于根目录时为空字符串
    pub fn get_opf_directory(&mut self) -> Result<String> {
        let opf_path = self.get_opf_path()?;
        Ok(parent_directory(&opf_path).to_string())
    }

    /// 解析OPF文件
    pub fn parse_opf(&mut self) -> Result<Opf> {
        let opf_path = self.get_opf_path()?;
        let opf_content = self.extract_file(&opf_path)?;
        Opf::parse_xml(&opf_content)
    }

    /// 解析NCX文件，OPF中没有NCX时返回 `None`
    ///
    /// # 参数
    /// * `opf` - 已解析的OPF
    /// * `opf_dir` - OPF所在目录，用于解析相对路径
    pub fn parse_ncx(&mut self, opf: &Opf, opf_dir: &str) -> Result<Option<(String, Ncx)>> {
        let Some(href) = opf.get_ncx_path() else {
            return Ok(None);
        };
        let path = resolve_path(opf_dir, &href);
        let content = self.extract_file(&path)?;
        Ok(Some((path, Ncx::parse_xml(&content)?)))
    }

    /// 解析EPUB3导航文档，OPF中没有导航文档时返回 `None`
    pub fn parse_nav(&mut self, opf: &Opf, opf_dir: &str) -> Result<Option<(String, NavDocument)>> {
        let Some(href) = opf.get_nav_path() else {
            return Ok(None);
        };
        let path = resolve_path(opf_dir, &href);
        let content = self.extract_file(&path)?;
        Ok(Some((path, NavDocument::parse_xhtml(&content)?)))
    }
}

/// 路径所在目录
pub fn parent_directory(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// 把相对于 `base_dir` 的链接解析为归档内的完整路径
///
/// 去掉 `#` 片段，处理 `.` 和 `..`。
pub fn resolve_path(base_dir: &str, href: &str) -> String {
    let href = href.split('#').next().unwrap_or_default();

    let mut segments: Vec<&str> = if href.starts_with('/') {
        Vec::new()
    } else {
        base_dir.split('/').filter(|s| !s.is_empty()).collect()
    };

    for segment in href.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    segments.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epub::builder::{ArchiveEntry, write_archive};

    /// 创建一个测试用的EPUB，OPF位于子目录
    fn create_test_epub(mimetype_content: &str) -> Vec<u8> {
        let container_xml = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
    <rootfiles>
        <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
    </rootfiles>
</container>"#;

        let opf_xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<package version="3.0" xmlns="http://www.idpf.org/2007/opf" unique-identifier="BookId">
    <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
        <dc:title>测试书籍</dc:title>
        <dc:creator>测试作者</dc:creator>
        <dc:language>zh-CN</dc:language>
    </metadata>
    <manifest>
        <item id="ncx" href="../toc.ncx" media-type="application/x-dtbncx+xml"/>
        <item id="chapter1" href="text/chapter1.xhtml" media-type="application/xhtml+xml"/>
    </manifest>
    <spine toc="ncx">
        <itemref idref="chapter1"/>
    </spine>
</package>"#;

        let ncx_xml = r#"<ncx version="2005-1"><navMap>
<navPoint id="n1" playOrder="1"><navLabel><text>第一章</text></navLabel><content src="OEBPS/text/chapter1.xhtml"/></navPoint>
</navMap></ncx>"#;

        write_archive(&[
            ArchiveEntry::stored("mimetype", mimetype_content),
            ArchiveEntry::deflated("META-INF/container.xml", container_xml),
            ArchiveEntry::deflated("OEBPS/content.opf", opf_xml),
            ArchiveEntry::deflated("toc.ncx", ncx_xml),
            ArchiveEntry::deflated("OEBPS/text/chapter1.xhtml", "<html><body><p>内容</p></body></html>"),
        ])
        .unwrap()
    }

    #[test]
    fn test_valid_epub() {
        let mut epub = Epub::from_bytes(create_test_epub("application/epub+zip")).unwrap();
        assert_eq!(epub.len(), 5);
        assert_eq!(epub.list_files().unwrap()[0], "mimetype");
        assert_eq!(epub.get_opf_path().unwrap(), "OEBPS/content.opf");
        assert_eq!(epub.get_opf_directory().unwrap(), "OEBPS");
    }

    #[test]
    fn test_unexpected_mimetype_is_tolerated() {
        assert!(Epub::from_bytes(create_test_epub("invalid/mimetype")).is_ok());
    }

    #[test]
    fn test_missing_mimetype() {
        let bytes = write_archive(&[ArchiveEntry::deflated("META-INF/container.xml", "<container/>")]).unwrap();
        assert!(matches!(Epub::from_bytes(bytes), Err(ForgeError::MissingMimetype)));
    }

    #[test]
    fn test_container_without_rootfile() {
        let bytes = write_archive(&[
            ArchiveEntry::stored("mimetype", "application/epub+zip"),
            ArchiveEntry::deflated("META-INF/container.xml", "<container><rootfiles/></container>"),
        ])
        .unwrap();

        let mut epub = Epub::from_bytes(bytes).unwrap();
        assert!(matches!(epub.get_opf_path(), Err(ForgeError::InvalidEpub(_))));
        assert!(matches!(epub.parse_opf(), Err(ForgeError::InvalidEpub(_))));
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("测试.epub");
        std::fs::write(&path, create_test_epub("application/epub+zip")).unwrap();

        let mut epub = Epub::from_path(&path).unwrap();
        assert_eq!(epub.get_opf_path().unwrap(), "OEBPS/content.opf");

        let missing = Epub::from_path(dir.path().join("不存在.epub"));
        assert!(matches!(missing, Err(ForgeError::Io(_))));
    }

    #[test]
    fn test_not_a_zip() {
        let result = Epub::from_bytes(b"definitely not a zip archive".to_vec());
        assert!(matches!(result, Err(ForgeError::Zip(_))));
    }

    #[test]
    fn test_parse_opf_and_ncx() {
        let mut epub = Epub::from_bytes(create_test_epub("application/epub+zip")).unwrap();
        let opf = epub.parse_opf().unwrap();
        assert_eq!(opf.metadata.title, "测试书籍");
        assert_eq!(opf.get_chapter_paths(), vec!["text/chapter1.xhtml"]);

        let opf_dir = epub.get_opf_directory().unwrap();
        let (ncx_path, ncx) = epub.parse_ncx(&opf, &opf_dir).unwrap().unwrap();
        assert_eq!(ncx_path, "toc.ncx");
        assert_eq!(ncx.get_chapter_paths(), vec!["OEBPS/text/chapter1.xhtml"]);

        assert!(epub.parse_nav(&opf, &opf_dir).unwrap().is_none());
    }

    #[test]
    fn test_resolve_path() {
        assert_eq!(resolve_path("", "OEBPS/nav.xhtml"), "OEBPS/nav.xhtml");
        assert_eq!(resolve_path("OEBPS", "text/c1.xhtml#p2"), "OEBPS/text/c1.xhtml");
        assert_eq!(resolve_path("OEBPS/text", "../styles.css"), "OEBPS/styles.css");
        assert_eq!(resolve_path("OEBPS", "./a/./b.xhtml"), "OEBPS/a/b.xhtml");
        assert_eq!(parent_directory("content.opf"), "");
        assert_eq!(parent_directory("OEBPS/content.opf"), "OEBPS");
    }
}
