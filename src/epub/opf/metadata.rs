//! 元数据模块
//!
//! 生成的EPUB只写入固定的几项元数据：标识符、书名、作者、语言和修改时间。

use quick_xml::escape::escape;

/// OPF文件中的元数据信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    /// 唯一标识符（不含 `urn:uuid:` 前缀）
    pub identifier: String,
    /// 书名
    pub title: String,
    /// 作者
    pub creator: String,
    /// 语言标签
    pub language: String,
    /// 最后修改时间，精确到秒的UTC时间
    pub modified: String,
}

impl Metadata {
    /// 生成 `<metadata>` 元素
    pub fn to_xml(&self) -> String {
        format!(
            r#"  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
    <dc:identifier id="BookId">urn:uuid:{}</dc:identifier>
    <dc:title>{}</dc:title>
    <dc:creator>{}</dc:creator>
    <dc:language>{}</dc:language>
    <meta property="dcterms:modified">{}</meta>
  </metadata>"#,
            escape(&self.identifier),
            escape(&self.title),
            escape(&self.creator),
            escape(&self.language),
            escape(&self.modified)
        )
    }
}
