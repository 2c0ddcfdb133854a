//! NCX文档
//!
//! 提供NCX（Navigation Control file for XML）文件的生成与解析。

use crate::error::{ForgeError, Result};
use crate::epub::ncx::{NavMap, NavPoint, NcxMetadata};
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

/// NCX文件内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ncx {
    /// NCX版本
    pub version: String,
    /// 元数据
    pub metadata: NcxMetadata,
    /// 文档标题
    pub doc_title: Option<String>,
    /// 文档作者
    pub doc_author: Option<String>,
    /// 导航地图
    pub nav_map: NavMap,
}

/// 正在解析的文本归属
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextTarget {
    None,
    DocTitle,
    DocAuthor,
    NavLabel,
}

impl Ncx {
    /// 生成NCX文件内容
    pub fn to_xml(&self) -> String {
        let metadata = &self.metadata;
        let nav_points: Vec<String> = self.nav_map.nav_points.iter().map(NavPoint::to_xml).collect();

        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="{}">
  <head>
    <meta name="dtb:uid" content="{}"/>
    <meta name="dtb:depth" content="{}"/>
    <meta name="dtb:totalPageCount" content="{}"/>
    <meta name="dtb:maxPageNumber" content="{}"/>
  </head>
  <docTitle><text>{}</text></docTitle>
  <docAuthor><text>{}</text></docAuthor>
  <navMap>
{}
  </navMap>
</ncx>"#,
            escape(&self.version),
            escape(metadata.uid.as_deref().unwrap_or_default()),
            metadata.depth.unwrap_or_else(|| self.nav_map.get_depth()),
            metadata.total_page_count.unwrap_or(0),
            metadata.max_page_number.unwrap_or(0),
            escape(self.doc_title.as_deref().unwrap_or_default()),
            escape(self.doc_author.as_deref().unwrap_or_default()),
            nav_points.join("\n")
        )
    }

    /// 解析NCX文件内容
    ///
    /// # 参数
    /// * `xml_content` - NCX文件的XML内容
    ///
    /// # 返回值
    /// * `Result<Ncx>` - 解析后的NCX信息，缺少 `<ncx>` 根元素时返回 `NcxParseError`
    pub fn parse_xml(xml_content: &str) -> Result<Ncx> {
        let mut reader = Reader::from_str(xml_content);
        reader.config_mut().trim_text(true);
        reader.config_mut().expand_empty_elements = true;

        let mut version = None;
        let mut metadata = NcxMetadata::default();
        let mut doc_title = None;
        let mut doc_author = None;
        let mut nav_map = NavMap::new();

        let mut buf = Vec::new();
        let mut in_head = false;
        let mut text_target = TextTarget::None;
        let mut text_content = String::new();

        // 嵌套的navPoint，栈顶为当前正在解析的导航点
        let mut nav_point_stack: Vec<NavPoint> = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) | Event::Empty(ref e) => match e.local_name().as_ref() {
                    b"ncx" => {
                        version = Some(Self::attribute(e, b"version")?.unwrap_or_default());
                    }
                    b"head" => in_head = true,
                    b"meta" if in_head => Self::parse_meta_element(e, &mut metadata)?,
                    b"docTitle" => text_target = TextTarget::DocTitle,
                    b"docAuthor" => text_target = TextTarget::DocAuthor,
                    b"navLabel" if !nav_point_stack.is_empty() => text_target = TextTarget::NavLabel,
                    b"navPoint" => {
                        let id = Self::attribute(e, b"id")?.unwrap_or_default();
                        let play_order = Self::attribute(e, b"playOrder")?
                            .and_then(|value| value.trim().parse().ok())
                            .unwrap_or(0);
                        nav_point_stack.push(NavPoint::new(id, play_order, String::new(), String::new()));
                    }
                    b"content" => {
                        if let Some(nav_point) = nav_point_stack.last_mut() {
                            nav_point.src = Self::attribute(e, b"src")?.unwrap_or_default();
                        }
                    }
                    b"text" => text_content.clear(),
                    _ => {}
                },
                Event::End(ref e) => match e.local_name().as_ref() {
                    b"head" => in_head = false,
                    b"text" => {
                        let text = text_content.trim().to_string();
                        match text_target {
                            TextTarget::DocTitle => doc_title = Some(text),
                            TextTarget::DocAuthor => doc_author = Some(text),
                            TextTarget::NavLabel => {
                                if let Some(nav_point) = nav_point_stack.last_mut() {
                                    nav_point.label = text;
                                }
                            }
                            TextTarget::None => {}
                        }
                    }
                    b"docTitle" | b"docAuthor" | b"navLabel" => text_target = TextTarget::None,
                    b"navPoint" => {
                        if let Some(nav_point) = nav_point_stack.pop() {
                            match nav_point_stack.last_mut() {
                                Some(parent) => parent.add_child(nav_point),
                                None => nav_map.add_nav_point(nav_point),
                            }
                        }
                    }
                    _ => {}
                },
                Event::Text(e) => {
                    if text_target != TextTarget::None {
                        text_content.push_str(&e.unescape()?);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        let version = version.ok_or_else(|| ForgeError::NcxParseError("缺少ncx根元素".to_string()))?;

        // 按playOrder排序所有导航点
        nav_map.sort_by_play_order();

        Ok(Ncx {
            version,
            metadata,
            doc_title,
            doc_author,
            nav_map,
        })
    }

    fn attribute(e: &BytesStart, name: &[u8]) -> Result<Option<String>> {
        for attr_result in e.attributes() {
            let attr = attr_result?;
            if attr.key.local_name().as_ref() == name {
                return Ok(Some(String::from_utf8_lossy(&attr.value).to_string()));
            }
        }
        Ok(None)
    }

    /// 解析meta元素
    fn parse_meta_element(e: &BytesStart, metadata: &mut NcxMetadata) -> Result<()> {
        let name = Self::attribute(e, b"name")?.unwrap_or_default();
        let content = Self::attribute(e, b"content")?.unwrap_or_default();

        match name.as_str() {
            "dtb:uid" => metadata.uid = Some(content),
            "dtb:depth" => metadata.depth = content.parse().ok(),
            "dtb:totalPageCount" => metadata.total_page_count = content.parse().ok(),
            "dtb:maxPageNumber" => metadata.max_page_number = content.parse().ok(),
            _ => {}
        }

        Ok(())
    }

    /// 获取NCX文件的唯一标识符
    pub fn get_uid(&self) -> Option<&str> {
        self.metadata.uid.as_deref()
    }

    /// 获取文档标题文本
    pub fn get_title(&self) -> Option<&str> {
        self.doc_title.as_deref()
    }

    /// 获取导航深度
    pub fn get_depth(&self) -> u32 {
        self.metadata.depth.unwrap_or_else(|| self.nav_map.get_depth())
    }

    /// 获取所有导航点的平铺列表
    pub fn get_all_nav_points(&self) -> Vec<&NavPoint> {
        self.nav_map.get_all_nav_points()
    }

    /// 获取章节路径列表（按playOrder）
    pub fn get_chapter_paths(&self) -> Vec<String> {
        self.get_all_nav_points()
            .iter()
            .map(|point| point.src.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ncx_parses_back() {
        let mut nav_map = NavMap::new();
        nav_map.add_nav_point(NavPoint::new("navpoint-1", 1, "序", "OEBPS/chapter_0.xhtml"));
        nav_map.add_nav_point(NavPoint::new("navpoint-2", 2, "第一章 山边小村", "OEBPS/chapter_1.xhtml"));

        let ncx = Ncx {
            version: "2005-1".to_string(),
            metadata: NcxMetadata {
                uid: Some("uid-1".to_string()),
                depth: Some(1),
                total_page_count: Some(0),
                max_page_number: Some(0),
            },
            doc_title: Some("凡人修仙传".to_string()),
            doc_author: Some("忘语".to_string()),
            nav_map,
        };

        let xml = ncx.to_xml();
        assert!(xml.contains(r#"<meta name="dtb:depth" content="1"/>"#));

        let parsed = Ncx::parse_xml(&xml).unwrap();
        assert_eq!(parsed, ncx);
        assert_eq!(parsed.get_uid(), Some("uid-1"));
        assert_eq!(parsed.get_title(), Some("凡人修仙传"));
        assert_eq!(
            parsed.get_chapter_paths(),
            vec!["OEBPS/chapter_0.xhtml", "OEBPS/chapter_1.xhtml"]
        );
    }

    #[test]
    fn test_parse_nested_ncx() {
        let xml = r#"<?xml version="1.0"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head><meta name="dtb:uid" content="abc"/></head>
  <docTitle><text>Book</text></docTitle>
  <navMap>
    <navPoint id="p2" playOrder="3">
      <navLabel><text>Part Two</text></navLabel>
      <content src="p2.xhtml"/>
    </navPoint>
    <navPoint id="p1" playOrder="1">
      <navLabel><text>Part One</text></navLabel>
      <content src="p1.xhtml"/>
      <navPoint id="c1" playOrder="2">
        <navLabel><text>Chapter &amp; One</text></navLabel>
        <content src="c1.xhtml#start"/>
      </navPoint>
    </navPoint>
  </navMap>
</ncx>"#;

        let ncx = Ncx::parse_xml(xml).unwrap();
        assert_eq!(ncx.doc_author, None);
        assert_eq!(ncx.get_depth(), 2);
        assert_eq!(ncx.get_chapter_paths(), vec!["p1.xhtml", "c1.xhtml#start", "p2.xhtml"]);
        assert_eq!(ncx.nav_map.nav_points[0].children[0].label, "Chapter & One");
    }

    #[test]
    fn test_missing_ncx_root() {
        let result = Ncx::parse_xml("<navMap></navMap>");
        assert!(matches!(result, Err(ForgeError::NcxParseError(_))));
    }
}
