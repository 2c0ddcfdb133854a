use crate::error::{ForgeError, Result};
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::reader::Reader;

/// container.xml 在归档中的固定路径
pub const CONTAINER_PATH: &str = "META-INF/container.xml";

/// OPF包文件的媒体类型
pub const OPF_MEDIA_TYPE: &str = "application/oebps-package+xml";

/// Container.xml中的rootfile信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootFile {
    pub full_path: String,
    pub media_type: String,
}

/// Container.xml的内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub rootfiles: Vec<RootFile>,
}

impl Container {
    /// 只包含一个OPF包文件的container
    pub fn for_package(opf_path: &str) -> Container {
        Container {
            rootfiles: vec![RootFile {
                full_path: opf_path.to_string(),
                media_type: OPF_MEDIA_TYPE.to_string(),
            }],
        }
    }

    /// 生成container.xml内容
    pub fn to_xml(&self) -> String {
        let rootfiles: Vec<String> = self
            .rootfiles
            .iter()
            .map(|rf| {
                format!(
                    r#"    <rootfile full-path="{}" media-type="{}"/>"#,
                    escape(&rf.full_path),
                    escape(&rf.media_type)
                )
            })
            .collect();

        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
{}
  </rootfiles>
</container>"#,
            rootfiles.join("\n")
        )
    }

    /// 解析container.xml内容
    ///
    /// # 参数
    /// * `xml_content` - container.xml的文件内容
    ///
    /// # 返回值
    /// * `Result<Container>` - 解析后的Container信息
    pub fn parse_xml(xml_content: &str) -> Result<Container> {
        let mut reader = Reader::from_str(xml_content);
        reader.config_mut().trim_text(true);
        reader.config_mut().expand_empty_elements = true;

        let mut rootfiles = Vec::new();
        let mut buf = Vec::new();
        let mut in_rootfiles = false;
        let mut has_container = false;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) | Event::Empty(ref e) => match e.local_name().as_ref() {
                    b"container" => {
                        has_container = true;
                    }
                    b"rootfiles" => {
                        in_rootfiles = true;
                    }
                    b"rootfile" if in_rootfiles => {
                        let mut full_path = String::new();
                        let mut media_type = String::new();

                        for attr_result in e.attributes() {
                            let attr = attr_result?;
                            match attr.key.local_name().as_ref() {
                                b"full-path" => {
                                    full_path = String::from_utf8_lossy(&attr.value).to_string();
                                }
                                b"media-type" => {
                                    media_type = String::from_utf8_lossy(&attr.value).to_string();
                                }
                                _ => {}
                            }
                        }

                        if !full_path.is_empty() && !media_type.is_empty() {
                            rootfiles.push(RootFile { full_path, media_type });
                        }
                    }
                    _ => {}
                },
                Event::End(ref e) => {
                    if e.local_name().as_ref() == b"rootfiles" {
                        in_rootfiles = false;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !has_container {
            return Err(ForgeError::ContainerParseError("没有找到container元素".to_string()));
        }

        Ok(Container { rootfiles })
    }

    /// 获取主要的OPF文件路径
    ///
    /// 优先返回 `application/oebps-package+xml` 类型的rootfile，否则返回第一个。
    pub fn get_opf_path(&self) -> Option<String> {
        self.rootfiles
            .iter()
            .find(|rf| rf.media_type == OPF_MEDIA_TYPE)
            .or_else(|| self.rootfiles.first())
            .map(|rf| rf.full_path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_container_xml() {
        let container_xml = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
    <rootfiles>
        <rootfile full-path="OEBPS/toc.ncx" media-type="application/x-dtbncx+xml"/>
        <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
    </rootfiles>
</container>"#;

        let container = Container::parse_xml(container_xml).unwrap();
        assert_eq!(container.rootfiles.len(), 2);
        assert_eq!(container.get_opf_path(), Some("OEBPS/content.opf".to_string()));
    }

    #[test]
    fn test_generated_container_parses_back() {
        let container = Container::for_package("content.opf");
        let xml = container.to_xml();

        assert!(xml.contains(r#"full-path="content.opf""#));
        let parsed = Container::parse_xml(&xml).unwrap();
        assert_eq!(parsed, container);
        assert_eq!(parsed.get_opf_path(), Some("content.opf".to_string()));
    }

    #[test]
    fn test_container_without_rootfile() {
        let xml = r#"<container version="1.0"><rootfiles></rootfiles></container>"#;
        let container = Container::parse_xml(xml).unwrap();
        assert!(container.rootfiles.is_empty());
        assert_eq!(container.get_opf_path(), None);
    }

    #[test]
    fn test_not_a_container_document() {
        let result = Container::parse_xml("<package><metadata/></package>");
        assert!(matches!(result, Err(ForgeError::ContainerParseError(_))));
    }
}
