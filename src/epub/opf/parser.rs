//! OPF包文档
//!
//! 同一个结构既用于生成 `content.opf`，也用于读回已有EPUB的OPF。

use crate::error::{ForgeError, Result};
use crate::epub::opf::{manifest::ManifestItem, metadata::Metadata, spine::SpineItem};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

/// 标识符前缀
const UUID_PREFIX: &str = "urn:uuid:";

/// OPF文件内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opf {
    /// EPUB版本
    pub version: String,
    /// 元数据
    pub metadata: Metadata,
    /// 清单项，保持文档中的顺序
    pub manifest: Vec<ManifestItem>,
    /// 脊柱(阅读顺序)
    pub spine: Vec<SpineItem>,
    /// 脊柱的目录引用
    pub spine_toc: Option<String>,
}

impl Opf {
    /// 生成OPF文件内容
    pub fn to_xml(&self) -> String {
        let manifest: Vec<String> = self
            .manifest
            .iter()
            .map(|item| format!("    {}", item.to_xml()))
            .collect();
        let spine: Vec<String> = self
            .spine
            .iter()
            .map(|item| format!("    {}", item.to_xml()))
            .collect();
        let spine_toc = self
            .spine_toc
            .as_deref()
            .map(|toc| format!(r#" toc="{}""#, quick_xml::escape::escape(toc)))
            .unwrap_or_default();

        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="{}" unique-identifier="BookId">
{}
  <manifest>
{}
  </manifest>
  <spine{}>
{}
  </spine>
</package>"#,
            quick_xml::escape::escape(&self.version),
            self.metadata.to_xml(),
            manifest.join("\n"),
            spine_toc,
            spine.join("\n")
        )
    }

    /// 解析OPF文件内容
    ///
    /// # 参数
    /// * `xml_content` - OPF文件的XML内容
    ///
    /// # 返回值
    /// * `Result<Opf>` - 解析后的OPF信息，缺少 `<package>` 根元素时返回 `OpfParseError`
    pub fn parse_xml(xml_content: &str) -> Result<Opf> {
        let mut reader = Reader::from_str(xml_content);
        reader.config_mut().trim_text(true);
        reader.config_mut().expand_empty_elements = true;

        let mut version = None;
        let mut metadata = Metadata::default();
        let mut manifest = Vec::new();
        let mut spine = Vec::new();
        let mut spine_toc = None;

        let mut buf = Vec::new();
        let mut current_section = String::new();
        let mut current_element = String::new();
        let mut text_content = String::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let local_name_bytes = e.local_name();
                    let local_name = String::from_utf8_lossy(local_name_bytes.as_ref());

                    match local_name.as_ref() {
                        "package" => {
                            version = Some(Self::attribute(e, b"version")?.unwrap_or_default());
                        }
                        "metadata" | "manifest" => {
                            current_section = local_name.to_string();
                        }
                        "spine" => {
                            current_section = "spine".to_string();
                            spine_toc = Self::attribute(e, b"toc")?;
                        }
                        "item" if current_section == "manifest" => {
                            Self::parse_manifest_item(e, &mut manifest)?;
                        }
                        "itemref" if current_section == "spine" => {
                            Self::parse_spine_item(e, &mut spine)?;
                        }
                        "meta" if current_section == "metadata" => {
                            current_element = match Self::attribute(e, b"property")? {
                                Some(property) if property == "dcterms:modified" => "modified".to_string(),
                                _ => String::new(),
                            };
                            text_content.clear();
                        }
                        _ if current_section == "metadata" => {
                            current_element = local_name.to_string();
                            text_content.clear();
                        }
                        _ => {}
                    }
                }
                Event::End(ref e) => {
                    let local_name_bytes = e.local_name();
                    let local_name = String::from_utf8_lossy(local_name_bytes.as_ref());

                    match local_name.as_ref() {
                        "metadata" | "manifest" | "spine" => {
                            current_section.clear();
                        }
                        _ if current_section == "metadata" && !current_element.is_empty() => {
                            Self::process_metadata_text(&current_element, text_content.trim(), &mut metadata);
                            current_element.clear();
                        }
                        _ => {}
                    }
                }
                Event::Text(e) => {
                    if !current_element.is_empty() {
                        text_content.push_str(&e.unescape()?);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        let version = version.ok_or_else(|| ForgeError::OpfParseError("缺少package根元素".to_string()))?;

        Ok(Opf {
            version,
            metadata,
            manifest,
            spine,
            spine_toc,
        })
    }

    /// 读取单个属性值
    fn attribute(e: &BytesStart, name: &[u8]) -> Result<Option<String>> {
        for attr_result in e.attributes() {
            let attr = attr_result?;
            if attr.key.local_name().as_ref() == name {
                return Ok(Some(String::from_utf8_lossy(&attr.value).to_string()));
            }
        }
        Ok(None)
    }

    /// 记录元数据文本，同名元素只取第一个
    fn process_metadata_text(element_name: &str, content: &str, metadata: &mut Metadata) {
        if content.is_empty() {
            return;
        }

        let slot = match element_name {
            "identifier" => &mut metadata.identifier,
            "title" => &mut metadata.title,
            "creator" => &mut metadata.creator,
            "language" => &mut metadata.language,
            "modified" => &mut metadata.modified,
            _ => return,
        };

        if slot.is_empty() {
            let value = if element_name == "identifier" {
                content.strip_prefix(UUID_PREFIX).unwrap_or(content)
            } else {
                content
            };
            *slot = value.to_string();
        }
    }

    /// 解析清单项
    fn parse_manifest_item(e: &BytesStart, manifest: &mut Vec<ManifestItem>) -> Result<()> {
        let mut item = ManifestItem::new(String::new(), String::new(), String::new());

        for attr_result in e.attributes() {
            let attr = attr_result?;
            match attr.key.local_name().as_ref() {
                b"id" => {
                    item.id = String::from_utf8_lossy(&attr.value).to_string();
                }
                b"href" => {
                    item.href = String::from_utf8_lossy(&attr.value).to_string();
                }
                b"media-type" => {
                    item.media_type = String::from_utf8_lossy(&attr.value).to_string();
                }
                b"properties" => {
                    item.properties = Some(String::from_utf8_lossy(&attr.value).to_string());
                }
                _ => {}
            }
        }

        if !item.id.is_empty() && !item.href.is_empty() && !item.media_type.is_empty() {
            manifest.push(item);
        }

        Ok(())
    }

    /// 解析脊柱项
    fn parse_spine_item(e: &BytesStart, spine: &mut Vec<SpineItem>) -> Result<()> {
        let mut spine_item = SpineItem::new(String::new());

        for attr_result in e.attributes() {
            let attr = attr_result?;
            match attr.key.local_name().as_ref() {
                b"idref" => {
                    spine_item.idref = String::from_utf8_lossy(&attr.value).to_string();
                }
                b"linear" => {
                    spine_item.linear = attr.value.as_ref() != b"no";
                }
                _ => {}
            }
        }

        if !spine_item.idref.is_empty() {
            spine.push(spine_item);
        }

        Ok(())
    }

    /// 根据ID获取清单项
    pub fn get_manifest_item(&self, id: &str) -> Option<&ManifestItem> {
        self.manifest.iter().find(|item| item.id == id)
    }

    /// 获取导航文档的路径
    pub fn get_nav_path(&self) -> Option<String> {
        self.manifest
            .iter()
            .find(|item| item.is_nav())
            .map(|item| item.href.clone())
    }

    /// 获取NCX文件的路径
    ///
    /// 优先使用 `<spine toc="...">` 引用的清单项，其次按媒体类型查找。
    pub fn get_ncx_path(&self) -> Option<String> {
        self.spine_toc
            .as_deref()
            .and_then(|toc| self.get_manifest_item(toc))
            .or_else(|| self.manifest.iter().find(|item| item.is_ncx()))
            .map(|item| item.href.clone())
    }

    /// 获取脊柱中所有文档的路径(按阅读顺序)
    pub fn get_spine_paths(&self) -> Vec<String> {
        self.spine
            .iter()
            .filter(|spine_item| spine_item.is_linear())
            .filter_map(|spine_item| self.get_manifest_item(&spine_item.idref))
            .map(|manifest_item| manifest_item.href.clone())
            .collect()
    }

    /// 获取所有章节文件的路径(按阅读顺序，不含导航文档)
    pub fn get_chapter_paths(&self) -> Vec<String> {
        self.spine
            .iter()
            .filter(|spine_item| spine_item.is_linear())
            .filter_map(|spine_item| self.get_manifest_item(&spine_item.idref))
            .filter(|manifest_item| !manifest_item.is_nav())
            .map(|manifest_item| manifest_item.href.clone())
            .collect()
    }

    /// 获取所有CSS文件路径
    pub fn get_css_paths(&self) -> Vec<String> {
        self.manifest
            .iter()
            .filter(|item| item.is_css())
            .map(|item| item.href.clone())
            .collect()
    }
}
