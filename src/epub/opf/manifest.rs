//! 清单模块
//!
//! 提供EPUB包中文件清单的结构定义。

use quick_xml::escape::escape;

/// XHTML文档的媒体类型
pub const XHTML_MEDIA_TYPE: &str = "application/xhtml+xml";
/// CSS样式表的媒体类型
pub const CSS_MEDIA_TYPE: &str = "text/css";
/// NCX文件的媒体类型
pub const NCX_MEDIA_TYPE: &str = "application/x-dtbncx+xml";

/// 清单项信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    /// 项目ID
    pub id: String,
    /// 文件路径(相对于OPF文件)
    pub href: String,
    /// 媒体类型
    pub media_type: String,
    /// 属性(如nav、cover-image等)
    pub properties: Option<String>,
}

impl ManifestItem {
    /// 创建新的清单项
    pub fn new(id: impl Into<String>, href: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            href: href.into(),
            media_type: media_type.into(),
            properties: None,
        }
    }

    /// 创建带属性的清单项
    pub fn with_properties(
        id: impl Into<String>,
        href: impl Into<String>,
        media_type: impl Into<String>,
        properties: impl Into<String>,
    ) -> Self {
        Self {
            properties: Some(properties.into()),
            ..Self::new(id, href, media_type)
        }
    }

    /// 检查是否包含指定属性
    pub fn has_property(&self, property: &str) -> bool {
        self.properties
            .as_deref()
            .is_some_and(|properties| properties.split_whitespace().any(|p| p == property))
    }

    /// 检查是否为导航文档
    pub fn is_nav(&self) -> bool {
        self.has_property("nav")
    }

    /// 检查是否为NCX文件
    pub fn is_ncx(&self) -> bool {
        self.media_type == NCX_MEDIA_TYPE
    }

    /// 检查是否为CSS文件
    pub fn is_css(&self) -> bool {
        self.media_type == CSS_MEDIA_TYPE
    }

    /// 检查是否为XHTML文件
    pub fn is_xhtml(&self) -> bool {
        self.media_type == XHTML_MEDIA_TYPE
    }

    /// 生成 `<item/>` 元素
    pub fn to_xml(&self) -> String {
        let properties = self
            .properties
            .as_deref()
            .map(|p| format!(r#" properties="{}""#, escape(p)))
            .unwrap_or_default();

        format!(
            r#"<item id="{}" href="{}" media-type="{}"{}/>"#,
            escape(&self.id),
            escape(&self.href),
            escape(&self.media_type),
            properties
        )
    }
}
