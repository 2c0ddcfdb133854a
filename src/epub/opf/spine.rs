//! 脊柱模块
//!
//! 提供EPUB包中阅读顺序（脊柱）的结构定义。

use quick_xml::escape::escape;

/// 脊柱项信息(阅读顺序)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpineItem {
    /// 引用的清单项ID
    pub idref: String,
    /// 是否线性阅读
    pub linear: bool,
}

impl SpineItem {
    /// 创建新的脊柱项
    pub fn new(idref: impl Into<String>) -> Self {
        Self {
            idref: idref.into(),
            linear: true,
        }
    }

    /// 检查是否为线性阅读
    pub fn is_linear(&self) -> bool {
        self.linear
    }

    /// 生成 `<itemref/>` 元素
    pub fn to_xml(&self) -> String {
        if self.linear {
            format!(r#"<itemref idref="{}"/>"#, escape(&self.idref))
        } else {
            format!(r#"<itemref idref="{}" linear="no"/>"#, escape(&self.idref))
        }
    }
}
