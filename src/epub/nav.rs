//! EPUB3导航文档（nav.xhtml）
//!
//! 生成时写出 `<nav epub:type="toc">` 目录；读回时用 scraper 按HTML解析，容忍不严格的XHTML。

use crate::error::{ForgeError, Result};
use once_cell::sync::Lazy;
use quick_xml::escape::escape;
use scraper::{ElementRef, Html, Selector};

static NAV_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("nav").expect("nav选择器"));
static LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("链接选择器"));
static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("title").expect("title选择器"));
static HEADING_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("body h1").expect("h1选择器"));

/// 目录中的一项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavEntry {
    /// 显示文本
    pub label: String,
    /// 链接目标（相对于导航文档）
    pub href: String,
}

/// 导航文档
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavDocument {
    /// 文档标题（`<title>`）
    pub title: String,
    /// 正文顶部的书名标题
    pub heading: String,
    /// 目录标题（`<nav>` 内的 `<h2>`）
    pub toc_heading: String,
    /// 目录项，按阅读顺序
    pub entries: Vec<NavEntry>,
}

impl NavDocument {
    /// 生成nav.xhtml内容
    pub fn to_xhtml(&self) -> String {
        let items: Vec<String> = self
            .entries
            .iter()
            .map(|entry| {
                format!(
                    r#"<li class="toc-item"><a href="{}">{}</a></li>"#,
                    escape(&entry.href),
                    escape(&entry.label)
                )
            })
            .collect();

        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<head>
  <meta charset="UTF-8"/>
  <title>{}</title>
  <link rel="stylesheet" type="text/css" href="styles.css"/>
</head>
<body>
  <h1>{}</h1>
  <nav epub:type="toc">
    <h2>{}</h2>
    <ol>
    {}
    </ol>
  </nav>
</body>
</html>"#,
            escape(&self.title),
            escape(&self.heading),
            escape(&self.toc_heading),
            items.join("\n    ")
        )
    }

    /// 解析导航文档
    ///
    /// 优先选取 `epub:type` 含 `toc` 的 `<nav>`，没有时退回第一个 `<nav>`。
    ///
    /// # 参数
    /// * `html` - nav.xhtml的文件内容
    ///
    /// # 返回值
    /// * `Result<NavDocument>` - 找不到 `<nav>` 元素时返回 `NavParseError`
    pub fn parse_xhtml(html: &str) -> Result<NavDocument> {
        let document = Html::parse_document(html);

        let navs: Vec<ElementRef> = document.select(&NAV_SELECTOR).collect();
        let nav = navs
            .iter()
            .find(|nav| is_toc_nav(nav))
            .or_else(|| navs.first())
            .ok_or_else(|| ForgeError::NavParseError("没有找到nav元素".to_string()))?;

        let entries = nav
            .select(&LINK_SELECTOR)
            .map(|link| NavEntry {
                label: element_text(&link),
                href: link.value().attr("href").unwrap_or_default().to_string(),
            })
            .collect();

        let toc_heading = nav
            .children()
            .filter_map(ElementRef::wrap)
            .find(|child| matches!(child.value().name(), "h1" | "h2" | "h3"))
            .map(|heading| element_text(&heading))
            .unwrap_or_default();

        Ok(NavDocument {
            title: first_text(&document, &TITLE_SELECTOR),
            heading: first_text(&document, &HEADING_SELECTOR),
            toc_heading,
            entries,
        })
    }

    /// 所有目录项的链接目标
    pub fn hrefs(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.href.clone()).collect()
    }
}

fn is_toc_nav(nav: &ElementRef) -> bool {
    nav.value()
        .attrs()
        .any(|(name, value)| name.ends_with("type") && value.split_whitespace().any(|v| v == "toc"))
}

fn element_text(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn first_text(document: &Html, selector: &Selector) -> String {
    document
        .select(selector)
        .next()
        .map(|element| element_text(&element))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NavDocument {
        NavDocument {
            title: "目录".to_string(),
            heading: "Tom & Jerry".to_string(),
            toc_heading: "目录".to_string(),
            entries: vec![
                NavEntry {
                    label: "序".to_string(),
                    href: "chapter_0.xhtml".to_string(),
                },
                NavEntry {
                    label: "第一章 <开始>".to_string(),
                    href: "chapter_1.xhtml".to_string(),
                },
            ],
        }
    }

    #[test]
    fn test_generated_nav_parses_back() {
        let nav = sample();
        let xhtml = nav.to_xhtml();

        assert!(xhtml.contains(r#"<nav epub:type="toc">"#));
        assert!(xhtml.contains("第一章 &lt;开始&gt;"));

        let parsed = NavDocument::parse_xhtml(&xhtml).unwrap();
        assert_eq!(parsed, nav);
        assert_eq!(parsed.hrefs(), vec!["chapter_0.xhtml", "chapter_1.xhtml"]);
    }

    #[test]
    fn test_prefers_toc_nav() {
        let html = r#"<html><body>
<nav epub:type="landmarks"><ol><li><a href="cover.xhtml">Cover</a></li></ol></nav>
<nav epub:type="toc"><h1>Contents</h1><ol>
  <li><a href="a.xhtml">A</a><ol><li><a href="a.xhtml#s1">A.1</a></li></ol></li>
  <li><a href="b.xhtml">B</a></li>
</ol></nav>
</body></html>"#;

        let nav = NavDocument::parse_xhtml(html).unwrap();
        assert_eq!(nav.toc_heading, "Contents");
        assert_eq!(nav.hrefs(), vec!["a.xhtml", "a.xhtml#s1", "b.xhtml"]);
    }

    #[test]
    fn test_missing_nav() {
        let result = NavDocument::parse_xhtml("<html><body><p>nothing</p></body></html>");
        assert!(matches!(result, Err(ForgeError::NavParseError(_))));
    }
}
