//! 样式表生成

use crate::config::StyleSpec;

/// 根据样式配置生成新建书籍的 `styles.css`
///
/// 除第一个一级标题外，每个标题前强制分页。
pub fn generate_css(style: &StyleSpec) -> String {
    let weight = if style.title_bold { "bold" } else { "normal" };

    format!(
        r#"body {{
  margin: {margin};
  padding: 0;
  line-height: {line_height};
  text-align: {text_align};
}}

p {{
  text-indent: {indent};
  margin: 0 0 {spacing} 0;
  line-height: {line_height};
}}

h1, h2, h3 {{
  text-align: {title_align};
  font-size: {title_size};
  font-weight: {weight};
  margin-top: {margin_top};
  margin-bottom: {margin_bottom};
  page-break-before: always;
}}

h1:first-child {{
  page-break-before: avoid;
}}

.toc-item {{
  margin-bottom: {toc_spacing};
}}

.toc-item a {{
  text-decoration: none;
  color: inherit;
}}
"#,
        margin = style.page_margin,
        line_height = style.line_height,
        text_align = style.text_align,
        indent = style.paragraph_indent,
        spacing = style.paragraph_spacing,
        title_align = style.title_align,
        title_size = style.title_size,
        weight = weight,
        margin_top = style.chapter_margin_top,
        margin_bottom = style.chapter_margin_bottom,
        toc_spacing = style.toc_item_spacing,
    )
}
