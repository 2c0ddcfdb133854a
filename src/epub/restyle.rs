//! EPUB样式调整
//!
//! 统一已有EPUB的行高与段落间距：改写样式表中的 `line-height`，并向样式表和
//! XHTML文档追加一段带标记注释的补充样式。其余条目按原样逐字节复制。

use crate::config::{Rules, StyleSpec};
use crate::epub::reader::Epub;
use crate::error::Result;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// 补充样式的标记注释，已带此标记的条目不会再次注入
pub const STYLE_MARKER: &str = "/* Injected by kindleforge */";

static LINE_HEIGHT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(^|[\s;{])line-height\s*:\s*[^;!}]*[^;!}\s]").expect("行高正则"));
static HEAD_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</head\s*>").expect("head正则"));
static BODY_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<body[\s>/]").expect("body正则"));

/// 需要处理的条目类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MemberKind {
    Stylesheet,
    Markup,
}

impl MemberKind {
    fn of(name: &str) -> Option<MemberKind> {
        let extension = name.rsplit_once('.')?.1.to_ascii_lowercase();
        match extension.as_str() {
            "css" => Some(MemberKind::Stylesheet),
            "xhtml" | "html" | "htm" => Some(MemberKind::Markup),
            _ => None,
        }
    }
}

/// 调整EPUB样式
///
/// # 参数
/// * `bytes` - 原始EPUB归档
/// * `style` - 目标样式（通常为 `styles.epub` 配置）
///
/// # 返回值
/// * `Result<Vec<u8>>` - 新的归档；不是ZIP时返回 `Zip` 错误，缺少mimetype时返回 `MissingMimetype`
pub fn restyle_epub(bytes: &[u8], style: &StyleSpec) -> Result<Vec<u8>> {
    let mut epub = Epub::new(Cursor::new(bytes))?;
    let archive = epub.archive_mut();
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    let mut rewritten_count = 0usize;

    for i in 0..archive.len() {
        let (name, kind, compression) = {
            let entry = archive.by_index_raw(i)?;
            let name = entry.name().to_string();
            let kind = if entry.is_dir() { None } else { MemberKind::of(&name) };
            (name, kind, entry.compression())
        };

        let rewritten = match kind {
            Some(kind) => {
                let mut data = Vec::new();
                archive.by_index(i)?.read_to_end(&mut data)?;
                match String::from_utf8(data) {
                    Ok(text) => {
                        let updated = match kind {
                            MemberKind::Stylesheet => restyle_stylesheet(&text, style),
                            MemberKind::Markup => restyle_markup(&text, style),
                        };
                        (updated != text).then_some(updated)
                    }
                    Err(_) => {
                        tracing::warn!("{} 不是UTF-8文本，原样保留", name);
                        None
                    }
                }
            }
            None => None,
        };

        match rewritten {
            Some(text) => {
                let options = match compression {
                    CompressionMethod::Stored => {
                        SimpleFileOptions::default().compression_method(CompressionMethod::Stored)
                    }
                    _ => SimpleFileOptions::default()
                        .compression_method(CompressionMethod::Deflated)
                        .compression_level(Some(9)),
                };
                writer.start_file(name.as_str(), options)?;
                writer.write_all(text.as_bytes())?;
                rewritten_count += 1;
            }
            None => writer.raw_copy_file(archive.by_index_raw(i)?)?,
        }
    }

    tracing::debug!("样式调整: 改写 {} 个条目", rewritten_count);
    Ok(writer.finish()?.into_inner())
}

/// 补充样式规则
///
/// 强制 `body, p, div, span` 的行高；重置段落的外边距和上下内边距，
/// 类名中含 title/heading/chapter/h1/h2/h3 的段落除外。
pub fn supplementary_rules(style: &StyleSpec) -> String {
    format!(
        r#"{marker}
body, p, div, span {{ line-height: {line_height} !important; }}
p:not([class*="title"]):not([class*="heading"]):not([class*="chapter"]):not([class*="h1"]):not([class*="h2"]):not([class*="h3"]) {{ margin: 0 0 {spacing} 0 !important; padding-top: 0 !important; padding-bottom: 0 !important; }}
"#,
        marker = STYLE_MARKER,
        line_height = style.line_height,
        spacing = style.paragraph_spacing
    )
}

/// 改写样式表
///
/// 所有 `line-height` 声明的值替换为目标行高（保留 `!important`），
/// 没有标记注释时在末尾追加补充样式。
pub fn restyle_stylesheet(css: &str, style: &StyleSpec) -> String {
    let mut css = LINE_HEIGHT
        .replace_all(css, |caps: &Captures| format!("{}line-height: {}", &caps[1], style.line_height))
        .into_owned();

    if !css.contains(STYLE_MARKER) {
        if !css.is_empty() && !css.ends_with('\n') {
            css.push('\n');
        }
        css.push('\n');
        css.push_str(&supplementary_rules(style));
    }

    css
}

/// 向XHTML文档注入 `<style>` 块
///
/// 插在第一个 `</head>` 之前；没有 `</head>` 时插在第一个 `<body` 之前；都没有则不变。
pub fn restyle_markup(html: &str, style: &StyleSpec) -> String {
    if html.contains(STYLE_MARKER) {
        return html.to_string();
    }

    let Some(position) = HEAD_CLOSE
        .find(html)
        .or_else(|| BODY_OPEN.find(html))
        .map(|m| m.start())
    else {
        return html.to_string();
    };

    let style_tag = format!("<style type=\"text/css\">\n{}</style>\n", supplementary_rules(style));

    let mut output = String::with_capacity(html.len() + style_tag.len());
    output.push_str(&html[..position]);
    output.push_str(&style_tag);
    output.push_str(&html[position..]);
    output
}

/// 清理文件名中的来源网站标记
pub fn clean_filename(name: &str, rules: &Rules) -> String {
    rules.site_cleanup.replace_all(name, "").trim().to_string()
}
