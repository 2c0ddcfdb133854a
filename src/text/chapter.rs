//! 章节切分模块
//!
//! 仅依靠行级特征（长度、缩进、引号、日期、标题正则）识别章节标题，
//! 单次线性扫描把正文切成有序的章节列表，再把过短的章节并入前一章。

use crate::config::Rules;
use crate::error::{ForgeError, Result};

/// 章节
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    /// 章节ID，形如 `chapter_0`，合并完成后重新连续编号
    pub id: String,
    /// 章节标题
    pub title: String,
    /// 章节正文（已去除首尾空白）
    pub content: String,
}

impl Chapter {
    pub fn new(index: usize, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: chapter_id(index),
            title: title.into(),
            content: content.into(),
        }
    }

    /// 章节在EPUB中的文件名
    pub fn file_name(&self) -> String {
        format!("{}.xhtml", self.id)
    }

    /// 不计空白的字数
    pub fn content_length(&self) -> usize {
        self.content.chars().filter(|c| !c.is_whitespace()).count()
    }
}

pub fn chapter_id(index: usize) -> String {
    format!("chapter_{}", index)
}

/// 判断一行是否为章节标题
///
/// 需要同时满足：去除首尾空白后非空且不超过最大标题长度；不以引号开头或结尾；
/// 不是日期；行首空白不超过允许的前缀长度；匹配章节标题正则。
///
/// # 参数
/// * `line` - 未去除空白的原始行
/// * `rules` - 编译后的规则集
pub fn is_chapter_title(line: &str, rules: &Rules) -> bool {
    let trimmed = line.trim();

    if trimmed.is_empty() || trimmed.chars().count() > rules.max_title_length {
        return false;
    }

    let is_quote = |c: Option<char>| c.is_some_and(|c| rules.quote_chars.contains(&c));
    if is_quote(trimmed.chars().next()) || is_quote(trimmed.chars().last()) {
        return false;
    }

    if rules.date.is_match(trimmed) {
        return false;
    }

    let leading_spaces = line.chars().take_while(|c| c.is_whitespace()).count();
    if leading_spaces > rules.title_prefix_length {
        return false;
    }

    rules.chapter.is_match(trimmed)
}

/// 切分状态
enum SegmentState {
    /// 还没有遇到任何章节标题
    Outside,
    /// 正在累积某个章节的正文
    Inside(Chapter),
}

/// 把正文切分为章节
///
/// 第一个标题之前的内容作为"序"章；全文没有标题时整体作为一章。
/// 正文为空的章节会被丢弃。
///
/// # 参数
/// * `text` - 规范化后的全文
/// * `rules` - 编译后的规则集
///
/// # 返回值
/// * `Result<Vec<Chapter>>` - 一个章节都没有时返回 `ForgeError::NoChapters`
pub fn parse_chapters(text: &str, rules: &Rules) -> Result<Vec<Chapter>> {
    let mut chapters = Vec::new();
    let mut state = SegmentState::Outside;
    let mut body: Vec<&str> = Vec::new();
    let mut chapter_index = 0usize;

    for line in text.split('\n') {
        if !is_chapter_title(line, rules) {
            body.push(line);
            continue;
        }

        let content = body.join("\n").trim().to_string();
        match std::mem::replace(&mut state, SegmentState::Outside) {
            SegmentState::Inside(mut chapter) => {
                if !content.is_empty() {
                    chapter.content = content;
                    chapters.push(chapter);
                }
            }
            SegmentState::Outside => {
                if !content.is_empty() {
                    chapters.push(Chapter::new(chapter_index, rules.prologue_title.as_str(), content));
                    chapter_index += 1;
                }
            }
        }

        state = SegmentState::Inside(Chapter::new(chapter_index, line.trim(), String::new()));
        chapter_index += 1;
        body.clear();
    }

    let content = body.join("\n").trim().to_string();
    match state {
        SegmentState::Inside(mut chapter) => {
            if !content.is_empty() {
                chapter.content = content;
                chapters.push(chapter);
            }
        }
        SegmentState::Outside => {
            if !content.is_empty() {
                chapters.push(Chapter::new(0, rules.body_title.as_str(), content));
            }
        }
    }

    if chapters.is_empty() {
        return Err(ForgeError::NoChapters);
    }

    tracing::debug!("识别到 {} 个章节", chapters.len());
    Ok(chapters)
}

/// 合并短章节
///
/// 不计空白字数低于阈值的章节并入紧邻的前一章（空行分隔，丢弃自身标题）。
/// 第一章没有前一章，即使过短也保留。合并完成后重新从0连续编号。
pub fn merge_short_chapters(chapters: Vec<Chapter>, rules: &Rules) -> Vec<Chapter> {
    let mut merged: Vec<Chapter> = Vec::with_capacity(chapters.len());

    for chapter in chapters {
        match merged.last_mut() {
            Some(previous) if chapter.content_length() < rules.min_chapter_length => {
                tracing::debug!("短章节 \"{}\" 并入 \"{}\"", chapter.title, previous.title);
                previous.content.push_str("\n\n");
                previous.content.push_str(&chapter.content);
            }
            _ => merged.push(chapter),
        }
    }

    for (index, chapter) in merged.iter_mut().enumerate() {
        chapter.id = chapter_id(index);
    }

    merged
}
