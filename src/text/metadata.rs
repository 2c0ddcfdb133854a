//! 书名与作者提取模块
//!
//! 文件名和正文开头是两个独立的来源，正文给出的值优先。

use crate::config::Rules;
use regex::Regex;

/// 书籍基本信息，作者可以为空
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookInfo {
    pub title: String,
    pub author: String,
}

/// 从正文提取到的部分信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialBookInfo {
    pub title: Option<String>,
    pub author: Option<String>,
}

/// 从文件名提取书名和作者
///
/// 依次去掉扩展名、来源网站标记、开头和末尾的括号标签，然后按固定顺序尝试：
/// 作者《书名》格式、配置中的文件名规则，最后整个剩余字符串作为书名。
///
/// # 参数
/// * `filename` - 原始文件名
/// * `rules` - 编译后的规则集
///
/// # 返回值
/// * `BookInfo` - 提取结果，匹配不到作者时作者为空
pub fn extract_book_info_from_filename(filename: &str, rules: &Rules) -> BookInfo {
    let name = strip_extension(filename);
    let name = rules.site_cleanup.replace_all(name, "");
    let name = strip_repeatedly(&rules.leading_tags, &name);
    let name = strip_repeatedly(&rules.trailing_tags, &name);

    if let Some(caps) = rules.author_first.captures(&name) {
        return BookInfo {
            title: caps[2].trim().to_string(),
            author: caps[1].trim().to_string(),
        };
    }

    for pattern in &rules.filename_patterns {
        if let Some(caps) = pattern.captures(&name) {
            let capture = |index: usize| {
                caps.get(index)
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_default()
            };
            return BookInfo {
                title: capture(1),
                author: capture(2),
            };
        }
    }

    BookInfo {
        title: name.trim().to_string(),
        author: String::new(),
    }
}

/// 从正文开头提取书名和作者
///
/// 只扫描前若干行，每个字段以第一次匹配为准。
pub fn extract_book_info_from_content(text: &str, rules: &Rules) -> PartialBookInfo {
    let mut result = PartialBookInfo::default();

    for line in text.split('\n').take(rules.content_scan_lines) {
        let trimmed = line.trim();

        if result.title.is_none() {
            result.title = first_capture(&rules.content_title_patterns, trimmed);
        }
        if result.author.is_none() {
            result.author = first_capture(&rules.content_author_patterns, trimmed);
        }
        if result.title.is_some() && result.author.is_some() {
            break;
        }
    }

    result
}

/// 合并两个来源，正文优先
pub fn resolve_book_info(from_filename: BookInfo, from_content: PartialBookInfo) -> BookInfo {
    BookInfo {
        title: from_content.title.unwrap_or(from_filename.title),
        author: from_content.author.unwrap_or(from_filename.author),
    }
}

fn strip_extension(filename: &str) -> &str {
    for ext in [".txt", ".epub"] {
        let Some(split) = filename.len().checked_sub(ext.len()) else {
            continue;
        };
        if filename.is_char_boundary(split) && filename[split..].eq_ignore_ascii_case(ext) {
            return &filename[..split];
        }
    }
    filename
}

fn strip_repeatedly(pattern: &Regex, input: &str) -> String {
    let mut current = input.to_string();
    loop {
        let stripped = pattern.replace(&current, "").into_owned();
        if stripped == current {
            return current;
        }
        current = stripped;
    }
}

fn first_capture(patterns: &[Regex], line: &str) -> Option<String> {
    patterns
        .iter()
        .find_map(|pattern| pattern.captures(line))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_filename(name: &str) -> BookInfo {
        extract_book_info_from_filename(name, Rules::builtin())
    }

    #[test]
    fn test_filename_with_site_and_volume_tags() {
        let info = from_filename("凡人修仙传(1-10)(z-lib.sk).txt");
        assert_eq!(info.title, "凡人修仙传");
        assert_eq!(info.author, "");
    }

    #[test]
    fn test_filename_with_multiple_sites() {
        let info = from_filename("Dune (z-library.sk, 1lib.sk, z-lib.sk).epub");
        assert_eq!(info.title, "Dune");
    }

    #[test]
    fn test_filename_leading_and_trailing_tags() {
        let info = from_filename("【完结】【精校】斗破苍穹(精校版)[全本].TXT");
        assert_eq!(info.title, "斗破苍穹");
        assert_eq!(info.author, "");
    }

    #[test]
    fn test_filename_author_first() {
        let info = from_filename("天蚕土豆《斗破苍穹》.txt");
        assert_eq!(info.title, "斗破苍穹");
        assert_eq!(info.author, "天蚕土豆");
    }

    #[test]
    fn test_filename_bracket_title_with_author() {
        let info = from_filename("《斗破苍穹》作者：天蚕土豆.txt");
        assert_eq!(info.title, "斗破苍穹");
        assert_eq!(info.author, "天蚕土豆");

        let info = from_filename("《斗破苍穹》.txt");
        assert_eq!(info.title, "斗破苍穹");
        assert_eq!(info.author, "");
    }

    #[test]
    fn test_filename_author_label() {
        let info = from_filename("斗破苍穹 作者:天蚕土豆.txt");
        assert_eq!(info.title, "斗破苍穹");
        assert_eq!(info.author, "天蚕土豆");
    }

    #[test]
    fn test_filename_by_and_dash() {
        let info = from_filename("Dune by Frank Herbert.txt");
        assert_eq!(info.title, "Dune");
        assert_eq!(info.author, "Frank Herbert");

        let info = from_filename("斗破苍穹 - 天蚕土豆.txt");
        assert_eq!(info.title, "斗破苍穹");
        assert_eq!(info.author, "天蚕土豆");

        let info = from_filename("斗破苍穹_天蚕土豆.txt");
        assert_eq!(info.title, "斗破苍穹");
        assert_eq!(info.author, "天蚕土豆");

        let info = from_filename("斗破苍穹—天蚕土豆.txt");
        assert_eq!(info.title, "斗破苍穹");
        assert_eq!(info.author, "天蚕土豆");
    }

    #[test]
    fn test_filename_hyphen_inside_title() {
        let info = from_filename("Spider-Man.txt");
        assert_eq!(info, BookInfo { title: "Spider-Man".to_string(), author: String::new() });

        let info = from_filename("Harry Potter and the Half-Blood Prince.txt");
        assert_eq!(info.title, "Harry Potter and the Half-Blood Prince");
        assert_eq!(info.author, "");
    }

    #[test]
    fn test_filename_fallback() {
        let info = from_filename("某本书.txt");
        assert_eq!(info, BookInfo { title: "某本书".to_string(), author: String::new() });

        let info = from_filename("notes.md");
        assert_eq!(info.title, "notes.md");
    }

    #[test]
    fn test_content_first_match_wins() {
        let text = "书名：凡人修仙传\n作者：忘语\n\n书名：别的书\n作者：别人\n第一章 初入修仙界";
        let info = extract_book_info_from_content(text, Rules::builtin());
        assert_eq!(info.title.as_deref(), Some("凡人修仙传"));
        assert_eq!(info.author.as_deref(), Some("忘语"));
    }

    #[test]
    fn test_content_secondary_patterns() {
        let text = "  《凡人修仙传》  \nby Wang Yu\n正文开始";
        let info = extract_book_info_from_content(text, Rules::builtin());
        assert_eq!(info.title.as_deref(), Some("凡人修仙传"));
        assert_eq!(info.author.as_deref(), Some("Wang Yu"));
    }

    #[test]
    fn test_content_only_scans_leading_lines() {
        let mut text = "正文\n".repeat(30);
        text.push_str("作者：忘语\n");
        let info = extract_book_info_from_content(&text, Rules::builtin());
        assert_eq!(info, PartialBookInfo::default());
    }

    #[test]
    fn test_content_takes_precedence() {
        let filename_info = BookInfo {
            title: "文件名书名".to_string(),
            author: "文件名作者".to_string(),
        };
        let content_info = PartialBookInfo {
            title: Some("正文书名".to_string()),
            author: None,
        };

        let info = resolve_book_info(filename_info, content_info);
        assert_eq!(info.title, "正文书名");
        assert_eq!(info.author, "文件名作者");
    }
}
