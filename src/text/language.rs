//! 语言识别与标点规范化模块
//!
//! 中文文本把ASCII标点转为全角标点，英文文本做反向转换。
//! 数字上下文受保护：小数点、千分位逗号和数字省略号不会被转换。
//! 引号只转换类型，不重新推断开闭，原文的开闭角色保持不变。

/// 文本语言
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Zh,
    En,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::Zh => "zh",
            Language::En => "en",
        }
    }
}

/// 识别文本语言
///
/// 统计汉字数量和连续英文字母串数量：汉字数超过英文单词数两倍为中文，
/// 英文单词数超过汉字数为英文，其余情况默认中文。
pub fn detect_language(text: &str) -> Language {
    let mut chinese_chars = 0usize;
    let mut english_words = 0usize;
    let mut in_word = false;

    for c in text.chars() {
        if ('\u{4e00}'..='\u{9fff}').contains(&c) {
            chinese_chars += 1;
        }

        if c.is_ascii_alphabetic() {
            if !in_word {
                english_words += 1;
                in_word = true;
            }
        } else {
            in_word = false;
        }
    }

    tracing::debug!("语言统计: 汉字 {} 个, 英文单词 {} 个", chinese_chars, english_words);

    if chinese_chars > english_words * 2 {
        Language::Zh
    } else if english_words > chinese_chars {
        Language::En
    } else {
        Language::Zh
    }
}

/// 按语言规范化标点
///
/// # 参数
/// * `text` - 原文
/// * `language` - 目标语言
///
/// # 返回值
/// * `String` - 规范化后的文本
pub fn normalize_punctuation(text: &str, language: Language) -> String {
    match language {
        Language::Zh => to_chinese_punctuation(text),
        Language::En => to_english_punctuation(text),
    }
}

fn run_length(chars: &[char], start: usize, target: char) -> usize {
    chars[start..].iter().take_while(|&&c| c == target).count()
}

fn to_chinese_punctuation(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut result = String::with_capacity(text.len() + text.len() / 4);
    let mut i = 0;

    while i < chars.len() {
        let next = chars.get(i + 1).copied();
        match chars[i] {
            '.' => {
                let run = run_length(&chars, i, '.');
                if run >= 3 {
                    result.push_str("\u{2026}\u{2026}");
                } else {
                    // 一或两个点：后面紧跟数字或点的保留
                    for k in 0..run {
                        let follower = chars.get(i + k + 1).copied();
                        if matches!(follower, Some(f) if f.is_ascii_digit() || f == '.') {
                            result.push('.');
                        } else {
                            result.push('\u{3002}');
                        }
                    }
                }
                i += run;
                continue;
            }
            '-' => {
                let run = run_length(&chars, i, '-');
                if run >= 2 {
                    result.push_str("\u{2014}\u{2014}");
                } else {
                    result.push('-');
                }
                i += run;
                continue;
            }
            ',' => {
                if matches!(next, Some(n) if n.is_ascii_digit()) {
                    result.push(',');
                } else {
                    result.push('\u{ff0c}');
                }
            }
            '?' => result.push('\u{ff1f}'),
            '!' => result.push('\u{ff01}'),
            ':' => result.push('\u{ff1a}'),
            ';' => result.push('\u{ff1b}'),
            other => result.push(convert_corner_quote(other)),
        }
        i += 1;
    }

    result
}

fn to_english_punctuation(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut result = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        let next = chars.get(i + 1).copied();
        match chars[i] {
            '\u{ff0c}' => result.push(','),
            '\u{3002}' => result.push('.'),
            '\u{ff1f}' => result.push('?'),
            '\u{ff01}' => result.push('!'),
            '\u{ff1a}' => result.push(':'),
            '\u{ff1b}' => result.push(';'),
            '\u{2026}' if next == Some('\u{2026}') => {
                result.push_str("...");
                i += 2;
                continue;
            }
            '\u{2014}' if next == Some('\u{2014}') => {
                result.push_str("--");
                i += 2;
                continue;
            }
            other => result.push(convert_corner_quote(other)),
        }
        i += 1;
    }

    result
}

/// 日文直角引号转为弯引号，开闭角色不变
///
/// 中文双引号与英文弯引号是同一组码位，两个方向都落到这一组上。
fn convert_corner_quote(c: char) -> char {
    match c {
        '\u{300c}' => '\u{201c}',
        '\u{300d}' => '\u{201d}',
        '\u{300e}' => '\u{2018}',
        '\u{300f}' => '\u{2019}',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_chinese() {
        assert_eq!(detect_language("韩立站在山门之前，望着群山。"), Language::Zh);
        assert_eq!(detect_language("他打开了iPhone看了一眼消息，然后放下。"), Language::Zh);
    }

    #[test]
    fn test_detect_english() {
        assert_eq!(detect_language("It was a bright cold day in April."), Language::En);
    }

    #[test]
    fn test_detect_tie_defaults_to_chinese() {
        // 两个汉字、两个单词：既不满足中文条件也不满足英文条件
        assert_eq!(detect_language("你好 hello world"), Language::Zh);
        assert_eq!(detect_language(""), Language::Zh);
    }

    #[test]
    fn test_chinese_basic_punctuation() {
        let result = normalize_punctuation("你好,世界.真的吗?是的!注意:这里;那里", Language::Zh);
        assert_eq!(result, "你好，世界。真的吗？是的！注意：这里；那里");
    }

    #[test]
    fn test_chinese_ellipsis_and_dash() {
        assert_eq!(normalize_punctuation("等等...", Language::Zh), "等等……");
        assert_eq!(normalize_punctuation("等等.....", Language::Zh), "等等……");
        assert_eq!(normalize_punctuation("他说--不", Language::Zh), "他说——不");
        assert_eq!(normalize_punctuation("他说----不", Language::Zh), "他说——不");
        assert_eq!(normalize_punctuation("a-b", Language::Zh), "a-b");
    }

    #[test]
    fn test_chinese_protects_numbers() {
        assert_eq!(normalize_punctuation("价格3.14元", Language::Zh), "价格3.14元");
        assert_eq!(normalize_punctuation("共1,000人", Language::Zh), "共1,000人");
        assert_eq!(normalize_punctuation("版本1..2", Language::Zh), "版本1..2");
        assert_eq!(normalize_punctuation("结束.", Language::Zh), "结束。");
        assert_eq!(normalize_punctuation("a..b", Language::Zh), "a.\u{3002}b");
        assert_eq!(normalize_punctuation("好, 1", Language::Zh), "好， 1");
    }

    #[test]
    fn test_chinese_quotes_keep_roles() {
        assert_eq!(normalize_punctuation("「你好」他说", Language::Zh), "\u{201c}你好\u{201d}他说");
        assert_eq!(normalize_punctuation("『内层』", Language::Zh), "\u{2018}内层\u{2019}");
        // 弯引号原样保留，即使顺序"反了"也不会被重新推断
        assert_eq!(normalize_punctuation("\u{201d}反\u{201c}", Language::Zh), "\u{201d}反\u{201c}");
        // 直引号无法判断开闭，不转换
        assert_eq!(normalize_punctuation("\"直引号\"", Language::Zh), "\"直引号\"");
    }

    #[test]
    fn test_english_punctuation() {
        let result = normalize_punctuation("你好，世界。真的吗？是的！注意：这里；那里……好——吧", Language::En);
        assert_eq!(result, "你好,世界.真的吗?是的!注意:这里;那里...好--吧");
    }

    #[test]
    fn test_english_single_ellipsis_char_kept() {
        assert_eq!(normalize_punctuation("wait\u{2026}", Language::En), "wait\u{2026}");
        assert_eq!(normalize_punctuation("a\u{2014}b", Language::En), "a\u{2014}b");
    }

    #[test]
    fn test_english_quotes_keep_roles() {
        assert_eq!(normalize_punctuation("「Hi」", Language::En), "\u{201c}Hi\u{201d}");
        assert_eq!(normalize_punctuation("\u{201c}Hi\u{201d}", Language::En), "\u{201c}Hi\u{201d}");
    }

    #[test]
    fn test_semi_inverse() {
        let original = "价格是1,000.50元, 真的吗? 是的... 等等--好! 比分3:2; 结束.";
        let chinese = normalize_punctuation(original, Language::Zh);
        assert_eq!(chinese, "价格是1,000.50元， 真的吗？ 是的…… 等等——好！ 比分3：2； 结束。");

        let restored = normalize_punctuation(&chinese, Language::En);
        assert_eq!(restored, original);
    }
}
