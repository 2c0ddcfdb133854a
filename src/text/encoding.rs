//! 字符编码检测模块
//!
//! 先根据BOM判断，再用统计方法检测编码，最终统一转换为UTF-8文本。
//! 解码失败时退回到直接按UTF-8解释，不会返回错误。

use chardetng::EncodingDetector;
use encoding_rs::{BIG5, Encoding, GBK, UTF_8, UTF_16BE, UTF_16LE};

/// 规范化后的源文件编码
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEncoding {
    Utf8,
    Gbk,
    Big5,
    Utf16Le,
    Utf16Be,
    /// 不在常见集合中的其他编码，按检测结果原样解码
    Other(&'static Encoding),
}

impl SourceEncoding {
    /// 将检测器给出的编码名称映射到规范集合
    ///
    /// ASCII 和 Latin-1 一律按 UTF-8 处理。
    ///
    /// # 参数
    /// * `label` - 编码名称（不区分大小写）
    ///
    /// # 返回值
    /// * `Option<SourceEncoding>` - 不属于规范集合时返回None
    pub fn from_label(label: &str) -> Option<SourceEncoding> {
        match label.trim().to_ascii_lowercase().as_str() {
            "gb2312" | "gb18030" | "gbk" => Some(SourceEncoding::Gbk),
            "big5" => Some(SourceEncoding::Big5),
            "utf-16" | "utf-16le" => Some(SourceEncoding::Utf16Le),
            "utf-16be" => Some(SourceEncoding::Utf16Be),
            "utf-8" | "utf8" | "ascii" | "us-ascii" | "iso-8859-1" | "latin1" | "windows-1252" => {
                Some(SourceEncoding::Utf8)
            }
            _ => None,
        }
    }

    fn from_encoding(encoding: &'static Encoding) -> SourceEncoding {
        Self::from_label(encoding.name()).unwrap_or(SourceEncoding::Other(encoding))
    }

    /// 对应的解码器
    pub fn encoding(&self) -> &'static Encoding {
        match self {
            SourceEncoding::Utf8 => UTF_8,
            SourceEncoding::Gbk => GBK,
            SourceEncoding::Big5 => BIG5,
            SourceEncoding::Utf16Le => UTF_16LE,
            SourceEncoding::Utf16Be => UTF_16BE,
            SourceEncoding::Other(encoding) => *encoding,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SourceEncoding::Utf8 => "utf-8",
            SourceEncoding::Gbk => "gbk",
            SourceEncoding::Big5 => "big5",
            SourceEncoding::Utf16Le => "utf-16le",
            SourceEncoding::Utf16Be => "utf-16be",
            SourceEncoding::Other(encoding) => encoding.name(),
        }
    }
}

/// 统计检测不带BOM的字节流的编码
pub fn detect_encoding(bytes: &[u8]) -> SourceEncoding {
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    SourceEncoding::from_encoding(detector.guess(None, true))
}

/// 检测编码并转换为UTF-8文本
///
/// 行尾统一为 `\n`，开头的BOM会被去掉。
///
/// # 参数
/// * `bytes` - 原始文件内容
///
/// # 返回值
/// * `(String, SourceEncoding)` - (解码后的文本, 检测到的编码)
pub fn decode_text(bytes: &[u8]) -> (String, SourceEncoding) {
    let (source, body) = match Encoding::for_bom(bytes) {
        Some((encoding, bom_length)) => (SourceEncoding::from_encoding(encoding), &bytes[bom_length..]),
        None => (detect_encoding(bytes), bytes),
    };

    tracing::debug!("检测到文件编码: {}", source.name());

    let text = decode_as(body, source);
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
    (canonical_line_endings(text), source)
}

/// 按指定编码解码，出现非法字节序列时退回UTF-8
pub fn decode_as(bytes: &[u8], source: SourceEncoding) -> String {
    if source == SourceEncoding::Utf8 {
        return String::from_utf8_lossy(bytes).into_owned();
    }

    let (decoded, had_errors) = source.encoding().decode_without_bom_handling(bytes);
    if had_errors {
        tracing::debug!("按 {} 解码失败，改用UTF-8", source.name());
        String::from_utf8_lossy(bytes).into_owned()
    } else {
        decoded.into_owned()
    }
}

fn canonical_line_endings(text: &str) -> String {
    if !text.contains('\r') {
        return text.to_string();
    }
    text.replace("\r\n", "\n").replace('\r', "\n")
}
