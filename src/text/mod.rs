//! 文本处理模块
//!
//! 编码检测、语言识别与标点规范化、书名作者提取、章节切分。

pub mod chapter;
pub mod encoding;
pub mod language;
pub mod metadata;

pub use chapter::{Chapter, chapter_id, is_chapter_title, merge_short_chapters, parse_chapters};
pub use encoding::{SourceEncoding, decode_text, detect_encoding};
pub use language::{Language, detect_language, normalize_punctuation};
pub use metadata::{
    BookInfo,
    PartialBookInfo,
    extract_book_info_from_content,
    extract_book_info_from_filename,
    resolve_book_info,
};

/// 规范化后的文本
#[derive(Debug, Clone)]
pub struct NormalizedText {
    pub text: String,
    pub encoding: SourceEncoding,
    pub language: Language,
}

/// 原始字节 → 规范化文本
///
/// 解码、识别语言（全文一次），再按语言规范化标点。
pub fn normalize(bytes: &[u8]) -> NormalizedText {
    let (decoded, encoding) = decode_text(bytes);
    let (text, language) = normalize_str(&decoded);
    NormalizedText { text, encoding, language }
}

/// 对已经是UTF-8的文本做语言识别与标点规范化
pub fn normalize_str(text: &str) -> (String, Language) {
    let language = detect_language(text);
    tracing::debug!("识别语言: {}", language.code());
    (normalize_punctuation(text, language), language)
}
