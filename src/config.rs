//! 转换配置模块
//!
//! 所有正则规则、阈值和样式方案都集中在一个不可变的 [`ForgeConfig`] 中，
//! 支持从YAML文件加载，也可以生成默认配置文件。各组件只接收编译后的
//! [`Rules`]，不依赖模块级全局变量。

use crate::error::{ForgeError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "kindleforge.yaml";

/// 排版样式方案
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleSpec {
    /// 页面边距
    pub page_margin: String,
    /// 行高
    pub line_height: String,
    /// 正文对齐方式
    pub text_align: String,
    /// 段首缩进
    pub paragraph_indent: String,
    /// 段落间距
    pub paragraph_spacing: String,
    /// 标题对齐方式
    pub title_align: String,
    /// 标题字号
    pub title_size: String,
    /// 标题是否加粗
    pub title_bold: bool,
    /// 章节标题上边距
    pub chapter_margin_top: String,
    /// 章节标题下边距
    pub chapter_margin_bottom: String,
    /// 目录项间距
    pub toc_item_spacing: String,
}

/// 两套独立的样式方案
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleProfiles {
    /// TXT转换生成的新书
    pub txt: StyleSpec,
    /// 调整已有EPUB
    pub epub: StyleSpec,
}

/// 章节识别配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentationConfig {
    /// 章节标题正则
    pub chapter_pattern: String,
    /// 日期行正则（匹配的行不会被当作标题）
    pub date_pattern: String,
    /// 引号字符，以这些字符开头或结尾的行视为对话
    pub quote_chars: String,
    /// 标题最大长度（字符数）
    pub max_title_length: usize,
    /// 标题前允许的最大空白字符数
    pub title_prefix_length: usize,
    /// 章节最少字数（不含空白），低于该值合并到前一章
    pub min_chapter_length: usize,
    /// 从正文提取书名作者时扫描的行数
    pub content_scan_lines: usize,
    /// 首个章节之前内容的标题
    pub prologue_title: String,
    /// 没有识别到章节时整本书的标题
    pub body_title: String,
}

/// 书名作者提取配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataConfig {
    /// 文件名中的来源网站标记
    pub site_cleanup_pattern: String,
    /// 文件名开头的括号标签
    pub leading_tag_pattern: String,
    /// 文件名末尾的括号标签
    pub trailing_tag_pattern: String,
    /// 作者《书名》格式
    pub author_first_pattern: String,
    /// 文件名匹配规则，按优先级排列，第一个捕获组为书名，第二个（可选）为作者
    pub filename_patterns: Vec<String>,
    /// 正文书名匹配规则
    pub content_title_patterns: Vec<String>,
    /// 正文作者匹配规则
    pub content_author_patterns: Vec<String>,
    /// 作者为空时写入EPUB的占位
    pub unknown_author: String,
    /// EPUB语言标签
    pub language_tag: String,
}

/// 投递相关配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// 最大文件大小（字节）
    pub max_file_size: u64,
    /// 接受的扩展名
    pub accepted_extensions: Vec<String>,
    /// 去重缓存容量
    pub dedup_capacity: usize,
}

/// 完整配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgeConfig {
    pub segmentation: SegmentationConfig,
    pub metadata: MetadataConfig,
    pub styles: StyleProfiles,
    pub delivery: DeliveryConfig,
}

impl ForgeConfig {
    /// 从指定YAML文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| ForgeError::ConfigError(format!("无法读取配置文件: {}", e)))?;

        serde_yml::from_str(&content)
            .map_err(|e| ForgeError::ConfigError(format!("配置文件格式错误: {}", e)))
    }

    /// 生成默认配置文件
    pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let yaml_content = serde_yml::to_string(&Self::default_config())
            .map_err(|e| ForgeError::ConfigError(format!("序列化配置失败: {}", e)))?;

        let content_with_header = format!(
            "# kindleforge 配置文件\n# 章节识别、书名提取规则与排版样式\n# 正则表达式使用 Rust regex 语法\n\n{}",
            yaml_content
        );

        fs::write(path, content_with_header)
            .map_err(|e| ForgeError::ConfigError(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }

    /// 加载配置文件，文件不存在时先生成默认配置
    ///
    /// 文件存在但内容有误时返回错误，不会覆盖用户的文件。
    pub fn load_or_init<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::from_file(path);
        }

        if let Err(e) = Self::generate_default_config(path) {
            tracing::warn!("无法生成默认配置文件 {}: {}", path.display(), e);
        }
        Ok(Self::default_config())
    }

    /// 默认配置
    pub fn default_config() -> Self {
        Self {
            segmentation: SegmentationConfig {
                chapter_pattern: concat!(
                    r"^(?:",
                    r"第\s*[0-9０-９零〇一二两三四五六七八九十百千万]+\s*[章节回卷集部篇话幕].*",
                    r"|(?i:chapter|chap[.。]?)\s*(?i:[0-9]+|[ivxlcdm]+|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve)\b.*",
                    r"|卷\s*[0-9０-９零〇一二两三四五六七八九十百千]+(?:\s.*)?",
                    r"|(?:序章|序言|序幕|序|楔子|引子|引言|前言|尾声|终章|后记|番外)(?:[\s:：·].*|[0-9一二三四五六七八九十]*)",
                    r"|【[^】]*[章回节卷][^】]*】.*",
                    r"|(?:[0-9]{1,4}|[零〇一二三四五六七八九十百千]+)、.+",
                    r")$"
                )
                .to_string(),
                date_pattern: concat!(
                    r"^(?:[0-9０-９]{2,4}\s*[-/.年]\s*[0-9０-９]{1,2}\s*[-/.月]\s*[0-9０-９]{1,2}",
                    r"|[0-9０-９]{1,2}\s*月\s*[0-9０-９]{1,2}\s*日)"
                )
                .to_string(),
                quote_chars: "\"'“”‘’「」『』".to_string(),
                max_title_length: 50,
                title_prefix_length: 4,
                min_chapter_length: 100,
                content_scan_lines: 30,
                prologue_title: "序".to_string(),
                body_title: "正文".to_string(),
            },
            metadata: MetadataConfig {
                site_cleanup_pattern: r"(?i)\s*[(\[（【［][^)\]）】］]*(?:z-?lib(?:rary)?|1lib|libgen|anna['’]?s[\s-]?archive)[^)\]）】］]*[)\]）】］]".to_string(),
                leading_tag_pattern: r"^(?:[\[【［（(][^\]】］）)]*[\]】］）)]\s*)+".to_string(),
                trailing_tag_pattern: r"(?:\s*[\[【［（(][^\]】］）)]*[\]】］）)])+$".to_string(),
                author_first_pattern: r"^(.+?)《(.+?)》$".to_string(),
                filename_patterns: vec![
                    r"^《(.+?)》\s*(?:作者[:：]?\s*|[-_—–\s]+)(.+)$".to_string(),
                    r"^《(.+?)》$".to_string(),
                    r"^(.+?)\s*作者[:：]\s*(.+)$".to_string(),
                    r"(?i)^(.+?)\s+by\s+(.+)$".to_string(),
                    r"^(.+?)\s+[-—–]+\s+(.+)$".to_string(),
                    r"^(.+?)\s*(?:_+|—+)\s*(.+)$".to_string(),
                ],
                content_title_patterns: vec![
                    r"^(?:书名|书\s+名|标题|(?i:title))\s*[:：]\s*(.+)$".to_string(),
                    r"^《(.+)》$".to_string(),
                ],
                content_author_patterns: vec![
                    r"^(?:作者|作\s+者|著者|(?i:author))\s*[:：]\s*(.+)$".to_string(),
                    r"^(?i:by)\s+(.+)$".to_string(),
                ],
                unknown_author: "未知".to_string(),
                language_tag: "zh-CN".to_string(),
            },
            styles: StyleProfiles {
                txt: StyleSpec {
                    page_margin: "0 5%".to_string(),
                    line_height: "1.8".to_string(),
                    text_align: "justify".to_string(),
                    paragraph_indent: "2em".to_string(),
                    paragraph_spacing: "0.8em".to_string(),
                    title_align: "center".to_string(),
                    title_size: "1.4em".to_string(),
                    title_bold: true,
                    chapter_margin_top: "2em".to_string(),
                    chapter_margin_bottom: "1.5em".to_string(),
                    toc_item_spacing: "0.5em".to_string(),
                },
                epub: StyleSpec {
                    page_margin: "0".to_string(),
                    line_height: "1.8".to_string(),
                    text_align: "justify".to_string(),
                    paragraph_indent: "2em".to_string(),
                    paragraph_spacing: "0.6em".to_string(),
                    title_align: "center".to_string(),
                    title_size: "1.4em".to_string(),
                    title_bold: true,
                    chapter_margin_top: "1em".to_string(),
                    chapter_margin_bottom: "1em".to_string(),
                    toc_item_spacing: "0.5em".to_string(),
                },
            },
            delivery: DeliveryConfig {
                max_file_size: 10 * 1024 * 1024,
                accepted_extensions: vec!["txt".to_string(), "epub".to_string()],
                dedup_capacity: 1000,
            },
        }
    }
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

/// 编译后的规则集
#[derive(Debug, Clone)]
pub struct Rules {
    pub chapter: Regex,
    pub date: Regex,
    pub quote_chars: Vec<char>,
    pub max_title_length: usize,
    pub title_prefix_length: usize,
    pub min_chapter_length: usize,
    pub content_scan_lines: usize,
    pub prologue_title: String,
    pub body_title: String,
    pub site_cleanup: Regex,
    pub leading_tags: Regex,
    pub trailing_tags: Regex,
    pub author_first: Regex,
    pub filename_patterns: Vec<Regex>,
    pub content_title_patterns: Vec<Regex>,
    pub content_author_patterns: Vec<Regex>,
    pub unknown_author: String,
    pub language_tag: String,
    pub styles: StyleProfiles,
}

static BUILTIN_RULES: Lazy<Rules> = Lazy::new(|| {
    Rules::compile(&ForgeConfig::default_config()).expect("内置规则必须可以编译")
});

impl Rules {
    /// 编译配置中的所有正则
    ///
    /// # 参数
    /// * `config` - 转换配置
    ///
    /// # 返回值
    /// * `Result<Rules>` - 任意一条正则无效时返回 `ForgeError::Regex`
    pub fn compile(config: &ForgeConfig) -> Result<Rules> {
        let seg = &config.segmentation;
        let meta = &config.metadata;

        Ok(Rules {
            chapter: Regex::new(&seg.chapter_pattern)?,
            date: Regex::new(&seg.date_pattern)?,
            quote_chars: seg.quote_chars.chars().collect(),
            max_title_length: seg.max_title_length,
            title_prefix_length: seg.title_prefix_length,
            min_chapter_length: seg.min_chapter_length,
            content_scan_lines: seg.content_scan_lines,
            prologue_title: seg.prologue_title.clone(),
            body_title: seg.body_title.clone(),
            site_cleanup: Regex::new(&meta.site_cleanup_pattern)?,
            leading_tags: Regex::new(&meta.leading_tag_pattern)?,
            trailing_tags: Regex::new(&meta.trailing_tag_pattern)?,
            author_first: Regex::new(&meta.author_first_pattern)?,
            filename_patterns: compile_all(&meta.filename_patterns)?,
            content_title_patterns: compile_all(&meta.content_title_patterns)?,
            content_author_patterns: compile_all(&meta.content_author_patterns)?,
            unknown_author: meta.unknown_author.clone(),
            language_tag: meta.language_tag.clone(),
            styles: config.styles.clone(),
        })
    }

    /// 内置默认规则，首次使用时编译
    pub fn builtin() -> &'static Rules {
        &BUILTIN_RULES
    }
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| Regex::new(p).map_err(ForgeError::from))
        .collect()
}
