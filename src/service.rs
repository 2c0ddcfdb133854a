//! 投递编排
//!
//! 处理聊天机器人收到的一条更新：去重、回复帮助、按大小和扩展名筛选文件、
//! 转换或调整样式，再交给邮件投递到Kindle。网络传输由调用方实现下面的三个trait。

use crate::config::{DeliveryConfig, Rules};
use crate::convert::{self, Conversion};
use crate::error::Result;
use serde::Deserialize;
use std::collections::{HashSet, VecDeque};

/// EPUB附件的MIME类型
pub const EPUB_CONTENT_TYPE: &str = "application/epub+zip";

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// 下载聊天中的文件
pub trait FileSource {
    fn fetch(&mut self, file_id: &str) -> Result<Vec<u8>>;
}

/// 向聊天发送文本消息（HTML格式）
pub trait Messenger {
    fn send_message(&mut self, chat_id: i64, text: &str) -> Result<()>;
}

/// 把EPUB作为邮件附件发送到Kindle邮箱
pub trait Mailer {
    fn send_epub(&mut self, attachment: &Attachment) -> Result<()>;
}

/// 聊天更新
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub document: Option<Document>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Chat {
    pub id: i64,
}

/// 用户发送的文件
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Document {
    pub file_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

/// 邮件附件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

impl Attachment {
    /// 创建EPUB附件，文件名保证以 `.epub` 结尾
    pub fn epub(filename: &str, bytes: Vec<u8>) -> Self {
        Self {
            filename: ensure_epub_extension(filename),
            bytes,
            content_type: EPUB_CONTENT_TYPE,
        }
    }
}

/// 确保文件名以 `.epub` 结尾，否则替换最后一个扩展名
pub fn ensure_epub_extension(filename: &str) -> String {
    if filename.to_lowercase().ends_with(".epub") {
        return filename.to_string();
    }

    let stem = match filename.rsplit_once('.') {
        Some((stem, extension)) if !extension.is_empty() => stem,
        _ => filename,
    };
    format!("{}.epub", stem)
}

/// 已处理更新ID的有界缓存
///
/// 超出容量时淘汰最早加入的ID。
#[derive(Debug, Clone)]
pub struct UpdateCache {
    capacity: usize,
    order: VecDeque<i64>,
    seen: HashSet<i64>,
}

impl UpdateCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity.min(1024)),
            seen: HashSet::with_capacity(capacity.min(1024)),
        }
    }

    pub fn contains(&self, update_id: i64) -> bool {
        self.seen.contains(&update_id)
    }

    /// 记录一个ID
    ///
    /// # 返回值
    /// * `bool` - 首次出现返回 `true`，重复返回 `false`
    pub fn mark(&mut self, update_id: i64) -> bool {
        if !self.seen.insert(update_id) {
            return false;
        }
        self.order.push_back(update_id);

        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// 文件被拒绝的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    TooLarge,
    UnsupportedFormat,
}

/// 一条更新的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// 重复的更新
    Duplicate,
    /// 没有可处理的内容
    Ignored,
    /// 回复了帮助信息
    Help,
    /// 文件被拒绝
    Rejected(Rejection),
    /// 已投递，附带附件文件名
    Delivered(String),
    /// 处理失败，附带原因
    Failed(String),
}

/// 支持的文件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Txt,
    Epub,
}

/// 更新分发器
pub struct Dispatcher<'a, F, M, S> {
    rules: &'a Rules,
    delivery: DeliveryConfig,
    processed: UpdateCache,
    source: F,
    messenger: M,
    mailer: S,
}

impl<'a, F, M, S> Dispatcher<'a, F, M, S>
where
    F: FileSource,
    M: Messenger,
    S: Mailer,
{
    pub fn new(rules: &'a Rules, delivery: DeliveryConfig, source: F, messenger: M, mailer: S) -> Self {
        let processed = UpdateCache::new(delivery.dedup_capacity);
        Self {
            rules,
            delivery,
            processed,
            source,
            messenger,
            mailer,
        }
    }

    pub fn source(&self) -> &F {
        &self.source
    }

    pub fn messenger(&self) -> &M {
        &self.messenger
    }

    pub fn mailer(&self) -> &S {
        &self.mailer
    }

    /// 帮助信息
    pub fn help_message(&self) -> String {
        format!(
            "📚 <b>Kindle Bot 使用说明</b>\n\n\
             发送 <b>TXT</b> 文件：\n\
             • 自动转换为 EPUB 格式\n\
             • 智能识别书名、作者和章节\n\
             • 发送到您的 Kindle\n\n\
             发送 <b>EPUB</b> 文件：\n\
             • 自动调整行高和段间距\n\
             • 清理文件名中的 (Z-Library)\n\
             • 发送到您的 Kindle\n\n\
             ⚠️ 文件大小限制：{}MB",
            to_megabytes(self.delivery.max_file_size)
        )
    }

    /// 处理一条更新
    ///
    /// 转换、下载和投递中的错误会报告给用户并返回 `Outcome::Failed`；
    /// 只有发送消息本身失败时才返回错误。
    ///
    /// # 参数
    /// * `update` - 聊天更新
    ///
    /// # 返回值
    /// * `Result<Outcome>` - 处理结果
    pub fn handle_update(&mut self, update: &Update) -> Result<Outcome> {
        if !self.processed.mark(update.update_id) {
            tracing::info!("跳过已处理的 update_id: {}", update.update_id);
            return Ok(Outcome::Duplicate);
        }

        let Some(message) = &update.message else {
            return Ok(Outcome::Ignored);
        };
        let chat_id = message.chat.id;

        if let Some(text) = &message.text {
            let command = text.trim().to_lowercase();
            if command == "/start" || command == "/help" {
                let help = self.help_message();
                self.messenger.send_message(chat_id, &help)?;
                return Ok(Outcome::Help);
            }
        }

        match &message.document {
            Some(document) => self.handle_document(chat_id, document),
            None => Ok(Outcome::Ignored),
        }
    }

    fn handle_document(&mut self, chat_id: i64, document: &Document) -> Result<Outcome> {
        let filename = document.file_name.as_deref().unwrap_or("unknown");
        let file_size = document.file_size.unwrap_or(0);

        if file_size > self.delivery.max_file_size {
            let text = format!(
                "❌ 文件过大，不予处理。\n\n文件大小：{}MB\n限制：{}MB",
                to_megabytes(file_size),
                to_megabytes(self.delivery.max_file_size)
            );
            self.messenger.send_message(chat_id, &text)?;
            return Ok(Outcome::Rejected(Rejection::TooLarge));
        }

        let Some(kind) = self.file_kind(filename) else {
            self.messenger
                .send_message(chat_id, "❌ 不支持的文件格式。\n\n请发送 TXT 或 EPUB 文件。")?;
            return Ok(Outcome::Rejected(Rejection::UnsupportedFormat));
        };

        self.messenger.send_message(chat_id, "⏳ 正在处理文件...")?;

        match self.process(chat_id, document, filename, kind) {
            Ok(attachment_name) => {
                self.messenger
                    .send_message(chat_id, &format!("✅ 已发送到 Kindle！\n\n📚 {}", attachment_name))?;
                Ok(Outcome::Delivered(attachment_name))
            }
            Err(err) => {
                tracing::error!("处理文件错误: {} ({})", err, filename);
                let cause = err.to_string();
                self.messenger.send_message(chat_id, &format!("❌ 处理失败：{}", cause))?;
                Ok(Outcome::Failed(cause))
            }
        }
    }

    /// 下载、转换并投递，返回附件文件名
    fn process(&mut self, chat_id: i64, document: &Document, filename: &str, kind: FileKind) -> Result<String> {
        let bytes = self.source.fetch(&document.file_id)?;

        let Conversion { bytes, filename: output_name, .. } = match kind {
            FileKind::Txt => {
                self.messenger.send_message(chat_id, "📖 正在转换 TXT 为 EPUB...")?;
                convert::txt_bytes_to_epub(&bytes, filename, self.rules)?
            }
            FileKind::Epub => {
                self.messenger.send_message(chat_id, "✨ 正在调整 EPUB 样式...")?;
                convert::restyle(&bytes, filename, self.rules)?
            }
        };

        self.messenger.send_message(chat_id, "📧 正在发送到 Kindle...")?;
        let attachment = Attachment::epub(&output_name, bytes);
        self.mailer.send_epub(&attachment)?;

        Ok(attachment.filename)
    }

    fn file_kind(&self, filename: &str) -> Option<FileKind> {
        let extension = filename.rsplit('.').next().unwrap_or_default().to_lowercase();
        if !self
            .delivery
            .accepted_extensions
            .iter()
            .any(|accepted| accepted.eq_ignore_ascii_case(&extension))
        {
            return None;
        }

        match extension.as_str() {
            "txt" => Some(FileKind::Txt),
            "epub" => Some(FileKind::Epub),
            _ => None,
        }
    }
}

fn to_megabytes(bytes: u64) -> u64 {
    (bytes as f64 / BYTES_PER_MB).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ForgeConfig;
    use crate::epub::builder::{ArchiveEntry, write_archive};
    use crate::error::ForgeError;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemorySource {
        files: HashMap<String, Vec<u8>>,
        fetched: Vec<String>,
    }

    impl FileSource for MemorySource {
        fn fetch(&mut self, file_id: &str) -> Result<Vec<u8>> {
            self.fetched.push(file_id.to_string());
            self.files
                .get(file_id)
                .cloned()
                .ok_or_else(|| ForgeError::Delivery("无法获取文件路径".to_string()))
        }
    }

    #[derive(Default)]
    struct RecordingMessenger {
        sent: Vec<(i64, String)>,
    }

    impl Messenger for RecordingMessenger {
        fn send_message(&mut self, chat_id: i64, text: &str) -> Result<()> {
            self.sent.push((chat_id, text.to_string()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingMailer {
        delivered: Vec<Attachment>,
        fail: bool,
    }

    impl Mailer for RecordingMailer {
        fn send_epub(&mut self, attachment: &Attachment) -> Result<()> {
            if self.fail {
                return Err(ForgeError::Delivery("SMTP连接失败".to_string()));
            }
            self.delivered.push(attachment.clone());
            Ok(())
        }
    }

    type TestDispatcher = Dispatcher<'static, MemorySource, RecordingMessenger, RecordingMailer>;

    fn dispatcher(files: Vec<(&str, Vec<u8>)>) -> TestDispatcher {
        let source = MemorySource {
            files: files.into_iter().map(|(id, bytes)| (id.to_string(), bytes)).collect(),
            fetched: Vec::new(),
        };
        Dispatcher::new(
            Rules::builtin(),
            ForgeConfig::default().delivery,
            source,
            RecordingMessenger::default(),
            RecordingMailer::default(),
        )
    }

    fn text_update(update_id: i64, text: &str) -> Update {
        Update {
            update_id,
            message: Some(Message {
                message_id: update_id,
                chat: Chat { id: 42 },
                text: Some(text.to_string()),
                document: None,
            }),
        }
    }

    fn document_update(update_id: i64, file_id: &str, name: &str, size: u64) -> Update {
        Update {
            update_id,
            message: Some(Message {
                message_id: update_id,
                chat: Chat { id: 42 },
                text: None,
                document: Some(Document {
                    file_id: file_id.to_string(),
                    file_name: Some(name.to_string()),
                    file_size: Some(size),
                }),
            }),
        }
    }

    fn messages(dispatcher: &TestDispatcher) -> Vec<&str> {
        dispatcher.messenger().sent.iter().map(|(_, text)| text.as_str()).collect()
    }

    fn novel() -> Vec<u8> {
        format!("第一章 开始\n{}\n", "这是一段足够长的中文小说正文内容。".repeat(20)).into_bytes()
    }

    #[test]
    fn test_ensure_epub_extension() {
        assert_eq!(ensure_epub_extension("book.epub"), "book.epub");
        assert_eq!(ensure_epub_extension("BOOK.EPUB"), "BOOK.EPUB");
        assert_eq!(ensure_epub_extension("book.txt"), "book.epub");
        assert_eq!(ensure_epub_extension("book"), "book.epub");
        assert_eq!(Attachment::epub("a.b.txt", Vec::new()).filename, "a.b.epub");
        assert_eq!(Attachment::epub("a.epub", Vec::new()).content_type, "application/epub+zip");
    }

    #[test]
    fn test_update_cache_evicts_oldest() {
        let mut cache = UpdateCache::new(3);
        assert!(cache.mark(1));
        assert!(cache.mark(2));
        assert!(!cache.mark(1));
        assert!(cache.mark(3));
        assert!(cache.mark(4));

        assert_eq!(cache.len(), 3);
        assert!(!cache.contains(1));
        assert!(cache.contains(4));
        assert!(cache.mark(1));
    }

    #[test]
    fn test_help_and_duplicates() {
        let mut dispatcher = dispatcher(Vec::new());

        assert_eq!(dispatcher.handle_update(&text_update(1, " /HELP ")).unwrap(), Outcome::Help);
        assert_eq!(dispatcher.handle_update(&text_update(1, "/help")).unwrap(), Outcome::Duplicate);
        assert_eq!(dispatcher.handle_update(&text_update(2, "你好")).unwrap(), Outcome::Ignored);

        let sent = messages(&dispatcher);
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("Kindle Bot 使用说明"));
        assert!(sent[0].ends_with("文件大小限制：10MB"));
    }

    #[test]
    fn test_rejects_large_and_unsupported_files() {
        let mut dispatcher = dispatcher(Vec::new());

        let outcome = dispatcher
            .handle_update(&document_update(1, "f1", "big.txt", 30 * 1024 * 1024))
            .unwrap();
        assert_eq!(outcome, Outcome::Rejected(Rejection::TooLarge));

        let outcome = dispatcher.handle_update(&document_update(2, "f2", "book.pdf", 100)).unwrap();
        assert_eq!(outcome, Outcome::Rejected(Rejection::UnsupportedFormat));

        let sent = messages(&dispatcher);
        assert_eq!(sent[0], "❌ 文件过大，不予处理。\n\n文件大小：30MB\n限制：10MB");
        assert_eq!(sent[1], "❌ 不支持的文件格式。\n\n请发送 TXT 或 EPUB 文件。");
        assert!(dispatcher.source().fetched.is_empty());
        assert!(dispatcher.mailer().delivered.is_empty());
    }

    #[test]
    fn test_delivers_converted_txt() {
        let mut dispatcher = dispatcher(vec![("f1", novel())]);

        let outcome = dispatcher
            .handle_update(&document_update(7, "f1", "【精校】斗破苍穹 作者：天蚕土豆.TXT", 1024))
            .unwrap();
        assert_eq!(outcome, Outcome::Delivered("斗破苍穹.epub".to_string()));

        assert_eq!(
            messages(&dispatcher),
            vec![
                "⏳ 正在处理文件...",
                "📖 正在转换 TXT 为 EPUB...",
                "📧 正在发送到 Kindle...",
                "✅ 已发送到 Kindle！\n\n📚 斗破苍穹.epub",
            ]
        );
        let delivered = &dispatcher.mailer().delivered;
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].content_type, EPUB_CONTENT_TYPE);
        assert!(delivered[0].bytes.starts_with(b"PK"));
    }

    #[test]
    fn test_delivers_restyled_epub() {
        let epub = write_archive(&[
            ArchiveEntry::stored("mimetype", "application/epub+zip"),
            ArchiveEntry::deflated("style.css", "p { line-height: 1; }"),
        ])
        .unwrap();
        let mut dispatcher = dispatcher(vec![("e1", epub)]);

        let outcome = dispatcher
            .handle_update(&document_update(3, "e1", "三体 (Z-Library).epub", 2048))
            .unwrap();
        assert_eq!(outcome, Outcome::Delivered("三体.epub".to_string()));
        assert!(messages(&dispatcher).contains(&"✨ 正在调整 EPUB 样式..."));
    }

    #[test]
    fn test_reports_failures_without_delivery() {
        let mut dispatcher = dispatcher(vec![("blank", b"   \n\n".to_vec()), ("bad", b"not a zip".to_vec())]);

        let outcome = dispatcher.handle_update(&document_update(1, "blank", "空.txt", 5)).unwrap();
        assert_eq!(outcome, Outcome::Failed("无法识别任何章节内容".to_string()));

        let outcome = dispatcher.handle_update(&document_update(2, "bad", "坏.epub", 9)).unwrap();
        assert!(matches!(outcome, Outcome::Failed(_)));

        let outcome = dispatcher.handle_update(&document_update(3, "missing", "无.txt", 9)).unwrap();
        assert_eq!(outcome, Outcome::Failed("投递失败: 无法获取文件路径".to_string()));

        let sent = messages(&dispatcher);
        assert_eq!(sent.last(), Some(&"❌ 处理失败：投递失败: 无法获取文件路径"));
        assert!(sent.contains(&"❌ 处理失败：无法识别任何章节内容"));
        assert!(dispatcher.mailer().delivered.is_empty());
    }

    #[test]
    fn test_mailer_failure_is_reported() {
        let mut dispatcher = dispatcher(vec![("f1", novel())]);
        dispatcher.mailer.fail = true;

        let outcome = dispatcher.handle_update(&document_update(1, "f1", "小说.txt", 100)).unwrap();
        assert_eq!(outcome, Outcome::Failed("投递失败: SMTP连接失败".to_string()));
        assert_eq!(messages(&dispatcher).last(), Some(&"❌ 处理失败：投递失败: SMTP连接失败"));
    }
}
