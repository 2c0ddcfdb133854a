use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ForgeError>;

/// 转换与样式调整过程中的错误类型
#[derive(Error, Debug)]
pub enum ForgeError {
    #[error("IO错误: {0}")]
    Io(#[from] io::Error),

    #[error("Zip文件错误: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML解析错误: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("正则表达式错误: {0}")]
    Regex(#[from] regex::Error),

    #[error("文件不是有效的EPUB格式: {0}")]
    InvalidEpub(String),

    #[error("缺少mimetype文件")]
    MissingMimetype,

    #[error("container.xml解析错误: {0}")]
    ContainerParseError(String),

    #[error("OPF文件解析错误: {0}")]
    OpfParseError(String),

    #[error("NCX文件解析错误: {0}")]
    NcxParseError(String),

    #[error("导航文档解析错误: {0}")]
    NavParseError(String),

    #[error("无法识别任何章节内容")]
    NoChapters,

    #[error("配置文件错误: {0}")]
    ConfigError(String),

    #[error("投递失败: {0}")]
    Delivery(String),
}

impl From<quick_xml::events::attributes::AttrError> for ForgeError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        ForgeError::XmlError(quick_xml::Error::InvalidAttr(err))
    }
}
