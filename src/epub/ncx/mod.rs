//! NCX（Navigation Control file for XML）模块
//!
//! NCX为EPUB2阅读器（包括较旧的Kindle固件）提供目录。生成的书籍同时携带NCX和EPUB3导航文档。

pub mod navigation;
pub mod parser;

pub use navigation::{NavMap, NavPoint, NcxMetadata};
pub use parser::Ncx;
