//! OPF（Open Packaging Format）包文档模块
//!
//! 此模块负责生成与解析EPUB中的OPF包文件：元数据、清单、脊柱。

mod manifest;
mod metadata;
mod parser;
mod spine;

pub use manifest::{CSS_MEDIA_TYPE, ManifestItem, NCX_MEDIA_TYPE, XHTML_MEDIA_TYPE};
pub use metadata::Metadata;
pub use parser::Opf;
pub use spine::SpineItem;
