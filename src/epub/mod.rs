pub mod builder;
pub mod container;
pub mod inspect;
pub mod nav;
pub mod ncx;
pub mod opf;
pub mod reader;
pub mod restyle;
pub mod style;

// 重新导出构建相关
pub use builder::{ArchiveEntry, BuildOptions, Compression, EPUB_MIMETYPE, build_epub, package_entries, write_archive};

// 重新导出容器相关
pub use container::{Container, RootFile};

// 重新导出读取与检查
pub use inspect::{EntrySummary, PackageSummary};
pub use reader::Epub;

// 重新导出样式调整
pub use restyle::{STYLE_MARKER, clean_filename, restyle_epub};
pub use style::generate_css;

// 重新导出OPF/NCX/导航文档
pub use nav::{NavDocument, NavEntry};
pub use ncx::{NavMap, NavPoint, Ncx};
pub use opf::{ManifestItem, Metadata, Opf, SpineItem};
